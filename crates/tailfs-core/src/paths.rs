//! Path handling: validation, segmentation, parent/leaf splitting.
//!
//! Paths are absolute, slash-delimited, and bounded by the configured
//! limits. Violations are reported, never truncated away.

use crate::config::FsConfig;
use crate::error::{FsError, FsResult};

/// Check that a path is absolute, NUL-free, and within the length limit.
pub fn validate_path(path: &str, config: &FsConfig) -> FsResult<()> {
    if path.is_empty() || !path.starts_with('/') || path.contains('\0') {
        return Err(FsError::invalid_path(path));
    }
    if path.len() > config.max_path {
        return Err(FsError::invalid_path(format!(
            "{path}: longer than {} bytes",
            config.max_path
        )));
    }
    Ok(())
}

/// Check that a name is usable as a directory entry.
pub fn validate_name(name: &str, config: &FsConfig) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(FsError::invalid_path(name));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(FsError::invalid_path(name));
    }
    if name.len() > config.max_name {
        return Err(FsError::name_too_long(name));
    }
    Ok(())
}

/// Non-empty path segments in order. Duplicate separators collapse.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Split an absolute path into (parent path, leaf name).
///
/// Trailing separators are ignored. The root splits into ("/", "");
/// callers that need a leaf reject the empty name via [`validate_name`].
pub fn split_parent(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return ("/", "");
    }
    match trimmed.rfind('/') {
        Some(0) => ("/", &trimmed[1..]),
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => ("/", trimmed),
    }
}
