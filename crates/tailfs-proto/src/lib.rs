//! Generated gRPC bindings for the tailfs remote interface.
//!
//! The schema lives in `proto/tailfs.proto` and is compiled at build time
//! with protox, so no system protoc is required.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod pb {
    tonic::include_proto!("tailfs");
}

/// A `SystemTime` as unix seconds, the wire representation of mtime.
///
/// Times before the epoch clamp to zero; this filesystem never produces
/// them on its own.
pub fn unix_seconds(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Unix seconds back to a `SystemTime`.
pub fn from_unix_seconds(secs: i64) -> SystemTime {
    if secs <= 0 {
        UNIX_EPOCH
    } else {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    }
}
