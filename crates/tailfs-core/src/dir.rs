//! Directory entry bookkeeping.
//!
//! Each directory inode owns an ordered list of (name, child id) pairs.
//! Listing order is insertion order; lookup is a linear scan, acceptable
//! because the child count is bounded by configuration.

use crate::error::{FsError, FsResult};
use crate::types::InodeId;

/// One (name, child id) pair in a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub id: InodeId,
}

/// Ordered child list of one directory inode.
#[derive(Debug, Clone, Default)]
pub struct Children {
    entries: Vec<ChildEntry>,
}

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child id for `name`, if present.
    pub fn find(&self, name: &str) -> Option<InodeId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Append an entry. Names are unique within one directory.
    pub fn add(&mut self, name: &str, id: InodeId, max_children: usize) -> FsResult<()> {
        if self.entries.len() >= max_children {
            return Err(FsError::resource_exhausted(format!(
                "directory full ({max_children} entries)"
            )));
        }
        if self.contains(name) {
            return Err(FsError::already_exists(name));
        }
        self.entries.push(ChildEntry {
            name: name.to_owned(),
            id,
        });
        Ok(())
    }

    /// Remove the entry matching both `name` and `id`, keeping the order of
    /// the rest. Returns the removed index so a failed move can put the
    /// entry back where it was.
    ///
    /// A name match with a different id is not a match: a racing delete must
    /// not take out a newer object that reused the name.
    pub fn remove(&mut self, name: &str, id: InodeId) -> FsResult<usize> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.name == name && e.id == id)
            .ok_or_else(|| FsError::not_found(name))?;
        self.entries.remove(idx);
        Ok(idx)
    }

    /// Reinsert an entry at a known position.
    pub fn insert(&mut self, index: usize, name: &str, id: InodeId) {
        let index = index.min(self.entries.len());
        self.entries.insert(
            index,
            ChildEntry {
                name: name.to_owned(),
                id,
            },
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChildEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(c: &Children) -> Vec<&str> {
        c.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut c = Children::new();
        c.add("zeta", InodeId::new(2), 16).unwrap();
        c.add("alpha", InodeId::new(3), 16).unwrap();
        c.add("mid", InodeId::new(4), 16).unwrap();
        assert_eq!(names(&c), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_add_rejects_duplicate_name() {
        let mut c = Children::new();
        c.add("a", InodeId::new(2), 16).unwrap();
        assert!(matches!(
            c.add("a", InodeId::new(3), 16),
            Err(FsError::AlreadyExists(_))
        ));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_add_rejects_at_capacity() {
        let mut c = Children::new();
        c.add("a", InodeId::new(2), 2).unwrap();
        c.add("b", InodeId::new(3), 2).unwrap();
        assert!(matches!(
            c.add("c", InodeId::new(4), 2),
            Err(FsError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_remove_requires_name_and_id_match() {
        let mut c = Children::new();
        c.add("a", InodeId::new(2), 16).unwrap();

        // Right name, wrong id: the entry stays.
        assert!(matches!(
            c.remove("a", InodeId::new(9)),
            Err(FsError::NotFound(_))
        ));
        assert_eq!(c.len(), 1);

        assert_eq!(c.remove("a", InodeId::new(2)).unwrap(), 0);
        assert!(c.is_empty());
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut c = Children::new();
        c.add("a", InodeId::new(2), 16).unwrap();
        c.add("b", InodeId::new(3), 16).unwrap();
        c.add("c", InodeId::new(4), 16).unwrap();

        let idx = c.remove("b", InodeId::new(3)).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(names(&c), vec!["a", "c"]);
    }

    #[test]
    fn test_insert_restores_position() {
        let mut c = Children::new();
        c.add("a", InodeId::new(2), 16).unwrap();
        c.add("b", InodeId::new(3), 16).unwrap();
        c.add("c", InodeId::new(4), 16).unwrap();

        let idx = c.remove("b", InodeId::new(3)).unwrap();
        c.insert(idx, "b", InodeId::new(3));
        assert_eq!(names(&c), vec!["a", "b", "c"]);
    }
}
