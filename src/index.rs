use crate::record::Record;
use std::collections::HashMap;

/// Key-to-position mapping over the catalog sequence.
///
/// Rebuilt in full from the sequence; duplicate keys resolve to the last
/// occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    positions: HashMap<String, usize>,
}

impl Index {
    pub fn new() -> Self {
        Index {
            positions: HashMap::new(),
        }
    }

    /// Build the key index from scratch in O(n).
    pub fn build(records: &[Record]) -> Self {
        Index::build_by(records, |r| &r.key)
    }

    /// Build an index over an arbitrary string field of each record.
    pub fn build_by<F>(records: &[Record], field: F) -> Self
    where
        F: Fn(&Record) -> &String,
    {
        let mut positions = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            positions.insert(field(record).clone(), i);
        }
        Index { positions }
    }

    /// Position of `key` in the sequence the index was built from
    pub fn get(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Drop a single entry without renumbering the others.
    pub fn remove(&mut self, key: &str) -> Option<usize> {
        self.positions.remove(key)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
