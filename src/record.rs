use serde::{Deserialize, Serialize};
use std::fmt;

/// A course catalog entry.
///
/// Invariants:
/// - `name` and `prerequisite` are never empty for records built through `Record::new`
/// - `key` may be empty
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Identifying key (e.g. "CS100")
    pub key: String,

    /// Descriptive course name
    pub name: String,

    /// Free-text prerequisite reference
    pub prerequisite: String,
}

impl Record {
    /// Build a record, refusing construction when `name` or `prerequisite` is empty.
    pub fn new(key: &str, name: &str, prerequisite: &str) -> Option<Self> {
        if name.is_empty() || prerequisite.is_empty() {
            return None;
        }

        Some(Record {
            key: key.to_string(),
            name: name.to_string(),
            prerequisite: prerequisite.to_string(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prerequisite(&self) -> &str {
        &self.prerequisite
    }

    /// Columns in persisted order: key, name, prerequisite
    pub fn as_row(&self) -> [&str; 3] {
        [&self.key, &self.name, &self.prerequisite]
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.key, self.name, self.prerequisite)
    }
}
