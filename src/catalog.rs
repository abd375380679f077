use crate::error::{Error, Result};
use crate::index::Index;
use crate::record::Record;
use crate::storage::Storage;
use crate::validate::KeyPolicy;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Which field `insert` checks for an existing entry before accepting a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupField {
    /// Reject when another record already carries the same prerequisite
    #[default]
    Prerequisite,
    /// Reject when the identifying key is already present
    Key,
    /// Look the new record's prerequisite up in the key index
    PrerequisiteKeyIndex,
}

impl FromStr for DedupField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "prerequisite" => Ok(DedupField::Prerequisite),
            "key" => Ok(DedupField::Key),
            "prerequisite-key-index" => Ok(DedupField::PrerequisiteKeyIndex),
            other => Err(format!("unknown dedup field: {}", other)),
        }
    }
}

impl fmt::Display for DedupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DedupField::Prerequisite => "prerequisite",
            DedupField::Key => "key",
            DedupField::PrerequisiteKeyIndex => "prerequisite-key-index",
        };
        f.write_str(s)
    }
}

/// In-memory course catalog with a key index and write-through persistence.
///
/// Invariants:
/// - `index` maps exactly the keys present in `records` after every mutation
/// - after a successful mutation the storage holds the same sequence as `records`
///
/// Not synchronized: callers sharing a catalog across threads must serialize
/// access (the HTTP server wraps it in a single mutex).
pub struct Catalog<S: Storage> {
    records: Vec<Record>,
    index: Index,
    prerequisites: Index,
    storage: S,
    dedup_field: DedupField,
    key_policy: KeyPolicy,
}

impl<S: Storage> Catalog<S> {
    /// Load every record from `storage` and build the indexes.
    pub fn open(storage: S) -> Result<Self> {
        let records = storage.load()?;
        let index = Index::build(&records);
        let prerequisites = Index::build_by(&records, |r| &r.prerequisite);
        info!(records = records.len(), keys = index.len(), "catalog loaded");

        Ok(Catalog {
            records,
            index,
            prerequisites,
            storage,
            dedup_field: DedupField::default(),
            key_policy: KeyPolicy::default(),
        })
    }

    pub fn with_dedup_field(mut self, dedup_field: DedupField) -> Self {
        self.dedup_field = dedup_field;
        self
    }

    pub fn with_key_policy(mut self, key_policy: KeyPolicy) -> Self {
        self.key_policy = key_policy;
        self
    }

    pub fn dedup_field(&self) -> DedupField {
        self.dedup_field
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Validate the fields and insert the resulting record.
    pub fn insert_fields(&mut self, key: &str, name: &str, prerequisite: &str) -> Result<()> {
        let record = Record::new(key, name, prerequisite).ok_or_else(|| {
            Error::Validation("name and prerequisite must not be empty".to_string())
        })?;
        self.insert(record)
    }

    /// Append a record, rebuild the indexes and write the catalog through.
    ///
    /// Returns `NotPersisted` if the record was appended but the file write failed.
    pub fn insert(&mut self, record: Record) -> Result<()> {
        self.key_policy.check(&record)?;

        let duplicate = match self.dedup_field {
            DedupField::Prerequisite => self
                .prerequisites
                .contains(&record.prerequisite)
                .then(|| record.prerequisite.clone()),
            DedupField::Key => self.index.contains(&record.key).then(|| record.key.clone()),
            DedupField::PrerequisiteKeyIndex => self
                .index
                .contains(&record.prerequisite)
                .then(|| record.prerequisite.clone()),
        };
        if let Some(existing) = duplicate {
            debug!(key = %record.key, dedup = %self.dedup_field, "insert rejected");
            return Err(Error::AlreadyExists(existing));
        }

        debug!(key = %record.key, "inserting record");
        self.records.push(record);
        self.reindex();
        self.write_through()
    }

    /// Remove every record carrying `key` and write the catalog through.
    ///
    /// Returns the record `search(key)` resolved to. Later records shift left;
    /// the indexes are rebuilt so their positions stay correct.
    pub fn delete(&mut self, key: &str) -> Result<Record> {
        let position = self
            .index
            .remove(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;

        let removed = self.records[position].clone();
        let before = self.records.len();
        self.records.retain(|r| r.key != key);
        self.reindex();
        debug!(key = %key, removed = before - self.records.len(), "deleted record");

        self.write_through()?;
        Ok(removed)
    }

    pub fn search(&self, key: &str) -> Option<&Record> {
        self.index.get(key).map(|i| &self.records[i])
    }

    /// Records in insertion order. Call again to restart.
    pub fn list(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// One `"key name prerequisite"` line per record, each newline-terminated.
    pub fn render_list(&self) -> String {
        self.records
            .iter()
            .map(|r| format!("{}\n", r))
            .collect()
    }

    /// Persist the current in-memory sequence, e.g. to retry after `NotPersisted`.
    pub fn save(&mut self) -> Result<()> {
        self.storage.save(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn reindex(&mut self) {
        self.index = Index::build(&self.records);
        self.prerequisites = Index::build_by(&self.records, |r| &r.prerequisite);
    }

    fn write_through(&mut self) -> Result<()> {
        self.storage.save(&self.records).map_err(|e| {
            warn!(error = %e, "write-through failed; in-memory catalog is ahead of disk");
            Error::NotPersisted {
                source: Box::new(e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Storage double that keeps the last saved sequence and can be told to fail.
    #[derive(Default)]
    struct MemoryStorage {
        saved: Vec<Record>,
        fail_saves: bool,
        saves: usize,
    }

    impl Storage for MemoryStorage {
        fn load(&self) -> Result<Vec<Record>> {
            Ok(self.saved.clone())
        }

        fn save(&mut self, records: &[Record]) -> Result<()> {
            if self.fail_saves {
                return Err(Error::Io("disk full".to_string()));
            }
            self.saves += 1;
            self.saved = records.to_vec();
            Ok(())
        }
    }

    fn record(key: &str, name: &str, prerequisite: &str) -> Record {
        Record::new(key, name, prerequisite).unwrap()
    }

    fn seeded(records: Vec<Record>) -> Catalog<MemoryStorage> {
        Catalog::open(MemoryStorage {
            saved: records,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_open_builds_index() {
        let catalog = seeded(vec![record("CS100", "Intro", "None")]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.search("CS100").unwrap().name, "Intro");
    }

    #[test]
    fn test_insert_then_search() {
        let mut catalog = seeded(vec![]);
        let r = record("CS100", "Intro", "None");
        catalog.insert(r.clone()).unwrap();

        assert_eq!(catalog.search("CS100"), Some(&r));
        assert_eq!(catalog.storage().saved, vec![r]);
        assert_eq!(catalog.storage().saves, 1);
    }

    #[test]
    fn test_insert_fields_validation() {
        let mut catalog = seeded(vec![]);
        let result = catalog.insert_fields("CS100", "", "None");
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(catalog.is_empty());
        assert_eq!(catalog.storage().saves, 0);
    }

    #[test]
    fn test_insert_rejects_shared_prerequisite() {
        let mut catalog = seeded(vec![record("CS200", "Algorithms", "CS100")]);
        let result = catalog.insert(record("CS201", "Data Structures", "CS100"));

        match result {
            Err(Error::AlreadyExists(value)) => assert_eq!(value, "CS100"),
            other => panic!("expected AlreadyExists, got {:?}", other),
        }
        assert_eq!(catalog.len(), 1);
        assert!(catalog.search("CS201").is_none());
    }

    #[test]
    fn test_dedup_by_key() {
        let mut catalog =
            seeded(vec![record("CS100", "Intro", "None")]).with_dedup_field(DedupField::Key);

        // Same prerequisite is fine when deduplicating by key
        catalog.insert(record("CS101", "Intro II", "None")).unwrap();
        let result = catalog.insert(record("CS100", "Intro Again", "Other"));
        assert!(matches!(result, Err(Error::AlreadyExists(k)) if k == "CS100"));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_dedup_prerequisite_against_key_index() {
        let mut catalog = seeded(vec![record("CS100", "Intro", "None")])
            .with_dedup_field(DedupField::PrerequisiteKeyIndex);

        let result = catalog.insert(record("CS200", "Algorithms", "CS100"));
        assert!(matches!(result, Err(Error::AlreadyExists(k)) if k == "CS100"));

        // A duplicate key slips through this lookup; last entry wins in the index
        catalog.insert(record("CS100", "Intro Again", "None")).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.search("CS100").unwrap().name, "Intro Again");
    }

    #[test]
    fn test_insert_respects_key_policy() {
        let mut catalog = seeded(vec![]).with_key_policy(KeyPolicy::TrailingDigits);
        assert!(matches!(
            catalog.insert(record("intro", "Intro", "None")),
            Err(Error::Validation(_))
        ));
        catalog.insert(record("CS100", "Intro", "None")).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_delete_then_search() {
        let mut catalog = seeded(vec![
            record("CS100", "Intro", "None"),
            record("CS200", "Algorithms", "CS100"),
        ]);

        let removed = catalog.delete("CS100").unwrap();
        assert_eq!(removed.key, "CS100");
        assert!(catalog.search("CS100").is_none());
        assert_eq!(catalog.storage().saved.len(), 1);
    }

    #[test]
    fn test_delete_reindexes_later_records() {
        let mut catalog = seeded(vec![
            record("A1", "First", "None"),
            record("B2", "Second", "A1"),
            record("C3", "Third", "B2"),
        ]);

        catalog.delete("A1").unwrap();
        assert_eq!(catalog.search("B2").unwrap().name, "Second");
        assert_eq!(catalog.search("C3").unwrap().name, "Third");

        catalog.delete("C3").unwrap();
        assert_eq!(catalog.render_list(), "B2 Second A1\n");
    }

    #[test]
    fn test_delete_removes_duplicate_keys() {
        let mut catalog = seeded(vec![record("CS100", "Intro", "None")]);

        // Distinct prerequisite, so the default dedup accepts the repeated key
        catalog.insert(record("CS100", "Intro Redux", "MATH1")).unwrap();
        assert_eq!(catalog.len(), 2);

        let removed = catalog.delete("CS100").unwrap();
        assert_eq!(removed.name, "Intro Redux");
        assert!(catalog.search("CS100").is_none());
        assert!(catalog.is_empty());
        assert!(catalog.storage().saved.is_empty());
    }

    #[test]
    fn test_delete_duplicate_keys_from_load() {
        let mut catalog = seeded(vec![
            record("A1", "First", "None"),
            record("B2", "Second", "A1"),
            record("A1", "First Again", "B2"),
        ]);

        catalog.delete("A1").unwrap();
        assert!(catalog.search("A1").is_none());
        assert_eq!(catalog.render_list(), "B2 Second A1\n");
    }

    #[test]
    fn test_delete_absent_key() {
        let mut catalog = seeded(vec![record("CS100", "Intro", "None")]);
        let result = catalog.delete("CS999");

        assert!(matches!(result, Err(Error::NotFound(k)) if k == "CS999"));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.search("CS100").is_some());
        assert_eq!(catalog.storage().saves, 0);
    }

    #[test]
    fn test_write_through_failure_keeps_mutation() {
        let mut catalog = seeded(vec![]);
        catalog.storage.fail_saves = true;

        let err = catalog.insert(record("CS100", "Intro", "None")).unwrap_err();
        assert!(err.is_applied());
        assert!(catalog.search("CS100").is_some());
        assert!(catalog.storage().saved.is_empty());

        // Retry once storage recovers
        catalog.storage.fail_saves = false;
        catalog.save().unwrap();
        assert_eq!(catalog.storage().saved.len(), 1);
    }

    #[test]
    fn test_list_is_restartable() {
        let catalog = seeded(vec![
            record("CS100", "Intro", "None"),
            record("CS200", "Algorithms", "CS100"),
        ]);
        let first: Vec<_> = catalog.list().map(|r| r.key.as_str()).collect();
        let second: Vec<_> = catalog.list().map(|r| r.key.as_str()).collect();
        assert_eq!(first, vec!["CS100", "CS200"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_dedup_field_parse() {
        assert_eq!("key".parse::<DedupField>().unwrap(), DedupField::Key);
        assert_eq!(
            "prerequisite-key-index".parse::<DedupField>().unwrap(),
            DedupField::PrerequisiteKeyIndex
        );
        assert!("name".parse::<DedupField>().is_err());
        assert_eq!(DedupField::Prerequisite.to_string(), "prerequisite");
    }
}
