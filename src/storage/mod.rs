pub mod file;

pub use file::FileStorage;

use crate::error::Result;
use crate::record::Record;

/// Durable backing for the catalog sequence.
///
/// Implementations must preserve:
/// - Record order (load returns rows in the order they were saved)
/// - Whole-sequence replacement on save (no partial appends)
pub trait Storage {
    /// Read every persisted record in file order.
    ///
    /// Fails with `FileNotFound` if nothing has been persisted yet.
    fn load(&self) -> Result<Vec<Record>>;

    /// Replace the persisted contents with `records`.
    fn save(&mut self, records: &[Record]) -> Result<()>;
}
