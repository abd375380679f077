pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod logger;
pub mod record;
pub mod server;
pub mod storage;
pub mod validate;

pub use catalog::{Catalog, DedupField};
pub use error::{Error, Result};
pub use record::Record;
