use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid record: {0}")]
    Validation(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} cannot be found!")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Malformed row at line {line}: {message}")]
    Format { line: u64, message: String },

    #[error("Catalog file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The mutation was applied in memory but the write-through to disk failed.
    #[error("Change applied in memory but not persisted: {source}")]
    NotPersisted { source: Box<Error> },
}

impl Error {
    /// True if the in-memory catalog reflects the requested mutation despite the error.
    pub fn is_applied(&self) -> bool {
        matches!(self, Error::NotPersisted { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
