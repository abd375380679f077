use crate::config::Config;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::storage::Storage;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// CSV file storage: one record per row, columns `key, name, prerequisite`,
/// no header row.
///
/// Files:
/// - `<data_file>`: the catalog
/// - `<data_file>.tmp`: staging file for whole-file replacement
pub struct FileStorage {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the path from config
    pub fn new(config: &Config) -> Self {
        FileStorage::with_path(config.get_data_file().clone())
    }

    /// Create FileStorage with a custom path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        FileStorage {
            path,
            tmp_path: PathBuf::from(tmp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty catalog file if none exists yet. Returns true if created.
    pub fn init(&mut self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&[])?;
        Ok(true)
    }

    fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Io(format!("Failed to create data directory: {}", e)))?;
        }
        Ok(())
    }

    fn write_tmp(&self, records: &[Record]) -> Result<()> {
        let file = File::create(&self.tmp_path)
            .map_err(|e| Error::Io(format!("Failed to create temp catalog file: {}", e)))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for record in records {
            writer
                .write_record(record.as_row())
                .map_err(|e| Error::Io(format!("Failed to write record {}: {}", record.key, e)))?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| Error::Io(format!("Failed to flush catalog rows: {}", e)))?;
        file.sync_all()
            .map_err(|e| Error::Io(format!("Failed to fsync temp catalog file: {}", e)))?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> Error {
    if e.is_io_error() {
        return Error::Io(format!("Failed to read catalog file: {}", e));
    }
    Error::Format {
        line: e.position().map(|p| p.line()).unwrap_or(0),
        message: e.to_string(),
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Vec<Record>> {
        if !self.path.exists() {
            return Err(Error::FileNotFound(self.path.clone()));
        }

        let file = File::open(&self.path)
            .map_err(|e| Error::Io(format!("Failed to open catalog file: {}", e)))?;

        // Row width is checked per row so a short first row is still reported
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(csv_error)?;
            if row.len() != 3 {
                let line = row.position().map(|p| p.line()).unwrap_or(0);
                return Err(Error::Format {
                    line,
                    message: format!("expected 3 fields, found {}", row.len()),
                });
            }
            records.push(Record {
                key: row[0].to_string(),
                name: row[1].to_string(),
                prerequisite: row[2].to_string(),
            });
        }

        Ok(records)
    }

    fn save(&mut self, records: &[Record]) -> Result<()> {
        self.ensure_dir()?;
        self.write_tmp(records)?;

        fs::rename(&self.tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&self.tmp_path);
            Error::Io(format!("Failed to replace catalog file: {}", e))
        })?;

        // Persist the rename itself
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let dir = File::open(parent)
                .map_err(|e| Error::Io(format!("Failed to open data directory: {}", e)))?;
            dir.sync_all()
                .map_err(|e| Error::Io(format!("Failed to fsync data directory: {}", e)))?;
        }

        Ok(())
    }
}
