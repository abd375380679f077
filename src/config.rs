use crate::catalog::DedupField;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the course catalog CLI and server
#[derive(Debug, Clone)]
pub struct Config {
    /// Catalog file path (default: `./data.csv`)
    pub data_file: PathBuf,

    /// Address the HTTP server binds to (default: `127.0.0.1:1234`)
    pub listen_addr: String,

    /// Output format: "human" (default) or "json"
    pub output_format: String,

    /// Log level: "info", "debug", "warn", "error" (default: "info")
    pub log_level: String,

    /// Field checked for duplicates on insert (default: prerequisite)
    pub dedup_field: DedupField,

    /// Require keys to end in digits before insertion
    pub strict_keys: bool,

    /// Per-request timeout for the HTTP server
    pub request_timeout: Duration,
}

impl Config {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Config {
            data_file: PathBuf::from("./data.csv"),
            listen_addr: "127.0.0.1:1234".to_string(),
            output_format: "human".to_string(),
            log_level: "info".to_string(),
            dedup_field: DedupField::default(),
            strict_keys: false,
            request_timeout: Duration::from_secs(1),
        }
    }

    /// Create config with a custom catalog file
    pub fn with_data_file(data_file: PathBuf) -> Self {
        Config {
            data_file,
            ..Config::new()
        }
    }

    pub fn get_data_file(&self) -> &PathBuf {
        &self.data_file
    }

    pub fn set_data_file(&mut self, path: PathBuf) {
        self.data_file = path;
    }

    pub fn get_listen_addr(&self) -> &str {
        &self.listen_addr
    }

    pub fn set_listen_addr(&mut self, addr: String) {
        self.listen_addr = addr;
    }

    pub fn get_output_format(&self) -> &str {
        &self.output_format
    }

    /// Set output format ("human" or "json")
    pub fn set_output_format(&mut self, format: String) {
        self.output_format = format;
    }

    pub fn get_log_level(&self) -> &str {
        &self.log_level
    }

    pub fn set_log_level(&mut self, level: String) {
        self.log_level = level;
    }

    /// Load config from environment variables
    ///
    /// Environment variables:
    /// - `COURSE_CATALOG_DATA_FILE`: catalog file path
    /// - `COURSE_CATALOG_LISTEN_ADDR`: server bind address
    /// - `COURSE_CATALOG_OUTPUT_FORMAT`: "human" or "json"
    /// - `COURSE_CATALOG_LOG_LEVEL`: log level
    /// - `COURSE_CATALOG_DEDUP_FIELD`: "prerequisite", "key" or "prerequisite-key-index"
    /// - `COURSE_CATALOG_STRICT_KEYS`: "true"/"1" to require numeric key suffixes
    /// - `COURSE_CATALOG_REQUEST_TIMEOUT_MS`: request timeout in milliseconds
    ///
    /// Unparseable values are ignored and the default kept.
    pub fn from_env() -> Self {
        Config::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::new();

        if let Some(path) = lookup("COURSE_CATALOG_DATA_FILE") {
            config.data_file = PathBuf::from(path);
        }

        if let Some(addr) = lookup("COURSE_CATALOG_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(format) = lookup("COURSE_CATALOG_OUTPUT_FORMAT") {
            config.output_format = format;
        }

        if let Some(level) = lookup("COURSE_CATALOG_LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(field) = lookup("COURSE_CATALOG_DEDUP_FIELD").and_then(|v| v.parse().ok()) {
            config.dedup_field = field;
        }

        if let Some(strict) = lookup("COURSE_CATALOG_STRICT_KEYS") {
            config.strict_keys = matches!(strict.as_str(), "1" | "true" | "yes");
        }

        if let Some(ms) = lookup("COURSE_CATALOG_REQUEST_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            config.request_timeout = Duration::from_millis(ms);
        }

        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
