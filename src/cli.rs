use clap::{Parser, Subcommand};
use course_catalog::catalog::{Catalog, DedupField};
use course_catalog::config::Config;
use course_catalog::error::{Error, Result};
use course_catalog::logger;
use course_catalog::server::{self, AppState};
use course_catalog::storage::FileStorage;
use course_catalog::validate::KeyPolicy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "course-catalog")]
#[command(about = "Course catalog - CSV-backed record store with an HTTP front end")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: "human" or "json"
    #[arg(short, long)]
    pub format: Option<String>,

    /// Catalog CSV file path
    #[arg(short, long)]
    pub data_file: Option<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Field checked for duplicates on insert: prerequisite, key, prerequisite-key-index
    #[arg(long)]
    pub dedup: Option<DedupField>,

    /// Require record keys to end in digits
    #[arg(long)]
    pub strict_keys: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty catalog file if none exists
    Init,

    /// List all records in insertion order
    List,

    /// Insert a record
    Insert {
        /// Identifying key (may be empty)
        key: String,
        /// Course name
        name: String,
        /// Prerequisite reference
        prerequisite: String,
    },

    /// Look a record up by key
    Search {
        key: String,
    },

    /// Delete a record by key
    Delete {
        key: String,
    },

    /// Show the number of records
    Status,

    /// Serve the catalog over HTTP
    Serve {
        /// Bind address, e.g. 127.0.0.1:1234
        #[arg(short, long)]
        addr: Option<String>,
    },
}

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::from_env();
    if let Some(path) = &cli.data_file {
        config.set_data_file(PathBuf::from(path));
    }
    if let Some(format) = &cli.format {
        config.set_output_format(format.clone());
    }
    if let Some(level) = &cli.log_level {
        config.set_log_level(level.clone());
    }
    if let Some(field) = cli.dedup {
        config.dedup_field = field;
    }
    if cli.strict_keys {
        config.strict_keys = true;
    }
    config
}

/// Format output based on format type
fn format_output<T: serde::Serialize + std::fmt::Display>(data: &T, format: &str) -> Result<String> {
    match format {
        "json" => format_json(data),
        _ => Ok(data.to_string()),
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli);
    logger::init(config.get_log_level());

    let mut storage = FileStorage::new(&config);

    if let Commands::Init = cli.command {
        if storage.init()? {
            println!("Initialized catalog at: {}", config.get_data_file().display());
        } else {
            println!("Catalog already exists at: {}", config.get_data_file().display());
        }
        return Ok(());
    }

    let mut catalog = Catalog::open(storage)?
        .with_dedup_field(config.dedup_field)
        .with_key_policy(KeyPolicy::from_strict(config.strict_keys));
    let format = config.get_output_format();

    match cli.command {
        // Handled before the catalog is opened
        Commands::Init => Ok(()),

        Commands::List => {
            if format == "json" {
                let records: Vec<_> = catalog.list().collect();
                println!("{}", format_json(&records)?);
            } else {
                print!("{}", catalog.render_list());
            }
            Ok(())
        }

        Commands::Insert {
            key,
            name,
            prerequisite,
        } => {
            catalog.insert_fields(&key, &name, &prerequisite)?;
            println!("✓ Record {} added", key);
            Ok(())
        }

        Commands::Search { key } => match catalog.search(&key) {
            Some(record) => {
                println!("{}", format_output(record, format)?);
                Ok(())
            }
            None => Err(Error::NotFound(key)),
        },

        Commands::Delete { key } => {
            catalog.delete(&key)?;
            println!("✓ Record {} deleted", key);
            Ok(())
        }

        Commands::Status => {
            let output = StatusOutput {
                entries: catalog.len(),
            };
            println!("{}", format_output(&output, format)?);
            Ok(())
        }

        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.get_listen_addr().to_string());
            let runtime = tokio::runtime::Runtime::new()
                .map_err(|e| Error::Io(format!("Failed to start runtime: {}", e)))?;
            runtime.block_on(server::serve(
                AppState::new(catalog),
                &addr,
                config.request_timeout,
            ))
        }
    }
}

fn format_json<T: serde::Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data)
        .map_err(|e| Error::Io(format!("Failed to serialize JSON: {}", e)))
}

#[derive(Debug, serde::Serialize)]
struct StatusOutput {
    entries: usize,
}

impl std::fmt::Display for StatusOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Total number of entries: {}", self.entries)
    }
}
