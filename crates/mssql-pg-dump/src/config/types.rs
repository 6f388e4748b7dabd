//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (MSSQL).
    pub source: SourceConfig,

    /// Export behavior configuration.
    #[serde(default)]
    pub export: ExportConfig,
}

/// Source database (MSSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Database type (always "mssql" for now).
    #[serde(default = "default_mssql")]
    pub r#type: String,

    /// Database host.
    pub host: String,

    /// Database port (default: 1433).
    #[serde(default = "default_mssql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Schema whose tables are exported. No default: the schema must be named.
    #[serde(default)]
    pub schema: String,

    /// Encrypt connection (default: true).
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Trust server certificate (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,

    /// Maximum pooled connections (default: 2).
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

/// What happens to the remaining tables after one table fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableErrorPolicy {
    /// Stop exporting further tables; the script is still closed cleanly.
    #[default]
    Abort,
    /// Log the failure and continue with the next table.
    Skip,
}

/// Export behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output file; standard output when unset.
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Emit `DELETE FROM <table>;` before each table's inserts (default: true).
    #[serde(default = "default_true")]
    pub truncate_tables: bool,

    /// Maximum rows per INSERT statement (default: 100).
    #[serde(default = "default_max_rows_per_insert")]
    pub max_rows_per_insert: usize,

    /// Rows per batch fetched from the source cursor (default: 1000).
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,

    /// Script fragments buffered ahead of the writer (default: 16).
    #[serde(default = "default_read_ahead")]
    pub read_ahead: usize,

    /// Only export these tables (case-insensitive glob patterns).
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Never export these tables (case-insensitive glob patterns).
    #[serde(default)]
    pub exclude_tables: Vec<String>,

    /// File appended verbatim after the script; built-in fragment when unset.
    #[serde(default)]
    pub cleanup_path: Option<PathBuf>,

    /// Failure policy for individual tables (default: abort).
    #[serde(default)]
    pub on_table_error: TableErrorPolicy,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: None,
            truncate_tables: true,
            max_rows_per_insert: default_max_rows_per_insert(),
            fetch_size: default_fetch_size(),
            read_ahead: default_read_ahead(),
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
            cleanup_path: None,
            on_table_error: TableErrorPolicy::default(),
        }
    }
}

fn default_mssql() -> String {
    "mssql".to_string()
}

fn default_mssql_port() -> u16 {
    1433
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    2
}

fn default_max_rows_per_insert() -> usize {
    100
}

fn default_fetch_size() -> usize {
    1000
}

fn default_read_ahead() -> usize {
    16
}
