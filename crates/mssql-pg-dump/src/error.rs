//! Error types for the dump library.

use thiserror::Error;

/// Main error type for dump operations.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database connection or query error
    #[error("Source database error: {0}")]
    Source(#[from] tiberius::error::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Metadata could not be read or is inconsistent
    #[error("Schema introspection failed: {0}")]
    Introspection(String),

    /// Reading or serializing a table failed
    #[error("Export failed for table {table}: {message}")]
    Table { table: String, message: String },

    /// The output sink rejected a write
    #[error("Output error: {0}")]
    Output(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The script was written but some tables failed
    #[error("Export incomplete: {} table(s) failed: {}", .0.len(), .0.join(", "))]
    Incomplete(Vec<String>),

    /// Export was cancelled (SIGINT, etc.)
    #[error("Export cancelled")]
    Cancelled,
}

impl DumpError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        DumpError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Table error
    pub fn table(table: impl Into<String>, message: impl Into<String>) -> Self {
        DumpError::Table {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// Configuration problems are reported before any output is produced,
    /// connection and metadata problems abort the run, table failures leave
    /// a well-formed but incomplete script.
    pub fn exit_code(&self) -> u8 {
        match self {
            DumpError::Config(_) | DumpError::Yaml(_) => 2,
            DumpError::Source(_) | DumpError::Pool { .. } | DumpError::Introspection(_) => 3,
            DumpError::Incomplete(_) | DumpError::Table { .. } => 4,
            DumpError::Cancelled => 130,
            DumpError::Output(_) | DumpError::Io(_) | DumpError::Json(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for dump operations.
pub type Result<T> = std::result::Result<T, DumpError>;
