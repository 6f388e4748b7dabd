//! Connection seams used by the introspector and the exporter.
//!
//! - [`SourceReader`]: catalog queries plus single-pass row streaming
//! - [`SourceFactory`]: opens a [`SourceReader`]; injected into the orchestrator
//!
//! The exporter never learns how a connection is obtained, which keeps driver
//! bootstrap out of the core and lets tests run against in-memory sources.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

use super::schema::Table;
use super::value::Batch;

/// Kind of a catalog object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Ordinary user table.
    BaseTable,
    /// View (never exported).
    View,
    /// Engine-internal table.
    System,
}

/// One entry of the source catalog.
#[derive(Debug, Clone)]
pub struct TableEntry {
    /// Schema name.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Object kind.
    pub kind: TableKind,
}

/// One column as reported by the catalog.
#[derive(Debug, Clone)]
pub struct ColumnEntry {
    /// Column name.
    pub name: String,
    /// Native data type name.
    pub data_type: String,
    /// Maximum length for string/binary types (-1 for max).
    pub max_length: i32,
    /// Ordinal position (1-based).
    pub ordinal_pos: i32,
}

/// Read metadata and rows from a source database.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// List every table-like catalog object, ordered by schema then name.
    async fn list_tables(&self) -> Result<Vec<TableEntry>>;

    /// List the columns of a table in ordinal order.
    async fn list_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnEntry>>;

    /// Start streaming every row of a table.
    ///
    /// The returned receiver is a forward-only cursor: batches arrive in
    /// query order and the channel closes after the last row. An `Err` item
    /// ends the stream.
    fn read_table(&self, table: &Table, fetch_size: usize) -> mpsc::Receiver<Result<Batch>>;

    /// Get the database type identifier (e.g., "mssql").
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}

/// Open connections to a source database.
#[async_trait]
pub trait SourceFactory: Send + Sync {
    /// Connect and verify the source is reachable.
    async fn connect(&self) -> Result<Arc<dyn SourceReader>>;
}
