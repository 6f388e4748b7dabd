//! Core abstractions for source-agnostic export.
//!
//! - [`schema`]: Database, table and column metadata
//! - [`types`]: Source type codes resolved during introspection
//! - [`value`]: Fetched column values and row batches
//! - [`traits`]: The connection seams the exporter depends on
//!
//! Driver modules (`drivers/mssql`) implement [`SourceReader`] and
//! [`SourceFactory`]; everything else in the crate only sees these traits,
//! so the export pipeline can be driven by an in-memory source in tests.

pub mod schema;
pub mod traits;
pub mod types;
pub mod value;

pub use schema::{Column, Database, Table};
pub use traits::{ColumnEntry, SourceFactory, SourceReader, TableEntry, TableKind};
pub use types::SqlType;
pub use value::{Batch, Row, SqlNullType, SqlValue};
