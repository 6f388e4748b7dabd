//! Database driver implementations.
//!
//! - [`mssql`]: Microsoft SQL Server source
//!
//! Each driver implements [`SourceReader`](crate::core::SourceReader) and a
//! [`SourceFactory`](crate::core::SourceFactory) that the orchestrator
//! receives from the caller.

pub mod mssql;

pub use mssql::{MssqlFactory, MssqlReader};
