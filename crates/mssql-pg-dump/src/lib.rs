//! # mssql-pg-dump
//!
//! Export the data of one SQL Server schema as a replayable PostgreSQL script.
//!
//! The generated script defers constraints, disables triggers, reloads every
//! table inside a single transaction using batched multi-row `INSERT`s, then
//! restores triggers and constraints and appends a cleanup fragment.
//!
//! - **Streaming reads**: each table is read by one forward-only SELECT
//! - **Bounded output pipeline**: rendering and writing overlap without
//!   unbounded buffering
//! - **Type-driven literals**: every source type maps to one literal strategy
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mssql_pg_dump::{Config, MssqlFactory, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("dump.yaml")?;
//!     let factory = Arc::new(MssqlFactory::new(config.source.clone()));
//!     let orchestrator = Orchestrator::new(config, factory);
//!     let result = orchestrator.run(CancellationToken::new()).await?;
//!     eprintln!("Exported {} rows", result.rows_exported);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod introspect;
pub mod orchestrator;
pub mod output;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use batch::InsertBatcher;
pub use config::{Config, ExportConfig, SourceConfig, TableErrorPolicy};
pub use crate::core::{Database, SourceFactory, SourceReader, SqlType, SqlValue, Table};
pub use dialect::{serialize, LiteralStrategy};
pub use drivers::{MssqlFactory, MssqlReader};
pub use error::{DumpError, Result};
pub use introspect::{read_database, ExclusionPolicy};
pub use orchestrator::{ExportResult, HealthCheckResult, Orchestrator};
