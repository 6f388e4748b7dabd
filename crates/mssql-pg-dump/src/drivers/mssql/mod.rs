//! Microsoft SQL Server driver.
//!
//! - [`MssqlReader`]: catalog queries and streaming table reads
//! - [`MssqlFactory`]: opens readers from the source configuration

mod reader;

pub use reader::{MssqlFactory, MssqlReader, TiberiusConnectionManager};
