//! Configuration validation.

use super::Config;
use crate::error::{DumpError, Result};
use crate::introspect::ExclusionPolicy;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.host.is_empty() {
        return Err(DumpError::Config("source.host is required".into()));
    }
    if config.source.database.is_empty() {
        return Err(DumpError::Config("source.database is required".into()));
    }
    if config.source.user.is_empty() {
        return Err(DumpError::Config("source.user is required".into()));
    }
    if config.source.schema.trim().is_empty() {
        return Err(DumpError::Config("source.schema is required".into()));
    }
    if config.source.r#type != "mssql" {
        return Err(DumpError::Config(format!(
            "source.type must be 'mssql', got '{}'",
            config.source.r#type
        )));
    }
    if config.source.pool_size == 0 {
        return Err(DumpError::Config(
            "source.pool_size must be at least 1".into(),
        ));
    }

    if config.export.max_rows_per_insert == 0 {
        return Err(DumpError::Config(
            "export.max_rows_per_insert must be at least 1".into(),
        ));
    }
    if config.export.fetch_size == 0 {
        return Err(DumpError::Config(
            "export.fetch_size must be at least 1".into(),
        ));
    }
    if config.export.read_ahead == 0 {
        return Err(DumpError::Config(
            "export.read_ahead must be at least 1".into(),
        ));
    }

    // Compiling the policy rejects malformed patterns up front.
    ExclusionPolicy::from_config(config)?;

    Ok(())
}
