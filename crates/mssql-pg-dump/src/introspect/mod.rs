//! Schema introspection.
//!
//! Builds the immutable [`Database`] model for one run: every catalog object
//! is listed, classified by the [`ExclusionPolicy`], and columns are loaded
//! only for the tables that will be exported.

mod policy;

pub use policy::{Exclusion, ExclusionPolicy};

use std::collections::HashSet;

use tracing::{debug, info};

use crate::core::{Column, Database, SourceReader, Table};
use crate::error::{DumpError, Result};

/// Read the source catalog into a [`Database`].
pub async fn read_database(source: &dyn SourceReader, policy: &ExclusionPolicy) -> Result<Database> {
    let entries = source.list_tables().await?;
    debug!(
        "Catalog lists {} objects on {}",
        entries.len(),
        source.db_type()
    );

    let mut tables = Vec::with_capacity(entries.len());
    let mut exported_names = HashSet::new();

    for entry in entries {
        if let Some(exclusion) = policy.classify(&entry) {
            debug!(
                "Excluding {}.{}: {}",
                entry.schema,
                entry.name,
                exclusion.reason()
            );
            tables.push(Table {
                schema: entry.schema,
                name: entry.name,
                columns: Vec::new(),
                excluded: true,
            });
            continue;
        }

        if !exported_names.insert(entry.name.to_lowercase()) {
            return Err(DumpError::Introspection(format!(
                "duplicate table name {}.{}",
                entry.schema, entry.name
            )));
        }

        let mut entries = source.list_columns(&entry.schema, &entry.name).await?;
        if entries.is_empty() {
            return Err(DumpError::Introspection(format!(
                "table {}.{} has no columns",
                entry.schema, entry.name
            )));
        }
        entries.sort_by_key(|c| c.ordinal_pos);

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(entries.len());
        for c in entries {
            if !seen.insert(c.name.to_lowercase()) {
                return Err(DumpError::Introspection(format!(
                    "duplicate column {} in {}.{}",
                    c.name, entry.schema, entry.name
                )));
            }
            columns.push(Column::from_mssql(c.name, c.data_type, c.max_length, c.ordinal_pos));
        }

        debug!(
            "Loaded {} columns for {}.{}",
            columns.len(),
            entry.schema,
            entry.name
        );
        tables.push(Table {
            schema: entry.schema,
            name: entry.name,
            columns,
            excluded: false,
        });
    }

    let database = Database::new(tables);
    info!(
        "Schema {}: {} tables to export, {} excluded",
        policy.schema(),
        database.exported_tables().count(),
        database.excluded_count()
    );
    Ok(database)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SqlType, TableKind};
    use crate::testing::{MemorySource, MemoryTable};

    fn source() -> MemorySource {
        MemorySource::new(vec![
            MemoryTable::new("dbo", "T", &[("Id", "int"), ("Des", "varchar")]),
            MemoryTable::new("dbo", "V", &[("Id", "int")]).kind(TableKind::View),
            MemoryTable::new("sales", "Orders", &[("Id", "int")]),
            MemoryTable::new("sys", "objects", &[("name", "sysname")]),
            MemoryTable::new("dbo", "Audit", &[("At", "datetime2")]),
        ])
    }

    #[tokio::test]
    async fn test_read_database_classifies_tables() {
        let source = source();
        let db = read_database(&source, &ExclusionPolicy::new("dbo")).await.unwrap();

        let exported: Vec<_> = db.exported_tables().map(|t| t.name.as_str()).collect();
        assert_eq!(exported, vec!["T", "Audit"]);
        assert_eq!(db.excluded_count(), 3);

        let t = db.exported_tables().find(|t| t.name == "T").unwrap();
        assert_eq!(t.column_names(), vec!["Id", "Des"]);
        assert_eq!(t.columns[0].sql_type, SqlType::Integer);
        assert_eq!(t.columns[1].sql_type, SqlType::VarChar);
    }

    #[tokio::test]
    async fn test_columns_loaded_only_for_exported_tables() {
        let source = source();
        read_database(&source, &ExclusionPolicy::new("dbo")).await.unwrap();
        let queried = source.column_queries.lock().unwrap().clone();
        assert_eq!(queried, vec!["dbo.T".to_string(), "dbo.Audit".to_string()]);
    }

    #[tokio::test]
    async fn test_exclude_pattern_applies() {
        let source = source();
        let policy = ExclusionPolicy::new("dbo")
            .with_exclude(&["aud*".to_string()])
            .unwrap();
        let db = read_database(&source, &policy).await.unwrap();
        let exported: Vec<_> = db.exported_tables().map(|t| t.name.as_str()).collect();
        assert_eq!(exported, vec!["T"]);
    }

    #[tokio::test]
    async fn test_columns_sorted_by_ordinal() {
        let mut table = MemoryTable::new("dbo", "T", &[("A", "int"), ("B", "int")]);
        table.columns[0].ordinal_pos = 2;
        table.columns[1].ordinal_pos = 1;
        let source = MemorySource::new(vec![table]);
        let db = read_database(&source, &ExclusionPolicy::new("dbo")).await.unwrap();
        assert_eq!(db.tables[0].column_names(), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_duplicate_column_is_error() {
        let source = MemorySource::new(vec![MemoryTable::new(
            "dbo",
            "T",
            &[("Id", "int"), ("ID", "int")],
        )]);
        let err = read_database(&source, &ExclusionPolicy::new("dbo"))
            .await
            .unwrap_err();
        assert!(matches!(err, DumpError::Introspection(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_table_without_columns_is_error() {
        let source = MemorySource::new(vec![MemoryTable::new("dbo", "Empty", &[])]);
        let err = read_database(&source, &ExclusionPolicy::new("dbo"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("has no columns"));
    }

    #[tokio::test]
    async fn test_empty_schema_yields_no_tables() {
        let source = source();
        let db = read_database(&source, &ExclusionPolicy::new("missing"))
            .await
            .unwrap();
        assert_eq!(db.exported_tables().count(), 0);
        assert_eq!(db.excluded_count(), 5);
    }
}
