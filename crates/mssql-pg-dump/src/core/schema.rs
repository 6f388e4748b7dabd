//! Schema metadata types.
//!
//! A [`Database`] is built once per run by the introspector and never
//! mutated afterwards.

use serde::{Deserialize, Serialize};

use super::types::SqlType;

/// All tables found in the source, exported or not, in catalog order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    /// Tables in a stable order (schema, then name).
    pub tables: Vec<Table>,
}

impl Database {
    /// Create a database model from introspected tables.
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Tables that take part in the export, in order.
    pub fn exported_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| !t.excluded)
    }

    /// Number of excluded tables.
    pub fn excluded_count(&self) -> usize {
        self.tables.iter().filter(|t| t.excluded).count()
    }
}

/// Table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Column definitions in ordinal order.
    pub columns: Vec<Column>,

    /// Whether the table is left out of the export.
    pub excluded: bool,
}

impl Table {
    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Column names in ordinal order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// SELECT reading every column in ordinal order, in source (T-SQL) syntax.
    pub fn select_query(&self) -> String {
        let cols = self
            .columns
            .iter()
            .map(Column::select_expr)
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "SELECT {} FROM {}.{}",
            cols,
            quote_source_ident(&self.schema),
            quote_source_ident(&self.name)
        )
    }

    /// `INSERT INTO <name> (<cols>) VALUES` header for the target script.
    pub fn insert_header(&self) -> String {
        let cols = self
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(",");

        format!("INSERT INTO {} ({}) VALUES", self.name, cols)
    }
}

/// Quote a T-SQL identifier: `Table]Name` -> `[Table]]Name]`.
fn quote_source_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Column metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Native data type (e.g., "int", "nvarchar", "datetime2").
    pub data_type: String,

    /// Maximum length for string/binary types (-1 for max).
    pub max_length: i32,

    /// Ordinal position (1-based).
    pub ordinal_pos: i32,

    /// Resolved source type code.
    pub sql_type: SqlType,
}

impl Column {
    /// Select-list expression reading this column.
    ///
    /// Types the driver cannot decode faithfully are converted on the server
    /// (to text, or money to an exact decimal) and keep their column name.
    pub fn select_expr(&self) -> String {
        let ident = quote_source_ident(&self.name);
        match self.data_type.to_lowercase().as_str() {
            "xml" => format!("CAST({} AS NVARCHAR(MAX)) AS {}", ident, ident),
            "sql_variant" => format!("CAST({} AS NVARCHAR(4000)) AS {}", ident, ident),
            // the driver decodes money through f64
            "money" => format!("CAST({} AS DECIMAL(19,4)) AS {}", ident, ident),
            "smallmoney" => format!("CAST({} AS DECIMAL(10,4)) AS {}", ident, ident),
            "hierarchyid" | "geometry" | "geography" => {
                format!("{}.ToString() AS {}", ident, ident)
            }
            _ => ident,
        }
    }

    /// Build a column, resolving the type code from the native SQL Server type.
    pub fn from_mssql(
        name: impl Into<String>,
        data_type: impl Into<String>,
        max_length: i32,
        ordinal_pos: i32,
    ) -> Self {
        let data_type = data_type.into();
        let sql_type = SqlType::from_mssql(&data_type, max_length);
        Self {
            name: name.into(),
            data_type,
            max_length,
            ordinal_pos,
            sql_type,
        }
    }
}
