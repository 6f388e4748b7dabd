//! Source type codes.
//!
//! Every column is resolved to exactly one [`SqlType`] during introspection.
//! The code decides how fetched values are read and which literal strategy
//! renders them (see [`crate::dialect::LiteralStrategy::for_type`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source SQL type code of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Binary,
    VarBinary,
    Blob,
    Clob,
    Char,
    VarChar,
    LongVarChar,
    Time,
    Date,
    Timestamp,
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Decimal,
    Real,
    Float,
    Double,
    /// Anything without a dedicated rule (bit, unknown user types).
    Other,
}

impl SqlType {
    /// Resolve a SQL Server `INFORMATION_SCHEMA.COLUMNS.DATA_TYPE` name.
    ///
    /// `max_length` is `CHARACTER_MAXIMUM_LENGTH`, `-1` for `(max)` columns.
    pub fn from_mssql(data_type: &str, max_length: i32) -> Self {
        let dt = data_type.to_lowercase();
        match dt.as_str() {
            "binary" | "timestamp" | "rowversion" => SqlType::Binary,
            "varbinary" if max_length == -1 => SqlType::Blob,
            "varbinary" => SqlType::VarBinary,
            "image" => SqlType::Blob,

            "text" | "ntext" | "xml" => SqlType::Clob,
            "varchar" | "nvarchar" if max_length == -1 => SqlType::LongVarChar,
            "char" | "nchar" | "uniqueidentifier" => SqlType::Char,
            "varchar" | "nvarchar" | "sysname" => SqlType::VarChar,
            // converted to text by the generated SELECT
            "sql_variant" => SqlType::VarChar,
            "hierarchyid" | "geometry" | "geography" => SqlType::LongVarChar,

            "date" => SqlType::Date,
            "time" => SqlType::Time,
            "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" => SqlType::Timestamp,

            "tinyint" | "smallint" => SqlType::SmallInt,
            "int" => SqlType::Integer,
            "bigint" => SqlType::BigInt,
            "numeric" => SqlType::Numeric,
            "decimal" | "money" | "smallmoney" => SqlType::Decimal,

            "real" => SqlType::Real,
            "float" => SqlType::Double,

            _ => SqlType::Other,
        }
    }

    /// Lower-case name used in logs and `inspect` output.
    pub fn name(&self) -> &'static str {
        match self {
            SqlType::Binary => "binary",
            SqlType::VarBinary => "varbinary",
            SqlType::Blob => "blob",
            SqlType::Clob => "clob",
            SqlType::Char => "char",
            SqlType::VarChar => "varchar",
            SqlType::LongVarChar => "longvarchar",
            SqlType::Time => "time",
            SqlType::Date => "date",
            SqlType::Timestamp => "timestamp",
            SqlType::SmallInt => "smallint",
            SqlType::Integer => "integer",
            SqlType::BigInt => "bigint",
            SqlType::Numeric => "numeric",
            SqlType::Decimal => "decimal",
            SqlType::Real => "real",
            SqlType::Float => "float",
            SqlType::Double => "double",
            SqlType::Other => "other",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
