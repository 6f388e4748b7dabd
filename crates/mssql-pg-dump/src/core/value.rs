//! Fetched column values.
//!
//! A NULL is always an explicit [`SqlValue::Null`] produced by the driver from
//! the source's was-null information, never inferred from a zero-like value.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Type hint carried by NULL values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    Bytes,
    Uuid,
    Decimal,
    DateTime,
    DateTimeOffset,
    Date,
    Time,
}

/// SQL value enum for type-safe row handling.
///
/// Uses `Cow` for string and byte data so drivers can hand out borrowed
/// buffers; rows that cross a channel are converted with [`SqlValue::into_owned`].
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    /// NULL with type hint.
    Null(SqlNullType),

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint, tinyint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real).
    F32(f32),

    /// 64-bit floating point (float).
    F64(f64),

    /// Character data.
    Text(Cow<'a, str>),

    /// Binary data.
    Bytes(Cow<'a, [u8]>),

    /// UUID/GUID value.
    Uuid(Uuid),

    /// Decimal value with arbitrary precision.
    Decimal(Decimal),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),
}

impl<'a> SqlValue<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> SqlValue<'static> {
        match self {
            SqlValue::Null(t) => SqlValue::Null(t),
            SqlValue::Bool(v) => SqlValue::Bool(v),
            SqlValue::I16(v) => SqlValue::I16(v),
            SqlValue::I32(v) => SqlValue::I32(v),
            SqlValue::I64(v) => SqlValue::I64(v),
            SqlValue::F32(v) => SqlValue::F32(v),
            SqlValue::F64(v) => SqlValue::F64(v),
            SqlValue::Text(v) => SqlValue::Text(Cow::Owned(v.into_owned())),
            SqlValue::Bytes(v) => SqlValue::Bytes(Cow::Owned(v.into_owned())),
            SqlValue::Uuid(v) => SqlValue::Uuid(v),
            SqlValue::Decimal(v) => SqlValue::Decimal(v),
            SqlValue::DateTime(v) => SqlValue::DateTime(v),
            SqlValue::DateTimeOffset(v) => SqlValue::DateTimeOffset(v),
            SqlValue::Date(v) => SqlValue::Date(v),
            SqlValue::Time(v) => SqlValue::Time(v),
        }
    }

    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Short variant name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null(_) => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::I16(_) => "i16",
            SqlValue::I32(_) => "i32",
            SqlValue::I64(_) => "i64",
            SqlValue::F32(_) => "f32",
            SqlValue::F64(_) => "f64",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::Uuid(_) => "uuid",
            SqlValue::Decimal(_) => "decimal",
            SqlValue::DateTime(_) => "datetime",
            SqlValue::DateTimeOffset(_) => "datetimeoffset",
            SqlValue::Date(_) => "date",
            SqlValue::Time(_) => "time",
        }
    }
}

/// Canonical text form of a value, as embedded in literals.
impl fmt::Display for SqlValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null(_) => f.write_str("NULL"),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::I16(v) => write!(f, "{}", v),
            SqlValue::I32(v) => write!(f, "{}", v),
            SqlValue::I64(v) => write!(f, "{}", v),
            SqlValue::F32(v) => write!(f, "{}", v),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::Text(v) => f.write_str(v),
            SqlValue::Bytes(v) => f.write_str(&hex::encode_upper(v.as_ref())),
            SqlValue::Uuid(v) => write!(f, "{}", v.hyphenated()),
            SqlValue::Decimal(v) => write!(f, "{}", v),
            SqlValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
            SqlValue::DateTimeOffset(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f%:z")),
            SqlValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            SqlValue::Time(v) => write!(f, "{}", v.format("%H:%M:%S%.f")),
        }
    }
}

impl From<i16> for SqlValue<'static> {
    fn from(v: i16) -> Self {
        SqlValue::I16(v)
    }
}

impl From<i32> for SqlValue<'static> {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue<'static> {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue<'static> {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue<'static> {
    fn from(v: String) -> Self {
        SqlValue::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a str> for SqlValue<'a> {
    fn from(v: &'a str) -> Self {
        SqlValue::Text(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue<'static> {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(Cow::Owned(v))
    }
}

impl From<NaiveDate> for SqlValue<'static> {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveDateTime> for SqlValue<'static> {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

/// One fetched row, values in the table's column order.
pub type Row = Vec<SqlValue<'static>>;

/// A batch of rows from a row cursor.
///
/// Batches arrive over a bounded channel, so a slow consumer applies
/// backpressure to the reader.
#[derive(Debug, Default)]
pub struct Batch {
    /// Rows in cursor order (owned for channel transfer).
    pub rows: Vec<Row>,
}

impl Batch {
    /// Create a new batch with the given rows.
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Get the number of rows in this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_into_owned() {
        let source = String::from("hello");
        let borrowed: SqlValue<'_> = SqlValue::Text(Cow::Borrowed(&source));
        let owned: SqlValue<'static> = borrowed.into_owned();
        assert_eq!(owned, SqlValue::Text(Cow::Owned("hello".to_string())));
    }

    #[test]
    fn test_sql_value_is_null() {
        assert!(SqlValue::<'static>::Null(SqlNullType::F64).is_null());
        assert!(!SqlValue::F64(0.0).is_null());
    }

    #[test]
    fn test_display_canonical_forms() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(SqlValue::Date(date).to_string(), "1970-01-01");

        let ts = date.and_hms_milli_opt(13, 5, 9, 250).unwrap();
        assert_eq!(SqlValue::DateTime(ts).to_string(), "1970-01-01 13:05:09.250");

        let midnight = date.and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(SqlValue::DateTime(midnight).to_string(), "1970-01-01 00:00:00");

        assert_eq!(SqlValue::Bool(true).to_string(), "true");
        assert_eq!(SqlValue::from(vec![0xde, 0xad]).to_string(), "DEAD");
        assert_eq!(SqlValue::Uuid(Uuid::nil()).to_string(), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_batch_len() {
        let batch = Batch::new(vec![vec![SqlValue::I32(1)], vec![SqlValue::I32(2)]]);
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
        assert!(Batch::default().is_empty());
    }
}
