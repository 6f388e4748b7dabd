//! Type-aware literal rendering.
//!
//! Each [`SqlType`] maps to one [`LiteralStrategy`]; the strategy turns a
//! fetched [`SqlValue`] into literal text for the target script.

use std::io::{self, Read};

use thiserror::Error;

use crate::core::{SqlType, SqlValue};

use super::escape::push_quoted;

/// Bytes read per chunk while hex-encoding binary streams.
pub const HEX_CHUNK_SIZE: usize = 2048;

/// Error rendering a single value.
#[derive(Error, Debug)]
pub enum LiteralError {
    /// The fetched value does not fit the column's strategy
    #[error("cannot render {found} value as {strategy} literal")]
    Incompatible {
        strategy: &'static str,
        found: &'static str,
    },

    /// A binary or character stream failed mid-read
    #[error("failed reading value stream: {0}")]
    Stream(#[from] io::Error),
}

/// How a column's values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralStrategy {
    /// `decode('<hex>', 'hex')`
    Binary,
    /// Escaped and quoted text.
    Character,
    /// Whole character stream, escaped and quoted.
    LargeCharacter,
    /// Canonical date/time text, escaped and quoted.
    TemporalText,
    /// Integer text in single quotes.
    QuotedInteger,
    /// Bare numeric text.
    UnquotedNumeric,
    /// Bare numeric text; NULL decided by the explicit null marker only.
    NullCheckedFloat,
    /// Bare text form of scalars; text is still escaped and quoted.
    Generic,
}

impl LiteralStrategy {
    /// Strategy for a source type code.
    pub fn for_type(sql_type: SqlType) -> Self {
        match sql_type {
            SqlType::Binary | SqlType::VarBinary | SqlType::Blob => LiteralStrategy::Binary,
            SqlType::Clob => LiteralStrategy::LargeCharacter,
            SqlType::Char | SqlType::VarChar | SqlType::LongVarChar => LiteralStrategy::Character,
            SqlType::Time | SqlType::Date | SqlType::Timestamp => LiteralStrategy::TemporalText,
            // smallint is the one integer type written quoted
            SqlType::SmallInt => LiteralStrategy::QuotedInteger,
            SqlType::Integer | SqlType::BigInt | SqlType::Numeric | SqlType::Decimal => {
                LiteralStrategy::UnquotedNumeric
            }
            SqlType::Real | SqlType::Float | SqlType::Double => LiteralStrategy::NullCheckedFloat,
            SqlType::Other => LiteralStrategy::Generic,
        }
    }

    /// Strategy name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            LiteralStrategy::Binary => "binary",
            LiteralStrategy::Character => "character",
            LiteralStrategy::LargeCharacter => "large character",
            LiteralStrategy::TemporalText => "temporal",
            LiteralStrategy::QuotedInteger => "quoted integer",
            LiteralStrategy::UnquotedNumeric => "numeric",
            LiteralStrategy::NullCheckedFloat => "float",
            LiteralStrategy::Generic => "generic",
        }
    }

    /// Append the literal for `value` to `out`.
    ///
    /// On error `out` may hold a partial literal; callers render into a
    /// scratch buffer they can discard.
    pub fn write(&self, value: &SqlValue<'_>, out: &mut String) -> Result<(), LiteralError> {
        if value.is_null() {
            out.push_str("NULL");
            return Ok(());
        }

        match self {
            LiteralStrategy::Binary => match value {
                SqlValue::Bytes(b) => write_binary(b.as_ref(), out),
                SqlValue::Text(s) => write_binary(s.as_bytes(), out),
                _ => Err(self.incompatible(value)),
            },

            LiteralStrategy::LargeCharacter => match value {
                SqlValue::Text(s) => {
                    push_quoted(s, out);
                    Ok(())
                }
                SqlValue::Bytes(b) => {
                    let text = read_character_stream(b.as_ref())?;
                    push_quoted(&text, out);
                    Ok(())
                }
                _ => Err(self.incompatible(value)),
            },

            LiteralStrategy::Character => match value {
                SqlValue::Bytes(_) => Err(self.incompatible(value)),
                SqlValue::Text(s) => {
                    push_quoted(s, out);
                    Ok(())
                }
                other => {
                    push_quoted(&other.to_string(), out);
                    Ok(())
                }
            },

            LiteralStrategy::TemporalText => match value {
                SqlValue::Text(s) => {
                    push_quoted(s, out);
                    Ok(())
                }
                SqlValue::Date(_)
                | SqlValue::Time(_)
                | SqlValue::DateTime(_)
                | SqlValue::DateTimeOffset(_) => {
                    push_quoted(&value.to_string(), out);
                    Ok(())
                }
                _ => Err(self.incompatible(value)),
            },

            LiteralStrategy::QuotedInteger => match value {
                SqlValue::I16(_) | SqlValue::I32(_) | SqlValue::I64(_) => {
                    out.push('\'');
                    out.push_str(&value.to_string());
                    out.push('\'');
                    Ok(())
                }
                _ => Err(self.incompatible(value)),
            },

            LiteralStrategy::UnquotedNumeric => match value {
                SqlValue::I16(_) | SqlValue::I32(_) | SqlValue::I64(_) | SqlValue::Decimal(_) => {
                    out.push_str(&value.to_string());
                    Ok(())
                }
                SqlValue::F32(v) => {
                    write_float(f64::from(*v), &value.to_string(), out);
                    Ok(())
                }
                SqlValue::F64(v) => {
                    write_float(*v, &value.to_string(), out);
                    Ok(())
                }
                _ => Err(self.incompatible(value)),
            },

            LiteralStrategy::NullCheckedFloat => match value {
                SqlValue::F32(v) => {
                    write_float(f64::from(*v), &value.to_string(), out);
                    Ok(())
                }
                SqlValue::F64(v) => {
                    write_float(*v, &value.to_string(), out);
                    Ok(())
                }
                SqlValue::I16(_) | SqlValue::I32(_) | SqlValue::I64(_) | SqlValue::Decimal(_) => {
                    out.push_str(&value.to_string());
                    Ok(())
                }
                _ => Err(self.incompatible(value)),
            },

            LiteralStrategy::Generic => match value {
                SqlValue::Text(s) => {
                    push_quoted(s, out);
                    Ok(())
                }
                SqlValue::Bytes(b) => write_binary(b.as_ref(), out),
                other => {
                    out.push_str(&other.to_string());
                    Ok(())
                }
            },
        }
    }

    fn incompatible(&self, value: &SqlValue<'_>) -> LiteralError {
        LiteralError::Incompatible {
            strategy: self.name(),
            found: value.kind(),
        }
    }
}

/// Render one value of the given source type as literal text.
pub fn serialize(sql_type: SqlType, value: &SqlValue<'_>) -> Result<String, LiteralError> {
    let mut out = String::new();
    LiteralStrategy::for_type(sql_type).write(value, &mut out)?;
    Ok(out)
}

fn write_binary(bytes: &[u8], out: &mut String) -> Result<(), LiteralError> {
    out.push_str("decode('");
    write_hex_stream(bytes, out)?;
    out.push_str("', 'hex')");
    Ok(())
}

/// Hex-encode a byte stream into `out`, [`HEX_CHUNK_SIZE`] bytes at a time.
///
/// Each chunk is encoded into a fixed stack buffer before it is appended.
/// Returns the number of bytes consumed.
pub fn write_hex_stream<R: Read>(mut reader: R, out: &mut String) -> io::Result<u64> {
    let mut buf = [0u8; HEX_CHUNK_SIZE];
    let mut hex_buf = [0u8; HEX_CHUNK_SIZE * 2];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let encoded = &mut hex_buf[..n * 2];
        hex::encode_to_slice(&buf[..n], encoded)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        encoded.make_ascii_uppercase();
        let text = std::str::from_utf8(encoded)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        out.push_str(text);
        total += n as u64;
    }
    Ok(total)
}

/// Read a whole character stream, rejecting invalid UTF-8.
pub fn read_character_stream<R: Read>(mut reader: R) -> io::Result<String> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

/// Finite floats are bare numbers; NaN and infinities use quoted PostgreSQL spellings.
fn write_float(v: f64, text: &str, out: &mut String) {
    if v.is_nan() {
        out.push_str("'NaN'");
    } else if v.is_infinite() {
        out.push_str(if v > 0.0 { "'Infinity'" } else { "'-Infinity'" });
    } else {
        out.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SqlNullType;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::borrow::Cow;
    use std::str::FromStr;

    /// Reader that fails after handing out some bytes.
    struct FailingReader {
        remaining: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection reset"));
            }
            let n = self.remaining.min(buf.len());
            buf[..n].fill(0xab);
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_every_type_has_a_strategy() {
        use SqlType::*;
        let expected = [
            (Binary, LiteralStrategy::Binary),
            (VarBinary, LiteralStrategy::Binary),
            (Blob, LiteralStrategy::Binary),
            (Clob, LiteralStrategy::LargeCharacter),
            (Char, LiteralStrategy::Character),
            (VarChar, LiteralStrategy::Character),
            (LongVarChar, LiteralStrategy::Character),
            (Time, LiteralStrategy::TemporalText),
            (Date, LiteralStrategy::TemporalText),
            (Timestamp, LiteralStrategy::TemporalText),
            (SmallInt, LiteralStrategy::QuotedInteger),
            (Integer, LiteralStrategy::UnquotedNumeric),
            (BigInt, LiteralStrategy::UnquotedNumeric),
            (Numeric, LiteralStrategy::UnquotedNumeric),
            (Decimal, LiteralStrategy::UnquotedNumeric),
            (Real, LiteralStrategy::NullCheckedFloat),
            (Float, LiteralStrategy::NullCheckedFloat),
            (Double, LiteralStrategy::NullCheckedFloat),
            (Other, LiteralStrategy::Generic),
        ];
        for (sql_type, strategy) in expected {
            assert_eq!(LiteralStrategy::for_type(sql_type), strategy, "{}", sql_type);
        }
    }

    #[test]
    fn test_null_is_null_for_every_strategy() {
        for sql_type in [SqlType::Blob, SqlType::Clob, SqlType::VarChar, SqlType::Date, SqlType::SmallInt, SqlType::BigInt, SqlType::Double, SqlType::Other] {
            let v = SqlValue::Null(SqlNullType::String);
            assert_eq!(serialize(sql_type, &v).unwrap(), "NULL");
        }
    }

    #[test]
    fn test_binary_hex() {
        let v = SqlValue::Bytes(Cow::Borrowed(b"Hex String ==;90%$#@^ Byte Array"));
        assert_eq!(
            serialize(SqlType::Blob, &v).unwrap(),
            "decode('48657820537472696E67203D3D3B3930252423405E2042797465204172726179', 'hex')"
        );
    }

    #[test]
    fn test_binary_hex_multibyte_text() {
        let text = "中國全國人大、政協「兩會」綜合報導 Read more:";
        let mut out = String::new();
        write_hex_stream(text.as_bytes(), &mut out).unwrap();
        assert_eq!(
            out,
            "E4B8ADE59C8BE585A8E59C8BE4BABAE5A4A7E38081E694BFE58D94E3808CE585A9E69C83E3808DE7B69CE59088E5A0B1E5B08E2052656164206D6F72653A"
        );
    }

    #[test]
    fn test_empty_binary_is_not_null() {
        let v = SqlValue::Bytes(Cow::Borrowed(&[]));
        assert_eq!(serialize(SqlType::VarBinary, &v).unwrap(), "decode('', 'hex')");
    }

    #[test]
    fn test_hex_stream_spans_chunks() {
        let payload: Vec<u8> = (0..(HEX_CHUNK_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        let mut out = String::new();
        let consumed = write_hex_stream(payload.as_slice(), &mut out).unwrap();
        assert_eq!(consumed, payload.len() as u64);
        assert_eq!(out, hex::encode_upper(&payload));
        assert_eq!(hex::decode(&out).unwrap(), payload);
    }

    #[test]
    fn test_hex_stream_surfaces_read_failure() {
        let mut out = String::new();
        let err = write_hex_stream(FailingReader { remaining: 3000 }, &mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_clob_from_text_and_bytes() {
        let v = SqlValue::Text(Cow::Borrowed("line1\nit's"));
        assert_eq!(serialize(SqlType::Clob, &v).unwrap(), "'line1\\nit''s'");

        let v = SqlValue::Bytes(Cow::Borrowed("漢字".as_bytes()));
        assert_eq!(serialize(SqlType::Clob, &v).unwrap(), "'漢字'");
    }

    #[test]
    fn test_clob_invalid_utf8_is_stream_error() {
        let v = SqlValue::Bytes(Cow::Borrowed(&[0xff, 0xfe, 0x00]));
        let err = serialize(SqlType::Clob, &v).unwrap_err();
        assert!(matches!(err, LiteralError::Stream(_)));
    }

    #[test]
    fn test_character_escapes_and_quotes() {
        let v = SqlValue::from("TestData");
        assert_eq!(serialize(SqlType::VarChar, &v).unwrap(), "'TestData'");

        let v = SqlValue::from("O'Brien\t\\");
        assert_eq!(serialize(SqlType::Char, &v).unwrap(), "'O''Brien\\t\\\\'");
    }

    #[test]
    fn test_temporal_as_quoted_text() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(serialize(SqlType::Date, &SqlValue::Date(date)).unwrap(), "'1970-01-01'");

        let ts = date.and_hms_opt(12, 30, 0).unwrap();
        assert_eq!(
            serialize(SqlType::Timestamp, &SqlValue::DateTime(ts)).unwrap(),
            "'1970-01-01 12:30:00'"
        );
    }

    #[test]
    fn test_smallint_is_quoted() {
        assert_eq!(serialize(SqlType::SmallInt, &SqlValue::I16(7)).unwrap(), "'7'");
        assert_eq!(serialize(SqlType::SmallInt, &SqlValue::I16(-32768)).unwrap(), "'-32768'");
    }

    #[test]
    fn test_wide_integers_and_decimals_are_bare() {
        assert_eq!(serialize(SqlType::Integer, &SqlValue::I32(1)).unwrap(), "1");
        assert_eq!(serialize(SqlType::BigInt, &SqlValue::I64(9_007_199_254_740_993)).unwrap(), "9007199254740993");
        let d = Decimal::from_str("-12.3400").unwrap();
        assert_eq!(serialize(SqlType::Decimal, &SqlValue::Decimal(d)).unwrap(), "-12.3400");
        let max_money = Decimal::from_str("922337203685477.5807").unwrap();
        assert_eq!(
            serialize(SqlType::Decimal, &SqlValue::Decimal(max_money)).unwrap(),
            "922337203685477.5807"
        );
    }

    #[test]
    fn test_float_null_marker_versus_zero() {
        assert_eq!(serialize(SqlType::Double, &SqlValue::Null(SqlNullType::F64)).unwrap(), "NULL");
        assert_eq!(serialize(SqlType::Double, &SqlValue::F64(0.0)).unwrap(), "0");
        assert_eq!(serialize(SqlType::Real, &SqlValue::F32(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn test_float_non_finite() {
        assert_eq!(serialize(SqlType::Double, &SqlValue::F64(f64::NAN)).unwrap(), "'NaN'");
        assert_eq!(serialize(SqlType::Double, &SqlValue::F64(f64::INFINITY)).unwrap(), "'Infinity'");
        assert_eq!(serialize(SqlType::Float, &SqlValue::F64(f64::NEG_INFINITY)).unwrap(), "'-Infinity'");
    }

    #[test]
    fn test_generic_is_bare_text() {
        assert_eq!(serialize(SqlType::Other, &SqlValue::Bool(true)).unwrap(), "true");
    }

    #[test]
    fn test_generic_still_quotes_text() {
        let v = SqlValue::from("x'); DROP TABLE t; --");
        assert_eq!(serialize(SqlType::Other, &v).unwrap(), "'x''); DROP TABLE t; --'");

        let v = SqlValue::Bytes(Cow::Borrowed(&[0x01, 0xff]));
        assert_eq!(serialize(SqlType::Other, &v).unwrap(), "decode('01FF', 'hex')");
    }

    #[test]
    fn test_server_converted_types_are_quoted() {
        use crate::core::Column;

        let cases = [
            ("sql_variant", 0, "x'); DROP TABLE t; --", "'x''); DROP TABLE t; --'"),
            ("hierarchyid", 892, "/1/3/", "'/1/3/'"),
            ("geometry", -1, "POINT (1 2)", "'POINT (1 2)'"),
            ("geography", -1, "LINESTRING (0 0, 1 1)", "'LINESTRING (0 0, 1 1)'"),
        ];
        for (data_type, max_length, text, expected) in cases {
            let column = Column::from_mssql("C", data_type, max_length, 1);
            assert_eq!(
                serialize(column.sql_type, &SqlValue::from(text)).unwrap(),
                expected,
                "{}",
                data_type
            );
        }
    }

    #[test]
    fn test_incompatible_value_is_error() {
        let err = serialize(SqlType::Integer, &SqlValue::from("1; DROP TABLE t")).unwrap_err();
        assert_eq!(err.to_string(), "cannot render text value as numeric literal");

        assert!(serialize(SqlType::SmallInt, &SqlValue::F64(1.0)).is_err());
        assert!(serialize(SqlType::Blob, &SqlValue::I32(1)).is_err());
        assert!(serialize(SqlType::Date, &SqlValue::I32(1)).is_err());
    }
}
