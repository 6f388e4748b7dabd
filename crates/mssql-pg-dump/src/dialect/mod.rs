//! Target dialect rendering.
//!
//! - [`escape`]: string literal escaping
//! - [`literal`]: per-type literal strategies
//!
//! # Usage
//!
//! ```rust
//! use mssql_pg_dump::core::{SqlType, SqlValue};
//! use mssql_pg_dump::dialect::serialize;
//!
//! let literal = serialize(SqlType::VarChar, &SqlValue::from("it's")).unwrap();
//! assert_eq!(literal, "'it''s'");
//! ```

mod escape;
mod literal;

pub use escape::{escape, escape_into, push_quoted};
pub use literal::{
    read_character_stream, serialize, write_hex_stream, LiteralError, LiteralStrategy,
    HEX_CHUNK_SIZE,
};
