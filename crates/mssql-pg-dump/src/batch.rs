//! Multi-row INSERT framing.
//!
//! Rows are grouped into statements of at most `max_rows` tuples:
//!
//! ```text
//! INSERT INTO T (ID,DES) VALUES (1,'a'),
//! (2,'b');
//! ```

use crate::core::{SqlValue, Table};
use crate::dialect::LiteralStrategy;
use crate::error::{DumpError, Result};

/// Frames rows of one table into batched INSERT statements.
#[derive(Debug)]
pub struct InsertBatcher {
    header: String,
    max_rows: u64,
    rows: u64,
    scratch: String,
}

impl InsertBatcher {
    /// Create a batcher for `header` (`INSERT INTO t (cols) VALUES`).
    ///
    /// A `max_rows` of zero is treated as one.
    pub fn new(header: impl Into<String>, max_rows: usize) -> Self {
        Self {
            header: header.into(),
            max_rows: max_rows.max(1) as u64,
            rows: 0,
            scratch: String::new(),
        }
    }

    /// Batcher for a table's own insert header.
    pub fn for_table(table: &Table, max_rows: usize) -> Self {
        Self::new(table.insert_header(), max_rows)
    }

    /// Append one row, opening or continuing a statement.
    ///
    /// The tuple is rendered completely before anything reaches `out`, so a
    /// failed value leaves `out` unchanged.
    pub fn push_row(&mut self, table: &Table, row: &[SqlValue<'_>], out: &mut String) -> Result<()> {
        if row.len() != table.columns.len() {
            return Err(DumpError::table(
                table.full_name(),
                format!(
                    "row has {} values, expected {}",
                    row.len(),
                    table.columns.len()
                ),
            ));
        }

        self.scratch.clear();
        self.scratch.push('(');
        for (i, (column, value)) in table.columns.iter().zip(row).enumerate() {
            if i > 0 {
                self.scratch.push(',');
            }
            LiteralStrategy::for_type(column.sql_type)
                .write(value, &mut self.scratch)
                .map_err(|e| {
                    DumpError::table(table.full_name(), format!("column {}: {}", column.name, e))
                })?;
        }
        self.scratch.push(')');

        if self.rows % self.max_rows == 0 {
            if self.rows > 0 {
                out.push_str(";\n");
            }
            out.push_str(&self.header);
            out.push(' ');
        } else {
            out.push_str(",\n");
        }
        out.push_str(&self.scratch);
        self.rows += 1;
        Ok(())
    }

    /// Terminate the open statement, if any, and return the row count.
    pub fn finish(&mut self, out: &mut String) -> u64 {
        if self.rows > 0 {
            out.push_str(";\n");
        }
        let rows = self.rows;
        self.rows = 0;
        rows
    }
}
