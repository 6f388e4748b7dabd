//! In-memory source used by unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::{
    Batch, ColumnEntry, Row, SourceFactory, SourceReader, Table, TableEntry, TableKind,
};
use crate::error::{DumpError, Result};

/// One table held by [`MemorySource`].
#[derive(Debug, Clone)]
pub(crate) struct MemoryTable {
    pub entry: TableEntry,
    pub columns: Vec<ColumnEntry>,
    pub rows: Vec<Row>,
    /// Fail the cursor after this many rows.
    pub fail_after: Option<usize>,
}

impl MemoryTable {
    pub fn new(schema: &str, name: &str, columns: &[(&str, &str)]) -> Self {
        Self {
            entry: TableEntry {
                schema: schema.to_string(),
                name: name.to_string(),
                kind: TableKind::BaseTable,
            },
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, (name, data_type))| ColumnEntry {
                    name: name.to_string(),
                    data_type: data_type.to_string(),
                    max_length: 0,
                    ordinal_pos: i as i32 + 1,
                })
                .collect(),
            rows: Vec::new(),
            fail_after: None,
        }
    }

    pub fn kind(mut self, kind: TableKind) -> Self {
        self.entry.kind = kind;
        self
    }

    pub fn rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

/// A [`SourceReader`] over fixed tables.
#[derive(Debug, Default)]
pub(crate) struct MemorySource {
    pub tables: Vec<MemoryTable>,
    pub column_queries: std::sync::Mutex<Vec<String>>,
    pub closed: AtomicBool,
}

impl MemorySource {
    pub fn new(tables: Vec<MemoryTable>) -> Self {
        Self {
            tables,
            ..Default::default()
        }
    }

    fn find(&self, schema: &str, name: &str) -> Option<&MemoryTable> {
        self.tables
            .iter()
            .find(|t| t.entry.schema == schema && t.entry.name == name)
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn list_tables(&self) -> Result<Vec<TableEntry>> {
        Ok(self.tables.iter().map(|t| t.entry.clone()).collect())
    }

    async fn list_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnEntry>> {
        self.column_queries
            .lock()
            .unwrap()
            .push(format!("{}.{}", schema, table));
        self.find(schema, table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| DumpError::Introspection(format!("no table {}.{}", schema, table)))
    }

    fn read_table(&self, table: &Table, fetch_size: usize) -> mpsc::Receiver<Result<Batch>> {
        let (tx, rx) = mpsc::channel(4);
        let found = self.find(&table.schema, &table.name).cloned();
        let name = table.full_name();

        tokio::spawn(async move {
            let Some(source) = found else {
                let _ = tx
                    .send(Err(DumpError::table(name, "table not found")))
                    .await;
                return;
            };
            let limit = source.fail_after.unwrap_or(usize::MAX);
            let rows: Vec<Row> = source.rows.into_iter().take(limit).collect();
            for chunk in rows.chunks(fetch_size) {
                if tx.send(Ok(Batch::new(chunk.to_vec()))).await.is_err() {
                    return;
                }
            }
            if source.fail_after.is_some() {
                let _ = tx
                    .send(Err(DumpError::table(name, "simulated read failure")))
                    .await;
            }
        });

        rx
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out the same [`MemorySource`] on every connect.
pub(crate) struct MemoryFactory {
    pub source: Arc<MemorySource>,
}

impl MemoryFactory {
    pub fn new(tables: Vec<MemoryTable>) -> Self {
        Self {
            source: Arc::new(MemorySource::new(tables)),
        }
    }
}

#[async_trait]
impl SourceFactory for MemoryFactory {
    async fn connect(&self) -> Result<Arc<dyn SourceReader>> {
        let source: Arc<dyn SourceReader> = self.source.clone();
        Ok(source)
    }
}

/// A factory whose connect always fails.
pub(crate) struct UnreachableFactory;

#[async_trait]
impl SourceFactory for UnreachableFactory {
    async fn connect(&self) -> Result<Arc<dyn SourceReader>> {
        Err(DumpError::pool("connection refused", "connecting to source"))
    }
}
