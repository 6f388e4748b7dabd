//! Export orchestrator - main workflow coordinator.
//!
//! A run moves through fixed phases:
//!
//! ```text
//! Init -> SchemaResolved -> ConstraintsDeferred -> TriggersDisabled -> InTransaction
//!      -> Tables -> Committed -> TriggersEnabled -> ConstraintsRestored
//!      -> CleanupEmitted -> Done
//! ```
//!
//! Table failures never skip the closing phases; cancellation does.

mod table;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, TableErrorPolicy};
use crate::core::{Database, SourceFactory, SourceReader, Table};
use crate::error::{DumpError, Result};
use crate::introspect::{read_database, ExclusionPolicy};
use crate::output::{self, ScriptSender, ScriptWriter};

use table::{export_table, TableOptions};

/// Phase of an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPhase {
    Init,
    SchemaResolved,
    ConstraintsDeferred,
    TriggersDisabled,
    InTransaction,
    Tables,
    Committed,
    TriggersEnabled,
    ConstraintsRestored,
    CleanupEmitted,
    Done,
}

/// Export orchestrator.
pub struct Orchestrator {
    config: Config,
    factory: Arc<dyn SourceFactory>,
}

/// Per-table line of the run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    /// Table name as written in the script.
    pub name: String,

    /// Rows written.
    pub rows: u64,

    /// Time spent on the table in seconds.
    pub duration_seconds: f64,

    /// Whether the table was exported completely.
    pub success: bool,
}

/// Result of an export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: "completed" or "failed".
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the export started.
    pub started_at: DateTime<Utc>,

    /// When the export completed.
    pub completed_at: DateTime<Utc>,

    /// Tables selected for export.
    pub tables_total: usize,

    /// Tables exported completely.
    pub tables_exported: usize,

    /// Tables that failed.
    pub tables_failed: usize,

    /// Tables not attempted after an abort.
    pub tables_skipped: usize,

    /// Catalog objects left out by the exclusion rules.
    pub tables_excluded: usize,

    /// Total rows written.
    pub rows_exported: u64,

    /// Average throughput (rows/second).
    pub rows_per_second: u64,

    /// Script size in bytes.
    pub bytes_written: u64,

    /// Per-table row counts in export order.
    pub tables: Vec<TableSummary>,

    /// List of failed table names.
    pub failed_tables: Vec<String>,
}

impl ExportResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether every selected table was exported.
    pub fn is_success(&self) -> bool {
        self.failed_tables.is_empty() && self.tables_skipped == 0
    }

    /// Turn a run with failed tables into [`DumpError::Incomplete`].
    pub fn into_result(self) -> Result<Self> {
        if self.failed_tables.is_empty() {
            Ok(self)
        } else {
            Err(DumpError::Incomplete(self.failed_tables))
        }
    }
}

/// Outcome of a source connectivity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Whether a connection could be opened.
    pub source_connected: bool,

    /// Connect plus catalog round trip in milliseconds.
    pub source_latency_ms: u64,

    /// Connection or query error, if any.
    pub source_error: Option<String>,

    /// Catalog objects visible to the configured user.
    pub tables_visible: Option<usize>,

    /// Overall verdict.
    pub healthy: bool,
}

/// Source and table model resolved before any output is opened.
struct Prepared {
    source: Arc<dyn SourceReader>,
    database: Database,
    cleanup: String,
}

/// What the script body produced.
struct ScriptReport {
    tables: Vec<TableSummary>,
    failed: Vec<String>,
    skipped: usize,
}

impl Orchestrator {
    /// Create a new orchestrator over an injected connection factory.
    pub fn new(config: Config, factory: Arc<dyn SourceFactory>) -> Self {
        Self { config, factory }
    }

    /// Configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connect and read the table model without producing output.
    pub async fn inspect(&self) -> Result<Database> {
        let policy = ExclusionPolicy::from_config(&self.config)?;
        let source = self.factory.connect().await?;
        let database = read_database(source.as_ref(), &policy).await;
        source.close().await;
        database
    }

    /// Test the source connection.
    pub async fn health_check(&self) -> Result<HealthCheckResult> {
        let started = Instant::now();
        let outcome = match self.factory.connect().await {
            Ok(source) => {
                let listed = source.list_tables().await;
                source.close().await;
                listed.map(|tables| tables.len())
            }
            Err(e) => Err(e),
        };
        let source_latency_ms = started.elapsed().as_millis() as u64;

        Ok(match outcome {
            Ok(count) => HealthCheckResult {
                source_connected: true,
                source_latency_ms,
                source_error: None,
                tables_visible: Some(count),
                healthy: true,
            },
            Err(e) => HealthCheckResult {
                source_connected: false,
                source_latency_ms,
                source_error: Some(e.to_string()),
                tables_visible: None,
                healthy: false,
            },
        })
    }

    /// Run the export into the configured destination.
    ///
    /// The output file is only created once configuration, connection and
    /// introspection have succeeded.
    pub async fn run(&self, cancel: CancellationToken) -> Result<ExportResult> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let prepared = self.prepare(&cancel).await?;
        let sink = match output::open_sink(self.config.export.output_path.as_deref()).await {
            Ok(sink) => sink,
            Err(e) => {
                prepared.source.close().await;
                return Err(e);
            }
        };
        let (result, _) = self.export(prepared, sink, started_at, timer, &cancel).await?;
        Ok(result)
    }

    /// Run the export into `sink` and hand the sink back once flushed.
    pub async fn run_into<W>(&self, sink: W, cancel: CancellationToken) -> Result<(ExportResult, W)>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let started_at = Utc::now();
        let timer = Instant::now();
        let prepared = self.prepare(&cancel).await?;
        self.export(prepared, sink, started_at, timer, &cancel).await
    }

    /// Resolve configuration, connect and read the table model.
    async fn prepare(&self, cancel: &CancellationToken) -> Result<Prepared> {
        debug!("Phase: {:?}", ExportPhase::Init);

        // Resolve everything that can fail on configuration before touching the source.
        let policy = ExclusionPolicy::from_config(&self.config)?;
        let cleanup = output::load_cleanup(self.config.export.cleanup_path.as_deref()).await?;

        let source = self.factory.connect().await?;
        let database = match read_database(source.as_ref(), &policy).await {
            Ok(db) => db,
            Err(e) => {
                source.close().await;
                return Err(e);
            }
        };
        debug!("Phase: {:?}", ExportPhase::SchemaResolved);

        if cancel.is_cancelled() {
            source.close().await;
            return Err(DumpError::Cancelled);
        }

        Ok(Prepared {
            source,
            database,
            cleanup,
        })
    }

    /// Write the script for a prepared run into `sink`.
    async fn export<W>(
        &self,
        prepared: Prepared,
        sink: W,
        started_at: DateTime<Utc>,
        timer: Instant,
        cancel: &CancellationToken,
    ) -> Result<(ExportResult, W)>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let Prepared {
            source,
            database,
            cleanup,
        } = prepared;
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting export run: {}", run_id);

        let writer = ScriptWriter::spawn(sink, self.config.export.read_ahead);
        let sender = writer.sender();
        let script = self
            .write_script(source.as_ref(), &database, &cleanup, &sender, cancel)
            .await;
        drop(sender);

        let written = writer.finish().await;
        source.close().await;

        // A broken sink explains any send failure, so report it first.
        let (sink, bytes_written) = written?;
        let report = script?;

        let completed_at = Utc::now();
        let duration_seconds = timer.elapsed().as_secs_f64();
        let rows_exported: u64 = report.tables.iter().map(|t| t.rows).sum();
        let rows_per_second = if duration_seconds > 0.0 {
            (rows_exported as f64 / duration_seconds) as u64
        } else {
            0
        };

        let tables_failed = report.failed.len();
        let result = ExportResult {
            run_id,
            status: if tables_failed > 0 { "failed" } else { "completed" }.to_string(),
            duration_seconds,
            started_at,
            completed_at,
            tables_total: database.exported_tables().count(),
            tables_exported: report.tables.iter().filter(|t| t.success).count(),
            tables_failed,
            tables_skipped: report.skipped,
            tables_excluded: database.excluded_count(),
            rows_exported,
            rows_per_second,
            bytes_written,
            tables: report.tables,
            failed_tables: report.failed,
        };

        info!(
            "Export {}: {}/{} tables, {} rows in {:.1}s ({} rows/s)",
            result.status,
            result.tables_exported,
            result.tables_total,
            result.rows_exported,
            result.duration_seconds,
            result.rows_per_second
        );
        debug!("Phase: {:?}", ExportPhase::Done);

        Ok((result, sink))
    }

    /// Produce the whole script through `sender`.
    async fn write_script(
        &self,
        source: &dyn SourceReader,
        database: &Database,
        cleanup: &str,
        sender: &ScriptSender,
        cancel: &CancellationToken,
    ) -> Result<ScriptReport> {
        let tables: Vec<&Table> = database.exported_tables().collect();
        let options = TableOptions {
            truncate: self.config.export.truncate_tables,
            max_rows_per_insert: self.config.export.max_rows_per_insert,
            fetch_size: self.config.export.fetch_size,
        };

        sender.send("SET CONSTRAINTS ALL DEFERRED;\n".to_string()).await?;
        debug!("Phase: {:?}", ExportPhase::ConstraintsDeferred);
        sender.send(trigger_statements(&tables, "DISABLE")).await?;
        debug!("Phase: {:?}", ExportPhase::TriggersDisabled);
        sender.send("BEGIN;\n".to_string()).await?;
        debug!("Phase: {:?}", ExportPhase::InTransaction);

        let mut report = ScriptReport {
            tables: Vec::with_capacity(tables.len()),
            failed: Vec::new(),
            skipped: 0,
        };

        for (i, table) in tables.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Export cancelled before {}", table.name);
                return Err(DumpError::Cancelled);
            }

            let outcome = export_table(source, table, options, sender, cancel).await;
            let success = outcome.result.is_ok();
            report.tables.push(TableSummary {
                name: table.name.clone(),
                rows: outcome.rows,
                duration_seconds: outcome.duration.as_secs_f64(),
                success,
            });

            match outcome.result {
                Ok(()) => {}
                Err(DumpError::Cancelled) => {
                    warn!("Export cancelled during {}", table.name);
                    return Err(DumpError::Cancelled);
                }
                Err(e @ DumpError::Output(_)) => return Err(e),
                Err(e) => {
                    error!("Table {} failed after {} rows: {}", table.name, outcome.rows, e);
                    report.failed.push(table.name.clone());
                    if self.config.export.on_table_error == TableErrorPolicy::Abort {
                        report.skipped = tables.len() - i - 1;
                        warn!(
                            "Aborting export, {} remaining tables not exported",
                            report.skipped
                        );
                        break;
                    }
                }
            }
        }
        debug!("Phase: {:?}", ExportPhase::Tables);

        sender.send("COMMIT;\n".to_string()).await?;
        debug!("Phase: {:?}", ExportPhase::Committed);
        sender.send(trigger_statements(&tables, "ENABLE")).await?;
        debug!("Phase: {:?}", ExportPhase::TriggersEnabled);
        sender.send("SET CONSTRAINTS ALL IMMEDIATE;\n".to_string()).await?;
        debug!("Phase: {:?}", ExportPhase::ConstraintsRestored);
        sender.send(cleanup.to_string()).await?;
        debug!("Phase: {:?}", ExportPhase::CleanupEmitted);

        Ok(report)
    }
}

/// `ALTER TABLE <t> <action> TRIGGER ALL;` for each table.
fn trigger_statements(tables: &[&Table], action: &str) -> String {
    tables
        .iter()
        .map(|t| format!("ALTER TABLE {} {} TRIGGER ALL;\n", t.name, action))
        .collect()
}
