//! Export of a single table: optional truncate, then batched inserts.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::batch::InsertBatcher;
use crate::core::{Batch, SourceReader, Table};
use crate::error::{DumpError, Result};
use crate::output::ScriptSender;

/// Per-table settings taken from the export configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableOptions {
    pub truncate: bool,
    pub max_rows_per_insert: usize,
    pub fetch_size: usize,
}

/// What happened to one table.
#[derive(Debug)]
pub(crate) struct TableOutcome {
    /// Rows written to the script (also counts rows written before a failure).
    pub rows: u64,
    pub duration: Duration,
    pub result: Result<()>,
}

/// Stream every row of `table` into the script.
///
/// Whatever the outcome, an INSERT left open by the batcher is terminated
/// before returning, so the script stays well-formed.
pub(crate) async fn export_table(
    source: &dyn SourceReader,
    table: &Table,
    options: TableOptions,
    sender: &ScriptSender,
    cancel: &CancellationToken,
) -> TableOutcome {
    let started = Instant::now();
    let mut out = String::new();
    if options.truncate {
        out.push_str(&format!("DELETE FROM {};\n", table.name));
    }

    let mut batcher = InsertBatcher::for_table(table, options.max_rows_per_insert);
    let mut cursor = source.read_table(table, options.fetch_size);
    let mut batches = 0usize;

    let result = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Err(DumpError::Cancelled),
            next = cursor.recv() => next,
        };

        match next {
            None => break Ok(()),
            Some(Err(e)) => break Err(e),
            Some(Ok(batch)) => {
                batches += 1;
                if let Err(e) = push_batch(&mut batcher, table, &batch, &mut out) {
                    break Err(e);
                }
                if let Err(e) = sender.send(std::mem::take(&mut out)).await {
                    break Err(e);
                }
            }
        }
    };

    // Dropping the cursor stops the reader task early on failure.
    drop(cursor);

    let rows = batcher.finish(&mut out);
    let flushed = sender.send(out).await;
    let result = result.and(flushed);

    let duration = started.elapsed();
    debug!(
        "{}: {} batches read in {:.3}s",
        table.full_name(),
        batches,
        duration.as_secs_f64()
    );
    if result.is_ok() {
        info!("Exported {}. {} rows.", table.name, rows);
    }

    TableOutcome {
        rows,
        duration,
        result,
    }
}

fn push_batch(
    batcher: &mut InsertBatcher,
    table: &Table,
    batch: &Batch,
    out: &mut String,
) -> Result<()> {
    for row in &batch.rows {
        batcher.push_row(table, row, out)?;
    }
    Ok(())
}
