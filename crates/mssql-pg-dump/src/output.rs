//! Script output: sink selection and the single writer task.
//!
//! The exporter renders complete fragments and hands them to a bounded
//! channel; one spawned task owns the sink and writes fragments in order.

use std::path::Path;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{DumpError, Result};

/// Cleanup statements appended when no `cleanup_path` is configured.
pub const DEFAULT_CLEANUP: &str = include_str!("../assets/cleanup.sql");

/// Boxed async sink for the generated script.
pub type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Open the script destination: a file when `path` is set, stdout otherwise.
pub async fn open_sink(path: Option<&Path>) -> Result<Sink> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::create(path).await.map_err(|e| {
                DumpError::Output(format!("cannot create {}: {}", path.display(), e))
            })?;
            debug!("Writing script to {}", path.display());
            let sink: Sink = Box::new(BufWriter::new(file));
            Ok(sink)
        }
        None => {
            debug!("Writing script to stdout");
            let sink: Sink = Box::new(BufWriter::new(tokio::io::stdout()));
            Ok(sink)
        }
    }
}

/// Load the cleanup fragment, falling back to the built-in one.
pub async fn load_cleanup(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
            DumpError::Config(format!("cannot read cleanup file {}: {}", path.display(), e))
        }),
        None => Ok(DEFAULT_CLEANUP.to_string()),
    }
}

/// Cloneable handle for sending fragments to the writer.
#[derive(Debug, Clone)]
pub struct ScriptSender {
    tx: mpsc::Sender<String>,
}

impl ScriptSender {
    /// Queue a fragment, waiting while the channel is full.
    pub async fn send(&self, fragment: String) -> Result<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        self.tx
            .send(fragment)
            .await
            .map_err(|_| DumpError::Output("script writer stopped".into()))
    }
}

/// The writer task and its sending half.
pub struct ScriptWriter<W> {
    sender: ScriptSender,
    handle: JoinHandle<Result<(W, u64)>>,
}

impl<W> ScriptWriter<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    /// Spawn the writer over `sink` with a queue of `capacity` fragments.
    pub fn spawn(sink: W, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));

        let handle = tokio::spawn(async move {
            let mut sink = sink;
            let mut written = 0u64;
            while let Some(fragment) = rx.recv().await {
                sink.write_all(fragment.as_bytes()).await?;
                written += fragment.len() as u64;
            }
            sink.flush().await?;
            debug!("Script writer flushed {} bytes", written);
            Ok::<_, DumpError>((sink, written))
        });

        Self {
            sender: ScriptSender { tx },
            handle,
        }
    }

    /// A sender for the producer side.
    pub fn sender(&self) -> ScriptSender {
        self.sender.clone()
    }

    /// Close the queue and wait for the writer to flush.
    ///
    /// Every other [`ScriptSender`] must be dropped first or this waits forever.
    pub async fn finish(self) -> Result<(W, u64)> {
        drop(self.sender);
        self.handle
            .await
            .map_err(|e| DumpError::Output(format!("script writer task failed: {}", e)))?
    }
}
