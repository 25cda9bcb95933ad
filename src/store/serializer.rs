//! Single-writer queue in front of the persisted meeting document.
//!
//! Concurrent handlers (transcript arrival, participant joins, switch
//! orchestration, API edits) all mutate the same JSON file. Operations are
//! executed strictly in submission order by one worker task; each operation
//! sees the result of everything that completed before it. Reads are served
//! from a short-lived cache and degrade to an empty document rather than
//! failing, since losing in-memory session state is worse than a momentary
//! empty view.

use super::document::MeetingDocument;
use crate::config::StoreConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store worker is no longer running")]
    WorkerGone,
    #[error("failed to access meeting document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse meeting document: {0}")]
    Parse(serde_json::Error),
    #[error("failed to encode meeting document: {0}")]
    Encode(serde_json::Error),
}

/// An operation receives the current document and returns the updated
/// document to persist, or `None` for a read-only no-op.
pub type StoreOp = Box<dyn FnOnce(MeetingDocument) -> Option<MeetingDocument> + Send + 'static>;

struct StoreJob {
    op: StoreOp,
    reply: oneshot::Sender<Result<MeetingDocument, StoreError>>,
}

struct Cached {
    doc: MeetingDocument,
    fetched_at: Instant,
}

#[derive(Clone)]
pub struct StoreSerializer {
    tx: mpsc::UnboundedSender<StoreJob>,
    cache: Arc<Mutex<Option<Cached>>>,
    path: PathBuf,
    ttl: Duration,
    retries: u32,
    backoff: Duration,
}

impl StoreSerializer {
    pub fn new(path: PathBuf, config: &StoreConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = Arc::new(Mutex::new(None));

        let worker = Worker {
            rx,
            cache: Arc::clone(&cache),
            path: path.clone(),
            retries: config.read_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        };
        tokio::spawn(worker.run());

        Self {
            tx,
            cache,
            path,
            ttl: Duration::from_millis(config.cache_ttl_ms),
            retries: config.read_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Read the document: cached copy if fresh, otherwise disk with retries,
    /// degrading to an empty document. Always returns a deep copy.
    pub async fn read(&self) -> MeetingDocument {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return cached.doc.clone();
            }
        }

        match load_with_retries(&self.path, self.retries, self.backoff).await {
            Ok(doc) => {
                *cache = Some(Cached {
                    doc: doc.clone(),
                    fetched_at: Instant::now(),
                });
                doc
            }
            Err(e) => {
                warn!(
                    "Meeting document unreadable after {} attempts, serving empty view: {}",
                    self.retries, e
                );
                MeetingDocument::default()
            }
        }
    }

    /// Enqueue an operation. Resolves with the document as it stood after
    /// the operation (and its persistence) completed.
    pub async fn schedule<F>(&self, op: F) -> Result<MeetingDocument, StoreError>
    where
        F: FnOnce(MeetingDocument) -> Option<MeetingDocument> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = StoreJob {
            op: Box::new(op),
            reply: reply_tx,
        };

        self.tx.send(job).map_err(|_| StoreError::WorkerGone)?;
        reply_rx.await.map_err(|_| StoreError::WorkerGone)?
    }

    /// Replace the whole document.
    pub async fn write(&self, doc: MeetingDocument) -> Result<(), StoreError> {
        self.schedule(move |_| Some(doc)).await.map(|_| ())
    }
}

struct Worker {
    rx: mpsc::UnboundedReceiver<StoreJob>,
    cache: Arc<Mutex<Option<Cached>>>,
    path: PathBuf,
    retries: u32,
    backoff: Duration,
}

impl Worker {
    async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            let current = self.current_document().await;
            let result = match (job.op)(current.clone()) {
                Some(updated) => match self.persist(&updated).await {
                    Ok(()) => Ok(updated),
                    Err(e) => {
                        error!("Failed to persist meeting document: {}", e);
                        Err(e)
                    }
                },
                None => Ok(current),
            };

            // The submitter may have given up waiting; that is fine.
            let _ = job.reply.send(result);
        }
        debug!("Store worker shutting down");
    }

    /// The worker is the only writer, so a populated cache is authoritative
    /// regardless of age.
    async fn current_document(&self) -> MeetingDocument {
        if let Some(cached) = self.cache.lock().await.as_ref() {
            return cached.doc.clone();
        }

        match load_with_retries(&self.path, self.retries, self.backoff).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "Meeting document unreadable before write, starting from empty: {}",
                    e
                );
                MeetingDocument::default()
            }
        }
    }

    /// Cache update plus disk write; the next queued operation only starts
    /// once both are done.
    async fn persist(&self, doc: &MeetingDocument) -> Result<(), StoreError> {
        {
            let mut cache = self.cache.lock().await;
            *cache = Some(Cached {
                doc: doc.clone(),
                fetched_at: Instant::now(),
            });
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(doc).map_err(StoreError::Encode)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

async fn load_with_retries(
    path: &Path,
    retries: u32,
    backoff: Duration,
) -> Result<MeetingDocument, StoreError> {
    let mut last_error = None;

    for attempt in 1..=retries.max(1) {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(doc) => return Ok(doc),
                Err(e) => {
                    debug!(
                        "Parse failure on meeting document (attempt {}/{}): {}",
                        attempt, retries, e
                    );
                    last_error = Some(StoreError::Parse(e));
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // First run: no document yet.
                return Ok(MeetingDocument::default());
            }
            Err(e) => {
                debug!(
                    "Read failure on meeting document (attempt {}/{}): {}",
                    attempt, retries, e
                );
                last_error = Some(StoreError::Io(e));
            }
        }

        if attempt < retries {
            tokio::time::sleep(backoff).await;
        }
    }

    Err(last_error.unwrap_or(StoreError::WorkerGone))
}
