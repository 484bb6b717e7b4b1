//! Classification gateway
//!
//! Decouples the packet loop from the blocking oracle call. Packet threads
//! `try_send` onto a bounded request queue and wait on a one-shot reply
//! channel with a hard timeout; scoring threads drain the queue in batches
//! and invoke the backend. The packet thread never performs the external
//! call itself and never waits past the deadline.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use thiserror::Error;

use crate::backend::ScoreBackend;
use nxtp_common::ClassifyConfig;

/// One scoring round's result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    /// Oracle answered with a score in 0..=100
    Score(u8),
    /// Deadline passed before an answer arrived
    TimedOut,
    /// Request queue full, gateway shut down, or backend failed
    Unavailable,
}

/// Gateway sizing
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Scoring threads behind the queue
    pub workers: usize,
    /// Bound on pending requests
    pub queue_depth: usize,
    /// Requests coalesced into one backend call
    pub batch_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_depth: 256,
            batch_size: 8,
        }
    }
}

impl From<&ClassifyConfig> for GatewayConfig {
    fn from(config: &ClassifyConfig) -> Self {
        Self {
            workers: config.workers,
            queue_depth: config.queue_depth,
            batch_size: config.batch_size.max(1),
        }
    }
}

/// Gateway startup failures
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// OS refused a scoring thread
    #[error("failed to spawn scoring thread: {0}")]
    Spawn(String),
}

struct ScoreRequest {
    payload: Bytes,
    session_id: u32,
    deadline: Instant,
    reply: Sender<ScoreOutcome>,
}

struct Inner {
    tx: Option<Sender<ScoreRequest>>,
    threads: Mutex<Vec<std::thread::JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Disconnect the queue first so scoring threads see it and exit.
        self.tx.take();
        for handle in self.threads.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

/// Handle to the scoring pool. Clone one per worker; the pool shuts down
/// when the last clone is dropped.
#[derive(Clone)]
pub struct ClassificationGateway {
    inner: Arc<Inner>,
}

impl ClassificationGateway {
    /// Start the scoring pool over `backend`
    pub fn spawn(
        config: GatewayConfig,
        backend: Arc<dyn ScoreBackend>,
    ) -> Result<Self, ClassifyError> {
        let (tx, rx) = bounded(config.queue_depth);
        let mut threads = Vec::with_capacity(config.workers);

        for i in 0..config.workers {
            let rx = rx.clone();
            let backend = backend.clone();
            let batch_size = config.batch_size.max(1);
            let handle = std::thread::Builder::new()
                .name(format!("nxtp-score-{}", i))
                .spawn(move || scoring_loop(rx, backend, batch_size))
                .map_err(|e| ClassifyError::Spawn(e.to_string()))?;
            threads.push(handle);
        }

        tracing::info!(
            workers = config.workers,
            queue_depth = config.queue_depth,
            batch_size = config.batch_size,
            backend = backend.name(),
            "classification gateway started"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                tx: Some(tx),
                threads: Mutex::new(threads),
            }),
        })
    }

    /// Submit one payload for scoring, waiting no later than `deadline`.
    ///
    /// Returns `Unavailable` immediately when the request queue is full and
    /// `TimedOut` when the deadline expires first; the reply arriving late
    /// is discarded by the scoring thread.
    pub fn submit(&self, payload: Bytes, session_id: u32, deadline: Instant) -> ScoreOutcome {
        let Some(tx) = self.inner.tx.as_ref() else {
            return ScoreOutcome::Unavailable;
        };

        let (reply_tx, reply_rx) = bounded(1);
        let request = ScoreRequest {
            payload,
            session_id,
            deadline,
            reply: reply_tx,
        };

        match tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                return ScoreOutcome::Unavailable;
            }
        }

        let timeout = deadline.saturating_duration_since(Instant::now());
        match reply_rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => ScoreOutcome::TimedOut,
            Err(RecvTimeoutError::Disconnected) => ScoreOutcome::Unavailable,
        }
    }
}

/// Scoring thread body: block for one request, opportunistically drain up
/// to a batch, drop requests that already expired, one backend call for the
/// rest.
fn scoring_loop(rx: Receiver<ScoreRequest>, backend: Arc<dyn ScoreBackend>, batch_size: usize) {
    let mut batch: Vec<ScoreRequest> = Vec::with_capacity(batch_size);

    loop {
        match rx.recv() {
            Ok(request) => batch.push(request),
            Err(_) => break, // all gateway handles dropped
        }
        while batch.len() < batch_size {
            match rx.try_recv() {
                Ok(request) => batch.push(request),
                Err(_) => break,
            }
        }

        let now = Instant::now();
        batch.retain(|r| {
            if r.deadline <= now {
                // Caller has already given up; confirm and move on.
                let _ = r.reply.try_send(ScoreOutcome::TimedOut);
                false
            } else {
                true
            }
        });
        if batch.is_empty() {
            continue;
        }

        let payloads: Vec<Bytes> = batch.iter().map(|r| r.payload.clone()).collect();
        match backend.score_batch(&payloads) {
            Ok(scores) if scores.len() == batch.len() => {
                for (request, score) in batch.drain(..).zip(scores) {
                    let _ = request.reply.try_send(ScoreOutcome::Score(score.min(100)));
                }
            }
            Ok(scores) => {
                tracing::warn!(
                    backend = backend.name(),
                    got = scores.len(),
                    want = batch.len(),
                    "oracle returned wrong batch size"
                );
                for request in batch.drain(..) {
                    let _ = request.reply.try_send(ScoreOutcome::Unavailable);
                }
            }
            Err(e) => {
                tracing::warn!(backend = backend.name(), error = %e, "oracle call failed");
                for request in batch.drain(..) {
                    let _ = request.reply.try_send(ScoreOutcome::Unavailable);
                }
            }
        }
    }
}

// session_id rides along for tracing and future affinity; scoring itself is
// payload-only.
impl std::fmt::Debug for ScoreRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreRequest")
            .field("session_id", &self.session_id)
            .field("payload_len", &self.payload.len())
            .field("deadline", &self.deadline)
            .finish()
    }
}
