//! Worker scheduler and forwarding engine
//!
//! One worker thread per queue set, shared-nothing. Queue assignment is a
//! deterministic round-robin: every queue lands on exactly one worker, so
//! no two workers ever poll the same queue. The worker loop runs to
//! completion per packet and checks the cancellation token once per
//! iteration; on cancellation whatever is in flight is transmitted or
//! reclaimed before the thread exits.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;

use nxtp_classify::{ClassificationGateway, FallbackPolicy, ScoreCache, ScoreOutcome};
use nxtp_common::NxtpConfig;
use nxtp_wire::parse_frame;

use crate::buffer::PacketBuffer;
use crate::cancel::CancelToken;
use crate::decide::{decide, Verdict};
use crate::queue::{PacketSink, PacketSource, QueueId};
use crate::stats::{StatsAggregator, WorkerStats};
use crate::MAX_BURST;

/// Engine failures
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start` called on a running engine
    #[error("engine already running")]
    AlreadyRunning,

    /// OS refused a worker thread
    #[error("failed to spawn worker: {0}")]
    SpawnFailed(String),
}

/// The ingress/egress capability handed to one worker
pub struct WorkerIo {
    /// Receive side for the worker's queues
    pub source: Box<dyn PacketSource>,
    /// Transmit side for the worker's queues
    pub sink: Box<dyn PacketSink>,
}

/// Spread queues across workers round-robin.
///
/// Total and non-overlapping: each queue appears in exactly one returned
/// set. Workers beyond the queue count get an empty set.
pub fn assign_queues(num_workers: usize, queues: &[QueueId]) -> Vec<Vec<QueueId>> {
    let mut sets = vec![Vec::new(); num_workers];
    for (i, queue) in queues.iter().enumerate() {
        sets[i % num_workers].push(*queue);
    }
    sets
}

/// Every (port, queue) pair the config describes, port-major order
pub fn enumerate_queues(config: &NxtpConfig) -> Vec<QueueId> {
    let mut queues = Vec::with_capacity(config.total_queues());
    for port in 0..config.num_ports {
        for queue in 0..config.queues_per_port {
            queues.push(QueueId::new(port, queue));
        }
    }
    queues
}

struct WorkerHandle {
    thread: Option<thread::JoinHandle<()>>,
    worker_id: usize,
}

/// Priority-gated forwarding engine.
///
/// Owns the worker threads and their counters; scoring goes through the
/// gateway handle cloned into each worker.
pub struct Engine {
    config: NxtpConfig,
    cancel: CancelToken,
    gateway: ClassificationGateway,
    cache: Arc<ScoreCache>,
    policy: FallbackPolicy,
    stats: Vec<Arc<WorkerStats>>,
    workers: Vec<WorkerHandle>,
}

impl Engine {
    /// Engine over `gateway`, not yet started
    pub fn new(config: NxtpConfig, gateway: ClassificationGateway) -> Self {
        let stats = (0..config.num_workers)
            .map(|_| Arc::new(WorkerStats::default()))
            .collect();
        let policy = FallbackPolicy::from_config(&config.classify);

        Self {
            config,
            cancel: CancelToken::new(),
            gateway,
            cache: Arc::new(ScoreCache::new()),
            policy,
            stats,
            workers: Vec::new(),
        }
    }

    /// Token observed by every worker this engine spawns
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Per-worker counter blocks, worker index order
    pub fn worker_stats(&self) -> &[Arc<WorkerStats>] {
        &self.stats
    }

    /// Aggregator over this engine's workers at the configured interval
    pub fn aggregator(&self) -> StatsAggregator {
        StatsAggregator::new(
            self.stats.clone(),
            Duration::from_secs(self.config.stats_interval_secs),
        )
    }

    /// Spawn the workers. `make_io` is called once per worker with its
    /// index and assigned queues and returns that worker's ingress/egress
    /// capability.
    pub fn start<F>(&mut self, mut make_io: F) -> Result<(), EngineError>
    where
        F: FnMut(usize, &[QueueId]) -> WorkerIo,
    {
        if !self.workers.is_empty() {
            return Err(EngineError::AlreadyRunning);
        }

        let queues = enumerate_queues(&self.config);
        let assignment = assign_queues(self.config.num_workers, &queues);

        for (worker_id, queue_set) in assignment.into_iter().enumerate() {
            let io = make_io(worker_id, &queue_set);
            let worker = Worker {
                worker_id,
                queues: queue_set,
                io,
                gateway: self.gateway.clone(),
                cache: self.cache.clone(),
                policy: self.policy,
                threshold: self.config.forward_threshold,
                deadline: Duration::from_millis(self.config.classify.deadline_ms),
                cancel: self.cancel.clone(),
                stats: self.stats[worker_id].clone(),
            };

            let handle = thread::Builder::new()
                .name(format!("nxtp-worker-{}", worker_id))
                .spawn(move || worker.run())
                .map_err(|e| EngineError::SpawnFailed(e.to_string()))?;

            self.workers.push(WorkerHandle {
                thread: Some(handle),
                worker_id,
            });
        }

        tracing::info!(
            workers = self.config.num_workers,
            queues = self.config.total_queues(),
            threshold = self.config.forward_threshold,
            "forwarding engine started"
        );
        Ok(())
    }

    /// Cancel and join every worker
    pub fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.cancel.cancel();
        for worker in &mut self.workers {
            if let Some(handle) = worker.thread.take() {
                let _ = handle.join();
            }
            tracing::debug!(worker = worker.worker_id, "worker joined");
        }
        self.workers.clear();
        tracing::info!("forwarding engine stopped");
    }

    /// True between `start` and `stop`
    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    worker_id: usize,
    queues: Vec<QueueId>,
    io: WorkerIo,
    gateway: ClassificationGateway,
    cache: Arc<ScoreCache>,
    policy: FallbackPolicy,
    threshold: u8,
    deadline: Duration,
    cancel: CancelToken,
    stats: Arc<WorkerStats>,
}

impl Worker {
    fn run(mut self) {
        tracing::debug!(worker = self.worker_id, queues = self.queues.len(), "worker starting");

        let mut burst = Vec::with_capacity(MAX_BURST);
        while !self.cancel.is_cancelled() {
            let mut idle = true;
            for i in 0..self.queues.len() {
                let queue = self.queues[i];
                if self.io.source.poll(queue, &mut burst, MAX_BURST) > 0 {
                    idle = false;
                }
                for packet in burst.drain(..) {
                    self.process(packet);
                }
            }
            if idle {
                thread::yield_now();
            }
        }

        // The burst is emptied every iteration; anything that still made it
        // in reclaims through PacketBuffer's drop.
        drop(burst);
        tracing::debug!(worker = self.worker_id, "worker stopped");
    }

    fn process(&mut self, packet: PacketBuffer) {
        self.stats.record_rx(packet.len() as u64);

        let (header, payload) = match parse_frame(packet.data()) {
            Ok(view) => (view.header, Bytes::copy_from_slice(view.payload)),
            Err(e) => {
                tracing::trace!(worker = self.worker_id, error = %e, "malformed packet");
                self.stats.record_malformed();
                return; // buffer reclaims on drop
            }
        };

        let deadline = Instant::now() + self.deadline;
        let score = match self.gateway.submit(payload, header.session_id, deadline) {
            ScoreOutcome::Score(score) => {
                self.cache.record(header.session_id, score);
                score
            }
            ScoreOutcome::TimedOut | ScoreOutcome::Unavailable => {
                self.stats.record_classifier_miss();
                self.policy.fallback_score(&self.cache, header.session_id)
            }
        };

        match decide(score, self.threshold) {
            Verdict::Forward => {
                let bytes = packet.len() as u64;
                let egress = packet.queue;
                match self.io.sink.send(egress, packet) {
                    Ok(()) => self.stats.record_tx(bytes),
                    Err(_returned) => self.stats.record_drop(), // egress full, reclaim
                }
            }
            Verdict::Drop => {
                self.stats.record_drop(); // buffer reclaims on drop
            }
        }
    }
}
