//! Worker statistics
//!
//! Lock-free counters, one block per worker on its own cache line. Workers
//! are the only writers of their block; the aggregator reads live counters
//! with relaxed loads, so a snapshot can be mid-burst but each counter is
//! individually consistent and monotonic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;

/// Per-worker counters (cache-line aligned)
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Packets polled off receive queues
    pub rx_packets: AtomicU64,
    /// Bytes polled off receive queues
    pub rx_bytes: AtomicU64,
    /// Packets handed to a transmit queue
    pub tx_packets: AtomicU64,
    /// Bytes handed to a transmit queue
    pub tx_bytes: AtomicU64,
    /// Packets dropped by verdict or egress backpressure
    pub dropped: AtomicU64,
    /// Packets rejected at decode
    pub malformed: AtomicU64,
    /// Scoring rounds resolved by the fallback policy
    pub classifier_miss: AtomicU64,
}

impl WorkerStats {
    #[inline(always)]
    pub(crate) fn record_rx(&self, bytes: u64) {
        self.rx_packets.fetch_add(1, Ordering::Relaxed);
        self.rx_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_tx(&self, bytes: u64) {
        self.tx_packets.fetch_add(1, Ordering::Relaxed);
        self.tx_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_classifier_miss(&self) {
        self.classifier_miss.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter once
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            rx_packets: self.rx_packets.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            tx_packets: self.tx_packets.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            classifier_miss: self.classifier_miss.load(Ordering::Relaxed),
        }
    }
}

/// Non-atomic copy of one worker's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStatsSnapshot {
    /// Packets polled off receive queues
    pub rx_packets: u64,
    /// Bytes polled off receive queues
    pub rx_bytes: u64,
    /// Packets handed to a transmit queue
    pub tx_packets: u64,
    /// Bytes handed to a transmit queue
    pub tx_bytes: u64,
    /// Packets dropped by verdict or egress backpressure
    pub dropped: u64,
    /// Packets rejected at decode
    pub malformed: u64,
    /// Scoring rounds resolved by the fallback policy
    pub classifier_miss: u64,
}

impl WorkerStatsSnapshot {
    fn accumulate(&mut self, other: &WorkerStatsSnapshot) {
        self.rx_packets += other.rx_packets;
        self.rx_bytes += other.rx_bytes;
        self.tx_packets += other.tx_packets;
        self.tx_bytes += other.tx_bytes;
        self.dropped += other.dropped;
        self.malformed += other.malformed;
        self.classifier_miss += other.classifier_miss;
    }

    /// Share of received packets that were forwarded
    pub fn forward_rate(&self) -> f64 {
        if self.rx_packets == 0 {
            return 0.0;
        }
        self.tx_packets as f64 / self.rx_packets as f64
    }
}

/// Periodic reader of every worker's counters.
///
/// Observational only: it never writes worker state and takes no lock for
/// a report.
pub struct StatsAggregator {
    workers: Vec<Arc<WorkerStats>>,
    interval: Duration,
}

impl StatsAggregator {
    /// Aggregator over `workers`, reporting every `interval`
    pub fn new(workers: Vec<Arc<WorkerStats>>, interval: Duration) -> Self {
        Self { workers, interval }
    }

    /// Sum of all per-worker snapshots
    pub fn totals(&self) -> WorkerStatsSnapshot {
        let mut total = WorkerStatsSnapshot::default();
        for worker in &self.workers {
            total.accumulate(&worker.snapshot());
        }
        total
    }

    /// Per-worker snapshots, worker index order
    pub fn per_worker(&self) -> Vec<WorkerStatsSnapshot> {
        self.workers.iter().map(|w| w.snapshot()).collect()
    }

    /// Report totals every interval until cancelled
    pub fn run(&self, cancel: &CancelToken) {
        const SLICE: Duration = Duration::from_millis(100);

        while !cancel.is_cancelled() {
            let mut slept = Duration::ZERO;
            while slept < self.interval && !cancel.is_cancelled() {
                std::thread::sleep(SLICE.min(self.interval - slept));
                slept += SLICE;
            }
            if cancel.is_cancelled() {
                break;
            }

            let t = self.totals();
            tracing::info!(
                rx = t.rx_packets,
                tx = t.tx_packets,
                dropped = t.dropped,
                malformed = t.malformed,
                classifier_miss = t.classifier_miss,
                forward_rate = format!("{:.2}", t.forward_rate()),
                "forwarding stats"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reads_all_counters() {
        let stats = WorkerStats::default();
        stats.record_rx(1500);
        stats.record_tx(1500);
        stats.record_drop();
        stats.record_malformed();
        stats.record_classifier_miss();

        let snap = stats.snapshot();
        assert_eq!(snap.rx_packets, 1);
        assert_eq!(snap.rx_bytes, 1500);
        assert_eq!(snap.tx_packets, 1);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.malformed, 1);
        assert_eq!(snap.classifier_miss, 1);
    }

    #[test]
    fn test_totals_across_workers() {
        let a = Arc::new(WorkerStats::default());
        let b = Arc::new(WorkerStats::default());
        a.record_rx(1000);
        b.record_rx(2000);
        b.record_drop();

        let agg = StatsAggregator::new(vec![a, b], Duration::from_secs(2));
        let total = agg.totals();
        assert_eq!(total.rx_packets, 2);
        assert_eq!(total.rx_bytes, 3000);
        assert_eq!(total.dropped, 1);
    }

    #[test]
    fn test_counters_monotonic_under_concurrent_writes() {
        let stats = Arc::new(WorkerStats::default());
        let writer = {
            let stats = stats.clone();
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    stats.record_rx(64);
                    stats.record_tx(64);
                }
            })
        };

        let mut last = WorkerStatsSnapshot::default();
        for _ in 0..100 {
            let snap = stats.snapshot();
            assert!(snap.rx_packets >= last.rx_packets);
            assert!(snap.tx_packets >= last.tx_packets);
            assert!(snap.rx_bytes >= last.rx_bytes);
            last = snap;
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_forward_rate() {
        let snap = WorkerStatsSnapshot {
            rx_packets: 10,
            tx_packets: 7,
            ..Default::default()
        };
        assert!((snap.forward_rate() - 0.7).abs() < f64::EPSILON);
        assert_eq!(WorkerStatsSnapshot::default().forward_rate(), 0.0);
    }
}
