//! Synthetic traffic
//!
//! The generator is a [`PacketSource`]: in load-test mode it takes the
//! place of real ingress, and the packets it emits run the same decode,
//! score, decide path as received traffic. Header fields are deterministic
//! functions of the worker identity and a cycle counter.

use std::time::{Duration, Instant};

use nxtp_common::{AiTag, GeneratorConfig, Priority, Timestamp};
use nxtp_wire::{write_frame, NxtpHeader, FRAME_OVERHEAD};

use crate::buffer::{BufferPool, PacketBuffer};
use crate::queue::{PacketSource, QueueId};

/// Paced builder of header-tagged packets.
///
/// One packet per elapsed interval; a cycle is skipped, not deferred, when
/// the buffer pool is exhausted.
pub struct TrafficGenerator {
    worker_id: usize,
    pool: BufferPool,
    interval: Duration,
    payload_len: u16,
    ai_tag: AiTag,
    priority: Priority,
    session_counter: u32,
    next_emit: Instant,
    scratch: Vec<u8>,
}

impl TrafficGenerator {
    /// Generator for one worker
    pub fn new(worker_id: usize, config: &GeneratorConfig, pool: BufferPool) -> Self {
        let priority = config
            .priority_map
            .get(worker_id % config.priority_map.len().max(1))
            .copied()
            .unwrap_or_default();

        Self {
            worker_id,
            pool,
            interval: Duration::from_micros(config.interval_us),
            payload_len: config.payload_len,
            ai_tag: AiTag::from_index(worker_id),
            priority,
            session_counter: 0,
            next_emit: Instant::now(),
            scratch: Vec::with_capacity(config.payload_len as usize),
        }
    }

    /// Packets emitted so far
    pub fn cycles(&self) -> u32 {
        self.session_counter
    }

    fn build_packet(&mut self, queue: QueueId) -> Option<PacketBuffer> {
        let mut packet = self.pool.alloc()?;

        let session = self.session_counter;
        self.session_counter = self.session_counter.wrapping_add(1);

        self.scratch.clear();
        self.scratch.extend(
            (0..self.payload_len).map(|i| (session as u8).wrapping_add(i as u8)),
        );

        let header = NxtpHeader::new(session, self.ai_tag, self.priority, self.payload_len)
            .with_checksum(&self.scratch);

        let total = FRAME_OVERHEAD + self.payload_len as usize;
        let region = packet.append(total as u16)?;
        let src = [10, 0, queue.port as u8, 1];
        let dst = [10, 0, (queue.port ^ 1) as u8, 1];
        write_frame(region, src, dst, &header, &self.scratch).ok()?;

        packet.queue = queue;
        packet.timestamp = Timestamp::now();
        Some(packet)
    }
}

impl PacketSource for TrafficGenerator {
    fn poll(&mut self, queue: QueueId, out: &mut Vec<PacketBuffer>, _max_burst: usize) -> usize {
        let now = Instant::now();
        if now < self.next_emit {
            return 0;
        }
        self.next_emit = now + self.interval;

        match self.build_packet(queue) {
            Some(packet) => {
                out.push(packet);
                1
            }
            None => {
                tracing::trace!(worker = self.worker_id, "pool exhausted, skipping cycle");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxtp_wire::parse_frame;

    fn config(interval_us: u64) -> GeneratorConfig {
        GeneratorConfig {
            enabled: true,
            interval_us,
            payload_len: 32,
            ..Default::default()
        }
    }

    #[test]
    fn test_emitted_frame_is_valid() {
        let pool = BufferPool::new(4);
        let mut gen = TrafficGenerator::new(2, &config(0), pool);
        let q = QueueId::new(0, 0);

        let mut out = Vec::new();
        assert_eq!(gen.poll(q, &mut out, 32), 1);

        let view = parse_frame(out[0].data()).unwrap();
        assert_eq!(view.header.ai_tag, AiTag::Image); // worker 2
        assert_eq!(view.header.priority, Priority::High); // default map, index 2
        assert_eq!(view.header.session_id, 0);
        assert_eq!(view.payload.len(), 32);
        assert_eq!(out[0].queue, q);
    }

    #[test]
    fn test_session_id_is_monotonic() {
        let pool = BufferPool::new(8);
        let mut gen = TrafficGenerator::new(0, &config(0), pool);
        let q = QueueId::new(0, 0);

        let mut out = Vec::new();
        for _ in 0..3 {
            gen.poll(q, &mut out, 32);
        }
        let sessions: Vec<u32> = out
            .iter()
            .map(|p| parse_frame(p.data()).unwrap().header.session_id)
            .collect();
        assert_eq!(sessions, vec![0, 1, 2]);
    }

    #[test]
    fn test_interval_pacing() {
        let pool = BufferPool::new(8);
        let mut gen = TrafficGenerator::new(0, &config(50_000), pool);
        let q = QueueId::new(0, 0);

        let mut out = Vec::new();
        assert_eq!(gen.poll(q, &mut out, 32), 1);
        assert_eq!(gen.poll(q, &mut out, 32), 0); // interval not yet elapsed

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(gen.poll(q, &mut out, 32), 1);
    }

    #[test]
    fn test_pool_exhaustion_skips_cycle() {
        let pool = BufferPool::new(1);
        let mut gen = TrafficGenerator::new(0, &config(0), pool.clone());
        let q = QueueId::new(0, 0);

        let mut out = Vec::new();
        assert_eq!(gen.poll(q, &mut out, 32), 1);
        // The single buffer is held in `out`; the next cycle has nothing.
        assert_eq!(gen.poll(q, &mut out, 32), 0);

        out.clear(); // reclaim
        assert_eq!(pool.available(), 1);
        assert_eq!(gen.poll(q, &mut out, 32), 1);
    }
}
