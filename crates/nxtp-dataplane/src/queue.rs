//! Packet ingress and egress
//!
//! `PacketSource`/`PacketSink` are the capability the environment hands the
//! engine; the hardware behind them is not this crate's concern. Both are
//! burst-based and non-blocking. `ChannelIo` is the in-process
//! implementation used by tests and loopback runs.

use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use nxtp_common::Timestamp;

use crate::buffer::PacketBuffer;

/// A (port, queue) pair naming one hardware queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId {
    /// Port index
    pub port: u16,
    /// Queue index within the port
    pub queue: u16,
}

impl QueueId {
    /// Name a queue
    pub const fn new(port: u16, queue: u16) -> Self {
        Self { port, queue }
    }
}

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}q{}", self.port, self.queue)
    }
}

/// Burst receive over queues owned by the caller.
///
/// `poll` returns immediately with whatever is ready, up to `max_burst`
/// packets appended to `out`. An empty poll is the common case.
pub trait PacketSource: Send {
    /// Non-blocking burst receive; returns the packet count appended
    fn poll(&mut self, queue: QueueId, out: &mut Vec<PacketBuffer>, max_burst: usize) -> usize;
}

/// Burst transmit over queues owned by the caller.
///
/// `send` takes ownership on success. On a full queue the packet comes
/// back in `Err` and the caller reclaims it; there is no implicit retry.
pub trait PacketSink: Send {
    /// Non-blocking transmit of one packet
    fn send(&mut self, queue: QueueId, packet: PacketBuffer) -> Result<(), PacketBuffer>;
}

struct ChannelShared {
    rx: Vec<ArrayQueue<PacketBuffer>>,
    tx: Vec<ArrayQueue<PacketBuffer>>,
    queues_per_port: u16,
}

/// In-process queue pair set backed by lock-free ring buffers.
///
/// One ring per (port, queue) on each side. Handles clone cheaply; queue
/// ownership discipline (one poller per queue) is the caller's contract,
/// exactly as with hardware queues.
#[derive(Clone)]
pub struct ChannelIo {
    shared: Arc<ChannelShared>,
}

impl ChannelIo {
    /// Rings for `num_ports * queues_per_port` queues, `depth` packets each
    pub fn new(num_ports: u16, queues_per_port: u16, depth: usize) -> Self {
        let total = num_ports as usize * queues_per_port as usize;
        let make = || (0..total).map(|_| ArrayQueue::new(depth)).collect();
        Self {
            shared: Arc::new(ChannelShared {
                rx: make(),
                tx: make(),
                queues_per_port,
            }),
        }
    }

    #[inline(always)]
    fn index(&self, queue: QueueId) -> usize {
        queue.port as usize * self.shared.queues_per_port as usize + queue.queue as usize
    }

    /// Push a packet onto a receive ring, as the wire would
    pub fn inject(&self, queue: QueueId, packet: PacketBuffer) -> Result<(), PacketBuffer> {
        let idx = self.index(queue);
        self.shared.rx[idx].push(packet)
    }

    /// Pop one transmitted packet off a transmit ring
    pub fn drain_tx(&self, queue: QueueId) -> Option<PacketBuffer> {
        let idx = self.index(queue);
        self.shared.tx[idx].pop()
    }

    /// Packets sitting on a transmit ring
    pub fn tx_depth(&self, queue: QueueId) -> usize {
        let idx = self.index(queue);
        self.shared.tx[idx].len()
    }
}

impl PacketSource for ChannelIo {
    fn poll(&mut self, queue: QueueId, out: &mut Vec<PacketBuffer>, max_burst: usize) -> usize {
        let idx = self.index(queue);
        let ring = &self.shared.rx[idx];
        let mut n = 0;
        while n < max_burst {
            match ring.pop() {
                Some(mut packet) => {
                    packet.queue = queue;
                    packet.timestamp = Timestamp::now();
                    out.push(packet);
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

impl PacketSink for ChannelIo {
    fn send(&mut self, queue: QueueId, packet: PacketBuffer) -> Result<(), PacketBuffer> {
        let idx = self.index(queue);
        self.shared.tx[idx].push(packet)
    }
}

/// Sink that consumes every packet, reclaiming the buffer on the spot.
///
/// Stands in for hardware transmit during generator-driven load runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PacketSink for NullSink {
    fn send(&mut self, _queue: QueueId, packet: PacketBuffer) -> Result<(), PacketBuffer> {
        drop(packet);
        Ok(())
    }
}
