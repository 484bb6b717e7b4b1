//! Packet buffers and the shared pool
//!
//! # Design
//!
//! - Pre-allocated pool, lock-free acquisition/release from any worker
//! - A buffer is exclusively owned by whoever holds the `PacketBuffer`
//! - Storage returns to the pool automatically on drop, so every code
//!   path that stops holding a buffer reclaims it
//! - Headroom in front of the data for prepending outer headers

use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use nxtp_common::Timestamp;

use crate::queue::QueueId;

/// Buffer storage size, headroom included
pub const BUFFER_SIZE: usize = 2048;

/// Default headroom reserved for encapsulation
pub const DEFAULT_HEADROOM: u16 = 128;

type Storage = Box<[u8; BUFFER_SIZE]>;

struct PoolShared {
    free: ArrayQueue<Storage>,
    capacity: usize,
}

/// Shared packet buffer pool.
///
/// Cheap to clone; all clones draw from the same free list. Exhaustion is
/// reported as `None`, never by blocking.
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

impl BufferPool {
    /// Pool holding `size` buffers
    pub fn new(size: usize) -> Self {
        let free = ArrayQueue::new(size);
        for _ in 0..size {
            let _ = free.push(Box::new([0u8; BUFFER_SIZE]));
        }
        Self {
            shared: Arc::new(PoolShared {
                free,
                capacity: size,
            }),
        }
    }

    /// Take a buffer, or `None` when the pool is exhausted
    #[inline]
    pub fn alloc(&self) -> Option<PacketBuffer> {
        let storage = self.shared.free.pop()?;
        Some(PacketBuffer {
            storage: Some(storage),
            pool: Arc::clone(&self.shared),
            headroom: DEFAULT_HEADROOM,
            len: 0,
            queue: QueueId::new(0, 0),
            timestamp: Timestamp::from_nanos(0),
        })
    }

    /// Buffers currently free
    pub fn available(&self) -> usize {
        self.shared.free.len()
    }

    /// Total buffers owned by the pool
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

/// One packet's bytes plus receive metadata.
///
/// Exclusively owned: moving the value is the ownership transfer. Dropping
/// it returns the storage to its pool.
pub struct PacketBuffer {
    storage: Option<Storage>,
    pool: Arc<PoolShared>,
    headroom: u16,
    len: u16,
    /// Queue the packet arrived on; also its egress queue
    pub queue: QueueId,
    /// Arrival timestamp
    pub timestamp: Timestamp,
}

impl PacketBuffer {
    #[inline(always)]
    fn storage(&self) -> &Storage {
        self.storage.as_ref().expect("buffer storage present until drop")
    }

    #[inline(always)]
    fn storage_mut(&mut self) -> &mut Storage {
        self.storage.as_mut().expect("buffer storage present until drop")
    }

    /// Packet data
    #[inline(always)]
    pub fn data(&self) -> &[u8] {
        let start = self.headroom as usize;
        &self.storage()[start..start + self.len as usize]
    }

    /// Mutable packet data
    #[inline(always)]
    pub fn data_mut(&mut self) -> &mut [u8] {
        let start = self.headroom as usize;
        let end = start + self.len as usize;
        &mut self.storage_mut()[start..end]
    }

    /// Data length
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True when no data has been written
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes free in front of the data
    #[inline(always)]
    pub fn headroom(&self) -> usize {
        self.headroom as usize
    }

    /// Bytes free behind the data
    #[inline(always)]
    pub fn tailroom(&self) -> usize {
        BUFFER_SIZE - self.headroom as usize - self.len as usize
    }

    /// Extend at the tail, returning the new region
    #[inline]
    pub fn append(&mut self, len: u16) -> Option<&mut [u8]> {
        if self.tailroom() < len as usize {
            return None;
        }
        let start = self.headroom as usize + self.len as usize;
        self.len += len;
        Some(&mut self.storage_mut()[start..start + len as usize])
    }

    /// Extend at the head out of headroom, returning the new region
    #[inline]
    pub fn prepend(&mut self, len: u16) -> Option<&mut [u8]> {
        if self.headroom < len {
            return None;
        }
        self.headroom -= len;
        self.len += len;
        let start = self.headroom as usize;
        Some(&mut self.storage_mut()[start..start + len as usize])
    }

    /// Drop `len` bytes from the head
    #[inline]
    pub fn pull(&mut self, len: u16) -> bool {
        if self.len < len {
            return false;
        }
        self.headroom += len;
        self.len -= len;
        true
    }

    /// Forget the data, restore default headroom
    #[inline]
    pub fn reset(&mut self) {
        self.headroom = DEFAULT_HEADROOM;
        self.len = 0;
    }
}

impl Drop for PacketBuffer {
    fn drop(&mut self) {
        if let Some(storage) = self.storage.take() {
            // Pool is sized to its storage count, so this cannot overflow.
            let _ = self.pool.free.push(storage);
        }
    }
}

impl std::fmt::Debug for PacketBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketBuffer")
            .field("len", &self.len)
            .field("headroom", &self.headroom)
            .field("queue", &self.queue)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
