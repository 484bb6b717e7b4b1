//! NeuXTP Common - Shared types for the priority-gated forwarding plane
//!
//! This crate provides the pieces every other crate needs:
//! - Content tag and priority domains, with the score mapping
//! - Runtime configuration
//! - Error handling
//! - Nanosecond timestamps for packet arrival metadata

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod priority;

pub use config::*;
pub use error::*;
pub use priority::*;

/// Monotonic nanosecond timestamp for packet arrival metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Get current timestamp (nanoseconds since epoch)
    #[inline(always)]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64;
        Self(nanos)
    }

    /// Construct from a raw nanosecond value
    #[inline(always)]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Get nanoseconds value
    #[inline(always)]
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Duration since this timestamp in microseconds
    #[inline(always)]
    pub fn elapsed_micros(&self) -> u64 {
        (Self::now().0.saturating_sub(self.0)) / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_precision() {
        let t1 = Timestamp::now();
        std::thread::sleep(std::time::Duration::from_micros(100));
        let t2 = Timestamp::now();

        // Should measure at least 100 microseconds
        assert!(t2.0 - t1.0 >= 100_000);
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let t = Timestamp::from_nanos(42);
        assert_eq!(t.as_nanos(), 42);
    }
}
