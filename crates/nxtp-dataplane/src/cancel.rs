//! Cooperative cancellation
//!
//! One token is cloned into every worker, the traffic generator, and the
//! stats aggregator; each checks it once per loop iteration. There is no
//! other process-wide run state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation token
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// New, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal every holder to wind down
    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Checked once per loop iteration by every holder
    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }
}
