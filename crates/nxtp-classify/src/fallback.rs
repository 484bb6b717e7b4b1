//! Fallback policy for classifier misses
//!
//! When the oracle times out or is unavailable the packet still needs a
//! score. Either the last good score seen for the session is reused, or a
//! configured priority stands in through its nominal score. Workers count
//! the miss; this module only produces the substitute value.

use dashmap::DashMap;
use nxtp_common::{ClassifyConfig, FallbackMode, Priority};

/// Per-session cache of the last successful score.
///
/// Shared across workers; scoring results flow in from every worker, so the
/// map must take concurrent writes.
#[derive(Debug, Default)]
pub struct ScoreCache {
    scores: DashMap<u32, u8>,
}

impl ScoreCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the latest good score for a session
    #[inline]
    pub fn record(&self, session_id: u32, score: u8) {
        self.scores.insert(session_id, score);
    }

    /// Last good score for a session, if any
    #[inline]
    pub fn last(&self, session_id: u32) -> Option<u8> {
        self.scores.get(&session_id).map(|s| *s)
    }

    /// Sessions with a cached score
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// True when no session has been scored yet
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// What to substitute when the classifier misses
#[derive(Debug, Clone, Copy)]
pub struct FallbackPolicy {
    mode: FallbackMode,
    default: Priority,
}

impl FallbackPolicy {
    /// Policy from the classify config section
    pub fn from_config(config: &ClassifyConfig) -> Self {
        Self {
            mode: config.fallback_mode,
            default: config.fallback_priority,
        }
    }

    /// Fixed-priority policy
    pub fn fixed(priority: Priority) -> Self {
        Self {
            mode: FallbackMode::Fixed,
            default: priority,
        }
    }

    /// Last-known policy backed by `default` for unseen sessions
    pub fn last_known(default: Priority) -> Self {
        Self {
            mode: FallbackMode::LastKnown,
            default,
        }
    }

    /// Substitute score for one miss
    #[inline]
    pub fn fallback_score(&self, cache: &ScoreCache, session_id: u32) -> u8 {
        match self.mode {
            FallbackMode::LastKnown => cache
                .last(session_id)
                .unwrap_or_else(|| self.default.nominal_score()),
            FallbackMode::Fixed => self.default.nominal_score(),
        }
    }
}
