//! Scoring backends
//!
//! The oracle transport is a deployment choice. Backends are synchronous
//! and may block; the gateway confines them to its own scoring threads.

use bytes::Bytes;
use thiserror::Error;

/// Backend failures
#[derive(Debug, Error)]
pub enum BackendError {
    /// Oracle cannot be reached or refused the call
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// Transport IO error
    #[error("oracle IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Oracle answered with something other than the framed protocol
    #[error("malformed oracle response: {0}")]
    Protocol(String),
}

/// A priority oracle: opaque payloads in, scores 0..=100 out.
///
/// `score_batch` scores every payload in one call so batching amortizes the
/// invocation overhead. The returned vector must match the input length.
pub trait ScoreBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Score each payload; one oracle invocation for the whole batch
    fn score_batch(&self, payloads: &[Bytes]) -> Result<Vec<u8>, BackendError>;
}

/// Embedded in-process model.
///
/// Scores a payload from two content statistics: the fraction of printable
/// bytes (weight 60) and byte-value diversity (weight 40). Deterministic,
/// allocation-free, good enough to exercise the gate end to end without an
/// external oracle.
#[derive(Debug, Default)]
pub struct HeuristicBackend;

impl HeuristicBackend {
    fn score_one(payload: &[u8]) -> u8 {
        if payload.is_empty() {
            return 0;
        }

        let mut seen = [false; 256];
        let mut printable = 0usize;
        for &b in payload {
            seen[b as usize] = true;
            if (0x20..0x7F).contains(&b) || b == b'\n' || b == b'\t' {
                printable += 1;
            }
        }
        let distinct = seen.iter().filter(|s| **s).count();

        let printable_pct = printable * 100 / payload.len();
        let diversity_pct = (distinct * 100 / 256).min(100);

        ((printable_pct * 60 + diversity_pct * 40) / 100) as u8
    }
}

impl ScoreBackend for HeuristicBackend {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn score_batch(&self, payloads: &[Bytes]) -> Result<Vec<u8>, BackendError> {
        Ok(payloads.iter().map(|p| Self::score_one(p)).collect())
    }
}
