//! NeuXTP Classification Gateway
//!
//! Bridges the packet path to an inherently slow priority oracle without
//! ever blocking a worker past its deadline. Packet threads hand a payload
//! copy to a bounded request queue and wait at most `deadline`; a small pool
//! of scoring threads drains the queue in batches and calls a pluggable
//! backend. Misses (timeout, full queue, backend failure) are resolved by a
//! configurable fallback policy on the caller's side.

#![warn(missing_docs)]

pub mod backend;
pub mod fallback;
pub mod gateway;
pub mod remote;

pub use backend::{BackendError, HeuristicBackend, ScoreBackend};
pub use fallback::{FallbackPolicy, ScoreCache};
pub use gateway::{ClassificationGateway, ClassifyError, GatewayConfig, ScoreOutcome};
pub use remote::SocketBackend;
