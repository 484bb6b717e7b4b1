//! Runtime configuration
//!
//! Loaded from a JSON file; every field has a working default so the
//! forwarding plane can come up with no config at all.

use serde::{Deserialize, Serialize};

use crate::error::{NxtpError, NxtpResult};
use crate::priority::Priority;

/// Top-level configuration for the forwarding plane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NxtpConfig {
    /// Number of ports handed to the engine
    pub num_ports: u16,
    /// Receive/transmit queues per port
    pub queues_per_port: u16,
    /// Worker threads; queues are spread round-robin across them
    pub num_workers: usize,
    /// Forwarding threshold over the classifier score, exclusive boundary
    pub forward_threshold: u8,
    /// Packet buffers in the shared pool
    pub buffer_pool_size: usize,
    /// Seconds between stats reports
    pub stats_interval_secs: u64,
    /// Classification gateway settings
    pub classify: ClassifyConfig,
    /// Synthetic traffic settings
    pub generator: GeneratorConfig,
}

impl Default for NxtpConfig {
    fn default() -> Self {
        Self {
            num_ports: 1,
            queues_per_port: 1,
            num_workers: 1,
            forward_threshold: 70,
            buffer_pool_size: 8192,
            stats_interval_secs: 2,
            classify: ClassifyConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl NxtpConfig {
    /// Load from file
    pub fn load(path: &str) -> NxtpResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| NxtpError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to file
    pub fn save(&self, path: &str) -> NxtpResult<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| NxtpError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Total queue count across all ports
    pub fn total_queues(&self) -> usize {
        self.num_ports as usize * self.queues_per_port as usize
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> NxtpResult<()> {
        if self.num_workers == 0 {
            return Err(NxtpError::Config("num_workers must be at least 1".into()));
        }
        if self.total_queues() == 0 {
            return Err(NxtpError::Config("at least one queue is required".into()));
        }
        if self.forward_threshold > 100 {
            return Err(NxtpError::Config(
                "forward_threshold must be within 0..=100".into(),
            ));
        }
        if self.buffer_pool_size == 0 {
            return Err(NxtpError::Config("buffer_pool_size must be non-zero".into()));
        }
        Ok(())
    }
}

/// Classification gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Hard deadline per scoring request, milliseconds
    pub deadline_ms: u64,
    /// Scoring threads behind the request queue
    pub workers: usize,
    /// Bound on pending scoring requests
    pub queue_depth: usize,
    /// Requests coalesced into one backend call
    pub batch_size: usize,
    /// What to do when the classifier misses
    pub fallback_mode: FallbackMode,
    /// Priority substituted on a miss (directly, or when no cached score exists)
    pub fallback_priority: Priority,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 5,
            workers: 2,
            queue_depth: 256,
            batch_size: 8,
            fallback_mode: FallbackMode::LastKnown,
            fallback_priority: Priority::Medium,
        }
    }
}

/// Fallback behavior when scoring times out or is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Reuse the last good score seen for the session, else the fallback priority
    LastKnown,
    /// Always substitute the fallback priority
    Fixed,
}

/// Synthetic traffic settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Generate packets instead of polling real ingress
    pub enabled: bool,
    /// Microseconds between packets per worker
    pub interval_us: u64,
    /// Payload bytes per synthetic packet
    pub payload_len: u16,
    /// Worker index modulo this list picks the emitted priority
    pub priority_map: Vec<Priority>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_us: 10,
            payload_len: 64,
            priority_map: vec![
                Priority::Low,
                Priority::Medium,
                Priority::High,
                Priority::Critical,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NxtpConfig::default();
        config.validate().unwrap();
        assert_eq!(config.forward_threshold, 70);
        assert_eq!(config.classify.deadline_ms, 5);
        assert_eq!(config.stats_interval_secs, 2);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = NxtpConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: NxtpConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_queues(), config.total_queues());
        assert_eq!(back.classify.fallback_priority, Priority::Medium);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let config = NxtpConfig {
            num_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let config = NxtpConfig {
            forward_threshold: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
