//! Content tag and priority domains
//!
//! The header carries two hints that live in different domains: a content
//! tag describing what kind of AI payload the packet carries, and a 4-level
//! QoS priority. The classifier produces a third domain, a score in 0..=100.
//! The only sanctioned bridges between priority and score are
//! [`Priority::from_score`] and [`Priority::nominal_score`].

use serde::{Deserialize, Serialize};

/// Content classification hint carried in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AiTag {
    /// No content hint
    None = 0,
    /// Text payload (prompts, completions)
    Text = 1,
    /// Image payload
    Image = 2,
    /// Audio payload
    Audio = 3,
    /// Video payload
    Video = 4,
    /// Embedding vector payload
    Embedding = 5,
}

impl AiTag {
    /// Decode from the wire discriminant
    #[inline(always)]
    pub const fn from_wire(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::Text),
            2 => Some(Self::Image),
            3 => Some(Self::Audio),
            4 => Some(Self::Video),
            5 => Some(Self::Embedding),
            _ => None,
        }
    }

    /// Derive a tag from a worker index, for synthetic traffic
    #[inline(always)]
    pub const fn from_index(idx: usize) -> Self {
        match idx % 6 {
            0 => Self::None,
            1 => Self::Text,
            2 => Self::Image,
            3 => Self::Audio,
            4 => Self::Video,
            _ => Self::Embedding,
        }
    }
}

/// QoS priority carried in the header
///
/// Distinct from the classifier score. Never compare a raw discriminant to
/// a raw score; map through [`Priority::from_score`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Priority {
    /// Background traffic
    Low = 0,
    /// Default service level
    Medium = 1,
    /// Latency-sensitive traffic
    High = 2,
    /// Must-deliver traffic
    Critical = 3,
}

impl Priority {
    /// Decode from the wire discriminant
    #[inline(always)]
    pub const fn from_wire(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            3 => Some(Self::Critical),
            _ => None,
        }
    }

    /// Map a classifier score (0..=100) into the priority domain.
    ///
    /// Bands: 90+ Critical, 70..=89 High, 40..=69 Medium, below 40 Low.
    #[inline(always)]
    pub const fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Self::Critical,
            70..=89 => Self::High,
            40..=69 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Representative score for this priority, the midpoint of its band.
    ///
    /// Used when a configured fallback priority must stand in for a missing
    /// classifier score.
    #[inline(always)]
    pub const fn nominal_score(&self) -> u8 {
        match self {
            Self::Critical => 95,
            Self::High => 80,
            Self::Medium => 55,
            Self::Low => 20,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_wire_roundtrip() {
        for v in 0..=5u8 {
            let tag = AiTag::from_wire(v).unwrap();
            assert_eq!(tag as u8, v);
        }
        assert!(AiTag::from_wire(6).is_none());
        assert!(AiTag::from_wire(0xFF).is_none());
    }

    #[test]
    fn test_priority_wire_roundtrip() {
        for v in 0..=3u8 {
            let p = Priority::from_wire(v).unwrap();
            assert_eq!(p as u8, v);
        }
        assert!(Priority::from_wire(4).is_none());
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(Priority::from_score(0), Priority::Low);
        assert_eq!(Priority::from_score(39), Priority::Low);
        assert_eq!(Priority::from_score(40), Priority::Medium);
        assert_eq!(Priority::from_score(69), Priority::Medium);
        assert_eq!(Priority::from_score(70), Priority::High);
        assert_eq!(Priority::from_score(89), Priority::High);
        assert_eq!(Priority::from_score(90), Priority::Critical);
        assert_eq!(Priority::from_score(100), Priority::Critical);
    }

    #[test]
    fn test_nominal_score_stays_in_band() {
        for p in [Priority::Low, Priority::Medium, Priority::High, Priority::Critical] {
            assert_eq!(Priority::from_score(p.nominal_score()), p);
        }
    }
}
