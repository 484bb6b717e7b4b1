//! NeuXTP header codec
//!
//! Fixed 14-byte layout, network byte order:
//!
//! | offset | field      | size |
//! |--------|------------|------|
//! | 0      | version    | 1    |
//! | 1      | flags      | 1    |
//! | 2      | length     | 2    |
//! | 4      | session_id | 4    |
//! | 8      | ai_tag     | 1    |
//! | 9      | priority   | 1    |
//! | 10     | checksum   | 4    |
//!
//! The checksum is FNV-1a-32 over the header with the checksum field zeroed,
//! followed by the payload. It participates only when [`FLAG_CHECKSUM`] is
//! set; the field is encoded as 0 otherwise so the header stays fixed-width.

use nxtp_common::{AiTag, Priority};
use thiserror::Error;

use crate::{FLAG_CHECKSUM, HEADER_LEN, NXTP_VERSION};

/// Decoded NeuXTP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NxtpHeader {
    /// Protocol version, always [`NXTP_VERSION`] for headers this codec emits
    pub version: u8,
    /// Reserved bitset; bit0 gates the checksum
    pub flags: u8,
    /// Payload byte count following the header
    pub length: u16,
    /// Correlates packets to a logical stream
    pub session_id: u32,
    /// Content classification hint
    pub ai_tag: AiTag,
    /// QoS hint, distinct from the classifier score
    pub priority: Priority,
    /// End-to-end integrity word, 0 unless bit0 of flags is set
    pub checksum: u32,
}

/// Header decode/encode failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// Buffer shorter than the fixed header size
    #[error("malformed header: {0} bytes, need at least {HEADER_LEN}")]
    TooShort(usize),

    /// Version field does not match the supported version
    #[error("malformed header: version {0:#x}, supported {NXTP_VERSION:#x}")]
    VersionMismatch(u8),

    /// ai_tag discriminant outside the known set
    #[error("malformed header: unknown ai_tag {0:#x}")]
    UnknownTag(u8),

    /// priority discriminant outside the known set
    #[error("malformed header: unknown priority {0:#x}")]
    UnknownPriority(u8),

    /// length field implies a payload beyond the buffer end
    #[error("malformed header: length {claimed} but only {available} bytes follow")]
    LengthOverrun {
        /// Payload bytes the header claims
        claimed: u16,
        /// Payload bytes actually present
        available: usize,
    },

    /// Checksum flag set and the stored word does not verify
    #[error("malformed header: checksum {found:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Word stored on the wire
        found: u32,
        /// Word computed over header and payload
        computed: u32,
    },

    /// Ethertype other than IPv4 in the outer frame
    #[error("not a NeuXTP frame: ethertype {0:#06x}")]
    UnexpectedEthertype(u16),

    /// IPv4 protocol number other than 253
    #[error("not a NeuXTP frame: IP protocol {0}")]
    UnexpectedProtocol(u8),

    /// Outer frame truncated before the NeuXTP header
    #[error("truncated frame: {0} bytes")]
    TruncatedFrame(usize),
}

impl NxtpHeader {
    /// New version-1 header with empty flags and no checksum
    pub fn new(session_id: u32, ai_tag: AiTag, priority: Priority, length: u16) -> Self {
        Self {
            version: NXTP_VERSION,
            flags: 0,
            length,
            session_id,
            ai_tag,
            priority,
            checksum: 0,
        }
    }

    /// Set the checksum flag and store the word computed over this header
    /// and `payload`
    pub fn with_checksum(mut self, payload: &[u8]) -> Self {
        self.flags |= FLAG_CHECKSUM;
        self.checksum = 0;
        self.checksum = checksum(&self.encode(), payload);
        self
    }

    /// Encode into a fixed-size array, network byte order
    #[inline]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        self.encode_into(&mut out);
        out
    }

    /// Encode into the front of `out`; `out` must hold [`HEADER_LEN`] bytes
    #[inline]
    pub fn encode_into(&self, out: &mut [u8]) {
        out[0] = self.version;
        out[1] = self.flags;
        out[2..4].copy_from_slice(&self.length.to_be_bytes());
        out[4..8].copy_from_slice(&self.session_id.to_be_bytes());
        out[8] = self.ai_tag as u8;
        out[9] = self.priority as u8;
        out[10..14].copy_from_slice(&self.checksum.to_be_bytes());
    }

    /// Decode the header at the front of `buf` and validate it against the
    /// bytes that follow.
    ///
    /// `buf` is the header plus whatever payload the caller has; `length`
    /// must fit inside it, and a flagged checksum must verify over exactly
    /// `length` payload bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::TooShort(buf.len()));
        }

        let version = buf[0];
        if version != NXTP_VERSION {
            return Err(WireError::VersionMismatch(version));
        }

        let flags = buf[1];
        let length = u16::from_be_bytes([buf[2], buf[3]]);
        let session_id = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let ai_tag = AiTag::from_wire(buf[8]).ok_or(WireError::UnknownTag(buf[8]))?;
        let priority = Priority::from_wire(buf[9]).ok_or(WireError::UnknownPriority(buf[9]))?;
        let stored = u32::from_be_bytes([buf[10], buf[11], buf[12], buf[13]]);

        let available = buf.len() - HEADER_LEN;
        if length as usize > available {
            return Err(WireError::LengthOverrun {
                claimed: length,
                available,
            });
        }

        let header = Self {
            version,
            flags,
            length,
            session_id,
            ai_tag,
            priority,
            checksum: stored,
        };

        if flags & FLAG_CHECKSUM != 0 {
            let payload = &buf[HEADER_LEN..HEADER_LEN + length as usize];
            let mut zeroed = header;
            zeroed.checksum = 0;
            let computed = checksum(&zeroed.encode(), payload);
            if computed != stored {
                return Err(WireError::ChecksumMismatch {
                    found: stored,
                    computed,
                });
            }
        }

        Ok(header)
    }
}

/// FNV-1a-32 over the zeroed-checksum header bytes followed by the payload
#[inline]
pub fn checksum(header: &[u8; HEADER_LEN], payload: &[u8]) -> u32 {
    const FNV_OFFSET: u32 = 0x811c9dc5;
    const FNV_PRIME: u32 = 0x01000193;

    let mut h = FNV_OFFSET;
    for &byte in header.iter().chain(payload.iter()) {
        h ^= byte as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NxtpHeader {
        NxtpHeader::new(0xDEAD_BEEF, AiTag::Image, Priority::Critical, 5)
    }

    #[test]
    fn test_roundtrip_no_checksum() {
        let h = sample();
        let mut frame = h.encode().to_vec();
        frame.extend_from_slice(b"hello");

        let back = NxtpHeader::decode(&frame).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_roundtrip_with_checksum() {
        let payload = b"payload bytes";
        let h = NxtpHeader::new(7, AiTag::Text, Priority::Low, payload.len() as u16)
            .with_checksum(payload);
        assert_ne!(h.checksum, 0);

        let mut frame = h.encode().to_vec();
        frame.extend_from_slice(payload);
        let back = NxtpHeader::decode(&frame).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_too_short() {
        for len in 0..HEADER_LEN {
            let buf = vec![0u8; len];
            assert_eq!(NxtpHeader::decode(&buf), Err(WireError::TooShort(len)));
        }
    }

    #[test]
    fn test_version_gate_rejects_legacy_layouts() {
        let mut frame = sample().encode().to_vec();
        frame.extend_from_slice(&[0u8; 5]);
        frame[0] = 2;
        assert_eq!(NxtpHeader::decode(&frame), Err(WireError::VersionMismatch(2)));
        frame[0] = 0;
        assert_eq!(NxtpHeader::decode(&frame), Err(WireError::VersionMismatch(0)));
    }

    #[test]
    fn test_length_overrun() {
        let h = NxtpHeader::new(1, AiTag::None, Priority::Medium, 100);
        let frame = h.encode();
        assert_eq!(
            NxtpHeader::decode(&frame),
            Err(WireError::LengthOverrun {
                claimed: 100,
                available: 0
            })
        );
    }

    #[test]
    fn test_unknown_discriminants() {
        let mut frame = sample().encode().to_vec();
        frame.extend_from_slice(&[0u8; 5]);

        let mut bad_tag = frame.clone();
        bad_tag[8] = 0x77;
        assert_eq!(NxtpHeader::decode(&bad_tag), Err(WireError::UnknownTag(0x77)));

        let mut bad_prio = frame;
        bad_prio[9] = 9;
        assert_eq!(
            NxtpHeader::decode(&bad_prio),
            Err(WireError::UnknownPriority(9))
        );
    }

    #[test]
    fn test_corrupted_payload_fails_checksum() {
        let payload = b"payload bytes";
        let h = NxtpHeader::new(7, AiTag::Audio, Priority::High, payload.len() as u16)
            .with_checksum(payload);

        let mut frame = h.encode().to_vec();
        frame.extend_from_slice(payload);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;

        assert!(matches!(
            NxtpHeader::decode(&frame),
            Err(WireError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_unflagged_checksum_is_ignored() {
        // A stray word in the checksum field means nothing without the flag.
        let mut h = sample();
        h.checksum = 0x1234_5678;
        let mut frame = h.encode().to_vec();
        frame.extend_from_slice(&[0u8; 5]);
        let back = NxtpHeader::decode(&frame).unwrap();
        assert_eq!(back.checksum, 0x1234_5678);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_header() -> impl Strategy<Value = (NxtpHeader, Vec<u8>)> {
        (
            any::<u32>(),
            0u8..=5,
            0u8..=3,
            proptest::collection::vec(any::<u8>(), 0..256),
            any::<bool>(),
        )
            .prop_map(|(session_id, tag, prio, payload, with_csum)| {
                let header = NxtpHeader::new(
                    session_id,
                    AiTag::from_wire(tag).unwrap(),
                    Priority::from_wire(prio).unwrap(),
                    payload.len() as u16,
                );
                let header = if with_csum {
                    header.with_checksum(&payload)
                } else {
                    header
                };
                (header, payload)
            })
    }

    proptest! {
        #[test]
        fn prop_decode_encode_roundtrip((header, payload) in arb_header()) {
            let mut frame = header.encode().to_vec();
            frame.extend_from_slice(&payload);
            let back = NxtpHeader::decode(&frame).unwrap();
            prop_assert_eq!(back, header);
        }

        #[test]
        fn prop_short_input_never_panics(buf in proptest::collection::vec(any::<u8>(), 0..HEADER_LEN)) {
            prop_assert_eq!(NxtpHeader::decode(&buf), Err(WireError::TooShort(buf.len())));
        }
    }
}
