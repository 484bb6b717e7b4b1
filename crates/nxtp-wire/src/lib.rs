//! NeuXTP Wire Format
//!
//! Canonical definitions for the NeuXTP on-wire format. There is exactly one
//! header layout, version 1; decode rejects anything else rather than
//! guessing among historical variants.
//!
//! Wire: Ethernet frame, IPv4 header with protocol 253 (0xFD), fixed 14-byte
//! NeuXTP header, then `length` opaque payload bytes. All multi-byte fields
//! are network byte order.

#![warn(missing_docs)]

pub mod frame;
pub mod header;

pub use frame::{parse_frame, write_frame, FrameView};
pub use header::{NxtpHeader, WireError};

/// Supported NeuXTP protocol version
pub const NXTP_VERSION: u8 = 1;

/// IPv4 protocol number signaling a NeuXTP payload
pub const NXTP_PROTO_ID: u8 = 253;

/// Fixed NeuXTP header size in bytes
pub const HEADER_LEN: usize = 14;

/// Flags bit: checksum field is populated and must verify
pub const FLAG_CHECKSUM: u8 = 0x01;

/// Ethernet header size (dst + src + ethertype)
pub const ETH_HDR_LEN: usize = 14;

/// IPv4 header size without options
pub const IPV4_HDR_LEN: usize = 20;

/// Bytes of framing in front of the payload
pub const FRAME_OVERHEAD: usize = ETH_HDR_LEN + IPV4_HDR_LEN + HEADER_LEN;
