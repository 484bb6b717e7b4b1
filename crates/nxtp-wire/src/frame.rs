//! Outer framing: Ethernet and IPv4
//!
//! A NeuXTP packet rides in an IPv4 datagram with protocol number 253.
//! There is no additional framing; the IPv4 total length and header
//! checksum follow standard IPv4 rules.

use crate::header::{NxtpHeader, WireError};
use crate::{ETH_HDR_LEN, HEADER_LEN, IPV4_HDR_LEN, NXTP_PROTO_ID};

/// Ethertype for IPv4
const ETHERTYPE_IPV4: u16 = 0x0800;

/// Destination MAC for synthesized frames (broadcast)
const DST_MAC: [u8; 6] = [0xFF; 6];

/// Source MAC for synthesized frames
const SRC_MAC: [u8; 6] = [0xAA; 6];

/// A parsed frame: the NeuXTP header plus a borrow of its payload
#[derive(Debug)]
pub struct FrameView<'a> {
    /// Decoded NeuXTP header
    pub header: NxtpHeader,
    /// Payload bytes, exactly `header.length` of them
    pub payload: &'a [u8],
}

/// Write a complete Ethernet + IPv4 + NeuXTP frame into `out`.
///
/// Returns the frame length. Fails when `out` cannot hold the frame; the
/// header's `length` field must equal `payload.len()`.
pub fn write_frame(
    out: &mut [u8],
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    header: &NxtpHeader,
    payload: &[u8],
) -> Result<usize, WireError> {
    debug_assert_eq!(header.length as usize, payload.len());
    let total = ETH_HDR_LEN + IPV4_HDR_LEN + HEADER_LEN + payload.len();
    if out.len() < total {
        return Err(WireError::TruncatedFrame(out.len()));
    }

    // Ethernet
    out[0..6].copy_from_slice(&DST_MAC);
    out[6..12].copy_from_slice(&SRC_MAC);
    out[12..14].copy_from_slice(&ETHERTYPE_IPV4.to_be_bytes());

    // IPv4, no options
    let ip = &mut out[ETH_HDR_LEN..ETH_HDR_LEN + IPV4_HDR_LEN];
    ip.fill(0);
    ip[0] = 0x45;
    let ip_total = (IPV4_HDR_LEN + HEADER_LEN + payload.len()) as u16;
    ip[2..4].copy_from_slice(&ip_total.to_be_bytes());
    ip[8] = 64; // TTL
    ip[9] = NXTP_PROTO_ID;
    ip[12..16].copy_from_slice(&src_ip);
    ip[16..20].copy_from_slice(&dst_ip);
    let csum = ipv4_checksum(ip);
    ip[10..12].copy_from_slice(&csum.to_be_bytes());

    // NeuXTP header + payload
    let nxtp = ETH_HDR_LEN + IPV4_HDR_LEN;
    header.encode_into(&mut out[nxtp..nxtp + HEADER_LEN]);
    out[nxtp + HEADER_LEN..total].copy_from_slice(payload);

    Ok(total)
}

/// Parse an Ethernet frame down to the NeuXTP header and payload.
///
/// Non-IPv4 ethertypes and foreign IP protocols are rejected; the header is
/// validated by [`NxtpHeader::decode`], including the payload-length bound.
pub fn parse_frame(buf: &[u8]) -> Result<FrameView<'_>, WireError> {
    if buf.len() < ETH_HDR_LEN + IPV4_HDR_LEN {
        return Err(WireError::TruncatedFrame(buf.len()));
    }

    let ethertype = u16::from_be_bytes([buf[12], buf[13]]);
    if ethertype != ETHERTYPE_IPV4 {
        return Err(WireError::UnexpectedEthertype(ethertype));
    }

    let ihl = ((buf[ETH_HDR_LEN] & 0x0F) as usize) * 4;
    if ihl < IPV4_HDR_LEN || buf.len() < ETH_HDR_LEN + ihl {
        return Err(WireError::TruncatedFrame(buf.len()));
    }

    let protocol = buf[ETH_HDR_LEN + 9];
    if protocol != NXTP_PROTO_ID {
        return Err(WireError::UnexpectedProtocol(protocol));
    }

    let nxtp = ETH_HDR_LEN + ihl;
    let header = NxtpHeader::decode(&buf[nxtp..])?;
    let start = nxtp + HEADER_LEN;
    Ok(FrameView {
        header,
        payload: &buf[start..start + header.length as usize],
    })
}

/// Standard IPv4 header checksum: ones-complement sum of 16-bit words with
/// the checksum field treated as zero
pub fn ipv4_checksum(header: &[u8]) -> u16 {
    let mut sum = 0u32;
    for (i, chunk) in header.chunks(2).enumerate() {
        if i == 5 {
            continue; // checksum field itself
        }
        let word = match chunk {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        };
        sum += word as u32;
    }
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxtp_common::{AiTag, Priority};

    fn build(payload: &[u8]) -> Vec<u8> {
        let header = NxtpHeader::new(42, AiTag::Video, Priority::High, payload.len() as u16)
            .with_checksum(payload);
        let mut buf = vec![0u8; crate::FRAME_OVERHEAD + payload.len()];
        let n = write_frame(&mut buf, [10, 0, 0, 1], [10, 0, 0, 2], &header, payload).unwrap();
        buf.truncate(n);
        buf
    }

    #[test]
    fn test_frame_roundtrip() {
        let frame = build(b"neuxtp payload");

        let view = parse_frame(&frame).unwrap();
        assert_eq!(view.header.session_id, 42);
        assert_eq!(view.header.ai_tag, AiTag::Video);
        assert_eq!(view.header.priority, Priority::High);
        assert_eq!(view.payload, b"neuxtp payload");
    }

    #[test]
    fn test_ip_header_fields() {
        let frame = build(b"xyz");

        assert_eq!(frame[ETH_HDR_LEN] >> 4, 4);
        assert_eq!(frame[ETH_HDR_LEN + 9], NXTP_PROTO_ID);
        let total = u16::from_be_bytes([frame[ETH_HDR_LEN + 2], frame[ETH_HDR_LEN + 3]]);
        assert_eq!(total as usize, IPV4_HDR_LEN + HEADER_LEN + 3);

        // A correct checksum verifies to itself.
        let ip = &frame[ETH_HDR_LEN..ETH_HDR_LEN + IPV4_HDR_LEN];
        let stored = u16::from_be_bytes([ip[10], ip[11]]);
        assert_eq!(ipv4_checksum(ip), stored);
    }

    #[test]
    fn test_rejects_foreign_traffic() {
        let mut frame = build(b"abc");
        frame[12] = 0x86;
        frame[13] = 0xDD; // IPv6
        assert_eq!(
            parse_frame(&frame).unwrap_err(),
            WireError::UnexpectedEthertype(0x86DD)
        );

        let mut frame = build(b"abc");
        frame[ETH_HDR_LEN + 9] = 17; // UDP
        assert_eq!(
            parse_frame(&frame).unwrap_err(),
            WireError::UnexpectedProtocol(17)
        );
    }

    #[test]
    fn test_truncated_frame() {
        let frame = build(b"abcdef");
        assert!(matches!(
            parse_frame(&frame[..20]),
            Err(WireError::TruncatedFrame(20))
        ));
        // Cut inside the payload: header length check catches it.
        assert!(matches!(
            parse_frame(&frame[..frame.len() - 2]),
            Err(WireError::LengthOverrun { .. })
        ));
    }

    #[test]
    fn test_write_frame_needs_room() {
        let header = NxtpHeader::new(1, AiTag::None, Priority::Low, 0);
        let mut buf = [0u8; 32];
        assert!(matches!(
            write_frame(&mut buf, [0; 4], [0; 4], &header, &[]),
            Err(WireError::TruncatedFrame(32))
        ));
    }
}
