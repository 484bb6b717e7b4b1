//! Local scoring daemon transport
//!
//! Structured, framed request/response over a TCP connection to a scoring
//! daemon on the same host. Replaces any file- or stdout-based handoff with
//! explicit length-prefixed frames and status codes.
//!
//! Request frame:  `count: u16 BE`, then per payload `len: u32 BE` + bytes.
//! Response frame: `count: u16 BE`, then per item `status: u8` + `score: u8`.
//! Status 0 is success; any other value fails the call with that code.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::backend::{BackendError, ScoreBackend};

/// Oracle client over a framed TCP byte protocol.
///
/// The connection is kept open across calls and re-established after any
/// IO error. All socket waits are capped by `timeout`; the gateway's
/// deadline machinery handles the caller-visible bound.
pub struct SocketBackend {
    addr: String,
    timeout: Duration,
    conn: Mutex<Option<TcpStream>>,
}

impl SocketBackend {
    /// Client for the daemon at `addr` (host:port)
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            conn: Mutex::new(None),
        }
    }

    fn connect(&self) -> Result<TcpStream, BackendError> {
        let stream = TcpStream::connect(&self.addr)
            .map_err(|e| BackendError::Unavailable(format!("{}: {}", self.addr, e)))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn exchange(&self, stream: &mut TcpStream, payloads: &[Bytes]) -> Result<Vec<u8>, BackendError> {
        let request = encode_request(payloads);
        stream.write_all(&request)?;

        let mut count_buf = [0u8; 2];
        stream.read_exact(&mut count_buf)?;
        let count = u16::from_be_bytes(count_buf) as usize;

        let mut items = vec![0u8; count * 2];
        stream.read_exact(&mut items)?;
        decode_response(count, &items, payloads.len())
    }
}

impl ScoreBackend for SocketBackend {
    fn name(&self) -> &'static str {
        "socket"
    }

    fn score_batch(&self, payloads: &[Bytes]) -> Result<Vec<u8>, BackendError> {
        let mut guard = self.conn.lock();
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        let stream = guard.as_mut().expect("connection just established");

        match self.exchange(stream, payloads) {
            Ok(scores) => Ok(scores),
            Err(e) => {
                // Drop the connection; the next call reconnects.
                *guard = None;
                Err(e)
            }
        }
    }
}

/// Serialize one batch request
fn encode_request(payloads: &[Bytes]) -> Vec<u8> {
    let total: usize = payloads.iter().map(|p| 4 + p.len()).sum();
    let mut out = Vec::with_capacity(2 + total);
    out.extend_from_slice(&(payloads.len() as u16).to_be_bytes());
    for payload in payloads {
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
    }
    out
}

/// Validate a response body of `count` (status, score) pairs
fn decode_response(count: usize, items: &[u8], expected: usize) -> Result<Vec<u8>, BackendError> {
    if count != expected {
        return Err(BackendError::Protocol(format!(
            "scored {} payloads, sent {}",
            count, expected
        )));
    }
    if items.len() != count * 2 {
        return Err(BackendError::Protocol(format!(
            "{} response bytes for {} items",
            items.len(),
            count
        )));
    }

    let mut scores = Vec::with_capacity(count);
    for pair in items.chunks_exact(2) {
        let (status, score) = (pair[0], pair[1]);
        if status != 0 {
            return Err(BackendError::Protocol(format!("oracle status {}", status)));
        }
        scores.push(score);
    }
    Ok(scores)
}
