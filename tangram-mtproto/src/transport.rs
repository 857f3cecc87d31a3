//! Abridged stream framing.
//!
//! The first byte on a fresh TCP link is `0xef`; after that every packet is
//! `[len/4 as 1 byte]` (or `0x7f` + 3 LE bytes for large packets) followed by
//! the payload. [`Deframer`] reassembles frames from arbitrarily-chunked
//! reads, which is what a socket actually delivers.

use std::collections::VecDeque;

/// Protocol marker sent once per TCP connection, never parsed as frame data.
pub const INIT_BYTE: u8 = 0xef;

/// Largest accepted frame payload (1 MiB; real envelopes are far smaller).
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Encode the abridged length prefix + payload for one outbound frame.
pub fn encode_frame(data: &[u8]) -> Vec<u8> {
    debug_assert_eq!(data.len() % 4, 0, "frames are 4-byte aligned");
    let words = data.len() / 4;
    let mut out = Vec::with_capacity(4 + data.len());
    if words < 0x7f {
        out.push(words as u8);
    } else {
        out.push(0x7f);
        out.push((words & 0xff) as u8);
        out.push(((words >> 8) & 0xff) as u8);
        out.push(((words >> 16) & 0xff) as u8);
    }
    out.extend_from_slice(data);
    out
}

/// Frame-too-large error from the deframer.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameTooLarge {
    /// Declared payload length in bytes.
    pub len: usize,
}

impl std::fmt::Display for FrameTooLarge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame of {} bytes exceeds the {} byte cap", self.len, MAX_FRAME_LEN)
    }
}
impl std::error::Error for FrameTooLarge {}

/// Incremental decoder for inbound abridged frames.
///
/// Bytes arrive as a FIFO chain of chunks; frames are yielded as soon as the
/// buffered data covers them.
#[derive(Default)]
pub struct Deframer {
    chunks: VecDeque<Vec<u8>>,
    /// Read offset into the front chunk.
    front_pos: usize,
    buffered: usize,
}

impl Deframer {
    /// Create an empty deframer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of bytes read from the socket.
    pub fn push(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.buffered += chunk.len();
        self.chunks.push_back(chunk.to_vec());
    }

    /// Decoded-but-unconsumed byte count.
    pub fn available_bytes_for_read(&self) -> usize {
        self.buffered
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        let mut skip = self.front_pos + offset;
        for chunk in &self.chunks {
            if skip < chunk.len() {
                return Some(chunk[skip]);
            }
            skip -= chunk.len();
        }
        None
    }

    fn consume(&mut self, mut n: usize) -> Vec<u8> {
        debug_assert!(n <= self.buffered);
        let mut out = Vec::with_capacity(n);
        self.buffered -= n;
        while n > 0 {
            let front = self.chunks.front_mut().expect("consume past buffer");
            let take = n.min(front.len() - self.front_pos);
            out.extend_from_slice(&front[self.front_pos..self.front_pos + take]);
            self.front_pos += take;
            n -= take;
            if self.front_pos == front.len() {
                self.chunks.pop_front();
                self.front_pos = 0;
            }
        }
        out
    }

    /// Pop the next complete frame payload, if one is fully buffered.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameTooLarge> {
        let first = match self.peek(0) {
            Some(b) => b,
            None => return Ok(None),
        };

        let (header_len, payload_len) = if first < 0x7f {
            (1usize, first as usize * 4)
        } else {
            let (Some(b1), Some(b2), Some(b3)) = (self.peek(1), self.peek(2), self.peek(3)) else {
                return Ok(None);
            };
            let words = b1 as usize | (b2 as usize) << 8 | (b3 as usize) << 16;
            (4usize, words * 4)
        };

        if payload_len > MAX_FRAME_LEN {
            return Err(FrameTooLarge { len: payload_len });
        }
        if self.buffered < header_len + payload_len {
            return Ok(None);
        }

        self.consume(header_len);
        Ok(Some(self.consume(payload_len)))
    }
}

// ─── Sans-IO transport pair ──────────────────────────────────────────────────

/// A full-duplex byte-stream transport.
pub trait Transport {
    /// The error type returned by read/write operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send raw bytes to the remote.
    fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receive some bytes from the remote (possibly a partial frame).
    fn recv(&mut self) -> Result<Vec<u8>, Self::Error>;
}

/// Applies abridged framing over a [`Transport`].
pub struct AbridgedTransport<T: Transport> {
    inner: T,
    deframer: Deframer,
    init_sent: bool,
}

impl<T: Transport> AbridgedTransport<T> {
    /// Wrap an existing transport.
    pub fn new(inner: T) -> Self {
        Self { inner, deframer: Deframer::new(), init_sent: false }
    }

    /// Send one framed message, emitting the init byte on first use.
    pub fn send_message(&mut self, data: &[u8]) -> Result<(), T::Error> {
        if !self.init_sent {
            self.inner.send(&[INIT_BYTE])?;
            self.init_sent = true;
        }
        self.inner.send(&encode_frame(data))
    }

    /// Receive the next complete framed message, blocking via the inner
    /// transport as needed.
    pub fn recv_message(&mut self) -> Result<Option<Vec<u8>>, T::Error> {
        loop {
            match self.deframer.next_frame() {
                Ok(Some(frame)) => return Ok(Some(frame)),
                Ok(None) => {}
                // Oversized frame means the stream is corrupt; surface EOF-ish None
                Err(_) => return Ok(None),
            }
            let chunk = self.inner.recv()?;
            if chunk.is_empty() {
                return Ok(None);
            }
            self.deframer.push(&chunk);
        }
    }

    /// Access the underlying transport.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_frame_roundtrip() {
        let payload = vec![0xaau8; 8];
        let framed = encode_frame(&payload);
        assert_eq!(framed[0], 2);

        let mut d = Deframer::new();
        d.push(&framed);
        assert_eq!(d.next_frame().unwrap().unwrap(), payload);
        assert!(d.next_frame().unwrap().is_none());
    }

    #[test]
    fn long_frame_uses_extended_header() {
        let payload = vec![0u8; 0x7f * 4];
        let framed = encode_frame(&payload);
        assert_eq!(framed[0], 0x7f);
        assert_eq!(framed.len(), 4 + payload.len());

        let mut d = Deframer::new();
        d.push(&framed);
        assert_eq!(d.next_frame().unwrap().unwrap().len(), payload.len());
    }

    #[test]
    fn reassembles_across_chunk_boundaries() {
        let a = vec![1u8, 2, 3, 4];
        let b = vec![5u8, 6, 7, 8];
        let mut wire = encode_frame(&a);
        wire.extend(encode_frame(&b));

        let mut d = Deframer::new();
        for byte in &wire {
            d.push(std::slice::from_ref(byte));
        }
        assert_eq!(d.next_frame().unwrap().unwrap(), a);
        assert_eq!(d.next_frame().unwrap().unwrap(), b);
        assert!(d.next_frame().unwrap().is_none());
    }

    #[test]
    fn incomplete_frame_yields_nothing() {
        let framed = encode_frame(&[9u8; 16]);
        let mut d = Deframer::new();
        d.push(&framed[..7]);
        assert!(d.next_frame().unwrap().is_none());
        assert_eq!(d.available_bytes_for_read(), 7);
        d.push(&framed[7..]);
        assert_eq!(d.next_frame().unwrap().unwrap(), vec![9u8; 16]);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut d = Deframer::new();
        // 0x7f then 3-byte length describing far more than the cap
        d.push(&[0x7f, 0xff, 0xff, 0xff]);
        assert!(d.next_frame().is_err());
    }
}
