//! Sliding window of decoded history for LZ77 back-references.

use crate::error::{Error, Result};

/// Default history size: the largest distance RFC 1951 can encode.
pub const DEFAULT_WINDOW_SIZE: usize = 1 << 15;

/// Largest accepted history size.
pub const MAX_WINDOW_SIZE: usize = 1 << 30;

/// Bounded byte history with room for `2 * window_size` bytes.
///
/// Appends fill the buffer until it is full; the most recent `window_size`
/// bytes are then moved to the front. At least `window_size` bytes of
/// history (or everything emitted, if less) stay addressable at all times.
#[derive(Debug, Clone)]
pub struct Window {
    buf: Vec<u8>,
    window_size: usize,
    end: usize,
}

impl Window {
    /// Create an empty window retaining at least `window_size` bytes.
    ///
    /// `window_size` must not exceed [`MAX_WINDOW_SIZE`].
    pub fn new(window_size: usize) -> Self {
        Self {
            buf: vec![0; window_size * 2],
            window_size,
            end: 0,
        }
    }

    /// Guaranteed history size.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Bytes of history currently addressable.
    pub fn available(&self) -> usize {
        self.end
    }

    /// Copy `length` bytes starting `distance` bytes before the end.
    ///
    /// When `distance < length` the copy overlaps its own output and the
    /// last `distance` bytes repeat to fill it.
    pub fn read(&self, distance: usize, length: usize) -> Result<Vec<u8>> {
        if distance == 0 || distance > self.end {
            return Err(Error::DistanceTooFarBack {
                distance,
                available: self.end,
            });
        }

        let start = self.end - distance;
        if distance >= length {
            return Ok(self.buf[start..start + length].to_vec());
        }

        let seq = &self.buf[start..self.end];
        let mut out = Vec::with_capacity(length);
        for _ in 0..length / distance {
            out.extend_from_slice(seq);
        }
        out.extend_from_slice(&seq[..length % distance]);
        Ok(out)
    }

    /// Append decoded bytes to the history.
    pub fn push(&mut self, bytes: &[u8]) {
        let size = self.window_size;
        if bytes.len() >= size {
            self.buf[..size].copy_from_slice(&bytes[bytes.len() - size..]);
            self.end = size;
            return;
        }

        if self.end + bytes.len() > self.buf.len() {
            self.buf.copy_within(self.end - size..self.end, 0);
            self.end = size;
        }

        self.buf[self.end..self.end + bytes.len()].copy_from_slice(bytes);
        self.end += bytes.len();
    }
}
