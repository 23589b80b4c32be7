//! Bit-level cursor over pushed input for DEFLATE decoding.
//!
//! Bytes arrive in arbitrary chunks through [`BitCursor::push`] and are
//! loaded lazily, one byte at a time, into a single-byte cache. Every
//! multi-bit read is a transaction: when the buffered input runs out
//! part-way through, the cursor is rolled back to where the read started,
//! so the caller can push more input and simply retry.

use crate::error::{ReadError, ReadResult};

/// Position snapshot taken at the start of a read transaction.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    pos: usize,
    current: u8,
    bit_offset: u8,
    consumed: usize,
}

/// Transactional bit reader over an append-only input buffer.
///
/// Bits are taken from each byte starting at the least significant bit,
/// as DEFLATE stores them.
#[derive(Debug, Clone)]
pub struct BitCursor {
    pending: Vec<u8>,
    pos: usize,
    current: u8,
    /// Bits of `current` already used; 8 means the cache must be reloaded.
    bit_offset: u8,
    consumed: usize,
}

impl BitCursor {
    /// Create a cursor that starts with `initial` as its pending input.
    pub fn new(initial: Vec<u8>) -> Self {
        Self {
            pending: initial,
            pos: 0,
            current: 0,
            bit_offset: 8,
            consumed: 0,
        }
    }

    /// Append bytes to the pending input.
    pub fn push(&mut self, bytes: &[u8]) {
        if self.pos > 0 {
            self.pending.drain(..self.pos);
            self.pos = 0;
        }
        self.pending.extend_from_slice(bytes);
    }

    /// Pending bytes not yet loaded.
    pub fn remaining(&self) -> &[u8] {
        &self.pending[self.pos..]
    }

    /// Total number of input bytes loaded so far.
    pub fn consumed_bytes(&self) -> usize {
        self.consumed
    }

    /// True when no bits of the cached byte remain unread.
    pub fn is_aligned(&self) -> bool {
        self.bit_offset == 8
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            current: self.current,
            bit_offset: self.bit_offset,
            consumed: self.consumed,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.current = checkpoint.current;
        self.bit_offset = checkpoint.bit_offset;
        self.consumed = checkpoint.consumed;
    }

    /// Run `read` as a single transaction.
    ///
    /// If `read` fails with [`ReadError::EndOfStream`] every bit it consumed
    /// is put back. Fatal errors leave the cursor where the failure
    /// occurred.
    pub fn transaction<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> ReadResult<T>,
    ) -> ReadResult<T> {
        let checkpoint = self.checkpoint();
        let result = read(self);
        if let Err(ReadError::EndOfStream) = result {
            self.restore(checkpoint);
        }
        result
    }

    fn load_next_byte(&mut self) -> ReadResult<()> {
        let Some(&byte) = self.pending.get(self.pos) else {
            return Err(ReadError::EndOfStream);
        };
        self.current = byte;
        self.pos += 1;
        self.bit_offset = 0;
        self.consumed += 1;
        Ok(())
    }

    /// Read `n` bits, packing the first bit read into the most significant
    /// position of the result.
    ///
    /// This is the order Huffman codes are stored in.
    pub fn read_bits(&mut self, n: u8) -> ReadResult<u32> {
        debug_assert!(n <= 32);
        self.transaction(|cursor| {
            let mut value = 0u32;
            for _ in 0..n {
                if cursor.bit_offset == 8 {
                    cursor.load_next_byte()?;
                }
                let bit = (cursor.current >> cursor.bit_offset) & 1;
                value = (value << 1) | u32::from(bit);
                cursor.bit_offset += 1;
            }
            Ok(value)
        })
    }

    /// Read a `width`-bit integer stored least significant bit first.
    #[inline]
    pub fn read_number(&mut self, width: u8) -> ReadResult<u32> {
        Ok(reverse_bits(self.read_bits(width)?, width))
    }

    /// Read between one and `n` whole bytes, as many as are buffered.
    ///
    /// When the cursor sits on a byte boundary the bytes are sliced straight
    /// from the pending input; otherwise each byte is assembled from the
    /// bit stream.
    pub fn read_up_to_n_bytes(&mut self, n: usize) -> ReadResult<Vec<u8>> {
        let available = n.min(self.remaining().len());
        if available == 0 {
            return Err(ReadError::EndOfStream);
        }

        if self.is_aligned() {
            let bytes = self.pending[self.pos..self.pos + available].to_vec();
            self.pos += available;
            self.consumed += available;
            return Ok(bytes);
        }

        // Each byte spans the cached bits and one unloaded byte, so
        // `available` reads cannot run out.
        let mut bytes = Vec::with_capacity(available);
        for _ in 0..available {
            bytes.push(self.read_number(8)? as u8);
        }
        Ok(bytes)
    }

    /// Discard the unread bits of the cached byte.
    pub fn align_to_byte(&mut self) {
        self.bit_offset = 8;
    }
}

impl Default for BitCursor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Reverse the low `width` bits of `value`.
pub(crate) fn reverse_bits(value: u32, width: u8) -> u32 {
    let mut result = 0u32;
    let mut v = value;
    for _ in 0..width {
        result = (result << 1) | (v & 1);
        v >>= 1;
    }
    result
}
