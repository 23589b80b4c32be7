//! Resumable DEFLATE decompression (RFC 1951).
//!
//! [`Inflator`] is a push/pull state machine: compressed bytes go in through
//! [`Inflator::push`] in chunks of any size, and each call to
//! [`Inflator::next_step`] decodes as far as the buffered input allows.
//! Every partially read block header or back-reference is kept in the
//! current [`State`], so a step that runs out of input loses nothing and
//! never re-reads what it already decoded.
//!
//! ```rust
//! use inflow::{Inflator, Step};
//!
//! // A stored block holding "hi".
//! let stream = [0b001, 2, 0, 0xFD, 0xFF, b'h', b'i'];
//!
//! let mut inflator = Inflator::new();
//! inflator.push(&stream[..4]);
//! assert_eq!(inflator.next_step().unwrap(), Step::NeedInput);
//!
//! inflator.push(&stream[4..]);
//! assert_eq!(inflator.next_step().unwrap(), Step::Output(b"hi".to_vec()));
//! assert_eq!(inflator.next_step().unwrap(), Step::Finished);
//! ```

use std::mem;

use super::bit_cursor::BitCursor;
use super::coding::{
    self, CodeTable, LengthRun, DISTANCE_ALPHABET, END_OF_BLOCK, LITERAL_LENGTH_ALPHABET,
    MAX_LENGTH_SYMBOL,
};
use super::window::{Window, DEFAULT_WINDOW_SIZE, MAX_WINDOW_SIZE};
use crate::error::{Error, ReadError, ReadResult, Result};

/// Inflator configuration.
#[derive(Debug, Clone)]
pub struct InflateOptions {
    /// Bytes of history kept for back-references (default 32768, at most
    /// [`MAX_WINDOW_SIZE`]).
    pub window_size: usize,
    /// Input available before the first step.
    pub initial_input: Vec<u8>,
}

impl Default for InflateOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            initial_input: Vec::new(),
        }
    }
}

/// Result of one decode step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Newly decoded bytes (never empty).
    Output(Vec<u8>),
    /// All buffered input was used; push more to continue.
    NeedInput,
    /// The final block is complete. Repeated calls keep returning this.
    Finished,
}

/// Huffman tables of a compressed block.
#[derive(Debug)]
enum Codes {
    Fixed,
    Dynamic {
        literal_length: CodeTable,
        distance: CodeTable,
    },
}

impl Codes {
    fn literal_length(&self) -> &CodeTable {
        match self {
            Codes::Fixed => coding::fixed_literal_length_table(),
            Codes::Dynamic { literal_length, .. } => literal_length,
        }
    }

    fn distance(&self) -> &CodeTable {
        match self {
            Codes::Fixed => coding::fixed_distance_table(),
            Codes::Dynamic { distance, .. } => distance,
        }
    }
}

/// Uncompressed block; LEN and NLEN are kept once read.
#[derive(Debug, Default)]
struct StoredBlock {
    length: Option<u16>,
    complement: Option<u16>,
    position: u16,
}

/// Fixed or dynamic Huffman block.
#[derive(Debug)]
struct CompressedBlock {
    codes: Codes,
    /// Length symbol whose distance has not been read yet.
    symbol: Option<u16>,
    /// Match length resolved from `symbol`.
    length: Option<u16>,
}

/// Dynamic block header, filled one field at a time.
#[derive(Debug, Default)]
struct DynamicHeader {
    hlit: Option<u8>,
    hdist: Option<u8>,
    hclen: Option<u8>,
    code_lengths: Option<CodeTable>,
    literal_length: Option<(CodeTable, LengthRun)>,
}

#[derive(Debug)]
enum State {
    EndOfBlock,
    Stored(StoredBlock),
    Compressed(CompressedBlock),
    DynamicHeader(Box<DynamicHeader>),
    Failed(Error),
}

/// Return the cached value in `slot`, reading and caching it first if empty.
fn fill<T>(slot: &mut Option<T>, read: impl FnOnce() -> ReadResult<T>) -> ReadResult<&mut T> {
    let value = match slot.take() {
        Some(value) => value,
        None => read()?,
    };
    Ok(slot.insert(value))
}

/// Read BFINAL and BTYPE and enter the block they announce.
fn read_block_header(cursor: &mut BitCursor) -> ReadResult<(bool, State)> {
    let (bfinal, btype) = cursor.transaction(|cursor| {
        let bfinal = cursor.read_bits(1)? == 1;
        let btype = cursor.read_number(2)? as u8;
        Ok((bfinal, btype))
    })?;
    tracing::debug!(final_block = bfinal, block_type = btype, "block header");

    let state = match btype {
        0 => {
            cursor.align_to_byte();
            State::Stored(StoredBlock::default())
        }
        1 => State::Compressed(CompressedBlock::new(Codes::Fixed)),
        2 => State::DynamicHeader(Box::default()),
        _ => return Err(Error::InvalidBlockType(btype).into()),
    };
    Ok((bfinal, state))
}

impl StoredBlock {
    /// Copy the next run of raw bytes. Returns true once the block is done.
    fn resume(
        &mut self,
        cursor: &mut BitCursor,
        window: &mut Window,
        output: &mut Vec<u8>,
    ) -> ReadResult<bool> {
        let length = *fill(&mut self.length, || Ok(cursor.read_number(16)? as u16))?;
        let complement = *fill(&mut self.complement, || Ok(cursor.read_number(16)? as u16))?;
        if length != complement ^ 0xFFFF {
            return Err(Error::LengthMismatch { length, complement }.into());
        }

        if self.position >= length {
            return Ok(true);
        }

        let bytes = cursor.read_up_to_n_bytes(usize::from(length - self.position))?;
        self.position += bytes.len() as u16;
        window.push(&bytes);
        output.extend_from_slice(&bytes);
        Ok(self.position == length)
    }
}

impl CompressedBlock {
    fn new(codes: Codes) -> Self {
        Self {
            codes,
            symbol: None,
            length: None,
        }
    }

    /// Decode symbols until end of block.
    fn resume(
        &mut self,
        cursor: &mut BitCursor,
        window: &mut Window,
        output: &mut Vec<u8>,
    ) -> ReadResult<()> {
        loop {
            let symbol = match self.symbol {
                Some(symbol) => symbol,
                None => {
                    let symbol = coding::read_symbol(cursor, self.codes.literal_length())?;
                    match symbol {
                        0..=255 => {
                            let byte = symbol as u8;
                            window.push(&[byte]);
                            output.push(byte);
                            continue;
                        }
                        END_OF_BLOCK => return Ok(()),
                        257..=MAX_LENGTH_SYMBOL => {}
                        _ => return Err(Error::InvalidSymbol(symbol).into()),
                    }
                    *self.symbol.insert(symbol)
                }
            };

            let length = *fill(&mut self.length, || coding::read_length(cursor, symbol))?;
            let distance = coding::read_distance(cursor, self.codes.distance())?;

            let bytes = window.read(distance as usize, usize::from(length))?;
            window.push(&bytes);
            output.extend_from_slice(&bytes);

            self.symbol = None;
            self.length = None;
        }
    }
}

impl DynamicHeader {
    /// Read the remaining header fields and build the block's tables.
    fn resume(&mut self, cursor: &mut BitCursor) -> ReadResult<Codes> {
        let hlit = *fill(&mut self.hlit, || Ok(cursor.read_number(5)? as u8))?;
        let hdist = *fill(&mut self.hdist, || Ok(cursor.read_number(5)? as u8))?;
        let hclen = *fill(&mut self.hclen, || Ok(cursor.read_number(4)? as u8))?;

        let code_lengths = fill(&mut self.code_lengths, || {
            coding::read_code_length_table(cursor, hclen)
        })?;
        let (literal_length, run) = fill(&mut self.literal_length, || {
            coding::read_alphabet(
                cursor,
                code_lengths,
                usize::from(hlit) + 257,
                LITERAL_LENGTH_ALPHABET,
                LengthRun::default(),
            )
        })?;
        let (distance, run) = coding::read_alphabet(
            cursor,
            code_lengths,
            usize::from(hdist) + 1,
            DISTANCE_ALPHABET,
            *run,
        )?;
        if run.is_pending() {
            return Err(Error::InvalidCodeLengths(
                "repeat run overflows the distance code lengths".into(),
            )
            .into());
        }

        tracing::trace!(hlit, hdist, hclen, "dynamic header complete");
        Ok(Codes::Dynamic {
            literal_length: mem::take(literal_length),
            distance,
        })
    }
}

/// Streaming DEFLATE decompressor.
///
/// Owns its input buffer and history window. One instance decodes exactly
/// one raw DEFLATE stream; once a fatal error is returned the instance
/// keeps returning it.
#[derive(Debug)]
pub struct Inflator {
    cursor: BitCursor,
    window: Window,
    state: State,
    final_block: bool,
    closed: bool,
}

impl Inflator {
    /// Create an inflator with a 32 KiB window and no input.
    pub fn new() -> Self {
        Self::build(DEFAULT_WINDOW_SIZE, Vec::new())
    }

    /// Create an inflator from explicit options.
    ///
    /// Fails with [`Error::InvalidWindowSize`] unless `window_size` is in
    /// `1..=MAX_WINDOW_SIZE`.
    pub fn with_options(options: InflateOptions) -> Result<Self> {
        if !(1..=MAX_WINDOW_SIZE).contains(&options.window_size) {
            return Err(Error::InvalidWindowSize(options.window_size));
        }
        Ok(Self::build(options.window_size, options.initial_input))
    }

    fn build(window_size: usize, initial_input: Vec<u8>) -> Self {
        Self {
            cursor: BitCursor::new(initial_input),
            window: Window::new(window_size),
            state: State::EndOfBlock,
            final_block: false,
            closed: false,
        }
    }

    /// Append compressed bytes.
    pub fn push(&mut self, bytes: &[u8]) -> &mut Self {
        self.cursor.push(bytes);
        self
    }

    /// Declare that no more input will be pushed.
    ///
    /// After this, running out of input before the final block completes
    /// is an error instead of [`Step::NeedInput`].
    pub fn close(&mut self) -> &mut Self {
        self.closed = true;
        self
    }

    /// True once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True once the final block has been fully decoded.
    pub fn is_done(&self) -> bool {
        self.final_block && matches!(self.state, State::EndOfBlock)
    }

    /// Input bytes not consumed by the decoder.
    ///
    /// Once [`is_done`](Self::is_done) these are the bytes that followed the
    /// compressed stream.
    pub fn remaining_input(&self) -> &[u8] {
        self.cursor.remaining()
    }

    /// Total input bytes consumed so far.
    pub fn consumed_bytes(&self) -> usize {
        self.cursor.consumed_bytes()
    }

    /// Decode as much as the buffered input allows.
    ///
    /// Returns at the end of each stored chunk or compressed block, or as
    /// soon as input runs out with some output in hand.
    pub fn next_step(&mut self) -> Result<Step> {
        if let State::Failed(err) = &self.state {
            return Err(err.clone());
        }

        let mut output = Vec::new();
        match self.run(&mut output) {
            Ok(step) => Ok(step),
            Err(ReadError::EndOfStream) if !output.is_empty() => Ok(Step::Output(output)),
            Err(ReadError::EndOfStream) if !self.closed => {
                tracing::trace!(consumed = self.consumed_bytes(), "waiting for input");
                Ok(Step::NeedInput)
            }
            Err(ReadError::EndOfStream) => self.fail(Error::UnexpectedEndOfStream),
            Err(ReadError::Fatal(err)) => self.fail(err),
        }
    }

    fn fail(&mut self, err: Error) -> Result<Step> {
        tracing::warn!(error = %err, consumed = self.consumed_bytes(), "inflate failed");
        self.state = State::Failed(err.clone());
        Err(err)
    }

    fn run(&mut self, output: &mut Vec<u8>) -> ReadResult<Step> {
        loop {
            let next = match &mut self.state {
                State::EndOfBlock if self.final_block => {
                    tracing::debug!(
                        consumed = self.cursor.consumed_bytes(),
                        trailing = self.cursor.remaining().len(),
                        "stream finished"
                    );
                    return Ok(Step::Finished);
                }
                State::EndOfBlock => {
                    let (bfinal, state) = read_block_header(&mut self.cursor)?;
                    self.final_block = bfinal;
                    state
                }
                State::Stored(block) => {
                    let finished = block.resume(&mut self.cursor, &mut self.window, output)?;
                    if finished {
                        self.state = State::EndOfBlock;
                    }
                    if output.is_empty() {
                        continue;
                    }
                    return Ok(Step::Output(mem::take(output)));
                }
                State::Compressed(block) => {
                    block.resume(&mut self.cursor, &mut self.window, output)?;
                    self.state = State::EndOfBlock;
                    if output.is_empty() {
                        continue;
                    }
                    return Ok(Step::Output(mem::take(output)));
                }
                State::DynamicHeader(header) => {
                    let codes = header.resume(&mut self.cursor)?;
                    State::Compressed(CompressedBlock::new(codes))
                }
                State::Failed(err) => return Err(err.clone().into()),
            };
            self.state = next;
        }
    }
}

impl Default for Inflator {
    fn default() -> Self {
        Self::new()
    }
}
