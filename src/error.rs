//! Error types for the inflow library.

use std::fmt;

/// Result type alias for inflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result of a read that may stop short for lack of input.
pub type ReadResult<T> = std::result::Result<T, ReadError>;

/// Errors that abort decoding of a DEFLATE stream.
///
/// DEFLATE has no resynchronization point, so every variant except
/// [`Error::InvalidWindowSize`] is terminal for the stream that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Block header carried the reserved block type 3.
    InvalidBlockType(u8),
    /// Stored block LEN is not the one's complement of NLEN.
    LengthMismatch {
        /// LEN field.
        length: u16,
        /// NLEN field.
        complement: u16,
    },
    /// A decoded symbol lies outside its alphabet.
    InvalidSymbol(u16),
    /// The input bits match no code in the active Huffman table.
    UndecodableSymbol,
    /// A set of code lengths that cannot describe a prefix code.
    InvalidCodeLengths(String),
    /// Back-reference reaches before the start of the emitted history.
    DistanceTooFarBack {
        /// Requested distance.
        distance: usize,
        /// Bytes of history available.
        available: usize,
    },
    /// Input was closed before the final block completed.
    UnexpectedEndOfStream,
    /// Window size must be non-zero and at most `MAX_WINDOW_SIZE`.
    InvalidWindowSize(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidBlockType(btype) => {
                write!(f, "Invalid block type: {}", btype)
            }
            Error::LengthMismatch { length, complement } => {
                write!(
                    f,
                    "Stored block length mismatch: LEN {:#06x}, NLEN {:#06x}",
                    length, complement
                )
            }
            Error::InvalidSymbol(symbol) => {
                write!(f, "Invalid symbol: {}", symbol)
            }
            Error::UndecodableSymbol => {
                write!(f, "Input bits match no Huffman code")
            }
            Error::InvalidCodeLengths(msg) => {
                write!(f, "Invalid code lengths: {}", msg)
            }
            Error::DistanceTooFarBack {
                distance,
                available,
            } => {
                write!(
                    f,
                    "Distance too far back: {} with only {} bytes of history",
                    distance, available
                )
            }
            Error::UnexpectedEndOfStream => {
                write!(f, "Unexpected end of stream")
            }
            Error::InvalidWindowSize(size) => {
                write!(
                    f,
                    "Invalid window size {}: must be between 1 and {}",
                    size,
                    crate::decode::window::MAX_WINDOW_SIZE
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// Why a read could not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// More input is needed. The reader state is unchanged.
    EndOfStream,
    /// The stream is corrupt.
    Fatal(Error),
}

impl From<Error> for ReadError {
    fn from(err: Error) -> Self {
        ReadError::Fatal(err)
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::EndOfStream => write!(f, "End of buffered input"),
            ReadError::Fatal(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ReadError {}
