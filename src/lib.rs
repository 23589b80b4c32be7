//! # inflow
//!
//! An incremental DEFLATE (RFC 1951) decompressor.
//!
//! Compressed bytes can arrive in chunks of any size, split anywhere, even
//! in the middle of a Huffman code. The decoder emits output as soon as it
//! can and pauses cleanly whenever the buffered input runs out, without
//! blocking and without re-decoding anything on resume.
//!
//! ## Features
//!
//! - **Push/pull API**: [`Inflator::push`] input, [`Inflator::next_step`] output
//! - **Stored, fixed and dynamic Huffman blocks**
//! - **Blocking [`std::io::Read`] adapter** via [`InflateReader`]
//! - Raw DEFLATE only; zlib/gzip framing is left to the caller
//!
//! ## Example
//!
//! ```rust
//! use inflow::{Inflator, Step};
//!
//! // Raw DEFLATE for "aaaaaa": literal 'a', then a 5-byte match at distance 1.
//! let compressed = [0x4B, 0x04, 0x03, 0x00];
//!
//! let mut inflator = Inflator::new();
//! let mut output = Vec::new();
//! for byte in compressed {
//!     inflator.push(&[byte]);
//!     while let Step::Output(chunk) = inflator.next_step().unwrap() {
//!         output.extend_from_slice(&chunk);
//!     }
//! }
//! assert!(inflator.is_done());
//! assert_eq!(output, b"aaaaaa");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod decode;
pub mod error;

pub use decode::{inflate, InflateOptions, InflateReader, Inflator, Step};
pub use error::{Error, Result};
