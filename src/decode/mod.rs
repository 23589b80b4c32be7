//! Streaming DEFLATE decoding.
//!
//! The engine is split bottom-up into:
//!
//! - [`bit_cursor`]: transactional bit reads over pushed input
//! - [`window`]: history buffer for back-references
//! - [`coding`]: canonical Huffman tables and symbol decoding
//! - [`inflate`](mod@inflate): the block state machine ([`Inflator`])
//! - [`reader`]: blocking [`std::io::Read`] bridge and one-shot helper

pub mod bit_cursor;
pub mod coding;
pub mod inflate;
pub mod reader;
pub mod window;

pub use bit_cursor::BitCursor;
pub use coding::CodeTable;
pub use inflate::{InflateOptions, Inflator, Step};
pub use reader::{inflate, InflateReader};
pub use window::{Window, DEFAULT_WINDOW_SIZE, MAX_WINDOW_SIZE};
