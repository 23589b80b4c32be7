//! Fuzz target for streaming DEFLATE decompression.
//!
//! Feeds arbitrary bytes through the inflator in arbitrary chunk sizes.
//! Decoding must never panic, and the outcome must match decoding the
//! same bytes pushed all at once.

#![no_main]

use arbitrary::Arbitrary;
use inflow::{inflate, Error, Inflator, Step};
use libfuzzer_sys::fuzz_target;

/// Structured input for inflate fuzzing.
#[derive(Arbitrary, Debug)]
struct InflateInput {
    /// Compressed (or garbage) stream
    data: Vec<u8>,
    /// Sizes of successive pushes, cycled
    chunk_sizes: Vec<u8>,
}

/// Cap on decoded output to keep runs short.
const MAX_OUTPUT: usize = 1 << 22;

fn inflate_chunked(data: &[u8], chunk_sizes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut inflator = Inflator::new();
    let mut sizes = chunk_sizes.iter().cycle();
    let mut rest = data;
    let mut out = Vec::new();
    loop {
        match inflator.next_step()? {
            Step::Output(chunk) => {
                assert!(!chunk.is_empty(), "empty output chunk");
                out.extend_from_slice(&chunk);
            }
            Step::Finished => return Ok(out),
            Step::NeedInput => {
                if rest.is_empty() {
                    inflator.close();
                    continue;
                }
                let size = sizes.next().map_or(rest.len(), |&s| usize::from(s));
                let n = size.clamp(1, rest.len());
                inflator.push(&rest[..n]);
                rest = &rest[n..];
            }
        }
    }
}

fuzz_target!(|input: InflateInput| {
    // Limit input size; a short stream can still expand a lot
    if input.data.len() > 16 * 1024 {
        return;
    }

    let whole = inflate(&input.data);
    if whole.as_ref().is_ok_and(|out| out.len() > MAX_OUTPUT) {
        return;
    }

    let chunked = inflate_chunked(&input.data, &input.chunk_sizes);
    assert_eq!(whole, chunked, "outcome depends on chunking");
});
