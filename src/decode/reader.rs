//! Blocking bridges between byte sources and [`Inflator`].

use std::io::{self, Read};

use super::inflate::{InflateOptions, Inflator, Step};
use crate::error::{Error, Result};

/// Size of each read from the underlying source.
const INPUT_CHUNK_SIZE: usize = 8 * 1024;

/// Decompress a complete raw DEFLATE stream held in memory.
///
/// Bytes following the end of the stream are ignored.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflator = Inflator::new();
    inflator.push(data).close();

    let mut output = Vec::new();
    loop {
        match inflator.next_step()? {
            Step::Output(chunk) => output.extend_from_slice(&chunk),
            Step::Finished => return Ok(output),
            // Unreachable once closed; treated as truncation.
            Step::NeedInput => return Err(Error::UnexpectedEndOfStream),
        }
    }
}

/// [`Read`] adapter that decompresses a raw DEFLATE stream from `R`.
///
/// Input is pulled from `R` only when the inflator needs it. EOF from `R`
/// before the stream is complete is reported as
/// [`io::ErrorKind::UnexpectedEof`]; corrupt input as
/// [`io::ErrorKind::InvalidData`].
#[derive(Debug)]
pub struct InflateReader<R> {
    inner: R,
    inflator: Inflator,
    chunk: Vec<u8>,
    chunk_pos: usize,
}

impl<R: Read> InflateReader<R> {
    /// Wrap `inner` with a default inflator.
    pub fn new(inner: R) -> Self {
        Self::with_inflator(inner, Inflator::new())
    }

    /// Wrap `inner` with an inflator built from `options`.
    pub fn with_options(inner: R, options: InflateOptions) -> Result<Self> {
        Ok(Self::with_inflator(inner, Inflator::with_options(options)?))
    }

    fn with_inflator(inner: R, inflator: Inflator) -> Self {
        Self {
            inner,
            inflator,
            chunk: Vec::new(),
            chunk_pos: 0,
        }
    }

    /// The underlying source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// The inflator, e.g. to inspect trailing input once finished.
    pub fn inflator(&self) -> &Inflator {
        &self.inflator
    }

    /// Unwrap the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill_input(&mut self) -> io::Result<()> {
        let mut buf = [0u8; INPUT_CHUNK_SIZE];
        let n = loop {
            match self.inner.read(&mut buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };
        if n == 0 {
            self.inflator.close();
        } else {
            self.inflator.push(&buf[..n]);
        }
        Ok(())
    }
}

impl<R: Read> Read for InflateReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if self.chunk_pos < self.chunk.len() {
                let pending = &self.chunk[self.chunk_pos..];
                let n = pending.len().min(buf.len());
                buf[..n].copy_from_slice(&pending[..n]);
                self.chunk_pos += n;
                return Ok(n);
            }

            match self.inflator.next_step().map_err(into_io_error)? {
                Step::Output(chunk) => {
                    self.chunk = chunk;
                    self.chunk_pos = 0;
                }
                Step::NeedInput => self.fill_input()?,
                Step::Finished => return Ok(0),
            }
        }
    }
}

fn into_io_error(err: Error) -> io::Error {
    let kind = match err {
        Error::UnexpectedEndOfStream => io::ErrorKind::UnexpectedEof,
        _ => io::ErrorKind::InvalidData,
    };
    io::Error::new(kind, err)
}
