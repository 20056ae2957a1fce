// Copyright 2026 the transcoder project developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `std::io` adapters over the incremental engine.
//!
//! [`DecodingReader`] pulls bytes from an [`io::Read`] through a
//! [`Decoder`] into caller-supplied text-unit buffers; [`EncodingWriter`]
//! pushes text units through an [`Encoder`] into an [`io::Write`]. Data
//! errors the coder is configured to `Report` surface as
//! [`io::ErrorKind::InvalidData`]; `Ignore` and `Replace` are resolved by
//! the engine and never reach the adapter.

use std::io;
use std::io::{Read, Write};
use std::ops::Range;

use tracing::debug;

use crate::{CoderResult, Decoder, Encoder};

const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

fn data_error(result: CoderResult) -> io::Error {
    debug!(?result, "surfacing data error as io error");
    io::Error::new(io::ErrorKind::InvalidData, result.raise())
}

/// Reads text units by decoding a wrapped byte stream.
pub struct DecodingReader<R> {
    decoder: Decoder,
    stream: R,
    buffer: Vec<u8>,
    pending: Range<usize>,
    reached_eof: bool,
    flushing: bool,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(decoder: Decoder, stream: R) -> DecodingReader<R> {
        DecodingReader::with_capacity(DEFAULT_BUFFER_SIZE, decoder, stream)
    }

    pub fn with_capacity(capacity: usize, decoder: Decoder, stream: R) -> DecodingReader<R> {
        DecodingReader {
            decoder,
            stream,
            buffer: vec![0u8; capacity.max(4)],
            pending: 0..0,
            reached_eof: false,
            flushing: false,
            finished: false,
        }
    }

    /// Decodes into `dst`, refilling the transport buffer as needed.
    ///
    /// Returns the number of units written; `Ok(0)` with a non-empty
    /// `dst` means the stream ended and the decoder has been flushed.
    pub fn read_units(&mut self, dst: &mut [u16]) -> io::Result<usize> {
        if dst.is_empty() || self.finished {
            return Ok(0);
        }
        loop {
            if self.flushing {
                let (result, written) = self.decoder.flush(dst);
                if result == CoderResult::Underflow {
                    self.finished = true;
                } else if written == 0 {
                    return Err(io::Error::new(io::ErrorKind::InvalidInput,
                                              "output buffer too small to make progress"));
                }
                return Ok(written);
            }
            let last = self.reached_eof;
            let (result, read, written) =
                self.decoder.step(&self.buffer[self.pending.clone()], dst, last);
            self.pending.start += read;
            if result.is_error() {
                if written > 0 {
                    // Hand the produced units out first; the offending
                    // input is still pending and re-detects on the next
                    // call.
                    return Ok(written);
                }
                return Err(data_error(result));
            }
            if result.is_underflow() && last {
                self.flushing = true;
                if written > 0 {
                    return Ok(written);
                }
                continue;
            }
            if result.is_overflow() && written == 0 {
                return Err(io::Error::new(io::ErrorKind::InvalidInput,
                                          "output buffer too small to make progress"));
            }
            if written > 0 {
                return Ok(written);
            }
            // Nothing produced and more input wanted: pull fresh bytes in
            // behind whatever partial sequence is still pending.
            let len = self.pending.end - self.pending.start;
            self.buffer.copy_within(self.pending.clone(), 0);
            let filled = self.stream.read(&mut self.buffer[len..])?;
            self.pending = 0..len + filled;
            if filled == 0 {
                self.reached_eof = true;
            }
        }
    }

    /// Gets a reference to the decoder.
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Unwraps the reader, discarding any undecoded pending bytes.
    pub fn into_inner(self) -> (Decoder, R) {
        (self.decoder, self.stream)
    }
}

/// Writes text units by encoding into a wrapped byte stream.
///
/// [`finish`](EncodingWriter::finish) performs the final end-of-input
/// step and flush; dropping the writer without calling it loses any
/// trailing output the charset would emit.
pub struct EncodingWriter<W: Write> {
    encoder: Encoder,
    stream: W,
    buffer: Vec<u8>,
}

impl<W: Write> EncodingWriter<W> {
    pub fn new(encoder: Encoder, stream: W) -> EncodingWriter<W> {
        EncodingWriter::with_capacity(DEFAULT_BUFFER_SIZE, encoder, stream)
    }

    pub fn with_capacity(capacity: usize, encoder: Encoder, stream: W) -> EncodingWriter<W> {
        EncodingWriter {
            encoder,
            stream,
            buffer: vec![0u8; capacity.max(4)],
        }
    }

    /// Encodes all of `src`, writing the produced bytes through.
    pub fn write_units(&mut self, src: &[u16]) -> io::Result<()> {
        let mut src = src;
        while !src.is_empty() {
            let (result, read, written) = self.encoder.step(src, &mut self.buffer, false);
            src = &src[read..];
            self.stream.write_all(&self.buffer[..written])?;
            match result {
                CoderResult::Underflow | CoderResult::Overflow => {}
                error => return Err(data_error(error)),
            }
        }
        Ok(())
    }

    /// Ends the stream: final end-of-input step, flush, and hand-back of
    /// the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        loop {
            let (result, _, written) = self.encoder.step(&[], &mut self.buffer, true);
            self.stream.write_all(&self.buffer[..written])?;
            match result {
                CoderResult::Underflow => break,
                CoderResult::Overflow => {}
                error => return Err(data_error(error)),
            }
        }
        loop {
            let (result, written) = self.encoder.flush(&mut self.buffer);
            self.stream.write_all(&self.buffer[..written])?;
            match result {
                CoderResult::Underflow => break,
                CoderResult::Overflow => {}
                error => return Err(data_error(error)),
            }
        }
        Ok(self.stream)
    }

    /// Gets a reference to the encoder.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }
}
