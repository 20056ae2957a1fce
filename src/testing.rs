// Copyright 2026 the transcoder project developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Toy charsets and drivers for exercising the engine in tests,
//! examples and downstream loop implementations.

use crate::handles::*;
use crate::{CoderResult, CodingError, DecodeLoop, Decoder, EncodeLoop, Encoder};

/// Byte the direct toy charset rejects as malformed; the corresponding
/// unit (and everything above it) is unmappable on the encode side.
pub const ILLEGAL_BYTE: u8 = 0xFF;

/// Sample high-half table for the single-byte loops: entry `i` maps to
/// `0x0100 + i`, with a hole every sixteenth entry.
pub static SAMPLE_TABLE: [u16; 128] = sample_table();

const fn sample_table() -> [u16; 128] {
    let mut table = [0u16; 128];
    let mut i = 0;
    while i < 128 {
        if i % 16 != 5 {
            table[i] = 0x0100 + i as u16;
        }
        i += 1;
    }
    table
}

/// 1:1 byte-to-unit charset where [`ILLEGAL_BYTE`] is the only illegal
/// byte.
pub struct DirectDecodeLoop;

impl DirectDecodeLoop {
    pub fn new_decoder() -> Decoder {
        Decoder::new(Box::new(DirectDecodeLoop), 1.0, 1.0)
    }
}

impl DecodeLoop for DirectDecodeLoop {
    decode_loop_body!({},
                      {
                          if b == ILLEGAL_BYTE {
                              unread_handle.unread();
                              return CoderResult::Malformed(1);
                          }
                          destination_handle.write_one(b as u16);
                          continue;
                      },
                      self,
                      src,
                      dst,
                      last,
                      b,
                      destination_handle,
                      unread_handle,
                      check_space_one);
}

/// Encode side of the direct toy charset.
pub struct DirectEncodeLoop;

impl DirectEncodeLoop {
    pub fn new_encoder() -> Encoder {
        Encoder::new(Box::new(DirectEncodeLoop), 1.0, 1.0)
    }
}

impl EncodeLoop for DirectEncodeLoop {
    encode_loop_body!({},
                      {
                          if c >= ILLEGAL_BYTE as u16 {
                              unread_handle.unread();
                              return CoderResult::Unmappable(1);
                          }
                          destination_handle.write_one(c as u8);
                          continue;
                      },
                      self,
                      src,
                      dst,
                      last,
                      c,
                      destination_handle,
                      unread_handle,
                      check_space_one);

    fn is_legal_replacement(&self, replacement: &[u8]) -> bool {
        replacement.iter().all(|&b| b != ILLEGAL_BYTE)
    }
}

pub const SHIFT_IN: u8 = 0x0E;
pub const SHIFT_OUT: u8 = 0x0F;

/// Decode side of a stateful shift-mode toy charset.
///
/// Bytes below 0x80 are data; [`SHIFT_IN`]/[`SHIFT_OUT`] toggle an
/// offset of 0x80 on subsequent data bytes; bytes of 0x80 and above are
/// malformed. The encoder ends a shifted stream with a trailing
/// [`SHIFT_OUT`] emitted by `flush`.
pub struct ShiftDecodeLoop {
    shifted: bool,
}

impl ShiftDecodeLoop {
    pub fn new_decoder() -> Decoder {
        Decoder::new(Box::new(ShiftDecodeLoop { shifted: false }), 1.0, 1.0)
    }
}

impl DecodeLoop for ShiftDecodeLoop {
    fn run(&mut self,
           src: &mut ByteSource<'_>,
           dst: &mut UnitDestination<'_>,
           _last: bool)
           -> CoderResult {
        loop {
            match src.check_available() {
                Space::Full(_) => {
                    return CoderResult::Underflow;
                }
                Space::Available(source_handle) => {
                    match dst.check_space_one() {
                        Space::Full(_) => {
                            return CoderResult::Overflow;
                        }
                        Space::Available(destination_handle) => {
                            let (b, unread_handle) = source_handle.read();
                            match b {
                                SHIFT_IN => {
                                    self.shifted = true;
                                }
                                SHIFT_OUT => {
                                    self.shifted = false;
                                }
                                _ if b >= 0x80 => {
                                    unread_handle.unread();
                                    return CoderResult::Malformed(1);
                                }
                                _ => {
                                    let offset = if self.shifted { 0x80 } else { 0 };
                                    destination_handle.write_one(b as u16 + offset);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    fn on_reset(&mut self) {
        self.shifted = false;
    }
}

/// Encode side of the shift-mode toy charset.
pub struct ShiftEncodeLoop {
    shifted: bool,
}

impl ShiftEncodeLoop {
    pub fn new_encoder() -> Encoder {
        // Shift transitions cost an extra byte.
        Encoder::new(Box::new(ShiftEncodeLoop { shifted: false }), 1.0, 2.0)
    }
}

impl EncodeLoop for ShiftEncodeLoop {
    fn run(&mut self,
           src: &mut UnitSource<'_>,
           dst: &mut ByteDestination<'_>,
           _last: bool)
           -> CoderResult {
        loop {
            match src.check_available() {
                Space::Full(_) => {
                    // A dangling shift state is flush's job.
                    return CoderResult::Underflow;
                }
                Space::Available(source_handle) => {
                    match dst.check_space_two() {
                        Space::Full(_) => {
                            return CoderResult::Overflow;
                        }
                        Space::Available(destination_handle) => {
                            let (c, unread_handle) = source_handle.read();
                            if c >= 0x100 || (c & 0x7F) == SHIFT_IN as u16 ||
                               (c & 0x7F) == SHIFT_OUT as u16 {
                                unread_handle.unread();
                                return CoderResult::Unmappable(1);
                            }
                            let byte = (c & 0x7F) as u8;
                            let want_shifted = c >= 0x80;
                            if want_shifted == self.shifted {
                                destination_handle.write_one(byte);
                            } else if want_shifted {
                                destination_handle.write_two(SHIFT_IN, byte);
                                self.shifted = true;
                            } else {
                                destination_handle.write_two(SHIFT_OUT, byte);
                                self.shifted = false;
                            }
                        }
                    }
                }
            }
        }
    }

    fn is_legal_replacement(&self, replacement: &[u8]) -> bool {
        replacement
            .iter()
            .all(|&b| b < 0x80 && b != SHIFT_IN && b != SHIFT_OUT)
    }

    fn flush(&mut self, dst: &mut ByteDestination<'_>) -> CoderResult {
        if self.shifted {
            match dst.check_space_one() {
                Space::Full(_) => {
                    return CoderResult::Overflow;
                }
                Space::Available(handle) => {
                    handle.write_one(SHIFT_OUT);
                    self.shifted = false;
                }
            }
        }
        CoderResult::Underflow
    }

    fn on_reset(&mut self) {
        self.shifted = false;
    }
}

/// Drives `decoder` over `bytes` in `chunk`-sized refills with an
/// `out_capacity`-sized output buffer, collecting everything produced.
/// A `Report`ed error aborts the drive.
pub fn drive_decoder(decoder: &mut Decoder,
                     bytes: &[u8],
                     chunk: usize,
                     out_capacity: usize)
                     -> Result<Vec<u16>, CodingError> {
    assert!(chunk > 0);
    assert!(out_capacity > 0);
    decoder.reset();
    let mut out = Vec::new();
    let mut buf = vec![0u16; out_capacity];
    let mut start = 0usize;
    let mut end = 0usize;
    loop {
        end = bytes.len().min(end + chunk);
        let last = end == bytes.len();
        loop {
            let (result, read, written) = decoder.step(&bytes[start..end], &mut buf, last);
            start += read;
            out.extend_from_slice(&buf[..written]);
            match result {
                CoderResult::Underflow => break,
                CoderResult::Overflow => {
                    if written == 0 {
                        // The buffer cannot even fit the replacement.
                        let grown = buf.len() * 2 + 1;
                        buf.resize(grown, 0);
                    }
                }
                error => return Err(error.raise()),
            }
        }
        if last {
            break;
        }
    }
    loop {
        let (result, written) = decoder.flush(&mut buf);
        out.extend_from_slice(&buf[..written]);
        match result {
            CoderResult::Underflow => break,
            CoderResult::Overflow => {
                if written == 0 {
                    let grown = buf.len() * 2 + 1;
                    buf.resize(grown, 0);
                }
            }
            error => return Err(error.raise()),
        }
    }
    Ok(out)
}

/// Encoder counterpart of [`drive_decoder`].
pub fn drive_encoder(encoder: &mut Encoder,
                     units: &[u16],
                     chunk: usize,
                     out_capacity: usize)
                     -> Result<Vec<u8>, CodingError> {
    assert!(chunk > 0);
    assert!(out_capacity > 0);
    encoder.reset();
    let mut out = Vec::new();
    let mut buf = vec![0u8; out_capacity];
    let mut start = 0usize;
    let mut end = 0usize;
    loop {
        end = units.len().min(end + chunk);
        let last = end == units.len();
        loop {
            let (result, read, written) = encoder.step(&units[start..end], &mut buf, last);
            start += read;
            out.extend_from_slice(&buf[..written]);
            match result {
                CoderResult::Underflow => break,
                CoderResult::Overflow => {
                    if written == 0 {
                        let grown = buf.len() * 2 + 1;
                        buf.resize(grown, 0);
                    }
                }
                error => return Err(error.raise()),
            }
        }
        if last {
            break;
        }
    }
    loop {
        let (result, written) = encoder.flush(&mut buf);
        out.extend_from_slice(&buf[..written]);
        match result {
            CoderResult::Underflow => break,
            CoderResult::Overflow => {
                if written == 0 {
                    let grown = buf.len() * 2 + 1;
                    buf.resize(grown, 0);
                }
            }
            error => return Err(error.raise()),
        }
    }
    Ok(out)
}
