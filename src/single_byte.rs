// Copyright 2026 the transcoder project developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Table-driven conversion loops for single-byte charsets.
//!
//! The low half of the byte range is an identity mapping; the high half
//! is driven by a caller-supplied 128-entry table where a zero entry
//! marks a byte with no mapping.

use crate::handles::*;
use crate::{CoderResult, DecodeLoop, Decoder, EncodeLoop, Encoder};

pub struct SingleByteDecodeLoop {
    table: &'static [u16; 128],
}

impl SingleByteDecodeLoop {
    pub fn new(table: &'static [u16; 128]) -> SingleByteDecodeLoop {
        SingleByteDecodeLoop { table }
    }

    /// Wraps the loop in a [`Decoder`] with single-byte sizing hints.
    pub fn new_decoder(table: &'static [u16; 128]) -> Decoder {
        Decoder::new(Box::new(SingleByteDecodeLoop::new(table)), 1.0, 1.0)
    }
}

impl DecodeLoop for SingleByteDecodeLoop {
    decode_loop_body!({},
                      {
                          if b < 0x80 {
                              destination_handle.write_one(b as u16);
                              continue;
                          }
                          let mapped = self.table[b as usize - 0x80usize];
                          if mapped == 0u16 {
                              unread_handle.unread();
                              return CoderResult::Malformed(1);
                          }
                          destination_handle.write_one(mapped);
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

pub struct SingleByteEncodeLoop {
    table: &'static [u16; 128],
}

impl SingleByteEncodeLoop {
    pub fn new(table: &'static [u16; 128]) -> SingleByteEncodeLoop {
        SingleByteEncodeLoop { table }
    }

    /// Wraps the loop in an [`Encoder`] with single-byte sizing hints.
    pub fn new_encoder(table: &'static [u16; 128]) -> Encoder {
        Encoder::new(Box::new(SingleByteEncodeLoop::new(table)), 1.0, 1.0)
    }
}

impl EncodeLoop for SingleByteEncodeLoop {
    encode_loop_body!({},
                      {
                          if c < 0x80 {
                              destination_handle.write_one(c as u8);
                              continue;
                          }
                          // Loop backwards, because the lowest quarter
                          // is the least probable.
                          let mut i = 127usize;
                          loop {
                              if self.table[i] == c {
                                  destination_handle.write_one((i + 128) as u8);
                                  break;
                              }
                              if i == 0 {
                                  unread_handle.unread();
                                  return CoderResult::Unmappable(1);
                              }
                              i -= 1;
                          }
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
        replacement
            .iter()
            .all(|&b| b < 0x80 || self.table[b as usize - 0x80] != 0)
    }
}
