// Copyright 2026 the transcoder project developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! transcoder is an incremental charset transcoding engine: a paired
//! [`Decoder`]/[`Encoder`] abstraction that converts between a
//! byte-oriented external representation and fixed-width 16-bit text
//! units, across multiple buffer refills, with configurable
//! malformed-input and unmappable-character handling.
//!
//! The unit-by-unit translation itself is pluggable: a concrete charset
//! supplies a [`DecodeLoop`]/[`EncodeLoop`] implementation and the engine
//! drives it, interpreting each [`CoderResult`] it returns according to
//! the configured [`CodingErrorAction`]s. A generic table-driven
//! single-byte loop ships in [`single_byte`]; `std::io` adapters ship in
//! [`stream`].
//!
//! ```
//! use transcoder::single_byte::SingleByteDecodeLoop;
//! use transcoder::testing::SAMPLE_TABLE;
//!
//! let mut decoder = SingleByteDecodeLoop::new_decoder(&SAMPLE_TABLE);
//! let units = decoder.decode_all(b"A\x80").unwrap();
//! assert_eq!(units, [0x0041, 0x0100]);
//! ```

use smallvec::{smallvec, SmallVec};
use thiserror::Error;
use tracing::{debug, trace};

#[macro_use]
mod macros;

pub mod handles;
pub mod single_byte;
pub mod stream;
pub mod testing;

use crate::handles::{ByteDestination, ByteSource, UnitDestination, UnitSource};

/// Result of a (potentially partial) conversion step.
///
/// Every call into a conversion loop, and every [`Decoder::step`] /
/// [`Encoder::step`] call, classifies its termination as one of these.
/// The error variants carry the length of the offending input run;
/// the length is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderResult {
    /// All available input was consumed.
    ///
    /// If this was returned from a step where `end_of_input` was `true`,
    /// the operation is complete apart from flushing. Otherwise the caller
    /// should call again with more input.
    Underflow,

    /// The output buffer does not have enough space left for another unit
    /// of output. The caller must drain the output and call again with the
    /// unconsumed input.
    Overflow,

    /// The next `length()` input units do not form a legal unit sequence
    /// in the source representation. They are left unconsumed at the
    /// input cursor.
    Malformed(usize),

    /// The next `length()` input units form a legal source unit but have
    /// no representation in the target. They are left unconsumed at the
    /// input cursor.
    Unmappable(usize),
}

impl CoderResult {
    #[inline]
    pub fn is_underflow(self) -> bool {
        self == CoderResult::Underflow
    }

    #[inline]
    pub fn is_overflow(self) -> bool {
        self == CoderResult::Overflow
    }

    #[inline]
    pub fn is_error(self) -> bool {
        self.is_malformed() || self.is_unmappable()
    }

    #[inline]
    pub fn is_malformed(self) -> bool {
        matches!(self, CoderResult::Malformed(_))
    }

    #[inline]
    pub fn is_unmappable(self) -> bool {
        matches!(self, CoderResult::Unmappable(_))
    }

    /// Length of the offending input run.
    ///
    /// # Panics
    ///
    /// Panics if the result is not an error.
    pub fn length(self) -> usize {
        match self {
            CoderResult::Malformed(len) | CoderResult::Unmappable(len) => len,
            result => panic!("length() called on a result that is not an error: {:?}", result),
        }
    }

    /// Converts the result into the failure the one-shot wrappers
    /// propagate.
    pub fn raise(self) -> CodingError {
        match self {
            CoderResult::Underflow => CodingError::BufferUnderflow,
            CoderResult::Overflow => CodingError::BufferOverflow,
            CoderResult::Malformed(len) => CodingError::MalformedInput(len),
            CoderResult::Unmappable(len) => CodingError::UnmappableCharacter(len),
        }
    }
}

/// What a coder does when the conversion loop reports malformed input or
/// an unmappable character.
///
/// One action applies to malformed-input errors and, independently, one
/// to unmappable-character errors. Both default to `Report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodingErrorAction {
    /// Drop the offending input and continue.
    Ignore,
    /// Drop the offending input, emit the replacement, and continue.
    Replace,
    /// Surface the error to the caller.
    #[default]
    Report,
}

/// Terminal failure of a one-shot [`Decoder::decode_all`] /
/// [`Encoder::encode_all`] operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingError {
    #[error("malformed input of length {0}")]
    MalformedInput(usize),
    #[error("unmappable character of length {0}")]
    UnmappableCharacter(usize),
    #[error("output buffer too small")]
    BufferOverflow,
    #[error("input exhausted prematurely")]
    BufferUnderflow,
}

/// Rejected replacement content: empty, longer than the coder's
/// max-per-unit sizing hint, or (for encoders) not decodable by the
/// charset. The previously configured replacement stays in effect.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("replacement is empty, oversized, or not decodable by the charset")]
pub struct InvalidReplacement;

/// Call-protocol phase of a coder. See [`Decoder`] for the sequencing
/// rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reset,
    Coding,
    End,
    Flushed,
}

/// The charset-specific primitive a [`Decoder`] delegates to.
///
/// `run` translates bytes from `src` into text units in `dst` until the
/// input runs out (`Underflow`), the output fills up (`Overflow`), or an
/// illegal or unmappable sequence is found. On an error return the
/// offending units must be left unconsumed at the input cursor, so that
/// the engine can skip or re-detect them; the `unread` facility on read
/// handles exists for exactly this.
///
/// A loop may return `Underflow` while holding lookahead state
/// internally (for multi-byte sequences split across buffer refills), as
/// long as a `last = true` run resolves or reports that state, or
/// `flush` emits it. Trailing input a loop leaves unconsumed at a
/// `last = true` run is classified by the engine as malformed.
pub trait DecodeLoop {
    fn run(&mut self, src: &mut ByteSource<'_>, dst: &mut UnitDestination<'_>, last: bool)
           -> CoderResult;

    /// Emit any trailing output once the input stream has ended.
    fn flush(&mut self, _dst: &mut UnitDestination<'_>) -> CoderResult {
        CoderResult::Underflow
    }

    /// Reinitialize charset-specific state for a new stream.
    fn on_reset(&mut self) {}

    /// Observes a validated replacement change.
    fn on_replacement_changed(&mut self, _replacement: &[u16]) {}

    /// Observes a malformed-input action change.
    fn on_malformed_action(&mut self, _action: CodingErrorAction) {}

    /// Observes an unmappable-character action change.
    fn on_unmappable_action(&mut self, _action: CodingErrorAction) {}
}

/// The charset-specific primitive an [`Encoder`] delegates to.
///
/// Mirror image of [`DecodeLoop`]: translates text units from `src` into
/// bytes in `dst` under the same cursor contract, and additionally judges
/// whether candidate replacement bytes are decodable by the charset.
pub trait EncodeLoop {
    fn run(&mut self, src: &mut UnitSource<'_>, dst: &mut ByteDestination<'_>, last: bool)
           -> CoderResult;

    /// Whether the charset's reverse mapping can decode `replacement`
    /// back to real text.
    fn is_legal_replacement(&self, replacement: &[u8]) -> bool;

    /// Emit any trailing output once the input stream has ended (e.g.
    /// shift-state reset bytes).
    fn flush(&mut self, _dst: &mut ByteDestination<'_>) -> CoderResult {
        CoderResult::Underflow
    }

    /// Reinitialize charset-specific state for a new stream.
    fn on_reset(&mut self) {}

    /// Observes a validated replacement change.
    fn on_replacement_changed(&mut self, _replacement: &[u8]) {}

    /// Observes a malformed-input action change.
    fn on_malformed_action(&mut self, _action: CodingErrorAction) {}

    /// Observes an unmappable-character action change.
    fn on_unmappable_action(&mut self, _action: CodingErrorAction) {}
}

/// A converter that decodes a byte stream into 16-bit text units.
///
/// `step` takes an input buffer (`src`) and an output buffer (`dst`),
/// both caller-allocated, and decodes until one of three things happens:
/// the input is exhausted, the output has no room for another unit, or
/// an error is found and the configured action for its kind is
/// `Report`. It returns the classifying [`CoderResult`] together with
/// how many input bytes were read and how many units were written.
/// Under `Ignore` and `Replace` the error is resolved internally and
/// decoding continues within the same call.
///
/// During the processing of a single stream, the caller calls `step`
/// zero or more times with `end_of_input` set to `false` and then at
/// least once with `end_of_input` set to `true`; once a `true` call has
/// returned `Underflow`, the caller drains any trailing output with
/// `flush`. Skipping the final `true` call is legal but leaves the
/// operation incomplete: trailing input the loop is still holding is
/// never classified as malformed.
///
/// When `step` returns `Overflow`, or an error the caller does not wish
/// to treat as fatal, the input buffer may not have been completely
/// consumed; the caller must pass the unconsumed remainder to `step`
/// again on the next call.
///
/// The phase sequencing is strict: `step` after a completed end-of-input
/// call, `flush` before one, a `false` call after a `true` one, or a
/// one-shot invocation while a stream is mid-sequence all panic. `reset`
/// makes the decoder ready for a new stream from any phase.
///
/// A decoder can be used for multiple streams sequentially but holds
/// mutable sequencing state, so it cannot be shared across threads;
/// create one per task.
pub struct Decoder {
    inner: Box<dyn DecodeLoop>,
    replacement: SmallVec<[u16; 2]>,
    malformed_action: CodingErrorAction,
    unmappable_action: CodingErrorAction,
    average_units_per_byte: f32,
    max_units_per_byte: f32,
    phase: Phase,
    prior_last: bool,
}

impl Decoder {
    /// Wraps a conversion loop, binding it to the given sizing hints.
    ///
    /// `average_units_per_byte` sizes one-shot output buffers;
    /// `max_units_per_byte` bounds replacement length. Both must be
    /// positive. The initial replacement is U+FFFD and both error
    /// actions start as `Report`.
    pub fn new(inner: Box<dyn DecodeLoop>,
               average_units_per_byte: f32,
               max_units_per_byte: f32)
               -> Decoder {
        assert!(average_units_per_byte > 0.0);
        assert!(max_units_per_byte > 0.0);
        Decoder {
            inner,
            replacement: smallvec![0xFFFDu16],
            malformed_action: CodingErrorAction::Report,
            unmappable_action: CodingErrorAction::Report,
            average_units_per_byte,
            max_units_per_byte,
            phase: Phase::Reset,
            prior_last: false,
        }
    }

    pub fn average_units_per_byte(&self) -> f32 {
        self.average_units_per_byte
    }

    pub fn max_units_per_byte(&self) -> f32 {
        self.max_units_per_byte
    }

    pub fn replacement(&self) -> &[u16] {
        &self.replacement
    }

    pub fn malformed_action(&self) -> CodingErrorAction {
        self.malformed_action
    }

    pub fn unmappable_action(&self) -> CodingErrorAction {
        self.unmappable_action
    }

    /// Replaces the replacement content emitted under
    /// [`CodingErrorAction::Replace`].
    ///
    /// The content must be non-empty and no longer than the
    /// max-units-per-byte hint. Takes effect from the next step.
    pub fn set_replacement(&mut self, replacement: &[u16]) -> Result<(), InvalidReplacement> {
        if replacement.is_empty() || replacement.len() as f32 > self.max_units_per_byte {
            return Err(InvalidReplacement);
        }
        self.replacement.clear();
        self.replacement.extend_from_slice(replacement);
        self.inner.on_replacement_changed(replacement);
        debug!(len = replacement.len(), "decoder replacement updated");
        Ok(())
    }

    pub fn set_malformed_action(&mut self, action: CodingErrorAction) {
        self.malformed_action = action;
        self.inner.on_malformed_action(action);
        trace!(?action, "malformed-input action set");
    }

    pub fn set_unmappable_action(&mut self, action: CodingErrorAction) {
        self.unmappable_action = action;
        self.inner.on_unmappable_action(action);
        trace!(?action, "unmappable-character action set");
    }

    /// Makes the decoder ready to process a new stream.
    pub fn reset(&mut self) {
        self.phase = Phase::Reset;
        self.prior_last = false;
        self.inner.on_reset();
    }

    /// Incrementally decodes a byte stream.
    ///
    /// Returns the classifying result, the number of bytes read from
    /// `src` and the number of units written to `dst`.
    ///
    /// # Panics
    ///
    /// Panics if invoked after a completed end-of-input step without an
    /// intervening `reset`, or with `end_of_input = false` after a prior
    /// `true` within the same stream.
    pub fn step(&mut self,
                src: &[u8],
                dst: &mut [u16],
                end_of_input: bool)
                -> (CoderResult, usize, usize) {
        self.begin_step(end_of_input);
        let mut source = ByteSource::new(src);
        let mut dest = UnitDestination::new(dst);
        loop {
            let raw = self.inner.run(&mut source, &mut dest, end_of_input);
            let error = match raw {
                CoderResult::Underflow => {
                    if end_of_input && source.remaining() > 0 {
                        // Input the loop left behind at the end of the
                        // stream can never become a legal sequence.
                        CoderResult::Malformed(source.remaining())
                    } else {
                        if end_of_input {
                            self.phase = Phase::End;
                        }
                        return (CoderResult::Underflow, source.consumed(), dest.written());
                    }
                }
                CoderResult::Overflow => {
                    return (CoderResult::Overflow, source.consumed(), dest.written());
                }
                error => error,
            };
            let action = if error.is_malformed() {
                self.malformed_action
            } else {
                self.unmappable_action
            };
            match action {
                CodingErrorAction::Report => {
                    return (error, source.consumed(), dest.written());
                }
                CodingErrorAction::Ignore => {
                    source.skip(error.length().min(source.remaining()));
                }
                CodingErrorAction::Replace => {
                    // Space is checked before the offending input is
                    // consumed, so an interrupted replacement is retried
                    // from scratch on the next call.
                    if dest.remaining() < self.replacement.len() {
                        return (CoderResult::Overflow, source.consumed(), dest.written());
                    }
                    dest.write_slice(&self.replacement);
                    source.skip(error.length().min(source.remaining()));
                }
            }
        }
    }

    /// Drains trailing output once an end-of-input step has returned
    /// `Underflow`.
    ///
    /// Returns `Underflow` when done or `Overflow` when the caller must
    /// drain `dst` and call again, together with the number of units
    /// written.
    ///
    /// # Panics
    ///
    /// Panics unless the previous step completed the stream.
    pub fn flush(&mut self, dst: &mut [u16]) -> (CoderResult, usize) {
        if self.phase != Phase::End {
            panic!("flush is not legal in the {:?} phase", self.phase);
        }
        let mut dest = UnitDestination::new(dst);
        let result = self.inner.flush(&mut dest);
        if result == CoderResult::Underflow {
            self.phase = Phase::Flushed;
        }
        (result, dest.written())
    }

    /// Decodes an entire byte sequence in one call.
    ///
    /// Sizes the output from the average-units-per-byte hint, grows it
    /// geometrically on `Overflow`, and converts a `Report`ed error into
    /// a terminal [`CodingError`] with no partial result. On success the
    /// decoder ends up flushed and a later one-shot call is legal
    /// without an explicit `reset`.
    ///
    /// # Panics
    ///
    /// Panics if an incremental operation is mid-sequence.
    pub fn decode_all(&mut self, bytes: &[u8]) -> Result<Vec<u16>, CodingError> {
        match self.phase {
            Phase::Reset | Phase::Flushed => {}
            phase => panic!("decode_all is not legal in the {:?} phase", phase),
        }
        self.reset();
        let sizing = (bytes.len() as f32 * self.average_units_per_byte).ceil() as usize;
        let mut dst = vec![0u16; sizing.max(1)];
        let mut read_total = 0usize;
        let mut written_total = 0usize;
        loop {
            let (result, read, written) =
                self.step(&bytes[read_total..], &mut dst[written_total..], true);
            read_total += read;
            written_total += written;
            match result {
                CoderResult::Underflow => break,
                CoderResult::Overflow => {
                    let capacity = dst.len() * 2 + 1;
                    trace!(capacity, "growing one-shot decode buffer");
                    dst.resize(capacity, 0);
                }
                error => return Err(error.raise()),
            }
        }
        loop {
            let (result, written) = self.flush(&mut dst[written_total..]);
            written_total += written;
            match result {
                CoderResult::Underflow => break,
                CoderResult::Overflow => {
                    let capacity = dst.len() * 2 + 1;
                    trace!(capacity, "growing one-shot decode buffer");
                    dst.resize(capacity, 0);
                }
                error => return Err(error.raise()),
            }
        }
        dst.truncate(written_total);
        Ok(dst)
    }

    fn begin_step(&mut self, end_of_input: bool) {
        match self.phase {
            Phase::Reset | Phase::Coding => {}
            phase => panic!("step is not legal in the {:?} phase; call reset() first", phase),
        }
        if self.prior_last && !end_of_input {
            panic!("a step without end_of_input cannot follow one with it; call reset() first");
        }
        self.phase = Phase::Coding;
        self.prior_last = end_of_input;
    }
}

/// A converter that encodes 16-bit text units into a byte stream.
///
/// Mirror image of [`Decoder`]: the same `step`/`flush`/`reset` call
/// protocol, phase sequencing, and error-action dispatch, with input and
/// output element types swapped. The replacement is a byte sequence and
/// must be decodable by the charset's reverse mapping; the initial
/// replacement is `b"?"`, which a loop whose charset cannot encode `?`
/// should override right after construction.
pub struct Encoder {
    inner: Box<dyn EncodeLoop>,
    replacement: SmallVec<[u8; 4]>,
    malformed_action: CodingErrorAction,
    unmappable_action: CodingErrorAction,
    average_bytes_per_unit: f32,
    max_bytes_per_unit: f32,
    phase: Phase,
    prior_last: bool,
}

impl Encoder {
    /// Wraps a conversion loop, binding it to the given sizing hints.
    pub fn new(inner: Box<dyn EncodeLoop>,
               average_bytes_per_unit: f32,
               max_bytes_per_unit: f32)
               -> Encoder {
        assert!(average_bytes_per_unit > 0.0);
        assert!(max_bytes_per_unit > 0.0);
        Encoder {
            inner,
            replacement: smallvec![b'?'],
            malformed_action: CodingErrorAction::Report,
            unmappable_action: CodingErrorAction::Report,
            average_bytes_per_unit,
            max_bytes_per_unit,
            phase: Phase::Reset,
            prior_last: false,
        }
    }

    pub fn average_bytes_per_unit(&self) -> f32 {
        self.average_bytes_per_unit
    }

    pub fn max_bytes_per_unit(&self) -> f32 {
        self.max_bytes_per_unit
    }

    pub fn replacement(&self) -> &[u8] {
        &self.replacement
    }

    pub fn malformed_action(&self) -> CodingErrorAction {
        self.malformed_action
    }

    pub fn unmappable_action(&self) -> CodingErrorAction {
        self.unmappable_action
    }

    /// Whether the charset's reverse mapping can decode `replacement`
    /// back to real text.
    pub fn is_legal_replacement(&self, replacement: &[u8]) -> bool {
        self.inner.is_legal_replacement(replacement)
    }

    /// Replaces the replacement bytes emitted under
    /// [`CodingErrorAction::Replace`].
    ///
    /// The content must be non-empty, no longer than the
    /// max-bytes-per-unit hint, and legal per
    /// [`is_legal_replacement`](Encoder::is_legal_replacement). Takes
    /// effect from the next step.
    pub fn set_replacement(&mut self, replacement: &[u8]) -> Result<(), InvalidReplacement> {
        if replacement.is_empty() || replacement.len() as f32 > self.max_bytes_per_unit {
            return Err(InvalidReplacement);
        }
        if !self.inner.is_legal_replacement(replacement) {
            return Err(InvalidReplacement);
        }
        self.replacement.clear();
        self.replacement.extend_from_slice(replacement);
        self.inner.on_replacement_changed(replacement);
        debug!(len = replacement.len(), "encoder replacement updated");
        Ok(())
    }

    pub fn set_malformed_action(&mut self, action: CodingErrorAction) {
        self.malformed_action = action;
        self.inner.on_malformed_action(action);
        trace!(?action, "malformed-input action set");
    }

    pub fn set_unmappable_action(&mut self, action: CodingErrorAction) {
        self.unmappable_action = action;
        self.inner.on_unmappable_action(action);
        trace!(?action, "unmappable-character action set");
    }

    /// Makes the encoder ready to process a new stream.
    pub fn reset(&mut self) {
        self.phase = Phase::Reset;
        self.prior_last = false;
        self.inner.on_reset();
    }

    /// Incrementally encodes a text-unit stream.
    ///
    /// Returns the classifying result, the number of units read from
    /// `src` and the number of bytes written to `dst`.
    ///
    /// # Panics
    ///
    /// Panics under the same sequencing violations as [`Decoder::step`].
    pub fn step(&mut self,
                src: &[u16],
                dst: &mut [u8],
                end_of_input: bool)
                -> (CoderResult, usize, usize) {
        self.begin_step(end_of_input);
        let mut source = UnitSource::new(src);
        let mut dest = ByteDestination::new(dst);
        loop {
            let raw = self.inner.run(&mut source, &mut dest, end_of_input);
            let error = match raw {
                CoderResult::Underflow => {
                    if end_of_input && source.remaining() > 0 {
                        CoderResult::Malformed(source.remaining())
                    } else {
                        if end_of_input {
                            self.phase = Phase::End;
                        }
                        return (CoderResult::Underflow, source.consumed(), dest.written());
                    }
                }
                CoderResult::Overflow => {
                    return (CoderResult::Overflow, source.consumed(), dest.written());
                }
                error => error,
            };
            let action = if error.is_malformed() {
                self.malformed_action
            } else {
                self.unmappable_action
            };
            match action {
                CodingErrorAction::Report => {
                    return (error, source.consumed(), dest.written());
                }
                CodingErrorAction::Ignore => {
                    source.skip(error.length().min(source.remaining()));
                }
                CodingErrorAction::Replace => {
                    if dest.remaining() < self.replacement.len() {
                        return (CoderResult::Overflow, source.consumed(), dest.written());
                    }
                    dest.write_slice(&self.replacement);
                    source.skip(error.length().min(source.remaining()));
                }
            }
        }
    }

    /// Drains trailing output (e.g. shift-state reset bytes) once an
    /// end-of-input step has returned `Underflow`.
    ///
    /// # Panics
    ///
    /// Panics unless the previous step completed the stream.
    pub fn flush(&mut self, dst: &mut [u8]) -> (CoderResult, usize) {
        if self.phase != Phase::End {
            panic!("flush is not legal in the {:?} phase", self.phase);
        }
        let mut dest = ByteDestination::new(dst);
        let result = self.inner.flush(&mut dest);
        if result == CoderResult::Underflow {
            self.phase = Phase::Flushed;
        }
        (result, dest.written())
    }

    /// Encodes an entire text-unit sequence in one call.
    ///
    /// See [`Decoder::decode_all`]; the behavior is symmetric.
    ///
    /// # Panics
    ///
    /// Panics if an incremental operation is mid-sequence.
    pub fn encode_all(&mut self, units: &[u16]) -> Result<Vec<u8>, CodingError> {
        match self.phase {
            Phase::Reset | Phase::Flushed => {}
            phase => panic!("encode_all is not legal in the {:?} phase", phase),
        }
        self.reset();
        let sizing = (units.len() as f32 * self.average_bytes_per_unit).ceil() as usize;
        let mut dst = vec![0u8; sizing.max(1)];
        let mut read_total = 0usize;
        let mut written_total = 0usize;
        loop {
            let (result, read, written) =
                self.step(&units[read_total..], &mut dst[written_total..], true);
            read_total += read;
            written_total += written;
            match result {
                CoderResult::Underflow => break,
                CoderResult::Overflow => {
                    let capacity = dst.len() * 2 + 1;
                    trace!(capacity, "growing one-shot encode buffer");
                    dst.resize(capacity, 0);
                }
                error => return Err(error.raise()),
            }
        }
        loop {
            let (result, written) = self.flush(&mut dst[written_total..]);
            written_total += written;
            match result {
                CoderResult::Underflow => break,
                CoderResult::Overflow => {
                    let capacity = dst.len() * 2 + 1;
                    trace!(capacity, "growing one-shot encode buffer");
                    dst.resize(capacity, 0);
                }
                error => return Err(error.raise()),
            }
        }
        dst.truncate(written_total);
        Ok(dst)
    }

    fn begin_step(&mut self, end_of_input: bool) {
        match self.phase {
            Phase::Reset | Phase::Coding => {}
            phase => panic!("step is not legal in the {:?} phase; call reset() first", phase),
        }
        if self.prior_last && !end_of_input {
            panic!("a step without end_of_input cannot follow one with it; call reset() first");
        }
        self.phase = Phase::Coding;
        self.prior_last = end_of_input;
    }
}

// ############## TESTS ###############

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_coder_result_predicates() {
        assert!(CoderResult::Underflow.is_underflow());
        assert!(CoderResult::Overflow.is_overflow());
        assert!(CoderResult::Malformed(2).is_error());
        assert!(CoderResult::Malformed(2).is_malformed());
        assert!(!CoderResult::Malformed(2).is_unmappable());
        assert!(CoderResult::Unmappable(1).is_error());
        assert!(CoderResult::Unmappable(1).is_unmappable());
        assert!(!CoderResult::Underflow.is_error());
        assert_eq!(CoderResult::Malformed(3).length(), 3);
        assert_eq!(CoderResult::Malformed(1), CoderResult::Malformed(1));
        assert_ne!(CoderResult::Malformed(1), CoderResult::Unmappable(1));
    }

    #[test]
    #[should_panic(expected = "not an error")]
    fn test_length_panics_on_underflow() {
        CoderResult::Underflow.length();
    }

    #[test]
    fn test_raise_mapping() {
        assert_eq!(CoderResult::Underflow.raise(), CodingError::BufferUnderflow);
        assert_eq!(CoderResult::Overflow.raise(), CodingError::BufferOverflow);
        assert_eq!(CoderResult::Malformed(2).raise(), CodingError::MalformedInput(2));
        assert_eq!(CoderResult::Unmappable(1).raise(),
                   CodingError::UnmappableCharacter(1));
    }

    #[test]
    fn test_default_actions_are_report() {
        let decoder = DirectDecodeLoop::new_decoder();
        assert_eq!(decoder.malformed_action(), CodingErrorAction::Report);
        assert_eq!(decoder.unmappable_action(), CodingErrorAction::Report);
        assert_eq!(decoder.replacement(), &[0xFFFDu16]);
        let encoder = DirectEncodeLoop::new_encoder();
        assert_eq!(encoder.replacement(), b"?");
    }

    #[test]
    fn test_empty_step_is_idempotent_underflow() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        let mut dst = [0u16; 4];
        for _ in 0..3 {
            let (result, read, written) = decoder.step(&[], &mut dst, false);
            assert_eq!(result, CoderResult::Underflow);
            assert_eq!(read, 0);
            assert_eq!(written, 0);
        }
    }

    #[test]
    #[should_panic(expected = "flush is not legal")]
    fn test_flush_before_end_panics() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        let mut dst = [0u16; 4];
        decoder.step(b"a", &mut dst, false);
        decoder.flush(&mut dst);
    }

    #[test]
    #[should_panic(expected = "step is not legal")]
    fn test_step_after_flush_panics() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        let mut dst = [0u16; 4];
        decoder.step(b"a", &mut dst, true);
        decoder.flush(&mut dst);
        decoder.step(b"b", &mut dst, true);
    }

    #[test]
    #[should_panic(expected = "step is not legal")]
    fn test_step_after_end_panics() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        let mut dst = [0u16; 4];
        decoder.step(b"a", &mut dst, true);
        decoder.step(b"b", &mut dst, true);
    }

    #[test]
    #[should_panic(expected = "cannot follow")]
    fn test_non_final_step_after_final_panics() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        decoder.set_malformed_action(CodingErrorAction::Report);
        let mut dst = [0u16; 4];
        // Report keeps the phase mid-stream, so the end flag must stick.
        let (result, _, _) = decoder.step(&[0x41, ILLEGAL_BYTE], &mut dst, true);
        assert!(result.is_malformed());
        decoder.step(b"b", &mut dst, false);
    }

    #[test]
    fn test_reset_reopens_the_protocol() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        let mut dst = [0u16; 4];
        decoder.step(b"a", &mut dst, true);
        decoder.flush(&mut dst);
        decoder.reset();
        let (result, read, written) = decoder.step(b"b", &mut dst, true);
        assert_eq!(result, CoderResult::Underflow);
        assert_eq!(read, 1);
        assert_eq!(written, 1);
    }

    #[test]
    #[should_panic(expected = "decode_all is not legal")]
    fn test_one_shot_mid_sequence_panics() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        let mut dst = [0u16; 4];
        decoder.step(b"a", &mut dst, false);
        let _ = decoder.decode_all(b"b");
    }

    #[test]
    fn test_one_shot_after_one_shot_is_legal() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        assert_eq!(decoder.decode_all(b"ab").unwrap(), &[0x61, 0x62]);
        assert_eq!(decoder.decode_all(b"cd").unwrap(), &[0x63, 0x64]);
    }

    #[test]
    fn test_decoder_replacement_validation() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        assert_eq!(decoder.set_replacement(&[]), Err(InvalidReplacement));
        // Longer than the max-units-per-byte hint of 1.
        assert_eq!(decoder.set_replacement(&[0x3F, 0x3F]), Err(InvalidReplacement));
        assert_eq!(decoder.replacement(), &[0xFFFDu16]);
        assert_eq!(decoder.set_replacement(&[0x25]), Ok(()));
        assert_eq!(decoder.replacement(), &[0x25u16]);
    }

    #[test]
    fn test_encoder_replacement_validation() {
        let mut encoder = DirectEncodeLoop::new_encoder();
        assert_eq!(encoder.set_replacement(b""), Err(InvalidReplacement));
        assert_eq!(encoder.set_replacement(&[ILLEGAL_BYTE]), Err(InvalidReplacement));
        assert_eq!(encoder.replacement(), b"?");
        assert_eq!(encoder.set_replacement(b"*"), Ok(()));
        assert_eq!(encoder.replacement(), b"*");
        assert!(encoder.is_legal_replacement(b"!"));
        assert!(!encoder.is_legal_replacement(&[ILLEGAL_BYTE]));
    }

    #[test]
    fn test_one_shot_reports_errors_terminally() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        assert_eq!(decoder.decode_all(&[0x41, ILLEGAL_BYTE, 0x42]),
                   Err(CodingError::MalformedInput(1)));
        let mut encoder = DirectEncodeLoop::new_encoder();
        assert_eq!(encoder.encode_all(&[0x41, 0x1234]),
                   Err(CodingError::UnmappableCharacter(1)));
    }

    #[test]
    fn test_one_shot_empty_input() {
        let mut decoder = DirectDecodeLoop::new_decoder();
        assert_eq!(decoder.decode_all(b"").unwrap(), &[] as &[u16]);
        let mut encoder = DirectEncodeLoop::new_encoder();
        assert_eq!(encoder.encode_all(&[]).unwrap(), b"");
    }
}
