use transcoder::handles::{ByteSource, Space, UnitDestination};
use transcoder::testing::*;
use transcoder::{CoderResult, CodingErrorAction, DecodeLoop, Decoder};

#[test]
fn test_ignore_skips_malformed_byte() {
    let mut decoder = DirectDecodeLoop::new_decoder();
    decoder.set_malformed_action(CodingErrorAction::Ignore);
    let mut dst = [0u16; 4];
    let (result, read, written) = decoder.step(&[0x41, ILLEGAL_BYTE, 0x42], &mut dst, true);
    assert_eq!(result, CoderResult::Underflow);
    assert_eq!(read, 3);
    assert_eq!(written, 2);
    assert_eq!(&dst[..2], &[0x41, 0x42]);
}

#[test]
fn test_report_leaves_malformed_byte_unconsumed() {
    let mut decoder = DirectDecodeLoop::new_decoder();
    let mut dst = [0u16; 4];
    let (result, read, written) = decoder.step(&[0x41, ILLEGAL_BYTE, 0x42], &mut dst, true);
    assert_eq!(result, CoderResult::Malformed(1));
    assert_eq!(read, 1);
    assert_eq!(written, 1);
    assert_eq!(dst[0], 0x41);
    // Re-pushing the unconsumed remainder reports the same error again.
    let (result, read, written) = decoder.step(&[ILLEGAL_BYTE, 0x42], &mut dst, true);
    assert_eq!(result, CoderResult::Malformed(1));
    assert_eq!(read, 0);
    assert_eq!(written, 0);
}

#[test]
fn test_replace_substitutes_and_continues() {
    let mut decoder = DirectDecodeLoop::new_decoder();
    decoder.set_malformed_action(CodingErrorAction::Replace);
    let mut dst = [0u16; 4];
    let (result, read, written) = decoder.step(&[0x41, ILLEGAL_BYTE, 0x42], &mut dst, true);
    assert_eq!(result, CoderResult::Underflow);
    assert_eq!(read, 3);
    assert_eq!(written, 3);
    assert_eq!(&dst[..3], &[0x41, 0xFFFD, 0x42]);
}

#[test]
fn test_overflow_before_replacement_retries_cleanly() {
    let mut decoder = DirectDecodeLoop::new_decoder();
    decoder.set_malformed_action(CodingErrorAction::Replace);
    // One unit of space: the replacement for the illegal byte cannot be
    // written, so the offending input must stay unconsumed.
    let mut small = [0u16; 1];
    let (result, read, written) = decoder.step(&[0x41, ILLEGAL_BYTE, 0x42], &mut small, true);
    assert_eq!(result, CoderResult::Overflow);
    assert_eq!(read, 1);
    assert_eq!(written, 1);
    assert_eq!(small[0], 0x41);
    let mut rest = [0u16; 4];
    let (result, read, written) = decoder.step(&[ILLEGAL_BYTE, 0x42], &mut rest, true);
    assert_eq!(result, CoderResult::Underflow);
    assert_eq!(read, 2);
    assert_eq!(written, 2);
    assert_eq!(&rest[..2], &[0xFFFD, 0x42]);
}

#[test]
fn test_overflow_retry_reproduces_the_same_output() {
    let bytes = b"incremental";
    let mut oneshot = DirectDecodeLoop::new_decoder();
    let expected = oneshot.decode_all(bytes).unwrap();
    let mut decoder = DirectDecodeLoop::new_decoder();
    let collected = drive_decoder(&mut decoder, bytes, 3, 1).unwrap();
    assert_eq!(collected, expected);
}

/// A charset whose illegal sequences span several bytes: 0xF0 opens a
/// fixed-length illegal block.
struct BlockDecodeLoop {
    block: usize,
}

impl DecodeLoop for BlockDecodeLoop {
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
                            if b == 0xF0 {
                                unread_handle.unread();
                                return CoderResult::Malformed(self.block);
                            }
                            destination_handle.write_one(b as u16);
                        }
                    }
                }
            }
        }
    }
}

fn block_decoder(block: usize) -> Decoder {
    Decoder::new(Box::new(BlockDecodeLoop { block }), 1.0, 1.0)
}

#[test]
fn test_ignore_skips_whole_error_run() {
    let mut decoder = block_decoder(3);
    decoder.set_malformed_action(CodingErrorAction::Ignore);
    let mut dst = [0u16; 8];
    let (result, read, written) = decoder.step(&[0x41, 0xF0, 0xAA, 0xBB, 0x42], &mut dst, true);
    assert_eq!(result, CoderResult::Underflow);
    assert_eq!(read, 5);
    assert_eq!(written, 2);
    assert_eq!(&dst[..2], &[0x41, 0x42]);
}

#[test]
fn test_replace_emits_one_replacement_per_error_run() {
    let mut decoder = block_decoder(3);
    decoder.set_malformed_action(CodingErrorAction::Replace);
    let mut dst = [0u16; 8];
    let (result, read, written) = decoder.step(&[0x41, 0xF0, 0xAA, 0xBB, 0x42], &mut dst, true);
    assert_eq!(result, CoderResult::Underflow);
    assert_eq!(read, 5);
    assert_eq!(written, 3);
    assert_eq!(&dst[..3], &[0x41, 0xFFFD, 0x42]);
}

#[test]
fn test_report_carries_the_run_length() {
    let mut decoder = block_decoder(3);
    let mut dst = [0u16; 8];
    let (result, read, written) = decoder.step(&[0xF0, 0xAA, 0xBB], &mut dst, true);
    assert_eq!(result, CoderResult::Malformed(3));
    assert_eq!(read, 0);
    assert_eq!(written, 0);
}

/// A charset that treats 0xEE as the opening byte of a sequence that
/// never completes, so it stalls waiting for more input.
struct StallingDecodeLoop;

impl DecodeLoop for StallingDecodeLoop {
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
                            if b == 0xEE {
                                unread_handle.unread();
                                return CoderResult::Underflow;
                            }
                            destination_handle.write_one(b as u16);
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_trailing_unconsumed_input_is_malformed_at_end_of_input() {
    let mut decoder = Decoder::new(Box::new(StallingDecodeLoop), 1.0, 1.0);
    let mut dst = [0u16; 8];
    let (result, read, written) = decoder.step(&[0x41, 0xEE, 0xEF], &mut dst, true);
    assert_eq!(result, CoderResult::Malformed(2));
    assert_eq!(read, 1);
    assert_eq!(written, 1);
}

#[test]
fn test_trailing_unconsumed_input_is_not_classified_without_end_of_input() {
    let mut decoder = Decoder::new(Box::new(StallingDecodeLoop), 1.0, 1.0);
    let mut dst = [0u16; 8];
    let (result, read, written) = decoder.step(&[0x41, 0xEE], &mut dst, false);
    assert_eq!(result, CoderResult::Underflow);
    assert_eq!(read, 1);
    assert_eq!(written, 1);
}

#[test]
fn test_trailing_unconsumed_input_can_be_ignored() {
    let mut decoder = Decoder::new(Box::new(StallingDecodeLoop), 1.0, 1.0);
    decoder.set_malformed_action(CodingErrorAction::Ignore);
    let mut dst = [0u16; 8];
    let (result, read, written) = decoder.step(&[0x41, 0xEE, 0xEF], &mut dst, true);
    assert_eq!(result, CoderResult::Underflow);
    assert_eq!(read, 3);
    assert_eq!(written, 1);
    assert_eq!(dst[0], 0x41);
}

#[test]
fn test_actions_are_independent_per_error_kind() {
    let units = [0x41u16, 0x1234, 0x42];
    let mut encoder = DirectEncodeLoop::new_encoder();
    encoder.set_unmappable_action(CodingErrorAction::Ignore);
    assert_eq!(encoder.encode_all(&units).unwrap(), b"AB");
    let mut encoder = DirectEncodeLoop::new_encoder();
    encoder.set_malformed_action(CodingErrorAction::Ignore);
    // Only the malformed action changed; unmappable still reports.
    let (result, _, _) = {
        let mut dst = [0u8; 4];
        encoder.step(&units, &mut dst, true)
    };
    assert_eq!(result, CoderResult::Unmappable(1));
}
