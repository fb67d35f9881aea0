//! Engine-specific LZ77 block codec
//!
//! Every token starts with a control byte:
//!
//! | Control      | Token                                                        |
//! |--------------|--------------------------------------------------------------|
//! | `0x00..0x10` | literal run of `3 + n` bytes                                 |
//! | `0x10..0x20` | far match, distance `0x4000` or `0x8000` plus a 14-bit code  |
//! | `0x20..0x40` | near match, 5-bit length, distance from a 14-bit code        |
//! | `0x40..`     | compact match, length and distance packed in the control byte |
//!
//! Match tokens end with up to three literal bytes whose count comes from the
//! low two bits of the last code read. A far match with a zero distance code
//! is the end marker.

use crate::error::{FormatError, LzCorruption, Result};

struct LzInput<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> LzInput<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn corrupt(&self, kind: LzCorruption) -> FormatError {
        FormatError::Corrupt {
            kind,
            consumed: self.pos,
            total: self.data.len(),
        }
    }

    fn byte(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.corrupt(LzCorruption::EndedEarly))?;
        self.pos += 1;
        Ok(byte)
    }

    fn u16_le(&mut self) -> Result<u16> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.corrupt(LzCorruption::EndedEarly))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Length field of a token: the masked control bits, or when those are
    /// zero, a chain of zero bytes (0xFF each) closed by a non-zero byte.
    fn run_length(&mut self, code: u8, mask: u8) -> Result<usize> {
        let low = code & mask;
        if low != 0 {
            return Ok(usize::from(low));
        }

        let mut length = usize::from(mask);
        loop {
            let next = self.byte()?;
            if next != 0 {
                return Ok(length + usize::from(next));
            }
            length += 0xFF;
        }
    }
}

fn copy_back(output: &mut Vec<u8>, distance: usize, length: usize) -> Option<()> {
    let start = output.len().checked_sub(distance)?;
    output.reserve(length);
    // Byte at a time: source and destination may overlap.
    for i in 0..length {
        let byte = output[start + i];
        output.push(byte);
    }
    Some(())
}

/// Decompress a proprietary LZ block
///
/// Returns the decoded bytes and the number of input bytes consumed. Decoding
/// stops cleanly when the input is exhausted between tokens or at an end
/// marker that is the last thing in the input.
pub fn decompress_proprietary(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut src = LzInput::new(input);
    let mut output = Vec::with_capacity(input.len().saturating_mul(2));

    while !src.is_exhausted() {
        let code = src.byte()?;

        if code < 0x10 {
            let count = 3 + src.run_length(code, 0x0F)?;
            output.extend_from_slice(src.take(count)?);
            continue;
        }

        let (length, distance, trailing) = if code >= 0x40 {
            let distance = 1 + usize::from((code >> 2) & 0x07) + usize::from(src.byte()?) * 8;
            (1 + usize::from(code >> 5), distance, code & 0x03)
        } else {
            let (mask, base) = if code < 0x20 {
                (0x07, 0x4000 + (usize::from(code & 0x08) << 11))
            } else {
                (0x1F, 1)
            };
            let length = 2 + src.run_length(code, mask)?;
            let lookback = src.u16_le()?;

            if code < 0x20 && lookback >> 2 == 0 {
                if !src.is_exhausted() {
                    return Err(src.corrupt(LzCorruption::TrailingGarbage));
                }
                break;
            }

            (
                length,
                base + usize::from(lookback >> 2),
                (lookback & 0x03) as u8,
            )
        };

        copy_back(&mut output, distance, length)
            .ok_or_else(|| src.corrupt(LzCorruption::LookbackOutOfRange))?;
        output.extend_from_slice(src.take(usize::from(trailing))?);
    }

    Ok((output, src.pos))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // "abcd" as a literal run, then a compact match copying 8 bytes from 4 back.
    const REPEAT_FIXTURE: &[u8] = &[0x01, b'a', b'b', b'c', b'd', 0xEC, 0x00];

    #[test]
    fn test_literal_then_compact_match() {
        let (output, consumed) = decompress_proprietary(REPEAT_FIXTURE).expect("decode");
        assert_eq!(output, b"abcdabcdabcd".to_vec());
        assert_eq!(consumed, REPEAT_FIXTURE.len());
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let first = decompress_proprietary(REPEAT_FIXTURE).expect("first decode");
        let second = decompress_proprietary(REPEAT_FIXTURE).expect("second decode");
        assert_eq!(first, second);
    }

    #[test]
    fn test_overlapping_copy() {
        // Distance 1, length 8: run-length expansion of the last byte.
        let input = [0x01, b'a', b'b', b'c', b'd', 0xE0, 0x00];
        let (output, _) = decompress_proprietary(&input).expect("decode");
        assert_eq!(output, b"abcddddddddd".to_vec());
    }

    #[test]
    fn test_near_match_with_trailing_literals() {
        // 0x21: length 3; code 0x000E: distance 1 + 3, two trailing literals.
        let input = [
            0x01, b'a', b'b', b'c', b'd', 0x21, 0x0E, 0x00, b'X', b'Y',
        ];
        let (output, consumed) = decompress_proprietary(&input).expect("decode");
        assert_eq!(output, b"abcdabcXY".to_vec());
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_extended_literal_length() {
        // Zero nibble: 15 + 0xFF (one zero byte) + 2 = 272, plus the base 3.
        let mut input = vec![0x00, 0x00, 0x02];
        input.extend(std::iter::repeat_n(b'z', 275));
        let (output, consumed) = decompress_proprietary(&input).expect("decode");
        assert_eq!(output.len(), 275);
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_end_marker() {
        let mut input = REPEAT_FIXTURE.to_vec();
        input.extend_from_slice(&[0x11, 0x00, 0x00]);

        let (output, consumed) = decompress_proprietary(&input).expect("decode");
        assert_eq!(output, b"abcdabcdabcd".to_vec());
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_trailing_garbage_after_end_marker() {
        let mut input = REPEAT_FIXTURE.to_vec();
        input.extend_from_slice(&[0x11, 0x00, 0x00, 0xFF]);

        let err = decompress_proprietary(&input).expect_err("garbage after end marker");
        assert!(matches!(
            err,
            FormatError::Corrupt {
                kind: LzCorruption::TrailingGarbage,
                ..
            }
        ));
    }

    #[test]
    fn test_ended_early() {
        let err = decompress_proprietary(&[0x01, b'a', b'b']).expect_err("literal run cut short");
        assert!(matches!(
            err,
            FormatError::Corrupt {
                kind: LzCorruption::EndedEarly,
                consumed: 1,
                total: 3
            }
        ));
    }

    #[test]
    fn test_lookback_before_start() {
        let err = decompress_proprietary(&[0xE0, 0x00]).expect_err("nothing to copy from");
        assert!(matches!(
            err,
            FormatError::Corrupt {
                kind: LzCorruption::LookbackOutOfRange,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_input() {
        let (output, consumed) = decompress_proprietary(&[]).expect("decode");
        assert!(output.is_empty());
        assert_eq!(consumed, 0);
    }
}
