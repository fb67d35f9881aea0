//! Deflate (zlib-wrapped) block decoding

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::reserve_hint;
use crate::error::{FormatError, Result};

/// Inflate a zlib stream that must produce exactly `expected_size` bytes
pub fn inflate_deflate(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(reserve_hint(expected_size, data.len()));

    // One byte past the declared size is enough to detect overlong streams.
    ZlibDecoder::new(data)
        .take(expected_size as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|e| FormatError::malformed(format!("deflate stream: {e}")))?;

    if output.len() != expected_size {
        return Err(FormatError::TruncatedStream {
            expected: expected_size,
            actual: output.len(),
        });
    }

    Ok(output)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::zlib;

    #[test]
    fn test_inflate_exact_size() {
        let plain = b"frostbite frostbite frostbite".to_vec();
        let packed = zlib(&plain);

        let inflated = inflate_deflate(&packed, plain.len()).expect("inflate");
        assert_eq!(inflated, plain);
    }

    #[test]
    fn test_inflate_short_stream() {
        let packed = zlib(b"0123456789");

        let err = inflate_deflate(&packed, 20).expect_err("stream is shorter than declared");
        assert!(matches!(
            err,
            FormatError::TruncatedStream {
                expected: 20,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_inflate_long_stream() {
        let packed = zlib(b"0123456789");

        let err = inflate_deflate(&packed, 4).expect_err("stream is longer than declared");
        assert!(matches!(
            err,
            FormatError::TruncatedStream {
                expected: 4,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_inflate_garbage() {
        let err = inflate_deflate(&[0xDE, 0xAD, 0xBE, 0xEF], 16).expect_err("not zlib");
        assert!(matches!(err, FormatError::MalformedContainer(_)));
    }

    #[test]
    fn test_inflate_huge_declared_size() {
        let packed = zlib(b"tiny");

        let err = inflate_deflate(&packed, u32::MAX as usize).expect_err("declared size is a lie");
        assert!(matches!(
            err,
            FormatError::TruncatedStream {
                expected: 0xFFFF_FFFF,
                actual: 4
            }
        ));
    }
}
