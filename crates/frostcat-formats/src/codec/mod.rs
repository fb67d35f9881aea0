//! Block codecs used by CAS entries and superbundle payloads
//!
//! Payloads are stored as a run of blocks. Each block carries an 8-byte
//! big-endian header (decompressed size, then a tagged compressed size whose
//! high 16 bits name the codec) followed by the block body.

mod block;
mod deflate;
mod lz;

pub use block::{
    BLOCK_HEADER_SIZE, Block, BlockHeader, BlockKind, BlockReader, DEFLATE_TAG, LZ_TAG,
    MAX_BLOCK_BODY, STORED_TAG, decode_payload_blocks, decompress_block_stream,
};
pub use deflate::inflate_deflate;
pub use lz::decompress_proprietary;

/// Decoded bytes reserved up front per encoded byte
const RESERVE_RATIO: usize = 8;

/// Initial output capacity for decoding `input_len` bytes that claim to
/// expand to `declared` bytes
///
/// Declared sizes come from untrusted headers, so the reservation is bounded
/// by the input and the output grows past it as needed.
pub(crate) fn reserve_hint(declared: usize, input_len: usize) -> usize {
    declared.min(input_len.saturating_mul(RESERVE_RATIO))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_hint_bounded_by_input() {
        assert_eq!(reserve_hint(100, 50), 100);
        assert_eq!(reserve_hint(u32::MAX as usize, 4), 32);
        assert_eq!(reserve_hint(usize::MAX, usize::MAX), usize::MAX);
        assert_eq!(reserve_hint(16, 0), 0);
    }
}
