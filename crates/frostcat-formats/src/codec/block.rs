//! Block streams

use std::io::Cursor;

use binrw::BinRead;
use tracing::trace;

use super::{decompress_proprietary, inflate_deflate, reserve_hint};
use crate::error::{FormatError, Result};

/// Size of a block header in bytes
pub const BLOCK_HEADER_SIZE: usize = 8;

/// Largest body a single block can describe
pub const MAX_BLOCK_BODY: usize = 0xFFFF;

/// Tag of a stored (uncompressed) block as emitted by the container writer
pub const STORED_TAG: u16 = 0x0070;

/// Tag of a deflate block
pub const DEFLATE_TAG: u16 = 0x0270;

/// Tag of a proprietary LZ block (superbundle payloads only)
pub const LZ_TAG: u16 = 0x0970;

/// Block header: decompressed size and tagged compressed size, both big-endian
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct BlockHeader {
    /// Size of the block once decoded
    pub decompressed_size: u32,
    /// Codec tag in the high 16 bits, body length in the low 16 bits
    pub tagged_size: u32,
}

impl BlockHeader {
    /// Build a header from its parts
    pub fn new(decompressed_size: u32, tag: u16, compressed_size: u16) -> Self {
        Self {
            decompressed_size,
            tagged_size: (u32::from(tag) << 16) | u32::from(compressed_size),
        }
    }

    /// Header for a stored block of `len` bytes
    pub fn stored(len: u16) -> Self {
        Self::new(u32::from(len), STORED_TAG, len)
    }

    /// Codec tag
    pub fn tag(&self) -> u16 {
        (self.tagged_size >> 16) as u16
    }

    /// Length of the block body following the header
    pub fn compressed_size(&self) -> usize {
        (self.tagged_size & 0xFFFF) as usize
    }

    /// On-disk representation
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut bytes = [0u8; BLOCK_HEADER_SIZE];
        bytes[..4].copy_from_slice(&self.decompressed_size.to_be_bytes());
        bytes[4..].copy_from_slice(&self.tagged_size.to_be_bytes());
        bytes
    }
}

/// How a block body is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Raw bytes
    Stored,
    /// zlib stream
    Deflate,
    /// Proprietary LZ stream
    Lz,
}

impl BlockKind {
    /// Classify a tag found in a CAS entry; only deflate is recognised there
    pub fn from_cas_tag(tag: u16) -> Self {
        if tag == DEFLATE_TAG {
            Self::Deflate
        } else {
            Self::Stored
        }
    }

    /// Classify a tag found in a superbundle payload
    pub fn from_bundle_tag(tag: u16) -> Self {
        match tag {
            DEFLATE_TAG => Self::Deflate,
            LZ_TAG => Self::Lz,
            _ => Self::Stored,
        }
    }
}

/// One block of a stream
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    /// Parsed header
    pub header: BlockHeader,
    /// Encoded body
    pub body: &'a [u8],
}

impl Block<'_> {
    /// Decode the body according to `kind`
    pub fn decode(&self, kind: BlockKind) -> Result<Vec<u8>> {
        let expected = self.header.decompressed_size as usize;
        match kind {
            BlockKind::Stored => Ok(self.body.to_vec()),
            BlockKind::Deflate => inflate_deflate(self.body, expected),
            BlockKind::Lz => {
                let (decoded, _) = decompress_proprietary(self.body)?;
                if decoded.len() != expected {
                    return Err(FormatError::TruncatedStream {
                        expected,
                        actual: decoded.len(),
                    });
                }
                Ok(decoded)
            }
        }
    }
}

/// Sequential reader over a block stream
#[derive(Debug, Clone)]
pub struct BlockReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BlockReader<'a> {
    /// Start reading at the beginning of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Encoded bytes consumed so far, headers included
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Next block, or `None` once the input is exhausted
    pub fn next_block(&mut self) -> Result<Option<Block<'a>>> {
        let remaining = self.data.len().saturating_sub(self.pos);
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < BLOCK_HEADER_SIZE {
            return Err(FormatError::TruncatedStream {
                expected: BLOCK_HEADER_SIZE,
                actual: remaining,
            });
        }

        let mut cursor = Cursor::new(&self.data[self.pos..self.pos + BLOCK_HEADER_SIZE]);
        let header = BlockHeader::read(&mut cursor)?;
        let body_start = self.pos + BLOCK_HEADER_SIZE;
        let body_len = header.compressed_size();

        let body = self
            .data
            .get(body_start..body_start + body_len)
            .ok_or(FormatError::TruncatedStream {
                expected: body_len,
                actual: self.data.len() - body_start,
            })?;

        trace!(
            "block at {}: tag 0x{:04X}, {} -> {} bytes",
            self.pos,
            header.tag(),
            body_len,
            header.decompressed_size
        );

        self.pos = body_start + body_len;
        Ok(Some(Block { header, body }))
    }
}

/// Decode a CAS block stream
///
/// Blocks are consumed until `min(total_size, max_size)` encoded bytes have
/// been read (headers count toward the budget) or the stream runs out. Tag
/// `0x270` is deflate, every other tag is stored.
pub fn decompress_block_stream(
    stream: &[u8],
    total_size: usize,
    max_size: usize,
) -> Result<Vec<u8>> {
    let budget = total_size.min(max_size);
    let mut reader = BlockReader::new(stream);
    let mut output = Vec::new();

    while reader.consumed() < budget {
        let Some(block) = reader.next_block()? else {
            break;
        };
        let decoded = block.decode(BlockKind::from_cas_tag(block.header.tag()))?;
        output.extend_from_slice(&decoded);
    }

    Ok(output)
}

/// Decode one superbundle payload of `original_size` bytes
///
/// Returns the decoded payload and the number of encoded bytes it occupied,
/// so consecutive payloads can be walked.
pub fn decode_payload_blocks(stream: &[u8], original_size: usize) -> Result<(Vec<u8>, usize)> {
    let mut reader = BlockReader::new(stream);
    let mut output = Vec::with_capacity(reserve_hint(original_size, stream.len()));

    while output.len() < original_size {
        let Some(block) = reader.next_block()? else {
            return Err(FormatError::TruncatedStream {
                expected: original_size,
                actual: output.len(),
            });
        };
        let decoded = block.decode(BlockKind::from_bundle_tag(block.header.tag()))?;
        output.extend_from_slice(&decoded);
    }

    if output.len() != original_size {
        return Err(FormatError::TruncatedStream {
            expected: original_size,
            actual: output.len(),
        });
    }

    Ok((output, reader.consumed()))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{deflate_block, lz_block, stored_block};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_layout_is_big_endian() {
        let header = BlockHeader::new(0x0001_0000, DEFLATE_TAG, 0x1234);
        assert_eq!(
            header.to_bytes(),
            [0x00, 0x01, 0x00, 0x00, 0x02, 0x70, 0x12, 0x34]
        );

        let parsed = BlockHeader::read(&mut Cursor::new(header.to_bytes())).expect("parse");
        assert_eq!(parsed, header);
        assert_eq!(parsed.tag(), DEFLATE_TAG);
        assert_eq!(parsed.compressed_size(), 0x1234);
    }

    #[test]
    fn test_stored_and_deflate_blocks() {
        let mut stream = stored_block(b"hello ");
        stream.extend(deflate_block(b"world world world"));

        let output =
            decompress_block_stream(&stream, stream.len(), usize::MAX).expect("decompress");
        assert_eq!(output, b"hello world world world".to_vec());
    }

    #[test]
    fn test_lz_tag_is_stored_in_cas_streams() {
        let stream = lz_block(&[0x01, b'a', b'b', b'c', b'd'], 4);

        let output = decompress_block_stream(&stream, stream.len(), usize::MAX).expect("decode");
        assert_eq!(output, vec![0x01, b'a', b'b', b'c', b'd']);
    }

    #[test]
    fn test_budget_stops_after_first_block() {
        let mut stream = stored_block(b"first");
        stream.extend(stored_block(b"second"));

        // Budget of one byte still decodes the whole first block.
        let output = decompress_block_stream(&stream, stream.len(), 1).expect("decompress");
        assert_eq!(output, b"first".to_vec());

        let output = decompress_block_stream(&stream, 13, usize::MAX).expect("decompress");
        assert_eq!(output, b"first".to_vec());
    }

    #[test]
    fn test_stream_exhausted_before_budget() {
        let stream = stored_block(b"only");
        let output = decompress_block_stream(&stream, 1000, 1000).expect("decompress");
        assert_eq!(output, b"only".to_vec());
    }

    #[test]
    fn test_truncated_body() {
        let mut stream = stored_block(b"0123456789");
        stream.truncate(12);

        let err = decompress_block_stream(&stream, 100, 100).expect_err("body cut short");
        assert!(matches!(
            err,
            FormatError::TruncatedStream {
                expected: 10,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_truncated_header() {
        let err = decompress_block_stream(&[0, 0, 0], 100, 100).expect_err("header cut short");
        assert!(matches!(
            err,
            FormatError::TruncatedStream {
                expected: 8,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_payload_blocks_report_consumed_bytes() {
        let mut stream = lz_block(&[0x01, b'a', b'b', b'c', b'd', 0xEC, 0x00], 12);
        stream.extend(stored_block(b"tail"));
        let first_len = 8 + 7;

        let (payload, consumed) = decode_payload_blocks(&stream, 12).expect("decode");
        assert_eq!(payload, b"abcdabcdabcd".to_vec());
        assert_eq!(consumed, first_len);

        let (tail, consumed) = decode_payload_blocks(&stream[first_len..], 4).expect("decode");
        assert_eq!(tail, b"tail".to_vec());
        assert_eq!(consumed, 12);
    }

    #[test]
    fn test_payload_spanning_blocks() {
        let mut stream = deflate_block(b"abc");
        stream.extend(stored_block(b"def"));

        let (payload, consumed) = decode_payload_blocks(&stream, 6).expect("decode");
        assert_eq!(payload, b"abcdef".to_vec());
        assert_eq!(consumed, stream.len());
    }

    #[test]
    fn test_payload_lz_size_mismatch() {
        let stream = lz_block(&[0x01, b'a', b'b', b'c', b'd'], 10);

        let err = decode_payload_blocks(&stream, 10).expect_err("declared size disagrees");
        assert!(matches!(
            err,
            FormatError::TruncatedStream {
                expected: 10,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_payload_runs_out_of_blocks() {
        let stream = stored_block(b"abc");
        let err = decode_payload_blocks(&stream, 8).expect_err("not enough blocks");
        assert!(matches!(
            err,
            FormatError::TruncatedStream {
                expected: 8,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_payload_declares_huge_size() {
        let mut stream = stored_block(b"abc");
        // Decoded size field of the only block
        stream[..4].copy_from_slice(&u32::MAX.to_be_bytes());

        let err = decode_payload_blocks(&stream, u32::MAX as usize).expect_err("not enough blocks");
        assert!(matches!(
            err,
            FormatError::TruncatedStream {
                expected: 0xFFFF_FFFF,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_empty_payload() {
        let (payload, consumed) = decode_payload_blocks(&[], 0).expect("decode");
        assert!(payload.is_empty());
        assert_eq!(consumed, 0);
    }
}
