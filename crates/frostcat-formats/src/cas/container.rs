//! Standalone single-entry containers
//!
//! A container is a CAS entry header followed by its block stream, written
//! as an independent file:
//!
//! ```text
//! magic 0xF00FCEFA (LE) | sha1 of the block stream | stream length (LE) | 0u32 | blocks
//! ```

use sha1::{Digest, Sha1};

use super::{CAS_ENTRY_HEADER_SIZE, CasEntryHeader};
use crate::codec::{BLOCK_HEADER_SIZE, BlockHeader, MAX_BLOCK_BODY, decompress_block_stream};
use crate::error::{FormatError, Result};

/// Magic of a standalone container
pub const CONTAINER_MAGIC: u32 = 0xF00F_CEFA;

/// Split `data` into stored blocks of at most 0xFFFF bytes
pub fn encode_stored_blocks(data: &[u8]) -> Vec<u8> {
    let blocks = data.len().div_ceil(MAX_BLOCK_BODY);
    let mut encoded = Vec::with_capacity(data.len() + blocks * BLOCK_HEADER_SIZE);
    for chunk in data.chunks(MAX_BLOCK_BODY) {
        encoded.extend_from_slice(&BlockHeader::stored(chunk.len() as u16).to_bytes());
        encoded.extend_from_slice(chunk);
    }
    encoded
}

/// Wrap `data` as a standalone container
pub fn wrap_as_container(data: &[u8]) -> Vec<u8> {
    let encoded = encode_stored_blocks(data);

    let mut sha1 = [0u8; 20];
    sha1.copy_from_slice(&Sha1::digest(&encoded));

    let header = CasEntryHeader {
        magic: CONTAINER_MAGIC,
        sha1,
        data_size: encoded.len() as u32,
        padding: 0,
    };

    let mut out = Vec::with_capacity(CAS_ENTRY_HEADER_SIZE + encoded.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend(encoded);
    out
}

/// Decode a standalone container, checking its magic and hash
pub fn unwrap_container(bytes: &[u8]) -> Result<Vec<u8>> {
    let header = CasEntryHeader::parse(bytes)?;
    if header.magic != CONTAINER_MAGIC {
        return Err(FormatError::malformed(format!(
            "container magic 0x{:08X}, expected 0x{CONTAINER_MAGIC:08X}",
            header.magic
        )));
    }

    let body = &bytes[CAS_ENTRY_HEADER_SIZE..];
    let declared = header.data_size as usize;
    let encoded = body.get(..declared).ok_or(FormatError::TruncatedStream {
        expected: declared,
        actual: body.len(),
    })?;

    let digest = Sha1::digest(encoded);
    if digest.as_slice() != header.sha1.as_slice() {
        return Err(FormatError::HashMismatch {
            expected: hex::encode_upper(header.sha1),
            actual: hex::encode_upper(digest),
        });
    }

    decompress_block_stream(encoded, declared, declared)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_layout() {
        let wrapped = wrap_as_container(b"abc");

        assert_eq!(&wrapped[..4], &[0xFA, 0xCE, 0x0F, 0xF0]);
        assert_eq!(&wrapped[24..28], &11u32.to_le_bytes());
        assert_eq!(&wrapped[28..32], &[0, 0, 0, 0]);
        // Block header: ucsize 3, tag 0x0070, body length 3
        assert_eq!(&wrapped[32..40], &[0, 0, 0, 3, 0x00, 0x70, 0x00, 0x03]);
        assert_eq!(&wrapped[40..], b"abc");
    }

    #[test]
    fn test_large_input_is_split() {
        let data = vec![0x5Au8; MAX_BLOCK_BODY * 2 + 10];
        let encoded = encode_stored_blocks(&data);
        assert_eq!(encoded.len(), data.len() + 3 * BLOCK_HEADER_SIZE);

        let wrapped = wrap_as_container(&data);
        assert_eq!(unwrap_container(&wrapped).expect("unwrap"), data);
    }

    #[test]
    fn test_empty_input() {
        let wrapped = wrap_as_container(&[]);
        assert_eq!(wrapped.len(), CAS_ENTRY_HEADER_SIZE);
        assert!(unwrap_container(&wrapped).expect("unwrap").is_empty());
    }

    #[test]
    fn test_tampered_body() {
        let mut wrapped = wrap_as_container(b"payload");
        let last = wrapped.len() - 1;
        wrapped[last] ^= 0x01;

        let err = unwrap_container(&wrapped).expect_err("tampered");
        assert!(matches!(err, FormatError::HashMismatch { .. }));
    }

    #[test]
    fn test_wrong_magic() {
        let mut wrapped = wrap_as_container(b"payload");
        wrapped[0] = 0;

        let err = unwrap_container(&wrapped).expect_err("bad magic");
        assert!(matches!(err, FormatError::MalformedContainer(_)));
    }
}
