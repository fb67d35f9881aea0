//! Binary superbundle bundles
//!
//! Layout (big-endian, offsets relative to byte 4):
//!
//! ```text
//! 0x00  meta_size        start of the EBX payloads
//! 0x04  magic            9D 79 8E D5
//! 0x08  total_count      ebx + res + chunk
//! 0x0C  ebx_count
//! 0x10  res_count
//! 0x14  chunk_count
//! 0x18  strings_offset
//! 0x1C  meta_offset
//! 0x20  meta_size
//! 0x24  sha1[total_count]
//!       ebx  (name_offset, original_size)[ebx_count]
//!       res  (name_offset, original_size)[res_count]
//!       res_type[res_count]
//!       res_meta[16][res_count]
//!       res_rid u64[res_count]
//!       chunk (id[16], logical_offset, logical_size)[chunk_count]
//! ```

use std::io::{Cursor, Seek, SeekFrom};

use binrw::{BinRead, BinResult};
use tracing::warn;

use super::{BundleFormat, ChunkEntry, DecodedBundle, EbxEntry, ResEntry};
use crate::codec::decode_payload_blocks;
use crate::error::{FormatError, Result};

/// Marker at byte 4 of a binary bundle, read as a little-endian u32
pub const BINARY_BUNDLE_MAGIC: u32 = 0xD58E_799D;

const HEADER_SIZE: u64 = 0x24;

/// Fixed header of a binary bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct BinaryBundleHeader {
    /// Offset of the EBX payloads, relative to byte 4
    pub meta_size: u32,
    /// Format marker
    pub magic: u32,
    /// Number of hashes (all entries)
    pub total_count: u32,
    /// EBX entries
    pub ebx_count: u32,
    /// RES entries
    pub res_count: u32,
    /// Chunk entries
    pub chunk_count: u32,
    /// Name table offset, relative to byte 4
    pub strings_offset: u32,
    /// Chunk metadata offset, relative to byte 4
    pub meta_offset: u32,
    /// Chunk metadata size
    pub chunk_meta_size: u32,
}

impl BinaryBundleHeader {
    fn table_size(&self) -> u64 {
        u64::from(self.total_count) * 20
            + u64::from(self.ebx_count) * 8
            + u64::from(self.res_count) * (8 + 4 + 16 + 8)
            + u64::from(self.chunk_count) * 24
    }

    fn validate(&self, len: usize) -> Result<()> {
        let entries = u64::from(self.ebx_count)
            + u64::from(self.res_count)
            + u64::from(self.chunk_count);
        if entries != u64::from(self.total_count) {
            return Err(FormatError::malformed(format!(
                "binary bundle counts {} + {} + {} do not add up to {}",
                self.ebx_count, self.res_count, self.chunk_count, self.total_count
            )));
        }

        let needed = HEADER_SIZE + self.table_size();
        if needed > len as u64 {
            return Err(FormatError::TruncatedStream {
                expected: needed as usize,
                actual: len,
            });
        }
        Ok(())
    }
}

#[derive(BinRead)]
#[br(big)]
struct NameRow {
    name_offset: u32,
    original_size: u32,
}

#[derive(BinRead)]
#[br(big)]
struct ChunkRow {
    id: [u8; 16],
    logical_offset: u32,
    logical_size: u32,
}

fn read_rows<T>(cursor: &mut Cursor<&[u8]>, count: u32) -> BinResult<Vec<T>>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    (0..count).map(|_| T::read_be(cursor)).collect()
}

fn read_name(payload: &[u8], strings_base: usize, name_offset: u32) -> Result<String> {
    let start = strings_base + name_offset as usize;
    let rest = payload.get(start..).ok_or(FormatError::DanglingReference {
        offset: start as u64,
        length: payload.len() as u64,
    })?;
    let len = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| FormatError::malformed("unterminated name in binary bundle"))?;
    Ok(String::from_utf8_lossy(&rest[..len]).into_owned())
}

/// Decode a binary bundle, including its inline EBX payloads
pub(super) fn decode_binary(payload: &[u8], path: &str) -> Result<DecodedBundle> {
    let marker = payload
        .get(4..8)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_le_bytes);
    if marker != Some(BINARY_BUNDLE_MAGIC) {
        return Err(FormatError::malformed(format!(
            "binary bundle {path} has marker {marker:08X?}, expected {BINARY_BUNDLE_MAGIC:08X}"
        )));
    }

    let mut cursor = Cursor::new(payload);
    let header = BinaryBundleHeader::read(&mut cursor)?;
    header.validate(payload.len())?;

    let sha1s: Vec<[u8; 20]> = read_rows(&mut cursor, header.total_count)?;
    let ebx_rows: Vec<NameRow> = read_rows(&mut cursor, header.ebx_count)?;
    let res_rows: Vec<NameRow> = read_rows(&mut cursor, header.res_count)?;
    let res_types: Vec<u32> = read_rows(&mut cursor, header.res_count)?;
    // Resource metadata and rids are not indexed.
    cursor.seek(SeekFrom::Current(i64::from(header.res_count) * (16 + 8)))?;
    let chunk_rows: Vec<ChunkRow> = read_rows(&mut cursor, header.chunk_count)?;

    let strings_base = 4 + header.strings_offset as usize;
    let (ebx_hashes, rest) = sha1s.split_at(header.ebx_count as usize);
    let (res_hashes, chunk_hashes) = rest.split_at(header.res_count as usize);

    let mut ebx = Vec::with_capacity(ebx_rows.len());
    for (row, sha1) in ebx_rows.iter().zip(ebx_hashes) {
        ebx.push(EbxEntry {
            name: Some(read_name(payload, strings_base, row.name_offset)?),
            sha1: Some(*sha1),
            original_size: Some(u64::from(row.original_size)),
            ..EbxEntry::default()
        });
    }

    let mut res = Vec::with_capacity(res_rows.len());
    for ((row, sha1), res_type) in res_rows.iter().zip(res_hashes).zip(&res_types) {
        res.push(ResEntry {
            name: Some(read_name(payload, strings_base, row.name_offset)?),
            sha1: Some(*sha1),
            res_type: *res_type,
            size: None,
            original_size: Some(u64::from(row.original_size)),
        });
    }

    let chunks = chunk_rows
        .iter()
        .zip(chunk_hashes)
        .map(|(row, sha1)| ChunkEntry {
            id: Some(row.id),
            sha1: Some(*sha1),
            logical_offset: Some(u64::from(row.logical_offset)),
            logical_size: Some(u64::from(row.logical_size)),
        })
        .collect();

    attach_payloads(payload, 4 + header.meta_size as usize, &mut ebx, path);

    Ok(DecodedBundle {
        path: path.to_owned(),
        format: BundleFormat::Binary,
        ebx,
        res,
        chunks,
    })
}

/// Walk the EBX payloads in entry order
///
/// Payloads are laid out back to back, so a payload that fails to decode
/// leaves every later entry without one. Those entries keep their table
/// fields and a stored size of zero.
fn attach_payloads(payload: &[u8], start: usize, ebx: &mut [EbxEntry], path: &str) {
    let mut pos = start;
    let mut lost_from = None;
    for (n, entry) in ebx.iter_mut().enumerate() {
        let original_size = entry.original_size.unwrap_or(0) as usize;
        let decoded = payload
            .get(pos..)
            .ok_or(FormatError::DanglingReference {
                offset: pos as u64,
                length: payload.len() as u64,
            })
            .and_then(|rest| decode_payload_blocks(rest, original_size));

        match decoded {
            Ok((data, consumed)) => {
                entry.size = Some(consumed as u64);
                entry.payload = Some(data);
                pos += consumed;
            }
            Err(e) => {
                warn!(
                    "bundle {path}: EBX payload for {} unreadable: {e}",
                    entry.name.as_deref().unwrap_or("<unnamed>")
                );
                lost_from = Some(n);
                break;
            }
        }
    }

    if let Some(n) = lost_from {
        for entry in &mut ebx[n..] {
            entry.size = Some(0);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bundle::RES_TYPE_TEXTURE;
    use crate::test_utils::{BinaryBundleFixture, deflate_block, lz_block, stored_block};
    use pretty_assertions::assert_eq;

    fn fixture() -> BinaryBundleFixture {
        let mut hero = stored_block(b"hero ");
        hero.extend(deflate_block(b"payload"));

        BinaryBundleFixture::default()
            .ebx("characters/hero", hero, 12)
            .ebx(
                "characters/villain",
                lz_block(&[0x01, b'a', b'b', b'c', b'd', 0xEC, 0x00], 12),
                12,
            )
            .res("characters/hero_d", RES_TYPE_TEXTURE, 2048)
            .chunk([0x42; 16], 65536)
    }

    #[test]
    fn test_decode_binary_bundle() {
        let bytes = fixture().build();
        let bundle = DecodedBundle::decode(&bytes, false, "win32/characters").expect("decode");

        assert_eq!(bundle.path, "win32/characters");
        assert_eq!(bundle.format, BundleFormat::Binary);
        assert_eq!(bundle.ebx.len(), 2);

        let hero = &bundle.ebx[0];
        assert_eq!(hero.name.as_deref(), Some("characters/hero"));
        assert_eq!(hero.sha1, Some([1; 20]));
        assert_eq!(hero.original_size, Some(12));
        assert!(hero.is_indexable());
        assert_eq!(bundle.ebx_payload("characters/hero"), Some(&b"hero payload"[..]));

        assert_eq!(
            bundle.ebx_payload("characters/villain"),
            Some(&b"abcdabcdabcd"[..])
        );
        assert_eq!(bundle.ebx[1].size, Some(15));

        let res = &bundle.res[0];
        assert_eq!(res.name.as_deref(), Some("characters/hero_d"));
        assert_eq!(res.res_type_hex(), "A654495C");
        assert_eq!(res.original_size, Some(2048));
        assert_eq!(res.sha1, Some([3; 20]));

        let chunk = &bundle.chunks[0];
        assert_eq!(chunk.id, Some([0x42; 16]));
        assert_eq!(chunk.sha1, Some([4; 20]));
        assert_eq!(chunk.logical_size, Some(65536));
    }

    #[test]
    fn test_wrong_marker() {
        let mut bytes = fixture().build();
        bytes[4] ^= 0xFF;

        let err = DecodedBundle::decode(&bytes, false, "x").expect_err("bad marker");
        assert!(matches!(err, FormatError::MalformedContainer(_)));
    }

    #[test]
    fn test_count_mismatch() {
        let mut bytes = fixture().build();
        // total_count lives at byte 8
        bytes[11] = bytes[11].wrapping_add(1);

        let err = DecodedBundle::decode(&bytes, false, "x").expect_err("counts disagree");
        assert!(matches!(err, FormatError::MalformedContainer(_)));
    }

    #[test]
    fn test_tables_past_end() {
        let bytes = fixture().build();
        let err = DecodedBundle::decode(&bytes[..60], false, "x").expect_err("cut short");
        assert!(matches!(err, FormatError::TruncatedStream { .. }));
    }

    #[test]
    fn test_broken_payload_keeps_entries() {
        let bytes = BinaryBundleFixture::default()
            .ebx("good", stored_block(b"abc"), 3)
            .ebx("bad", vec![0xFF, 0xFF], 8)
            .ebx("later", stored_block(b"def"), 3)
            .build();

        let bundle = DecodedBundle::decode(&bytes, false, "x").expect("decode");
        let summary: Vec<_> = bundle
            .ebx
            .iter()
            .map(|e| (e.name.as_deref(), e.is_indexable(), e.payload.is_some(), e.size))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some("good"), true, true, Some(11)),
                (Some("bad"), true, false, Some(0)),
                (Some("later"), true, false, Some(0)),
            ]
        );
        assert_eq!(bundle.ebx[2].sha1, Some([3; 20]));
        assert_eq!(bundle.ebx[2].original_size, Some(3));
        assert_eq!(bundle.ebx_payload("later"), None);
    }
}
