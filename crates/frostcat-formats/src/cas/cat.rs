//! CAT line tables

use std::io::Cursor;
use std::path::Path;

use binrw::BinRead;
use tracing::debug;

use crate::error::{FormatError, Result};

/// Optional header at the start of a catalog
pub const CAT_MAGIC: &[u8; 16] = b"NyanNyanNyanNyan";

/// Size of one catalog line
pub const CAT_LINE_SIZE: usize = 32;

/// One catalog line: eight little-endian u32 fields
///
/// Fields 0..5 hold the SHA1, 5 the offset, 6 the size and 7 the number of
/// the CAS file holding the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct CatLine {
    /// Raw fields
    pub fields: [u32; 8],
}

impl CatLine {
    /// Content hash
    pub fn sha1(&self) -> [u8; 20] {
        let mut sha1 = [0u8; 20];
        for (chunk, field) in sha1.chunks_exact_mut(4).zip(&self.fields[..5]) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        sha1
    }

    /// Offset of the entry payload in its CAS file
    pub fn offset(&self) -> u32 {
        self.fields[5]
    }

    /// Size of the entry payload
    pub fn size(&self) -> u32 {
        self.fields[6]
    }

    /// Number of the CAS file holding the entry
    pub fn cas_number(&self) -> u32 {
        self.fields[7]
    }
}

/// A parsed `cas.cat`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatFile {
    lines: Vec<CatLine>,
}

impl CatFile {
    /// Parse catalog bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        let body = data.strip_prefix(CAT_MAGIC.as_slice()).unwrap_or(data);
        if body.len() % CAT_LINE_SIZE != 0 {
            return Err(FormatError::malformed(format!(
                "catalog body of {} bytes is not a whole number of {CAT_LINE_SIZE}-byte lines",
                body.len()
            )));
        }

        let mut cursor = Cursor::new(body);
        let lines = (0..body.len() / CAT_LINE_SIZE)
            .map(|_| CatLine::read(&mut cursor))
            .collect::<binrw::BinResult<Vec<_>>>()?;

        Ok(Self { lines })
    }

    /// Read and parse a catalog file
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let cat = Self::parse(&data)?;
        debug!("loaded {} catalog lines from {}", cat.len(), path.display());
        Ok(cat)
    }

    /// Every line, in file order
    pub fn lines(&self) -> &[CatLine] {
        &self.lines
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Indexes of the lines stored in CAS file `cas_number`, in file order
    pub fn index_lines_for_cas(&self, cas_number: u32) -> Vec<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.cas_number() == cas_number)
            .map(|(index, _)| index)
            .collect()
    }

    /// First line with the given hash
    pub fn find(&self, sha1: &[u8; 20]) -> Option<&CatLine> {
        self.lines.iter().find(|line| &line.sha1() == sha1)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(sha1: [u8; 20], offset: u32, size: u32, cas: u32) -> Vec<u8> {
        let mut out = sha1.to_vec();
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&cas.to_le_bytes());
        out
    }

    #[test]
    fn test_parse_with_header() {
        let mut data = CAT_MAGIC.to_vec();
        data.extend(line([0xAA; 20], 0x20, 100, 1));
        data.extend(line([0xBB; 20], 0x1000, 200, 2));

        let cat = CatFile::parse(&data).expect("parse");
        assert_eq!(cat.len(), 2);

        let first = cat.lines()[0];
        assert_eq!(first.sha1(), [0xAA; 20]);
        assert_eq!(first.offset(), 0x20);
        assert_eq!(first.size(), 100);
        assert_eq!(first.cas_number(), 1);
    }

    #[test]
    fn test_parse_without_header() {
        let data = line([0x01; 20], 0x40, 8, 3);
        let cat = CatFile::parse(&data).expect("parse");
        assert_eq!(cat.lines()[0].cas_number(), 3);
    }

    #[test]
    fn test_sha1_keeps_byte_order() {
        let sha1: [u8; 20] = std::array::from_fn(|i| i as u8);
        let cat = CatFile::parse(&line(sha1, 0, 0, 0)).expect("parse");
        assert_eq!(cat.lines()[0].sha1(), sha1);
        assert!(cat.find(&sha1).is_some());
        assert!(cat.find(&[0; 20]).is_none());
    }

    #[test]
    fn test_lines_for_cas_keep_order() {
        let mut data = Vec::new();
        for (i, cas) in [1u32, 2, 1, 3, 1].into_iter().enumerate() {
            data.extend(line([i as u8; 20], 0x20, 1, cas));
        }

        let cat = CatFile::parse(&data).expect("parse");
        assert_eq!(cat.index_lines_for_cas(1), vec![0, 2, 4]);
        assert_eq!(cat.index_lines_for_cas(3), vec![3]);
        assert!(cat.index_lines_for_cas(9).is_empty());
    }

    #[test]
    fn test_partial_line() {
        let mut data = line([0; 20], 0, 0, 0);
        data.pop();

        let err = CatFile::parse(&data).expect_err("31-byte line");
        assert!(matches!(err, FormatError::MalformedContainer(_)));
    }

    #[test]
    fn test_empty_catalog() {
        let cat = CatFile::parse(CAT_MAGIC).expect("parse");
        assert!(cat.is_empty());
    }
}
