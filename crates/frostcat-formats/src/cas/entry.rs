//! CAS entry reading

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use binrw::BinRead;
use sha1::{Digest, Sha1};
use tracing::trace;

use super::CatLine;
use crate::codec::decompress_block_stream;
use crate::error::{FormatError, Result};

/// Size of the header preceding every CAS entry
pub const CAS_ENTRY_HEADER_SIZE: usize = 0x20;

/// Header preceding every CAS entry (little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct CasEntryHeader {
    /// Entry magic
    pub magic: u32,
    /// Hash of the encoded block stream
    pub sha1: [u8; 20],
    /// Length of the encoded block stream
    pub data_size: u32,
    /// Always zero in observed files
    pub padding: u32,
}

impl CasEntryHeader {
    /// Parse the first 0x20 bytes of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let header_bytes = bytes
            .get(..CAS_ENTRY_HEADER_SIZE)
            .ok_or(FormatError::TruncatedStream {
                expected: CAS_ENTRY_HEADER_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self::read(&mut Cursor::new(header_bytes))?)
    }

    /// On-disk representation
    pub fn to_bytes(&self) -> [u8; CAS_ENTRY_HEADER_SIZE] {
        let mut bytes = [0u8; CAS_ENTRY_HEADER_SIZE];
        bytes[..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..24].copy_from_slice(&self.sha1);
        bytes[24..28].copy_from_slice(&self.data_size.to_le_bytes());
        bytes[28..].copy_from_slice(&self.padding.to_le_bytes());
        bytes
    }
}

/// An entry read from a CAS file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasEntry {
    /// Entry header
    pub header: CasEntryHeader,
    /// Decoded payload
    pub data: Vec<u8>,
    encoded_sha1: Option<[u8; 20]>,
}

impl CasEntry {
    /// Decode an entry from its header and encoded body
    ///
    /// At most `min(declared size, size, max_size)` encoded bytes are
    /// decoded. The encoded body is hashed only when it was read in full and
    /// `max_size` does not cut the read short.
    pub fn decode(raw: &[u8], size: usize, max_size: usize) -> Result<Self> {
        let header = CasEntryHeader::parse(raw)?;
        let body = &raw[CAS_ENTRY_HEADER_SIZE..];
        let declared = header.data_size as usize;

        let encoded_sha1 = if max_size >= declared {
            body.get(..declared).map(|encoded| {
                let mut digest = [0u8; 20];
                digest.copy_from_slice(&Sha1::digest(encoded));
                digest
            })
        } else {
            None
        };

        let data = decompress_block_stream(body, declared.min(size), max_size)?;
        Ok(Self {
            header,
            data,
            encoded_sha1,
        })
    }

    /// Entry magic
    pub fn magic(&self) -> u32 {
        self.header.magic
    }

    /// Declared hash
    pub fn sha1(&self) -> &[u8; 20] {
        &self.header.sha1
    }

    /// Declared encoded length
    pub fn declared_size(&self) -> u32 {
        self.header.data_size
    }

    /// Whether the declared hash matches the encoded body
    ///
    /// `None` when the body was not read in full or the read was bounded by
    /// `max_size`.
    pub fn hash_matches(&self) -> Option<bool> {
        self.encoded_sha1.map(|digest| digest == self.header.sha1)
    }

    /// Fail with [`FormatError::HashMismatch`] when the hashes disagree
    pub fn verify_hash(&self) -> Result<()> {
        match self.encoded_sha1 {
            Some(actual) if actual != self.header.sha1 => Err(FormatError::HashMismatch {
                expected: hex::encode_upper(self.header.sha1),
                actual: hex::encode_upper(actual),
            }),
            _ => Ok(()),
        }
    }
}

/// A numbered `cas_NN.cas` payload file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasFile {
    path: PathBuf,
    number: u32,
}

impl CasFile {
    /// File name for CAS file `number`
    pub fn file_name(number: u32) -> String {
        format!("cas_{number:02}.cas")
    }

    /// CAS file `number` inside `dir`
    pub fn in_directory(dir: &Path, number: u32) -> Self {
        Self {
            path: dir.join(Self::file_name(number)),
            number,
        }
    }

    /// Wrap an existing path; the number comes from the last two characters
    /// of the file stem
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let digits = stem
            .get(stem.len().saturating_sub(2)..)
            .unwrap_or_default();
        let number = digits.parse().map_err(|_| {
            FormatError::malformed(format!("{} is not a numbered CAS file", path.display()))
        })?;
        Ok(Self { path, number })
    }

    /// Location on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// CAS file number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Read `len` bytes at `offset`
    pub fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut file = File::open(&self.path)?;
        let file_len = file.metadata()?.len();
        if offset > file_len {
            return Err(FormatError::DanglingReference {
                offset,
                length: file_len,
            });
        }
        let available = (file_len - offset) as usize;
        if len > available {
            return Err(FormatError::TruncatedStream {
                expected: len,
                actual: available,
            });
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read the entry whose payload starts at `offset`
    ///
    /// The 0x20-byte header sits immediately before `offset`.
    pub fn read_entry(&self, offset: u32, size: u32, max_size: usize) -> Result<CasEntry> {
        let start = u64::from(offset)
            .checked_sub(CAS_ENTRY_HEADER_SIZE as u64)
            .ok_or_else(|| {
                FormatError::malformed(format!(
                    "CAS offset 0x{offset:X} leaves no room for the entry header"
                ))
            })?;

        trace!(
            "reading {} bytes at 0x{offset:X} from {}",
            size,
            self.path.display()
        );
        let raw = self.read_range(start, size as usize + CAS_ENTRY_HEADER_SIZE)?;
        CasEntry::decode(&raw, size as usize, max_size)
    }

    /// Read the entry a catalog line points at
    pub fn read_line(&self, line: &CatLine, max_size: usize) -> Result<CasEntry> {
        self.read_entry(line.offset(), line.size(), max_size)
    }
}
