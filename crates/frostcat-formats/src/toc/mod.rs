//! Table-of-contents files
//!
//! A `.toc` file lists the bundles stored in its companion `.sb` superbundle
//! and the chunks declared directly by the TOC. The payload is a DbObject,
//! optionally preceded by a header:
//!
//! - `00 D1 CE 01`: plain payload at 0x22C
//! - `00 D1 CE 00`: payload at 0x22C XORed with a 257-byte key stored at
//!   0x128 (each key byte XORed with 0x7B)
//! - anything else: the whole file is the payload

use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::dbobject::{DbObject, read_object};
use crate::error::{FormatError, Result};

/// Header of a TOC with a plain payload
pub const TOC_MAGIC_PLAIN: [u8; 4] = [0x00, 0xD1, 0xCE, 0x01];

/// Header of a TOC with an obfuscated payload
pub const TOC_MAGIC_OBFUSCATED: [u8; 4] = [0x00, 0xD1, 0xCE, 0x00];

/// Payload offset in files with a header
pub const TOC_PAYLOAD_OFFSET: usize = 0x22C;

const XOR_KEY_OFFSET: usize = 0x128;
const XOR_KEY_LEN: usize = 257;
const XOR_KEY_MASK: u8 = 0x7B;

/// A bundle listed by a TOC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    /// Bundle path (FrostId)
    pub id: String,
    /// Offset in the superbundle
    pub offset: u64,
    /// Size in the superbundle
    pub size: u64,
    /// Bundle is stored in the base game
    pub is_base: bool,
    /// Bundle is a delta against the base game
    pub is_delta: bool,
}

/// A chunk declared directly by a TOC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Chunk id
    pub id: Option<[u8; 16]>,
    /// Content hash
    pub sha1: Option<[u8; 20]>,
    /// Offset in the superbundle, for non-CAS TOCs
    pub offset: u64,
    /// Size in the superbundle, for non-CAS TOCs
    pub size: u64,
}

/// Strip the TOC header and undo the payload obfuscation
pub fn decode_toc_payload(data: &[u8]) -> Result<Cow<'_, [u8]>> {
    let magic = data.get(..4);
    if magic == Some(TOC_MAGIC_PLAIN.as_slice()) {
        return payload_slice(data).map(Cow::Borrowed);
    }
    if magic != Some(TOC_MAGIC_OBFUSCATED.as_slice()) {
        return Ok(Cow::Borrowed(data));
    }

    let key: Vec<u8> = data
        .get(XOR_KEY_OFFSET..XOR_KEY_OFFSET + XOR_KEY_LEN)
        .ok_or(FormatError::TruncatedStream {
            expected: XOR_KEY_OFFSET + XOR_KEY_LEN,
            actual: data.len(),
        })?
        .iter()
        .map(|b| b ^ XOR_KEY_MASK)
        .collect();

    let payload = payload_slice(data)?
        .iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect();
    Ok(Cow::Owned(payload))
}

fn payload_slice(data: &[u8]) -> Result<&[u8]> {
    data.get(TOC_PAYLOAD_OFFSET..)
        .ok_or(FormatError::TruncatedStream {
            expected: TOC_PAYLOAD_OFFSET,
            actual: data.len(),
        })
}

fn unsigned(object: &DbObject, name: &str) -> u64 {
    // Negative values cannot be valid offsets; push them out of range.
    object
        .get_i64(name)
        .map_or(0, |v| u64::try_from(v).unwrap_or(u64::MAX))
}

fn bundle_info(object: &DbObject) -> BundleInfo {
    BundleInfo {
        id: object.get_str("id").unwrap_or_default().to_owned(),
        offset: unsigned(object, "offset"),
        size: unsigned(object, "size"),
        is_base: object.get_bool("base").unwrap_or(false),
        is_delta: object.get_bool("delta").unwrap_or(false),
    }
}

fn chunk_info(object: &DbObject) -> ChunkInfo {
    ChunkInfo {
        id: object.get_guid("id").copied(),
        sha1: object.get_sha1("sha1").copied(),
        offset: unsigned(object, "offset"),
        size: unsigned(object, "size"),
    }
}

/// A parsed TOC file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocFile {
    path: Option<PathBuf>,
    /// Bundles, in file order
    pub bundles: Vec<BundleInfo>,
    /// Chunks declared by the TOC itself
    pub chunks: Vec<ChunkInfo>,
    /// Bundles are CAS manifests rather than binary bundles
    pub uses_cas: bool,
}

impl TocFile {
    /// Parse TOC bytes that are not tied to a file on disk
    pub fn parse(data: &[u8]) -> Result<Self> {
        let payload = decode_toc_payload(data)?;
        let root = read_object(&payload)?;

        Ok(Self {
            path: None,
            bundles: root.objects_in("bundles").map(bundle_info).collect(),
            chunks: root.objects_in("chunks").map(chunk_info).collect(),
            uses_cas: root.get_bool("cas").unwrap_or(false),
        })
    }

    /// Read and parse a TOC file
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(path, &data)
    }

    /// Parse the already-read contents of the TOC file at `path`
    pub fn from_bytes(path: &Path, data: &[u8]) -> Result<Self> {
        let mut toc = Self::parse(data)?;
        toc.path = Some(path.to_path_buf());

        debug!(
            "{}: {} bundles, {} chunks, cas={}",
            path.display(),
            toc.bundles.len(),
            toc.chunks.len(),
            toc.uses_cas
        );
        Ok(toc)
    }

    /// Location on disk, when opened from a file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The companion `.sb` superbundle
    pub fn superbundle_path(&self) -> Option<PathBuf> {
        self.path.as_ref().map(|path| path.with_extension("sb"))
    }

    /// Bundle whose id matches `id`, ignoring ASCII case
    pub fn bundle(&self, id: &str) -> Option<&BundleInfo> {
        self.bundles
            .iter()
            .find(|bundle| bundle.id.eq_ignore_ascii_case(id))
    }

    /// Slice one bundle's bytes out of the superbundle
    pub fn read_bundle(&self, info: &BundleInfo) -> Result<Vec<u8>> {
        let sb_path = self
            .superbundle_path()
            .ok_or_else(|| FormatError::malformed("TOC was not opened from a file"))?;

        let mut file = File::open(&sb_path)?;
        let file_len = file.metadata()?.len();
        if info.offset > file_len {
            return Err(FormatError::DanglingReference {
                offset: info.offset,
                length: file_len,
            });
        }
        let available = file_len - info.offset;
        if info.size > available {
            return Err(FormatError::TruncatedStream {
                expected: info.size as usize,
                actual: available as usize,
            });
        }

        file.seek(SeekFrom::Start(info.offset))?;
        let mut buffer = vec![0u8; info.size as usize];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Bytes of the bundle named `id`, or `None` when the TOC does not list it
    pub fn export_bundle_data(&self, id: &str) -> Result<Option<Vec<u8>>> {
        self.bundle(id)
            .map(|info| self.read_bundle(info))
            .transpose()
    }
}
