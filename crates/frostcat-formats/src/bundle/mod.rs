//! Bundle manifests
//!
//! A bundle lists the EBX, RES and chunk assets that ship together. TOC files
//! flagged `cas` store each bundle as a DbObject manifest whose assets live in
//! CAS files; other TOC files point at binary bundles that carry their EBX
//! payloads inline.

mod binary;
mod manifest;
mod restype;

pub use binary::{BINARY_BUNDLE_MAGIC, BinaryBundleHeader};
pub use restype::{RES_TYPE_TEXTURE, parse_res_type_hex, res_type_extension, res_type_hex};

use tracing::debug;

use crate::error::{FormatError, Result};

/// First byte of a CAS bundle manifest (an unnamed DbObject)
pub const CAS_BUNDLE_MARKER: u8 = 0x82;

/// Byte offset of the GUID inside a decoded EBX payload
pub const EBX_GUID_OFFSET: usize = 0x28;

/// Bytes of payload needed to read the GUID
pub const EBX_GUID_END: usize = EBX_GUID_OFFSET + 16;

/// GUID stored at `[0x28, 0x38)` of a decoded EBX payload
pub fn ebx_guid(payload: &[u8]) -> Option<[u8; 16]> {
    payload
        .get(EBX_GUID_OFFSET..EBX_GUID_END)
        .and_then(|bytes| bytes.try_into().ok())
}

/// Upper-hex GUID of an EBX payload, empty when the payload is too short
pub fn ebx_guid_hex(payload: &[u8]) -> String {
    ebx_guid(payload).map(hex::encode_upper).unwrap_or_default()
}

/// Storage layout a bundle was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleFormat {
    /// DbObject manifest, assets stored in CAS files
    Cas,
    /// Binary bundle with inline EBX payloads
    Binary,
}

/// A game-object asset entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EbxEntry {
    /// Asset path
    pub name: Option<String>,
    /// Content hash
    pub sha1: Option<[u8; 20]>,
    /// Hash of the base version for patched assets
    pub base_sha1: Option<[u8; 20]>,
    /// Hash of the delta for patched assets
    pub delta_sha1: Option<[u8; 20]>,
    /// Patch type code (0 when absent)
    pub cas_patch_type: i64,
    /// Stored (encoded) size; zero for a binary-bundle entry whose payload
    /// could not be decoded
    pub size: Option<u64>,
    /// Decoded size
    pub original_size: Option<u64>,
    /// Decoded payload, for binary bundles
    pub payload: Option<Vec<u8>>,
}

impl EbxEntry {
    /// Whether the entry carries everything a catalog row needs
    pub fn is_indexable(&self) -> bool {
        self.name.is_some() && self.size.is_some() && self.original_size.is_some()
    }
}

/// A typed resource entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResEntry {
    /// Resource path
    pub name: Option<String>,
    /// Content hash
    pub sha1: Option<[u8; 20]>,
    /// Resource type tag
    pub res_type: u32,
    /// Stored size
    pub size: Option<u64>,
    /// Decoded size
    pub original_size: Option<u64>,
}

impl ResEntry {
    /// Catalog text form of the type tag
    pub fn res_type_hex(&self) -> String {
        res_type_hex(self.res_type)
    }
}

/// A raw binary chunk entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkEntry {
    /// Chunk id
    pub id: Option<[u8; 16]>,
    /// Content hash
    pub sha1: Option<[u8; 20]>,
    /// Offset inside the logical chunk
    pub logical_offset: Option<u64>,
    /// Size of the logical chunk
    pub logical_size: Option<u64>,
}

/// A decoded bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBundle {
    /// Bundle path (its FrostId)
    pub path: String,
    /// Layout the bundle came from
    pub format: BundleFormat,
    /// Game-object assets
    pub ebx: Vec<EbxEntry>,
    /// Typed resources
    pub res: Vec<ResEntry>,
    /// Raw chunks
    pub chunks: Vec<ChunkEntry>,
}

impl DecodedBundle {
    /// Decode a bundle payload sliced from a superbundle
    ///
    /// `uses_cas` selects the layout from the owning TOC. `fallback_path` names
    /// the bundle when the payload carries no path of its own.
    pub fn decode(payload: &[u8], uses_cas: bool, fallback_path: &str) -> Result<Self> {
        let bundle = if uses_cas {
            if payload.first() != Some(&CAS_BUNDLE_MARKER) {
                return Err(FormatError::malformed(format!(
                    "CAS bundle {fallback_path} does not start with 0x82"
                )));
            }
            manifest::decode_manifest(payload, fallback_path)?
        } else {
            binary::decode_binary(payload, fallback_path)?
        };

        debug!(
            "decoded bundle {}: {} ebx, {} res, {} chunks",
            bundle.path,
            bundle.ebx.len(),
            bundle.res.len(),
            bundle.chunks.len()
        );
        Ok(bundle)
    }

    /// Inline payload of the EBX entry named exactly `name`
    ///
    /// When several entries share a name the last one wins.
    pub fn ebx_payload(&self, name: &str) -> Option<&[u8]> {
        self.ebx
            .iter()
            .rev()
            .find(|entry| entry.name.as_deref() == Some(name))
            .and_then(|entry| entry.payload.as_deref())
    }
}
