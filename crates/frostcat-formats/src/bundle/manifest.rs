//! CAS bundle manifests

use super::{BundleFormat, ChunkEntry, DecodedBundle, EbxEntry, ResEntry};
use crate::dbobject::{DbObject, read_object};
use crate::error::Result;

fn to_u64(value: Option<i64>) -> Option<u64> {
    value.and_then(|v| u64::try_from(v).ok())
}

fn ebx_entry(object: &DbObject) -> EbxEntry {
    EbxEntry {
        name: object.get_str("name").map(str::to_owned),
        sha1: object.get_sha1("sha1").copied(),
        base_sha1: object.get_sha1("baseSha1").copied(),
        delta_sha1: object.get_sha1("deltaSha1").copied(),
        cas_patch_type: object.get_i64("casPatchType").unwrap_or(0),
        size: to_u64(object.get_i64("size")),
        original_size: to_u64(object.get_i64("originalSize")),
        payload: None,
    }
}

fn res_entry(object: &DbObject) -> ResEntry {
    ResEntry {
        name: object.get_str("name").map(str::to_owned),
        sha1: object.get_sha1("sha1").copied(),
        // Stored as a signed int; the catalog wants its raw bits.
        res_type: object.get_i64("resType").map_or(0, |v| v as u32),
        size: to_u64(object.get_i64("size")),
        original_size: to_u64(object.get_i64("originalSize")),
    }
}

fn chunk_entry(object: &DbObject) -> ChunkEntry {
    ChunkEntry {
        id: object.get_guid("id").copied(),
        sha1: object.get_sha1("sha1").copied(),
        logical_offset: to_u64(object.get_i64("logicalOffset")),
        logical_size: to_u64(object.get_i64("logicalSize")),
    }
}

/// Decode a DbObject bundle manifest
pub(super) fn decode_manifest(payload: &[u8], fallback_path: &str) -> Result<DecodedBundle> {
    let root = read_object(payload)?;

    Ok(DecodedBundle {
        path: root
            .get_str("path")
            .unwrap_or(fallback_path)
            .to_owned(),
        format: BundleFormat::Cas,
        ebx: root.objects_in("ebx").map(ebx_entry).collect(),
        res: root.objects_in("res").map(res_entry).collect(),
        chunks: root.objects_in("chunks").map(chunk_entry).collect(),
    })
}
