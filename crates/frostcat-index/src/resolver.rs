//! Asset byte resolution
//!
//! Catalog rows say where an asset lives; the resolver turns them into
//! decoded bytes. CAS-backed assets are read by hash, EBX assets of binary
//! bundles are taken from the (cached) decoded bundle.

use std::path::Path;
use std::sync::Arc;

use frostcat_formats::bundle::{DecodedBundle, EBX_GUID_END, ebx_guid_hex};
use frostcat_formats::toc::TocFile;
use tracing::trace;

use crate::cache::{BundleCache, BundleKey};
use crate::cas_store::CasStore;
use crate::catalog::{ChunkRecord, EbxRecord, ResRecord};
use crate::config::ScanConfig;
use crate::error::{IndexError, Result};

/// Parse a 40-character hex SHA1
pub fn parse_sha1(text: &str) -> Result<[u8; 20]> {
    hex::decode(text)
        .ok()
        .and_then(|bytes| <[u8; 20]>::try_from(bytes).ok())
        .ok_or_else(|| IndexError::NotFound(format!("{text:?} is not a SHA1")))
}

/// Resolves catalog rows to asset bytes
#[derive(Debug)]
pub struct AssetResolver {
    cas: CasStore,
    cache: BundleCache,
}

impl AssetResolver {
    /// Create a resolver over `cas`, caching bundles in `cache`
    pub fn new(cas: CasStore, cache: BundleCache) -> Self {
        Self { cas, cache }
    }

    /// Discover the CAS catalogs of the configured installation
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        Ok(Self::new(
            CasStore::discover(config)?,
            BundleCache::new(config.bundle_cache_capacity),
        ))
    }

    /// Underlying CAS index
    pub fn cas(&self) -> &CasStore {
        &self.cas
    }

    /// Bundle cache
    pub fn cache(&self) -> &BundleCache {
        &self.cache
    }

    /// Bundle cache, for priming with bundles decoded elsewhere
    pub fn cache_mut(&mut self) -> &mut BundleCache {
        &mut self.cache
    }

    /// Decoded bundle `bundle_path` of the TOC at `toc_path`
    pub fn bundle(&mut self, toc_path: &Path, bundle_path: &str) -> Result<Arc<DecodedBundle>> {
        let key = BundleKey::new(toc_path, bundle_path);
        self.cache.get_or_try_insert_with(&key, || -> Result<DecodedBundle> {
            trace!("decoding {bundle_path} from {}", toc_path.display());
            let toc = TocFile::open(toc_path)?;
            let data = toc.export_bundle_data(bundle_path)?.ok_or_else(|| {
                IndexError::NotFound(format!("bundle {bundle_path} in {}", toc_path.display()))
            })?;
            Ok(DecodedBundle::decode(&data, toc.uses_cas, bundle_path)?)
        })
    }

    fn ebx_payload(&mut self, record: &EbxRecord, max_size: usize) -> Result<Vec<u8>> {
        if record.in_cas {
            let sha1 = parse_sha1(&record.sha1)?;
            return self.cas.get_data_by_sha1(&sha1, max_size);
        }

        let bundle = self.bundle(Path::new(&record.toc_path), &record.bundle_path)?;
        bundle
            .ebx_payload(&record.path)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                IndexError::NotFound(format!("EBX {} in bundle {}", record.path, record.bundle_path))
            })
    }

    /// Decoded payload of an EBX asset
    pub fn ebx_bytes(&mut self, record: &EbxRecord) -> Result<Vec<u8>> {
        self.ebx_payload(record, usize::MAX)
    }

    /// Upper-hex GUID of an EBX asset, empty when its payload is too short
    pub fn ebx_guid(&mut self, record: &EbxRecord) -> Result<String> {
        let payload = self.ebx_payload(record, EBX_GUID_END)?;
        Ok(ebx_guid_hex(&payload))
    }

    /// Decoded payload of a resource
    pub fn res_bytes(&self, record: &ResRecord) -> Result<Vec<u8>> {
        self.cas
            .get_data_by_sha1(&parse_sha1(&record.sha1)?, usize::MAX)
    }

    /// Decoded payload of a chunk
    pub fn chunk_bytes(&self, record: &ChunkRecord) -> Result<Vec<u8>> {
        self.cas
            .get_data_by_sha1(&parse_sha1(&record.sha1)?, usize::MAX)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::HashPolicy;
    use frostcat_formats::bundle::{BundleFormat, EbxEntry};

    fn binary_bundle(path: &str, name: &str, payload: Vec<u8>) -> DecodedBundle {
        DecodedBundle {
            path: path.to_string(),
            format: BundleFormat::Binary,
            ebx: vec![EbxEntry {
                name: Some(name.to_string()),
                payload: Some(payload),
                ..EbxEntry::default()
            }],
            res: Vec::new(),
            chunks: Vec::new(),
        }
    }

    #[test]
    fn test_parse_sha1() {
        assert_eq!(parse_sha1(&"aB".repeat(20)).expect("sha1"), [0xAB; 20]);
        assert!(parse_sha1("ABCD").is_err());
        assert!(parse_sha1(&"zz".repeat(20)).is_err());
    }

    #[test]
    fn test_guid_from_primed_bundle() {
        let mut resolver = AssetResolver::new(CasStore::new(HashPolicy::Warn), BundleCache::new(2));
        let mut payload = vec![0u8; 0x40];
        payload[0x28..0x38].copy_from_slice(&[0xC3; 16]);
        resolver.cache_mut().insert(
            BundleKey::new("/g/ui.toc", "win32/ui"),
            Arc::new(binary_bundle("win32/ui", "ui/menu", payload)),
        );

        let record = EbxRecord {
            path: "ui/menu".into(),
            bundle_path: "win32/ui".into(),
            toc_path: "/g/ui.toc".into(),
            ..EbxRecord::default()
        };
        assert_eq!(resolver.ebx_guid(&record).expect("guid"), "C3".repeat(16));
        assert_eq!(resolver.ebx_bytes(&record).expect("bytes").len(), 0x40);

        let short = EbxRecord {
            path: "ui/missing".into(),
            ..record
        };
        assert!(matches!(
            resolver.ebx_guid(&short),
            Err(IndexError::NotFound(_))
        ));
    }

    #[test]
    fn test_short_payload_has_empty_guid() {
        let mut resolver = AssetResolver::new(CasStore::new(HashPolicy::Warn), BundleCache::new(2));
        resolver.cache_mut().insert(
            BundleKey::new("/g/ui.toc", "win32/ui"),
            Arc::new(binary_bundle("win32/ui", "ui/tiny", vec![1, 2, 3])),
        );
        let record = EbxRecord {
            path: "ui/tiny".into(),
            bundle_path: "win32/ui".into(),
            toc_path: "/g/ui.toc".into(),
            ..EbxRecord::default()
        };
        assert_eq!(resolver.ebx_guid(&record).expect("guid"), "");
    }

    #[test]
    fn test_cas_record_without_entry() {
        let mut resolver = AssetResolver::new(CasStore::new(HashPolicy::Warn), BundleCache::default());
        let record = EbxRecord {
            sha1: "01".repeat(20),
            in_cas: true,
            ..EbxRecord::default()
        };
        assert!(matches!(
            resolver.ebx_guid(&record),
            Err(IndexError::NotFound(_))
        ));
        assert!(resolver.cache().is_empty());
    }
}
