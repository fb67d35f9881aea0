//! Content lookup across every CAS catalog of an installation

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use frostcat_formats::cas::{CasEntry, CasFile, CatFile};
use tracing::{debug, info, warn};

use crate::config::{HashPolicy, ScanConfig};
use crate::error::{IndexError, Result};
use crate::scan::enumerate::{classify_path, walk_files};

/// File name of a CAS catalog
pub const CAT_FILE_NAME: &str = "cas.cat";

/// Where an entry lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasLocation {
    /// The `cas_NN.cas` file
    pub cas: CasFile,
    /// Payload offset (after the entry header)
    pub offset: u32,
    /// Encoded payload size
    pub size: u32,
}

/// SHA1 to CAS entry index built from `cas.cat` files
///
/// Catalogs are loaded base game first, then updates, then patches; an entry
/// listed by a later catalog replaces an earlier one.
#[derive(Debug, Default)]
pub struct CasStore {
    entries: HashMap<[u8; 20], CasLocation>,
    catalogs: Vec<PathBuf>,
    hash_policy: HashPolicy,
}

impl CasStore {
    /// Create an empty store
    pub fn new(hash_policy: HashPolicy) -> Self {
        Self {
            hash_policy,
            ..Self::default()
        }
    }

    /// Load every `cas.cat` under the configured game root
    ///
    /// Unreadable catalogs are logged and skipped; a failed directory walk is
    /// an error.
    pub fn discover(config: &ScanConfig) -> Result<Self> {
        let root = config.game_path.as_path();
        let mut catalogs = walk_files(root, |path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.eq_ignore_ascii_case(CAT_FILE_NAME))
        })?;
        catalogs.sort_by_cached_key(|path| (classify_path(root, path, config), path.clone()));

        let mut store = Self::new(config.hash_policy);
        for path in catalogs {
            if let Err(e) = store.load_catalog(&path) {
                warn!("skipping catalog {}: {e}", path.display());
            }
        }

        info!(
            "{} CAS entries from {} catalogs",
            store.len(),
            store.catalogs.len()
        );
        Ok(store)
    }

    /// Load one `cas.cat`; its CAS files are expected beside it
    pub fn load_catalog(&mut self, path: &Path) -> Result<usize> {
        let cat = CatFile::open(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let added = self.add_catalog(dir, &cat);
        self.catalogs.push(path.to_path_buf());

        debug!("{}: {added} entries", path.display());
        Ok(added)
    }

    /// Register the lines of `cat`, whose CAS files live in `dir`
    pub fn add_catalog(&mut self, dir: &Path, cat: &CatFile) -> usize {
        for line in cat.lines() {
            self.entries.insert(
                line.sha1(),
                CasLocation {
                    cas: CasFile::in_directory(dir, line.cas_number()),
                    offset: line.offset(),
                    size: line.size(),
                },
            );
        }
        cat.len()
    }

    /// Catalog files loaded so far
    pub fn catalogs(&self) -> &[PathBuf] {
        &self.catalogs
    }

    /// Number of distinct hashes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are known
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `sha1` is known
    pub fn contains(&self, sha1: &[u8; 20]) -> bool {
        self.entries.contains_key(sha1)
    }

    /// Location of `sha1`
    pub fn location(&self, sha1: &[u8; 20]) -> Option<&CasLocation> {
        self.entries.get(sha1)
    }

    /// Read the entry for `sha1`, decoding at most `max_size` encoded bytes
    pub fn entry_by_sha1(&self, sha1: &[u8; 20], max_size: usize) -> Result<CasEntry> {
        let location = self
            .location(sha1)
            .ok_or_else(|| IndexError::NotFound(format!("CAS entry {}", hex::encode_upper(sha1))))?;

        let entry = location
            .cas
            .read_entry(location.offset, location.size, max_size)?;
        self.hash_policy.apply(&entry)?;
        Ok(entry)
    }

    /// Decoded bytes of the entry for `sha1`, bounded by `max_size` encoded
    /// bytes
    pub fn get_data_by_sha1(&self, sha1: &[u8; 20], max_size: usize) -> Result<Vec<u8>> {
        Ok(self.entry_by_sha1(sha1, max_size)?.data)
    }
}
