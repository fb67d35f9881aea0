//! Scan and catalog configuration

use std::path::{Path, PathBuf};

use frostcat_formats::cas::CasEntry;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::DEFAULT_BUNDLE_CACHE_CAPACITY;
use crate::error::{IndexError, Result};

/// What to do when a CAS entry's declared hash disagrees with its body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashPolicy {
    /// Do not hash entries
    Ignore,
    /// Log mismatches and keep the entry
    #[default]
    Warn,
    /// Reject mismatching entries
    Enforce,
}

impl HashPolicy {
    /// Check `entry` under this policy
    pub fn apply(self, entry: &CasEntry) -> Result<()> {
        match self {
            Self::Ignore => Ok(()),
            Self::Warn => {
                if let Err(err) = entry.verify_hash() {
                    warn!("{err}");
                }
                Ok(())
            }
            Self::Enforce => entry.verify_hash().map_err(IndexError::from),
        }
    }
}

/// Configuration for a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Root of the game installation
    pub game_path: PathBuf,

    /// Directory name marking update content
    pub update_marker: String,

    /// Directory name, below the update directory, marking patch content
    pub patch_marker: String,

    /// Decoded bundles kept for GUID resolution
    pub bundle_cache_capacity: usize,

    /// EBX rows per committed transaction
    pub ebx_batch_size: usize,

    /// Global chunk rows per committed transaction
    pub global_chunk_batch_size: usize,

    /// CAS hash verification
    pub hash_policy: HashPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            game_path: PathBuf::new(),
            update_marker: "update".to_string(),
            patch_marker: "patch".to_string(),
            bundle_cache_capacity: DEFAULT_BUNDLE_CACHE_CAPACITY,
            ebx_batch_size: 100,
            global_chunk_batch_size: 1000,
            hash_policy: HashPolicy::default(),
        }
    }
}

impl ScanConfig {
    /// Create a configuration for the game installed at `game_path`
    pub fn new<P: AsRef<Path>>(game_path: P) -> Self {
        Self {
            game_path: game_path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| IndexError::Config(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values a scan cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.bundle_cache_capacity == 0 {
            return Err(IndexError::Config(
                "bundle_cache_capacity must be at least 1".into(),
            ));
        }
        if self.ebx_batch_size == 0 || self.global_chunk_batch_size == 0 {
            return Err(IndexError::Config("batch sizes must be at least 1".into()));
        }
        if self.update_marker.is_empty() || self.patch_marker.is_empty() {
            return Err(IndexError::Config("origin markers must not be empty".into()));
        }
        Ok(())
    }

    /// Set the game root
    #[must_use]
    pub fn with_game_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.game_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the update and patch directory markers
    #[must_use]
    pub fn with_markers(mut self, update: impl Into<String>, patch: impl Into<String>) -> Self {
        self.update_marker = update.into();
        self.patch_marker = patch.into();
        self
    }

    /// Set the bundle cache capacity
    #[must_use]
    pub const fn with_bundle_cache_capacity(mut self, capacity: usize) -> Self {
        self.bundle_cache_capacity = capacity;
        self
    }

    /// Set the EBX batch size
    #[must_use]
    pub const fn with_ebx_batch_size(mut self, size: usize) -> Self {
        self.ebx_batch_size = size;
        self
    }

    /// Set the global chunk batch size
    #[must_use]
    pub const fn with_global_chunk_batch_size(mut self, size: usize) -> Self {
        self.global_chunk_batch_size = size;
        self
    }

    /// Set the hash policy
    #[must_use]
    pub const fn with_hash_policy(mut self, policy: HashPolicy) -> Self {
        self.hash_policy = policy;
        self
    }
}

/// Location of the catalog database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("database.sqlite"),
        }
    }
}

impl CatalogConfig {
    /// In-memory database path
    pub const IN_MEMORY: &'static str = ":memory:";

    /// Create a configuration for the database at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Whether the catalog lives only in memory
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == Self::IN_MEMORY
    }
}
