//! SQLite content catalog
//!
//! The catalog owns every persisted table: discovered files, bundles, and
//! the EBX, RES and chunk records found inside them. A scan always starts
//! with [`Catalog::rebuild`]; rows are only ever inserted afterwards.

mod batch;
mod insert;
mod query;
pub mod records;
pub mod schema;
mod settings;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::config::CatalogConfig;
use crate::error::Result;

pub(crate) use insert::hex_or_empty;
pub use query::{BundleSort, FileKind, OriginFilter};
pub use records::{
    BundleRecord, BundleWithToc, CatalogStats, ChunkRecord, EbxRecord, GameFile,
    GlobalChunkRecord, Origin, Provenance, ResLocation, ResRecord, TocFileRecord,
};
pub use settings::{GAME_PATH_KEY, IS_NEW_KEY, SettingsStore};

/// The content catalog
pub struct Catalog {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").field("path", &self.path).finish()
    }
}

impl Catalog {
    /// Open or create the catalog at `path`
    ///
    /// Missing tables are created. A database without settings is marked as
    /// never scanned.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        debug!("opened catalog {}", path.display());
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open a catalog that lives only as long as the value
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    /// Open the catalog described by `config`
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        if config.is_in_memory() {
            Self::open_in_memory()
        } else {
            Self::open(&config.path)
        }
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(schema::SETTINGS)?;
        conn.execute_batch(schema::ENTITIES)?;

        let catalog = Self { conn, path };
        if catalog.settings()?.is_empty() {
            catalog.reset_settings()?;
        }
        Ok(catalog)
    }

    /// Database file, `None` for in-memory catalogs
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Drop and recreate every table
    ///
    /// Afterwards every entity table is empty and the settings hold only
    /// `isNew = "1"`.
    pub fn rebuild(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(&schema::drop_entities())?;
        tx.execute_batch("DROP TABLE IF EXISTS settings;")?;
        tx.execute_batch(schema::SETTINGS)?;
        tx.execute_batch(schema::ENTITIES)?;
        tx.execute(
            "INSERT INTO settings (key, value) VALUES (?1, '1')",
            [IS_NEW_KEY],
        )?;
        tx.commit()?;

        info!("catalog rebuilt");
        Ok(())
    }

    fn reset_settings(&self) -> Result<()> {
        self.conn.execute("DELETE FROM settings", [])?;
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, '1')",
            [IS_NEW_KEY],
        )?;
        Ok(())
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_new_catalog_needs_scan() {
        let catalog = Catalog::open_in_memory().expect("open");
        assert!(catalog.needs_scan().expect("settings"));
        assert!(catalog.row_counts().expect("counts").is_empty());
        assert!(catalog.path().is_none());
    }

    #[test]
    fn test_rebuild_resets_everything() {
        let mut catalog = Catalog::open_in_memory().expect("open");
        catalog.assign_setting(GAME_PATH_KEY, "/games/dai").expect("set");
        catalog.assign_setting(IS_NEW_KEY, "0").expect("set");
        catalog
            .insert_sb_files(&[GameFile {
                path: "/games/dai/data/ui.sb".into(),
                origin: Origin::BaseGame,
            }])
            .expect("insert");

        catalog.rebuild().expect("rebuild");

        assert!(catalog.row_counts().expect("counts").is_empty());
        let expected: BTreeMap<String, String> =
            [(IS_NEW_KEY.to_string(), "1".to_string())].into();
        assert_eq!(catalog.settings().expect("settings"), expected);
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("database.sqlite");
        {
            let mut catalog = Catalog::open(&path).expect("open");
            catalog.assign_setting(IS_NEW_KEY, "0").expect("set");
        }

        let catalog = Catalog::from_config(&CatalogConfig::new(&path)).expect("reopen");
        assert!(!catalog.needs_scan().expect("settings"));
        assert_eq!(catalog.path(), Some(path.as_path()));
    }
}
