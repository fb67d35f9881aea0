//! Key/value settings

use std::collections::BTreeMap;

use rusqlite::OptionalExtension;

use super::Catalog;
use crate::error::Result;

/// Set to `"1"` until a scan has started
pub const IS_NEW_KEY: &str = "isNew";

/// Root directory of the scanned installation
pub const GAME_PATH_KEY: &str = "gamepath";

/// String settings consulted by the scanner
pub trait SettingsStore {
    /// Value of `key`, empty when unset
    fn setting(&self, key: &str) -> Result<String>;

    /// Set `key`, replacing any previous value
    fn assign_setting(&mut self, key: &str, value: &str) -> Result<()>;
}

impl SettingsStore for Catalog {
    fn setting(&self, key: &str) -> Result<String> {
        let value = self
            .connection()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1 LIMIT 1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value.unwrap_or_default())
    }

    fn assign_setting(&mut self, key: &str, value: &str) -> Result<()> {
        let tx = self.connection().unchecked_transaction()?;
        tx.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        tx.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl Catalog {
    /// Every setting
    pub fn settings(&self) -> Result<BTreeMap<String, String>> {
        let mut stmt = self.connection().prepare("SELECT key, value FROM settings")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
        Ok(pairs)
    }

    /// Whether the catalog has never been scanned
    pub fn needs_scan(&self) -> Result<bool> {
        Ok(self.setting(IS_NEW_KEY)? == "1")
    }
}
