use frostcat_formats::toc::{BundleInfo, ChunkInfo};
use rusqlite::params;
use tracing::trace;

use super::Catalog;
use super::batch::BatchWriter;
use super::records::{ChunkRecord, EbxRecord, GameFile, ResRecord, TocFileRecord, bool_text};
use crate::error::Result;

/// Upper-hex text of an optional hash or id, empty when absent
pub(crate) fn hex_or_empty<T: AsRef<[u8]>>(bytes: Option<T>) -> String {
    bytes.map(hex::encode_upper).unwrap_or_default()
}

impl Catalog {
    /// Record discovered superbundle files
    pub fn insert_sb_files(&self, files: &[GameFile]) -> Result<usize> {
        let mut writer = BatchWriter::new(self.connection(), files.len());
        for file in files {
            writer.execute(
                "INSERT INTO sbfiles (path, type) VALUES (?1, ?2)",
                params![file.path, file.origin.code()],
            )?;
        }
        Ok(writer.finish()?)
    }

    /// Record one TOC file and return its row id
    ///
    /// `record.id` is ignored.
    pub fn insert_toc_file(&self, record: &TocFileRecord) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO tocfiles (path, md5, incas, type) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.path,
                record.md5,
                bool_text(record.in_cas),
                record.origin.code()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Record TOC files in one transaction and return their row ids
    pub fn insert_toc_files(&self, records: &[TocFileRecord]) -> Result<Vec<i64>> {
        let tx = self.connection().unchecked_transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.insert_toc_file(record)?);
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Record a bundle listed by the TOC `toc_id` and return its row id
    pub fn insert_bundle(&self, toc_id: i64, info: &BundleInfo) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO bundles (tocfile, frostid, offset, size, base, delta) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                toc_id,
                info.id,
                info.offset as i64,
                info.size as i64,
                bool_text(info.is_base),
                bool_text(info.is_delta)
            ],
        )?;
        let id = conn.last_insert_rowid();
        trace!("bundle {} -> row {id}", info.id);
        Ok(id)
    }

    /// Record EBX rows, committing every `batch_size` rows
    pub fn insert_ebx(&self, records: &[EbxRecord], batch_size: usize) -> Result<usize> {
        let mut writer = BatchWriter::new(self.connection(), batch_size);
        for ebx in records {
            writer.execute(
                "INSERT INTO ebxlut (path, sha1, basesha1, deltasha1, casptype, guid, bundlepath, \
                 offset, size, isbase, isdelta, tocpath, incas, filetype) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    ebx.path,
                    ebx.sha1,
                    ebx.base_sha1,
                    ebx.delta_sha1,
                    ebx.cas_patch_type,
                    ebx.guid,
                    ebx.bundle_path,
                    ebx.offset as i64,
                    ebx.size as i64,
                    bool_text(ebx.is_base),
                    bool_text(ebx.is_delta),
                    ebx.toc_path,
                    bool_text(ebx.in_cas),
                    ebx.origin.code()
                ],
            )?;
        }
        Ok(writer.finish()?)
    }

    /// Record RES rows of one bundle in one transaction
    pub fn insert_res(&self, records: &[ResRecord]) -> Result<usize> {
        let mut writer = BatchWriter::new(self.connection(), records.len());
        for res in records {
            writer.execute(
                "INSERT INTO res (name, sha1, rtype, bundle) VALUES (?1, ?2, ?3, ?4)",
                params![res.name, res.sha1, res.res_type, res.bundle_id],
            )?;
        }
        Ok(writer.finish()?)
    }

    /// Record chunk rows of one bundle in one transaction
    pub fn insert_chunks(&self, records: &[ChunkRecord]) -> Result<usize> {
        let mut writer = BatchWriter::new(self.connection(), records.len());
        for chunk in records {
            writer.execute(
                "INSERT INTO chunks (id, sha1, bundle) VALUES (?1, ?2, ?3)",
                params![chunk.id, chunk.sha1, chunk.bundle_id],
            )?;
        }
        Ok(writer.finish()?)
    }

    /// Record chunks declared by the TOC `toc_id`, committing every
    /// `batch_size` rows
    pub fn insert_global_chunks(
        &self,
        toc_id: i64,
        chunks: &[ChunkInfo],
        batch_size: usize,
    ) -> Result<usize> {
        let mut writer = BatchWriter::new(self.connection(), batch_size);
        for chunk in chunks {
            writer.execute(
                "INSERT INTO globalchunks (tocfile, id, sha1, offset, size) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    toc_id,
                    hex_or_empty(chunk.id),
                    hex_or_empty(chunk.sha1),
                    chunk.offset as i64,
                    chunk.size as i64
                ],
            )?;
        }
        Ok(writer.finish()?)
    }
}
