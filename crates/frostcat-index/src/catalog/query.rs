use rusqlite::{OptionalExtension, Params, Row};

use super::Catalog;
use super::records::{
    BundleWithToc, CatalogStats, ChunkRecord, EbxRecord, GlobalChunkRecord, Origin, ResLocation,
    ResRecord, TocFileRecord,
};
use super::settings::{GAME_PATH_KEY, SettingsStore};
use crate::error::Result;
use crate::resolver::parse_sha1;
use frostcat_formats::bundle::{RES_TYPE_TEXTURE, res_type_hex};

/// Ordering of joined bundle listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BundleSort {
    /// Insertion order
    Id,
    /// Bundle path
    #[default]
    FrostId,
    /// Owning TOC path, then bundle path
    TocPath,
    /// Largest first
    Size,
}

impl BundleSort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::Id => "bundles.id",
            Self::FrostId => "bundles.frostid",
            Self::TocPath => "tocfiles.path, bundles.frostid",
            Self::Size => "bundles.size DESC",
        }
    }
}

/// Discovered file table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `sbfiles`
    Superbundle,
    /// `tocfiles`
    Toc,
}

/// Origins to include in a file listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginFilter {
    /// Include base game files
    pub base: bool,
    /// Include update files
    pub update: bool,
    /// Include patch files
    pub patch: bool,
}

impl OriginFilter {
    /// Every origin
    pub const ALL: Self = Self {
        base: true,
        update: true,
        patch: true,
    };

    /// Whether files of `origin` pass
    pub const fn accepts(self, origin: Origin) -> bool {
        match origin {
            Origin::BaseGame => self.base,
            Origin::Update => self.update,
            Origin::Patch => self.patch,
        }
    }
}

impl Default for OriginFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl Catalog {
    fn query_rows<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.connection().prepare(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn ebx_where(&self, condition: &str, params: impl Params) -> Result<Vec<EbxRecord>> {
        let sql = format!(
            "SELECT {} FROM ebxlut WHERE {condition} ORDER BY id",
            EbxRecord::COLUMNS
        );
        self.query_rows(&sql, params, EbxRecord::from_row)
    }

    fn bundles_where(
        &self,
        condition: &str,
        params: impl Params,
        sort: BundleSort,
    ) -> Result<Vec<BundleWithToc>> {
        let sql = format!(
            "SELECT {} FROM bundles JOIN tocfiles ON (bundles.tocfile = tocfiles.id) \
             WHERE {condition} ORDER BY {}",
            BundleWithToc::COLUMNS,
            sort.order_by()
        );
        self.query_rows(&sql, params, BundleWithToc::from_row)
    }

    fn res_where(&self, condition: &str, params: impl Params) -> Result<Vec<ResLocation>> {
        let sql = format!(
            "SELECT {} FROM res \
             JOIN bundles ON (res.bundle = bundles.id) \
             JOIN tocfiles ON (bundles.tocfile = tocfiles.id) \
             WHERE {condition} ORDER BY res.rowid",
            ResLocation::columns()
        );
        self.query_rows(&sql, params, ResLocation::from_row)
    }

    /// EBX rows whose content, base or delta hash is `hash`
    ///
    /// `hash` must be 40 hex characters; absent hashes are stored as empty
    /// strings and never match.
    pub fn query_by_hash(&self, hash: &str) -> Result<Vec<EbxRecord>> {
        let hash = hex::encode_upper(parse_sha1(hash)?);
        self.ebx_where("sha1 = ?1 OR basesha1 = ?1 OR deltasha1 = ?1", [hash])
    }

    /// EBX rows whose path is `path`, ignoring case
    pub fn query_by_path(&self, path: &str) -> Result<Vec<EbxRecord>> {
        self.ebx_where("lower(path) = ?1", [path.to_lowercase()])
    }

    /// Every EBX row
    pub fn ebx_all(&self) -> Result<Vec<EbxRecord>> {
        self.ebx_where("1", [])
    }

    /// Every bundle with its TOC
    pub fn query_bundles_joined_with_toc(&self, sort: BundleSort) -> Result<Vec<BundleWithToc>> {
        self.bundles_where("1", [], sort)
    }

    /// The bundle row `id`
    pub fn bundle_by_id(&self, id: i64) -> Result<Option<BundleWithToc>> {
        Ok(self
            .bundles_where("bundles.id = ?1", [id], BundleSort::Id)?
            .into_iter()
            .next())
    }

    /// Bundles whose path is `frost_id`, ignoring case
    pub fn bundles_by_frost_id(&self, frost_id: &str) -> Result<Vec<BundleWithToc>> {
        self.bundles_where(
            "lower(bundles.frostid) = ?1",
            [frost_id.to_lowercase()],
            BundleSort::Id,
        )
    }

    /// The TOC row `id`
    pub fn toc_by_id(&self, id: i64) -> Result<Option<TocFileRecord>> {
        let sql = format!("SELECT {} FROM tocfiles WHERE id = ?1", TocFileRecord::COLUMNS);
        Ok(self
            .connection()
            .query_row(&sql, [id], TocFileRecord::from_row)
            .optional()?)
    }

    /// Every TOC row
    pub fn tocs(&self) -> Result<Vec<TocFileRecord>> {
        let sql = format!("SELECT {} FROM tocfiles ORDER BY id", TocFileRecord::COLUMNS);
        self.query_rows(&sql, [], TocFileRecord::from_row)
    }

    /// Resources with content hash `sha1`
    pub fn res_by_sha1(&self, sha1: &str) -> Result<Vec<ResLocation>> {
        self.res_where("res.sha1 = ?1", [sha1.to_uppercase()])
    }

    /// Resources whose type tag is `res_type` (upper hex, as stored)
    pub fn res_by_type(&self, res_type: &str) -> Result<Vec<ResLocation>> {
        self.res_where("res.rtype = ?1", [res_type.to_uppercase()])
    }

    /// Distinct resource type tags
    pub fn used_res_types(&self) -> Result<Vec<String>> {
        self.query_rows(
            "SELECT DISTINCT rtype FROM res ORDER BY rtype",
            [],
            |row| row.get(0),
        )
    }

    /// Texture resources
    pub fn texture_records(&self) -> Result<Vec<ResRecord>> {
        self.query_rows(
            "SELECT name, sha1, rtype, bundle FROM res WHERE rtype = ?1 ORDER BY rowid",
            [res_type_hex(RES_TYPE_TEXTURE)],
            ResRecord::from_row,
        )
    }

    /// Texture resources named `name`, ignoring case
    pub fn textures_by_name(&self, name: &str) -> Result<Vec<ResRecord>> {
        self.query_rows(
            "SELECT name, sha1, rtype, bundle FROM res \
             WHERE rtype = ?1 AND lower(name) = ?2 ORDER BY rowid",
            [res_type_hex(RES_TYPE_TEXTURE), name.to_lowercase()],
            ResRecord::from_row,
        )
    }

    /// First chunk row with id `id`
    pub fn chunk_by_id(&self, id: &[u8; 16]) -> Result<Option<ChunkRecord>> {
        Ok(self
            .connection()
            .query_row(
                "SELECT id, sha1, bundle FROM chunks WHERE id = ?1 ORDER BY rowid LIMIT 1",
                [hex::encode_upper(id)],
                ChunkRecord::from_row,
            )
            .optional()?)
    }

    /// Chunk rows with content hash `sha1`
    pub fn chunks_by_sha1(&self, sha1: &str) -> Result<Vec<ChunkRecord>> {
        self.query_rows(
            "SELECT id, sha1, bundle FROM chunks WHERE sha1 = ?1 ORDER BY rowid",
            [sha1.to_uppercase()],
            ChunkRecord::from_row,
        )
    }

    /// Chunks declared directly by TOC row `toc_id`
    pub fn global_chunks_for_toc(&self, toc_id: i64) -> Result<Vec<GlobalChunkRecord>> {
        self.query_rows(
            "SELECT idx, tocfile, id, sha1, offset, size FROM globalchunks \
             WHERE tocfile = ?1 ORDER BY idx",
            [toc_id],
            GlobalChunkRecord::from_row,
        )
    }

    /// Discovered file paths of `kind` passing `filter`, relative to the
    /// stored game path
    pub fn game_files(&self, kind: FileKind, filter: OriginFilter) -> Result<Vec<String>> {
        let sql = match kind {
            FileKind::Superbundle => "SELECT path, type FROM sbfiles ORDER BY id",
            FileKind::Toc => "SELECT path, type FROM tocfiles ORDER BY id",
        };
        let rows: Vec<(String, String)> =
            self.query_rows(sql, [], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let base = self.setting(GAME_PATH_KEY)?;

        Ok(rows
            .into_iter()
            .filter(|(_, code)| filter.accepts(Origin::from_code(code)))
            .map(|(path, _)| match path.strip_prefix(base.as_str()) {
                Some(relative) if !base.is_empty() => relative.to_string(),
                _ => path,
            })
            .collect())
    }

    /// Row counts of every entity table
    pub fn row_counts(&self) -> Result<CatalogStats> {
        let count = |table: &str| -> Result<u64> {
            let n: i64 = self.connection().query_row(
                &format!("SELECT COUNT(*) FROM {table}"),
                [],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        };
        Ok(CatalogStats {
            sb_files: count("sbfiles")?,
            toc_files: count("tocfiles")?,
            bundles: count("bundles")?,
            ebx: count("ebxlut")?,
            res: count("res")?,
            chunks: count("chunks")?,
            global_chunks: count("globalchunks")?,
        })
    }
}
