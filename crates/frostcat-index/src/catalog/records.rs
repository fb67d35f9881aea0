//! Typed catalog rows

use rusqlite::Row;
use serde::Serialize;

/// Which part of the installation a file belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Origin {
    /// Shipped with the base game
    #[default]
    BaseGame,
    /// Installed by an update (DLC)
    Update,
    /// Installed by a patch inside the update tree
    Patch,
}

impl Origin {
    /// Single-letter code stored in `type` and `filetype` columns
    pub const fn code(self) -> &'static str {
        match self {
            Self::BaseGame => "b",
            Self::Update => "u",
            Self::Patch => "p",
        }
    }

    /// Decode a stored code; anything unknown is base game
    pub fn from_code(code: &str) -> Self {
        match code {
            "u" => Self::Update,
            "p" => Self::Patch,
            _ => Self::BaseGame,
        }
    }

    /// Classify a path by its update and patch directory markers
    ///
    /// The path is lowercased and normalized to `/` separators. A path
    /// containing `/<update>/<patch>/` is a patch, one containing only
    /// `/<update>/` is an update.
    pub fn classify(path: &str, update_marker: &str, patch_marker: &str) -> Self {
        let mut normalized = path.replace('\\', "/").to_lowercase();
        if !normalized.starts_with('/') {
            normalized.insert(0, '/');
        }

        let update = format!("/{}/", update_marker.to_lowercase());
        let patch = format!("{update}{}/", patch_marker.to_lowercase());

        if normalized.contains(&patch) {
            Self::Patch
        } else if normalized.contains(&update) {
            Self::Update
        } else {
            Self::BaseGame
        }
    }

    /// Provenance flags for records produced from a file of this origin
    pub const fn provenance(self) -> Provenance {
        Provenance {
            is_basegame_file: matches!(self, Self::BaseGame),
            is_dlc: matches!(self, Self::Update),
            is_patch: matches!(self, Self::Patch),
        }
    }
}

/// Provenance flags; exactly one is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// From the base game
    pub is_basegame_file: bool,
    /// From an update
    pub is_dlc: bool,
    /// From a patch
    pub is_patch: bool,
}

/// Stored text of a boolean column
pub const fn bool_text(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Read a boolean column written by [`bool_text`]
pub fn parse_bool_text(text: &str) -> bool {
    text == "True"
}

fn bool_column(row: &Row<'_>, index: usize) -> rusqlite::Result<bool> {
    Ok(parse_bool_text(&row.get::<_, String>(index)?))
}

fn origin_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Origin> {
    Ok(Origin::from_code(&row.get::<_, String>(index)?))
}

fn unsigned_column(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    Ok(row.get::<_, i64>(index)? as u64)
}

/// A discovered `.sb` or `.toc` path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameFile {
    /// Absolute path
    pub path: String,
    /// Install origin
    pub origin: Origin,
}

/// A row of `tocfiles`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocFileRecord {
    /// Row id, assigned on insert
    pub id: i64,
    /// Absolute path
    pub path: String,
    /// Upper-hex MD5 of the file
    pub md5: String,
    /// Bundles are CAS manifests
    pub in_cas: bool,
    /// Install origin
    pub origin: Origin,
}

impl TocFileRecord {
    pub(crate) const COLUMNS: &'static str = "id, path, md5, incas, type";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            path: row.get(1)?,
            md5: row.get(2)?,
            in_cas: bool_column(row, 3)?,
            origin: origin_column(row, 4)?,
        })
    }
}

/// A row of `bundles`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleRecord {
    /// Row id
    pub id: i64,
    /// Owning TOC row
    pub toc_id: i64,
    /// Bundle path as listed by the TOC
    pub frost_id: String,
    /// Offset in the superbundle
    pub offset: u64,
    /// Size in the superbundle
    pub size: u64,
    /// Stored in the base game
    pub is_base: bool,
    /// Delta against the base game
    pub is_delta: bool,
}

/// A bundle joined with its TOC
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleWithToc {
    /// Bundle row
    pub bundle: BundleRecord,
    /// Path of the owning TOC
    pub toc_path: String,
    /// The TOC stores bundles in CAS files
    pub in_cas: bool,
    /// Origin of the owning TOC
    pub origin: Origin,
}

impl BundleWithToc {
    pub(crate) const COLUMNS: &'static str = "bundles.id, bundles.tocfile, bundles.frostid, \
         bundles.offset, bundles.size, bundles.base, bundles.delta, \
         tocfiles.path, tocfiles.incas, tocfiles.type";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            bundle: BundleRecord {
                id: row.get(0)?,
                toc_id: row.get(1)?,
                frost_id: row.get(2)?,
                offset: unsigned_column(row, 3)?,
                size: unsigned_column(row, 4)?,
                is_base: bool_column(row, 5)?,
                is_delta: bool_column(row, 6)?,
            },
            toc_path: row.get(7)?,
            in_cas: bool_column(row, 8)?,
            origin: origin_column(row, 9)?,
        })
    }

    /// Provenance flags derived from the TOC origin
    pub const fn provenance(&self) -> Provenance {
        self.origin.provenance()
    }
}

/// A row of `ebxlut`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EbxRecord {
    /// Row id; ignored on insert
    pub id: i64,
    /// Asset path
    pub path: String,
    /// Upper-hex content hash
    pub sha1: String,
    /// Upper-hex base hash, empty when absent
    pub base_sha1: String,
    /// Upper-hex delta hash, empty when absent
    pub delta_sha1: String,
    /// Patch type code
    pub cas_patch_type: i64,
    /// Upper-hex GUID, empty when unresolved
    pub guid: String,
    /// Path of the owning bundle
    pub bundle_path: String,
    /// Offset of the owning bundle
    pub offset: u64,
    /// Size of the owning bundle
    pub size: u64,
    /// Bundle stored in the base game
    pub is_base: bool,
    /// Bundle is a delta
    pub is_delta: bool,
    /// Path of the owning TOC
    pub toc_path: String,
    /// Payload lives in a CAS file
    pub in_cas: bool,
    /// Origin of the owning TOC
    pub origin: Origin,
}

impl EbxRecord {
    pub(crate) const COLUMNS: &'static str = "id, path, sha1, basesha1, deltasha1, casptype, guid, \
         bundlepath, offset, size, isbase, isdelta, tocpath, incas, filetype";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            path: row.get(1)?,
            sha1: row.get(2)?,
            base_sha1: row.get(3)?,
            delta_sha1: row.get(4)?,
            cas_patch_type: row.get(5)?,
            guid: row.get(6)?,
            bundle_path: row.get(7)?,
            offset: unsigned_column(row, 8)?,
            size: unsigned_column(row, 9)?,
            is_base: bool_column(row, 10)?,
            is_delta: bool_column(row, 11)?,
            toc_path: row.get(12)?,
            in_cas: bool_column(row, 13)?,
            origin: origin_column(row, 14)?,
        })
    }

    /// Provenance flags derived from the file type
    pub const fn provenance(&self) -> Provenance {
        self.origin.provenance()
    }
}

/// A row of `res`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResRecord {
    /// Resource path
    pub name: String,
    /// Upper-hex content hash
    pub sha1: String,
    /// Upper-hex type tag
    pub res_type: String,
    /// Owning bundle row
    pub bundle_id: i64,
}

impl ResRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            sha1: row.get(1)?,
            res_type: row.get(2)?,
            bundle_id: row.get(3)?,
        })
    }
}

/// A resource joined with its bundle and TOC
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResLocation {
    /// Resource row
    pub res: ResRecord,
    /// Owning bundle and TOC
    pub bundle: BundleWithToc,
}

impl ResLocation {
    pub(crate) fn columns() -> String {
        format!(
            "res.name, res.sha1, res.rtype, res.bundle, {}",
            BundleWithToc::COLUMNS
        )
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let res = ResRecord::from_row(row)?;
        let bundle = BundleWithToc {
            bundle: BundleRecord {
                id: row.get(4)?,
                toc_id: row.get(5)?,
                frost_id: row.get(6)?,
                offset: unsigned_column(row, 7)?,
                size: unsigned_column(row, 8)?,
                is_base: bool_column(row, 9)?,
                is_delta: bool_column(row, 10)?,
            },
            toc_path: row.get(11)?,
            in_cas: bool_column(row, 12)?,
            origin: origin_column(row, 13)?,
        };
        Ok(Self { res, bundle })
    }

    /// Provenance flags derived from the TOC origin
    pub const fn provenance(&self) -> Provenance {
        self.bundle.origin.provenance()
    }
}

/// A row of `chunks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkRecord {
    /// Upper-hex chunk id
    pub id: String,
    /// Upper-hex content hash
    pub sha1: String,
    /// Owning bundle row
    pub bundle_id: i64,
}

impl ChunkRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sha1: row.get(1)?,
            bundle_id: row.get(2)?,
        })
    }
}

/// A row of `globalchunks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalChunkRecord {
    /// Row id
    pub idx: i64,
    /// Owning TOC row
    pub toc_id: i64,
    /// Upper-hex chunk id
    pub id: String,
    /// Upper-hex content hash
    pub sha1: String,
    /// Offset in the superbundle
    pub offset: u64,
    /// Size in the superbundle
    pub size: u64,
}

impl GlobalChunkRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            idx: row.get(0)?,
            toc_id: row.get(1)?,
            id: row.get(2)?,
            sha1: row.get(3)?,
            offset: unsigned_column(row, 4)?,
            size: unsigned_column(row, 5)?,
        })
    }
}

/// Row counts of every entity table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    /// `sbfiles`
    pub sb_files: u64,
    /// `tocfiles`
    pub toc_files: u64,
    /// `bundles`
    pub bundles: u64,
    /// `ebxlut`
    pub ebx: u64,
    /// `res`
    pub res: u64,
    /// `chunks`
    pub chunks: u64,
    /// `globalchunks`
    pub global_chunks: u64,
}

impl CatalogStats {
    /// Whether every entity table is empty
    pub const fn is_empty(&self) -> bool {
        self.sb_files == 0
            && self.toc_files == 0
            && self.bundles == 0
            && self.ebx == 0
            && self.res == 0
            && self.chunks == 0
            && self.global_chunks == 0
    }
}
