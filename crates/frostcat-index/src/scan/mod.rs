//! Full catalog rebuild
//!
//! A scan walks the game root, records every `.sb` and `.toc` file, then
//! decodes each TOC's bundles and persists their EBX, RES and chunk entries.
//!
//! ```text
//! Idle -> EnumeratingFiles -> ParsingTocs -> Done
//!                                         -> Failed     (catalog write or walk error)
//!                                         -> Cancelled  (flag set between TOC files)
//! ```
//!
//! Malformed or dangling entries are skipped and reported; they never fail
//! the scan. A TOC that cannot be parsed still gets its `tocfiles` row, and
//! EBX assets whose inline payload is unreadable are indexed without a GUID. Batches committed before a failure stay in the catalog, so any
//! terminal state other than `Done` means the catalog must be rebuilt before
//! it is trusted.

pub mod enumerate;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use frostcat_formats::bundle::{BundleFormat, DecodedBundle, EbxEntry};
use frostcat_formats::toc::{BundleInfo, TocFile};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cache::BundleKey;
use crate::catalog::{
    Catalog, ChunkRecord, EbxRecord, GAME_PATH_KEY, GameFile, IS_NEW_KEY, ResRecord,
    SettingsStore, TocFileRecord, hex_or_empty,
};
use crate::config::ScanConfig;
use crate::error::{IndexError, Result};
use crate::progress::{ProgressSink, format_duration};
use crate::resolver::AssetResolver;

use enumerate::enumerate_game_files;

/// Where a scan is, or where it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ScanState {
    /// Not started
    #[default]
    Idle,
    /// Walking the game root
    EnumeratingFiles,
    /// Decoding TOC files
    ParsingTocs,
    /// Every TOC was processed
    Done,
    /// A catalog write or directory walk failed
    Failed,
    /// Stopped by the cancellation flag
    Cancelled,
}

/// An entry that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    /// File being processed
    pub file: String,
    /// Bundle id, empty for whole-file failures
    pub entry: String,
    /// Error message
    pub reason: String,
}

/// Outcome of a scan
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Terminal state
    pub state: ScanState,
    /// `.sb` files recorded
    pub sb_files: usize,
    /// `.toc` files recorded
    pub toc_files: usize,
    /// TOC files whose bundles were processed
    pub tocs_parsed: usize,
    /// Bundle rows
    pub bundles: usize,
    /// EBX rows
    pub ebx_rows: usize,
    /// RES rows
    pub res_rows: usize,
    /// Chunk rows
    pub chunk_rows: usize,
    /// Global chunk rows
    pub global_chunk_rows: usize,
    /// EBX rows stored without a GUID
    pub unresolved_guids: usize,
    /// Skipped files and bundles
    pub skipped: Vec<SkippedEntry>,
    /// Wall time
    pub elapsed: Duration,
    /// Message of the fatal error, when `state` is `Failed`
    pub error: Option<String>,
}

/// A registered TOC file, with its parsed contents when it could be parsed
struct RegisteredToc {
    record: TocFileRecord,
    parsed: Option<TocFile>,
}

/// Per-session state: the asset resolver (CAS index and bundle cache) and
/// the running report
struct ScanContext {
    resolver: AssetResolver,
    report: ScanReport,
}

/// Drives a full catalog rebuild
pub struct Scanner<'a> {
    catalog: &'a mut Catalog,
    config: ScanConfig,
    sink: &'a mut dyn ProgressSink,
    cancel: Option<Arc<AtomicBool>>,
    state: ScanState,
}

impl<'a> Scanner<'a> {
    /// Create a scanner writing into `catalog` and reporting to `sink`
    pub fn new(
        catalog: &'a mut Catalog,
        config: ScanConfig,
        sink: &'a mut dyn ProgressSink,
    ) -> Self {
        Self {
            catalog,
            config,
            sink,
            cancel: None,
            state: ScanState::Idle,
        }
    }

    /// Stop between TOC files once `flag` is set
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Current state
    pub const fn state(&self) -> ScanState {
        self.state
    }

    fn enter(&mut self, state: ScanState) {
        debug!("scan state {:?} -> {state:?}", self.state);
        self.state = state;
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Rebuild the catalog from the configured game root
    ///
    /// Never panics on archive errors; the returned report carries the
    /// terminal state.
    pub fn run(mut self) -> ScanReport {
        let start = Instant::now();
        self.sink.line("Starting Scan...");

        let mut report = ScanReport::default();
        let outcome = self.scan(&mut report);
        report.elapsed = start.elapsed();
        let time = format_duration(report.elapsed);

        match outcome {
            Ok(state) => {
                self.enter(state);
                self.sink.line("===============");
                self.sink.line(&format!("Time : {time}"));
            }
            Err(err) => {
                self.enter(ScanState::Failed);
                error!("scan failed: {err}");
                self.sink.line("====ERROR======");
                self.sink.line(&format!("Time : {time}"));
                self.sink.line(&err.to_string());
                report.error = Some(err.to_string());
            }
        }

        report.state = self.state;
        info!(
            "scan {:?}: {} bundles, {} ebx, {} res, {} chunks, {} skipped in {time}",
            report.state,
            report.bundles,
            report.ebx_rows,
            report.res_rows,
            report.chunk_rows,
            report.skipped.len()
        );
        report
    }

    fn scan(&mut self, report: &mut ScanReport) -> Result<ScanState> {
        self.config.validate()?;
        self.catalog.rebuild()?;
        self.catalog.assign_setting(IS_NEW_KEY, "0")?;
        let game_path = self.config.game_path.to_string_lossy().into_owned();
        self.catalog.assign_setting(GAME_PATH_KEY, &game_path)?;

        self.enter(ScanState::EnumeratingFiles);
        self.sink.line("Saving file paths into db...");
        let files = enumerate_game_files(&self.config)?;

        self.sink.line("SB files...");
        report.sb_files = self.catalog.insert_sb_files(&files.superbundles)?;

        self.sink.line("TOC files...");
        let tocs = self.register_tocs(&files.tocs, report)?;
        report.toc_files = tocs.len();

        self.enter(ScanState::ParsingTocs);
        self.sink.line("Saving bundles into db...");
        let mut ctx = ScanContext {
            resolver: AssetResolver::from_config(&self.config)?,
            report: std::mem::take(report),
        };

        let start = Instant::now();
        let mut outcome = Ok(ScanState::Done);
        for (n, toc) in tocs.iter().enumerate() {
            if self.cancelled() {
                self.sink.line("Scan cancelled");
                outcome = Ok(ScanState::Cancelled);
                break;
            }
            if let Some(parsed) = &toc.parsed
                && let Err(err) = self.scan_toc(&toc.record, parsed, &mut ctx)
            {
                outcome = Err(err);
                break;
            }
            self.sink.progress(n + 1, tocs.len(), start.elapsed());
        }

        *report = ctx.report;
        outcome
    }

    fn skip(&mut self, report: &mut ScanReport, file: &str, entry: &str, err: &IndexError) {
        warn!("skipping {file} {entry}: {err}");
        self.sink.line(&format!(" skipped {file} {entry}: {err}"));
        report.skipped.push(SkippedEntry {
            file: file.to_string(),
            entry: entry.to_string(),
            reason: err.to_string(),
        });
    }

    /// Hash, parse and record every TOC file
    ///
    /// Each file is read once. A TOC that fails to parse is recorded as
    /// non-CAS and reported; an unreadable one is only reported.
    fn register_tocs(
        &mut self,
        files: &[GameFile],
        report: &mut ScanReport,
    ) -> Result<Vec<RegisteredToc>> {
        let mut tocs = Vec::with_capacity(files.len());
        for file in files {
            let data = match std::fs::read(&file.path) {
                Ok(data) => data,
                Err(err) => {
                    self.skip(report, &file.path, "", &err.into());
                    continue;
                }
            };

            let parsed = match TocFile::from_bytes(Path::new(&file.path), &data) {
                Ok(toc) => Some(toc),
                Err(err) => {
                    self.skip(report, &file.path, "", &err.into());
                    None
                }
            };
            tocs.push(RegisteredToc {
                record: toc_record(file, &data, parsed.as_ref()),
                parsed,
            });
        }

        let records: Vec<TocFileRecord> = tocs.iter().map(|toc| toc.record.clone()).collect();
        let ids = self.catalog.insert_toc_files(&records)?;
        for (toc, id) in tocs.iter_mut().zip(ids) {
            toc.record.id = id;
        }
        Ok(tocs)
    }

    fn scan_toc(
        &mut self,
        record: &TocFileRecord,
        toc: &TocFile,
        ctx: &mut ScanContext,
    ) -> Result<()> {
        self.sink.line(&format!("Opening {} ...", record.path));
        ctx.report.tocs_parsed += 1;

        let total = toc.bundles.len();
        for (n, info) in toc.bundles.iter().enumerate() {
            match self.scan_bundle(record, toc, info, ctx) {
                Ok(()) => debug!(" adding bundle: {}/{total} {}", n + 1, describe_bundle(info)),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => self.skip(&mut ctx.report, &record.path, &info.id, &err),
            }
        }

        ctx.report.global_chunk_rows += self.catalog.insert_global_chunks(
            record.id,
            &toc.chunks,
            self.config.global_chunk_batch_size,
        )?;
        Ok(())
    }

    fn scan_bundle(
        &mut self,
        record: &TocFileRecord,
        toc: &TocFile,
        info: &BundleInfo,
        ctx: &mut ScanContext,
    ) -> Result<()> {
        let data = toc.read_bundle(info)?;
        let bundle = Arc::new(DecodedBundle::decode(&data, toc.uses_cas, &info.id)?);
        debug!(
            " EBX:{} RES:{} CHUNK:{}",
            bundle.ebx.len(),
            bundle.res.len(),
            bundle.chunks.len()
        );

        let bundle_id = self.catalog.insert_bundle(record.id, info)?;
        ctx.report.bundles += 1;

        if !toc.uses_cas {
            ctx.resolver.cache_mut().insert(
                BundleKey::new(&record.path, bundle.path.clone()),
                Arc::clone(&bundle),
            );
        }

        let mut ebx_rows = Vec::with_capacity(bundle.ebx.len());
        for entry in bundle.ebx.iter().filter(|entry| entry.is_indexable()) {
            let mut row = ebx_record(record, info, &bundle, entry);
            let guid = if bundle.format == BundleFormat::Binary && entry.payload.is_none() {
                Err(IndexError::NotFound(format!(
                    "inline payload of {} is unreadable",
                    row.path
                )))
            } else {
                ctx.resolver.ebx_guid(&row)
            };
            match guid {
                Ok(guid) => row.guid = guid,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!("no GUID for {}: {err}", row.path);
                    ctx.report.unresolved_guids += 1;
                }
            }
            ebx_rows.push(row);
        }
        ctx.report.ebx_rows += self
            .catalog
            .insert_ebx(&ebx_rows, self.config.ebx_batch_size)?;

        let res_rows: Vec<ResRecord> = bundle
            .res
            .iter()
            .filter_map(|res| {
                Some(ResRecord {
                    name: res.name.clone()?,
                    sha1: hex_or_empty(res.sha1),
                    res_type: res.res_type_hex(),
                    bundle_id,
                })
            })
            .collect();
        ctx.report.res_rows += self.catalog.insert_res(&res_rows)?;

        let chunk_rows: Vec<ChunkRecord> = bundle
            .chunks
            .iter()
            .map(|chunk| ChunkRecord {
                id: hex_or_empty(chunk.id),
                sha1: hex_or_empty(chunk.sha1),
                bundle_id,
            })
            .collect();
        ctx.report.chunk_rows += self.catalog.insert_chunks(&chunk_rows)?;
        Ok(())
    }
}

/// `tocfiles` row for a TOC file read as `data`
fn toc_record(file: &GameFile, data: &[u8], parsed: Option<&TocFile>) -> TocFileRecord {
    TocFileRecord {
        id: 0,
        path: file.path.clone(),
        md5: hex::encode_upper(md5::compute(data).0),
        in_cas: parsed.is_some_and(|toc| toc.uses_cas),
        origin: file.origin,
    }
}

fn describe_bundle(info: &BundleInfo) -> String {
    let mut text = String::new();
    if info.is_base {
        text.push_str("ISBASEG ");
    }
    if info.is_delta {
        text.push_str("ISDELTA ");
    }
    text.push_str("ID: ");
    text.push_str(&info.id);
    text
}

fn ebx_record(
    toc: &TocFileRecord,
    info: &BundleInfo,
    bundle: &DecodedBundle,
    entry: &EbxEntry,
) -> EbxRecord {
    EbxRecord {
        id: 0,
        path: entry.name.clone().unwrap_or_default(),
        sha1: hex_or_empty(entry.sha1),
        base_sha1: hex_or_empty(entry.base_sha1),
        delta_sha1: hex_or_empty(entry.delta_sha1),
        cas_patch_type: entry.cas_patch_type,
        guid: String::new(),
        bundle_path: bundle.path.clone(),
        offset: info.offset,
        size: info.size,
        is_base: info.is_base,
        is_delta: info.is_delta,
        toc_path: toc.path.clone(),
        in_cas: toc.in_cas,
        origin: toc.origin,
    }
}
