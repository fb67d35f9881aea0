//! Subcommand handlers

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use frostcat_formats::bundle::{parse_res_type_hex, res_type_extension};
use frostcat_formats::cas::wrap_as_container;
use frostcat_index::catalog::{BundleSort, EbxRecord, GAME_PATH_KEY};
use frostcat_index::{
    AssetResolver, Catalog, ScanConfig, ScanState, Scanner, SettingsStore, TracingSink,
};
use serde::Serialize;
use tracing::info;

use crate::OutputFormat;

/// Options shared by every subcommand
pub struct Context {
    pub db: PathBuf,
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
}

impl Context {
    fn catalog(&self) -> anyhow::Result<Catalog> {
        Catalog::open(&self.db).with_context(|| format!("opening {}", self.db.display()))
    }

    /// Scan settings: the config file when given, with the game root taken
    /// from `game_path`, the config file or the last scan, in that order
    fn scan_config(
        &self,
        catalog: &Catalog,
        game_path: Option<PathBuf>,
    ) -> anyhow::Result<ScanConfig> {
        let mut config = match &self.config {
            Some(path) => ScanConfig::load(path)?,
            None => ScanConfig::default(),
        };

        if let Some(path) = game_path {
            config.game_path = path;
        } else if config.game_path.as_os_str().is_empty() {
            config.game_path = PathBuf::from(catalog.setting(GAME_PATH_KEY)?);
        }

        if config.game_path.as_os_str().is_empty() {
            bail!("no game path: pass one, set FROSTCAT_GAME_PATH or add game_path to the config");
        }
        Ok(config)
    }

    fn print<T: Serialize>(&self, rows: &[T], line: impl Fn(&T) -> String) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
            OutputFormat::Text => {
                for row in rows {
                    println!("{}", line(row));
                }
            }
        }
        Ok(())
    }
}

fn ebx_line(row: &EbxRecord) -> String {
    format!(
        "{} sha1={} guid={} bundle={} type={} toc={}",
        row.path,
        row.sha1,
        row.guid,
        row.bundle_path,
        row.origin.code(),
        row.toc_path
    )
}

pub fn init(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let mut catalog = ctx.catalog()?;
    if force {
        catalog.rebuild()?;
    }
    info!(
        "catalog {} ready, needs scan: {}",
        ctx.db.display(),
        catalog.needs_scan()?
    );
    Ok(())
}

pub fn scan(ctx: &Context, game_path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut catalog = ctx.catalog()?;
    let config = ctx.scan_config(&catalog, game_path)?;
    let mut sink = TracingSink;

    let report = Scanner::new(&mut catalog, config, &mut sink).run();
    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => println!(
            "{:?}: {} bundles, {} ebx, {} res, {} chunks, {} global chunks, {} skipped",
            report.state,
            report.bundles,
            report.ebx_rows,
            report.res_rows,
            report.chunk_rows,
            report.global_chunk_rows,
            report.skipped.len()
        ),
    }

    if report.state == ScanState::Failed {
        bail!(
            "scan failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

pub fn ebx_by_hash(ctx: &Context, hash: &str) -> anyhow::Result<()> {
    let rows = ctx.catalog()?.query_by_hash(hash)?;
    ctx.print(&rows, ebx_line)
}

pub fn ebx_by_path(ctx: &Context, path: &str) -> anyhow::Result<()> {
    let rows = ctx.catalog()?.query_by_path(path)?;
    ctx.print(&rows, ebx_line)
}

pub fn res_by_type(ctx: &Context, res_type: &str) -> anyhow::Result<()> {
    let extension = parse_res_type_hex(res_type).and_then(res_type_extension);
    let rows = ctx.catalog()?.res_by_type(res_type)?;
    ctx.print(&rows, |row| {
        format!(
            "{}{} sha1={} bundle={}",
            row.res.name,
            extension.unwrap_or(""),
            row.res.sha1,
            row.bundle.bundle.frost_id
        )
    })
}

pub fn bundles(ctx: &Context, sort: BundleSort) -> anyhow::Result<()> {
    let rows = ctx.catalog()?.query_bundles_joined_with_toc(sort)?;
    ctx.print(&rows, |row| {
        format!(
            "{} offset={:#x} size={:#x} type={} toc={}",
            row.bundle.frost_id,
            row.bundle.offset,
            row.bundle.size,
            row.origin.code(),
            row.toc_path
        )
    })
}

pub fn stats(ctx: &Context) -> anyhow::Result<()> {
    let catalog = ctx.catalog()?;
    let counts = catalog.row_counts()?;
    let settings = catalog.settings()?;

    match ctx.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "counts": counts,
                "settings": settings,
            }))?
        ),
        OutputFormat::Text => {
            println!("sbfiles      {}", counts.sb_files);
            println!("tocfiles     {}", counts.toc_files);
            println!("bundles      {}", counts.bundles);
            println!("ebxlut       {}", counts.ebx);
            println!("res          {}", counts.res);
            println!("chunks       {}", counts.chunks);
            println!("globalchunks {}", counts.global_chunks);
            for (key, value) in &settings {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}

pub fn extract_ebx(ctx: &Context, path: &str, output: &Path) -> anyhow::Result<()> {
    let catalog = ctx.catalog()?;
    // Rows are inserted base game first, so the last one is the newest copy.
    let Some(record) = catalog.query_by_path(path)?.pop() else {
        bail!("no EBX asset named {path}");
    };

    let config = ctx.scan_config(&catalog, None)?;
    let mut resolver = AssetResolver::from_config(&config)?;
    let bytes = resolver.ebx_bytes(&record)?;
    std::fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;

    info!("{path}: {} bytes to {}", bytes.len(), output.display());
    Ok(())
}

pub fn wrap(input: &Path, output: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let wrapped = wrap_as_container(&data);
    std::fs::write(output, &wrapped).with_context(|| format!("writing {}", output.display()))?;

    info!(
        "wrapped {} bytes into {} ({} bytes)",
        data.len(),
        output.display(),
        wrapped.len()
    );
    Ok(())
}
