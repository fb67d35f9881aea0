//! `frostcat` command-line tool

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use frostcat_index::catalog::BundleSort;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "frostcat",
    about = "Index and query Frostbite game archives",
    version,
    author,
    long_about = "Scans a Frostbite game installation (TOC, superbundle and CAS files) into a SQLite catalog and answers asset lookups by hash, path or resource type."
)]
struct Cli {
    /// Catalog database
    #[arg(
        long,
        env = "FROSTCAT_DB",
        global = true,
        default_value = "database.sqlite"
    )]
    db: PathBuf,

    /// Scan configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// How query results are printed
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per row
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortKey {
    Id,
    FrostId,
    TocPath,
    Size,
}

impl From<SortKey> for BundleSort {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Id => Self::Id,
            SortKey::FrostId => Self::FrostId,
            SortKey::TocPath => Self::TocPath,
            SortKey::Size => Self::Size,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the catalog if it does not exist
    Init {
        /// Drop every table of an existing catalog
        #[arg(long)]
        force: bool,
    },

    /// Rebuild the catalog from a game installation
    Scan {
        /// Game root; defaults to the configured or previously scanned one
        #[arg(env = "FROSTCAT_GAME_PATH")]
        game_path: Option<PathBuf>,
    },

    /// Find EBX assets by content, base or delta SHA1
    EbxByHash {
        /// 40-character hex SHA1
        hash: String,
    },

    /// Find EBX assets by path (case-insensitive)
    EbxByPath {
        /// Asset path, e.g. `ui/hud/menu`
        path: String,
    },

    /// List resources of one type
    ResByType {
        /// Type tag as stored in the catalog, e.g. `A654495C`
        res_type: String,
    },

    /// List bundles with their TOC files
    Bundles {
        /// Sort order
        #[arg(long, value_enum, default_value = "frost-id")]
        sort: SortKey,
    },

    /// Show row counts and settings
    Stats,

    /// Write the decoded payload of an EBX asset to a file
    ExtractEbx {
        /// Asset path
        path: String,
        /// Output file
        output: PathBuf,
    },

    /// Wrap a file as a standalone container
    Wrap {
        /// Input file
        input: PathBuf,
        /// Output file
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = commands::Context {
        db: cli.db,
        config: cli.config,
        format: cli.format,
    };

    match cli.command {
        Commands::Init { force } => commands::init(&ctx, force),
        Commands::Scan { game_path } => commands::scan(&ctx, game_path),
        Commands::EbxByHash { hash } => commands::ebx_by_hash(&ctx, &hash),
        Commands::EbxByPath { path } => commands::ebx_by_path(&ctx, &path),
        Commands::ResByType { res_type } => commands::res_by_type(&ctx, &res_type),
        Commands::Bundles { sort } => commands::bundles(&ctx, sort.into()),
        Commands::Stats => commands::stats(&ctx),
        Commands::ExtractEbx { path, output } => commands::extract_ebx(&ctx, &path, &output),
        Commands::Wrap { input, output } => commands::wrap(&input, &output),
    }
}
