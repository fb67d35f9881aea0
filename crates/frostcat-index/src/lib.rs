//! Content-addressable index for Frostbite game archives
//!
#![allow(clippy::cast_possible_truncation)] // Catalog stores sizes as SQLite integers
#![allow(clippy::cast_possible_wrap)] // Same
#![allow(clippy::cast_precision_loss)] // Progress statistics
#![allow(clippy::doc_markdown)] // Frostbite-specific terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::missing_const_for_fn)] // API stability
//! This crate walks a game installation, decodes every TOC and bundle with
//! `frostcat-formats`, and persists what it finds in a SQLite catalog so
//! assets can be looked up by hash, path or type without rescanning.
//!
//! # Components
//!
//! - [`Catalog`]: the SQLite store and its queries
//! - [`BundleCache`]: bounded FIFO of decoded bundles
//! - [`CasStore`]: SHA1 to CAS entry lookup across every `cas.cat`
//! - [`AssetResolver`]: "give me the bytes for asset X"
//! - [`Scanner`]: the full rebuild driving all of the above
//!
//! # Example
//!
//! ```no_run
//! use frostcat_index::{Catalog, ScanConfig, Scanner, TracingSink};
//!
//! # fn main() -> frostcat_index::Result<()> {
//! let mut catalog = Catalog::open("database.sqlite")?;
//! let config = ScanConfig::new("C:/Games/Dragon Age Inquisition");
//! let mut sink = TracingSink;
//!
//! let report = Scanner::new(&mut catalog, config, &mut sink).run();
//! println!("{:?}: {} EBX rows", report.state, report.ebx_rows);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod cas_store;
pub mod catalog;
pub mod config;
pub mod error;
pub mod progress;
pub mod resolver;
pub mod scan;

pub use cache::{BundleCache, BundleKey, DEFAULT_BUNDLE_CACHE_CAPACITY};
pub use cas_store::CasStore;
pub use catalog::{Catalog, SettingsStore};
pub use config::{CatalogConfig, HashPolicy, ScanConfig};
pub use error::{IndexError, Result};
pub use progress::{MemorySink, ProgressSink, TracingSink};
pub use resolver::AssetResolver;
pub use scan::{ScanReport, ScanState, Scanner};
