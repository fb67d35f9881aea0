//! File format decoders for Frostbite game archives
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::doc_markdown)] // Many Frostbite-specific terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::float_cmp)] // Binary format requirements
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
//! This crate reads the on-disk layout of Frostbite archives: the TOC files
//! that describe bundles and chunks, the SB superbundle payloads they point
//! into, and the CAT/CAS pair that stores content-addressed entries.
//!
//! # Supported Formats
//!
//! - **Codecs**: deflate blocks and the engine's LZ77-family block codec
//! - **CAS**: catalog line tables, CAS entry reading, standalone containers
//! - **TOC**: plain and XOR-obfuscated tables of contents
//! - **DbObject**: the self-describing tagged binary structure ("BJSON")
//! - **Bundles**: CAS manifests and binary superbundle bundles
//!
//! # Design Principles
//!
//! - **Byte buffers in, typed records out**: no database or directory walking
//! - **Scoped file access**: every file read opens, reads one range and closes
//! - **Errors at the smallest scope**: one malformed entry is one error, never
//!   a whole archive

#![warn(missing_docs)]

/// Bundle manifests: CAS BJSON bundles and binary superbundle bundles
pub mod bundle;

/// CAT line tables, CAS entry reading and the standalone container writer
pub mod cas;

/// Block codecs: deflate, the proprietary LZ variant and block streams
pub mod codec;

/// Self-describing tagged binary structures
pub mod dbobject;

/// Error types shared by every decoder
pub mod error;

/// Table-of-contents files
pub mod toc;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{FormatError, LzCorruption, Result};
