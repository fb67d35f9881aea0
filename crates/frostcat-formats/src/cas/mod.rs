//! Content-addressed storage
//!
//! A `cas.cat` catalog maps SHA1 hashes to `(offset, size)` ranges inside
//! numbered `cas_NN.cas` payload files. Every entry in a CAS file is preceded
//! by a 0x20-byte little-endian header and stored as a block stream.

mod cat;
mod container;
mod entry;

pub use cat::{CAT_LINE_SIZE, CAT_MAGIC, CatFile, CatLine};
pub use container::{CONTAINER_MAGIC, encode_stored_blocks, unwrap_container, wrap_as_container};
pub use entry::{CAS_ENTRY_HEADER_SIZE, CasEntry, CasEntryHeader, CasFile};
