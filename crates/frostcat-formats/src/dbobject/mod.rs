//! DbObject ("BJSON") tagged binary structures
//!
//! Every entry starts with a header byte. The low five bits hold the value
//! type; when bit 7 is clear a NUL-terminated name follows the header.
//! Lists and objects carry a LEB128 byte size and end with a zero byte.
//!
//! TOC files and CAS bundle manifests are both DbObject trees. The writer
//! produces the same encoding and is used to build test fixtures.

mod reader;
mod value;
mod writer;

pub use reader::{DbReader, read_entries, read_object};
pub use value::{DbObject, DbValue};
pub use writer::{write_entry, write_object};

/// Type codes found in the low five bits of an entry header
pub mod type_code {
    /// End of a list or object
    pub const END: u8 = 0x00;
    /// Unnamed values
    pub const LIST: u8 = 0x01;
    /// Named values
    pub const OBJECT: u8 = 0x02;
    /// Single byte, non-zero is true
    pub const BOOL: u8 = 0x06;
    /// LEB128 length (including the NUL) then UTF-8 bytes
    pub const STRING: u8 = 0x07;
    /// Little-endian i32
    pub const INT: u8 = 0x08;
    /// Little-endian i64
    pub const LONG: u8 = 0x09;
    /// Little-endian f32
    pub const FLOAT: u8 = 0x0B;
    /// Little-endian f64
    pub const DOUBLE: u8 = 0x0C;
    /// 16 raw bytes
    pub const GUID: u8 = 0x0F;
    /// 20 raw bytes
    pub const SHA1: u8 = 0x10;
    /// LEB128 length then raw bytes
    pub const BLOB: u8 = 0x13;

    /// Header flag: entry has no name
    pub const NAMELESS: u8 = 0x80;
    /// Header bits holding the type
    pub const TYPE_MASK: u8 = 0x1F;
}
