//! Fixture builders shared by unit tests

#![allow(clippy::unwrap_used)]

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::codec::{BlockHeader, DEFLATE_TAG, LZ_TAG};

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn stored_block(data: &[u8]) -> Vec<u8> {
    let len = u16::try_from(data.len()).unwrap();
    let mut out = BlockHeader::stored(len).to_bytes().to_vec();
    out.extend_from_slice(data);
    out
}

pub fn deflate_block(data: &[u8]) -> Vec<u8> {
    let packed = zlib(data);
    let header = BlockHeader::new(
        u32::try_from(data.len()).unwrap(),
        DEFLATE_TAG,
        u16::try_from(packed.len()).unwrap(),
    );
    let mut out = header.to_bytes().to_vec();
    out.extend(packed);
    out
}

pub fn lz_block(body: &[u8], decompressed_size: u32) -> Vec<u8> {
    let header = BlockHeader::new(decompressed_size, LZ_TAG, u16::try_from(body.len()).unwrap());
    let mut out = header.to_bytes().to_vec();
    out.extend_from_slice(body);
    out
}

pub use crate::dbobject::write_object as encode_root;

/// Builds binary bundles; hashes are `[n; 20]` numbered from 1 in table order
#[derive(Default)]
pub struct BinaryBundleFixture {
    ebx: Vec<(String, Vec<u8>, u32)>,
    res: Vec<(String, u32, u32)>,
    chunks: Vec<([u8; 16], u32)>,
}

impl BinaryBundleFixture {
    pub fn ebx(mut self, name: &str, encoded: Vec<u8>, original_size: u32) -> Self {
        self.ebx.push((name.to_owned(), encoded, original_size));
        self
    }

    pub fn res(mut self, name: &str, res_type: u32, original_size: u32) -> Self {
        self.res.push((name.to_owned(), res_type, original_size));
        self
    }

    pub fn chunk(mut self, id: [u8; 16], logical_size: u32) -> Self {
        self.chunks.push((id, logical_size));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let total = self.ebx.len() + self.res.len() + self.chunks.len();
        let be = |v: usize| u32::try_from(v).unwrap().to_be_bytes();

        let mut strings = Vec::new();
        let mut name_offset = |name: &str| {
            let offset = strings.len();
            strings.extend_from_slice(name.as_bytes());
            strings.push(0);
            offset
        };

        let mut tables = Vec::new();
        for n in 1..=total {
            tables.extend_from_slice(&[n as u8; 20]);
        }
        for (name, _, original_size) in &self.ebx {
            tables.extend_from_slice(&be(name_offset(name)));
            tables.extend_from_slice(&original_size.to_be_bytes());
        }
        for (name, _, original_size) in &self.res {
            tables.extend_from_slice(&be(name_offset(name)));
            tables.extend_from_slice(&original_size.to_be_bytes());
        }
        for (_, res_type, _) in &self.res {
            tables.extend_from_slice(&res_type.to_be_bytes());
        }
        tables.extend(std::iter::repeat_n(0u8, self.res.len() * (16 + 8)));
        for (id, logical_size) in &self.chunks {
            tables.extend_from_slice(id);
            tables.extend_from_slice(&0u32.to_be_bytes());
            tables.extend_from_slice(&logical_size.to_be_bytes());
        }

        // Offsets are relative to byte 4; the header after it is 0x20 bytes.
        let strings_offset = 0x20 + tables.len();
        let meta_offset = strings_offset + strings.len();

        let mut out = Vec::new();
        out.extend_from_slice(&be(meta_offset));
        out.extend_from_slice(&[0x9D, 0x79, 0x8E, 0xD5]);
        out.extend_from_slice(&be(total));
        out.extend_from_slice(&be(self.ebx.len()));
        out.extend_from_slice(&be(self.res.len()));
        out.extend_from_slice(&be(self.chunks.len()));
        out.extend_from_slice(&be(strings_offset));
        out.extend_from_slice(&be(meta_offset));
        out.extend_from_slice(&be(0));
        out.extend(tables);
        out.extend(strings);
        for (_, encoded, _) in &self.ebx {
            out.extend_from_slice(encoded);
        }
        out
    }
}
