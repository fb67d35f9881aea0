//! On-disk game layouts for scanner tests

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use frostcat_formats::bundle::EBX_GUID_OFFSET;
use frostcat_formats::cas::{
    CAS_ENTRY_HEADER_SIZE, CAT_MAGIC, CasEntryHeader, encode_stored_blocks, wrap_as_container,
};
use frostcat_formats::dbobject::{DbObject, DbValue, write_object};
use tempfile::TempDir;

/// EBX payload with `guid` at the GUID offset
pub fn ebx_payload(guid: [u8; 16], len: usize) -> Vec<u8> {
    let mut payload = vec![0u8; len.max(EBX_GUID_OFFSET + 16)];
    payload[EBX_GUID_OFFSET..EBX_GUID_OFFSET + 16].copy_from_slice(&guid);
    payload
}

fn list(objects: Vec<DbObject>) -> DbValue {
    DbValue::List(objects.into_iter().map(DbValue::Object).collect())
}

/// One bundle as listed by a TOC
pub struct TocBundle {
    pub id: String,
    pub data: Vec<u8>,
    pub delta: bool,
    /// Point the bundle past the end of the superbundle
    pub dangling: bool,
}

impl TocBundle {
    pub fn new(id: &str, data: Vec<u8>) -> Self {
        Self {
            id: id.to_string(),
            data,
            delta: false,
            dangling: false,
        }
    }

    pub fn delta(mut self) -> Self {
        self.delta = true;
        self
    }

    pub fn dangling(mut self) -> Self {
        self.dangling = true;
        self
    }
}

/// CAS bundle manifest builder
#[derive(Default)]
pub struct Manifest {
    path: Option<String>,
    ebx: Vec<DbObject>,
    res: Vec<DbObject>,
    chunks: Vec<DbObject>,
}

impl Manifest {
    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn ebx(mut self, name: &str, sha1: [u8; 20]) -> Self {
        self.ebx.push(
            DbObject::new()
                .with("name", DbValue::String(name.into()))
                .with("sha1", DbValue::Sha1(sha1))
                .with("size", DbValue::Long(0x40))
                .with("originalSize", DbValue::Long(0x40)),
        );
        self
    }

    /// An EBX entry without an original size, which is not indexed
    pub fn incomplete_ebx(mut self, name: &str) -> Self {
        self.ebx.push(
            DbObject::new()
                .with("name", DbValue::String(name.into()))
                .with("size", DbValue::Long(0x40)),
        );
        self
    }

    pub fn res(mut self, name: Option<&str>, sha1: [u8; 20], res_type: u32) -> Self {
        let mut object = DbObject::new();
        if let Some(name) = name {
            object.push("name", DbValue::String(name.into()));
        }
        object.push("sha1", DbValue::Sha1(sha1));
        object.push("resType", DbValue::Int(res_type as i32));
        self.res.push(object);
        self
    }

    pub fn chunk(mut self, id: [u8; 16], sha1: [u8; 20]) -> Self {
        self.chunks.push(
            DbObject::new()
                .with("id", DbValue::Guid(id))
                .with("sha1", DbValue::Sha1(sha1)),
        );
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut root = DbObject::new();
        if let Some(path) = self.path {
            root.push("path", DbValue::String(path));
        }
        root.push("ebx", list(self.ebx));
        root.push("res", list(self.res));
        root.push("chunks", list(self.chunks));
        write_object(&root)
    }
}

/// Binary bundle with inline EBX payloads stored uncompressed
///
/// Hashes are `[n; 20]`, numbered from 1 in table order.
#[derive(Default)]
pub struct BinaryBundle {
    /// Name, encoded payload and declared original size
    ebx: Vec<(String, Vec<u8>, usize)>,
    res: Vec<(String, u32)>,
    chunks: Vec<[u8; 16]>,
}

impl BinaryBundle {
    pub fn ebx(mut self, name: &str, payload: Vec<u8>) -> Self {
        self.ebx
            .push((name.to_string(), encode_stored_blocks(&payload), payload.len()));
        self
    }

    /// An EBX entry whose payload bytes are written as given
    pub fn raw_ebx(mut self, name: &str, encoded: Vec<u8>, original_size: usize) -> Self {
        self.ebx.push((name.to_string(), encoded, original_size));
        self
    }

    pub fn res(mut self, name: &str, res_type: u32) -> Self {
        self.res.push((name.to_string(), res_type));
        self
    }

    pub fn chunk(mut self, id: [u8; 16]) -> Self {
        self.chunks.push(id);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let be = |v: usize| u32::try_from(v).unwrap().to_be_bytes();
        let total = self.ebx.len() + self.res.len() + self.chunks.len();

        let mut strings = Vec::new();
        let mut intern = |name: &str| {
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
            tables.extend_from_slice(&be(intern(name)));
            tables.extend_from_slice(&be(*original_size));
        }
        for (name, _) in &self.res {
            tables.extend_from_slice(&be(intern(name)));
            tables.extend_from_slice(&be(0));
        }
        for (_, res_type) in &self.res {
            tables.extend_from_slice(&res_type.to_be_bytes());
        }
        tables.extend(std::iter::repeat_n(0u8, self.res.len() * (16 + 8)));
        for id in &self.chunks {
            tables.extend_from_slice(id);
            tables.extend_from_slice(&be(0));
            tables.extend_from_slice(&be(0x1000));
        }

        let strings_offset = 0x20 + tables.len();
        let payload_offset = strings_offset + strings.len();

        let mut out = Vec::new();
        out.extend_from_slice(&be(payload_offset));
        out.extend_from_slice(&[0x9D, 0x79, 0x8E, 0xD5]);
        for field in [
            total,
            self.ebx.len(),
            self.res.len(),
            self.chunks.len(),
            strings_offset,
            payload_offset,
            0,
        ] {
            out.extend_from_slice(&be(field));
        }
        out.extend(tables);
        out.extend(strings);
        for (_, encoded, _) in &self.ebx {
            out.extend_from_slice(encoded);
        }
        out
    }
}

/// A game installation in a temporary directory
pub struct GameDir {
    dir: TempDir,
}

impl GameDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.root().join(relative);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, bytes).expect("write");
        path
    }

    /// Write `<stem>.sb` holding the bundles back to back and `<stem>.toc`
    /// listing them, plus one TOC-level chunk per entry of `chunks`
    pub fn write_toc(
        &self,
        stem: &str,
        uses_cas: bool,
        bundles: &[TocBundle],
        chunks: &[([u8; 16], [u8; 20])],
    ) -> PathBuf {
        let mut sb = Vec::new();
        let mut listed = Vec::new();
        for bundle in bundles {
            let offset = if bundle.dangling {
                1 << 20
            } else {
                sb.len()
            };
            sb.extend_from_slice(&bundle.data);
            let mut object = DbObject::new()
                .with("id", DbValue::String(bundle.id.clone()))
                .with("offset", DbValue::Long(offset as i64))
                .with("size", DbValue::Long(bundle.data.len() as i64));
            if bundle.delta {
                object.push("delta", DbValue::Bool(true));
            }
            listed.push(object);
        }

        let toc_chunks = chunks
            .iter()
            .map(|(id, sha1)| {
                DbObject::new()
                    .with("id", DbValue::Guid(*id))
                    .with("sha1", DbValue::Sha1(*sha1))
            })
            .collect();

        let toc = DbObject::new()
            .with("bundles", list(listed))
            .with("chunks", list(toc_chunks))
            .with("cas", DbValue::Bool(uses_cas));

        self.write(&format!("{stem}.sb"), &sb);
        self.write(&format!("{stem}.toc"), &write_object(&toc))
    }

    /// Store each payload in `<dir>/cas_01.cas` and list it in
    /// `<dir>/cas.cat`; returns the hash each payload is listed under
    pub fn write_cas(&self, dir: &str, payloads: &[Vec<u8>]) -> Vec<[u8; 20]> {
        let mut cas = Vec::new();
        let mut cat = CAT_MAGIC.to_vec();
        let mut hashes = Vec::new();
        for payload in payloads {
            let wrapped = wrap_as_container(payload);
            let header = CasEntryHeader::parse(&wrapped).expect("header");
            let offset = u32::try_from(cas.len() + CAS_ENTRY_HEADER_SIZE).unwrap();

            cat.extend_from_slice(&header.sha1);
            cat.extend_from_slice(&offset.to_le_bytes());
            cat.extend_from_slice(&header.data_size.to_le_bytes());
            cat.extend_from_slice(&1u32.to_le_bytes());
            cas.extend(wrapped);
            hashes.push(header.sha1);
        }

        self.write(&format!("{dir}/cas_01.cas"), &cas);
        self.write(&format!("{dir}/cas.cat"), &cat);
        hashes
    }
}
