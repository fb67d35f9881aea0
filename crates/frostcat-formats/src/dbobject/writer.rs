//! DbObject encoding

use super::type_code;
use super::value::{DbObject, DbValue};

fn write_leb128(mut value: usize, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

const fn type_of(value: &DbValue) -> u8 {
    match value {
        DbValue::List(_) => type_code::LIST,
        DbValue::Object(_) => type_code::OBJECT,
        DbValue::Bool(_) => type_code::BOOL,
        DbValue::String(_) => type_code::STRING,
        DbValue::Int(_) => type_code::INT,
        DbValue::Long(_) => type_code::LONG,
        DbValue::Float(_) => type_code::FLOAT,
        DbValue::Double(_) => type_code::DOUBLE,
        DbValue::Guid(_) => type_code::GUID,
        DbValue::Sha1(_) => type_code::SHA1,
        DbValue::Blob(_) => type_code::BLOB,
    }
}

/// Append one entry, named unless `name` is `None`
pub fn write_entry(name: Option<&str>, value: &DbValue, out: &mut Vec<u8>) {
    let kind = type_of(value);
    match name {
        Some(name) => {
            out.push(kind);
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        None => out.push(kind | type_code::NAMELESS),
    }

    match value {
        DbValue::List(items) => {
            let mut body = Vec::new();
            for item in items {
                write_entry(None, item, &mut body);
            }
            body.push(type_code::END);
            write_leb128(body.len(), out);
            out.extend(body);
        }
        DbValue::Object(object) => {
            let mut body = Vec::new();
            for (field, item) in object.fields() {
                write_entry(Some(field), item, &mut body);
            }
            body.push(type_code::END);
            write_leb128(body.len(), out);
            out.extend(body);
        }
        DbValue::Bool(b) => out.push(u8::from(*b)),
        DbValue::String(s) => {
            write_leb128(s.len() + 1, out);
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        DbValue::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
        DbValue::Long(v) => out.extend_from_slice(&v.to_le_bytes()),
        DbValue::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
        DbValue::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
        DbValue::Guid(g) => out.extend_from_slice(g),
        DbValue::Sha1(h) => out.extend_from_slice(h),
        DbValue::Blob(b) => {
            write_leb128(b.len(), out);
            out.extend_from_slice(b);
        }
    }
}

/// Encode `object` as an unnamed root, the layout of TOC payloads and CAS
/// bundle manifests
pub fn write_object(object: &DbObject) -> Vec<u8> {
    let mut out = Vec::new();
    write_entry(None, &DbValue::Object(object.clone()), &mut out);
    out
}
