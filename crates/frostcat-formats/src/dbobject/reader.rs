//! DbObject decoding

use super::type_code;
use super::{DbObject, DbValue};
use crate::error::{FormatError, Result};

/// Nesting limit for lists and objects
const MAX_DEPTH: usize = 64;

/// Sequential DbObject reader over a byte buffer
#[derive(Debug, Clone)]
pub struct DbReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DbReader<'a> {
    /// Start reading at the beginning of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read one named entry
    ///
    /// Returns `None` at an end marker or at the end of the buffer. Unnamed
    /// entries come back with an empty name.
    pub fn read_entry(&mut self) -> Result<Option<(String, DbValue)>> {
        self.read_entry_at(0)
    }

    fn read_entry_at(&mut self, depth: usize) -> Result<Option<(String, DbValue)>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }

        let header = self.byte()?;
        let kind = header & type_code::TYPE_MASK;
        if kind == type_code::END {
            return Ok(None);
        }

        let name = if header & type_code::NAMELESS == 0 {
            self.cstring()?
        } else {
            String::new()
        };

        let value = self.read_value(kind, depth)?;
        Ok(Some((name, value)))
    }

    fn read_value(&mut self, kind: u8, depth: usize) -> Result<DbValue> {
        let value = match kind {
            type_code::LIST => DbValue::List(
                self.read_children(depth)?
                    .into_iter()
                    .map(|(_, value)| value)
                    .collect(),
            ),
            type_code::OBJECT => {
                let mut object = DbObject::new();
                for (name, value) in self.read_children(depth)? {
                    object.push(name, value);
                }
                DbValue::Object(object)
            }
            type_code::BOOL => DbValue::Bool(self.byte()? != 0),
            type_code::STRING => {
                let len = self.leb128()?;
                let bytes = self.take(len)?;
                let text = bytes.strip_suffix(&[0]).unwrap_or(bytes);
                DbValue::String(String::from_utf8_lossy(text).into_owned())
            }
            type_code::INT => DbValue::Int(i32::from_le_bytes(self.array()?)),
            type_code::LONG => DbValue::Long(i64::from_le_bytes(self.array()?)),
            type_code::FLOAT => DbValue::Float(f32::from_le_bytes(self.array()?)),
            type_code::DOUBLE => DbValue::Double(f64::from_le_bytes(self.array()?)),
            type_code::GUID => DbValue::Guid(self.array()?),
            type_code::SHA1 => DbValue::Sha1(self.array()?),
            type_code::BLOB => {
                let len = self.leb128()?;
                DbValue::Blob(self.take(len)?.to_vec())
            }
            other => {
                return Err(FormatError::malformed(format!(
                    "unknown DbObject type 0x{other:02X} at offset {}",
                    self.pos
                )));
            }
        };
        Ok(value)
    }

    fn read_children(&mut self, depth: usize) -> Result<Vec<(String, DbValue)>> {
        if depth >= MAX_DEPTH {
            return Err(FormatError::malformed("DbObject nesting too deep"));
        }

        let size = self.leb128()?;
        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.data.len())
            .ok_or(FormatError::TruncatedStream {
                expected: size,
                actual: self.data.len() - self.pos,
            })?;

        let mut children = Vec::new();
        while self.pos < end {
            match self.read_entry_at(depth + 1)? {
                Some(child) => children.push(child),
                None => break,
            }
        }

        if self.pos > end {
            return Err(FormatError::malformed(format!(
                "DbObject child overruns its container ending at {end}"
            )));
        }
        self.pos = end;

        Ok(children)
    }

    fn byte(&mut self) -> Result<u8> {
        let [byte] = self.array()?;
        Ok(byte)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let remaining = self.data.len().saturating_sub(self.pos);
        if len > remaining {
            return Err(FormatError::TruncatedStream {
                expected: len,
                actual: remaining,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| FormatError::malformed("unterminated DbObject name"))?;
        let name = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(name)
    }

    fn leb128(&mut self) -> Result<usize> {
        let mut value: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.byte()?;
            if shift >= 64 {
                return Err(FormatError::malformed("LEB128 value overflows 64 bits"));
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        usize::try_from(value).map_err(|_| FormatError::malformed("LEB128 value too large"))
    }
}

/// Read top-level entries until an end marker or the end of `data`
pub fn read_entries(data: &[u8]) -> Result<Vec<DbValue>> {
    let mut reader = DbReader::new(data);
    let mut values = Vec::new();
    while let Some((_, value)) = reader.read_entry()? {
        values.push(value);
    }
    Ok(values)
}

/// Read the first entry of `data`, which must be an object
pub fn read_object(data: &[u8]) -> Result<DbObject> {
    match DbReader::new(data).read_entry()? {
        Some((_, DbValue::Object(object))) => Ok(object),
        Some(_) => Err(FormatError::malformed("DbObject root is not an object")),
        None => Err(FormatError::malformed("empty DbObject stream")),
    }
}
