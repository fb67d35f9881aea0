//! DbObject values

/// A decoded DbObject value
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    /// Ordered unnamed values
    List(Vec<DbValue>),
    /// Named fields
    Object(DbObject),
    /// Boolean
    Bool(bool),
    /// String
    String(String),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// 16-byte GUID
    Guid([u8; 16]),
    /// 20-byte SHA1
    Sha1([u8; 20]),
    /// Raw bytes
    Blob(Vec<u8>),
}

impl DbValue {
    /// Object fields, if this is an object
    pub fn as_object(&self) -> Option<&DbObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// List items, if this is a list
    pub fn as_list(&self) -> Option<&[DbValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// String contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value, widening `Int` to 64 bits
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// GUID bytes
    pub fn as_guid(&self) -> Option<&[u8; 16]> {
        match self {
            Self::Guid(g) => Some(g),
            _ => None,
        }
    }

    /// SHA1 bytes
    pub fn as_sha1(&self) -> Option<&[u8; 20]> {
        match self {
            Self::Sha1(h) => Some(h),
            _ => None,
        }
    }

    /// Blob bytes
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }
}

/// An object: ordered named fields
///
/// Field order is preserved and duplicate names are allowed; lookups return
/// the first match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbObject {
    fields: Vec<(String, DbValue)>,
}

impl DbObject {
    /// Empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field
    pub fn push(&mut self, name: impl Into<String>, value: DbValue) {
        self.fields.push((name.into(), value));
    }

    /// Builder-style [`DbObject::push`]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: DbValue) -> Self {
        self.push(name, value);
        self
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the object has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &DbValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// First field named `name`
    pub fn get(&self, name: &str) -> Option<&DbValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// String field
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(DbValue::as_str)
    }

    /// Boolean field
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(DbValue::as_bool)
    }

    /// Integer field of either width
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(DbValue::as_i64)
    }

    /// GUID field
    pub fn get_guid(&self, name: &str) -> Option<&[u8; 16]> {
        self.get(name).and_then(DbValue::as_guid)
    }

    /// SHA1 field
    pub fn get_sha1(&self, name: &str) -> Option<&[u8; 20]> {
        self.get(name).and_then(DbValue::as_sha1)
    }

    /// Items of a list field; empty when the field is missing or not a list
    pub fn get_list(&self, name: &str) -> &[DbValue] {
        self.get(name).and_then(DbValue::as_list).unwrap_or_default()
    }

    /// Objects inside a list field, skipping non-object items
    pub fn objects_in(&self, name: &str) -> impl Iterator<Item = &DbObject> {
        self.get_list(name).iter().filter_map(DbValue::as_object)
    }
}
