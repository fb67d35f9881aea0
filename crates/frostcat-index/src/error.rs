//! Index error types

use frostcat_formats::FormatError;
use thiserror::Error;

/// Error type for catalog, resolution and scan operations
#[derive(Debug, Error)]
pub enum IndexError {
    /// Archive decoding failed
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The catalog could not be read or written
    #[error("catalog write failure: {0}")]
    CatalogWriteFailure(#[from] rusqlite::Error),

    /// The game directory could not be walked
    #[error("file enumeration failed: {0}")]
    Enumeration(#[from] walkdir::Error),

    /// Lookup target does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Whether the error must abort a scan
    ///
    /// Catalog and enumeration failures are fatal; everything else is scoped
    /// to the entry being decoded.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CatalogWriteFailure(_) | Self::Enumeration(_))
    }
}

/// Result alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(IndexError::CatalogWriteFailure(rusqlite::Error::InvalidQuery).is_fatal());
        assert!(!IndexError::Format(FormatError::malformed("bad magic")).is_fatal());
        assert!(!IndexError::NotFound("abc".into()).is_fatal());
        assert!(!IndexError::Io(std::io::Error::other("gone")).is_fatal());
    }
}
