//! File format detection and signature validation
//!
//! The format family is chosen strictly from the file extension: `.dbc` files
//! use the fixed 20-byte WDBC layout, `.db2` files use the variable WDC5-style
//! layout. There is no content sniffing beyond checking the 4-byte signature
//! against a closed set after the header has been read.

use std::path::Path;

use crate::error::{Error, Result};

/// Signatures accepted for both format families
pub const VALID_SIGNATURES: [&str; 5] = ["WDBC", "WDB2", "WCH2", "WDB5", "WDC5"];

/// The two on-disk format families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Classic fixed-layout format (WDBC): header + records + string block
    Dbc,
    /// WDC5-style format: header + field metadata + per-field compressed records
    Db2,
}

impl FileKind {
    /// Determine the format family from a path's extension (case-insensitive).
    ///
    /// Fails with [`Error::InvalidExtension`] for anything other than `.dbc`
    /// or `.db2`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "dbc" => Ok(FileKind::Dbc),
            "db2" => Ok(FileKind::Db2),
            _ => Err(Error::InvalidExtension(path.display().to_string())),
        }
    }
}

/// Check a 4-byte signature against the accepted set.
pub fn validate_signature(signature: &str) -> Result<()> {
    if VALID_SIGNATURES.contains(&signature) {
        Ok(())
    } else {
        Err(Error::InvalidSignature(signature.to_string()))
    }
}
