//! # undbc
//!
//! A Rust library for reading, editing and saving WoW client database files
//! (`.dbc` and `.db2` / WDC5).
//!
//! ## Overview
//!
//! Client databases ship structured game records (spells, items, maps) in two
//! related little-endian binary formats. This library provides:
//!
//! - Header parsing for the fixed DBC layout and the WDC5-style DB2 layout
//!   (including the optional first section header)
//! - Field storage metadata parsing with defensive sanitization of malformed
//!   descriptors
//! - Per-field compressed record decoding: raw, immediate, common-map,
//!   palette, and bit-packed schemes, with a raw-read fallback for
//!   unsupported codes
//! - DBC string-block access and editing
//! - In-place cell and string mutation plus lossy write-back (every cell is
//!   re-encoded as 4 little-endian bytes) with a `.bak` backup of the
//!   original
//!
//! ## Example
//!
//! ```rust,no_run
//! use undbc::DbcFile;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut table = DbcFile::load("Spell.dbc")?;
//!
//!     for record in table.records().iter().take(5) {
//!         println!("{:?}", record);
//!     }
//!
//!     table.update_record(0, 2, 12345);
//!     table.save(Some("Spell_edited.dbc"))?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod field;
pub mod format;
pub mod header;
mod read;
pub mod record;
pub mod strings;
pub mod table;

pub use error::{Error, Result};
pub use field::{Compression, FieldInfo};
pub use format::{FileKind, VALID_SIGNATURES};
pub use header::{Db2Header, DbcHeader, Header, SectionHeader};
pub use record::FieldTables;
pub use strings::StringBlock;
pub use table::DbcFile;
