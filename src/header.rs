//! DBC / DB2 file header parsing
//!
//! The DBC header is a fixed 20 bytes. The DB2 (WDC5-style) header is 204
//! bytes: signature, version, a 128-byte schema name, then the count/size
//! fields. When `sections_count > 0` a single 40-byte section header
//! follows. Only the first section is modeled; additional sections are
//! ignored.

use std::io::Cursor;

use crate::error::Result;
use crate::read::{read_bytes, read_u16, read_u32, read_u64};

/// Fixed header of a classic DBC (WDBC) file
#[derive(Debug, Clone)]
pub struct DbcHeader {
    /// 4-byte ASCII signature, normally `WDBC`
    pub signature: String,
    pub record_count: u32,
    pub field_count: u32,
    pub record_size: u32,
    pub string_block_size: u32,
}

impl DbcHeader {
    /// Total size of the fixed DBC header in bytes
    pub const SIZE: u64 = 20;

    /// Parse the fixed 20-byte header, leaving the cursor at the first record.
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let sig = read_bytes(cursor, 4, "DBC signature")?;
        Ok(DbcHeader {
            signature: String::from_utf8_lossy(&sig).to_string(),
            record_count: read_u32(cursor, "DBC record count")?,
            field_count: read_u32(cursor, "DBC field count")?,
            record_size: read_u32(cursor, "DBC record size")?,
            string_block_size: read_u32(cursor, "DBC string block size")?,
        })
    }
}

/// Header of a DB2 (WDC5-style) file
#[derive(Debug, Clone)]
pub struct Db2Header {
    /// 4-byte ASCII signature (`WDC5` for current files)
    pub signature: String,
    pub version: u32,
    /// Schema/table name, NUL-trimmed. Informational only.
    pub schema_name: String,
    pub record_count: u32,
    pub field_count: u32,
    pub record_size: u32,
    pub string_table_size: u32,
    pub table_hash: u32,
    pub layout_hash: u32,
    pub min_id: u32,
    pub max_id: u32,
    pub locale: u32,
    pub flags: u16,
    pub id_index: u16,
    pub total_field_count: u32,
    pub bitpacked_data_offset: u32,
    pub lookup_column_count: u32,
    pub field_storage_info_size: u32,
    pub common_data_size: u32,
    pub pallet_data_size: u32,
    pub sections_count: u32,
    /// First section header, present iff `sections_count > 0`
    pub section: Option<SectionHeader>,
}

impl Db2Header {
    /// Parse the DB2 header (and the first section header if any), leaving the
    /// cursor at the start of the field metadata.
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let sig = read_bytes(cursor, 4, "DB2 signature")?;
        let version = read_u32(cursor, "DB2 version")?;

        let name_bytes = read_bytes(cursor, 128, "DB2 schema name")?;
        let schema_name = String::from_utf8_lossy(&name_bytes)
            .trim_end_matches('\0')
            .to_string();

        let record_count = read_u32(cursor, "DB2 record count")?;
        let field_count = read_u32(cursor, "DB2 field count")?;
        let record_size = read_u32(cursor, "DB2 record size")?;
        let string_table_size = read_u32(cursor, "DB2 string table size")?;
        let table_hash = read_u32(cursor, "DB2 table hash")?;
        let layout_hash = read_u32(cursor, "DB2 layout hash")?;
        let min_id = read_u32(cursor, "DB2 min id")?;
        let max_id = read_u32(cursor, "DB2 max id")?;
        let locale = read_u32(cursor, "DB2 locale")?;
        let flags = read_u16(cursor, "DB2 flags")?;
        let id_index = read_u16(cursor, "DB2 id index")?;
        let total_field_count = read_u32(cursor, "DB2 total field count")?;
        let bitpacked_data_offset = read_u32(cursor, "DB2 bitpacked data offset")?;
        let lookup_column_count = read_u32(cursor, "DB2 lookup column count")?;
        let field_storage_info_size = read_u32(cursor, "DB2 field storage info size")?;
        let common_data_size = read_u32(cursor, "DB2 common data size")?;
        let pallet_data_size = read_u32(cursor, "DB2 pallet data size")?;
        let sections_count = read_u32(cursor, "DB2 sections count")?;

        let section = if sections_count > 0 {
            Some(SectionHeader::parse(cursor)?)
        } else {
            None
        };

        Ok(Db2Header {
            signature: String::from_utf8_lossy(&sig).to_string(),
            version,
            schema_name,
            record_count,
            field_count,
            record_size,
            string_table_size,
            table_hash,
            layout_hash,
            min_id,
            max_id,
            locale,
            flags,
            id_index,
            total_field_count,
            bitpacked_data_offset,
            lookup_column_count,
            field_storage_info_size,
            common_data_size,
            pallet_data_size,
            sections_count,
            section,
        })
    }
}

/// Per-section header of a DB2 file (first section only)
#[derive(Debug, Clone)]
pub struct SectionHeader {
    /// TACT key lookup hash; non-zero means the section is encrypted,
    /// which this crate does not attempt to decrypt
    pub tact_key_lookup: u64,
    /// Absolute offset of the section's record data
    pub file_offset: u32,
    pub num_records: u32,
    pub string_table_size: u32,
    pub offset_records_end: u32,
    pub index_data_size: u32,
    pub parent_lookup_size: u32,
    pub offset_map_id_count: u32,
    pub copy_table_count: u32,
}

impl SectionHeader {
    /// On-disk size of one section header in bytes
    pub const SIZE: u64 = 40;

    pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(SectionHeader {
            tact_key_lookup: read_u64(cursor, "section TACT key")?,
            file_offset: read_u32(cursor, "section file offset")?,
            num_records: read_u32(cursor, "section record count")?,
            string_table_size: read_u32(cursor, "section string table size")?,
            offset_records_end: read_u32(cursor, "section records end offset")?,
            index_data_size: read_u32(cursor, "section index data size")?,
            parent_lookup_size: read_u32(cursor, "section parent lookup size")?,
            offset_map_id_count: read_u32(cursor, "section offset map id count")?,
            copy_table_count: read_u32(cursor, "section copy table count")?,
        })
    }
}

/// Tagged header variant, resolved once at load time
#[derive(Debug, Clone)]
pub enum Header {
    Dbc(DbcHeader),
    Db2(Db2Header),
}

impl Header {
    pub fn signature(&self) -> &str {
        match self {
            Header::Dbc(h) => &h.signature,
            Header::Db2(h) => &h.signature,
        }
    }

    pub fn record_count(&self) -> u32 {
        match self {
            Header::Dbc(h) => h.record_count,
            Header::Db2(h) => h.record_count,
        }
    }

    pub fn field_count(&self) -> u32 {
        match self {
            Header::Dbc(h) => h.field_count,
            Header::Db2(h) => h.field_count,
        }
    }

    pub fn record_size(&self) -> u32 {
        match self {
            Header::Dbc(h) => h.record_size,
            Header::Db2(h) => h.record_size,
        }
    }
}
