//! Loaded table aggregate: load, edit and save DBC/DB2 files
//!
//! [`DbcFile`] exclusively owns everything decoded from one file: the header,
//! the (parsed or synthesized) field descriptors, the auxiliary lookup
//! tables, the record matrix and, for DBC, the string block. It is created by
//! [`DbcFile::load`], mutated in place, and written back by
//! [`DbcFile::save`]. Nothing is shared between instances and no file handle
//! outlives a call.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::field::FieldInfo;
use crate::format::{validate_signature, FileKind};
use crate::header::{Db2Header, DbcHeader, Header};
use crate::record::{decode_records, FieldTables};
use crate::strings::StringBlock;

/// A loaded DBC or DB2 table
pub struct DbcFile {
    path: PathBuf,
    kind: FileKind,
    header: Header,
    fields: Vec<FieldInfo>,
    tables: FieldTables,
    records: Vec<Vec<u64>>,
    strings: Option<StringBlock>,
}

impl DbcFile {
    /// Load a `.dbc` or `.db2` file.
    ///
    /// Structural problems (missing file, wrong extension, unrecognized
    /// signature, truncated header or field metadata) fail the whole load.
    /// Field- and record-level decode problems degrade to zero values with a
    /// logged warning instead.
    ///
    /// # Example
    /// ```no_run
    /// use undbc::DbcFile;
    /// let table = DbcFile::load("Spell.dbc")?;
    /// println!("{} records", table.record_count());
    /// # Ok::<(), undbc::Error>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }
        let kind = FileKind::from_path(path)?;
        let data = fs::read(path)?;
        info!(path = %path.display(), bytes = data.len(), ?kind, "loading table");

        let mut cursor = Cursor::new(data.as_slice());
        match kind {
            FileKind::Dbc => Self::load_dbc(path, kind, &mut cursor),
            FileKind::Db2 => Self::load_db2(path, kind, &mut cursor),
        }
    }

    fn load_dbc(path: &Path, kind: FileKind, cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let header = DbcHeader::parse(cursor)?;
        validate_signature(&header.signature)?;

        // DBC carries no field metadata; synthesize plain sequential columns.
        let fields = FieldInfo::synthesize_dbc(header.field_count, header.record_size);
        let tables = FieldTables::empty(fields.len());
        let records = decode_records(cursor, &fields, header.record_count, &tables);

        let strings = Self::read_string_block(cursor, &header)?;
        debug!(
            records = records.len(),
            strings = strings.len(),
            "DBC decode complete"
        );

        Ok(DbcFile {
            path: path.to_path_buf(),
            kind,
            header: Header::Dbc(header),
            fields,
            tables,
            records,
            strings: Some(strings),
        })
    }

    fn load_db2(path: &Path, kind: FileKind, cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let header = Db2Header::parse(cursor)?;
        validate_signature(&header.signature)?;

        let fields = FieldInfo::parse_all(cursor, header.field_count)?;

        // Record data (and its auxiliary blocks) for a sectioned file starts
        // at the section's absolute offset, not at the current position.
        if let Some(section) = &header.section {
            debug!(offset = section.file_offset, "seeking to section data");
            cursor.set_position(section.file_offset as u64);
        }

        let tables = FieldTables::read(cursor, &fields);
        let records = decode_records(cursor, &fields, header.record_count, &tables);
        debug!(records = records.len(), "DB2 decode complete");

        Ok(DbcFile {
            path: path.to_path_buf(),
            kind,
            header: Header::Db2(header),
            fields,
            tables,
            records,
            strings: None,
        })
    }

    /// Read the trailing string block of a DBC file.
    ///
    /// Always re-seeks to `header + record_count * record_size` so the result
    /// is a pure function of the file bytes, independent of how record decode
    /// left the cursor.
    fn read_string_block(cursor: &mut Cursor<&[u8]>, header: &DbcHeader) -> Result<StringBlock> {
        let start = DbcHeader::SIZE + header.record_count as u64 * header.record_size as u64;
        cursor.set_position(start);

        let mut buf = Vec::with_capacity(header.string_block_size as usize);
        cursor
            .take(header.string_block_size as u64)
            .read_to_end(&mut buf)?;
        if buf.len() < header.string_block_size as usize {
            warn!(
                expected = header.string_block_size,
                actual = buf.len(),
                "string block shorter than header claims"
            );
        }
        Ok(StringBlock::from_bytes(&buf))
    }

    /// Write the table back to disk.
    ///
    /// `path` defaults to the originally loaded file. The originally loaded
    /// file is first copied to a sibling `.bak` path; a failing backup fails
    /// the save. DBC cells are written at their column width so the layout
    /// the header describes stays valid. The DB2 write is lossy by design:
    /// every cell is re-encoded as a raw 4-byte little-endian value whatever
    /// its original width or compression, and the header is written as the
    /// narrow signature/version/record_count/record_size subset the original
    /// tool wrote. [`DbcFile::load`] of the result decodes to the same matrix.
    pub fn save<P: AsRef<Path>>(&self, path: Option<P>) -> Result<()> {
        let dest = path
            .as_ref()
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(|| self.path.clone());

        let mut backup = self.path.as_os_str().to_owned();
        backup.push(".bak");
        fs::copy(&self.path, &backup)?;
        debug!(backup = %PathBuf::from(&backup).display(), "backup written");

        self.write_to(&dest)
            .map_err(|e| Error::Serialization(format!("{}: {}", dest.display(), e)))?;
        info!(path = %dest.display(), records = self.records.len(), "table saved");
        Ok(())
    }

    fn write_to(&self, dest: &Path) -> std::io::Result<()> {
        let file = File::create(dest)?;
        let mut writer = BufWriter::new(file);

        match &self.header {
            Header::Dbc(h) => {
                writer.write_all(&signature_bytes(&h.signature))?;
                writer.write_u32::<LittleEndian>(h.record_count)?;
                writer.write_u32::<LittleEndian>(h.field_count)?;
                writer.write_u32::<LittleEndian>(h.record_size)?;
                writer.write_u32::<LittleEndian>(h.string_block_size)?;
            }
            Header::Db2(h) => {
                writer.write_all(&signature_bytes(&h.signature))?;
                writer.write_u32::<LittleEndian>(h.version)?;
                writer.write_u32::<LittleEndian>(h.record_count)?;
                writer.write_u32::<LittleEndian>(h.record_size)?;
            }
        }

        for record in &self.records {
            match self.kind {
                // DBC columns are plain uncompressed reads; writing each cell
                // at its column width keeps the header's record_size truthful
                // so a reload decodes the same matrix and finds the string
                // block where the header says it is.
                FileKind::Dbc => {
                    for (field, value) in self.fields.iter().zip(record) {
                        write_cell(&mut writer, *value, field.size as usize)?;
                    }
                }
                // DB2 cells are re-encoded as 4 bytes regardless of their
                // original width or compression, as the original tool did.
                FileKind::Db2 => {
                    for value in record {
                        writer.write_u32::<LittleEndian>(*value as u32)?;
                    }
                }
            }
        }

        if let Some(strings) = &self.strings {
            writer.write_all(&strings.to_bytes())?;
        }

        writer.flush()
    }

    /// Overwrite one cell of the record matrix.
    ///
    /// Returns false (and changes nothing) when either index is out of
    /// bounds. Immediate, non-transactional.
    pub fn update_record(&mut self, record: usize, field: usize, value: u64) -> bool {
        match self.records.get_mut(record).and_then(|r| r.get_mut(field)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Overwrite one string of a DBC string block.
    ///
    /// Returns false for DB2 tables or an out-of-bounds index.
    pub fn update_string(&mut self, index: usize, value: impl Into<String>) -> bool {
        match &mut self.strings {
            Some(strings) => strings.set(index, value),
            None => false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Auxiliary pallet/common tables resolved for this file
    pub fn field_tables(&self) -> &FieldTables {
        &self.tables
    }

    /// The decoded record matrix, record-major
    pub fn records(&self) -> &[Vec<u64>] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// String block; `None` for DB2 tables
    pub fn strings(&self) -> Option<&StringBlock> {
        self.strings.as_ref()
    }
}

/// Write a cell's low bytes at the column width, zero-padding widths past 8.
fn write_cell(writer: &mut impl Write, value: u64, size: usize) -> std::io::Result<()> {
    let bytes = value.to_le_bytes();
    let take = size.min(8);
    writer.write_all(&bytes[..take])?;
    if size > 8 {
        writer.write_all(&vec![0u8; size - 8])?;
    }
    Ok(())
}

fn signature_bytes(signature: &str) -> [u8; 4] {
    let mut out = [0u8; 4];
    let src = signature.as_bytes();
    let len = src.len().min(4);
    out[..len].copy_from_slice(&src[..len]);
    out
}
