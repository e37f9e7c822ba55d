//! Record-matrix decoding
//!
//! Decoding is a single forward pass. The auxiliary pallet and common-value
//! tables are consumed from the stream first, in field-index order, then
//! `record_count` records are decoded field by field according to each
//! field's compression scheme. Auxiliary-table and per-field failures degrade
//! rather than abort: a partially filled table or a zeroed cell is preferred
//! over losing the whole load.

use std::collections::HashMap;
use std::io::Cursor;

use tracing::{debug, warn};

use crate::error::Result;
use crate::field::{Compression, FieldInfo};
use crate::read::read_uint;

/// Auxiliary lookup tables, one optional slot per field.
///
/// Slots are allocated once after field metadata is known; only fields whose
/// compression scheme needs a table get one.
#[derive(Debug, Default)]
pub struct FieldTables {
    pallets: Vec<Option<Vec<u64>>>,
    commons: Vec<Option<HashMap<u64, u64>>>,
}

impl FieldTables {
    /// Empty tables for `field_count` fields (DBC files, tests).
    pub fn empty(field_count: usize) -> Self {
        FieldTables {
            pallets: vec![None; field_count],
            commons: vec![None; field_count],
        }
    }

    /// Consume the pallet and common data blocks from the stream.
    ///
    /// Two passes in field-index order, matching the on-disk layout: all
    /// palettes first, then all common maps. A short read while filling a
    /// field's table leaves that table partial and moves on to the next
    /// field; it never fails the resolver as a whole.
    pub fn read(cursor: &mut Cursor<&[u8]>, fields: &[FieldInfo]) -> Self {
        let mut tables = FieldTables::empty(fields.len());

        for (i, field) in fields.iter().enumerate() {
            if !matches!(
                field.compression,
                Compression::Pallet | Compression::PalletArray
            ) {
                continue;
            }
            let count = (field.additional_data_size / 4).min(1_000_000);
            debug!(field = i, entries = count, "reading pallet data");
            let mut pallet = Vec::with_capacity(count as usize);
            for _ in 0..count {
                match read_uint(cursor, 4, "pallet entry") {
                    Ok(value) => pallet.push(value),
                    Err(e) => {
                        warn!(field = i, error = %e, "pallet data ended early");
                        break;
                    }
                }
            }
            tables.pallets[i] = Some(pallet);
        }

        for (i, field) in fields.iter().enumerate() {
            if !matches!(field.compression, Compression::Common | Compression::Common2) {
                continue;
            }
            let count = (field.additional_data_size / 8).min(1_000_000);
            debug!(field = i, entries = count, "reading common data");
            let mut map = HashMap::with_capacity(count as usize);
            for _ in 0..count {
                let key = match read_uint(cursor, 4, "common key") {
                    Ok(k) => k,
                    Err(e) => {
                        warn!(field = i, error = %e, "common data ended early");
                        break;
                    }
                };
                let value = match read_uint(cursor, 4, "common value") {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(field = i, error = %e, "common data ended early");
                        break;
                    }
                };
                map.insert(key, value);
            }
            tables.commons[i] = Some(map);
        }

        tables
    }

    /// Palette lookup; 0 for a missing table or out-of-range index.
    pub fn pallet_lookup(&self, field: usize, index: u64) -> u64 {
        self.pallets
            .get(field)
            .and_then(|slot| slot.as_ref())
            .and_then(|pallet| pallet.get(index as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Common-map lookup; 0 for a missing table or absent key.
    pub fn common_lookup(&self, field: usize, key: u64) -> u64 {
        self.commons
            .get(field)
            .and_then(|slot| slot.as_ref())
            .and_then(|map| map.get(&key))
            .copied()
            .unwrap_or(0)
    }

    #[cfg(test)]
    fn with_pallet(mut self, field: usize, values: Vec<u64>) -> Self {
        self.pallets[field] = Some(values);
        self
    }

    #[cfg(test)]
    fn with_common(mut self, field: usize, entries: &[(u64, u64)]) -> Self {
        self.commons[field] = Some(entries.iter().copied().collect());
        self
    }
}

/// Decode a single field value at the current stream position.
///
/// Only this step can fail; the caller owns the recovery policy.
fn decode_field(
    cursor: &mut Cursor<&[u8]>,
    field: &FieldInfo,
    field_idx: usize,
    tables: &FieldTables,
) -> Result<u64> {
    let size = field.size as usize;
    match field.compression {
        Compression::None => read_uint(cursor, size, "record field"),

        // Value lives in the descriptor; the record stream does not advance.
        Compression::Immediate | Compression::SignedImmediate => Ok(field.packed_value as u64),

        Compression::Common | Compression::Common2 => {
            let key = read_uint(cursor, size, "common field key")?;
            Ok(tables.common_lookup(field_idx, key))
        }

        Compression::Pallet | Compression::PalletArray => {
            let index = read_uint(cursor, size, "pallet field index")?;
            Ok(tables.pallet_lookup(field_idx, index))
        }

        Compression::BitPacked | Compression::Array2 => {
            let value = read_uint(cursor, size, "bit-packed field")?;
            if field.cell_size > 0 {
                Ok(value & ((1u64 << field.cell_size) - 1))
            } else {
                Ok(value)
            }
        }

        // Unspecialized schemes fall back to a raw read of the declared width.
        Compression::Unsupported(code) => {
            debug!(field = field_idx, code, "unsupported compression, raw read");
            read_uint(cursor, size, "record field")
        }
    }
}

/// Decode `record_count` records of `fields.len()` values each.
///
/// Recovery policy: a field that fails to decode (typically a short read at
/// the end of a truncated file) is logged and substituted with 0, and
/// decoding continues with the next field. A single bad field never aborts
/// the load.
pub fn decode_records(
    cursor: &mut Cursor<&[u8]>,
    fields: &[FieldInfo],
    record_count: u32,
    tables: &FieldTables,
) -> Vec<Vec<u64>> {
    let mut records = Vec::with_capacity(record_count as usize);
    for record_idx in 0..record_count {
        let mut record = Vec::with_capacity(fields.len());
        for (field_idx, field) in fields.iter().enumerate() {
            let value = match decode_field(cursor, field, field_idx, tables) {
                Ok(v) => v,
                Err(e) => {
                    warn!(
                        record = record_idx,
                        field = field_idx,
                        error = %e,
                        "field decode failed, substituting 0"
                    );
                    0
                }
            };
            record.push(value);
        }
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};

    fn field(compression: Compression, size: u32) -> FieldInfo {
        FieldInfo {
            offset: 0,
            size,
            additional_data_size: 0,
            compression,
            packed_value: 0,
            cell_size: 0,
            cardinality: 1,
        }
    }

    #[test]
    fn test_none_fields_decode_raw_le() {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(7).unwrap();
        data.write_u32::<LittleEndian>(0x01020304).unwrap();
        let fields = vec![field(Compression::None, 4), field(Compression::None, 4)];
        let tables = FieldTables::empty(2);
        let mut cursor = Cursor::new(data.as_slice());
        let records = decode_records(&mut cursor, &fields, 1, &tables);
        assert_eq!(records, vec![vec![7, 0x01020304]]);
    }

    #[test]
    fn test_immediate_consumes_no_bytes() {
        let data = [0xAAu8; 4];
        let mut f = field(Compression::Immediate, 4);
        f.packed_value = 42;
        let mut signed = field(Compression::SignedImmediate, 4);
        signed.packed_value = 99;
        let tables = FieldTables::empty(2);
        let mut cursor = Cursor::new(&data[..]);
        let records = decode_records(&mut cursor, &[f, signed], 1, &tables);
        assert_eq!(records, vec![vec![42, 99]]);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_pallet_lookup_and_out_of_range() {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(1).unwrap(); // in range
        data.write_u32::<LittleEndian>(5).unwrap(); // out of range
        let fields = vec![field(Compression::Pallet, 4)];
        let tables = FieldTables::empty(1).with_pallet(0, vec![10, 20, 30]);
        let mut cursor = Cursor::new(data.as_slice());
        let records = decode_records(&mut cursor, &fields, 2, &tables);
        assert_eq!(records, vec![vec![20], vec![0]]);
    }

    #[test]
    fn test_common_lookup_defaults_to_zero() {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(7).unwrap(); // present key
        data.write_u32::<LittleEndian>(9).unwrap(); // absent key
        let fields = vec![field(Compression::Common, 4)];
        let tables = FieldTables::empty(1).with_common(0, &[(7, 100)]);
        let mut cursor = Cursor::new(data.as_slice());
        let records = decode_records(&mut cursor, &fields, 2, &tables);
        assert_eq!(records, vec![vec![100], vec![0]]);
    }

    #[test]
    fn test_bit_packed_masks_to_cell_size() {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(0xFFFF_FFFF).unwrap();
        data.write_u32::<LittleEndian>(0xFFFF_FFFF).unwrap();
        let mut masked = field(Compression::BitPacked, 4);
        masked.cell_size = 5;
        let unmasked = field(Compression::Array2, 4); // cell_size 0: no mask
        let tables = FieldTables::empty(2);
        let mut cursor = Cursor::new(data.as_slice());
        let records = decode_records(&mut cursor, &[masked, unmasked], 1, &tables);
        assert_eq!(records, vec![vec![0x1F, 0xFFFF_FFFF]]);
    }

    #[test]
    fn test_unsupported_falls_back_to_raw_read() {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(1234).unwrap();
        let fields = vec![field(Compression::Unsupported(34), 4)];
        let tables = FieldTables::empty(1);
        let mut cursor = Cursor::new(data.as_slice());
        let records = decode_records(&mut cursor, &fields, 1, &tables);
        assert_eq!(records, vec![vec![1234]]);
    }

    #[test]
    fn test_truncated_record_degrades_to_zero() {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(11).unwrap();
        // second field and second record are missing entirely
        let fields = vec![field(Compression::None, 4), field(Compression::None, 4)];
        let tables = FieldTables::empty(2);
        let mut cursor = Cursor::new(data.as_slice());
        let records = decode_records(&mut cursor, &fields, 2, &tables);
        assert_eq!(records, vec![vec![11, 0], vec![0, 0]]);
    }

    #[test]
    fn test_table_read_consumes_pallet_then_common() {
        let mut data = Vec::new();
        // field 0 pallet: two entries
        data.write_u32::<LittleEndian>(10).unwrap();
        data.write_u32::<LittleEndian>(20).unwrap();
        // field 1 common: one pair
        data.write_u32::<LittleEndian>(7).unwrap();
        data.write_u32::<LittleEndian>(100).unwrap();

        let mut pallet_field = field(Compression::Pallet, 4);
        pallet_field.additional_data_size = 8;
        let mut common_field = field(Compression::Common2, 4);
        common_field.additional_data_size = 8;

        let mut cursor = Cursor::new(data.as_slice());
        let tables = FieldTables::read(&mut cursor, &[pallet_field, common_field]);
        assert_eq!(cursor.position(), 16);
        assert_eq!(tables.pallet_lookup(0, 1), 20);
        assert_eq!(tables.common_lookup(1, 7), 100);
    }

    #[test]
    fn test_table_read_survives_short_pallet() {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(10).unwrap(); // only 1 of 3 entries
        let mut pallet_field = field(Compression::Pallet, 4);
        pallet_field.additional_data_size = 12;

        let mut cursor = Cursor::new(data.as_slice());
        let tables = FieldTables::read(&mut cursor, &[pallet_field]);
        // partial table: entry 0 present, the rest lookup as 0
        assert_eq!(tables.pallet_lookup(0, 0), 10);
        assert_eq!(tables.pallet_lookup(0, 1), 0);
    }
}
