//! Primitive little-endian reads over a positioned cursor
//!
//! Every structure in both format families is little-endian and
//! offset-driven. How many bytes to consume next always depends on metadata
//! read earlier in the same stream. These helpers keep the short-read error
//! uniform so a truncated file reports where in the stream it ran out.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

pub(crate) fn read_u16(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<u16> {
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| Error::TruncatedRead(what.to_string()))
}

pub(crate) fn read_u32(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<u32> {
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::TruncatedRead(what.to_string()))
}

pub(crate) fn read_u64(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<u64> {
    cursor
        .read_u64::<LittleEndian>()
        .map_err(|_| Error::TruncatedRead(what.to_string()))
}

pub(crate) fn read_bytes(cursor: &mut Cursor<&[u8]>, len: usize, what: &str) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| Error::TruncatedRead(what.to_string()))?;
    Ok(buf)
}

/// Read `size` bytes and interpret them as an unsigned little-endian integer.
///
/// Field widths run up to 32 bytes on disk; the full width is always consumed
/// so the stream position stays correct, but only the low 8 bytes contribute
/// to the value (save re-encodes every cell as 4 bytes regardless).
pub(crate) fn read_uint(cursor: &mut Cursor<&[u8]>, size: usize, what: &str) -> Result<u64> {
    let buf = read_bytes(cursor, size, what)?;
    let mut value: u64 = 0;
    for (i, byte) in buf.iter().take(8).enumerate() {
        value |= (*byte as u64) << (8 * i);
    }
    Ok(value)
}
