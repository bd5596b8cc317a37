//! Helper functions for reading binary data
//!
//! All reads are bounds-checked against the in-memory buffer; a read that
//! would run past the end fails with [`VoxError::ShortRead`] carrying the
//! offset where the read started, and never produces a partial value.

use std::io::{Cursor, Read};

use crate::error::VoxError;

/// Read a single byte
pub(crate) fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, VoxError> {
    let offset = cursor.position();
    let mut buf = [0u8; 1];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| VoxError::ShortRead(offset))?;
    Ok(buf[0])
}

/// Read a 32-bit little-endian unsigned integer
pub(crate) fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, VoxError> {
    let offset = cursor.position();
    let mut buf = [0u8; 4];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| VoxError::ShortRead(offset))?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a 32-bit little-endian signed integer
pub(crate) fn read_i32(cursor: &mut Cursor<&[u8]>) -> Result<i32, VoxError> {
    read_u32(cursor).map(|v| v as i32)
}

/// Read a four-byte chunk id
pub(crate) fn read_chunk_id(cursor: &mut Cursor<&[u8]>) -> Result<[u8; 4], VoxError> {
    let offset = cursor.position();
    let mut buf = [0u8; 4];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| VoxError::ShortRead(offset))?;
    Ok(buf)
}

/// Read a raw byte range
pub(crate) fn read_bytes(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>, VoxError> {
    let offset = cursor.position();
    let data = *cursor.get_ref();
    let start = offset as usize;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or(VoxError::ShortRead(offset))?;
    cursor.set_position(end as u64);
    Ok(data[start..end].to_vec())
}
