//! Packed rotation and transform codec
//!
//! MagicaVoxel stores a scene transform as a dictionary with two keys:
//! `_r`, a decimal byte packing an axis-aligned signed permutation
//! rotation, and `_t`, three signed decimal integers of translation.
//!
//! Packed rotation bit layout:
//! - bits 0-1: column of the non-zero entry in row 0
//! - bits 2-3: column of the non-zero entry in row 1 (must differ)
//! - bit 4: sign of row 0 (1 = negative)
//! - bit 5: sign of row 1
//! - bit 6: sign of row 2
//!
//! Row 2's column follows by elimination. The file stores the 3x3 as
//! rows; in memory transforms are column-major [`Mat4`], so pack and
//! unpack swizzle orientation on the way through.

use glam::{Mat4, Vec4};
use tracing::warn;

use crate::error::VoxError;

/// Decode a packed rotation byte into its three rows, or `None` when the
/// two column indices are out of range or collide
fn unpack_rotation_rows(packed: u32) -> Option<[[f32; 3]; 3]> {
    let row0_col = (packed & 3) as usize;
    let row1_col = ((packed >> 2) & 3) as usize;
    if row0_col > 2 || row1_col > 2 || row0_col == row1_col {
        return None;
    }
    let row2_col = 3 - row0_col - row1_col;

    let signs = [
        if packed & (1 << 4) != 0 { -1.0 } else { 1.0 },
        if packed & (1 << 5) != 0 { -1.0 } else { 1.0 },
        if packed & (1 << 6) != 0 { -1.0 } else { 1.0 },
    ];

    let mut rows = [[0.0f32; 3]; 3];
    rows[0][row0_col] = signs[0];
    rows[1][row1_col] = signs[1];
    rows[2][row2_col] = signs[2];
    Some(rows)
}

/// Build a transform from the `_r` / `_t` values of a frame dictionary
///
/// Missing keys default to identity rotation and zero translation.
/// Unparseable values are tolerated the same way, with a warning, so a
/// single odd frame never fails the whole file.
pub(crate) fn transform_from_frame_attrs(
    rotation: Option<&str>,
    translation: Option<&str>,
) -> Mat4 {
    let mut transform = Mat4::IDENTITY;

    if let Some(r) = rotation {
        match r.parse::<u32>().ok().and_then(unpack_rotation_rows) {
            Some(rows) => {
                // rows on disk become columns in memory
                transform.x_axis = Vec4::new(rows[0][0], rows[1][0], rows[2][0], 0.0);
                transform.y_axis = Vec4::new(rows[0][1], rows[1][1], rows[2][1], 0.0);
                transform.z_axis = Vec4::new(rows[0][2], rows[1][2], rows[2][2], 0.0);
            }
            None => warn!(rotation = r, "ignoring unparseable _r rotation"),
        }
    }

    if let Some(t) = translation {
        let mut parts = t.split_whitespace().map(str::parse::<i32>);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => {
                transform.w_axis = Vec4::new(x as f32, y as f32, z as f32, 1.0);
            }
            _ => warn!(translation = t, "ignoring unparseable _t translation"),
        }
    }

    transform
}

/// Pack a transform's 3x3 rotation part back into the 7-bit encoding
///
/// Fails with [`VoxError::UnalignedRotation`] when the rotation part is
/// not a signed permutation matrix, which is the only rotation the
/// format can represent.
pub(crate) fn pack_rotation(transform: &Mat4) -> Result<u8, VoxError> {
    // columns in memory become rows on disk
    let rows = [
        [transform.x_axis.x, transform.y_axis.x, transform.z_axis.x],
        [transform.x_axis.y, transform.y_axis.y, transform.z_axis.y],
        [transform.x_axis.z, transform.y_axis.z, transform.z_axis.z],
    ];

    let mut cols = [0u32; 3];
    let mut negative = [false; 3];
    let mut col_mask = 0u32;
    for (i, row) in rows.iter().enumerate() {
        let mut found = None;
        for (c, &value) in row.iter().enumerate() {
            if value == 1.0 || value == -1.0 {
                if found.is_some() {
                    return Err(VoxError::UnalignedRotation);
                }
                found = Some((c as u32, value < 0.0));
            } else if value != 0.0 {
                return Err(VoxError::UnalignedRotation);
            }
        }
        let (col, neg) = found.ok_or(VoxError::UnalignedRotation)?;
        cols[i] = col;
        negative[i] = neg;
        col_mask |= 1 << col;
    }
    if col_mask != 0b111 {
        return Err(VoxError::UnalignedRotation);
    }

    Ok((cols[0]
        | (cols[1] << 2)
        | u32::from(negative[0]) << 4
        | u32::from(negative[1]) << 5
        | u32::from(negative[2]) << 6) as u8)
}

/// Format the `_t` translation string from a transform's fourth column
///
/// The format stores integer translations; fractional parts truncate
/// toward zero exactly as the editor does.
pub(crate) fn format_translation(transform: &Mat4) -> String {
    format!(
        "{} {} {}",
        transform.w_axis.x as i32,
        transform.w_axis.y as i32,
        transform.w_axis.z as i32
    )
}
