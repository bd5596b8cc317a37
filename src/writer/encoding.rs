//! Low-level byte emission helpers
//!
//! The writer accumulates the whole file into one `Vec<u8>`. Chunk
//! payloads are built into their own buffer first so the header's
//! content size is always exact, and the MAIN chunk's child size is
//! back-patched once the total is known.

use crate::dict::VoxDict;
use crate::error::VoxError;
use crate::scene::TransformKeyframe;
use crate::scene::transform::{format_translation, pack_rotation};
use crate::chunks;

pub(crate) fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Rewrite an already-emitted 32-bit little-endian location
pub(crate) fn patch_u32(out: &mut [u8], offset: usize, value: u32) {
    out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Emit a complete chunk: id, content size, zero child size, content
pub(crate) fn push_chunk(out: &mut Vec<u8>, id: [u8; 4], content: &[u8]) {
    out.extend_from_slice(&id);
    write_u32(out, content.len() as u32);
    write_u32(out, 0);
    out.extend_from_slice(content);
}

/// Build the `_r`/`_t` frame dictionary for a transform
pub(crate) fn frame_dict(
    transform: &glam::Mat4,
    frame: Option<u32>,
) -> Result<VoxDict, VoxError> {
    let mut dict = VoxDict::new();
    dict.insert("_r", &pack_rotation(transform)?.to_string());
    dict.insert("_t", &format_translation(transform));
    if let Some(frame) = frame {
        dict.insert("_f", &frame.to_string());
    }
    Ok(dict)
}

/// Emit one nTRN chunk
///
/// `frames` must hold at least one dictionary; the format requires
/// `num_frames >= 1`. The reserved id is always the canonical -1.
pub(crate) fn push_ntrn_chunk(
    out: &mut Vec<u8>,
    node_id: u32,
    child_node_id: u32,
    name: Option<&str>,
    hidden: bool,
    layer_id: u32,
    frames: &[VoxDict],
) {
    let mut attrs = VoxDict::new();
    if let Some(name) = name {
        attrs.insert("_name", name);
    }
    if hidden {
        attrs.insert("_hidden", "1");
    }

    let mut content = Vec::new();
    write_u32(&mut content, node_id);
    attrs.write_to(&mut content);
    write_u32(&mut content, child_node_id);
    write_u32(&mut content, u32::MAX);
    write_u32(&mut content, layer_id);
    write_u32(&mut content, frames.len() as u32);
    for frame in frames {
        frame.write_to(&mut content);
    }
    push_chunk(out, chunks::NTRN, &content);
}

/// Build the frame dictionaries of an animated or static transform node
pub(crate) fn transform_frames(
    static_world: &glam::Mat4,
    keyframes: &[TransformKeyframe],
    parent_world: &glam::Mat4,
) -> Result<Vec<VoxDict>, VoxError> {
    if keyframes.is_empty() {
        return Ok(vec![frame_dict(static_world, None)?]);
    }
    keyframes
        .iter()
        .map(|keyframe| frame_dict(&(*parent_world * keyframe.transform), Some(keyframe.frame)))
        .collect()
}
