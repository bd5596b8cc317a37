//! Nether-Vox: MagicaVoxel .vox scene format reader/writer for Nethercore
//!
//! This crate provides a pure Rust reader and writer for the MagicaVoxel
//! .vox format, designed for use with Nethercore's asset pipelines. It
//! parses the full chunked scene file (models, scene graph, layers,
//! palette, materials, cameras and keyframe animation), flattens the
//! scene graph into placed model instances, and can merge multiple scenes
//! into one while reconciling their palettes.
//!
//! # Key Features
//!
//! - **Pure Rust**: No external C/C++ dependencies
//! - **Full scene support**: transform/group/shape nodes, layers, keyframes
//! - **Symmetric writer**: canonical chunk order, byte-stable output
//! - **Scene merging**: best-effort palette fit or caller-provided palette
//! - **Keyframe sampling**: last-known-good evaluation at any frame
//!
//! # .vox Format Overview
//!
//! A .vox file is a RIFF-like tree of tagged chunks below a single MAIN
//! chunk:
//! - SIZE/XYZI pairs holding voxel model grids
//! - nTRN/nGRP/nSHP scene-graph nodes with string dictionaries
//! - RGBA palette (stored rotated by one versus memory), optional IMAP
//!   display-order remap
//! - LAYR layers, MATL/MATT materials, rCAM cameras, NOTE color names
//!
//! # Usage
//!
//! ```ignore
//! use nether_vox::{read_scene, write_scene};
//!
//! let bytes = std::fs::read("scene.vox").unwrap();
//! let scene = read_scene(&bytes).unwrap();
//!
//! println!("models: {}", scene.models.len());
//! println!("instances: {}", scene.instances.len());
//!
//! let out = write_scene(&scene).unwrap();
//! std::fs::write("canonical.vox", out).unwrap();
//! ```
//!
//! # Format Reference
//!
//! - MagicaVoxel file format description (ephtracy/voxel-model)
//! - <https://github.com/ephtracy/voxel-model/blob/master/MagicaVoxel-file-format-vox.txt>

mod anim;
mod dict;
mod error;
mod merge;
mod parser;
mod scene;
mod writer;

pub use anim::{
    sample_group_transform_local, sample_model, sample_transform_global, sample_transform_local,
};
pub use dict::VoxDict;
pub use error::VoxError;
pub use merge::merge_scenes;
pub use parser::{read_scene, read_scene_with_flags};
pub use scene::{
    Camera, Group, Instance, Layer, Material, Model, ModelKeyframe, Palette, ReadFlags, Rgba,
    Scene, TransformKeyframe,
};
pub use writer::write_scene;

// =============================================================================
// Constants
// =============================================================================

/// File magic, including the trailing space
pub const VOX_MAGIC: &[u8; 4] = b"VOX ";

/// Oldest file version we accept
pub const MIN_FILE_VERSION: u32 = 150;

/// Newest file version we accept
pub const MAX_FILE_VERSION: u32 = 200;

/// Version stamped on written files
pub const WRITE_FILE_VERSION: u32 = 150;

/// Maximum number of key/value pairs in a chunk dictionary
pub const MAX_DICT_PAIRS: u32 = 256;

/// Maximum total string bytes in a chunk dictionary (terminators included)
pub const MAX_DICT_BUFFER_SIZE: u32 = 4096;

/// Format limit on any model dimension
pub const MAX_MODEL_DIMENSION: u32 = 256;

/// Dimension limit the writer enforces for widest editor compatibility
pub const MAX_WRITE_MODEL_DIMENSION: u32 = 126;

/// Sentinel group index for instances/groups outside any group
pub const NO_GROUP: u32 = u32::MAX;

/// Sentinel layer id meaning "no layer assigned"
pub const NO_LAYER: u32 = u32::MAX;

// =============================================================================
// Chunk identifiers
// =============================================================================

/// Four-byte chunk ids, compared as byte arrays so no integer
/// reinterpretation is ever needed
pub mod chunks {
    /// Root chunk; all other chunks are its children
    pub const MAIN: [u8; 4] = *b"MAIN";
    /// Model dimensions, precedes XYZI
    pub const SIZE: [u8; 4] = *b"SIZE";
    /// Sparse voxel list for one model
    pub const XYZI: [u8; 4] = *b"XYZI";
    /// 256-color palette
    pub const RGBA: [u8; 4] = *b"RGBA";
    /// Display-order palette index map
    pub const IMAP: [u8; 4] = *b"IMAP";
    /// Transform scene node
    pub const NTRN: [u8; 4] = *b"nTRN";
    /// Group scene node
    pub const NGRP: [u8; 4] = *b"nGRP";
    /// Shape scene node
    pub const NSHP: [u8; 4] = *b"nSHP";
    /// Layer definition
    pub const LAYR: [u8; 4] = *b"LAYR";
    /// Material definition
    pub const MATL: [u8; 4] = *b"MATL";
    /// Legacy material definition
    pub const MATT: [u8; 4] = *b"MATT";
    /// Render camera
    pub const RCAM: [u8; 4] = *b"rCAM";
    /// Palette color names
    pub const NOTE: [u8; 4] = *b"NOTE";
    /// Rendering object attributes
    pub const ROBJ: [u8; 4] = *b"rOBJ";
    /// Animation range metadata
    pub const META: [u8; 4] = *b"META";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(VOX_MAGIC, b"VOX ");
        assert!(MIN_FILE_VERSION <= WRITE_FILE_VERSION);
        assert!(WRITE_FILE_VERSION <= MAX_FILE_VERSION);
        assert!(MAX_WRITE_MODEL_DIMENSION <= MAX_MODEL_DIMENSION);
    }

    #[test]
    fn test_chunk_ids() {
        assert_eq!(&chunks::MAIN, b"MAIN");
        assert_eq!(&chunks::NTRN, b"nTRN");
        assert_eq!(&chunks::RCAM, b"rCAM");
    }
}
