//! Error types for .vox parsing, writing and merging

use thiserror::Error;

/// Errors that can occur when parsing, writing or merging .vox scenes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoxError {
    /// Buffer exhausted mid-field
    #[error("Unexpected end of buffer at offset 0x{0:08X}")]
    ShortRead(u64),

    /// File does not start with "VOX "
    #[error("Invalid magic bytes (expected 'VOX ')")]
    BadMagic,

    /// File version outside the supported range
    #[error("Unsupported .vox version: {0} (supported {min}-{max})", min = crate::MIN_FILE_VERSION, max = crate::MAX_FILE_VERSION)]
    UnsupportedVersion(u32),

    /// Dictionary exceeds the 4096-byte buffer or 256-pair limit
    #[error("Dictionary exceeds {bytes} bytes or {pairs} pairs", bytes = crate::MAX_DICT_BUFFER_SIZE, pairs = crate::MAX_DICT_PAIRS)]
    DictOverflow,

    /// Chunk content inconsistent with its schema
    #[error("Malformed {id} chunk at offset 0x{offset:08X}")]
    MalformedChunk { id: String, offset: u64 },

    /// Scene-graph traversal revisited a node
    #[error("Scene graph cycle detected at node {0}")]
    CyclicGraph(u32),

    /// A node, model or layer id is out of range
    #[error("Dangling {kind} reference: {id}")]
    DanglingReference { kind: &'static str, id: u32 },

    /// A source scene could not be merged
    #[error("Failed to merge source scene {0}")]
    MergeFailed(usize),

    /// Two keyframes share the same frame index within one set
    #[error("Duplicate keyframe at frame {0}")]
    DuplicateKeyframe(u32),

    /// A transform's rotation is not a voxel-axis-aligned signed permutation
    #[error("Rotation is not an axis-aligned signed permutation matrix")]
    UnalignedRotation,

    /// A model dimension exceeds the writable maximum
    #[error("Model dimension {0} exceeds writable maximum of {max}", max = crate::MAX_WRITE_MODEL_DIMENSION)]
    ModelTooLarge(u32),
}
