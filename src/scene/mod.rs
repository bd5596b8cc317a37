//! Scene data structures
//!
//! A parsed scene owns everything: models, placed instances, layers,
//! groups, the palette and the round-tripped material/camera metadata.
//! Dropping the scene releases it all at once.

mod material;
mod model;
mod palette;
pub(crate) mod transform;

pub use material::{Camera, Material};
pub use model::Model;
pub use palette::{Palette, Rgba};

pub(crate) use palette::{DEFAULT_PALETTE_BYTES, invert_index_map};

use glam::Mat4;

use crate::dict::VoxDict;
use crate::{NO_GROUP, NO_LAYER, WRITE_FILE_VERSION};

/// A keyframe carrying a local transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformKeyframe {
    /// Frame index; strictly increasing within a keyframe set
    pub frame: u32,
    /// Local transform at this frame
    pub transform: Mat4,
}

/// A keyframe selecting which model a shape displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelKeyframe {
    /// Frame index; strictly increasing within a keyframe set
    pub frame: u32,
    /// Model selected from this frame onward
    pub model_index: u32,
}

/// An individual placement of a model within the scene
///
/// By default the transform is in world space, produced by the scene
/// flattener. When a scene is read with [`ReadFlags::KEEP_GROUPS`] the
/// transform is local to the instance's group chain instead; compose it
/// with [`crate::sample_transform_global`].
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub name: Option<String>,
    pub transform: Mat4,
    /// Index into [`Scene::models`]
    pub model_index: u32,
    /// Index into [`Scene::layers`]
    pub layer_index: u32,
    /// Index into [`Scene::groups`], or [`NO_GROUP`]
    pub group_index: u32,
    pub hidden: bool,
    /// Transform animation, empty unless read with [`ReadFlags::KEYFRAMES`]
    pub transform_keyframes: Vec<TransformKeyframe>,
    /// Model-selection animation, empty unless read with [`ReadFlags::KEYFRAMES`]
    pub model_keyframes: Vec<ModelKeyframe>,
}

impl Default for Instance {
    fn default() -> Self {
        Self {
            name: None,
            transform: Mat4::IDENTITY,
            model_index: 0,
            layer_index: 0,
            group_index: NO_GROUP,
            hidden: false,
            transform_keyframes: Vec::new(),
            model_keyframes: Vec::new(),
        }
    }
}

/// A named visibility grouping of instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub name: Option<String>,
    pub hidden: bool,
    pub color: Rgba,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            name: None,
            hidden: false,
            color: Rgba::new(255, 255, 255, 255),
        }
    }
}

/// A non-leaf scene-graph node collecting child transforms
///
/// Groups form a forest numbered parent-first: a group's
/// `parent_group_index` is always [`NO_GROUP`] or strictly less than its
/// own index.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: Option<String>,
    /// Transform local to the parent group
    pub transform: Mat4,
    /// Index of the enclosing group, or [`NO_GROUP`] for a root
    pub parent_group_index: u32,
    pub layer_index: u32,
    pub hidden: bool,
    /// Transform animation, empty unless read with [`ReadFlags::KEYFRAMES`]
    pub transform_keyframes: Vec<TransformKeyframe>,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            name: None,
            transform: Mat4::IDENTITY,
            parent_group_index: NO_GROUP,
            layer_index: NO_LAYER,
            hidden: false,
            transform_keyframes: Vec::new(),
        }
    }
}

/// Options controlling what [`crate::read_scene_with_flags`] retains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadFlags(u32);

impl ReadFlags {
    /// Keep zero-voxel models instead of compacting them away
    pub const KEEP_EMPTY_MODELS: Self = Self(1 << 0);
    /// Keep content-identical models instead of deduplicating
    pub const KEEP_DUPLICATE_MODELS: Self = Self(1 << 1);
    /// Preserve the group hierarchy; instance transforms stay local
    pub const KEEP_GROUPS: Self = Self(1 << 2);
    /// Retain transform and model-selection keyframes
    pub const KEYFRAMES: Self = Self(1 << 3);
    /// Parse material, camera and rendering-object chunks
    pub const MATERIALS: Self = Self(1 << 4);

    /// Create flags from raw u32
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Check if flag is set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Combine flags
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for ReadFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for ReadFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// A complete parsed or constructed .vox scene
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Version stamped in the source file, 150-200
    pub file_version: u32,
    /// Voxel model grids, indexed by instance `model_index`
    pub models: Vec<Model>,
    /// Placed model instances, sorted by ascending `model_index`
    pub instances: Vec<Instance>,
    /// Visibility layers
    pub layers: Vec<Layer>,
    /// Group forest, parent-first
    pub groups: Vec<Group>,
    /// Palette in memory (display) order; index 0 is transparent
    pub palette: Palette,
    /// MATL materials (requires [`ReadFlags::MATERIALS`])
    pub materials: Vec<Material>,
    /// Raw legacy MATT chunk payloads, round-tripped verbatim
    pub legacy_materials: Vec<Vec<u8>>,
    /// rCAM render cameras (requires [`ReadFlags::MATERIALS`])
    pub cameras: Vec<Camera>,
    /// rOBJ rendering objects (requires [`ReadFlags::MATERIALS`])
    pub objects: Vec<VoxDict>,
    /// NOTE palette-row annotations
    pub color_names: Vec<String>,
    /// META chunk dictionary, round-tripped verbatim
    pub meta: Option<VoxDict>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            file_version: WRITE_FILE_VERSION,
            models: Vec::new(),
            instances: Vec::new(),
            layers: Vec::new(),
            groups: Vec::new(),
            palette: Palette::default(),
            materials: Vec::new(),
            legacy_materials: Vec::new(),
            cameras: Vec::new(),
            objects: Vec::new(),
            color_names: Vec::new(),
            meta: None,
        }
    }
}

impl Scene {
    /// Animation frame range from the META chunk, if the file carried one
    pub fn anim_range(&self) -> Option<(u32, u32)> {
        let meta = self.meta.as_ref()?;
        Some((
            meta.get_u32("_anim_range_start")?,
            meta.get_u32("_anim_range_end")?,
        ))
    }
}
