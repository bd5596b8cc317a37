//! .vox file parser
//!
//! The reader makes a single pass over the chunk stream, collecting raw
//! tables (models, scene nodes, layers, palette, materials), then folds
//! the node graph into placed instances and normalizes the result:
//! palette display-order remap, duplicate-model elimination, empty-model
//! compaction and a stable sort of instances by model index. No partial
//! scene ever escapes on error.

use std::io::Cursor;

use glam::Mat4;
use tracing::{debug, warn};

use crate::dict::VoxDict;
use crate::error::VoxError;
use crate::scene::transform::transform_from_frame_attrs;
use crate::scene::{
    Camera, Group, Instance, Layer, Material, Model, ModelKeyframe, Palette, ReadFlags, Rgba,
    Scene, TransformKeyframe, invert_index_map, DEFAULT_PALETTE_BYTES,
};
use crate::{
    MAX_FILE_VERSION, MAX_MODEL_DIMENSION, MIN_FILE_VERSION, NO_LAYER, VOX_MAGIC, chunks,
};

pub(crate) mod helpers;
mod node;


use helpers::{read_bytes, read_chunk_id, read_i32, read_u32};
use node::{Flattener, GroupNode, NodeTable, SceneNode, ShapeNode, TransformNode};

/// Parse a .vox buffer into a [`Scene`] with default flags
///
/// Defaults drop keyframes and material chunks, flatten the group
/// hierarchy, deduplicate content-identical models and compact empty
/// ones. Use [`read_scene_with_flags`] to retain any of those.
pub fn read_scene(buffer: &[u8]) -> Result<Scene, VoxError> {
    read_scene_with_flags(buffer, ReadFlags::default())
}

/// Parse a .vox buffer into a [`Scene`]
///
/// # Arguments
/// * `buffer` - The complete file contents
/// * `flags` - What to retain, see [`ReadFlags`]
///
/// # Returns
/// * `Ok(Scene)` - Parsed scene
/// * `Err(VoxError)` - Parse error; nothing partial is returned
pub fn read_scene_with_flags(buffer: &[u8], flags: ReadFlags) -> Result<Scene, VoxError> {
    let mut cursor = Cursor::new(buffer);

    let magic = read_chunk_id(&mut cursor)?;
    if &magic != VOX_MAGIC {
        return Err(VoxError::BadMagic);
    }
    let file_version = read_u32(&mut cursor)?;
    if !(MIN_FILE_VERSION..=MAX_FILE_VERSION).contains(&file_version) {
        return Err(VoxError::UnsupportedVersion(file_version));
    }

    let mut state = ParseState::new(flags);
    let buffer_len = buffer.len() as u64;
    while cursor.position() < buffer_len {
        let header_offset = cursor.position();
        let id = read_chunk_id(&mut cursor)?;
        let content_size = u64::from(read_u32(&mut cursor)?);
        // children are parsed by this loop, not recursively
        let _children_size = read_u32(&mut cursor)?;
        let content_start = cursor.position();
        let content_end = content_start + content_size;
        if content_end > buffer_len {
            return Err(VoxError::ShortRead(content_start));
        }

        state.handle_chunk(&mut cursor, id, content_size, header_offset)?;
        cursor.set_position(content_end);
    }

    state.finish(file_version)
}

fn malformed(id: [u8; 4], offset: u64) -> VoxError {
    VoxError::MalformedChunk {
        id: String::from_utf8_lossy(&id).into_owned(),
        offset,
    }
}

/// Accumulated raw tables from the single chunk pass
struct ParseState {
    flags: ReadFlags,
    pending_size: Option<(u32, u32, u32)>,
    models: Vec<Model>,
    table: NodeTable,
    layers: Vec<Layer>,
    disk_palette: [u8; 1024],
    imap: Option<[u8; 256]>,
    materials: Vec<Material>,
    legacy_materials: Vec<Vec<u8>>,
    cameras: Vec<Camera>,
    objects: Vec<VoxDict>,
    color_names: Vec<String>,
    meta: Option<VoxDict>,
}

impl ParseState {
    fn new(flags: ReadFlags) -> Self {
        Self {
            flags,
            pending_size: None,
            models: Vec::new(),
            table: NodeTable::default(),
            layers: Vec::new(),
            disk_palette: DEFAULT_PALETTE_BYTES,
            imap: None,
            materials: Vec::new(),
            legacy_materials: Vec::new(),
            cameras: Vec::new(),
            objects: Vec::new(),
            color_names: Vec::new(),
            meta: None,
        }
    }

    fn handle_chunk(
        &mut self,
        cursor: &mut Cursor<&[u8]>,
        id: [u8; 4],
        content_size: u64,
        offset: u64,
    ) -> Result<(), VoxError> {
        let materials_wanted = self.flags.contains(ReadFlags::MATERIALS);
        match id {
            chunks::MAIN => {
                if content_size != 0 {
                    return Err(malformed(id, offset));
                }
                Ok(())
            }
            chunks::SIZE => self.read_size(cursor, content_size, offset),
            chunks::XYZI => self.read_xyzi(cursor, content_size, offset),
            chunks::RGBA => self.read_rgba(cursor, content_size, offset),
            chunks::IMAP => self.read_imap(cursor, content_size, offset),
            chunks::NTRN => self.read_transform_node(cursor),
            chunks::NGRP => self.read_group_node(cursor),
            chunks::NSHP => self.read_shape_node(cursor),
            chunks::LAYR => self.read_layer(cursor, offset),
            chunks::MATL if materials_wanted => {
                let material_id = read_u32(cursor)?;
                let attrs = VoxDict::read(cursor)?;
                self.materials.push(Material {
                    id: material_id,
                    attrs,
                });
                Ok(())
            }
            chunks::MATT if materials_wanted => {
                let payload = read_bytes(cursor, content_size as usize)?;
                self.legacy_materials.push(payload);
                Ok(())
            }
            chunks::RCAM if materials_wanted => {
                let camera_id = read_u32(cursor)?;
                let attrs = VoxDict::read(cursor)?;
                self.cameras.push(Camera {
                    id: camera_id,
                    attrs,
                });
                Ok(())
            }
            chunks::ROBJ if materials_wanted => {
                let attrs = VoxDict::read(cursor)?;
                self.objects.push(attrs);
                Ok(())
            }
            chunks::NOTE if materials_wanted => {
                let num_names = read_u32(cursor)?;
                for _ in 0..num_names {
                    let len = read_u32(cursor)?;
                    let bytes = read_bytes(cursor, len as usize)?;
                    self.color_names
                        .push(String::from_utf8_lossy(&bytes).into_owned());
                }
                Ok(())
            }
            chunks::META => {
                self.meta = Some(VoxDict::read(cursor)?);
                Ok(())
            }
            _ => {
                debug!(
                    id = %String::from_utf8_lossy(&id),
                    size = content_size,
                    "skipping unhandled chunk"
                );
                Ok(())
            }
        }
    }

    fn read_size(
        &mut self,
        cursor: &mut Cursor<&[u8]>,
        content_size: u64,
        offset: u64,
    ) -> Result<(), VoxError> {
        if content_size != 12 {
            return Err(malformed(chunks::SIZE, offset));
        }
        let size_x = read_u32(cursor)?;
        let size_y = read_u32(cursor)?;
        let size_z = read_u32(cursor)?;
        if size_x > MAX_MODEL_DIMENSION
            || size_y > MAX_MODEL_DIMENSION
            || size_z > MAX_MODEL_DIMENSION
        {
            return Err(malformed(chunks::SIZE, offset));
        }
        self.pending_size = Some((size_x, size_y, size_z));
        Ok(())
    }

    fn read_xyzi(
        &mut self,
        cursor: &mut Cursor<&[u8]>,
        content_size: u64,
        offset: u64,
    ) -> Result<(), VoxError> {
        let (size_x, size_y, size_z) = self
            .pending_size
            .ok_or_else(|| malformed(chunks::XYZI, offset))?;
        let num_voxels = read_u32(cursor)?;
        if 4 + u64::from(num_voxels) * 4 > content_size {
            return Err(malformed(chunks::XYZI, offset));
        }

        // an all-empty placeholder when num_voxels is 0; compacted later
        let mut model = Model::new(size_x, size_y, size_z);
        let packed = read_bytes(cursor, num_voxels as usize * 4)?;
        for voxel in packed.chunks_exact(4) {
            let (x, y, z, color_index) = (
                u32::from(voxel[0]),
                u32::from(voxel[1]),
                u32::from(voxel[2]),
                voxel[3],
            );
            if x >= size_x || y >= size_y || z >= size_z {
                return Err(malformed(chunks::XYZI, offset));
            }
            model.set_voxel(x, y, z, color_index);
        }
        model.rehash();
        self.models.push(model);
        Ok(())
    }

    fn read_rgba(
        &mut self,
        cursor: &mut Cursor<&[u8]>,
        content_size: u64,
        offset: u64,
    ) -> Result<(), VoxError> {
        if content_size != 1024 {
            return Err(malformed(chunks::RGBA, offset));
        }
        let bytes = read_bytes(cursor, 1024)?;
        self.disk_palette.copy_from_slice(&bytes);
        Ok(())
    }

    fn read_imap(
        &mut self,
        cursor: &mut Cursor<&[u8]>,
        content_size: u64,
        offset: u64,
    ) -> Result<(), VoxError> {
        if content_size != 256 {
            return Err(malformed(chunks::IMAP, offset));
        }
        let bytes = read_bytes(cursor, 256)?;
        let mut imap = [0u8; 256];
        imap.copy_from_slice(&bytes);
        self.imap = Some(imap);
        Ok(())
    }

    fn read_transform_node(&mut self, cursor: &mut Cursor<&[u8]>) -> Result<(), VoxError> {
        let node_id = read_u32(cursor)?;
        let attrs = VoxDict::read(cursor)?;
        let name = attrs.get("_name").map(String::from);
        let hidden = attrs.get_bool("_hidden").unwrap_or(false);

        let child_node_id = read_u32(cursor)?;
        let reserved_id = read_u32(cursor)?;
        if reserved_id != u32::MAX {
            warn!(node_id, reserved_id, "nonstandard reserved id in nTRN");
        }
        let layer_id = read_u32(cursor)?;
        let num_frames = read_u32(cursor)?;

        let (transform, keyframes) = read_transform_frames(cursor, num_frames)?;
        self.table.set(
            node_id,
            SceneNode::Transform(TransformNode {
                name,
                transform,
                child_node_id,
                layer_id,
                hidden,
                keyframes,
            }),
        );
        Ok(())
    }

    fn read_group_node(&mut self, cursor: &mut Cursor<&[u8]>) -> Result<(), VoxError> {
        let node_id = read_u32(cursor)?;
        let _attrs = VoxDict::read(cursor)?;
        let num_children = read_u32(cursor)?;

        let first_child_index = self.table.child_ids.len() as u32;
        for _ in 0..num_children {
            let child_id = read_u32(cursor)?;
            self.table.child_ids.push(child_id);
        }
        self.table.set(
            node_id,
            SceneNode::Group(GroupNode {
                first_child_index,
                num_children,
            }),
        );
        Ok(())
    }

    fn read_shape_node(&mut self, cursor: &mut Cursor<&[u8]>) -> Result<(), VoxError> {
        let node_id = read_u32(cursor)?;
        let _attrs = VoxDict::read(cursor)?;
        let num_models = read_u32(cursor)?;

        let mut entries = Vec::with_capacity(num_models.min(64) as usize);
        let mut last_frame = None;
        for _ in 0..num_models {
            let model_id = read_u32(cursor)?;
            let attrs = VoxDict::read(cursor)?;
            let frame = attrs.get_u32("_f").unwrap_or(0);
            check_frame_order(&mut last_frame, frame, "nSHP", cursor.position())?;
            entries.push(ModelKeyframe {
                frame,
                model_index: model_id,
            });
        }

        // a shape without any model is dropped at flatten time
        let model_id = entries.first().map_or(u32::MAX, |e| e.model_index);
        let keyframes = if entries.len() > 1 { entries } else { Vec::new() };
        self.table.set(
            node_id,
            SceneNode::Shape(ShapeNode {
                model_id,
                keyframes,
            }),
        );
        Ok(())
    }

    fn read_layer(&mut self, cursor: &mut Cursor<&[u8]>, offset: u64) -> Result<(), VoxError> {
        let layer_id = read_i32(cursor)?;
        let attrs = VoxDict::read(cursor)?;
        let reserved_id = read_i32(cursor)?;
        if reserved_id != -1 {
            warn!(layer_id, reserved_id, "nonstandard reserved id in LAYR");
        }
        if layer_id < 0 {
            return Err(malformed(chunks::LAYR, offset));
        }

        let index = layer_id as usize;
        if index >= self.layers.len() {
            self.layers.resize_with(index + 1, Layer::default);
        }
        let layer = &mut self.layers[index];
        layer.name = attrs.get("_name").map(String::from);
        layer.hidden = attrs.get_bool("_hidden").unwrap_or(false);
        if let Some(color) = attrs.get("_color").and_then(parse_layer_color) {
            layer.color = color;
        }
        Ok(())
    }

    /// Fold the raw tables into the final scene
    fn finish(mut self, file_version: u32) -> Result<Scene, VoxError> {
        let keep_empty = self.flags.contains(ReadFlags::KEEP_EMPTY_MODELS);
        let empty: Vec<bool> = self
            .models
            .iter()
            .map(|m| m.solid_voxel_count() == 0)
            .collect();

        // fold the node graph, or synthesize the single-model default
        let (mut instances, groups) = if !self.table.is_empty() {
            let out = Flattener {
                table: &self.table,
                models: &self.models,
                empty: &empty,
                keep_groups: self.flags.contains(ReadFlags::KEEP_GROUPS),
                keep_empty,
                keyframes: self.flags.contains(ReadFlags::KEYFRAMES),
            }
            .flatten()?;
            (out.instances, out.groups)
        } else {
            let mut instances = Vec::new();
            if self.models.len() == 1 && (keep_empty || !empty[0]) {
                instances.push(Instance {
                    group_index: 0,
                    layer_index: NO_LAYER,
                    ..Instance::default()
                });
            }
            (instances, vec![Group::default()])
        };

        // model keyframes may reference models the flattener never checked
        for instance in &instances {
            for keyframe in &instance.model_keyframes {
                if keyframe.model_index as usize >= self.models.len() {
                    return Err(VoxError::DanglingReference {
                        kind: "model",
                        id: keyframe.model_index,
                    });
                }
            }
        }

        // synthesize a layer when the file carried none
        if self.layers.is_empty() {
            self.layers.push(Layer::default());
            for instance in &mut instances {
                instance.layer_index = 0;
            }
        } else {
            for instance in &mut instances {
                if instance.layer_index == NO_LAYER {
                    instance.layer_index = 0;
                } else if instance.layer_index as usize >= self.layers.len() {
                    return Err(VoxError::DanglingReference {
                        kind: "layer",
                        id: instance.layer_index,
                    });
                }
            }
        }

        // display-order remap, then rotate the palette into memory order
        let mut palette = Palette::from_disk_bytes(&self.disk_palette);
        if let Some(imap) = self.imap {
            palette.reorder_for_display(&imap);
            let inverse = invert_index_map(&imap);
            for model in &mut self.models {
                for voxel in &mut model.voxels {
                    *voxel = inverse[usize::from(*voxel)].wrapping_add(1);
                }
                model.rehash();
            }
        }
        palette.rotate_from_disk();

        let models = self.compact_models(&empty, &mut instances);

        instances.sort_by_key(|instance| instance.model_index);

        Ok(Scene {
            file_version,
            models,
            instances,
            layers: self.layers,
            groups,
            palette,
            materials: self.materials,
            legacy_materials: self.legacy_materials,
            cameras: self.cameras,
            objects: self.objects,
            color_names: self.color_names,
            meta: self.meta,
        })
    }

    /// Deduplicate content-identical models and compact empty slots,
    /// rewriting every instance reference through the combined remap
    fn compact_models(&mut self, empty: &[bool], instances: &mut [Instance]) -> Vec<Model> {
        let keep_empty = self.flags.contains(ReadFlags::KEEP_EMPTY_MODELS);
        let keep_duplicates = self.flags.contains(ReadFlags::KEEP_DUPLICATE_MODELS);

        let mut canonical: Vec<u32> = (0..self.models.len() as u32).collect();
        if !keep_duplicates {
            let mut buckets: hashbrown::HashMap<u32, Vec<usize>> = hashbrown::HashMap::new();
            for i in 0..self.models.len() {
                let bucket = buckets.entry(self.models[i].voxel_hash).or_default();
                let duplicate_of = bucket
                    .iter()
                    .copied()
                    .find(|&j| self.models[j].content_eq(&self.models[i]));
                match duplicate_of {
                    Some(j) => canonical[i] = j as u32,
                    None => bucket.push(i),
                }
            }
        }

        let mut final_index = vec![u32::MAX; self.models.len()];
        let mut models = Vec::new();
        for (i, model) in self.models.drain(..).enumerate() {
            if canonical[i] as usize != i {
                continue;
            }
            if empty[i] && !keep_empty {
                continue;
            }
            final_index[i] = models.len() as u32;
            models.push(model);
        }
        let remap = |id: u32| final_index[canonical[id as usize] as usize];

        for instance in instances.iter_mut() {
            instance.model_index = remap(instance.model_index);
            debug_assert_ne!(instance.model_index, u32::MAX);
            // keyframes pointing at a compacted-away model are dropped
            for keyframe in &mut instance.model_keyframes {
                keyframe.model_index = remap(keyframe.model_index);
            }
            instance
                .model_keyframes
                .retain(|keyframe| keyframe.model_index != u32::MAX);
        }

        models
    }
}

/// Read the frame dictionaries of an nTRN chunk
///
/// The first frame is the static transform. When more than one frame is
/// present the whole set doubles as the transform keyframe table. Zero
/// frames are tolerated as an identity static transform.
fn read_transform_frames(
    cursor: &mut Cursor<&[u8]>,
    num_frames: u32,
) -> Result<(Mat4, Vec<TransformKeyframe>), VoxError> {
    let mut frames = Vec::with_capacity(num_frames.min(64) as usize);
    let mut last_frame = None;
    for _ in 0..num_frames {
        let attrs = VoxDict::read(cursor)?;
        let transform = transform_from_frame_attrs(attrs.get("_r"), attrs.get("_t"));
        let frame = attrs.get_u32("_f").unwrap_or(0);
        check_frame_order(&mut last_frame, frame, "nTRN", cursor.position())?;
        frames.push(TransformKeyframe { frame, transform });
    }

    let transform = frames.first().map_or(Mat4::IDENTITY, |f| f.transform);
    let keyframes = if frames.len() > 1 { frames } else { Vec::new() };
    Ok((transform, keyframes))
}

/// Enforce strictly increasing `_f` frame indices within one set
fn check_frame_order(
    last_frame: &mut Option<u32>,
    frame: u32,
    chunk: &str,
    offset: u64,
) -> Result<(), VoxError> {
    match *last_frame {
        Some(prev) if frame == prev => return Err(VoxError::DuplicateKeyframe(frame)),
        Some(prev) if frame < prev => {
            return Err(VoxError::MalformedChunk {
                id: chunk.to_string(),
                offset,
            });
        }
        _ => {}
    }
    *last_frame = Some(frame);
    Ok(())
}

/// Parse a LAYR `_color` value of three decimal components
fn parse_layer_color(value: &str) -> Option<Rgba> {
    let mut parts = value.split_whitespace().map(str::parse::<u8>);
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) => Some(Rgba::new(r, g, b, 255)),
        _ => None,
    }
}
