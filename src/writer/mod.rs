//! .vox file writer
//!
//! Emits a canonical chunk sequence that MagicaVoxel loads directly:
//! per-model SIZE/XYZI pairs, a root transform and group, one shape node
//! per model, one transform node per instance, then palette, layers and
//! the round-tripped metadata chunks. Node ids are assigned
//! deterministically, so semantically equal scenes serialize to
//! byte-identical buffers.

use glam::Mat4;

use crate::error::VoxError;
use crate::scene::Scene;
use crate::{MAX_WRITE_MODEL_DIMENSION, NO_GROUP, NO_LAYER, VOX_MAGIC, WRITE_FILE_VERSION, chunks};

mod encoding;

#[cfg(test)]
mod tests;

use encoding::{
    frame_dict, patch_u32, push_chunk, push_ntrn_chunk, transform_frames, write_i32, write_u32,
};

/// Serialize a scene to an in-memory .vox buffer
///
/// Writing is total for any scene the reader produces. The two logical
/// failures are caller-constructed scenes with a non-axis-aligned
/// rotation ([`VoxError::UnalignedRotation`]) or a model dimension over
/// 126 ([`VoxError::ModelTooLarge`]), the limit old editors load.
pub fn write_scene(scene: &Scene) -> Result<Vec<u8>, VoxError> {
    let mut out = Vec::with_capacity(1024);
    out.extend_from_slice(VOX_MAGIC);
    write_u32(&mut out, WRITE_FILE_VERSION);

    // MAIN header; its child size is back-patched at the end
    out.extend_from_slice(&chunks::MAIN);
    write_u32(&mut out, 0);
    write_u32(&mut out, 0);
    let main_size_offset = out.len() - 4;
    let main_children_start = out.len();

    write_models(&mut out, scene)?;
    write_scene_graph(&mut out, scene)?;
    push_chunk(&mut out, chunks::RGBA, &scene.palette.to_disk_bytes());
    write_layers(&mut out, scene);
    write_metadata(&mut out, scene);

    let children_size = (out.len() - main_children_start) as u32;
    patch_u32(&mut out, main_size_offset, children_size);
    Ok(out)
}

/// Emit a SIZE and XYZI pair per model, in model-index order
fn write_models(out: &mut Vec<u8>, scene: &Scene) -> Result<(), VoxError> {
    for model in &scene.models {
        for dimension in [model.size_x, model.size_y, model.size_z] {
            if dimension > MAX_WRITE_MODEL_DIMENSION {
                return Err(VoxError::ModelTooLarge(dimension));
            }
        }

        let mut content = Vec::new();
        write_u32(&mut content, model.size_x);
        write_u32(&mut content, model.size_y);
        write_u32(&mut content, model.size_z);
        push_chunk(out, chunks::SIZE, &content);

        // sparse voxel list; empty cells are implied
        let mut content = Vec::new();
        write_u32(&mut content, model.solid_voxel_count());
        let mut voxel_index = 0;
        for z in 0..model.size_z {
            for y in 0..model.size_y {
                for x in 0..model.size_x {
                    let color_index = model.voxels[voxel_index];
                    voxel_index += 1;
                    if color_index != 0 {
                        content.extend_from_slice(&[x as u8, y as u8, z as u8, color_index]);
                    }
                }
            }
        }
        push_chunk(out, chunks::XYZI, &content);
    }
    Ok(())
}

/// Emit the canonical node graph
///
/// Node id ranges: 0 is the root transform, 1 the root group,
/// `[2, 2 + num_models)` the shape nodes and
/// `[2 + num_models, 2 + num_models + num_instances)` the per-instance
/// transforms. Scenes read with preserved groups are flattened here by
/// composing each instance up its group chain.
fn write_scene_graph(out: &mut Vec<u8>, scene: &Scene) -> Result<(), VoxError> {
    let num_models = scene.models.len() as u32;
    let num_instances = scene.instances.len() as u32;
    let first_shape_node_id = 2u32;
    let first_instance_node_id = first_shape_node_id + num_models;

    // root transform and root group referencing every instance transform
    push_ntrn_chunk(
        out,
        0,
        1,
        None,
        false,
        NO_LAYER,
        &[frame_dict(&Mat4::IDENTITY, None)?],
    );
    let mut content = Vec::new();
    write_u32(&mut content, 1);
    write_u32(&mut content, 0); // empty node dictionary
    write_u32(&mut content, num_instances);
    for i in 0..num_instances {
        write_u32(&mut content, first_instance_node_id + i);
    }
    push_chunk(out, chunks::NGRP, &content);

    // one shape node per model; an animated instance donates its
    // model-selection keyframes to its static model's shape node
    for model_index in 0..num_models {
        let keyframes = scene
            .instances
            .iter()
            .find(|instance| {
                instance.model_index == model_index && !instance.model_keyframes.is_empty()
            })
            .map(|instance| instance.model_keyframes.as_slice())
            .unwrap_or_default();

        let mut content = Vec::new();
        write_u32(&mut content, first_shape_node_id + model_index);
        write_u32(&mut content, 0); // empty node dictionary
        if keyframes.is_empty() {
            write_u32(&mut content, 1);
            write_u32(&mut content, model_index);
            write_u32(&mut content, 0); // empty model dictionary
        } else {
            write_u32(&mut content, keyframes.len() as u32);
            for keyframe in keyframes {
                write_u32(&mut content, keyframe.model_index);
                let mut attrs = crate::dict::VoxDict::new();
                attrs.insert("_f", &keyframe.frame.to_string());
                attrs.write_to(&mut content);
            }
        }
        push_chunk(out, chunks::NSHP, &content);
    }

    // one transform node per instance
    for (i, instance) in scene.instances.iter().enumerate() {
        let parent_world = group_chain_transform(scene, instance.group_index);
        let static_world = parent_world * instance.transform;
        let frames = transform_frames(
            &static_world,
            &instance.transform_keyframes,
            &parent_world,
        )?;
        push_ntrn_chunk(
            out,
            first_instance_node_id + i as u32,
            first_shape_node_id + instance.model_index,
            instance.name.as_deref(),
            instance.hidden,
            instance.layer_index,
            &frames,
        );
    }
    Ok(())
}

/// Compose the static transforms of an instance's enclosing group chain
///
/// Scenes built by the default (flattening) read have a single identity
/// root group, so this is usually the identity.
fn group_chain_transform(scene: &Scene, group_index: u32) -> Mat4 {
    let mut transform = Mat4::IDENTITY;
    let mut index = group_index;
    let mut hops = scene.groups.len() + 1;
    while index != NO_GROUP && (index as usize) < scene.groups.len() && hops > 0 {
        let group = &scene.groups[index as usize];
        transform = group.transform * transform;
        index = group.parent_group_index;
        hops -= 1;
    }
    transform
}

fn write_layers(out: &mut Vec<u8>, scene: &Scene) {
    for (i, layer) in scene.layers.iter().enumerate() {
        let mut attrs = crate::dict::VoxDict::new();
        if let Some(name) = &layer.name {
            attrs.insert("_name", name);
        }
        if layer.hidden {
            attrs.insert("_hidden", "1");
        }
        let default_color = crate::scene::Layer::default().color;
        if layer.color != default_color {
            attrs.insert(
                "_color",
                &format!("{} {} {}", layer.color.r, layer.color.g, layer.color.b),
            );
        }

        let mut content = Vec::new();
        write_u32(&mut content, i as u32);
        attrs.write_to(&mut content);
        write_i32(&mut content, -1);
        push_chunk(out, chunks::LAYR, &content);
    }
}

/// Round-trip the material, camera, color-name and meta chunks
fn write_metadata(out: &mut Vec<u8>, scene: &Scene) {
    for material in &scene.materials {
        let mut content = Vec::new();
        write_u32(&mut content, material.id);
        material.attrs.write_to(&mut content);
        push_chunk(out, chunks::MATL, &content);
    }
    for payload in &scene.legacy_materials {
        push_chunk(out, chunks::MATT, payload);
    }
    for camera in &scene.cameras {
        let mut content = Vec::new();
        write_u32(&mut content, camera.id);
        camera.attrs.write_to(&mut content);
        push_chunk(out, chunks::RCAM, &content);
    }
    if !scene.color_names.is_empty() {
        let mut content = Vec::new();
        write_u32(&mut content, scene.color_names.len() as u32);
        for name in &scene.color_names {
            write_u32(&mut content, name.len() as u32);
            content.extend_from_slice(name.as_bytes());
        }
        push_chunk(out, chunks::NOTE, &content);
    }
    for attrs in &scene.objects {
        let mut content = Vec::new();
        attrs.write_to(&mut content);
        push_chunk(out, chunks::ROBJ, &content);
    }
    if let Some(meta) = &scene.meta {
        let mut content = Vec::new();
        meta.write_to(&mut content);
        push_chunk(out, chunks::META, &content);
    }
}
