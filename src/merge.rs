//! Multi-scene merging with palette reconciliation
//!
//! Combining scenes means combining palettes. Two reconciliation modes:
//!
//! - **Caller-provided target palette**: every non-transparent source
//!   color maps to its nearest target color by sum-of-squared-RGBA
//!   distance, and every copied voxel is rewritten through that map.
//! - **Best-effort fit**: the combined palette is seeded from the first
//!   scene's colors; later scenes reuse exact RGB matches, append new
//!   colors while slots remain and fall back to the nearest existing
//!   color once the 255 usable slots are exhausted.
//!
//! Layers, groups and instances are concatenated with their indices
//! offset into the merged index spaces; names, hidden state and
//! transforms are preserved.

use tracing::debug;

use crate::error::VoxError;
use crate::scene::{Palette, Rgba, Scene};
use crate::{NO_GROUP, NO_LAYER};

/// Number of usable palette slots; index 0 stays transparent
const USABLE_COLORS: usize = 255;

/// Merge scenes into a new scene owning copies of all their content
///
/// # Arguments
/// * `scenes` - Source scenes, in order; the first seeds the palette
/// * `target_palette` - Optional replacement palette of up to 255 colors
///
/// # Returns
/// * `Ok(Scene)` - The merged scene; sources are untouched
/// * `Err(VoxError::MergeFailed)` - A target palette over 255 colors
pub fn merge_scenes(
    scenes: &[&Scene],
    target_palette: Option<&[Rgba]>,
) -> Result<Scene, VoxError> {
    let (palette, remaps) = match target_palette {
        Some(target) => reconcile_to_target(scenes, target)?,
        None => reconcile_best_fit(scenes),
    };

    let mut merged = Scene {
        palette,
        ..Scene::default()
    };

    for (scene, remap) in scenes.iter().zip(&remaps) {
        let model_offset = merged.models.len() as u32;
        let layer_offset = merged.layers.len() as u32;
        let group_offset = merged.groups.len() as u32;

        merged.layers.extend(scene.layers.iter().cloned());

        for group in &scene.groups {
            let mut group = group.clone();
            if group.parent_group_index != NO_GROUP {
                group.parent_group_index += group_offset;
            }
            if group.layer_index != NO_LAYER {
                group.layer_index += layer_offset;
            }
            merged.groups.push(group);
        }

        for model in &scene.models {
            let mut model = model.clone();
            for voxel in &mut model.voxels {
                *voxel = remap[usize::from(*voxel)];
            }
            model.rehash();
            merged.models.push(model);
        }

        for instance in &scene.instances {
            let mut instance = instance.clone();
            instance.model_index += model_offset;
            instance.layer_index += layer_offset;
            if instance.group_index != NO_GROUP {
                instance.group_index += group_offset;
            }
            for keyframe in &mut instance.model_keyframes {
                keyframe.model_index += model_offset;
            }
            merged.instances.push(instance);
        }
    }

    debug!(
        scenes = scenes.len(),
        models = merged.models.len(),
        instances = merged.instances.len(),
        "merged scenes"
    );
    Ok(merged)
}

/// Build per-source remaps onto a caller-provided palette
fn reconcile_to_target(
    scenes: &[&Scene],
    target: &[Rgba],
) -> Result<(Palette, Vec<[u8; 256]>), VoxError> {
    if target.len() > USABLE_COLORS {
        return Err(VoxError::MergeFailed(0));
    }

    let mut palette = Palette {
        colors: [Rgba::default(); 256],
    };
    palette.colors[1..=target.len()].copy_from_slice(target);

    let remaps = scenes
        .iter()
        .map(|scene| {
            let mut remap = [0u8; 256];
            if target.is_empty() {
                return remap;
            }
            for v in 1..256 {
                let color = scene.palette[v];
                if color.a == 0 {
                    continue; // unused slot stays transparent
                }
                remap[v] = nearest_color(&palette.colors[1..=target.len()], color);
            }
            remap
        })
        .collect();
    Ok((palette, remaps))
}

/// Grow a combined palette across the sources, in order
fn reconcile_best_fit(scenes: &[&Scene]) -> (Palette, Vec<[u8; 256]>) {
    let mut colors: Vec<Rgba> = vec![Rgba::default()]; // slot 0 transparent
    let mut exact: hashbrown::HashMap<(u8, u8, u8), u8> = hashbrown::HashMap::new();

    let remaps = scenes
        .iter()
        .map(|scene| {
            let mut remap = [0u8; 256];
            for v in 1..256 {
                let color = scene.palette[v];
                if color.a == 0 {
                    continue;
                }
                let key = (color.r, color.g, color.b);
                remap[v] = if let Some(&index) = exact.get(&key) {
                    index
                } else if colors.len() <= USABLE_COLORS {
                    let index = colors.len() as u8;
                    colors.push(color);
                    exact.insert(key, index);
                    index
                } else {
                    // capacity exhausted: nearest existing entry
                    nearest_color(&colors[1..], color)
                };
            }
            remap
        })
        .collect();

    let mut palette = Palette {
        colors: [Rgba::default(); 256],
    };
    palette.colors[..colors.len()].copy_from_slice(&colors);
    (palette, remaps)
}

/// Index (1-based within the full palette) of the nearest color
fn nearest_color(colors: &[Rgba], color: Rgba) -> u8 {
    let mut best_index = 0usize;
    let mut best_distance = u32::MAX;
    for (i, &candidate) in colors.iter().enumerate() {
        let distance = candidate.distance_sq(color);
        if distance < best_distance {
            best_distance = distance;
            best_index = i;
        }
    }
    (best_index + 1) as u8
}
