//! Keyframe sampling
//!
//! All samplers use last-known-good semantics: the value at frame `F` is
//! the payload of the greatest keyframe with `frame <= F`. Frames before
//! the first keyframe return the first keyframe, and a node without
//! keyframes returns its static value. The parser guarantees strictly
//! increasing frame indices within a set.

use glam::Mat4;

use crate::scene::{Group, Instance, Scene};
use crate::NO_GROUP;

fn sample_keyframes<K>(keyframes: &[K], frame: u32, frame_of: impl Fn(&K) -> u32) -> Option<&K> {
    let first = keyframes.first()?;
    if frame < frame_of(first) {
        return Some(first);
    }
    keyframes
        .iter()
        .take_while(|keyframe| frame_of(keyframe) <= frame)
        .last()
}

/// Sample an instance's local transform at a frame
pub fn sample_transform_local(instance: &Instance, frame: u32) -> Mat4 {
    sample_keyframes(&instance.transform_keyframes, frame, |k| k.frame)
        .map_or(instance.transform, |k| k.transform)
}

/// Sample a group's local transform at a frame
pub fn sample_group_transform_local(group: &Group, frame: u32) -> Mat4 {
    sample_keyframes(&group.transform_keyframes, frame, |k| k.frame)
        .map_or(group.transform, |k| k.transform)
}

/// Sample an instance's world transform at a frame
///
/// Composes the sampled local transforms up the group parent chain. For
/// scenes read without [`crate::ReadFlags::KEEP_GROUPS`] the chain is a
/// single identity root, so this equals the local sample.
pub fn sample_transform_global(scene: &Scene, instance: &Instance, frame: u32) -> Mat4 {
    let mut transform = sample_transform_local(instance, frame);
    let mut index = instance.group_index;
    let mut hops = scene.groups.len() + 1;
    while index != NO_GROUP && (index as usize) < scene.groups.len() && hops > 0 {
        let group = &scene.groups[index as usize];
        transform = sample_group_transform_local(group, frame) * transform;
        index = group.parent_group_index;
        hops -= 1;
    }
    transform
}

/// Sample which model an instance displays at a frame
pub fn sample_model(instance: &Instance, frame: u32) -> u32 {
    sample_keyframes(&instance.model_keyframes, frame, |k| k.frame)
        .map_or(instance.model_index, |k| k.model_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use crate::scene::{ModelKeyframe, TransformKeyframe};

    fn keyframed_instance() -> Instance {
        let translate =
            |x: f32, y: f32, z: f32| Mat4::from_translation(Vec3::new(x, y, z));
        Instance {
            transform: translate(9.0, 9.0, 9.0),
            transform_keyframes: vec![
                TransformKeyframe {
                    frame: 4,
                    transform: translate(0.0, 0.0, 0.0),
                },
                TransformKeyframe {
                    frame: 10,
                    transform: translate(0.0, 0.0, 5.0),
                },
                TransformKeyframe {
                    frame: 20,
                    transform: translate(0.0, 0.0, 8.0),
                },
            ],
            model_keyframes: vec![
                ModelKeyframe {
                    frame: 0,
                    model_index: 0,
                },
                ModelKeyframe {
                    frame: 10,
                    model_index: 1,
                },
            ],
            ..Instance::default()
        }
    }

    #[test]
    fn test_sample_transform_last_known_good() {
        let instance = keyframed_instance();
        let z_at = |frame| sample_transform_local(&instance, frame).w_axis.z;

        // before the first keyframe: first keyframe wins
        assert_eq!(z_at(0), 0.0);
        assert_eq!(z_at(4), 0.0);
        assert_eq!(z_at(9), 0.0);
        assert_eq!(z_at(10), 5.0);
        assert_eq!(z_at(15), 5.0);
        assert_eq!(z_at(20), 8.0);
        // far past the last keyframe: last keyframe wins
        assert_eq!(z_at(20 + 1_000_000), 8.0);
    }

    #[test]
    fn test_static_transform_without_keyframes() {
        let instance = Instance {
            transform: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            ..Instance::default()
        };
        assert_eq!(sample_transform_local(&instance, 50), instance.transform);
    }

    #[test]
    fn test_sample_model_selection() {
        let instance = keyframed_instance();
        assert_eq!(sample_model(&instance, 0), 0);
        assert_eq!(sample_model(&instance, 5), 0);
        assert_eq!(sample_model(&instance, 10), 1);
        assert_eq!(sample_model(&instance, 100), 1);
    }

    #[test]
    fn test_global_sample_composes_group_chain() {
        let mut scene = Scene::default();
        scene.groups.push(Group {
            transform: Mat4::from_translation(Vec3::new(100.0, 0.0, 0.0)),
            transform_keyframes: vec![
                TransformKeyframe {
                    frame: 0,
                    transform: Mat4::from_translation(Vec3::new(100.0, 0.0, 0.0)),
                },
                TransformKeyframe {
                    frame: 10,
                    transform: Mat4::from_translation(Vec3::new(200.0, 0.0, 0.0)),
                },
            ],
            ..Group::default()
        });
        let mut instance = keyframed_instance();
        instance.group_index = 0;

        let world = sample_transform_global(&scene, &instance, 15);
        assert_eq!(world.w_axis.truncate(), Vec3::new(200.0, 0.0, 5.0));

        let world = sample_transform_global(&scene, &instance, 0);
        assert_eq!(world.w_axis.truncate(), Vec3::new(100.0, 0.0, 0.0));
    }
}
