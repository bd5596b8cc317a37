//! Tests for the .vox writer and read/write round-trips

use glam::{Mat4, Vec3};

use crate::dict::VoxDict;
use crate::error::VoxError;
use crate::parser::tests::{
    chunk, layr_chunk, ngrp_chunk, nshp_chunk, ntrn_chunk, size_chunk, vox_file, xyzi_chunk,
};
use crate::parser::{read_scene, read_scene_with_flags};
use crate::scene::{Instance, Layer, Material, Model, ReadFlags, Rgba, Scene};
use crate::writer::write_scene;
use crate::{VOX_MAGIC, chunks};

fn two_model_file() -> Vec<u8> {
    let mut children = Vec::new();
    children.extend(size_chunk(1, 1, 1));
    children.extend(xyzi_chunk(&[[0, 0, 0, 1]]));
    children.extend(size_chunk(2, 1, 1));
    children.extend(xyzi_chunk(&[[0, 0, 0, 2], [1, 0, 0, 2]]));
    children.extend(ntrn_chunk(0, &[], 1, u32::MAX, &[&[]]));
    children.extend(ngrp_chunk(1, &[2, 4]));
    children.extend(ntrn_chunk(
        2,
        &[("_name", "near"), ("_hidden", "1")],
        3,
        0,
        &[&[("_t", "3 -2 1")]],
    ));
    children.extend(nshp_chunk(3, &[(0, &[])]));
    children.extend(ntrn_chunk(4, &[], 5, 1, &[&[("_r", "22"), ("_t", "0 0 7")]]));
    children.extend(nshp_chunk(5, &[(1, &[])]));
    children.extend(layr_chunk(0, &[("_name", "ground")]));
    children.extend(layr_chunk(1, &[("_hidden", "1"), ("_color", "32 64 96")]));
    vox_file(&children)
}

#[test]
fn test_written_file_header_and_main_patch() {
    let scene = read_scene(&two_model_file()).unwrap();
    let data = write_scene(&scene).unwrap();

    assert_eq!(&data[0..4], VOX_MAGIC);
    assert_eq!(u32::from_le_bytes(data[4..8].try_into().unwrap()), 150);
    assert_eq!(&data[8..12], &chunks::MAIN);
    // MAIN content size is zero, child size spans the rest of the file
    assert_eq!(u32::from_le_bytes(data[12..16].try_into().unwrap()), 0);
    let children_size = u32::from_le_bytes(data[16..20].try_into().unwrap());
    assert_eq!(children_size as usize, data.len() - 20);
}

#[test]
fn test_roundtrip_is_structurally_identical() {
    let first = read_scene(&two_model_file()).unwrap();
    let written = write_scene(&first).unwrap();
    let second = read_scene(&written).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_writer_is_idempotent() {
    let first = write_scene(&read_scene(&two_model_file()).unwrap()).unwrap();
    let second = write_scene(&read_scene(&first).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_one_instance_per_model_scene() {
    let mut scene = Scene::default();
    for color in [1u8, 2, 3] {
        let mut model = Model::new(2, 2, 2);
        model.set_voxel(0, 0, 0, color);
        model.rehash();
        let model_index = scene.models.len() as u32;
        scene.models.push(model);
        scene.instances.push(Instance {
            model_index,
            ..Instance::default()
        });
    }
    scene.layers.push(Layer::default());

    let back = read_scene(&write_scene(&scene).unwrap()).unwrap();
    assert_eq!(back.models.len(), 3);
    assert_eq!(back.instances.len(), 3);
    for (i, instance) in back.instances.iter().enumerate() {
        assert_eq!(instance.model_index, i as u32);
        assert_eq!(instance.transform, Mat4::IDENTITY);
    }
}

#[test]
fn test_packed_rotation_roundtrip() {
    let first = read_scene(&two_model_file()).unwrap();
    let rotated = first
        .instances
        .iter()
        .find(|i| i.model_index == 1)
        .unwrap();
    // _r = 22 maps local x to world z and local z to world -x
    assert_eq!(
        rotated.transform.transform_vector3(Vec3::X),
        Vec3::new(0.0, 0.0, 1.0)
    );

    let second = read_scene(&write_scene(&first).unwrap()).unwrap();
    let rotated_again = second
        .instances
        .iter()
        .find(|i| i.model_index == 1)
        .unwrap();
    assert_eq!(rotated.transform, rotated_again.transform);
}

#[test]
fn test_names_hidden_and_layers_roundtrip() {
    let scene = read_scene(&write_scene(&read_scene(&two_model_file()).unwrap()).unwrap()).unwrap();

    let named = scene.instances.iter().find(|i| i.model_index == 0).unwrap();
    assert_eq!(named.name.as_deref(), Some("near"));
    assert!(named.hidden);
    assert_eq!(named.transform.w_axis.truncate(), Vec3::new(3.0, -2.0, 1.0));

    assert_eq!(scene.layers.len(), 2);
    assert_eq!(scene.layers[0].name.as_deref(), Some("ground"));
    assert!(scene.layers[1].hidden);
    assert_eq!(scene.layers[1].color, Rgba::new(32, 64, 96, 255));
}

#[test]
fn test_transform_keyframes_roundtrip() {
    let mut children = Vec::new();
    children.extend(size_chunk(1, 1, 1));
    children.extend(xyzi_chunk(&[[0, 0, 0, 1]]));
    children.extend(ntrn_chunk(
        0,
        &[],
        1,
        u32::MAX,
        &[
            &[("_t", "0 0 0"), ("_f", "0")],
            &[("_t", "0 0 4"), ("_f", "8")],
            &[("_r", "22"), ("_t", "1 1 1"), ("_f", "20")],
        ],
    ));
    children.extend(nshp_chunk(1, &[(0, &[])]));
    let data = vox_file(&children);

    let first = read_scene_with_flags(&data, ReadFlags::KEYFRAMES).unwrap();
    let second =
        read_scene_with_flags(&write_scene(&first).unwrap(), ReadFlags::KEYFRAMES).unwrap();

    assert_eq!(first.instances[0].transform_keyframes.len(), 3);
    assert_eq!(
        first.instances[0].transform_keyframes,
        second.instances[0].transform_keyframes
    );
    assert_eq!(first, second);
}

#[test]
fn test_model_keyframes_roundtrip() {
    let mut children = Vec::new();
    for color in [1u8, 2] {
        children.extend(size_chunk(1, 1, 1));
        children.extend(xyzi_chunk(&[[0, 0, 0, color]]));
    }
    children.extend(ntrn_chunk(0, &[], 1, u32::MAX, &[&[]]));
    children.extend(nshp_chunk(1, &[(0, &[("_f", "0")]), (1, &[("_f", "12")])]));
    let data = vox_file(&children);

    let first = read_scene_with_flags(&data, ReadFlags::KEYFRAMES).unwrap();
    let second =
        read_scene_with_flags(&write_scene(&first).unwrap(), ReadFlags::KEYFRAMES).unwrap();

    assert_eq!(first.instances[0].model_keyframes.len(), 2);
    assert_eq!(
        first.instances[0].model_keyframes,
        second.instances[0].model_keyframes
    );
}

#[test]
fn test_preserved_groups_flatten_on_write() {
    let mut children = Vec::new();
    children.extend(size_chunk(1, 1, 1));
    children.extend(xyzi_chunk(&[[0, 0, 0, 1]]));
    children.extend(ntrn_chunk(0, &[], 1, u32::MAX, &[&[("_t", "5 0 0")]]));
    children.extend(ngrp_chunk(1, &[2]));
    children.extend(ntrn_chunk(2, &[], 3, u32::MAX, &[&[("_t", "0 3 0")]]));
    children.extend(nshp_chunk(3, &[(0, &[])]));
    let data = vox_file(&children);

    let grouped = read_scene_with_flags(&data, ReadFlags::KEEP_GROUPS).unwrap();
    assert_eq!(
        grouped.instances[0].transform.w_axis.truncate(),
        Vec3::new(0.0, 3.0, 0.0)
    );

    // writing composes the group chain; a flat read sees world transforms
    let flat = read_scene(&write_scene(&grouped).unwrap()).unwrap();
    assert_eq!(
        flat.instances[0].transform.w_axis.truncate(),
        Vec3::new(5.0, 3.0, 0.0)
    );
    assert_eq!(flat, read_scene(&data).unwrap());
}

#[test]
fn test_materials_and_meta_roundtrip() {
    let mut scene = read_scene(&two_model_file()).unwrap();

    let mut attrs = VoxDict::new();
    attrs.insert("_type", "_emit");
    attrs.insert("_emit", "0.5");
    attrs.insert("_vendor_extra", "kept verbatim");
    scene.materials.push(Material { id: 3, attrs });
    scene.legacy_materials.push(vec![1, 2, 3, 4]);

    let mut camera = VoxDict::new();
    camera.insert("_mode", "pers");
    camera.insert("_fov", "45");
    scene.cameras.push(crate::scene::Camera {
        id: 0,
        attrs: camera,
    });

    let mut object = VoxDict::new();
    object.insert("_type", "_ground");
    scene.objects.push(object);

    scene.color_names = vec!["steel".to_string(), String::new(), "glass".to_string()];

    let mut meta = VoxDict::new();
    meta.insert("_anim_range_start", "0");
    meta.insert("_anim_range_end", "48");
    scene.meta = Some(meta);

    let back = read_scene_with_flags(&write_scene(&scene).unwrap(), ReadFlags::MATERIALS).unwrap();
    assert_eq!(back.materials, scene.materials);
    assert_eq!(back.materials[0].kind(), Some("_emit"));
    assert_eq!(back.legacy_materials, scene.legacy_materials);
    assert_eq!(back.cameras, scene.cameras);
    assert_eq!(back.objects, scene.objects);
    assert_eq!(back.color_names, scene.color_names);
    assert_eq!(back.anim_range(), Some((0, 48)));
}

#[test]
fn test_unaligned_rotation_is_rejected() {
    let mut scene = read_scene(&two_model_file()).unwrap();
    scene.instances[0].transform = Mat4::from_rotation_z(0.5);
    assert_eq!(write_scene(&scene), Err(VoxError::UnalignedRotation));
}

#[test]
fn test_oversized_model_is_rejected() {
    let mut scene = Scene::default();
    scene.models.push(Model::new(127, 1, 1));
    assert_eq!(write_scene(&scene), Err(VoxError::ModelTooLarge(127)));
}

#[test]
fn test_palette_roundtrip() {
    let mut rgba = vec![0u8; 1024];
    for (i, byte) in rgba.iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
    let mut children = Vec::new();
    children.extend(size_chunk(1, 1, 1));
    children.extend(xyzi_chunk(&[[0, 0, 0, 1]]));
    children.extend(chunk(chunks::RGBA, &rgba));
    let first = read_scene(&vox_file(&children)).unwrap();
    let second = read_scene(&write_scene(&first).unwrap()).unwrap();
    assert_eq!(first.palette, second.palette);
}
