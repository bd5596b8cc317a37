//! Material, camera and rendering-object collectors
//!
//! These chunks are round-tripped: every key/value pair read from the
//! file is retained and written back verbatim, while typed accessors
//! expose the fields tooling commonly needs.

use glam::Vec3;

use crate::dict::VoxDict;

/// A MATL material definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    /// Material id; MagicaVoxel pairs these 1:1 with palette rows
    pub id: u32,
    /// All attributes as read from the file
    pub attrs: VoxDict,
}

impl Material {
    /// Material type, e.g. `_diffuse`, `_metal`, `_glass`, `_emit`
    pub fn kind(&self) -> Option<&str> {
        self.attrs.get("_type")
    }

    /// Blend weight in 0.0..=1.0
    pub fn weight(&self) -> Option<f32> {
        self.attrs.get_f32("_weight")
    }

    /// Surface roughness
    pub fn rough(&self) -> Option<f32> {
        self.attrs.get_f32("_rough")
    }

    /// Specular intensity
    pub fn spec(&self) -> Option<f32> {
        self.attrs.get_f32("_spec")
    }

    /// Index of refraction
    pub fn ior(&self) -> Option<f32> {
        self.attrs.get_f32("_ior")
    }

    /// Transparency attenuation
    pub fn att(&self) -> Option<f32> {
        self.attrs.get_f32("_att")
    }

    /// Emission strength
    pub fn emit(&self) -> Option<f32> {
        self.attrs.get_f32("_emit")
    }

    /// Emission radiant flux exponent
    pub fn flux(&self) -> Option<f32> {
        self.attrs.get_f32("_flux")
    }

    /// Metalness
    pub fn metal(&self) -> Option<f32> {
        self.attrs.get_f32("_metal")
    }

    /// Alpha for glass materials
    pub fn alpha(&self) -> Option<f32> {
        self.attrs.get_f32("_alpha")
    }
}

/// An rCAM render camera
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Camera {
    pub id: u32,
    /// All attributes as read from the file
    pub attrs: VoxDict,
}

impl Camera {
    /// Projection mode, e.g. `pers`, `free`, `pano`, `orth`, `iso`
    pub fn mode(&self) -> Option<&str> {
        self.attrs.get("_mode")
    }

    /// Orbit focus point
    pub fn focus(&self) -> Option<Vec3> {
        self.attrs.get("_focus").and_then(parse_vec3)
    }

    /// Orbit angles in degrees
    pub fn angle(&self) -> Option<Vec3> {
        self.attrs.get("_angle").and_then(parse_vec3)
    }

    /// Orbit radius
    pub fn radius(&self) -> Option<f32> {
        self.attrs.get_f32("_radius")
    }

    /// Frustum half-extent
    pub fn frustum(&self) -> Option<f32> {
        self.attrs.get_f32("_frustum")
    }

    /// Field of view in degrees
    pub fn fov(&self) -> Option<f32> {
        self.attrs.get_f32("_fov")
    }
}

fn parse_vec3(value: &str) -> Option<Vec3> {
    let mut parts = value.split_whitespace().map(str::parse::<f32>);
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Some(Vec3::new(x, y, z)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_accessors() {
        let mut attrs = VoxDict::new();
        attrs.insert("_type", "_metal");
        attrs.insert("_weight", "0.75");
        attrs.insert("_rough", "0.1");
        attrs.insert("_custom", "kept");
        let material = Material { id: 12, attrs };

        assert_eq!(material.kind(), Some("_metal"));
        assert_eq!(material.weight(), Some(0.75));
        assert_eq!(material.rough(), Some(0.1));
        assert_eq!(material.emit(), None);
        assert_eq!(material.attrs.get("_custom"), Some("kept"));
    }

    #[test]
    fn test_camera_accessors() {
        let mut attrs = VoxDict::new();
        attrs.insert("_mode", "pers");
        attrs.insert("_focus", "0 0 10");
        attrs.insert("_fov", "45");
        let camera = Camera { id: 0, attrs };

        assert_eq!(camera.mode(), Some("pers"));
        assert_eq!(camera.focus(), Some(Vec3::new(0.0, 0.0, 10.0)));
        assert_eq!(camera.fov(), Some(45.0));
        assert_eq!(camera.angle(), None);
    }
}
