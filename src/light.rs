use glam::Vec3;
use serde::{Deserialize, Serialize};

const AMBIENT_FACTOR: f32 = 0.1;
const DIFFUSE_FACTOR: f32 = 0.8;
const SPECULAR_FACTOR: f32 = 1.0;

/// Point light with Phong intensities derived from its base color.
///
/// The record is immutable once built; replace it on the scene to change it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    position: Vec3,
    color: Vec3,
    ambient_intensity: Vec3,
    diffuse_intensity: Vec3,
    specular_intensity: Vec3,
}

impl Light {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            color,
            ambient_intensity: AMBIENT_FACTOR * color,
            diffuse_intensity: DIFFUSE_FACTOR * color,
            specular_intensity: SPECULAR_FACTOR * color,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn ambient_intensity(&self) -> Vec3 {
        self.ambient_intensity
    }

    pub fn diffuse_intensity(&self) -> Vec3 {
        self.diffuse_intensity
    }

    pub fn specular_intensity(&self) -> Vec3 {
        self.specular_intensity
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(Vec3::new(3.0, 3.0, -3.0), Vec3::ONE)
    }
}
