use glam::Vec3;
use log::warn;
use serde::{Deserialize, Serialize};

/// Phong reflectance coefficients of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Specular exponent.
    pub surface_brightness: f32,
    pub ambient_incidence: Vec3,
    pub diffuse_incidence: Vec3,
    pub specular_incidence: Vec3,
}

/// Name of the preset used when nothing else is requested.
pub const DEFAULT_PRESET: &str = "basic";

// Coefficients from Kilgard's teapots.c (SGI, 1994) and the usual OpenGL
// material tables.
const PRESETS: &[(&str, f32, [f32; 3], [f32; 3], [f32; 3])] = &[
    ("basic", 42.0, [1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]),
    // metals
    (
        "brass",
        27.8974,
        [0.329412, 0.223529, 0.027451],
        [0.780392, 0.568627, 0.113725],
        [0.992157, 0.941176, 0.807843],
    ),
    (
        "bronze",
        25.6,
        [0.2125, 0.1275, 0.054],
        [0.714, 0.4284, 0.18144],
        [0.393548, 0.271906, 0.166721],
    ),
    (
        "polished_bronze",
        76.8,
        [0.25, 0.148, 0.06475],
        [0.4, 0.2368, 0.1036],
        [0.774597, 0.458561, 0.200621],
    ),
    ("chrome", 84.48, [0.25, 0.25, 0.25], [0.4, 0.4, 0.4], [0.774597, 0.774597, 0.774597]),
    (
        "copper",
        12.8,
        [0.19125, 0.0735, 0.0225],
        [0.7038, 0.27048, 0.0828],
        [0.256777, 0.137622, 0.086014],
    ),
    (
        "polished_copper",
        51.2,
        [0.2295, 0.08825, 0.0275],
        [0.5508, 0.2118, 0.066],
        [0.580594, 0.223257, 0.0695701],
    ),
    (
        "gold",
        51.2,
        [0.24725, 0.1995, 0.0745],
        [0.75164, 0.60648, 0.22648],
        [0.628281, 0.555802, 0.366065],
    ),
    (
        "polished_gold",
        83.2,
        [0.24725, 0.2245, 0.0645],
        [0.34615, 0.3143, 0.0903],
        [0.797357, 0.723991, 0.208006],
    ),
    (
        "pewter",
        9.84615,
        [0.105882, 0.058824, 0.113725],
        [0.427451, 0.470588, 0.541176],
        [0.333333, 0.333333, 0.521569],
    ),
    (
        "silver",
        51.2,
        [0.19225, 0.19225, 0.19225],
        [0.50754, 0.50754, 0.50754],
        [0.508273, 0.508273, 0.508273],
    ),
    (
        "polished_silver",
        89.6,
        [0.23125, 0.23125, 0.23125],
        [0.2775, 0.2775, 0.2775],
        [0.773911, 0.773911, 0.773911],
    ),
    // gems
    (
        "emerald",
        76.8,
        [0.0215, 0.1745, 0.0215],
        [0.07568, 0.61424, 0.07568],
        [0.633, 0.727811, 0.633],
    ),
    ("jade", 12.8, [0.135, 0.2225, 0.1575], [0.54, 0.89, 0.63], [0.316228, 0.316228, 0.316228]),
    (
        "obsidian",
        38.4,
        [0.05375, 0.05, 0.06625],
        [0.18275, 0.17, 0.22525],
        [0.332741, 0.328634, 0.346435],
    ),
    (
        "pearl",
        113.664,
        [0.25, 0.20725, 0.20725],
        [1.0, 0.829, 0.829],
        [0.296648, 0.296648, 0.296648],
    ),
    (
        "ruby",
        76.8,
        [0.1745, 0.01175, 0.01175],
        [0.61424, 0.04136, 0.04136],
        [0.727811, 0.626959, 0.626959],
    ),
    (
        "turquoise",
        12.8,
        [0.1, 0.18725, 0.1745],
        [0.396, 0.74151, 0.69102],
        [0.297254, 0.30829, 0.306678],
    ),
    // plastics
    ("black_plastic", 32.0, [0.0, 0.0, 0.0], [0.01, 0.01, 0.01], [0.5, 0.5, 0.5]),
    (
        "cyan_plastic",
        32.0,
        [0.0, 0.1, 0.06],
        [0.0, 0.50980392, 0.50980392],
        [0.50196078, 0.50196078, 0.50196078],
    ),
    ("green_plastic", 32.0, [0.0, 0.0, 0.0], [0.1, 0.35, 0.1], [0.45, 0.55, 0.45]),
    ("red_plastic", 32.0, [0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.7, 0.6, 0.6]),
    ("white_plastic", 32.0, [0.0, 0.0, 0.0], [0.55, 0.55, 0.55], [0.7, 0.7, 0.7]),
    ("yellow_plastic", 32.0, [0.0, 0.0, 0.0], [0.5, 0.5, 0.0], [0.6, 0.6, 0.5]),
    // rubbers
    ("black_rubber", 10.0, [0.02, 0.02, 0.02], [0.01, 0.01, 0.01], [0.4, 0.4, 0.4]),
    ("cyan_rubber", 10.0, [0.02, 0.05, 0.05], [0.4, 0.5, 0.5], [0.04, 0.7, 0.7]),
    ("green_rubber", 10.0, [0.0, 0.05, 0.0], [0.4, 0.5, 0.4], [0.04, 0.7, 0.04]),
    ("red_rubber", 10.0, [0.05, 0.0, 0.0], [0.5, 0.4, 0.4], [0.7, 0.04, 0.04]),
    ("white_rubber", 10.0, [0.05, 0.05, 0.05], [0.5, 0.5, 0.5], [0.7, 0.7, 0.7]),
    ("yellow_rubber", 10.0, [0.05, 0.05, 0.0], [0.5, 0.5, 0.4], [0.7, 0.7, 0.04]),
];

impl Material {
    pub fn new(
        surface_brightness: f32,
        ambient_incidence: Vec3,
        diffuse_incidence: Vec3,
        specular_incidence: Vec3,
    ) -> Self {
        Self {
            surface_brightness,
            ambient_incidence,
            diffuse_incidence,
            specular_incidence,
        }
    }

    /// Looks up a named preset.
    pub fn preset(name: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(preset, ..)| *preset == name)
            .map(|(_, brightness, ambient, diffuse, specular)| Self {
                surface_brightness: *brightness,
                ambient_incidence: Vec3::from(*ambient),
                diffuse_incidence: Vec3::from(*diffuse),
                specular_incidence: Vec3::from(*specular),
            })
    }

    /// Names of every preset, in table order.
    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        PRESETS.iter().map(|(name, ..)| *name)
    }

    /// Replaces every coefficient with the named preset.
    ///
    /// Unknown names leave the material unchanged and return `false`.
    pub fn set_preset(&mut self, name: &str) -> bool {
        match Self::preset(name) {
            Some(material) => {
                *self = material;
                true
            }
            None => {
                warn!("unknown material preset `{name}`; keeping current coefficients");
                false
            }
        }
    }

    pub fn with_surface_brightness(mut self, brightness: f32) -> Self {
        self.surface_brightness = brightness;
        self
    }

    pub fn with_ambient_incidence(mut self, incidence: Vec3) -> Self {
        self.ambient_incidence = incidence;
        self
    }

    pub fn with_diffuse_incidence(mut self, incidence: Vec3) -> Self {
        self.diffuse_incidence = incidence;
        self
    }

    pub fn with_specular_incidence(mut self, incidence: Vec3) -> Self {
        self.specular_incidence = incidence;
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(42.0, Vec3::ONE, Vec3::ONE, Vec3::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gold_has_documented_coefficients() {
        let gold = Material::preset("gold").unwrap();
        assert_eq!(gold.surface_brightness, 51.2);
        assert_eq!(gold.ambient_incidence, Vec3::new(0.24725, 0.1995, 0.0745));
        assert_eq!(gold.diffuse_incidence, Vec3::new(0.75164, 0.60648, 0.22648));
        assert_eq!(
            gold.specular_incidence,
            Vec3::new(0.628281, 0.555802, 0.366065)
        );
    }

    #[test]
    fn default_matches_basic_preset() {
        assert_eq!(Material::preset(DEFAULT_PRESET), Some(Material::default()));
    }

    #[test]
    fn unknown_preset_keeps_previous_state() {
        let mut material = Material::preset("jade").unwrap();
        assert!(!material.set_preset("unobtainium"));
        assert_eq!(material, Material::preset("jade").unwrap());
        assert!(material.set_preset("ruby"));
        assert_eq!(material.surface_brightness, 76.8);
    }

    #[test]
    fn preset_names_are_unique() {
        let names: Vec<_> = Material::preset_names().collect();
        assert_eq!(names.len(), 30);
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }

    #[test]
    fn builder_overrides_single_fields() {
        let material = Material::preset("chrome")
            .unwrap()
            .with_surface_brightness(8.0)
            .with_diffuse_incidence(Vec3::X);
        assert_eq!(material.surface_brightness, 8.0);
        assert_eq!(material.diffuse_incidence, Vec3::X);
        assert_eq!(material.ambient_incidence, Vec3::splat(0.25));
    }
}
