//! Built-in scenes.

use glam::Vec3;

use crate::description::SceneDescription;
use crate::light::Light;
use crate::material::Material;
use crate::mesh::MeshKind;
use crate::model::{Animation, ModelDescriptor, TextureSource, DEMO_SPIN_RADIANS};

pub const NAMES: [&str; 5] = [
    "hello_triangle",
    "test_cube",
    "companion_cube",
    "material_boxes",
    "teapot",
];

pub fn by_name(name: &str) -> Option<SceneDescription> {
    match name {
        "hello_triangle" => Some(hello_triangle()),
        "test_cube" => Some(test_cube()),
        "companion_cube" => Some(companion_cube()),
        "material_boxes" => Some(material_boxes()),
        "teapot" => Some(teapot()),
        _ => None,
    }
}

/// A single flat-shaded triangle.
pub fn hello_triangle() -> SceneDescription {
    SceneDescription::new(
        "hello_triangle",
        Light::default(),
        vec![ModelDescriptor::new("triangle", MeshKind::Triangle)
            .with_color(Vec3::new(1.0, 0.5, 0.2))],
    )
}

/// Spinning vertex-colored cube wrapped in its wire outline.
pub fn test_cube() -> SceneDescription {
    SceneDescription::new(
        "test_cube",
        Light::default(),
        vec![
            ModelDescriptor::new("colored_cube", MeshKind::SolidCube)
                .with_animation(Animation::demo_spin()),
            ModelDescriptor::new("skeleton_cube", MeshKind::WireCube)
                .with_animation(Animation::demo_spin()),
        ],
    )
}

/// Shiny textured cube, lit by the default light.
pub fn companion_cube() -> SceneDescription {
    let mut cube = ModelDescriptor::new("companion_cube", MeshKind::TexturedCube)
        .with_material(Material::default().with_surface_brightness(56.0))
        .with_animation(Animation::demo_spin());
    if let Some(texture) = TextureSource::from_name("companion_cube") {
        cube = cube.with_texture(texture);
    }
    SceneDescription::new("companion_cube", Light::default(), vec![cube])
}

/// Three textured boxes side by side: wood, chrome and polished gold.
pub fn material_boxes() -> SceneDescription {
    let boxes = [
        ("wooden_box", "basic", -3.0),
        ("metal_box", "chrome", 0.0),
        ("golden_box", "polished_gold", 3.0),
    ];
    let models = boxes
        .into_iter()
        .filter_map(|(name, material, x)| {
            let mut descriptor = ModelDescriptor::new(name, MeshKind::TexturedCube)
                .with_material(Material::preset(material)?)
                .at(Vec3::new(x, 0.0, 0.0))
                .with_animation(Animation::demo_spin());
            if let Some(texture) = TextureSource::from_name(name) {
                descriptor = descriptor.with_texture(texture);
            }
            Some(descriptor)
        })
        .collect();
    SceneDescription::new("material_boxes", Light::default(), models)
}

/// Control points of the teapot patches, standing on +Z and turning about
/// it.
pub fn teapot() -> SceneDescription {
    let teapot = ModelDescriptor::new("teapot", MeshKind::TeapotPatches)
        .with_color(Vec3::new(0.2, 0.2, 0.25))
        .at(Vec3::new(0.0, 0.0, -3.0))
        .with_animation(Animation::Spin {
            axis: Vec3::Z,
            radians: DEMO_SPIN_RADIANS,
        });
    SceneDescription::new("teapot", Light::default(), vec![teapot])
}
