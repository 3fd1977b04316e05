use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use log::info;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::light::Light;
use crate::material::Material;
use crate::mesh::MeshKind;
use crate::model::{Animation, Model, ModelDescriptor, TextureSource};
use crate::render::{GraphicsContext, Topology};
use crate::scene::Scene;
use crate::shader::{ProgramKind, ShaderFiles};

/// Declarative scene: a light plus the models to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    pub name: String,
    #[serde(default)]
    pub light: Light,
    pub models: Vec<ModelDescriptor>,
}

impl SceneDescription {
    pub fn new(name: impl Into<String>, light: Light, models: Vec<ModelDescriptor>) -> Self {
        Self {
            name: name.into(),
            light,
            models,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        Self::from_xml(&xml).with_context(|| format!("failed to parse scene {}", path.display()))
    }

    /// Parses a scene description:
    ///
    /// ```xml
    /// <scene name="boxes">
    ///   <light><position>3 3 -3</position><color>255 255 255</color></light>
    ///   <model>
    ///     <name>crate</name>
    ///     <mesh>textured_cube</mesh>
    ///     <material>chrome</material>
    ///     <texture>metal_box</texture>
    ///     <position>2 0 0</position>
    ///     <spin>0.02</spin>
    ///   </model>
    /// </scene>
    /// ```
    ///
    /// Colors are given as 0-255 components.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            return Err(anyhow!(
                "expected a <scene> root element, found <{}>",
                root.tag_name().name()
            ));
        }
        let name = root.attribute("name").unwrap_or("scene").to_string();

        let light = match root.children().find(|child| child.has_tag_name("light")) {
            Some(node) => {
                let defaults = Light::default();
                Light::new(
                    parse_vec3(optional_text(&node, "position"), defaults.position())
                        .context("invalid light position")?,
                    parse_color(optional_text(&node, "color"), defaults.color())
                        .context("invalid light color")?,
                )
            }
            None => Light::default(),
        };

        let models = root
            .children()
            .filter(|child| child.has_tag_name("model"))
            .map(|node| parse_model(&node))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name,
            light,
            models,
        })
    }

    /// Uploads every model and primes the resulting scene.
    pub fn build<G: GraphicsContext + ?Sized>(
        &self,
        ctx: &mut G,
        camera: &Camera,
    ) -> Result<Scene> {
        let mut models = Vec::with_capacity(self.models.len());
        for descriptor in &self.models {
            match Model::new(ctx, descriptor) {
                Ok(model) => models.push(model),
                Err(err) => {
                    for model in &mut models {
                        let _ = model.destroy(ctx);
                    }
                    return Err(err)
                        .with_context(|| format!("failed to build scene `{}`", self.name));
                }
            }
        }
        let scene = Scene::new(ctx, camera, &self.name, self.light, models)
            .with_context(|| format!("failed to prime scene `{}`", self.name))?;
        info!("scene `{}` ready with {} model(s)", self.name, scene.models().len());
        Ok(scene)
    }
}

fn parse_model(node: &Node<'_, '_>) -> Result<ModelDescriptor> {
    let name = required_text(node, "name")?;
    let context = || format!("invalid model `{name}`");

    let mesh_name = required_text(node, "mesh").with_context(context)?;
    let mesh = MeshKind::from_name(&mesh_name)
        .ok_or_else(|| anyhow!("unknown mesh `{mesh_name}`"))
        .with_context(context)?;
    let mut descriptor = ModelDescriptor::new(name.clone(), mesh);

    if let Some(program) = optional_text(node, "program") {
        let kind = ProgramKind::from_name(&program)
            .ok_or_else(|| anyhow!("unknown program `{program}`"))
            .with_context(context)?;
        descriptor = descriptor.with_program(kind);
    }
    if let Some(shader) = node.children().find(|child| child.has_tag_name("shader")) {
        let stem = shader
            .text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!("<shader> needs a path stem"))
            .with_context(context)?;
        let mut files = ShaderFiles::new(stem);
        files.geometry = shader.attribute("geometry") == Some("true");
        files.tessellation = shader.attribute("tessellation") == Some("true");
        descriptor = descriptor.with_shader(files);
    }

    let mut material = Material::default();
    if let Some(preset) = optional_text(node, "material") {
        material.set_preset(&preset);
    }
    if let Some(brightness) = optional_text(node, "brightness") {
        material = material.with_surface_brightness(
            parse_f32(Some(brightness), material.surface_brightness).with_context(context)?,
        );
    }
    let color = parse_color(optional_text(node, "color"), descriptor.color).with_context(context)?;
    let position =
        parse_vec3(optional_text(node, "position"), descriptor.position).with_context(context)?;
    descriptor = descriptor
        .with_material(material)
        .with_color(color)
        .at(position);

    if let Some(texture) = optional_text(node, "texture") {
        let source = TextureSource::from_name(&texture)
            .ok_or_else(|| anyhow!("unknown texture `{texture}`"))
            .with_context(context)?;
        descriptor = descriptor.with_texture(source);
    }
    if let Some(topology) = optional_text(node, "topology") {
        let topology = Topology::from_name(&topology)
            .ok_or_else(|| anyhow!("unknown topology `{topology}`"))
            .with_context(context)?;
        descriptor = descriptor.with_topology(topology);
    }
    if let Some(spin) = optional_text(node, "spin") {
        let radians = parse_f32(Some(spin), 0.0).with_context(context)?;
        let axis = parse_vec3(optional_text(node, "spin_axis"), Vec3::Y).with_context(context)?;
        if axis.length_squared() <= f32::EPSILON {
            return Err(anyhow!("<spin_axis> must not be the zero vector")).with_context(context);
        }
        descriptor = descriptor.with_animation(Animation::Spin { axis, radians });
    }

    Ok(descriptor)
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_components(value: &str, what: &str) -> Result<Vec3> {
    let numbers = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid {what} component `{component}`: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    match numbers[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err(anyhow!(
            "{what} needs 3 components, found {}",
            numbers.len()
        )),
    }
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => parse_components(&value, "vector"),
        None => Ok(default),
    }
}

fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => Ok(parse_components(&value, "color")? / 255.0),
        None => Ok(default),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessContext;

    const SAMPLE: &str = r#"
    <scene name="boxes">
        <light>
            <position>0 5 0</position>
            <color>255 128 0</color>
        </light>
        <model>
            <name>metal</name>
            <mesh>textured_cube</mesh>
            <material>chrome</material>
            <texture>metal_box</texture>
            <position>2 0 0</position>
            <spin>0.02</spin>
        </model>
        <model>
            <name>outline</name>
            <mesh>skeleton_cube</mesh>
        </model>
    </scene>
    "#;

    #[test]
    fn parses_light_and_models() {
        let description = SceneDescription::from_xml(SAMPLE).unwrap();
        assert_eq!(description.name, "boxes");
        assert_eq!(description.light.position(), Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(description.light.color(), Vec3::new(1.0, 128.0 / 255.0, 0.0));
        assert_eq!(description.models.len(), 2);

        let metal = &description.models[0];
        assert_eq!(metal.program, ProgramKind::Lit);
        assert_eq!(metal.material, Material::preset("chrome").unwrap());
        assert_eq!(metal.position, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(metal.animation, Animation::demo_spin());

        let outline = &description.models[1];
        assert_eq!(outline.mesh, MeshKind::WireCube);
        assert_eq!(outline.topology, Topology::LineStrip);
        assert_eq!(outline.animation, Animation::Static);
    }

    #[test]
    fn unknown_material_keeps_the_default() {
        let xml = "<scene><model><name>a</name><mesh>textured_cube</mesh><material>unobtainium</material></model></scene>";
        let description = SceneDescription::from_xml(xml).unwrap();
        assert_eq!(description.models[0].material, Material::default());
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><model><mesh>triangle</mesh></model></scene>";
        assert!(SceneDescription::from_xml(bad).is_err());
    }

    #[test]
    fn rejects_unknown_mesh_and_short_vectors() {
        let mesh = "<scene><model><name>a</name><mesh>dodecahedron</mesh></model></scene>";
        let err = SceneDescription::from_xml(mesh).unwrap_err();
        assert!(format!("{err:#}").contains("dodecahedron"));

        let vector = "<scene><model><name>a</name><mesh>triangle</mesh><position>1 2</position></model></scene>";
        assert!(SceneDescription::from_xml(vector).is_err());
    }

    #[test]
    fn spin_axis_must_have_a_direction() {
        let spin = |axis: &str| {
            format!(
                "<scene><model><name>a</name><mesh>solid_cube</mesh>\
                 <spin>0.02</spin><spin_axis>{axis}</spin_axis></model></scene>"
            )
        };
        let err = SceneDescription::from_xml(&spin("0 0 0")).unwrap_err();
        assert!(format!("{err:#}").contains("zero vector"));

        let description = SceneDescription::from_xml(&spin("0 0 2")).unwrap();
        assert_eq!(
            description.models[0].animation,
            Animation::Spin {
                axis: Vec3::new(0.0, 0.0, 2.0),
                radians: 0.02
            }
        );
    }

    #[test]
    fn builds_a_primed_scene() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let camera = Camera::new(ctx.viewport());
        let scene = SceneDescription::from_xml(SAMPLE)
            .unwrap()
            .build(&mut ctx, &camera)
            .unwrap();
        assert_eq!(scene.models().len(), 2);
        assert_eq!(ctx.live_handles(), 4 + 3);
    }

    #[test]
    fn failed_build_releases_earlier_models() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let camera = Camera::new(ctx.viewport());
        let xml = r#"<scene>
            <model><name>ok</name><mesh>solid_cube</mesh></model>
            <model><name>bad</name><mesh>solid_cube</mesh><program>lit</program></model>
        </scene>"#;
        let err = SceneDescription::from_xml(xml)
            .unwrap()
            .build(&mut ctx, &camera)
            .unwrap_err();
        assert!(format!("{err:#}").contains("bad"));
        assert_eq!(ctx.live_handles(), 0);
    }
}
