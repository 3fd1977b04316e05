use anyhow::{anyhow, Context, Result};
use glam::{Mat4, Vec3};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::material::Material;
use crate::mesh::MeshKind;
use crate::render::{
    BufferHandle, GraphicsContext, GraphicsError, Handle, ProgramHandle, TextureHandle, Topology,
    VertexArrayHandle,
};
use crate::shader::{ProgramKind, ShaderFiles};
use crate::texture::TextureData;

/// Rotation applied by the built-in demos on every frame.
pub const DEMO_SPIN_RADIANS: f32 = 0.02;

/// Incremental transform applied to a model once per rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Animation {
    #[default]
    Static,
    Spin { axis: Vec3, radians: f32 },
}

impl Animation {
    /// The demos' spin about +Y.
    pub fn demo_spin() -> Self {
        Self::Spin {
            axis: Vec3::Y,
            radians: DEMO_SPIN_RADIANS,
        }
    }

    /// Transform to right-multiply onto the model matrix, if any.
    pub fn step(self) -> Option<Mat4> {
        match self {
            Self::Static => None,
            // a zero axis has no rotation to apply
            Self::Spin { axis, radians } => axis
                .try_normalize()
                .map(|axis| Mat4::from_axis_angle(axis, radians)),
        }
    }
}

/// Procedural pixel source for a model texture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TextureSource {
    Checkerboard {
        size: u32,
        cells: u32,
        first: Vec3,
        second: Vec3,
    },
    Solid(Vec3),
}

impl TextureSource {
    /// Named textures used by the demo scenes.
    pub fn from_name(name: &str) -> Option<Self> {
        let checker = |first: Vec3, second: Vec3| Self::Checkerboard {
            size: 64,
            cells: 8,
            first,
            second,
        };
        let source = match name {
            "test" | "checkerboard" => checker(Vec3::ONE, Vec3::ZERO),
            "companion_cube" => checker(Vec3::new(0.85, 0.85, 0.88), Vec3::new(0.93, 0.45, 0.7)),
            "wooden_box" => checker(Vec3::new(0.55, 0.35, 0.17), Vec3::new(0.42, 0.26, 0.12)),
            "metal_box" => checker(Vec3::new(0.6, 0.62, 0.65), Vec3::new(0.35, 0.36, 0.4)),
            "golden_box" => checker(Vec3::new(0.95, 0.78, 0.25), Vec3::new(0.7, 0.52, 0.1)),
            "white" => Self::Solid(Vec3::ONE),
            _ => return None,
        };
        Some(source)
    }

    pub fn decode(&self) -> Result<TextureData, GraphicsError> {
        match *self {
            Self::Checkerboard {
                size,
                cells,
                first,
                second,
            } => TextureData::checkerboard(size, cells, first, second),
            Self::Solid(color) => Ok(TextureData::solid(color)),
        }
    }
}

/// Data-driven description of a model: which mesh, which program, which
/// surface and where it starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub mesh: MeshKind,
    pub program: ProgramKind,
    /// Shader files replacing the program's embedded WGSL.
    #[serde(default)]
    pub shader: Option<ShaderFiles>,
    #[serde(default)]
    pub material: Material,
    /// Uniform color of flat programs.
    pub color: Vec3,
    #[serde(default)]
    pub texture: Option<TextureSource>,
    #[serde(default)]
    pub position: Vec3,
    pub topology: Topology,
    #[serde(default)]
    pub animation: Animation,
}

impl ModelDescriptor {
    /// Descriptor with the program and topology the mesh was built for.
    pub fn new(name: impl Into<String>, mesh: MeshKind) -> Self {
        let program = match mesh {
            MeshKind::Triangle | MeshKind::TeapotPatches => ProgramKind::Flat,
            MeshKind::SolidCube | MeshKind::WireCube => ProgramKind::VertexColor,
            MeshKind::TexturedCube => ProgramKind::Lit,
        };
        Self {
            name: name.into(),
            mesh,
            program,
            shader: None,
            material: Material::default(),
            color: Vec3::ONE,
            texture: None,
            position: Vec3::ZERO,
            topology: mesh.default_topology(),
            animation: Animation::Static,
        }
    }

    pub fn with_program(mut self, program: ProgramKind) -> Self {
        self.program = program;
        self
    }

    pub fn with_shader(mut self, shader: ShaderFiles) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    pub fn with_texture(mut self, texture: TextureSource) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_animation(mut self, animation: Animation) -> Self {
        self.animation = animation;
        self
    }
}

/// A mesh uploaded to the GPU together with its program, texture and
/// world transform.
#[derive(Debug)]
pub struct Model {
    name: String,
    kind: ProgramKind,
    program: ProgramHandle,
    buffer: BufferHandle,
    vertex_array: VertexArrayHandle,
    texture: Option<TextureHandle>,
    topology: Topology,
    model_matrix: Mat4,
    material: Material,
    color: Vec3,
    animation: Animation,
    /// Handles not released yet.
    live: Vec<Handle>,
}

impl Model {
    /// Uploads the descriptor's mesh, program and texture.
    ///
    /// Handles created before a failure are released again.
    pub fn new<G: GraphicsContext + ?Sized>(
        ctx: &mut G,
        descriptor: &ModelDescriptor,
    ) -> Result<Self> {
        let name = &descriptor.name;
        if descriptor.texture.is_some() && !descriptor.program.is_lit() {
            return Err(anyhow!(
                "model `{name}` has a texture but its {} program does not sample one",
                descriptor.program.name()
            ));
        }
        let mesh = descriptor
            .mesh
            .build()
            .with_context(|| format!("failed to build mesh for model `{name}`"))?;
        let texture_data = descriptor
            .texture
            .map(|source| source.decode())
            .transpose()
            .with_context(|| format!("failed to decode texture for model `{name}`"))?;
        let sources = match &descriptor.shader {
            Some(files) => files
                .load()
                .with_context(|| format!("failed to load shaders for model `{name}`"))?,
            None => descriptor.program.builtin_sources(),
        };

        let mut created = Vec::new();
        let result = (|| -> Result<Self, GraphicsError> {
            let program = ctx.create_program(&descriptor.program.descriptor(name, sources))?;
            created.push(Handle::Program(program));
            let buffer = ctx.create_buffer(name, bytemuck::cast_slice(mesh.vertices()))?;
            created.push(Handle::Buffer(buffer));
            let vertex_array = ctx.create_vertex_array(program, buffer, mesh.layout())?;
            created.push(Handle::VertexArray(vertex_array));
            let texture = texture_data
                .as_ref()
                .map(|data| ctx.create_texture(data))
                .transpose()?;
            let mut model = Self {
                name: name.clone(),
                kind: descriptor.program,
                program,
                buffer,
                vertex_array,
                texture,
                topology: descriptor.topology,
                model_matrix: Mat4::from_translation(descriptor.position),
                material: descriptor.material,
                color: descriptor.color,
                animation: descriptor.animation,
                live: Vec::new(),
            };
            model.live = model.handles();
            Ok(model)
        })();

        match result {
            Ok(model) => {
                debug!(
                    "model `{name}` uploaded ({} vertices, {} program)",
                    mesh.vertex_count(),
                    descriptor.program.name()
                );
                Ok(model)
            }
            Err(err) => {
                for handle in created.into_iter().rev() {
                    // keep the first error
                    let _ = ctx.release(handle);
                }
                Err(err).with_context(|| format!("failed to create model `{name}`"))
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program_kind(&self) -> ProgramKind {
        self.kind
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn vertex_array(&self) -> VertexArrayHandle {
        self.vertex_array
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }

    /// World position encoded in the model matrix.
    pub fn position(&self) -> Vec3 {
        self.model_matrix.w_axis.truncate()
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn animation(&self) -> Animation {
        self.animation
    }

    pub fn is_lit(&self) -> bool {
        self.kind.is_lit()
    }

    pub fn is_destroyed(&self) -> bool {
        self.live.is_empty()
    }

    /// Every GPU handle owned by the model.
    pub fn handles(&self) -> Vec<Handle> {
        let mut handles = vec![
            Handle::VertexArray(self.vertex_array),
            Handle::Buffer(self.buffer),
            Handle::Program(self.program),
        ];
        handles.extend(self.texture.map(Handle::Texture));
        handles
    }

    /// Right-multiplies `transformation` onto the model matrix.
    pub fn transform(&mut self, transformation: Mat4) {
        self.model_matrix *= transformation;
    }

    /// Applies one frame of the model's animation.
    pub fn animate(&mut self) {
        if let Some(step) = self.animation.step() {
            self.transform(step);
        }
    }

    /// Releases the model's GPU resources. Later calls do nothing.
    ///
    /// Every handle is attempted even when one fails; handles that could not
    /// be released are kept and retried by the next call, and the first
    /// error is returned.
    pub fn destroy<G: GraphicsContext + ?Sized>(
        &mut self,
        ctx: &mut G,
    ) -> Result<(), GraphicsError> {
        if self.live.is_empty() {
            return Ok(());
        }
        let mut first_error = None;
        self.live.retain(|handle| match ctx.release(*handle) {
            Ok(()) => false,
            Err(err) => {
                first_error.get_or_insert(err);
                true
            }
        });
        match first_error {
            Some(err) => Err(err),
            None => {
                debug!("model `{}` destroyed", self.name);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessContext;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn model_matrix_starts_at_position() {
        let mut ctx = HeadlessContext::new((800, 600));
        let model = Model::new(
            &mut ctx,
            &ModelDescriptor::new("cube", MeshKind::SolidCube).at(Vec3::new(1.0, 2.0, 3.0)),
        )
        .unwrap();
        assert_eq!(model.model_matrix(), Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(model.topology(), Topology::Triangles);
        assert_eq!(model.program_kind(), ProgramKind::VertexColor);
    }

    #[test]
    fn transform_right_multiplies() {
        let mut ctx = HeadlessContext::new((800, 600));
        let mut model = Model::new(
            &mut ctx,
            &ModelDescriptor::new("cube", MeshKind::SolidCube).at(Vec3::X),
        )
        .unwrap();
        let rotation = Mat4::from_rotation_y(FRAC_PI_2);
        model.transform(rotation);
        // rotating in object space keeps the translation
        assert!(model.position().abs_diff_eq(Vec3::X, 1e-6));
        assert!(model
            .model_matrix()
            .abs_diff_eq(Mat4::from_translation(Vec3::X) * rotation, 1e-6));
    }

    #[test]
    fn spin_accumulates_per_frame() {
        let mut ctx = HeadlessContext::new((800, 600));
        let mut model = Model::new(
            &mut ctx,
            &ModelDescriptor::new("cube", MeshKind::SolidCube)
                .with_animation(Animation::demo_spin()),
        )
        .unwrap();
        for _ in 0..10 {
            model.animate();
        }
        let expected = Mat4::from_rotation_y(10.0 * DEMO_SPIN_RADIANS);
        assert!(model.model_matrix().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn zero_axis_spin_leaves_the_model_alone() {
        let spin = Animation::Spin {
            axis: Vec3::ZERO,
            radians: DEMO_SPIN_RADIANS,
        };
        assert_eq!(spin.step(), None);
        let tilted = Animation::Spin {
            axis: Vec3::new(0.0, 0.0, 3.0),
            radians: DEMO_SPIN_RADIANS,
        };
        let expected = Mat4::from_rotation_z(DEMO_SPIN_RADIANS);
        assert!(tilted.step().unwrap().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn destroy_releases_everything_once() {
        let mut ctx = HeadlessContext::new((800, 600));
        let mut model = Model::new(
            &mut ctx,
            &ModelDescriptor::new("crate", MeshKind::TexturedCube)
                .with_texture(TextureSource::from_name("wooden_box").unwrap()),
        )
        .unwrap();
        assert_eq!(ctx.live_handles(), 4);
        model.destroy(&mut ctx).unwrap();
        assert_eq!(ctx.live_handles(), 0);
        model.destroy(&mut ctx).unwrap();
        assert!(model.is_destroyed());
    }

    #[test]
    fn destroy_keeps_going_after_a_failed_release() {
        let mut ctx = HeadlessContext::new((800, 600));
        let mut model = Model::new(
            &mut ctx,
            &ModelDescriptor::new("crate", MeshKind::TexturedCube)
                .with_texture(TextureSource::Solid(Vec3::ONE)),
        )
        .unwrap();
        ctx.release(Handle::Buffer(model.buffer)).unwrap();

        assert!(matches!(
            model.destroy(&mut ctx),
            Err(GraphicsError::UnknownHandle { kind: "buffer", .. })
        ));
        assert_eq!(ctx.live_handles(), 0);
        assert!(!model.is_destroyed());
        assert_eq!(model.live, vec![Handle::Buffer(model.buffer)]);
    }

    #[test]
    fn failed_construction_releases_partial_handles() {
        let mut ctx = HeadlessContext::new((800, 600));
        let descriptor =
            ModelDescriptor::new("mismatch", MeshKind::SolidCube).with_program(ProgramKind::Lit);
        let err = Model::new(&mut ctx, &descriptor).unwrap_err();
        assert!(format!("{err:#}").contains("mismatch"));
        assert_eq!(ctx.live_handles(), 0);
    }

    #[test]
    fn texture_requires_a_lit_program() {
        let mut ctx = HeadlessContext::new((800, 600));
        let descriptor = ModelDescriptor::new("cube", MeshKind::SolidCube)
            .with_texture(TextureSource::Solid(Vec3::ONE));
        assert!(Model::new(&mut ctx, &descriptor).is_err());
    }

    #[test]
    fn missing_shader_files_abort_construction() {
        let mut ctx = HeadlessContext::new((800, 600));
        let dir = tempfile::tempdir().unwrap();
        let descriptor = ModelDescriptor::new("triangle", MeshKind::Triangle)
            .with_shader(ShaderFiles::new(dir.path().join("default")));
        let err = Model::new(&mut ctx, &descriptor).unwrap_err();
        assert!(format!("{err:#}").contains("default.vert"));
        assert_eq!(ctx.live_handles(), 0);
    }
}
