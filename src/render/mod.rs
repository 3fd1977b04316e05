//! Graphics API seam.
//!
//! The scene layer only talks to a [`GraphicsContext`]. `native` drives a
//! window surface through wgpu; `headless` keeps the same state in memory so
//! the uniform loop can run without a GPU.

pub mod headless;
pub mod native;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mesh::VertexLayout;
use crate::shader::ProgramDescriptor;
use crate::texture::TextureData;

pub use headless::HeadlessContext;
pub use native::WgpuContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u32);

/// Any GPU resource that can be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Buffer(BufferHandle),
    Program(ProgramHandle),
    VertexArray(VertexArrayHandle),
    Texture(TextureHandle),
}

impl Handle {
    pub fn kind(self) -> &'static str {
        match self {
            Self::Buffer(_) => "buffer",
            Self::Program(_) => "program",
            Self::VertexArray(_) => "vertex array",
            Self::Texture(_) => "texture",
        }
    }

    pub fn id(self) -> u32 {
        match self {
            Self::Buffer(BufferHandle(id))
            | Self::Program(ProgramHandle(id))
            | Self::VertexArray(VertexArrayHandle(id))
            | Self::Texture(TextureHandle(id)) => id,
        }
    }
}

/// Primitive assembly mode of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl Topology {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "points" => Some(Self::Points),
            "lines" => Some(Self::Lines),
            "line_strip" => Some(Self::LineStrip),
            "triangles" => Some(Self::Triangles),
            "triangle_strip" => Some(Self::TriangleStrip),
            _ => None,
        }
    }
}

/// Value for the scalar uniform path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Float(f32),
    Int(i32),
}

impl Scalar {
    pub fn kind_name(self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "int",
        }
    }
}

#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error("unknown {kind} handle #{id}")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("uniform `{name}` is not declared by the program")]
    UnknownUniform { name: String },
    #[error("uniform `{name}` expects {expected} bytes but {actual} were supplied")]
    UniformSize {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("uniform `{name}` is a {expected} but a {actual} value was supplied")]
    UniformKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("vertex layout does not match the program: {0}")]
    AttributeMismatch(String),
    #[error("vertex data holds {len} floats which is not a multiple of the {stride}-float stride")]
    MalformedVertexData { len: usize, stride: usize },
    #[error("texture of {width}x{height} cannot hold {len} bytes of RGBA8 data")]
    MalformedTexture { width: u32, height: u32, len: usize },
    #[error("{0} shaders are not supported by this backend")]
    UnsupportedStage(&'static str),
    #[error("program #{0} does not sample textures")]
    NotTextured(u32),
    #[error("draw issued outside of a frame")]
    NoActiveFrame,
    #[error("graphics backend failure: {0}")]
    Backend(String),
}

/// Minimal graphics API consumed by models and scenes.
///
/// Scalar uniforms and packed (vector/matrix) uniforms travel through two
/// separate entry points, mirroring the two upload paths of the underlying
/// API.
pub trait GraphicsContext {
    fn begin_frame(&mut self, clear_color: Vec3) -> Result<(), GraphicsError>;

    fn end_frame(&mut self) -> Result<(), GraphicsError>;

    fn create_buffer(&mut self, label: &str, bytes: &[u8]) -> Result<BufferHandle, GraphicsError>;

    fn create_program(
        &mut self,
        descriptor: &ProgramDescriptor,
    ) -> Result<ProgramHandle, GraphicsError>;

    fn create_vertex_array(
        &mut self,
        program: ProgramHandle,
        buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> Result<VertexArrayHandle, GraphicsError>;

    fn create_texture(&mut self, texture: &TextureData) -> Result<TextureHandle, GraphicsError>;

    fn set_uniform_scalar(
        &mut self,
        program: ProgramHandle,
        name: &str,
        value: Scalar,
    ) -> Result<(), GraphicsError>;

    fn set_uniform_bytes(
        &mut self,
        program: ProgramHandle,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Makes `texture` the one sampled by `program` on its next draws.
    fn bind_texture(
        &mut self,
        program: ProgramHandle,
        texture: TextureHandle,
    ) -> Result<(), GraphicsError>;

    fn draw(
        &mut self,
        vertex_array: VertexArrayHandle,
        topology: Topology,
    ) -> Result<(), GraphicsError>;

    fn release(&mut self, handle: Handle) -> Result<(), GraphicsError>;

    fn set_wireframe(&mut self, enabled: bool);

    /// Size of the render target in pixels.
    fn viewport(&self) -> (u32, u32);
}

/// Hands out monotonically increasing handle ids; ids are never reused.
#[derive(Debug, Default)]
pub(crate) struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub(crate) fn next(&mut self) -> u32 {
        self.next += 1;
        self.next
    }
}

/// Checks that a vertex layout feeds exactly the inputs a program declares.
pub(crate) fn check_attributes(
    program: &[String],
    layout: &VertexLayout,
) -> Result<(), GraphicsError> {
    let provided: Vec<&str> = layout.names().collect();
    let matches = provided.len() == program.len()
        && provided.iter().zip(program).all(|(a, b)| *a == b.as_str());
    if !matches {
        return Err(GraphicsError::AttributeMismatch(format!(
            "program expects {program:?}, vertex layout provides {provided:?}"
        )));
    }
    Ok(())
}
