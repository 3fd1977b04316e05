//! Minimal real-time 3D rendering playground.
//!
//! A first-person [`Camera`], a point [`Light`] and a table of [`Material`]
//! presets feed the uniforms of every [`Model`] in a [`Scene`]. Scenes are
//! rendered through the [`GraphicsContext`] trait, which is implemented by a
//! wgpu backend for windows and by an in-memory backend that records every
//! call so that the per-frame sequence can be inspected in tests and
//! headless runs.

pub mod camera;
pub mod demos;
pub mod description;
pub mod engine;
pub mod input;
pub mod light;
pub mod material;
pub mod mesh;
pub mod model;
pub mod render;
pub mod scene;
pub mod shader;
pub mod texture;

pub use camera::{Camera, CameraSettings, Movement};
pub use description::SceneDescription;
pub use engine::{Engine, EngineConfig};
pub use input::{Command, InputState, KeyBindings, KeyCode, NamedKey};
pub use light::Light;
pub use material::Material;
pub use mesh::{MeshData, MeshKind, VertexLayout};
pub use model::{Animation, Model, ModelDescriptor, TextureSource};
pub use render::{
    GraphicsContext, GraphicsError, Handle, HeadlessContext, Topology, WgpuContext,
};
pub use scene::{Scene, SceneError, UniformValue};
pub use shader::{ProgramKind, ShaderFiles, ShaderSources};
pub use texture::TextureData;
