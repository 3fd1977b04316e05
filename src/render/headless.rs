use std::collections::HashMap;

use glam::Vec3;
use log::debug;

use crate::mesh::VertexLayout;
use crate::shader::{ProgramDescriptor, UniformBlock};
use crate::texture::TextureData;

use super::{
    check_attributes, BufferHandle, GraphicsContext, GraphicsError, Handle, HandleAllocator,
    ProgramHandle, Scalar, TextureHandle, Topology, VertexArrayHandle,
};

/// A draw call as seen by the GPU: the program's uniform bytes are captured
/// at the moment of the call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub vertex_array: VertexArrayHandle,
    pub topology: Topology,
    pub vertex_count: usize,
    pub texture: Option<TextureHandle>,
    pub uniforms: Vec<u8>,
}

struct Program {
    label: String,
    attributes: Vec<String>,
    block: UniformBlock,
    textured: bool,
    texture: Option<TextureHandle>,
}

struct VertexArray {
    program: ProgramHandle,
    vertex_count: usize,
}

/// In-memory graphics context.
///
/// Validates every call the way a driver would (unknown handles, unknown
/// uniform names, size mismatches, double release) and keeps the resulting
/// GPU-visible state inspectable.
pub struct HeadlessContext {
    viewport: (u32, u32),
    handles: HandleAllocator,
    buffers: HashMap<u32, usize>,
    programs: HashMap<u32, Program>,
    vertex_arrays: HashMap<u32, VertexArray>,
    textures: HashMap<u32, (u32, u32)>,
    frame_draws: Vec<DrawCall>,
    draw_count: u64,
    frames: u64,
    in_frame: bool,
    wireframe: bool,
    clear_color: Vec3,
}

impl HeadlessContext {
    pub fn new(viewport: (u32, u32)) -> Self {
        Self {
            viewport,
            handles: HandleAllocator::default(),
            buffers: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            frame_draws: Vec::new(),
            draw_count: 0,
            frames: 0,
            in_frame: false,
            wireframe: false,
            clear_color: Vec3::ZERO,
        }
    }

    /// Current bytes of a uniform field.
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<&[u8]> {
        self.programs.get(&program.0)?.block.read(name)
    }

    /// Whole uniform block of a program.
    pub fn uniform_block(&self, program: ProgramHandle) -> Option<&[u8]> {
        self.programs.get(&program.0).map(|program| program.block.bytes())
    }

    pub fn program_label(&self, program: ProgramHandle) -> Option<&str> {
        self.programs.get(&program.0).map(|program| program.label.as_str())
    }

    /// Draws issued since the last `begin_frame`.
    pub fn frame_draws(&self) -> &[DrawCall] {
        &self.frame_draws
    }

    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    /// Completed frames.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn clear_color(&self) -> Vec3 {
        self.clear_color
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        let id = handle.id();
        match handle {
            Handle::Buffer(_) => self.buffers.contains_key(&id),
            Handle::Program(_) => self.programs.contains_key(&id),
            Handle::VertexArray(_) => self.vertex_arrays.contains_key(&id),
            Handle::Texture(_) => self.textures.contains_key(&id),
        }
    }

    pub fn live_handles(&self) -> usize {
        self.buffers.len() + self.programs.len() + self.vertex_arrays.len() + self.textures.len()
    }

    fn program_mut(&mut self, program: ProgramHandle) -> Result<&mut Program, GraphicsError> {
        self.programs
            .get_mut(&program.0)
            .ok_or(GraphicsError::UnknownHandle {
                kind: "program",
                id: program.0,
            })
    }
}

impl GraphicsContext for HeadlessContext {
    fn begin_frame(&mut self, clear_color: Vec3) -> Result<(), GraphicsError> {
        self.clear_color = clear_color;
        self.frame_draws.clear();
        self.in_frame = true;
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GraphicsError> {
        if !self.in_frame {
            return Err(GraphicsError::NoActiveFrame);
        }
        self.in_frame = false;
        self.frames += 1;
        Ok(())
    }

    fn create_buffer(&mut self, label: &str, bytes: &[u8]) -> Result<BufferHandle, GraphicsError> {
        let id = self.handles.next();
        debug!("headless buffer #{id} `{label}` ({} bytes)", bytes.len());
        self.buffers.insert(id, bytes.len());
        Ok(BufferHandle(id))
    }

    fn create_program(
        &mut self,
        descriptor: &ProgramDescriptor,
    ) -> Result<ProgramHandle, GraphicsError> {
        let id = self.handles.next();
        self.programs.insert(
            id,
            Program {
                label: descriptor.label.clone(),
                attributes: descriptor.attributes.clone(),
                block: UniformBlock::new(descriptor.uniforms.clone()),
                textured: descriptor.textured,
                texture: None,
            },
        );
        Ok(ProgramHandle(id))
    }

    fn create_vertex_array(
        &mut self,
        program: ProgramHandle,
        buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> Result<VertexArrayHandle, GraphicsError> {
        let bytes = *self
            .buffers
            .get(&buffer.0)
            .ok_or(GraphicsError::UnknownHandle {
                kind: "buffer",
                id: buffer.0,
            })?;
        let attributes = &self.program_mut(program)?.attributes;
        check_attributes(attributes, layout)?;
        let stride = layout.stride() * std::mem::size_of::<f32>();
        if stride == 0 || bytes % stride != 0 {
            return Err(GraphicsError::MalformedVertexData {
                len: bytes / std::mem::size_of::<f32>(),
                stride: layout.stride(),
            });
        }
        let id = self.handles.next();
        self.vertex_arrays.insert(
            id,
            VertexArray {
                program,
                vertex_count: bytes / stride,
            },
        );
        Ok(VertexArrayHandle(id))
    }

    fn create_texture(&mut self, texture: &TextureData) -> Result<TextureHandle, GraphicsError> {
        let id = self.handles.next();
        self.textures
            .insert(id, (texture.width(), texture.height()));
        Ok(TextureHandle(id))
    }

    fn set_uniform_scalar(
        &mut self,
        program: ProgramHandle,
        name: &str,
        value: Scalar,
    ) -> Result<(), GraphicsError> {
        self.program_mut(program)?.block.write_scalar(name, value)
    }

    fn set_uniform_bytes(
        &mut self,
        program: ProgramHandle,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), GraphicsError> {
        self.program_mut(program)?.block.write_bytes(name, bytes)
    }

    fn bind_texture(
        &mut self,
        program: ProgramHandle,
        texture: TextureHandle,
    ) -> Result<(), GraphicsError> {
        if !self.textures.contains_key(&texture.0) {
            return Err(GraphicsError::UnknownHandle {
                kind: "texture",
                id: texture.0,
            });
        }
        let entry = self.program_mut(program)?;
        if !entry.textured {
            return Err(GraphicsError::NotTextured(program.0));
        }
        entry.texture = Some(texture);
        Ok(())
    }

    fn draw(
        &mut self,
        vertex_array: VertexArrayHandle,
        topology: Topology,
    ) -> Result<(), GraphicsError> {
        if !self.in_frame {
            return Err(GraphicsError::NoActiveFrame);
        }
        let array = self
            .vertex_arrays
            .get(&vertex_array.0)
            .ok_or(GraphicsError::UnknownHandle {
                kind: "vertex array",
                id: vertex_array.0,
            })?;
        let (program_handle, vertex_count) = (array.program, array.vertex_count);
        let program = self.program_mut(program_handle)?;
        let call = DrawCall {
            program: program_handle,
            vertex_array,
            topology,
            vertex_count,
            texture: program.texture,
            uniforms: program.block.bytes().to_vec(),
        };
        self.frame_draws.push(call);
        self.draw_count += 1;
        Ok(())
    }

    fn release(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        let id = handle.id();
        let removed = match handle {
            Handle::Buffer(_) => self.buffers.remove(&id).is_some(),
            Handle::Program(_) => self.programs.remove(&id).is_some(),
            Handle::VertexArray(_) => self.vertex_arrays.remove(&id).is_some(),
            Handle::Texture(_) => self.textures.remove(&id).is_some(),
        };
        if removed {
            Ok(())
        } else {
            Err(GraphicsError::UnknownHandle {
                kind: handle.kind(),
                id,
            })
        }
    }

    fn set_wireframe(&mut self, enabled: bool) {
        self.wireframe = enabled;
    }

    fn viewport(&self) -> (u32, u32) {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshKind;
    use crate::shader::ProgramKind;

    fn vertex_color_setup(ctx: &mut HeadlessContext) -> (ProgramHandle, VertexArrayHandle) {
        let kind = ProgramKind::VertexColor;
        let program = ctx
            .create_program(&kind.descriptor("cube", kind.builtin_sources()))
            .unwrap();
        let mesh = MeshKind::SolidCube.build().unwrap();
        let buffer = ctx
            .create_buffer("cube", bytemuck::cast_slice(mesh.vertices()))
            .unwrap();
        let vao = ctx
            .create_vertex_array(program, buffer, mesh.layout())
            .unwrap();
        (program, vao)
    }

    #[test]
    fn draw_requires_an_open_frame() {
        let mut ctx = HeadlessContext::new((640, 480));
        let (_, vao) = vertex_color_setup(&mut ctx);
        assert!(matches!(
            ctx.draw(vao, Topology::Triangles),
            Err(GraphicsError::NoActiveFrame)
        ));
        ctx.begin_frame(Vec3::ZERO).unwrap();
        ctx.draw(vao, Topology::Triangles).unwrap();
        ctx.end_frame().unwrap();
        assert_eq!(ctx.frame_draws()[0].vertex_count, 36);
        assert_eq!(ctx.frames(), 1);

        ctx.begin_frame(Vec3::ZERO).unwrap();
        assert!(ctx.frame_draws().is_empty());
        ctx.draw(vao, Topology::LineStrip).unwrap();
        ctx.end_frame().unwrap();
        assert_eq!(ctx.draw_count(), 2);
        assert_eq!(ctx.program_label(ctx.frame_draws()[0].program), Some("cube"));
    }

    #[test]
    fn vertex_layout_must_match_program_inputs() {
        let mut ctx = HeadlessContext::new((640, 480));
        let kind = ProgramKind::Lit;
        let program = ctx
            .create_program(&kind.descriptor("lit", kind.builtin_sources()))
            .unwrap();
        let mesh = MeshKind::SolidCube.build().unwrap();
        let buffer = ctx
            .create_buffer("cube", bytemuck::cast_slice(mesh.vertices()))
            .unwrap();
        assert!(matches!(
            ctx.create_vertex_array(program, buffer, mesh.layout()),
            Err(GraphicsError::AttributeMismatch(_))
        ));
    }

    #[test]
    fn release_is_single_shot() {
        let mut ctx = HeadlessContext::new((640, 480));
        let (program, vao) = vertex_color_setup(&mut ctx);
        assert_eq!(ctx.live_handles(), 3);
        ctx.release(Handle::VertexArray(vao)).unwrap();
        ctx.release(Handle::Program(program)).unwrap();
        assert!(ctx.release(Handle::Program(program)).is_err());
        assert!(!ctx.is_live(Handle::Program(program)));
        assert_eq!(ctx.live_handles(), 1);
    }

    #[test]
    fn untextured_programs_reject_textures() {
        let mut ctx = HeadlessContext::new((640, 480));
        let (program, _) = vertex_color_setup(&mut ctx);
        let texture = ctx.create_texture(&TextureData::solid(Vec3::ONE)).unwrap();
        assert!(matches!(
            ctx.bind_texture(program, texture),
            Err(GraphicsError::NotTextured(_))
        ));
    }
}
