use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use log::{info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::mesh::VertexLayout;
use crate::shader::{ProgramDescriptor, UniformBlock};
use crate::texture::TextureData;

use super::{
    check_attributes, BufferHandle, GraphicsContext, GraphicsError, Handle, HandleAllocator,
    ProgramHandle, Scalar, TextureHandle, Topology, VertexArrayHandle,
};

/// Graphics context backed by wgpu, drawing into a winit window.
///
/// Draw calls are collected during the frame, each with a snapshot of its
/// program's uniform block, and encoded into a single pass by `end_frame`.
/// Snapshots are immutable buffers, so a later uniform write never leaks into
/// a draw that was already recorded.
pub struct WgpuContext {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: DepthBuffer,
    cull_mode: Option<wgpu::Face>,
    wireframe: bool,
    wireframe_supported: bool,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    fallback_texture: GpuTexture,
    handles: HandleAllocator,
    buffers: HashMap<u32, wgpu::Buffer>,
    programs: HashMap<u32, GpuProgram>,
    vertex_arrays: HashMap<u32, GpuVertexArray>,
    textures: HashMap<u32, GpuTexture>,
    frame: Option<Frame>,
}

impl WgpuContext {
    /// Initializes the GPU for the provided window.
    pub async fn new(window: Arc<Window>, cull_face: bool) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let wireframe_supported = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if wireframe_supported {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("playground-device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform-bind-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let fallback_texture = GpuTexture::upload(
            &device,
            &queue,
            &texture_layout,
            &sampler,
            &TextureData::solid(Vec3::ONE),
            "fallback-texture",
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            depth,
            cull_mode: cull_face.then_some(wgpu::Face::Back),
            wireframe: false,
            wireframe_supported,
            uniform_layout,
            texture_layout,
            sampler,
            fallback_texture,
            handles: HandleAllocator::default(),
            buffers: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            frame: None,
        })
    }

    /// Returns the identifier of the window owned by the context.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    fn program(&self, program: ProgramHandle) -> Result<&GpuProgram, GraphicsError> {
        self.programs
            .get(&program.0)
            .ok_or(GraphicsError::UnknownHandle {
                kind: "program",
                id: program.0,
            })
    }

    fn program_mut(&mut self, program: ProgramHandle) -> Result<&mut GpuProgram, GraphicsError> {
        self.programs
            .get_mut(&program.0)
            .ok_or(GraphicsError::UnknownHandle {
                kind: "program",
                id: program.0,
            })
    }

    fn build_pipeline(
        &self,
        program: &GpuProgram,
        layout: &VertexLayout,
        topology: Topology,
    ) -> Result<wgpu::RenderPipeline, GraphicsError> {
        let mut offset = 0;
        let attributes: Vec<wgpu::VertexAttribute> = layout
            .attributes()
            .iter()
            .enumerate()
            .map(|(location, attribute)| {
                let format = match attribute.components {
                    1 => wgpu::VertexFormat::Float32,
                    2 => wgpu::VertexFormat::Float32x2,
                    3 => wgpu::VertexFormat::Float32x3,
                    _ => wgpu::VertexFormat::Float32x4,
                };
                let entry = wgpu::VertexAttribute {
                    format,
                    offset,
                    shader_location: location as u32,
                };
                offset += attribute.components as u64 * std::mem::size_of::<f32>() as u64;
                entry
            })
            .collect();

        let mut bind_group_layouts = vec![&self.uniform_layout];
        if program.textured {
            bind_group_layouts.push(&self.texture_layout);
        }
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{}-pipeline-layout", program.label)),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

        let filled = matches!(topology, Topology::Triangles | Topology::TriangleStrip);
        let polygon_mode = if filled && self.wireframe && self.wireframe_supported {
            wgpu::PolygonMode::Line
        } else {
            wgpu::PolygonMode::Fill
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{}-pipeline", program.label)),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: offset,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                },
                primitive: wgpu::PrimitiveState {
                    topology: primitive_topology(topology),
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: if filled { self.cull_mode } else { None },
                    polygon_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DepthBuffer::FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GraphicsError::Backend(format!(
                "pipeline for `{}` is invalid: {err}",
                program.label
            )));
        }
        Ok(pipeline)
    }

    /// Bind group holding the program's current uniform bytes. Unchanged
    /// blocks reuse the previous snapshot.
    fn uniform_snapshot(
        &mut self,
        program: ProgramHandle,
    ) -> Result<wgpu::BindGroup, GraphicsError> {
        let entry = self
            .programs
            .get_mut(&program.0)
            .ok_or(GraphicsError::UnknownHandle {
                kind: "program",
                id: program.0,
            })?;
        let dirty = entry.block.take_dirty();
        if let (false, Some(snapshot)) = (dirty, &entry.snapshot) {
            return Ok(snapshot.clone());
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}-uniforms", entry.label)),
                contents: entry.block.bytes(),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let snapshot = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}-uniform-bind-group", entry.label)),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        entry.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn shader_module(
        &self,
        label: &str,
        source: &str,
    ) -> Result<wgpu::ShaderModule, GraphicsError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(GraphicsError::Backend(format!(
                "shader `{label}` failed to compile: {err}"
            ))),
            None => Ok(module),
        }
    }
}

impl GraphicsContext for WgpuContext {
    fn begin_frame(&mut self, clear_color: Vec3) -> Result<(), GraphicsError> {
        if self.frame.is_some() {
            warn!("begin_frame called twice; discarding pending draws");
        }
        self.frame = Some(Frame {
            clear_color,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GraphicsError> {
        let frame = self.frame.take().ok_or(GraphicsError::NoActiveFrame)?;

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.window.inner_size();
                self.resize(size);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                info!("surface timeout; skipping frame");
                return Ok(());
            }
            Err(err) => return Err(GraphicsError::Backend(err.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        let clear = frame.clear_color.as_dvec3();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: clear.x,
                        g: clear.y,
                        b: clear.z,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for draw in &frame.draws {
            pass.set_pipeline(&draw.pipeline);
            pass.set_bind_group(0, &draw.uniforms, &[]);
            if let Some(textures) = &draw.textures {
                pass.set_bind_group(1, textures, &[]);
            }
            pass.set_vertex_buffer(0, draw.vertices.slice(..));
            pass.draw(0..draw.vertex_count, 0..1);
        }

        drop(pass);
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn create_buffer(&mut self, label: &str, bytes: &[u8]) -> Result<BufferHandle, GraphicsError> {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = self.handles.next();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn create_program(
        &mut self,
        descriptor: &ProgramDescriptor,
    ) -> Result<ProgramHandle, GraphicsError> {
        if let Some(stage) = descriptor.sources.extra_stages().first() {
            return Err(GraphicsError::UnsupportedStage(stage.name()));
        }
        let sources = &descriptor.sources;
        let vertex = self.shader_module(&format!("{}-vertex", descriptor.label), &sources.vertex)?;
        let fragment = if sources.fragment == sources.vertex {
            vertex.clone()
        } else {
            self.shader_module(&format!("{}-fragment", descriptor.label), &sources.fragment)?
        };
        let id = self.handles.next();
        self.programs.insert(
            id,
            GpuProgram {
                label: descriptor.label.clone(),
                attributes: descriptor.attributes.clone(),
                block: UniformBlock::new(descriptor.uniforms.clone()),
                vertex,
                fragment,
                textured: descriptor.textured,
                texture: None,
                snapshot: None,
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
        let vertices = self
            .buffers
            .get(&buffer.0)
            .cloned()
            .ok_or(GraphicsError::UnknownHandle {
                kind: "buffer",
                id: buffer.0,
            })?;
        check_attributes(&self.program(program)?.attributes, layout)?;
        let stride = (layout.stride() * std::mem::size_of::<f32>()) as u64;
        if stride == 0 || vertices.size() % stride != 0 {
            return Err(GraphicsError::MalformedVertexData {
                len: (vertices.size() / std::mem::size_of::<f32>() as u64) as usize,
                stride: layout.stride(),
            });
        }
        let vertex_count = (vertices.size() / stride) as u32;
        let id = self.handles.next();
        self.vertex_arrays.insert(
            id,
            GpuVertexArray {
                program,
                vertices,
                layout: layout.clone(),
                vertex_count,
                pipelines: HashMap::new(),
            },
        );
        Ok(VertexArrayHandle(id))
    }

    fn create_texture(&mut self, texture: &TextureData) -> Result<TextureHandle, GraphicsError> {
        let id = self.handles.next();
        let uploaded = GpuTexture::upload(
            &self.device,
            &self.queue,
            &self.texture_layout,
            &self.sampler,
            texture,
            &format!("texture-{id}"),
        );
        self.textures.insert(id, uploaded);
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
        if self.frame.is_none() {
            return Err(GraphicsError::NoActiveFrame);
        }
        let array = self
            .vertex_arrays
            .get(&vertex_array.0)
            .ok_or(GraphicsError::UnknownHandle {
                kind: "vertex array",
                id: vertex_array.0,
            })?;
        let program_handle = array.program;
        let program = self.program(program_handle)?;
        let key = (topology, self.wireframe);
        let pipeline = match array.pipelines.get(&key) {
            Some(pipeline) => pipeline.clone(),
            None => self.build_pipeline(program, &array.layout, topology)?,
        };
        let textures = program.textured.then(|| {
            program
                .texture
                .and_then(|texture| self.textures.get(&texture.0))
                .unwrap_or(&self.fallback_texture)
                .bind_group
                .clone()
        });
        let (vertices, vertex_count) = (array.vertices.clone(), array.vertex_count);

        let uniforms = self.uniform_snapshot(program_handle)?;
        if let Some(array) = self.vertex_arrays.get_mut(&vertex_array.0) {
            array.pipelines.entry(key).or_insert_with(|| pipeline.clone());
        }
        let draw = PendingDraw {
            pipeline,
            uniforms,
            textures,
            vertices,
            vertex_count,
        };
        if let Some(frame) = self.frame.as_mut() {
            frame.draws.push(draw);
        }
        Ok(())
    }

    fn release(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        let id = handle.id();
        let removed = match handle {
            Handle::Buffer(_) => self.buffers.remove(&id).map(|buffer| buffer.destroy()),
            Handle::Program(_) => self.programs.remove(&id).map(drop),
            Handle::VertexArray(_) => self.vertex_arrays.remove(&id).map(drop),
            Handle::Texture(_) => self
                .textures
                .remove(&id)
                .map(|texture| texture.texture.destroy()),
        };
        removed.ok_or(GraphicsError::UnknownHandle {
            kind: handle.kind(),
            id,
        })
    }

    fn set_wireframe(&mut self, enabled: bool) {
        if enabled && !self.wireframe_supported {
            warn!("adapter does not support line polygon mode; wireframe stays off");
            return;
        }
        self.wireframe = enabled;
    }

    fn viewport(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::Points => wgpu::PrimitiveTopology::PointList,
        Topology::Lines => wgpu::PrimitiveTopology::LineList,
        Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
        Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

struct GpuProgram {
    label: String,
    attributes: Vec<String>,
    block: UniformBlock,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    textured: bool,
    texture: Option<TextureHandle>,
    snapshot: Option<wgpu::BindGroup>,
}

struct GpuVertexArray {
    program: ProgramHandle,
    vertices: wgpu::Buffer,
    layout: VertexLayout,
    vertex_count: u32,
    pipelines: HashMap<(Topology, bool), wgpu::RenderPipeline>,
}

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl GpuTexture {
    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        data: &TextureData,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: data.width(),
            height: data.height(),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * data.width()),
                rows_per_image: Some(data.height()),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        Self {
            texture,
            bind_group,
        }
    }
}

struct PendingDraw {
    pipeline: wgpu::RenderPipeline,
    uniforms: wgpu::BindGroup,
    textures: Option<wgpu::BindGroup>,
    vertices: wgpu::Buffer,
    vertex_count: u32,
}

struct Frame {
    clear_color: Vec3,
    draws: Vec<PendingDraw>,
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}
