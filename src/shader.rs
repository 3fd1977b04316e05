use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::render::{GraphicsError, Scalar};

/// Type of a field in a program's uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniformKind {
    Float,
    Int,
    Vec3,
    Mat4,
}

impl UniformKind {
    pub fn size(self) -> usize {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec3 => 12,
            Self::Mat4 => 64,
        }
    }

    /// Alignment inside a uniform buffer (WGSL/std140 rules).
    pub fn align(self) -> usize {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec3 | Self::Mat4 => 16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Vec3 => "vec3",
            Self::Mat4 => "mat4",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
}

/// Byte layout of a program's uniform block, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: usize,
}

impl UniformLayout {
    pub fn new(fields: &[(&str, UniformKind)]) -> Self {
        let mut offset = 0;
        let fields = fields
            .iter()
            .map(|(name, kind)| {
                offset = align_to(offset, kind.align());
                let field = UniformField {
                    name: (*name).to_string(),
                    kind: *kind,
                    offset,
                };
                offset += kind.size();
                field
            })
            .collect();
        Self {
            fields,
            size: align_to(offset.max(16), 16),
        }
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Total block size, padded to 16 bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

fn align_to(offset: usize, align: usize) -> usize {
    offset.div_ceil(align) * align
}

/// CPU copy of a uniform block addressed by field name.
///
/// Both backends keep one per program; writing the same value twice leaves
/// the bytes unchanged.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0; layout.size()];
        Self {
            layout,
            bytes,
            dirty: true,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn write_scalar(&mut self, name: &str, value: Scalar) -> Result<(), GraphicsError> {
        let field = self.lookup(name)?;
        let bytes = match (field.kind, value) {
            (UniformKind::Float, Scalar::Float(value)) => value.to_ne_bytes(),
            (UniformKind::Int, Scalar::Int(value)) => value.to_ne_bytes(),
            (kind, value) => {
                return Err(GraphicsError::UniformKind {
                    name: name.to_string(),
                    expected: kind.name(),
                    actual: value.kind_name(),
                });
            }
        };
        let offset = field.offset;
        self.store(offset, &bytes);
        Ok(())
    }

    pub fn write_bytes(&mut self, name: &str, data: &[u8]) -> Result<(), GraphicsError> {
        let field = self.lookup(name)?;
        if data.len() != field.kind.size() {
            return Err(GraphicsError::UniformSize {
                name: name.to_string(),
                expected: field.kind.size(),
                actual: data.len(),
            });
        }
        let offset = field.offset;
        self.store(offset, data);
        Ok(())
    }

    /// Current bytes of a single field.
    pub fn read(&self, name: &str) -> Option<&[u8]> {
        let field = self.layout.field(name)?;
        Some(&self.bytes[field.offset..field.offset + field.kind.size()])
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns whether the block changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    fn lookup(&self, name: &str) -> Result<UniformField, GraphicsError> {
        self.layout
            .field(name)
            .cloned()
            .ok_or_else(|| GraphicsError::UnknownUniform {
                name: name.to_string(),
            })
    }

    fn store(&mut self, offset: usize, data: &[u8]) {
        let target = &mut self.bytes[offset..offset + data.len()];
        if target != data {
            target.copy_from_slice(data);
            self.dirty = true;
        }
    }
}

/// Pipeline stages a program may provide source for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    TessControl,
    TessEvaluation,
}

impl ShaderStage {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::Fragment => "frag",
            Self::Geometry => "geom",
            Self::TessControl => "tesc",
            Self::TessEvaluation => "tese",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Geometry => "geometry",
            Self::TessControl => "tessellation control",
            Self::TessEvaluation => "tessellation evaluation",
        }
    }
}

/// Raw source text per pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
    pub geometry: Option<String>,
    pub tess_control: Option<String>,
    pub tess_evaluation: Option<String>,
}

impl ShaderSources {
    /// Reads `{stem}.vert` and `{stem}.frag`, plus `{stem}.geom` and
    /// `{stem}.tesc`/`{stem}.tese` when requested.
    pub fn from_stem(stem: impl AsRef<Path>, geometry: bool, tessellation: bool) -> Result<Self> {
        let stem = stem.as_ref();
        let mut sources = Self {
            vertex: read_stage(stem, ShaderStage::Vertex)?,
            fragment: read_stage(stem, ShaderStage::Fragment)?,
            ..Self::default()
        };
        if geometry {
            sources.geometry = Some(read_stage(stem, ShaderStage::Geometry)?);
        }
        if tessellation {
            sources.tess_control = Some(read_stage(stem, ShaderStage::TessControl)?);
            sources.tess_evaluation = Some(read_stage(stem, ShaderStage::TessEvaluation)?);
        }
        Ok(sources)
    }

    /// One WGSL module holding both `vs_main` and `fs_main`.
    pub fn single(source: &str) -> Self {
        Self {
            vertex: source.to_string(),
            fragment: source.to_string(),
            ..Self::default()
        }
    }

    /// Optional stages that carry source text.
    pub fn extra_stages(&self) -> Vec<ShaderStage> {
        [
            (ShaderStage::Geometry, &self.geometry),
            (ShaderStage::TessControl, &self.tess_control),
            (ShaderStage::TessEvaluation, &self.tess_evaluation),
        ]
        .into_iter()
        .filter(|(_, source)| source.is_some())
        .map(|(stage, _)| stage)
        .collect()
    }
}

/// Shader files on disk, addressed by their common stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderFiles {
    pub stem: PathBuf,
    #[serde(default)]
    pub geometry: bool,
    #[serde(default)]
    pub tessellation: bool,
}

impl ShaderFiles {
    pub fn new(stem: impl Into<PathBuf>) -> Self {
        Self {
            stem: stem.into(),
            geometry: false,
            tessellation: false,
        }
    }

    pub fn load(&self) -> Result<ShaderSources> {
        ShaderSources::from_stem(&self.stem, self.geometry, self.tessellation)
    }
}

fn read_stage(stem: &Path, stage: ShaderStage) -> Result<String> {
    let path = stage_path(stem, stage);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read {} shader {}", stage.name(), path.display()))
}

fn stage_path(stem: &Path, stage: ShaderStage) -> PathBuf {
    let mut path = stem.as_os_str().to_owned();
    path.push(".");
    path.push(stage.extension());
    PathBuf::from(path)
}

/// Everything a backend needs to build a program.
#[derive(Debug, Clone)]
pub struct ProgramDescriptor {
    pub label: String,
    pub sources: ShaderSources,
    /// Vertex inputs in location order.
    pub attributes: Vec<String>,
    pub uniforms: UniformLayout,
    /// Whether the fragment stage samples a texture bound at group 1.
    pub textured: bool,
}

/// The built-in program families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramKind {
    /// Positions only, drawn in a single uniform color.
    Flat,
    /// Per-vertex color, unlit.
    VertexColor,
    /// Texture coordinates and normals, Phong lighting.
    Lit,
}

impl ProgramKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "flat" | "default" => Some(Self::Flat),
            "vertex_color" | "color_gradient" | "outline" => Some(Self::VertexColor),
            "lit" | "textured_cube" => Some(Self::Lit),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::VertexColor => "vertex_color",
            Self::Lit => "lit",
        }
    }

    pub fn attributes(self) -> &'static [&'static str] {
        match self {
            Self::Flat => &["in_position"],
            Self::VertexColor => &["in_color", "in_position"],
            Self::Lit => &["in_texcoord", "in_normal", "in_position"],
        }
    }

    /// Lit programs consume the light, the material and the camera position.
    pub fn is_lit(self) -> bool {
        matches!(self, Self::Lit)
    }

    pub fn uniform_layout(self) -> UniformLayout {
        use UniformKind::*;
        match self {
            Self::Flat => UniformLayout::new(&[
                ("projection_matrix", Mat4),
                ("view_matrix", Mat4),
                ("model_matrix", Mat4),
                ("color", Vec3),
            ]),
            Self::VertexColor => UniformLayout::new(&[
                ("projection_matrix", Mat4),
                ("view_matrix", Mat4),
                ("model_matrix", Mat4),
            ]),
            Self::Lit => UniformLayout::new(&[
                ("projection_matrix", Mat4),
                ("view_matrix", Mat4),
                ("model_matrix", Mat4),
                ("camera_position", Vec3),
                ("material.surface_brightness", Float),
                ("material.ambient_incidence", Vec3),
                ("use_texture", Int),
                ("material.diffuse_incidence", Vec3),
                ("material.specular_incidence", Vec3),
                ("light.position", Vec3),
                ("light.color", Vec3),
                ("light.ambient_intensity", Vec3),
                ("light.diffuse_intensity", Vec3),
                ("light.specular_intensity", Vec3),
            ]),
        }
    }

    pub fn builtin_sources(self) -> ShaderSources {
        ShaderSources::single(match self {
            Self::Flat => FLAT_SHADER,
            Self::VertexColor => VERTEX_COLOR_SHADER,
            Self::Lit => LIT_SHADER,
        })
    }

    pub fn descriptor(self, label: &str, sources: ShaderSources) -> ProgramDescriptor {
        ProgramDescriptor {
            label: label.to_string(),
            sources,
            attributes: self.attributes().iter().map(|name| name.to_string()).collect(),
            uniforms: self.uniform_layout(),
            textured: self.is_lit(),
        }
    }
}

const FLAT_SHADER: &str = r#"
struct Uniforms {
    projection_matrix: mat4x4<f32>,
    view_matrix: mat4x4<f32>,
    model_matrix: mat4x4<f32>,
    color: vec3<f32>,
}

@group(0) @binding(0)
var<uniform> u: Uniforms;

@vertex
fn vs_main(@location(0) in_position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u.projection_matrix * u.view_matrix * u.model_matrix * vec4<f32>(in_position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(u.color, 1.0);
}
"#;

const VERTEX_COLOR_SHADER: &str = r#"
struct Uniforms {
    projection_matrix: mat4x4<f32>,
    view_matrix: mat4x4<f32>,
    model_matrix: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> u: Uniforms;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(@location(0) in_color: vec3<f32>, @location(1) in_position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = u.projection_matrix * u.view_matrix * u.model_matrix * vec4<f32>(in_position, 1.0);
    out.color = in_color;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(input.color, 1.0);
}
"#;

const LIT_SHADER: &str = r#"
struct Uniforms {
    projection_matrix: mat4x4<f32>,
    view_matrix: mat4x4<f32>,
    model_matrix: mat4x4<f32>,
    camera_position: vec3<f32>,
    surface_brightness: f32,
    ambient_incidence: vec3<f32>,
    use_texture: i32,
    diffuse_incidence: vec3<f32>,
    specular_incidence: vec3<f32>,
    light_position: vec3<f32>,
    light_color: vec3<f32>,
    light_ambient: vec3<f32>,
    light_diffuse: vec3<f32>,
    light_specular: vec3<f32>,
}

@group(0) @binding(0)
var<uniform> u: Uniforms;

@group(1) @binding(0)
var t_diffuse: texture_2d<f32>;
@group(1) @binding(1)
var s_diffuse: sampler;

struct VertexInput {
    @location(0) texcoord: vec2<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) position: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) texcoord: vec2<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) world_pos: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = u.model_matrix * vec4<f32>(input.position, 1.0);
    out.position = u.projection_matrix * u.view_matrix * world;
    out.texcoord = input.texcoord;
    out.normal = normalize((u.model_matrix * vec4<f32>(input.normal, 0.0)).xyz);
    out.world_pos = world.xyz;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let sampled = textureSample(t_diffuse, s_diffuse, input.texcoord).rgb;
    var base = vec3<f32>(1.0, 1.0, 1.0);
    if (u.use_texture != 0) {
        base = sampled;
    }

    let normal = normalize(input.normal);
    let light_dir = normalize(u.light_position - input.world_pos);
    let ambient = u.light_ambient * u.ambient_incidence;
    let diffuse = max(dot(normal, light_dir), 0.0) * u.light_diffuse * u.diffuse_incidence;

    let view_dir = normalize(u.camera_position - input.world_pos);
    let reflect_dir = reflect(-light_dir, normal);
    let spec = pow(max(dot(view_dir, reflect_dir), 0.0), u.surface_brightness);
    let specular = spec * u.light_specular * u.specular_incidence;

    return vec4<f32>(base * (ambient + diffuse + specular), 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn lit_layout_follows_uniform_alignment() {
        let layout = ProgramKind::Lit.uniform_layout();
        let offset = |name: &str| layout.field(name).unwrap().offset;
        assert_eq!(offset("view_matrix"), 64);
        assert_eq!(offset("camera_position"), 192);
        assert_eq!(offset("material.surface_brightness"), 204);
        assert_eq!(offset("material.ambient_incidence"), 208);
        assert_eq!(offset("use_texture"), 220);
        assert_eq!(offset("material.diffuse_incidence"), 224);
        assert_eq!(offset("material.specular_incidence"), 240);
        assert_eq!(offset("light.specular_intensity"), 320);
        assert_eq!(layout.size(), 336);
    }

    #[test]
    fn vertex_color_layout_is_three_matrices() {
        assert_eq!(ProgramKind::VertexColor.uniform_layout().size(), 192);
        assert_eq!(ProgramKind::Flat.uniform_layout().size(), 208);
    }

    #[test]
    fn block_rejects_mismatched_writes() {
        let mut block = UniformBlock::new(ProgramKind::Lit.uniform_layout());
        assert!(matches!(
            block.write_scalar("missing", Scalar::Float(1.0)),
            Err(GraphicsError::UnknownUniform { .. })
        ));
        assert!(matches!(
            block.write_scalar("use_texture", Scalar::Float(1.0)),
            Err(GraphicsError::UniformKind { .. })
        ));
        assert!(matches!(
            block.write_bytes("camera_position", &[0; 16]),
            Err(GraphicsError::UniformSize {
                expected: 12,
                actual: 16,
                ..
            })
        ));
    }

    #[test]
    fn block_tracks_changes() {
        let mut block = UniformBlock::new(ProgramKind::Flat.uniform_layout());
        assert!(block.take_dirty());
        block.write_bytes("color", &[1; 12]).unwrap();
        assert!(block.take_dirty());
        block.write_bytes("color", &[1; 12]).unwrap();
        assert!(!block.take_dirty());
        assert_eq!(block.read("color"), Some(&[1u8; 12][..]));
    }

    #[test]
    fn reads_stage_files_from_stem() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("outline");
        let files = [
            ("vert", "// vertex"),
            ("frag", "// fragment"),
            ("geom", "// geometry"),
        ];
        for (ext, body) in files {
            let mut file = fs::File::create(dir.path().join(format!("outline.{ext}"))).unwrap();
            file.write_all(body.as_bytes()).unwrap();
        }
        let sources = ShaderSources::from_stem(&stem, true, false).unwrap();
        assert_eq!(sources.vertex, "// vertex");
        assert_eq!(sources.fragment, "// fragment");
        assert_eq!(sources.extra_stages(), vec![ShaderStage::Geometry]);

        let err = ShaderSources::from_stem(&stem, false, true).unwrap_err();
        assert!(format!("{err:#}").contains("outline.tesc"));
    }
}
