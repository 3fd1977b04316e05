use serde::{Deserialize, Serialize};

use crate::render::{GraphicsError, Topology};

/// One named, tightly packed float attribute of an interleaved vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub name: String,
    pub components: u32,
}

/// Interleaved attribute layout of a vertex buffer, in memory order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new(attributes: Vec<VertexAttribute>) -> Self {
        Self { attributes }
    }

    /// Builds a layout from a compact format such as `"2f 3f 3f"` and the
    /// matching attribute names.
    pub fn from_format(format: &str, names: &[&str]) -> Result<Self, GraphicsError> {
        let tokens: Vec<&str> = format.split_whitespace().collect();
        if tokens.len() != names.len() {
            return Err(GraphicsError::AttributeMismatch(format!(
                "format `{format}` declares {} attributes but {} names were given",
                tokens.len(),
                names.len()
            )));
        }
        let attributes = tokens
            .iter()
            .zip(names)
            .map(|(token, name)| {
                let components = token
                    .strip_suffix('f')
                    .and_then(|count| count.parse::<u32>().ok())
                    .filter(|count| (1..=4).contains(count))
                    .ok_or_else(|| {
                        GraphicsError::AttributeMismatch(format!(
                            "unsupported attribute format `{token}`"
                        ))
                    })?;
                Ok(VertexAttribute {
                    name: (*name).to_string(),
                    components,
                })
            })
            .collect::<Result<Vec<_>, GraphicsError>>()?;
        Ok(Self { attributes })
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Number of floats per vertex.
    pub fn stride(&self) -> usize {
        self.attributes
            .iter()
            .map(|attribute| attribute.components as usize)
            .sum()
    }

    /// Attribute names in memory order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|attribute| attribute.name.as_str())
    }
}

/// CPU-side vertex data ready to be uploaded as a single buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    vertices: Vec<f32>,
    layout: VertexLayout,
}

impl MeshData {
    pub fn new(vertices: Vec<f32>, layout: VertexLayout) -> Result<Self, GraphicsError> {
        let stride = layout.stride();
        if stride == 0 || vertices.len() % stride != 0 {
            return Err(GraphicsError::MalformedVertexData {
                len: vertices.len(),
                stride,
            });
        }
        Ok(Self { vertices, layout })
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.layout.stride()
    }
}

/// The built-in vertex tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshKind {
    Triangle,
    SolidCube,
    WireCube,
    TexturedCube,
    /// Control nets of bicubic teapot patches, 16 points per patch.
    TeapotPatches,
}

impl MeshKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "triangle" => Some(Self::Triangle),
            "solid_cube" | "colored_cube" => Some(Self::SolidCube),
            "wire_cube" | "skeleton_cube" => Some(Self::WireCube),
            "textured_cube" => Some(Self::TexturedCube),
            "teapot" | "teapot_patches" => Some(Self::TeapotPatches),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Triangle => "triangle",
            Self::SolidCube => "solid_cube",
            Self::WireCube => "wire_cube",
            Self::TexturedCube => "textured_cube",
            Self::TeapotPatches => "teapot",
        }
    }

    /// Topology the table is laid out for.
    pub fn default_topology(self) -> Topology {
        match self {
            Self::WireCube => Topology::LineStrip,
            Self::TeapotPatches => Topology::Points,
            _ => Topology::Triangles,
        }
    }

    pub fn build(self) -> Result<MeshData, GraphicsError> {
        match self {
            Self::Triangle => triangle(),
            Self::SolidCube => solid_cube(),
            Self::WireCube => wire_cube(),
            Self::TexturedCube => textured_cube(),
            Self::TeapotPatches => teapot_patches(),
        }
    }
}

const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
];

// front, right, back, left, top, bottom; two triangles each
const CUBE_SURFACES: [[usize; 3]; 12] = [
    [0, 2, 3],
    [0, 1, 2],
    [1, 7, 2],
    [1, 6, 7],
    [6, 5, 4],
    [4, 7, 6],
    [3, 4, 5],
    [3, 5, 0],
    [3, 7, 4],
    [3, 2, 7],
    [0, 6, 1],
    [0, 5, 6],
];

const CUBE_COLORS: [[f32; 3]; 8] = [
    [0.0, 1.0, 1.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [1.0, 1.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 0.0, 0.0],
];

const CUBE_EDGES: [[usize; 2]; 15] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [0, 5],
    [5, 4],
    [4, 3],
    [3, 2],
    [2, 7],
    [7, 4],
    [4, 5],
    [5, 6],
    [6, 1],
    [1, 6],
    [6, 7],
];

const TEX_COORDS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

const TEX_COORD_SURFACES: [[usize; 3]; 12] = [
    [0, 2, 3],
    [0, 1, 2],
    [0, 2, 3],
    [0, 1, 2],
    [0, 1, 2],
    [2, 3, 0],
    [2, 3, 0],
    [2, 0, 1],
    [0, 2, 3],
    [0, 1, 2],
    [3, 1, 2],
    [3, 0, 1],
];

const FACE_NORMALS: [[f32; 3]; 6] = [
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 0.0],
    [0.0, 0.0, -1.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
];

/// Control points per bicubic patch.
pub const PATCH_VERTICES: usize = 16;

/// Off-axis control point distance of a unit circle quadrant drawn as one
/// cubic Bezier curve.
const BEZIER_CIRCLE: f32 = 0.552_284_8;

// (radius, height) control points of the Utah teapot's lid, rim and body
// profiles; each curve is swept around +Z in four quadrant patches
const TEAPOT_PROFILES: [[[f32; 2]; 4]; 5] = [
    [[0.0, 3.15], [0.8, 3.15], [0.0, 2.85], [0.2, 2.7]],
    [[0.2, 2.7], [0.4, 2.55], [1.3, 2.55], [1.3, 2.4]],
    [[1.4, 2.4], [1.3375, 2.53125], [1.4375, 2.53125], [1.5, 2.4]],
    [[1.5, 2.4], [1.75, 1.875], [2.0, 1.35], [2.0, 0.9]],
    [[2.0, 0.9], [2.0, 0.45], [1.5, 0.225], [1.5, 0.15]],
];

/// Flattens an indexed table into one vertex per index.
pub fn expand_surfaces<const N: usize, const M: usize>(
    vertices: &[[f32; N]],
    surfaces: &[[usize; M]],
) -> Vec<[f32; N]> {
    surfaces
        .iter()
        .flat_map(|surface| surface.iter().map(|&index| vertices[index]))
        .collect()
}

fn interleave(columns: &[&[f32]], components: &[usize]) -> Vec<f32> {
    let count = columns
        .first()
        .zip(components.first())
        .map(|(column, width)| column.len() / width)
        .unwrap_or(0);
    let mut out = Vec::with_capacity(count * components.iter().sum::<usize>());
    for vertex in 0..count {
        for (column, &width) in columns.iter().zip(components) {
            out.extend_from_slice(&column[vertex * width..(vertex + 1) * width]);
        }
    }
    out
}

pub fn triangle() -> Result<MeshData, GraphicsError> {
    let vertices = vec![-0.6, -0.8, 0.0, 0.6, -0.8, 0.0, 0.0, 0.8, 0.0];
    MeshData::new(vertices, VertexLayout::from_format("3f", &["in_position"])?)
}

pub fn solid_cube() -> Result<MeshData, GraphicsError> {
    let positions = expand_surfaces(&CUBE_CORNERS, &CUBE_SURFACES);
    let colors = expand_surfaces(&CUBE_COLORS, &CUBE_SURFACES);
    let vertices = interleave(&[colors.as_flattened(), positions.as_flattened()], &[3, 3]);
    MeshData::new(
        vertices,
        VertexLayout::from_format("3f 3f", &["in_color", "in_position"])?,
    )
}

pub fn wire_cube() -> Result<MeshData, GraphicsError> {
    let positions = expand_surfaces(&CUBE_CORNERS, &CUBE_EDGES);
    let colors = expand_surfaces(&CUBE_COLORS, &CUBE_EDGES);
    let vertices = interleave(&[colors.as_flattened(), positions.as_flattened()], &[3, 3]);
    MeshData::new(
        vertices,
        VertexLayout::from_format("3f 3f", &["in_color", "in_position"])?,
    )
}

pub fn textured_cube() -> Result<MeshData, GraphicsError> {
    let positions = expand_surfaces(&CUBE_CORNERS, &CUBE_SURFACES);
    let tex_coords = expand_surfaces(&TEX_COORDS, &TEX_COORD_SURFACES);
    // two triangles per face share the face normal
    let normals: Vec<[f32; 3]> = FACE_NORMALS
        .iter()
        .flat_map(|normal| std::iter::repeat(*normal).take(6))
        .collect();
    let vertices = interleave(
        &[
            tex_coords.as_flattened(),
            normals.as_flattened(),
            positions.as_flattened(),
        ],
        &[2, 3, 3],
    );
    MeshData::new(
        vertices,
        VertexLayout::from_format("2f 3f 3f", &["in_texcoord", "in_normal", "in_position"])?,
    )
}

/// Teapot surface as patch control nets, rows following the profile and
/// columns following the circle.
pub fn teapot_patches() -> Result<MeshData, GraphicsError> {
    let quadrant = [[1.0, 0.0], [1.0, BEZIER_CIRCLE], [BEZIER_CIRCLE, 1.0], [0.0, 1.0]];
    let mut vertices = Vec::with_capacity(TEAPOT_PROFILES.len() * 4 * PATCH_VERTICES * 3);
    for profile in &TEAPOT_PROFILES {
        for turn in 0..4 {
            for &[radius, height] in profile {
                for [x, y] in quadrant {
                    let (x, y) = match turn {
                        0 => (x, y),
                        1 => (-y, x),
                        2 => (-x, -y),
                        _ => (y, -x),
                    };
                    vertices.extend_from_slice(&[x * radius, y * radius, height]);
                }
            }
        }
    }
    MeshData::new(vertices, VertexLayout::from_format("3f", &["in_position"])?)
}
