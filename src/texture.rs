use glam::Vec3;

use crate::render::GraphicsError;

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TextureData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, GraphicsError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(GraphicsError::MalformedTexture {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Square checkerboard with `cells` squares per side.
    pub fn checkerboard(
        size: u32,
        cells: u32,
        first: Vec3,
        second: Vec3,
    ) -> Result<Self, GraphicsError> {
        let cell = (size / cells.max(1)).max(1);
        let (a, b) = (to_rgba(first), to_rgba(second));
        let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let texel = if (x / cell + y / cell) % 2 == 0 { a } else { b };
                pixels.extend_from_slice(&texel);
            }
        }
        Self::new(size, size, pixels)
    }

    /// Single texel of the given color.
    pub fn solid(color: Vec3) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: to_rgba(color).to_vec(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

fn to_rgba(color: Vec3) -> [u8; 4] {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    [channel(color.x), channel(color.y), channel(color.z), 255]
}
