//! Plain data exchanged with a host.

use spritesync_core::{AnimationDirection, ColorMode};

use crate::error::{HostError, Result};

/// Snapshot of a document's basic properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Stored name: a file path, a virtual name, or empty when unsaved.
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub color_mode: ColorMode,
    pub frame_count: u32,
}

/// A timeline tag with a one-based inclusive frame range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpan {
    pub name: String,
    pub from: u32,
    pub to: u32,
    pub direction: AnimationDirection,
}

impl TagSpan {
    pub fn new(name: impl Into<String>, from: u32, to: u32) -> Self {
        Self {
            name: name.into(),
            from,
            to,
            direction: AnimationDirection::Forward,
        }
    }

    pub fn with_direction(mut self, direction: AnimationDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Parameters for a new document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub color_mode: ColorMode,
}

impl NewDocument {
    pub fn rgb(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            color_mode: ColorMode::Rgb,
        }
    }

    pub fn with_color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }
}

/// Opaque layer identifier, valid within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub u32);

/// Parameters for a new layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSpec {
    pub name: String,
    /// Layer opacity, 0-255.
    pub opacity: u8,
    /// A non-paintable reference layer, excluded from the composite.
    pub reference: bool,
}

/// Storage format of a [`PixelImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Four bytes per pixel.
    Rgba,
    /// One palette index per pixel.
    Indexed,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba => 4,
            PixelFormat::Indexed => 1,
        }
    }
}

/// A standalone image, used for cels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl PixelImage {
    /// A zero-filled image. Index zero and RGBA zero are both transparent
    /// under the default palette.
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![0; width as usize * height as usize * format.bytes_per_pixel()],
        }
    }

    /// Wrap existing pixel data, checking its length.
    pub fn from_data(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(HostError::InvalidArgument(format!(
                "{width}x{height} {format:?} image needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Filled with one palette index.
    pub fn filled_index(width: u32, height: u32, index: u8) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Indexed,
            data: vec![index; width as usize * height as usize],
        }
    }

    /// Raw bytes of the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.format.bytes_per_pixel();
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        &self.data[offset..offset + bpp]
    }
}

/// An indexed color table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub colors: Vec<[u8; 4]>,
    /// Index treated as transparent in paletted documents.
    pub transparent_index: u8,
}

impl Palette {
    pub fn new(colors: Vec<[u8; 4]>, transparent_index: u8) -> Self {
        Self {
            colors,
            transparent_index,
        }
    }

    /// 256 levels of gray, index 0 transparent.
    pub fn grayscale() -> Self {
        Self {
            colors: (0..=255u8).map(|v| [v, v, v, 255]).collect(),
            transparent_index: 0,
        }
    }

    /// A small default palette for new indexed documents.
    pub fn basic() -> Self {
        Self {
            colors: vec![
                [0, 0, 0, 0],
                [0, 0, 0, 255],
                [255, 255, 255, 255],
                [255, 0, 0, 255],
                [0, 255, 0, 255],
                [0, 0, 255, 255],
                [255, 255, 0, 255],
                [255, 0, 255, 255],
            ],
            transparent_index: 0,
        }
    }

    pub fn get(&self, index: u8) -> Option<[u8; 4]> {
        self.colors.get(index as usize).copied()
    }
}

/// Reusable RGBA render target.
///
/// Reallocates only when asked for different dimensions.
#[derive(Debug, Clone, Default)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
    reallocations: u32,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut buffer = Self::default();
        buffer.ensure_size(width, height);
        buffer
    }

    /// Resize if the dimensions differ. Returns whether a resize happened.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        if self.reallocations > 0 && self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.data = vec![0; width as usize * height as usize * 4];
        self.reallocations += 1;
        true
    }

    /// Set every pixel to transparent black.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// How many times the backing storage has been allocated.
    pub fn reallocations(&self) -> u32 {
        self.reallocations
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
