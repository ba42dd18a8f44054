//! Rendered text surfaces
//!
//! A [`Surface`] owns the pixels of one rendered string. Dropping it releases
//! the pixel buffer; the caches rely on that to release evicted entries
//! exactly once.

/// Pixel format of a rendered surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceFormat {
    /// One byte per pixel, each either 0 (background) or 1 (ink).
    /// Produced when the font is rendered without hinting.
    Mono,
    /// One byte per pixel holding 8-bit coverage (0-255).
    /// Produced when the font is rendered with hinting.
    Gray,
}

/// Owned pixel buffer of a rendered string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pixels: Box<[u8]>,
    width: u32,
    height: u32,
    pitch: u32,
    format: SurfaceFormat,
}

impl Surface {
    /// Create a zero-filled surface
    pub fn new(width: u32, height: u32, format: SurfaceFormat) -> Self {
        Self {
            pixels: vec![0; width as usize * height as usize].into_boxed_slice(),
            width,
            height,
            pitch: width,
            format,
        }
    }

    /// Wrap an existing tightly packed buffer.
    ///
    /// Returns `None` if `pixels` is not exactly `width * height` bytes.
    pub fn from_pixels(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: SurfaceFormat,
    ) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            pixels: pixels.into_boxed_slice(),
            width,
            height,
            pitch: width,
            format,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row
    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Pixel value at `(x, y)`, or `None` outside the surface
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.pitch as usize + x as usize)
            .copied()
    }

    /// Size of the pixel buffer in bytes
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }
}
