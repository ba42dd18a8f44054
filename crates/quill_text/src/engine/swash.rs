//! Font engine backed by swash
//!
//! Loads font files from disk, measures strings from charmap advances and
//! rasterizes them glyph by glyph into a single surface.
//!
//! Hinted fonts render shaded (8-bit coverage). Unhinted fonts render solid:
//! coverage is thresholded to 0/1.

use super::{FontEngine, FontHandle};
use crate::surface::{Surface, SurfaceFormat};
use crate::{Result, TextError};
use rustc_hash::FxHashMap;
use std::path::Path;
use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::Format;
use swash::{CacheKey, FontRef};

/// Coverage at or above which a solid-rendered pixel is inked
const SOLID_THRESHOLD: u8 = 0x80;

/// A font file held in memory together with its swash identity
struct LoadedFont {
    data: Vec<u8>,
    offset: u32,
    key: CacheKey,
    /// Pixel size
    size: f32,
    hinting: bool,
}

impl LoadedFont {
    fn font_ref(&self) -> FontRef<'_> {
        FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        }
    }
}

/// Horizontal placement of the glyphs of one string
struct LineMetrics {
    /// Glyph ids with their pen position in pixels
    glyphs: Vec<(u16, f32)>,
    width: u32,
    height: u32,
    /// Baseline distance from the top edge
    ascent: f32,
}

/// Font engine using swash for measurement and rasterization
pub struct SwashEngine {
    /// Swash scale context (caches scaling state)
    scale_context: ScaleContext,
    fonts: FxHashMap<FontHandle, LoadedFont>,
    next_id: u32,
    running: bool,
}

impl SwashEngine {
    pub fn new() -> Self {
        Self {
            scale_context: ScaleContext::new(),
            fonts: FxHashMap::default(),
            next_id: 0,
            running: false,
        }
    }

    /// Load a font from bytes already in memory
    pub fn open_font_data(&mut self, data: Vec<u8>, size: u32) -> Result<FontHandle> {
        if !self.running {
            return Err(TextError::EngineInit("engine is not running".to_string()));
        }

        // Validate the face before handing it to swash
        let face =
            ttf_parser::Face::parse(&data, 0).map_err(|e| TextError::FontParseError(e.to_string()))?;
        let glyph_count = face.number_of_glyphs();

        let font_ref = FontRef::from_index(&data, 0).ok_or(TextError::InvalidFontData)?;
        let (offset, key) = (font_ref.offset, font_ref.key);

        self.next_id += 1;
        let handle = FontHandle::new(self.next_id);
        tracing::debug!(
            "Opened font {:?} at {}px ({} glyphs)",
            handle,
            size,
            glyph_count
        );

        self.fonts.insert(
            handle,
            LoadedFont {
                data,
                offset,
                key,
                size: size.max(1) as f32,
                hinting: false,
            },
        );
        Ok(handle)
    }

    fn font(&self, font: FontHandle) -> Result<&LoadedFont> {
        self.fonts.get(&font).ok_or(TextError::UnknownFont(font))
    }

    fn layout_line(font: &LoadedFont, text: &str) -> LineMetrics {
        let font_ref = font.font_ref();
        let charmap = font_ref.charmap();

        // Scale from font units to pixels
        let metrics = font_ref.metrics(&[]);
        let glyph_metrics = font_ref.glyph_metrics(&[]);
        let scale = font.size / metrics.units_per_em as f32;

        let mut glyphs = Vec::with_capacity(text.len());
        let mut pen = 0.0f32;
        for ch in text.chars() {
            let glyph_id = charmap.map(ch);
            glyphs.push((glyph_id, pen));
            pen += glyph_metrics.advance_width(glyph_id) * scale;
        }

        let ascent = metrics.ascent * scale;
        let descent = metrics.descent.abs() * scale;

        LineMetrics {
            glyphs,
            width: pen.ceil().max(0.0) as u32,
            height: (ascent + descent).ceil().max(0.0) as u32,
            ascent,
        }
    }
}

impl Default for SwashEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FontEngine for SwashEngine {
    fn init(&mut self) -> Result<()> {
        self.running = true;
        Ok(())
    }

    fn quit(&mut self) {
        self.fonts.clear();
        self.running = false;
    }

    fn open_font(&mut self, path: &Path, size: u32) -> Result<FontHandle> {
        let data = std::fs::read(path).map_err(|e| {
            TextError::FontLoadError(format!("Failed to read font file {:?}: {}", path, e))
        })?;
        self.open_font_data(data, size)
    }

    fn close_font(&mut self, font: FontHandle) {
        if self.fonts.remove(&font).is_some() {
            tracing::debug!("Closed font {:?}", font);
        }
    }

    fn set_hinting(&mut self, font: FontHandle, enabled: bool) {
        if let Some(f) = self.fonts.get_mut(&font) {
            f.hinting = enabled;
        }
    }

    fn hinting(&self, font: FontHandle) -> bool {
        self.fonts.get(&font).is_some_and(|f| f.hinting)
    }

    fn measure(&mut self, font: FontHandle, text: &str) -> Result<(u32, u32)> {
        let line = Self::layout_line(self.font(font)?, text);
        Ok((line.width, line.height))
    }

    fn render(&mut self, font: FontHandle, text: &str) -> Result<Surface> {
        let loaded = self
            .fonts
            .get(&font)
            .ok_or(TextError::UnknownFont(font))?;
        let line = Self::layout_line(loaded, text);
        if line.width == 0 || line.height == 0 {
            return Err(TextError::RenderFailed {
                text: text.to_string(),
            });
        }

        let format = if loaded.hinting {
            SurfaceFormat::Gray
        } else {
            SurfaceFormat::Mono
        };

        let mut scaler = self
            .scale_context
            .builder(loaded.font_ref())
            .size(loaded.size)
            .hint(loaded.hinting)
            .build();

        // Alpha mask (grayscale) rendering from outlines
        let mut render = Render::new(&[Source::Outline]);
        render.format(Format::Alpha);

        let mut surface = Surface::new(line.width, line.height, format);
        let (width, height) = (line.width as i32, line.height as i32);
        let pitch = surface.pitch() as usize;
        let baseline = line.ascent.round() as i32;
        let pixels = surface.pixels_mut();

        for &(glyph_id, pen) in &line.glyphs {
            // Empty glyphs (like space) have no image
            let Some(image) = render.render(&mut scaler, glyph_id) else {
                continue;
            };

            let left = pen.round() as i32 + image.placement.left;
            let top = baseline - image.placement.top;
            let glyph_width = image.placement.width as i32;

            for gy in 0..image.placement.height as i32 {
                let y = top + gy;
                if !(0..height).contains(&y) {
                    continue;
                }
                for gx in 0..glyph_width {
                    let x = left + gx;
                    if !(0..width).contains(&x) {
                        continue;
                    }
                    let coverage = image.data[(gy * glyph_width + gx) as usize];
                    let dst = &mut pixels[y as usize * pitch + x as usize];
                    *dst = match format {
                        SurfaceFormat::Gray => (*dst).max(coverage),
                        SurfaceFormat::Mono => (*dst).max(u8::from(coverage >= SOLID_THRESHOLD)),
                    };
                }
            }
        }

        Ok(surface)
    }

    fn provides_glyph(&self, font: FontHandle, ch: char) -> bool {
        self.fonts
            .get(&font)
            .is_some_and(|f| f.font_ref().charmap().map(ch) != 0)
    }
}
