//! Font engine seam
//!
//! The caches never rasterize or measure text themselves. They call through
//! [`FontEngine`], which owns every loaded font and hands out [`FontHandle`]s
//! as identity tokens.

pub mod headless;
pub mod swash;

use crate::surface::Surface;
use crate::Result;
use std::path::Path;

/// Identity of a font loaded by a [`FontEngine`].
///
/// Handles compare by identity: two handles are equal only if they were
/// returned by the same `open_font` call. Caches store handles but never
/// close them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontHandle(u32);

impl FontHandle {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Numeric identity, also used to seed the cache key hash
    pub const fn id(self) -> u32 {
        self.0
    }
}

/// Glyph rendering and measurement capability consumed by the text caches
pub trait FontEngine {
    /// Start the engine. Called once before any font is opened.
    fn init(&mut self) -> Result<()>;

    /// Stop the engine. Every font has been closed by the time this runs.
    fn quit(&mut self);

    /// Load the font at `path` at `size` pixels
    fn open_font(&mut self, path: &Path, size: u32) -> Result<FontHandle>;

    /// Release a font. Unknown handles are ignored.
    fn close_font(&mut self, font: FontHandle);

    /// Enable or disable hinting for `font`
    fn set_hinting(&mut self, font: FontHandle, enabled: bool);

    /// Current hinting flag of `font` (`false` for unknown handles)
    fn hinting(&self, font: FontHandle) -> bool;

    /// Measure `text`, returning `(width, height)` in pixels
    fn measure(&mut self, font: FontHandle, text: &str) -> Result<(u32, u32)>;

    /// Render `text` into a new surface.
    ///
    /// Hinted fonts render shaded ([`SurfaceFormat::Gray`]), unhinted fonts
    /// render solid ([`SurfaceFormat::Mono`]).
    ///
    /// [`SurfaceFormat::Gray`]: crate::SurfaceFormat::Gray
    /// [`SurfaceFormat::Mono`]: crate::SurfaceFormat::Mono
    fn render(&mut self, font: FontHandle, text: &str) -> Result<Surface>;

    /// Whether `font` has a glyph for `ch`
    fn provides_glyph(&self, font: FontHandle, ch: char) -> bool;
}
