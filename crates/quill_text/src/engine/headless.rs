//! Headless font engine
//!
//! Deterministic engine that needs no font files: every glyph is a fixed
//! width box. It records how often it was asked to render and measure, and
//! can be told to fail, which makes it the engine of choice for tests and
//! headless tooling.

use super::{FontEngine, FontHandle};
use crate::surface::{Surface, SurfaceFormat};
use crate::{Result, TextError};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
struct HeadlessFont {
    path: PathBuf,
    size: u32,
    hinting: bool,
}

impl HeadlessFont {
    /// Horizontal advance of every glyph
    fn advance(&self) -> u32 {
        self.size / 2 + 1
    }
}

/// Font engine that draws boxes instead of glyphs
#[derive(Debug, Default)]
pub struct HeadlessEngine {
    running: bool,
    next_id: u32,
    fonts: FxHashMap<FontHandle, HeadlessFont>,

    fail_init: bool,
    refused_paths: FxHashSet<PathBuf>,
    failing_texts: FxHashSet<String>,

    render_calls: u64,
    measure_calls: u64,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `init` calls fail
    pub fn set_fail_init(&mut self, fail: bool) {
        self.fail_init = fail;
    }

    /// Make `open_font` fail for `path`
    pub fn refuse_path(&mut self, path: impl Into<PathBuf>) {
        self.refused_paths.insert(path.into());
    }

    /// Accept `path` again after [`refuse_path`](Self::refuse_path)
    pub fn accept_path(&mut self, path: &Path) {
        self.refused_paths.remove(path);
    }

    /// Make `render` fail for `text`
    pub fn fail_render_for(&mut self, text: impl Into<String>) {
        self.failing_texts.insert(text.into());
    }

    /// Let `render` succeed for `text` again
    pub fn clear_render_failure(&mut self, text: &str) {
        self.failing_texts.remove(text);
    }

    /// Number of `render` calls so far, failed ones included
    pub fn render_calls(&self) -> u64 {
        self.render_calls
    }

    /// Number of `measure` calls so far
    pub fn measure_calls(&self) -> u64 {
        self.measure_calls
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of fonts currently open
    pub fn open_font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Path and size a handle was opened with
    pub fn font_source(&self, font: FontHandle) -> Option<(&Path, u32)> {
        self.fonts
            .get(&font)
            .map(|f| (f.path.as_path(), f.size))
    }

    fn font(&self, font: FontHandle) -> Result<&HeadlessFont> {
        self.fonts.get(&font).ok_or(TextError::UnknownFont(font))
    }
}

impl FontEngine for HeadlessEngine {
    fn init(&mut self) -> Result<()> {
        if self.fail_init {
            return Err(TextError::EngineInit(
                "headless engine configured to fail".to_string(),
            ));
        }
        self.running = true;
        Ok(())
    }

    fn quit(&mut self) {
        self.running = false;
    }

    fn open_font(&mut self, path: &Path, size: u32) -> Result<FontHandle> {
        if !self.running {
            return Err(TextError::EngineInit("engine is not running".to_string()));
        }
        if self.refused_paths.contains(path) {
            return Err(TextError::FontLoadError(format!(
                "Failed to open font file {:?}",
                path
            )));
        }

        self.next_id += 1;
        let handle = FontHandle::new(self.next_id);
        self.fonts.insert(
            handle,
            HeadlessFont {
                path: path.to_path_buf(),
                size: size.max(1),
                hinting: false,
            },
        );
        Ok(handle)
    }

    fn close_font(&mut self, font: FontHandle) {
        self.fonts.remove(&font);
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
        self.measure_calls += 1;
        let f = self.font(font)?;
        let width = text.chars().count() as u32 * f.advance();
        Ok((width, f.size))
    }

    fn render(&mut self, font: FontHandle, text: &str) -> Result<Surface> {
        self.render_calls += 1;

        if self.failing_texts.contains(text) {
            return Err(TextError::RenderFailed {
                text: text.to_string(),
            });
        }

        let f = self.font(font)?;
        let advance = f.advance();
        let height = f.size;
        let width = text.chars().count() as u32 * advance;
        if width == 0 {
            return Err(TextError::RenderFailed {
                text: text.to_string(),
            });
        }

        let (format, ink) = if f.hinting {
            (SurfaceFormat::Gray, 255)
        } else {
            (SurfaceFormat::Mono, 1)
        };

        let mut surface = Surface::new(width, height, format);
        let pitch = surface.pitch() as usize;
        let pixels = surface.pixels_mut();

        // One box per visible glyph, inset by a pixel where the cell allows
        for (i, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let left = i as u32 * advance;
            let inset = u32::from(advance > 2 && height > 2);
            for y in inset..height - inset {
                for x in (left + inset)..(left + advance - inset) {
                    pixels[y as usize * pitch + x as usize] = ink;
                }
            }
        }

        Ok(surface)
    }

    fn provides_glyph(&self, font: FontHandle, ch: char) -> bool {
        self.fonts.contains_key(&font) && (ch == ' ' || ch.is_ascii_graphic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_engine() -> (HeadlessEngine, FontHandle) {
        let mut engine = HeadlessEngine::new();
        engine.init().unwrap();
        let font = engine.open_font(Path::new("box.ttf"), 10).unwrap();
        (engine, font)
    }

    #[test]
    fn test_open_requires_init() {
        let mut engine = HeadlessEngine::new();
        assert!(engine.open_font(Path::new("box.ttf"), 10).is_err());
    }

    #[test]
    fn test_handles_are_unique() {
        let (mut engine, first) = running_engine();
        let second = engine.open_font(Path::new("box.ttf"), 10).unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.open_font_count(), 2);
    }

    #[test]
    fn test_measure_uses_fixed_advance() {
        let (mut engine, font) = running_engine();
        assert_eq!(engine.measure(font, "abc").unwrap(), (18, 10));
        assert_eq!(engine.measure(font, "").unwrap(), (0, 10));
        assert_eq!(engine.measure_calls(), 2);
    }

    #[test]
    fn test_render_format_follows_hinting() {
        let (mut engine, font) = running_engine();

        let solid = engine.render(font, "a").unwrap();
        assert_eq!(solid.format(), SurfaceFormat::Mono);
        assert!(solid.pixels().iter().all(|&p| p <= 1));

        engine.set_hinting(font, true);
        let shaded = engine.render(font, "a").unwrap();
        assert_eq!(shaded.format(), SurfaceFormat::Gray);
        assert!(shaded.pixels().contains(&255));
    }

    #[test]
    fn test_render_empty_text_fails() {
        let (mut engine, font) = running_engine();
        assert!(matches!(
            engine.render(font, ""),
            Err(TextError::RenderFailed { .. })
        ));
    }

    #[test]
    fn test_configured_render_failure() {
        let (mut engine, font) = running_engine();
        engine.fail_render_for("X");
        assert!(engine.render(font, "X").is_err());

        engine.clear_render_failure("X");
        assert!(engine.render(font, "X").is_ok());
        assert_eq!(engine.render_calls(), 2);
    }

    #[test]
    fn test_refused_path() {
        let mut engine = HeadlessEngine::new();
        engine.init().unwrap();
        engine.refuse_path("missing.ttf");
        assert!(engine.open_font(Path::new("missing.ttf"), 10).is_err());

        engine.accept_path(Path::new("missing.ttf"));
        assert!(engine.open_font(Path::new("missing.ttf"), 10).is_ok());
    }

    #[test]
    fn test_close_font_forgets_handle() {
        let (mut engine, font) = running_engine();
        engine.close_font(font);
        assert!(matches!(
            engine.measure(font, "a"),
            Err(TextError::UnknownFont(_))
        ));
        assert!(!engine.provides_glyph(font, 'a'));
    }
}
