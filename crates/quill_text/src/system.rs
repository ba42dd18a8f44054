//! Text system
//!
//! [`TextSystem`] owns the font engine, the four size-class fonts, both
//! caches and the frame clock. It is created explicitly and brought up with
//! [`TextSystem::initialize`]; any number of independent systems may exist.

use crate::cache::{SurfaceCache, WidthCache};
use crate::config::{FontDescriptor, TextConfig};
use crate::engine::{FontEngine, FontHandle};
use crate::locator::FontLocator;
use crate::size::FontSizeClass;
use crate::surface::Surface;
use crate::table::CacheStats;
use crate::{Result, TextError};

/// Fonts, caches and frame clock for drawing text
pub struct TextSystem<E: FontEngine, L: FontLocator> {
    engine: E,
    locator: L,
    config: TextConfig,
    /// Loaded font per size class; `None` while uninitialized
    fonts: Option<[FontHandle; FontSizeClass::COUNT]>,
    surfaces: SurfaceCache,
    widths: WidthCache,
    /// Frame counter the caches stamp entries with
    tick: u32,
}

impl<E: FontEngine, L: FontLocator> TextSystem<E, L> {
    /// Create an uninitialized system. Fails if `config` is invalid.
    pub fn new(config: TextConfig, engine: E, locator: L) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            surfaces: SurfaceCache::new(config.surface_slots()?),
            widths: WidthCache::new(config.width_slots()?),
            engine,
            locator,
            config,
            fonts: None,
            tick: 0,
        })
    }

    /// Start the engine and open one font per size class.
    ///
    /// Does nothing if already initialized. On failure every font opened so
    /// far is closed and the engine is stopped, so the call can be retried.
    pub fn initialize(&mut self) -> Result<()> {
        if self.fonts.is_some() {
            return Ok(());
        }

        self.engine.init().map_err(|e| {
            tracing::warn!("Couldn't start font engine: {}", e);
            e
        })?;

        let mut fonts = [FontHandle::new(0); FontSizeClass::COUNT];
        for class in FontSizeClass::ALL {
            match self.open_class(class) {
                Ok(font) => fonts[class.index()] = font,
                Err(e) => {
                    for &font in &fonts[..class.index()] {
                        self.engine.close_font(font);
                    }
                    self.engine.quit();
                    return Err(e);
                }
            }
        }

        self.fonts = Some(fonts);
        self.apply_hinting();
        tracing::info!(
            "Text system initialized ({} surface slots, {} width slots)",
            self.surfaces.stats().capacity,
            self.widths.stats().capacity
        );
        Ok(())
    }

    fn open_class(&mut self, class: FontSizeClass) -> Result<FontHandle> {
        let desc = &self.config.fonts[class];
        let path = self.locator.locate(desc).ok_or_else(|| {
            tracing::warn!("Unable to load font '{}'", desc.family);
            TextError::FontNotFound {
                family: desc.family.clone(),
                file: desc.file.clone(),
            }
        })?;

        let font = self.engine.open_font(&path, desc.size).map_err(|e| {
            tracing::warn!("Unable to load {:?}: {}", path, e);
            e
        })?;
        tracing::debug!("Loaded {} font {:?} from {:?}", class, font, path);
        Ok(font)
    }

    /// Release both caches, close every font and stop the engine.
    ///
    /// Does nothing if not initialized.
    pub fn shutdown(&mut self) {
        let Some(fonts) = self.fonts.take() else {
            return;
        };

        self.surfaces.dispose_all();
        self.widths.dispose_all();
        for font in fonts {
            self.engine.close_font(font);
        }
        self.engine.quit();
        tracing::info!("Text system shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.fonts.is_some()
    }

    /// Re-apply the configured hinting to every font.
    ///
    /// Cached surfaces were rendered with the old setting and are released;
    /// cached widths are kept.
    pub fn toggle_hinting(&mut self) {
        if self.fonts.is_none() {
            return;
        }
        self.apply_hinting();
    }

    /// Switch hinting globally and re-apply it
    pub fn set_hinting_enabled(&mut self, enabled: bool) {
        if self.fonts.is_none() {
            return;
        }
        self.config.enable_hinting = enabled;
        self.apply_hinting();
    }

    fn apply_hinting(&mut self) {
        let Some(fonts) = self.fonts else {
            return;
        };

        for class in FontSizeClass::ALL {
            let hinting = self.config.use_hinting(class);
            self.engine.set_hinting(fonts[class.index()], hinting);
            tracing::debug!("Hinting for {} font: {}", class, hinting);
        }

        if !self.surfaces.is_empty() {
            self.surfaces.dispose_all();
        }
    }

    /// Cached surface of `text` in `font`, rendered on a miss
    pub fn get_or_add_surface(&mut self, font: FontHandle, text: &str) -> Result<&Surface> {
        if self.fonts.is_none() {
            return Err(TextError::NotInitialized);
        }
        self.surfaces
            .get_or_add(&mut self.engine, font, text, self.tick)
    }

    /// Cached width of `text` in `font`, measured on a miss.
    ///
    /// Returns 0 without caching anything while uninitialized.
    pub fn get_or_add_width(&mut self, font: FontHandle, text: &str) -> u32 {
        if self.fonts.is_none() {
            return 0;
        }
        self.widths
            .get_or_add(&mut self.engine, font, text, self.tick)
    }

    /// [`get_or_add_surface`](Self::get_or_add_surface) with the font of `class`
    pub fn surface_for(&mut self, class: FontSizeClass, text: &str) -> Result<&Surface> {
        let font = self.font(class).ok_or(TextError::NotInitialized)?;
        self.get_or_add_surface(font, text)
    }

    /// [`get_or_add_width`](Self::get_or_add_width) with the font of `class`
    pub fn width_for(&mut self, class: FontSizeClass, text: &str) -> u32 {
        match self.font(class) {
            Some(font) => self.get_or_add_width(font, text),
            None => 0,
        }
    }

    /// Render `text` without touching either cache.
    ///
    /// The caller owns the result; hand it back with
    /// [`free_surface`](Self::free_surface) or simply drop it.
    pub fn render_uncached(&mut self, font: FontHandle, text: &str) -> Result<Surface> {
        if self.fonts.is_none() {
            return Err(TextError::NotInitialized);
        }
        self.engine.render(font, text)
    }

    /// Release a surface from [`render_uncached`](Self::render_uncached)
    pub fn free_surface(&self, surface: Surface) {
        drop(surface);
    }

    /// Whether the font of `class` has a glyph for `ch`
    pub fn provides_glyph(&self, class: FontSizeClass, ch: char) -> bool {
        self.font(class)
            .is_some_and(|font| self.engine.provides_glyph(font, ch))
    }

    /// Loaded font of `class`, if initialized
    pub fn font(&self, class: FontSizeClass) -> Option<FontHandle> {
        self.fonts.map(|fonts| fonts[class.index()])
    }

    pub fn descriptor(&self, class: FontSizeClass) -> &FontDescriptor {
        &self.config.fonts[class]
    }

    /// Descriptor of the size class a sprite font base maps to
    pub fn font_for_sprite_base(&self, base: u16) -> &FontDescriptor {
        self.descriptor(FontSizeClass::from_sprite_base(base))
    }

    /// Advance the frame clock by one, wrapping at `u32::MAX`
    pub fn advance_frame(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    /// Set the frame clock. Moving it backwards makes cached entries look
    /// stale.
    pub fn set_frame(&mut self, tick: u32) {
        self.tick = tick;
    }

    /// Current frame
    pub fn frame(&self) -> u32 {
        self.tick
    }

    pub fn surface_stats(&self) -> CacheStats {
        self.surfaces.stats()
    }

    pub fn width_stats(&self) -> CacheStats {
        self.widths.stats()
    }

    pub fn config(&self) -> &TextConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<E: FontEngine, L: FontLocator> Drop for TextSystem<E, L> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
