//! Cached text rasterization for Quill
//!
//! This crate provides:
//! - A fixed-size, open-addressed cache of rendered text surfaces
//! - A matching cache of measured text widths
//! - The font engine seam the caches render and measure through
//!   (a swash-backed engine and a headless engine ship with the crate)
//! - Font size classes, font location and TOML configuration
//! - [`TextSystem`], which ties fonts, caches and the frame clock together
//!
//! Everything here runs on the rendering thread. Nothing is locked internally;
//! callers that share a [`TextSystem`] across threads must wrap it themselves.

pub mod cache;
pub mod config;
pub mod engine;
pub mod hash;
pub mod locator;
pub mod size;
pub mod surface;
pub mod system;
pub mod table;

pub use cache::{SurfaceCache, WidthCache};
pub use config::{ConfigError, FontDescriptor, FontSet, TextConfig};
pub use engine::headless::HeadlessEngine;
pub use engine::swash::SwashEngine;
pub use engine::{FontEngine, FontHandle};
pub use hash::key_hash;
pub use locator::{FontLocator, SystemFontLocator};
pub use size::FontSizeClass;
pub use surface::{Surface, SurfaceFormat};
pub use system::TextSystem;
pub use table::{CacheStats, SlotTable, STALE_AFTER_TICKS};

use thiserror::Error;

/// Text rendering errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Font engine failed to start: {0}")]
    EngineInit(String),

    #[error("Unable to locate font '{family}' ({file})")]
    FontNotFound { family: String, file: String },

    #[error("Failed to load font: {0}")]
    FontLoadError(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid font data")]
    InvalidFontData,

    #[error("Unknown font handle: {0:?}")]
    UnknownFont(FontHandle),

    #[error("Failed to render {text:?}")]
    RenderFailed { text: String },

    #[error("Text system is not initialized")]
    NotInitialized,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, TextError>;
