//! Text system configuration (TOML)
//!
//! ```toml
//! enable_hinting = true
//! surface_cache_slots = 256
//! width_cache_slots = 1024
//! font_dirs = ["/usr/share/fonts/truetype/dejavu"]
//!
//! [fonts.medium]
//! file = "DejaVuSans.ttf"
//! family = "DejaVu Sans"
//! size = 12
//! line_height = 14
//! hinting_threshold = 1
//! ```
//!
//! Every key is optional. Missing size classes use the built-in descriptors.

use crate::size::FontSizeClass;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Font used for one size class
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FontDescriptor {
    /// Font file name or path
    pub file: String,
    /// Family name, queried when the file cannot be found
    pub family: String,
    /// Pixel size the font is opened at
    pub size: u32,
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
    pub line_height: u32,
    /// Zero disables hinting for this size class
    #[serde(default)]
    pub hinting_threshold: u32,
}

impl FontDescriptor {
    fn builtin(size: u32, offset_y: i32, line_height: u32, hinting_threshold: u32) -> Self {
        Self {
            file: "DejaVuSans.ttf".to_string(),
            family: "DejaVu Sans".to_string(),
            size,
            offset_x: 0,
            offset_y,
            line_height,
            hinting_threshold,
        }
    }
}

/// One descriptor per size class
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FontSet {
    #[serde(default = "default_small")]
    pub small: FontDescriptor,
    #[serde(default = "default_medium")]
    pub medium: FontDescriptor,
    #[serde(default = "default_tiny")]
    pub tiny: FontDescriptor,
    #[serde(default = "default_big")]
    pub big: FontDescriptor,
}

fn default_small() -> FontDescriptor {
    FontDescriptor::builtin(9, -1, 10, 1)
}

fn default_medium() -> FontDescriptor {
    FontDescriptor::builtin(12, -1, 14, 1)
}

fn default_tiny() -> FontDescriptor {
    FontDescriptor::builtin(8, 0, 9, 0)
}

fn default_big() -> FontDescriptor {
    FontDescriptor::builtin(16, -2, 19, 1)
}

impl Default for FontSet {
    fn default() -> Self {
        Self {
            small: default_small(),
            medium: default_medium(),
            tiny: default_tiny(),
            big: default_big(),
        }
    }
}

impl FontSet {
    /// Descriptors paired with their size class, in index order
    pub fn iter(&self) -> impl Iterator<Item = (FontSizeClass, &FontDescriptor)> {
        FontSizeClass::ALL.into_iter().map(move |class| (class, &self[class]))
    }
}

impl Index<FontSizeClass> for FontSet {
    type Output = FontDescriptor;

    fn index(&self, class: FontSizeClass) -> &FontDescriptor {
        match class {
            FontSizeClass::Small => &self.small,
            FontSizeClass::Medium => &self.medium,
            FontSizeClass::Tiny => &self.tiny,
            FontSizeClass::Big => &self.big,
        }
    }
}

impl IndexMut<FontSizeClass> for FontSet {
    fn index_mut(&mut self, class: FontSizeClass) -> &mut FontDescriptor {
        match class {
            FontSizeClass::Small => &mut self.small,
            FontSizeClass::Medium => &mut self.medium,
            FontSizeClass::Tiny => &mut self.tiny,
            FontSizeClass::Big => &mut self.big,
        }
    }
}

/// Text system configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TextConfig {
    /// Global hinting switch
    #[serde(default = "default_true")]
    pub enable_hinting: bool,
    /// Number of slots in the surface cache
    #[serde(default = "default_surface_cache_slots")]
    pub surface_cache_slots: usize,
    /// Number of slots in the width cache
    #[serde(default = "default_width_cache_slots")]
    pub width_cache_slots: usize,
    /// Extra directories searched for font files
    #[serde(default)]
    pub font_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub fonts: FontSet,
}

fn default_true() -> bool {
    true
}

fn default_surface_cache_slots() -> usize {
    256
}

fn default_width_cache_slots() -> usize {
    1024
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            enable_hinting: true,
            surface_cache_slots: default_surface_cache_slots(),
            width_cache_slots: default_width_cache_slots(),
            font_dirs: Vec::new(),
            fonts: FontSet::default(),
        }
    }
}

impl TextConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded text config from {:?}", path);
        Ok(config)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.surface_slots()?;
        self.width_slots()?;

        for (class, desc) in self.fonts.iter() {
            if desc.size == 0 {
                return Err(invalid(format!("fonts.{}.size", class), "must be > 0"));
            }
            if desc.file.is_empty() && desc.family.is_empty() {
                return Err(invalid(
                    format!("fonts.{}", class),
                    "needs a file or a family",
                ));
            }
        }
        Ok(())
    }

    /// Surface cache size
    pub fn surface_slots(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.surface_cache_slots)
            .ok_or_else(|| invalid("surface_cache_slots", "must be > 0"))
    }

    /// Width cache size
    pub fn width_slots(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.width_cache_slots)
            .ok_or_else(|| invalid("width_cache_slots", "must be > 0"))
    }

    /// Whether fonts of `class` are rendered with hinting
    pub fn use_hinting(&self, class: FontSizeClass) -> bool {
        self.enable_hinting && self.fonts[class].hinting_threshold != 0
    }
}

fn invalid(key: impl Into<String>, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        reason: reason.to_string(),
    }
}
