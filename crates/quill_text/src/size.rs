//! Font size classes
//!
//! Every string is drawn in one of four size classes, each backed by its own
//! loaded font.

/// Size class of a font
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontSizeClass {
    Small,
    #[default]
    Medium,
    Tiny,
    Big,
}

impl FontSizeClass {
    /// Number of size classes
    pub const COUNT: usize = 4;

    /// All size classes in index order
    pub const ALL: [FontSizeClass; Self::COUNT] = [
        FontSizeClass::Small,
        FontSizeClass::Medium,
        FontSizeClass::Tiny,
        FontSizeClass::Big,
    ];

    /// Stable index (0..=3) of this class
    pub const fn index(self) -> usize {
        match self {
            FontSizeClass::Small => 0,
            FontSizeClass::Medium => 1,
            FontSizeClass::Tiny => 2,
            FontSizeClass::Big => 3,
        }
    }

    /// Map a sprite font base to its size class.
    ///
    /// Unknown bases fall back to [`FontSizeClass::Medium`].
    pub const fn from_sprite_base(base: u16) -> Self {
        match base {
            224 => FontSizeClass::Small,
            448 => FontSizeClass::Tiny,
            672 => FontSizeClass::Big,
            _ => FontSizeClass::Medium,
        }
    }

    /// Lowercase name, as used in configuration files
    pub const fn name(self) -> &'static str {
        match self {
            FontSizeClass::Small => "small",
            FontSizeClass::Medium => "medium",
            FontSizeClass::Tiny => "tiny",
            FontSizeClass::Big => "big",
        }
    }
}

impl std::fmt::Display for FontSizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FontSizeClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(FontSizeClass::Small),
            "medium" => Ok(FontSizeClass::Medium),
            "tiny" => Ok(FontSizeClass::Tiny),
            "big" => Ok(FontSizeClass::Big),
            _ => Err(format!("Unknown font size class: {}", s)),
        }
    }
}
