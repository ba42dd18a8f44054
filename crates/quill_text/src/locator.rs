//! Font file location
//!
//! Turns a [`FontDescriptor`] into a path the font engine can open. Uses
//! fontdb to search installed system fonts.

use crate::config::FontDescriptor;
use fontdb::{Database, Family, Query, Source, Stretch, Style, Weight};
use std::path::{Path, PathBuf};

/// Resolves font descriptors to font files
pub trait FontLocator {
    /// Path of the font file for `desc`, or `None` if it cannot be found
    fn locate(&self, desc: &FontDescriptor) -> Option<PathBuf>;
}

impl<F> FontLocator for F
where
    F: Fn(&FontDescriptor) -> Option<PathBuf>,
{
    fn locate(&self, desc: &FontDescriptor) -> Option<PathBuf> {
        self(desc)
    }
}

/// Locator backed by configured directories and the system font database.
///
/// Resolution order:
/// 1. `file` as an absolute path, if it exists
/// 2. `file` inside each configured directory, in order
/// 3. a system font whose file name equals `file`
/// 4. a system font of family `family`
pub struct SystemFontLocator {
    /// fontdb database containing system fonts and configured directories
    db: Database,
    dirs: Vec<PathBuf>,
}

impl SystemFontLocator {
    /// Create a locator and load system fonts plus every font in `dirs`
    pub fn new(dirs: &[PathBuf]) -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        for dir in dirs {
            db.load_fonts_dir(dir);
        }
        tracing::debug!("Font database holds {} faces", db.len());

        Self::with_database(db, dirs.to_vec())
    }

    /// Create a locator over an existing database
    pub fn with_database(db: Database, dirs: Vec<PathBuf>) -> Self {
        Self { db, dirs }
    }

    fn in_dirs(&self, file: &str) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(file))
            .find(|candidate| candidate.is_file())
    }

    fn by_file_name(&self, file: &str) -> Option<PathBuf> {
        let name = Path::new(file).file_name()?;
        self.db.faces().find_map(|face| {
            let path = source_path(&face.source)?;
            (path.file_name() == Some(name)).then(|| path.to_path_buf())
        })
    }

    fn by_family(&self, family: &str) -> Option<PathBuf> {
        let query = Query {
            families: &[Family::Name(family)],
            weight: Weight::NORMAL,
            style: Style::Normal,
            stretch: Stretch::Normal,
        };
        let id = self.db.query(&query)?;
        let face = self.db.face(id)?;

        // fontdb falls back to any face when the family is missing
        let matches = face
            .families
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(family));
        if !matches {
            return None;
        }
        source_path(&face.source).map(Path::to_path_buf)
    }
}

impl FontLocator for SystemFontLocator {
    fn locate(&self, desc: &FontDescriptor) -> Option<PathBuf> {
        let direct = Path::new(&desc.file);
        if direct.is_absolute() && direct.is_file() {
            return Some(direct.to_path_buf());
        }

        let found = (!desc.file.is_empty())
            .then(|| self.in_dirs(&desc.file).or_else(|| self.by_file_name(&desc.file)))
            .flatten()
            .or_else(|| (!desc.family.is_empty()).then(|| self.by_family(&desc.family)).flatten());

        match &found {
            Some(path) => tracing::debug!("Located font '{}' at {:?}", desc.family, path),
            None => tracing::warn!("Unable to locate font '{}' ({})", desc.family, desc.file),
        }
        found
    }
}

fn source_path(source: &Source) -> Option<&Path> {
    match source {
        Source::File(path) => Some(path),
        Source::SharedFile(path, _) => Some(path),
        Source::Binary(_) => None,
    }
}
