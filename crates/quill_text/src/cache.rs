//! Surface and width caches
//!
//! Thin wrappers over [`SlotTable`] that know how to fill a slot on a miss:
//! the surface cache renders through the [`FontEngine`], the width cache
//! measures through it.

use crate::engine::{FontEngine, FontHandle};
use crate::surface::Surface;
use crate::table::{CacheStats, SlotTable};
use crate::Result;
use std::num::NonZeroUsize;

/// Cache of rendered text surfaces
#[derive(Debug)]
pub struct SurfaceCache {
    table: SlotTable<Surface>,
}

impl SurfaceCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            table: SlotTable::new(capacity),
        }
    }

    /// Return the cached surface for `(font, text)`, rendering it on a miss.
    ///
    /// A failed render leaves the target slot empty and returns the engine's
    /// error; the same key can be inserted by a later call.
    pub fn get_or_add<E: FontEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        font: FontHandle,
        text: &str,
        tick: u32,
    ) -> Result<&Surface> {
        self.table.get_or_try_insert_with(font, text, tick, || {
            tracing::trace!("Surface cache miss for {:?} {:?}", font, text);
            engine.render(font, text).map_err(|e| {
                tracing::warn!("Failed to render {:?} with {:?}: {}", text, font, e);
                e
            })
        })
    }

    /// Peek at a cached surface without touching recency or counters
    pub fn get(&self, font: FontHandle, text: &str) -> Option<&Surface> {
        self.table.get(font, text)
    }

    pub fn contains(&self, font: FontHandle, text: &str) -> bool {
        self.table.contains(font, text)
    }

    /// Release every cached surface
    pub fn dispose_all(&mut self) {
        self.table.dispose_all();
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.table.stats()
    }
}

/// Cache of measured text widths
#[derive(Debug)]
pub struct WidthCache {
    table: SlotTable<u32>,
}

impl WidthCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            table: SlotTable::new(capacity),
        }
    }

    /// Return the cached width of `(font, text)`, measuring it on a miss.
    ///
    /// Measurement never fails at this level: if the engine cannot measure,
    /// a width of zero is cached and returned.
    pub fn get_or_add<E: FontEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        font: FontHandle,
        text: &str,
        tick: u32,
    ) -> u32 {
        let width = self
            .table
            .get_or_try_insert_with(font, text, tick, || {
                let width = match engine.measure(font, text) {
                    Ok((width, _)) => width,
                    Err(e) => {
                        tracing::debug!("Failed to measure {:?} with {:?}: {}", text, font, e);
                        0
                    }
                };
                Ok::<_, std::convert::Infallible>(width)
            });

        match width {
            Ok(width) => *width,
            Err(never) => match never {},
        }
    }

    /// Peek at a cached width without touching recency or counters
    pub fn get(&self, font: FontHandle, text: &str) -> Option<u32> {
        self.table.get(font, text).copied()
    }

    pub fn contains(&self, font: FontHandle, text: &str) -> bool {
        self.table.contains(font, text)
    }

    /// Forget every cached width
    pub fn dispose_all(&mut self) {
        self.table.dispose_all();
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.table.stats()
    }
}
