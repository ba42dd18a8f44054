//! Fixed-size, open-addressed slot table keyed by (font, text)
//!
//! Both text caches are a [`SlotTable`] with a different value type. The table
//! never grows: a miss always lands in an existing slot, evicting whatever
//! lived there.
//!
//! Probing starts at `hash % capacity` and walks forward one slot at a time,
//! wrapping at the end. The walk ends at the queried key (hit) or at a slot
//! that has never held an entry since the last disposal (miss). Slots emptied
//! by a failed insert and slots unused for more than [`STALE_AFTER_TICKS`]
//! frames do not end the walk, so keys further along stay reachable; the
//! first such slot on the path receives the key on a miss.
//!
//! If every slot on the path is occupied and fresh, the least recently used
//! one is evicted instead.

use crate::engine::FontHandle;
use crate::hash::key_hash;
use std::num::NonZeroUsize;

/// Number of frames after which an unused slot may be replaced
pub const STALE_AFTER_TICKS: u32 = 64;

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of slots in the table
    pub capacity: usize,

    /// Number of occupied slots
    pub live: usize,

    /// Number of lookups answered from the table
    pub hits: u64,

    /// Number of lookups that produced and stored a new value
    pub misses: u64,

    /// Number of occupied slots overwritten by a new key
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// An occupied slot
#[derive(Debug)]
struct Entry<V> {
    /// Borrowed identity of the font; never closed by the table
    font: FontHandle,
    /// Owned copy of the key text
    text: Box<str>,
    value: V,
    last_use_tick: u32,
}

impl<V> Entry<V> {
    fn matches(&self, font: FontHandle, text: &str) -> bool {
        self.font == font && &*self.text == text
    }

    /// Frames since last use. Wraps with the frame clock.
    fn age(&self, tick: u32) -> u32 {
        tick.wrapping_sub(self.last_use_tick)
    }

    fn is_stale(&self, tick: u32) -> bool {
        self.age(tick) > STALE_AFTER_TICKS
    }
}

#[derive(Debug)]
struct Slot<V> {
    entry: Option<Entry<V>>,
    /// Held an entry since the last disposal. Probes walk past claimed
    /// slots even when they are empty.
    claimed: bool,
}

impl<V> Slot<V> {
    const UNCLAIMED: Self = Self {
        entry: None,
        claimed: false,
    };
}

/// Where a probe ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// The key lives in this slot
    Hit(usize),
    /// The key is absent; this slot receives it
    Vacant(usize),
}

/// Open-addressed table mapping (font, text) to `V`
pub struct SlotTable<V> {
    slots: Box<[Slot<V>]>,
    stats: CacheStats,
}

impl<V> SlotTable<V> {
    /// Create a table with `capacity` empty slots
    pub fn new(capacity: NonZeroUsize) -> Self {
        let slots = std::iter::repeat_with(|| Slot::UNCLAIMED)
            .take(capacity.get())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            stats: CacheStats {
                capacity: capacity.get(),
                ..Default::default()
            },
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.stats.live
    }

    pub fn is_empty(&self) -> bool {
        self.stats.live == 0
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Look up `(font, text)`, producing and storing the value on a miss.
    ///
    /// On a hit the slot is stamped with `tick` and `produce` is not called.
    /// On a miss the target slot is emptied first (dropping its value and key
    /// copy), then `produce` runs. If it fails the slot stays empty and the
    /// error is returned unchanged; no counters move.
    pub fn get_or_try_insert_with<E, F>(
        &mut self,
        font: FontHandle,
        text: &str,
        tick: u32,
        produce: F,
    ) -> Result<&V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let (index, found) = match self.probe(font, text, tick) {
            Probe::Hit(index) => (index, self.slots[index].entry.take()),
            Probe::Vacant(index) => (index, None),
        };

        let entry = match found {
            Some(mut entry) => {
                self.stats.hits += 1;
                entry.last_use_tick = tick;
                entry
            }
            None => {
                self.release(index);
                let value = produce()?;

                self.stats.misses += 1;
                self.stats.live += 1;
                Entry {
                    font,
                    text: text.into(),
                    value,
                    last_use_tick: tick,
                }
            }
        };

        let slot = &mut self.slots[index];
        slot.claimed = true;
        Ok(&slot.entry.insert(entry).value)
    }

    /// Look up a cached value without touching recency or counters.
    ///
    /// Follows the same probe path as
    /// [`get_or_try_insert_with`](Self::get_or_try_insert_with), so a value is
    /// found here exactly when a lookup would hit it.
    pub fn get(&self, font: FontHandle, text: &str) -> Option<&V> {
        for index in self.path(font, text) {
            let slot = &self.slots[index];
            if !slot.claimed {
                return None;
            }
            if let Some(entry) = slot.entry.as_ref().filter(|e| e.matches(font, text)) {
                return Some(&entry.value);
            }
        }
        None
    }

    /// Whether a lookup of `(font, text)` would hit
    pub fn contains(&self, font: FontHandle, text: &str) -> bool {
        self.get(font, text).is_some()
    }

    /// Release every occupied slot and reset the live count.
    ///
    /// Hit, miss and eviction counters are kept; they describe the table's
    /// history, not its contents.
    pub fn dispose_all(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::UNCLAIMED;
        }
        self.stats.live = 0;
    }

    /// Empty one slot, dropping its value and key copy
    fn release(&mut self, index: usize) {
        if self.slots[index].entry.take().is_some() {
            self.stats.live -= 1;
            self.stats.evictions += 1;
            tracing::trace!("Evicted text cache slot {}", index);
        }
    }

    /// Slot indices in probe order for `(font, text)`
    fn path(&self, font: FontHandle, text: &str) -> impl Iterator<Item = usize> {
        let capacity = self.slots.len();
        let home = key_hash(font, text) as usize % capacity;
        (0..capacity).map(move |step| (home + step) % capacity)
    }

    fn probe(&self, font: FontHandle, text: &str, tick: u32) -> Probe {
        // First empty-but-claimed or stale slot on the path
        let mut reusable = None;
        // Least recently used fresh slot, for the full-and-fresh case
        let mut oldest: Option<(usize, u32)> = None;

        for index in self.path(font, text) {
            let slot = &self.slots[index];
            let Some(entry) = &slot.entry else {
                if !slot.claimed {
                    return Probe::Vacant(reusable.unwrap_or(index));
                }
                reusable.get_or_insert(index);
                continue;
            };

            if entry.matches(font, text) {
                return Probe::Hit(index);
            }

            let age = entry.age(tick);
            if entry.is_stale(tick) {
                reusable.get_or_insert(index);
            } else if oldest.map_or(true, |(_, oldest_age)| age > oldest_age) {
                oldest = Some((index, age));
            }
        }

        match (reusable, oldest) {
            (Some(index), _) | (None, Some((index, _))) => Probe::Vacant(index),
            // Capacity is non-zero, so the path saw at least one slot
            (None, None) => Probe::Vacant(0),
        }
    }
}

impl<V> std::fmt::Debug for SlotTable<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotTable")
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn table(capacity: usize) -> SlotTable<u32> {
        SlotTable::new(NonZeroUsize::new(capacity).unwrap())
    }

    fn insert(table: &mut SlotTable<u32>, font: u32, text: &str, tick: u32, value: u32) -> u32 {
        *table
            .get_or_try_insert_with(FontHandle::new(font), text, tick, || {
                Ok::<_, Infallible>(value)
            })
            .unwrap()
    }

    fn entries<V>(table: &SlotTable<V>) -> impl Iterator<Item = &Entry<V>> {
        table.slots.iter().filter_map(|slot| slot.entry.as_ref())
    }

    /// `count` distinct texts whose home slot is the same in a table of
    /// `capacity` slots (font 1)
    fn same_home(capacity: usize, count: usize) -> Vec<String> {
        let font = FontHandle::new(1);
        let home = key_hash(font, "k0") as usize % capacity;
        (0..)
            .map(|i| format!("k{}", i))
            .filter(|text| key_hash(font, text) as usize % capacity == home)
            .take(count)
            .collect()
    }

    #[test]
    fn test_miss_then_hit() {
        let mut table = table(8);

        assert_eq!(insert(&mut table, 1, "a", 0, 10), 10);
        // Second producer is ignored on a hit
        assert_eq!(insert(&mut table, 1, "a", 0, 99), 10);

        let stats = table.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.live, 1);
    }

    #[test]
    fn test_producer_not_called_on_hit() {
        let mut table = table(8);
        insert(&mut table, 1, "a", 0, 10);

        let mut calls = 0;
        table
            .get_or_try_insert_with(FontHandle::new(1), "a", 1, || {
                calls += 1;
                Ok::<_, Infallible>(0)
            })
            .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_hit_restamps_tick() {
        let mut table = table(4);
        insert(&mut table, 1, "a", 0, 10);
        insert(&mut table, 1, "a", 50, 10);

        let index = match table.probe(FontHandle::new(1), "a", 50) {
            Probe::Hit(index) => index,
            other => panic!("Expected hit, got {:?}", other),
        };
        assert_eq!(table.slots[index].entry.as_ref().unwrap().last_use_tick, 50);
    }

    #[test]
    fn test_failed_producer_leaves_slot_empty() {
        let mut table = table(4);

        let result = table.get_or_try_insert_with(FontHandle::new(1), "x", 0, || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(table.is_empty());
        assert_eq!(table.stats().misses, 0);

        assert_eq!(insert(&mut table, 1, "x", 0, 5), 5);
        assert!(table.contains(FontHandle::new(1), "x"));
    }

    #[test]
    fn test_failed_producer_still_evicts_target() {
        let mut table = table(1);
        insert(&mut table, 1, "old", 0, 1);

        // Full and fresh: the only slot is evicted before the producer runs
        let result = table.get_or_try_insert_with(FontHandle::new(1), "new", 0, || Err(()));
        assert!(result.is_err());
        assert!(table.is_empty());
        assert!(!table.contains(FontHandle::new(1), "old"));
    }

    #[test]
    fn test_no_duplicate_keys() {
        let mut table = table(4);
        for tick in 0..10 {
            insert(&mut table, 1, "same", tick, tick);
        }
        assert_eq!(table.len(), 1);
        assert_eq!(entries(&table).count(), 1);
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let mut table = table(4);
        for i in 0..5 {
            insert(&mut table, 1, &format!("key{}", i), 0, i);
        }

        assert_eq!(table.len(), 4);
        let reachable = (0..5)
            .filter(|i| table.contains(FontHandle::new(1), &format!("key{}", i)))
            .count();
        assert_eq!(reachable, 4);
        assert_eq!(table.stats().evictions, 1);
    }

    #[test]
    fn test_full_fresh_table_evicts_least_recent() {
        let mut table = table(4);
        for i in 0..4 {
            insert(&mut table, 1, &format!("key{}", i), 10 + i, i);
        }

        // All fresh at tick 20; key0 has the oldest stamp
        insert(&mut table, 1, "key4", 20, 4);

        assert!(!table.contains(FontHandle::new(1), "key0"));
        for i in 1..5 {
            assert!(table.contains(FontHandle::new(1), &format!("key{}", i)));
        }
    }

    #[test]
    fn test_stale_slot_is_replaced() {
        let mut table = table(1);
        insert(&mut table, 1, "old", 0, 1);

        // 65 frames later the occupant is stale
        insert(&mut table, 1, "new", 65, 2);
        assert!(table.contains(FontHandle::new(1), "new"));
        assert!(!table.contains(FontHandle::new(1), "old"));
    }

    #[test]
    fn test_staleness_boundary() {
        let mut table = table(2);
        insert(&mut table, 1, "a", 0, 1);
        let entry = entries(&table).next().unwrap();

        // `0 < 64 - 64` is false, `0 < 65 - 64` is true
        assert!(!entry.is_stale(64));
        assert!(entry.is_stale(65));
    }

    #[test]
    fn test_early_ticks_are_never_stale() {
        let mut table = table(2);
        insert(&mut table, 1, "a", 0, 1);
        let entry = entries(&table).next().unwrap();
        for tick in 0..=64 {
            assert!(!entry.is_stale(tick));
        }
    }

    #[test]
    fn test_fresh_entry_survives_when_empty_slot_exists() {
        let mut table = table(8);
        insert(&mut table, 1, "keep", 100, 1);

        // Insert more keys at the same tick; free slots always exist
        for i in 0..7 {
            insert(&mut table, 2, &format!("other{}", i), 100, i);
        }
        assert!(table.contains(FontHandle::new(1), "keep"));
        assert_eq!(table.len(), 8);
    }

    #[test]
    fn test_same_text_different_font_is_distinct() {
        let mut table = table(8);
        insert(&mut table, 1, "Hello", 0, 1);
        insert(&mut table, 2, "Hello", 0, 2);

        assert_eq!(table.get(FontHandle::new(1), "Hello"), Some(&1));
        assert_eq!(table.get(FontHandle::new(2), "Hello"), Some(&2));
        assert_eq!(table.stats().misses, 2);
    }

    #[test]
    fn test_dispose_all_twice() {
        let mut table = table(4);
        insert(&mut table, 1, "a", 0, 1);
        insert(&mut table, 1, "b", 0, 2);

        table.dispose_all();
        assert!(table.is_empty());
        assert!(table.slots.iter().all(|s| s.entry.is_none() && !s.claimed));

        table.dispose_all();
        assert!(table.is_empty());
        assert!(table.slots.iter().all(|s| s.entry.is_none() && !s.claimed));

        // Table is usable again
        assert_eq!(insert(&mut table, 1, "a", 0, 3), 3);
    }

    #[test]
    fn test_dispose_drops_values() {
        use std::rc::Rc;

        let marker = Rc::new(());
        let mut table: SlotTable<Rc<()>> = SlotTable::new(NonZeroUsize::new(2).unwrap());
        table
            .get_or_try_insert_with(FontHandle::new(1), "a", 0, || {
                Ok::<_, Infallible>(Rc::clone(&marker))
            })
            .unwrap();
        assert_eq!(Rc::strong_count(&marker), 2);

        table.dispose_all();
        assert_eq!(Rc::strong_count(&marker), 1);
    }

    #[test]
    fn test_stored_text_is_a_copy() {
        let mut table = table(4);
        let mut buffer = String::from("volatile");
        insert(&mut table, 1, &buffer, 0, 1);

        buffer.clear();
        buffer.push_str("changed");
        assert!(table.contains(FontHandle::new(1), "volatile"));
        assert!(!table.contains(FontHandle::new(1), "changed"));
    }

    #[test]
    fn test_live_key_behind_stale_slot_is_a_hit() {
        let mut table = table(2);
        let keys = same_home(2, 2);
        let (first, second) = (&keys[0], &keys[1]);

        insert(&mut table, 1, first, 0, 1);
        insert(&mut table, 1, second, 0, 2);
        // Keep the second key hot while the first goes stale
        insert(&mut table, 1, second, 90, 2);

        let mut calls = 0;
        let value = *table
            .get_or_try_insert_with(FontHandle::new(1), second, 100, || {
                calls += 1;
                Ok::<_, Infallible>(99)
            })
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls, 0);
        assert_eq!(table.len(), 2);
        let copies = entries(&table)
            .filter(|entry| entry.matches(FontHandle::new(1), second))
            .count();
        assert_eq!(copies, 1);
    }

    #[test]
    fn test_stale_slot_on_path_receives_new_key() {
        let mut table = table(3);
        let keys = same_home(3, 3);

        insert(&mut table, 1, &keys[0], 0, 1);
        insert(&mut table, 1, &keys[1], 0, 2);
        insert(&mut table, 1, &keys[1], 90, 2);

        // keys[0] is stale at tick 100 and sits at the home slot
        insert(&mut table, 1, &keys[2], 100, 3);
        assert!(!table.contains(FontHandle::new(1), &keys[0]));
        assert!(table.contains(FontHandle::new(1), &keys[1]));
        assert!(table.contains(FontHandle::new(1), &keys[2]));
        assert_eq!(table.stats().evictions, 1);
    }

    #[test]
    fn test_failed_insert_keeps_later_keys_reachable() {
        let mut table = table(2);
        let keys = same_home(2, 3);

        insert(&mut table, 1, &keys[0], 0, 1);
        insert(&mut table, 1, &keys[1], 0, 2);
        insert(&mut table, 1, &keys[1], 90, 2);

        // Evicts the stale home slot, then fails
        let result =
            table.get_or_try_insert_with(FontHandle::new(1), &keys[2], 100, || Err("boom"));
        assert!(result.is_err());
        assert_eq!(table.len(), 1);

        // The emptied home slot does not cut the path short
        assert_eq!(table.get(FontHandle::new(1), &keys[1]), Some(&2));
        let hits = table.stats().hits;
        assert_eq!(insert(&mut table, 1, &keys[1], 100, 99), 2);
        assert_eq!(table.stats().hits, hits + 1);

        // The emptied slot is reused by the next miss
        insert(&mut table, 1, &keys[2], 100, 3);
        assert_eq!(table.len(), 2);
        assert_eq!(table.stats().evictions, 1);
    }

    #[test]
    fn test_get_does_not_restamp() {
        let mut table = table(4);
        insert(&mut table, 1, "a", 5, 1);

        assert_eq!(table.get(FontHandle::new(1), "a"), Some(&1));
        assert_eq!(entries(&table).next().unwrap().last_use_tick, 5);
        assert_eq!(table.stats().hits, 0);
        assert_eq!(table.get(FontHandle::new(1), "b"), None);
    }

    #[test]
    fn test_staleness_across_wraparound() {
        let mut table = table(2);
        insert(&mut table, 1, "a", u32::MAX - 10, 1);
        let entry = entries(&table).next().unwrap();

        // 31 frames after the stamp, the clock having wrapped
        assert!(!entry.is_stale(20));
        // 111 frames after the stamp
        assert!(entry.is_stale(100));
    }

    #[test]
    fn test_least_recent_eviction_across_wraparound() {
        let mut table = table(2);
        insert(&mut table, 1, "before", u32::MAX - 1, 1);
        insert(&mut table, 1, "after", 3, 2);

        // Both fresh at tick 5; "before" was used 7 frames ago, "after" 2
        insert(&mut table, 1, "new", 5, 3);
        assert!(!table.contains(FontHandle::new(1), "before"));
        assert!(table.contains(FontHandle::new(1), "after"));
        assert!(table.contains(FontHandle::new(1), "new"));
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
