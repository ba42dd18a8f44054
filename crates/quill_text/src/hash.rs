//! Key hashing shared by the surface and width caches

use crate::engine::FontHandle;

/// Multiplier applied to the font identity before seeding
const FONT_SEED_MULTIPLIER: u32 = 23;

/// Bit pattern mixed into the font seed
const FONT_SEED_PATTERN: u32 = 0xAAAA_AAAA;

/// Multiplier applied to every text byte
const BYTE_MULTIPLIER: u32 = 13;

/// Hash a (font, text) cache key.
///
/// The seed comes from the font identity; every byte of `text` is then folded
/// in with a 3-bit right rotation followed by an XOR. The whole string is
/// always consumed, so two texts under the same font diverge from their first
/// differing byte onwards. Empty text hashes to the font seed alone.
#[inline]
pub fn key_hash(font: FontHandle, text: &str) -> u32 {
    let seed = font.id().wrapping_mul(FONT_SEED_MULTIPLIER) ^ FONT_SEED_PATTERN;
    text.bytes().fold(seed, |hash, byte| {
        hash.rotate_right(3) ^ u32::from(byte).wrapping_mul(BYTE_MULTIPLIER)
    })
}
