//! MurmurHash3 combiner for content-addressed hashing.
//!
//! Prediction contexts and ATN configurations hash by content; the hash is
//! computed once at construction and cached, so the combiner must be cheap
//! and deterministic across runs.

const C1: u32 = 0xCC9E_2D51;
const C2: u32 = 0x1B87_3593;

/// Default seed used by all runtime hashing.
pub const DEFAULT_SEED: u32 = 0;

/// Start a hash computation.
#[inline]
pub fn initialize(seed: u32) -> u32 {
    seed
}

/// Mix one 32-bit word into the hash.
#[inline]
pub fn update(hash: u32, value: u32) -> u32 {
    let mut k = value;
    k = k.wrapping_mul(C1);
    k = k.rotate_left(15);
    k = k.wrapping_mul(C2);

    let mut h = hash ^ k;
    h = h.rotate_left(13);
    h.wrapping_mul(5).wrapping_add(0xE654_6B64)
}

/// Finalize the hash over `word_count` mixed words.
#[inline]
pub fn finish(hash: u32, word_count: usize) -> u32 {
    let mut h = hash ^ (word_count as u32).wrapping_mul(4);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 13;
    h = h.wrapping_mul(0xC2B2_AE35);
    h ^ (h >> 16)
}

/// Hash a slice of words with the default seed.
pub fn hash_words(words: &[u32]) -> u32 {
    let mut h = initialize(DEFAULT_SEED);
    for &w in words {
        h = update(h, w);
    }
    finish(h, words.len())
}
