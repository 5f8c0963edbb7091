//! Word hashing and k-word shingling.
//!
//! Both operations run in O(n) over the number of words.

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::minhash::splitmix64;

/// Hash each word individually with the sketch seed.
///
/// The scorer compares documents on these hashes rather than on strings, so
/// they must be produced with the same seed on both sides.
pub fn word_hashes<S: AsRef<str>>(words: &[S], seed: u64) -> Vec<u64> {
    words
        .iter()
        .map(|w| xxh3_64_with_seed(w.as_ref().as_bytes(), seed))
        .collect()
}

/// Compute rolling-hash shingles deterministically in O(n).
///
/// The caller must provide **normalized words in order**. A document shorter
/// than `k` words is treated as one shingle covering all of it, so short
/// submissions still produce a sketch.
pub fn make_shingles_rolling<S: AsRef<str>>(words: &[S], k: usize, seed: u64) -> Vec<u64> {
    let n = words.len();
    if k == 0 || n == 0 {
        return Vec::new();
    }
    let hashes = word_hashes(words, seed);
    let k = k.min(n);

    const BASE: u64 = 1_000_003;
    let base = BASE ^ splitmix64(seed);

    // base^(k-1), used to drop the oldest word from the window.
    let mut base_km1 = 1u64;
    for _ in 1..k {
        base_km1 = base_km1.wrapping_mul(base);
    }

    let mut out = Vec::with_capacity(n - k + 1);
    let mut h = 0u64;
    for &val in hashes.iter().take(k) {
        h = h.wrapping_mul(base).wrapping_add(val);
    }
    out.push(h);

    for (&old, &new) in hashes.iter().zip(hashes.iter().skip(k)) {
        h = h.wrapping_sub(old.wrapping_mul(base_km1));
        h = h.wrapping_mul(base).wrapping_add(new);
        out.push(h);
    }
    out
}
