//! MinHash computation over shingle hash sets.
//!
//! Fixed-length signatures from a family of hash functions derived from a
//! single 64-bit seed. Deterministic for a given seed and input set.

use rayon::prelude::*;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Compute a MinHash signature of `m` slots, in parallel when requested.
///
/// Each slot is the minimum, over all unique shingles, of the shingle hash
/// passed through a differently keyed mixing function.
pub fn minhash_signature(unique_shingles: &[u64], m: usize, seed: u64, parallel: bool) -> Vec<u64> {
    if m == 0 || unique_shingles.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(m);
    if parallel {
        (0..m)
            .into_par_iter()
            .map(|j| compute_slot(unique_shingles, j, seed))
            .collect_into_vec(&mut result);
    } else {
        result.extend((0..m).map(|j| compute_slot(unique_shingles, j, seed)));
    }
    result
}

/// A single signature slot.
#[inline]
pub(crate) fn compute_slot(unique_shingles: &[u64], j: usize, seed: u64) -> u64 {
    let step = (j as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let key = splitmix64(seed.wrapping_add(step));
    unique_shingles
        .iter()
        .map(|&val| mix_u64(val, key))
        .min()
        .unwrap_or(u64::MAX)
}

/// Keyed re-hash of a shingle hash; one key per simulated permutation.
#[inline]
pub(crate) fn mix_u64(x: u64, key: u64) -> u64 {
    let mut h = xxh3_64_with_seed(&x.to_le_bytes(), key);
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51afd7ed558ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ceb9fe1a85ec53);
    h ^ (h >> 33)
}

#[inline]
pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
