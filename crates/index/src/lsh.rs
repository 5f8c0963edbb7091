//! Banding of MinHash signatures into LSH bucket keys.
//!
//! A signature of `n` values becomes `ceil(n / band_width)` bands. Two
//! documents in the same scope that agree on every value of at least one band
//! land in a shared bucket and become candidates for each other.

use xxhash_rust::xxh3::Xxh3;

/// Bucket keys for every band of `signature`, scoped by `scope_key`.
///
/// The band index is part of the key so identical values at different
/// positions do not collide. A trailing short band is kept.
pub fn band_keys(scope_key: &str, signature: &[u64], band_width: usize) -> Vec<u64> {
    if signature.is_empty() || band_width == 0 {
        return Vec::new();
    }
    signature
        .chunks(band_width)
        .enumerate()
        .map(|(band, values)| {
            let mut hasher = Xxh3::new();
            hasher.update(scope_key.as_bytes());
            hasher.update(&[0xFF]);
            hasher.update(&(band as u32).to_le_bytes());
            for value in values {
                hasher.update(&value.to_le_bytes());
            }
            hasher.digest()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_key_per_band() {
        let sig: Vec<u64> = (0..64).collect();
        assert_eq!(band_keys("s", &sig, 4).len(), 16);
        assert_eq!(band_keys("s", &sig[..10], 4).len(), 3);
        assert!(band_keys("s", &[], 4).is_empty());
    }

    #[test]
    fn shared_band_shares_key() {
        let a = [1u64, 2, 3, 4, 5, 6, 7, 8];
        let b = [1u64, 2, 3, 4, 9, 9, 9, 9];
        let ka = band_keys("s", &a, 4);
        let kb = band_keys("s", &b, 4);
        assert_eq!(ka[0], kb[0]);
        assert_ne!(ka[1], kb[1]);
    }

    #[test]
    fn scope_and_position_separate_keys() {
        let sig = [7u64, 7, 7, 7, 7, 7, 7, 7];
        let keys = band_keys("s", &sig, 4);
        assert_ne!(keys[0], keys[1]);
        assert_ne!(band_keys("a", &sig, 4), band_keys("b", &sig, 4));
    }
}
