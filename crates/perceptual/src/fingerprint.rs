//! Sketch and metadata types.
//!
//! The sketch schema is stored alongside every corpus entry: any change that
//! can alter a signature must bump [`SKETCH_VERSION`](crate::SKETCH_VERSION).

use serde::{Deserialize, Serialize};

/// Fixed-length MinHash signature of a document's shingle set.
///
/// Two documents with shingle sets `A` and `B` agree on each slot with
/// probability `|A ∩ B| / |A ∪ B|`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sketch {
    /// MinHash slots. Empty for a document without words.
    pub signature: Vec<u64>,
    /// Number of unique shingles the signature was computed from.
    pub shingle_count: usize,
    pub meta: SketchMeta,
}

/// How a sketch was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SketchMeta {
    /// Sketch algorithm version.
    pub version: u16,
    /// Human-readable algorithm identifier.
    pub algorithm: String,
    /// Shingle length in words.
    pub k: usize,
    /// Number of MinHash slots requested.
    pub num_hashes: usize,
    /// Seed for word hashing and MinHash permutations.
    pub seed: u64,
    /// Configuration schema version that was supplied.
    pub config_version: u32,
}

impl SketchMeta {
    /// Whether sketches carrying these two metadata blocks can be compared.
    pub fn compatible_with(&self, other: &SketchMeta) -> bool {
        self.version == other.version
            && self.k == other.k
            && self.num_hashes == other.num_hashes
            && self.seed == other.seed
    }
}

impl Sketch {
    /// True for the sketch of a document with no words.
    pub fn is_empty(&self) -> bool {
        self.signature.is_empty()
    }

    /// Estimated Jaccard similarity in `[0, 1]`: the fraction of slots on
    /// which both signatures agree.
    ///
    /// Empty or incompatible sketches are never similar.
    pub fn similarity(&self, other: &Sketch) -> f64 {
        if self.is_empty()
            || self.signature.len() != other.signature.len()
            || !self.meta.compatible_with(&other.meta)
        {
            return 0.0;
        }
        let agree = self
            .signature
            .iter()
            .zip(&other.signature)
            .filter(|(a, b)| a == b)
            .count();
        agree as f64 / self.signature.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> SketchMeta {
        SketchMeta {
            version: 1,
            algorithm: "test".into(),
            k: 5,
            num_hashes: 4,
            seed: 1,
            config_version: 1,
        }
    }

    fn sketch(signature: Vec<u64>) -> Sketch {
        Sketch {
            shingle_count: signature.len(),
            signature,
            meta: meta(),
        }
    }

    #[test]
    fn similarity_counts_agreeing_slots() {
        let a = sketch(vec![1, 2, 3, 4]);
        let b = sketch(vec![1, 2, 9, 9]);
        assert_eq!(a.similarity(&b), 0.5);
        assert_eq!(a.similarity(&a), 1.0);
    }

    #[test]
    fn empty_and_mismatched_sketches_score_zero() {
        let a = sketch(vec![1, 2, 3, 4]);
        let empty = sketch(Vec::new());
        assert_eq!(empty.similarity(&empty), 0.0);
        assert_eq!(a.similarity(&empty), 0.0);

        let mut other_seed = a.clone();
        other_seed.meta.seed = 2;
        assert_eq!(a.similarity(&other_seed), 0.0);
    }

    #[test]
    fn algorithm_label_does_not_affect_compatibility() {
        let mut other = meta();
        other.algorithm = "renamed".into();
        assert!(meta().compatible_with(&other));
    }
}
