//! # Shingling and MinHash sketches
//!
//! Turns a document's normalized words into a compact, similarity-preserving
//! [`Sketch`]. Sketches feed the corpus index (LSH banding) and give a quick
//! Jaccard estimate between two documents.
//!
//! ## Contract
//!
//! - Consumes normalized words only; never normalizes or tokenizes.
//! - Pure function of `(words, config)`: no I/O, no clock, no global state.
//!
//! Invariant: for the same word sequence and the same [`SketchConfig`], the
//! sketch is bit identical across runs and machines.
//!
//! ## Pipeline
//!
//! 1. **Shingling**: overlapping `k`-word windows, each hashed with a seeded
//!    rolling hash. Documents shorter than `k` become a single shingle.
//! 2. **MinHash**: the set of unique shingle hashes is reduced to
//!    `num_hashes` slots, optionally on the rayon pool.
//!
//! ```
//! use perceptual::{fingerprint, SketchConfig};
//!
//! let words = ["the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog"];
//! let sketch = fingerprint(&words, &SketchConfig::default()).unwrap();
//!
//! assert_eq!(sketch.signature.len(), 64);
//! assert_eq!(sketch.similarity(&sketch), 1.0);
//! ```

pub mod config;
pub mod fingerprint;
mod minhash;
mod shingles;

pub use crate::config::{PerceptualError, SketchConfig};
pub use crate::fingerprint::{Sketch, SketchMeta};
pub use crate::minhash::minhash_signature;
pub use crate::shingles::{make_shingles_rolling, word_hashes};

/// Current sketch algorithm version.
pub const SKETCH_VERSION: u16 = 1;

/// Human-readable algorithm identifier.
pub const SKETCH_ALGORITHM: &str = "rolling_kword_minhash_v1";

/// Compute the sketch of a document (shingles → MinHash).
///
/// `words` must be normalized words in reading order. An empty slice yields
/// an empty sketch, which never matches anything.
pub fn fingerprint<S>(words: &[S], cfg: &SketchConfig) -> Result<Sketch, PerceptualError>
where
    S: AsRef<str>,
{
    cfg.validate()?;

    let mut unique = make_shingles_rolling(words, cfg.k, cfg.seed);
    unique.sort_unstable();
    unique.dedup();

    let signature = minhash_signature(&unique, cfg.num_hashes, cfg.seed, cfg.use_parallel);

    Ok(Sketch {
        signature,
        shingle_count: unique.len(),
        meta: SketchMeta {
            version: SKETCH_VERSION,
            algorithm: SKETCH_ALGORITHM.to_string(),
            k: cfg.k,
            num_hashes: cfg.num_hashes,
            seed: cfg.seed,
            config_version: cfg.version,
        },
    })
}
