//! Configuration and error types for sketch computation.
//!
//! Free of any I/O or environment-dependent behavior so that a sketch is a
//! pure function of `(normalized_words, config)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters of the shingling + MinHash pipeline.
///
/// Two sketches are only comparable when they were built with the same `k`,
/// `num_hashes` and `seed`; [`Sketch::similarity`](crate::Sketch::similarity)
/// returns 0 otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SketchConfig {
    /// Configuration schema version.
    ///
    /// Any algorithmic change that can affect a sketch must bump this so that
    /// stored corpus sketches can be recognized as stale.
    pub version: u32,
    /// Number of words per shingle.
    ///
    /// Larger values demand longer verbatim runs before two documents share
    /// a shingle; smaller values are more tolerant of light paraphrasing.
    pub k: usize,
    /// Number of MinHash slots (independent hash functions).
    pub num_hashes: usize,
    /// Seed for token hashing and the MinHash permutation family.
    ///
    /// Same seed + same words + same parameters ⇒ bit-identical sketch.
    pub seed: u64,
    /// Compute MinHash slots on the rayon pool.
    pub use_parallel: bool,
}

impl SketchConfig {
    /// Create a new configuration with the defaults (`k = 5`, 64 hashes).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shingle size in words.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the sketch size.
    pub fn with_num_hashes(mut self, num_hashes: usize) -> Self {
        self.num_hashes = num_hashes;
        self
    }

    /// Set the hashing seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable parallel MinHash computation.
    /// Worth it only for long documents; the engine already runs checks in
    /// parallel across workers.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if self.version < 1 {
            return Err(PerceptualError::InvalidConfigVersion {
                version: self.version,
            });
        }
        if self.k < 1 {
            return Err(PerceptualError::InvalidConfigK { k: self.k });
        }
        if self.num_hashes < 1 {
            return Err(PerceptualError::InvalidConfigNumHashes {
                num_hashes: self.num_hashes,
            });
        }
        Ok(())
    }
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            version: 1,
            k: 5,
            num_hashes: 64,
            seed: 0xF00D_BAAD_F00D_BAAD,
            use_parallel: false,
        }
    }
}

/// Errors returned by the sketch pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PerceptualError {
    #[error("invalid config: k must be >= 1 (got {k})")]
    InvalidConfigK { k: usize },

    #[error("invalid config: num_hashes must be >= 1 (got {num_hashes})")]
    InvalidConfigNumHashes { num_hashes: usize },

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },
}
