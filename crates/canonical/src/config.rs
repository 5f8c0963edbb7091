//! Configuration for the normalizer.
//!
//! [`NormalizeConfig`] controls the few knobs the normalizer exposes. Word and
//! sentence boundaries themselves are fixed behavior of a given `version`.
//!
//! # Versioning
//!
//! The `version` field is folded into every document content hash. Any change
//! to normalization behavior (even a bug fix) must bump it so that corpus
//! entries built by an older normalizer are recognized as stale instead of
//! silently compared against new ones.
//!
//! # Examples
//!
//! ```rust
//! use canonical::NormalizeConfig;
//!
//! let config = NormalizeConfig::default();
//! assert_eq!(config.version, 1);
//! assert!(config.normalize_unicode);
//! assert!(config.lowercase);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CanonicalError;

/// Configuration for the normalizer.
///
/// Cheap to clone and serde-friendly so it can be embedded in the engine's
/// YAML configuration:
///
/// ```json
/// {
///   "version": 1,
///   "normalize_unicode": true,
///   "lowercase": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Version of the normalization behavior. Must be >= 1.
    pub version: u32,

    /// Apply Unicode NFKC normalization to every grapheme cluster before
    /// classifying it.
    ///
    /// Composed and decomposed spellings ("Caf\u{00E9}" vs "Cafe\u{0301}") and
    /// compatibility forms (full-width letters, ligatures) then produce the
    /// same words, which matters when students paste text from different
    /// editors.
    pub normalize_unicode: bool,

    /// Apply locale-free Unicode lowercasing to word characters.
    pub lowercase: bool,
}

impl NormalizeConfig {
    /// Create a new configuration with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable NFKC normalization.
    pub fn with_unicode_normalization(mut self, enabled: bool) -> Self {
        self.normalize_unicode = enabled;
        self
    }

    /// Enable or disable lowercasing.
    pub fn with_lowercase(mut self, enabled: bool) -> Self {
        self.lowercase = enabled;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), CanonicalError> {
        if self.version == 0 {
            return Err(CanonicalError::InvalidConfig(
                "config version must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            normalize_unicode: true,
            lowercase: true,
        }
    }
}
