//! # Corpus Index
//!
//! Scoped locality-sensitive-hashing index over the MinHash sketches of
//! completed submissions. Given a new sketch it returns the submissions that
//! are plausibly similar, bounding the scoring work to a handful of candidates
//! instead of the whole corpus.
//!
//! ## Core Features
//!
//! - **Banding LSH**: each sketch is cut into bands of `band_width` values;
//!   every band hashes to a bucket key scoped by the corpus partition. Sharing
//!   any one bucket makes two submissions candidates.
//! - **Pluggable storage**: entry bytes go through the [`CorpusBackend`]
//!   trait. [`InMemoryBackend`] is provided; other stores plug in the same way.
//! - **Compact entries**: entries are bincode-encoded and optionally
//!   zstd-compressed ([`CompressionConfig`]).
//! - **Vocabulary statistics**: per-scope document frequencies, used to spot
//!   words that are rare for an assignment.
//! - **Idempotent writes**: indexing identical content twice is a no-op; a
//!   changed content hash replaces the entry and its postings.
//!
//! ## Example Usage
//!
//! ```
//! use chrono::Utc;
//! use index::{CorpusEntry, CorpusIndex, IndexConfig, IndexOutcome, Scope, SourceMetadata};
//! use perceptual::{fingerprint, SketchConfig};
//!
//! let index = CorpusIndex::new(IndexConfig::default()).unwrap();
//! let scope_key = index.scope_key(&Scope::new("cs101", "essay-1"));
//!
//! let doc = canonical::normalize("Rivers carve canyons slowly over millions of years.");
//! let sketch = fingerprint(&doc.word_texts(), &SketchConfig::default()).unwrap();
//! let source = SourceMetadata {
//!     student_id: "student-1".into(),
//!     course_id: "cs101".into(),
//!     assignment_id: "essay-1".into(),
//!     submitted_at: Utc::now(),
//! };
//! let entry = CorpusEntry::new("sub-1", scope_key.clone(), doc, sketch.clone(), source);
//!
//! assert_eq!(index.index(&entry).unwrap(), IndexOutcome::Inserted);
//! assert_eq!(index.index(&entry).unwrap(), IndexOutcome::Unchanged);
//! assert_eq!(index.candidates(&scope_key, &sketch), vec!["sub-1".to_string()]);
//! ```

mod backend;
mod config;
mod corpus;
mod entry;
mod lsh;

pub use backend::{CorpusBackend, InMemoryBackend};
pub use config::{CompressionCodec, CompressionConfig, IndexConfig};
pub use corpus::{CorpusIndex, IndexOutcome};
pub use entry::{CorpusEntry, CorpusScope, Scope, SourceMetadata, CORPUS_SCHEMA_VERSION};
pub use lsh::band_keys;

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

/// Errors raised by the corpus index. All of them mean the corpus could not
/// be read or written.
#[derive(Error, Debug, Clone)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Zstd(String),
    #[error("Invalid index config: {0}")]
    InvalidConfig(String),
    #[error("Candidate loading interrupted")]
    Interrupted,
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Zstd(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}
