//! # Similarity Scorer (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` turns the candidate list produced by the corpus index into the
//! matched sources shown in a plagiarism report. For each candidate it
//! estimates Jaccard similarity from MinHash sketch agreement, drops those
//! below the reporting threshold and, for the rest, locates the longest
//! common contiguous word run so a reader can see *what* was copied and from
//! *where*.
//!
//! ## Core Types
//!
//! - [`MatchConfig`]: reporting threshold (percent) and result cap.
//! - [`MatchedSource`]: source id, similarity percentage, matched spans in
//!   target and source (raw byte offsets), source metadata.
//! - [`score`]: the scoring entry point; [`overall_score`] folds the sources
//!   into the submission's headline number.
//!
//! ## Example Usage
//!
//! ```
//! use perceptual::{fingerprint, SketchConfig};
//! use matcher::estimate_similarity;
//!
//! let a = canonical::normalize("An essay that was written independently by its author.");
//! let sketch = fingerprint(&a.word_texts(), &SketchConfig::default()).unwrap();
//! assert_eq!(estimate_similarity(&sketch, &sketch), 100.0);
//! ```

mod engine;
mod span;
mod types;

pub use engine::{estimate_similarity, overall_score, score};
pub use span::{longest_common_run, CommonRun};
pub use types::{MatchConfig, MatchError, MatchedSource};
