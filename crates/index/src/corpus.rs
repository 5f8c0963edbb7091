use std::sync::Arc;

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use perceptual::Sketch;
use tracing::{debug, info, warn};

use crate::backend::{CorpusBackend, InMemoryBackend};
use crate::config::IndexConfig;
use crate::entry::{CorpusEntry, Scope, CORPUS_SCHEMA_VERSION};
use crate::lsh::band_keys;
use crate::IndexError;

/// What [`CorpusIndex::index`] did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// First entry for this submission.
    Inserted,
    /// Same content hash as the stored entry; nothing changed.
    Unchanged,
    /// Content changed; old postings were dropped and new ones written.
    Replaced,
}

/// In-memory view of one stored entry, enough to undo its postings.
#[derive(Debug, Clone)]
struct EntrySummary {
    scope_key: String,
    content_hash: String,
    bucket_keys: Vec<u64>,
    vocabulary: Vec<String>,
}

impl EntrySummary {
    fn of(entry: &CorpusEntry, band_width: usize) -> Self {
        Self {
            scope_key: entry.scope_key.clone(),
            content_hash: entry.content_hash().to_string(),
            bucket_keys: band_keys(&entry.scope_key, &entry.sketch.signature, band_width),
            vocabulary: entry.vocabulary(),
        }
    }
}

#[derive(Debug, Default)]
struct ScopeStats {
    documents: usize,
    frequency: hashbrown::HashMap<String, usize>,
}

/// LSH index over the sketches of completed submissions.
///
/// Entry bytes live in a [`CorpusBackend`]; bucket postings, per-entry
/// summaries and vocabulary statistics live in sharded maps, so writers for
/// different submissions never contend on a global lock and readers only
/// ever wait on a single shard.
pub struct CorpusIndex {
    backend: Arc<dyn CorpusBackend>,
    cfg: IndexConfig,
    entries: DashMap<String, EntrySummary>,
    buckets: DashMap<u64, hashbrown::HashSet<String>>,
    stats: DashMap<String, ScopeStats>,
}

impl CorpusIndex {
    /// Empty index on an in-memory backend.
    pub fn new(cfg: IndexConfig) -> Result<Self, IndexError> {
        Self::with_backend(cfg, Arc::new(InMemoryBackend::new()))
    }

    /// Open an index on `backend`, rebuilding postings from whatever entries
    /// it already holds.
    pub fn with_backend(
        cfg: IndexConfig,
        backend: Arc<dyn CorpusBackend>,
    ) -> Result<Self, IndexError> {
        cfg.validate()?;
        let index = Self {
            backend,
            cfg,
            entries: DashMap::new(),
            buckets: DashMap::new(),
            stats: DashMap::new(),
        };
        let restored = index.rebuild()?;
        if restored > 0 {
            info!(entries = restored, "corpus index restored from backend");
        }
        Ok(index)
    }

    pub fn config(&self) -> &IndexConfig {
        &self.cfg
    }

    /// Partition key for a submission scope under the configured granularity.
    pub fn scope_key(&self, scope: &Scope) -> String {
        self.cfg.scope.key(scope)
    }

    /// Add or replace an entry.
    ///
    /// The entry bytes reach the backend before any posting references the
    /// submission id. Re-indexing identical content is a no-op.
    pub fn index(&self, entry: &CorpusEntry) -> Result<IndexOutcome, IndexError> {
        let summary = EntrySummary::of(entry, self.cfg.band_width);
        let id = entry.submission_id.as_str();

        match self.entries.entry(entry.submission_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                if current.content_hash == summary.content_hash
                    && current.scope_key == summary.scope_key
                {
                    debug!(submission_id = id, "corpus entry unchanged");
                    return Ok(IndexOutcome::Unchanged);
                }
                self.backend.put(id, &self.encode_entry(entry)?)?;
                let previous = occupied.insert(summary.clone());
                self.remove_postings(id, &previous);
                self.add_postings(id, &summary);
                debug!(submission_id = id, scope = %summary.scope_key, "corpus entry replaced");
                Ok(IndexOutcome::Replaced)
            }
            Entry::Vacant(vacant) => {
                self.backend.put(id, &self.encode_entry(entry)?)?;
                self.add_postings(id, &summary);
                debug!(submission_id = id, scope = %summary.scope_key, "corpus entry inserted");
                vacant.insert(summary);
                Ok(IndexOutcome::Inserted)
            }
        }
    }

    /// Drop an entry and its postings. Returns whether it existed.
    pub fn remove(&self, submission_id: &str) -> Result<bool, IndexError> {
        match self.entries.entry(submission_id.to_string()) {
            Entry::Occupied(occupied) => {
                self.backend.delete(submission_id)?;
                let (_, summary) = occupied.remove_entry();
                self.remove_postings(submission_id, &summary);
                Ok(true)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    /// Submission ids sharing at least one band with `sketch` in `scope_key`,
    /// sorted and deduplicated.
    pub fn candidates(&self, scope_key: &str, sketch: &Sketch) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for key in band_keys(scope_key, &sketch.signature, self.cfg.band_width) {
            if let Some(bucket) = self.buckets.get(&key) {
                ids.extend(bucket.iter().cloned());
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Candidate entries for `sketch`, excluding `exclude_id`.
    ///
    /// Ids whose entry cannot be loaded are skipped; backend failures are not.
    pub fn candidate_entries(
        &self,
        scope_key: &str,
        sketch: &Sketch,
        exclude_id: &str,
    ) -> Result<Vec<CorpusEntry>, IndexError> {
        self.candidate_entries_until(scope_key, sketch, exclude_id, || false)
    }

    /// Like [`candidate_entries`](Self::candidate_entries), but `stop` is
    /// polled before every backend read and a `true` ends the load with
    /// [`IndexError::Interrupted`].
    pub fn candidate_entries_until(
        &self,
        scope_key: &str,
        sketch: &Sketch,
        exclude_id: &str,
        mut stop: impl FnMut() -> bool,
    ) -> Result<Vec<CorpusEntry>, IndexError> {
        let mut out = Vec::new();
        for id in self.candidates(scope_key, sketch) {
            if id == exclude_id {
                continue;
            }
            if stop() {
                debug!(loaded = out.len(), "candidate load interrupted");
                return Err(IndexError::Interrupted);
            }
            match self.get(&id)? {
                Some(entry) => out.push(entry),
                None => debug!(submission_id = %id, "candidate without stored entry skipped"),
            }
        }
        Ok(out)
    }

    /// Load a stored entry.
    pub fn get(&self, submission_id: &str) -> Result<Option<CorpusEntry>, IndexError> {
        match self.backend.get(submission_id)? {
            Some(data) => Ok(Some(self.decode_entry(&data)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, submission_id: &str) -> bool {
        self.entries.contains_key(submission_id)
    }

    /// Content hash of the stored entry, if any.
    pub fn content_hash(&self, submission_id: &str) -> Option<String> {
        self.entries
            .get(submission_id)
            .map(|summary| summary.content_hash.clone())
    }

    /// Number of entries in `scope_key` containing `word`.
    pub fn document_frequency(&self, scope_key: &str, word: &str) -> usize {
        self.stats
            .get(scope_key)
            .and_then(|stats| stats.frequency.get(word).copied())
            .unwrap_or(0)
    }

    /// Number of entries in `scope_key`.
    pub fn document_count(&self, scope_key: &str) -> usize {
        self.stats
            .get(scope_key)
            .map(|stats| stats.documents)
            .unwrap_or(0)
    }

    /// Total entries across all scopes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flush(&self) -> Result<(), IndexError> {
        self.backend.flush()
    }

    fn rebuild(&self) -> Result<usize, IndexError> {
        let mut stored = Vec::new();
        self.backend.scan(&mut |data: &[u8]| {
            stored.push(self.decode_entry(data)?);
            Ok(())
        })?;
        for entry in &stored {
            let summary = EntrySummary::of(entry, self.cfg.band_width);
            self.add_postings(&entry.submission_id, &summary);
            self.entries.insert(entry.submission_id.clone(), summary);
        }
        Ok(stored.len())
    }

    fn add_postings(&self, id: &str, summary: &EntrySummary) {
        for key in &summary.bucket_keys {
            self.buckets.entry(*key).or_default().insert(id.to_string());
        }
        let mut stats = self.stats.entry(summary.scope_key.clone()).or_default();
        stats.documents += 1;
        for word in &summary.vocabulary {
            *stats.frequency.entry(word.clone()).or_insert(0) += 1;
        }
    }

    fn remove_postings(&self, id: &str, summary: &EntrySummary) {
        for key in &summary.bucket_keys {
            if let Some(mut bucket) = self.buckets.get_mut(key) {
                bucket.remove(id);
            }
            self.buckets.remove_if(key, |_, bucket| bucket.is_empty());
        }
        if let Some(mut stats) = self.stats.get_mut(&summary.scope_key) {
            stats.documents = stats.documents.saturating_sub(1);
            for word in &summary.vocabulary {
                if let Some(count) = stats.frequency.get_mut(word) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        stats.frequency.remove(word);
                    }
                }
            }
        }
    }

    fn decode_entry(&self, data: &[u8]) -> Result<CorpusEntry, IndexError> {
        let decompressed = self.cfg.compression.decompress(data)?;
        let (entry, _): (CorpusEntry, usize) = decode_from_slice(&decompressed, standard())?;
        if entry.schema_version > CORPUS_SCHEMA_VERSION {
            warn!(
                submission_id = %entry.submission_id,
                schema_version = entry.schema_version,
                "stored entry is newer than this build"
            );
            return Err(IndexError::Decode(format!(
                "unsupported corpus schema version {}",
                entry.schema_version
            )));
        }
        Ok(entry)
    }

    fn encode_entry(&self, entry: &CorpusEntry) -> Result<Vec<u8>, IndexError> {
        let encoded = encode_to_vec(entry, standard())?;
        self.cfg.compression.compress(&encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompressionCodec, CompressionConfig};
    use crate::entry::SourceMetadata;
    use chrono::{DateTime, Utc};
    use perceptual::{fingerprint, SketchConfig};

    const SCOPE: &str = "assignment:cs101/essay";

    fn entry(id: &str, scope_key: &str, text: &str) -> CorpusEntry {
        let doc = canonical::normalize(text);
        let sketch = fingerprint(&doc.word_texts(), &SketchConfig::default()).expect("sketch");
        CorpusEntry::new(
            id,
            scope_key,
            doc,
            sketch,
            SourceMetadata {
                student_id: format!("student-{id}"),
                course_id: "cs101".into(),
                assignment_id: "essay".into(),
                submitted_at: DateTime::<Utc>::UNIX_EPOCH,
            },
        )
    }

    const ESSAY: &str = "Photosynthesis converts light energy into chemical energy stored \
        in glucose. Plants absorb carbon dioxide through their leaves and release oxygen \
        as a byproduct of the light dependent reactions.";
    const OTHER: &str = "The French revolution began in 1789 and reshaped the political \
        landscape of Europe for decades, toppling the monarchy and inspiring reform movements.";

    #[test]
    fn identical_text_becomes_candidate() {
        let index = CorpusIndex::new(IndexConfig::default()).expect("index");
        assert_eq!(index.index(&entry("a", SCOPE, ESSAY)).unwrap(), IndexOutcome::Inserted);
        assert_eq!(index.index(&entry("b", SCOPE, OTHER)).unwrap(), IndexOutcome::Inserted);

        let query = entry("c", SCOPE, ESSAY);
        assert_eq!(index.candidates(SCOPE, &query.sketch), vec!["a".to_string()]);

        let loaded = index
            .candidate_entries(SCOPE, &query.sketch, "c")
            .expect("entries");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].doc.text, ESSAY);
    }

    #[test]
    fn stop_ends_candidate_load_between_reads() {
        use std::cell::Cell;

        let index = CorpusIndex::new(IndexConfig::default()).expect("index");
        for id in ["a", "b", "c"] {
            index.index(&entry(id, SCOPE, ESSAY)).unwrap();
        }
        let query = entry("d", SCOPE, ESSAY);

        let polls = Cell::new(0);
        let result = index.candidate_entries_until(SCOPE, &query.sketch, "d", || {
            polls.set(polls.get() + 1);
            polls.get() > 1
        });
        assert!(matches!(result, Err(IndexError::Interrupted)));
        assert_eq!(polls.get(), 2);

        let all = index
            .candidate_entries_until(SCOPE, &query.sketch, "d", || false)
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn candidate_entries_excludes_self() {
        let index = CorpusIndex::new(IndexConfig::default()).expect("index");
        let a = entry("a", SCOPE, ESSAY);
        index.index(&a).unwrap();
        assert!(index.candidate_entries(SCOPE, &a.sketch, "a").unwrap().is_empty());
    }

    #[test]
    fn scopes_are_isolated() {
        let index = CorpusIndex::new(IndexConfig::default()).expect("index");
        index.index(&entry("a", "assignment:cs101/other", ESSAY)).unwrap();
        let query = entry("b", SCOPE, ESSAY);
        assert!(index.candidates(SCOPE, &query.sketch).is_empty());
    }

    #[test]
    fn reindex_is_idempotent_and_replace_moves_postings() {
        let index = CorpusIndex::new(IndexConfig::default()).expect("index");
        let original = entry("a", SCOPE, ESSAY);
        index.index(&original).unwrap();
        assert_eq!(index.index(&original).unwrap(), IndexOutcome::Unchanged);
        assert_eq!(index.document_count(SCOPE), 1);

        let rewritten = entry("a", SCOPE, OTHER);
        assert_eq!(index.index(&rewritten).unwrap(), IndexOutcome::Replaced);
        assert_eq!(index.len(), 1);
        assert_eq!(index.document_count(SCOPE), 1);
        assert!(index.candidates(SCOPE, &original.sketch).is_empty());
        assert_eq!(index.candidates(SCOPE, &rewritten.sketch), vec!["a".to_string()]);
        assert_eq!(index.document_frequency(SCOPE, "photosynthesis"), 0);
        assert_eq!(index.document_frequency(SCOPE, "revolution"), 1);
    }

    #[test]
    fn vocabulary_statistics() {
        let index = CorpusIndex::new(IndexConfig::default()).expect("index");
        index.index(&entry("a", SCOPE, "alpha beta gamma")).unwrap();
        index.index(&entry("b", SCOPE, "alpha alpha delta")).unwrap();
        index.index(&entry("c", "global", "alpha")).unwrap();

        assert_eq!(index.document_count(SCOPE), 2);
        assert_eq!(index.document_frequency(SCOPE, "alpha"), 2);
        assert_eq!(index.document_frequency(SCOPE, "delta"), 1);
        assert_eq!(index.document_frequency(SCOPE, "missing"), 0);
        assert_eq!(index.document_count("global"), 1);
        assert_eq!(index.document_count("nowhere"), 0);
    }

    #[test]
    fn remove_drops_entry_and_postings() {
        let index = CorpusIndex::new(IndexConfig::default()).expect("index");
        let a = entry("a", SCOPE, ESSAY);
        index.index(&a).unwrap();
        assert!(index.remove("a").unwrap());
        assert!(!index.remove("a").unwrap());
        assert!(index.get("a").unwrap().is_none());
        assert!(index.candidates(SCOPE, &a.sketch).is_empty());
        assert_eq!(index.document_count(SCOPE), 0);
    }

    #[test]
    fn reopening_restores_postings() {
        let backend: Arc<dyn CorpusBackend> = Arc::new(InMemoryBackend::new());
        let a = entry("a", SCOPE, ESSAY);
        {
            let index = CorpusIndex::with_backend(IndexConfig::default(), backend.clone())
                .expect("index");
            index.index(&a).unwrap();
        }
        let reopened =
            CorpusIndex::with_backend(IndexConfig::default(), backend).expect("reopen");
        assert!(reopened.contains("a"));
        assert_eq!(reopened.content_hash("a"), Some(a.doc.content_hash.clone()));
        assert_eq!(reopened.candidates(SCOPE, &a.sketch), vec!["a".to_string()]);
        assert_eq!(reopened.document_count(SCOPE), 1);
    }

    #[test]
    fn entries_roundtrip_with_either_codec() {
        for codec in [CompressionCodec::None, CompressionCodec::Zstd] {
            let cfg = IndexConfig::default()
                .with_compression(CompressionConfig::default().with_codec(codec));
            let index = CorpusIndex::new(cfg).expect("index");
            let a = entry("a", SCOPE, ESSAY);
            index.index(&a).unwrap();
            assert_eq!(index.get("a").unwrap(), Some(a));
        }
    }

    struct UnavailableBackend;

    impl CorpusBackend for UnavailableBackend {
        fn put(&self, _: &str, _: &[u8]) -> Result<(), IndexError> {
            Err(IndexError::backend("down"))
        }
        fn get(&self, _: &str) -> Result<Option<Vec<u8>>, IndexError> {
            Err(IndexError::backend("down"))
        }
        fn delete(&self, _: &str) -> Result<(), IndexError> {
            Err(IndexError::backend("down"))
        }
        fn scan(
            &self,
            _: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
        ) -> Result<(), IndexError> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_leaves_no_postings() {
        let index = CorpusIndex::with_backend(IndexConfig::default(), Arc::new(UnavailableBackend))
            .expect("index");
        let a = entry("a", SCOPE, ESSAY);
        assert!(matches!(index.index(&a), Err(IndexError::Backend(_))));
        assert!(!index.contains("a"));
        assert!(index.candidates(SCOPE, &a.sketch).is_empty());
        assert_eq!(index.document_count(SCOPE), 0);
    }
}
