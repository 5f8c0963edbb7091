use canonical::NormalizedDoc;
use index::CorpusEntry;
use perceptual::{word_hashes, Sketch};
use tracing::debug;

use crate::span::longest_common_run;
use crate::types::{MatchConfig, MatchError, MatchedSource};

/// Score `target` against corpus candidates.
///
/// Candidates below the reporting threshold, and the target itself, are
/// dropped. Reported sources carry the longest common word run as their
/// matched span and come back sorted by descending similarity, ties broken by
/// ascending source id, capped at `max_sources`.
pub fn score(
    target_id: &str,
    target_doc: &NormalizedDoc,
    target_sketch: &Sketch,
    candidates: &[CorpusEntry],
    cfg: &MatchConfig,
) -> Result<Vec<MatchedSource>, MatchError> {
    cfg.validate()?;
    if target_sketch.is_empty() {
        return Ok(Vec::new());
    }

    let mut kept: Vec<(f64, &CorpusEntry)> = candidates
        .iter()
        .filter(|candidate| candidate.submission_id != target_id)
        .filter_map(|candidate| {
            let percent = raw_percent(target_sketch, &candidate.sketch);
            (percent >= cfg.report_threshold).then_some((percent, candidate))
        })
        .collect();
    kept.sort_by(|(a_pct, a), (b_pct, b)| {
        round2(*b_pct)
            .total_cmp(&round2(*a_pct))
            .then_with(|| a.submission_id.cmp(&b.submission_id))
    });
    kept.truncate(cfg.max_sources);

    // Spans are only located for sources that make the report.
    let target_hashes = word_hashes(&target_doc.word_texts(), target_sketch.meta.seed);
    let sources: Vec<MatchedSource> = kept
        .into_iter()
        .map(|(percent, candidate)| {
            let source_hashes = word_hashes(&candidate.doc.word_texts(), target_sketch.meta.seed);
            build_source(
                target_doc,
                &target_hashes,
                candidate,
                &source_hashes,
                round2(percent),
            )
        })
        .collect();

    debug!(
        submission_id = target_id,
        candidates = candidates.len(),
        reported = sources.len(),
        "scored against corpus candidates"
    );
    Ok(sources)
}

/// Sketch agreement as a percentage in `[0, 100]`, rounded to two decimals.
pub fn estimate_similarity(a: &Sketch, b: &Sketch) -> f64 {
    round2(raw_percent(a, b))
}

fn raw_percent(a: &Sketch, b: &Sketch) -> f64 {
    (a.similarity(b) * 100.0).clamp(0.0, 100.0)
}

/// Overall submission score: the highest reported similarity, 0 if none.
pub fn overall_score(sources: &[MatchedSource]) -> f64 {
    sources
        .iter()
        .map(|s| s.similarity)
        .fold(0.0, f64::max)
}

fn build_source(
    target_doc: &NormalizedDoc,
    target_hashes: &[u64],
    candidate: &CorpusEntry,
    source_hashes: &[u64],
    similarity: f64,
) -> MatchedSource {
    let mut source = MatchedSource {
        source_id: candidate.submission_id.clone(),
        similarity,
        matched_text: String::new(),
        source_text: String::new(),
        start_index: None,
        end_index: None,
        source_start_index: None,
        source_end_index: None,
        source: candidate.source.clone(),
    };

    let Some(run) = longest_common_run(target_hashes, source_hashes) else {
        return source;
    };
    let target_span = target_doc.word_span(run.target_start, run.target_last());
    let source_span = candidate
        .doc
        .word_span(run.source_start, run.source_last());

    if let (Some((start, end)), Some((src_start, src_end))) = (target_span, source_span) {
        source.matched_text = target_doc.segment(start, end).to_string();
        source.source_text = candidate.doc.segment(src_start, src_end).to_string();
        source.start_index = Some(start);
        source.end_index = Some(end);
        source.source_start_index = Some(src_start);
        source.source_end_index = Some(src_end);
    }
    source
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
