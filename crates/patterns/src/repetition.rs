//! Repeated sentence structure.

use canonical::{NormalizedDoc, Token};

use crate::{span_pattern, PatternConfig, PatternKind, SuspiciousPattern};

pub(crate) fn detect(doc: &NormalizedDoc, cfg: &PatternConfig) -> Vec<SuspiciousPattern> {
    let sentences: Vec<(usize, &[Token])> = doc
        .sentence_slices()
        .take(cfg.max_sentences_compared)
        .enumerate()
        .filter(|(_, words)| words.len() >= cfg.min_sentence_words)
        .collect();

    let mut out = Vec::new();
    for (pos, &(later_idx, later)) in sentences.iter().enumerate() {
        let best = sentences[..pos]
            .iter()
            .map(|&(earlier_idx, earlier)| (earlier_idx, sentence_similarity(earlier, later)))
            .fold(None, |best: Option<(usize, f64)>, (idx, sim)| match best {
                Some((_, best_sim)) if best_sim >= sim => best,
                _ => Some((idx, sim)),
            });

        let Some((earlier_idx, sim)) = best else {
            continue;
        };
        if sim < cfg.repetition_threshold {
            continue;
        }

        let confidence = repetition_confidence(sim, cfg.repetition_threshold);
        let description = format!(
            "Sentence {} repeats the structure of sentence {} ({:.0}% word-order overlap)",
            later_idx + 1,
            earlier_idx + 1,
            sim * 100.0
        );
        let sentence = doc.sentences[later_idx];
        if let Some(pattern) = span_pattern(
            doc,
            PatternKind::RepetitiveStructure,
            sentence.start,
            sentence.end - 1,
            confidence,
            description,
        ) {
            out.push(pattern);
        }
    }
    out
}

/// Longest common word subsequence over the longer sentence's length.
pub(crate) fn sentence_similarity(a: &[Token], b: &[Token]) -> f64 {
    let longer = a.len().max(b.len());
    if longer == 0 {
        return 0.0;
    }
    lcs_len(a, b) as f64 / longer as f64
}

fn lcs_len(a: &[Token], b: &[Token]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x.text == y.text {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// 0.5 at the threshold, rising linearly to 1.0 for identical sentences.
fn repetition_confidence(sim: f64, threshold: f64) -> f64 {
    if threshold >= 1.0 {
        return 1.0;
    }
    (0.5 + 0.5 * (sim - threshold) / (1.0 - threshold)).clamp(0.0, 1.0)
}
