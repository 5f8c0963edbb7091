//! Abrupt shifts in sentence length against the preceding sentences.

use canonical::NormalizedDoc;

use crate::{span_pattern, PatternConfig, PatternKind, SuspiciousPattern};

pub(crate) fn detect(doc: &NormalizedDoc, cfg: &PatternConfig) -> Vec<SuspiciousPattern> {
    let window = cfg.style_window.max(1);
    let lengths: Vec<f64> = doc.sentences.iter().map(|s| s.len() as f64).collect();
    if lengths.len() <= window {
        return Vec::new();
    }

    let mut out = Vec::new();
    for idx in window..lengths.len() {
        let baseline = &lengths[idx - window..idx];
        let mean = baseline.iter().sum::<f64>() / window as f64;
        let variance = baseline.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / window as f64;
        let z = (lengths[idx] - mean).abs() / variance.sqrt().max(1.0);
        if z < cfg.style_z_threshold {
            continue;
        }

        let confidence = z / (z + cfg.style_z_threshold);
        let description = format!(
            "Sentence {} has {} words against a recent average of {:.1} (z = {:.1})",
            idx + 1,
            lengths[idx],
            mean,
            z
        );
        let sentence = doc.sentences[idx];
        if let Some(pattern) = span_pattern(
            doc,
            PatternKind::InconsistentStyle,
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

#[cfg(test)]
mod tests {
    use super::*;

    const STEADY: &str = "Cats sleep a lot. Dogs bark at night. Birds sing at dawn. \
        Fish swim in schools. Cows graze in fields. ";

    #[test]
    fn long_outlier_sentence_is_flagged() {
        let text = format!(
            "{STEADY}However the intricate interplay between ecological pressures and \
             evolutionary adaptations produces a remarkable diversity of behavioural \
             strategies across the animal kingdom."
        );
        let doc = canonical::normalize(&text);
        let found = detect(&doc, &PatternConfig::default());
        assert_eq!(found.len(), 1);
        let pattern = &found[0];
        assert_eq!(pattern.kind, PatternKind::InconsistentStyle);
        assert!(pattern.confidence >= 0.5 && pattern.confidence < 1.0);
        assert!(pattern.text_segment.starts_with("However"));
        assert!(pattern.description.starts_with("Sentence 6"));
    }

    #[test]
    fn uniform_text_is_clean() {
        let text = STEADY.repeat(3);
        let doc = canonical::normalize(&text);
        assert!(detect(&doc, &PatternConfig::default()).is_empty());
    }

    #[test]
    fn too_few_sentences() {
        let doc = canonical::normalize(STEADY);
        assert!(detect(&doc, &PatternConfig::default()).is_empty());
    }
}
