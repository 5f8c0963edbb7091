//! Stock phrases and clichés.

use canonical::NormalizedDoc;
use once_cell::sync::Lazy;

use crate::{span_pattern, PatternConfig, PatternKind, SuspiciousPattern};

/// Built-in phrase list, as written.
pub const DEFAULT_COMMON_PHRASES: &[&str] = &[
    "in today's society",
    "since the dawn of time",
    "since the beginning of time",
    "it goes without saying",
    "at the end of the day",
    "in this day and age",
    "throughout history",
    "all walks of life",
    "needless to say",
    "first and foremost",
    "last but not least",
    "it is important to note that",
    "the fact of the matter is",
    "each and every",
];

struct Phrase {
    label: String,
    words: Vec<String>,
}

impl Phrase {
    fn new(label: &str) -> Self {
        let doc = canonical::normalize(label);
        Self {
            label: label.to_string(),
            words: doc.words.into_iter().map(|w| w.text).collect(),
        }
    }
}

static DEFAULT_PHRASES: Lazy<Vec<Phrase>> =
    Lazy::new(|| DEFAULT_COMMON_PHRASES.iter().map(|p| Phrase::new(p)).collect());

pub(crate) fn detect(doc: &NormalizedDoc, cfg: &PatternConfig) -> Vec<SuspiciousPattern> {
    match &cfg.common_phrases {
        Some(custom) => {
            let phrases: Vec<Phrase> = custom.iter().map(|p| Phrase::new(p)).collect();
            find_all(doc, &phrases, cfg)
        }
        None => find_all(doc, &DEFAULT_PHRASES, cfg),
    }
}

fn find_all(doc: &NormalizedDoc, phrases: &[Phrase], cfg: &PatternConfig) -> Vec<SuspiciousPattern> {
    let words = doc.word_texts();
    let mut out = Vec::new();

    for phrase in phrases.iter().filter(|p| !p.words.is_empty()) {
        let len = phrase.words.len();
        let mut i = 0;
        while i + len <= words.len() {
            let hit = words[i..i + len]
                .iter()
                .zip(&phrase.words)
                .all(|(w, p)| *w == p.as_str());
            if !hit {
                i += 1;
                continue;
            }
            if let Some(pattern) = span_pattern(
                doc,
                PatternKind::CommonPhrases,
                i,
                i + len - 1,
                cfg.common_phrase_confidence,
                format!("Stock phrase \"{}\"", phrase.label),
            ) {
                out.push(pattern);
            }
            i += len;
        }
    }
    out.sort_by_key(|p| p.start_index);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_phrases_found_with_raw_offsets() {
        let text = "Since the dawn of time, people have argued. In today\u{2019}s society, \
                    it goes without saying that phones matter.";
        let doc = canonical::normalize(text);
        let found = detect(&doc, &PatternConfig::default());
        let segments: Vec<&str> = found.iter().map(|p| p.text_segment.as_str()).collect();
        assert_eq!(
            segments,
            vec![
                "Since the dawn of time",
                "In today\u{2019}s society",
                "it goes without saying"
            ]
        );
        for pattern in &found {
            assert_eq!(pattern.kind, PatternKind::CommonPhrases);
            assert_eq!(pattern.confidence, 0.9);
            assert_eq!(&text[pattern.start_index..pattern.end_index], pattern.text_segment);
        }
    }

    #[test]
    fn phrase_at_start_of_text() {
        let doc = canonical::normalize("Each and every student passed.");
        assert_eq!(detect(&doc, &PatternConfig::default()).len(), 1);
    }

    #[test]
    fn custom_list_replaces_defaults() {
        let cfg = PatternConfig::default().with_common_phrases(["delve into", "   "]);
        let doc = canonical::normalize("Let us delve into it. Needless to say, we delve into more.");
        let found = detect(&doc, &cfg);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.description.contains("delve into")));
    }

    #[test]
    fn clean_text_has_no_phrases() {
        let doc = canonical::normalize("Mitochondria produce adenosine triphosphate.");
        assert!(detect(&doc, &PatternConfig::default()).is_empty());
    }
}
