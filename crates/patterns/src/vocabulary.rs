//! Vocabulary that is unusual for the submission's scope.

use canonical::NormalizedDoc;
use hashbrown::HashMap;

use crate::{span_pattern, PatternConfig, PatternKind, SuspiciousPattern, VocabularyStats};

pub(crate) fn detect(
    doc: &NormalizedDoc,
    stats: &dyn VocabularyStats,
    cfg: &PatternConfig,
) -> Vec<SuspiciousPattern> {
    let documents = stats.document_count();
    if documents < cfg.min_corpus_documents || documents == 0 {
        return Vec::new();
    }

    let mut rarity: HashMap<&str, bool> = HashMap::new();
    let mut out = Vec::new();

    for (idx, sentence) in doc.sentences.iter().enumerate() {
        let words = doc.sentence_words(sentence);
        let rare: Vec<&str> = words
            .iter()
            .map(|w| w.text.as_str())
            .filter(|word| {
                *rarity
                    .entry(*word)
                    .or_insert_with(|| is_rare(word, stats, documents, cfg))
            })
            .collect();

        if rare.len() < cfg.min_rare_cluster || words.is_empty() {
            continue;
        }
        let density = rare.len() as f64 / words.len() as f64;
        if density < cfg.min_rare_density {
            continue;
        }

        let mut listed: Vec<&str> = Vec::with_capacity(rare.len());
        for word in &rare {
            if !listed.contains(word) {
                listed.push(word);
            }
        }
        let description = format!(
            "Sentence {} uses {} words rarely seen in this scope: {}",
            idx + 1,
            rare.len(),
            listed.join(", ")
        );
        if let Some(pattern) = span_pattern(
            doc,
            PatternKind::UnusualVocabulary,
            sentence.start,
            sentence.end - 1,
            density.clamp(0.0, 1.0),
            description,
        ) {
            out.push(pattern);
        }
    }
    out
}

fn is_rare(word: &str, stats: &dyn VocabularyStats, documents: usize, cfg: &PatternConfig) -> bool {
    if word.chars().count() < cfg.min_rare_word_len || word.chars().all(char::is_numeric) {
        return false;
    }
    let df = stats.document_frequency(word);
    (df as f64 / documents as f64) < cfg.rarity_threshold
}
