use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use index::{CorpusEntry, SourceMetadata};
use matcher::{score, MatchConfig};
use perceptual::{fingerprint, SketchConfig};

fn essay(seed: usize, words: usize) -> String {
    (0..words)
        .map(|i| format!("word{}", (i * 31 + seed) % 509))
        .collect::<Vec<_>>()
        .join(" ")
}

fn entry(id: &str, text: &str) -> CorpusEntry {
    let doc = canonical::normalize(text);
    let sketch = fingerprint(&doc.word_texts(), &SketchConfig::default()).expect("sketch");
    CorpusEntry::new(
        id,
        "bench",
        doc,
        sketch,
        SourceMetadata {
            student_id: id.to_string(),
            course_id: "bench".into(),
            assignment_id: "bench".into(),
            submitted_at: Utc::now(),
        },
    )
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    for words in [200usize, 1_000, 3_000] {
        let text = essay(0, words);
        let target = canonical::normalize(&text);
        let sketch = fingerprint(&target.word_texts(), &SketchConfig::default()).expect("sketch");
        let candidates: Vec<CorpusEntry> = (0..10)
            .map(|i| {
                let source = if i % 2 == 0 { text.clone() } else { essay(i, words) };
                entry(&format!("src-{i}"), &source)
            })
            .collect();
        let cfg = MatchConfig::default();

        group.bench_function(format!("ten_candidates_{words}_words"), |b| {
            b.iter(|| {
                score(
                    "target",
                    black_box(&target),
                    black_box(&sketch),
                    black_box(&candidates),
                    &cfg,
                )
                .expect("score")
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
