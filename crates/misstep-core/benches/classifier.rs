use criterion::{black_box, criterion_group, criterion_main, Criterion};

use misstep_core::classifier::{Classifier, StepMetadata};
use misstep_core::matcher::match_error_pattern;
use misstep_core::model::ErrorPattern;

fn bench_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier");
    let classifier = Classifier::default();

    let step = StepMetadata {
        explanation: "The horizontal component is adjacent to the launch angle.".into(),
        common_misconceptions: vec![
            "Confusing sin and cos when decomposing".into(),
            "Using the complement angle".into(),
        ],
    };
    let bare = StepMetadata::default();

    // first rule fires
    group.bench_function("swap_signature", |b| {
        b.iter(|| {
            classifier.classify(
                black_box("Ax = 10 sin(30°), Ay = 10 cos(30°)"),
                black_box("Ax = 10 cos(30°), Ay = 10 sin(30°)"),
                black_box(&step),
            )
        })
    });

    // falls through every regex bank to the misconception table
    group.bench_function("misconception_fallback", |b| {
        b.iter(|| {
            classifier.classify(
                black_box("the answer is 12"),
                black_box("the answer is 8.66"),
                black_box(&step),
            )
        })
    });

    // nothing matches
    group.bench_function("unknown", |b| {
        b.iter(|| classifier.classify(black_box("42"), black_box("17"), black_box(&bare)))
    });

    group.finish();
}

fn bench_pattern_match(c: &mut Criterion) {
    let patterns: Vec<ErrorPattern> = (0..50)
        .map(|i| ErrorPattern {
            id: format!("p{i}"),
            trigger_value: format!("{}.0", i * 2),
            trigger_tolerance: 0.5,
            error_type: "BENCH".into(),
            diagnosis_text: "bench".into(),
            missing_concept: None,
            confidence: (i % 10) as f64 / 10.0,
        })
        .collect();

    c.bench_function("match_error_pattern_50", |b| {
        b.iter(|| match_error_pattern(black_box(&patterns), black_box("48.2 m/s")))
    });
}

criterion_group!(benches, bench_cascade, bench_pattern_match);
criterion_main!(benches);
