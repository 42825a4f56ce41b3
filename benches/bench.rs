//! Criterion benchmarks for Parley.
//!
//! Covers the per-request hot path (normalization, encoding, relevance,
//! classification with and without the cache) and one full training run.

use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use parley::analysis::{BagOfWordsEncoder, NormalizingTokenizer, Vocabulary};
use parley::classifier::IntentService;
use parley::config::{HiddenLayerConfig, ParleyConfig};
use parley::intent::IntentDataset;
use parley::ml::{FullRetrainer, Trainer};
use parley::relevance::RelevanceScorer;

const PORTFOLIO: &str = include_str!("../data/portfolio_intents.json");

const QUERIES: &[&str] = &[
    "hello",
    "do you build websites",
    "how much does a website cost",
    "what programming languages do you use",
    "can i hire you for a react project",
    "what's the weather in paris",
    "tell me about your ecommerce experience",
    "are you available for freelance work next month",
];

fn dataset() -> IntentDataset {
    IntentDataset::from_json_str(PORTFOLIO).expect("bundled dataset should be valid")
}

fn bench_config() -> ParleyConfig {
    let mut config = ParleyConfig::default();
    config.model.hidden_layers = vec![
        HiddenLayerConfig::new(64, 0.1, 0.001),
        HiddenLayerConfig::new(32, 0.0, 0.0),
    ];
    config.model.epochs = 50;
    config
}

fn bench_text_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_analysis");
    let data = dataset();
    let vocabulary = Vocabulary::build(&data.intents);
    let tokenizer = NormalizingTokenizer::new();
    let encoder = BagOfWordsEncoder::new();

    group.throughput(Throughput::Elements(QUERIES.len() as u64));
    group.bench_function("normalize_terms", |b| {
        b.iter(|| {
            for query in QUERIES {
                black_box(tokenizer.terms(black_box(query)));
            }
        })
    });

    group.throughput(Throughput::Elements(QUERIES.len() as u64));
    group.bench_function("bag_of_words_encode", |b| {
        b.iter(|| {
            for query in QUERIES {
                black_box(encoder.encode(black_box(query), &vocabulary));
            }
        })
    });

    group.bench_function("vocabulary_build", |b| {
        b.iter(|| black_box(Vocabulary::build(black_box(&data.intents))))
    });

    group.finish();
}

fn bench_relevance(c: &mut Criterion) {
    let mut group = c.benchmark_group("relevance");
    let config = ParleyConfig::default();
    let scorer = RelevanceScorer::new(&config.lexicon, config.relevance.clone());

    group.throughput(Throughput::Elements(QUERIES.len() as u64));
    group.bench_function("analyze", |b| {
        b.iter(|| {
            for query in QUERIES {
                black_box(scorer.analyze(black_box(query)));
            }
        })
    });

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");
    let runtime = tokio::runtime::Runtime::new().expect("runtime should start");
    let service = IntentService::builder(dataset())
        .config(bench_config())
        .rng_seed(1)
        .build()
        .expect("service should build");
    runtime
        .block_on(service.train_model())
        .expect("training should succeed");

    group.throughput(Throughput::Elements(QUERIES.len() as u64));
    group.bench_function("classify_uncached", |b| {
        b.iter(|| {
            service.clear_cache();
            for query in QUERIES {
                black_box(runtime.block_on(service.classify_detailed(query)).ok());
            }
        })
    });

    group.throughput(Throughput::Elements(QUERIES.len() as u64));
    group.bench_function("classify_cached", |b| {
        b.iter(|| {
            for query in QUERIES {
                black_box(runtime.block_on(service.classify_detailed(query)).ok());
            }
        })
    });

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);
    let data = dataset();
    let trainer = FullRetrainer::new(bench_config().model);

    group.bench_function("full_retrain", |b| {
        b.iter(|| black_box(trainer.train(black_box(&data.intents)).ok()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_text_analysis,
    bench_relevance,
    bench_classification,
    bench_training
);
criterion_main!(benches);
