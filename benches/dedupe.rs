//! Benchmarks for similarity scoring, admission and compaction.
//!
//! Benchmark targets:
//! - Cosine similarity (384 dims): <1µs
//! - Admission against 100 cached tactics: <1ms
//! - Compaction of 200 tactics, warm cache: <20ms
//!
//! Vectors come from a deterministic generator so timings exclude model
//! inference; `embedding` measures the configured embedder on its own.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use tactic_dedupe::embedding::{DEFAULT_DIMENSIONS, Embedder, FastEmbedEmbedder, normalize_in_place};
use tactic_dedupe::models::ListKey;
use tactic_dedupe::services::deduplication::cosine_similarity;
use tactic_dedupe::storage::{InMemoryStore, TacticStore};
use tactic_dedupe::{DedupeEngine, Result};

const THRESHOLD: f32 = 0.92;

/// Embeds `t<n>` to a fixed pseudo-random unit vector seeded by `n`.
struct SeededEmbedder;

impl SeededEmbedder {
    fn vector(seed: u64) -> Vec<f32> {
        let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let mut v: Vec<f32> = (0..DEFAULT_DIMENSIONS)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                ((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5
            })
            .collect();
        normalize_in_place(&mut v);
        v
    }
}

impl Embedder for SeededEmbedder {
    fn dimensions(&self) -> usize {
        DEFAULT_DIMENSIONS
    }

    fn model_id(&self) -> &str {
        "seeded-v1"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let seed = text.trim_start_matches('t').parse().unwrap_or(0);
        Ok(Self::vector(seed))
    }
}

fn tactics(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("t{i}")).collect()
}

fn bench_similarity(c: &mut Criterion) {
    let a = SeededEmbedder::vector(1);
    let b = SeededEmbedder::vector(2);
    c.bench_function("cosine_similarity_384", |bench| {
        bench.iter(|| cosine_similarity(black_box(&a), black_box(&b)));
    });
}

fn bench_admit(c: &mut Criterion) {
    let mut group = c.benchmark_group("admit");
    for size in [10usize, 100, 500] {
        let store = Arc::new(InMemoryStore::new());
        let engine = DedupeEngine::new(Arc::new(SeededEmbedder), Arc::clone(&store));
        let key = ListKey::tactics();
        engine.seed(&key, &tactics(size), THRESHOLD).unwrap();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            // Exact repeats of the first entry would short-circuit; use an
            // unseen text and remove it again so the list stays the same size.
            bench.iter(|| {
                let outcome = engine.admit(&key, black_box("t999999"), THRESHOLD).unwrap();
                if outcome.is_added() {
                    store
                        .remove_entry(key.as_str(), &key.vecs_key(), "t999999")
                        .unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_compact(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact");
    for size in [50usize, 200] {
        let engine = DedupeEngine::new(Arc::new(SeededEmbedder), Arc::new(InMemoryStore::new()));
        let key = ListKey::tactics();
        engine.seed(&key, &tactics(size), THRESHOLD).unwrap();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("warm", size), &size, |bench, _| {
            bench.iter(|| engine.compact(black_box(&key), THRESHOLD).unwrap());
        });
    }
    group.finish();
}

fn bench_embedding(c: &mut Criterion) {
    let embedder = FastEmbedEmbedder::try_new().unwrap();
    c.bench_function("embed_tactic", |bench| {
        bench.iter(|| {
            embedder
                .embed(black_box("Ask to speak to a supervisor or retention team."))
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_similarity,
    bench_admit,
    bench_compact,
    bench_embedding
);
criterion_main!(benches);
