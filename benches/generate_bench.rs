//! Criterion benchmarks for scene generation.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion};
use scenegen::config::GeneratorParams;
use scenegen::energy::{Energy, EvaluationScope, SceneEnergy};
use scenegen::generate::{derive_graph, generate};
use scenegen::catalog::NodeCatalog;
use scenegen::placement::place_objects;
use scenegen::prng::Pcg32;

// -- JSON fixtures --

/// Derivation only: no optimisation steps.
const DERIVE_ONLY_JSON: &str = r#"{
  "seed": 42,
  "grammar": "simple",
  "derivation_steps": 12,
  "tempering": { "total_steps": 0, "chain_count": 1 }
}"#;

/// 1000 steps over 4 chains, flat schedule.
const FLAT_1000_JSON: &str = r#"{
  "seed": 42,
  "grammar": "simple",
  "derivation_steps": 12,
  "tempering": { "total_steps": 1000, "chain_count": 4, "parallel": false }
}"#;

/// Same budget stepped on the rayon pool.
const PARALLEL_1000_JSON: &str = r#"{
  "seed": 42,
  "grammar": "simple",
  "derivation_steps": 12,
  "tempering": { "total_steps": 1000, "chain_count": 4, "parallel": true }
}"#;

/// Hierarchical schedule: every cluster optimised before the whole scene.
const HIERARCHICAL_1000_JSON: &str = r#"{
  "seed": 42,
  "grammar": "simple",
  "derivation_steps": 12,
  "hierarchical": true,
  "tempering": { "total_steps": 1000, "chain_count": 4 }
}"#;

fn bench_derive_only(c: &mut Criterion) {
    let params: GeneratorParams = serde_json::from_str(DERIVE_ONLY_JSON).unwrap();
    c.bench_function("generate_derive_only", |b| {
        b.iter(|| generate(&params));
    });
}

fn bench_flat(c: &mut Criterion) {
    let params: GeneratorParams = serde_json::from_str(FLAT_1000_JSON).unwrap();
    c.bench_function("generate_flat_1000_steps", |b| {
        b.iter(|| generate(&params));
    });
}

fn bench_parallel(c: &mut Criterion) {
    let params: GeneratorParams = serde_json::from_str(PARALLEL_1000_JSON).unwrap();
    c.bench_function("generate_parallel_1000_steps", |b| {
        b.iter(|| generate(&params));
    });
}

fn bench_hierarchical(c: &mut Criterion) {
    let params: GeneratorParams = serde_json::from_str(HIERARCHICAL_1000_JSON).unwrap();
    c.bench_function("generate_hierarchical_1000_steps", |b| {
        b.iter(|| generate(&params));
    });
}

fn bench_energy(c: &mut Criterion) {
    let catalog = NodeCatalog::builtin();
    let mut rng = Pcg32::new(42, 0);
    let graph = derive_graph("simple", 12, &mut rng).unwrap();
    let layout = place_objects(&graph, &catalog, false, true, &mut rng).unwrap();
    let energy = SceneEnergy::new(&graph, &catalog, Default::default());
    let scope = EvaluationScope::full(&layout);
    c.bench_function("scene_energy_full_scope", |b| {
        b.iter(|| energy.evaluate(&layout, &scope));
    });
}

criterion_group!(
    benches,
    bench_derive_only,
    bench_flat,
    bench_parallel,
    bench_hierarchical,
    bench_energy
);
criterion_main!(benches);
