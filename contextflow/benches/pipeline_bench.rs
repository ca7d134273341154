//! Benchmarks for pipeline execution.

use contextflow::analysis::FallbackSet;
use contextflow::config::EngineConfig;
use contextflow::context::Context;
use contextflow::pipeline::{Collaborators, ContextOrchestrator, PipelineDefinition, ProfileSynthesizer};
use contextflow::stages::builtin::KeywordMessageAnalyzer;
use contextflow::testing::{sample_results, seeded_collaborators};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

fn pipeline_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let collaborators: Collaborators = seeded_collaborators();
    let config = EngineConfig::default();
    let orchestrator = ContextOrchestrator::new(config.clone());

    for definition in [
        PipelineDefinition::sequential_dependent(&collaborators, &config),
        PipelineDefinition::parallel_then_synthesize(&collaborators, &config),
        PipelineDefinition::lightweight(&collaborators, &config),
    ] {
        c.bench_function(&definition.name, |b| {
            b.iter(|| {
                let ctx = Context::new("Dinner with Ana tonight?", "session-1", "user-1");
                rt.block_on(orchestrator.run(black_box(ctx), &definition))
            })
        });
    }
}

fn stage_benchmark(c: &mut Criterion) {
    let analyzer = KeywordMessageAnalyzer::new();
    c.bench_function("keyword_analysis", |b| {
        b.iter(|| analyzer.analyze_text(black_box("Hey! Could you help me plan dinner with Ana and Marco?")))
    });

    let synthesizer = ProfileSynthesizer::default();
    let results = sample_results();
    let fallbacks = FallbackSet::new();
    c.bench_function("profile_synthesis", |b| {
        b.iter(|| synthesizer.profile(black_box(&results), &fallbacks))
    });
}

criterion_group!(benches, pipeline_benchmark, stage_benchmark);
criterion_main!(benches);
