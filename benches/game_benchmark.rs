//! Benchmarks for the engine hot paths.
//!
//! Match detection and cascades run on every action; the planner replays
//! every candidate in a forked world, which dominates full-match time.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tessera::ai::{self, WeightedEvaluator};
use tessera::game::board::{self, clear_and_cascade, generate_board};
use tessera::game::{ClashConfig, Position, RegimentStats, build_encounter, resolve_clash, turn};
use tessera::{EngineConfig, SimulationContext, run_match};

fn bench_find_matches(c: &mut Criterion) {
    let mut ctx = SimulationContext::new(EngineConfig::default(), 42);
    generate_board(&mut ctx);

    c.bench_function("find_matches_8x8", |b| {
        b.iter(|| black_box(board::find_matches(black_box(&ctx.store), 3)));
    });
    c.bench_function("legal_swaps_8x8", |b| {
        b.iter(|| black_box(board::legal_swaps(black_box(&ctx.store), 3)));
    });
}

fn bench_cascade(c: &mut Criterion) {
    let mut base = SimulationContext::new(EngineConfig::default(), 7);
    generate_board(&mut base);
    let row: Vec<Position> = (0..8).map(|col| Position::new(0, col)).collect();

    c.bench_function("clear_row_and_cascade", |b| {
        b.iter(|| {
            let (mut ctx, _) = base.fork();
            black_box(clear_and_cascade(&mut ctx, black_box(&row), true))
        });
    });
}

fn bench_ai_plan(c: &mut Criterion) {
    let mut ctx = build_encounter(&EngineConfig::default(), 11).unwrap();
    turn::begin(&mut ctx);
    let owner = turn::active_owner(&ctx.store).unwrap();
    let evaluator = WeightedEvaluator::default();

    c.bench_function("ai_plan_opening", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(1);
            black_box(ai::plan(&ctx, owner, &evaluator, 0.0, &mut rng))
        });
    });
}

fn bench_full_match(c: &mut Criterion) {
    let config = EngineConfig {
        max_turns: 30,
        ai_delay_ticks: 0,
        ..EngineConfig::default()
    };

    let mut group = c.benchmark_group("full_match");
    group.sample_size(10);
    group.bench_function("30_turns", |b| {
        b.iter(|| black_box(run_match(black_box(&config), black_box(42))));
    });
    group.finish();
}

fn bench_clash(c: &mut Criterion) {
    let attacker = RegimentStats {
        men: 400,
        armor: 12.0,
        ..RegimentStats::default()
    };
    let defender = RegimentStats {
        men: 250,
        combat_skill: 7.0,
        ..RegimentStats::default()
    };
    let config = ClashConfig::default();

    c.bench_function("resolve_clash_expected", |b| {
        b.iter(|| black_box(resolve_clash(black_box(&attacker), black_box(&defender), &config, None)));
    });
    c.bench_function("resolve_clash_randomized", |b| {
        let mut rng = StdRng::seed_from_u64(3);
        b.iter(|| {
            black_box(resolve_clash(
                black_box(&attacker),
                black_box(&defender),
                &config,
                Some(&mut rng),
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_find_matches,
    bench_cascade,
    bench_ai_plan,
    bench_full_match,
    bench_clash
);
criterion_main!(benches);
