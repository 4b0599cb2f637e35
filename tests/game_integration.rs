//! Whole-match integration tests.
//!
//! These tests drive complete AI-vs-AI matches and check that they finish,
//! stay consistent, and replay identically from their recording.
//!
//! Run with: cargo test --release game_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use tessera::game::{Health, check_invariants, reset_combat, turn};
use tessera::replay::{Recording, ReplayEngine};
use tessera::session::{Match, MatchEnd};
use tessera::snapshot::WorldDigest;
use tessera::tournament::run_tournament;
use tessera::{EngineConfig, run_match};

fn short_config() -> EngineConfig {
    EngineConfig {
        max_turns: 40,
        ai_delay_ticks: 1,
        ..EngineConfig::default()
    }
}

#[test]
fn test_default_match_finishes() {
    let result = run_match(&EngineConfig::default(), 42).unwrap();
    assert!(result.turns <= EngineConfig::default().max_turns);
    assert!(result.actions > 0);
    assert_eq!(result.combatants.len(), 2);
}

#[test]
fn test_multiple_seeds_stay_consistent() {
    let config = short_config();
    for seed in 0..8 {
        let mut game = Match::new(&config, seed).unwrap();
        while !game.is_over() {
            game.tick();
        }
        let store = &game.context().store;
        assert!(
            check_invariants(store).is_empty(),
            "seed {seed}: {:?}",
            check_invariants(store)
        );

        let result = game.result();
        assert!(result.turns <= config.max_turns);
        for outcome in &result.combatants {
            assert!((0..=outcome.max_health).contains(&outcome.health));
        }
        if result.winner.is_some() {
            assert_eq!(result.end, MatchEnd::Defeat);
        }
    }
}

#[test]
fn test_extra_turns_never_outnumber_actions() {
    let result = run_match(&short_config(), 9).unwrap();
    // At most one extra turn per committed action.
    assert!(u64::from(result.extra_turns) <= result.actions);
    assert!(result.ticks > 0);
}

#[test]
fn test_recording_round_trip_replays_the_same_match() {
    let config = short_config();
    let seed = 1234;
    let expected = run_match(&config, seed).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("match.json");
    Recording::new(seed, config).save(&path).unwrap();

    let mut engine = ReplayEngine::new(Recording::load(&path).unwrap()).unwrap();
    let replayed = engine.run_to_end();
    assert_eq!(replayed, expected);
    assert!(engine.is_over());
}

#[test]
fn test_replay_jumps_match_linear_stepping() {
    let recording = Recording::new(77, short_config());

    let mut linear = ReplayEngine::new(recording.clone()).unwrap();
    for _ in 0..6 {
        linear.step_forward().unwrap();
    }

    let mut jumping = ReplayEngine::new(recording).unwrap();
    jumping.goto_action(9).unwrap();
    jumping.goto_action(6).unwrap();

    assert_eq!(jumping.action(), 6);
    assert_eq!(
        WorldDigest::capture(&jumping.context().store),
        WorldDigest::capture(&linear.context().store)
    );
    assert_eq!(jumping.render_text(), linear.render_text());
}

#[test]
fn test_config_file_drives_the_match() {
    let config = EngineConfig {
        board_rows: 6,
        board_cols: 6,
        ..short_config()
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.json");
    config.save(&path).unwrap();

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    let game = Match::new(&loaded, 3).unwrap();
    assert_eq!(WorldDigest::capture(&game.context().store).board.len(), 6);
}

#[test]
fn test_reset_mid_match_restores_combatants() {
    let mut game = Match::new(&short_config(), 5).unwrap();
    for _ in 0..10 {
        if !game.step_action() {
            break;
        }
    }
    let mut ctx = game.context().fork().0;
    reset_combat(&mut ctx, "rematch");

    for owner in turn::combatants(&ctx.store) {
        let health = ctx.store.get::<Health>(owner).unwrap();
        assert_eq!(health.current, health.max);
        assert!(tessera::effects::effects_of(&ctx.store, owner).is_empty());
    }
    assert!(check_invariants(&ctx.store).is_empty());
}

#[test]
fn test_tournament_counts_every_game() {
    let seeds: Vec<u64> = (100..112).collect();
    let stats = run_tournament(&short_config(), &seeds, Some(2)).unwrap();
    assert_eq!(stats.games_played, 12);

    let decided: u64 = stats.combatants.iter().map(|c| c.wins).sum();
    assert_eq!(decided + stats.draws, 12);
}
