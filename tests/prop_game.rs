//! Property-based tests for the board, effects and clash model.
//!
//! Run with: cargo test --release prop_game

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use tessera::effects::{Effect, EffectApply, find_effects};
use tessera::game::board::{self, clear_and_cascade, generate_board};
use tessera::game::{
    ClashConfig, Position, RegimentStats, armor_reduction, attack_dice, check_invariants,
    resolve_clash,
};
use tessera::snapshot::WorldDigest;
use tessera::{EngineConfig, Event, SimulationContext};

fn board_context(seed: u64, rows: u16, cols: u16) -> SimulationContext {
    let config = EngineConfig {
        board_rows: rows,
        board_cols: cols,
        ..EngineConfig::default()
    };
    let mut ctx = SimulationContext::new(config, seed);
    generate_board(&mut ctx);
    ctx
}

fn active_tiles(ctx: &SimulationContext) -> usize {
    WorldDigest::capture(&ctx.store)
        .board
        .iter()
        .flat_map(|row| row.split_whitespace())
        .filter(|kind| *kind != ".")
        .count()
}

fn regiment() -> impl Strategy<Value = RegimentStats> {
    (
        0u32..500,
        0.0f64..20.0,
        0.0f64..40.0,
        0.0f64..20.0,
        0.0f64..100.0,
        0.0f64..20.0,
    )
        .prop_map(|(men, combat_skill, armor, maneuver, morale, readiness)| RegimentStats {
            men,
            combat_skill,
            armor,
            maneuver,
            morale,
            readiness,
            ..RegimentStats::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Generated boards never start with a match.
    #[test]
    fn prop_generated_board_has_no_matches(
        seed in any::<u64>(),
        rows in 3u16..10,
        cols in 3u16..10
    ) {
        let ctx = board_context(seed, rows, cols);
        prop_assert!(board::find_matches(&ctx.store, 3).is_empty());
        prop_assert_eq!(active_tiles(&ctx), usize::from(rows) * usize::from(cols));
    }

    /// A refilling cascade ends stable and with every cell active.
    #[test]
    fn prop_cascade_settles_and_refills(
        seed in any::<u64>(),
        cells in prop::collection::vec((0u16..8, 0u16..8), 1..12)
    ) {
        let mut ctx = board_context(seed, 8, 8);
        let positions: Vec<Position> = cells
            .into_iter()
            .map(|(row, col)| Position::new(row, col))
            .collect();
        let report = clear_and_cascade(&mut ctx, &positions, true);

        prop_assert!(board::find_matches(&ctx.store, 3).is_empty());
        prop_assert_eq!(active_tiles(&ctx), 64);
        prop_assert_eq!(report.cleared.len(), report.refilled.len());
        prop_assert!(check_invariants(&ctx.store).is_empty());
    }

    /// Without refill, clearing only ever removes tiles.
    #[test]
    fn prop_cascade_without_refill_conserves_or_drops(
        seed in any::<u64>(),
        cells in prop::collection::vec((0u16..6, 0u16..6), 0..8)
    ) {
        let mut ctx = board_context(seed, 6, 6);
        let positions: Vec<Position> = cells
            .into_iter()
            .map(|(row, col)| Position::new(row, col))
            .collect();
        let report = clear_and_cascade(&mut ctx, &positions, false);

        prop_assert!(report.refilled.is_empty());
        prop_assert_eq!(active_tiles(&ctx) + report.cleared.len(), 36);
    }

    /// Cumulative applications sum their counts into one effect.
    #[test]
    fn prop_cumulative_stacking_sums(counts in prop::collection::vec(1i64..20, 1..8)) {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let owner = ctx.store.create();
        let mut running = 0;
        for count in &counts {
            ctx.emit(Event::EffectApply(Box::new(
                EffectApply::new(owner, "stacks").cumulative().count(*count),
            )));
            running += count;
            let found = find_effects(&ctx.store, owner, "stacks");
            prop_assert_eq!(found.len(), 1);
            prop_assert_eq!(ctx.store.get::<Effect>(found[0]).map(|e| e.count), Some(running));
        }
    }

    /// Expected-value clashes are pure and stay within each side's numbers.
    #[test]
    fn prop_clash_is_deterministic_and_bounded(a in regiment(), d in regiment()) {
        let config = ClashConfig::default();
        let outcome = resolve_clash(&a, &d, &config, None);
        prop_assert_eq!(outcome, resolve_clash(&a, &d, &config, None));

        prop_assert!(outcome.defender.casualties() <= d.active());
        prop_assert!(outcome.attacker.casualties() <= a.active());
        prop_assert!(outcome.defender.morale_loss <= d.morale + f64::EPSILON);
        prop_assert!(outcome.attacker.morale_loss <= a.morale + f64::EPSILON);
        prop_assert!(outcome.defender.morale_loss >= 0.0);
    }

    /// Randomized clashes respect the same bounds.
    #[test]
    fn prop_random_clash_is_bounded(a in regiment(), d in regiment(), seed in any::<u64>()) {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let outcome = resolve_clash(&a, &d, &ClashConfig::default(), Some(&mut rng));
        prop_assert!(outcome.defender.casualties() <= d.active());
        prop_assert!(outcome.attacker.casualties() <= a.active());
        prop_assert!(outcome.defender.killed <= outcome.defender.casualties());
    }

    /// Dice never exceed the attacker count and grow with it.
    #[test]
    fn prop_attack_dice_bounded_and_monotonic(attackers in 0u32..2000, defenders in 0u32..500) {
        let config = ClashConfig::default();
        let dice = attack_dice(attackers, defenders, &config);
        prop_assert!(dice <= f64::from(attackers) + 1e-9);
        prop_assert!(attack_dice(attackers + 1, defenders, &config) >= dice - 1e-9);
    }

    /// Armor absorbs between nothing and the configured maximum.
    #[test]
    fn prop_armor_reduction_in_range(armor in -10.0f64..200.0) {
        let config = ClashConfig::default();
        let reduction = armor_reduction(armor, &config);
        prop_assert!(reduction >= 0.0);
        prop_assert!(reduction <= config.armor_max_reduction + 1e-9);
    }
}
