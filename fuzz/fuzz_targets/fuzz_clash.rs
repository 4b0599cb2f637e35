#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tessera::game::{ClashConfig, RegimentStats, resolve_clash};

/// One side's raw stats.
#[derive(Arbitrary, Debug)]
struct Side {
    men: u32,
    skill: i16,
    armor: i16,
    maneuver: i16,
    morale: u16,
    readiness: i16,
    wounded: u32,
    killed: u32,
}

impl Side {
    fn stats(&self) -> RegimentStats {
        RegimentStats {
            men: self.men % 100_000,
            combat_skill: f64::from(self.skill) / 100.0,
            armor: f64::from(self.armor) / 100.0,
            maneuver: f64::from(self.maneuver) / 100.0,
            morale: f64::from(self.morale) / 100.0,
            readiness: f64::from(self.readiness) / 100.0,
            wounded: self.wounded % 100_000,
            killed: self.killed % 100_000,
        }
    }
}

/// Structured input for clash fuzzing.
#[derive(Arbitrary, Debug)]
struct ClashInput {
    attacker: Side,
    defender: Side,
    seed: u64,
    randomize: bool,
}

fuzz_target!(|input: ClashInput| {
    let attacker = input.attacker.stats();
    let defender = input.defender.stats();
    let config = ClashConfig::default();

    let outcome = if input.randomize {
        let mut rng = StdRng::seed_from_u64(input.seed);
        resolve_clash(&attacker, &defender, &config, Some(&mut rng))
    } else {
        let outcome = resolve_clash(&attacker, &defender, &config, None);
        assert_eq!(outcome, resolve_clash(&attacker, &defender, &config, None));
        outcome
    };

    assert!(outcome.defender.casualties() <= defender.active());
    assert!(outcome.attacker.casualties() <= attacker.active());
    assert!(outcome.defender.morale_loss <= defender.morale + f64::EPSILON);
    assert!(outcome.attacker.morale_loss <= attacker.morale + f64::EPSILON);

    let mut after = defender.clone();
    after.apply_losses(&outcome.defender);
    assert!(after.killed + after.wounded <= after.men.max(defender.killed + defender.wounded));
    assert!(after.morale >= 0.0);
});
