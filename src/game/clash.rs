//! Regiment clash resolution.
//!
//! A closed-form model of two regiments fighting simultaneously, separate
//! from tile matching. Both sides attack at once; each side's losses depend
//! only on the pre-clash stats, never on the other side's losses in the
//! same clash.

// Head counts go through f64 and back; values stay far inside both ranges.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::SimulationContext;
use crate::ecs::{Component, EntityId, EntityRemap};
use crate::events::Event;

/// Constants of the clash model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClashConfig {
    /// Frontage as a multiple of the defender's active count. Attackers up to
    /// this width each roll one die.
    pub width_multiple: f64,
    /// Hit chance at equal maneuver.
    pub base_hit_chance: f64,
    /// Hit chance per point of maneuver advantage.
    pub maneuver_scale: f64,
    /// Lower clamp of the hit chance.
    pub min_hit_chance: f64,
    /// Upper clamp of the hit chance.
    pub max_hit_chance: f64,
    /// Maneuver and skill bonus per point of readiness difference, split
    /// evenly between both sides.
    pub readiness_scale: f64,
    /// Damage per hit at equal skill.
    pub base_damage: f64,
    /// Damage per hit per point of skill advantage.
    pub skill_scale: f64,
    /// Damage floor per hit before armor.
    pub min_damage: f64,
    /// Armor up to which reduction grows linearly.
    pub armor_threshold: f64,
    /// Reduction per armor point below the threshold.
    pub armor_linear_rate: f64,
    /// Reduction approached asymptotically above the threshold.
    pub armor_max_reduction: f64,
    /// Exponential rate of that approach.
    pub armor_decay: f64,
    /// Share of casualties killed at zero armor.
    pub base_kill_ratio: f64,
    /// Kill-ratio drop per armor point.
    pub kill_ratio_armor_scale: f64,
    /// Kill-ratio floor.
    pub min_kill_ratio: f64,
    /// Fraction of the regiment whose loss zeroes morale.
    pub rout_threshold: f64,
}

impl Default for ClashConfig {
    fn default() -> Self {
        Self {
            width_multiple: 1.5,
            base_hit_chance: 0.4,
            maneuver_scale: 0.05,
            min_hit_chance: 0.05,
            max_hit_chance: 0.95,
            readiness_scale: 0.5,
            base_damage: 0.5,
            skill_scale: 0.1,
            min_damage: 0.1,
            armor_threshold: 10.0,
            armor_linear_rate: 0.03,
            armor_max_reduction: 0.75,
            armor_decay: 0.1,
            base_kill_ratio: 0.5,
            kill_ratio_armor_scale: 0.02,
            min_kill_ratio: 0.1,
            rout_threshold: 0.3,
        }
    }
}

/// Stat block of one regiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimentStats {
    /// Total size including casualties.
    pub men: u32,
    /// Fighting skill.
    pub combat_skill: f64,
    /// Armor rating.
    pub armor: f64,
    /// Maneuver rating.
    pub maneuver: f64,
    /// Morale, zero means routed.
    pub morale: f64,
    /// Readiness rating.
    pub readiness: f64,
    /// Wounded so far.
    pub wounded: u32,
    /// Killed so far.
    pub killed: u32,
}

impl Default for RegimentStats {
    fn default() -> Self {
        Self {
            men: 40,
            combat_skill: 5.0,
            armor: 0.0,
            maneuver: 5.0,
            morale: 100.0,
            readiness: 5.0,
            wounded: 0,
            killed: 0,
        }
    }
}

impl RegimentStats {
    /// Men still able to fight.
    #[must_use]
    pub fn active(&self) -> u32 {
        self.men
            .saturating_sub(self.wounded)
            .saturating_sub(self.killed)
    }

    /// Fold losses in, never exceeding the regiment size.
    pub fn apply_losses(&mut self, losses: &SideLosses) {
        let killed = losses.killed.min(self.active());
        self.killed += killed;
        self.wounded += losses.wounded.min(self.active());
        self.morale = (self.morale - losses.morale_loss).max(0.0);
    }
}

/// Losses suffered by one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideLosses {
    /// Attack dice the opposing side rolled.
    pub dice: f64,
    /// Hits taken.
    pub hits: f64,
    /// Newly killed.
    pub killed: u32,
    /// Newly wounded.
    pub wounded: u32,
    /// Morale lost.
    pub morale_loss: f64,
}

impl SideLosses {
    /// Killed plus wounded.
    #[must_use]
    pub fn casualties(&self) -> u32 {
        self.killed + self.wounded
    }
}

/// Result of one clash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClashOutcome {
    /// What the attacker lost.
    pub attacker: SideLosses,
    /// What the defender lost.
    pub defender: SideLosses,
}

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Largest `n` summed term by term; past it the asymptotic expansion is used.
const HARMONIC_EXACT_LIMIT: u64 = 1 << 16;

/// The `n`-th harmonic number.
#[must_use]
pub fn harmonic(n: u64) -> f64 {
    if n <= HARMONIC_EXACT_LIMIT {
        return (1..=n).map(|k| 1.0 / k as f64).sum();
    }
    let n = n as f64;
    n.ln() + EULER_GAMMA + 1.0 / (2.0 * n) - 1.0 / (12.0 * n * n)
}

/// Attack dice for `attackers` against `defenders`.
///
/// Up to the frontage (`width_multiple` x defenders) every attacker rolls.
/// Past it, the `k`-th full frontage tier adds only `1/k` of a frontage, so
/// `k` full tiers give `width * H(k)` and a partial tier adds `r / (k + 1)`.
#[must_use]
pub fn attack_dice(attackers: u32, defenders: u32, config: &ClashConfig) -> f64 {
    let a = f64::from(attackers);
    let width = config.width_multiple * f64::from(defenders);
    if width <= 0.0 || a <= width {
        return a;
    }
    // Tier count stays in f64; the cast only feeds the harmonic sum and saturates.
    let tiers = (a / width).floor();
    let remainder = a - tiers * width;
    (width * harmonic(tiers as u64) + remainder / (tiers + 1.0)).min(a)
}

/// Fraction of damage armor absorbs.
#[must_use]
pub fn armor_reduction(armor: f64, config: &ClashConfig) -> f64 {
    if armor <= 0.0 {
        return 0.0;
    }
    let at_threshold = (config.armor_threshold * config.armor_linear_rate).min(config.armor_max_reduction);
    if armor <= config.armor_threshold {
        return (armor * config.armor_linear_rate).min(config.armor_max_reduction);
    }
    let excess = armor - config.armor_threshold;
    config.armor_max_reduction
        - (config.armor_max_reduction - at_threshold) * (-config.armor_decay * excess).exp()
}

/// Share of casualties that die rather than get wounded.
#[must_use]
pub fn kill_ratio(armor: f64, config: &ClashConfig) -> f64 {
    (config.base_kill_ratio - config.kill_ratio_armor_scale * armor.max(0.0))
        .clamp(config.min_kill_ratio, 1.0)
}

/// One side hitting the other.
fn strike(
    striker: &RegimentStats,
    target: &RegimentStats,
    edge: f64,
    config: &ClashConfig,
    rng: Option<&mut dyn RngCore>,
) -> SideLosses {
    let target_active = target.active();
    if striker.active() == 0 || target_active == 0 {
        return SideLosses::default();
    }

    let dice = attack_dice(striker.active(), target_active, config);
    let hit_chance = (config.base_hit_chance
        + config.maneuver_scale * ((striker.maneuver + edge) - (target.maneuver - edge)))
        .clamp(config.min_hit_chance, config.max_hit_chance);
    let raw_damage = (config.base_damage
        + config.skill_scale * ((striker.combat_skill + edge) - (target.combat_skill - edge)))
        .max(config.min_damage);
    let damage = raw_damage * (1.0 - armor_reduction(target.armor, config));
    let ratio = kill_ratio(target.armor, config);

    let (hits, casualties, killed) = match rng {
        None => {
            let hits = dice * hit_chance;
            let casualties = (hits * damage).round().min(f64::from(target_active)) as u32;
            let killed = (f64::from(casualties) * ratio).round() as u32;
            (hits, casualties, killed)
        }
        Some(rng) => {
            let rolls = dice.round() as u32;
            let hits = (0..rolls).filter(|_| rng.random_bool(hit_chance)).count();
            let casualties = (hits as f64 * damage).round().min(f64::from(target_active)) as u32;
            let killed = (0..casualties).filter(|_| rng.random_bool(ratio)).count() as u32;
            (hits as f64, casualties, killed)
        }
    };

    let fraction_lost = if target.men == 0 {
        0.0
    } else {
        f64::from(casualties) / f64::from(target.men)
    };
    let morale_loss = if config.rout_threshold > 0.0 {
        (target.morale * fraction_lost / config.rout_threshold).min(target.morale)
    } else {
        target.morale
    };

    SideLosses {
        dice,
        hits,
        killed,
        wounded: casualties - killed,
        morale_loss,
    }
}

/// Resolve a simultaneous clash.
///
/// With `rng = None` every quantity is its expectation, so equal inputs give
/// equal outputs. With an RNG each die and each casualty is rolled.
#[must_use]
pub fn resolve_clash(
    attacker: &RegimentStats,
    defender: &RegimentStats,
    config: &ClashConfig,
    mut rng: Option<&mut dyn RngCore>,
) -> ClashOutcome {
    let edge = (attacker.readiness - defender.readiness) * config.readiness_scale / 2.0;
    let defender_losses = strike(
        attacker,
        defender,
        edge,
        config,
        rng.as_mut().map(|r| &mut **r as &mut dyn RngCore),
    );
    let attacker_losses = strike(
        defender,
        attacker,
        -edge,
        config,
        rng.as_mut().map(|r| &mut **r as &mut dyn RngCore),
    );
    ClashOutcome {
        attacker: attacker_losses,
        defender: defender_losses,
    }
}

/// A regiment in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Regiment {
    /// Commanding owner.
    pub owner: EntityId,
    /// Current stats.
    pub stats: RegimentStats,
}

impl Component for Regiment {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        self.owner = remap.apply(self.owner);
    }
}

/// Clash two regiment entities, applying losses in place.
///
/// Returns `None` when either entity has no [`Regiment`].
pub fn fight_clash(
    ctx: &mut SimulationContext,
    attacker: EntityId,
    defender: EntityId,
    randomize: bool,
) -> Option<ClashOutcome> {
    let a = ctx.store.get::<Regiment>(attacker)?.stats.clone();
    let d = ctx.store.get::<Regiment>(defender)?.stats.clone();
    let config = ctx.config().clash.clone();
    let outcome = if randomize {
        resolve_clash(&a, &d, &config, Some(&mut ctx.rng))
    } else {
        resolve_clash(&a, &d, &config, None)
    };

    if let Some(regiment) = ctx.store.get_mut::<Regiment>(attacker) {
        regiment.stats.apply_losses(&outcome.attacker);
    }
    if let Some(regiment) = ctx.store.get_mut::<Regiment>(defender) {
        regiment.stats.apply_losses(&outcome.defender);
    }
    debug!(
        target: "tessera::clash",
        attacker,
        defender,
        attacker_casualties = outcome.attacker.casualties(),
        defender_casualties = outcome.defender.casualties(),
        "clash resolved"
    );
    ctx.emit(Event::ClashResolved {
        attacker,
        defender,
        outcome,
    });
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::EngineConfig;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_active_floors_at_zero() {
        let stats = RegimentStats {
            men: 10,
            wounded: 8,
            killed: 5,
            ..RegimentStats::default()
        };
        assert_eq!(stats.active(), 0);
    }

    #[test]
    fn test_dice_one_to_one_within_frontage() {
        let config = ClashConfig::default();
        assert!(approx(attack_dice(30, 20, &config), 30.0));
        assert!(approx(attack_dice(0, 20, &config), 0.0));
    }

    #[test]
    fn test_dice_diminish_past_frontage() {
        let config = ClashConfig {
            width_multiple: 1.0,
            ..ClashConfig::default()
        };
        // Two full tiers: 10 * (1 + 1/2).
        assert!(approx(attack_dice(20, 10, &config), 15.0));
        // Two full tiers plus half a tier at 1/3.
        assert!(approx(attack_dice(25, 10, &config), 15.0 + 5.0 / 3.0));
        assert!(attack_dice(1000, 10, &config) < 100.0);
    }

    #[test]
    fn test_harmonic_switches_to_expansion_smoothly() {
        let exact = harmonic(HARMONIC_EXACT_LIMIT);
        let next = harmonic(HARMONIC_EXACT_LIMIT + 1);
        assert!((next - exact - 1.0 / (HARMONIC_EXACT_LIMIT + 1) as f64).abs() < 1e-8);
        assert!(harmonic(u64::MAX).is_finite());
        assert!(approx(harmonic(0), 0.0));
    }

    #[test]
    fn test_dice_stay_finite_for_extreme_ratios() {
        let config = ClashConfig {
            width_multiple: 0.25,
            ..ClashConfig::default()
        };
        let huge = attack_dice(u32::MAX, 1, &config);
        assert!(huge.is_finite());
        assert!(huge <= f64::from(u32::MAX));
        assert!(huge >= attack_dice(u32::MAX / 2, 1, &config));

        let sliver = ClashConfig {
            width_multiple: 1e-300,
            ..ClashConfig::default()
        };
        let dice = attack_dice(u32::MAX, u32::MAX, &sliver);
        assert!(dice.is_finite() && dice >= 0.0);
    }

    #[test]
    fn test_randomized_clash_reuses_one_rng_for_both_sides() {
        let config = ClashConfig::default();
        let side = RegimentStats::default();
        let mut rng = StdRng::seed_from_u64(4);
        let outcome = resolve_clash(&side, &side, &config, Some(&mut rng));
        assert!(outcome.attacker.hits > 0.0 || outcome.defender.hits > 0.0);
        // The same RNG is still usable afterwards.
        let again = resolve_clash(&side, &side, &config, Some(&mut rng));
        assert!(again.defender.casualties() <= side.men);
    }

    #[test]
    fn test_armor_reduction_is_continuous_and_capped() {
        let config = ClashConfig::default();
        let at = armor_reduction(config.armor_threshold, &config);
        let just_past = armor_reduction(config.armor_threshold + 1e-6, &config);
        assert!((at - just_past).abs() < 1e-6);
        assert!(armor_reduction(1000.0, &config) <= config.armor_max_reduction);
        assert!(approx(armor_reduction(0.0, &config), 0.0));
    }

    #[test]
    fn test_heavier_armor_wounds_more_than_kills() {
        let config = ClashConfig::default();
        assert!(kill_ratio(20.0, &config) < kill_ratio(0.0, &config));
    }

    #[test]
    fn test_expected_clash_is_deterministic_and_symmetric() {
        let config = ClashConfig::default();
        let side = RegimentStats::default();
        let first = resolve_clash(&side, &side, &config, None);
        let second = resolve_clash(&side, &side, &config, None);
        assert_eq!(first, second);
        assert_eq!(first.attacker, first.defender);
        assert!(first.defender.casualties() > 0);
    }

    #[test]
    fn test_dice_mode_repeats_with_same_seed() {
        let config = ClashConfig::default();
        let side = RegimentStats::default();
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        let first = resolve_clash(&side, &side, &config, Some(&mut a));
        let second = resolve_clash(&side, &side, &config, Some(&mut b));
        assert_eq!(first, second);
        assert!(first.defender.casualties() <= side.men);
    }

    #[test]
    fn test_readiness_edge_favors_ready_side() {
        let config = ClashConfig::default();
        let ready = RegimentStats {
            readiness: 10.0,
            ..RegimentStats::default()
        };
        let tired = RegimentStats {
            readiness: 0.0,
            ..RegimentStats::default()
        };
        let outcome = resolve_clash(&ready, &tired, &config, None);
        assert!(outcome.defender.casualties() > outcome.attacker.casualties());
    }

    #[test]
    fn test_fight_clash_applies_losses() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 1);
        let owner = ctx.store.create();
        let a = ctx.store.create();
        let d = ctx.store.create();
        for id in [a, d] {
            ctx.store.insert(
                id,
                Regiment {
                    owner,
                    stats: RegimentStats::default(),
                },
            );
        }
        let outcome = fight_clash(&mut ctx, a, d, false).unwrap();
        let stats = &ctx.store.get::<Regiment>(d).unwrap().stats;
        assert_eq!(stats.killed, outcome.defender.killed);
        assert_eq!(stats.wounded, outcome.defender.wounded);
        assert!(stats.morale < 100.0);
        assert!(fight_clash(&mut ctx, a, owner, false).is_none());
    }
}
