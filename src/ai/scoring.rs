//! Owner snapshots and the weighted evaluator.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::abilities::{self, Ability};
use crate::ecs::{EntityId, EntityStore};
use crate::effects::{self, Effect};
use crate::game::{Health, bank, turn};

const AFFLICTIONS: &[&str] = &["poison", "burn"];

/// Weights of the outcome features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Per point of opponent health lost.
    pub damage: f64,
    /// Per opponent defeated.
    pub lethal: f64,
    /// Per point of own health regained.
    pub healing: f64,
    /// Per point of own health lost.
    pub harm_taken: f64,
    /// Per resource unit gained (negative when spent).
    pub resources: f64,
    /// Extra per unit gained of a type some owned ability costs.
    pub wanted_resources: f64,
    /// Per ability that became affordable.
    pub unlock: f64,
    /// Per extra turn earned.
    pub extra_turn: f64,
    /// Per harmful effect added to opponents.
    pub affliction: f64,
    /// Per effect added to the owner that is not harmful.
    pub buff: f64,
    /// Upper bound of the random tie-break added to every score.
    pub jitter: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            damage: 2.0,
            lethal: 500.0,
            healing: 1.5,
            harm_taken: 2.0,
            resources: 1.0,
            wanted_resources: 1.0,
            unlock: 4.0,
            extra_turn: 6.0,
            affliction: 3.0,
            buff: 2.0,
            jitter: 0.25,
        }
    }
}

/// What the planner compares before and after a simulated action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnerSnapshot {
    /// Owner health.
    pub health: i64,
    /// Summed health of living opponents.
    pub opponent_health: i64,
    /// Living opponents.
    pub opponents_alive: usize,
    /// Owner bank.
    pub resources: BTreeMap<String, u32>,
    /// Resource types some owned ability costs.
    pub wanted: BTreeSet<String>,
    /// Owned abilities whose cost the bank covers.
    pub affordable: usize,
    /// Extra turns granted in this world so far.
    pub extra_turns: u32,
    /// Harmful effects on opponents.
    pub afflictions: usize,
    /// Other effects on the owner.
    pub buffs: usize,
}

impl OwnerSnapshot {
    /// Capture the state relevant to `owner`.
    #[must_use]
    pub fn capture(store: &EntityStore, owner: EntityId) -> Self {
        let health_of = |id| store.get::<Health>(id).map_or(0, |h| h.current);
        let opponents: Vec<EntityId> = turn::combatants(store)
            .into_iter()
            .filter(|&c| c != owner && store.get::<Health>(c).is_some_and(Health::is_alive))
            .collect();
        let harmful = |id: EntityId| {
            store
                .get::<Effect>(id)
                .is_some_and(|e| AFFLICTIONS.contains(&e.slug.as_str()) || e.metadata.flag("harmful"))
        };

        let owned = abilities::abilities_of(store, owner);
        let mut wanted = BTreeSet::new();
        let mut affordable = 0;
        for ability in &owned {
            if let Some(a) = store.get::<Ability>(*ability) {
                wanted.extend(a.definition.cost.keys().cloned());
                if bank::can_afford(store, owner, &a.definition.cost) {
                    affordable += 1;
                }
            }
        }

        Self {
            health: health_of(owner),
            opponent_health: opponents.iter().map(|&o| health_of(o)).sum(),
            opponents_alive: opponents.len(),
            resources: bank::balance(store, owner),
            wanted,
            affordable,
            extra_turns: turn::turn_state(store).map_or(0, |s| s.extra_turns),
            afflictions: opponents
                .iter()
                .flat_map(|&o| effects::effects_of(store, o))
                .filter(|&e| harmful(e))
                .count(),
            buffs: effects::effects_of(store, owner)
                .into_iter()
                .filter(|&e| !harmful(e))
                .count(),
        }
    }
}

/// Scores an action from the owner's before/after snapshots.
pub trait Evaluator {
    /// Higher is better.
    fn score(&self, before: &OwnerSnapshot, after: &OwnerSnapshot) -> f64;
}

/// Linear combination of snapshot differences.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedEvaluator {
    /// Feature weights.
    pub weights: ScoreWeights,
}

impl WeightedEvaluator {
    /// Evaluator with `weights`.
    #[must_use]
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }
}

fn delta<T: Into<f64>>(before: T, after: T) -> f64 {
    after.into() - before.into()
}

impl Evaluator for WeightedEvaluator {
    #[allow(clippy::cast_precision_loss)]
    fn score(&self, before: &OwnerSnapshot, after: &OwnerSnapshot) -> f64 {
        let w = &self.weights;
        let mut score = 0.0;

        score += w.damage * (before.opponent_health - after.opponent_health) as f64;
        score += w.lethal * before.opponents_alive.saturating_sub(after.opponents_alive) as f64;
        let own = (after.health - before.health) as f64;
        score += if own >= 0.0 { w.healing * own } else { w.harm_taken * own };

        let kinds: BTreeSet<&String> = before.resources.keys().chain(after.resources.keys()).collect();
        for kind in kinds {
            let gained = delta(
                before.resources.get(kind).copied().unwrap_or(0),
                after.resources.get(kind).copied().unwrap_or(0),
            );
            score += w.resources * gained;
            if gained > 0.0 && before.wanted.contains(kind) {
                score += w.wanted_resources * gained;
            }
        }

        score += w.unlock * (after.affordable as f64 - before.affordable as f64);
        score += w.extra_turn * delta(before.extra_turns, after.extra_turns);
        score += w.affliction * (after.afflictions as f64 - before.afflictions as f64);
        score += w.buff * (after.buffs as f64 - before.buffs as f64);
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap() -> OwnerSnapshot {
        OwnerSnapshot {
            health: 20,
            opponent_health: 20,
            opponents_alive: 1,
            resources: BTreeMap::from([("fire".to_string(), 2)]),
            wanted: BTreeSet::from(["fire".to_string()]),
            ..OwnerSnapshot::default()
        }
    }

    #[test]
    fn test_unchanged_scores_zero() {
        let eval = WeightedEvaluator::default();
        assert!(eval.score(&snap(), &snap()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lethal_dominates_resources() {
        let eval = WeightedEvaluator::default();
        let mut kill = snap();
        kill.opponent_health = 0;
        kill.opponents_alive = 0;
        let mut hoard = snap();
        hoard.resources.insert("water".to_string(), 30);
        assert!(eval.score(&snap(), &kill) > eval.score(&snap(), &hoard));
    }

    #[test]
    fn test_wanted_resources_weigh_more() {
        let eval = WeightedEvaluator::default();
        let mut fire = snap();
        fire.resources.insert("fire".to_string(), 5);
        let mut water = snap();
        water.resources.insert("water".to_string(), 3);
        assert!(eval.score(&snap(), &fire) > eval.score(&snap(), &water));
    }

    #[test]
    fn test_taking_damage_is_penalised() {
        let eval = WeightedEvaluator::default();
        let mut hurt = snap();
        hurt.health = 15;
        assert!(eval.score(&snap(), &hurt) < 0.0);
    }
}
