//! World invariants - sanity checks that detect engine bugs.
//!
//! None of these should ever fire in a correctly implemented engine. They
//! are used by tests, fuzz targets and the match runner in debug builds.

use std::collections::BTreeSet;

use crate::abilities::{Ability, AbilityList};
use crate::ecs::EntityStore;
use crate::effects::{Effect, EffectList};
use crate::game::bank::ResourceBank;
use crate::game::turn::{ActiveTurn, TurnOrder, TurnPhase, turn_state};
use crate::game::{Board, Health, Position, Tile};

/// Invariant violation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl InvariantViolation {
    fn new(message: String) -> Self {
        Self { message }
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

fn check_board(store: &EntityStore, out: &mut Vec<InvariantViolation>) {
    let boards = store.count::<Board>();
    if boards > 1 {
        out.push(InvariantViolation::new(format!("{boards} boards exist")));
    }
    let Some((_, board)) = store.singleton::<Board>() else {
        return;
    };

    let mut seen = BTreeSet::new();
    for pos in board.positions() {
        let Some(cell) = board.tile_at(pos) else {
            out.push(InvariantViolation::new(format!("cell {pos:?} has no entity")));
            continue;
        };
        if !seen.insert(cell) {
            out.push(InvariantViolation::new(format!(
                "entity {cell} occupies more than one cell"
            )));
        }
        if !store.has::<Tile>(cell) {
            out.push(InvariantViolation::new(format!(
                "cell {pos:?} entity {cell} has no tile"
            )));
        }
        match store.get::<Position>(cell) {
            Some(&at) if at == pos => {}
            other => out.push(InvariantViolation::new(format!(
                "cell {pos:?} entity {cell} is at {other:?}"
            ))),
        }
    }

    let tiles = store.count::<Tile>();
    if tiles != board.len() {
        out.push(InvariantViolation::new(format!(
            "{tiles} tile entities for {} cells",
            board.len()
        )));
    }
}

fn check_turns(store: &EntityStore, out: &mut Vec<InvariantViolation>) {
    let Some(state) = turn_state(store) else {
        return;
    };
    if state.phase != TurnPhase::Idle {
        return;
    }
    let active: Vec<_> = store.query::<ActiveTurn>().map(|(_, a)| a.owner).collect();
    let order = store
        .singleton::<TurnOrder>()
        .map(|(_, o)| o.owners.clone())
        .unwrap_or_default();
    match active.as_slice() {
        [owner] => {
            if !order.contains(owner) {
                out.push(InvariantViolation::new(format!(
                    "active owner {owner} is not in turn order {order:?}"
                )));
            }
            if state.active_owner != Some(*owner) {
                out.push(InvariantViolation::new(format!(
                    "turn state names {:?} but active turn is {owner}",
                    state.active_owner
                )));
            }
        }
        [] if order.is_empty() => {}
        other => out.push(InvariantViolation::new(format!(
            "{} active turn singletons at a settled moment",
            other.len()
        ))),
    }
}

fn check_effects(store: &EntityStore, out: &mut Vec<InvariantViolation>) {
    for (id, effect) in store.query::<Effect>() {
        let listed = store
            .get::<EffectList>(effect.owner)
            .is_some_and(|l| l.effects.contains(&id));
        if !store.contains(effect.owner) {
            out.push(InvariantViolation::new(format!(
                "effect {id} ({}) owner {} is gone",
                effect.slug, effect.owner
            )));
        } else if !listed {
            out.push(InvariantViolation::new(format!(
                "effect {id} ({}) is not listed by owner {}",
                effect.slug, effect.owner
            )));
        }
    }
    for (owner, list) in store.query::<EffectList>() {
        for &id in &list.effects {
            if !store.has::<Effect>(id) {
                out.push(InvariantViolation::new(format!(
                    "owner {owner} lists missing effect {id}"
                )));
            }
        }
    }
}

fn check_abilities(store: &EntityStore, out: &mut Vec<InvariantViolation>) {
    for (id, ability) in store.query::<Ability>() {
        let listed = store
            .get::<AbilityList>(ability.owner)
            .is_some_and(|l| l.abilities.contains(&id));
        if !listed {
            out.push(InvariantViolation::new(format!(
                "ability {id} ({}) has dangling owner {}",
                ability.definition.name, ability.owner
            )));
        }
    }
}

/// Check every world invariant.
///
/// Returns the violations found, or an empty list if all hold. The turn
/// invariants are only checked at settled moments.
#[must_use]
pub fn check_invariants(store: &EntityStore) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    check_board(store, &mut violations);
    check_turns(store, &mut violations);
    check_effects(store, &mut violations);
    check_abilities(store, &mut violations);

    for (id, bank) in store.query::<ResourceBank>() {
        if !store.contains(bank.owner) {
            violations.push(InvariantViolation::new(format!(
                "bank {id} owner {} is gone",
                bank.owner
            )));
        }
    }
    for (id, health) in store.query::<Health>() {
        if health.current < 0 || health.current > health.max {
            violations.push(InvariantViolation::new(format!(
                "entity {id} health {}/{} out of range",
                health.current, health.max
            )));
        }
    }
    violations
}

/// Assert all invariants hold, panicking if any are violated.
///
/// Only active in debug builds. No-op in release builds.
///
/// # Panics
///
/// Panics with every violation message.
#[cfg(debug_assertions)]
pub fn assert_invariants(store: &EntityStore) {
    let violations = check_invariants(store);
    if !violations.is_empty() {
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        panic!("World invariant violations:\n  - {}", messages.join("\n  - "));
    }
}

/// No-op in release builds.
#[cfg(not(debug_assertions))]
pub fn assert_invariants(_store: &EntityStore) {}
