//! Serializable digest of a world.
//!
//! Two digests compare equal exactly when the observable game state (board,
//! combatants, banks, effects, abilities, turn bookkeeping) is the same.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::abilities::{self, Ability};
use crate::ecs::{EntityId, EntityStore};
use crate::effects::{self, Effect};
use crate::game::{Board, Combatant, Health, Position, Tile, bank, board, turn};

/// One effect on a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDigest {
    /// Slug.
    pub slug: String,
    /// Counter.
    pub count: i64,
    /// Remaining turns.
    pub turns: Option<u32>,
    /// Stack key.
    pub stack_key: Option<String>,
}

/// One equipped ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityDigest {
    /// Catalog name.
    pub name: String,
    /// Remaining cooldown.
    pub cooldown: u32,
}

/// One combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantDigest {
    /// Entity id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Current health.
    pub health: i64,
    /// Health cap.
    pub max_health: i64,
    /// Bank contents.
    pub bank: BTreeMap<String, u32>,
    /// Effects in application order.
    pub effects: Vec<EffectDigest>,
    /// Abilities in equip order.
    pub abilities: Vec<AbilityDigest>,
}

/// Turn bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnDigest {
    /// Owner holding the turn.
    pub active_owner: Option<EntityId>,
    /// Phase name.
    pub phase: String,
    /// Rotations so far.
    pub rotations: u32,
    /// Actions committed so far.
    pub actions_committed: u64,
    /// Extra turns granted so far.
    pub extra_turns: u32,
}

/// Whole-world digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldDigest {
    /// Live entities.
    pub entities: usize,
    /// Board rows, row 0 first, in layout syntax; `.` marks an inactive cell.
    pub board: Vec<String>,
    /// Combatants in id order.
    pub combatants: Vec<CombatantDigest>,
    /// Turn state, once turns exist.
    pub turn: Option<TurnDigest>,
}

fn board_rows(store: &EntityStore) -> Vec<String> {
    let Some((_, grid)) = store.singleton::<Board>() else {
        return Vec::new();
    };
    (0..grid.rows())
        .map(|row| {
            (0..grid.cols())
                .map(|col| {
                    let pos = Position::new(row, col);
                    board::tile_entity(store, pos)
                        .and_then(|id| store.get::<Tile>(id))
                        .filter(|t| t.active)
                        .map_or_else(|| ".".to_string(), |t| t.kind.clone())
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn combatant(store: &EntityStore, id: EntityId, name: &str) -> CombatantDigest {
    let health = store.get::<Health>(id).copied().unwrap_or(Health::full(0));
    CombatantDigest {
        id,
        name: name.to_string(),
        health: health.current,
        max_health: health.max,
        bank: bank::balance(store, id),
        effects: effects::effects_of(store, id)
            .into_iter()
            .filter_map(|e| store.get::<Effect>(e))
            .map(|e| EffectDigest {
                slug: e.slug.clone(),
                count: e.count,
                turns: e.turns,
                stack_key: e.stack_key.clone(),
            })
            .collect(),
        abilities: abilities::abilities_of(store, id)
            .into_iter()
            .filter_map(|a| {
                store.get::<Ability>(a).map(|ab| AbilityDigest {
                    name: ab.definition.name.clone(),
                    cooldown: abilities::cooldown_remaining(store, a),
                })
            })
            .collect(),
    }
}

impl WorldDigest {
    /// Digest `store`.
    #[must_use]
    pub fn capture(store: &EntityStore) -> Self {
        let combatants = store
            .query::<Combatant>()
            .map(|(id, c)| combatant(store, id, &c.name))
            .collect();
        let turn = turn::turn_state(store).map(|s| TurnDigest {
            active_owner: turn::active_owner(store),
            phase: format!("{:?}", s.phase),
            rotations: s.rotations,
            actions_committed: s.actions_committed,
            extra_turns: s.extra_turns,
        });
        Self {
            entities: store.len(),
            board: board_rows(store),
            combatants,
            turn,
        }
    }

    /// Pretty JSON.
    ///
    /// # Errors
    ///
    /// Serialization failure.
    pub fn to_json(&self) -> crate::EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::SimulationContext;
    use crate::game::board_from_layout;

    #[test]
    fn test_board_rows_use_layout_syntax() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        board_from_layout(&mut ctx, &["fire water", "hex ."]);
        let digest = WorldDigest::capture(&ctx.store);
        assert_eq!(digest.board, vec!["fire water".to_string(), "hex .".to_string()]);
        assert!(digest.combatants.is_empty());
        assert!(digest.turn.is_none());
        assert!(digest.to_json().unwrap().contains("\"board\""));
    }

    #[test]
    fn test_fork_digests_match_except_ids() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        board_from_layout(&mut ctx, &["fire water", "hex light"]);
        let (fork, _) = ctx.fork();
        assert_eq!(
            WorldDigest::capture(&fork.store).board,
            WorldDigest::capture(&ctx.store).board
        );
    }
}
