//! Enumerating legal actions.

use crate::abilities::{self, Ability, AbilityTarget};
use crate::ecs::{EntityId, EntityRemap, EntityStore};
use crate::events::Event;
use crate::game::{Board, Position, Tile, bank, board, turn};

/// One action an owner could take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// Swap two adjacent tiles.
    Swap {
        /// First cell.
        a: Position,
        /// Second cell.
        b: Position,
    },
    /// Cast an ability, with a tile target if it needs one.
    Cast {
        /// Ability entity.
        ability: EntityId,
        /// Tile target.
        target: Option<Position>,
    },
    /// Nothing legal; end the turn.
    Pass,
}

impl Candidate {
    /// The intent event a human would emit for this action.
    #[must_use]
    pub fn intent(self, owner: EntityId) -> Event {
        match self {
            Candidate::Swap { a, b } => Event::SwapRequested { owner, a, b },
            Candidate::Cast { ability, target } => Event::AbilityCastRequested {
                ability,
                owner,
                target,
            },
            Candidate::Pass => Event::EndTurnRequested { owner },
        }
    }

    /// Rewrite entity references for a forked world.
    #[must_use]
    pub fn remapped(self, remap: &EntityRemap) -> Self {
        match self {
            Candidate::Cast { ability, target } => Candidate::Cast {
                ability: remap.apply(ability),
                target,
            },
            other => other,
        }
    }
}

/// Every legal swap and every castable ability of `owner`.
///
/// Swaps come first in board order, then casts in equip order; tile-targeted
/// abilities contribute one candidate per active tile. Empty when `owner`
/// may not act.
#[must_use]
pub fn enumerate_candidates(store: &EntityStore, owner: EntityId, min_run: usize) -> Vec<Candidate> {
    if turn::check_can_act(store, owner).is_err() {
        return Vec::new();
    }
    let mut out: Vec<Candidate> = board::legal_swaps(store, min_run)
        .into_iter()
        .map(|(a, b)| Candidate::Swap { a, b })
        .collect();

    let targets: Vec<Position> = store
        .singleton::<Board>()
        .map(|(_, grid)| {
            grid.positions()
                .filter(|&p| {
                    board::tile_entity(store, p)
                        .and_then(|id| store.get::<Tile>(id))
                        .is_some_and(|t| t.active)
                })
                .collect()
        })
        .unwrap_or_default();

    for ability in abilities::abilities_of(store, owner) {
        let Ok(def) = abilities::check_castable(store, ability, owner) else {
            continue;
        };
        if !bank::can_afford(store, owner, &def.cost) {
            continue;
        }
        match store.get::<Ability>(ability).map(|a| a.definition.target) {
            Some(AbilityTarget::Tile) => out.extend(targets.iter().map(|&p| Candidate::Cast {
                ability,
                target: Some(p),
            })),
            Some(AbilityTarget::None) => out.push(Candidate::Cast {
                ability,
                target: None,
            }),
            None => {}
        }
    }
    out
}
