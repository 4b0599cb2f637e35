//! Game rules on top of the entity store.
//!
//! - Board with tile entities, match finding and cascades
//! - Resource banks filled by cleared tiles
//! - Health, damage and defeat
//! - Turn state machine
//! - Click input (selection, targeting, cancel)
//! - Regiment clashes
//! - Encounter setup, combat reset and invariants

pub mod bank;
pub mod board;
mod clash;
mod components;
pub mod health;
pub mod input;
mod invariants;
mod registry;
mod setup;
pub mod turn;

pub use bank::{ResourceBank, Shortfall};
pub use board::{
    CascadeReport, ClearedTile, GravityMove, KindGrid, SwapRejection, board_from_layout,
    clear_and_cascade, find_matches, generate_board, legal_swaps,
};
pub use clash::{
    ClashConfig, ClashOutcome, Regiment, RegimentStats, SideLosses, armor_reduction, attack_dice,
    fight_clash, harmonic, kill_ratio, resolve_clash,
};
pub use components::{Board, Combatant, Health, Position, Selection, Targeting, Tile};
pub use invariants::{InvariantViolation, assert_invariants, check_invariants};
pub use registry::{ResourceRegistry, ResourceType};
pub use setup::{build_encounter, reset_combat, spawn_combatant};
pub use turn::{ActionSource, TurnPhase, TurnState};
