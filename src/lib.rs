// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Tessera: a deterministic rules engine for turn-based tactical match-3
//! combat.
//!
//! Two or more combatants share one tile board. Swapping tiles into runs
//! clears them into resource banks, cascades refill the board, banked
//! resources pay for abilities, and abilities apply effects. Every state
//! change travels as an [`events::Event`] through one synchronous
//! dispatcher, and the AI plans by forking the whole world and scoring
//! each candidate action in the sandbox.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │   CLI · match runner · tournament · replay  │
//! ├─────────────────────────────────────────────┤
//! │   AI planner (fork, simulate, score)        │
//! ├─────────────────────────────────────────────┤
//! │   input · abilities · turn · effects        │
//! │   board/cascade · bank · health · clash     │
//! ├─────────────────────────────────────────────┤
//! │   SimulationContext: store + dispatcher     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Determinism
//!
//! All randomness flows through the context's seeded RNG; the same
//! configuration and seed always produce the same match.

pub mod abilities;
pub mod ai;
pub mod config;
pub mod context;
pub mod ecs;
pub mod effects;
pub mod error;
pub mod events;
pub mod game;
pub mod replay;
pub mod session;
pub mod snapshot;
pub mod tournament;

pub use config::{CombatantSpec, Controller, EngineConfig};
pub use context::SimulationContext;
pub use ecs::{EntityId, EntityStore};
pub use error::{EngineError, EngineResult};
pub use events::{Event, EventKind};
pub use session::{Match, MatchResult, run_match};
