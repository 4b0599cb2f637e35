//! Seeded AI-vs-AI match runner.
//!
//! A match is a pure function of `(config, seed)`: the same inputs always
//! produce the same [`MatchResult`]. Every combatant is AI-controlled and the
//! world is driven one `Tick` at a time until a single combatant is left
//! standing or a turn/tick limit is hit.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Controller, EngineConfig};
use crate::context::SimulationContext;
use crate::error::EngineResult;
use crate::events::Event;
use crate::game::{Combatant, Health, build_encounter, check_invariants, turn};

/// Why a match stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchEnd {
    /// At most one combatant is still alive.
    Defeat,
    /// `max_turns` rotations happened.
    TurnLimit,
    /// `max_ticks` frames were driven.
    TickLimit,
}

/// Final standing of one combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantOutcome {
    /// Display name.
    pub name: String,
    /// Health at the end.
    pub health: i64,
    /// Health cap.
    pub max_health: i64,
}

/// Outcome of one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Seed the match ran with.
    pub seed: u64,
    /// Surviving combatant, `None` on a draw.
    pub winner: Option<String>,
    /// Why it stopped.
    pub end: MatchEnd,
    /// Turn rotations.
    pub turns: u32,
    /// Committed actions.
    pub actions: u64,
    /// Frames driven.
    pub ticks: u64,
    /// Extra turns granted.
    pub extra_turns: u32,
    /// Every combatant in turn order.
    pub combatants: Vec<CombatantOutcome>,
}

/// A match in progress.
pub struct Match {
    ctx: SimulationContext,
    seed: u64,
    frame: u64,
}

impl std::fmt::Debug for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Match")
            .field("seed", &self.seed)
            .field("frame", &self.frame)
            .field("end", &self.end())
            .finish_non_exhaustive()
    }
}

impl Match {
    /// Build the encounter with every combatant AI-controlled and open the
    /// first turn.
    ///
    /// # Errors
    ///
    /// Invalid configuration or an unknown ability name.
    pub fn new(config: &EngineConfig, seed: u64) -> EngineResult<Self> {
        let mut config = config.clone();
        for spec in &mut config.combatants {
            spec.controller = Controller::Ai;
        }
        let mut ctx = build_encounter(&config, seed)?;
        turn::begin(&mut ctx);
        Ok(Self {
            ctx,
            seed,
            frame: 0,
        })
    }

    /// The live world.
    #[must_use]
    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    /// Seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Frames driven so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn alive(&self) -> usize {
        turn::combatants(&self.ctx.store)
            .into_iter()
            .filter(|&id| self.ctx.store.get::<Health>(id).is_none_or(Health::is_alive))
            .count()
    }

    /// Why the match is over, or `None` while it is running.
    #[must_use]
    pub fn end(&self) -> Option<MatchEnd> {
        let rotations = turn::turn_state(&self.ctx.store).map_or(0, |s| s.rotations);
        if self.alive() <= 1 {
            Some(MatchEnd::Defeat)
        } else if rotations >= self.ctx.config().max_turns {
            Some(MatchEnd::TurnLimit)
        } else if self.frame >= self.ctx.config().max_ticks {
            Some(MatchEnd::TickLimit)
        } else {
            None
        }
    }

    /// Whether the match is over.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.end().is_some()
    }

    /// Drive one frame. Invariant violations are logged, never fatal.
    pub fn tick(&mut self) {
        self.ctx.emit(Event::Tick { frame: self.frame });
        self.frame += 1;
        for violation in check_invariants(&self.ctx.store) {
            warn!(target: "tessera::turn", frame = self.frame, %violation, "world invariant broken");
        }
    }

    fn actions(&self) -> u64 {
        turn::turn_state(&self.ctx.store).map_or(0, |s| s.actions_committed)
    }

    /// Drive frames until one more action is committed. Returns `false` if
    /// the match ended first.
    pub fn step_action(&mut self) -> bool {
        let before = self.actions();
        while !self.is_over() {
            self.tick();
            if self.actions() > before {
                return true;
            }
        }
        false
    }

    /// Snapshot the result so far.
    #[must_use]
    pub fn result(&self) -> MatchResult {
        let store = &self.ctx.store;
        let owners = store
            .singleton::<turn::TurnOrder>()
            .map(|(_, o)| o.owners.clone())
            .unwrap_or_else(|| turn::combatants(store));
        let combatants: Vec<CombatantOutcome> = owners
            .iter()
            .filter_map(|&id| {
                let name = store.get::<Combatant>(id)?.name.clone();
                let health = store.get::<Health>(id).copied().unwrap_or(Health::full(0));
                Some(CombatantOutcome {
                    name,
                    health: health.current,
                    max_health: health.max,
                })
            })
            .collect();

        let end = self.end().unwrap_or(MatchEnd::TickLimit);
        let mut standing = combatants.iter().filter(|c| c.health > 0);
        let winner = match (end, standing.next(), standing.next()) {
            (MatchEnd::Defeat, Some(last), None) => Some(last.name.clone()),
            _ => None,
        };
        let state = turn::turn_state(store).cloned().unwrap_or_default();
        MatchResult {
            seed: self.seed,
            winner,
            end,
            turns: state.rotations,
            actions: state.actions_committed,
            ticks: self.frame,
            extra_turns: state.extra_turns,
            combatants,
        }
    }

    /// Drive the match to its end.
    #[must_use]
    pub fn run(mut self) -> MatchResult {
        while !self.is_over() {
            self.tick();
        }
        let result = self.result();
        info!(
            target: "tessera::turn",
            seed = result.seed,
            winner = ?result.winner,
            turns = result.turns,
            actions = result.actions,
            "match finished"
        );
        result
    }
}

/// Run a complete match.
///
/// # Errors
///
/// Invalid configuration or an unknown ability name.
pub fn run_match(config: &EngineConfig, seed: u64) -> EngineResult<MatchResult> {
    Ok(Match::new(config, seed)?.run())
}
