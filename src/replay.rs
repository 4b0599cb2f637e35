//! Match replay.
//!
//! Matches are fully deterministic, so a recording is only the seed and the
//! configuration. No state deltas are stored: to view action N the match is
//! re-simulated from the start.
//!
//! - **Forward**: keep driving the live match to the next committed action
//! - **Backward**: re-run from the start to the previous action
//! - **Jump**: re-run from the start to action N

mod text;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use text::render_text;

use crate::config::EngineConfig;
use crate::context::SimulationContext;
use crate::error::{EngineError, EngineResult};
use crate::session::{Match, MatchResult};

/// Everything needed to replay a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Match seed.
    pub seed: u64,
    /// Engine configuration the match ran with.
    pub config: EngineConfig,
}

impl Recording {
    /// A recording of `config` run with `seed`.
    #[must_use]
    pub fn new(seed: u64, config: EngineConfig) -> Self {
        Self { seed, config }
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Malformed JSON.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save as pretty JSON.
    ///
    /// # Errors
    ///
    /// Serialization or write failure.
    pub fn save(&self, path: &Path) -> EngineResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load a recording saved with [`Recording::save`].
    ///
    /// # Errors
    ///
    /// Read or parse failure.
    pub fn load(path: &Path) -> EngineResult<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }
}

/// Steps through a recorded match one committed action at a time.
pub struct ReplayEngine {
    recording: Recording,
    game: Match,
    action: usize,
}

impl std::fmt::Debug for ReplayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayEngine")
            .field("seed", &self.recording.seed)
            .field("action", &self.action)
            .field("is_over", &self.game.is_over())
            .finish_non_exhaustive()
    }
}

impl ReplayEngine {
    /// Start at the opening position, before any action.
    ///
    /// # Errors
    ///
    /// The recorded configuration cannot build an encounter.
    pub fn new(recording: Recording) -> EngineResult<Self> {
        let game = Match::new(&recording.config, recording.seed)?;
        Ok(Self {
            recording,
            game,
            action: 0,
        })
    }

    /// Start after `target` committed actions.
    ///
    /// # Errors
    ///
    /// [`EngineError::StepOutOfBounds`] if the match ends first.
    pub fn new_at_action(recording: Recording, target: usize) -> EngineResult<Self> {
        let mut engine = Self::new(recording)?;
        while engine.action < target {
            if !engine.game.step_action() {
                return Err(EngineError::StepOutOfBounds {
                    requested: target,
                    available: engine.action,
                });
            }
            engine.action += 1;
        }
        Ok(engine)
    }

    /// The recording.
    #[must_use]
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Actions replayed so far.
    #[must_use]
    pub fn action(&self) -> usize {
        self.action
    }

    /// The replayed world.
    #[must_use]
    pub fn context(&self) -> &SimulationContext {
        self.game.context()
    }

    /// Whether the match has ended.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.game.is_over()
    }

    /// Result at the current position.
    #[must_use]
    pub fn result(&self) -> MatchResult {
        self.game.result()
    }

    /// Advance to the next committed action.
    ///
    /// # Errors
    ///
    /// [`EngineError::GameOver`] if the match ends before another action.
    pub fn step_forward(&mut self) -> EngineResult<()> {
        if self.game.is_over() || !self.game.step_action() {
            return Err(EngineError::GameOver);
        }
        self.action += 1;
        Ok(())
    }

    /// Go back one action by re-running from the start.
    ///
    /// # Errors
    ///
    /// [`EngineError::StepOutOfBounds`] at the opening position.
    pub fn step_backward(&mut self) -> EngineResult<()> {
        let Some(target) = self.action.checked_sub(1) else {
            return Err(EngineError::StepOutOfBounds {
                requested: 0,
                available: 0,
            });
        };
        self.goto_action(target)
    }

    /// Jump to action `target`, re-running from the start when it lies
    /// behind the current position.
    ///
    /// # Errors
    ///
    /// [`EngineError::StepOutOfBounds`] if the match ends first.
    pub fn goto_action(&mut self, target: usize) -> EngineResult<()> {
        if target < self.action {
            *self = Self::new_at_action(self.recording.clone(), target)?;
            return Ok(());
        }
        while self.action < target {
            if !self.game.step_action() {
                return Err(EngineError::StepOutOfBounds {
                    requested: target,
                    available: self.action,
                });
            }
            self.action += 1;
        }
        Ok(())
    }

    /// Drive to the end of the match.
    pub fn run_to_end(&mut self) -> MatchResult {
        while self.step_forward().is_ok() {}
        self.game.result()
    }

    /// Render the current position as text.
    #[must_use]
    pub fn render_text(&self) -> String {
        render_text(&self.game.context().store, self.action)
    }
}
