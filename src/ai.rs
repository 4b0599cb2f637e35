//! Clone-and-score AI.
//!
//! When an AI-controlled owner receives control, the planner enumerates
//! every legal swap and cast, replays each one inside a forked world, scores
//! the outcome against a snapshot of the live owner, and queues the winner.
//! The queued action is dispatched a few ticks later as an ordinary intent
//! event, so it runs through the same engines a human click would.

mod candidates;
mod planner;
mod scoring;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ecs::{Component, EntityRemap};
use crate::error::EngineError;

pub use candidates::{Candidate, enumerate_candidates};
pub use planner::{Plan, dispatch_due, install_driver, plan, schedule};
pub use scoring::{Evaluator, OwnerSnapshot, ScoreWeights, WeightedEvaluator};

/// Scoring temperament of an AI controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    /// Even weighting.
    #[default]
    Balanced,
    /// Favors damage and lethal blows.
    Aggressive,
    /// Favors banking resources and unlocking abilities.
    Hoarder,
}

impl Personality {
    /// All personalities.
    pub const ALL: [Personality; 3] = [
        Personality::Balanced,
        Personality::Aggressive,
        Personality::Hoarder,
    ];

    /// Lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Personality::Balanced => "balanced",
            Personality::Aggressive => "aggressive",
            Personality::Hoarder => "hoarder",
        }
    }

    /// Score weights for this temperament.
    #[must_use]
    pub fn weights(self) -> ScoreWeights {
        let base = ScoreWeights::default();
        match self {
            Personality::Balanced => base,
            Personality::Aggressive => ScoreWeights {
                damage: 4.0,
                lethal: 1000.0,
                healing: 1.0,
                resources: 0.5,
                wanted_resources: 0.5,
                unlock: 2.0,
                affliction: 4.0,
                ..base
            },
            Personality::Hoarder => ScoreWeights {
                damage: 1.5,
                healing: 2.0,
                resources: 2.0,
                wanted_resources: 2.0,
                unlock: 8.0,
                ..base
            },
        }
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Personality {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Personality::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| EngineError::UnknownPersonality(s.to_string()))
    }
}

/// Marks a combatant as AI-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiController {
    /// Scoring temperament.
    pub personality: Personality,
    /// Seed of the tie-break jitter.
    pub seed: u64,
    /// Decisions made so far; mixed into the jitter seed.
    pub decisions: u64,
}

impl AiController {
    /// Fresh controller.
    #[must_use]
    pub fn new(personality: Personality, seed: u64) -> Self {
        Self {
            personality,
            seed,
            decisions: 0,
        }
    }
}

impl Component for AiController {}

/// A decided action waiting for its dispatch frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiPending {
    /// Chosen action.
    pub candidate: Candidate,
    /// First frame at which it may be dispatched.
    pub due_frame: u64,
}

impl Component for AiPending {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        self.candidate = self.candidate.remapped(remap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personality_parse() {
        assert_eq!("hoarder".parse::<Personality>().unwrap(), Personality::Hoarder);
        assert!(matches!(
            "berserk".parse::<Personality>(),
            Err(EngineError::UnknownPersonality(_))
        ));
    }

    #[test]
    fn test_personality_serde_names() {
        let json = serde_json::to_string(&Personality::Aggressive).unwrap();
        assert_eq!(json, "\"aggressive\"");
    }

    #[test]
    fn test_aggressive_values_damage_more() {
        assert!(Personality::Aggressive.weights().damage > Personality::Balanced.weights().damage);
        assert!(Personality::Hoarder.weights().resources > Personality::Balanced.weights().resources);
    }
}
