//! Engine configuration.
//!
//! Everything tunable lives in [`EngineConfig`]. The struct deserializes from
//! JSON with every field optional; missing fields take the defaults below.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ai::Personality;
use crate::error::{EngineError, EngineResult};
use crate::game::{ClashConfig, ResourceRegistry, ResourceType};

/// Who drives a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Controller {
    /// Actions arrive as input events.
    Human,
    /// The clone-and-score planner acts.
    #[default]
    Ai,
}

/// One combatant in the encounter roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatantSpec {
    /// Display name; also the key match results are reported under.
    pub name: String,
    /// Starting and maximum health.
    pub max_health: i64,
    /// Human or AI.
    pub controller: Controller,
    /// Scoring weights used when AI-controlled.
    pub personality: Personality,
    /// Ability names equipped at the start, resolved against the catalog.
    pub abilities: Vec<String>,
}

impl Default for CombatantSpec {
    fn default() -> Self {
        Self {
            name: "Combatant".to_string(),
            max_health: 40,
            controller: Controller::Ai,
            personality: Personality::Balanced,
            abilities: Vec::new(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Board height.
    pub board_rows: u16,
    /// Board width.
    pub board_cols: u16,
    /// Shortest run that counts as a match.
    pub min_run: usize,
    /// Group size that earns an extra turn.
    pub extra_turn_threshold: usize,
    /// Ticks between an AI receiving control and dispatching its action.
    pub ai_delay_ticks: u64,
    /// Turn rotations before a match is declared a draw.
    pub max_turns: u32,
    /// Hard cap on driven ticks per match.
    pub max_ticks: u64,
    /// Tile/resource types.
    pub resources: Vec<ResourceType>,
    /// Encounter roster, in turn order.
    pub combatants: Vec<CombatantSpec>,
    /// Regiment clash constants.
    pub clash: ClashConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board_rows: 8,
            board_cols: 8,
            min_run: 3,
            extra_turn_threshold: 4,
            ai_delay_ticks: 2,
            max_turns: 120,
            max_ticks: 20_000,
            resources: vec![
                ResourceType::new("fire", "#d9482b"),
                ResourceType::new("water", "#2b7bd9"),
                ResourceType::new("nature", "#3fa34d"),
                ResourceType::new("hex", "#8e44ad"),
                ResourceType::new("light", "#f1c40f"),
            ],
            combatants: vec![
                CombatantSpec {
                    name: "Warden".to_string(),
                    personality: Personality::Balanced,
                    abilities: ["fireball", "verdant_surge", "aegis", "tidal_tap"]
                        .map(String::from)
                        .to_vec(),
                    ..CombatantSpec::default()
                },
                CombatantSpec {
                    name: "Hexer".to_string(),
                    personality: Personality::Aggressive,
                    abilities: ["venom", "hex_blast", "kindle", "battle_cry", "siphon"]
                        .map(String::from)
                        .to_vec(),
                    ..CombatantSpec::default()
                },
            ],
            clash: ClashConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] on malformed JSON.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if serialization fails.
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> EngineResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reject configurations no encounter can be built from.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> EngineResult<()> {
        if self.board_rows == 0 || self.board_cols == 0 {
            return Err(EngineError::InvalidBoard {
                rows: self.board_rows,
                cols: self.board_cols,
            });
        }
        if self.combatants.len() < 2 {
            return Err(EngineError::TooFewCombatants(self.combatants.len()));
        }
        if !self.resources.iter().any(|r| r.spawnable) {
            return Err(EngineError::NoSpawnableTypes);
        }
        Ok(())
    }

    /// Build the read-only tile type registry.
    #[must_use]
    pub fn registry(&self) -> ResourceRegistry {
        ResourceRegistry::new(self.resources.clone())
    }
}
