//! Error types for the rules engine.
//!
//! Only configuration mistakes and outer-surface I/O surface as `Err`. Runtime
//! misses (absent components, out-of-range positions, unresolved targets) are
//! skipped by the engines, and resource shortfalls travel as ordinary events.

use std::io;

use thiserror::Error;

/// Errors raised by the engine and its outer surfaces.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An ability name was requested that the catalog does not define.
    #[error("unknown ability: {0}")]
    UnknownAbility(String),
    /// An AI personality name that does not exist.
    #[error("unknown AI personality: {0}")]
    UnknownPersonality(String),
    /// Board dimensions that cannot hold a playable grid.
    #[error("invalid board dimensions {rows}x{cols} (need at least 1x1)")]
    InvalidBoard {
        /// Requested row count.
        rows: u16,
        /// Requested column count.
        cols: u16,
    },
    /// The encounter roster has fewer than two combatants.
    #[error("need at least 2 combatants, got {0}")]
    TooFewCombatants(usize),
    /// The resource registry has no spawnable type to refill the board with.
    #[error("resource registry has no spawnable tile types")]
    NoSpawnableTypes,
    /// Configuration (de)serialization failed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// Filesystem failure while loading or saving.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// The tournament worker pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// Replay step outside the recorded match.
    #[error("action {requested} out of bounds (recorded actions: {available})")]
    StepOutOfBounds {
        /// Requested action index.
        requested: usize,
        /// Number of actions the match produces.
        available: usize,
    },
    /// Replay cannot step past the end of the match.
    #[error("match is already over")]
    GameOver,
}

/// Result alias for fallible engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
