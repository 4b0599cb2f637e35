//! Parallel tournament runner.
//!
//! Runs one match per seed on a rayon pool and folds the results into
//! [`TournamentStats`]. Each worker accumulates its own stats and the
//! partial stats are merged at the end, so nothing is shared in the hot
//! path.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::session::{MatchResult, run_match};

/// Aggregate record of one roster entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantRecord {
    /// Display name.
    pub name: String,
    /// Matches won.
    pub wins: u64,
    /// Matches lost (another combatant won).
    pub losses: u64,
    /// Sum of final health, for averaging.
    pub total_final_health: i64,
}

/// Aggregate over many matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentStats {
    /// Matches played.
    pub games_played: u64,
    /// Matches with no winner.
    pub draws: u64,
    /// Sum of rotations.
    pub total_turns: u64,
    /// Sum of committed actions.
    pub total_actions: u64,
    /// Sum of extra turns granted.
    pub total_extra_turns: u64,
    /// Roster entries in turn order.
    pub combatants: Vec<CombatantRecord>,
}

impl TournamentStats {
    /// Empty stats for the roster of `config`.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            combatants: config
                .combatants
                .iter()
                .map(|c| CombatantRecord {
                    name: c.name.clone(),
                    ..CombatantRecord::default()
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Fold one match in.
    pub fn add_result(&mut self, result: &MatchResult) {
        self.games_played += 1;
        self.total_turns += u64::from(result.turns);
        self.total_actions += result.actions;
        self.total_extra_turns += u64::from(result.extra_turns);
        if result.winner.is_none() {
            self.draws += 1;
        }
        for (record, outcome) in self.combatants.iter_mut().zip(&result.combatants) {
            record.total_final_health += outcome.health;
            match &result.winner {
                Some(winner) if *winner == record.name => record.wins += 1,
                Some(_) => record.losses += 1,
                None => {}
            }
        }
    }

    /// Merge another partial aggregate.
    pub fn merge(&mut self, other: &TournamentStats) {
        self.games_played += other.games_played;
        self.draws += other.draws;
        self.total_turns += other.total_turns;
        self.total_actions += other.total_actions;
        self.total_extra_turns += other.total_extra_turns;
        if self.combatants.is_empty() {
            self.combatants.clone_from(&other.combatants);
            return;
        }
        for (mine, theirs) in self.combatants.iter_mut().zip(&other.combatants) {
            mine.wins += theirs.wins;
            mine.losses += theirs.losses;
            mine.total_final_health += theirs.total_final_health;
        }
    }

    /// Mean rotations per match.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_turns(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        self.total_turns as f64 / self.games_played as f64
    }

    /// Win rate of roster entry `index`, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn win_rate(&self, index: usize) -> f64 {
        match self.combatants.get(index) {
            Some(record) if self.games_played > 0 => {
                record.wins as f64 / self.games_played as f64
            }
            _ => 0.0,
        }
    }
}

/// Run one match per seed in parallel, calling `on_finished` after each.
///
/// `threads` sizes a dedicated pool; `None` uses rayon's global pool.
///
/// # Errors
///
/// An invalid configuration, or a pool that cannot be built.
pub fn run_tournament_with<F>(
    config: &EngineConfig,
    seeds: &[u64],
    threads: Option<usize>,
    on_finished: F,
) -> EngineResult<TournamentStats>
where
    F: Fn(&MatchResult) + Sync,
{
    config.validate()?;
    let work = || {
        seeds
            .par_iter()
            .map(|&seed| run_match(config, seed))
            .try_fold(
                || TournamentStats::new(config),
                |mut stats, result| {
                    let result = result?;
                    on_finished(&result);
                    stats.add_result(&result);
                    EngineResult::Ok(stats)
                },
            )
            .try_reduce(
                || TournamentStats::new(config),
                |mut a, b| {
                    a.merge(&b);
                    Ok(a)
                },
            )
    };
    let stats = match threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()?
            .install(work)?,
        None => work()?,
    };
    info!(
        target: "tessera::turn",
        games = stats.games_played,
        draws = stats.draws,
        average_turns = stats.average_turns(),
        "tournament finished"
    );
    Ok(stats)
}

/// Run one match per seed in parallel.
///
/// # Errors
///
/// See [`run_tournament_with`].
pub fn run_tournament(
    config: &EngineConfig,
    seeds: &[u64],
    threads: Option<usize>,
) -> EngineResult<TournamentStats> {
    run_tournament_with(config, seeds, threads, |_| {})
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::error::EngineError;
    use crate::session::{CombatantOutcome, MatchEnd};

    fn quick_config() -> EngineConfig {
        EngineConfig {
            ai_delay_ticks: 0,
            max_turns: 30,
            ..EngineConfig::default()
        }
    }

    fn outcome(winner: Option<&str>, turns: u32) -> MatchResult {
        MatchResult {
            seed: 0,
            winner: winner.map(String::from),
            end: if winner.is_some() {
                MatchEnd::Defeat
            } else {
                MatchEnd::TurnLimit
            },
            turns,
            actions: u64::from(turns),
            ticks: 0,
            extra_turns: 1,
            combatants: vec![
                CombatantOutcome {
                    name: "Warden".to_string(),
                    health: 10,
                    max_health: 40,
                },
                CombatantOutcome {
                    name: "Hexer".to_string(),
                    health: 0,
                    max_health: 40,
                },
            ],
        }
    }

    #[test]
    fn test_add_and_merge() {
        let config = EngineConfig::default();
        let mut a = TournamentStats::new(&config);
        a.add_result(&outcome(Some("Warden"), 10));
        let mut b = TournamentStats::new(&config);
        b.add_result(&outcome(None, 20));
        a.merge(&b);

        assert_eq!(a.games_played, 2);
        assert_eq!(a.draws, 1);
        assert_eq!(a.combatants[0].wins, 1);
        assert_eq!(a.combatants[1].losses, 1);
        assert_eq!(a.combatants[0].total_final_health, 20);
        assert!((a.average_turns() - 15.0).abs() < f64::EPSILON);
        assert!((a.win_rate(0) - 0.5).abs() < f64::EPSILON);
        assert!(a.win_rate(9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let config = quick_config();
        let seeds: Vec<u64> = (100..106).collect();
        let parallel = run_tournament(&config, &seeds, Some(2)).unwrap();

        let mut sequential = TournamentStats::new(&config);
        for &seed in &seeds {
            sequential.add_result(&run_match(&config, seed).unwrap());
        }
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_observer_sees_every_match() {
        let seen = AtomicU64::new(0);
        let seeds = [1, 2, 3];
        let stats = run_tournament_with(&quick_config(), &seeds, None, |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 3);
        assert_eq!(stats.games_played, 3);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = quick_config();
        config.board_rows = 0;
        assert!(matches!(
            run_tournament(&config, &[1], None),
            Err(EngineError::InvalidBoard { .. })
        ));
    }
}
