//! Output formatting utilities for CLI.

#![allow(clippy::format_push_string)]

use serde::Serialize;
use tessera::game::{ClashOutcome, RegimentStats};
use tessera::session::MatchResult;
use tessera::tournament::TournamentStats;

/// Format a match result as human-readable text.
pub(super) fn format_match_text(result: &MatchResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Match Result (seed: {})\n", result.seed));
    match &result.winner {
        Some(name) => output.push_str(&format!("  Winner: {name}\n")),
        None => output.push_str("  Winner: Draw\n"),
    }
    output.push_str(&format!("  Ended by: {:?}\n", result.end));
    output.push_str(&format!(
        "  Turns: {}  Actions: {}  Extra turns: {}  Ticks: {}\n\n",
        result.turns, result.actions, result.extra_turns, result.ticks
    ));

    for combatant in &result.combatants {
        output.push_str(&format!(
            "  {}: {}/{}",
            combatant.name, combatant.health, combatant.max_health
        ));
        if combatant.health <= 0 {
            output.push_str(" [defeated]");
        }
        output.push('\n');
    }

    output
}

/// JSON-serializable tournament summary.
#[derive(Debug, Serialize)]
pub(super) struct JsonTournamentResult {
    /// Games played.
    pub(super) games: u64,
    /// Draws.
    pub(super) draws: u64,
    /// Mean rotations per game.
    pub(super) avg_turns: f64,
    /// Per-combatant rows.
    pub(super) combatants: Vec<JsonCombatantResult>,
}

/// JSON-serializable combatant row.
#[derive(Debug, Serialize)]
pub(super) struct JsonCombatantResult {
    /// Display name.
    pub(super) name: String,
    /// Wins.
    pub(super) wins: u64,
    /// Losses.
    pub(super) losses: u64,
    /// Win rate in `0.0..=1.0`.
    pub(super) win_rate: f64,
}

impl JsonTournamentResult {
    /// Create from aggregated stats.
    pub(super) fn from_stats(stats: &TournamentStats) -> Self {
        Self {
            games: stats.games_played,
            draws: stats.draws,
            avg_turns: stats.average_turns(),
            combatants: stats
                .combatants
                .iter()
                .enumerate()
                .map(|(i, record)| JsonCombatantResult {
                    name: record.name.clone(),
                    wins: record.wins,
                    losses: record.losses,
                    win_rate: stats.win_rate(i),
                })
                .collect(),
        }
    }
}

/// Format tournament results as text.
pub(super) fn format_tournament_text(stats: &TournamentStats) -> String {
    let mut output = String::new();

    output.push_str(&format!("Tournament Results ({} games)\n", stats.games_played));
    output.push_str(&format!(
        "  Draws: {}  Avg turns: {:.1}  Extra turns: {}\n\n",
        stats.draws,
        stats.average_turns(),
        stats.total_extra_turns
    ));
    output.push_str(&format!(
        "  {:<16} {:>8} {:>8} {:>9}\n",
        "Combatant", "Wins", "Losses", "Win rate"
    ));
    for (i, record) in stats.combatants.iter().enumerate() {
        output.push_str(&format!(
            "  {:<16} {:>8} {:>8} {:>8.1}%\n",
            record.name,
            record.wins,
            record.losses,
            stats.win_rate(i) * 100.0
        ));
    }

    output
}

/// Format tournament results as CSV.
pub(super) fn format_tournament_csv(stats: &TournamentStats) -> String {
    let mut output = String::from("combatant,games,wins,losses,draws,win_rate,avg_turns\n");
    for (i, record) in stats.combatants.iter().enumerate() {
        output.push_str(&format!(
            "{},{},{},{},{},{:.4},{:.2}\n",
            record.name,
            stats.games_played,
            record.wins,
            record.losses,
            stats.draws,
            stats.win_rate(i),
            stats.average_turns()
        ));
    }
    output
}

/// JSON-serializable clash report.
#[derive(Debug, Serialize)]
pub(super) struct JsonClashResult<'a> {
    /// Attacker before the clash.
    pub(super) attacker: &'a RegimentStats,
    /// Defender before the clash.
    pub(super) defender: &'a RegimentStats,
    /// Losses on both sides.
    pub(super) outcome: &'a ClashOutcome,
}

/// Format a clash as text.
pub(super) fn format_clash_text(
    attacker: &RegimentStats,
    defender: &RegimentStats,
    outcome: &ClashOutcome,
) -> String {
    let mut output = String::new();
    for (label, before, losses) in [
        ("Attacker", attacker, &outcome.attacker),
        ("Defender", defender, &outcome.defender),
    ] {
        output.push_str(&format!(
            "{label}: {} men (skill {:.1}, armor {:.1}, maneuver {:.1})\n",
            before.active(),
            before.combat_skill,
            before.armor,
            before.maneuver
        ));
        output.push_str(&format!(
            "  dice {:.2}, hits {:.2}, killed {}, wounded {}, morale -{:.2}\n",
            losses.dice, losses.hits, losses.killed, losses.wounded, losses.morale_loss
        ));
    }
    output
}
