//! Plain-text rendering of a world.
//!
//! ```text
//! === ACTION 12 | TURN 9 | Idle ===
//!
//! BOARD (8x8):
//!   F W N H L F W N
//!   ...
//!
//! Warden [active] 31/40
//!   bank: fire 2, water 5
//!   effects: ward, regen(2t)
//!   abilities: fireball, aegis(cd 1)
//! ```

#![allow(clippy::format_push_string)]

use crate::ecs::EntityStore;
use crate::snapshot::{CombatantDigest, WorldDigest};

fn cell_glyph(kind: &str) -> String {
    match kind {
        "." => ".".to_string(),
        other => other
            .chars()
            .next()
            .map_or_else(|| "?".to_string(), |c| c.to_uppercase().to_string()),
    }
}

fn render_board(output: &mut String, digest: &WorldDigest) {
    let cols = digest
        .board
        .first()
        .map_or(0, |row| row.split_whitespace().count());
    output.push_str(&format!("BOARD ({}x{cols}):\n", digest.board.len()));
    for row in &digest.board {
        let glyphs: Vec<String> = row.split_whitespace().map(cell_glyph).collect();
        output.push_str(&format!("  {}\n", glyphs.join(" ")));
    }
    output.push('\n');
}

fn render_combatant(output: &mut String, combatant: &CombatantDigest, active: bool) {
    let marker = if active { " [active]" } else { "" };
    output.push_str(&format!(
        "{}{marker} {}/{}\n",
        combatant.name, combatant.health, combatant.max_health
    ));

    let bank: Vec<String> = combatant
        .bank
        .iter()
        .filter(|&(_, &n)| n > 0)
        .map(|(kind, n)| format!("{kind} {n}"))
        .collect();
    if !bank.is_empty() {
        output.push_str(&format!("  bank: {}\n", bank.join(", ")));
    }

    let effects: Vec<String> = combatant
        .effects
        .iter()
        .map(|e| {
            let mut label = e.slug.clone();
            if e.count > 1 {
                label.push_str(&format!(" x{}", e.count));
            }
            if let Some(turns) = e.turns {
                label.push_str(&format!("({turns}t)"));
            }
            label
        })
        .collect();
    if !effects.is_empty() {
        output.push_str(&format!("  effects: {}\n", effects.join(", ")));
    }

    let abilities: Vec<String> = combatant
        .abilities
        .iter()
        .map(|a| match a.cooldown {
            0 => a.name.clone(),
            n => format!("{}(cd {n})", a.name),
        })
        .collect();
    if !abilities.is_empty() {
        output.push_str(&format!("  abilities: {}\n", abilities.join(", ")));
    }
}

/// Render the board, every combatant's health, bank, effects and
/// abilities, and the turn header.
#[must_use]
pub fn render_text(store: &EntityStore, action: usize) -> String {
    let digest = WorldDigest::capture(store);
    let mut output = String::new();

    match &digest.turn {
        Some(turn) => output.push_str(&format!(
            "=== ACTION {action} | TURN {} | {} ===\n\n",
            turn.rotations, turn.phase
        )),
        None => output.push_str(&format!("=== ACTION {action} ===\n\n")),
    }

    render_board(&mut output, &digest);

    let active = digest.turn.as_ref().and_then(|t| t.active_owner);
    for combatant in &digest.combatants {
        render_combatant(&mut output, combatant, active == Some(combatant.id));
    }
    output
}
