//! Building an encounter and tearing combat state down again.

use tracing::{debug, info};

use crate::abilities;
use crate::ai::{self, AiController, AiPending};
use crate::config::{CombatantSpec, Controller, EngineConfig};
use crate::context::SimulationContext;
use crate::ecs::EntityId;
use crate::effects::{self, Effect, ExpiryReason};
use crate::error::EngineResult;
use crate::events::Event;
use crate::game::{Combatant, Health, Selection, Targeting, bank, generate_board, health, turn};

/// Create one combatant with health, bank, equipped abilities and, for AI
/// controllers, an [`AiController`] seeded with `ai_seed`.
///
/// # Errors
///
/// [`crate::EngineError::UnknownAbility`] if an equipped name is not in the
/// catalog.
pub fn spawn_combatant(
    ctx: &mut SimulationContext,
    spec: &CombatantSpec,
    ai_seed: u64,
) -> EngineResult<EntityId> {
    let id = ctx.store.create();
    ctx.store.insert(id, Health::full(spec.max_health));
    ctx.store.insert(
        id,
        Combatant {
            name: spec.name.clone(),
            controller: spec.controller,
        },
    );
    bank::ensure_bank(&mut ctx.store, id);
    if spec.controller == Controller::Ai {
        ctx.store
            .insert(id, AiController::new(spec.personality, ai_seed));
    }
    for name in &spec.abilities {
        abilities::equip(ctx, id, name)?;
    }
    debug!(target: "tessera::turn", id, name = %spec.name, "combatant spawned");
    Ok(id)
}

/// Build a ready-to-start world: a match-free board, every configured
/// combatant, and the AI driver. Turns are not begun; call
/// [`turn::begin`] once observers are attached.
///
/// # Errors
///
/// Invalid configuration or an unknown ability name.
pub fn build_encounter(config: &EngineConfig, seed: u64) -> EngineResult<SimulationContext> {
    config.validate()?;
    let mut ctx = SimulationContext::new(config.clone(), seed);
    generate_board(&mut ctx);
    for (index, spec) in (0_u64..).zip(&config.combatants) {
        let ai_seed = seed.wrapping_mul(0x2545_F491_4F6C_DD1D).wrapping_add(index);
        spawn_combatant(&mut ctx, spec, ai_seed)?;
    }
    ai::install_driver(&mut ctx);
    Ok(ctx)
}

/// Tear down per-combat state: expire every effect, unequip every ability,
/// clear targeting and selection, restore health and empty banks, then
/// announce `CombatReset`.
///
/// Each step works on whatever is still present; a missing piece never
/// stops the rest.
pub fn reset_combat(ctx: &mut SimulationContext, reason: &str) {
    for effect in ctx.store.entities_with::<Effect>() {
        effects::expire(ctx, effect, ExpiryReason::Removed);
    }
    let owners = turn::combatants(&ctx.store);
    for &owner in &owners {
        abilities::unequip_all(&mut ctx.store, owner);
        ctx.store.remove::<Targeting>(owner);
        ctx.store.remove::<Selection>(owner);
        ctx.store.remove::<AiPending>(owner);
        health::restore(ctx, owner);
        bank::clear_bank(&mut ctx.store, owner);
    }
    info!(target: "tessera::turn", reason, combatants = owners.len(), "combat reset");
    ctx.emit(Event::CombatReset {
        reason: reason.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::effects::EffectApply;
    use crate::error::EngineError;
    use crate::events::{EventKind, EventLog};
    use crate::game::check_invariants;

    #[test]
    fn test_default_encounter() {
        let ctx = build_encounter(&EngineConfig::default(), 11).unwrap();
        let owners = turn::combatants(&ctx.store);
        assert_eq!(owners.len(), 2);
        assert_eq!(abilities::abilities_of(&ctx.store, owners[0]).len(), 4);
        assert_eq!(abilities::abilities_of(&ctx.store, owners[1]).len(), 5);
        assert!(owners.iter().all(|&o| ctx.store.has::<AiController>(o)));
        assert!(crate::game::find_matches(&ctx.store, 3).is_empty());
    }

    #[test]
    fn test_unknown_ability_fails_setup() {
        let mut config = EngineConfig::default();
        config.combatants[0].abilities.push("meteor".to_string());
        assert!(matches!(
            build_encounter(&config, 0),
            Err(EngineError::UnknownAbility(name)) if name == "meteor"
        ));
    }

    #[test]
    fn test_reset_clears_combat_state() {
        let mut ctx = build_encounter(&EngineConfig::default(), 2).unwrap();
        let owner = turn::combatants(&ctx.store)[0];
        ctx.emit(Event::EffectApply(Box::new(
            EffectApply::new(owner, "poison").count(3),
        )));
        bank::deposit(&mut ctx, owner, &BTreeMap::from([("fire".to_string(), 4)]));
        if let Some(h) = ctx.store.get_mut::<Health>(owner) {
            h.current = 3;
        }
        let log = EventLog::attach(&mut ctx);

        reset_combat(&mut ctx, "fled");

        assert!(effects::effects_of(&ctx.store, owner).is_empty());
        assert!(abilities::abilities_of(&ctx.store, owner).is_empty());
        assert_eq!(bank::balance(&ctx.store, owner).values().sum::<u32>(), 0);
        assert_eq!(
            ctx.store.get::<Health>(owner).map(|h| h.current),
            Some(40)
        );
        assert_eq!(log.count(EventKind::CombatReset), 1);
        assert_eq!(log.count(EventKind::EffectExpired), 1);
        assert!(check_invariants(&ctx.store).is_empty());

        reset_combat(&mut ctx, "again");
        assert_eq!(log.count(EventKind::CombatReset), 2);
    }
}
