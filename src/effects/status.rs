//! Behaviour of stored status effects.

use crate::context::SimulationContext;
use crate::ecs::{EntityId, EntityStore};
use crate::effects::{Effect, ExpiryReason, effects_of, expire, find_effects};
use crate::game::health;

/// Per-turn behaviour of a status slug.
enum Tick {
    Damage,
    Heal,
}

fn per_turn(slug: &str) -> Option<(Tick, bool)> {
    // (behaviour, consumes count)
    match slug {
        "poison" => Some((Tick::Damage, true)),
        "burn" => Some((Tick::Damage, false)),
        "regen" => Some((Tick::Heal, false)),
        _ => None,
    }
}

/// Run damage-over-time and heal-over-time effects of the owner whose turn
/// just ended, in application order.
///
/// `poison` deals `amount` (default 1) and uses up one count per tick,
/// expiring at zero. `burn` and `regen` act every tick until their duration
/// runs out.
pub fn tick_status(ctx: &mut SimulationContext, owner: EntityId) {
    for id in effects_of(&ctx.store, owner) {
        let Some(effect) = ctx.store.get::<Effect>(id) else {
            continue;
        };
        let Some((tick, consumes)) = per_turn(&effect.slug) else {
            continue;
        };
        let amount = effect.metadata.int("amount").unwrap_or(1);
        let caster = effect.caster;
        match tick {
            Tick::Damage => health::deal_damage(ctx, owner, amount, caster),
            Tick::Heal => health::heal(ctx, owner, amount),
        }
        if !consumes {
            continue;
        }
        let spent = match ctx.store.get_mut::<Effect>(id) {
            Some(effect) => {
                effect.count -= 1;
                effect.count <= 0
            }
            None => false,
        };
        if spent {
            expire(ctx, id, ExpiryReason::Duration);
        }
    }
}

/// Total `damage_bonus` carried by a caster.
#[must_use]
pub fn damage_bonus(store: &EntityStore, caster: EntityId) -> i64 {
    find_effects(store, caster, "damage_bonus")
        .into_iter()
        .filter_map(|id| store.get::<Effect>(id))
        .map(|e| e.metadata.int("amount").unwrap_or(0))
        .sum()
}

/// Oldest ward protecting `target`.
#[must_use]
pub fn find_ward(store: &EntityStore, target: EntityId) -> Option<EntityId> {
    find_effects(store, target, "ward").into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Controller, EngineConfig};
    use crate::effects::{EffectApply, Metadata, apply};
    use crate::events::{Event, EventKind, EventLog};
    use crate::game::{Combatant, Health};

    fn fighter(ctx: &mut SimulationContext) -> EntityId {
        let id = ctx.store.create();
        ctx.store.insert(id, Health::full(20));
        ctx.store.insert(
            id,
            Combatant {
                name: "f".to_string(),
                controller: Controller::Human,
            },
        );
        id
    }

    #[test]
    fn test_poison_ticks_and_expires() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let owner = fighter(&mut ctx);
        apply(&mut ctx, &EffectApply::new(owner, "poison").cumulative().count(2));
        tick_status(&mut ctx, owner);
        tick_status(&mut ctx, owner);
        tick_status(&mut ctx, owner);
        assert_eq!(ctx.store.get::<Health>(owner).map(|h| h.current), Some(18));
        assert!(find_effects(&ctx.store, owner, "poison").is_empty());
    }

    #[test]
    fn test_ward_absorbs_one_hit() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let owner = fighter(&mut ctx);
        apply(
            &mut ctx,
            &EffectApply::new(owner, "ward")
                .exclusive()
                .expire_on(EventKind::DamagePrevented, true),
        );
        let log = EventLog::attach(&mut ctx);
        health::deal_damage(&mut ctx, owner, 6, None);
        health::deal_damage(&mut ctx, owner, 6, None);
        assert_eq!(log.count(EventKind::DamagePrevented), 1);
        assert_eq!(log.count(EventKind::DamageDealt), 1);
        assert_eq!(ctx.store.get::<Health>(owner).map(|h| h.current), Some(14));
        assert!(matches!(
            log.of_kind(EventKind::EffectExpired).first(),
            Some(Event::EffectExpired { slug, .. }) if slug == "ward"
        ));
    }

    #[test]
    fn test_damage_bonus_instances_sum() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let owner = fighter(&mut ctx);
        for _ in 0..2 {
            apply(
                &mut ctx,
                &EffectApply::new(owner, "damage_bonus")
                    .turns(2)
                    .metadata(Metadata::new().with("amount", 3_i64)),
            );
        }
        assert_eq!(damage_bonus(&ctx.store, owner), 6);
    }
}
