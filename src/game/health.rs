//! Damage and healing.

use tracing::info;

use crate::context::SimulationContext;
use crate::ecs::EntityId;
use crate::effects;
use crate::events::Event;
use crate::game::{Combatant, Health};

/// Apply damage to `target`.
///
/// A ward on the target absorbs the whole hit instead. Health never drops
/// below zero, and `EnemyDefeated` fires only on the hit that reaches zero.
/// Entities without [`Health`] are skipped.
pub fn deal_damage(
    ctx: &mut SimulationContext,
    target: EntityId,
    amount: i64,
    source: Option<EntityId>,
) {
    if amount <= 0 {
        return;
    }
    let Some(before) = ctx.store.get::<Health>(target).copied() else {
        return;
    };
    if !before.is_alive() {
        return;
    }
    if let Some(ward) = effects::find_ward(&ctx.store, target) {
        ctx.emit(Event::DamagePrevented {
            target,
            amount,
            by: ward,
        });
        return;
    }

    let current = (before.current - amount).max(0);
    if let Some(health) = ctx.store.get_mut::<Health>(target) {
        health.current = current;
    }
    ctx.emit(Event::DamageDealt {
        target,
        amount,
        source,
    });
    ctx.emit(Event::HealthChanged {
        entity: target,
        delta: current - before.current,
        current,
    });
    if current == 0 {
        let name = ctx
            .store
            .get::<Combatant>(target)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        info!(target: "tessera::turn", entity = target, %name, "defeated");
        ctx.emit(Event::EnemyDefeated {
            entity: target,
            name,
        });
    }
}

/// Restore health up to the maximum. Dead entities stay dead.
pub fn heal(ctx: &mut SimulationContext, target: EntityId, amount: i64) {
    if amount <= 0 {
        return;
    }
    let Some(health) = ctx.store.get_mut::<Health>(target) else {
        return;
    };
    if !health.is_alive() {
        return;
    }
    let before = health.current;
    health.current = (health.current + amount).min(health.max);
    let current = health.current;
    if current != before {
        ctx.emit(Event::HealthChanged {
            entity: target,
            delta: current - before,
            current,
        });
    }
}

/// Reset health to maximum without notifications.
pub fn restore(ctx: &mut SimulationContext, target: EntityId) {
    if let Some(health) = ctx.store.get_mut::<Health>(target) {
        health.current = health.max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Controller, EngineConfig};
    use crate::events::{EventKind, EventLog};

    fn fighter(ctx: &mut SimulationContext, hp: i64) -> EntityId {
        let id = ctx.store.create();
        ctx.store.insert(id, Health::full(hp));
        ctx.store.insert(
            id,
            Combatant {
                name: "dummy".to_string(),
                controller: Controller::Human,
            },
        );
        id
    }

    #[test]
    fn test_damage_floors_at_zero_and_defeats_once() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let target = fighter(&mut ctx, 5);
        let log = EventLog::attach(&mut ctx);
        deal_damage(&mut ctx, target, 8, None);
        deal_damage(&mut ctx, target, 8, None);
        assert_eq!(ctx.store.get::<Health>(target).map(|h| h.current), Some(0));
        assert_eq!(log.count(EventKind::EnemyDefeated), 1);
        assert_eq!(log.count(EventKind::DamageDealt), 1);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let target = fighter(&mut ctx, 10);
        deal_damage(&mut ctx, target, 3, None);
        heal(&mut ctx, target, 50);
        assert_eq!(ctx.store.get::<Health>(target).map(|h| h.current), Some(10));
    }

    #[test]
    fn test_missing_health_is_skipped() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let ghost = ctx.store.create();
        let log = EventLog::attach(&mut ctx);
        deal_damage(&mut ctx, ghost, 4, None);
        heal(&mut ctx, ghost, 4);
        assert!(log.events().is_empty());
    }
}
