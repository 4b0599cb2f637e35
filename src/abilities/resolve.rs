//! Turning an ability's effect specs into effect requests.

use std::collections::BTreeMap;

use tracing::debug;

use crate::abilities::{Ability, EffectSpec, TargetKind};
use crate::context::SimulationContext;
use crate::ecs::{EntityId, EntityStore};
use crate::effects::{EffectApply, MetaValue, Scratchpad};
use crate::events::Event;
use crate::game::{Board, Health, Position, board, turn};

/// Resolve a target kind to an entity.
///
/// `Opponent` is the first other living combatant in turn order, falling
/// back to any other combatant.
#[must_use]
pub fn resolve_target(
    store: &EntityStore,
    kind: TargetKind,
    owner: EntityId,
    pending: Option<Position>,
) -> Option<EntityId> {
    match kind {
        TargetKind::SelfTarget => Some(owner),
        TargetKind::Opponent => {
            let others: Vec<EntityId> = turn::combatants(store)
                .into_iter()
                .filter(|&c| c != owner)
                .collect();
            others
                .iter()
                .copied()
                .find(|&c| store.get::<Health>(c).is_some_and(Health::is_alive))
                .or_else(|| others.first().copied())
        }
        TargetKind::PendingTarget => pending.and_then(|p| board::tile_entity(store, p)),
        TargetKind::PendingTargetOrSelf => pending
            .and_then(|p| board::tile_entity(store, p))
            .or(Some(owner)),
        TargetKind::Board => store.singleton::<Board>().map(|(id, _)| id),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn param_value(value: f64) -> MetaValue {
    if value.fract().abs() < f64::EPSILON && value.abs() < 9.0e15 {
        MetaValue::Int(value as i64)
    } else {
        MetaValue::Float(value)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn build_request(
    spec: &EffectSpec,
    params: &BTreeMap<String, f64>,
    target: EntityId,
    ability: EntityId,
    owner: EntityId,
    scratch: &Scratchpad,
) -> EffectApply {
    let mut metadata = spec.metadata.clone();
    for o in &spec.overrides {
        if let Some(&value) = params.get(&o.param) {
            metadata.set(&o.key, param_value(value));
        }
    }
    EffectApply {
        owner: Some(target),
        slug: spec.slug.clone(),
        source: Some(ability),
        caster: Some(owner),
        metadata,
        turns: spec.turns,
        stack_key: spec.stack_key.clone(),
        cumulative: spec.cumulative,
        allow_multiple: spec.allow_multiple,
        refresh: spec.refresh,
        count: spec
            .count_param
            .as_ref()
            .and_then(|p| params.get(p))
            .map_or(spec.count, |&v| v.round() as i64),
        expire_on: spec.expire_on.clone(),
        scratch: scratch.clone(),
    }
}

/// Emit one `EffectApply` per spec, in order, then `AbilityEffectApplied`.
///
/// Specs whose target does not resolve are skipped. Every request of one
/// execution shares a fresh scratchpad. Returns the distinct affected
/// entities in first-seen order.
pub fn execute(
    ctx: &mut SimulationContext,
    ability: EntityId,
    owner: EntityId,
    pending: Option<Position>,
) -> Vec<EntityId> {
    let Some(def) = ctx.store.get::<Ability>(ability).map(|a| a.definition.clone()) else {
        return Vec::new();
    };
    let scratch = Scratchpad::default();
    let mut affected = Vec::new();
    for spec in &def.effects {
        let Some(target) = resolve_target(&ctx.store, spec.target, owner, pending) else {
            debug!(target: "tessera::abilities", ability, slug = %spec.slug, "target did not resolve");
            continue;
        };
        let request = build_request(spec, &def.params, target, ability, owner, &scratch);
        ctx.emit(Event::EffectApply(Box::new(request)));
        if !affected.contains(&target) {
            affected.push(target);
        }
    }
    ctx.emit(Event::AbilityEffectApplied {
        ability,
        owner,
        affected: affected.clone(),
    });
    affected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{AbilityCatalog, AbilityDefinition, equip};
    use crate::config::{Controller, EngineConfig};
    use crate::effects::{Effect, find_effects};
    use crate::events::{EventKind, EventLog};
    use crate::game::{Combatant, board_from_layout};

    fn fighter(ctx: &mut SimulationContext, name: &str, hp: i64) -> EntityId {
        let id = ctx.store.create();
        ctx.store.insert(id, Health::full(hp));
        ctx.store.insert(
            id,
            Combatant {
                name: name.to_string(),
                controller: Controller::Ai,
            },
        );
        id
    }

    #[test]
    fn test_opponent_skips_the_dead() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let me = fighter(&mut ctx, "me", 10);
        let dead = fighter(&mut ctx, "dead", 10);
        let alive = fighter(&mut ctx, "alive", 10);
        if let Some(h) = ctx.store.get_mut::<Health>(dead) {
            h.current = 0;
        }
        assert_eq!(
            resolve_target(&ctx.store, TargetKind::Opponent, me, None),
            Some(alive)
        );
    }

    #[test]
    fn test_pending_target_or_self_falls_back() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        board_from_layout(&mut ctx, &["fire water", "water fire"]);
        let me = fighter(&mut ctx, "me", 10);
        assert_eq!(
            resolve_target(&ctx.store, TargetKind::PendingTargetOrSelf, me, None),
            Some(me)
        );
        let tile = board::tile_entity(&ctx.store, Position::new(1, 0));
        assert_eq!(
            resolve_target(
                &ctx.store,
                TargetKind::PendingTargetOrSelf,
                me,
                Some(Position::new(1, 0))
            ),
            tile
        );
        assert_eq!(
            resolve_target(&ctx.store, TargetKind::PendingTarget, me, None),
            None
        );
    }

    #[test]
    fn test_params_override_metadata_and_affected_is_deduplicated() {
        let mut catalog = AbilityCatalog::builtin();
        catalog.register(
            AbilityDefinition::new("double_tap")
                .param("hit", 4.0)
                .effect(
                    EffectSpec::new("damage", TargetKind::Opponent)
                        .meta("amount", 1_i64)
                        .param("amount", "hit"),
                )
                .effect(EffectSpec::new("damage", TargetKind::Opponent).meta("amount", 1_i64))
                .effect(EffectSpec::new("mark", TargetKind::SelfTarget)),
        );
        let mut ctx = SimulationContext::with_catalog(EngineConfig::default(), catalog, 0);
        let me = fighter(&mut ctx, "me", 10);
        let foe = fighter(&mut ctx, "foe", 10);
        let ability = equip(&mut ctx, me, "double_tap").unwrap();
        let log = EventLog::attach(&mut ctx);

        let affected = execute(&mut ctx, ability, me, None);

        assert_eq!(affected, vec![foe, me]);
        assert_eq!(ctx.store.get::<Health>(foe).map(|h| h.current), Some(5));
        assert_eq!(find_effects(&ctx.store, me, "mark").len(), 1);
        assert_eq!(log.count(EventKind::EffectApply), 3);
        assert_eq!(log.count(EventKind::AbilityEffectApplied), 1);
    }

    #[test]
    fn test_stack_param_drives_cumulative_count() {
        let mut catalog = AbilityCatalog::builtin();
        let venom = catalog.get("venom").unwrap().clone().param("stacks", 5.0);
        catalog.register(venom);
        let mut ctx = SimulationContext::with_catalog(EngineConfig::default(), catalog, 0);
        let me = fighter(&mut ctx, "me", 10);
        let foe = fighter(&mut ctx, "foe", 10);
        let ability = equip(&mut ctx, me, "venom").unwrap();

        execute(&mut ctx, ability, me, None);
        execute(&mut ctx, ability, me, None);

        let poison = find_effects(&ctx.store, foe, "poison");
        assert_eq!(poison.len(), 1);
        assert_eq!(ctx.store.get::<Effect>(poison[0]).map(|e| e.count), Some(10));
    }

    #[test]
    fn test_unresolved_targets_are_skipped() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let me = fighter(&mut ctx, "me", 10);
        let blast = equip(&mut ctx, me, "hex_blast").unwrap();
        let affected = execute(&mut ctx, blast, me, None);
        assert!(affected.is_empty());
    }
}
