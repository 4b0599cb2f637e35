//! Effect lifecycle: apply with stacking rules, expire, remove and the
//! per-owner turn tick.

use tracing::debug;

use crate::context::SimulationContext;
use crate::ecs::{EntityId, EntityStore};
use crate::effects::{
    Effect, EffectApply, EffectList, ExpireOn, ExpiryReason, ensure_trigger_hub,
};
use crate::events::{Event, EventKind};

/// Effect entities attached to `owner`, in application order.
#[must_use]
pub fn effects_of(store: &EntityStore, owner: EntityId) -> Vec<EntityId> {
    store
        .get::<EffectList>(owner)
        .map(|list| list.effects.clone())
        .unwrap_or_default()
}

/// Effects on `owner` with `slug`, in application order.
#[must_use]
pub fn find_effects(store: &EntityStore, owner: EntityId, slug: &str) -> Vec<EntityId> {
    effects_of(store, owner)
        .into_iter()
        .filter(|&id| store.get::<Effect>(id).is_some_and(|e| e.slug == slug))
        .collect()
}

fn matching(store: &EntityStore, owner: EntityId, slug: &str, stack_key: Option<&str>) -> Vec<EntityId> {
    effects_of(store, owner)
        .into_iter()
        .filter(|&id| {
            store.get::<Effect>(id).is_some_and(|e| {
                e.slug == slug && stack_key.is_none_or(|key| e.stack_key.as_deref() == Some(key))
            })
        })
        .collect()
}

/// Apply an effect request.
///
/// Resolution order: fold into an existing cumulative match, refresh a
/// match in place when asked, otherwise create a new effect, first expiring
/// earlier matches if multiple instances are not allowed. Returns the effect
/// entity that now carries the application, or `None` when the request has
/// no live owner.
pub fn apply(ctx: &mut SimulationContext, request: &EffectApply) -> Option<EntityId> {
    let owner = request.owner?;
    if !ctx.store.contains(owner) {
        return None;
    }
    let matches = matching(&ctx.store, owner, &request.slug, request.stack_key.as_deref());

    if request.cumulative {
        let existing = matches
            .iter()
            .copied()
            .find(|&id| ctx.store.get::<Effect>(id).is_some_and(|e| e.cumulative));
        if let Some(id) = existing {
            let count = {
                let effect = ctx.store.get_mut::<Effect>(id)?;
                effect.count = effect.count.saturating_add(request.count.max(0));
                effect.metadata.merge(&request.metadata);
                if request.turns.is_some() {
                    effect.turns = request.turns;
                }
                effect.count
            };
            debug!(target: "tessera::effects", effect = id, owner, slug = %request.slug, count, "stacked");
            ctx.emit(Event::EffectStacked {
                effect: id,
                owner,
                slug: request.slug.clone(),
                count,
            });
            return Some(id);
        }
    }

    if request.refresh {
        if let Some(&id) = matches.first() {
            {
                let effect = ctx.store.get_mut::<Effect>(id)?;
                effect.metadata = request.metadata.clone();
                effect.turns = request.turns;
                effect.count = request.count;
                effect.source = request.source;
                effect.caster = request.caster;
            }
            debug!(target: "tessera::effects", effect = id, owner, slug = %request.slug, "refreshed");
            ctx.emit(Event::EffectRefreshed {
                effect: id,
                owner,
                slug: request.slug.clone(),
            });
            return Some(id);
        }
    }

    if !request.allow_multiple {
        for id in matches {
            expire(ctx, id, ExpiryReason::Replaced);
        }
    }

    let id = ctx.store.create();
    ctx.store.insert(
        id,
        Effect {
            slug: request.slug.clone(),
            owner,
            source: request.source,
            caster: request.caster,
            metadata: request.metadata.clone(),
            stack_key: request.stack_key.clone(),
            cumulative: request.cumulative,
            count: request.count,
            turns: request.turns,
        },
    );
    if !request.expire_on.is_empty() {
        ctx.store.insert(
            id,
            ExpireOn {
                triggers: request.expire_on.clone(),
            },
        );
        for trigger in &request.expire_on {
            ensure_trigger_hub(ctx, trigger.event);
        }
    }
    if !ctx.store.has::<EffectList>(owner) {
        ctx.store.insert(owner, EffectList::default());
    }
    if let Some(list) = ctx.store.get_mut::<EffectList>(owner) {
        list.effects.push(id);
    }

    debug!(target: "tessera::effects", effect = id, owner, slug = %request.slug, "applied");
    ctx.emit(Event::EffectApplied {
        effect: id,
        owner,
        slug: request.slug.clone(),
    });
    Some(id)
}

/// Destroy an effect: detach it from its owner, drop its triggers, delete
/// the entity and announce why. Returns `false` if it was already gone.
pub fn expire(ctx: &mut SimulationContext, effect: EntityId, reason: ExpiryReason) -> bool {
    let Some(data) = ctx.store.get::<Effect>(effect).cloned() else {
        return false;
    };
    if let Some(list) = ctx.store.get_mut::<EffectList>(data.owner) {
        list.effects.retain(|&id| id != effect);
    }
    ctx.store.delete(effect);
    debug!(target: "tessera::effects", effect, owner = data.owner, slug = %data.slug, %reason, "expired");
    ctx.emit(Event::EffectExpired {
        effect,
        owner: data.owner,
        slug: data.slug,
        reason,
    });
    true
}

/// Remove one effect by id. Unknown ids are ignored.
pub fn remove_effect(ctx: &mut SimulationContext, effect: EntityId) -> bool {
    expire(ctx, effect, ExpiryReason::Removed)
}

/// Remove the first (or every) effect on `owner` matching `slug` and, when
/// given, `stack_key`. Returns how many were removed.
pub fn remove_matching(
    ctx: &mut SimulationContext,
    owner: EntityId,
    slug: &str,
    stack_key: Option<&str>,
    remove_all: bool,
) -> usize {
    let matches = matching(&ctx.store, owner, slug, stack_key);
    let take = if remove_all { matches.len() } else { 1 };
    matches
        .into_iter()
        .take(take)
        .filter(|&id| expire(ctx, id, ExpiryReason::Removed))
        .count()
}

/// Count down every timed effect of the owner whose turn just ended.
pub fn on_turn_advance(ctx: &mut SimulationContext, previous: EntityId) {
    for id in effects_of(&ctx.store, previous) {
        let finished = match ctx.store.get_mut::<Effect>(id) {
            Some(effect) => match effect.turns {
                Some(turns) => {
                    let left = turns.saturating_sub(1);
                    effect.turns = Some(left);
                    left == 0
                }
                None => false,
            },
            None => false,
        };
        if finished {
            expire(ctx, id, ExpiryReason::Duration);
        }
    }
}

/// Fan one event out to every effect that registered a trigger for it.
pub(super) fn fire_triggers(ctx: &mut SimulationContext, kind: EventKind, event: &Event) {
    let subject = event.subject();
    let due: Vec<EntityId> = ctx
        .store
        .query::<ExpireOn>()
        .filter(|(id, on)| {
            on.triggers.iter().any(|t| {
                t.event == kind
                    && (!t.owner_guard
                        || ctx.store.get::<Effect>(*id).map(|e| e.owner) == subject)
            })
        })
        .map(|(id, _)| id)
        .collect();
    for id in due {
        expire(ctx, id, ExpiryReason::Event(kind));
    }
}
