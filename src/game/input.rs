//! Click handling for the acting owner.
//!
//! Clicks are interpreted against transient per-owner state: a
//! [`Targeting`] marker routes the next tile click to an ability cast, a
//! [`Selection`] turns the next adjacent click into a swap request. A right
//! click clears both.

use tracing::trace;

use crate::abilities;
use crate::context::SimulationContext;
use crate::ecs::EntityId;
use crate::events::{Event, EventKind, MouseButton};
use crate::game::{Board, Position, Selection, Targeting, turn};

/// Interpret a tile click for the active owner.
pub fn click_tile(ctx: &mut SimulationContext, pos: Position) {
    let Some(owner) = turn::active_owner(&ctx.store) else {
        return;
    };
    if !ctx.store.singleton::<Board>().is_some_and(|(_, b)| b.contains(pos)) {
        return;
    }

    // Targeting is cleared by a successful cast or a right click only.
    if let Some(&Targeting { ability }) = ctx.store.get::<Targeting>(owner) {
        trace!(target: "tessera::input", owner, ability, ?pos, "target chosen");
        ctx.emit(Event::AbilityCastRequested {
            ability,
            owner,
            target: Some(pos),
        });
        return;
    }

    match ctx.store.get::<Selection>(owner).map(|s| s.first) {
        Some(first) if first == pos => {
            ctx.store.remove::<Selection>(owner);
        }
        Some(first) if first.is_adjacent(pos) => {
            ctx.store.remove::<Selection>(owner);
            ctx.emit(Event::SwapRequested {
                owner,
                a: first,
                b: pos,
            });
        }
        _ => {
            ctx.store.insert(owner, Selection { first: pos });
        }
    }
}

/// Drop targeting and selection for every owner holding either.
pub fn cancel_all(ctx: &mut SimulationContext) {
    let mut owners: Vec<EntityId> = ctx.store.entities_with::<Targeting>();
    owners.extend(ctx.store.entities_with::<Selection>());
    owners.sort_unstable();
    owners.dedup();
    for owner in owners {
        ctx.store.remove::<Targeting>(owner);
        ctx.store.remove::<Selection>(owner);
        ctx.emit(Event::TargetingCancelled { owner });
    }
}

pub(crate) fn install(ctx: &mut SimulationContext) {
    ctx.on(EventKind::TileClicked, |ctx, event| {
        if let Event::TileClicked(pos) = event {
            click_tile(ctx, *pos);
        }
    });
    ctx.on(EventKind::MousePressed, |ctx, event| {
        if let Event::MousePressed {
            button: MouseButton::Right,
            ..
        } = event
        {
            cancel_all(ctx);
        }
    });
    ctx.on(EventKind::AbilityActivateRequested, |ctx, event| {
        if let Event::AbilityActivateRequested { ability, owner } = event {
            abilities::activate(ctx, *ability, *owner);
        }
    });
}
