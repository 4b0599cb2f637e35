//! Effects that act once on apply and are never stored.

use std::collections::BTreeMap;

use rand::seq::IndexedRandom;

use crate::context::SimulationContext;
use crate::ecs::EntityId;
use crate::effects::{Effect, EffectApply, ExpiryReason, damage_bonus, effects_of, expire};
use crate::game::{Board, Position, Tile, bank, board, health};

/// Slugs resolved immediately instead of creating an effect entity.
pub const INSTANT_SLUGS: &[&str] = &[
    "damage",
    "heal",
    "transform_tiles",
    "heal_per_transformed",
    "clear_area",
    "gain_resource",
    "drain_resource",
    "cleanse",
];

const HARMFUL_SLUGS: &[&str] = &["poison", "burn"];

type Instant = fn(&mut SimulationContext, EntityId, &EffectApply);

/// Run an instant slug. Returns `false` if the slug is not instant, in which
/// case the caller stores it as a regular effect.
pub(super) fn resolve(ctx: &mut SimulationContext, request: &EffectApply) -> bool {
    let run: Instant = match request.slug.as_str() {
        "damage" => damage,
        "heal" => heal,
        "transform_tiles" => transform_tiles,
        "heal_per_transformed" => heal_per_transformed,
        "clear_area" => clear_area,
        "gain_resource" => gain_resource,
        "drain_resource" => drain_resource,
        "cleanse" => cleanse,
        _ => return false,
    };
    if let Some(owner) = request.owner.filter(|&o| ctx.store.contains(o)) {
        run(ctx, owner, request);
    }
    true
}

fn amount(request: &EffectApply) -> i64 {
    request.metadata.int("amount").unwrap_or(0)
}

fn damage(ctx: &mut SimulationContext, owner: EntityId, request: &EffectApply) {
    let bonus = request.caster.map_or(0, |c| damage_bonus(&ctx.store, c));
    health::deal_damage(ctx, owner, amount(request) + bonus, request.caster);
}

fn heal(ctx: &mut SimulationContext, owner: EntityId, request: &EffectApply) {
    health::heal(ctx, owner, amount(request));
}

/// Turn `count` random active tiles of other types into `kind`, record the
/// number in the scratchpad, then resolve any matches this created.
fn transform_tiles(ctx: &mut SimulationContext, _owner: EntityId, request: &EffectApply) {
    let Some(kind) = request.metadata.text("kind").map(str::to_owned) else {
        return;
    };
    let count = usize::try_from(request.metadata.int("count").unwrap_or(3)).unwrap_or(0);
    let Some((_, grid)) = ctx.store.singleton::<Board>().map(|(id, b)| (id, b.clone())) else {
        return;
    };
    let candidates: Vec<Position> = grid
        .positions()
        .filter(|&p| board::tile_kind(&ctx.store, p).is_some_and(|k| k != kind))
        .collect();
    let mut picked: Vec<Position> = candidates
        .choose_multiple(&mut ctx.rng, count)
        .copied()
        .collect();
    picked.sort_unstable();

    board::transform_tiles(ctx, &picked, &kind);
    request
        .scratch
        .add("transformed", i64::try_from(picked.len()).unwrap_or(i64::MAX));
    board::settle_board(ctx);
}

fn heal_per_transformed(ctx: &mut SimulationContext, owner: EntityId, request: &EffectApply) {
    let per_tile = request.metadata.int("per_tile").unwrap_or(1);
    let transformed = request.scratch.get("transformed").unwrap_or(0);
    health::heal(ctx, owner, transformed * per_tile);
}

/// Clear a square around the owner tile (or `row`/`col` metadata).
fn clear_area(ctx: &mut SimulationContext, owner: EntityId, request: &EffectApply) {
    let center = ctx.store.get::<Position>(owner).copied().or_else(|| {
        let row = u16::try_from(request.metadata.int("row")?).ok()?;
        let col = u16::try_from(request.metadata.int("col")?).ok()?;
        Some(Position::new(row, col))
    });
    let Some(center) = center else {
        return;
    };
    let radius = u16::try_from(request.metadata.int("radius").unwrap_or(1)).unwrap_or(0);
    let mut area = Vec::new();
    for row in center.row.saturating_sub(radius)..=center.row.saturating_add(radius) {
        for col in center.col.saturating_sub(radius)..=center.col.saturating_add(radius) {
            area.push(Position::new(row, col));
        }
    }
    let live = area
        .iter()
        .filter(|&&p| ctx.store.singleton::<Board>().is_some_and(|(_, b)| b.contains(p)))
        .filter(|&&p| {
            board::tile_entity(&ctx.store, p)
                .and_then(|id| ctx.store.get::<Tile>(id))
                .is_some_and(|t| t.active)
        })
        .count();
    request
        .scratch
        .add("cleared", i64::try_from(live).unwrap_or(i64::MAX));
    board::clear_and_cascade(ctx, &area, true);
}

fn resource_amount(request: &EffectApply) -> Option<(String, u32)> {
    let resource = request.metadata.text("resource")?.to_string();
    let value = u32::try_from(amount(request)).unwrap_or(0);
    Some((resource, value))
}

fn gain_resource(ctx: &mut SimulationContext, owner: EntityId, request: &EffectApply) {
    if let Some((resource, value)) = resource_amount(request) {
        bank::deposit(ctx, owner, &BTreeMap::from([(resource, value)]));
    }
}

/// Take resources from the owner, optionally handing them to the caster.
fn drain_resource(ctx: &mut SimulationContext, owner: EntityId, request: &EffectApply) {
    let Some((resource, value)) = resource_amount(request) else {
        return;
    };
    let taken = bank::withdraw(ctx, owner, &resource, value);
    if request.metadata.flag("to_caster") {
        if let Some(caster) = request.caster {
            bank::deposit(ctx, caster, &BTreeMap::from([(resource, taken)]));
        }
    }
}

/// Remove harmful effects from the owner.
fn cleanse(ctx: &mut SimulationContext, owner: EntityId, _request: &EffectApply) {
    for id in effects_of(&ctx.store, owner) {
        let harmful = ctx.store.get::<Effect>(id).is_some_and(|e| {
            HARMFUL_SLUGS.contains(&e.slug.as_str()) || e.metadata.flag("harmful")
        });
        if harmful {
            expire(ctx, id, ExpiryReason::Removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Controller, EngineConfig};
    use crate::effects::{Metadata, Scratchpad, apply, find_effects};
    use crate::events::{Event, EventKind, EventLog};
    use crate::game::{Combatant, Health, board_from_layout};

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

    fn emit(ctx: &mut SimulationContext, request: EffectApply) {
        ctx.emit(Event::EffectApply(Box::new(request)));
    }

    #[test]
    fn test_instant_slugs_create_no_entities() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let owner = fighter(&mut ctx);
        let before = ctx.store.len();
        emit(
            &mut ctx,
            EffectApply::new(owner, "damage").metadata(Metadata::new().with("amount", 5_i64)),
        );
        assert_eq!(ctx.store.len(), before);
        assert_eq!(ctx.store.get::<Health>(owner).map(|h| h.current), Some(15));
    }

    #[test]
    fn test_damage_includes_caster_bonus() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let caster = fighter(&mut ctx);
        let target = fighter(&mut ctx);
        apply(
            &mut ctx,
            &EffectApply::new(caster, "damage_bonus").metadata(Metadata::new().with("amount", 2_i64)),
        );
        let mut request =
            EffectApply::new(target, "damage").metadata(Metadata::new().with("amount", 3_i64));
        request.caster = Some(caster);
        emit(&mut ctx, request);
        assert_eq!(ctx.store.get::<Health>(target).map(|h| h.current), Some(15));
    }

    #[test]
    fn test_transform_feeds_heal_through_scratchpad() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let board_entity = board_from_layout(
            &mut ctx,
            &["fire water hex", "water hex fire", "hex fire water"],
        );
        let owner = fighter(&mut ctx);
        if let Some(h) = ctx.store.get_mut::<Health>(owner) {
            h.current = 5;
        }
        let scratch = Scratchpad::default();
        let mut transform = EffectApply::new(board_entity, "transform_tiles").metadata(
            Metadata::new().with("kind", "light").with("count", 2_i64),
        );
        transform.scratch = scratch.clone();
        let mut mend = EffectApply::new(owner, "heal_per_transformed")
            .metadata(Metadata::new().with("per_tile", 2_i64));
        mend.scratch = scratch.clone();

        let log = EventLog::attach(&mut ctx);
        emit(&mut ctx, transform);
        emit(&mut ctx, mend);
        assert_eq!(scratch.get("transformed"), Some(2));
        assert_eq!(log.count(EventKind::TilesTransformed), 1);
        assert_eq!(ctx.store.get::<Health>(owner).map(|h| h.current), Some(9));
    }

    #[test]
    fn test_drain_moves_resources_to_caster() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let caster = fighter(&mut ctx);
        let target = fighter(&mut ctx);
        bank::deposit(&mut ctx, target, &BTreeMap::from([("water".to_string(), 3)]));
        let mut request = EffectApply::new(target, "drain_resource").metadata(
            Metadata::new()
                .with("resource", "water")
                .with("amount", 5_i64)
                .with("to_caster", true),
        );
        request.caster = Some(caster);
        emit(&mut ctx, request);
        assert_eq!(bank::balance(&ctx.store, target).get("water"), Some(&0));
        assert_eq!(bank::balance(&ctx.store, caster).get("water"), Some(&3));
    }

    #[test]
    fn test_cleanse_removes_only_harmful() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let owner = fighter(&mut ctx);
        apply(&mut ctx, &EffectApply::new(owner, "poison").count(3));
        apply(&mut ctx, &EffectApply::new(owner, "regen").turns(2));
        emit(&mut ctx, EffectApply::new(owner, "cleanse"));
        assert!(find_effects(&ctx.store, owner, "poison").is_empty());
        assert_eq!(find_effects(&ctx.store, owner, "regen").len(), 1);
    }

    #[test]
    fn test_clear_area_around_tile_owner() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        board_from_layout(
            &mut ctx,
            &["fire water hex", "water hex fire", "hex fire water"],
        );
        let centre = board::tile_entity(&ctx.store, Position::new(0, 0)).unwrap();
        let log = EventLog::attach(&mut ctx);
        emit(&mut ctx, EffectApply::new(centre, "clear_area"));
        match log.of_kind(EventKind::TilesCleared).first() {
            Some(Event::TilesCleared(cleared)) => assert_eq!(cleared.positions.len(), 4),
            other => panic!("unexpected {other:?}"),
        }
    }
}
