//! Equipping, gating and casting abilities.

use tracing::{debug, info};

use crate::abilities::{Ability, AbilityDefinition, AbilityList, AbilityTarget, Cooldown, execute};
use crate::context::SimulationContext;
use crate::ecs::{EntityId, EntityStore};
use crate::error::EngineResult;
use crate::events::Event;
use crate::game::turn::{self, TurnBlock};
use crate::game::{ActionSource, Position, Selection, Targeting, Tile, bank, board};

/// Why an ability request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Someone else holds the turn.
    NotActiveOwner,
    /// The previous action has not settled.
    ActionInFlight,
    /// The ability does not exist or belongs to someone else.
    NotOwned,
    /// Owner turns left before it can be cast again.
    OnCooldown(u32),
    /// A tile target is required and none (or an unusable one) was given.
    NeedsTarget,
}

impl From<TurnBlock> for RejectReason {
    fn from(block: TurnBlock) -> Self {
        match block {
            TurnBlock::NotActiveOwner => RejectReason::NotActiveOwner,
            TurnBlock::ActionInFlight => RejectReason::ActionInFlight,
        }
    }
}

/// Equip the catalog ability `name` on `owner`.
///
/// # Errors
///
/// [`crate::EngineError::UnknownAbility`] if the catalog lacks `name`.
pub fn equip(ctx: &mut SimulationContext, owner: EntityId, name: &str) -> EngineResult<EntityId> {
    let definition = ctx.catalog().get(name)?.clone();
    let ability = ctx.store.create();
    ctx.store.insert(ability, Ability { owner, definition });
    let mut list = ctx.store.remove::<AbilityList>(owner).unwrap_or_default();
    list.abilities.push(ability);
    ctx.store.insert(owner, list);
    debug!(target: "tessera::abilities", owner, ability, name, "equipped");
    Ok(ability)
}

/// Remove one ability from its owner and delete it.
pub fn unequip(store: &mut EntityStore, ability: EntityId) -> bool {
    let Some(owner) = store.get::<Ability>(ability).map(|a| a.owner) else {
        return false;
    };
    if let Some(list) = store.get_mut::<AbilityList>(owner) {
        list.abilities.retain(|&a| a != ability);
    }
    store.delete(ability)
}

/// Remove every ability of `owner`; returns how many were deleted.
pub fn unequip_all(store: &mut EntityStore, owner: EntityId) -> usize {
    let Some(list) = store.remove::<AbilityList>(owner) else {
        return 0;
    };
    list.abilities.into_iter().filter(|&a| store.delete(a)).count()
}

/// Abilities of `owner` in equip order.
#[must_use]
pub fn abilities_of(store: &EntityStore, owner: EntityId) -> Vec<EntityId> {
    store
        .get::<AbilityList>(owner)
        .map(|l| l.abilities.clone())
        .unwrap_or_default()
}

/// Owner turns left on an ability's cooldown.
#[must_use]
pub fn cooldown_remaining(store: &EntityStore, ability: EntityId) -> u32 {
    store.get::<Cooldown>(ability).map_or(0, |c| c.remaining)
}

/// Ownership, turn and cooldown gates shared by activation and casting.
///
/// # Errors
///
/// The first failing gate.
pub fn check_castable(
    store: &EntityStore,
    ability: EntityId,
    owner: EntityId,
) -> Result<&AbilityDefinition, RejectReason> {
    let def = store
        .get::<Ability>(ability)
        .filter(|a| a.owner == owner)
        .map(|a| &a.definition)
        .ok_or(RejectReason::NotOwned)?;
    turn::check_can_act(store, owner)?;
    match cooldown_remaining(store, ability) {
        0 => Ok(def),
        left => Err(RejectReason::OnCooldown(left)),
    }
}

fn reject(ctx: &mut SimulationContext, owner: EntityId, ability: EntityId, reason: RejectReason) {
    debug!(target: "tessera::abilities", owner, ability, ?reason, "ability rejected");
    ctx.emit(Event::ActionRejected {
        owner,
        ability,
        reason,
    });
}

/// Start an ability from the UI: tile abilities enter targeting mode,
/// the rest are cast immediately.
pub fn activate(ctx: &mut SimulationContext, ability: EntityId, owner: EntityId) {
    let target = match check_castable(&ctx.store, ability, owner) {
        Ok(def) => def.target,
        Err(reason) => {
            reject(ctx, owner, ability, reason);
            return;
        }
    };
    match target {
        AbilityTarget::Tile => {
            ctx.store.remove::<Selection>(owner);
            ctx.store.insert(owner, Targeting { ability });
            ctx.emit(Event::TargetingStarted { owner, ability });
        }
        AbilityTarget::None => ctx.emit(Event::AbilityCastRequested {
            ability,
            owner,
            target: None,
        }),
    }
}

fn usable_target(store: &EntityStore, target: Option<Position>) -> bool {
    target
        .and_then(|p| board::tile_entity(store, p))
        .and_then(|id| store.get::<Tile>(id))
        .is_some_and(|t| t.active)
}

/// Cast an ability: gate, pay, start the cooldown, commit and execute.
///
/// A refused or unaffordable cast changes nothing besides the emitted
/// rejection event.
pub fn request_cast(
    ctx: &mut SimulationContext,
    ability: EntityId,
    owner: EntityId,
    target: Option<Position>,
) {
    let def = match check_castable(&ctx.store, ability, owner) {
        Ok(def) => def.clone(),
        Err(reason) => {
            reject(ctx, owner, ability, reason);
            return;
        }
    };
    if def.target == AbilityTarget::Tile && !usable_target(&ctx.store, target) {
        reject(ctx, owner, ability, RejectReason::NeedsTarget);
        return;
    }
    if let Err(missing) = bank::try_spend(ctx, owner, &def.cost) {
        ctx.emit(Event::InsufficientResources {
            owner,
            ability,
            missing,
        });
        return;
    }

    ctx.store.remove::<Targeting>(owner);
    if def.cooldown > 0 {
        ctx.store.insert(
            ability,
            Cooldown {
                remaining: def.cooldown,
            },
        );
    }
    info!(target: "tessera::abilities", owner, ability, name = %def.name, "cast");
    ctx.emit(Event::ActionCommitted {
        owner,
        source: ActionSource::Ability(ability),
        ends_turn: def.ends_turn,
    });
    execute(ctx, ability, owner, target);
}

/// Count down cooldowns of `owner`'s abilities after its turn ends.
pub fn tick_cooldowns(ctx: &mut SimulationContext, owner: EntityId) {
    for ability in abilities_of(&ctx.store, owner) {
        let remaining = match ctx.store.get_mut::<Cooldown>(ability) {
            Some(cooldown) => {
                cooldown.remaining = cooldown.remaining.saturating_sub(1);
                cooldown.remaining
            }
            None => continue,
        };
        if remaining == 0 {
            ctx.store.remove::<Cooldown>(ability);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::{Controller, EngineConfig};
    use crate::events::{EventKind, EventLog};
    use crate::game::{Combatant, Health, board_from_layout};

    const LAYOUT: &[&str] = &[
        "fire water hex light",
        "water hex light fire",
        "hex light fire water",
        "light fire water hex",
    ];

    fn duel() -> (SimulationContext, EntityId, EntityId) {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 1);
        board_from_layout(&mut ctx, LAYOUT);
        let spawn = |ctx: &mut SimulationContext, name: &str| {
            let id = ctx.store.create();
            ctx.store.insert(id, Health::full(30));
            ctx.store.insert(
                id,
                Combatant {
                    name: name.to_string(),
                    controller: Controller::Human,
                },
            );
            bank::ensure_bank(&mut ctx.store, id);
            id
        };
        let a = spawn(&mut ctx, "a");
        let b = spawn(&mut ctx, "b");
        turn::begin(&mut ctx);
        (ctx, a, b)
    }

    fn fund(ctx: &mut SimulationContext, owner: EntityId, pairs: &[(&str, u32)]) {
        let amounts: BTreeMap<String, u32> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect();
        bank::deposit(ctx, owner, &amounts);
    }

    #[test]
    fn test_fireball_spends_and_damages() {
        let (mut ctx, a, b) = duel();
        let fireball = equip(&mut ctx, a, "fireball").unwrap();
        fund(&mut ctx, a, &[("fire", 7)]);
        let log = EventLog::attach(&mut ctx);

        request_cast(&mut ctx, fireball, a, None);

        assert_eq!(bank::balance(&ctx.store, a).get("fire"), Some(&2));
        assert_eq!(ctx.store.get::<Health>(b).map(|h| h.current), Some(24));
        assert_eq!(log.count(EventKind::AbilityEffectApplied), 1);
        assert_eq!(turn::active_owner(&ctx.store), Some(b));
    }

    #[test]
    fn test_unaffordable_cast_changes_nothing() {
        let (mut ctx, a, b) = duel();
        let fireball = equip(&mut ctx, a, "fireball").unwrap();
        fund(&mut ctx, a, &[("fire", 2)]);
        let log = EventLog::attach(&mut ctx);

        request_cast(&mut ctx, fireball, a, None);

        match log.of_kind(EventKind::InsufficientResources).as_slice() {
            [Event::InsufficientResources { missing, .. }] => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].required, 5);
                assert_eq!(missing[0].available, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(log.count(EventKind::ActionCommitted), 0);
        assert_eq!(bank::balance(&ctx.store, a).get("fire"), Some(&2));
        assert_eq!(ctx.store.get::<Health>(b).map(|h| h.current), Some(30));
        assert_eq!(turn::active_owner(&ctx.store), Some(a));
    }

    #[test]
    fn test_cast_out_of_turn_is_rejected() {
        let (mut ctx, a, b) = duel();
        let fireball = equip(&mut ctx, b, "fireball").unwrap();
        fund(&mut ctx, b, &[("fire", 5)]);
        let log = EventLog::attach(&mut ctx);
        request_cast(&mut ctx, fireball, b, None);
        assert!(matches!(
            log.of_kind(EventKind::ActionRejected).as_slice(),
            [Event::ActionRejected {
                reason: RejectReason::NotActiveOwner,
                ..
            }]
        ));
        assert_eq!(ctx.store.get::<Health>(a).map(|h| h.current), Some(30));
    }

    #[test]
    fn test_foreign_ability_is_not_owned() {
        let (mut ctx, a, b) = duel();
        let theirs = equip(&mut ctx, b, "fireball").unwrap();
        assert_eq!(
            check_castable(&ctx.store, theirs, a).err(),
            Some(RejectReason::NotOwned)
        );
    }

    #[test]
    fn test_cooldown_blocks_until_owner_turns_pass() {
        let (mut ctx, a, b) = duel();
        let aegis = equip(&mut ctx, a, "aegis").unwrap();
        fund(&mut ctx, a, &[("light", 8), ("water", 4)]);

        request_cast(&mut ctx, aegis, a, None);
        assert_eq!(cooldown_remaining(&ctx.store, aegis), 1);

        ctx.emit(Event::EndTurnRequested { owner: b });
        assert_eq!(turn::active_owner(&ctx.store), Some(a));
        assert_eq!(
            check_castable(&ctx.store, aegis, a).err(),
            Some(RejectReason::OnCooldown(1))
        );

        ctx.emit(Event::EndTurnRequested { owner: a });
        ctx.emit(Event::EndTurnRequested { owner: b });
        assert!(check_castable(&ctx.store, aegis, a).is_ok());
    }

    #[test]
    fn test_tile_ability_enters_targeting_then_casts() {
        let (mut ctx, a, _) = duel();
        let blast = equip(&mut ctx, a, "hex_blast").unwrap();
        fund(&mut ctx, a, &[("hex", 5)]);
        let log = EventLog::attach(&mut ctx);

        activate(&mut ctx, blast, a);
        assert_eq!(ctx.store.get::<Targeting>(a), Some(&Targeting { ability: blast }));
        assert_eq!(log.count(EventKind::AbilityCastRequested), 0);

        request_cast(&mut ctx, blast, a, None);
        assert!(matches!(
            log.of_kind(EventKind::ActionRejected).as_slice(),
            [Event::ActionRejected {
                reason: RejectReason::NeedsTarget,
                ..
            }]
        ));

        request_cast(&mut ctx, blast, a, Some(Position::new(1, 1)));
        assert!(!ctx.store.has::<Targeting>(a));
        assert_eq!(log.count(EventKind::AbilityEffectApplied), 1);
        assert!(log.count(EventKind::TilesCleared) >= 1);
    }

    #[test]
    fn test_keeps_turn_ability_does_not_rotate() {
        let (mut ctx, a, _) = duel();
        let cry = equip(&mut ctx, a, "battle_cry").unwrap();
        fund(&mut ctx, a, &[("fire", 3), ("light", 2)]);
        request_cast(&mut ctx, cry, a, None);
        assert_eq!(turn::active_owner(&ctx.store), Some(a));
        assert!(turn::is_settled(&ctx.store));
    }

    #[test]
    fn test_unequip_all() {
        let (mut ctx, a, _) = duel();
        let first = equip(&mut ctx, a, "fireball").unwrap();
        equip(&mut ctx, a, "kindle").unwrap();
        assert_eq!(abilities_of(&ctx.store, a).len(), 2);
        assert!(unequip(&mut ctx.store, first));
        assert_eq!(unequip_all(&mut ctx.store, a), 1);
        assert!(abilities_of(&ctx.store, a).is_empty());
    }
}
