//! Per-owner resource banks.
//!
//! Clearing tiles deposits one unit per tile of its type into the acting
//! owner's bank; abilities spend from it. Counts are unsigned, and a spend
//! either takes the whole cost or nothing.

use std::collections::BTreeMap;

use tracing::debug;

use crate::context::SimulationContext;
use crate::ecs::{Component, EntityId, EntityRemap, EntityStore};
use crate::events::{Event, EventKind};

/// A resource an owner could not pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    /// Resource name.
    pub resource: String,
    /// Amount the cost asks for.
    pub required: u32,
    /// Amount banked.
    pub available: u32,
}

/// Banked resources of one owner. Lives on its own entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceBank {
    /// Owning combatant.
    pub owner: EntityId,
    /// Amount per resource name.
    pub counts: BTreeMap<String, u32>,
}

impl ResourceBank {
    /// Banked amount of one resource.
    #[must_use]
    pub fn get(&self, resource: &str) -> u32 {
        self.counts.get(resource).copied().unwrap_or(0)
    }

    /// Sum over all resources.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&v| u64::from(v)).sum()
    }
}

impl Component for ResourceBank {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        self.owner = remap.apply(self.owner);
    }
}

/// Bank entity belonging to `owner`.
#[must_use]
pub fn bank_of(store: &EntityStore, owner: EntityId) -> Option<EntityId> {
    store
        .query::<ResourceBank>()
        .find(|(_, bank)| bank.owner == owner)
        .map(|(id, _)| id)
}

/// Borrow the bank of `owner`.
#[must_use]
pub fn bank(store: &EntityStore, owner: EntityId) -> Option<&ResourceBank> {
    bank_of(store, owner).and_then(|id| store.get::<ResourceBank>(id))
}

/// Copy of the banked amounts; empty if the owner has no bank.
#[must_use]
pub fn balance(store: &EntityStore, owner: EntityId) -> BTreeMap<String, u32> {
    bank(store, owner).map(|b| b.counts.clone()).unwrap_or_default()
}

/// Find or create the bank of `owner`.
pub fn ensure_bank(store: &mut EntityStore, owner: EntityId) -> EntityId {
    if let Some(id) = bank_of(store, owner) {
        return id;
    }
    let id = store.create();
    store.insert(
        id,
        ResourceBank {
            owner,
            counts: BTreeMap::new(),
        },
    );
    id
}

/// Every resource in `cost` that `owner` cannot cover.
#[must_use]
pub fn shortfalls(
    store: &EntityStore,
    owner: EntityId,
    cost: &BTreeMap<String, u32>,
) -> Vec<Shortfall> {
    let bank = bank(store, owner);
    cost.iter()
        .filter_map(|(resource, &required)| {
            let available = bank.map_or(0, |b| b.get(resource));
            (available < required).then(|| Shortfall {
                resource: resource.clone(),
                required,
                available,
            })
        })
        .collect()
}

/// Whether `owner` can pay `cost` in full.
#[must_use]
pub fn can_afford(store: &EntityStore, owner: EntityId, cost: &BTreeMap<String, u32>) -> bool {
    shortfalls(store, owner, cost).is_empty()
}

/// Add resources and announce the change.
pub fn deposit(ctx: &mut SimulationContext, owner: EntityId, amounts: &BTreeMap<String, u32>) {
    if amounts.values().all(|&v| v == 0) || !ctx.store.contains(owner) {
        return;
    }
    let id = ensure_bank(&mut ctx.store, owner);
    let mut delta = BTreeMap::new();
    if let Some(bank) = ctx.store.get_mut::<ResourceBank>(id) {
        for (resource, &amount) in amounts {
            if amount == 0 {
                continue;
            }
            let slot = bank.counts.entry(resource.clone()).or_default();
            *slot = slot.saturating_add(amount);
            delta.insert(resource.clone(), i64::from(amount));
        }
    }
    ctx.emit(Event::ResourcesChanged { owner, delta });
}

/// Pay `cost` atomically.
///
/// # Errors
///
/// Returns every missing resource and leaves the bank untouched.
pub fn try_spend(
    ctx: &mut SimulationContext,
    owner: EntityId,
    cost: &BTreeMap<String, u32>,
) -> Result<(), Vec<Shortfall>> {
    let missing = shortfalls(&ctx.store, owner, cost);
    if !missing.is_empty() {
        debug!(target: "tessera::bank", owner, ?missing, "spend refused");
        return Err(missing);
    }
    if cost.values().all(|&v| v == 0) {
        return Ok(());
    }
    let mut delta = BTreeMap::new();
    if let Some(bank) = bank_of(&ctx.store, owner).and_then(|id| ctx.store.get_mut::<ResourceBank>(id)) {
        for (resource, &amount) in cost {
            if amount == 0 {
                continue;
            }
            let slot = bank.counts.entry(resource.clone()).or_default();
            *slot -= amount;
            delta.insert(resource.clone(), -i64::from(amount));
        }
    }
    ctx.emit(Event::ResourcesChanged { owner, delta });
    Ok(())
}

/// Remove up to `amount` of one resource; returns what was actually taken.
pub fn withdraw(ctx: &mut SimulationContext, owner: EntityId, resource: &str, amount: u32) -> u32 {
    let taken = match bank_of(&ctx.store, owner).and_then(|id| ctx.store.get_mut::<ResourceBank>(id))
    {
        Some(bank) => {
            let slot = bank.counts.entry(resource.to_string()).or_default();
            let taken = amount.min(*slot);
            *slot -= taken;
            taken
        }
        None => 0,
    };
    if taken > 0 {
        ctx.emit(Event::ResourcesChanged {
            owner,
            delta: BTreeMap::from([(resource.to_string(), -i64::from(taken))]),
        });
    }
    taken
}

/// Empty a bank without deleting it.
pub fn clear_bank(store: &mut EntityStore, owner: EntityId) {
    if let Some(bank) = bank_of(store, owner).and_then(|id| store.get_mut::<ResourceBank>(id)) {
        bank.counts.clear();
    }
}

pub(crate) fn install(ctx: &mut SimulationContext) {
    ctx.on(EventKind::TilesCleared, |ctx, event| {
        if let Event::TilesCleared(cleared) = event {
            if let Some(owner) = cleared.owner {
                deposit(ctx, owner, &cleared.breakdown);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::events::EventLog;

    fn cost(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn test_spend_is_atomic() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let owner = ctx.store.create();
        deposit(&mut ctx, owner, &cost(&[("fire", 5), ("water", 1)]));

        let err = try_spend(&mut ctx, owner, &cost(&[("fire", 3), ("water", 2), ("hex", 1)]))
            .unwrap_err();
        assert_eq!(err.len(), 2);
        assert_eq!(err[0].resource, "hex");
        assert_eq!(err[1].resource, "water");
        assert_eq!(balance(&ctx.store, owner), cost(&[("fire", 5), ("water", 1)]));

        try_spend(&mut ctx, owner, &cost(&[("fire", 3)])).unwrap();
        assert_eq!(bank(&ctx.store, owner).map(|b| b.get("fire")), Some(2));
    }

    #[test]
    fn test_withdraw_saturates() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let owner = ctx.store.create();
        deposit(&mut ctx, owner, &cost(&[("hex", 2)]));
        let log = EventLog::attach(&mut ctx);
        assert_eq!(withdraw(&mut ctx, owner, "hex", 5), 2);
        assert_eq!(withdraw(&mut ctx, owner, "hex", 5), 0);
        assert_eq!(log.count(EventKind::ResourcesChanged), 1);
    }

    #[test]
    fn test_bank_owner_remapped_on_fork() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
        let filler = ctx.store.create();
        let owner = ctx.store.create();
        deposit(&mut ctx, owner, &cost(&[("fire", 1)]));
        ctx.store.delete(filler);

        let (fork, remap) = ctx.fork();
        let forked_owner = remap.apply(owner);
        assert_eq!(bank(&fork.store, forked_owner).map(|b| b.get("fire")), Some(1));
    }
}
