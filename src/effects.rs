//! Effect lifecycle.
//!
//! Effects are entities attached to an owner: buffs, debuffs, damage over
//! time, markers. They are created from [`EffectApply`] requests, listed on
//! the owner's [`EffectList`], and destroyed by duration, replacement,
//! explicit removal or an event trigger.
//!
//! A few slugs are *instant*: they act on apply (deal damage, transform
//! tiles, gain resources) and never become entities. Everything else is
//! stored; `poison`, `burn`, `regen`, `damage_bonus` and `ward` have
//! behaviour attached, other slugs are inert markers.

mod instant;
mod lifecycle;
mod metadata;
mod status;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::context::SimulationContext;
use crate::ecs::{Component, EntityId, EntityRemap, EntityStore};
use crate::events::{Event, EventKind};

pub use instant::INSTANT_SLUGS;
pub use lifecycle::{
    apply, effects_of, expire, find_effects, on_turn_advance, remove_effect, remove_matching,
};
pub use metadata::{MetaValue, Metadata};
pub use status::{damage_bonus, find_ward, tick_status};

/// Why an effect ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// Its turns or count ran out.
    Duration,
    /// A non-stacking application took its place.
    Replaced,
    /// Explicit removal or combat reset.
    Removed,
    /// An expiry trigger fired.
    Event(EventKind),
}

impl fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryReason::Duration => f.write_str("duration"),
            ExpiryReason::Replaced => f.write_str("replaced"),
            ExpiryReason::Removed => f.write_str("removed"),
            ExpiryReason::Event(kind) => write!(f, "event:{}", kind.name()),
        }
    }
}

/// Expire an effect when an event of `event` kind is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpireTrigger {
    /// Triggering event kind.
    pub event: EventKind,
    /// Only fire when the event's subject is the effect's owner.
    pub owner_guard: bool,
}

/// Values shared by every effect of one ability execution.
///
/// Effects applied later in the same execution can read what earlier ones
/// wrote, e.g. how many tiles were transformed. Clones share the table.
#[derive(Clone, Default)]
pub struct Scratchpad(Rc<RefCell<BTreeMap<String, i64>>>);

impl fmt::Debug for Scratchpad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Scratchpad").field(&self.0.borrow()).finish()
    }
}

impl Scratchpad {
    /// Read a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.borrow().get(key).copied()
    }

    /// Add to a value, starting from zero.
    pub fn add(&self, key: &str, amount: i64) {
        *self.0.borrow_mut().entry(key.to_string()).or_default() += amount;
    }

    /// Overwrite a value.
    pub fn set(&self, key: &str, value: i64) {
        self.0.borrow_mut().insert(key.to_string(), value);
    }
}

/// Request to apply an effect. Carried by [`Event::EffectApply`].
#[derive(Debug, Clone)]
pub struct EffectApply {
    /// Entity receiving the effect; `None` makes the request a no-op.
    pub owner: Option<EntityId>,
    /// Effect kind.
    pub slug: String,
    /// Ability entity that produced it.
    pub source: Option<EntityId>,
    /// Combatant that cast it.
    pub caster: Option<EntityId>,
    /// Effect parameters.
    pub metadata: Metadata,
    /// Lifetime in owner turns; `None` is permanent.
    pub turns: Option<u32>,
    /// Separates otherwise identical slugs.
    pub stack_key: Option<String>,
    /// Fold into an existing cumulative effect's counter.
    pub cumulative: bool,
    /// Allow independent simultaneous instances.
    pub allow_multiple: bool,
    /// Overwrite a matching effect in place.
    pub refresh: bool,
    /// Counter contribution.
    pub count: i64,
    /// Event triggers that expire the effect.
    pub expire_on: Vec<ExpireTrigger>,
    /// Per-execution shared values.
    pub scratch: Scratchpad,
}

impl EffectApply {
    /// A plain request: permanent, count 1, multiple instances allowed.
    #[must_use]
    pub fn new(owner: EntityId, slug: &str) -> Self {
        Self {
            owner: Some(owner),
            slug: slug.to_string(),
            source: None,
            caster: None,
            metadata: Metadata::new(),
            turns: None,
            stack_key: None,
            cumulative: false,
            allow_multiple: true,
            refresh: false,
            count: 1,
            expire_on: Vec::new(),
            scratch: Scratchpad::default(),
        }
    }

    /// Set the lifetime.
    #[must_use]
    pub fn turns(mut self, turns: u32) -> Self {
        self.turns = Some(turns);
        self
    }

    /// Set the counter contribution.
    #[must_use]
    pub fn count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    /// Stack into an existing counter.
    #[must_use]
    pub fn cumulative(mut self) -> Self {
        self.cumulative = true;
        self
    }

    /// Replace earlier instances instead of adding one.
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.allow_multiple = false;
        self
    }

    /// Refresh a matching instance in place.
    #[must_use]
    pub fn refresh(mut self) -> Self {
        self.refresh = true;
        self
    }

    /// Set the stack key.
    #[must_use]
    pub fn stack_key(mut self, key: &str) -> Self {
        self.stack_key = Some(key.to_string());
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add an expiry trigger.
    #[must_use]
    pub fn expire_on(mut self, event: EventKind, owner_guard: bool) -> Self {
        self.expire_on.push(ExpireTrigger { event, owner_guard });
        self
    }

    /// Set source ability and caster.
    #[must_use]
    pub fn from_ability(mut self, ability: EntityId, caster: EntityId) -> Self {
        self.source = Some(ability);
        self.caster = Some(caster);
        self
    }
}

/// A live effect entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    /// Effect kind.
    pub slug: String,
    /// Entity it is attached to.
    pub owner: EntityId,
    /// Ability that produced it.
    pub source: Option<EntityId>,
    /// Combatant that cast it.
    pub caster: Option<EntityId>,
    /// Parameters.
    pub metadata: Metadata,
    /// Stack key.
    pub stack_key: Option<String>,
    /// Whether further applications fold into `count`.
    pub cumulative: bool,
    /// Counter.
    pub count: i64,
    /// Remaining owner turns; `None` is permanent.
    pub turns: Option<u32>,
}

impl Component for Effect {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        self.owner = remap.apply(self.owner);
        self.source = remap.apply_opt(self.source);
        self.caster = remap.apply_opt(self.caster);
        self.metadata.remap(remap);
    }
}

/// Effects attached to an owner, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectList {
    /// Effect entities.
    pub effects: Vec<EntityId>,
}

impl Component for EffectList {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        remap.apply_vec(&mut self.effects);
    }
}

/// Event triggers registered by an effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpireOn {
    /// Triggers.
    pub triggers: Vec<ExpireTrigger>,
}

impl Component for ExpireOn {}

/// Whether `owner` carries at least one `slug` effect.
#[must_use]
pub fn has_effect(store: &EntityStore, owner: EntityId, slug: &str) -> bool {
    !find_effects(store, owner, slug).is_empty()
}

/// Subscribe one fan-out handler for `kind` unless one exists.
fn ensure_trigger_hub(ctx: &mut SimulationContext, kind: EventKind) {
    if ctx.claim_trigger_kind(kind) {
        ctx.on(kind, move |ctx, event| lifecycle::fire_triggers(ctx, kind, event));
    }
}

/// Re-create trigger hubs for every trigger present in the store; used after
/// forking, whose dispatcher starts empty.
pub(crate) fn restore_triggers(ctx: &mut SimulationContext) {
    let kinds: std::collections::BTreeSet<EventKind> = ctx
        .store
        .query::<ExpireOn>()
        .flat_map(|(_, on)| on.triggers.iter().map(|t| t.event))
        .collect();
    for kind in kinds {
        ensure_trigger_hub(ctx, kind);
    }
}

pub(crate) fn install(ctx: &mut SimulationContext) {
    ctx.on(EventKind::EffectApply, |ctx, event| {
        if let Event::EffectApply(request) = event {
            if !instant::resolve(ctx, request) {
                apply(ctx, request);
            }
        }
    });
    ctx.on(EventKind::TurnAdvanced, |ctx, event| {
        if let Event::TurnAdvanced {
            previous: Some(previous),
            ..
        } = event
        {
            tick_status(ctx, *previous);
            on_turn_advance(ctx, *previous);
        }
    });
}
