//! Abilities: declarative effect lists, costs, cooldowns and casting.
//!
//! An [`AbilityDefinition`] is data. Equipping one creates an ability entity
//! carrying a copy of the definition, owned by a combatant and listed on its
//! [`AbilityList`]. Casting spends the cost, commits the action and turns
//! each [`EffectSpec`] into an `EffectApply` event against a resolved target.

mod cast;
mod catalog;
mod resolve;

use std::collections::BTreeMap;

use crate::context::SimulationContext;
use crate::ecs::{Component, EntityId, EntityRemap};
use crate::effects::{ExpireTrigger, MetaValue, Metadata};
use crate::events::{Event, EventKind};

pub use cast::{
    RejectReason, abilities_of, activate, check_castable, cooldown_remaining, equip,
    request_cast, tick_cooldowns, unequip, unequip_all,
};
pub use catalog::AbilityCatalog;
pub use resolve::{execute, resolve_target};

/// Whether casting needs a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbilityTarget {
    /// Casts immediately.
    #[default]
    None,
    /// Enters targeting mode and needs a tile position.
    Tile,
}

/// Who an effect spec lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// The caster.
    SelfTarget,
    /// The other combatant.
    Opponent,
    /// The tile entity at the pending target.
    PendingTarget,
    /// The pending tile if one was chosen, else the caster.
    PendingTargetOrSelf,
    /// The board entity.
    Board,
}

/// Copy an ability parameter into a metadata key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamOverride {
    /// Metadata key to overwrite.
    pub key: String,
    /// Ability parameter to read.
    pub param: String,
}

/// One declarative effect of an ability.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSpec {
    /// Effect slug.
    pub slug: String,
    /// Target kind.
    pub target: TargetKind,
    /// Lifetime in owner turns.
    pub turns: Option<u32>,
    /// Default metadata.
    pub metadata: Metadata,
    /// Parameters overlaid onto the metadata.
    pub overrides: Vec<ParamOverride>,
    /// Stack key.
    pub stack_key: Option<String>,
    /// Fold into an existing counter.
    pub cumulative: bool,
    /// Allow independent instances.
    pub allow_multiple: bool,
    /// Refresh an existing instance in place.
    pub refresh: bool,
    /// Counter contribution.
    pub count: i64,
    /// Ability parameter that overrides `count`.
    pub count_param: Option<String>,
    /// Expiry triggers.
    pub expire_on: Vec<ExpireTrigger>,
}

impl EffectSpec {
    /// A spec with defaults: permanent, count 1, multiple instances allowed.
    #[must_use]
    pub fn new(slug: &str, target: TargetKind) -> Self {
        Self {
            slug: slug.to_string(),
            target,
            turns: None,
            metadata: Metadata::new(),
            overrides: Vec::new(),
            stack_key: None,
            cumulative: false,
            allow_multiple: true,
            refresh: false,
            count: 1,
            count_param: None,
            expire_on: Vec::new(),
        }
    }

    /// Set the lifetime.
    #[must_use]
    pub fn turns(mut self, turns: u32) -> Self {
        self.turns = Some(turns);
        self
    }

    /// Add a metadata default.
    #[must_use]
    pub fn meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.set(key, value);
        self
    }

    /// Overlay ability parameter `param` onto metadata `key`.
    #[must_use]
    pub fn param(mut self, key: &str, param: &str) -> Self {
        self.overrides.push(ParamOverride {
            key: key.to_string(),
            param: param.to_string(),
        });
        self
    }

    /// Stack into a counter of `count`.
    #[must_use]
    pub fn cumulative(mut self, count: i64) -> Self {
        self.cumulative = true;
        self.count = count;
        self
    }

    /// Take the counter contribution from ability parameter `param`.
    #[must_use]
    pub fn count_param(mut self, param: &str) -> Self {
        self.count_param = Some(param.to_string());
        self
    }

    /// Replace earlier instances.
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.allow_multiple = false;
        self
    }

    /// Refresh an existing instance in place.
    #[must_use]
    pub fn refresh(mut self) -> Self {
        self.refresh = true;
        self
    }

    /// Add an expiry trigger.
    #[must_use]
    pub fn expire_on(mut self, event: EventKind, owner_guard: bool) -> Self {
        self.expire_on.push(ExpireTrigger { event, owner_guard });
        self
    }
}

/// Ability data.
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityDefinition {
    /// Catalog key.
    pub name: String,
    /// Flavour text.
    pub description: String,
    /// Resources spent per cast.
    pub cost: BTreeMap<String, u32>,
    /// Owner turns before the next cast.
    pub cooldown: u32,
    /// Target requirement.
    pub target: AbilityTarget,
    /// Effects, in order.
    pub effects: Vec<EffectSpec>,
    /// Tunable numbers referenced by spec overrides.
    pub params: BTreeMap<String, f64>,
    /// Whether casting ends the turn once settled.
    pub ends_turn: bool,
}

impl AbilityDefinition {
    /// An empty, turn-ending, untargeted ability.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            cost: BTreeMap::new(),
            cooldown: 0,
            target: AbilityTarget::None,
            effects: Vec::new(),
            params: BTreeMap::new(),
            ends_turn: true,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn describe(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    /// Add a cost entry.
    #[must_use]
    pub fn cost(mut self, resource: &str, amount: u32) -> Self {
        self.cost.insert(resource.to_string(), amount);
        self
    }

    /// Set the cooldown.
    #[must_use]
    pub fn cooldown(mut self, turns: u32) -> Self {
        self.cooldown = turns;
        self
    }

    /// Require a tile target.
    #[must_use]
    pub fn targets_tile(mut self) -> Self {
        self.target = AbilityTarget::Tile;
        self
    }

    /// Append an effect spec.
    #[must_use]
    pub fn effect(mut self, spec: EffectSpec) -> Self {
        self.effects.push(spec);
        self
    }

    /// Set a parameter.
    #[must_use]
    pub fn param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    /// Keep the turn after casting.
    #[must_use]
    pub fn keeps_turn(mut self) -> Self {
        self.ends_turn = false;
        self
    }
}

/// An equipped ability.
#[derive(Debug, Clone, PartialEq)]
pub struct Ability {
    /// Owning combatant.
    pub owner: EntityId,
    /// Definition copy.
    pub definition: AbilityDefinition,
}

impl Component for Ability {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        self.owner = remap.apply(self.owner);
    }
}

/// Abilities equipped by a combatant, in equip order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbilityList {
    /// Ability entities.
    pub abilities: Vec<EntityId>,
}

impl Component for AbilityList {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        remap.apply_vec(&mut self.abilities);
    }
}

/// Turns until an ability can be cast again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cooldown {
    /// Remaining owner turns.
    pub remaining: u32,
}

impl Component for Cooldown {}

pub(crate) fn install(ctx: &mut SimulationContext) {
    ctx.on(EventKind::AbilityCastRequested, |ctx, event| {
        if let Event::AbilityCastRequested {
            ability,
            owner,
            target,
        } = event
        {
            request_cast(ctx, *ability, *owner, *target);
        }
    });
}

pub(crate) fn install_cooldowns(ctx: &mut SimulationContext) {
    ctx.on(EventKind::TurnAdvanced, |ctx, event| {
        if let Event::TurnAdvanced {
            previous: Some(previous),
            ..
        } = event
        {
            tick_cooldowns(ctx, *previous);
        }
    });
}
