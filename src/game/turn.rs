//! Turn state machine.
//!
//! An owner commits an action (`Idle -> Acting`), the board may cascade
//! (`Acting -> Cascading`), and once every consequence has settled control
//! either stays with the owner (extra turn) or rotates to the next owner in
//! [`TurnOrder`]. Swaps settle on `CascadeComplete`; abilities settle on
//! `AbilityEffectApplied`, which the ability engine emits after all of its
//! effects (and any cascades they caused) have resolved.

use tracing::{debug, info};

use crate::context::SimulationContext;
use crate::ecs::{Component, EntityId, EntityRemap, EntityStore};
use crate::events::{Event, EventKind};
use crate::game::{Combatant, Health};

/// What an owner committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSource {
    /// A tile swap.
    Swap,
    /// An ability cast (ability entity).
    Ability(EntityId),
}

impl ActionSource {
    fn remap(self, remap: &EntityRemap) -> Self {
        match self {
            ActionSource::Swap => ActionSource::Swap,
            ActionSource::Ability(id) => ActionSource::Ability(remap.apply(id)),
        }
    }
}

/// Coarse machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    /// Nobody is mid-action.
    #[default]
    Idle,
    /// An action is committed and resolving.
    Acting,
    /// Match/clear cycles are in flight.
    Cascading,
}

/// Why an owner may not act right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnBlock {
    /// Someone else holds the turn, or turns have not begun.
    NotActiveOwner,
    /// The previous action has not settled.
    ActionInFlight,
}

/// Singleton turn bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnState {
    /// Current phase.
    pub phase: TurnPhase,
    /// Owner holding the turn.
    pub active_owner: Option<EntityId>,
    /// Depth reported by the last settled cascade.
    pub cascade_depth: u32,
    /// A cascade is between its first clear and `CascadeComplete`.
    pub cascade_active: bool,
    /// The current action cleared at least one tile.
    pub cascade_observed: bool,
    /// Control rotates when the current action settles.
    pub rotation_pending: bool,
    /// A large enough group was matched during the current action.
    pub extra_turn_pending: bool,
    /// The current action already produced its extra turn.
    pub extra_turn_granted: bool,
    /// Whether the current action ends the turn.
    pub ends_turn: bool,
    /// Current action.
    pub action_source: Option<ActionSource>,
    /// Total actions committed.
    pub actions_committed: u64,
    /// Total rotations.
    pub rotations: u32,
    /// Total extra turns granted.
    pub extra_turns: u32,
}

impl Component for TurnState {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        self.active_owner = remap.apply_opt(self.active_owner);
        self.action_source = self.action_source.map(|s| s.remap(remap));
    }
}

/// Cyclic owner order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOrder {
    /// Owners in acting order.
    pub owners: Vec<EntityId>,
}

impl Component for TurnOrder {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        remap.apply_vec(&mut self.owners);
    }
}

/// Whose turn it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTurn {
    /// Acting owner.
    pub owner: EntityId,
}

impl Component for ActiveTurn {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        self.owner = remap.apply(self.owner);
    }
}

/// Last tick frame seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    /// Frame number.
    pub frame: u64,
}

impl Component for Clock {}

/// The entity carrying the turn singletons, if created.
#[must_use]
pub fn turn_entity(store: &EntityStore) -> Option<EntityId> {
    store.singleton::<TurnState>().map(|(id, _)| id)
}

/// Borrow the turn state.
#[must_use]
pub fn turn_state(store: &EntityStore) -> Option<&TurnState> {
    store.singleton::<TurnState>().map(|(_, s)| s)
}

fn turn_state_mut(store: &mut EntityStore) -> Option<&mut TurnState> {
    let id = turn_entity(store)?;
    store.get_mut::<TurnState>(id)
}

/// Owner currently holding the turn.
#[must_use]
pub fn active_owner(store: &EntityStore) -> Option<EntityId> {
    store.singleton::<ActiveTurn>().map(|(_, a)| a.owner)
}

/// Current tick frame.
#[must_use]
pub fn current_frame(store: &EntityStore) -> u64 {
    store.singleton::<Clock>().map_or(0, |(_, c)| c.frame)
}

/// Combatant entities in id order.
#[must_use]
pub fn combatants(store: &EntityStore) -> Vec<EntityId> {
    store.entities_with::<Combatant>()
}

/// Create the turn singletons if any are missing, ordering owners by id.
pub fn ensure_turn_entity(store: &mut EntityStore) -> EntityId {
    let entity = match turn_entity(store) {
        Some(id) => id,
        None => {
            let id = store.create();
            store.insert(id, TurnState::default());
            store.insert(id, Clock::default());
            id
        }
    };
    if !store.has::<TurnOrder>(entity) {
        let owners = combatants(store);
        store.insert(entity, TurnOrder { owners });
    }
    if store.singleton::<ActiveTurn>().is_none() {
        let first = store
            .get::<TurnOrder>(entity)
            .and_then(|o| o.owners.first().copied());
        if let Some(owner) = first {
            store.insert(entity, ActiveTurn { owner });
            if let Some(state) = store.get_mut::<TurnState>(entity) {
                state.active_owner = Some(owner);
            }
        }
    }
    entity
}

/// Whether `owner` may commit an action now.
///
/// # Errors
///
/// Returns the blocking reason.
pub fn check_can_act(store: &EntityStore, owner: EntityId) -> Result<(), TurnBlock> {
    if active_owner(store) != Some(owner) {
        return Err(TurnBlock::NotActiveOwner);
    }
    match turn_state(store) {
        Some(state) if state.phase == TurnPhase::Idle => Ok(()),
        Some(_) => Err(TurnBlock::ActionInFlight),
        None => Err(TurnBlock::NotActiveOwner),
    }
}

/// Whether the world is between actions.
#[must_use]
pub fn is_settled(store: &EntityStore) -> bool {
    turn_state(store).is_none_or(|s| s.phase == TurnPhase::Idle)
}

/// Announce the opening turn.
pub fn begin(ctx: &mut SimulationContext) {
    ensure_turn_entity(&mut ctx.store);
    if let Some(next) = active_owner(&ctx.store) {
        info!(target: "tessera::turn", next, "turns begin");
        ctx.emit(Event::TurnAdvanced {
            previous: None,
            next,
        });
    }
}

fn is_alive(store: &EntityStore, owner: EntityId) -> bool {
    store.get::<Health>(owner).is_none_or(Health::is_alive)
}

/// Advance to the next living owner and announce it. No-op without owners.
pub fn rotate(ctx: &mut SimulationContext) {
    let entity = ensure_turn_entity(&mut ctx.store);
    let owners = ctx
        .store
        .get::<TurnOrder>(entity)
        .map(|o| o.owners.clone())
        .unwrap_or_default();
    if owners.is_empty() {
        return;
    }

    let previous = active_owner(&ctx.store);
    let start = previous
        .and_then(|p| owners.iter().position(|&o| o == p))
        .map_or(0, |i| i + 1);
    let next = (0..owners.len())
        .map(|step| owners[(start + step) % owners.len()])
        .find(|&o| is_alive(&ctx.store, o))
        .unwrap_or(owners[start % owners.len()]);

    ctx.store.insert(entity, ActiveTurn { owner: next });
    if let Some(state) = ctx.store.get_mut::<TurnState>(entity) {
        state.active_owner = Some(next);
        state.phase = TurnPhase::Idle;
        state.rotation_pending = false;
        state.rotations += 1;
    }
    info!(target: "tessera::turn", ?previous, next, "turn advanced");
    ctx.emit(Event::TurnAdvanced { previous, next });
}

fn on_action_committed(ctx: &mut SimulationContext, source: ActionSource, ends_turn: bool) {
    ensure_turn_entity(&mut ctx.store);
    let Some(state) = turn_state_mut(&mut ctx.store) else {
        return;
    };
    state.phase = TurnPhase::Acting;
    state.action_source = Some(source);
    state.ends_turn = ends_turn;
    state.rotation_pending = false;
    state.extra_turn_pending = false;
    state.extra_turn_granted = false;
    state.cascade_observed = false;
    state.cascade_active = false;
    state.cascade_depth = 0;
    state.actions_committed += 1;
}

fn on_tiles_cleared(ctx: &mut SimulationContext) {
    let Some(state) = turn_state_mut(&mut ctx.store) else {
        return;
    };
    if state.phase == TurnPhase::Idle {
        return;
    }
    state.phase = TurnPhase::Cascading;
    state.cascade_active = true;
    if !state.cascade_observed {
        state.cascade_observed = true;
        if state.ends_turn {
            state.rotation_pending = true;
        }
    }
}

fn on_match_found(ctx: &mut SimulationContext, groups: &[Vec<crate::game::Position>]) {
    let threshold = ctx.config().extra_turn_threshold;
    let Some(state) = turn_state_mut(&mut ctx.store) else {
        return;
    };
    if state.phase == TurnPhase::Idle || state.extra_turn_granted {
        return;
    }
    if groups.iter().any(|g| g.len() >= threshold) {
        state.extra_turn_pending = true;
    }
}

fn on_cascade_complete(ctx: &mut SimulationContext, depth: u32) {
    let Some(state) = turn_state_mut(&mut ctx.store) else {
        return;
    };
    if state.phase == TurnPhase::Idle {
        return;
    }
    state.cascade_active = false;
    state.cascade_depth = depth;
    state.phase = TurnPhase::Acting;
    if state.action_source == Some(ActionSource::Swap) {
        settle(ctx);
    }
}

fn on_ability_effect_applied(ctx: &mut SimulationContext) {
    let Some(state) = turn_state_mut(&mut ctx.store) else {
        return;
    };
    if state.phase == TurnPhase::Idle {
        return;
    }
    if state.ends_turn {
        state.rotation_pending = true;
    }
    settle(ctx);
}

/// Close the current action: extra turn, rotation, or neither.
fn settle(ctx: &mut SimulationContext) {
    let Some(state) = turn_state_mut(&mut ctx.store) else {
        return;
    };
    state.phase = TurnPhase::Idle;
    state.cascade_active = false;
    let owner = state.active_owner;

    if state.extra_turn_pending && !state.extra_turn_granted {
        state.extra_turn_pending = false;
        state.extra_turn_granted = true;
        state.rotation_pending = false;
        state.extra_turns += 1;
        if let Some(owner) = owner {
            info!(target: "tessera::turn", owner, "extra turn granted");
            ctx.emit(Event::ExtraTurnGranted { owner });
        }
    } else if state.rotation_pending {
        rotate(ctx);
    } else {
        debug!(target: "tessera::turn", ?owner, "action settled without rotation");
    }
}

fn on_end_turn_requested(ctx: &mut SimulationContext, owner: EntityId) {
    if check_can_act(&ctx.store, owner).is_err() {
        return;
    }
    ctx.emit(Event::TurnPassed { owner });
    rotate(ctx);
}

pub(crate) fn install(ctx: &mut SimulationContext) {
    ctx.on(EventKind::Tick, |ctx, event| {
        if let Event::Tick { frame } = event {
            let entity = ensure_turn_entity(&mut ctx.store);
            ctx.store.insert(entity, Clock { frame: *frame });
        }
    });
    ctx.on(EventKind::ActionCommitted, |ctx, event| {
        if let Event::ActionCommitted {
            source, ends_turn, ..
        } = event
        {
            on_action_committed(ctx, *source, *ends_turn);
        }
    });
    ctx.on(EventKind::TilesCleared, |ctx, _| on_tiles_cleared(ctx));
    ctx.on(EventKind::MatchFound, |ctx, event| {
        if let Event::MatchFound { groups } = event {
            on_match_found(ctx, groups);
        }
    });
    ctx.on(EventKind::CascadeComplete, |ctx, event| {
        if let Event::CascadeComplete { depth } = event {
            on_cascade_complete(ctx, *depth);
        }
    });
    ctx.on(EventKind::AbilityEffectApplied, |ctx, _| {
        on_ability_effect_applied(ctx);
    });
    ctx.on(EventKind::EndTurnRequested, |ctx, event| {
        if let Event::EndTurnRequested { owner } = event {
            on_end_turn_requested(ctx, *owner);
        }
    });
}
