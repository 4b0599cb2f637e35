//! Typed, synchronous publish/subscribe.
//!
//! Every event is a variant of [`Event`] carrying a strongly typed payload.
//! Handlers are registered per [`EventKind`] and fire in registration order.
//! Emission is re-entrant and depth-first: a handler that emits runs the
//! nested event's handlers to completion before it continues.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::abilities::RejectReason;
use crate::context::SimulationContext;
use crate::ecs::EntityId;
use crate::effects::{EffectApply, ExpiryReason};
use crate::game::{ActionSource, ClashOutcome, GravityMove, Position, Shortfall, SwapRejection};

/// Mouse button reported by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button; cancels targeting.
    Right,
    /// Wheel button.
    Middle,
}

/// Presentation sequencing hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationKind {
    /// Tiles being removed.
    Clear,
    /// Tiles falling.
    Gravity,
    /// New tiles appearing.
    Refill,
}

/// Payload of [`Event::TilesCleared`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesCleared {
    /// Acting owner credited with the clear, if any.
    pub owner: Option<EntityId>,
    /// Positions that went inactive.
    pub positions: Vec<Position>,
    /// Cleared tile count per tile type.
    pub breakdown: BTreeMap<String, u32>,
}

/// Every event the engine emits or consumes.
#[derive(Debug, Clone)]
pub enum Event {
    /// Externally driven pacing tick.
    Tick {
        /// Monotonic frame number.
        frame: u64,
    },
    /// A grid cell was clicked.
    TileClicked(Position),
    /// Raw mouse press; only the right button is interpreted here.
    MousePressed {
        /// Screen x.
        x: i32,
        /// Screen y.
        y: i32,
        /// Which button.
        button: MouseButton,
    },
    /// Player asked to activate an ability (may enter targeting mode).
    AbilityActivateRequested {
        /// Ability entity.
        ability: EntityId,
        /// Requesting owner.
        owner: EntityId,
    },
    /// Commit an ability cast against an optional tile target.
    AbilityCastRequested {
        /// Ability entity.
        ability: EntityId,
        /// Casting owner.
        owner: EntityId,
        /// Pending tile target.
        target: Option<Position>,
    },
    /// Request to swap two tiles.
    SwapRequested {
        /// Acting owner.
        owner: EntityId,
        /// First cell.
        a: Position,
        /// Second cell.
        b: Position,
    },
    /// Owner gives up the rest of the turn.
    EndTurnRequested {
        /// Passing owner.
        owner: EntityId,
    },
    /// A legal swap was performed.
    SwapApplied {
        /// Acting owner.
        owner: EntityId,
        /// First cell.
        a: Position,
        /// Second cell.
        b: Position,
    },
    /// A swap request was refused; nothing changed.
    SwapRejected {
        /// Requesting owner.
        owner: EntityId,
        /// First cell.
        a: Position,
        /// Second cell.
        b: Position,
        /// Why it was refused.
        reason: SwapRejection,
    },
    /// Match groups detected on the board.
    MatchFound {
        /// Flattened, merged groups.
        groups: Vec<Vec<Position>>,
    },
    /// Tiles were cleared.
    TilesCleared(TilesCleared),
    /// Gravity moved tiles.
    GravityApplied {
        /// Every tile move, column by column.
        moves: Vec<GravityMove>,
    },
    /// Empty cells were refilled.
    RefillCompleted {
        /// Cells that received a new tile.
        positions: Vec<Position>,
    },
    /// Tiles changed type in place.
    TilesTransformed {
        /// Changed cells.
        positions: Vec<Position>,
        /// New tile type.
        kind: String,
    },
    /// A cascade chain settled.
    CascadeComplete {
        /// Number of follow-up clears after the initial one.
        depth: u32,
    },
    /// Start of a visual sequence.
    AnimationStart {
        /// Sequence kind.
        kind: AnimationKind,
        /// Cells involved.
        items: Vec<Position>,
    },
    /// End of a visual sequence.
    AnimationComplete {
        /// Sequence kind.
        kind: AnimationKind,
        /// Cells involved.
        items: Vec<Position>,
    },
    /// An owner committed to an action; costs are already paid.
    ActionCommitted {
        /// Acting owner.
        owner: EntityId,
        /// Swap or ability.
        source: ActionSource,
        /// Whether the action ends the turn when it settles.
        ends_turn: bool,
    },
    /// An ability request was refused before anything was spent.
    ActionRejected {
        /// Requesting owner.
        owner: EntityId,
        /// Ability involved.
        ability: EntityId,
        /// Why it was refused.
        reason: RejectReason,
    },
    /// Owner entered tile-targeting mode.
    TargetingStarted {
        /// Targeting owner.
        owner: EntityId,
        /// Ability waiting for a target.
        ability: EntityId,
    },
    /// Targeting or selection was cancelled.
    TargetingCancelled {
        /// Owner whose transient state was cleared.
        owner: EntityId,
    },
    /// A cast failed for lack of banked resources.
    InsufficientResources {
        /// Casting owner.
        owner: EntityId,
        /// Ability that could not be paid for.
        ability: EntityId,
        /// Every missing resource.
        missing: Vec<Shortfall>,
    },
    /// An ability finished emitting its effects.
    AbilityEffectApplied {
        /// Ability entity.
        ability: EntityId,
        /// Casting owner.
        owner: EntityId,
        /// Distinct affected entities, in first-seen order.
        affected: Vec<EntityId>,
    },
    /// Request to apply an effect.
    EffectApply(Box<EffectApply>),
    /// A new effect entity was created.
    EffectApplied {
        /// Effect entity.
        effect: EntityId,
        /// Owner.
        owner: EntityId,
        /// Effect slug.
        slug: String,
    },
    /// A cumulative effect absorbed another application.
    EffectStacked {
        /// Effect entity.
        effect: EntityId,
        /// Owner.
        owner: EntityId,
        /// Effect slug.
        slug: String,
        /// Counter after stacking.
        count: i64,
    },
    /// An effect was refreshed in place.
    EffectRefreshed {
        /// Effect entity.
        effect: EntityId,
        /// Owner.
        owner: EntityId,
        /// Effect slug.
        slug: String,
    },
    /// An effect was destroyed.
    EffectExpired {
        /// Former effect entity.
        effect: EntityId,
        /// Owner.
        owner: EntityId,
        /// Effect slug.
        slug: String,
        /// Why it ended.
        reason: ExpiryReason,
    },
    /// Health damage landed.
    DamageDealt {
        /// Damaged entity.
        target: EntityId,
        /// Damage amount.
        amount: i64,
        /// Dealing entity, if any.
        source: Option<EntityId>,
    },
    /// A ward absorbed a hit.
    DamagePrevented {
        /// Protected entity.
        target: EntityId,
        /// Absorbed amount.
        amount: i64,
        /// Effect that absorbed it.
        by: EntityId,
    },
    /// Health value changed.
    HealthChanged {
        /// Entity whose health changed.
        entity: EntityId,
        /// Signed change.
        delta: i64,
        /// Value after the change.
        current: i64,
    },
    /// Resource bank contents changed.
    ResourcesChanged {
        /// Bank owner.
        owner: EntityId,
        /// Signed change per resource.
        delta: BTreeMap<String, i64>,
    },
    /// Control rotated to the next owner.
    TurnAdvanced {
        /// Owner whose turn ended; `None` for the opening turn.
        previous: Option<EntityId>,
        /// Owner now acting.
        next: EntityId,
    },
    /// The acting owner keeps control.
    ExtraTurnGranted {
        /// Owner receiving another action.
        owner: EntityId,
    },
    /// Owner ended the turn without acting.
    TurnPassed {
        /// Passing owner.
        owner: EntityId,
    },
    /// A combatant's health reached zero.
    EnemyDefeated {
        /// Defeated entity.
        entity: EntityId,
        /// Display name.
        name: String,
    },
    /// Combat state was torn down.
    CombatReset {
        /// Reason tag.
        reason: String,
    },
    /// A regiment clash was applied.
    ClashResolved {
        /// Attacking regiment.
        attacker: EntityId,
        /// Defending regiment.
        defender: EntityId,
        /// Computed outcome.
        outcome: ClashOutcome,
    },
}

macro_rules! event_kinds {
    ($($kind:ident => $name:literal),+ $(,)?) => {
        /// Discriminant of [`Event`], used as the subscription key.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum EventKind {
            $(
                #[allow(missing_docs)]
                $kind,
            )+
        }

        impl EventKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [EventKind] = &[$(EventKind::$kind),+];

            /// Stable snake-case name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(EventKind::$kind => $name,)+
                }
            }
        }
    };
}

event_kinds! {
    Tick => "tick",
    TileClicked => "tile_clicked",
    MousePressed => "mouse_pressed",
    AbilityActivateRequested => "ability_activate_requested",
    AbilityCastRequested => "ability_cast_requested",
    SwapRequested => "swap_requested",
    EndTurnRequested => "end_turn_requested",
    SwapApplied => "swap_applied",
    SwapRejected => "swap_rejected",
    MatchFound => "match_found",
    TilesCleared => "tiles_cleared",
    GravityApplied => "gravity_applied",
    RefillCompleted => "refill_completed",
    TilesTransformed => "tiles_transformed",
    CascadeComplete => "cascade_complete",
    AnimationStart => "animation_start",
    AnimationComplete => "animation_complete",
    ActionCommitted => "action_committed",
    ActionRejected => "action_rejected",
    TargetingStarted => "targeting_started",
    TargetingCancelled => "targeting_cancelled",
    InsufficientResources => "insufficient_resources",
    AbilityEffectApplied => "ability_effect_applied",
    EffectApply => "effect_apply",
    EffectApplied => "effect_applied",
    EffectStacked => "effect_stacked",
    EffectRefreshed => "effect_refreshed",
    EffectExpired => "effect_expired",
    DamageDealt => "damage_dealt",
    DamagePrevented => "damage_prevented",
    HealthChanged => "health_changed",
    ResourcesChanged => "resources_changed",
    TurnAdvanced => "turn_advanced",
    ExtraTurnGranted => "extra_turn_granted",
    TurnPassed => "turn_passed",
    EnemyDefeated => "enemy_defeated",
    CombatReset => "combat_reset",
    ClashResolved => "clash_resolved",
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Event {
    /// Subscription key of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Tick { .. } => EventKind::Tick,
            Event::TileClicked(_) => EventKind::TileClicked,
            Event::MousePressed { .. } => EventKind::MousePressed,
            Event::AbilityActivateRequested { .. } => EventKind::AbilityActivateRequested,
            Event::AbilityCastRequested { .. } => EventKind::AbilityCastRequested,
            Event::SwapRequested { .. } => EventKind::SwapRequested,
            Event::EndTurnRequested { .. } => EventKind::EndTurnRequested,
            Event::SwapApplied { .. } => EventKind::SwapApplied,
            Event::SwapRejected { .. } => EventKind::SwapRejected,
            Event::MatchFound { .. } => EventKind::MatchFound,
            Event::TilesCleared(_) => EventKind::TilesCleared,
            Event::GravityApplied { .. } => EventKind::GravityApplied,
            Event::RefillCompleted { .. } => EventKind::RefillCompleted,
            Event::TilesTransformed { .. } => EventKind::TilesTransformed,
            Event::CascadeComplete { .. } => EventKind::CascadeComplete,
            Event::AnimationStart { .. } => EventKind::AnimationStart,
            Event::AnimationComplete { .. } => EventKind::AnimationComplete,
            Event::ActionCommitted { .. } => EventKind::ActionCommitted,
            Event::ActionRejected { .. } => EventKind::ActionRejected,
            Event::TargetingStarted { .. } => EventKind::TargetingStarted,
            Event::TargetingCancelled { .. } => EventKind::TargetingCancelled,
            Event::InsufficientResources { .. } => EventKind::InsufficientResources,
            Event::AbilityEffectApplied { .. } => EventKind::AbilityEffectApplied,
            Event::EffectApply(_) => EventKind::EffectApply,
            Event::EffectApplied { .. } => EventKind::EffectApplied,
            Event::EffectStacked { .. } => EventKind::EffectStacked,
            Event::EffectRefreshed { .. } => EventKind::EffectRefreshed,
            Event::EffectExpired { .. } => EventKind::EffectExpired,
            Event::DamageDealt { .. } => EventKind::DamageDealt,
            Event::DamagePrevented { .. } => EventKind::DamagePrevented,
            Event::HealthChanged { .. } => EventKind::HealthChanged,
            Event::ResourcesChanged { .. } => EventKind::ResourcesChanged,
            Event::TurnAdvanced { .. } => EventKind::TurnAdvanced,
            Event::ExtraTurnGranted { .. } => EventKind::ExtraTurnGranted,
            Event::TurnPassed { .. } => EventKind::TurnPassed,
            Event::EnemyDefeated { .. } => EventKind::EnemyDefeated,
            Event::CombatReset { .. } => EventKind::CombatReset,
            Event::ClashResolved { .. } => EventKind::ClashResolved,
        }
    }

    /// The entity this event is "about", used by owner-guarded triggers.
    #[must_use]
    pub fn subject(&self) -> Option<EntityId> {
        match self {
            Event::AbilityActivateRequested { owner, .. }
            | Event::AbilityCastRequested { owner, .. }
            | Event::SwapRequested { owner, .. }
            | Event::EndTurnRequested { owner }
            | Event::SwapApplied { owner, .. }
            | Event::SwapRejected { owner, .. }
            | Event::ActionCommitted { owner, .. }
            | Event::ActionRejected { owner, .. }
            | Event::TargetingStarted { owner, .. }
            | Event::TargetingCancelled { owner }
            | Event::InsufficientResources { owner, .. }
            | Event::AbilityEffectApplied { owner, .. }
            | Event::EffectApplied { owner, .. }
            | Event::EffectStacked { owner, .. }
            | Event::EffectRefreshed { owner, .. }
            | Event::EffectExpired { owner, .. }
            | Event::ResourcesChanged { owner, .. }
            | Event::ExtraTurnGranted { owner }
            | Event::TurnPassed { owner } => Some(*owner),
            Event::TilesCleared(cleared) => cleared.owner,
            Event::EffectApply(apply) => apply.owner,
            Event::DamageDealt { target, .. } | Event::DamagePrevented { target, .. } => {
                Some(*target)
            }
            Event::HealthChanged { entity, .. } | Event::EnemyDefeated { entity, .. } => {
                Some(*entity)
            }
            Event::TurnAdvanced { previous, .. } => *previous,
            Event::ClashResolved { defender, .. } => Some(*defender),
            Event::Tick { .. }
            | Event::TileClicked(_)
            | Event::MousePressed { .. }
            | Event::MatchFound { .. }
            | Event::GravityApplied { .. }
            | Event::RefillCompleted { .. }
            | Event::TilesTransformed { .. }
            | Event::CascadeComplete { .. }
            | Event::AnimationStart { .. }
            | Event::AnimationComplete { .. }
            | Event::CombatReset { .. } => None,
        }
    }
}

/// Event handler. Receives the whole context so it can mutate state and emit.
pub type Handler = Rc<dyn Fn(&mut SimulationContext, &Event)>;

/// Identifier returned by [`Dispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

/// Listener registry keyed by event kind.
#[derive(Default)]
pub struct Dispatcher {
    next_id: u64,
    handlers: BTreeMap<EventKind, Vec<(HandlerId, Handler)>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<_, _> = self
            .handlers
            .iter()
            .map(|(kind, list)| (kind.name(), list.len()))
            .collect();
        f.debug_struct("Dispatcher").field("handlers", &counts).finish()
    }
}

impl Dispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; it fires after every handler already registered
    /// for the same kind.
    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.handlers.entry(kind).or_default().push((id, handler));
        id
    }

    /// Remove a handler. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        for list in self.handlers.values_mut() {
            if let Some(index) = list.iter().position(|(h, _)| *h == id) {
                list.remove(index);
                return true;
            }
        }
        false
    }

    /// Snapshot of the handlers for a kind, in registration order.
    ///
    /// Emission iterates the snapshot, so handlers added while an event is
    /// being delivered only see later events.
    #[must_use]
    pub fn handlers_for(&self, kind: EventKind) -> Vec<Handler> {
        self.handlers
            .get(&kind)
            .map(|list| list.iter().map(|(_, h)| Rc::clone(h)).collect())
            .unwrap_or_default()
    }

    /// Number of handlers registered for a kind.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

/// Records every emitted event. Cloning shares the same buffer.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.events.borrow().len())
            .finish()
    }
}

impl EventLog {
    /// Subscribe a recorder for every event kind.
    #[must_use]
    pub fn attach(ctx: &mut SimulationContext) -> Self {
        let log = Self::default();
        for &kind in EventKind::ALL {
            let sink = Rc::clone(&log.events);
            ctx.on(kind, move |_, event| sink.borrow_mut().push(event.clone()));
        }
        log
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Recorded kinds in emission order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(Event::kind).collect()
    }

    /// Number of recorded events of a kind.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.borrow().iter().filter(|e| e.kind() == kind).count()
    }

    /// Recorded events of a kind.
    #[must_use]
    pub fn of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
