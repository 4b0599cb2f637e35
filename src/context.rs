//! The simulation context: one world.
//!
//! A [`SimulationContext`] bundles the entity store, the event dispatcher, the
//! seeded RNG and the read-only tables (configuration, resource registry,
//! ability catalog). Every engine takes it by `&mut`; there is no global state.
//! The AI planner's sandbox is just a second context built by
//! [`SimulationContext::fork`].

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::trace;

use crate::abilities::{self, AbilityCatalog};
use crate::config::EngineConfig;
use crate::ecs::{EntityRemap, EntityStore};
use crate::effects;
use crate::events::{Dispatcher, Event, EventKind, Handler, HandlerId};
use crate::game::{self, ResourceRegistry};

/// A complete, independently mutable world.
pub struct SimulationContext {
    /// Component database; the single source of truth.
    pub store: EntityStore,
    /// Every random draw goes through this generator.
    pub rng: StdRng,
    dispatcher: Dispatcher,
    config: Rc<EngineConfig>,
    registry: Rc<ResourceRegistry>,
    catalog: Rc<AbilityCatalog>,
    trigger_kinds: BTreeSet<EventKind>,
    depth: u32,
}

impl fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationContext")
            .field("store", &self.store)
            .field("dispatcher", &self.dispatcher)
            .field("trigger_kinds", &self.trigger_kinds)
            .finish_non_exhaustive()
    }
}

impl SimulationContext {
    /// Create a world with the built-in ability catalog and every core
    /// engine installed. The board and combatants are not created; see
    /// [`crate::game::build_encounter`].
    #[must_use]
    pub fn new(config: EngineConfig, seed: u64) -> Self {
        Self::with_catalog(config, AbilityCatalog::builtin(), seed)
    }

    /// Like [`SimulationContext::new`] with a caller-supplied catalog.
    #[must_use]
    pub fn with_catalog(config: EngineConfig, catalog: AbilityCatalog, seed: u64) -> Self {
        let registry = Rc::new(config.registry());
        let mut ctx = Self {
            store: EntityStore::new(),
            rng: StdRng::seed_from_u64(seed),
            dispatcher: Dispatcher::new(),
            config: Rc::new(config),
            registry,
            catalog: Rc::new(catalog),
            trigger_kinds: BTreeSet::new(),
            depth: 0,
        };
        ctx.install_core_systems();
        ctx
    }

    /// Register every rules engine, in the order their handlers must fire.
    fn install_core_systems(&mut self) {
        game::input::install(self);
        game::board::install(self);
        abilities::install(self);
        game::bank::install(self);
        game::turn::install(self);
        effects::install(self);
        abilities::install_cooldowns(self);
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tile type registry.
    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Ability definitions.
    #[must_use]
    pub fn catalog(&self) -> &AbilityCatalog {
        &self.catalog
    }

    /// Subscribe a shared handler.
    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) -> HandlerId {
        self.dispatcher.subscribe(kind, handler)
    }

    /// Subscribe a closure.
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&mut SimulationContext, &Event) + 'static,
    {
        self.dispatcher.subscribe(kind, Rc::new(handler))
    }

    /// Remove a handler.
    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Number of handlers subscribed to a kind.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.dispatcher.handler_count(kind)
    }

    /// Deliver an event to every handler of its kind, synchronously.
    ///
    /// Handlers may emit further events; those are delivered depth-first
    /// before the next handler of this event runs.
    pub fn emit(&mut self, event: Event) {
        trace!(target: "tessera::events", depth = self.depth, kind = %event.kind(), "emit");
        let handlers = self.dispatcher.handlers_for(event.kind());
        self.depth += 1;
        for handler in handlers {
            handler(self, &event);
        }
        self.depth -= 1;
    }

    /// Current nesting depth of [`SimulationContext::emit`].
    #[must_use]
    pub fn emit_depth(&self) -> u32 {
        self.depth
    }

    /// Record that an expiry-trigger hub exists for `kind`. Returns `true`
    /// the first time, when the caller must subscribe the hub.
    pub(crate) fn claim_trigger_kind(&mut self, kind: EventKind) -> bool {
        self.trigger_kinds.insert(kind)
    }

    /// Build an isolated copy of this world.
    ///
    /// The copy gets a renumbered store (every relational component remapped),
    /// a clone of the RNG state, and a fresh dispatcher carrying the core
    /// engines plus the expiry-trigger hubs its effects need. AI drivers and
    /// any ad-hoc subscriptions are not carried over, so nothing the copy
    /// emits reaches a handler of the original.
    #[must_use]
    pub fn fork(&self) -> (SimulationContext, EntityRemap) {
        let (store, remap) = self.store.fork();
        let mut ctx = Self {
            store,
            rng: self.rng.clone(),
            dispatcher: Dispatcher::new(),
            config: Rc::clone(&self.config),
            registry: Rc::clone(&self.registry),
            catalog: Rc::clone(&self.catalog),
            trigger_kinds: BTreeSet::new(),
            depth: 0,
        };
        ctx.install_core_systems();
        effects::restore_triggers(&mut ctx);
        (ctx, remap)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::events::EventLog;

    #[test]
    fn test_emit_is_depth_first_and_ordered() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 1);
        let order = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&order);
        ctx.on(EventKind::Tick, move |ctx, event| {
            if let Event::Tick { frame } = event {
                sink.borrow_mut().push(format!("a{frame}"));
                if *frame == 0 {
                    ctx.emit(Event::Tick { frame: 1 });
                }
            }
        });
        let sink = Rc::clone(&order);
        ctx.on(EventKind::Tick, move |_, event| {
            if let Event::Tick { frame } = event {
                sink.borrow_mut().push(format!("b{frame}"));
            }
        });

        ctx.emit(Event::Tick { frame: 0 });
        assert_eq!(*order.borrow(), vec!["a0", "a1", "b1", "b0"]);
    }

    #[test]
    fn test_fork_does_not_carry_extra_handlers() {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 1);
        let log = EventLog::attach(&mut ctx);
        let (mut fork, _) = ctx.fork();
        fork.emit(Event::CombatReset {
            reason: "sandbox".to_string(),
        });
        assert!(log.events().is_empty());
        assert_eq!(
            fork.handler_count(EventKind::SwapRequested),
            ctx.handler_count(EventKind::SwapRequested)
        );
    }
}
