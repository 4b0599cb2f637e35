//! Sparse, typed component store.
//!
//! Entities are plain integer ids. Each component type lives in its own
//! column (`BTreeMap<EntityId, T>`), so every query iterates in ascending id
//! order and order-sensitive engines never depend on hash iteration.
//!
//! Cross-references between entities are stored as ids, never as owning
//! pointers. Deleting an entity leaves stale ids behind in other components;
//! lookups through them simply miss.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Identifier of an entity. Zero is never allocated.
pub type EntityId = u32;

/// Id that never names a live entity. Unmapped references collapse to it
/// when a store is forked.
pub const DANGLING: EntityId = 0;

/// Old-id to new-id table produced by [`EntityStore::fork`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRemap {
    map: BTreeMap<EntityId, EntityId>,
}

impl EntityRemap {
    /// Look up the new id for an original id.
    #[must_use]
    pub fn get(&self, original: EntityId) -> Option<EntityId> {
        self.map.get(&original).copied()
    }

    /// Translate an id, collapsing unknown ids to [`DANGLING`].
    #[must_use]
    pub fn apply(&self, original: EntityId) -> EntityId {
        self.get(original).unwrap_or(DANGLING)
    }

    /// Translate an optional id. Unknown ids become `None`.
    #[must_use]
    pub fn apply_opt(&self, original: Option<EntityId>) -> Option<EntityId> {
        original.and_then(|id| self.get(id))
    }

    /// Translate a list of ids in place, dropping the ones that do not survive.
    pub fn apply_vec(&self, ids: &mut Vec<EntityId>) {
        ids.retain_mut(|id| match self.get(*id) {
            Some(mapped) => {
                *id = mapped;
                true
            }
            None => false,
        });
    }

    /// Inverse lookup: the original id a forked id came from.
    #[must_use]
    pub fn original_of(&self, forked: EntityId) -> Option<EntityId> {
        self.map
            .iter()
            .find_map(|(&original, &mapped)| (mapped == forked).then_some(original))
    }

    /// Number of mapped entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A component type that can live in the store.
///
/// Every component that holds entity ids must override
/// [`Component::remap_entities`]; forking relies on it to keep the copy from
/// pointing back into the original world. Components without relational
/// fields keep the no-op default.
pub trait Component: Clone + fmt::Debug + 'static {
    /// Rewrite every entity id held by this component.
    fn remap_entities(&mut self, _remap: &EntityRemap) {}
}

/// Type-erased column operations.
trait Column {
    fn remove(&mut self, entity: EntityId) -> bool;
    fn fork(&self, remap: &EntityRemap) -> Box<dyn Column>;
    fn len(&self) -> usize;
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Storage<T: Component> {
    rows: BTreeMap<EntityId, T>,
}

impl<T: Component> Column for Storage<T> {
    fn remove(&mut self, entity: EntityId) -> bool {
        self.rows.remove(&entity).is_some()
    }

    fn fork(&self, remap: &EntityRemap) -> Box<dyn Column> {
        let rows = self
            .rows
            .iter()
            .filter_map(|(&id, component)| {
                let new_id = remap.get(id)?;
                let mut copy = component.clone();
                copy.remap_entities(remap);
                Some((new_id, copy))
            })
            .collect();
        Box::new(Storage { rows })
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The entity-component database.
#[derive(Default)]
pub struct EntityStore {
    next_id: EntityId,
    alive: BTreeSet<EntityId>,
    columns: HashMap<TypeId, Box<dyn Column>>,
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut columns: Vec<_> = self
            .columns
            .values()
            .map(|c| (c.type_name(), c.len()))
            .collect();
        columns.sort_unstable();
        f.debug_struct("EntityStore")
            .field("entities", &self.alive.len())
            .field("columns", &columns)
            .finish()
    }
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh entity with no components.
    pub fn create(&mut self) -> EntityId {
        self.next_id += 1;
        let id = self.next_id;
        self.alive.insert(id);
        id
    }

    /// Delete an entity and all its components.
    ///
    /// Returns `false` if the entity was already gone; double deletes are
    /// harmless.
    pub fn delete(&mut self, entity: EntityId) -> bool {
        if !self.alive.remove(&entity) {
            return false;
        }
        for column in self.columns.values_mut() {
            column.remove(entity);
        }
        true
    }

    /// Whether the entity exists.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.alive.contains(&entity)
    }

    /// All live entity ids in ascending order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive.iter().copied()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    /// Whether the store holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    fn storage<T: Component>(&self) -> Option<&Storage<T>> {
        self.columns
            .get(&TypeId::of::<T>())
            .and_then(|c| c.as_any().downcast_ref::<Storage<T>>())
    }

    fn storage_mut<T: Component>(&mut self) -> &mut Storage<T> {
        let column = self
            .columns
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                Box::new(Storage::<T> {
                    rows: BTreeMap::new(),
                })
            });
        match column.as_any_mut().downcast_mut::<Storage<T>>() {
            Some(storage) => storage,
            None => unreachable!("column keyed by TypeId holds another type"),
        }
    }

    /// Attach (or replace) a component. Returns `false` if the entity is dead.
    pub fn insert<T: Component>(&mut self, entity: EntityId, component: T) -> bool {
        if !self.contains(entity) {
            return false;
        }
        self.storage_mut::<T>().rows.insert(entity, component);
        true
    }

    /// Detach a component, returning it if present.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        if self.storage::<T>().is_none() {
            return None;
        }
        self.storage_mut::<T>().rows.remove(&entity)
    }

    /// Borrow a component.
    #[must_use]
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.storage::<T>().and_then(|s| s.rows.get(&entity))
    }

    /// Mutably borrow a component.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        if self.storage::<T>().is_none() {
            return None;
        }
        self.storage_mut::<T>().rows.get_mut(&entity)
    }

    /// Whether the entity carries a component of type `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Iterate `(id, component)` pairs in ascending id order.
    pub fn query<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.storage::<T>()
            .into_iter()
            .flat_map(|s| s.rows.iter().map(|(&id, c)| (id, c)))
    }

    /// Ids of every entity carrying `T`, ascending.
    #[must_use]
    pub fn entities_with<T: Component>(&self) -> Vec<EntityId> {
        self.query::<T>().map(|(id, _)| id).collect()
    }

    /// The lowest-id entity carrying `T`, for singleton components.
    #[must_use]
    pub fn singleton<T: Component>(&self) -> Option<(EntityId, &T)> {
        self.query::<T>().next()
    }

    /// Number of entities carrying `T`.
    #[must_use]
    pub fn count<T: Component>(&self) -> usize {
        self.storage::<T>().map_or(0, |s| s.rows.len())
    }

    /// Deep-copy the store under fresh ids.
    ///
    /// Live entities are renumbered densely from 1 in ascending order of
    /// their original ids, and every component gets
    /// [`Component::remap_entities`] applied, so the copy shares nothing
    /// with `self`.
    #[must_use]
    pub fn fork(&self) -> (EntityStore, EntityRemap) {
        let mut remap = EntityRemap::default();
        let mut next_id: EntityId = 0;
        for &id in &self.alive {
            next_id += 1;
            remap.map.insert(id, next_id);
        }

        let columns = self
            .columns
            .iter()
            .map(|(&type_id, column)| (type_id, column.fork(&remap)))
            .collect();
        let alive = remap.map.values().copied().collect();

        let store = EntityStore {
            next_id,
            alive,
            columns,
        };
        (store, remap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Label(&'static str);
    impl Component for Label {}

    #[derive(Debug, Clone, PartialEq)]
    struct Link(EntityId);
    impl Component for Link {
        fn remap_entities(&mut self, remap: &EntityRemap) {
            self.0 = remap.apply(self.0);
        }
    }

    #[test]
    fn test_create_and_query_in_id_order() {
        let mut store = EntityStore::new();
        let a = store.create();
        let b = store.create();
        let c = store.create();
        store.insert(c, Label("c"));
        store.insert(a, Label("a"));
        store.insert(b, Label("b"));

        let labels: Vec<_> = store.query::<Label>().map(|(_, l)| l.0).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert_eq!(store.singleton::<Label>().map(|(id, _)| id), Some(a));
    }

    #[test]
    fn test_soft_misses() {
        let mut store = EntityStore::new();
        let a = store.create();
        assert!(store.get::<Label>(a).is_none());
        assert!(store.get::<Label>(999).is_none());
        assert!(store.remove::<Label>(a).is_none());
        assert!(!store.insert(999, Label("ghost")));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = EntityStore::new();
        let a = store.create();
        store.insert(a, Label("a"));
        assert!(store.delete(a));
        assert!(!store.delete(a));
        assert!(store.get::<Label>(a).is_none());
        assert_eq!(store.count::<Label>(), 0);
    }

    #[test]
    fn test_fork_renumbers_and_remaps() {
        let mut store = EntityStore::new();
        let a = store.create();
        let gone = store.create();
        let b = store.create();
        store.insert(b, Link(a));
        store.insert(a, Link(gone));
        store.delete(gone);

        let (fork, remap) = store.fork();
        assert_eq!(remap.get(a), Some(1));
        assert_eq!(remap.get(b), Some(2));
        assert_eq!(remap.get(gone), None);
        assert_eq!(fork.get::<Link>(2), Some(&Link(1)));
        // The dead reference collapses instead of aliasing a forked entity.
        assert_eq!(fork.get::<Link>(1), Some(&Link(DANGLING)));
        assert_eq!(remap.original_of(2), Some(b));
    }

    #[test]
    fn test_fork_is_independent() {
        let mut store = EntityStore::new();
        let a = store.create();
        store.insert(a, Label("live"));

        let (mut fork, remap) = store.fork();
        let forked = remap.apply(a);
        fork.insert(forked, Label("sandbox"));
        fork.create();

        assert_eq!(store.get::<Label>(a), Some(&Label("live")));
        assert_eq!(store.len(), 1);
    }
}
