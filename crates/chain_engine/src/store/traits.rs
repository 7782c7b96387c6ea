/* 📖 # Why an EntityStore trait?

The hypermedia layer only ever asks three things of persistence: fetch one
entity, list a filtered collection with its total count, and create a new
entity. Keeping that behind a trait lets the dispatcher run against the
in-memory store in tests and against anything else in a deployment, and
leaves domain validation to the store that knows the data.
*/

use std::sync::Arc;

use parking_lot::RwLock;

use chain_base::ChainResult;

use crate::entity::{Entity, EntityId, EntityKind, Filter, NewEntity};

/// Result of listing a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    /// Matching entities ordered by id. A store that caps how many it loads
    /// may return fewer than `total_count`.
    pub items: Vec<Entity>,
    /// Number of entities matching the filter.
    pub total_count: usize,
}

pub trait EntityStore: Send + Sync + 'static {
    /// Fetch one entity. `Ok(None)` when no entity of that kind has the id.
    fn get(&self, kind: EntityKind, id: EntityId) -> ChainResult<Option<Entity>>;

    /// List every entity of `kind` matching all criteria of `filter`.
    fn list(&self, kind: EntityKind, filter: &Filter) -> ChainResult<Listing>;

    /// Validate and persist a new entity, assigning its id.
    ///
    /// Rejected input yields a `Validation` error.
    fn create(&mut self, kind: EntityKind, entity: NewEntity) -> ChainResult<Entity>;
}

/// A thread-safe, cheaply cloneable handle to an entity store.
#[derive(Clone)]
pub struct StoreHandle(Arc<RwLock<dyn EntityStore>>);

impl StoreHandle {
    pub fn new<S: EntityStore>(store: S) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    /// See [`EntityStore::get`].
    pub fn get(&self, kind: EntityKind, id: EntityId) -> ChainResult<Option<Entity>> {
        self.0.read().get(kind, id)
    }

    /// See [`EntityStore::list`].
    pub fn list(&self, kind: EntityKind, filter: &Filter) -> ChainResult<Listing> {
        self.0.read().list(kind, filter)
    }

    /// See [`EntityStore::create`].
    pub fn create(&self, kind: EntityKind, entity: NewEntity) -> ChainResult<Entity> {
        self.0.write().create(kind, entity)
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}
