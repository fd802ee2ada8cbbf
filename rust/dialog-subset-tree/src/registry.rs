use std::{
    hash::Hash,
    sync::{Arc, Weak},
};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::{Container, Entry, QueryId, SliceQuery};

/// Every time the number of live cached queries reaches a multiple of this
/// value a warning is logged.
pub const CACHED_QUERY_WARN_THRESHOLD: usize = 256;

/// The live, cached slice queries of a tree, updated on every mutation.
#[derive(Debug)]
pub(crate) struct QueryRegistry<T, Id> {
    queries: IndexMap<QueryId, SliceQuery<T, Id>>,
}

pub(crate) type SharedQueryRegistry<T, Id> = Arc<Mutex<QueryRegistry<T, Id>>>;

impl<T, Id> QueryRegistry<T, Id>
where
    Id: Clone + Eq + Hash,
{
    pub fn shared() -> SharedQueryRegistry<T, Id> {
        Arc::new(Mutex::new(Self {
            queries: IndexMap::new(),
        }))
    }

    pub fn register(&mut self, query: SliceQuery<T, Id>) {
        self.queries.insert(query.id(), query);

        let live = self.queries.len();
        if live % CACHED_QUERY_WARN_THRESHOLD == 0 {
            tracing::warn!(live, "Cached query registry keeps growing; free unused cached queries");
        }
    }

    pub fn unregister(&mut self, id: QueryId) -> bool {
        self.queries.shift_remove(&id).is_some()
    }

    pub fn clear(&mut self) -> usize {
        let count = self.queries.len();
        self.queries.clear();
        count
    }

    pub fn append(&mut self, entry: &Entry<T, Id>, key_paths: &[Vec<String>]) {
        for query in self.queries.values_mut() {
            query.append(entry, key_paths);
        }
    }

    pub fn remove(&mut self, entry: &Entry<T, Id>) {
        for query in self.queries.values_mut() {
            query.remove(entry);
        }
    }

    pub fn snapshot(&self, id: QueryId) -> Option<Container<T, Id>> {
        self.queries
            .get(&id)
            .map(|query| query.result().to_container())
    }

    pub fn ids(&self) -> Vec<QueryId> {
        self.queries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }
}

/// A handle to a cached slice query.
///
/// The query stays registered with its tree, and is kept current by every
/// `add` and `remove`, for as long as the handle lives. Dropping the handle
/// unregisters the query.
///
/// ```
/// use dialog_subset_tree::{Aggregator, Condition, ContainerType, SliceConfig, SubsetTree};
///
/// let mut tree = SubsetTree::builder()
///     .container_type(ContainerType::Array)
///     .aggregator(Aggregator::new("PARITY", |n: &u32| if n % 2 == 0 { "even" } else { "odd" }))
///     .id_accessor(|n: &u32| *n)
///     .build()
///     .unwrap();
///
/// let evens = tree
///     .slice_cached(SliceConfig::new().condition("PARITY", Condition::eq("even")))
///     .unwrap();
///
/// tree.add(2u32).unwrap();
/// tree.add(3u32).unwrap();
/// assert_eq!(evens.items().unwrap().len(), 1);
///
/// drop(evens);
/// assert_eq!(tree.cached_query_count(), 0);
/// ```
pub struct CachedSlice<T, Id>
where
    Id: Clone + Eq + Hash,
{
    id: QueryId,
    registry: Weak<Mutex<QueryRegistry<T, Id>>>,
}

impl<T, Id> CachedSlice<T, Id>
where
    Id: Clone + Eq + Hash,
{
    pub(crate) fn new(id: QueryId, registry: &SharedQueryRegistry<T, Id>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    /// The id of the underlying query.
    pub fn id(&self) -> QueryId {
        self.id
    }

    /// A snapshot of the query's current result.
    ///
    /// Returns `None` once the query is no longer registered, e.g. after the
    /// tree was purged or its cached queries were freed.
    pub fn items(&self) -> Option<Container<T, Id>> {
        let registry = self.registry.upgrade()?;
        let snapshot = registry.lock().snapshot(self.id);
        snapshot
    }

    /// Returns true while the query is registered with a live tree.
    pub fn is_live(&self) -> bool {
        self.items().is_some()
    }
}

impl<T, Id> Drop for CachedSlice<T, Id>
where
    Id: Clone + Eq + Hash,
{
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.lock().unregister(self.id) {
                tracing::trace!(query = %self.id, "Released cached slice");
            }
        }
    }
}

impl<T, Id> std::fmt::Debug for CachedSlice<T, Id>
where
    Id: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedSlice").field("id", &self.id).finish()
    }
}
