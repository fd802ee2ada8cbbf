use std::{hash::Hash, sync::Arc};

use hashbrown::HashSet;

use crate::{
    AccessorError, Aggregator, CachedSlice, Container, ContainerType, DialogSubsetTreeError, Entry,
    IdAccessor, Node, NodeConfig, NodeFactory, QueryId, QueryRegistry, ROOT_KEY, RemoveOptions,
    SharedQueryRegistry, SliceConfig, SliceQuery, node::Probe, resolve_key_paths,
};

/// A mutable, in-memory index that files items under a multi-level key path
/// and answers slice queries over it.
///
/// Every item is resolved to one or more keys by each aggregator in turn, and
/// is stored in every leaf its key paths lead to. Slices select the items
/// whose keys satisfy a per-level [`crate::Condition`]; cached slices stay
/// current as items are added and removed.
///
/// ```
/// use dialog_subset_tree::{Aggregator, Condition, ContainerType, SliceConfig, SubsetTree};
///
/// #[derive(Debug)]
/// struct Task {
///     id: u32,
///     owner: &'static str,
///     tags: Vec<&'static str>,
/// }
///
/// let mut tree = SubsetTree::builder()
///     .container_type(ContainerType::Map)
///     .aggregator(Aggregator::new("OWNER", |task: &Task| task.owner))
///     .aggregator(Aggregator::new("TAG", |task: &Task| task.tags.clone()))
///     .id_accessor(|task: &Task| task.id)
///     .build()
///     .unwrap();
///
/// tree.add(Task { id: 1, owner: "ana", tags: vec!["bug", "ui"] }).unwrap();
/// tree.add(Task { id: 2, owner: "ben", tags: vec!["ui"] }).unwrap();
///
/// let ui = tree
///     .slice(SliceConfig::new().condition("TAG", Condition::eq("ui")))
///     .unwrap();
/// assert_eq!(ui.len(), 2);
///
/// // Task 1 fans out into both of its tags
/// assert_eq!(tree.size(), 3);
/// ```
pub struct SubsetTree<T, Id>
where
    Id: Clone + Eq + Hash,
{
    container_type: ContainerType,
    aggregators: Arc<[Aggregator<T>]>,
    id_accessor: IdAccessor<T, Id>,
    root: Node<T, Id>,
    queries: SharedQueryRegistry<T, Id>,
    next_query_id: u64,
}

impl<T, Id> SubsetTree<T, Id>
where
    Id: Clone + Eq + Hash,
{
    /// Creates an empty tree.
    ///
    /// Fails if an aggregator has an empty name or if two aggregators share a
    /// name. Without aggregators the root is a single leaf, holding a flat
    /// de-duplicated collection.
    pub fn new(
        container_type: ContainerType,
        aggregators: Vec<Aggregator<T>>,
        id_accessor: IdAccessor<T, Id>,
    ) -> Result<Self, DialogSubsetTreeError> {
        validate_names(&aggregators)?;

        let aggregators: Arc<[Aggregator<T>]> = aggregators.into();
        let root = NodeFactory::build(NodeConfig {
            key: ROOT_KEY.to_string(),
            container_type,
            id_accessor: id_accessor.clone(),
            aggregators: aggregators.clone(),
            depth: 0,
        });

        tracing::debug!(
            %container_type,
            levels = aggregators.len(),
            "Created subset tree"
        );

        Ok(Self {
            container_type,
            aggregators,
            id_accessor,
            root,
            queries: QueryRegistry::shared(),
            next_query_id: 0,
        })
    }

    /// Starts a [`SubsetTreeBuilder`].
    pub fn builder() -> SubsetTreeBuilder<T, Id> {
        SubsetTreeBuilder::default()
    }

    /// The root node.
    pub fn root(&self) -> &Node<T, Id> {
        &self.root
    }

    /// The leaf backend of this tree.
    pub fn container_type(&self) -> ContainerType {
        self.container_type
    }

    /// The aggregators, outermost level first.
    pub fn aggregators(&self) -> &[Aggregator<T>] {
        &self.aggregators
    }

    /// The aggregator names, outermost level first.
    pub fn aggregation_order(&self) -> Vec<&str> {
        self.aggregators.iter().map(Aggregator::name).collect()
    }

    /// The keys `item` currently resolves to at each level, in aggregation
    /// order.
    pub fn item_key_paths(&self, item: &T) -> Result<Vec<Vec<String>>, AccessorError> {
        resolve_key_paths(item, &self.aggregators)
    }

    /// The id `item` resolves to.
    pub fn id_of(&self, item: &T) -> Result<Id, AccessorError> {
        (self.id_accessor)(item)
    }

    /// Adds `item` under every key path it resolves to, then offers it to
    /// every cached query.
    ///
    /// Adding an item whose id is already held is a no-op. If an accessor
    /// fails the error is returned and neither the tree nor any cached query
    /// is changed.
    pub fn add<I>(&mut self, item: I) -> Result<(), DialogSubsetTreeError>
    where
        I: Into<Arc<T>>,
    {
        let entry = Entry::resolve(item.into(), &self.id_accessor)?;
        let key_paths = resolve_key_paths(&*entry.item, &self.aggregators)?;

        self.root.insert(&entry, &key_paths);
        self.queries.lock().append(&entry, &key_paths);
        Ok(())
    }

    /// Removes `item` from the leaves its current keys lead to and from every
    /// cached query. Removing an absent item is a no-op.
    pub fn remove(&mut self, item: &Arc<T>) -> Result<(), DialogSubsetTreeError> {
        self.remove_with(item, RemoveOptions::default())
    }

    /// Removes `item` as [`SubsetTree::remove`] does. With
    /// [`RemoveOptions::use_exhaustive_search`] every branch is probed, which
    /// finds items whose keys changed after they were added.
    pub fn remove_with(
        &mut self,
        item: &Arc<T>,
        options: RemoveOptions,
    ) -> Result<(), DialogSubsetTreeError> {
        let entry = Entry::resolve(item.clone(), &self.id_accessor)?;
        if options.use_exhaustive_search {
            self.root.delete(&entry, Probe::Exhaustive);
        } else {
            let key_paths = resolve_key_paths(&*entry.item, &self.aggregators)?;
            self.root.delete(&entry, Probe::KeyPaths(&key_paths));
        }

        self.queries.lock().remove(&entry);
        Ok(())
    }

    /// Drops every item and every cached query.
    pub fn purge(&mut self) {
        self.root.purge();
        let freed = self.queries.lock().clear();
        tracing::debug!(freed, "Purged subset tree");
    }

    /// The number of item slots in the tree. An item that fans out into
    /// several branches is counted once per branch.
    pub fn size(&self) -> usize {
        self.root.size()
    }

    /// A fresh list of every item slot in the tree.
    pub fn leaves(&self) -> Vec<Arc<T>> {
        self.root.leaves()
    }

    /// Runs a slice query and returns the matching items.
    ///
    /// With [`SliceConfig::cache`] set the query stays registered until the
    /// tree is purged or [`SubsetTree::free_cached_queries`] is called; its
    /// current result can be read through [`SubsetTree::cached_query`].
    ///
    /// Cached results drop an item by id on removal, so they only agree with a
    /// fresh slice while every item sharing an id resolves to the same keys.
    pub fn slice(&mut self, config: SliceConfig) -> Result<Container<T, Id>, DialogSubsetTreeError> {
        let mut query = self.prepare(&config)?;
        let items = query.exec(&self.root).to_container();

        if config.cache {
            self.queries.lock().register(query);
        }
        Ok(items)
    }

    /// Runs a slice query and keeps it live for as long as the returned
    /// [`CachedSlice`] is held.
    ///
    /// As with a cached [`SubsetTree::slice`], removal is by id: two items
    /// sharing an id but resolving to different keys can leave the cached
    /// result behind a fresh one.
    pub fn slice_cached(
        &mut self,
        config: SliceConfig,
    ) -> Result<CachedSlice<T, Id>, DialogSubsetTreeError> {
        let mut query = self.prepare(&config)?;
        query.exec(&self.root);

        let id = query.id();
        self.queries.lock().register(query);
        Ok(CachedSlice::new(id, &self.queries))
    }

    /// A snapshot of the current result of the cached query `id`.
    pub fn cached_query(&self, id: QueryId) -> Option<Container<T, Id>> {
        self.queries.lock().snapshot(id)
    }

    /// The ids of every registered cached query, oldest first.
    pub fn cached_query_ids(&self) -> Vec<QueryId> {
        self.queries.lock().ids()
    }

    /// The number of registered cached queries.
    pub fn cached_query_count(&self) -> usize {
        self.queries.lock().len()
    }

    /// Unregisters every cached query. Outstanding [`CachedSlice`] handles
    /// stop receiving updates.
    pub fn free_cached_queries(&mut self) {
        let freed = self.queries.lock().clear();
        tracing::debug!(freed, "Freed cached queries");
    }

    fn prepare(&mut self, config: &SliceConfig) -> Result<SliceQuery<T, Id>, DialogSubsetTreeError> {
        let id = QueryId(self.next_query_id);
        let query = SliceQuery::new(
            id,
            &config.conditions,
            &self.aggregators,
            self.container_type,
        )?;

        self.next_query_id += 1;
        Ok(query)
    }
}

fn validate_names<T>(aggregators: &[Aggregator<T>]) -> Result<(), DialogSubsetTreeError> {
    let mut names = HashSet::new();
    for aggregator in aggregators {
        let name = aggregator.name();
        if name.is_empty() {
            return Err(DialogSubsetTreeError::Configuration(
                "Aggregator names must not be empty".into(),
            ));
        }
        if !names.insert(name) {
            return Err(DialogSubsetTreeError::Configuration(format!(
                "Aggregator name '{name}' is used more than once"
            )));
        }
    }
    Ok(())
}

impl<T, Id> std::fmt::Debug for SubsetTree<T, Id>
where
    Id: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsetTree")
            .field("container_type", &self.container_type)
            .field("aggregation_order", &self.aggregation_order())
            .field("size", &self.size())
            .field("cached_queries", &self.cached_query_count())
            .finish_non_exhaustive()
    }
}

/// Collects the configuration of a [`SubsetTree`].
pub struct SubsetTreeBuilder<T, Id> {
    container_type: Option<ContainerType>,
    aggregators: Vec<Aggregator<T>>,
    id_accessor: Option<IdAccessor<T, Id>>,
}

impl<T, Id> Default for SubsetTreeBuilder<T, Id> {
    fn default() -> Self {
        Self {
            container_type: None,
            aggregators: Vec::new(),
            id_accessor: None,
        }
    }
}

impl<T, Id> SubsetTreeBuilder<T, Id>
where
    Id: Clone + Eq + Hash,
{
    /// Sets the leaf backend.
    pub fn container_type(mut self, container_type: ContainerType) -> Self {
        self.container_type = Some(container_type);
        self
    }

    /// Appends an aggregation level below those added so far.
    pub fn aggregator(mut self, aggregator: Aggregator<T>) -> Self {
        self.aggregators.push(aggregator);
        self
    }

    /// Appends several aggregation levels, in order.
    pub fn aggregators<I>(mut self, aggregators: I) -> Self
    where
        I: IntoIterator<Item = Aggregator<T>>,
    {
        self.aggregators.extend(aggregators);
        self
    }

    /// Sets an infallible id accessor.
    pub fn id_accessor<F>(mut self, id_accessor: F) -> Self
    where
        F: Fn(&T) -> Id + Send + Sync + 'static,
    {
        self.id_accessor = Some(Arc::new(move |item: &T| -> Result<Id, AccessorError> {
            Ok(id_accessor(item))
        }));
        self
    }

    /// Sets an id accessor that may fail.
    pub fn try_id_accessor<F>(mut self, id_accessor: F) -> Self
    where
        F: Fn(&T) -> Result<Id, AccessorError> + Send + Sync + 'static,
    {
        self.id_accessor = Some(Arc::new(id_accessor));
        self
    }

    /// Builds the tree.
    ///
    /// Fails if the container type or id accessor is missing, or as
    /// [`SubsetTree::new`] does.
    pub fn build(self) -> Result<SubsetTree<T, Id>, DialogSubsetTreeError> {
        let container_type = self.container_type.ok_or_else(|| {
            DialogSubsetTreeError::Configuration("A container type is required".into())
        })?;
        let id_accessor = self.id_accessor.ok_or_else(|| {
            DialogSubsetTreeError::Configuration("An id accessor is required".into())
        })?;

        SubsetTree::new(container_type, self.aggregators, id_accessor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Condition, VOID_KEY};
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq)]
    struct Item {
        id: u32,
        a: Option<&'static str>,
    }

    fn item(id: u32, a: &'static str) -> Item {
        Item { id, a: Some(a) }
    }

    fn tree(container_type: ContainerType) -> Result<SubsetTree<Item, u32>> {
        Ok(SubsetTree::builder()
            .container_type(container_type)
            .aggregator(Aggregator::new("A", |item: &Item| item.a))
            .id_accessor(|item: &Item| item.id)
            .build()?)
    }

    fn ids(container: Container<Item, u32>) -> Vec<u32> {
        container.iter().map(|item| item.id).collect()
    }

    #[test]
    fn it_keeps_a_flat_collection_without_aggregators() -> Result<()> {
        let mut tree = SubsetTree::<Item, u32>::builder()
            .container_type(ContainerType::Array)
            .id_accessor(|item: &Item| item.id)
            .build()?;
        assert!(tree.root().is_leaf());

        let removed = Arc::new(item(2, "y"));
        tree.add(item(1, "x"))?;
        tree.add(removed.clone())?;
        tree.add(item(1, "z"))?;
        assert_eq!(tree.size(), 2);

        tree.remove(&removed)?;
        assert_eq!(tree.size(), 1);
        assert_eq!(ids(tree.slice(SliceConfig::new())?), vec![1]);
        assert!(tree.item_key_paths(&item(3, "x"))?.is_empty());
        Ok(())
    }

    #[test]
    fn it_rejects_empty_aggregator_names() -> Result<()> {
        let error = SubsetTree::builder()
            .container_type(ContainerType::Map)
            .aggregator(Aggregator::new("", |item: &Item| item.a))
            .id_accessor(|item: &Item| item.id)
            .build()
            .unwrap_err();

        assert!(matches!(error, DialogSubsetTreeError::Configuration(_)));
        Ok(())
    }

    #[test]
    fn it_rejects_duplicate_aggregator_names() -> Result<()> {
        let error = SubsetTree::builder()
            .container_type(ContainerType::Set)
            .aggregator(Aggregator::new("A", |item: &Item| item.a))
            .aggregator(Aggregator::new("A", |item: &Item| item.a))
            .id_accessor(|item: &Item| item.id)
            .build()
            .unwrap_err();

        assert!(error.to_string().contains("'A'"));
        Ok(())
    }

    #[test]
    fn it_requires_a_container_type_and_an_id_accessor() -> Result<()> {
        let missing_container = SubsetTree::<Item, u32>::builder()
            .aggregator(Aggregator::new("A", |item: &Item| item.a))
            .id_accessor(|item: &Item| item.id)
            .build();
        assert!(missing_container.is_err());

        let missing_id = SubsetTree::<Item, u32>::builder()
            .container_type(ContainerType::Map)
            .aggregator(Aggregator::new("A", |item: &Item| item.a))
            .build();
        assert!(missing_id.is_err());
        Ok(())
    }

    #[test]
    fn it_slices_by_equality() -> Result<()> {
        let mut tree = tree(ContainerType::Array)?;

        tree.add(item(1, "x"))?;
        tree.add(item(2, "y"))?;
        tree.add(item(3, "x"))?;

        let slice = tree.slice(SliceConfig::new().condition("A", Condition::eq("x")))?;
        assert_eq!(ids(slice), vec![1, 3]);
        assert_eq!(tree.size(), 3);
        Ok(())
    }

    #[test]
    fn it_files_absent_keys_under_the_void_key() -> Result<()> {
        let mut tree = tree(ContainerType::Map)?;

        tree.add(Item { id: 1, a: None })?;
        tree.add(item(2, "x"))?;

        assert!(tree.root().has_child(VOID_KEY));
        assert_eq!(
            tree.item_key_paths(&Item { id: 1, a: None })?,
            vec![vec![VOID_KEY.to_string()]]
        );

        let slice = tree.slice(SliceConfig::new().condition("A", Condition::Null))?;
        assert_eq!(ids(slice), vec![1]);
        Ok(())
    }

    #[test]
    fn it_allocates_increasing_query_ids() -> Result<()> {
        let mut tree = tree(ContainerType::Set)?;

        tree.slice(SliceConfig::new().cached())?;
        assert!(
            tree.slice(SliceConfig::new().condition("B", Condition::Any))
                .is_err()
        );
        tree.slice(SliceConfig::new().cached())?;

        assert_eq!(tree.cached_query_ids(), vec![QueryId(0), QueryId(1)]);
        Ok(())
    }

    #[test]
    fn it_keeps_cached_slices_current() -> Result<()> {
        let mut tree = tree(ContainerType::Array)?;
        tree.add(item(1, "x"))?;

        tree.slice(SliceConfig::new().condition("A", Condition::eq("x")).cached())?;
        let id = tree.cached_query_ids()[0];

        let added = Arc::new(item(2, "x"));
        tree.add(added.clone())?;
        tree.add(item(3, "y"))?;
        assert_eq!(tree.cached_query(id).map(ids), Some(vec![1, 2]));

        tree.remove(&added)?;
        assert_eq!(tree.cached_query(id).map(ids), Some(vec![1]));

        tree.free_cached_queries();
        assert_eq!(tree.cached_query(id).map(ids), None);
        Ok(())
    }

    #[test]
    fn it_drops_cached_items_by_id_even_when_keys_differ() -> Result<()> {
        let mut tree = tree(ContainerType::Array)?;
        let cached = tree.slice_cached(SliceConfig::new())?;

        let first = Arc::new(item(1, "x"));
        let second = Arc::new(item(1, "y"));
        tree.add(first.clone())?;
        tree.add(second.clone())?;
        tree.remove(&second)?;

        assert_eq!(ids(tree.slice(SliceConfig::new())?), vec![1]);
        assert_eq!(cached.items().map(ids), Some(vec![]));

        tree.remove_with(&first, RemoveOptions::exhaustive())?;
        assert_eq!(ids(tree.slice(SliceConfig::new())?), Vec::<u32>::new());
        Ok(())
    }

    #[test]
    fn it_resets_items_and_queries_together_on_purge() -> Result<()> {
        let mut tree = tree(ContainerType::Map)?;
        tree.add(item(1, "x"))?;
        let handle = tree.slice_cached(SliceConfig::new())?;

        tree.purge();

        assert_eq!(tree.size(), 0);
        assert!(tree.leaves().is_empty());
        assert_eq!(tree.cached_query_count(), 0);
        assert!(!handle.is_live());

        tree.purge();
        assert_eq!(tree.size(), 0);
        Ok(())
    }
}
