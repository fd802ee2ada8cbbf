use std::{collections::BTreeMap, fmt::Display, hash::Hash};

use serde::{Deserialize, Serialize};

use crate::{Aggregator, Condition, ContainerType, DialogSubsetTreeError, Entry, Node, SliceResult};

/// Identifies a slice query issued by a [`crate::SubsetTree`]. Ids are
/// assigned in increasing order, starting from zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryId(pub u64);

impl Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Describes a slice: one [`Condition`] per aggregator name, and whether the
/// query should stay live after it runs.
///
/// ```
/// use dialog_subset_tree::{Condition, SliceConfig};
///
/// let config: SliceConfig = serde_json::from_str(
///     r#"{ "conditions": { "STATUS": ["ne", "closed"] }, "cache": true }"#,
/// ).unwrap();
///
/// assert_eq!(
///     config,
///     SliceConfig::new().condition("STATUS", Condition::ne("closed")).cached()
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceConfig {
    /// Conditions keyed by aggregator name; absent levels match anything
    #[serde(default)]
    pub conditions: BTreeMap<String, Condition>,
    /// Keep the query registered so that later mutations update it
    #[serde(default)]
    pub cache: bool,
}

impl SliceConfig {
    /// A slice with no conditions, selecting every item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the condition for the aggregator named `name`.
    pub fn condition<N: Into<String>>(mut self, name: N, condition: Condition) -> Self {
        self.conditions.insert(name.into(), condition);
        self
    }

    /// Marks the slice to be cached.
    pub fn cached(mut self) -> Self {
        self.cache = true;
        self
    }
}

/// A slice query over a tree.
///
/// A query resolves its conditions against the tree's aggregation order when
/// it is constructed, leaving one condition per level. It can then be
/// evaluated in two ways that always agree for a given tree state:
///
/// - [`SliceQuery::exec`] walks the tree from the root, descending only into
///   children whose keys satisfy each level's condition;
/// - [`SliceQuery::append`] tests a single item against every level using the
///   keys it resolves to, which is how cached queries track later insertions.
///
/// The query never mutates the tree; it only borrows the root while it runs.
#[derive(Debug)]
pub struct SliceQuery<T, Id> {
    id: QueryId,
    levels: Vec<Condition>,
    result: SliceResult<T, Id>,
    executed: bool,
}

impl<T, Id> SliceQuery<T, Id>
where
    Id: Clone + Eq + Hash,
{
    /// Creates a query for a tree with the given aggregators.
    ///
    /// Fails if a condition names an aggregator the tree does not have.
    pub fn new(
        id: QueryId,
        conditions: &BTreeMap<String, Condition>,
        aggregators: &[Aggregator<T>],
        container_type: ContainerType,
    ) -> Result<Self, DialogSubsetTreeError> {
        if let Some(name) = conditions
            .keys()
            .find(|name| !aggregators.iter().any(|aggregator| aggregator.name() == name.as_str()))
        {
            tracing::warn!(query = %id, aggregator = %name, "Rejecting slice condition for unknown aggregator");
            return Err(DialogSubsetTreeError::Query(format!(
                "Condition refers to unknown aggregator '{name}'"
            )));
        }

        let levels = aggregators
            .iter()
            .map(|aggregator| {
                conditions
                    .get(aggregator.name())
                    .cloned()
                    .unwrap_or(Condition::Any)
            })
            .collect();

        Ok(Self {
            id,
            levels,
            result: SliceResult::new(container_type),
            executed: false,
        })
    }

    /// The id this query was issued with.
    pub fn id(&self) -> QueryId {
        self.id
    }

    /// The condition applied at each level, in aggregation order.
    pub fn levels(&self) -> &[Condition] {
        &self.levels
    }

    /// The items collected so far.
    pub fn result(&self) -> &SliceResult<T, Id> {
        &self.result
    }

    /// Returns true once [`SliceQuery::exec`] has run.
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Collects every item reachable from `root` through children that satisfy
    /// each level's condition.
    ///
    /// Only the first call traverses the tree; later calls return the result
    /// as it stands.
    pub fn exec(&mut self, root: &Node<T, Id>) -> &SliceResult<T, Id> {
        if !self.executed {
            tracing::trace!(query = %self.id, "Executing slice query");
            collect(root, &self.levels, &mut self.result);
            self.executed = true;
        }
        &self.result
    }

    /// Adds the item of `entry` to the result if, at every level, at least one
    /// of the keys in `key_paths` satisfies that level's condition.
    ///
    /// `key_paths` holds the item's resolved keys for each aggregator in
    /// order.
    pub fn append(&mut self, entry: &Entry<T, Id>, key_paths: &[Vec<String>]) -> &SliceResult<T, Id> {
        let matched = self
            .levels
            .iter()
            .zip(key_paths)
            .all(|(condition, keys)| condition.matches_any(keys));

        if matched {
            self.result.add(entry);
        }
        &self.result
    }

    /// Removes the item of `entry` from the result, if present.
    pub fn remove(&mut self, entry: &Entry<T, Id>) -> &SliceResult<T, Id> {
        self.result.remove(entry);
        &self.result
    }
}

fn collect<T, Id>(node: &Node<T, Id>, levels: &[Condition], result: &mut SliceResult<T, Id>)
where
    Id: Clone + Eq + Hash,
{
    match levels.split_first() {
        None => node.visit_entries(&mut |id, item| result.add_item(id, item)),
        Some((condition, rest)) => {
            for child in condition.select_children(node) {
                collect(child, rest, result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessorError, NodeConfig, NodeFactory, ROOT_KEY, resolve_key_paths};
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Item {
        id: u32,
        color: Option<&'static str>,
        size: &'static str,
    }

    fn aggregators() -> Arc<[Aggregator<Item>]> {
        vec![
            Aggregator::new("COLOR", |item: &Item| item.color),
            Aggregator::new("SIZE", |item: &Item| item.size),
        ]
        .into()
    }

    fn entry(id: u32, color: Option<&'static str>, size: &'static str) -> Entry<Item, u32> {
        Entry {
            id,
            item: Arc::new(Item { id, color, size }),
        }
    }

    fn ids(result: &SliceResult<Item, u32>) -> Vec<u32> {
        let mut ids: Vec<u32> = result
            .to_container()
            .iter()
            .map(|item| item.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn populated(entries: &[Entry<Item, u32>]) -> Result<Node<Item, u32>> {
        let aggregators = aggregators();
        let mut root = NodeFactory::build(NodeConfig {
            key: ROOT_KEY.to_string(),
            container_type: ContainerType::Array,
            id_accessor: Arc::new(|item: &Item| -> Result<u32, AccessorError> { Ok(item.id) }),
            aggregators: aggregators.clone(),
            depth: 0,
        });

        for entry in entries {
            let key_paths = resolve_key_paths(&*entry.item, &aggregators)?;
            root.insert(entry, &key_paths);
        }
        Ok(root)
    }

    fn entries() -> Vec<Entry<Item, u32>> {
        vec![
            entry(1, Some("red"), "s"),
            entry(2, Some("blue"), "m"),
            entry(3, None, "s"),
            entry(4, Some("red"), "l"),
        ]
    }

    #[test]
    fn it_fills_missing_levels_with_any() -> Result<()> {
        let conditions = BTreeMap::from([("SIZE".to_string(), Condition::eq("s"))]);
        let query = SliceQuery::<Item, u32>::new(QueryId(0), &conditions, &aggregators(), ContainerType::Map)?;

        assert_eq!(query.levels(), &[Condition::Any, Condition::eq("s")]);
        assert!(!query.is_executed());
        Ok(())
    }

    #[test]
    fn it_rejects_conditions_on_unknown_aggregators() -> Result<()> {
        let conditions = BTreeMap::from([("WEIGHT".to_string(), Condition::Any)]);
        let error = SliceQuery::<Item, u32>::new(QueryId(3), &conditions, &aggregators(), ContainerType::Set)
            .unwrap_err();

        assert!(error.to_string().contains("'WEIGHT'"));
        Ok(())
    }

    #[test]
    fn it_executes_once() -> Result<()> {
        let mut root = populated(&entries())?;
        let conditions = BTreeMap::from([("COLOR".to_string(), Condition::eq("red"))]);
        let mut query = SliceQuery::new(QueryId(0), &conditions, &aggregators(), ContainerType::Array)?;

        assert_eq!(ids(query.exec(&root)), vec![1, 4]);

        let late = entry(5, Some("red"), "m");
        let key_paths = resolve_key_paths(&*late.item, &aggregators())?;
        root.insert(&late, &key_paths);

        assert_eq!(ids(query.exec(&root)), vec![1, 4]);
        assert!(query.is_executed());
        Ok(())
    }

    #[test]
    fn it_appends_exactly_what_a_traversal_would_find() -> Result<()> {
        let cases = [
            BTreeMap::from([("COLOR".to_string(), Condition::ne("red"))]),
            BTreeMap::from([("COLOR".to_string(), Condition::Null)]),
            BTreeMap::from([
                ("COLOR".to_string(), Condition::any_of(["red", "blue"])),
                ("SIZE".to_string(), Condition::none_of(["l"])),
            ]),
            BTreeMap::new(),
        ];

        for conditions in cases {
            let root = populated(&entries())?;
            let mut traversed =
                SliceQuery::new(QueryId(0), &conditions, &aggregators(), ContainerType::Array)?;
            let mut appended =
                SliceQuery::new(QueryId(1), &conditions, &aggregators(), ContainerType::Array)?;

            for entry in entries() {
                let key_paths = resolve_key_paths(&*entry.item, &aggregators())?;
                appended.append(&entry, &key_paths);
            }

            assert_eq!(ids(traversed.exec(&root)), ids(appended.result()), "{conditions:?}");
        }
        Ok(())
    }

    #[test]
    fn it_removes_items_regardless_of_conditions() -> Result<()> {
        let root = populated(&entries())?;
        let mut query =
            SliceQuery::new(QueryId(0), &BTreeMap::new(), &aggregators(), ContainerType::Map)?;
        query.exec(&root);

        query.remove(&entry(2, Some("blue"), "m"));
        query.remove(&entry(42, None, "s"));

        assert_eq!(ids(query.result()), vec![1, 3, 4]);
        Ok(())
    }
}
