use std::{hash::Hash, sync::Arc};

use indexmap::IndexMap;

use crate::{
    AccessorError, Aggregator, ContainerType, DialogSubsetTreeError, Entry, IdAccessor, Node,
    NodeConfig, NodeFactory, resolve_item_key,
};

use super::Probe;

/// An internal node partitioning items by the keys of one aggregator.
///
/// Children are created lazily, the first time an item resolves to their key,
/// and are never removed by [`PathNode::remove`] even once their subtree is
/// empty. An item whose key accessor yields several keys is added to every
/// matching child.
pub struct PathNode<T, Id> {
    key: String,
    container_type: ContainerType,
    id_accessor: IdAccessor<T, Id>,
    aggregators: Arc<[Aggregator<T>]>,
    depth: usize,
    children: IndexMap<String, Node<T, Id>>,
}

impl<T, Id> PathNode<T, Id>
where
    Id: Clone + Eq + Hash,
{
    /// Creates a path node bound to `config.aggregators[config.depth]`.
    ///
    /// Fails if the aggregator list has no aggregator at that depth.
    pub fn new(config: NodeConfig<T, Id>) -> Result<Self, DialogSubsetTreeError> {
        if config.depth >= config.aggregators.len() {
            return Err(DialogSubsetTreeError::Configuration(format!(
                "A path node for key '{}' was configured at depth {} but only {} aggregators remain",
                config.key,
                config.depth,
                config.aggregators.len()
            )));
        }

        Ok(Self::at_level(config))
    }

    pub(crate) fn at_level(config: NodeConfig<T, Id>) -> Self {
        Self {
            key: config.key,
            container_type: config.container_type,
            id_accessor: config.id_accessor,
            aggregators: config.aggregators,
            depth: config.depth,
            children: IndexMap::new(),
        }
    }

    /// The key that led to this node from its parent.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The [`ContainerType`] every leaf below this node uses.
    pub fn container_type(&self) -> ContainerType {
        self.container_type
    }

    /// The aggregator this node partitions items by.
    pub fn aggregator(&self) -> &Aggregator<T> {
        &self.aggregators[self.depth]
    }

    /// The aggregators from this node's level downwards.
    pub fn remaining_aggregators(&self) -> &[Aggregator<T>] {
        &self.aggregators[self.depth..]
    }

    pub(crate) fn id_accessor(&self) -> &IdAccessor<T, Id> {
        &self.id_accessor
    }

    /// Returns the child filed under `key`, if any.
    pub fn child(&self, key: &str) -> Option<&Node<T, Id>> {
        self.children.get(key)
    }

    /// Returns true if a child is filed under `key`.
    pub fn has_child(&self, key: &str) -> bool {
        self.children.contains_key(key)
    }

    /// Every child with its key, in order of creation.
    pub fn children(&self) -> Vec<(&str, &Node<T, Id>)> {
        self.children
            .iter()
            .map(|(key, node)| (key.as_str(), node))
            .collect()
    }

    /// The existing children `item` currently resolves to at this level.
    pub fn item_children(&self, item: &T) -> Result<Vec<(&str, &Node<T, Id>)>, AccessorError> {
        Ok(resolve_item_key(item, self.aggregator())?
            .into_iter()
            .filter_map(|key| self.children.get_key_value(key.as_str()))
            .map(|(key, node)| (key.as_str(), node))
            .collect())
    }

    /// Drops every child of this node.
    pub fn purge(&mut self) {
        self.children.clear();
    }

    /// The number of item slots below this node, counting an item once for
    /// every branch it fans into.
    pub fn size(&self) -> usize {
        self.children.values().map(Node::size).sum()
    }

    pub(crate) fn insert(&mut self, entry: &Entry<T, Id>, key_paths: &[Vec<String>]) {
        let Some((keys, rest)) = key_paths.split_first() else {
            return;
        };

        for key in keys {
            if !self.children.contains_key(key) {
                let child = self.init_child(key);
                self.children.insert(key.clone(), child);
            }

            if let Some(child) = self.children.get_mut(key) {
                child.insert(entry, rest);
            }
        }
    }

    pub(crate) fn delete(&mut self, entry: &Entry<T, Id>, probe: Probe<'_>) {
        match probe {
            Probe::Exhaustive => {
                for child in self.children.values_mut() {
                    child.delete(entry, Probe::Exhaustive);
                }
            }
            Probe::KeyPaths(key_paths) => {
                let Some((keys, rest)) = key_paths.split_first() else {
                    return;
                };

                for key in keys {
                    if let Some(child) = self.children.get_mut(key) {
                        child.delete(entry, Probe::KeyPaths(rest));
                    }
                }
            }
        }
    }

    pub(crate) fn visit_entries<F>(&self, visit: &mut F)
    where
        F: FnMut(&Id, &Arc<T>),
    {
        for child in self.children.values() {
            child.visit_entries(visit);
        }
    }

    fn init_child(&self, key: &str) -> Node<T, Id> {
        tracing::trace!(key, depth = self.depth + 1, parent = %self.key, "Creating child node");

        NodeFactory::build(NodeConfig {
            key: key.to_string(),
            container_type: self.container_type,
            id_accessor: self.id_accessor.clone(),
            aggregators: self.aggregators.clone(),
            depth: self.depth + 1,
        })
    }
}
