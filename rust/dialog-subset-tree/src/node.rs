use std::{hash::Hash, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    AccessorError, Aggregator, ContainerType, DialogSubsetTreeError, Entry, IdAccessor,
    resolve_key_paths,
};

mod leaf;
pub use leaf::*;

mod path;
pub use path::*;

/// Everything needed to construct a [`Node`].
///
/// The aggregators still to be applied below the node are
/// `aggregators[depth..]`; the full list is shared between every node of a
/// tree.
pub struct NodeConfig<T, Id> {
    /// The key that leads to the node from its parent
    pub key: String,
    /// The backend every leaf of the tree uses
    pub container_type: ContainerType,
    /// The tree-wide id accessor
    pub id_accessor: IdAccessor<T, Id>,
    /// The tree-wide, ordered aggregator list
    pub aggregators: Arc<[Aggregator<T>]>,
    /// The number of aggregators already applied above the node
    pub depth: usize,
}

/// Options controlling how [`Node::remove`] locates an item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveOptions {
    /// Probe every branch instead of only the branches the item's key
    /// accessors currently resolve to. Needed when an item's keys may have
    /// changed since it was added.
    #[serde(default)]
    pub use_exhaustive_search: bool,
}

impl RemoveOptions {
    /// Options that probe every branch of the tree.
    pub fn exhaustive() -> Self {
        Self {
            use_exhaustive_search: true,
        }
    }
}

/// How a removal finds the leaves holding an item.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Probe<'a> {
    /// Follow the item's resolved keys, one level per element
    KeyPaths(&'a [Vec<String>]),
    /// Visit every child
    Exhaustive,
}

/// A node in a [`crate::SubsetTree`]: either a [`LeafNode`] holding items or
/// a [`PathNode`] partitioning them further.
pub enum Node<T, Id> {
    /// A terminal node holding items
    Leaf(LeafNode<T, Id>),
    /// An internal node keyed by one aggregator
    Path(PathNode<T, Id>),
}

impl<T, Id> Node<T, Id>
where
    Id: Clone + Eq + Hash,
{
    /// The key that led to this node from its parent.
    pub fn key(&self) -> &str {
        match self {
            Node::Leaf(leaf) => leaf.key(),
            Node::Path(path) => path.key(),
        }
    }

    /// The [`ContainerType`] shared by this node and all of its descendants.
    pub fn container_type(&self) -> ContainerType {
        match self {
            Node::Leaf(leaf) => leaf.container_type(),
            Node::Path(path) => path.container_type(),
        }
    }

    /// Returns true if this node is a [`LeafNode`].
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Files `item` under every key path it resolves to below this node.
    ///
    /// The id and all keys are resolved before anything is mutated, so a
    /// failing accessor leaves the node unchanged. Adding an item whose id is
    /// already present in a leaf is a no-op for that leaf.
    pub fn add(&mut self, item: Arc<T>) -> Result<(), DialogSubsetTreeError> {
        let entry = Entry::resolve(item, self.id_accessor())?;
        let key_paths = resolve_key_paths(&*entry.item, self.remaining_aggregators())?;
        self.insert(&entry, &key_paths);
        Ok(())
    }

    /// Removes `item` from the leaves below this node. Removing an absent item
    /// is a no-op.
    pub fn remove(
        &mut self,
        item: &Arc<T>,
        options: RemoveOptions,
    ) -> Result<(), DialogSubsetTreeError> {
        let entry = Entry::resolve(item.clone(), self.id_accessor())?;
        if options.use_exhaustive_search {
            self.delete(&entry, Probe::Exhaustive);
        } else {
            let key_paths = resolve_key_paths(&*entry.item, self.remaining_aggregators())?;
            self.delete(&entry, Probe::KeyPaths(&key_paths));
        }
        Ok(())
    }

    /// Drops everything below this node.
    pub fn purge(&mut self) {
        match self {
            Node::Leaf(leaf) => leaf.purge(),
            Node::Path(path) => path.purge(),
        }
    }

    /// The number of item slots below this node. An item that fans out into
    /// several branches is counted once per branch.
    pub fn size(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.size(),
            Node::Path(path) => path.size(),
        }
    }

    /// A fresh list of every item slot below this node.
    pub fn leaves(&self) -> Vec<Arc<T>> {
        let mut leaves = Vec::with_capacity(self.size());
        self.visit_entries(&mut |_, item| leaves.push(item.clone()));
        leaves
    }

    /// Returns the child filed under `key`. Leaves have no children.
    pub fn child(&self, key: &str) -> Option<&Node<T, Id>> {
        match self {
            Node::Leaf(_) => None,
            Node::Path(path) => path.child(key),
        }
    }

    /// Returns true if a child is filed under `key`.
    pub fn has_child(&self, key: &str) -> bool {
        match self {
            Node::Leaf(_) => false,
            Node::Path(path) => path.has_child(key),
        }
    }

    /// Every child with its key, in order of creation.
    pub fn children(&self) -> Vec<(&str, &Node<T, Id>)> {
        match self {
            Node::Leaf(_) => Vec::new(),
            Node::Path(path) => path.children(),
        }
    }

    /// The existing children `item` currently resolves to. Always empty for
    /// leaves.
    pub fn item_children(&self, item: &T) -> Result<Vec<(&str, &Node<T, Id>)>, AccessorError> {
        match self {
            Node::Leaf(_) => Ok(Vec::new()),
            Node::Path(path) => path.item_children(item),
        }
    }

    /// The aggregators applied from this node's level downwards.
    pub fn remaining_aggregators(&self) -> &[Aggregator<T>] {
        match self {
            Node::Leaf(_) => &[],
            Node::Path(path) => path.remaining_aggregators(),
        }
    }

    fn id_accessor(&self) -> &IdAccessor<T, Id> {
        match self {
            Node::Leaf(leaf) => leaf.id_accessor(),
            Node::Path(path) => path.id_accessor(),
        }
    }

    pub(crate) fn insert(&mut self, entry: &Entry<T, Id>, key_paths: &[Vec<String>]) {
        match self {
            Node::Leaf(leaf) => leaf.insert(entry),
            Node::Path(path) => path.insert(entry, key_paths),
        }
    }

    pub(crate) fn delete(&mut self, entry: &Entry<T, Id>, probe: Probe<'_>) {
        match self {
            Node::Leaf(leaf) => leaf.delete(entry),
            Node::Path(path) => path.delete(entry, probe),
        }
    }

    pub(crate) fn visit_entries<F>(&self, visit: &mut F)
    where
        F: FnMut(&Id, &Arc<T>),
    {
        match self {
            Node::Leaf(leaf) => leaf.visit_entries(visit),
            Node::Path(path) => path.visit_entries(visit),
        }
    }
}

impl<T, Id> std::fmt::Debug for Node<T, Id>
where
    Id: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_leaf() { "Leaf" } else { "Path" };
        f.debug_struct(kind)
            .field("key", &self.key())
            .field("size", &self.size())
            .field("children", &self.children())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeFactory, ROOT_KEY, VOID_KEY};
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Item {
        id: u32,
        kind: &'static str,
        tags: Vec<&'static str>,
    }

    fn item(id: u32, kind: &'static str, tags: &[&'static str]) -> Arc<Item> {
        Arc::new(Item {
            id,
            kind,
            tags: tags.to_vec(),
        })
    }

    fn root(container_type: ContainerType) -> Node<Item, u32> {
        NodeFactory::build(NodeConfig {
            key: ROOT_KEY.to_string(),
            container_type,
            id_accessor: Arc::new(|item: &Item| -> Result<u32, AccessorError> { Ok(item.id) }),
            aggregators: vec![
                Aggregator::new("KIND", |item: &Item| item.kind),
                Aggregator::new("TAG", |item: &Item| item.tags.clone()),
            ]
            .into(),
            depth: 0,
        })
    }

    fn keys<T, Id>(node: &Node<T, Id>) -> Vec<&str>
    where
        Id: Clone + Eq + Hash,
    {
        node.children().into_iter().map(|(key, _)| key).collect()
    }

    #[test]
    fn it_creates_children_lazily_in_order_of_first_use() -> Result<()> {
        let mut root = root(ContainerType::Array);
        assert!(root.children().is_empty());

        root.add(item(1, "b", &["x"]))?;
        root.add(item(2, "a", &[]))?;
        root.add(item(3, "b", &["y", "x"]))?;

        assert_eq!(keys(&root), vec!["b", "a"]);

        let b = root.child("b").expect("kind 'b' was added");
        assert_eq!(keys(b), vec!["x", "y"]);
        assert_eq!(root.child("a").map(keys), Some(vec![VOID_KEY]));
        assert!(b.child("x").is_some_and(Node::is_leaf));
        Ok(())
    }

    #[test]
    fn it_reports_the_children_an_item_currently_fans_into() -> Result<()> {
        let mut root = root(ContainerType::Map);
        root.add(item(1, "a", &["x", "y"]))?;

        let probe = item(2, "a", &["y", "z"]);
        let a = root.child("a").expect("kind 'a' was added");

        assert_eq!(
            root.item_children(&probe)?
                .into_iter()
                .map(|(key, _)| key)
                .collect::<Vec<_>>(),
            vec!["a"]
        );
        assert_eq!(
            a.item_children(&probe)?
                .into_iter()
                .map(|(key, _)| key)
                .collect::<Vec<_>>(),
            vec!["y"]
        );
        assert!(a.child("y").is_some_and(|leaf| leaf.item_children(&probe).is_ok_and(|children| children.is_empty())));
        Ok(())
    }

    #[test]
    fn it_removes_an_item_from_every_branch_it_fans_into() -> Result<()> {
        let mut root = root(ContainerType::Set);
        let fanned = item(1, "a", &["x", "y"]);

        root.add(fanned.clone())?;
        root.add(item(2, "a", &["x"]))?;
        assert_eq!(root.size(), 3);

        root.remove(&fanned, RemoveOptions::default())?;
        assert_eq!(root.size(), 1);
        assert_eq!(root.leaves().iter().map(|item| item.id).collect::<Vec<_>>(), vec![2]);
        assert!(root.child("a").is_some_and(|a| a.has_child("y")));
        Ok(())
    }

    #[test]
    fn it_probes_every_branch_when_removing_exhaustively() -> Result<()> {
        let mut root = root(ContainerType::Array);
        root.add(item(1, "a", &["x"]))?;

        let relabelled = item(1, "b", &["z"]);
        root.remove(&relabelled, RemoveOptions::default())?;
        assert_eq!(root.size(), 1);

        root.remove(&relabelled, RemoveOptions::exhaustive())?;
        assert_eq!(root.size(), 0);
        Ok(())
    }

    #[test]
    fn it_purges_every_child() -> Result<()> {
        let mut root = root(ContainerType::Map);
        root.add(item(1, "a", &["x"]))?;
        root.add(item(2, "b", &["y"]))?;

        root.purge();

        assert_eq!(root.size(), 0);
        assert!(root.children().is_empty());
        Ok(())
    }

    #[test]
    fn it_reads_remove_options_from_camel_case_json() -> Result<()> {
        let options: RemoveOptions = serde_json::from_str(r#"{ "useExhaustiveSearch": true }"#)?;
        assert_eq!(options, RemoveOptions::exhaustive());

        let options: RemoveOptions = serde_json::from_str("{}")?;
        assert_eq!(options, RemoveOptions::default());
        Ok(())
    }
}
