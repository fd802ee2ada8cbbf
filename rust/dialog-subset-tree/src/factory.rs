use std::hash::Hash;

use crate::{LeafNode, Node, NodeConfig, PathNode};

/// Decides which concrete [`Node`] to construct for a position in a tree.
///
/// This is the only place a [`crate::ContainerType`] is mapped to a leaf
/// backend; it is used both for the root of a tree and for every child a
/// [`PathNode`] creates.
pub struct NodeFactory;

impl NodeFactory {
    /// Builds a [`LeafNode`] if no aggregators remain at `config.depth`,
    /// otherwise a [`PathNode`] bound to the next aggregator.
    pub fn build<T, Id>(config: NodeConfig<T, Id>) -> Node<T, Id>
    where
        Id: Clone + Eq + Hash,
    {
        if config.depth >= config.aggregators.len() {
            Node::Leaf(LeafNode::new(
                config.key,
                config.container_type,
                config.id_accessor,
            ))
        } else {
            Node::Path(PathNode::at_level(config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessorError, Aggregator, ContainerType, DialogSubsetTreeError, IdAccessor};
    use anyhow::Result;
    use std::sync::Arc;

    fn config(depth: usize) -> NodeConfig<String, String> {
        let id_accessor: IdAccessor<String, String> =
            Arc::new(|item: &String| -> Result<String, AccessorError> { Ok(item.clone()) });

        NodeConfig {
            key: "k".into(),
            container_type: ContainerType::Set,
            id_accessor,
            aggregators: vec![Aggregator::new("FIRST", |item: &String| item.clone())].into(),
            depth,
        }
    }

    #[test]
    fn it_builds_path_nodes_while_aggregators_remain() -> Result<()> {
        let node = NodeFactory::build(config(0));

        assert!(!node.is_leaf());
        assert_eq!(node.remaining_aggregators().len(), 1);
        Ok(())
    }

    #[test]
    fn it_builds_leaves_once_aggregators_are_exhausted() -> Result<()> {
        let node = NodeFactory::build(config(1));

        assert!(node.is_leaf());
        assert_eq!(node.container_type(), ContainerType::Set);
        assert_eq!(node.key(), "k");
        Ok(())
    }

    #[test]
    fn it_refuses_path_nodes_without_an_aggregator() -> Result<()> {
        let error = PathNode::new(config(1)).err();

        assert!(matches!(error, Some(DialogSubsetTreeError::Configuration(_))));
        Ok(())
    }
}
