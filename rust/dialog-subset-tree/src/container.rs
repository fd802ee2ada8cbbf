use std::{fmt::Display, hash::Hash, ops::Deref, str::FromStr, sync::Arc};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::DialogSubsetTreeError;

/// Selects the storage backend used by every leaf of a tree and by every slice
/// result taken from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerType {
    /// Items kept in a list, de-duplicated by id
    Array,
    /// Items keyed by id
    Map,
    /// Items de-duplicated by identity of their shared allocation
    Set,
}

impl ContainerType {
    /// Every valid container type, in declaration order.
    pub const ALL: [ContainerType; 3] = [ContainerType::Array, ContainerType::Map, ContainerType::Set];

    /// The lowercase name of this container type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::Array => "array",
            ContainerType::Map => "map",
            ContainerType::Set => "set",
        }
    }
}

/// Returns true if `name` names a known [`ContainerType`].
pub fn is_valid_container_type(name: &str) -> bool {
    name.parse::<ContainerType>().is_ok()
}

impl Display for ContainerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerType {
    type Err = DialogSubsetTreeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ContainerType::ALL
            .into_iter()
            .find(|container_type| container_type.as_str() == value)
            .ok_or_else(|| {
                DialogSubsetTreeError::Configuration(format!(
                    "Unknown container type '{value}'. Valid container types are {}",
                    ContainerType::ALL.map(|container_type| container_type.as_str()).join(", ")
                ))
            })
    }
}

/// A shared item compared and hashed by the address of its allocation rather
/// than by value.
///
/// Set backed containers use this to de-duplicate items by identity.
#[derive(Debug)]
pub struct ItemRef<T>(pub Arc<T>);

impl<T> ItemRef<T> {
    /// The shared item.
    pub fn item(&self) -> &Arc<T> {
        &self.0
    }
}

impl<T> Clone for ItemRef<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> PartialEq for ItemRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for ItemRef<T> {}

impl<T> Hash for ItemRef<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state)
    }
}

impl<T> Deref for ItemRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The items returned by a slice, in the shape selected by the tree's
/// [`ContainerType`].
#[derive(Debug)]
pub enum Container<T, Id> {
    /// Items in insertion order
    Array(Vec<Arc<T>>),
    /// Items keyed by id, in insertion order
    Map(IndexMap<Id, Arc<T>>),
    /// Items keyed by identity, in insertion order
    Set(IndexSet<ItemRef<T>>),
}

impl<T, Id> Container<T, Id>
where
    Id: Hash + Eq,
{
    /// The [`ContainerType`] of this container.
    pub fn container_type(&self) -> ContainerType {
        match self {
            Container::Array(_) => ContainerType::Array,
            Container::Map(_) => ContainerType::Map,
            Container::Set(_) => ContainerType::Set,
        }
    }

    /// The number of items held.
    pub fn len(&self) -> usize {
        match self {
            Container::Array(items) => items.len(),
            Container::Map(items) => items.len(),
            Container::Set(items) => items.len(),
        }
    }

    /// Returns true if no items are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the held items in insertion order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Arc<T>> + '_> {
        match self {
            Container::Array(items) => Box::new(items.iter()),
            Container::Map(items) => Box::new(items.values()),
            Container::Set(items) => Box::new(items.iter().map(ItemRef::item)),
        }
    }

    /// Consumes the container, returning its items in insertion order.
    pub fn into_items(self) -> Vec<Arc<T>> {
        match self {
            Container::Array(items) => items,
            Container::Map(items) => items.into_values().collect(),
            Container::Set(items) => items.into_iter().map(|item| item.0).collect(),
        }
    }
}

impl<T, Id> Clone for Container<T, Id>
where
    Id: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Container::Array(items) => Container::Array(items.clone()),
            Container::Map(items) => Container::Map(items.clone()),
            Container::Set(items) => Container::Set(items.clone()),
        }
    }
}
