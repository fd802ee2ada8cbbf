use std::{hash::Hash, sync::Arc};

use hashbrown::HashSet;
use indexmap::{IndexMap, IndexSet};

use crate::{Container, ContainerType, Entry, ItemRef};

/// Slice results kept in a list. A side set of seen ids keeps additions and
/// lookups O(1) despite the linear storage.
#[derive(Debug)]
pub struct ArrayResult<T, Id> {
    items: Vec<Entry<T, Id>>,
    seen_ids: HashSet<Id>,
}

/// Slice results keyed by id.
#[derive(Debug)]
pub struct MapResult<T, Id> {
    items: IndexMap<Id, Arc<T>>,
}

/// Slice results keyed by item identity.
#[derive(Debug)]
pub struct SetResult<T> {
    items: IndexSet<ItemRef<T>>,
}

/// The accumulator a slice query collects its items into.
///
/// Each backend de-duplicates the same way the matching leaf backend does:
/// the first item added for an id (or, for sets, an allocation) is kept and
/// later additions of it are ignored.
#[derive(Debug)]
pub enum SliceResult<T, Id> {
    /// Collects into an [`ArrayResult`]
    Array(ArrayResult<T, Id>),
    /// Collects into a [`MapResult`]
    Map(MapResult<T, Id>),
    /// Collects into a [`SetResult`]
    Set(SetResult<T>),
}

impl<T, Id> SliceResult<T, Id>
where
    Id: Clone + Eq + Hash,
{
    /// Creates an empty result shaped like `container_type`.
    pub fn new(container_type: ContainerType) -> Self {
        match container_type {
            ContainerType::Array => SliceResult::Array(ArrayResult {
                items: Vec::new(),
                seen_ids: HashSet::new(),
            }),
            ContainerType::Map => SliceResult::Map(MapResult {
                items: IndexMap::new(),
            }),
            ContainerType::Set => SliceResult::Set(SetResult {
                items: IndexSet::new(),
            }),
        }
    }

    /// Adds the item of `entry` unless it is already present.
    pub fn add(&mut self, entry: &Entry<T, Id>) {
        self.add_item(&entry.id, &entry.item);
    }

    pub(crate) fn add_item(&mut self, id: &Id, item: &Arc<T>) {
        match self {
            SliceResult::Array(result) => {
                if result.seen_ids.insert(id.clone()) {
                    result.items.push(Entry {
                        id: id.clone(),
                        item: item.clone(),
                    });
                }
            }
            SliceResult::Map(result) => {
                if !result.items.contains_key(id) {
                    result.items.insert(id.clone(), item.clone());
                }
            }
            SliceResult::Set(result) => {
                result.items.insert(ItemRef(item.clone()));
            }
        }
    }

    /// Removes the item of `entry`, matched by id (or by identity for sets).
    /// A no-op if it is absent.
    pub fn remove(&mut self, entry: &Entry<T, Id>) {
        match self {
            SliceResult::Array(result) => {
                if result.seen_ids.remove(&entry.id) {
                    result.items.retain(|existing| existing.id != entry.id);
                }
            }
            SliceResult::Map(result) => {
                result.items.shift_remove(&entry.id);
            }
            SliceResult::Set(result) => {
                result.items.shift_remove(&ItemRef(entry.item.clone()));
            }
        }
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        match self {
            SliceResult::Array(result) => {
                result.items.clear();
                result.seen_ids.clear();
            }
            SliceResult::Map(result) => result.items.clear(),
            SliceResult::Set(result) => result.items.clear(),
        }
    }

    /// The number of items held.
    pub fn len(&self) -> usize {
        match self {
            SliceResult::Array(result) => result.items.len(),
            SliceResult::Map(result) => result.items.len(),
            SliceResult::Set(result) => result.items.len(),
        }
    }

    /// Returns true if no items are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the held items in the tree's [`Container`] shape.
    pub fn to_container(&self) -> Container<T, Id> {
        match self {
            SliceResult::Array(result) => Container::Array(
                result
                    .items
                    .iter()
                    .map(|entry| entry.item.clone())
                    .collect(),
            ),
            SliceResult::Map(result) => Container::Map(result.items.clone()),
            SliceResult::Set(result) => Container::Set(result.items.clone()),
        }
    }
}
