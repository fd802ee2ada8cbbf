use std::{hash::Hash, sync::Arc};

use indexmap::IndexMap;

use crate::{ContainerType, Entry, IdAccessor, ItemRef};

/// A list of items, de-duplicated by id through a linear scan.
#[derive(Debug)]
pub struct ArrayLeaf<T, Id> {
    entries: Vec<Entry<T, Id>>,
}

impl<T, Id> ArrayLeaf<T, Id>
where
    Id: Clone + Eq + Hash,
{
    fn insert(&mut self, entry: &Entry<T, Id>) {
        if !self.entries.iter().any(|existing| existing.id == entry.id) {
            self.entries.push(entry.clone());
        }
    }

    fn delete(&mut self, entry: &Entry<T, Id>) {
        if let Some(index) = self
            .entries
            .iter()
            .position(|existing| existing.id == entry.id)
        {
            self.entries.remove(index);
        }
    }
}

/// Items keyed by id.
#[derive(Debug)]
pub struct MapLeaf<T, Id> {
    entries: IndexMap<Id, Arc<T>>,
}

impl<T, Id> MapLeaf<T, Id>
where
    Id: Clone + Eq + Hash,
{
    fn insert(&mut self, entry: &Entry<T, Id>) {
        if !self.entries.contains_key(&entry.id) {
            self.entries.insert(entry.id.clone(), entry.item.clone());
        }
    }

    fn delete(&mut self, entry: &Entry<T, Id>) {
        self.entries.shift_remove(&entry.id);
    }
}

/// Items keyed by the identity of their allocation; ids play no part in
/// de-duplication.
#[derive(Debug)]
pub struct SetLeaf<T, Id> {
    entries: IndexMap<ItemRef<T>, Id>,
}

impl<T, Id> SetLeaf<T, Id>
where
    Id: Clone + Eq + Hash,
{
    fn insert(&mut self, entry: &Entry<T, Id>) {
        self.entries
            .entry(ItemRef(entry.item.clone()))
            .or_insert_with(|| entry.id.clone());
    }

    fn delete(&mut self, entry: &Entry<T, Id>) {
        self.entries.shift_remove(&ItemRef(entry.item.clone()));
    }
}

/// The storage backend of a [`LeafNode`].
#[derive(Debug)]
pub enum LeafStorage<T, Id> {
    /// Backed by an [`ArrayLeaf`]
    Array(ArrayLeaf<T, Id>),
    /// Backed by a [`MapLeaf`]
    Map(MapLeaf<T, Id>),
    /// Backed by a [`SetLeaf`]
    Set(SetLeaf<T, Id>),
}

/// A terminal node holding the items filed under one fully resolved key path.
pub struct LeafNode<T, Id> {
    key: String,
    id_accessor: IdAccessor<T, Id>,
    storage: LeafStorage<T, Id>,
}

impl<T, Id> LeafNode<T, Id>
where
    Id: Clone + Eq + Hash,
{
    /// Creates an empty leaf backed by the storage matching `container_type`.
    pub fn new(key: String, container_type: ContainerType, id_accessor: IdAccessor<T, Id>) -> Self {
        let storage = match container_type {
            ContainerType::Array => LeafStorage::Array(ArrayLeaf {
                entries: Vec::new(),
            }),
            ContainerType::Map => LeafStorage::Map(MapLeaf {
                entries: IndexMap::new(),
            }),
            ContainerType::Set => LeafStorage::Set(SetLeaf {
                entries: IndexMap::new(),
            }),
        };

        Self {
            key,
            id_accessor,
            storage,
        }
    }

    /// The key that led to this leaf from its parent.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The backend holding this leaf's items.
    pub fn storage(&self) -> &LeafStorage<T, Id> {
        &self.storage
    }

    /// The [`ContainerType`] of this leaf's backend.
    pub fn container_type(&self) -> ContainerType {
        match self.storage {
            LeafStorage::Array(_) => ContainerType::Array,
            LeafStorage::Map(_) => ContainerType::Map,
            LeafStorage::Set(_) => ContainerType::Set,
        }
    }

    pub(crate) fn id_accessor(&self) -> &IdAccessor<T, Id> {
        &self.id_accessor
    }

    pub(crate) fn insert(&mut self, entry: &Entry<T, Id>) {
        match &mut self.storage {
            LeafStorage::Array(leaf) => leaf.insert(entry),
            LeafStorage::Map(leaf) => leaf.insert(entry),
            LeafStorage::Set(leaf) => leaf.insert(entry),
        }
    }

    pub(crate) fn delete(&mut self, entry: &Entry<T, Id>) {
        match &mut self.storage {
            LeafStorage::Array(leaf) => leaf.delete(entry),
            LeafStorage::Map(leaf) => leaf.delete(entry),
            LeafStorage::Set(leaf) => leaf.delete(entry),
        }
    }

    /// Removes every item from this leaf.
    pub fn purge(&mut self) {
        match &mut self.storage {
            LeafStorage::Array(leaf) => leaf.entries.clear(),
            LeafStorage::Map(leaf) => leaf.entries.clear(),
            LeafStorage::Set(leaf) => leaf.entries.clear(),
        }
    }

    /// The number of items held by this leaf.
    pub fn size(&self) -> usize {
        match &self.storage {
            LeafStorage::Array(leaf) => leaf.entries.len(),
            LeafStorage::Map(leaf) => leaf.entries.len(),
            LeafStorage::Set(leaf) => leaf.entries.len(),
        }
    }

    pub(crate) fn visit_entries<F>(&self, visit: &mut F)
    where
        F: FnMut(&Id, &Arc<T>),
    {
        match &self.storage {
            LeafStorage::Array(leaf) => leaf
                .entries
                .iter()
                .for_each(|entry| visit(&entry.id, &entry.item)),
            LeafStorage::Map(leaf) => leaf.entries.iter().for_each(|(id, item)| visit(id, item)),
            LeafStorage::Set(leaf) => leaf
                .entries
                .iter()
                .for_each(|(item, id)| visit(id, item.item())),
        }
    }
}
