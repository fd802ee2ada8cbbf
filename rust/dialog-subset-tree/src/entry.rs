use std::sync::Arc;

use crate::{AccessorError, IdAccessor};

/// An item paired with the id its tree's id accessor resolved for it.
///
/// Leaves and slice results store entries so that ids are computed once, when
/// the item enters the tree, rather than on every comparison.
#[derive(Debug)]
pub struct Entry<T, Id> {
    /// The resolved id of the item
    pub id: Id,
    /// The shared item
    pub item: Arc<T>,
}

impl<T, Id> Entry<T, Id> {
    /// Resolves the id of `item` with `id_accessor`.
    pub fn resolve(item: Arc<T>, id_accessor: &IdAccessor<T, Id>) -> Result<Self, AccessorError> {
        let id = id_accessor(&*item)?;
        Ok(Self { id, item })
    }
}

impl<T, Id> Clone for Entry<T, Id>
where
    Id: Clone,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            item: self.item.clone(),
        }
    }
}
