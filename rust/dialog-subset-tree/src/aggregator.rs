use std::sync::Arc;

use crate::{AccessorError, ItemKey};

/// A shared, fallible function resolving the [`ItemKey`] of an item for one
/// aggregation level.
pub type KeyAccessor<T> = Arc<dyn Fn(&T) -> Result<ItemKey, AccessorError> + Send + Sync>;

/// A shared, fallible function resolving the identity of an item.
///
/// Array and map backed containers use the id to keep at most one item per id.
pub type IdAccessor<T, Id> = Arc<dyn Fn(&T) -> Result<Id, AccessorError> + Send + Sync>;

/// A single, named aggregation step.
///
/// A [`crate::SubsetTree`] indexes items by each of its aggregators in turn:
/// the first aggregator partitions the root, the second partitions each of the
/// first level's children, and so on. The name is how slice conditions refer
/// to the level.
///
/// ```
/// use dialog_subset_tree::Aggregator;
///
/// struct Order {
///     status: Option<String>,
/// }
///
/// let status = Aggregator::new("STATUS", |order: &Order| order.status.clone());
/// assert_eq!(status.name(), "STATUS");
/// ```
pub struct Aggregator<T> {
    name: String,
    key_accessor: KeyAccessor<T>,
}

impl<T> Aggregator<T> {
    /// Creates an aggregator from an infallible key accessor.
    pub fn new<N, F, K>(name: N, key_accessor: F) -> Self
    where
        N: Into<String>,
        F: Fn(&T) -> K + Send + Sync + 'static,
        K: Into<ItemKey>,
    {
        Self {
            name: name.into(),
            key_accessor: Arc::new(move |item: &T| -> Result<ItemKey, AccessorError> {
                Ok(key_accessor(item).into())
            }),
        }
    }

    /// Creates an aggregator from a key accessor that may fail.
    ///
    /// A failing accessor aborts the `add` or `remove` call that invoked it
    /// before anything is mutated.
    pub fn try_new<N, F, K>(name: N, key_accessor: F) -> Self
    where
        N: Into<String>,
        F: Fn(&T) -> Result<K, AccessorError> + Send + Sync + 'static,
        K: Into<ItemKey>,
    {
        Self {
            name: name.into(),
            key_accessor: Arc::new(move |item: &T| -> Result<ItemKey, AccessorError> {
                key_accessor(item).map(Into::into)
            }),
        }
    }

    /// The name slice conditions use to refer to this aggregation level.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the key accessor on `item`.
    pub fn key(&self, item: &T) -> Result<ItemKey, AccessorError> {
        (self.key_accessor)(item)
    }
}

impl<T> Clone for Aggregator<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            key_accessor: self.key_accessor.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Aggregator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
