use indexmap::IndexSet;

use crate::{AccessorError, Aggregator};

/// The reserved key an item is filed under when its key accessor yields no
/// value.
pub const VOID_KEY: &str = "__VOID__";

/// The key given to the root node of every [`crate::SubsetTree`].
pub const ROOT_KEY: &str = "__ROOT__";

/// The raw value returned by a key accessor for one aggregation level.
///
/// An accessor may yield a single key, no key at all, or several keys. In the
/// last case the item fans out into every listed key. Absent entries within a
/// list resolve to [`VOID_KEY`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemKey {
    /// No key; the item is filed under [`VOID_KEY`]
    Void,
    /// A single key
    One(String),
    /// Several keys, possibly with absent entries
    Many(Vec<Option<String>>),
}

impl From<()> for ItemKey {
    fn from(_: ()) -> Self {
        ItemKey::Void
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        ItemKey::One(value.to_string())
    }
}

impl From<&String> for ItemKey {
    fn from(value: &String) -> Self {
        ItemKey::One(value.clone())
    }
}

impl From<String> for ItemKey {
    fn from(value: String) -> Self {
        ItemKey::One(value)
    }
}

impl From<Option<String>> for ItemKey {
    fn from(value: Option<String>) -> Self {
        value.map_or(ItemKey::Void, ItemKey::One)
    }
}

impl From<Option<&str>> for ItemKey {
    fn from(value: Option<&str>) -> Self {
        value.map_or(ItemKey::Void, |key| ItemKey::One(key.to_string()))
    }
}

impl From<Vec<String>> for ItemKey {
    fn from(value: Vec<String>) -> Self {
        ItemKey::Many(value.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for ItemKey {
    fn from(value: Vec<&str>) -> Self {
        ItemKey::Many(value.into_iter().map(|key| Some(key.to_string())).collect())
    }
}

impl From<Vec<Option<String>>> for ItemKey {
    fn from(value: Vec<Option<String>>) -> Self {
        ItemKey::Many(value)
    }
}

impl<const N: usize> From<[&str; N]> for ItemKey {
    fn from(value: [&str; N]) -> Self {
        ItemKey::Many(value.iter().map(|key| Some(key.to_string())).collect())
    }
}

/// Resolves a possibly absent key to a concrete key string, substituting
/// [`VOID_KEY`] for absent values.
pub fn resolve_key(key: Option<&str>) -> String {
    key.unwrap_or(VOID_KEY).to_string()
}

impl ItemKey {
    /// Normalizes this key into an ordered, de-duplicated, non-empty list of
    /// key strings.
    pub fn resolve(self) -> Vec<String> {
        let keys: IndexSet<String> = match self {
            ItemKey::Void => IndexSet::new(),
            ItemKey::One(key) => IndexSet::from([key]),
            ItemKey::Many(keys) => keys
                .into_iter()
                .map(|key| key.unwrap_or_else(|| VOID_KEY.to_string()))
                .collect(),
        };

        if keys.is_empty() {
            vec![VOID_KEY.to_string()]
        } else {
            keys.into_iter().collect()
        }
    }
}

/// Invokes the key accessor of `aggregator` on `item` and resolves the result
/// into the list of keys the item is filed under at that level.
pub fn resolve_item_key<T>(
    item: &T,
    aggregator: &Aggregator<T>,
) -> Result<Vec<String>, AccessorError> {
    Ok(aggregator.key(item)?.resolve())
}

/// Resolves the keys of `item` at every level described by `aggregators`, in
/// order. The result is the set of key paths the item occupies in a tree.
pub fn resolve_key_paths<T>(
    item: &T,
    aggregators: &[Aggregator<T>],
) -> Result<Vec<Vec<String>>, AccessorError> {
    aggregators
        .iter()
        .map(|aggregator| resolve_item_key(item, aggregator))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_resolves_a_single_key() -> Result<()> {
        assert_eq!(ItemKey::from("x").resolve(), vec!["x".to_string()]);
        Ok(())
    }

    #[test]
    fn it_keeps_empty_strings_as_keys() -> Result<()> {
        assert_eq!(ItemKey::from("").resolve(), vec!["".to_string()]);
        Ok(())
    }

    #[test]
    fn it_substitutes_the_void_key_for_absent_values() -> Result<()> {
        assert_eq!(ItemKey::Void.resolve(), vec![VOID_KEY.to_string()]);
        assert_eq!(ItemKey::from(None::<String>).resolve(), vec![VOID_KEY]);
        assert_eq!(ItemKey::Many(vec![]).resolve(), vec![VOID_KEY]);
        assert_eq!(resolve_key(None), VOID_KEY);
        assert_eq!(resolve_key(Some("a")), "a");
        Ok(())
    }

    #[test]
    fn it_deduplicates_multiple_keys_in_order() -> Result<()> {
        let key = ItemKey::Many(vec![
            Some("y".into()),
            None,
            Some("x".into()),
            Some("y".into()),
            None,
        ]);

        assert_eq!(key.resolve(), vec!["y", VOID_KEY, "x"]);
        Ok(())
    }

    #[test]
    fn it_resolves_through_an_aggregator() -> Result<()> {
        let aggregator = Aggregator::new("tags", |tags: &Vec<&'static str>| tags.clone());

        assert_eq!(resolve_item_key(&vec!["a", "b", "a"], &aggregator)?, vec!["a", "b"]);
        assert_eq!(resolve_item_key(&vec![], &aggregator)?, vec![VOID_KEY]);
        Ok(())
    }
}
