use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::{DialogSubsetTreeError, Node, VOID_KEY};

/// The operand of a [`Condition`]: a single key or a list of keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    /// A single key, as taken by `eq` and `ne`
    One(String),
    /// A list of keys, as taken by `in` and `out`
    Many(Vec<String>),
}

/// A per-level filter of a slice query.
///
/// Conditions are written as `[operator, value?]` pairs when (de)serialized:
///
/// ```
/// use dialog_subset_tree::Condition;
///
/// let condition: Condition = serde_json::from_str(r#"["in", ["open", "held"]]"#).unwrap();
/// assert_eq!(condition, Condition::any_of(["open", "held"]));
///
/// let condition: Condition = serde_json::from_str(r#"["null"]"#).unwrap();
/// assert_eq!(condition, Condition::Null);
/// ```
///
/// The same condition drives both the traversal of a fresh slice
/// ([`Condition::select_children`]) and the incremental maintenance of a
/// cached one ([`Condition::matches`]); the two always agree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum Condition {
    /// The key equals the value
    Eq(String),
    /// The key differs from the value
    Ne(String),
    /// The key is one of the values
    In(Vec<String>),
    /// The key is none of the values
    Out(Vec<String>),
    /// Any key
    Any,
    /// The key is [`VOID_KEY`], i.e. the key accessor yielded no value
    Null,
}

impl Condition {
    /// Matches keys equal to `key`.
    pub fn eq<K: Into<String>>(key: K) -> Self {
        Condition::Eq(key.into())
    }

    /// Matches keys other than `key`.
    pub fn ne<K: Into<String>>(key: K) -> Self {
        Condition::Ne(key.into())
    }

    /// Matches any of `keys`.
    pub fn any_of<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Condition::In(keys.into_iter().map(Into::into).collect())
    }

    /// Matches keys that are none of `keys`.
    pub fn none_of<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Condition::Out(keys.into_iter().map(Into::into).collect())
    }

    /// Builds a condition from its operator name and optional operand.
    ///
    /// Unknown operators and missing or mis-shaped operands are rejected here,
    /// so a query never reaches traversal with a condition it cannot evaluate.
    /// `in` and `out` accept a single key as a one-element list.
    pub fn parse(
        operator: &str,
        value: Option<ConditionValue>,
    ) -> Result<Self, DialogSubsetTreeError> {
        let condition = match (operator, value) {
            ("eq", Some(ConditionValue::One(key))) => Condition::Eq(key),
            ("ne", Some(ConditionValue::One(key))) => Condition::Ne(key),
            ("in", Some(ConditionValue::Many(keys))) => Condition::In(keys),
            ("in", Some(ConditionValue::One(key))) => Condition::In(vec![key]),
            ("out", Some(ConditionValue::Many(keys))) => Condition::Out(keys),
            ("out", Some(ConditionValue::One(key))) => Condition::Out(vec![key]),
            ("any", _) => Condition::Any,
            ("null", _) => Condition::Null,
            ("eq" | "ne", value) => {
                return Err(DialogSubsetTreeError::Query(format!(
                    "Operator '{operator}' expects a single key, received {value:?}"
                )));
            }
            ("in" | "out", None) => {
                return Err(DialogSubsetTreeError::Query(format!(
                    "Operator '{operator}' expects a list of keys"
                )));
            }
            (operator, _) => {
                tracing::warn!(operator, "Rejecting slice condition with unknown operator");
                return Err(DialogSubsetTreeError::Query(format!(
                    "Unknown condition operator '{operator}'"
                )));
            }
        };

        Ok(condition)
    }

    /// The operator name of this condition.
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "eq",
            Condition::Ne(_) => "ne",
            Condition::In(_) => "in",
            Condition::Out(_) => "out",
            Condition::Any => "any",
            Condition::Null => "null",
        }
    }

    /// Returns true if a single resolved `key` satisfies this condition.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Condition::Eq(value) => value == key,
            Condition::Ne(value) => value != key,
            Condition::In(values) => values.iter().any(|value| value == key),
            Condition::Out(values) => !values.iter().any(|value| value == key),
            Condition::Any => true,
            Condition::Null => key == VOID_KEY,
        }
    }

    /// Returns true if any of an item's resolved `keys` for a level satisfies
    /// this condition.
    pub fn matches_any<K: AsRef<str>>(&self, keys: &[K]) -> bool {
        keys.iter().any(|key| self.matches(key.as_ref()))
    }

    /// Selects the children of `node` a slice descends into.
    ///
    /// `eq`, `in` and `null` look their keys up directly (`in` in the order its
    /// keys are listed); the other operators filter every child.
    pub fn select_children<'a, T, Id>(&self, node: &'a Node<T, Id>) -> Vec<&'a Node<T, Id>>
    where
        Id: Clone + Eq + Hash,
    {
        match self {
            Condition::Eq(key) => node.child(key).into_iter().collect(),
            Condition::In(keys) => keys.iter().filter_map(|key| node.child(key)).collect(),
            Condition::Null => node.child(VOID_KEY).into_iter().collect(),
            Condition::Ne(_) | Condition::Out(_) | Condition::Any => node
                .children()
                .into_iter()
                .filter(|(key, _)| self.matches(key))
                .map(|(_, child)| child)
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCondition {
    Valued(String, ConditionValue),
    Bare((String,)),
}

impl TryFrom<RawCondition> for Condition {
    type Error = DialogSubsetTreeError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        match raw {
            RawCondition::Valued(operator, value) => Condition::parse(&operator, Some(value)),
            RawCondition::Bare((operator,)) => Condition::parse(&operator, None),
        }
    }
}

impl From<Condition> for RawCondition {
    fn from(condition: Condition) -> Self {
        let operator = condition.operator().to_string();
        match condition {
            Condition::Eq(key) | Condition::Ne(key) => {
                RawCondition::Valued(operator, ConditionValue::One(key))
            }
            Condition::In(keys) | Condition::Out(keys) => {
                RawCondition::Valued(operator, ConditionValue::Many(keys))
            }
            Condition::Any | Condition::Null => RawCondition::Bare((operator,)),
        }
    }
}
