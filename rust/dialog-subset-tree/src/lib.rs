#![deny(missing_docs)]

//! A mutable, in-memory, multi-level index over a collection of items.
//!
//! A [`SubsetTree`] is configured with an ordered list of [`Aggregator`]s.
//! Each aggregator names a level and resolves an item to one or more string
//! keys; the tree files every item under each key path its aggregators lead
//! to. Items stay shared ([`std::sync::Arc`]) between every leaf that holds
//! them.
//!
//! Leaves use one of three backends, picked with a [`ContainerType`]:
//!
//! - **array**: an ordered list, at most one item per id
//! - **map**: items keyed by id
//! - **set**: items keyed by the identity of their allocation
//!
//! A slice selects items by applying a [`Condition`] to the keys of each
//! level. Slices can be cached: a cached slice is kept current by every later
//! [`SubsetTree::add`] and [`SubsetTree::remove`] without traversing the tree
//! again.
//!
//! ```
//! use std::sync::Arc;
//! use dialog_subset_tree::{Aggregator, Condition, ContainerType, SliceConfig, SubsetTree};
//!
//! struct Issue {
//!     id: u64,
//!     state: &'static str,
//!     assignee: Option<&'static str>,
//! }
//!
//! let mut tree = SubsetTree::builder()
//!     .container_type(ContainerType::Array)
//!     .aggregator(Aggregator::new("STATE", |issue: &Issue| issue.state))
//!     .aggregator(Aggregator::new("ASSIGNEE", |issue: &Issue| issue.assignee))
//!     .id_accessor(|issue: &Issue| issue.id)
//!     .build()
//!     .unwrap();
//!
//! let unassigned = tree
//!     .slice_cached(
//!         SliceConfig::new()
//!             .condition("STATE", Condition::ne("closed"))
//!             .condition("ASSIGNEE", Condition::Null),
//!     )
//!     .unwrap();
//!
//! let triage = Arc::new(Issue { id: 1, state: "open", assignee: None });
//! tree.add(triage.clone()).unwrap();
//! tree.add(Issue { id: 2, state: "open", assignee: Some("kai") }).unwrap();
//! tree.add(Issue { id: 3, state: "closed", assignee: None }).unwrap();
//!
//! assert_eq!(unassigned.items().unwrap().len(), 1);
//!
//! tree.remove(&triage).unwrap();
//! assert!(unassigned.items().unwrap().is_empty());
//! ```
//!
//! The tree logs through [`tracing`]; nothing is emitted unless the caller
//! installs a subscriber.

mod error;
pub use error::*;

mod key;
pub use key::*;

mod aggregator;
pub use aggregator::*;

mod container;
pub use container::*;

mod entry;
pub use entry::*;

mod node;
pub use node::*;

mod factory;
pub use factory::*;

mod condition;
pub use condition::*;

mod result;
pub use result::*;

mod query;
pub use query::*;

mod registry;
pub use registry::*;

mod tree;
pub use tree::*;
