//! Unified graphs: many language/platform views of one module.
//!
//! A [`UnifiedGraph`] owns its [`UnifiedSymbol`] records by precise
//! identifier and files relationships per [`Selector`](crate::selector::Selector).
//! Records are only mutated through the graph's own API.

mod graph;
mod overloads;
mod symbol;

pub use graph::UnifiedGraph;
pub use overloads::{is_overload_group, OverloadInconsistency, OVERLOAD_GROUP_SUFFIX};
pub use symbol::UnifiedSymbol;
