//! symgraph: merge symbol graphs into unified multi-view graphs.
//!
//! Symbol graphs describe the public interface of a compiled module, one
//! file per language and platform. This crate folds many of them into one
//! unified graph per module, keyed by (language, platform) selector.

// Engine - re-exported from symgraph-core
pub use symgraph_core::collector;
pub use symgraph_core::graph;
pub use symgraph_core::mixin;
pub use symgraph_core::selector;
pub use symgraph_core::unified;

// Front door
pub mod cli;
pub mod error;
