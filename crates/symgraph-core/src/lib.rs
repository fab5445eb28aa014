//! Core engine for symgraph.
//!
//! This crate provides the language-agnostic symbol graph machinery:
//! - Single symbol graph model and wire codec
//! - Mixin registry for typed extension payloads
//! - Selectors for per-language/per-platform views
//! - Unified graph merging, orphan reconciliation and overload groups
//! - Graph collector for classifying and folding many graphs per module

pub mod collector;
pub mod error;
pub mod graph;
pub mod mixin;
pub mod selector;
pub mod unified;
