//! Graph collector: routes single graphs into per-module unified graphs.
//!
//! Each graph is classified by its file name and module descriptor:
//!
//! | File name                     | Module  | Primary |
//! |-------------------------------|---------|---------|
//! | `M.symbols.json`              | `M`     | yes     |
//! | `M-snippets.symbols.json`     | `M`     | yes     |
//! | `A@B.symbols.json`            | `B`     | no      |
//! | `A@B@C.symbols.json`          | `A`     | no      |
//! | any graph with `isVirtual`    | stated  | no      |
//!
//! Extension graphs (non-primary) are held back until [`GraphCollector::finish`]
//! so that every primary graph has been merged before they are folded in.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::graph::{SymbolGraph, SYMBOL_GRAPH_SUFFIX};
use crate::unified::UnifiedGraph;

const SNIPPETS_SUFFIX: &str = "-snippets.symbols.json";

// ============================================================================
// Options
// ============================================================================

/// Which module an extension graph is filed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtensionGraphAssociation {
    /// The module being extended (`B` for `A@B.symbols.json`).
    #[default]
    ExtendedGraph,
    /// The module declaring the extension (`module.name` inside the graph).
    ExtendingGraph,
}

/// Collector configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorOptions {
    pub association: ExtensionGraphAssociation,
    /// Compute overload groups when no producer emitted any.
    pub create_overload_groups: bool,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        CollectorOptions {
            association: ExtensionGraphAssociation::ExtendedGraph,
            create_overload_groups: true,
        }
    }
}

impl CollectorOptions {
    pub fn with_association(mut self, association: ExtensionGraphAssociation) -> Self {
        self.association = association;
        self
    }

    pub fn with_overload_groups(mut self, enabled: bool) -> Self {
        self.create_overload_groups = enabled;
        self
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Where a merged graph came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphSource {
    Primary(PathBuf),
    Extension(PathBuf),
}

impl GraphSource {
    pub fn path(&self) -> &Path {
        match self {
            GraphSource::Primary(path) | GraphSource::Extension(path) => path,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, GraphSource::Primary(_))
    }
}

/// Module a graph belongs to, and whether it is that module's own graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAssignment {
    pub module_name: String,
    pub is_primary: bool,
}

/// Classify a graph loaded from `source`.
pub fn module_name_for(graph: &SymbolGraph, source: &Path) -> ModuleAssignment {
    let stated = |is_primary| ModuleAssignment {
        module_name: graph.module.name.clone(),
        is_primary,
    };

    if graph.module.is_virtual {
        return stated(false);
    }

    let file_name: Cow<'_, str> = source
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    if file_name.ends_with(SNIPPETS_SUFFIX) || !file_name.contains('@') {
        return stated(true);
    }

    let stem = file_name
        .strip_suffix(SYMBOL_GRAPH_SUFFIX)
        .unwrap_or(&*file_name);
    let parts: Vec<&str> = stem.split('@').collect();
    let module_name = if parts.len() > 2 {
        parts[0]
    } else {
        parts.last().copied().unwrap_or(stem)
    };
    ModuleAssignment {
        module_name: module_name.to_string(),
        is_primary: false,
    }
}

// ============================================================================
// Collector
// ============================================================================

/// Final state of a collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorOutput {
    pub unified_graphs: BTreeMap<String, UnifiedGraph>,
    /// Sources per module in merge order.
    pub graph_sources: BTreeMap<String, Vec<GraphSource>>,
}

/// Accumulates single graphs into one unified graph per module.
#[derive(Debug, Default)]
pub struct GraphCollector {
    options: CollectorOptions,
    unified_graphs: BTreeMap<String, UnifiedGraph>,
    graph_sources: BTreeMap<String, Vec<GraphSource>>,
    extension_graphs: BTreeMap<PathBuf, SymbolGraph>,
}

impl GraphCollector {
    /// Create a collector with default options.
    pub fn new() -> Self {
        GraphCollector::default()
    }

    pub fn with_options(options: CollectorOptions) -> Self {
        GraphCollector {
            options,
            ..GraphCollector::default()
        }
    }

    pub fn options(&self) -> &CollectorOptions {
        &self.options
    }

    /// Sources of extension graphs still waiting for [`finish`](Self::finish).
    pub fn deferred_sources(&self) -> impl Iterator<Item = &Path> {
        self.extension_graphs.keys().map(PathBuf::as_path)
    }

    /// Fold `graph` into the unified graph of its module.
    ///
    /// Extension graphs are deferred unless `force_loading` is set.
    pub fn merge(&mut self, graph: SymbolGraph, source: &Path, force_loading: bool) {
        let assignment = module_name_for(&graph, source);
        if !assignment.is_primary && !force_loading {
            debug!(
                source = %source.display(),
                module = %assignment.module_name,
                "deferring extension graph"
            );
            self.extension_graphs.insert(source.to_path_buf(), graph);
            return;
        }

        let module_name = match self.options.association {
            ExtensionGraphAssociation::ExtendedGraph => assignment.module_name,
            ExtensionGraphAssociation::ExtendingGraph => graph.module.name.clone(),
        };
        let tagged = if assignment.is_primary {
            GraphSource::Primary(source.to_path_buf())
        } else {
            GraphSource::Extension(source.to_path_buf())
        };

        self.unified_graphs
            .entry(module_name.clone())
            .or_insert_with(|| UnifiedGraph::new(module_name.clone()))
            .merge_single_graph(graph, source);
        self.graph_sources
            .entry(module_name)
            .or_default()
            .push(tagged);
    }

    /// Merge deferred extension graphs and finalize every unified graph.
    ///
    /// Finalization collects orphan relationships, then reconciles
    /// producer-emitted overload groups or computes new ones.
    pub fn finish(mut self) -> CollectorOutput {
        let deferred = std::mem::take(&mut self.extension_graphs);
        for (source, graph) in deferred {
            self.merge(graph, &source, true);
        }

        for unified in self.unified_graphs.values_mut() {
            unified.collect_orphans();
            if unified.has_overload_groups() {
                unified.combine_overload_groups();
            } else if self.options.create_overload_groups {
                unified.create_overload_groups();
            }
        }

        CollectorOutput {
            unified_graphs: self.unified_graphs,
            graph_sources: self.graph_sources,
        }
    }
}
