//! Unified graph of one module, merged from any number of single graphs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::collector::module_name_for;
use crate::error::EncodeError;
use crate::graph::{Metadata, Module, Relationship, RelationshipKind, SymbolGraph};
use crate::mixin::MixinRegistry;
use crate::selector::Selector;

use super::overloads::OverloadInconsistency;
use super::symbol::{view_selector, UnifiedSymbol};

type RelationshipKey = (String, String, RelationshipKind);

/// Relationships filed under one selector, unique by (source, target, kind).
///
/// The first relationship seen for a key is kept; later ones with the same
/// key are discarded even when their mixins differ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RelationshipSet {
    edges: Vec<Relationship>,
    keys: HashSet<RelationshipKey>,
}

impl RelationshipSet {
    /// Insert unless an edge with the same key exists. Returns true if added.
    pub(crate) fn insert(&mut self, relationship: Relationship) -> bool {
        let key = (
            relationship.source.clone(),
            relationship.target.clone(),
            relationship.kind.clone(),
        );
        if !self.keys.insert(key) {
            return false;
        }
        self.edges.push(relationship);
        true
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&Relationship) -> bool) {
        let keys = &mut self.keys;
        self.edges.retain(|relationship| {
            let kept = keep(relationship);
            if !kept {
                keys.remove(&(
                    relationship.source.clone(),
                    relationship.target.clone(),
                    relationship.kind.clone(),
                ));
            }
            kept
        });
    }

    pub(crate) fn as_slice(&self) -> &[Relationship] {
        &self.edges
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Every view of one module, keyed by precise identifier and selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedGraph {
    pub(crate) module_name: String,
    pub(crate) module_data: BTreeMap<PathBuf, Module>,
    pub(crate) metadata: BTreeMap<PathBuf, Metadata>,
    pub(crate) symbols: BTreeMap<String, UnifiedSymbol>,
    pub(crate) relationships: BTreeMap<Selector, RelationshipSet>,
    pub(crate) orphan_relationships: Vec<Relationship>,
    pub(crate) overload_diagnostics: Vec<OverloadInconsistency>,
}

impl UnifiedGraph {
    /// Create an empty unified graph for `module_name`.
    pub fn new(module_name: impl Into<String>) -> Self {
        UnifiedGraph {
            module_name: module_name.into(),
            module_data: BTreeMap::new(),
            metadata: BTreeMap::new(),
            symbols: BTreeMap::new(),
            relationships: BTreeMap::new(),
            orphan_relationships: Vec::new(),
            overload_diagnostics: Vec::new(),
        }
    }

    /// Start a unified graph from one single graph.
    pub fn from_single_graph(graph: SymbolGraph, source: &Path) -> Self {
        let mut unified = UnifiedGraph::new(module_name_for(&graph, source).module_name);
        unified.merge_single_graph(graph, source);
        unified
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Module descriptor of every merged graph, keyed by source location.
    pub fn module_data(&self) -> &BTreeMap<PathBuf, Module> {
        &self.module_data
    }

    /// Format metadata of every merged graph, keyed by source location.
    pub fn metadata(&self) -> &BTreeMap<PathBuf, Metadata> {
        &self.metadata
    }

    pub fn symbols(&self) -> &BTreeMap<String, UnifiedSymbol> {
        &self.symbols
    }

    pub fn symbol(&self, id: &str) -> Option<&UnifiedSymbol> {
        self.symbols.get(id)
    }

    /// Relationships per selector, in selector order.
    pub fn relationships(&self) -> impl Iterator<Item = (&Selector, &[Relationship])> {
        self.relationships
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(selector, set)| (selector, set.as_slice()))
    }

    /// Relationships filed under `selector`.
    pub fn relationships_for(&self, selector: &Selector) -> &[Relationship] {
        self.relationships
            .get(selector)
            .map(RelationshipSet::as_slice)
            .unwrap_or_default()
    }

    /// Relationships whose selector could not be determined yet.
    pub fn orphan_relationships(&self) -> &[Relationship] {
        &self.orphan_relationships
    }

    /// Fold a single graph into this one.
    ///
    /// Symbols gain a view under the selector of the incoming graph.
    /// Relationships are filed under the selector of their source in the
    /// incoming graph, else of their target, else under the primary
    /// selectors of an already-known endpoint; otherwise they are orphaned.
    pub fn merge_single_graph(&mut self, graph: SymbolGraph, source: &Path) {
        let is_primary = module_name_for(&graph, source).is_primary;
        let SymbolGraph {
            metadata,
            module,
            symbols,
            relationships,
        } = graph;

        let mut incoming: HashMap<String, Selector> = HashMap::with_capacity(symbols.len());
        for (id, symbol) in symbols {
            incoming.insert(id.clone(), view_selector(&symbol, &module));
            match self.symbols.get_mut(&id) {
                Some(existing) => existing.merge_symbol(symbol, &module, is_primary),
                None => {
                    self.symbols
                        .insert(id, UnifiedSymbol::new(symbol, &module, is_primary));
                }
            }
        }

        let mut orphaned = 0usize;
        for relationship in relationships {
            let selectors = match incoming
                .get(&relationship.source)
                .or_else(|| incoming.get(&relationship.target))
            {
                Some(selector) => vec![selector.clone()],
                None => self.known_endpoint_selectors(&relationship),
            };
            if selectors.is_empty() {
                orphaned += 1;
                self.orphan_relationships.push(relationship);
            } else {
                self.file_relationship(relationship, &selectors);
            }
        }

        debug!(
            module = %self.module_name,
            source = %source.display(),
            is_primary,
            orphaned,
            "merged symbol graph"
        );
        self.module_data.insert(source.to_path_buf(), module);
        self.metadata.insert(source.to_path_buf(), metadata);
    }

    /// Retry selector assignment for every orphan against the current
    /// symbol table. Returns the number of relationships that were filed.
    pub fn collect_orphans(&mut self) -> usize {
        let orphans = std::mem::take(&mut self.orphan_relationships);
        let mut resolved = 0;
        for relationship in orphans {
            let selectors = self.known_endpoint_selectors(&relationship);
            if selectors.is_empty() {
                self.orphan_relationships.push(relationship);
            } else {
                resolved += 1;
                self.file_relationship(relationship, &selectors);
            }
        }
        debug!(
            module = %self.module_name,
            resolved,
            remaining = self.orphan_relationships.len(),
            "collected orphan relationships"
        );
        resolved
    }

    /// Primary selectors of the source if it has any, else of the target.
    fn known_endpoint_selectors(&self, relationship: &Relationship) -> Vec<Selector> {
        [&relationship.source, &relationship.target]
            .into_iter()
            .filter_map(|id| self.symbols.get(id))
            .map(|symbol| {
                symbol
                    .main_graph_selectors
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .find(|selectors| !selectors.is_empty())
            .unwrap_or_default()
    }

    pub(crate) fn file_relationship(&mut self, relationship: Relationship, selectors: &[Selector]) {
        let Some((last, rest)) = selectors.split_last() else {
            return;
        };
        for selector in rest {
            self.relationships
                .entry(selector.clone())
                .or_default()
                .insert(relationship.clone());
        }
        self.relationships
            .entry(last.clone())
            .or_default()
            .insert(relationship);
    }

    /// Drop every filed or orphaned relationship `keep` rejects.
    pub(crate) fn retain_relationships(&mut self, mut keep: impl FnMut(&Relationship) -> bool) {
        for set in self.relationships.values_mut() {
            set.retain(&mut keep);
        }
        self.relationships.retain(|_, set| !set.is_empty());
        self.orphan_relationships.retain(|r| keep(r));
    }

    /// Encode the whole unified graph.
    pub fn encode(&self, registry: &MixinRegistry) -> Result<Value, EncodeError> {
        let module_data = self
            .module_data
            .iter()
            .map(|(source, module)| -> Result<Value, EncodeError> {
                let mut entry = Map::new();
                entry.insert("source".to_string(), source_value(source));
                entry.insert("module".to_string(), serde_json::to_value(module)?);
                Ok(Value::Object(entry))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let metadata = self
            .metadata
            .iter()
            .map(|(source, metadata)| -> Result<Value, EncodeError> {
                let mut entry = Map::new();
                entry.insert("source".to_string(), source_value(source));
                entry.insert("metadata".to_string(), serde_json::to_value(metadata)?);
                Ok(Value::Object(entry))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let symbols = self
            .symbols
            .values()
            .map(|symbol| symbol.encode(registry))
            .collect::<Result<Vec<_>, _>>()?;
        let relationships = self
            .relationships()
            .map(|(selector, edges)| -> Result<Value, EncodeError> {
                let edges = edges
                    .iter()
                    .map(|r| r.encode(registry))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut entry = Map::new();
                entry.insert("selector".to_string(), serde_json::to_value(selector)?);
                entry.insert("relationships".to_string(), Value::Array(edges));
                Ok(Value::Object(entry))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let orphans = self
            .orphan_relationships
            .iter()
            .map(|r| r.encode(registry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut fields = Map::new();
        fields.insert(
            "moduleName".to_string(),
            Value::String(self.module_name.clone()),
        );
        fields.insert("moduleData".to_string(), Value::Array(module_data));
        fields.insert("metadata".to_string(), Value::Array(metadata));
        fields.insert("symbols".to_string(), Value::Array(symbols));
        fields.insert("relationships".to_string(), Value::Array(relationships));
        if !orphans.is_empty() {
            fields.insert("orphanRelationships".to_string(), Value::Array(orphans));
        }
        Ok(Value::Object(fields))
    }
}

fn source_value(source: &Path) -> Value {
    Value::String(source.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Names, Platform, SemanticVersion, Symbol, SymbolKind};

    fn graph(os: &str, ids: &[&str], edges: &[(&str, &str)]) -> SymbolGraph {
        let mut graph = SymbolGraph::new(
            Metadata::new(SemanticVersion::new(0, 6, 0), "test"),
            Module::new("M", Platform::with_os(os)),
        );
        for id in ids {
            graph.insert_symbol(Symbol::new(
                *id,
                "swift",
                SymbolKind::new("swift.struct", "Structure"),
                vec![id.to_string()],
                Names::titled(*id),
            ));
        }
        for (source, target) in edges {
            graph.add_relationship(Relationship::new(
                *source,
                *target,
                RelationshipKind::MEMBER_OF,
            ));
        }
        graph
    }

    fn mac() -> Selector {
        Selector::with_platform("swift", "macOS")
    }

    mod relationship_set {
        use super::*;

        #[test]
        fn first_seen_wins() {
            let mut set = RelationshipSet::default();
            let first = Relationship::new("a", "b", RelationshipKind::MEMBER_OF);
            let mut second = first.clone();
            second.target_fallback = Some("B".to_string());
            assert!(set.insert(first));
            assert!(!set.insert(second));
            assert_eq!(set.as_slice().len(), 1);
            assert!(set.as_slice()[0].target_fallback.is_none());
        }

        #[test]
        fn retain_forgets_keys() {
            let mut set = RelationshipSet::default();
            let edge = Relationship::new("a", "b", RelationshipKind::MEMBER_OF);
            set.insert(edge.clone());
            set.retain(|_| false);
            assert!(set.is_empty());
            assert!(set.insert(edge));
        }
    }

    mod merge {
        use super::*;

        #[test]
        fn files_relationship_under_source_selector() {
            let unified = UnifiedGraph::from_single_graph(
                graph("macosx", &["a", "b"], &[("a", "b")]),
                Path::new("M.symbols.json"),
            );
            assert_eq!(unified.module_name(), "M");
            assert_eq!(unified.relationships_for(&mac()).len(), 1);
            assert!(unified.orphan_relationships().is_empty());
        }

        #[test]
        fn unknown_endpoints_become_orphans() {
            let unified = UnifiedGraph::from_single_graph(
                graph("macosx", &[], &[("x", "y")]),
                Path::new("M.symbols.json"),
            );
            assert_eq!(unified.orphan_relationships().len(), 1);
            assert_eq!(unified.relationships().count(), 0);
        }

        #[test]
        fn known_endpoint_uses_primary_selectors() {
            let mut unified = UnifiedGraph::from_single_graph(
                graph("macosx", &["a"], &[]),
                Path::new("M.symbols.json"),
            );
            unified.merge_single_graph(graph("ios", &[], &[("a", "z")]), Path::new("ios/M.symbols.json"));
            assert_eq!(unified.relationships_for(&mac()).len(), 1);
            assert!(unified
                .relationships_for(&Selector::with_platform("swift", "iOS"))
                .is_empty());
        }

        #[test]
        fn records_provenance_per_source() {
            let mut unified = UnifiedGraph::new("M");
            unified.merge_single_graph(graph("macosx", &["a"], &[]), Path::new("mac/M.symbols.json"));
            unified.merge_single_graph(graph("ios", &["a"], &[]), Path::new("ios/M.symbols.json"));
            assert_eq!(unified.module_data().len(), 2);
            assert_eq!(unified.metadata().len(), 2);
            assert_eq!(unified.symbol("a").map(|s| s.selectors().count()), Some(2));
        }
    }

    #[test]
    fn collect_orphans_resolves_late_endpoints() {
        let mut unified = UnifiedGraph::new("M");
        unified.merge_single_graph(graph("macosx", &[], &[("a", "b")]), Path::new("edges.symbols.json"));
        assert_eq!(unified.collect_orphans(), 0);
        unified.merge_single_graph(graph("macosx", &["a"], &[]), Path::new("M.symbols.json"));
        assert_eq!(unified.collect_orphans(), 1);
        assert!(unified.orphan_relationships().is_empty());
        assert_eq!(unified.relationships_for(&mac()).len(), 1);
    }

    #[test]
    fn encode_lists_sources_and_orphans() {
        let unified = UnifiedGraph::from_single_graph(
            graph("macosx", &["a"], &[("a", "b"), ("x", "y")]),
            Path::new("M.symbols.json"),
        );
        let encoded = unified.encode(&MixinRegistry::new()).unwrap();
        assert_eq!(encoded["moduleName"], "M");
        assert_eq!(encoded["moduleData"][0]["source"], "M.symbols.json");
        assert_eq!(encoded["metadata"][0]["metadata"]["formatVersion"], "0.6.0");
        assert_eq!(encoded["symbols"].as_array().map(Vec::len), Some(1));
        assert_eq!(encoded["relationships"][0]["selector"]["platform"], "macOS");
        assert_eq!(encoded["orphanRelationships"][0]["source"], "x");
    }
}
