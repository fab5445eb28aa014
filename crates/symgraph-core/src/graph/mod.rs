//! Single symbol graph: one module as seen from one language on one platform.
//!
//! This is the boundary model fed into the collector. It knows how to decode
//! and encode itself but has no merge semantics of its own.
//!
//! # Wire Format
//!
//! ```text
//! {
//!   "metadata":      { "formatVersion": "0.6.0", "generator": "..." },
//!   "module":        { "name": "M", "platform": { ... } },
//!   "symbols":       [ { "identifier": ..., "kind": ..., ... }, ... ],
//!   "relationships": [ { "source": ..., "target": ..., "kind": ... }, ... ]
//! }
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError};
use crate::mixin::MixinRegistry;

mod metadata;
pub mod mixins;
mod symbol;

pub use metadata::{Metadata, Module, OperatingSystem, Platform, SemanticVersion};
pub use symbol::{
    AccessLevel, DocComment, DocLine, Fragment, FragmentKind, KindIdentifier, Names, Position,
    Relationship, RelationshipKind, SourceRange, Symbol, SymbolIdentifier, SymbolKind,
};

/// File name suffix of symbol graph files.
pub const SYMBOL_GRAPH_SUFFIX: &str = ".symbols.json";

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// One decoded symbol graph file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolGraph {
    pub metadata: Metadata,
    pub module: Module,
    /// Symbols keyed by precise identifier.
    pub symbols: BTreeMap<String, Symbol>,
    pub relationships: Vec<Relationship>,
}

impl SymbolGraph {
    /// Create an empty graph.
    pub fn new(metadata: Metadata, module: Module) -> Self {
        SymbolGraph {
            metadata,
            module,
            symbols: BTreeMap::new(),
            relationships: Vec::new(),
        }
    }

    /// Insert a symbol, resolving an identifier clash deterministically.
    ///
    /// An `async` declaration beats a non-`async` one; otherwise the longer
    /// title wins. On a full tie the symbol already present is kept.
    pub fn insert_symbol(&mut self, symbol: Symbol) {
        match self.symbols.get(symbol.precise()) {
            Some(existing) if !supersedes(&symbol, existing) => {}
            _ => {
                self.symbols.insert(symbol.precise().to_string(), symbol);
            }
        }
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Decode a graph from a parsed JSON value.
    pub fn decode(value: Value, registry: &MixinRegistry) -> Result<Self, DecodeError> {
        let Value::Object(mut fields) = value else {
            return Err(DecodeError::NotAnObject {
                record: "symbol graph",
            });
        };

        let metadata = Metadata::decode(take_field(&mut fields, "metadata")?)?;
        let module: Module = serde_json::from_value(take_field(&mut fields, "module")?)?;
        let symbols: Vec<Value> = serde_json::from_value(take_field(&mut fields, "symbols")?)?;
        let relationships: Vec<Value> =
            serde_json::from_value(take_field(&mut fields, "relationships")?)?;

        let mut graph = SymbolGraph::new(metadata, module);
        for (index, value) in symbols.into_iter().enumerate() {
            let symbol = Symbol::decode(value, registry).map_err(|e| DecodeError::InvalidSymbol {
                index,
                source: Box::new(e),
            })?;
            graph.insert_symbol(symbol);
        }
        for (index, value) in relationships.into_iter().enumerate() {
            let relationship = Relationship::decode(value, registry).map_err(|e| {
                DecodeError::InvalidRelationship {
                    index,
                    source: Box::new(e),
                }
            })?;
            graph.relationships.push(relationship);
        }
        Ok(graph)
    }

    /// Parse and decode a graph from JSON text.
    pub fn from_json_str(json: &str, registry: &MixinRegistry) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(json)?;
        SymbolGraph::decode(value, registry)
    }

    /// Encode the graph. Symbols are written in identifier order.
    pub fn encode(&self, registry: &MixinRegistry) -> Result<Value, EncodeError> {
        let symbols = self
            .symbols
            .values()
            .map(|symbol| symbol.encode(registry))
            .collect::<Result<Vec<_>, _>>()?;
        let relationships = self
            .relationships
            .iter()
            .map(|relationship| relationship.encode(registry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut fields = Map::new();
        fields.insert("metadata".to_string(), serde_json::to_value(&self.metadata)?);
        fields.insert("module".to_string(), serde_json::to_value(&self.module)?);
        fields.insert("symbols".to_string(), Value::Array(symbols));
        fields.insert("relationships".to_string(), Value::Array(relationships));
        Ok(Value::Object(fields))
    }
}

fn take_field(fields: &mut Map<String, Value>, field: &'static str) -> Result<Value, DecodeError> {
    fields
        .remove(field)
        .ok_or(DecodeError::MissingField { field })
}

fn supersedes(candidate: &Symbol, existing: &Symbol) -> bool {
    match (candidate.is_async(), existing.is_async()) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.names.title.len() > existing.names.title.len(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph_json(symbols: Value) -> Value {
        json!({
            "metadata": {"formatVersion": {"major": 0, "minor": 6, "patch": 0}, "generator": "test"},
            "module": {"name": "M", "platform": {"operatingSystem": {"name": "macosx"}}},
            "symbols": symbols,
            "relationships": [
                {"source": "s:1M1fyyF", "target": "s:1M1SV", "kind": "memberOf"}
            ]
        })
    }

    fn symbol(id: &str, title: &str, fragments: Value) -> Value {
        json!({
            "identifier": {"precise": id, "interfaceLanguage": "swift"},
            "kind": {"identifier": "swift.func", "displayName": "Function"},
            "pathComponents": ["f()"],
            "names": {"title": title},
            "accessLevel": "public",
            "declarationFragments": fragments
        })
    }

    mod decode {
        use super::*;

        #[test]
        fn decodes_all_sections() {
            let value = graph_json(json!([symbol("s:1M1fyyF", "f()", json!([]))]));
            let graph = SymbolGraph::decode(value, &MixinRegistry::new()).unwrap();
            assert_eq!(graph.module.name, "M");
            assert_eq!(graph.module.platform.name().as_deref(), Some("macOS"));
            assert_eq!(graph.metadata.format_version, SemanticVersion::new(0, 6, 0));
            assert_eq!(graph.symbols.len(), 1);
            assert_eq!(graph.relationships.len(), 1);
            assert_eq!(graph.relationships[0].kind, RelationshipKind::MEMBER_OF);
        }

        #[test]
        fn missing_section_is_reported() {
            let mut value = graph_json(json!([]));
            value.as_object_mut().unwrap().remove("relationships");
            let err = SymbolGraph::decode(value, &MixinRegistry::new()).unwrap_err();
            assert!(matches!(
                err,
                DecodeError::MissingField {
                    field: "relationships"
                }
            ));
        }

        #[test]
        fn bad_symbol_reports_index() {
            let value = graph_json(json!([
                symbol("a", "a()", json!([])),
                {"identifier": {"precise": "b", "interfaceLanguage": "swift"}}
            ]));
            let err = SymbolGraph::decode(value, &MixinRegistry::new()).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidSymbol { index: 1, .. }));
        }

        #[test]
        fn bad_format_version_is_typed() {
            let mut value = graph_json(json!([]));
            value["metadata"]["formatVersion"] = json!("not.a.version");
            let err = SymbolGraph::decode(value, &MixinRegistry::new()).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidVersion(_)));
        }

        #[test]
        fn rejects_non_object() {
            let err = SymbolGraph::from_json_str("[]", &MixinRegistry::new()).unwrap_err();
            assert!(matches!(err, DecodeError::NotAnObject { .. }));
        }
    }

    mod duplicates {
        use super::*;

        #[test]
        fn async_declaration_wins() {
            let value = graph_json(json!([
                symbol("x", "a much longer title", json!([{"kind": "keyword", "spelling": "func"}])),
                symbol("x", "f()", json!([
                    {"kind": "keyword", "spelling": "func"},
                    {"kind": "keyword", "spelling": "async"}
                ])),
            ]));
            let graph = SymbolGraph::decode(value, &MixinRegistry::new()).unwrap();
            assert_eq!(graph.symbols["x"].names.title, "f()");
        }

        #[test]
        fn longer_title_wins_otherwise() {
            for order in [["f()", "f(x:)"], ["f(x:)", "f()"]] {
                let value = graph_json(json!([
                    symbol("x", order[0], json!([])),
                    symbol("x", order[1], json!([])),
                ]));
                let graph = SymbolGraph::decode(value, &MixinRegistry::new()).unwrap();
                assert_eq!(graph.symbols["x"].names.title, "f(x:)");
            }
        }
    }

    #[test]
    fn roundtrip_preserves_equality() {
        let registry = MixinRegistry::new();
        let value = graph_json(json!([
            symbol("a", "a()", json!([{"kind": "identifier", "spelling": "a"}])),
            symbol("b", "b()", json!([{"kind": "identifier", "spelling": "b"}])),
        ]));
        let graph = SymbolGraph::decode(value, &registry).unwrap();
        let encoded = graph.encode(&registry).unwrap();
        assert_eq!(encoded["metadata"]["formatVersion"], "0.6.0");
        assert_eq!(SymbolGraph::decode(encoded, &registry).unwrap(), graph);
    }
}
