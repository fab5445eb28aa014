//! Symbols and relationships of a single graph.
//!
//! Both record types carry a [`MixinMap`] of extension payloads. Their wire
//! form is a flat JSON object: the core fields plus one top-level key per
//! mixin. Encoding and decoding therefore go through [`MixinRegistry`]
//! instead of plain `serde` derives.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError};
use crate::mixin::{MixinMap, MixinRegistry, MixinTarget};

use super::mixins::DeclarationFragments;

// ============================================================================
// Fragments
// ============================================================================

/// Kind of a declaration fragment (open set; unknown kinds round-trip).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentKind(Cow<'static, str>);

impl FragmentKind {
    pub const KEYWORD: FragmentKind = FragmentKind(Cow::Borrowed("keyword"));
    pub const ATTRIBUTE: FragmentKind = FragmentKind(Cow::Borrowed("attribute"));
    pub const IDENTIFIER: FragmentKind = FragmentKind(Cow::Borrowed("identifier"));
    pub const TYPE_IDENTIFIER: FragmentKind = FragmentKind(Cow::Borrowed("typeIdentifier"));
    pub const GENERIC_PARAMETER: FragmentKind = FragmentKind(Cow::Borrowed("genericParameter"));
    pub const EXTERNAL_PARAM: FragmentKind = FragmentKind(Cow::Borrowed("externalParam"));
    pub const INTERNAL_PARAM: FragmentKind = FragmentKind(Cow::Borrowed("internalParam"));
    pub const TEXT: FragmentKind = FragmentKind(Cow::Borrowed("text"));

    /// Create a fragment kind from any spelling.
    pub fn new(kind: impl Into<String>) -> Self {
        FragmentKind(Cow::Owned(kind.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One token of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub kind: FragmentKind,
    pub spelling: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precise_identifier: Option<String>,
}

impl Fragment {
    pub fn new(kind: FragmentKind, spelling: impl Into<String>) -> Self {
        Fragment {
            kind,
            spelling: spelling.into(),
            precise_identifier: None,
        }
    }

    pub fn keyword(spelling: impl Into<String>) -> Self {
        Fragment::new(FragmentKind::KEYWORD, spelling)
    }

    pub fn identifier(spelling: impl Into<String>) -> Self {
        Fragment::new(FragmentKind::IDENTIFIER, spelling)
    }

    pub fn text(spelling: impl Into<String>) -> Self {
        Fragment::new(FragmentKind::TEXT, spelling)
    }
}

// ============================================================================
// Symbol Fields
// ============================================================================

/// Precise identifier plus the interface language it was emitted for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolIdentifier {
    pub precise: String,
    pub interface_language: String,
}

/// Normalized declaration kind identifier.
///
/// Producers write kinds with a language prefix (`swift.func`). Known kinds
/// are stored without it; unknown kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindIdentifier(String);

/// Kind identifiers recognized after stripping a language prefix.
const KNOWN_KINDS: &[&str] = &[
    "associatedtype",
    "class",
    "deinit",
    "enum",
    "enum.case",
    "extension",
    "func",
    "func.op",
    "init",
    "ivar",
    "macro",
    "method",
    "module",
    "property",
    "protocol",
    "snippet",
    "snippetGroup",
    "struct",
    "subscript",
    "type.method",
    "type.property",
    "type.subscript",
    "typealias",
    "union",
    "var",
];

/// Kinds whose declarations can collide on path and still be distinct.
const OVERLOADABLE_KINDS: &[&str] = &[
    "func",
    "func.op",
    "init",
    "macro",
    "method",
    "subscript",
    "type.method",
    "type.subscript",
];

impl KindIdentifier {
    /// Parse a raw identifier, stripping a language prefix from known kinds.
    pub fn parse(raw: &str) -> Self {
        if KNOWN_KINDS.contains(&raw) {
            return KindIdentifier(raw.to_string());
        }
        if let Some((_, rest)) = raw.split_once('.') {
            if KNOWN_KINDS.contains(&rest) {
                return KindIdentifier(rest.to_string());
            }
        }
        KindIdentifier(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this kind was recognized (and therefore stored unprefixed).
    pub fn is_known(&self) -> bool {
        KNOWN_KINDS.contains(&self.0.as_str())
    }

    /// True if declarations of this kind participate in overload groups.
    pub fn is_overloadable(&self) -> bool {
        OVERLOADABLE_KINDS.contains(&self.0.as_str())
    }

    /// Wire spelling for a language: `swift.func` for known kinds.
    pub fn identifier_for_language(&self, language: &str) -> String {
        if self.is_known() {
            format!("{}.{}", language, self.0)
        } else {
            self.0.clone()
        }
    }
}

impl fmt::Display for KindIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declaration kind with its human-readable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolKind {
    pub identifier: KindIdentifier,
    pub display_name: String,
}

impl SymbolKind {
    pub fn new(identifier: &str, display_name: impl Into<String>) -> Self {
        SymbolKind {
            identifier: KindIdentifier::parse(identifier),
            display_name: display_name.into(),
        }
    }
}

/// Human-readable names of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Names {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigator: Option<Vec<Fragment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_heading: Option<Vec<Fragment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prose: Option<String>,
}

impl Names {
    pub fn titled(title: impl Into<String>) -> Self {
        Names {
            title: title.into(),
            navigator: None,
            sub_heading: None,
            prose: None,
        }
    }
}

/// Zero-based line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// Half-open source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

/// One line of a documentation comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocLine {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
}

/// Documentation text block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocComment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub lines: Vec<DocLine>,
}

/// Access level (open string: `public`, `open`, `internal`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(pub String);

impl AccessLevel {
    pub fn public() -> Self {
        AccessLevel("public".to_string())
    }
}

// ============================================================================
// Symbol
// ============================================================================

/// A declaration in a single-language, single-platform graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub identifier: SymbolIdentifier,
    pub kind: SymbolKind,
    pub path_components: Vec<String>,
    pub names: Names,
    /// Precise identifier of the symbol's type, when the producer emits one.
    pub type_ref: Option<String>,
    pub doc_comment: Option<DocComment>,
    pub access_level: AccessLevel,
    pub mixins: MixinMap,
}

/// Core symbol fields; every other top-level key is a mixin candidate.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSymbol {
    identifier: SymbolIdentifier,
    kind: RawKind,
    path_components: Vec<String>,
    names: Names,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    type_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doc_comment: Option<DocComment>,
    access_level: AccessLevel,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawKind {
    identifier: String,
    display_name: String,
}

impl Symbol {
    /// Create a symbol with empty mixins and no documentation.
    pub fn new(
        precise: impl Into<String>,
        interface_language: impl Into<String>,
        kind: SymbolKind,
        path_components: Vec<String>,
        names: Names,
    ) -> Self {
        Symbol {
            identifier: SymbolIdentifier {
                precise: precise.into(),
                interface_language: interface_language.into(),
            },
            kind,
            path_components,
            names,
            type_ref: None,
            doc_comment: None,
            access_level: AccessLevel::public(),
            mixins: MixinMap::new(),
        }
    }

    /// Precise identifier.
    pub fn precise(&self) -> &str {
        &self.identifier.precise
    }

    /// Declaration fragments, if the symbol carries them.
    pub fn declaration_fragments(&self) -> Option<&DeclarationFragments> {
        self.mixins.get_as::<DeclarationFragments>()
    }

    /// True if the declaration contains an `async` keyword token.
    pub fn is_async(&self) -> bool {
        self.declaration_fragments().is_some_and(|decl| {
            decl.0
                .iter()
                .any(|f| f.kind == FragmentKind::KEYWORD && f.spelling == "async")
        })
    }

    /// Decode a symbol record.
    pub fn decode(value: Value, registry: &MixinRegistry) -> Result<Self, DecodeError> {
        if !value.is_object() {
            return Err(DecodeError::NotAnObject { record: "symbol" });
        }
        let raw: RawSymbol = serde_json::from_value(value)?;
        let mixins = registry.decode_mixins(MixinTarget::Symbol, raw.rest)?;
        Ok(Symbol {
            identifier: raw.identifier,
            kind: SymbolKind {
                identifier: KindIdentifier::parse(&raw.kind.identifier),
                display_name: raw.kind.display_name,
            },
            path_components: raw.path_components,
            names: raw.names,
            type_ref: raw.type_ref,
            doc_comment: raw.doc_comment,
            access_level: raw.access_level,
            mixins,
        })
    }

    /// Encode a symbol record.
    pub fn encode(&self, registry: &MixinRegistry) -> Result<Value, EncodeError> {
        let raw = RawSymbol {
            identifier: self.identifier.clone(),
            kind: RawKind {
                identifier: self
                    .kind
                    .identifier
                    .identifier_for_language(&self.identifier.interface_language),
                display_name: self.kind.display_name.clone(),
            },
            path_components: self.path_components.clone(),
            names: self.names.clone(),
            type_ref: self.type_ref.clone(),
            doc_comment: self.doc_comment.clone(),
            access_level: self.access_level.clone(),
            rest: registry.encode_mixins(MixinTarget::Symbol, &self.mixins)?,
        };
        Ok(serde_json::to_value(raw)?)
    }
}

// ============================================================================
// Relationship
// ============================================================================

/// Kind of a relationship edge (open string enumeration).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipKind(Cow<'static, str>);

impl RelationshipKind {
    pub const MEMBER_OF: RelationshipKind = RelationshipKind(Cow::Borrowed("memberOf"));
    pub const CONFORMS_TO: RelationshipKind = RelationshipKind(Cow::Borrowed("conformsTo"));
    pub const INHERITS_FROM: RelationshipKind = RelationshipKind(Cow::Borrowed("inheritsFrom"));
    pub const OVERRIDES: RelationshipKind = RelationshipKind(Cow::Borrowed("overrides"));
    pub const REQUIREMENT_OF: RelationshipKind = RelationshipKind(Cow::Borrowed("requirementOf"));
    pub const OPTIONAL_REQUIREMENT_OF: RelationshipKind =
        RelationshipKind(Cow::Borrowed("optionalRequirementOf"));
    pub const DEFAULT_IMPLEMENTATION_OF: RelationshipKind =
        RelationshipKind(Cow::Borrowed("defaultImplementationOf"));
    pub const EXTENSION_TO: RelationshipKind = RelationshipKind(Cow::Borrowed("extensionTo"));
    pub const OVERLOAD_OF: RelationshipKind = RelationshipKind(Cow::Borrowed("overloadOf"));
    pub const REFERENCES: RelationshipKind = RelationshipKind(Cow::Borrowed("references"));

    pub fn new(kind: impl Into<String>) -> Self {
        RelationshipKind(Cow::Owned(kind.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A directed edge between two precise identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub kind: RelationshipKind,
    /// Display name for a target outside the graph.
    pub target_fallback: Option<String>,
    pub mixins: MixinMap,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRelationship {
    source: String,
    target: String,
    kind: RelationshipKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_fallback: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl Relationship {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: RelationshipKind) -> Self {
        Relationship {
            source: source.into(),
            target: target.into(),
            kind,
            target_fallback: None,
            mixins: MixinMap::new(),
        }
    }

    /// Decode a relationship record.
    pub fn decode(value: Value, registry: &MixinRegistry) -> Result<Self, DecodeError> {
        if !value.is_object() {
            return Err(DecodeError::NotAnObject {
                record: "relationship",
            });
        }
        let raw: RawRelationship = serde_json::from_value(value)?;
        let mixins = registry.decode_mixins(MixinTarget::Relationship, raw.rest)?;
        Ok(Relationship {
            source: raw.source,
            target: raw.target,
            kind: raw.kind,
            target_fallback: raw.target_fallback,
            mixins,
        })
    }

    /// Encode a relationship record.
    pub fn encode(&self, registry: &MixinRegistry) -> Result<Value, EncodeError> {
        let raw = RawRelationship {
            source: self.source.clone(),
            target: self.target.clone(),
            kind: self.kind.clone(),
            target_fallback: self.target_fallback.clone(),
            rest: registry.encode_mixins(MixinTarget::Relationship, &self.mixins)?,
        };
        Ok(serde_json::to_value(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn symbol_json() -> Value {
        json!({
            "identifier": {"precise": "s:1M1fyyF", "interfaceLanguage": "swift"},
            "kind": {"identifier": "swift.func", "displayName": "Function"},
            "pathComponents": ["f()"],
            "names": {"title": "f()"},
            "accessLevel": "public",
            "declarationFragments": [
                {"kind": "keyword", "spelling": "func"},
                {"kind": "text", "spelling": " "},
                {"kind": "identifier", "spelling": "f"},
                {"kind": "text", "spelling": "()"}
            ],
            "somebodyElsesMixin": {"x": 1}
        })
    }

    mod kind_identifier {
        use super::*;

        #[test]
        fn strips_language_prefix_from_known_kinds() {
            assert_eq!(KindIdentifier::parse("swift.func").as_str(), "func");
            assert_eq!(KindIdentifier::parse("swift.type.method").as_str(), "type.method");
            assert_eq!(KindIdentifier::parse("type.method").as_str(), "type.method");
        }

        #[test]
        fn keeps_unknown_kinds_verbatim() {
            let kind = KindIdentifier::parse("custom.widget");
            assert_eq!(kind.as_str(), "custom.widget");
            assert!(!kind.is_known());
            assert_eq!(kind.identifier_for_language("swift"), "custom.widget");
        }

        #[test]
        fn overloadable_set() {
            assert!(KindIdentifier::parse("swift.method").is_overloadable());
            assert!(KindIdentifier::parse("swift.init").is_overloadable());
            assert!(!KindIdentifier::parse("swift.struct").is_overloadable());
            assert!(!KindIdentifier::parse("swift.property").is_overloadable());
        }
    }

    mod symbol_codec {
        use super::*;

        #[test]
        fn decodes_known_mixins_and_drops_unknown() {
            let registry = MixinRegistry::new();
            let symbol = Symbol::decode(symbol_json(), &registry).unwrap();
            assert_eq!(symbol.precise(), "s:1M1fyyF");
            assert_eq!(symbol.kind.identifier.as_str(), "func");
            assert_eq!(symbol.mixins.len(), 1);
            assert!(symbol.declaration_fragments().is_some());
            assert!(!symbol.mixins.contains_key("somebodyElsesMixin"));
        }

        #[test]
        fn encode_restores_prefixed_kind() {
            let registry = MixinRegistry::new();
            let symbol = Symbol::decode(symbol_json(), &registry).unwrap();
            let encoded = symbol.encode(&registry).unwrap();
            assert_eq!(encoded["kind"]["identifier"], "swift.func");
            assert!(encoded.get("declarationFragments").is_some());
            assert!(encoded.get("somebodyElsesMixin").is_none());
            assert_eq!(Symbol::decode(encoded, &registry).unwrap(), symbol);
        }

        #[test]
        fn missing_field_is_an_error() {
            let mut value = symbol_json();
            value.as_object_mut().unwrap().remove("names");
            let err = Symbol::decode(value, &MixinRegistry::new()).unwrap_err();
            assert!(matches!(err, DecodeError::Json(_)));
        }

        #[test]
        fn non_object_is_an_error() {
            let err = Symbol::decode(json!([1, 2]), &MixinRegistry::new()).unwrap_err();
            assert!(matches!(err, DecodeError::NotAnObject { record: "symbol" }));
        }

        #[test]
        fn detects_async_keyword() {
            let registry = MixinRegistry::new();
            let mut value = symbol_json();
            value["declarationFragments"] = json!([
                {"kind": "keyword", "spelling": "func"},
                {"kind": "keyword", "spelling": "async"}
            ]);
            assert!(Symbol::decode(value, &registry).unwrap().is_async());
            assert!(!Symbol::decode(symbol_json(), &registry).unwrap().is_async());
        }
    }

    mod relationship_codec {
        use super::*;

        #[test]
        fn roundtrips_with_source_origin() {
            let registry = MixinRegistry::new();
            let value = json!({
                "source": "a",
                "target": "b",
                "kind": "defaultImplementationOf",
                "targetFallback": "B",
                "sourceOrigin": {"identifier": "c", "displayName": "C.c()"}
            });
            let rel = Relationship::decode(value, &registry).unwrap();
            assert_eq!(rel.kind, RelationshipKind::DEFAULT_IMPLEMENTATION_OF);
            assert_eq!(rel.mixins.len(), 1);
            let encoded = rel.encode(&registry).unwrap();
            assert_eq!(Relationship::decode(encoded, &registry).unwrap(), rel);
        }

        #[test]
        fn symbol_only_mixins_are_not_relationship_mixins() {
            let registry = MixinRegistry::new();
            let value = json!({
                "source": "a",
                "target": "b",
                "kind": "memberOf",
                "spi": true
            });
            let rel = Relationship::decode(value, &registry).unwrap();
            assert!(rel.mixins.is_empty());
        }

        #[test]
        fn unknown_kind_is_preserved() {
            let rel = Relationship::decode(
                json!({"source": "a", "target": "b", "kind": "customEdge"}),
                &MixinRegistry::new(),
            )
            .unwrap();
            assert_eq!(rel.kind.as_str(), "customEdge");
        }
    }
}
