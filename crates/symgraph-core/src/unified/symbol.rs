//! A symbol seen from every language/platform view that declares it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::EncodeError;
use crate::graph::mixins::{
    argument_label, DeclarationFragments, FunctionParameter, FunctionSignature, OverloadData,
};
use crate::graph::{
    AccessLevel, DocComment, Fragment, FragmentKind, Module, Names, Symbol, SymbolKind,
};
use crate::mixin::{MixinKind, MixinMap, MixinRegistry, MixinTarget};
use crate::selector::Selector;

/// Selector of the view `symbol` contributes when read from a graph for `module`.
pub(crate) fn view_selector(symbol: &Symbol, module: &Module) -> Selector {
    Selector::new(
        symbol.identifier.interface_language.clone(),
        module.platform.name(),
    )
}

/// One logical symbol with per-selector attributes.
///
/// Every per-selector map is keyed by the view that contributed the value.
/// `main_graph_selectors` records which of those views came from a primary
/// graph of the module rather than from an extension graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedSymbol {
    pub unique_identifier: String,
    pub main_graph_selectors: BTreeSet<Selector>,
    pub modules: BTreeMap<Selector, Module>,
    pub kind: BTreeMap<Selector, SymbolKind>,
    pub path_components: BTreeMap<Selector, Vec<String>>,
    pub names: BTreeMap<Selector, Names>,
    pub doc_comment: BTreeMap<Selector, DocComment>,
    pub access_level: BTreeMap<Selector, AccessLevel>,
    pub mixins: BTreeMap<Selector, MixinMap>,
    /// Computed facts that span all views (overload group membership).
    pub unified_mixins: MixinMap,
}

impl UnifiedSymbol {
    /// Start a unified symbol from its first view.
    pub fn new(symbol: Symbol, module: &Module, is_primary: bool) -> Self {
        let mut unified = UnifiedSymbol {
            unique_identifier: symbol.identifier.precise.clone(),
            main_graph_selectors: BTreeSet::new(),
            modules: BTreeMap::new(),
            kind: BTreeMap::new(),
            path_components: BTreeMap::new(),
            names: BTreeMap::new(),
            doc_comment: BTreeMap::new(),
            access_level: BTreeMap::new(),
            mixins: BTreeMap::new(),
            unified_mixins: MixinMap::new(),
        };
        unified.merge_symbol(symbol, module, is_primary);
        unified
    }

    /// Add or replace the view `symbol` contributes.
    ///
    /// Views under other selectors are left untouched.
    pub fn merge_symbol(&mut self, symbol: Symbol, module: &Module, is_primary: bool) {
        let selector = view_selector(&symbol, module);
        if is_primary {
            self.main_graph_selectors.insert(selector.clone());
        }

        self.modules.insert(selector.clone(), module.clone());
        self.kind.insert(selector.clone(), symbol.kind);
        self.path_components
            .insert(selector.clone(), symbol.path_components);
        self.names.insert(selector.clone(), symbol.names);
        if let Some(doc_comment) = symbol.doc_comment {
            self.doc_comment.insert(selector.clone(), doc_comment);
        }
        self.access_level.insert(selector.clone(), symbol.access_level);
        self.mixins.insert(selector, symbol.mixins);
    }

    /// Every selector this symbol has a view for.
    pub fn selectors(&self) -> impl Iterator<Item = &Selector> {
        self.kind.keys()
    }

    /// Interface languages this symbol has views in.
    pub fn languages(&self) -> BTreeSet<&str> {
        self.selectors()
            .map(|selector| selector.interface_language.as_str())
            .collect()
    }

    pub fn selectors_for_language(&self, language: &str) -> Vec<Selector> {
        self.selectors()
            .filter(|selector| selector.is_language(language))
            .cloned()
            .collect()
    }

    /// Primary selectors in `language`, or all of its selectors in that
    /// language when none is primary.
    pub fn primary_selectors_for_language(&self, language: &str) -> Vec<Selector> {
        let primary: Vec<Selector> = self
            .main_graph_selectors
            .iter()
            .filter(|selector| selector.is_language(language))
            .cloned()
            .collect();
        if primary.is_empty() {
            self.selectors_for_language(language)
        } else {
            primary
        }
    }

    /// Concatenated declaration spelling of the first view in `language`
    /// that carries declaration fragments.
    pub fn declaration_spelling(&self, language: &str) -> Option<String> {
        self.mixins
            .iter()
            .filter(|(selector, _)| selector.is_language(language))
            .find_map(|(_, mixins)| mixins.get_as::<DeclarationFragments>())
            .map(DeclarationFragments::spelling)
    }

    pub fn overload_data(&self) -> Option<&OverloadData> {
        self.unified_mixins.get_as::<OverloadData>()
    }

    /// Record overload membership on the unified mixins and on any view that
    /// already carried producer-computed overload data.
    pub(crate) fn set_overload_data(&mut self, data: OverloadData) {
        for mixins in self.mixins.values_mut() {
            if mixins.contains_key(OverloadData::KEY) {
                mixins.insert(data.clone());
            }
        }
        self.unified_mixins.insert(data);
    }

    /// Clone the views in `language` as the seed of an overload group.
    ///
    /// The clone drops any overload membership of its own and gets a
    /// simplified sub-heading per view.
    pub(crate) fn overload_group(&self, language: &str, group_id: &str) -> UnifiedSymbol {
        fn restrict<T: Clone>(map: &BTreeMap<Selector, T>, language: &str) -> BTreeMap<Selector, T> {
            map.iter()
                .filter(|(selector, _)| selector.is_language(language))
                .map(|(selector, value)| (selector.clone(), value.clone()))
                .collect()
        }

        let mut group = UnifiedSymbol {
            unique_identifier: group_id.to_string(),
            main_graph_selectors: self
                .main_graph_selectors
                .iter()
                .filter(|selector| selector.is_language(language))
                .cloned()
                .collect(),
            modules: restrict(&self.modules, language),
            kind: restrict(&self.kind, language),
            path_components: restrict(&self.path_components, language),
            names: restrict(&self.names, language),
            doc_comment: restrict(&self.doc_comment, language),
            access_level: restrict(&self.access_level, language),
            mixins: restrict(&self.mixins, language),
            unified_mixins: MixinMap::new(),
        };

        for mixins in group.mixins.values_mut() {
            mixins.remove(OverloadData::KEY);
        }
        for (selector, names) in group.names.iter_mut() {
            if let Some(sub_heading) = group.mixins.get(selector).and_then(overload_sub_heading) {
                names.sub_heading = Some(sub_heading);
            }
        }
        group
    }

    /// Take over every per-selector view of `other`, replacing views this
    /// symbol already has under the same selector.
    pub(crate) fn absorb_views(&mut self, other: UnifiedSymbol) {
        self.main_graph_selectors.extend(other.main_graph_selectors);
        self.modules.extend(other.modules);
        self.kind.extend(other.kind);
        self.path_components.extend(other.path_components);
        self.names.extend(other.names);
        self.doc_comment.extend(other.doc_comment);
        self.access_level.extend(other.access_level);
        self.mixins.extend(other.mixins);
    }

    /// Encode with every attribute as a list of `{selector, value}` pairs.
    pub fn encode(&self, registry: &MixinRegistry) -> Result<Value, EncodeError> {
        let mut fields = Map::new();
        fields.insert(
            "uniqueIdentifier".to_string(),
            Value::String(self.unique_identifier.clone()),
        );
        if !self.main_graph_selectors.is_empty() {
            fields.insert(
                "mainGraphSelectors".to_string(),
                serde_json::to_value(&self.main_graph_selectors)?,
            );
        }

        let kinds: BTreeMap<Selector, Value> = self
            .kind
            .iter()
            .map(|(selector, kind)| {
                let value = json!({
                    "identifier": kind.identifier.identifier_for_language(&selector.interface_language),
                    "displayName": kind.display_name,
                });
                (selector.clone(), value)
            })
            .collect();
        let mixins = self
            .mixins
            .iter()
            .map(|(selector, mixins)| -> Result<(Selector, Value), EncodeError> {
                let encoded = registry.encode_mixins(MixinTarget::Symbol, mixins)?;
                Ok((selector.clone(), Value::Object(encoded)))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        insert_per_selector(&mut fields, "modules", "module", &self.modules)?;
        insert_per_selector(&mut fields, "kind", "kind", &kinds)?;
        insert_per_selector(&mut fields, "pathComponents", "pathComponents", &self.path_components)?;
        insert_per_selector(&mut fields, "names", "names", &self.names)?;
        insert_per_selector(&mut fields, "docComment", "docComment", &self.doc_comment)?;
        insert_per_selector(&mut fields, "accessLevel", "accessLevel", &self.access_level)?;
        insert_per_selector(&mut fields, "mixins", "mixins", &mixins)?;

        if !self.unified_mixins.is_empty() {
            let encoded = registry.encode_mixins(MixinTarget::Symbol, &self.unified_mixins)?;
            fields.insert("unifiedMixins".to_string(), Value::Object(encoded));
        }
        Ok(Value::Object(fields))
    }
}

/// Write `map` as `[{"selector": ..., value_key: ...}]`, omitting it when empty.
fn insert_per_selector<T: Serialize>(
    fields: &mut Map<String, Value>,
    key: &str,
    value_key: &str,
    map: &BTreeMap<Selector, T>,
) -> Result<(), serde_json::Error> {
    if map.is_empty() {
        return Ok(());
    }
    let mut entries = Vec::with_capacity(map.len());
    for (selector, value) in map {
        let mut entry = Map::new();
        entry.insert("selector".to_string(), serde_json::to_value(selector)?);
        entry.insert(value_key.to_string(), serde_json::to_value(value)?);
        entries.push(Value::Object(entry));
    }
    fields.insert(key.to_string(), Value::Array(entries));
    Ok(())
}

/// `func f(_:label:)`-style heading built from a view's declaration.
///
/// First keyword, the name, then one entry per parameter: its external
/// label, or `_` when it has none. Parameters come from the function
/// signature, else from the declaration's `externalParam` tokens.
fn overload_sub_heading(mixins: &MixinMap) -> Option<Vec<Fragment>> {
    let declaration = &mixins.get_as::<DeclarationFragments>()?.0;
    let name = declaration
        .iter()
        .find(|f| f.kind == FragmentKind::IDENTIFIER)?;

    let mut heading = Vec::new();
    if let Some(keyword) = declaration.iter().find(|f| f.kind == FragmentKind::KEYWORD) {
        heading.push(keyword.clone());
        push_text(&mut heading, " ");
    }
    heading.push(Fragment::identifier(name.spelling.clone()));
    push_text(&mut heading, "(");

    let labels: Vec<Option<&str>> = match mixins.get_as::<FunctionSignature>() {
        Some(signature) => signature
            .parameters
            .iter()
            .map(FunctionParameter::external_label)
            .collect(),
        None => declaration
            .iter()
            .filter(|f| f.kind == FragmentKind::EXTERNAL_PARAM)
            .map(|f| argument_label(&f.spelling))
            .collect(),
    };
    for label in labels {
        match label {
            Some(label) => heading.push(Fragment::new(FragmentKind::EXTERNAL_PARAM, label)),
            None => push_text(&mut heading, "_"),
        }
        push_text(&mut heading, ":");
    }
    push_text(&mut heading, ")");
    Some(heading)
}

/// Append to a trailing text fragment, or start a new one.
fn push_text(fragments: &mut Vec<Fragment>, text: &str) {
    match fragments.last_mut() {
        Some(last) if last.kind == FragmentKind::TEXT => last.spelling.push_str(text),
        _ => fragments.push(Fragment::text(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Platform;

    fn module(os: &str) -> Module {
        Module::new("M", Platform::with_os(os))
    }

    fn func(id: &str, title: &str) -> Symbol {
        Symbol::new(
            id,
            "swift",
            SymbolKind::new("swift.func", "Function"),
            vec!["f(_:)".to_string()],
            Names::titled(title),
        )
    }

    fn parameter(name: &str) -> FunctionParameter {
        FunctionParameter {
            name: name.to_string(),
            internal_name: None,
            declaration_fragments: vec![],
            children: vec![],
        }
    }

    mod views {
        use super::*;

        #[test]
        fn views_are_independent_per_selector() {
            let mut unified = UnifiedSymbol::new(func("f", "mac title"), &module("macosx"), true);
            unified.merge_symbol(func("f", "ios title"), &module("ios"), false);

            let mac = Selector::with_platform("swift", "macOS");
            let ios = Selector::with_platform("swift", "iOS");
            assert_eq!(unified.names[&mac].title, "mac title");
            assert_eq!(unified.names[&ios].title, "ios title");
            assert_eq!(unified.main_graph_selectors.len(), 1);
            assert!(unified.main_graph_selectors.contains(&mac));
            assert_eq!(unified.primary_selectors_for_language("swift"), vec![mac]);
        }

        #[test]
        fn primary_selectors_fall_back_to_all() {
            let unified = UnifiedSymbol::new(func("f", "f"), &module("ios"), false);
            assert_eq!(
                unified.primary_selectors_for_language("swift"),
                vec![Selector::with_platform("swift", "iOS")]
            );
            assert!(unified.primary_selectors_for_language("occ").is_empty());
        }
    }

    mod sub_heading {
        use super::*;

        fn mixins(params: Vec<FunctionParameter>) -> MixinMap {
            let mut mixins = MixinMap::new();
            mixins.insert(DeclarationFragments(vec![
                Fragment::keyword("func"),
                Fragment::text(" "),
                Fragment::identifier("f"),
                Fragment::text("(_ x: Int, with y: Int) -> Int"),
            ]));
            mixins.insert(FunctionSignature {
                parameters: params,
                returns: vec![],
            });
            mixins
        }

        fn spelled(fragments: &[Fragment]) -> String {
            fragments.iter().map(|f| f.spelling.as_str()).collect()
        }

        #[test]
        fn renders_labels_and_placeholders() {
            let mut anonymous = parameter("x");
            anonymous.declaration_fragments =
                vec![Fragment::new(FragmentKind::EXTERNAL_PARAM, "_")];
            let heading = overload_sub_heading(&mixins(vec![anonymous, parameter("with")])).unwrap();
            assert_eq!(spelled(&heading), "func f(_:with:)");
            assert_eq!(heading.last().map(|f| &f.kind), Some(&FragmentKind::TEXT));
        }

        #[test]
        fn no_parameters_gives_empty_parens() {
            let heading = overload_sub_heading(&mixins(vec![])).unwrap();
            assert_eq!(spelled(&heading), "func f()");
        }

        #[test]
        fn labels_from_declaration_without_signature() {
            let mut mixins = MixinMap::new();
            mixins.insert(DeclarationFragments(vec![
                Fragment::keyword("func"),
                Fragment::text(" "),
                Fragment::identifier("f"),
                Fragment::text("("),
                Fragment::new(FragmentKind::EXTERNAL_PARAM, "with"),
                Fragment::text(" "),
                Fragment::new(FragmentKind::INTERNAL_PARAM, "x"),
                Fragment::text(": Int, "),
                Fragment::new(FragmentKind::EXTERNAL_PARAM, "_"),
                Fragment::text(" "),
                Fragment::new(FragmentKind::INTERNAL_PARAM, "y"),
                Fragment::text(": Int)"),
            ]));
            let heading = overload_sub_heading(&mixins).unwrap();
            assert_eq!(spelled(&heading), "func f(with:_:)");
        }

        #[test]
        fn needs_an_identifier() {
            let mut mixins = MixinMap::new();
            mixins.insert(DeclarationFragments(vec![Fragment::keyword("init")]));
            assert!(overload_sub_heading(&mixins).is_none());
        }
    }

    #[test]
    fn encode_omits_empty_attributes() {
        let unified = UnifiedSymbol::new(func("f", "f"), &module("macosx"), true);
        let encoded = unified.encode(&MixinRegistry::new()).unwrap();
        assert_eq!(encoded["uniqueIdentifier"], "f");
        assert!(encoded.get("docComment").is_none());
        assert!(encoded.get("unifiedMixins").is_none());
        assert_eq!(encoded["kind"][0]["kind"]["identifier"], "swift.func");
        assert_eq!(encoded["kind"][0]["selector"]["platform"], "macOS");
        assert_eq!(encoded["pathComponents"][0]["pathComponents"][0], "f(_:)");
    }
}
