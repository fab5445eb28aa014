//! Built-in mixin payloads.
//!
//! These are recognized by every [`MixinRegistry`](crate::mixin::MixinRegistry)
//! without registration. Symbol mixins and relationship mixins are kept apart:
//! a `spi` key on a relationship is not a known mixin.

use serde::{Deserialize, Serialize};

use super::metadata::SemanticVersion;
use super::symbol::{Fragment, Position};

// ============================================================================
// Symbol Mixins
// ============================================================================

/// `declarationFragments`: the full declaration as tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclarationFragments(pub Vec<Fragment>);

impl DeclarationFragments {
    /// Concatenated spelling of every fragment.
    pub fn spelling(&self) -> String {
        self.0.iter().map(|f| f.spelling.as_str()).collect()
    }
}

/// `functionSignature`: parameters and return type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    #[serde(default)]
    pub parameters: Vec<FunctionParameter>,
    #[serde(default)]
    pub returns: Vec<Fragment>,
}

/// One parameter of a function signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub declaration_fragments: Vec<Fragment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FunctionParameter>,
}

impl FunctionParameter {
    /// The argument label callers write, if the declaration has one.
    ///
    /// With declaration fragments the label is the `externalParam` fragment,
    /// and a parameter without one (`_ x` is spelled as `internalParam` only)
    /// has none. Without fragments `name` is used as is, so a bare `x` from a
    /// producer that omits fragments reads as labeled.
    pub fn external_label(&self) -> Option<&str> {
        if self.declaration_fragments.is_empty() {
            return argument_label(&self.name);
        }
        self.declaration_fragments
            .iter()
            .find(|f| f.kind == super::FragmentKind::EXTERNAL_PARAM)
            .and_then(|f| argument_label(&f.spelling))
    }
}

/// `None` for the empty label and the `_` placeholder.
pub(crate) fn argument_label(spelling: &str) -> Option<&str> {
    let label = spelling.trim();
    (!label.is_empty() && label != "_").then_some(label)
}

/// `location`: where the declaration lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub position: Position,
}

/// `availability`: per-domain availability attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Availability(pub Vec<AvailabilityItem>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduced: Option<SemanticVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<SemanticVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obsoleted: Option<SemanticVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed: Option<String>,
    #[serde(default, skip_serializing_if = "super::is_false")]
    pub is_unconditionally_deprecated: bool,
    #[serde(default, skip_serializing_if = "super::is_false")]
    pub is_unconditionally_unavailable: bool,
    #[serde(default, skip_serializing_if = "super::is_false")]
    pub will_eventually_be_deprecated: bool,
}

/// A generic parameter (`T` at depth 0, index 0).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenericParameter {
    pub name: String,
    pub index: u32,
    pub depth: u32,
}

/// A generic requirement such as `T: Equatable`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericConstraint {
    pub kind: String,
    pub lhs: String,
    pub rhs: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhs_precise_identifier: Option<String>,
}

/// `swiftGenerics`: generic parameters and constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwiftGenerics {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<GenericParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<GenericConstraint>,
}

/// `swiftExtension`: the extended type's module and constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwiftExtension {
    pub extended_module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_kind: Option<String>,
    #[serde(default)]
    pub constraints: Vec<GenericConstraint>,
}

/// `spi`: declared as system programming interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spi(pub bool);

/// `isReadOnly`: property without a setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IsReadOnly(pub bool);

/// `overloadData`: the overload group a symbol belongs to and its rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverloadData {
    pub overload_group_identifier: String,
    pub overload_group_index: usize,
}

// ============================================================================
// Relationship Mixins
// ============================================================================

/// `sourceOrigin`: where an inherited or default implementation came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOrigin {
    pub identifier: String,
    pub display_name: String,
}

/// `swiftConstraints`: constraints under which a relationship holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwiftConstraints(pub Vec<GenericConstraint>);
