//! Error types for symbol graph decoding, encoding and mixin handling.
//!
//! Decode errors fail the smallest enclosing unit (one symbol, one
//! relationship, one semantic version) and carry enough context to locate it
//! in the input. Nothing here is recovered automatically; callers decide
//! whether a failed graph aborts the whole run.

use thiserror::Error;

// ============================================================================
// Semantic Version Errors
// ============================================================================

/// Errors produced while parsing a semantic version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticVersionError {
    /// The version string was empty.
    #[error("empty version string")]
    Empty,

    /// The version did not have between one and three numeric components.
    #[error("expected 1 to 3 numeric components, found {found}")]
    WrongComponentCount { found: usize },

    /// A numeric component could not be parsed.
    #[error("invalid {component} component '{value}'")]
    InvalidComponent {
        component: &'static str,
        value: String,
    },
}

// ============================================================================
// Mixin Errors
// ============================================================================

/// Errors raised by a single mixin payload.
#[derive(Debug, Error)]
pub enum MixinError {
    /// The payload under `key` could not be decoded into its registered type.
    #[error("failed to decode mixin '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The payload under `key` could not be encoded.
    #[error("failed to encode mixin '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl MixinError {
    /// The mixin key this error refers to.
    pub fn key(&self) -> &str {
        match self {
            MixinError::Decode { key, .. } | MixinError::Encode { key, .. } => key,
        }
    }
}

// ============================================================================
// Decode / Encode Errors
// ============================================================================

/// Errors produced while decoding a symbol graph.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Malformed JSON or a field with the wrong shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field was absent.
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    /// A record that must be a JSON object was something else.
    #[error("expected an object for '{record}'")]
    NotAnObject { record: &'static str },

    /// One symbol in the `symbols` list failed to decode.
    #[error("invalid symbol at index {index}: {source}")]
    InvalidSymbol {
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },

    /// One relationship in the `relationships` list failed to decode.
    #[error("invalid relationship at index {index}: {source}")]
    InvalidRelationship {
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },

    /// The format version or another semantic version was unparseable.
    #[error("invalid semantic version: {0}")]
    InvalidVersion(#[from] SemanticVersionError),

    /// A registered mixin failed and its handler chose to propagate.
    #[error(transparent)]
    Mixin(#[from] MixinError),
}

/// Errors produced while encoding a symbol graph or unified graph.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A mixin failed and its handler chose to propagate.
    #[error(transparent)]
    Mixin(#[from] MixinError),
}

// ============================================================================
// Tests
// ============================================================================
