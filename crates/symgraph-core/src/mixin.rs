//! Mixin registry: typed extension payloads on symbols and relationships.
//!
//! A record's extension payloads live in a [`MixinMap`], keyed by a stable
//! string. Each payload is a [`Mixin`]:
//!
//! - one enum variant per built-in kind (`declarationFragments`,
//!   `functionSignature`, `overloadData`, ...), always recognized
//! - [`Mixin::Custom`] for kinds registered by the embedding application
//!
//! # Registration
//!
//! Custom kinds are described by a [`MixinRegistration`] and added to a
//! [`MixinRegistry`]. The registry is plain data owned by the caller and is
//! passed by reference into every decode/encode call; there is no global
//! registration table.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use symgraph_core::mixin::{MixinKind, MixinRegistration, MixinRegistry};
//!
//! #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
//! struct Stability {
//!     level: String,
//! }
//!
//! impl MixinKind for Stability {
//!     const KEY: &'static str = "stability";
//! }
//!
//! let mut registry = MixinRegistry::new();
//! registry.register_symbol_mixin(MixinRegistration::comparable::<Stability>());
//! ```
//!
//! # Equality
//!
//! Built-in payloads and payloads registered with
//! [`MixinRegistration::comparable`] take part in equality and hashing of
//! their owner. Opaque payloads do not. Two maps are equal only if they hold
//! the same number of comparable payloads and those payloads match key by key.
//!
//! # Failure Policy
//!
//! - Unknown keys are skipped on decode, so they are never re-encoded.
//! - A built-in payload that fails to decode fails the enclosing record.
//! - A registered payload that fails is routed through its handler
//!   ([`DecodeRecovery`] / [`EncodeRecovery`]); without a handler the error
//!   propagates.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::MixinError;
use crate::graph::mixins::{
    Availability, DeclarationFragments, FunctionSignature, IsReadOnly, Location, OverloadData,
    SourceOrigin, Spi, SwiftConstraints, SwiftExtension, SwiftGenerics,
};

// ============================================================================
// Mixin Kinds
// ============================================================================

/// A payload type that can be stored under a fixed mixin key.
pub trait MixinKind: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Key the payload is filed under on the wire.
    const KEY: &'static str;

    /// Borrow the payload out of a type-erased mixin.
    fn from_mixin(mixin: &Mixin) -> Option<&Self> {
        match mixin {
            Mixin::Custom(custom) => custom.downcast_ref::<Self>(),
            _ => None,
        }
    }
}

/// Which record type a mixin key applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixinTarget {
    Symbol,
    Relationship,
}

macro_rules! builtin_mixins {
    ($($variant:ident => $key:literal on $target:ident;)*) => {
        /// A type-erased mixin payload.
        #[derive(Debug, Clone)]
        pub enum Mixin {
            $($variant($variant),)*
            /// A kind registered by the embedding application.
            Custom(CustomMixin),
        }

        $(
            impl MixinKind for $variant {
                const KEY: &'static str = $key;

                fn from_mixin(mixin: &Mixin) -> Option<&Self> {
                    match mixin {
                        Mixin::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }

            impl From<$variant> for Mixin {
                fn from(value: $variant) -> Self {
                    Mixin::$variant(value)
                }
            }
        )*

        impl Mixin {
            /// Key this payload is filed under.
            pub fn key(&self) -> &str {
                match self {
                    $(Mixin::$variant(_) => $key,)*
                    Mixin::Custom(custom) => custom.key(),
                }
            }

            /// True if `key` is a built-in kind for `target`.
            pub fn is_builtin_key(target: MixinTarget, key: &str) -> bool {
                matches!((target, key), $((MixinTarget::$target, $key))|*)
            }

            fn encode_value(&self) -> Result<Value, serde_json::Error> {
                match self {
                    $(Mixin::$variant(value) => serde_json::to_value(value),)*
                    Mixin::Custom(custom) => custom.payload.encode(),
                }
            }

            fn decode_builtin(
                target: MixinTarget,
                key: &str,
                value: Value,
            ) -> Option<Result<Mixin, serde_json::Error>> {
                match (target, key) {
                    $((MixinTarget::$target, $key) => {
                        Some(serde_json::from_value::<$variant>(value).map(Mixin::$variant))
                    })*
                    _ => None,
                }
            }

            fn same_value(&self, other: &Mixin) -> bool {
                match (self, other) {
                    $((Mixin::$variant(a), Mixin::$variant(b)) => a == b,)*
                    (Mixin::Custom(a), Mixin::Custom(b)) => a.dyn_eq(b),
                    _ => false,
                }
            }

            fn hash_value(&self, mut state: &mut dyn Hasher) {
                match self {
                    $(Mixin::$variant(value) => value.hash(&mut state),)*
                    Mixin::Custom(custom) => custom.dyn_hash(state),
                }
            }
        }
    };
}

builtin_mixins! {
    Availability => "availability" on Symbol;
    DeclarationFragments => "declarationFragments" on Symbol;
    FunctionSignature => "functionSignature" on Symbol;
    IsReadOnly => "isReadOnly" on Symbol;
    Location => "location" on Symbol;
    OverloadData => "overloadData" on Symbol;
    Spi => "spi" on Symbol;
    SwiftExtension => "swiftExtension" on Symbol;
    SwiftGenerics => "swiftGenerics" on Symbol;
    SourceOrigin => "sourceOrigin" on Relationship;
    SwiftConstraints => "swiftConstraints" on Relationship;
}

impl Mixin {
    /// True if this payload takes part in equality and hashing.
    pub fn is_comparable(&self) -> bool {
        match self {
            Mixin::Custom(custom) => custom.is_comparable(),
            _ => true,
        }
    }
}

impl From<CustomMixin> for Mixin {
    fn from(custom: CustomMixin) -> Self {
        Mixin::Custom(custom)
    }
}

// ============================================================================
// Custom Mixins
// ============================================================================

trait ErasedPayload: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn ErasedPayload>;
    fn encode(&self) -> Result<Value, serde_json::Error>;
}

impl<T: MixinKind> ErasedPayload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn ErasedPayload> {
        Box::new(self.clone())
    }

    fn encode(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

type EqFn = fn(&dyn Any, &dyn Any) -> bool;
type HashFn = fn(&dyn Any, &mut dyn Hasher);

fn eq_erased<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn hash_erased<T: Hash + 'static>(value: &dyn Any, mut state: &mut dyn Hasher) {
    if let Some(value) = value.downcast_ref::<T>() {
        value.hash(&mut state);
    }
}

/// A payload of an application-registered kind.
///
/// Carries its own capability table: encode and clone always, equality and
/// hashing only when created through [`CustomMixin::comparable`].
pub struct CustomMixin {
    key: &'static str,
    payload: Box<dyn ErasedPayload>,
    eq: Option<EqFn>,
    hash: Option<HashFn>,
}

impl CustomMixin {
    /// Wrap a payload that is excluded from equality and hashing.
    pub fn opaque<T: MixinKind>(value: T) -> Self {
        CustomMixin {
            key: T::KEY,
            payload: Box::new(value),
            eq: None,
            hash: None,
        }
    }

    /// Wrap a payload that takes part in equality and hashing.
    pub fn comparable<T: MixinKind + PartialEq + Hash>(value: T) -> Self {
        CustomMixin {
            key: T::KEY,
            payload: Box::new(value),
            eq: Some(eq_erased::<T>),
            hash: Some(hash_erased::<T>),
        }
    }

    pub fn key(&self) -> &str {
        self.key
    }

    pub fn is_comparable(&self) -> bool {
        self.eq.is_some()
    }

    /// Borrow the payload as `T`, if that is its concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.as_any().downcast_ref::<T>()
    }

    /// False when either side is opaque or the concrete types differ.
    fn dyn_eq(&self, other: &CustomMixin) -> bool {
        match (self.eq, other.eq) {
            (Some(eq), Some(_)) => eq(self.payload.as_any(), other.payload.as_any()),
            _ => false,
        }
    }

    fn dyn_hash(&self, state: &mut dyn Hasher) {
        if let Some(hash) = self.hash {
            hash(self.payload.as_any(), state);
        }
    }
}

impl Clone for CustomMixin {
    fn clone(&self) -> Self {
        CustomMixin {
            key: self.key,
            payload: self.payload.clone_box(),
            eq: self.eq,
            hash: self.hash,
        }
    }
}

impl fmt::Debug for CustomMixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomMixin")
            .field("key", &self.key)
            .field("payload", &self.payload)
            .field("comparable", &self.is_comparable())
            .finish()
    }
}

// ============================================================================
// Mixin Map
// ============================================================================

/// Extension payloads of one record, unique by key.
#[derive(Debug, Clone, Default)]
pub struct MixinMap(BTreeMap<String, Mixin>);

impl MixinMap {
    pub fn new() -> Self {
        MixinMap(BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert a payload under its own key, returning the one it replaced.
    pub fn insert(&mut self, mixin: impl Into<Mixin>) -> Option<Mixin> {
        let mixin = mixin.into();
        self.0.insert(mixin.key().to_string(), mixin)
    }

    pub fn get(&self, key: &str) -> Option<&Mixin> {
        self.0.get(key)
    }

    /// Borrow the payload of kind `T`.
    pub fn get_as<T: MixinKind>(&self) -> Option<&T> {
        self.0.get(T::KEY).and_then(T::from_mixin)
    }

    pub fn remove(&mut self, key: &str) -> Option<Mixin> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mixin)> {
        self.0.iter().map(|(key, mixin)| (key.as_str(), mixin))
    }

    fn comparable(&self) -> impl Iterator<Item = (&String, &Mixin)> {
        self.0.iter().filter(|(_, mixin)| mixin.is_comparable())
    }
}

impl PartialEq for MixinMap {
    fn eq(&self, other: &Self) -> bool {
        if self.comparable().count() != other.comparable().count() {
            return false;
        }
        self.comparable().all(|(key, mixin)| {
            other
                .0
                .get(key)
                .is_some_and(|theirs| mixin.same_value(theirs))
        })
    }
}

impl Eq for MixinMap {}

impl Hash for MixinMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.comparable().count());
        for (key, mixin) in self.comparable() {
            key.hash(state);
            mixin.hash_value(state);
        }
    }
}

// ============================================================================
// Registration
// ============================================================================

/// What to do after a registered payload fails to decode.
#[derive(Debug, Clone)]
pub enum DecodeRecovery {
    /// Fail the enclosing record.
    Propagate,
    /// Drop the entry and keep decoding.
    Skip,
    /// Store this payload instead.
    Substitute(Mixin),
}

/// What to do after a registered payload fails to encode.
#[derive(Debug, Clone)]
pub enum EncodeRecovery {
    /// Fail the enclosing record.
    Propagate,
    /// Leave the key out of the output.
    Skip,
    /// Write this value instead.
    Substitute(Value),
}

pub type DecodeErrorHandler = Arc<dyn Fn(&MixinError) -> DecodeRecovery + Send + Sync>;
pub type EncodeErrorHandler = Arc<dyn Fn(&MixinError) -> EncodeRecovery + Send + Sync>;

type DecodeFn = fn(Value) -> Result<CustomMixin, serde_json::Error>;

fn decode_opaque<T: MixinKind>(value: Value) -> Result<CustomMixin, serde_json::Error> {
    serde_json::from_value::<T>(value).map(CustomMixin::opaque)
}

fn decode_comparable<T: MixinKind + PartialEq + Hash>(
    value: Value,
) -> Result<CustomMixin, serde_json::Error> {
    serde_json::from_value::<T>(value).map(CustomMixin::comparable)
}

/// Capability table entry for one application-defined mixin kind.
#[derive(Clone)]
pub struct MixinRegistration {
    key: &'static str,
    decode: DecodeFn,
    on_decode_error: Option<DecodeErrorHandler>,
    on_encode_error: Option<EncodeErrorHandler>,
}

impl MixinRegistration {
    /// Register `T` without equality or hashing.
    pub fn opaque<T: MixinKind>() -> Self {
        MixinRegistration {
            key: T::KEY,
            decode: decode_opaque::<T>,
            on_decode_error: None,
            on_encode_error: None,
        }
    }

    /// Register `T` with equality and hashing.
    pub fn comparable<T: MixinKind + PartialEq + Hash>() -> Self {
        MixinRegistration {
            key: T::KEY,
            decode: decode_comparable::<T>,
            on_decode_error: None,
            on_encode_error: None,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Install a handler consulted when a payload of this kind fails to decode.
    pub fn on_decode_error(
        mut self,
        handler: impl Fn(&MixinError) -> DecodeRecovery + Send + Sync + 'static,
    ) -> Self {
        self.on_decode_error = Some(Arc::new(handler));
        self
    }

    /// Install a handler consulted when a payload of this kind fails to encode.
    pub fn on_encode_error(
        mut self,
        handler: impl Fn(&MixinError) -> EncodeRecovery + Send + Sync + 'static,
    ) -> Self {
        self.on_encode_error = Some(Arc::new(handler));
        self
    }

    fn decode_recovery(&self, err: &MixinError) -> DecodeRecovery {
        self.on_decode_error
            .as_ref()
            .map_or(DecodeRecovery::Propagate, |handler| handler(err))
    }

    fn encode_recovery(&self, err: &MixinError) -> EncodeRecovery {
        self.on_encode_error
            .as_ref()
            .map_or(EncodeRecovery::Propagate, |handler| handler(err))
    }
}

impl fmt::Debug for MixinRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixinRegistration")
            .field("key", &self.key)
            .field("on_decode_error", &self.on_decode_error.is_some())
            .field("on_encode_error", &self.on_encode_error.is_some())
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Application-supplied mixin kinds, threaded through every codec call.
///
/// A registration for a built-in key takes precedence over the built-in
/// decoder for that key.
#[derive(Debug, Clone, Default)]
pub struct MixinRegistry {
    symbol_mixins: HashMap<&'static str, MixinRegistration>,
    relationship_mixins: HashMap<&'static str, MixinRegistration>,
}

impl MixinRegistry {
    /// A registry that only knows the built-in kinds.
    pub fn new() -> Self {
        MixinRegistry::default()
    }

    /// Register a mixin kind for symbols.
    pub fn register_symbol_mixin(&mut self, registration: MixinRegistration) -> &mut Self {
        self.symbol_mixins.insert(registration.key, registration);
        self
    }

    /// Register a mixin kind for relationships.
    pub fn register_relationship_mixin(&mut self, registration: MixinRegistration) -> &mut Self {
        self.relationship_mixins
            .insert(registration.key, registration);
        self
    }

    fn registration(&self, target: MixinTarget, key: &str) -> Option<&MixinRegistration> {
        match target {
            MixinTarget::Symbol => self.symbol_mixins.get(key),
            MixinTarget::Relationship => self.relationship_mixins.get(key),
        }
    }

    /// True if `key` is built in or registered for `target`.
    pub fn is_known(&self, target: MixinTarget, key: &str) -> bool {
        self.registration(target, key).is_some() || Mixin::is_builtin_key(target, key)
    }

    /// Decode the mixin candidates of one record.
    ///
    /// `fields` holds every top-level key that is not a core field of the
    /// record. Unknown keys are skipped.
    pub fn decode_mixins(
        &self,
        target: MixinTarget,
        fields: Map<String, Value>,
    ) -> Result<MixinMap, MixinError> {
        let mut mixins = MixinMap::new();
        for (key, value) in fields {
            if let Some(registration) = self.registration(target, &key) {
                match (registration.decode)(value) {
                    Ok(custom) => {
                        mixins.insert(custom);
                    }
                    Err(source) => {
                        let err = MixinError::Decode { key, source };
                        match registration.decode_recovery(&err) {
                            DecodeRecovery::Propagate => return Err(err),
                            DecodeRecovery::Skip => {
                                warn!(key = err.key(), error = %err, "skipping undecodable mixin");
                            }
                            DecodeRecovery::Substitute(mixin) => {
                                debug!(key = err.key(), "substituting default for undecodable mixin");
                                mixins.insert(mixin);
                            }
                        }
                    }
                }
                continue;
            }

            match Mixin::decode_builtin(target, &key, value) {
                Some(Ok(mixin)) => {
                    mixins.insert(mixin);
                }
                Some(Err(source)) => return Err(MixinError::Decode { key, source }),
                None => debug!(key = %key, ?target, "ignoring unknown mixin"),
            }
        }
        Ok(mixins)
    }

    /// Encode a record's mixins as top-level fields.
    ///
    /// Payloads whose key is neither built in nor registered for `target`
    /// are dropped.
    pub fn encode_mixins(
        &self,
        target: MixinTarget,
        mixins: &MixinMap,
    ) -> Result<Map<String, Value>, MixinError> {
        let mut fields = Map::new();
        for (key, mixin) in mixins.iter() {
            let registration = self.registration(target, key);
            if registration.is_none() && !Mixin::is_builtin_key(target, key) {
                debug!(key, ?target, "dropping unregistered mixin");
                continue;
            }

            match mixin.encode_value() {
                Ok(value) => {
                    fields.insert(key.to_string(), value);
                }
                Err(source) => {
                    let err = MixinError::Encode {
                        key: key.to_string(),
                        source,
                    };
                    let recovery = registration
                        .map_or(EncodeRecovery::Propagate, |r| r.encode_recovery(&err));
                    match recovery {
                        EncodeRecovery::Propagate => return Err(err),
                        EncodeRecovery::Skip => {
                            warn!(key, error = %err, "skipping unencodable mixin");
                        }
                        EncodeRecovery::Substitute(value) => {
                            fields.insert(key.to_string(), value);
                        }
                    }
                }
            }
        }
        Ok(fields)
    }
}

// ============================================================================
// Tests
// ============================================================================
