//! Typed parameter keys.
//!
//! A [`ParameterKey`] is an immutable identifier with a declared value type
//! and a globally unique name. Identity is the interned [`Symbol`] of the
//! full name, so two keys declared anywhere in the process under the same
//! name share one identity. A process-wide registry records the declared
//! value type per name and rejects conflicting redeclarations.
//!
//! A key can be *composed* with a composition-path prefix (see
//! [`ParameterKey::compose`]), yielding a distinct derived identity. This is
//! deliberate: two instances of the same sub-mixin plugged into different
//! composition slots must not collide on parameter values. The path-string
//! building detail lives entirely behind `compose`.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::utils::interner::{self, Symbol};

/// Bound for parameter value types.
///
/// Blanket-implemented for every type that is cloneable, comparable,
/// hashable and thread-safe — the traits the engine needs for scoped
/// lookup, used-parameter tracking and identity hashing.
pub trait ParamType: Clone + PartialEq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Hash + fmt::Debug + Send + Sync + 'static> ParamType for T {}

/// name → declared value type, enforcing process-wide key uniqueness.
static KEY_TYPES: Lazy<Mutex<FxHashMap<Symbol, (&'static str, TypeId)>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

/// An identifier with a declared value type `T`, a globally unique name and
/// a default value used when no collection supplies one.
///
/// Keys are immutable once created. They are cheap to clone and compare:
/// equality and hashing go through the interned name only.
#[derive(Clone)]
pub struct ParameterKey<T: ParamType> {
    id: Symbol,
    default: T,
}

impl<T: ParamType> ParameterKey<T> {
    /// Declares a key under `name` with the given default value.
    ///
    /// Redeclaring an existing name with the same value type returns a key
    /// with the same identity. Redeclaring with a *different* value type is
    /// a programmer error.
    ///
    /// # Panics
    /// Panics if `name` was already declared with a different value type.
    #[must_use]
    pub fn new(name: &str, default: T) -> Self {
        let id = interner::intern(name);
        let mut types = KEY_TYPES.lock();
        let entry = types
            .entry(id)
            .or_insert_with(|| (std::any::type_name::<T>(), TypeId::of::<T>()));
        assert!(
            entry.1 == TypeId::of::<T>(),
            "parameter key '{name}' already declared with value type {}, redeclared as {}",
            entry.0,
            std::any::type_name::<T>(),
        );
        drop(types);
        Self { id, default }
    }

    /// Derives a key qualified by a composition path.
    ///
    /// The derived key has the full name `"{base}.{path}"`, the same value
    /// type and the same default, but a distinct identity from the bare key.
    #[must_use]
    pub fn compose(&self, path: &str) -> Self {
        Self::new(&format!("{}.{path}", self.name()), self.default.clone())
    }

    /// The key's process-wide identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Symbol {
        self.id
    }

    /// The key's full name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        interner::resolve(self.id)
    }

    /// The declared default, returned by lookups when no collection holds a
    /// value for this key.
    #[inline]
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.default
    }
}

impl<T: ParamType> fmt::Debug for ParameterKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterKey")
            .field("name", &self.name())
            .field("default", &self.default)
            .finish()
    }
}

impl<T: ParamType> PartialEq for ParameterKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: ParamType> Eq for ParameterKey<T> {}

impl<T: ParamType> Hash for ParameterKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_identity() {
        let a = ParameterKey::new("Test.Key.SameName", 1u32);
        let b = ParameterKey::new("Test.Key.SameName", 7u32);

        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
        assert_eq!(a.name(), "Test.Key.SameName");
    }

    #[test]
    fn composed_key_is_distinct() {
        let bare = ParameterKey::new("Test.Key.Composable", 3i32);
        let composed = bare.compose("Lighting.Shadow");

        assert_ne!(bare.id(), composed.id());
        assert_eq!(composed.name(), "Test.Key.Composable.Lighting.Shadow");
        assert_eq!(*composed.default_value(), 3);

        // Composing twice with the same path yields the same identity.
        assert_eq!(composed.id(), bare.compose("Lighting.Shadow").id());
    }

    #[test]
    #[should_panic(expected = "already declared with value type")]
    fn conflicting_type_panics() {
        let _ = ParameterKey::new("Test.Key.Conflicting", 1u32);
        let _ = ParameterKey::new("Test.Key.Conflicting", false);
    }
}
