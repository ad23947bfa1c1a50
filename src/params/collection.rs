//! Parameter collections.
//!
//! A [`ParameterCollection`] is an ordered key→value store keyed by
//! parameter-key identity. Internally it uses a `Vec<(Symbol, value)>` kept
//! sorted by `Symbol` with binary search for lookup, so that identical
//! contents always sit in identical order regardless of insertion history.
//!
//! Absence is a defined state: a typed [`get`](ParameterCollection::get)
//! falls back to the key's declared default and never fails. Type safety is
//! carried by the key's generic parameter together with the process-wide
//! key-type registry in [`crate::params::key`].

use std::any::Any;
use std::fmt;
use std::hash::Hasher;

use crate::params::key::{ParamType, ParameterKey};
use crate::utils::interner::Symbol;

/// Object-safe facade over a stored parameter value.
///
/// Blanket-implemented for every [`ParamType`]; gives the collection dyn
/// clone, dyn equality, `Any` downcast and byte-deterministic hashing into
/// an arbitrary [`Hasher`] (used by the identity hasher).
pub trait ParamValue: fmt::Debug + Send + Sync {
    /// Downcast support for the typed getter.
    fn as_any(&self) -> &dyn Any;
    /// Deep copy of the boxed value.
    fn clone_boxed(&self) -> Box<dyn ParamValue>;
    /// Equality across boxed values; `false` when types differ.
    fn value_eq(&self, other: &dyn ParamValue) -> bool;
    /// Feeds the value's bytes into a hasher.
    fn hash_value(&self, state: &mut dyn Hasher);
}

impl<T: ParamType> ParamValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ParamValue> {
        Box::new(self.clone())
    }

    fn value_eq(&self, other: &dyn ParamValue) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|o| self == o)
    }

    fn hash_value(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }
}

/// Mapping from key identity to boxed value.
///
/// Within one collection a key maps to at most one value of its declared
/// type. Collections are independently constructible, clearable and deep
/// copyable.
#[derive(Debug, Default)]
pub struct ParameterCollection {
    entries: Vec<(Symbol, Box<dyn ParamValue>)>,
}

impl ParameterCollection {
    /// Creates an empty collection.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Stores a value, overwriting any existing entry for this key identity.
    pub fn set<T: ParamType>(&mut self, key: &ParameterKey<T>, value: T) {
        self.set_boxed(key.id(), Box::new(value));
    }

    pub(crate) fn set_boxed(&mut self, id: Symbol, value: Box<dyn ParamValue>) {
        match self.entries.binary_search_by_key(&id, |&(k, _)| k) {
            Ok(idx) => {
                self.entries[idx].1 = value;
            }
            Err(idx) => {
                self.entries.insert(idx, (id, value));
            }
        }
    }

    /// Returns the stored value for `key`, or the key's declared default if
    /// absent. A missing key is never an error.
    #[must_use]
    pub fn get<T: ParamType>(&self, key: &ParameterKey<T>) -> T {
        match self.entries.binary_search_by_key(&key.id(), |&(k, _)| k) {
            Ok(idx) => self.entries[idx]
                .1
                .as_any()
                .downcast_ref::<T>()
                .cloned()
                .unwrap_or_else(|| key.default_value().clone()),
            Err(_) => key.default_value().clone(),
        }
    }

    /// Pure existence test, used by scoped lookup chains.
    #[must_use]
    pub fn contains<T: ParamType>(&self, key: &ParameterKey<T>) -> bool {
        self.contains_id(key.id())
    }

    #[inline]
    pub(crate) fn contains_id(&self, id: Symbol) -> bool {
        self.entries.binary_search_by_key(&id, |&(k, _)| k).is_ok()
    }

    pub(crate) fn get_raw(&self, id: Symbol) -> Option<&dyn ParamValue> {
        self.entries
            .binary_search_by_key(&id, |&(k, _)| k)
            .ok()
            .map(|idx| self.entries[idx].1.as_ref())
    }

    /// Removes the entry for `key`. Returns whether an entry existed.
    pub fn remove<T: ParamType>(&mut self, key: &ParameterKey<T>) -> bool {
        if let Ok(idx) = self.entries.binary_search_by_key(&key.id(), |&(k, _)| k) {
            self.entries.remove(idx);
            true
        } else {
            false
        }
    }

    /// Empties the collection. Keys registered elsewhere are unaffected.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Duplicates all entries into `other`, overwriting entries with the
    /// same key identity. Values are deep-copied.
    pub fn copy_to(&self, other: &mut ParameterCollection) {
        for (k, v) in &self.entries {
            other.set_boxed(*k, v.clone_boxed());
        }
    }

    /// Number of stored entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Clone for ParameterCollection {
    fn clone(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (*k, v.clone_boxed()))
                .collect(),
        }
    }
}

/// Entry-wise equality: same key identities mapped to equal values.
/// Insertion history is irrelevant since entries are kept sorted.
impl PartialEq for ParameterCollection {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|((ka, va), (kb, vb))| ka == kb && va.value_eq(vb.as_ref()))
    }
}
