//! Global string interner.
//!
//! Converts strings into compact integer [`Symbol`]s for cheap comparison
//! and hashing. Parameter-key identity is built on top of this: two keys
//! with the same full name always intern to the same `Symbol`, process-wide.

use lasso::{Spur, ThreadedRodeo};
use once_cell::sync::Lazy;

static INTERNER: Lazy<ThreadedRodeo> = Lazy::new(ThreadedRodeo::new);

/// A compact integer identifier for an interned string.
///
/// Comparison and hashing of `Symbol`s is plain integer arithmetic.
pub type Symbol = Spur;

/// Interns a string, returning its `Symbol`.
///
/// Returns the existing `Symbol` if the string was interned before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the `Symbol` of an already-interned string without allocating.
#[inline]
#[must_use]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a `Symbol` back to its string.
///
/// # Panics
/// Panics if the symbol was not produced by this interner (cannot happen
/// for symbols obtained through [`intern`]).
#[inline]
#[must_use]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}
