//! Error Types
//!
//! The main error type [`WeftError`] covers every failure mode of the
//! composition engine: usage errors in generator code (unbalanced scopes,
//! empty names, clone without parent) and lookup misses (unregistered
//! effects). Nothing in this crate retries or degrades; every failure
//! propagates synchronously to the caller of the offending operation.
//!
//! All public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, WeftError>`.

use thiserror::Error;

/// The main error type for the mixin composition engine.
///
/// Each variant names the offending mixin, slot, or operation so that an
/// aborted generation surfaces a precise message.
#[derive(Error, Debug)]
pub enum WeftError {
    // ========================================================================
    // Usage errors (programmer errors in generator code)
    // ========================================================================
    /// A mixin was requested with an empty name.
    #[error("mixin name must not be empty")]
    EmptyMixinName,

    /// Generic arguments were supplied for a name that resolves to a
    /// registered generator. Generators do not accept generic arguments;
    /// this is a known limitation preserved from the original design.
    #[error("mixin '{effect}' resolves to a generator; generic arguments are not supported on generators")]
    GenericsOnGenerator {
        /// The effect name that resolved to a generator.
        effect: String,
    },

    /// A mutation was attempted outside of a `begin_child`/`end_child` pair.
    #[error("'{0}' called outside of a begin_child/end_child pair")]
    NoActiveNode(&'static str),

    /// `end_child` was called more times than `begin_child`.
    #[error("end_child called with no matching begin_child")]
    EndWithoutBegin,

    /// `pop_composition` was called with no composition scope open for the
    /// current child.
    #[error("pop_composition called with no matching push_composition")]
    UnbalancedComposition,

    /// `pop_parameters` was called with no user-pushed parameter scope open
    /// for the current child.
    #[error("pop_parameters called with no matching push_parameters")]
    UnbalancedScope,

    /// `end_child` was called while a composition scope was still open.
    #[error("composition scope '{slot}' still open at end_child")]
    OpenCompositionAtEnd {
        /// The innermost slot left open.
        slot: String,
    },

    /// `end_child` was called while a user-pushed parameter scope was still
    /// open.
    #[error("parameter scope still open at end_child")]
    OpenScopeAtEnd,

    /// `clone_parent_mixin_to_current` was called on the root of the build
    /// stack; inheriting is only meaningful for a child node.
    #[error("clone_parent_mixin_to_current called on a node with no parent")]
    NoParentToClone,

    /// Nested child generation exceeded the explicit depth limit, which
    /// converts a would-be stack overflow into a reported error.
    #[error("mixin nesting exceeds the depth limit of {limit}")]
    DepthLimitExceeded {
        /// The configured limit ([`crate::MAX_BUILD_DEPTH`]).
        limit: usize,
    },

    // ========================================================================
    // Lookup misses
    // ========================================================================
    /// `generate` was called for an effect name with no registered
    /// generator. The expected way callers discover a typo or a missing
    /// registration.
    #[error("no generator registered for effect '{0}'")]
    GeneratorNotFound(String),
}

/// Alias for `Result<T, WeftError>`.
pub type Result<T> = std::result::Result<T, WeftError>;
