//! Typed parameter keys and collections.
//!
//! Parameters configure a mixin generation pass: generators read them
//! through the context's scoped lookup, and the subset actually sourced
//! from the global compiler parameters feeds the permutation identity.

pub mod collection;
pub mod key;
pub mod well_known;

pub use collection::{ParamValue, ParameterCollection};
pub use key::{ParamType, ParameterKey};
