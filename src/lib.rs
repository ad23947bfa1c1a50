//! Shader mixin composition and identity hashing.
//!
//! A final shader program is assembled from a tree of named, parameterized
//! mixin fragments. This crate provides the composition engine that builds
//! such trees ([`MixinContext`] driven by registered [`MixinGenerator`]s),
//! the scoped parameter machinery that configures a build
//! ([`ParameterCollection`] / [`ParameterKey`]), and the content hasher that
//! turns a finished tree into a stable [`MixinId`] — the cache key under
//! which compiled shader bytecode is stored and looked up without
//! recompilation.
//!
//! Actual shader-source compilation is an external collaborator: the
//! finished [`MixinTree`] is the sole artifact handed to it.

pub mod errors;
pub mod mixin;
pub mod params;
pub mod utils;

pub use errors::{Result, WeftError};
pub use mixin::context::{MAX_BUILD_DEPTH, MixinContext};
pub use mixin::identity::{MixinId, MixinIdentityHasher};
pub use mixin::registry::{MixinGenerator, MixinRegistry};
pub use mixin::source::{MixinFragment, MixinTree};
pub use params::collection::ParameterCollection;
pub use params::key::{ParamType, ParameterKey};
pub use params::well_known::{GraphicsPlatform, GraphicsProfile};
pub use utils::interner;
