//! Mixin composition: source trees, the composition engine, the generator
//! registry and the permutation identity hasher.

pub mod context;
pub mod identity;
pub mod registry;
pub mod source;

pub use context::MixinContext;
pub use identity::{MixinId, MixinIdentityHasher};
pub use registry::{MixinGenerator, MixinRegistry};
pub use source::{MixinFragment, MixinTree};
