//! Generator registry.
//!
//! An explicit, injected-lifetime registry object (no process-wide
//! singleton): constructed once at startup and passed by reference to every
//! call site that needs generation. The map is guarded by a coarse
//! [`parking_lot::Mutex`]; generation itself runs against a point-in-time
//! snapshot, so concurrent registration from other threads (hot reload)
//! never races a running generator.

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::errors::{Result, WeftError};
use crate::mixin::context::MixinContext;
use crate::mixin::source::MixinTree;
use crate::params::collection::ParameterCollection;

/// A named "effect" mixin that programmatically emits fragments into the
/// current tree node through the context.
///
/// Implementations are plain types (or closures, via the blanket impl)
/// registered by name. Generators may recursively invoke other generators
/// by calling [`MixinContext::mixin`] with another registered name.
pub trait MixinGenerator: Send + Sync {
    /// Populates the context's current node.
    fn generate(&self, context: &mut MixinContext) -> Result<()>;
}

impl<F> MixinGenerator for F
where
    F: Fn(&mut MixinContext) -> Result<()> + Send + Sync,
{
    fn generate(&self, context: &mut MixinContext) -> Result<()> {
        self(context)
    }
}

/// Name → generator map shared process-wide across concurrent generations.
#[derive(Default)]
pub struct MixinRegistry {
    generators: Mutex<FxHashMap<String, Arc<dyn MixinGenerator>>>,
}

impl MixinRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a named generator. Last registration wins, silently — this
    /// supports hot-reload and override scenarios.
    pub fn register<G: MixinGenerator + 'static>(&self, name: &str, generator: G) {
        debug!("registering mixin generator '{name}'");
        self.generators
            .lock()
            .insert(name.to_string(), Arc::new(generator));
    }

    /// Whether a generator is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.generators.lock().contains_key(name)
    }

    /// Returns the generator registered under `name`, if any.
    #[must_use]
    pub fn try_get(&self, name: &str) -> Option<Arc<dyn MixinGenerator>> {
        self.generators.lock().get(name).cloned()
    }

    /// Clears the registry. Test/teardown use.
    pub fn unregister_all(&self) {
        self.generators.lock().clear();
    }

    /// Runs the generator registered under `effect_name` against a fresh
    /// root node and returns the completed tree, with the parameters it
    /// actually read accumulated in
    /// [`used_parameters`](MixinTree::used_parameters).
    ///
    /// The registry map is snapshotted up front; registrations made while
    /// generation runs affect later calls only.
    pub fn generate(
        &self,
        effect_name: &str,
        parameters: &ParameterCollection,
    ) -> Result<MixinTree> {
        let snapshot = self.generators.lock().clone();
        let generator = snapshot
            .get(effect_name)
            .cloned()
            .ok_or_else(|| WeftError::GeneratorNotFound(effect_name.to_string()))?;

        debug!("generating effect '{effect_name}'");
        let mut context = MixinContext::with_generators(snapshot, parameters.clone());
        context.begin_child(Some(effect_name))?;
        generator.generate(&mut context)?;
        context.end_child()
    }
}
