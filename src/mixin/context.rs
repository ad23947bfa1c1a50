//! Mixin composition engine.
//!
//! A [`MixinContext`] services exactly one top-level generation request. It
//! tracks three pieces of state with strict stack discipline:
//!
//! - the **build stack**: the chain of tree nodes currently under
//!   construction, the top being the *current* node every mutation targets;
//! - the **parameter scope stack**: collections searched innermost-first by
//!   [`get_param`](MixinContext::get_param); `begin_child` pushes a fresh
//!   scope automatically, generators may push more;
//! - the **composition path stack**: slot-name fragments (`slot` or
//!   `slot[index]`) that qualify parameter keys per composition slot.
//!
//! The context is thread-confined and holds no locks — one context, one
//! generation. Only the registry and the identity hasher are shared state.
//!
//! Malformed nesting (unbalanced push/pop, clone without parent, empty
//! names) fails fast with a descriptive [`WeftError`]; the whole generation
//! attempt for that root is abandoned and surfaced to the caller.

use std::sync::Arc;

use log::trace;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::{Result, WeftError};
use crate::mixin::registry::MixinGenerator;
use crate::mixin::source::MixinTree;
use crate::params::collection::ParameterCollection;
use crate::params::key::{ParamType, ParameterKey};

/// Maximum combined `begin_child` nesting and generator dispatch depth.
/// Converts unbounded generator recursion into a reported
/// [`WeftError::DepthLimitExceeded`] instead of a stack overflow.
pub const MAX_BUILD_DEPTH: usize = 64;

/// Per-child bookkeeping: how deep the composition path and scope stacks
/// were when the child began. `end_child` checks both are balanced back.
struct ChildFrame {
    composition_watermark: usize,
    scope_watermark: usize,
}

/// The stateful composition engine driving one generation request.
pub struct MixinContext {
    /// Point-in-time snapshot of the registry, taken when generation began.
    generators: FxHashMap<String, Arc<dyn MixinGenerator>>,
    /// The outermost/global compiler parameters. Values resolved from here
    /// are recorded as used, since they determine permutation identity.
    compiler_parameters: ParameterCollection,
    scopes: Vec<ParameterCollection>,
    build_stack: Vec<MixinTree>,
    frames: Vec<ChildFrame>,
    composition_path: SmallVec<[String; 4]>,
    /// Generators currently on the native call stack. Generators recursing
    /// through [`mixin`](Self::mixin) never push a build-stack node, so the
    /// depth limit has to count dispatches too.
    dispatch_depth: usize,
}

impl MixinContext {
    /// Creates a context with no registered generators; every `mixin` call
    /// appends a literal fragment. Useful for hand-driven composition.
    #[must_use]
    pub fn new(compiler_parameters: ParameterCollection) -> Self {
        Self::with_generators(FxHashMap::default(), compiler_parameters)
    }

    pub(crate) fn with_generators(
        generators: FxHashMap<String, Arc<dyn MixinGenerator>>,
        compiler_parameters: ParameterCollection,
    ) -> Self {
        Self {
            generators,
            compiler_parameters,
            scopes: Vec::new(),
            build_stack: Vec::new(),
            frames: Vec::new(),
            composition_path: SmallVec::new(),
            dispatch_depth: 0,
        }
    }

    // ── Build stack ──────────────────────────────────────────────────────────

    /// Begins a child node: parents it under the current node, seeds its
    /// used parameters from the parent, and pushes a fresh parameter scope.
    pub fn begin_child(&mut self, name: Option<&str>) -> Result<()> {
        if self.dispatch_depth + self.build_stack.len() >= MAX_BUILD_DEPTH {
            return Err(WeftError::DepthLimitExceeded {
                limit: MAX_BUILD_DEPTH,
            });
        }

        let mut child = MixinTree {
            name: name.map(str::to_string),
            ..MixinTree::default()
        };

        if let Some(parent) = self.build_stack.last() {
            let path = parent.fully_qualified_name();
            if !path.is_empty() {
                child.parent_path = Some(path);
            }
            parent.used_parameters.copy_to(&mut child.used_parameters);
        }

        trace!("begin_child '{}'", child.fully_qualified_name());

        self.frames.push(ChildFrame {
            composition_watermark: self.composition_path.len(),
            scope_watermark: self.scopes.len(),
        });
        self.scopes.push(ParameterCollection::new());
        self.build_stack.push(child);
        Ok(())
    }

    /// Ends the current child and returns it, popping back to the parent.
    ///
    /// Fails if composition or parameter scopes opened inside the child are
    /// still open, or if no child is being built.
    pub fn end_child(&mut self) -> Result<MixinTree> {
        let Some(frame) = self.frames.last() else {
            return Err(WeftError::EndWithoutBegin);
        };
        if self.composition_path.len() > frame.composition_watermark {
            return Err(WeftError::OpenCompositionAtEnd {
                slot: self.composition_path.last().cloned().unwrap_or_default(),
            });
        }
        // One past the watermark is the automatic scope pushed by begin_child.
        if self.scopes.len() > frame.scope_watermark + 1 {
            return Err(WeftError::OpenScopeAtEnd);
        }

        self.frames.pop();
        self.scopes.pop();
        let node = self
            .build_stack
            .pop()
            .ok_or(WeftError::EndWithoutBegin)?;
        trace!("end_child '{}'", node.fully_qualified_name());
        Ok(node)
    }

    /// The node currently being built.
    pub fn current(&self) -> Result<&MixinTree> {
        self.build_stack
            .last()
            .ok_or(WeftError::NoActiveNode("current"))
    }

    fn current_mut(&mut self, op: &'static str) -> Result<&mut MixinTree> {
        self.build_stack
            .last_mut()
            .ok_or(WeftError::NoActiveNode(op))
    }

    fn ensure_active(&self, op: &'static str) -> Result<()> {
        if self.frames.is_empty() {
            return Err(WeftError::NoActiveNode(op));
        }
        Ok(())
    }

    // ── Fragments and generators ─────────────────────────────────────────────

    /// Mixes `name` into the current node: dispatches to a registered
    /// generator when one exists under that name (generators may recurse
    /// through this same call), otherwise appends a literal fragment.
    pub fn mixin(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(WeftError::EmptyMixinName);
        }
        self.ensure_active("mixin")?;

        if let Some(generator) = self.generators.get(name).cloned() {
            if self.dispatch_depth + self.build_stack.len() >= MAX_BUILD_DEPTH {
                return Err(WeftError::DepthLimitExceeded {
                    limit: MAX_BUILD_DEPTH,
                });
            }
            trace!("dispatching generator '{name}'");
            self.dispatch_depth += 1;
            let result = generator.generate(self);
            self.dispatch_depth -= 1;
            result
        } else {
            self.current_mut("mixin")?.add_fragment(name);
            Ok(())
        }
    }

    /// Mixes a fragment specialized with generic arguments.
    ///
    /// Generators do not accept generic arguments; resolving to one fails
    /// with [`WeftError::GenericsOnGenerator`] — a known sharp edge callers
    /// must avoid.
    pub fn mixin_with(&mut self, name: &str, generics: &[&str]) -> Result<()> {
        if name.is_empty() {
            return Err(WeftError::EmptyMixinName);
        }
        self.ensure_active("mixin_with")?;
        if self.generators.contains_key(name) {
            return Err(WeftError::GenericsOnGenerator {
                effect: name.to_string(),
            });
        }
        self.current_mut("mixin_with")?
            .add_fragment_with(name, generics);
        Ok(())
    }

    /// Removes, by exact name, all fragments at the current node only.
    pub fn remove_mixin(&mut self, name: &str) -> Result<()> {
        self.current_mut("remove_mixin")?.remove_fragment(name);
        Ok(())
    }

    /// Copies the parent node's fragments and compositions into the current
    /// node — mixin inheritance. Only meaningful for a child.
    pub fn clone_parent_mixin_to_current(&mut self) -> Result<()> {
        let depth = self.build_stack.len();
        if depth < 2 {
            return Err(WeftError::NoParentToClone);
        }
        let (head, tail) = self.build_stack.split_at_mut(depth - 1);
        tail[0].inherit_from(&head[depth - 2]);
        Ok(())
    }

    // ── Compositions ─────────────────────────────────────────────────────────

    /// Sets the named single-child slot on the current node.
    pub fn add_composition(&mut self, slot: &str, child: MixinTree) -> Result<()> {
        self.current_mut("add_composition")?
            .add_composition(slot, child);
        Ok(())
    }

    /// Appends to the named array slot on the current node, returning the
    /// assigned index.
    pub fn add_composition_to_array(&mut self, slot: &str, child: MixinTree) -> Result<usize> {
        Ok(self
            .current_mut("add_composition_to_array")?
            .add_composition_to_array(slot, child))
    }

    /// Opens a named composition scope: subsequent `get_param` calls prefer
    /// the path-qualified variant of each key.
    pub fn push_composition(&mut self, slot: &str) -> Result<()> {
        self.ensure_active("push_composition")?;
        self.composition_path.push(slot.to_string());
        Ok(())
    }

    /// Opens an index-qualified composition scope (`slot[index]`).
    pub fn push_composition_array(&mut self, slot: &str, index: usize) -> Result<()> {
        self.ensure_active("push_composition_array")?;
        self.composition_path.push(format!("{slot}[{index}]"));
        Ok(())
    }

    /// Closes the innermost composition scope. Every push must be balanced
    /// by a pop before `end_child`.
    pub fn pop_composition(&mut self) -> Result<()> {
        let Some(frame) = self.frames.last() else {
            return Err(WeftError::NoActiveNode("pop_composition"));
        };
        if self.composition_path.len() <= frame.composition_watermark {
            return Err(WeftError::UnbalancedComposition);
        }
        self.composition_path.pop();
        Ok(())
    }

    // ── Parameters ───────────────────────────────────────────────────────────

    /// Pushes a parameter scope; it shadows (never overwrites) outer scopes.
    pub fn push_parameters(&mut self, parameters: ParameterCollection) {
        self.scopes.push(parameters);
    }

    /// Pops the innermost user-pushed parameter scope, restoring visibility
    /// of outer values. The automatic per-child scope cannot be popped.
    pub fn pop_parameters(&mut self) -> Result<()> {
        let floor = self.frames.last().map_or(0, |f| f.scope_watermark + 1);
        if self.scopes.len() <= floor {
            return Err(WeftError::UnbalancedScope);
        }
        self.scopes.pop();
        Ok(())
    }

    /// Resolves a parameter value.
    ///
    /// The composition-path-qualified variant of the key is preferred over
    /// the bare key within each scope, searching innermost to outermost,
    /// then the global compiler parameters. A hit in the global collection
    /// is recorded into the current node's used parameters (this node only,
    /// not ancestors). A total miss yields the key's default and records
    /// nothing — scoped overrides are structural, already captured by the
    /// tree path.
    pub fn get_param<T: ParamType>(&mut self, key: &ParameterKey<T>) -> Result<T> {
        self.ensure_active("get_param")?;
        let composed = self.composed_key(key);

        for scope in self.scopes.iter().rev() {
            if let Some(ck) = &composed {
                if scope.contains(ck) {
                    return Ok(scope.get(ck));
                }
            }
            if scope.contains(key) {
                return Ok(scope.get(key));
            }
        }

        let global_key = match &composed {
            Some(ck) if self.compiler_parameters.contains(ck) => Some(ck.clone()),
            _ if self.compiler_parameters.contains(key) => Some(key.clone()),
            _ => None,
        };

        if let Some(gk) = global_key {
            let value: T = self.compiler_parameters.get(&gk);
            if let Some(node) = self.build_stack.last_mut() {
                node.used_parameters.set(&gk, value.clone());
            }
            return Ok(value);
        }

        Ok(key.default_value().clone())
    }

    /// Writes a value to the innermost active scope if one exists, else to
    /// the global compiler parameters. Always targets the bare key.
    pub fn set_param<T: ParamType>(&mut self, key: &ParameterKey<T>, value: T) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.set(key, value);
        } else {
            self.compiler_parameters.set(key, value);
        }
    }

    fn composed_key<T: ParamType>(&self, key: &ParameterKey<T>) -> Option<ParameterKey<T>> {
        if self.composition_path.is_empty() {
            None
        } else {
            Some(key.compose(&self.composition_path.join(".")))
        }
    }
}
