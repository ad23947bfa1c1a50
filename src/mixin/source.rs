//! Mixin source trees.
//!
//! A [`MixinTree`] node represents one shader mixin instance: the ordered
//! fragment list to compile (the flattened inheritance chain), named
//! composition slots holding child trees, and the parameter key/value pairs
//! actually read while the node was built.
//!
//! Ownership flows strictly parent→child through the composition maps; the
//! ancestry breadcrumbs (`parent_path`, `parent_slot`) are plain strings
//! recorded for diagnostics and traversal, never for mutation, so the tree
//! can contain no ownership cycles.
//!
//! Composition slots live in `BTreeMap`s on purpose: sorted iteration is
//! what makes identity hashing independent of slot insertion order.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::params::collection::ParameterCollection;

/// Separator used when concatenating ancestor names into a qualified name.
pub const QUALIFIED_NAME_SEPARATOR: char = '.';

/// One fragment reference in a node's mixin list: a fragment name plus
/// optional generic arguments distinguishing specialized variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinFragment {
    /// Name of the shader source fragment.
    pub name: String,
    /// Compile-time arguments, in declaration order.
    pub generic_arguments: SmallVec<[String; 2]>,
}

impl MixinFragment {
    /// A fragment reference without generic arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generic_arguments: SmallVec::new(),
        }
    }

    /// A fragment reference with generic arguments.
    #[must_use]
    pub fn with_generics(name: impl Into<String>, generics: &[&str]) -> Self {
        Self {
            name: name.into(),
            generic_arguments: generics.iter().map(|g| (*g).to_string()).collect(),
        }
    }
}

/// One node of a mixin source tree.
///
/// Created when the context begins building a child, mutated only while it
/// is the current node on the build stack, and structurally immutable once
/// the child ends.
#[derive(Debug, Clone, Default)]
pub struct MixinTree {
    /// The effect/template this node instantiates; `None` for anonymous
    /// children.
    pub name: Option<String>,
    /// Ordered fragment list. Append-only during a single generation pass.
    pub mixins: Vec<MixinFragment>,
    /// Single-child composition slots. Re-adding a slot replaces the prior
    /// child (last write wins, never merges).
    pub compositions: BTreeMap<String, MixinTree>,
    /// Ordered multi-child composition slots.
    pub composition_arrays: BTreeMap<String, Vec<MixinTree>>,
    /// Qualified name of the enclosing node at build time. Lookup only.
    pub(crate) parent_path: Option<String>,
    /// Slot name under which this node was attached. Lookup only.
    pub(crate) parent_slot: Option<String>,
    /// Parameters actually read from the global collection while building
    /// this node; feeds identity hashing and diagnostics.
    pub used_parameters: ParameterCollection,
}

impl MixinTree {
    /// Creates an anonymous node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a named node.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Appends a literal fragment reference.
    pub fn add_fragment(&mut self, name: impl Into<String>) {
        self.mixins.push(MixinFragment::new(name));
    }

    /// Appends a fragment reference with generic arguments.
    pub fn add_fragment_with(&mut self, name: impl Into<String>, generics: &[&str]) {
        self.mixins.push(MixinFragment::with_generics(name, generics));
    }

    /// Sets the named single-child slot, replacing any prior child, and
    /// records the slot name on the child for traversal.
    pub fn add_composition(&mut self, slot: &str, mut child: MixinTree) {
        child.parent_slot = Some(slot.to_string());
        self.compositions.insert(slot.to_string(), child);
    }

    /// Appends to the slot's ordered array and returns the assigned
    /// zero-based index, used by callers to build `slot[index]` paths.
    pub fn add_composition_to_array(&mut self, slot: &str, mut child: MixinTree) -> usize {
        let children = self.composition_arrays.entry(slot.to_string()).or_default();
        let index = children.len();
        child.parent_slot = Some(format!("{slot}[{index}]"));
        children.push(child);
        index
    }

    /// Deletes every fragment in this node's own list whose name matches.
    /// Exact-name removal; compositions are not searched.
    pub fn remove_fragment(&mut self, name: &str) {
        self.mixins.retain(|f| f.name != name);
    }

    /// Copies another node's fragment list and composition maps into this
    /// node — mixin inheritance. Existing fragments are kept (the copy is
    /// appended); same-named composition slots are replaced. The copy is
    /// fully independent of `other`.
    pub fn inherit_from(&mut self, other: &MixinTree) {
        self.mixins.extend(other.mixins.iter().cloned());
        for (slot, child) in &other.compositions {
            self.compositions.insert(slot.clone(), child.clone());
        }
        for (slot, children) in &other.composition_arrays {
            self.composition_arrays
                .insert(slot.clone(), children.clone());
        }
    }

    /// Concatenates this node's name with all ancestor names, root-first,
    /// for diagnostics.
    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        match (&self.parent_path, &self.name) {
            (Some(path), Some(name)) => format!("{path}{QUALIFIED_NAME_SEPARATOR}{name}"),
            (Some(path), None) => path.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => String::new(),
        }
    }

    /// Slot name under which this node was attached, if any.
    #[must_use]
    pub fn parent_slot(&self) -> Option<&str> {
        self.parent_slot.as_deref()
    }
}

/// Structural equality: names, fragments and compositions, recursively.
/// Used-parameter bookkeeping and ancestry breadcrumbs do not participate.
impl PartialEq for MixinTree {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.mixins == other.mixins
            && self.compositions == other.compositions
            && self.composition_arrays == other.composition_arrays
    }
}
