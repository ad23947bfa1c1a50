//! Mixin identity hashing.
//!
//! Walks a finished mixin tree plus its used parameters and produces a
//! fixed-size content hash — the [`MixinId`] under which compiled bytecode
//! is cached. Two structurally equal trees with agreeing reduced-parameter
//! snapshots always hash to the same identity, regardless of process,
//! allocation order or prior hasher state:
//!
//! - composition slots are iterated in sorted order (the tree stores them
//!   in `BTreeMap`s), never in hash-table enumeration order;
//! - only the fixed subset of well-known keys (platform, profile, debug) is
//!   mixed in; unrelated parameter churn cannot perturb the identity;
//! - every record is tagged and strings are length-prefixed, so no two
//!   distinct structures serialize to the same byte stream.
//!
//! The hash is xxh3-128 — a content hash with a negligible collision rate
//! for this purpose, matching what the shader-module cache layer keys on.

use std::fmt;
use std::hash::Hasher;

use log::trace;
use parking_lot::Mutex;
use xxhash_rust::xxh3::xxh3_128;

use crate::mixin::source::{MixinFragment, MixinTree};
use crate::params::collection::ParameterCollection;
use crate::params::key::{ParamType, ParameterKey};
use crate::params::well_known::{EFFECT_DEBUG, GRAPHICS_PLATFORM, GRAPHICS_PROFILE};

/// Serialization format header; bump the trailing byte when the layout
/// below changes so stale cache entries cannot alias new ones.
const IDENTITY_MAGIC: &[u8; 4] = b"WMX\x01";

const TAG_NODE: u8 = 0x01;
const TAG_FRAGMENT: u8 = 0x02;
const TAG_COMPOSITIONS: u8 = 0x03;
const TAG_ARRAYS: u8 = 0x04;
const TAG_PARAM: u8 = 0x05;
const TAG_ABSENT: u8 = 0x00;

/// Fixed-size content identity of one shader permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MixinId(u128);

impl MixinId {
    /// The raw 128-bit value.
    #[inline]
    #[must_use]
    pub fn as_u128(self) -> u128 {
        self.0
    }

    /// The identity as 16 big-endian bytes, for embedding in cache file
    /// names or on-disk indices.
    #[inline]
    #[must_use]
    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for MixinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Computes permutation identities. Shared process-wide; the scratch buffer
/// is reused across calls and a single lock serializes one `compute` at a
/// time — hashing is not the bottleneck relative to shader compilation.
#[derive(Default)]
pub struct MixinIdentityHasher {
    scratch: Mutex<Vec<u8>>,
}

impl MixinIdentityHasher {
    /// Creates a hasher with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the identity of `tree` combined with the reduced snapshot of
    /// `used_parameters` (the fixed well-known subset only).
    #[must_use]
    pub fn compute(&self, tree: &MixinTree, used_parameters: &ParameterCollection) -> MixinId {
        let mut buf = self.scratch.lock();
        buf.clear();
        buf.extend_from_slice(IDENTITY_MAGIC);

        write_tree(&mut buf, tree);

        mix_param(&mut buf, used_parameters, &GRAPHICS_PLATFORM);
        mix_param(&mut buf, used_parameters, &GRAPHICS_PROFILE);
        mix_param(&mut buf, used_parameters, &EFFECT_DEBUG);

        let id = MixinId(xxh3_128(&buf));
        trace!(
            "identity {id} for '{}' over {} bytes",
            tree.fully_qualified_name(),
            buf.len()
        );
        id
    }
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn write_opt_str(buf: &mut Vec<u8>, s: Option<&str>) {
    match s {
        Some(s) => {
            buf.push(1);
            write_str(buf, s);
        }
        None => buf.push(TAG_ABSENT),
    }
}

fn write_fragment(buf: &mut Vec<u8>, fragment: &MixinFragment) {
    buf.push(TAG_FRAGMENT);
    write_str(buf, &fragment.name);
    buf.extend_from_slice(&(fragment.generic_arguments.len() as u32).to_le_bytes());
    for generic in &fragment.generic_arguments {
        write_str(buf, generic);
    }
}

fn write_tree(buf: &mut Vec<u8>, tree: &MixinTree) {
    buf.push(TAG_NODE);
    write_opt_str(buf, tree.name.as_deref());

    buf.extend_from_slice(&(tree.mixins.len() as u32).to_le_bytes());
    for fragment in &tree.mixins {
        write_fragment(buf, fragment);
    }

    buf.push(TAG_COMPOSITIONS);
    buf.extend_from_slice(&(tree.compositions.len() as u32).to_le_bytes());
    for (slot, child) in &tree.compositions {
        write_str(buf, slot);
        write_tree(buf, child);
    }

    buf.push(TAG_ARRAYS);
    buf.extend_from_slice(&(tree.composition_arrays.len() as u32).to_le_bytes());
    for (slot, children) in &tree.composition_arrays {
        write_str(buf, slot);
        buf.extend_from_slice(&(children.len() as u32).to_le_bytes());
        for child in children {
            write_tree(buf, child);
        }
    }
}

/// Mixes one well-known key into the buffer: presence flag, key name and
/// the value's bytes when present in the used-parameter set.
fn mix_param<T: ParamType>(
    buf: &mut Vec<u8>,
    used_parameters: &ParameterCollection,
    key: &ParameterKey<T>,
) {
    match used_parameters.get_raw(key.id()) {
        Some(value) => {
            buf.push(TAG_PARAM);
            write_str(buf, key.name());
            let mut sink = ByteSink(buf);
            value.hash_value(&mut sink);
        }
        None => buf.push(TAG_ABSENT),
    }
}

/// `Hasher` that appends every written byte to the scratch buffer, turning
/// a value's `Hash` impl into a deterministic byte serialization.
struct ByteSink<'a>(&'a mut Vec<u8>);

impl Hasher for ByteSink<'_> {
    fn finish(&self) -> u64 {
        0
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::well_known::GraphicsProfile;

    fn tree_with(fragments: &[&str]) -> MixinTree {
        let mut tree = MixinTree::named("Fx");
        for name in fragments {
            tree.add_fragment(*name);
        }
        tree
    }

    #[test]
    fn determinism_across_calls_and_hashers() {
        let hasher = MixinIdentityHasher::new();
        let tree = tree_with(&["Base", "Feature"]);
        let params = ParameterCollection::new();

        let a = hasher.compute(&tree, &params);
        let b = hasher.compute(&tree, &params);
        let c = MixinIdentityHasher::new().compute(&tree, &params);

        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn fragment_order_changes_identity() {
        let hasher = MixinIdentityHasher::new();
        let params = ParameterCollection::new();

        let ab = hasher.compute(&tree_with(&["A", "B"]), &params);
        let ba = hasher.compute(&tree_with(&["B", "A"]), &params);

        assert_ne!(ab, ba);
    }

    #[test]
    fn generic_arguments_change_identity() {
        let hasher = MixinIdentityHasher::new();
        let params = ParameterCollection::new();

        let mut plain = MixinTree::named("Fx");
        plain.add_fragment_with("Blur", &["4"]);
        let mut wider = MixinTree::named("Fx");
        wider.add_fragment_with("Blur", &["8"]);

        assert_ne!(
            hasher.compute(&plain, &params),
            hasher.compute(&wider, &params)
        );
    }

    #[test]
    fn composition_slot_content_changes_identity() {
        let hasher = MixinIdentityHasher::new();
        let params = ParameterCollection::new();

        let bare = tree_with(&["Base"]);

        let mut with_slot = tree_with(&["Base"]);
        with_slot.add_composition("Inner", tree_with(&["Child"]));

        let mut with_array = tree_with(&["Base"]);
        with_array.add_composition_to_array("Inner", tree_with(&["Child"]));

        let id_bare = hasher.compute(&bare, &params);
        let id_slot = hasher.compute(&with_slot, &params);
        let id_array = hasher.compute(&with_array, &params);

        assert_ne!(id_bare, id_slot);
        assert_ne!(id_bare, id_array);
        assert_ne!(id_slot, id_array);
    }

    #[test]
    fn unrelated_parameters_do_not_perturb_identity() {
        let hasher = MixinIdentityHasher::new();
        let tree = tree_with(&["Base"]);

        let empty = ParameterCollection::new();
        let mut noisy = ParameterCollection::new();
        noisy.set(&ParameterKey::new("Test.Identity.Noise", 42u32), 7);

        assert_eq!(hasher.compute(&tree, &empty), hasher.compute(&tree, &noisy));
    }

    #[test]
    fn fixed_subset_parameters_change_identity() {
        let hasher = MixinIdentityHasher::new();
        let tree = tree_with(&["Base"]);

        let empty = ParameterCollection::new();
        let mut debug = ParameterCollection::new();
        debug.set(&EFFECT_DEBUG, true);
        let mut profiled = ParameterCollection::new();
        profiled.set(&GRAPHICS_PROFILE, GraphicsProfile::Level11_0);

        let id_empty = hasher.compute(&tree, &empty);
        assert_ne!(id_empty, hasher.compute(&tree, &debug));
        assert_ne!(id_empty, hasher.compute(&tree, &profiled));
    }

    #[test]
    fn display_is_32_hex_digits() {
        let id = MixinIdentityHasher::new().compute(&tree_with(&["A"]), &ParameterCollection::new());
        let text = id.to_string();

        assert_eq!(text.len(), 32);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
