//! Mixin Composition & Identity Tests
//!
//! Tests for:
//! - MixinRegistry: generation through registered generators, snapshot
//!   semantics, last-registration-wins, lookup misses
//! - MixinContext: composition slots, nested children, stack discipline,
//!   depth limiting, the generic-arguments-on-generator restriction
//! - MixinIdentityHasher: equal ids for independently generated equal
//!   permutations, sensitivity to structure and fixed-subset parameters

use weft::params::well_known::{EFFECT_DEBUG, GRAPHICS_PROFILE};
use weft::{
    GraphicsProfile, MixinContext, MixinIdentityHasher, MixinRegistry, MixinTree,
    ParameterCollection, Result, WeftError,
};

fn fragment_names(tree: &MixinTree) -> Vec<&str> {
    tree.mixins.iter().map(|f| f.name.as_str()).collect()
}

fn simple_registry() -> MixinRegistry {
    let registry = MixinRegistry::new();
    registry.register("Simple", |ctx: &mut MixinContext| {
        ctx.mixin("Base")?;
        ctx.mixin("Feature")
    });
    registry
}

// ============================================================================
// Registry & Generation
// ============================================================================

#[test]
fn simple_effect_appends_fragments_in_order() {
    let registry = simple_registry();
    let tree = registry
        .generate("Simple", &ParameterCollection::new())
        .unwrap();

    assert_eq!(tree.name.as_deref(), Some("Simple"));
    assert_eq!(fragment_names(&tree), ["Base", "Feature"]);
    assert!(tree.compositions.is_empty());
}

#[test]
fn unregistered_effect_is_a_lookup_miss() {
    let registry = MixinRegistry::new();

    let err = registry
        .generate("Typo", &ParameterCollection::new())
        .unwrap_err();
    assert!(matches!(err, WeftError::GeneratorNotFound(name) if name == "Typo"));
}

#[test]
fn second_registration_wins() {
    let registry = MixinRegistry::new();
    registry.register("Effect", |ctx: &mut MixinContext| ctx.mixin("Old"));
    registry.register("Effect", |ctx: &mut MixinContext| ctx.mixin("New"));

    let tree = registry
        .generate("Effect", &ParameterCollection::new())
        .unwrap();
    assert_eq!(fragment_names(&tree), ["New"]);
}

#[test]
fn unregister_all_empties_the_registry() {
    let registry = simple_registry();
    assert!(registry.contains("Simple"));
    assert!(registry.try_get("Simple").is_some());

    registry.unregister_all();
    assert!(!registry.contains("Simple"));
    assert!(registry.try_get("Simple").is_none());
}

#[test]
fn generators_recurse_through_mixin_calls() {
    let registry = MixinRegistry::new();
    registry.register("Leaf", |ctx: &mut MixinContext| ctx.mixin("LeafImpl"));
    registry.register("Composite", |ctx: &mut MixinContext| {
        ctx.mixin("Head")?;
        ctx.mixin("Leaf")?;
        ctx.mixin("Tail")
    });

    let tree = registry
        .generate("Composite", &ParameterCollection::new())
        .unwrap();
    assert_eq!(fragment_names(&tree), ["Head", "LeafImpl", "Tail"]);
}

// ============================================================================
// Compositions
// ============================================================================

#[test]
fn with_child_opens_and_closes_a_composition_slot() {
    let registry = MixinRegistry::new();
    registry.register("Base", |ctx: &mut MixinContext| ctx.mixin("BaseImpl"));
    registry.register("WithChild", |ctx: &mut MixinContext| {
        ctx.push_composition("Inner")?;
        ctx.begin_child(None)?;
        ctx.mixin("Base")?;
        let child = ctx.end_child()?;
        ctx.pop_composition()?;
        ctx.add_composition("Inner", child)?;

        // The path stack is balanced again: another slot can open freely.
        ctx.push_composition("Other")?;
        ctx.pop_composition()
    });

    let tree = registry
        .generate("WithChild", &ParameterCollection::new())
        .unwrap();

    assert_eq!(fragment_names(&tree.compositions["Inner"]), ["BaseImpl"]);
    assert!(!tree.compositions.contains_key("Other"));
}

#[test]
fn composition_arrays_assign_sequential_indices() {
    let registry = MixinRegistry::new();
    registry.register("Lit", |ctx: &mut MixinContext| {
        for light in ["Point", "Spot"] {
            ctx.begin_child(None)?;
            ctx.mixin(light)?;
            let child = ctx.end_child()?;
            let index = ctx.add_composition_to_array("Lights", child)?;
            ctx.push_composition_array("Lights", index)?;
            ctx.pop_composition()?;
        }
        Ok(())
    });

    let tree = registry
        .generate("Lit", &ParameterCollection::new())
        .unwrap();
    let lights = &tree.composition_arrays["Lights"];
    assert_eq!(fragment_names(&lights[0]), ["Point"]);
    assert_eq!(fragment_names(&lights[1]), ["Spot"]);
}

// ============================================================================
// Failure semantics
// ============================================================================

#[test]
fn end_child_more_times_than_begin_fails_cleanly() {
    let mut ctx = MixinContext::new(ParameterCollection::new());
    ctx.begin_child(Some("Fx")).unwrap();
    let _ = ctx.end_child().unwrap();

    assert!(matches!(ctx.end_child(), Err(WeftError::EndWithoutBegin)));

    // State is not corrupted: a new child can still be built.
    ctx.begin_child(Some("Again")).unwrap();
    ctx.mixin("Base").unwrap();
    let tree = ctx.end_child().unwrap();
    assert_eq!(fragment_names(&tree), ["Base"]);
}

#[test]
fn generics_on_generator_fails_naming_the_effect() {
    let registry = MixinRegistry::new();
    registry.register("Child", |ctx: &mut MixinContext| ctx.mixin("ChildImpl"));
    registry.register("Parent", |ctx: &mut MixinContext| {
        ctx.mixin_with("Child", &["4"])
    });

    let err = registry
        .generate("Parent", &ParameterCollection::new())
        .unwrap_err();
    assert!(matches!(err, WeftError::GenericsOnGenerator { effect } if effect == "Child"));
}

#[test]
fn empty_mixin_name_fails() {
    let registry = MixinRegistry::new();
    registry.register("Bad", |ctx: &mut MixinContext| ctx.mixin(""));

    let err = registry
        .generate("Bad", &ParameterCollection::new())
        .unwrap_err();
    assert!(matches!(err, WeftError::EmptyMixinName));
}

#[test]
fn unbounded_recursion_hits_the_depth_limit() {
    fn recurse(ctx: &mut MixinContext) -> Result<()> {
        ctx.begin_child(None)?;
        ctx.mixin("Recur")?;
        let child = ctx.end_child()?;
        ctx.add_composition("Next", child)
    }

    let registry = MixinRegistry::new();
    registry.register("Recur", recurse);

    let err = registry
        .generate("Recur", &ParameterCollection::new())
        .unwrap_err();
    assert!(matches!(err, WeftError::DepthLimitExceeded { .. }));
}

#[test]
fn cyclic_generator_dispatch_hits_the_depth_limit() {
    // A generator cycle through `mixin` never touches the build stack, so
    // dispatch depth is counted on its own.
    let registry = MixinRegistry::new();
    registry.register("Loop", |ctx: &mut MixinContext| ctx.mixin("Loop"));

    let err = registry
        .generate("Loop", &ParameterCollection::new())
        .unwrap_err();
    assert!(matches!(err, WeftError::DepthLimitExceeded { .. }));
}

#[test]
fn mutual_generator_cycle_hits_the_depth_limit() {
    let registry = MixinRegistry::new();
    registry.register("Ping", |ctx: &mut MixinContext| ctx.mixin("Pong"));
    registry.register("Pong", |ctx: &mut MixinContext| ctx.mixin("Ping"));

    let err = registry
        .generate("Ping", &ParameterCollection::new())
        .unwrap_err();
    assert!(matches!(err, WeftError::DepthLimitExceeded { .. }));
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn independently_generated_equal_permutations_share_an_id() {
    let registry = simple_registry();
    let hasher = MixinIdentityHasher::new();
    let params = ParameterCollection::new();

    let first = registry.generate("Simple", &params).unwrap();
    let second = registry.generate("Simple", &params).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.used_parameters, second.used_parameters);

    let id_a = hasher.compute(&first, &first.used_parameters);
    let id_b = hasher.compute(&second, &second.used_parameters);
    assert_eq!(id_a, id_b);
}

#[test]
fn used_profile_distinguishes_permutations() {
    let registry = MixinRegistry::new();
    registry.register("Profiled", |ctx: &mut MixinContext| {
        let profile = ctx.get_param(&GRAPHICS_PROFILE)?;
        if profile >= GraphicsProfile::Level11_0 {
            ctx.mixin("FancyPath")
        } else {
            ctx.mixin("FallbackPath")
        }
    });
    let hasher = MixinIdentityHasher::new();

    let mut low = ParameterCollection::new();
    low.set(&GRAPHICS_PROFILE, GraphicsProfile::Level9_1);
    let mut high = ParameterCollection::new();
    high.set(&GRAPHICS_PROFILE, GraphicsProfile::Level11_0);

    let low_tree = registry.generate("Profiled", &low).unwrap();
    let high_tree = registry.generate("Profiled", &high).unwrap();

    assert_eq!(fragment_names(&low_tree), ["FallbackPath"]);
    assert_eq!(fragment_names(&high_tree), ["FancyPath"]);
    assert_ne!(
        hasher.compute(&low_tree, &low_tree.used_parameters),
        hasher.compute(&high_tree, &high_tree.used_parameters),
    );
}

#[test]
fn unread_debug_flag_does_not_split_the_cache() {
    // The flag sits in the compiler parameters but no generator reads it,
    // so it never lands in used_parameters and must not perturb the id.
    let registry = simple_registry();
    let hasher = MixinIdentityHasher::new();

    let plain = ParameterCollection::new();
    let mut with_flag = ParameterCollection::new();
    with_flag.set(&EFFECT_DEBUG, true);

    let a = registry.generate("Simple", &plain).unwrap();
    let b = registry.generate("Simple", &with_flag).unwrap();

    assert_eq!(
        hasher.compute(&a, &a.used_parameters),
        hasher.compute(&b, &b.used_parameters),
    );
}

#[test]
fn read_debug_flag_splits_the_cache() {
    let registry = MixinRegistry::new();
    registry.register("Debuggable", |ctx: &mut MixinContext| {
        let _ = ctx.get_param(&EFFECT_DEBUG)?;
        ctx.mixin("Base")
    });
    let hasher = MixinIdentityHasher::new();

    let plain = ParameterCollection::new();
    let mut with_flag = ParameterCollection::new();
    with_flag.set(&EFFECT_DEBUG, true);

    let a = registry.generate("Debuggable", &plain).unwrap();
    let b = registry.generate("Debuggable", &with_flag).unwrap();

    // Same structure, but the flag was actually read from the globals in
    // one run, so the reduced snapshots differ.
    assert_eq!(a, b);
    assert_ne!(
        hasher.compute(&a, &a.used_parameters),
        hasher.compute(&b, &b.used_parameters),
    );
}
