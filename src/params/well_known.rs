//! Well-known compiler parameters.
//!
//! The fixed, explicit subset of globally relevant keys that the identity
//! hasher mixes into a permutation identity: target platform, target
//! capability level, and the debug/optimization flag. Unrelated parameter
//! churn never perturbs an identity.

use once_cell::sync::Lazy;

use crate::params::key::ParameterKey;

/// Target graphics API a permutation is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsPlatform {
    Direct3D11,
    OpenGl,
    OpenGlEs,
    Vulkan,
}

/// Target capability level of the graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GraphicsProfile {
    Level9_1,
    Level9_3,
    Level10_0,
    Level10_1,
    Level11_0,
    Level11_2,
}

/// Target platform key. Identity-relevant.
pub static GRAPHICS_PLATFORM: Lazy<ParameterKey<GraphicsPlatform>> =
    Lazy::new(|| ParameterKey::new("Weft.GraphicsPlatform", GraphicsPlatform::Vulkan));

/// Target capability/profile level key. Identity-relevant.
pub static GRAPHICS_PROFILE: Lazy<ParameterKey<GraphicsProfile>> =
    Lazy::new(|| ParameterKey::new("Weft.GraphicsProfile", GraphicsProfile::Level10_0));

/// Debug/optimization flag key. Identity-relevant.
pub static EFFECT_DEBUG: Lazy<ParameterKey<bool>> =
    Lazy::new(|| ParameterKey::new("Weft.EffectDebug", false));
