//! Material module.
//!
//! The baker needs four kinds of surface appearance: ordinary lit
//! surfaces, an invisible shadow caster, the accumulation shader that
//! writes the light map, and the shadow catcher that displays it. Meshes
//! hold materials through a shared [`MaterialRef`] so the baker can swap
//! them in and out and restore the exact original reference afterwards.

mod accumulation;
mod discard;
mod shadow_catcher;
mod standard;

pub use accumulation::AccumulationMaterial;
pub use discard::DiscardMaterial;
pub use shadow_catcher::ShadowCatcherMaterial;
pub use standard::StandardMaterial;

use crate::core::Id;
use std::sync::{Arc, RwLock};

/// Shared, mutable material handle. Identity is `Arc::ptr_eq`.
pub type MaterialRef = Arc<RwLock<Material>>;

/// A surface material.
#[derive(Debug, Clone)]
pub enum Material {
    /// Lit diffuse surface.
    Standard(StandardMaterial),
    /// Shadow caster that writes no color.
    Discard(DiscardMaterial),
    /// Light-map accumulation (UV-space write).
    Accumulation(AccumulationMaterial),
    /// Shadow compositing over the baked texture.
    ShadowCatcher(ShadowCatcherMaterial),
}

impl Material {
    /// Get the unique ID.
    pub fn id(&self) -> Id {
        match self {
            Self::Standard(m) => m.id(),
            Self::Discard(m) => m.id(),
            Self::Accumulation(m) => m.id(),
            Self::ShadowCatcher(m) => m.id(),
        }
    }

    /// Short name for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Standard(_) => "standard",
            Self::Discard(_) => "discard",
            Self::Accumulation(_) => "accumulation",
            Self::ShadowCatcher(_) => "shadow-catcher",
        }
    }

    /// Wrap in a shared handle.
    pub fn into_ref(self) -> MaterialRef {
        Arc::new(RwLock::new(self))
    }

    /// Whether color passes produce fragments for this material.
    #[inline]
    pub fn writes_color(&self) -> bool {
        !matches!(self, Self::Discard(_))
    }
}

impl From<StandardMaterial> for Material {
    fn from(m: StandardMaterial) -> Self {
        Self::Standard(m)
    }
}

impl From<DiscardMaterial> for Material {
    fn from(m: DiscardMaterial) -> Self {
        Self::Discard(m)
    }
}

impl From<AccumulationMaterial> for Material {
    fn from(m: AccumulationMaterial) -> Self {
        Self::Accumulation(m)
    }
}

impl From<ShadowCatcherMaterial> for Material {
    fn from(m: ShadowCatcherMaterial) -> Self {
        Self::ShadowCatcher(m)
    }
}
