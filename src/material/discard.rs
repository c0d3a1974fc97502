//! Material that writes no color.

use crate::core::Id;

/// Discards every fragment in color passes.
///
/// Meshes wearing it still render into shadow maps, so they keep occluding
/// light while contributing nothing to the bound render target.
#[derive(Debug, Clone)]
pub struct DiscardMaterial {
    id: Id,
}

impl Default for DiscardMaterial {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscardMaterial {
    /// Create a new discard material.
    pub fn new() -> Self {
        Self { id: Id::new() }
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }
}
