//! Unique identifiers for meshes, materials, and geometry.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter. Zero is never handed out.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for engine objects.
///
/// Renderers use it as a cache key (uploaded geometry, per-material
/// pipelines), so two objects never share an id even across scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u64);

impl Id {
    /// Allocate a fresh id.
    #[inline]
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
