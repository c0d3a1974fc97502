//! Progressive light-map baking.
//!
//! [`LightMapBaker`] is the entry point. It owns a pair of
//! [`AccumulationBuffers`], a pool of randomly placed directional lights and
//! the materials swapped onto the scene during a [`BakePass`].

mod baker;
mod buffers;
mod config;
mod pass;

pub use baker::{BakeState, LightMapBaker};
pub use buffers::AccumulationBuffers;
pub use config::BakeConfig;
pub use pass::{BakeMaterials, BakePass, BakeScope, PassParams, TrackedSurfaces};
