//! Scene module: meshes and the flat scene container renderers draw.

mod mesh;
mod scene;

pub use mesh::{Mesh, MeshRef};
pub use scene::Scene;
