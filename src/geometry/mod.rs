//! Geometry module for vertex data and primitives.

mod box_geometry;
mod buffer_geometry;
mod plane_geometry;
mod vertex;

pub use box_geometry::BoxGeometry;
pub use buffer_geometry::{Attribute, BufferGeometry};
pub use plane_geometry::PlaneGeometry;
pub use vertex::Vertex;
