//! Plane geometry.

use super::BufferGeometry;

/// A flat rectangle in the XZ plane facing +Y.
///
/// UVs span the full `[0, 1]` square with `v = 1` at the +Z edge, which makes
/// it the natural shadow-catcher surface.
#[derive(Debug, Clone, Copy)]
pub struct PlaneGeometry {
    /// Extent along X.
    pub width: f32,
    /// Extent along Z.
    pub height: f32,
    /// Width segments.
    pub width_segments: u32,
    /// Height segments.
    pub height_segments: u32,
}

impl Default for PlaneGeometry {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl PlaneGeometry {
    /// Create a single-quad plane.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            width_segments: 1,
            height_segments: 1,
        }
    }

    /// Create with segments.
    pub fn with_segments(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        Self {
            width,
            height,
            width_segments: width_segments.max(1),
            height_segments: height_segments.max(1),
        }
    }

    /// Build the attribute arrays.
    pub fn build(&self) -> BufferGeometry {
        let columns = self.width_segments + 1;
        let rows = self.height_segments + 1;
        let capacity = (columns * rows) as usize;

        let mut positions = Vec::with_capacity(capacity);
        let mut normals = Vec::with_capacity(capacity);
        let mut uvs = Vec::with_capacity(capacity);
        let mut indices = Vec::with_capacity((self.width_segments * self.height_segments * 6) as usize);

        let segment_width = self.width / self.width_segments as f32;
        let segment_height = self.height / self.height_segments as f32;

        for iy in 0..rows {
            let y = iy as f32 * segment_height - self.height / 2.0;
            for ix in 0..columns {
                let x = ix as f32 * segment_width - self.width / 2.0;
                positions.push([x, 0.0, -y]);
                normals.push([0.0, 1.0, 0.0]);
                uvs.push([
                    ix as f32 / self.width_segments as f32,
                    1.0 - iy as f32 / self.height_segments as f32,
                ]);
            }
        }

        for iy in 0..self.height_segments {
            for ix in 0..self.width_segments {
                let a = ix + columns * iy;
                let b = ix + columns * (iy + 1);
                let c = (ix + 1) + columns * (iy + 1);
                let d = (ix + 1) + columns * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        BufferGeometry::new()
            .with_positions(positions)
            .with_normals(normals)
            .with_uvs(uvs)
            .with_indices(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Attribute;

    #[test]
    fn test_plane_counts() {
        let geometry = PlaneGeometry::with_segments(2.0, 2.0, 2, 3).build();
        assert_eq!(geometry.vertex_count(), 3 * 4);
        assert_eq!(geometry.triangle_count(), 2 * 3 * 2);
        assert!(geometry.has_attribute(Attribute::Uv));
    }

    #[test]
    fn test_plane_extent() {
        let geometry = PlaneGeometry::new(4.0, 2.0).build();
        let (min, max) = geometry.bounding_box().unwrap();
        assert_eq!(min.to_array(), [-2.0, 0.0, -1.0]);
        assert_eq!(max.to_array(), [2.0, 0.0, 1.0]);
    }
}
