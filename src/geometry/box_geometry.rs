//! Box geometry (rectangular cuboid).

use super::BufferGeometry;

/// A box centered on the origin, one quad per face.
#[derive(Debug, Clone, Copy)]
pub struct BoxGeometry {
    /// Width (X axis).
    pub width: f32,
    /// Height (Y axis).
    pub height: f32,
    /// Depth (Z axis).
    pub depth: f32,
}

impl Default for BoxGeometry {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// Accumulates face quads into attribute arrays.
#[derive(Default)]
struct FaceBuilder {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
}

impl FaceBuilder {
    /// Push one face. `u`, `v`, `w` are the axis indices spanning the face
    /// and its normal; `u_dir`/`v_dir` orient the UVs.
    #[allow(clippy::too_many_arguments)]
    fn face(
        &mut self,
        u: usize,
        v: usize,
        w: usize,
        u_dir: f32,
        v_dir: f32,
        size_u: f32,
        size_v: f32,
        offset: f32,
        normal: [f32; 3],
    ) {
        let base = self.positions.len() as u32;
        for iy in 0..=1u32 {
            let y = (iy as f32 * size_v - size_v / 2.0) * v_dir;
            for ix in 0..=1u32 {
                let x = (ix as f32 * size_u - size_u / 2.0) * u_dir;
                let mut position = [0.0f32; 3];
                position[u] = x;
                position[v] = y;
                position[w] = offset;
                self.positions.push(position);
                self.normals.push(normal);
                self.uvs.push([ix as f32, 1.0 - iy as f32]);
            }
        }
        let (a, b, c, d) = (base, base + 2, base + 3, base + 1);
        self.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }
}

impl BoxGeometry {
    /// Create a new box geometry.
    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self { width, height, depth }
    }

    /// Build the attribute arrays.
    pub fn build(&self) -> BufferGeometry {
        let (hw, hh, hd) = (self.width / 2.0, self.height / 2.0, self.depth / 2.0);
        let mut faces = FaceBuilder::default();

        faces.face(2, 1, 0, -1.0, -1.0, self.depth, self.height, hw, [1.0, 0.0, 0.0]);
        faces.face(2, 1, 0, 1.0, -1.0, self.depth, self.height, -hw, [-1.0, 0.0, 0.0]);
        faces.face(0, 2, 1, 1.0, 1.0, self.width, self.depth, hh, [0.0, 1.0, 0.0]);
        faces.face(0, 2, 1, 1.0, -1.0, self.width, self.depth, -hh, [0.0, -1.0, 0.0]);
        faces.face(0, 1, 2, 1.0, -1.0, self.width, self.height, hd, [0.0, 0.0, 1.0]);
        faces.face(0, 1, 2, -1.0, -1.0, self.width, self.height, -hd, [0.0, 0.0, -1.0]);

        BufferGeometry::new()
            .with_positions(faces.positions)
            .with_normals(faces.normals)
            .with_uvs(faces.uvs)
            .with_indices(faces.indices)
    }
}
