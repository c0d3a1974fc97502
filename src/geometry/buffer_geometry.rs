//! CPU-side vertex attribute storage.

use super::Vertex;
use crate::core::Id;
use glam::Vec3;

/// Named vertex attributes a geometry may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Object-space positions.
    Position,
    /// Object-space normals.
    Normal,
    /// Primary texture coordinates.
    Uv,
    /// Secondary (light-map) texture coordinates.
    Uv2,
}

/// Indexed triangle geometry stored as separate attribute arrays.
///
/// Renderers upload it themselves; the geometry keeps no GPU state, so the
/// same instance can be shared by meshes drawn through different renderers.
#[derive(Debug, Clone)]
pub struct BufferGeometry {
    /// Unique ID.
    id: Id,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    uv2s: Vec<[f32; 2]>,
    indices: Option<Vec<u32>>,
    /// Object-space bounds (min, max), if there are positions.
    bounding_box: Option<(Vec3, Vec3)>,
}

impl BufferGeometry {
    /// Create an empty geometry.
    pub fn new() -> Self {
        Self {
            id: Id::new(),
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            uv2s: Vec::new(),
            indices: None,
            bounding_box: None,
        }
    }

    /// Set positions and recompute bounds.
    pub fn with_positions(mut self, positions: Vec<[f32; 3]>) -> Self {
        self.positions = positions;
        self.compute_bounding_box();
        self
    }

    /// Set normals.
    pub fn with_normals(mut self, normals: Vec<[f32; 3]>) -> Self {
        self.normals = normals;
        self
    }

    /// Set primary UVs.
    pub fn with_uvs(mut self, uvs: Vec<[f32; 2]>) -> Self {
        self.uvs = uvs;
        self
    }

    /// Set light-map UVs.
    pub fn with_uv2s(mut self, uv2s: Vec<[f32; 2]>) -> Self {
        self.uv2s = uv2s;
        self
    }

    /// Set the index list.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Whether an attribute is present with one entry per vertex.
    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        let count = self.positions.len();
        match attribute {
            Attribute::Position => count > 0,
            Attribute::Normal => count > 0 && self.normals.len() == count,
            Attribute::Uv => count > 0 && self.uvs.len() == count,
            Attribute::Uv2 => count > 0 && self.uv2s.len() == count,
        }
    }

    /// Positions.
    #[inline]
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Normals (may be empty).
    #[inline]
    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// Primary UVs (may be empty).
    #[inline]
    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    /// UVs used for light-map baking: `uv2` when present, else `uv`.
    pub fn lightmap_uvs(&self) -> Option<&[[f32; 2]]> {
        if self.has_attribute(Attribute::Uv2) {
            Some(&self.uv2s)
        } else if self.has_attribute(Attribute::Uv) {
            Some(&self.uvs)
        } else {
            None
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Index list, if indexed.
    #[inline]
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Iterate triangles as vertex index triples.
    ///
    /// Triangles referencing vertices past the end are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let count = self.positions.len();
        let tri_count = match &self.indices {
            Some(indices) => indices.len() / 3,
            None => count / 3,
        };
        (0..tri_count).filter_map(move |t| {
            let tri = match &self.indices {
                Some(indices) => [
                    indices[t * 3] as usize,
                    indices[t * 3 + 1] as usize,
                    indices[t * 3 + 2] as usize,
                ],
                None => [t * 3, t * 3 + 1, t * 3 + 2],
            };
            tri.iter().all(|&i| i < count).then_some(tri)
        })
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles().count()
    }

    /// Object-space bounding box.
    #[inline]
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        self.bounding_box
    }

    fn compute_bounding_box(&mut self) {
        self.bounding_box = self.positions.iter().fold(None, |acc, p| {
            let p = Vec3::from_array(*p);
            Some(match acc {
                None => (p, p),
                Some((min, max)) => (min.min(p), max.max(p)),
            })
        });
    }

    /// Interleave attributes for GPU upload.
    ///
    /// Missing normals default to +Y and missing UVs to zero; the UV slot
    /// carries the light-map UVs.
    pub fn interleaved(&self) -> Vec<Vertex> {
        let uvs = self.lightmap_uvs();
        let has_normals = self.has_attribute(Attribute::Normal);
        self.positions
            .iter()
            .enumerate()
            .map(|(i, position)| {
                let normal = if has_normals { self.normals[i] } else { [0.0, 1.0, 0.0] };
                let uv = uvs.map(|u| u[i]).unwrap_or([0.0, 0.0]);
                Vertex::new(*position, normal, uv)
            })
            .collect()
    }

    /// Index list for GPU upload; non-indexed geometry gets a sequential list.
    pub fn index_list(&self) -> Vec<u32> {
        self.triangles()
            .flat_map(|tri| tri.map(|i| i as u32))
            .collect()
    }
}

impl Default for BufferGeometry {
    fn default() -> Self {
        Self::new()
    }
}
