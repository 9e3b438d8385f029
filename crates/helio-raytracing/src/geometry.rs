use crate::error::{RaytracingError, Result};
use glam::Vec3;

/// Dense id assigned by an acceleration structure, starting at 0 in attach order.
pub type GeometryId = u32;

/// World-space triangle soup handed to a tracer.
#[derive(Clone, Debug, Default)]
pub struct TriangleGeometry {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
}

impl TriangleGeometry {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        Self { vertices, indices }
    }

    /// Groups a flat triangle-list index buffer. Trailing indices that do not
    /// form a full triangle are dropped.
    pub fn from_triangle_list(vertices: Vec<Vec3>, indices: &[u32]) -> Self {
        let indices = indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect();
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(index) = self.vertices.iter().position(|v| !v.is_finite()) {
            return Err(RaytracingError::NonFiniteVertex(index));
        }

        let vertex_count = self.vertices.len();
        for (triangle, tri) in self.indices.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(RaytracingError::IndexOutOfRange {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.indices[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_index_is_rejected() {
        let geometry = TriangleGeometry::from_triangle_list(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            &[0, 1, 2, 0, 2, 5],
        );
        assert_eq!(
            geometry.validate(),
            Err(RaytracingError::IndexOutOfRange {
                triangle: 1,
                index: 5,
                vertex_count: 3
            })
        );
    }
}
