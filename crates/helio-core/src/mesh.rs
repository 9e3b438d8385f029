use crate::bounds::Aabb;
use crate::vertex::Vertex;
use glam::{Vec2, Vec3};

/// Indexed triangle list.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(
            &vertices.iter().map(Vertex::position).collect::<Vec<_>>(),
        );
        Self {
            vertices,
            indices,
            bounds,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

pub mod primitives {
    use super::*;

    /// Gutter between cube faces in the lightmap layout, in UV units.
    const CUBE_LIGHTMAP_GUTTER: f32 = 1.0 / 32.0;

    /// Axis-aligned cube centred on the origin.
    ///
    /// Lightmap UVs lay the six faces out in a 3x2 grid with a gutter around
    /// every cell so that neighbouring faces never share texels.
    pub fn create_cube(size: f32) -> Mesh {
        let h = size * 0.5;

        // (normal, u axis, v axis); u x v == normal keeps the winding CCW.
        let faces = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        ];
        let corners = [
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ];

        let cell_size = Vec2::new(1.0 / 3.0, 1.0 / 2.0);
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (face_index, (normal, u_axis, v_axis)) in faces.into_iter().enumerate() {
            let cell = Vec2::new((face_index % 3) as f32, (face_index / 3) as f32);
            let cell_min = cell * cell_size + Vec2::splat(CUBE_LIGHTMAP_GUTTER);
            let cell_extent = cell_size - Vec2::splat(2.0 * CUBE_LIGHTMAP_GUTTER);

            let base = vertices.len() as u32;
            for corner in corners {
                let position = (normal + u_axis * corner.x + v_axis * corner.y) * h;
                let tex_coords = (corner + Vec2::ONE) * 0.5;
                // Lightmap V grows downwards in texel space.
                let lightmap_coords = cell_min
                    + Vec2::new(tex_coords.x, 1.0 - tex_coords.y) * cell_extent;
                vertices.push(Vertex::new(position, normal, tex_coords, lightmap_coords));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Mesh::new(vertices, indices)
    }

    /// Subdivided plane in the XZ plane facing +Y. Lightmap UVs cover the whole
    /// unit square.
    pub fn create_plane(width: f32, depth: f32, subdivisions: u32) -> Mesh {
        let subdivisions = subdivisions.max(1);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for y in 0..=subdivisions {
            for x in 0..=subdivisions {
                let u = x as f32 / subdivisions as f32;
                let v = y as f32 / subdivisions as f32;

                let px = (u - 0.5) * width;
                let pz = (v - 0.5) * depth;

                vertices.push(Vertex::new(
                    Vec3::new(px, 0.0, pz),
                    Vec3::Y,
                    Vec2::new(u, v),
                    Vec2::new(u, v),
                ));
            }
        }

        for y in 0..subdivisions {
            for x in 0..subdivisions {
                let i0 = y * (subdivisions + 1) + x;
                let i1 = i0 + 1;
                let i2 = (y + 1) * (subdivisions + 1) + x;
                let i3 = i2 + 1;

                indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
            }
        }

        Mesh::new(vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::primitives::*;
    use approx::assert_relative_eq;

    fn face_normal(mesh: &super::Mesh, triangle: usize) -> glam::Vec3 {
        let a = mesh.vertices[mesh.indices[triangle * 3] as usize].position();
        let b = mesh.vertices[mesh.indices[triangle * 3 + 1] as usize].position();
        let c = mesh.vertices[mesh.indices[triangle * 3 + 2] as usize].position();
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn cube_winding_matches_vertex_normals() {
        let cube = create_cube(2.0);
        assert_eq!(cube.triangle_count(), 12);
        for triangle in 0..cube.triangle_count() {
            let expected = cube.vertices[cube.indices[triangle * 3] as usize].normal();
            let actual = face_normal(&cube, triangle);
            assert_relative_eq!(actual.dot(expected), 1.0, epsilon = 1e-5);
        }
        assert_relative_eq!(cube.bounds.size().x, 2.0);
    }

    #[test]
    fn cube_lightmap_coords_stay_inside_unit_square() {
        let cube = create_cube(1.0);
        for vertex in &cube.vertices {
            let uv = vertex.lightmap_coords();
            assert!(uv.x > 0.0 && uv.x < 1.0);
            assert!(uv.y > 0.0 && uv.y < 1.0);
        }
    }

    #[test]
    fn plane_faces_up() {
        let plane = create_plane(4.0, 4.0, 2);
        assert_eq!(plane.triangle_count(), 8);
        for triangle in 0..plane.triangle_count() {
            assert_relative_eq!(face_normal(&plane, triangle).y, 1.0, epsilon = 1e-5);
        }
    }
}
