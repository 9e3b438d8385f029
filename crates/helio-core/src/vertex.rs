use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Static mesh vertex. `lightmap_coords` is the second UV channel that lightmap
/// regions are mapped through.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub lightmap_coords: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, tex_coords: Vec2, lightmap_coords: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            tex_coords: tex_coords.to_array(),
            lightmap_coords: lightmap_coords.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }

    pub fn lightmap_coords(&self) -> Vec2 {
        Vec2::from_array(self.lightmap_coords)
    }
}
