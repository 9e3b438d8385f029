use glam::{UVec2, Vec3, Vec4};

use crate::baked_data::page_texel_count;
use crate::error::{BakeError, Result};
use crate::host::{BakeHost, RenderedView};

pub const POSITION_TARGET: &str = "position";
pub const SMOOTH_POSITION_TARGET: &str = "smoothposition";
pub const FACE_NORMAL_TARGET: &str = "facenormal";
pub const SMOOTH_NORMAL_TARGET: &str = "smoothnormal";

pub const GBUFFER_TARGETS: [&str; 4] = [
    POSITION_TARGET,
    SMOOTH_POSITION_TARGET,
    FACE_NORMAL_TARGET,
    SMOOTH_NORMAL_TARGET,
];

const TEXEL_BYTES: usize = std::mem::size_of::<[f32; 4]>();

/// World-space attributes of every texel of one lightmap page.
///
/// `position.w` holds the id of the geometry covering the texel; 0 means no
/// receiver covers it.
#[derive(Debug, Clone, PartialEq)]
pub struct LightmapGBuffer {
    pub size: UVec2,
    pub position: Vec<Vec4>,
    pub smooth_position: Vec<Vec4>,
    pub face_normal: Vec<Vec4>,
    pub smooth_normal: Vec<Vec4>,
}

impl LightmapGBuffer {
    /// All texels uncovered.
    pub fn new(size: UVec2) -> Self {
        let texels = page_texel_count(size);
        Self {
            size,
            position: vec![Vec4::ZERO; texels],
            smooth_position: vec![Vec4::ZERO; texels],
            face_normal: vec![Vec4::ZERO; texels],
            smooth_normal: vec![Vec4::ZERO; texels],
        }
    }

    /// Reads the four G-buffer targets of `view` back from the host.
    pub fn capture<H: BakeHost + ?Sized>(host: &H, view: &RenderedView, size: UVec2) -> Result<Self> {
        let texels = page_texel_count(size);
        Ok(Self {
            size,
            position: read_target(host, view, POSITION_TARGET, texels)?,
            smooth_position: read_target(host, view, SMOOTH_POSITION_TARGET, texels)?,
            face_normal: read_target(host, view, FACE_NORMAL_TARGET, texels)?,
            smooth_normal: read_target(host, view, SMOOTH_NORMAL_TARGET, texels)?,
        })
    }

    pub fn texel_count(&self) -> usize {
        self.position.len()
    }

    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size.x as usize + x as usize
    }

    pub fn geometry_id(&self, index: usize) -> u32 {
        self.position[index].w as u32
    }

    pub fn is_covered(&self, index: usize) -> bool {
        self.geometry_id(index) != 0
    }

    pub fn covered_texels(&self) -> usize {
        (0..self.texel_count()).filter(|&i| self.is_covered(i)).count()
    }

    /// Writes one covered texel; used by hosts and tests that build buffers by hand.
    pub fn set_texel(&mut self, index: usize, geometry_id: u32, position: Vec3, normal: Vec3) {
        self.position[index] = position.extend(geometry_id as f32);
        self.smooth_position[index] = position.extend(1.0);
        self.face_normal[index] = normal.extend(1.0);
        self.smooth_normal[index] = normal.extend(1.0);
    }
}

fn read_target<H: BakeHost + ?Sized>(
    host: &H,
    view: &RenderedView,
    name: &str,
    texels: usize,
) -> Result<Vec<Vec4>> {
    let bytes = host.read_render_target(view, name)?;
    let expected = texels * TEXEL_BYTES;
    if bytes.len() != expected {
        return Err(BakeError::RenderTargetMismatch {
            name: name.to_string(),
            expected,
            actual: bytes.len(),
        });
    }

    Ok(bytes
        .chunks_exact(TEXEL_BYTES)
        .map(|texel| Vec4::from_array(bytemuck::pod_read_unaligned::<[f32; 4]>(texel)))
        .collect())
}
