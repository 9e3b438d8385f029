//! The graphics side of a baking session.
//!
//! The baker never talks to a GPU directly. It asks a [`BakeHost`] to load
//! resources, render a baking scene with a render path, and hand back the raw
//! contents of the named render targets that render produced.

use glam::UVec2;
use helio_core::Material;

use crate::baking_scene::BakingScene;
use crate::error::Result;
use crate::gbuffer::GBUFFER_TARGETS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderSurfaceId(pub u32);

/// Handle to one finished render whose targets can be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedView {
    pub id: u64,
    pub size: UVec2,
}

/// A render path as far as the baker cares: the extra float targets it writes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPath {
    pub name: String,
    pub render_targets: Vec<String>,
}

impl RenderPath {
    pub fn new(name: impl Into<String>, render_targets: Vec<String>) -> Self {
        Self {
            name: name.into(),
            render_targets,
        }
    }

    /// Path writing the four lightmap G-buffer targets.
    pub fn lightmap_gbuffer(name: impl Into<String>) -> Self {
        Self::new(
            name,
            GBUFFER_TARGETS.iter().map(|target| target.to_string()).collect(),
        )
    }

    pub fn has_render_target(&self, name: &str) -> bool {
        self.render_targets.iter().any(|target| target == name)
    }
}

/// Resource loading and rendering services a baking session needs.
///
/// All calls happen on the thread that owns the session; rendering is never
/// issued concurrently.
pub trait BakeHost {
    fn load_render_path(&mut self, path: &str) -> Result<RenderPath>;

    fn load_material(&mut self, path: &str) -> Result<Material>;

    fn create_render_surface(&mut self, size: UVec2) -> Result<RenderSurfaceId>;

    /// `false` when no frame can be started, e.g. after device loss.
    fn begin_frame(&mut self) -> bool;

    fn end_frame(&mut self);

    /// Renders `scene` over the whole of `surface`.
    fn render(
        &mut self,
        surface: RenderSurfaceId,
        render_path: &RenderPath,
        scene: &BakingScene,
    ) -> Result<RenderedView>;

    /// Raw RGBA32F texels of render target `name`, row-major.
    fn read_render_target(&self, view: &RenderedView, name: &str) -> Result<Vec<u8>>;
}
