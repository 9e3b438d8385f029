//! Lightmap pages and region placement.

use glam::{IVec2, UVec2};

use crate::area_allocator::AreaAllocator;
use crate::baking_scene::BakingScene;
use crate::error::{BakeError, Result};
use crate::host::RenderSurfaceId;
use crate::importer::calculate_model_lightmap_size;
use crate::receiver::LightReceiver;
use crate::region::LightmapRegion;
use crate::settings::LightmapBakingSettings;

/// One lightmap texture being packed and baked.
#[derive(Debug, Clone)]
pub struct LightmapDesc {
    allocator: AreaAllocator,
    dedicated: bool,
    pub(crate) baking_scene: BakingScene,
    pub(crate) render_surface: Option<RenderSurfaceId>,
}

impl LightmapDesc {
    fn new(width: i32, height: i32, dedicated: bool) -> Self {
        Self {
            allocator: AreaAllocator::new(width, height),
            dedicated,
            baking_scene: BakingScene::default(),
            render_surface: None,
        }
    }

    pub fn size(&self) -> UVec2 {
        self.allocator.size().as_uvec2()
    }

    /// Page created for a single region larger than a standard page.
    pub fn is_dedicated(&self) -> bool {
        self.dedicated
    }

    pub fn baking_scene(&self) -> &BakingScene {
        &self.baking_scene
    }

    pub fn render_surface(&self) -> Option<RenderSurfaceId> {
        self.render_surface
    }
}

/// Places a `size` footprint into the first page with room, creating a page
/// when none has.
///
/// Padding is reserved around the region on every side but is not part of the
/// returned rectangle. A footprint that does not fit a standard page once
/// padded gets an unpadded dedicated page of its own, its width rounded up to
/// `packet_width`.
pub fn allocate_lightmap_region(
    settings: &LightmapBakingSettings,
    pages: &mut Vec<LightmapDesc>,
    size: IVec2,
    packet_width: usize,
) -> Result<LightmapRegion> {
    let padding = settings.lightmap_padding as i32;
    let padded_size = size + IVec2::splat(2 * padding);
    let standard_size = UVec2::splat(settings.lightmap_size);

    for (index, page) in pages.iter_mut().enumerate() {
        if let Some(padded_position) = page.allocator.allocate(padded_size.x, padded_size.y) {
            let position = padded_position + IVec2::splat(padding);
            return Ok(LightmapRegion::new(index, position, size, standard_size));
        }
    }

    let index = pages.len();
    let lightmap_size = settings.lightmap_size as i32;

    if padded_size.x > lightmap_size || padded_size.y > lightmap_size {
        let packet_width = packet_width.max(1) as i32;
        let width = (size.x + packet_width - 1) / packet_width * packet_width;
        let mut page = LightmapDesc::new(width, size.y, true);

        let position = page.allocator.allocate(width, size.y);
        if position != Some(IVec2::ZERO) {
            return Err(BakeError::AllocatorInvariant(format!(
                "dedicated {width}x{} page rejected its own region",
                size.y
            )));
        }

        log::debug!("Lightmap {index}: dedicated {width}x{} page", size.y);
        let page_size = page.size();
        pages.push(page);
        return Ok(LightmapRegion::new(index, IVec2::ZERO, size, page_size));
    }

    let mut page = LightmapDesc::new(lightmap_size, lightmap_size, false);
    let padded_position = page.allocator.allocate(padded_size.x, padded_size.y);
    if padded_position != Some(IVec2::ZERO) {
        return Err(BakeError::AllocatorInvariant(format!(
            "fresh {lightmap_size}x{lightmap_size} page cannot hold a {}x{} padded region",
            padded_size.x, padded_size.y
        )));
    }

    log::debug!("Lightmap {index}: new {lightmap_size}x{lightmap_size} page");
    pages.push(page);
    Ok(LightmapRegion::new(index, IVec2::splat(padding), size, standard_size))
}

/// Assigns a region to every receiver that has a model, in receiver order.
pub fn allocate_lightmap_regions(
    settings: &LightmapBakingSettings,
    receivers: &mut [LightReceiver],
    pages: &mut Vec<LightmapDesc>,
    packet_width: usize,
) -> Result<()> {
    for receiver in receivers.iter_mut() {
        let Some(model) = receiver.model.as_ref() else {
            continue;
        };

        let size = calculate_model_lightmap_size(settings, model, receiver.transform.scale)?;
        let region = allocate_lightmap_region(settings, pages, size, packet_width)?;
        log::trace!(
            "Receiver {} -> lightmap {} at {:?} ({}x{})",
            receiver.entity,
            region.lightmap_index,
            region.texel_min,
            size.x,
            size.y
        );
        receiver.region = Some(region);
    }
    Ok(())
}
