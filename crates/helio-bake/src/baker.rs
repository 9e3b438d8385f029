//! The baking session.

use glam::UVec2;
use helio_core::{Aabb, EntityId, Scene};
use helio_raytracing::{AccelerationStructure, BvhScene, RAY_PACKET_SIZE};
use std::time::Instant;

use crate::applicator;
use crate::baked_data::LightmapBakedData;
use crate::baking_scene::build_baking_scenes;
use crate::error::{BakeError, Result};
use crate::gbuffer::{LightmapGBuffer, GBUFFER_TARGETS};
use crate::host::{BakeHost, RenderPath};
use crate::importer::ModelImportCache;
use crate::integrator::{bake_direct_light, DirectLightParams};
use crate::page::{allocate_lightmap_regions, LightmapDesc};
use crate::raytracing_scene::{cook_raytracing_scene, RaytracingSceneStats};
use crate::receiver::{
    first_directional_light, gather_lights, gather_obstacles, gather_receivers,
    receivers_bounding_box, LightReceiver, LightSource, Obstacle,
};
use crate::settings::LightmapBakingSettings;

struct CapturedLightmap {
    index: usize,
    gbuffer: LightmapGBuffer,
}

/// Bakes static direct lighting for a set of receivers.
///
/// A session is driven in order: [`initialize`](Self::initialize) lays out
/// regions and baking scenes, [`cook_raytracing_scene`](Self::cook_raytracing_scene)
/// builds the occluder structure, then each page is captured with
/// [`render_lightmap_gbuffer`](Self::render_lightmap_gbuffer) and baked with
/// [`bake_lightmap`](Self::bake_lightmap). Pages are processed one at a time;
/// a capture replaces the previous one. [`bake_all`](Self::bake_all) runs the
/// page loop in one call.
pub struct LightmapBaker<T: AccelerationStructure = BvhScene> {
    settings: LightmapBakingSettings,
    receivers: Vec<LightReceiver>,
    obstacles: Vec<Obstacle>,
    lights: Vec<LightSource>,
    receivers_bounds: Aabb,
    max_ray_length: f32,
    lightmaps: Vec<LightmapDesc>,
    render_path: RenderPath,
    import_cache: ModelImportCache,
    tracer: Option<T>,
    captured: Option<CapturedLightmap>,
}

impl<T: AccelerationStructure> LightmapBaker<T> {
    /// Validates `settings`, snapshots the given nodes, allocates lightmap
    /// regions, loads the baking resources and builds one baking scene and
    /// render surface per page.
    pub fn initialize<H: BakeHost + ?Sized>(
        host: &mut H,
        settings: LightmapBakingSettings,
        scene: &Scene,
        receivers: &[EntityId],
        obstacles: &[EntityId],
        lights: &[EntityId],
    ) -> Result<Self> {
        settings.validate(RAY_PACKET_SIZE)?;

        let mut receivers = gather_receivers(scene, receivers)?;
        let obstacles = gather_obstacles(scene, obstacles)?;
        let lights = gather_lights(scene, lights)?;

        let mut lightmaps = Vec::new();
        allocate_lightmap_regions(&settings, &mut receivers, &mut lightmaps, RAY_PACKET_SIZE)?;

        let receivers_bounds = receivers_bounding_box(&receivers);
        let max_ray_length = receivers_bounds.size().length();

        let render_path = host.load_render_path(&settings.baking_render_path)?;
        if let Some(missing) = GBUFFER_TARGETS
            .iter()
            .find(|target| !render_path.has_render_target(target))
        {
            return Err(BakeError::ResourceLoad {
                kind: "render path",
                path: settings.baking_render_path.clone(),
                reason: format!("no '{missing}' render target"),
            });
        }
        let baking_material = host.load_material(&settings.baking_material)?;

        build_baking_scenes(&mut lightmaps, &receivers, &baking_material, &receivers_bounds)?;

        let standard_size = UVec2::splat(settings.lightmap_size);
        let mut shared_surface = None;
        for lightmap in &mut lightmaps {
            let size = lightmap.size();
            let surface = if size == standard_size {
                match shared_surface {
                    Some(surface) => surface,
                    None => {
                        let surface = host.create_render_surface(standard_size)?;
                        shared_surface = Some(surface);
                        surface
                    }
                }
            } else {
                host.create_render_surface(size)?
            };
            lightmap.render_surface = Some(surface);
        }

        log::info!(
            "Lightmap baking initialized: {} receivers on {} lightmaps, {} obstacles, {} lights",
            receivers.iter().filter(|receiver| receiver.region.is_some()).count(),
            lightmaps.len(),
            obstacles.len(),
            lights.len()
        );

        Ok(Self {
            settings,
            receivers,
            obstacles,
            lights,
            receivers_bounds,
            max_ray_length,
            lightmaps,
            render_path,
            import_cache: ModelImportCache::new(),
            tracer: None,
            captured: None,
        })
    }

    /// Builds the occluder structure into `tracer` and keeps it for baking.
    pub fn cook_raytracing_scene(&mut self, mut tracer: T) -> Result<RaytracingSceneStats> {
        let started = Instant::now();
        let stats = cook_raytracing_scene(&mut tracer, &self.obstacles, &mut self.import_cache)?;
        self.tracer = Some(tracer);

        log::info!(
            "Raytracing scene cooked: {} geometries, {} triangles from {} models in {:.2?}",
            stats.geometries,
            stats.triangles,
            stats.models,
            started.elapsed()
        );
        Ok(stats)
    }

    pub fn num_lightmaps(&self) -> usize {
        self.lightmaps.len()
    }

    pub fn lightmap_size(&self, index: usize) -> Result<UVec2> {
        self.lightmap(index).map(LightmapDesc::size)
    }

    pub fn lightmap(&self, index: usize) -> Result<&LightmapDesc> {
        self.lightmaps
            .get(index)
            .ok_or(BakeError::LightmapIndexOutOfRange {
                index,
                count: self.lightmaps.len(),
            })
    }

    pub fn settings(&self) -> &LightmapBakingSettings {
        &self.settings
    }

    pub fn receivers(&self) -> &[LightReceiver] {
        &self.receivers
    }

    pub fn receivers_bounds(&self) -> Aabb {
        self.receivers_bounds
    }

    pub fn max_ray_length(&self) -> f32 {
        self.max_ray_length
    }

    /// Page whose G-buffer is currently held, if any.
    pub fn current_lightmap_index(&self) -> Option<usize> {
        self.captured.as_ref().map(|captured| captured.index)
    }

    /// Renders page `index` and reads its G-buffer back.
    ///
    /// [`BakeError::FrameUnavailable`] leaves the session untouched; the page
    /// can be captured again later. Any other failure after the frame began
    /// drops the previous capture, so a following bake reports
    /// [`BakeError::NoCapturedLightmap`].
    pub fn render_lightmap_gbuffer<H: BakeHost + ?Sized>(&mut self, host: &mut H, index: usize) -> Result<()> {
        let lightmap = self.lightmap(index)?;
        let surface = lightmap.render_surface.ok_or_else(|| {
            BakeError::Host(format!("lightmap {index} has no render surface"))
        })?;

        if !host.begin_frame() {
            log::warn!("Could not begin a frame to capture lightmap {index}");
            return Err(BakeError::FrameUnavailable);
        }
        self.captured = None;
        let lightmap = &self.lightmaps[index];
        let rendered = host.render(surface, &self.render_path, &lightmap.baking_scene);
        host.end_frame();
        let view = rendered?;

        let gbuffer = LightmapGBuffer::capture(host, &view, lightmap.size())?;
        log::debug!(
            "Captured lightmap {index}: {} of {} texels covered",
            gbuffer.covered_texels(),
            gbuffer.texel_count()
        );

        self.captured = Some(CapturedLightmap { index, gbuffer });
        Ok(())
    }

    /// Bakes the page captured last.
    pub fn bake_lightmap(&self) -> Result<LightmapBakedData> {
        let captured = self.captured.as_ref().ok_or(BakeError::NoCapturedLightmap)?;
        let tracer = self.tracer.as_ref().ok_or(BakeError::RaytracingSceneNotCooked)?;

        let light = first_directional_light(&self.lights);
        if light.is_none() {
            log::warn!("No directional light among the bake lights; covered texels stay unlit");
        }

        let params = DirectLightParams {
            ray_direction: light.map(|source| -source.direction),
            max_ray_length: self.max_ray_length,
            num_chunks: self.settings.num_parallel_chunks,
        };

        let started = Instant::now();
        let data = bake_direct_light(&captured.gbuffer, tracer, &params)?;
        log::info!(
            "Baked lightmap {} ({}x{}) in {:.2?}",
            captured.index,
            data.size.x,
            data.size.y,
            started.elapsed()
        );
        Ok(data)
    }

    /// Captures and bakes every page in order.
    pub fn bake_all<H: BakeHost + ?Sized>(&mut self, host: &mut H) -> Result<Vec<LightmapBakedData>> {
        let mut baked = Vec::with_capacity(self.lightmaps.len());
        for index in 0..self.lightmaps.len() {
            self.render_lightmap_gbuffer(host, index)?;
            baked.push(self.bake_lightmap()?);
        }
        Ok(baked)
    }

    /// See [`applicator::apply_lightmaps_to_scene`].
    pub fn apply_lightmaps_to_scene(&self, scene: &Scene, base_lightmap_index: u32) -> usize {
        let applied = applicator::apply_lightmaps_to_scene(scene, &self.receivers, base_lightmap_index);
        log::info!("Applied lightmaps to {applied} receivers (base index {base_lightmap_index})");
        applied
    }
}
