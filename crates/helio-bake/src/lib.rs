//! Offline static lightmap baking for Helio.
//!
//! A [`LightmapBaker`] session packs every receiver's lightmap footprint into
//! pages, rasterizes each page's receivers into a world-space G-buffer through
//! a [`BakeHost`], and traces shadow rays from every covered texel towards the
//! first directional light. The resulting [`LightmapBakedData`] is handed to
//! the caller, and the page assignment is written back onto the scene.

pub mod applicator;
pub mod area_allocator;
pub mod baked_data;
pub mod baker;
pub mod baking_scene;
pub mod error;
pub mod gbuffer;
pub mod host;
pub mod importer;
pub mod integrator;
pub mod page;
pub mod raytracing_scene;
pub mod receiver;
pub mod region;
pub mod settings;
pub mod software_host;

pub use area_allocator::AreaAllocator;
pub use baked_data::LightmapBakedData;
pub use baker::LightmapBaker;
pub use baking_scene::{BakingInstance, BakingScene, LIGHTMAP_SCALE_OFFSET_PARAMETER};
pub use error::{BakeError, Result};
pub use gbuffer::LightmapGBuffer;
pub use host::{BakeHost, RenderPath, RenderSurfaceId, RenderedView};
pub use importer::{calculate_model_lightmap_size, ModelImportCache, ModelView};
pub use page::{allocate_lightmap_region, LightmapDesc};
pub use receiver::{LightReceiver, LightSource, Obstacle};
pub use region::LightmapRegion;
pub use settings::LightmapBakingSettings;
pub use software_host::{lightmap_baking_material, SoftwareBakeHost};
