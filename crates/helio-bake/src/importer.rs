//! Model import into the normalized view tracers and UV heuristics read.

use glam::{IVec2, Vec2, Vec3};
use helio_core::{AssetId, HelioError, Mesh, Model};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{BakeError, Result};
use crate::settings::LightmapBakingSettings;

/// One LOD as parallel vertex attribute arrays plus face triples.
#[derive(Debug, Clone, Default)]
pub struct LodView {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub lightmap_uvs: Vec<Vec2>,
    pub faces: Vec<[u32; 3]>,
}

impl LodView {
    fn import(model_name: &str, mesh: &Mesh) -> Result<Self> {
        let vertex_count = mesh.vertices.len();
        let trailing = mesh.indices.len() % 3;
        if trailing != 0 {
            log::debug!("Model '{model_name}': dropping {trailing} trailing indices");
        }

        let mut faces = Vec::with_capacity(mesh.indices.len() / 3);
        for triangle in mesh.indices.chunks_exact(3) {
            if let Some(&index) = triangle.iter().find(|&&index| index as usize >= vertex_count) {
                return Err(BakeError::InvalidModel {
                    model: model_name.to_string(),
                    reason: format!("index {index} exceeds vertex count {vertex_count}"),
                });
            }
            faces.push([triangle[0], triangle[1], triangle[2]]);
        }

        Ok(Self {
            positions: mesh.vertices.iter().map(|v| v.position()).collect(),
            normals: mesh.vertices.iter().map(|v| v.normal()).collect(),
            lightmap_uvs: mesh.vertices.iter().map(|v| v.lightmap_coords()).collect(),
            faces,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeometryView {
    pub lods: Vec<LodView>,
}

#[derive(Debug, Clone)]
pub struct ModelView {
    pub model_id: AssetId,
    pub name: String,
    pub geometries: Vec<GeometryView>,
}

impl ModelView {
    pub fn import(model: &Model) -> Result<Self> {
        let geometries = model
            .geometries
            .iter()
            .map(|geometry| {
                let lods = geometry
                    .lods
                    .iter()
                    .map(|mesh| LodView::import(&model.name, mesh))
                    .collect::<Result<Vec<_>>>()?;
                Ok(GeometryView { lods })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            model_id: model.id,
            name: model.name.clone(),
            geometries,
        })
    }

    pub fn lods(&self) -> impl Iterator<Item = &LodView> {
        self.geometries.iter().flat_map(|geometry| geometry.lods.iter())
    }

    pub fn triangle_count(&self) -> usize {
        self.lods().map(|lod| lod.faces.len()).sum()
    }
}

/// Imported views keyed by source model, shared by every node using that model.
#[derive(Debug, Default)]
pub struct ModelImportCache {
    views: HashMap<AssetId, Arc<ModelView>>,
}

impl ModelImportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AssetId) -> Option<Arc<ModelView>> {
        self.views.get(&id).cloned()
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.views.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Imports every model not cached yet. Parsing runs in parallel; the cache
    /// itself is only written afterwards on the calling thread.
    pub fn import_models<'a>(&mut self, models: impl IntoIterator<Item = &'a Arc<Model>>) -> Result<usize> {
        let mut queued = HashSet::new();
        let pending: Vec<&Arc<Model>> = models
            .into_iter()
            .filter(|model| !self.views.contains_key(&model.id) && queued.insert(model.id))
            .collect();

        let parsed = pending
            .par_iter()
            .map(|model| ModelView::import(model))
            .collect::<Result<Vec<_>>>()?;

        let imported = parsed.len();
        for view in parsed {
            log::trace!(
                "Imported model '{}' ({} triangles)",
                view.name,
                view.triangle_count()
            );
            self.views.insert(view.model_id, Arc::new(view));
        }
        Ok(imported)
    }
}

/// Footprint of `model` in texels once placed with `world_scale`.
///
/// The nominal size stored in the model's metadata is rescaled by the node's
/// average scale and by the ratio of the session's texel density to the one
/// the nominal size was computed for, never going below `min_lightmap_scale`.
pub fn calculate_model_lightmap_size(
    settings: &LightmapBakingSettings,
    model: &Model,
    world_scale: Vec3,
) -> Result<IVec2> {
    let nominal = model.lightmap_size().map_err(metadata_error)?;
    let density = model.lightmap_density().map_err(metadata_error)?;

    let node_scale = world_scale.dot(Vec3::splat(1.0 / 3.0));
    let rescale = node_scale * settings.texel_density as f32 / density as f32;
    let scale = settings.min_lightmap_scale.max(rescale);

    Ok((nominal.as_vec2() * scale).ceil().as_ivec2())
}

fn metadata_error(error: HelioError) -> BakeError {
    match error {
        HelioError::MissingMetadata { model, key } | HelioError::InvalidMetadata { model, key } => {
            BakeError::MissingModelMetadata { model, key }
        }
        other => BakeError::Core(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec2;
    use helio_core::{primitives, Geometry, Vertex};

    fn cube_model() -> Arc<Model> {
        Arc::new(
            Model::from_mesh("cube", primitives::create_cube(1.0))
                .with_lightmap_metadata(UVec2::new(64, 32), 32),
        )
    }

    #[test]
    fn footprint_scales_with_node_scale_and_density() {
        let settings = LightmapBakingSettings::default().with_texel_density(64);
        let model = cube_model();

        let size = calculate_model_lightmap_size(&settings, &model, Vec3::splat(1.5)).unwrap();
        assert_eq!(size, IVec2::new(192, 96));

        let size = calculate_model_lightmap_size(&settings, &model, Vec3::new(0.9, 1.2, 1.5)).unwrap();
        assert_eq!(size, IVec2::new(154, 77));
    }

    #[test]
    fn footprint_respects_minimum_scale() {
        let settings = LightmapBakingSettings::default()
            .with_texel_density(8)
            .with_min_lightmap_scale(0.5);
        let size = calculate_model_lightmap_size(&settings, &cube_model(), Vec3::ONE).unwrap();
        assert_eq!(size, IVec2::new(32, 16));
    }

    #[test]
    fn footprint_rounds_up() {
        let settings = LightmapBakingSettings::default().with_texel_density(32);
        let model = Model::from_mesh("odd", primitives::create_cube(1.0))
            .with_lightmap_metadata(UVec2::new(10, 10), 32);
        let size = calculate_model_lightmap_size(&settings, &model, Vec3::splat(1.05)).unwrap();
        assert_eq!(size, IVec2::new(11, 11));
    }

    #[test]
    fn missing_metadata_is_reported() {
        let model = Model::from_mesh("bare", primitives::create_cube(1.0));
        let result = calculate_model_lightmap_size(&LightmapBakingSettings::default(), &model, Vec3::ONE);
        assert!(matches!(result, Err(BakeError::MissingModelMetadata { .. })));
    }

    #[test]
    fn shared_models_are_imported_once() {
        let cube = cube_model();
        let plane = Arc::new(Model::from_mesh("plane", primitives::create_plane(2.0, 2.0, 1)));
        let mut cache = ModelImportCache::new();

        let imported = cache.import_models([&cube, &plane, &cube]).unwrap();
        assert_eq!(imported, 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(cube.id).map(|view| view.triangle_count()), Some(12));

        assert_eq!(cache.import_models([&cube]).unwrap(), 0);
    }

    #[test]
    fn bad_indices_fail_import() {
        let vertex = Vertex::new(Vec3::ZERO, Vec3::Y, Vec2::ZERO, Vec2::ZERO);
        let mesh = Mesh::new(vec![vertex; 3], vec![0, 1, 7]);
        let model = Model::new("broken", vec![Geometry::new(vec![mesh])]);
        assert!(matches!(
            ModelView::import(&model),
            Err(BakeError::InvalidModel { .. })
        ));
    }

    #[test]
    fn trailing_indices_are_dropped() {
        let vertex = Vertex::new(Vec3::ZERO, Vec3::Y, Vec2::ZERO, Vec2::ZERO);
        let mesh = Mesh::new(vec![vertex; 3], vec![0, 1, 2, 0]);
        let model = Model::new("ragged", vec![Geometry::new(vec![mesh])]);
        assert_eq!(ModelView::import(&model).unwrap().triangle_count(), 1);
    }
}
