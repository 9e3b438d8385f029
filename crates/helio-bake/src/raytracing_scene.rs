//! Occluder geometry for the tracer.

use glam::Mat4;
use helio_raytracing::{AccelerationStructure, TriangleGeometry};
use rayon::prelude::*;

use crate::error::{BakeError, Result};
use crate::importer::{ModelImportCache, ModelView};
use crate::receiver::Obstacle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RaytracingSceneStats {
    pub models: usize,
    pub geometries: usize,
    pub triangles: usize,
}

/// World-space triangle soup for every LOD of `view`, one geometry per LOD.
pub fn build_obstacle_geometries(view: &ModelView, world_transform: &Mat4) -> Vec<TriangleGeometry> {
    view.lods()
        .map(|lod| {
            let vertices = lod
                .positions
                .iter()
                .map(|&position| world_transform.transform_point3(position))
                .collect();
            TriangleGeometry::new(vertices, lod.faces.clone())
        })
        .collect()
}

/// Imports every obstacle model, builds world-space geometry for each node in
/// parallel, then attaches it all to `tracer` in obstacle order and commits.
pub fn cook_raytracing_scene<T: AccelerationStructure>(
    tracer: &mut T,
    obstacles: &[Obstacle],
    cache: &mut ModelImportCache,
) -> Result<RaytracingSceneStats> {
    let models = cache.import_models(obstacles.iter().map(|obstacle| &obstacle.model))?;

    let cache: &ModelImportCache = cache;
    let per_node = obstacles
        .par_iter()
        .map(|obstacle| {
            let view = cache.get(obstacle.model.id).ok_or_else(|| BakeError::InvalidModel {
                model: obstacle.model.name.clone(),
                reason: "missing from the import cache".to_string(),
            })?;
            Ok(build_obstacle_geometries(&view, &obstacle.transform.to_matrix()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut stats = RaytracingSceneStats {
        models,
        ..Default::default()
    };
    for geometry in per_node.into_iter().flatten() {
        stats.triangles += geometry.triangle_count();
        tracer.attach_geometry(geometry)?;
        stats.geometries += 1;
    }
    tracer.commit()?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use helio_core::{primitives, Geometry, Model, Transform};
    use helio_raytracing::{BvhScene, Ray};
    use std::sync::Arc;

    #[test]
    fn every_lod_of_every_node_is_attached() {
        let lods = Arc::new(Model::new(
            "lods",
            vec![Geometry::new(vec![primitives::create_cube(1.0), primitives::create_cube(0.5)])],
        ));
        let obstacles: Vec<Obstacle> = (0..3)
            .map(|i| Obstacle {
                entity: i + 1,
                transform: Transform::from_position(Vec3::new(i as f32 * 3.0, 0.0, 0.0)),
                model: Arc::clone(&lods),
            })
            .collect();

        let mut tracer = BvhScene::default();
        let mut cache = ModelImportCache::new();
        let stats = cook_raytracing_scene(&mut tracer, &obstacles, &mut cache).unwrap();

        assert_eq!(stats.models, 1);
        assert_eq!(stats.geometries, 6);
        assert_eq!(stats.triangles, 72);
        assert!(tracer.is_committed());
    }

    #[test]
    fn geometry_is_placed_in_world_space() {
        let cube = Arc::new(Model::from_mesh("cube", primitives::create_cube(2.0)));
        let obstacles = vec![Obstacle {
            entity: 1,
            transform: Transform::from_position(Vec3::new(0.0, 10.0, 0.0)),
            model: cube,
        }];

        let mut tracer = BvhScene::default();
        cook_raytracing_scene(&mut tracer, &obstacles, &mut ModelImportCache::new()).unwrap();

        let down = Ray::new(Vec3::new(0.0, 20.0, 0.0), Vec3::NEG_Y, 0.0, 100.0);
        let hit = tracer.intersect(&down).unwrap();
        assert!(hit.is_hit());
        assert!((hit.t - 9.0).abs() < 1e-4);

        let beside = Ray::new(Vec3::new(5.0, 20.0, 0.0), Vec3::NEG_Y, 0.0, 100.0);
        assert!(!tracer.occluded(&beside).unwrap());
    }
}
