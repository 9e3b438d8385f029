//! Read-only snapshots of the scene nodes a baking session works on.

use glam::Vec3;
use helio_core::{Aabb, EntityId, HelioError, Light, LightType, Model, Scene, Transform};
use std::sync::Arc;

use crate::error::Result;
use crate::region::LightmapRegion;

/// A node that receives baked light, plus the region it was given.
#[derive(Debug, Clone)]
pub struct LightReceiver {
    pub entity: EntityId,
    pub transform: Transform,
    /// `None` when the node has no static model; such receivers are skipped.
    pub model: Option<Arc<Model>>,
    pub world_bounds: Aabb,
    pub region: Option<LightmapRegion>,
}

/// A node that only blocks light.
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub entity: EntityId,
    pub transform: Transform,
    pub model: Arc<Model>,
}

#[derive(Debug, Clone)]
pub struct LightSource {
    pub entity: EntityId,
    pub light: Light,
    /// World-space direction the light travels in.
    pub direction: Vec3,
}

pub fn gather_receivers(scene: &Scene, ids: &[EntityId]) -> Result<Vec<LightReceiver>> {
    ids.iter()
        .map(|&id| {
            let entity = scene.get_entity(id).ok_or(HelioError::EntityNotFound(id))?;
            let world_bounds = entity.world_bounds().unwrap_or_default();
            let model = entity.static_model.map(|static_model| static_model.model);
            if model.is_none() {
                log::warn!("Light receiver '{}' has no static model and will not be baked", entity.name);
            }
            Ok(LightReceiver {
                entity: id,
                transform: entity.transform,
                model,
                world_bounds,
                region: None,
            })
        })
        .collect()
}

/// Obstacles without a static model are dropped.
pub fn gather_obstacles(scene: &Scene, ids: &[EntityId]) -> Result<Vec<Obstacle>> {
    let mut obstacles = Vec::with_capacity(ids.len());
    for &id in ids {
        let entity = scene.get_entity(id).ok_or(HelioError::EntityNotFound(id))?;
        match entity.static_model {
            Some(static_model) => obstacles.push(Obstacle {
                entity: id,
                transform: entity.transform,
                model: static_model.model,
            }),
            None => log::warn!("Obstacle '{}' has no geometry", entity.name),
        }
    }
    Ok(obstacles)
}

pub fn gather_lights(scene: &Scene, ids: &[EntityId]) -> Result<Vec<LightSource>> {
    let mut lights = Vec::with_capacity(ids.len());
    for &id in ids {
        let entity = scene.get_entity(id).ok_or(HelioError::EntityNotFound(id))?;
        if let Some(light) = entity.light.clone() {
            lights.push(LightSource {
                entity: id,
                light,
                direction: entity.world_direction(),
            });
        }
    }
    Ok(lights)
}

/// Bounds of every receiver that has a model.
pub fn receivers_bounding_box(receivers: &[LightReceiver]) -> Aabb {
    let mut bounds = Aabb::EMPTY;
    for receiver in receivers.iter().filter(|receiver| receiver.model.is_some()) {
        bounds.merge(&receiver.world_bounds);
    }
    bounds
}

/// The first directional light wins; every other light is ignored.
pub fn first_directional_light(lights: &[LightSource]) -> Option<&LightSource> {
    lights
        .iter()
        .find(|source| source.light.light_type == LightType::Directional)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use helio_core::{primitives, Entity, StaticModel};

    #[test]
    fn first_directional_light_is_selected() {
        let mut scene = Scene::new();
        let point = scene.add_entity(Entity::new("point").with_light(Light::point(Vec3::ONE, 1.0, 10.0)));
        let sun = scene.add_entity(
            Entity::new("sun")
                .with_transform(Transform::default().with_rotation(Quat::from_rotation_x(-1.0)))
                .with_light(Light::directional(Vec3::ONE, 1.0)),
        );
        let moon = scene.add_entity(Entity::new("moon").with_light(Light::directional(Vec3::ONE, 0.1)));

        let lights = gather_lights(&scene, &[point, sun, moon]).unwrap();
        assert_eq!(lights.len(), 3);
        assert_eq!(first_directional_light(&lights).map(|l| l.entity), Some(sun));
    }

    #[test]
    fn unknown_entities_are_errors() {
        let scene = Scene::new();
        assert!(gather_receivers(&scene, &[42]).is_err());
    }

    #[test]
    fn bounding_box_skips_receivers_without_models() {
        let mut scene = Scene::new();
        let model = Arc::new(Model::from_mesh("cube", primitives::create_cube(2.0)));
        let cube = scene.add_entity(
            Entity::new("cube")
                .with_transform(Transform::from_position(Vec3::new(10.0, 0.0, 0.0)))
                .with_static_model(StaticModel::new(model)),
        );
        let empty = scene.add_entity(Entity::new("empty"));

        let receivers = gather_receivers(&scene, &[cube, empty]).unwrap();
        let bounds = receivers_bounding_box(&receivers);
        assert_eq!(bounds.min, Vec3::new(9.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(11.0, 1.0, 1.0));
    }
}
