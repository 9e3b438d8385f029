use crate::bounds::Aabb;
use crate::light::Light;
use crate::material::Material;
use crate::model::Model;
use crate::Transform;
use glam::{Vec3, Vec4};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub type EntityId = u64;

/// Renderable component drawing a shared [`Model`].
#[derive(Debug, Clone)]
pub struct StaticModel {
    pub model: Arc<Model>,
    pub material: Option<Material>,
    pub lightmap: bool,
    pub lightmap_index: u32,
    /// `(scale.x, scale.y, offset.x, offset.y)` applied to the lightmap UV channel.
    pub lightmap_scale_offset: Vec4,
}

impl StaticModel {
    pub fn new(model: Arc<Model>) -> Self {
        Self {
            model,
            material: None,
            lightmap: false,
            lightmap_index: 0,
            lightmap_scale_offset: Vec4::new(1.0, 1.0, 0.0, 0.0),
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn world_bounds(&self, transform: &Transform) -> Aabb {
        self.model.bounds.transform(&transform.to_matrix())
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub static_model: Option<StaticModel>,
    pub light: Option<Light>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            transform: Transform::default(),
            visible: true,
            static_model: None,
            light: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_static_model(mut self, static_model: StaticModel) -> Self {
        self.static_model = Some(static_model);
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    pub fn world_direction(&self) -> Vec3 {
        self.transform.forward()
    }

    pub fn world_bounds(&self) -> Option<Aabb> {
        self.static_model
            .as_ref()
            .map(|static_model| static_model.world_bounds(&self.transform))
    }
}

pub struct Scene {
    entities: Arc<RwLock<HashMap<EntityId, Entity>>>,
    next_entity_id: Arc<RwLock<EntityId>>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
            next_entity_id: Arc::new(RwLock::new(1)),
        }
    }

    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        let mut next_id = self.next_entity_id.write();
        entity.id = *next_id;
        *next_id += 1;

        let id = entity.id;
        self.entities.write().insert(id, entity);
        id
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.write().remove(&id)
    }

    pub fn get_entity(&self, id: EntityId) -> Option<Entity> {
        self.entities.read().get(&id).cloned()
    }

    pub fn get_entity_mut<F, R>(&self, id: EntityId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Entity) -> R,
    {
        let mut entities = self.entities.write();
        entities.get_mut(&id).map(f)
    }

    pub fn for_each_entity<F>(&self, mut f: F)
    where
        F: FnMut(&Entity),
    {
        let entities = self.entities.read();
        for entity in entities.values() {
            f(entity);
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.read().len()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
