//! Offscreen scenes that rasterize receivers into lightmap space.

use glam::Vec3;
use helio_core::{Aabb, Camera, EntityId, Material, Model, ShaderParameter, Transform};
use std::sync::Arc;

use crate::error::{BakeError, Result};
use crate::page::LightmapDesc;
use crate::receiver::LightReceiver;

/// Shader parameter holding a receiver's lightmap scale-offset.
pub const LIGHTMAP_SCALE_OFFSET_PARAMETER: &str = "LMOffset";

pub const BAKING_CAMERA_NEAR: f32 = 1.0;
/// Slack added to the baking view volume so receivers on its faces are not clipped.
pub const BAKING_VOLUME_EPSILON: f32 = 0.01;

/// A receiver as drawn by the baking scene: its world transform and a
/// private clone of the baking material.
#[derive(Debug, Clone)]
pub struct BakingInstance {
    pub entity: EntityId,
    pub model: Arc<Model>,
    pub transform: Transform,
    pub material: Material,
}

#[derive(Debug, Clone, Default)]
pub struct BakingScene {
    pub camera: Camera,
    pub instances: Vec<BakingInstance>,
}

impl BakingScene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            instances: Vec::new(),
        }
    }
}

/// Orthographic camera looking down -Z whose view volume encloses `bounds`.
pub fn baking_camera(bounds: &Aabb) -> Camera {
    let size = bounds.size();
    let center = bounds.center();

    let mut camera = Camera::new_orthographic(
        size.x + BAKING_VOLUME_EPSILON,
        size.y + BAKING_VOLUME_EPSILON,
        BAKING_CAMERA_NEAR,
        size.z + BAKING_CAMERA_NEAR + BAKING_VOLUME_EPSILON,
    );
    camera.position = Vec3::new(center.x, center.y, bounds.max.z + BAKING_CAMERA_NEAR);
    camera
}

/// Gives every page a camera framing `receivers_bounds` and one instance per
/// receiver placed on it, each with its own material clone carrying the
/// receiver's scale-offset.
pub fn build_baking_scenes(
    pages: &mut [LightmapDesc],
    receivers: &[LightReceiver],
    baking_material: &Material,
    receivers_bounds: &Aabb,
) -> Result<()> {
    let camera = baking_camera(receivers_bounds);
    for page in pages.iter_mut() {
        page.baking_scene = BakingScene::new(camera);
    }

    let page_count = pages.len();
    for receiver in receivers {
        let (Some(model), Some(region)) = (receiver.model.as_ref(), receiver.region.as_ref()) else {
            continue;
        };

        let page = pages.get_mut(region.lightmap_index).ok_or_else(|| {
            BakeError::AllocatorInvariant(format!(
                "receiver {} was assigned lightmap {} of {page_count}",
                receiver.entity, region.lightmap_index
            ))
        })?;

        let mut material = baking_material.clone();
        material.set_shader_parameter(
            LIGHTMAP_SCALE_OFFSET_PARAMETER,
            ShaderParameter::Vec4(region.scale_offset()),
        );

        page.baking_scene.instances.push(BakingInstance {
            entity: receiver.entity,
            model: Arc::clone(model),
            transform: receiver.transform,
            material,
        });
    }
    Ok(())
}
