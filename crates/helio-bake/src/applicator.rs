use helio_core::Scene;

use crate::receiver::LightReceiver;

/// Binds every placed receiver's static model to its baked page.
///
/// Pages of this session follow `base_lightmap_index` existing lightmaps.
/// Running it again with the same inputs leaves the scene unchanged. Returns
/// how many receivers were updated.
pub fn apply_lightmaps_to_scene(scene: &Scene, receivers: &[LightReceiver], base_lightmap_index: u32) -> usize {
    let mut applied = 0;
    for receiver in receivers {
        let Some(region) = receiver.region.as_ref() else {
            continue;
        };

        let updated = scene.get_entity_mut(receiver.entity, |entity| {
            let Some(static_model) = entity.static_model.as_mut() else {
                return false;
            };
            static_model.lightmap = true;
            static_model.lightmap_index = base_lightmap_index + region.lightmap_index as u32;
            static_model.lightmap_scale_offset = region.scale_offset();
            true
        });

        match updated {
            Some(true) => applied += 1,
            Some(false) => log::warn!("Receiver {} lost its static model", receiver.entity),
            None => log::warn!("Receiver {} is no longer in the scene", receiver.entity),
        }
    }
    applied
}
