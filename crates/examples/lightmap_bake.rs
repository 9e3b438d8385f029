//! Bakes direct-light lightmaps for a small courtyard and writes every page
//! as a PNG next to the working directory.
//!
//! Usage: `lightmap_bake [output-dir]`
//!
//! Set `RUST_LOG=info` (or `debug`) to follow the session.

use glam::{EulerRot, Quat, UVec2, Vec3};
use helio_bake::{LightmapBaker, LightmapBakingSettings, SoftwareBakeHost};
use helio_core::{primitives, Entity, EntityId, Light, Model, Scene, StaticModel, Transform};
use helio_raytracing::{BuildFlags, BvhScene};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Courtyard {
    scene: Scene,
    receivers: Vec<EntityId>,
    obstacles: Vec<EntityId>,
    lights: Vec<EntityId>,
}

fn build_courtyard() -> Courtyard {
    let mut scene = Scene::new();
    let mut receivers = Vec::new();
    let mut obstacles = Vec::new();

    let ground = Arc::new(
        Model::from_mesh("ground", primitives::create_plane(24.0, 24.0, 8))
            .with_lightmap_metadata(UVec2::splat(192), 8),
    );
    let ground = scene.add_entity(Entity::new("ground").with_static_model(StaticModel::new(ground)));
    receivers.push(ground);
    obstacles.push(ground);

    let crate_model = Arc::new(
        Model::from_mesh("crate", primitives::create_cube(2.0)).with_lightmap_metadata(UVec2::new(48, 32), 8),
    );
    let placements = [
        (Vec3::new(-6.0, 1.0, -4.0), 1.0),
        (Vec3::new(3.0, 1.5, 2.0), 1.5),
        (Vec3::new(7.0, 0.5, -7.0), 0.5),
        (Vec3::new(-2.0, 2.0, 6.0), 2.0),
    ];
    for (index, (position, scale)) in placements.into_iter().enumerate() {
        let transform = Transform::from_position(position)
            .with_rotation(Quat::from_rotation_y(0.3 * index as f32))
            .with_scale(Vec3::splat(scale));
        let id = scene.add_entity(
            Entity::new(format!("crate {index}"))
                .with_transform(transform)
                .with_static_model(StaticModel::new(crate_model.clone())),
        );
        receivers.push(id);
        obstacles.push(id);
    }

    let sun = scene.add_entity(
        Entity::new("sun")
            .with_transform(
                Transform::default().with_rotation(Quat::from_euler(EulerRot::YXZ, 0.6, -0.9, 0.0)),
            )
            .with_light(Light::directional(Vec3::new(1.0, 0.95, 0.85), 1.0)),
    );

    Courtyard {
        scene,
        receivers,
        obstacles,
        lights: vec![sun],
    }
}

fn main() {
    env_logger::init();

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("lightmaps"));

    if let Err(err) = run(&output_dir) {
        log::error!("Lightmap baking failed: {err}");
        std::process::exit(1);
    }
}

fn run(output_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let courtyard = build_courtyard();
    let settings = LightmapBakingSettings::default()
        .with_lightmap_size(256)
        .with_texel_density(8)
        .with_padding(2);

    let mut host = SoftwareBakeHost::with_lightmap_resources(&settings);
    let mut baker = LightmapBaker::initialize(
        &mut host,
        settings,
        &courtyard.scene,
        &courtyard.receivers,
        &courtyard.obstacles,
        &courtyard.lights,
    )?;
    baker.cook_raytracing_scene(BvhScene::new(BuildFlags::PREFER_FAST_TRACE))?;

    std::fs::create_dir_all(output_dir)?;
    for (index, page) in baker.bake_all(&mut host)?.iter().enumerate() {
        let path = output_dir.join(format!("lightmap_{index}.png"));
        let image = image::RgbaImage::from_raw(page.size.x, page.size.y, page.to_rgba8())
            .ok_or("baked page does not match its size")?;
        image.save(&path)?;
        log::info!("Wrote {} ({}x{})", path.display(), page.size.x, page.size.y);
    }

    let applied = baker.apply_lightmaps_to_scene(&courtyard.scene, 0);
    log::info!("Applied lightmaps to {applied} of {} receivers", courtyard.receivers.len());
    Ok(())
}
