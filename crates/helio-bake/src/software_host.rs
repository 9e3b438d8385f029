//! CPU implementation of [`BakeHost`].
//!
//! Instead of running shaders it rasterizes every baking instance straight
//! into lightmap space: a vertex lands at `lightmap_uv * LMOffset.xy +
//! LMOffset.zw`, scaled to the surface size, and each covered texel receives
//! the interpolated world-space attributes of the triangle covering it.

use glam::{Mat3, UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};
use helio_core::{CullMode, Material, ShaderParameter};
use std::collections::HashMap;

use crate::baking_scene::{BakingInstance, BakingScene, LIGHTMAP_SCALE_OFFSET_PARAMETER};
use crate::error::{BakeError, Result};
use crate::gbuffer::{
    LightmapGBuffer, FACE_NORMAL_TARGET, POSITION_TARGET, SMOOTH_NORMAL_TARGET,
    SMOOTH_POSITION_TARGET,
};
use crate::host::{BakeHost, RenderPath, RenderSurfaceId, RenderedView};
use crate::settings::LightmapBakingSettings;

const IDENTITY_SCALE_OFFSET: Vec4 = Vec4::new(1.0, 1.0, 0.0, 0.0);
/// Texel centres this close to a shared edge are filled by both triangles.
const EDGE_TOLERANCE: f32 = 1e-5;

/// Template material for lightmap G-buffer rendering.
pub fn lightmap_baking_material(name: impl Into<String>) -> Material {
    Material::new(name, "LightmapGBuffer")
        .with_cull_mode(CullMode::None)
        .with_parameter(
            LIGHTMAP_SCALE_OFFSET_PARAMETER,
            ShaderParameter::Vec4(IDENTITY_SCALE_OFFSET),
        )
}

struct RenderedTargets {
    view: RenderedView,
    targets: HashMap<String, Vec<Vec4>>,
}

pub struct SoftwareBakeHost {
    render_paths: HashMap<String, RenderPath>,
    materials: HashMap<String, Material>,
    surfaces: Vec<UVec2>,
    device_lost: bool,
    in_frame: bool,
    next_view_id: u64,
    last_render: Option<RenderedTargets>,
}

impl SoftwareBakeHost {
    pub fn new() -> Self {
        Self {
            render_paths: HashMap::new(),
            materials: HashMap::new(),
            surfaces: Vec::new(),
            device_lost: false,
            in_frame: false,
            next_view_id: 1,
            last_render: None,
        }
    }

    /// Host with the G-buffer render path and baking material registered
    /// under the paths `settings` names.
    pub fn with_lightmap_resources(settings: &LightmapBakingSettings) -> Self {
        let mut host = Self::new();
        host.register_render_path(
            settings.baking_render_path.clone(),
            RenderPath::lightmap_gbuffer(settings.baking_render_path.clone()),
        );
        host.register_material(
            settings.baking_material.clone(),
            lightmap_baking_material(settings.baking_material.clone()),
        );
        host
    }

    pub fn register_render_path(&mut self, path: impl Into<String>, render_path: RenderPath) {
        self.render_paths.insert(path.into(), render_path);
    }

    pub fn register_material(&mut self, path: impl Into<String>, material: Material) {
        self.materials.insert(path.into(), material);
    }

    /// While lost, [`BakeHost::begin_frame`] fails.
    pub fn set_device_lost(&mut self, lost: bool) {
        self.device_lost = lost;
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn surface_size(&self, surface: RenderSurfaceId) -> Option<UVec2> {
        self.surfaces.get(surface.0 as usize).copied()
    }
}

impl Default for SoftwareBakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl BakeHost for SoftwareBakeHost {
    fn load_render_path(&mut self, path: &str) -> Result<RenderPath> {
        self.render_paths
            .get(path)
            .cloned()
            .ok_or_else(|| BakeError::ResourceLoad {
                kind: "render path",
                path: path.to_string(),
                reason: "not registered".to_string(),
            })
    }

    fn load_material(&mut self, path: &str) -> Result<Material> {
        self.materials
            .get(path)
            .cloned()
            .ok_or_else(|| BakeError::ResourceLoad {
                kind: "material",
                path: path.to_string(),
                reason: "not registered".to_string(),
            })
    }

    fn create_render_surface(&mut self, size: UVec2) -> Result<RenderSurfaceId> {
        if size.x == 0 || size.y == 0 {
            return Err(BakeError::Host(format!(
                "cannot create a {}x{} render surface",
                size.x, size.y
            )));
        }
        self.surfaces.push(size);
        Ok(RenderSurfaceId(self.surfaces.len() as u32 - 1))
    }

    fn begin_frame(&mut self) -> bool {
        if self.device_lost {
            return false;
        }
        self.in_frame = true;
        true
    }

    fn end_frame(&mut self) {
        self.in_frame = false;
    }

    fn render(
        &mut self,
        surface: RenderSurfaceId,
        render_path: &RenderPath,
        scene: &BakingScene,
    ) -> Result<RenderedView> {
        if !self.in_frame {
            return Err(BakeError::Host("render issued outside of a frame".to_string()));
        }
        let size = self
            .surface_size(surface)
            .ok_or_else(|| BakeError::Host(format!("unknown render surface {}", surface.0)))?;

        let mut gbuffer = LightmapGBuffer::new(size);
        let frustum = scene.camera.frustum();
        for (index, instance) in scene.instances.iter().enumerate() {
            let bounds = instance.model.bounds.transform(&instance.transform.to_matrix());
            if !frustum.contains_aabb(&bounds) {
                log::trace!("Baking instance {} is outside the baking camera", instance.entity);
                continue;
            }
            rasterize_instance(&mut gbuffer, instance, index as u32 + 1);
        }

        let targets = render_path
            .render_targets
            .iter()
            .map(|name| {
                let texels = match name.as_str() {
                    POSITION_TARGET => gbuffer.position.clone(),
                    SMOOTH_POSITION_TARGET => gbuffer.smooth_position.clone(),
                    FACE_NORMAL_TARGET => gbuffer.face_normal.clone(),
                    SMOOTH_NORMAL_TARGET => gbuffer.smooth_normal.clone(),
                    _ => vec![Vec4::ZERO; gbuffer.texel_count()],
                };
                (name.clone(), texels)
            })
            .collect();

        let view = RenderedView {
            id: self.next_view_id,
            size,
        };
        self.next_view_id += 1;
        self.last_render = Some(RenderedTargets { view, targets });
        Ok(view)
    }

    fn read_render_target(&self, view: &RenderedView, name: &str) -> Result<Vec<u8>> {
        let rendered = self
            .last_render
            .as_ref()
            .filter(|rendered| rendered.view == *view)
            .ok_or_else(|| BakeError::Host(format!("view {} is no longer available", view.id)))?;

        let texels = rendered
            .targets
            .get(name)
            .ok_or_else(|| BakeError::ResourceLoad {
                kind: "render target",
                path: name.to_string(),
                reason: "not written by the render path".to_string(),
            })?;
        Ok(bytemuck::cast_slice::<Vec4, u8>(texels).to_vec())
    }
}

#[derive(Clone, Copy)]
struct TexelVertex {
    position: Vec3,
    normal: Vec3,
    texel: Vec2,
}

fn rasterize_instance(gbuffer: &mut LightmapGBuffer, instance: &BakingInstance, geometry_id: u32) {
    let scale_offset = instance
        .material
        .shader_parameter(LIGHTMAP_SCALE_OFFSET_PARAMETER)
        .and_then(ShaderParameter::as_vec4)
        .unwrap_or(IDENTITY_SCALE_OFFSET);

    let model_matrix = instance.transform.to_matrix();
    let normal_matrix = Mat3::from_mat4(model_matrix).inverse().transpose();
    let surface_size = gbuffer.size.as_vec2();

    for geometry in &instance.model.geometries {
        let Some(mesh) = geometry.lods.first() else {
            continue;
        };

        let vertices: Vec<TexelVertex> = mesh
            .vertices
            .iter()
            .map(|vertex| TexelVertex {
                position: model_matrix.transform_point3(vertex.position()),
                normal: (normal_matrix * vertex.normal()).normalize_or_zero(),
                texel: (vertex.lightmap_coords() * scale_offset.xy() + scale_offset.zw())
                    * surface_size,
            })
            .collect();

        for triangle in mesh.indices.chunks_exact(3) {
            let corners = (
                vertices.get(triangle[0] as usize),
                vertices.get(triangle[1] as usize),
                vertices.get(triangle[2] as usize),
            );
            if let (Some(a), Some(b), Some(c)) = corners {
                rasterize_triangle(gbuffer, geometry_id, [*a, *b, *c]);
            }
        }
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

/// Fills every texel whose centre lies inside the triangle.
fn rasterize_triangle(gbuffer: &mut LightmapGBuffer, geometry_id: u32, corners: [TexelVertex; 3]) {
    let [a, b, c] = corners;
    let area = edge(a.texel, b.texel, c.texel);
    if area.abs() <= f32::EPSILON {
        return;
    }

    let surface_size = gbuffer.size.as_vec2();
    let min = a.texel.min(b.texel).min(c.texel).floor().max(Vec2::ZERO);
    let max = a.texel.max(b.texel).max(c.texel).ceil().min(surface_size);
    if min.x >= max.x || min.y >= max.y {
        return;
    }

    let face_normal = (b.position - a.position)
        .cross(c.position - a.position)
        .normalize_or_zero();

    for y in min.y as u32..max.y as u32 {
        for x in min.x as u32..max.x as u32 {
            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let wa = edge(b.texel, c.texel, center) / area;
            let wb = edge(c.texel, a.texel, center) / area;
            let wc = 1.0 - wa - wb;
            if wa < -EDGE_TOLERANCE || wb < -EDGE_TOLERANCE || wc < -EDGE_TOLERANCE {
                continue;
            }

            let position = a.position * wa + b.position * wb + c.position * wc;
            // Phong projection onto each corner's tangent plane.
            let project = |corner: &TexelVertex| {
                position - (position - corner.position).dot(corner.normal) * corner.normal
            };
            let smooth_position = project(&a) * wa + project(&b) * wb + project(&c) * wc;
            let smooth_normal = (a.normal * wa + b.normal * wb + c.normal * wc).normalize_or_zero();

            let index = gbuffer.index(x, y);
            gbuffer.position[index] = position.extend(geometry_id as f32);
            gbuffer.smooth_position[index] = smooth_position.extend(1.0);
            gbuffer.face_normal[index] = face_normal.extend(1.0);
            gbuffer.smooth_normal[index] = smooth_normal.extend(1.0);
        }
    }
}
