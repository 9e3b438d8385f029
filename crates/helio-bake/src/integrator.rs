//! Direct light from a single directional light, with ray-traced shadows.

use glam::{UVec2, Vec3, Vec4};
use helio_raytracing::{AccelerationStructure, Ray, RayPacket, RAY_PACKET_SIZE};
use rayon::prelude::*;

use crate::baked_data::LightmapBakedData;
use crate::error::{BakeError, Result};
use crate::gbuffer::{LightmapGBuffer, POSITION_TARGET};

/// Distance shadow rays start away from the texel along the ray.
pub const RAY_ORIGIN_BIAS: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectLightParams {
    /// Direction from texels towards the light. `None` leaves covered texels black.
    pub ray_direction: Option<Vec3>,
    pub max_ray_length: f32,
    pub num_chunks: u32,
}

/// Bakes one page from its G-buffer.
///
/// Uncovered texels stay white. Every covered texel becomes
/// `white * max(0, n . l) * visibility` with an opaque alpha, where visibility
/// is 0 when the shadow ray hits anything. Rows are split into `num_chunks`
/// horizontal strips traced in parallel; each strip owns its own slice of the
/// output, and the call returns only after every strip is done.
pub fn bake_direct_light<T: AccelerationStructure + ?Sized>(
    gbuffer: &LightmapGBuffer,
    tracer: &T,
    params: &DirectLightParams,
) -> Result<LightmapBakedData> {
    let UVec2 { x: width, y: height } = gbuffer.size;
    let mut data = LightmapBakedData::new(gbuffer.size);
    if width == 0 || height == 0 {
        return Ok(data);
    }
    if gbuffer.texel_count() != data.baked_lighting.len() {
        return Err(BakeError::RenderTargetMismatch {
            name: POSITION_TARGET.to_string(),
            expected: data.baked_lighting.len(),
            actual: gbuffer.texel_count(),
        });
    }

    let Some(ray_direction) = params.ray_direction.map(Vec3::normalize_or_zero) else {
        for (index, color) in data.baked_lighting.iter_mut().enumerate() {
            if gbuffer.is_covered(index) {
                *color = Vec4::W;
            }
        }
        return Ok(data);
    };

    let num_chunks = params.num_chunks.max(1);
    let chunk_height = height.div_ceil(num_chunks) as usize;
    let width = width as usize;

    data.baked_lighting
        .par_chunks_mut(chunk_height * width)
        .enumerate()
        .try_for_each(|(chunk_index, rows)| {
            let first_row = chunk_index * chunk_height;
            trace_rows(gbuffer, tracer, ray_direction, params.max_ray_length, first_row, rows)
        })?;

    Ok(data)
}

fn trace_rows<T: AccelerationStructure + ?Sized>(
    gbuffer: &LightmapGBuffer,
    tracer: &T,
    ray_direction: Vec3,
    max_ray_length: f32,
    first_row: usize,
    rows: &mut [Vec4],
) -> Result<()> {
    let width = gbuffer.size.x as usize;
    let mut packet = RayPacket::new();
    let mut diffuse = [0.0f32; RAY_PACKET_SIZE];

    for (row_offset, row) in rows.chunks_mut(width).enumerate() {
        let row_start = (first_row + row_offset) * width;

        for (packet_index, texels) in row.chunks_mut(RAY_PACKET_SIZE).enumerate() {
            let base = row_start + packet_index * RAY_PACKET_SIZE;

            for lane in 0..RAY_PACKET_SIZE {
                let index = base + lane;
                if lane >= texels.len() || !gbuffer.is_covered(index) {
                    packet.deactivate(lane);
                    continue;
                }

                let position = gbuffer.position[index].truncate();
                let smooth_normal = gbuffer.smooth_normal[index].truncate();
                diffuse[lane] = smooth_normal.dot(ray_direction).max(0.0);

                let origin = position + ray_direction * RAY_ORIGIN_BIAS;
                packet.set_ray(lane, Ray::new(origin, ray_direction, 0.0, max_ray_length));
            }

            if packet.active_count() == 0 {
                continue;
            }
            tracer.intersect_packet(&mut packet)?;

            for (lane, color) in texels.iter_mut().enumerate() {
                if packet.is_active(lane) {
                    let shadow = if packet.hit(lane).is_hit() { 0.0 } else { 1.0 };
                    let intensity = diffuse[lane] * shadow;
                    *color = Vec3::splat(intensity).extend(1.0);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec2;
    use helio_raytracing::{GeometryId, Hit, RaytracingError, TriangleGeometry};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports a hit for every active lane whose origin has `x` below `shadow_edge`.
    struct ScriptedTracer {
        shadow_edge: f32,
        packets: AtomicUsize,
    }

    impl ScriptedTracer {
        fn new(shadow_edge: f32) -> Self {
            Self {
                shadow_edge,
                packets: AtomicUsize::new(0),
            }
        }
    }

    impl AccelerationStructure for ScriptedTracer {
        fn attach_geometry(&mut self, _geometry: TriangleGeometry) -> helio_raytracing::Result<GeometryId> {
            Err(RaytracingError::AlreadyCommitted)
        }

        fn commit(&mut self) -> helio_raytracing::Result<()> {
            Ok(())
        }

        fn is_committed(&self) -> bool {
            true
        }

        fn geometry_count(&self) -> usize {
            1
        }

        fn intersect_packet(&self, packet: &mut RayPacket) -> helio_raytracing::Result<()> {
            self.packets.fetch_add(1, Ordering::Relaxed);
            for lane in 0..RAY_PACKET_SIZE {
                if packet.is_active(lane) && packet.ray(lane).origin.x < self.shadow_edge {
                    packet.set_hit(
                        lane,
                        Hit {
                            geometry_id: 0,
                            primitive_id: 0,
                            t: 1.0,
                            barycentric: Vec2::ZERO,
                        },
                    );
                }
            }
            Ok(())
        }
    }

    /// Uses a real BVH holding one occluder quad over `x < shadow_edge`.
    fn occluder_bvh(shadow_edge: f32) -> helio_raytracing::BvhScene {
        use helio_raytracing::BuildFlags;
        let mut scene = helio_raytracing::BvhScene::new(BuildFlags::default());
        scene
            .attach_geometry(TriangleGeometry::from_triangle_list(
                vec![
                    Vec3::new(-100.0, 5.0, -100.0),
                    Vec3::new(shadow_edge, 5.0, -100.0),
                    Vec3::new(shadow_edge, 5.0, 100.0),
                    Vec3::new(-100.0, 5.0, 100.0),
                ],
                &[0, 1, 2, 0, 2, 3],
            ))
            .unwrap();
        scene.commit().unwrap();
        scene
    }

    /// Floor texels at `(x, 0, y)` facing up; every texel with `x % 5 == 4` is uncovered.
    fn floor_gbuffer(size: UVec2) -> LightmapGBuffer {
        let mut gbuffer = LightmapGBuffer::new(size);
        for y in 0..size.y {
            for x in 0..size.x {
                if x % 5 == 4 {
                    continue;
                }
                let index = gbuffer.index(x, y);
                gbuffer.set_texel(index, 1, Vec3::new(x as f32, 0.0, y as f32), Vec3::Y);
            }
        }
        gbuffer
    }

    fn params(ray_direction: Option<Vec3>, num_chunks: u32) -> DirectLightParams {
        DirectLightParams {
            ray_direction,
            max_ray_length: 100.0,
            num_chunks,
        }
    }

    #[test]
    fn uncovered_texels_stay_white() {
        let gbuffer = floor_gbuffer(UVec2::new(32, 8));
        let tracer = occluder_bvh(1000.0);
        let data = bake_direct_light(&gbuffer, &tracer, &params(Some(Vec3::Y), 4)).unwrap();

        for y in 0..8 {
            assert_eq!(data.texel(4, y), Vec4::ONE);
            assert_eq!(data.texel(29, y), Vec4::ONE);
        }
    }

    #[test]
    fn occluded_texels_are_black_and_lit_texels_follow_cosine() {
        let gbuffer = floor_gbuffer(UVec2::new(32, 8));
        let tracer = occluder_bvh(10.5);
        let direction = Vec3::new(0.0, 1.0, 1.0).normalize();
        let data = bake_direct_light(&gbuffer, &tracer, &params(Some(direction), 2)).unwrap();

        let shadowed = data.texel(3, 2);
        assert_eq!(shadowed, Vec4::new(0.0, 0.0, 0.0, 1.0));

        let lit = data.texel(20, 2);
        assert_relative_eq!(lit.x, direction.y, epsilon = 1e-6);
        assert_relative_eq!(lit.w, 1.0);
    }

    #[test]
    fn back_facing_texels_get_no_light() {
        let gbuffer = floor_gbuffer(UVec2::new(16, 4));
        let tracer = occluder_bvh(-1000.0);
        let data = bake_direct_light(&gbuffer, &tracer, &params(Some(Vec3::NEG_Y), 1)).unwrap();
        assert_eq!(data.texel(0, 0), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn missing_light_leaves_covered_texels_black() {
        let gbuffer = floor_gbuffer(UVec2::new(16, 4));
        let tracer = ScriptedTracer::new(0.0);
        let data = bake_direct_light(&gbuffer, &tracer, &params(None, 4)).unwrap();

        assert_eq!(data.texel(0, 0), Vec4::W);
        assert_eq!(data.texel(4, 0), Vec4::ONE);
        assert_eq!(tracer.packets.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn scripted_hits_shadow_exactly_those_texels() {
        let gbuffer = floor_gbuffer(UVec2::new(16, 2));
        let tracer = ScriptedTracer::new(7.5);
        let data = bake_direct_light(&gbuffer, &tracer, &params(Some(Vec3::Y), 2)).unwrap();

        for x in 0..16 {
            let expected = match x {
                4 | 9 | 14 => Vec4::ONE,
                x if x < 8 => Vec4::W,
                _ => Vec4::ONE,
            };
            assert_eq!(data.texel(x, 1), expected, "texel {x}");
        }
    }

    #[test]
    fn fully_uncovered_packets_are_not_traced() {
        let gbuffer = LightmapGBuffer::new(UVec2::new(32, 4));
        let tracer = ScriptedTracer::new(0.0);
        let data = bake_direct_light(&gbuffer, &tracer, &params(Some(Vec3::Y), 2)).unwrap();

        assert!(data.baked_lighting.iter().all(|&color| color == Vec4::ONE));
        assert_eq!(tracer.packets.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn every_row_is_traced_when_chunks_do_not_divide_height() {
        let gbuffer = floor_gbuffer(UVec2::new(16, 7));
        let tracer = ScriptedTracer::new(0.0);
        let data = bake_direct_light(&gbuffer, &tracer, &params(Some(Vec3::Y), 4)).unwrap();

        assert_eq!(tracer.packets.load(Ordering::Relaxed), 7);
        for y in 0..7 {
            assert_relative_eq!(data.texel(0, y).x, 1.0);
        }
    }

    #[test]
    fn chunk_count_does_not_change_results() {
        let gbuffer = floor_gbuffer(UVec2::new(48, 12));
        let tracer = occluder_bvh(17.3);
        let direction = Vec3::new(0.3, 1.0, 0.2);

        let reference = bake_direct_light(&gbuffer, &tracer, &params(Some(direction), 1)).unwrap();
        for chunks in [2, 3, 4, 12] {
            let data = bake_direct_light(&gbuffer, &tracer, &params(Some(direction), chunks)).unwrap();
            assert_eq!(data, reference, "{chunks} chunks");
        }
    }
}
