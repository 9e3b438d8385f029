//! Binary bounding volume hierarchy over world-space triangles.
//!
//! Nodes live in one flat array; the two children of an interior node are
//! stored next to each other so a node only records where its left child is.
//! Packets are traversed together: a node is visited while at least one
//! active lane still overlaps it.

use crate::acceleration_structure::{AccelerationStructure, BuildFlags};
use crate::error::{RaytracingError, Result};
use crate::geometry::{GeometryId, TriangleGeometry};
use crate::ray::{Hit, RayPacket};
use glam::{Vec2, Vec3};
use helio_core::Aabb;

const MAX_LEAF_TRIANGLES: usize = 4;
/// Above this size a node is split even when SAH prefers a leaf.
const MAX_SAH_LEAF_TRIANGLES: usize = 16;
const SAH_BINS: usize = 12;
const TRAVERSAL_COST: f32 = 1.0;
const MAX_DEPTH: usize = 64;
/// Widens slab exits to absorb rounding on axis-aligned triangles.
const SLAB_EXIT_SCALE: f32 = 1.0 + 8.0 * f32::EPSILON;
const DETERMINANT_EPSILON: f32 = 1e-12;

#[derive(Clone, Copy, Debug)]
struct Triangle {
    v0: Vec3,
    e1: Vec3,
    e2: Vec3,
    geometry_id: GeometryId,
    primitive_id: u32,
}

impl Triangle {
    fn bounds(&self) -> Aabb {
        Aabb::from_points(&[self.v0, self.v0 + self.e1, self.v0 + self.e2])
    }

    fn is_degenerate(&self) -> bool {
        self.e1.cross(self.e2).length_squared() == 0.0
    }

    /// Möller–Trumbore, double-sided. Returns `(t, u, v)`.
    fn intersect(&self, origin: Vec3, direction: Vec3, tnear: f32, tfar: f32) -> Option<(f32, f32, f32)> {
        let p = direction.cross(self.e2);
        let det = self.e1.dot(p);
        if det.abs() < DETERMINANT_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = origin - self.v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.e1);
        let v = direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = self.e2.dot(q) * inv_det;
        (t >= tnear && t <= tfar).then_some((t, u, v))
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Node {
    bounds: Aabb,
    /// First triangle for leaves, left child for interior nodes.
    first: u32,
    /// Zero for interior nodes.
    count: u32,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// The built-in [`AccelerationStructure`].
pub struct BvhScene {
    flags: BuildFlags,
    pending: Vec<TriangleGeometry>,
    geometry_count: usize,
    triangles: Vec<Triangle>,
    nodes: Vec<Node>,
    committed: bool,
}

impl BvhScene {
    pub fn new(flags: BuildFlags) -> Self {
        Self {
            flags,
            pending: Vec::new(),
            geometry_count: 0,
            triangles: Vec::new(),
            nodes: Vec::new(),
            committed: false,
        }
    }

    pub fn flags(&self) -> BuildFlags {
        self.flags
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map(|node| node.bounds).unwrap_or_default()
    }

    fn collect_triangles(&mut self) -> Vec<Triangle> {
        let mut triangles = Vec::new();
        for (geometry_id, geometry) in self.pending.drain(..).enumerate() {
            for primitive_id in 0..geometry.triangle_count() {
                let [a, b, c] = geometry.triangle(primitive_id);
                let triangle = Triangle {
                    v0: a,
                    e1: b - a,
                    e2: c - a,
                    geometry_id: geometry_id as GeometryId,
                    primitive_id: primitive_id as u32,
                };
                if !triangle.is_degenerate() {
                    triangles.push(triangle);
                }
            }
        }
        triangles
    }

    fn build(&mut self, triangles: Vec<Triangle>) {
        if triangles.is_empty() {
            self.nodes.clear();
            self.triangles = triangles;
            return;
        }

        let bounds: Vec<Aabb> = triangles.iter().map(Triangle::bounds).collect();
        let centroids: Vec<Vec3> = bounds.iter().map(Aabb::center).collect();
        let mut order: Vec<u32> = (0..triangles.len() as u32).collect();

        let mut builder = Builder {
            flags: self.flags,
            bounds: &bounds,
            centroids: &centroids,
            order: &mut order,
            nodes: Vec::with_capacity(triangles.len() * 2),
        };
        builder.nodes.push(Node::default());
        builder.subdivide(0, 0, triangles.len(), 0);

        self.nodes = builder.nodes;
        self.triangles = order.iter().map(|&index| triangles[index as usize]).collect();
    }
}

impl Default for BvhScene {
    fn default() -> Self {
        Self::new(BuildFlags::default())
    }
}

impl AccelerationStructure for BvhScene {
    fn attach_geometry(&mut self, geometry: TriangleGeometry) -> Result<GeometryId> {
        if self.committed {
            return Err(RaytracingError::AlreadyCommitted);
        }
        geometry.validate()?;

        let id = self.geometry_count as GeometryId;
        self.pending.push(geometry);
        self.geometry_count += 1;
        Ok(id)
    }

    fn commit(&mut self) -> Result<()> {
        if self.committed {
            return Err(RaytracingError::AlreadyCommitted);
        }

        let triangles = self.collect_triangles();
        self.build(triangles);
        self.committed = true;

        log::debug!(
            "BVH committed: {} geometries, {} triangles, {} nodes ({:?})",
            self.geometry_count,
            self.triangles.len(),
            self.nodes.len(),
            self.flags
        );
        Ok(())
    }

    fn is_committed(&self) -> bool {
        self.committed
    }

    fn geometry_count(&self) -> usize {
        self.geometry_count
    }

    /// Closest hit per active lane. As with hardware tracers, a lane's `tfar`
    /// is shortened to the distance of its closest hit.
    fn intersect_packet(&self, packet: &mut RayPacket) -> Result<()> {
        if !self.committed {
            return Err(RaytracingError::NotCommitted);
        }

        let active = packet.active_mask();
        if active == 0 || self.nodes.is_empty() {
            return Ok(());
        }

        let mut inv_directions = [Vec3::ZERO; crate::ray::RAY_PACKET_SIZE];
        for lane in lanes(active) {
            inv_directions[lane] = safe_inverse(packet.ray(lane).direction);
        }

        let mut stack: Vec<u32> = Vec::with_capacity(MAX_DEPTH + 1);
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];

            let mut overlapping = 0u32;
            for lane in lanes(active) {
                let ray = packet.ray(lane);
                if slab_test(&node.bounds, ray.origin, inv_directions[lane], ray.tnear, ray.tfar) {
                    overlapping |= 1 << lane;
                }
            }
            if overlapping == 0 {
                continue;
            }

            if !node.is_leaf() {
                stack.push(node.first + 1);
                stack.push(node.first);
                continue;
            }

            let first = node.first as usize;
            for triangle in &self.triangles[first..first + node.count as usize] {
                for lane in lanes(overlapping) {
                    let ray = *packet.ray(lane);
                    if let Some((t, u, v)) =
                        triangle.intersect(ray.origin, ray.direction, ray.tnear, ray.tfar)
                    {
                        packet.ray_mut(lane).tfar = t;
                        *packet.hit_mut(lane) = Hit {
                            geometry_id: triangle.geometry_id,
                            primitive_id: triangle.primitive_id,
                            t,
                            barycentric: Vec2::new(u, v),
                        };
                    }
                }
            }
        }

        Ok(())
    }
}

struct Builder<'a> {
    flags: BuildFlags,
    bounds: &'a [Aabb],
    centroids: &'a [Vec3],
    order: &'a mut [u32],
    nodes: Vec<Node>,
}

#[derive(Clone, Copy, Default)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

impl Builder<'_> {
    fn subdivide(&mut self, node: usize, first: usize, count: usize, depth: usize) {
        let mut bounds = Aabb::EMPTY;
        let mut centroid_bounds = Aabb::EMPTY;
        for &index in &self.order[first..first + count] {
            bounds.merge(&self.bounds[index as usize]);
            centroid_bounds.merge_point(self.centroids[index as usize]);
        }
        self.nodes[node].bounds = bounds;

        if count <= MAX_LEAF_TRIANGLES || depth >= MAX_DEPTH {
            self.make_leaf(node, first, count);
            return;
        }

        let split = if self.flags.contains(BuildFlags::PREFER_FAST_TRACE) {
            self.sah_split(first, count, &bounds, &centroid_bounds)
        } else {
            None
        };
        let mid = match split {
            Some(mid) => mid,
            None if self.flags.contains(BuildFlags::PREFER_FAST_TRACE)
                && count <= MAX_SAH_LEAF_TRIANGLES =>
            {
                self.make_leaf(node, first, count);
                return;
            }
            None => self.median_split(first, count, &centroid_bounds),
        };

        let left = self.nodes.len();
        self.nodes.push(Node::default());
        self.nodes.push(Node::default());
        self.nodes[node].first = left as u32;
        self.nodes[node].count = 0;

        self.subdivide(left, first, mid - first, depth + 1);
        self.subdivide(left + 1, mid, first + count - mid, depth + 1);
    }

    fn make_leaf(&mut self, node: usize, first: usize, count: usize) {
        self.nodes[node].first = first as u32;
        self.nodes[node].count = count as u32;
    }

    /// Binned SAH. `None` when a leaf is cheaper or no plane separates the centroids.
    fn sah_split(
        &mut self,
        first: usize,
        count: usize,
        bounds: &Aabb,
        centroid_bounds: &Aabb,
    ) -> Option<usize> {
        let extent = centroid_bounds.size();
        let mut best: Option<(usize, usize, f32)> = None;

        for axis in 0..3 {
            if extent[axis] <= f32::EPSILON {
                continue;
            }

            let origin = centroid_bounds.min[axis];
            let scale = SAH_BINS as f32 / extent[axis];
            let mut bins = [Bin::default(); SAH_BINS];
            for &index in &self.order[first..first + count] {
                let bin = &mut bins[bin_index(self.centroids[index as usize][axis], origin, scale)];
                bin.count += 1;
                bin.bounds.merge(&self.bounds[index as usize]);
            }

            let mut left_area = [0.0f32; SAH_BINS - 1];
            let mut left_count = [0usize; SAH_BINS - 1];
            let mut accumulated = Aabb::EMPTY;
            let mut accumulated_count = 0;
            for i in 0..SAH_BINS - 1 {
                accumulated.merge(&bins[i].bounds);
                accumulated_count += bins[i].count;
                left_area[i] = surface_area(&accumulated);
                left_count[i] = accumulated_count;
            }

            accumulated = Aabb::EMPTY;
            accumulated_count = 0;
            for i in (1..SAH_BINS).rev() {
                accumulated.merge(&bins[i].bounds);
                accumulated_count += bins[i].count;
                if left_count[i - 1] == 0 || accumulated_count == 0 {
                    continue;
                }

                let cost = left_count[i - 1] as f32 * left_area[i - 1]
                    + accumulated_count as f32 * surface_area(&accumulated);
                if best.map_or(true, |(_, _, best_cost)| cost < best_cost) {
                    best = Some((axis, i, cost));
                }
            }
        }

        let (axis, split_bin, cost) = best?;
        let parent_area = surface_area(bounds);
        let leaf_cost = count as f32 * parent_area;
        if TRAVERSAL_COST * parent_area + cost >= leaf_cost && count <= MAX_SAH_LEAF_TRIANGLES {
            return None;
        }

        let origin = centroid_bounds.min[axis];
        let scale = SAH_BINS as f32 / extent[axis];
        let centroids = self.centroids;
        let left = partition(&mut self.order[first..first + count], |&index| {
            bin_index(centroids[index as usize][axis], origin, scale) < split_bin
        });
        Some(first + left)
    }

    /// Object median along the widest centroid axis. Always splits.
    fn median_split(&mut self, first: usize, count: usize, centroid_bounds: &Aabb) -> usize {
        let extent = centroid_bounds.size();
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };

        let half = count / 2;
        let centroids = self.centroids;
        self.order[first..first + count].select_nth_unstable_by(half, |&a, &b| {
            centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
        });
        first + half
    }
}

fn bin_index(value: f32, origin: f32, scale: f32) -> usize {
    (((value - origin) * scale) as usize).min(SAH_BINS - 1)
}

fn surface_area(bounds: &Aabb) -> f32 {
    let size = bounds.size();
    2.0 * (size.x * size.y + size.y * size.z + size.z * size.x)
}

/// Moves elements matching `predicate` to the front; returns how many matched.
fn partition<T, F: FnMut(&T) -> bool>(items: &mut [T], mut predicate: F) -> usize {
    let mut split = 0;
    for i in 0..items.len() {
        if predicate(&items[i]) {
            items.swap(split, i);
            split += 1;
        }
    }
    split
}

/// Reciprocal direction with near-zero components clamped to a large finite
/// value, so slab tests never produce `0 * inf`.
fn safe_inverse(direction: Vec3) -> Vec3 {
    const MIN_COMPONENT: f32 = 1e-15;
    let inverse = |d: f32| {
        if d.abs() < MIN_COMPONENT {
            MIN_COMPONENT.recip().copysign(d)
        } else {
            d.recip()
        }
    };
    Vec3::new(inverse(direction.x), inverse(direction.y), inverse(direction.z))
}

fn slab_test(bounds: &Aabb, origin: Vec3, inv_direction: Vec3, tnear: f32, tfar: f32) -> bool {
    let t0 = (bounds.min - origin) * inv_direction;
    let t1 = (bounds.max - origin) * inv_direction;
    let entry = t0.min(t1).max_element().max(tnear);
    let exit = t0.max(t1).min_element().min(tfar);
    entry <= exit * SLAB_EXIT_SCALE
}

fn lanes(mut mask: u32) -> impl Iterator<Item = usize> {
    std::iter::from_fn(move || {
        if mask == 0 {
            return None;
        }
        let lane = mask.trailing_zeros() as usize;
        mask &= mask - 1;
        Some(lane)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ray::{Ray, RAY_PACKET_SIZE};
    use approx::assert_relative_eq;

    fn quad(y: f32, half: f32) -> TriangleGeometry {
        TriangleGeometry::from_triangle_list(
            vec![
                Vec3::new(-half, y, -half),
                Vec3::new(half, y, -half),
                Vec3::new(half, y, half),
                Vec3::new(-half, y, half),
            ],
            &[0, 1, 2, 0, 2, 3],
        )
    }

    /// Height field of `n * n` quads with pseudo-random heights.
    fn terrain(n: u32) -> TriangleGeometry {
        let mut seed = 0x2545_f491u32;
        let mut next = || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 8) as f32 / (1u32 << 24) as f32
        };

        let mut vertices = Vec::new();
        for z in 0..=n {
            for x in 0..=n {
                vertices.push(Vec3::new(x as f32, next() * 2.0, z as f32));
            }
        }

        let mut indices = Vec::new();
        let stride = n + 1;
        for z in 0..n {
            for x in 0..n {
                let i = z * stride + x;
                indices.push([i, i + 1, i + stride + 1]);
                indices.push([i, i + stride + 1, i + stride]);
            }
        }
        TriangleGeometry::new(vertices, indices)
    }

    fn brute_force(geometry: &TriangleGeometry, ray: &Ray) -> Option<f32> {
        (0..geometry.triangle_count())
            .filter_map(|i| {
                let [a, b, c] = geometry.triangle(i);
                let triangle = Triangle {
                    v0: a,
                    e1: b - a,
                    e2: c - a,
                    geometry_id: 0,
                    primitive_id: i as u32,
                };
                triangle
                    .intersect(ray.origin, ray.direction, ray.tnear, ray.tfar)
                    .map(|(t, _, _)| t)
            })
            .min_by(f32::total_cmp)
    }

    fn committed(geometries: Vec<TriangleGeometry>, flags: BuildFlags) -> BvhScene {
        let mut scene = BvhScene::new(flags);
        for geometry in geometries {
            scene.attach_geometry(geometry).unwrap();
        }
        scene.commit().unwrap();
        scene
    }

    #[test]
    fn geometry_ids_are_dense_in_attach_order() {
        let mut scene = BvhScene::default();
        assert_eq!(scene.attach_geometry(quad(0.0, 1.0)).unwrap(), 0);
        assert_eq!(scene.attach_geometry(quad(1.0, 1.0)).unwrap(), 1);
        assert_eq!(scene.geometry_count(), 2);
    }

    #[test]
    fn tracing_requires_commit() {
        let mut scene = BvhScene::default();
        scene.attach_geometry(quad(0.0, 1.0)).unwrap();
        let ray = Ray::new(Vec3::Y, Vec3::NEG_Y, 0.0, 10.0);
        assert_eq!(scene.intersect(&ray), Err(RaytracingError::NotCommitted));

        scene.commit().unwrap();
        assert_eq!(
            scene.attach_geometry(quad(2.0, 1.0)),
            Err(RaytracingError::AlreadyCommitted)
        );
    }

    #[test]
    fn closest_hit_wins() {
        for flags in [BuildFlags::PREFER_FAST_TRACE, BuildFlags::PREFER_FAST_BUILD] {
            let scene = committed(vec![quad(0.0, 1.0), quad(2.0, 1.0)], flags);
            let hit = scene
                .intersect(&Ray::new(Vec3::new(0.2, 5.0, 0.1), Vec3::NEG_Y, 0.0, 100.0))
                .unwrap();
            assert!(hit.is_hit());
            assert_eq!(hit.geometry_id, 1);
            assert_relative_eq!(hit.t, 3.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn both_faces_are_hit() {
        let scene = committed(vec![quad(0.0, 1.0)], BuildFlags::default());
        let from_below = scene
            .intersect(&Ray::new(Vec3::new(0.0, -1.0, 0.0), Vec3::Y, 0.0, 10.0))
            .unwrap();
        assert!(from_below.is_hit());
    }

    #[test]
    fn ray_interval_is_respected() {
        let scene = committed(vec![quad(0.0, 1.0)], BuildFlags::default());
        let short = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 0.0, 4.0);
        assert!(!scene.intersect(&short).unwrap().is_hit());
        let late_start = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 6.0, 10.0);
        assert!(!scene.intersect(&late_start).unwrap().is_hit());
    }

    #[test]
    fn inactive_lanes_report_no_hit() {
        let scene = committed(vec![quad(0.0, 10.0)], BuildFlags::default());
        let mut packet = RayPacket::new();
        for lane in 0..RAY_PACKET_SIZE {
            let ray = Ray::new(Vec3::new(lane as f32 * 0.1, 1.0, 0.0), Vec3::NEG_Y, 0.0, 10.0);
            if lane % 2 == 0 {
                packet.set_ray(lane, ray);
            } else {
                packet.deactivate(lane);
            }
        }

        scene.intersect_packet(&mut packet).unwrap();
        for lane in 0..RAY_PACKET_SIZE {
            assert_eq!(packet.hit(lane).is_hit(), lane % 2 == 0, "lane {lane}");
        }
    }

    #[test]
    fn empty_scene_never_hits() {
        let scene = committed(Vec::new(), BuildFlags::default());
        let hit = scene.intersect(&Ray::new(Vec3::ZERO, Vec3::X, 0.0, 1e6)).unwrap();
        assert_eq!(hit, Hit::NONE);
    }

    #[test]
    fn matches_brute_force_on_terrain() {
        let geometry = terrain(24);
        for flags in [BuildFlags::PREFER_FAST_TRACE, BuildFlags::PREFER_FAST_BUILD] {
            let scene = committed(vec![geometry.clone()], flags);
            assert!(scene.node_count() > 1);

            for i in 0..200 {
                let x = (i % 20) as f32 * 1.23 + 0.05;
                let z = (i / 20) as f32 * 2.31 + 0.07;
                let direction = Vec3::new(0.3, -1.0, 0.2 - (i % 7) as f32 * 0.05).normalize();
                let ray = Ray::new(Vec3::new(x, 5.0, z), direction, 0.0, 100.0);

                let expected = brute_force(&geometry, &ray);
                let hit = scene.intersect(&ray).unwrap();
                match expected {
                    Some(t) => assert_relative_eq!(hit.t, t, epsilon = 1e-4),
                    None => assert!(!hit.is_hit(), "ray {i} should miss"),
                }
            }
        }
    }
}
