use glam::{Vec2, Vec3};

/// Lanes per [`RayPacket`]. Image widths handed to packet tracers must be a
/// multiple of this.
pub const RAY_PACKET_SIZE: usize = 16;

/// Geometry id reported for lanes that hit nothing.
pub const INVALID_GEOMETRY_ID: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub tnear: f32,
    pub tfar: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3, tnear: f32, tfar: f32) -> Self {
        Self {
            origin,
            direction,
            tnear,
            tfar,
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Empty interval; tracers report no hit for it.
    pub fn is_empty(&self) -> bool {
        !(self.tnear <= self.tfar)
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
            tnear: 0.0,
            tfar: -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub geometry_id: u32,
    pub primitive_id: u32,
    pub t: f32,
    /// Barycentric coordinates of the hit relative to the triangle's second and third vertex.
    pub barycentric: Vec2,
}

impl Hit {
    pub const NONE: Hit = Hit {
        geometry_id: INVALID_GEOMETRY_ID,
        primitive_id: INVALID_GEOMETRY_ID,
        t: f32::INFINITY,
        barycentric: Vec2::ZERO,
    };

    pub fn is_hit(&self) -> bool {
        self.geometry_id != INVALID_GEOMETRY_ID
    }
}

impl Default for Hit {
    fn default() -> Self {
        Self::NONE
    }
}

/// A fixed group of rays traced together.
///
/// Inactive lanes are skipped by tracers and always report [`Hit::NONE`].
#[derive(Clone, Debug)]
pub struct RayPacket {
    active: u32,
    rays: [Ray; RAY_PACKET_SIZE],
    hits: [Hit; RAY_PACKET_SIZE],
}

impl RayPacket {
    pub fn new() -> Self {
        Self {
            active: 0,
            rays: [Ray::default(); RAY_PACKET_SIZE],
            hits: [Hit::NONE; RAY_PACKET_SIZE],
        }
    }

    /// Activates `lane` with `ray`, clearing any previous hit.
    pub fn set_ray(&mut self, lane: usize, ray: Ray) {
        self.rays[lane] = ray;
        self.hits[lane] = Hit::NONE;
        if ray.is_empty() {
            self.active &= !(1 << lane);
        } else {
            self.active |= 1 << lane;
        }
    }

    /// Marks `lane` inactive with an empty interval.
    pub fn deactivate(&mut self, lane: usize) {
        self.rays[lane] = Ray::default();
        self.hits[lane] = Hit::NONE;
        self.active &= !(1 << lane);
    }

    pub fn is_active(&self, lane: usize) -> bool {
        self.active & (1 << lane) != 0
    }

    pub fn active_mask(&self) -> u32 {
        self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.count_ones() as usize
    }

    pub fn ray(&self, lane: usize) -> &Ray {
        &self.rays[lane]
    }

    pub fn hit(&self, lane: usize) -> &Hit {
        &self.hits[lane]
    }

    /// Records a hit for `lane`; tracers outside this crate report through it.
    pub fn set_hit(&mut self, lane: usize, hit: Hit) {
        self.hits[lane] = hit;
    }

    pub(crate) fn ray_mut(&mut self, lane: usize) -> &mut Ray {
        &mut self.rays[lane]
    }

    pub(crate) fn hit_mut(&mut self, lane: usize) -> &mut Hit {
        &mut self.hits[lane]
    }
}

impl Default for RayPacket {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_start_inactive() {
        let packet = RayPacket::new();
        assert_eq!(packet.active_count(), 0);
        assert!(!packet.hit(0).is_hit());
    }

    #[test]
    fn empty_interval_keeps_lane_inactive() {
        let mut packet = RayPacket::new();
        packet.set_ray(3, Ray::new(Vec3::ZERO, Vec3::Y, 0.0, 10.0));
        packet.set_ray(4, Ray::new(Vec3::ZERO, Vec3::Y, 0.0, -1.0));
        assert!(packet.is_active(3));
        assert!(!packet.is_active(4));

        packet.deactivate(3);
        assert_eq!(packet.active_count(), 0);
    }
}
