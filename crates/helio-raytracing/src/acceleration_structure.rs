use crate::error::Result;
use crate::geometry::{GeometryId, TriangleGeometry};
use crate::ray::{Hit, Ray, RayPacket};
use bitflags::bitflags;

bitflags! {
    /// Build quality hints. Tracers are free to ignore flags they do not understand.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BuildFlags: u32 {
        /// Spend build time for faster traversal (SAH splits).
        const PREFER_FAST_TRACE = 1 << 0;
        /// Cheap object-median splits.
        const PREFER_FAST_BUILD = 1 << 1;
    }
}

impl Default for BuildFlags {
    fn default() -> Self {
        BuildFlags::PREFER_FAST_TRACE
    }
}

/// A static triangle scene that can be traced after it is committed.
///
/// Geometry is attached first and receives dense ids in attach order; after
/// [`commit`](Self::commit) the structure is immutable and safe to trace from
/// many threads at once.
pub trait AccelerationStructure: Send + Sync {
    fn attach_geometry(&mut self, geometry: TriangleGeometry) -> Result<GeometryId>;

    fn commit(&mut self) -> Result<()>;

    fn is_committed(&self) -> bool;

    fn geometry_count(&self) -> usize;

    /// Closest-hit query for every active lane of `packet`.
    fn intersect_packet(&self, packet: &mut RayPacket) -> Result<()>;

    fn intersect(&self, ray: &Ray) -> Result<Hit> {
        let mut packet = RayPacket::new();
        packet.set_ray(0, *ray);
        self.intersect_packet(&mut packet)?;
        Ok(*packet.hit(0))
    }

    /// Whether anything lies on `ray` within its interval.
    fn occluded(&self, ray: &Ray) -> Result<bool> {
        Ok(self.intersect(ray)?.is_hit())
    }
}
