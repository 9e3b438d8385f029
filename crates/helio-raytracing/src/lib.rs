//! CPU ray tracing for Helio's offline bakers.
//!
//! Rays are traced in fixed-width packets of [`RAY_PACKET_SIZE`] lanes. The
//! tracer itself sits behind [`AccelerationStructure`] so bakers can swap in
//! other backends; [`BvhScene`] is the built-in one.

pub mod acceleration_structure;
pub mod bvh;
pub mod error;
pub mod geometry;
pub mod ray;

pub use acceleration_structure::{AccelerationStructure, BuildFlags};
pub use bvh::BvhScene;
pub use error::{RaytracingError, Result};
pub use geometry::{GeometryId, TriangleGeometry};
pub use ray::{Hit, Ray, RayPacket, INVALID_GEOMETRY_ID, RAY_PACKET_SIZE};
