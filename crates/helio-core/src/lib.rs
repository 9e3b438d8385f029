//! Core scene, geometry and material types for Helio's offline lighting tools.

pub mod bounds;
pub mod camera;
pub mod error;
pub mod light;
pub mod material;
pub mod mesh;
pub mod model;
pub mod scene;
pub mod transform;
pub mod vertex;

pub use bounds::Aabb;
pub use camera::{Camera, Frustum, Projection};
pub use error::{HelioError, Result};
pub use light::{Light, LightType};
pub use material::{CullMode, Material, ShaderParameter};
pub use mesh::{primitives, Mesh};
pub use model::{AssetId, Geometry, MetadataValue, Model, LIGHTMAP_DENSITY_KEY, LIGHTMAP_SIZE_KEY};
pub use scene::{Entity, EntityId, Scene, StaticModel};
pub use transform::Transform;
pub use vertex::Vertex;

pub use glam;
