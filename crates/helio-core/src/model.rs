//! Static models: geometries with LOD chains plus free-form metadata.

use crate::bounds::Aabb;
use crate::error::{HelioError, Result};
use crate::mesh::Mesh;
use glam::UVec2;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metadata key holding the nominal lightmap size of a model, in texels.
pub const LIGHTMAP_SIZE_KEY: &str = "LightmapSize";
/// Metadata key holding the texel density the nominal size was computed for.
pub const LIGHTMAP_DENSITY_KEY: &str = "LightmapDensity";

/// Process-unique identity of a loaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    UInt(u32),
    Float(f32),
    UVec2(UVec2),
    String(String),
}

/// One sub-geometry of a model; `lods[0]` is the most detailed level.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub lods: Vec<Mesh>,
}

impl Geometry {
    pub fn new(lods: Vec<Mesh>) -> Self {
        Self { lods }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub id: AssetId,
    pub name: String,
    pub geometries: Vec<Geometry>,
    pub metadata: HashMap<String, MetadataValue>,
    pub bounds: Aabb,
}

impl Model {
    pub fn new(name: impl Into<String>, geometries: Vec<Geometry>) -> Self {
        let mut bounds = Aabb::EMPTY;
        for lod in geometries.iter().flat_map(|geometry| geometry.lods.iter()) {
            bounds.merge(&lod.bounds);
        }

        Self {
            id: AssetId::next(),
            name: name.into(),
            geometries,
            metadata: HashMap::new(),
            bounds,
        }
    }

    /// Single-geometry, single-LOD model.
    pub fn from_mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self::new(name, vec![Geometry::new(vec![mesh])])
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attach the lightmap size and density that UV generation produced.
    pub fn with_lightmap_metadata(self, size: UVec2, density: u32) -> Self {
        self.with_metadata(LIGHTMAP_SIZE_KEY, MetadataValue::UVec2(size))
            .with_metadata(LIGHTMAP_DENSITY_KEY, MetadataValue::UInt(density))
    }

    pub fn metadata(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    pub fn lightmap_size(&self) -> Result<UVec2> {
        match self.metadata(LIGHTMAP_SIZE_KEY) {
            Some(MetadataValue::UVec2(size)) => Ok(*size),
            Some(_) => Err(self.invalid_metadata(LIGHTMAP_SIZE_KEY)),
            None => Err(self.missing_metadata(LIGHTMAP_SIZE_KEY)),
        }
    }

    pub fn lightmap_density(&self) -> Result<u32> {
        match self.metadata(LIGHTMAP_DENSITY_KEY) {
            Some(MetadataValue::UInt(density)) if *density > 0 => Ok(*density),
            Some(_) => Err(self.invalid_metadata(LIGHTMAP_DENSITY_KEY)),
            None => Err(self.missing_metadata(LIGHTMAP_DENSITY_KEY)),
        }
    }

    pub fn lod_count(&self) -> usize {
        self.geometries.iter().map(|geometry| geometry.lods.len()).sum()
    }

    fn missing_metadata(&self, key: &str) -> HelioError {
        HelioError::MissingMetadata {
            model: self.name.clone(),
            key: key.to_string(),
        }
    }

    fn invalid_metadata(&self, key: &str) -> HelioError {
        HelioError::InvalidMetadata {
            model: self.name.clone(),
            key: key.to_string(),
        }
    }
}
