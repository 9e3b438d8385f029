use crate::error::{BakeError, Result};
use serde::{Deserialize, Serialize};

/// Configuration of one lightmap baking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightmapBakingSettings {
    /// Edge length of a standard lightmap page, in texels.
    pub lightmap_size: u32,
    /// Number of horizontal strips traced in parallel per page.
    pub num_parallel_chunks: u32,
    /// Texels per world unit.
    pub texel_density: u32,
    /// Lower bound of the footprint rescale factor.
    pub min_lightmap_scale: f32,
    /// Texels reserved on every side of each region.
    pub lightmap_padding: u32,
    pub baking_material: String,
    pub baking_render_path: String,
}

impl Default for LightmapBakingSettings {
    fn default() -> Self {
        Self {
            lightmap_size: 512,
            num_parallel_chunks: 4,
            texel_density: 32,
            min_lightmap_scale: 1.0,
            lightmap_padding: 1,
            baking_material: "Materials/LightmapBaker.xml".to_string(),
            baking_render_path: "RenderPaths/LightmapGBuffer.xml".to_string(),
        }
    }
}

impl LightmapBakingSettings {
    pub fn with_lightmap_size(mut self, size: u32) -> Self {
        self.lightmap_size = size;
        self
    }

    pub fn with_parallel_chunks(mut self, chunks: u32) -> Self {
        self.num_parallel_chunks = chunks;
        self
    }

    pub fn with_texel_density(mut self, density: u32) -> Self {
        self.texel_density = density;
        self
    }

    pub fn with_min_lightmap_scale(mut self, scale: f32) -> Self {
        self.min_lightmap_scale = scale;
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.lightmap_padding = padding;
        self
    }

    pub fn with_baking_material(mut self, path: impl Into<String>) -> Self {
        self.baking_material = path.into();
        self
    }

    pub fn with_baking_render_path(mut self, path: impl Into<String>) -> Self {
        self.baking_render_path = path.into();
        self
    }

    /// Checks the page size against the tracer's packet width and the chunk count.
    pub fn validate(&self, packet_width: usize) -> Result<()> {
        let size = self.lightmap_size as usize;
        if size == 0 {
            return Err(BakeError::InvalidSettings("lightmap_size must be positive".into()));
        }
        if self.num_parallel_chunks == 0 {
            return Err(BakeError::InvalidSettings(
                "num_parallel_chunks must be positive".into(),
            ));
        }
        if packet_width == 0 || size % packet_width != 0 {
            return Err(BakeError::InvalidSettings(format!(
                "lightmap_size {size} is not a multiple of the ray packet width {packet_width}"
            )));
        }
        if size % self.num_parallel_chunks as usize != 0 {
            return Err(BakeError::InvalidSettings(format!(
                "lightmap_size {size} is not a multiple of num_parallel_chunks {}",
                self.num_parallel_chunks
            )));
        }
        if self.texel_density == 0 {
            return Err(BakeError::InvalidSettings("texel_density must be positive".into()));
        }
        if !(self.min_lightmap_scale.is_finite() && self.min_lightmap_scale > 0.0) {
            return Err(BakeError::InvalidSettings(format!(
                "min_lightmap_scale {} must be a positive number",
                self.min_lightmap_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(LightmapBakingSettings::default().validate(16).is_ok());
    }

    #[test]
    fn size_must_divide_by_packet_and_chunks() {
        let settings = LightmapBakingSettings::default().with_lightmap_size(100);
        assert!(matches!(
            settings.validate(16),
            Err(BakeError::InvalidSettings(_))
        ));

        let settings = LightmapBakingSettings::default()
            .with_lightmap_size(256)
            .with_parallel_chunks(3);
        assert!(matches!(
            settings.validate(16),
            Err(BakeError::InvalidSettings(_))
        ));

        let settings = settings.with_parallel_chunks(4);
        assert!(settings.validate(16).is_ok());
    }

    #[test]
    fn zero_chunks_and_bad_scale_are_rejected() {
        let base = LightmapBakingSettings::default();
        assert!(base.clone().with_parallel_chunks(0).validate(16).is_err());
        assert!(base.clone().with_min_lightmap_scale(0.0).validate(16).is_err());
        assert!(base.with_texel_density(0).validate(16).is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings: LightmapBakingSettings =
            serde_json::from_str(r#"{ "lightmap_size": 1024, "lightmap_padding": 3 }"#).unwrap();
        assert_eq!(settings.lightmap_size, 1024);
        assert_eq!(settings.lightmap_padding, 3);
        assert_eq!(settings.num_parallel_chunks, 4);
        assert_eq!(settings.baking_material, "Materials/LightmapBaker.xml");
    }
}
