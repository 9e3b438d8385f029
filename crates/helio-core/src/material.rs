use glam::{Vec2, Vec3, Vec4};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShaderParameter {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
}

impl ShaderParameter {
    pub fn as_vec4(&self) -> Option<Vec4> {
        match *self {
            ShaderParameter::Vec4(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    #[default]
    Back,
    Front,
    None,
}

/// Material as seen by the renderer: a technique plus named shader parameters.
///
/// Cloning is cheap enough to hand every renderable its own copy, which is
/// how per-instance parameters (lightmap offsets, tints) are set.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub technique: String,
    pub cull_mode: CullMode,
    parameters: HashMap<String, ShaderParameter>,
}

impl Material {
    pub fn new(name: impl Into<String>, technique: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            technique: technique.into(),
            cull_mode: CullMode::default(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: ShaderParameter) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn set_shader_parameter(&mut self, name: impl Into<String>, value: ShaderParameter) {
        self.parameters.insert(name.into(), value);
    }

    pub fn shader_parameter(&self, name: &str) -> Option<&ShaderParameter> {
        self.parameters.get(name)
    }

    pub fn has_shader_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_do_not_share_parameters() {
        let template = Material::new("Baker", "LightmapGBuffer")
            .with_parameter("LMOffset", ShaderParameter::Vec4(Vec4::new(1.0, 1.0, 0.0, 0.0)));

        let mut instance = template.clone();
        instance.set_shader_parameter("LMOffset", ShaderParameter::Vec4(Vec4::splat(0.5)));

        assert_eq!(
            template.shader_parameter("LMOffset").and_then(ShaderParameter::as_vec4),
            Some(Vec4::new(1.0, 1.0, 0.0, 0.0))
        );
        assert_eq!(
            instance.shader_parameter("LMOffset").and_then(ShaderParameter::as_vec4),
            Some(Vec4::splat(0.5))
        );
    }
}
