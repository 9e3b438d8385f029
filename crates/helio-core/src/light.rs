use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Directional,
    Point,
    Spot,
}

/// Light component. Direction comes from the owning entity's transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub cast_shadows: bool,
}

impl Light {
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            color,
            intensity,
            range: f32::INFINITY,
            cast_shadows: true,
        }
    }

    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            color,
            intensity,
            range,
            cast_shadows: true,
        }
    }

    pub fn spot(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Spot,
            color,
            intensity,
            range,
            cast_shadows: true,
        }
    }
}
