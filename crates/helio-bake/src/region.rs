use glam::{IVec2, UVec2, Vec2, Vec4};

/// A receiver's rectangle inside one lightmap page.
///
/// The texel rectangle excludes padding; the UV rectangle is the texel
/// rectangle divided by the page size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightmapRegion {
    pub lightmap_index: usize,
    pub texel_min: IVec2,
    pub texel_max: IVec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
}

impl LightmapRegion {
    pub fn new(lightmap_index: usize, position: IVec2, size: IVec2, page_size: UVec2) -> Self {
        let texel_min = position;
        let texel_max = position + size;
        let page = page_size.as_vec2();
        Self {
            lightmap_index,
            texel_min,
            texel_max,
            uv_min: texel_min.as_vec2() / page,
            uv_max: texel_max.as_vec2() / page,
        }
    }

    pub fn texel_size(&self) -> IVec2 {
        self.texel_max - self.texel_min
    }

    pub fn uv_size(&self) -> Vec2 {
        self.uv_max - self.uv_min
    }

    /// `(uv_width, uv_height, uv_min.x, uv_min.y)`, mapping a model's `[0, 1]`
    /// lightmap UVs into this region.
    pub fn scale_offset(&self) -> Vec4 {
        let size = self.uv_size();
        Vec4::new(size.x, size.y, self.uv_min.x, self.uv_min.y)
    }

    /// Texel rectangle grown by `padding` on every side.
    pub fn padded(&self, padding: i32) -> (IVec2, IVec2) {
        (
            self.texel_min - IVec2::splat(padding),
            self.texel_max + IVec2::splat(padding),
        )
    }

    pub fn overlaps(&self, other: &LightmapRegion) -> bool {
        self.lightmap_index == other.lightmap_index
            && self.texel_min.cmplt(other.texel_max).all()
            && other.texel_min.cmplt(self.texel_max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uv_rect_is_texel_rect_over_page_size() {
        let region = LightmapRegion::new(0, IVec2::new(2, 2), IVec2::new(100, 100), UVec2::splat(256));
        assert_relative_eq!(region.uv_min.x, 2.0 / 256.0);
        assert_relative_eq!(region.uv_max.y, 102.0 / 256.0);

        let scale_offset = region.scale_offset();
        assert_relative_eq!(scale_offset.x, 100.0 / 256.0);
        assert_relative_eq!(scale_offset.y, 100.0 / 256.0);
        assert_relative_eq!(scale_offset.z, 2.0 / 256.0);
        assert_relative_eq!(scale_offset.w, 2.0 / 256.0);
    }

    #[test]
    fn touching_regions_do_not_overlap() {
        let a = LightmapRegion::new(0, IVec2::ZERO, IVec2::splat(10), UVec2::splat(64));
        let b = LightmapRegion::new(0, IVec2::new(10, 0), IVec2::splat(10), UVec2::splat(64));
        let c = LightmapRegion::new(1, IVec2::ZERO, IVec2::splat(10), UVec2::splat(64));
        assert!(!a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.overlaps(&a));
    }
}
