use glam::{UVec2, Vec4};

/// Texels in a page of `size`, counted without `u32` overflow.
pub fn page_texel_count(size: UVec2) -> usize {
    size.x as usize * size.y as usize
}

/// Baked colors of one lightmap page, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct LightmapBakedData {
    pub size: UVec2,
    pub baked_lighting: Vec<Vec4>,
}

impl LightmapBakedData {
    /// Opaque white everywhere.
    pub fn new(size: UVec2) -> Self {
        Self {
            size,
            baked_lighting: vec![Vec4::ONE; page_texel_count(size)],
        }
    }

    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        self.baked_lighting[y as usize * self.size.x as usize + x as usize]
    }

    /// 8-bit RGBA, clamped, for image writers.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.baked_lighting
            .iter()
            .flat_map(|color| {
                (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0)
                    .round()
                    .to_array()
                    .map(|channel| channel as u8)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_count_of_huge_pages_does_not_wrap() {
        let count = page_texel_count(UVec2::new(70_000, 70_000));
        assert_eq!(count as u64, 70_000u64 * 70_000);
    }

    #[test]
    fn starts_white_and_clamps_on_export() {
        let mut data = LightmapBakedData::new(UVec2::new(2, 1));
        assert_eq!(data.texel(1, 0), Vec4::ONE);

        data.baked_lighting[1] = Vec4::new(2.0, 0.5, -1.0, 1.0);
        assert_eq!(data.to_rgba8(), vec![255, 255, 255, 255, 255, 128, 0, 255]);
    }
}
