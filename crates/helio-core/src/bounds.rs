use glam::{Mat4, Vec3};

/// Axis-aligned bounding box.
///
/// A box built with [`Aabb::EMPTY`] is undefined until the first point or box
/// is merged into it; merging into an undefined box simply adopts the other side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut aabb = Self::EMPTY;
        for &point in points {
            aabb.merge_point(point);
        }
        aabb
    }

    pub fn is_defined(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    pub fn merge_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merge(&mut self, other: &Aabb) {
        if !other.is_defined() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full edge lengths; zero for an undefined box.
    pub fn size(&self) -> Vec3 {
        if self.is_defined() {
            self.max - self.min
        } else {
            Vec3::ZERO
        }
    }

    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Length of the main diagonal.
    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    pub fn transform(&self, matrix: &Mat4) -> Aabb {
        if !self.is_defined() {
            return *self;
        }

        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        let mut result = Self::EMPTY;
        for corner in corners {
            result.merge_point(matrix.transform_point3(corner));
        }
        result
    }

    pub fn grow(&self, amount: Vec3) -> Aabb {
        Aabb {
            min: self.min - amount,
            max: self.max + amount,
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_box_adopts_first_merge() {
        let mut aabb = Aabb::EMPTY;
        assert!(!aabb.is_defined());
        assert_eq!(aabb.size(), Vec3::ZERO);

        aabb.merge(&Aabb::new(Vec3::ONE, Vec3::splat(2.0)));
        assert!(aabb.is_defined());
        assert_eq!(aabb.min, Vec3::ONE);
        assert_eq!(aabb.max, Vec3::splat(2.0));
    }

    #[test]
    fn merging_undefined_box_is_a_no_op() {
        let mut aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        aabb.merge(&Aabb::EMPTY);
        assert_eq!(aabb, Aabb::new(Vec3::ZERO, Vec3::ONE));
    }

    #[test]
    fn diagonal_of_unit_cube() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_relative_eq!(aabb.diagonal(), 3.0_f32.sqrt());
    }

    #[test]
    fn transform_translates_and_scales() {
        let aabb = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            glam::Quat::IDENTITY,
            Vec3::new(10.0, 0.0, 0.0),
        );
        let moved = aabb.transform(&matrix);
        assert_relative_eq!(moved.min.x, 9.0);
        assert_relative_eq!(moved.max.x, 11.0);
        assert_relative_eq!(moved.size().y, 2.0);
    }
}
