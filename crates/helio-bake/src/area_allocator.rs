//! Free-rectangle packer used to place lightmap regions inside pages.

use glam::IVec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    min: IVec2,
    max: IVec2,
}

impl Rect {
    fn new(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    fn size(&self) -> IVec2 {
        self.max - self.min
    }

    fn area(&self) -> i64 {
        let size = self.size();
        size.x as i64 * size.y as i64
    }

    fn is_empty(&self) -> bool {
        self.size().cmple(IVec2::ZERO).any()
    }

    fn overlaps(&self, other: &Rect) -> bool {
        self.min.cmplt(other.max).all() && other.min.cmplt(self.max).all()
    }

    fn contains(&self, other: &Rect) -> bool {
        self.min.cmple(other.min).all() && other.max.cmple(self.max).all()
    }
}

/// Packs rectangles into a growable 2D area.
///
/// Allocation picks the smallest free rectangle that fits. In normal mode the
/// free list holds maximal rectangles: a reservation is carved out of every
/// free rectangle it touches and rectangles contained in others are dropped.
/// Fast mode only splits the chosen rectangle.
#[derive(Debug, Clone)]
pub struct AreaAllocator {
    size: IVec2,
    max_size: IVec2,
    double_width: bool,
    fast_mode: bool,
    free_areas: Vec<Rect>,
}

impl AreaAllocator {
    /// Fixed-size allocator in normal mode.
    pub fn new(width: i32, height: i32) -> Self {
        let mut allocator = Self {
            size: IVec2::ZERO,
            max_size: IVec2::ZERO,
            double_width: true,
            fast_mode: false,
            free_areas: Vec::new(),
        };
        allocator.reset(width, height, 0, 0, false);
        allocator
    }

    /// Clears all allocations. A maximum smaller than the size disables growth on that axis.
    pub fn reset(&mut self, width: i32, height: i32, max_width: i32, max_height: i32, fast_mode: bool) {
        let size = IVec2::new(width.max(0), height.max(0));
        self.size = size;
        self.max_size = IVec2::new(max_width, max_height).max(size);
        self.double_width = true;
        self.fast_mode = fast_mode;
        self.free_areas.clear();
        self.free_areas.push(Rect::new(IVec2::ZERO, size));
    }

    pub fn width(&self) -> i32 {
        self.size.x
    }

    pub fn height(&self) -> i32 {
        self.size.y
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    /// Reserves a `width` x `height` rectangle and returns its top-left corner.
    pub fn allocate(&mut self, width: i32, height: i32) -> Option<IVec2> {
        let requested = IVec2::new(width.max(0), height.max(0));

        let best = loop {
            if let Some(index) = self.find_best_fit(requested) {
                break index;
            }
            if !self.grow() {
                return None;
            }
        };

        let chosen = self.free_areas[best];
        let reserved = Rect::new(chosen.min, chosen.min + requested);

        if self.fast_mode {
            self.free_areas.swap_remove(best);
            let right = Rect::new(
                IVec2::new(reserved.max.x, chosen.min.y),
                IVec2::new(chosen.max.x, reserved.max.y),
            );
            let below = Rect::new(IVec2::new(chosen.min.x, reserved.max.y), chosen.max);
            self.free_areas
                .extend([right, below].into_iter().filter(|rect| !rect.is_empty()));
        } else if !reserved.is_empty() {
            let mut remaining = Vec::with_capacity(self.free_areas.len() + 4);
            for area in self.free_areas.drain(..) {
                if area.overlaps(&reserved) {
                    split_around(&area, &reserved, &mut remaining);
                } else {
                    remaining.push(area);
                }
            }
            self.free_areas = remaining;
            self.cleanup();
        }

        Some(reserved.min)
    }

    fn find_best_fit(&self, requested: IVec2) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for (index, area) in self.free_areas.iter().enumerate() {
            if area.size().cmpge(requested).all()
                && best.map_or(true, |(_, best_area)| area.area() < best_area)
            {
                best = Some((index, area.area()));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Doubles one axis, alternating between width and height, and adds the
    /// new strip as free space. Returns `false` once both axes are at maximum.
    fn grow(&mut self) -> bool {
        let can_grow_width = self.size.x < self.max_size.x;
        let can_grow_height = self.size.y < self.max_size.y;

        let grow_width = match (can_grow_width, can_grow_height) {
            (false, false) => return false,
            (true, true) => self.double_width,
            (width, _) => width,
        };

        if grow_width {
            let old_width = self.size.x;
            self.size.x = (old_width.max(1) * 2).min(self.max_size.x);
            self.free_areas.push(Rect::new(
                IVec2::new(old_width, 0),
                IVec2::new(self.size.x, self.size.y),
            ));
        } else {
            let old_height = self.size.y;
            self.size.y = (old_height.max(1) * 2).min(self.max_size.y);
            self.free_areas.push(Rect::new(
                IVec2::new(0, old_height),
                IVec2::new(self.size.x, self.size.y),
            ));
        }

        log::trace!("Area allocator grew to {}x{}", self.size.x, self.size.y);
        self.double_width = !self.double_width;
        true
    }

    fn cleanup(&mut self) {
        let mut i = 0;
        while i < self.free_areas.len() {
            let area = self.free_areas[i];
            let redundant = self.free_areas.iter().enumerate().any(|(j, other)| {
                j != i && other.contains(&area) && (*other != area || j < i)
            });
            if redundant {
                self.free_areas.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

/// Pushes the maximal parts of `area` lying outside `reserved`.
fn split_around(area: &Rect, reserved: &Rect, out: &mut Vec<Rect>) {
    if reserved.min.x > area.min.x {
        out.push(Rect::new(area.min, IVec2::new(reserved.min.x, area.max.y)));
    }
    if reserved.max.x < area.max.x {
        out.push(Rect::new(IVec2::new(reserved.max.x, area.min.y), area.max));
    }
    if reserved.min.y > area.min.y {
        out.push(Rect::new(area.min, IVec2::new(area.max.x, reserved.min.y)));
    }
    if reserved.max.y < area.max.y {
        out.push(Rect::new(IVec2::new(area.min.x, reserved.max.y), area.max));
    }
}
