//! Axis-aligned bounding boxes shared by voxels, props, actors and cars.

/// Axis-Aligned Bounding Box for collision detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the box (x, y, z).
    pub min: [f32; 3],
    /// Maximum corner of the box (x, y, z).
    pub max: [f32; 3],
}

impl Aabb {
    /// Creates a new AABB.
    #[must_use]
    pub const fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// Creates an AABB standing on `feet` with the given footprint width and height.
    #[must_use]
    pub fn from_feet(feet: [f32; 3], width: f32, height: f32) -> Self {
        let half_w = width / 2.0;
        Self {
            min: [feet[0] - half_w, feet[1], feet[2] - half_w],
            max: [feet[0] + half_w, feet[1] + height, feet[2] + half_w],
        }
    }

    /// Creates an AABB for a single voxel at integer coordinates.
    #[must_use]
    pub fn from_voxel(x: i32, y: i32, z: i32) -> Self {
        Self {
            min: [x as f32, y as f32, z as f32],
            max: [(x + 1) as f32, (y + 1) as f32, (z + 1) as f32],
        }
    }

    /// Checks if this AABB intersects another. Touching faces do not count.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min[0] < other.max[0]
            && self.max[0] > other.min[0]
            && self.min[1] < other.max[1]
            && self.max[1] > other.min[1]
            && self.min[2] < other.max[2]
            && self.max[2] > other.min[2]
    }

    /// Returns true if the point lies inside the box.
    #[must_use]
    pub fn contains_point(&self, p: [f32; 3]) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Returns the overlap amount on each axis. Positive = overlap, Negative = gap.
    #[must_use]
    pub fn overlap(&self, other: &Self) -> [f32; 3] {
        [
            self.max[0].min(other.max[0]) - self.min[0].max(other.min[0]),
            self.max[1].min(other.max[1]) - self.min[1].max(other.min[1]),
            self.max[2].min(other.max[2]) - self.min[2].max(other.min[2]),
        ]
    }

    /// Moves the AABB by delta.
    #[must_use]
    pub fn translate(&self, delta: [f32; 3]) -> Self {
        Self {
            min: [self.min[0] + delta[0], self.min[1] + delta[1], self.min[2] + delta[2]],
            max: [self.max[0] + delta[0], self.max[1] + delta[1], self.max[2] + delta[2]],
        }
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Slab test against a ray. Returns the entry distance along `dir`.
    ///
    /// `dir` does not need to be normalised; the distance is in units of `dir`.
    #[must_use]
    pub fn ray_intersect(&self, origin: [f32; 3], dir: [f32; 3]) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            if dir[axis].abs() < 1e-6 {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[axis];
            let mut t0 = (self.min[axis] - origin[axis]) * inv;
            let mut t1 = (self.max[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}
