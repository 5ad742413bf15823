use std::ops::Index;

use crate::Vec3f;

/// 3D axis aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3f {
    pub min: Vec3f,
    pub max: Vec3f,
}

impl Default for Bounds3f {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds3f {
    /// Bounds that contain nothing; the union identity
    pub const EMPTY: Self = Self {
        min: Vec3f::MAX,
        max: Vec3f::MIN,
    };

    /// Create a bounds that contains both the given points
    #[inline]
    pub fn new(p1: Vec3f, p2: Vec3f) -> Self {
        Self {
            min: p1.min(p2),
            max: p1.max(p2),
        }
    }

    /// Create a bounds that contains only the given point
    #[inline]
    pub fn at_point(point: Vec3f) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Does this bounds contain no points
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Create bounding box containing self and the provided point
    #[inline]
    pub fn union_point(&self, point: Vec3f) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    /// Create bounding box containing self and the provided bounding box
    #[inline]
    pub fn union_box(&self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Extend self to contain the provided bounding box
    #[inline]
    pub fn extend(&mut self, other: Self) {
        *self = self.union_box(other);
    }

    /// Does self fully contain the other bounds
    #[inline]
    pub fn contains_box(&self, other: Self) -> bool {
        other.is_empty()
            || (self.min.x <= other.min.x
                && self.min.y <= other.min.y
                && self.min.z <= other.min.z
                && self.max.x >= other.max.x
                && self.max.y >= other.max.y
                && self.max.z >= other.max.z)
    }

    /// Is the given point inside self
    #[inline]
    pub fn contains_point(&self, point: Vec3f) -> bool {
        point.x >= self.min.x
            && point.y >= self.min.y
            && point.z >= self.min.z
            && point.x <= self.max.x
            && point.y <= self.max.y
            && point.z <= self.max.z
    }

    /// Get a vector from the minimum to the maximum points of the bounds
    #[inline]
    pub fn diagonal(&self) -> Vec3f {
        self.max - self.min
    }

    /// Centre point of the bounding box
    #[inline]
    pub fn centroid(&self) -> Vec3f {
        (self.min + self.max) * 0.5
    }

    /// Half the surface area of the box, the SAH area metric
    #[inline]
    pub fn half_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.diagonal();
        d.x * d.y + d.y * d.z + d.z * d.x
    }

    /// Index of the longest axis (x = 0; y = 1; z = 2)
    #[inline]
    pub fn maximum_extent(&self) -> usize {
        self.diagonal().max_dimension()
    }

    /// Linear interpolation between the two-time bounds of a moving box
    #[inline]
    pub fn lerp(&self, other: Self, t: f32) -> Self {
        Self {
            min: self.min.lerp(other.min, t),
            max: self.max.lerp(other.max, t),
        }
    }

    /// Position of a point relative to the box where (0,0,0) is the minimum
    /// corner and (1,1,1) the maximum
    #[inline]
    pub fn offset(&self, point: Vec3f) -> Vec3f {
        let mut o = point - self.min;
        if self.max.x > self.min.x {
            o.x /= self.max.x - self.min.x;
        }
        if self.max.y > self.min.y {
            o.y /= self.max.y - self.min.y;
        }
        if self.max.z > self.min.z {
            o.z /= self.max.z - self.min.z;
        }
        o
    }

    /// Grow the box by an epsilon in every direction, relative to its size
    #[inline]
    pub fn enlarged(&self, eps: f32) -> Self {
        let delta = self.diagonal() * eps;
        Self {
            min: self.min - delta,
            max: self.max + delta,
        }
    }
}

impl Index<usize> for Bounds3f {
    type Output = Vec3f;

    fn index(&self, index: usize) -> &Vec3f {
        assert!(index < 2);
        if index == 0 {
            &self.min
        } else {
            &self.max
        }
    }
}
