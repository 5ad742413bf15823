use std::ops::{Add, Mul, Neg, Sub};

use crate::{SimdBool, SimdF32};

/// Three component vector with N-wide SIMD lanes per component
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimdVec3<const N: usize> {
    pub x: SimdF32<N>,
    pub y: SimdF32<N>,
    pub z: SimdF32<N>,
}

impl<const N: usize> SimdVec3<N> {
    pub const ZERO: Self = Self {
        x: SimdF32::ZERO,
        y: SimdF32::ZERO,
        z: SimdF32::ZERO,
    };

    #[inline]
    pub fn new(x: SimdF32<N>, y: SimdF32<N>, z: SimdF32<N>) -> Self {
        Self { x, y, z }
    }

    /// Broadcast one scalar 3-vector across all lanes
    #[inline]
    pub fn splat(x: f32, y: f32, z: f32) -> Self {
        Self {
            x: SimdF32::splat(x),
            y: SimdF32::splat(y),
            z: SimdF32::splat(z),
        }
    }

    /// Extract the scalar 3-vector held in one lane
    #[inline]
    pub fn lane(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    /// Lane-wise dot product
    #[inline]
    pub fn dot(self, rhs: Self) -> SimdF32<N> {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Lane-wise cross product
    #[inline]
    pub fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    /// Lane-wise linear interpolation per component
    #[inline]
    pub fn lerp(self, rhs: Self, t: SimdF32<N>) -> Self {
        Self {
            x: self.x.lerp(rhs.x, t),
            y: self.y.lerp(rhs.y, t),
            z: self.z.lerp(rhs.z, t),
        }
    }

    /// Take lanes from `a` where the mask is set, `b` otherwise
    #[inline]
    pub fn select(mask: SimdBool<N>, a: Self, b: Self) -> Self {
        Self {
            x: SimdF32::select(mask, a.x, b.x),
            y: SimdF32::select(mask, a.y, b.y),
            z: SimdF32::select(mask, a.z, b.z),
        }
    }
}

impl<const N: usize> Add for SimdVec3<N> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl<const N: usize> Sub for SimdVec3<N> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl<const N: usize> Mul<SimdF32<N>> for SimdVec3<N> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: SimdF32<N>) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl<const N: usize> Mul for SimdVec3<N> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }
}

impl<const N: usize> Neg for SimdVec3<N> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}
