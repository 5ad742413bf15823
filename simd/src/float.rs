use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub};

use crate::SimdBool;

/// N-wide vector of f32 lanes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimdF32<const N: usize>(pub [f32; N]);

impl<const N: usize> Default for SimdF32<N> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const N: usize> SimdF32<N> {
    pub const ZERO: Self = Self([0.0; N]);

    /// All lanes set to positive infinity
    pub const INFINITY: Self = Self([f32::INFINITY; N]);

    /// All lanes set to negative infinity
    pub const NEG_INFINITY: Self = Self([f32::NEG_INFINITY; N]);

    /// Create a vector with every lane equal to the given value
    #[inline]
    pub fn splat(value: f32) -> Self {
        Self([value; N])
    }

    #[inline]
    pub fn from_fn(f: impl FnMut(usize) -> f32) -> Self {
        Self(std::array::from_fn(f))
    }

    /// Lane-wise minimum
    #[inline]
    pub fn min(self, rhs: Self) -> Self {
        Self::from_fn(|i| self.0[i].min(rhs.0[i]))
    }

    /// Lane-wise maximum
    #[inline]
    pub fn max(self, rhs: Self) -> Self {
        Self::from_fn(|i| self.0[i].max(rhs.0[i]))
    }

    /// Lane-wise absolute value
    #[inline]
    pub fn abs(self) -> Self {
        Self::from_fn(|i| self.0[i].abs())
    }

    /// Lane-wise reciprocal
    #[inline]
    pub fn rcp(self) -> Self {
        Self::from_fn(|i| 1.0 / self.0[i])
    }

    /// Lane-wise reciprocal that avoids producing NaN for -0.0/+0.0 lanes.
    /// Zero direction components map to +/- infinity, which the slab test
    /// handles correctly.
    #[inline]
    pub fn rcp_safe(self) -> Self {
        Self::from_fn(|i| {
            let v = self.0[i];
            if v.abs() < 1e-18 {
                1.0 / 1e-18f32.copysign(v)
            } else {
                1.0 / v
            }
        })
    }

    /// Lane-wise sign: -1.0 for negative lanes (including -0.0), 1.0 otherwise
    #[inline]
    pub fn signum(self) -> Self {
        Self::from_fn(|i| if self.0[i].is_sign_negative() { -1.0 } else { 1.0 })
    }

    /// Lane-wise linear interpolation: `self + (rhs - self) * t`
    #[inline]
    pub fn lerp(self, rhs: Self, t: Self) -> Self {
        Self::from_fn(|i| self.0[i] + (rhs.0[i] - self.0[i]) * t.0[i])
    }

    #[inline]
    pub fn lt(self, rhs: Self) -> SimdBool<N> {
        SimdBool::from_fn(|i| self.0[i] < rhs.0[i])
    }

    #[inline]
    pub fn le(self, rhs: Self) -> SimdBool<N> {
        SimdBool::from_fn(|i| self.0[i] <= rhs.0[i])
    }

    #[inline]
    pub fn gt(self, rhs: Self) -> SimdBool<N> {
        SimdBool::from_fn(|i| self.0[i] > rhs.0[i])
    }

    #[inline]
    pub fn ge(self, rhs: Self) -> SimdBool<N> {
        SimdBool::from_fn(|i| self.0[i] >= rhs.0[i])
    }

    #[inline]
    pub fn simd_eq(self, rhs: Self) -> SimdBool<N> {
        SimdBool::from_fn(|i| self.0[i] == rhs.0[i])
    }

    #[inline]
    pub fn simd_ne(self, rhs: Self) -> SimdBool<N> {
        SimdBool::from_fn(|i| self.0[i] != rhs.0[i])
    }

    /// Take lanes from `a` where the mask is set, `b` otherwise
    #[inline]
    pub fn select(mask: SimdBool<N>, a: Self, b: Self) -> Self {
        Self::from_fn(|i| if mask.0[i] { a.0[i] } else { b.0[i] })
    }

    /// Smallest lane value
    #[inline]
    pub fn reduce_min(self) -> f32 {
        self.0.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Index of the smallest lane among the lanes selected by `valid`.
    /// At least one lane of `valid` must be set.
    #[inline]
    pub fn select_min(valid: SimdBool<N>, value: Self) -> usize {
        let mut best = usize::MAX;
        let mut best_value = f32::INFINITY;
        for i in 0..N {
            if valid.0[i] && (best == usize::MAX || value.0[i] < best_value) {
                best = i;
                best_value = value.0[i];
            }
        }
        debug_assert!(best != usize::MAX);
        best
    }
}

impl<const N: usize> Add for SimdF32<N> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::from_fn(|i| self.0[i] + rhs.0[i])
    }
}

impl<const N: usize> AddAssign for SimdF32<N> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<const N: usize> Sub for SimdF32<N> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::from_fn(|i| self.0[i] - rhs.0[i])
    }
}

impl<const N: usize> Mul for SimdF32<N> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::from_fn(|i| self.0[i] * rhs.0[i])
    }
}

impl<const N: usize> Mul<f32> for SimdF32<N> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::from_fn(|i| self.0[i] * rhs)
    }
}

impl<const N: usize> Div for SimdF32<N> {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self::from_fn(|i| self.0[i] / rhs.0[i])
    }
}

impl<const N: usize> Neg for SimdF32<N> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::from_fn(|i| -self.0[i])
    }
}

impl<const N: usize> Index<usize> for SimdF32<N> {
    type Output = f32;

    #[inline]
    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

impl<const N: usize> IndexMut<usize> for SimdF32<N> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.0[index]
    }
}

impl<const N: usize> From<[f32; N]> for SimdF32<N> {
    fn from(lanes: [f32; N]) -> Self {
        Self(lanes)
    }
}
