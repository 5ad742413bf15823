use std::ops::{Index, IndexMut};

use crate::SimdBool;

/// N-wide vector of u32 lanes, used for geometry/primitive identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimdU32<const N: usize>(pub [u32; N]);

impl<const N: usize> Default for SimdU32<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> SimdU32<N> {
    #[inline]
    pub fn splat(value: u32) -> Self {
        Self([value; N])
    }

    #[inline]
    pub fn from_fn(f: impl FnMut(usize) -> u32) -> Self {
        Self(std::array::from_fn(f))
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
}

impl<const N: usize> Index<usize> for SimdU32<N> {
    type Output = u32;

    #[inline]
    fn index(&self, index: usize) -> &u32 {
        &self.0[index]
    }
}

impl<const N: usize> IndexMut<usize> for SimdU32<N> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut u32 {
        &mut self.0[index]
    }
}
