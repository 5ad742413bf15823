use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Index, Not};

/// N-wide vector of boolean lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimdBool<const N: usize>(pub [bool; N]);

impl<const N: usize> Default for SimdBool<N> {
    fn default() -> Self {
        Self::NONE
    }
}

impl<const N: usize> SimdBool<N> {
    /// All lanes cleared
    pub const NONE: Self = Self([false; N]);

    /// All lanes set
    pub const ALL: Self = Self([true; N]);

    #[inline]
    pub fn splat(value: bool) -> Self {
        Self([value; N])
    }

    #[inline]
    pub fn from_fn(f: impl FnMut(usize) -> bool) -> Self {
        Self(std::array::from_fn(f))
    }

    /// Build a mask from the low N bits of an integer lane mask
    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        Self::from_fn(|i| bits & (1 << i) != 0)
    }

    /// Is any lane set
    #[inline]
    pub fn any(self) -> bool {
        self.0.iter().any(|&b| b)
    }

    /// Are all lanes set
    #[inline]
    pub fn all(self) -> bool {
        self.0.iter().all(|&b| b)
    }

    /// Are all lanes cleared
    #[inline]
    pub fn none(self) -> bool {
        !self.any()
    }

    /// Number of set lanes
    #[inline]
    pub fn count(self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    /// Integer mask with bit i set iff lane i is set
    #[inline]
    pub fn movemask(self) -> u32 {
        let mut bits = 0;
        for i in 0..N {
            if self.0[i] {
                bits |= 1 << i;
            }
        }
        bits
    }

    #[inline]
    pub fn set(&mut self, lane: usize, value: bool) {
        self.0[lane] = value;
    }
}

impl<const N: usize> BitAnd for SimdBool<N> {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self::from_fn(|i| self.0[i] & rhs.0[i])
    }
}

impl<const N: usize> BitAndAssign for SimdBool<N> {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}

impl<const N: usize> BitOr for SimdBool<N> {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self::from_fn(|i| self.0[i] | rhs.0[i])
    }
}

impl<const N: usize> BitOrAssign for SimdBool<N> {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl<const N: usize> Not for SimdBool<N> {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self::from_fn(|i| !self.0[i])
    }
}

impl<const N: usize> Index<usize> for SimdBool<N> {
    type Output = bool;

    #[inline]
    fn index(&self, index: usize) -> &bool {
        &self.0[index]
    }
}
