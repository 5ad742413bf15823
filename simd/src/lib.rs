//! Portable fixed-width SIMD wrapper types.
//!
//! One scalar reference implementation serves every lane count used by the
//! ray tracing kernels (4, 8 and 16 wide).  The types expose the operation
//! set the kernels rely on (lane-wise min/max/select, mask movemask and
//! bit-scan style iteration) without committing to any instruction set.

mod float;
mod mask;
mod uint;
mod vec3;

#[cfg(test)]
mod tests;

pub use float::SimdF32;
pub use mask::SimdBool;
pub use uint::SimdU32;
pub use vec3::SimdVec3;

/// Lane counts supported by the traversal kernels.
pub const PACKET_WIDTHS: [usize; 3] = [4, 8, 16];
