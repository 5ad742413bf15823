//! Tree traversal kernels: single ray, packet and hybrid variants, plus
//! the motion blur versions over interpolated boxes.

pub mod chunk;
pub mod hybrid;
pub mod motion;
pub mod single;

/// Active lane count at or below which the hybrid kernels leave packet
/// traversal and finish the popped subtree one ray at a time
pub const SWITCH_THRESHOLD: usize = 3;
