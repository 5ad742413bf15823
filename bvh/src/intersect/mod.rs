//! Ray/primitive intersection strategies invoked from the leaf nodes.

mod moeller;
mod pluecker;

use simd::SimdBool;

use crate::ray::{Ray, RayPacket};

/// Leaf intersection strategy for one primitive block type.
///
/// `intersect` variants commit the closest valid hit to the ray's
/// tfar/u/v/ng/geom_id/prim_id fields; `occluded` variants only answer
/// whether any primitive blocks the ray segment.
pub trait LeafIntersect: Sized {
    /// Intersect a single ray with a leaf, updating its hit
    fn intersect1(leaf: &[Self], ray: &mut Ray);

    /// Test a single ray for occlusion, stopping at the first occluder
    fn occluded1(leaf: &[Self], ray: &Ray) -> bool;

    /// Intersect the active lanes of a packet with a leaf
    fn intersect_packet<const N: usize>(valid: SimdBool<N>, leaf: &[Self], ray: &mut RayPacket<N>);

    /// Occlusion test for the active lanes; returns the newly occluded lanes
    fn occluded_packet<const N: usize>(
        valid: SimdBool<N>,
        leaf: &[Self],
        ray: &RayPacket<N>,
    ) -> SimdBool<N>;
}
