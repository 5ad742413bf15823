//! Hybrid packet traversal. Runs the chunk kernel while enough lanes stay
//! coherent and drops to single-ray traversal for the popped subtree once
//! the active lane count falls to [`SWITCH_THRESHOLD`] or below.

use simd::SimdBool;

use crate::bvh4::Bvh4;
use crate::ray::RayPacket;
use crate::traverse::chunk;
use crate::traverse::SWITCH_THRESHOLD;
use crate::triangle::LeafPrimitive;

/// Find the closest hit for every active packet lane
pub fn intersect_packet<P: LeafPrimitive, const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4<P>,
    ray: &mut RayPacket<N>,
) {
    chunk::traverse_intersect(valid, bvh, ray, SWITCH_THRESHOLD);
}

/// Occlusion test for every active packet lane; occluded lanes get their
/// geometry id zeroed
pub fn occluded_packet<P: LeafPrimitive, const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4<P>,
    ray: &mut RayPacket<N>,
) {
    chunk::traverse_occluded(valid, bvh, ray, SWITCH_THRESHOLD);
}
