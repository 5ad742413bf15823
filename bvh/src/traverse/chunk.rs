use simd::{SimdBool, SimdF32, SimdU32, SimdVec3};

use crate::bvh4::Bvh4;
use crate::node::{NodeRef, CHUNK_STACK_SIZE};
use crate::ray::{RayPacket, OCCLUDED_ID};
use crate::traverse::single;
use crate::triangle::LeafPrimitive;

/// Find the closest hit for every active packet lane
pub fn intersect_packet<P: LeafPrimitive, const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4<P>,
    ray: &mut RayPacket<N>,
) {
    traverse_intersect(valid, bvh, ray, 0);
}

/// Occlusion test for every active packet lane; occluded lanes get their
/// geometry id zeroed
pub fn occluded_packet<P: LeafPrimitive, const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4<P>,
    ray: &mut RayPacket<N>,
) {
    traverse_occluded(valid, bvh, ray, 0);
}

#[inline]
pub(crate) fn rcp_safe_vec<const N: usize>(v: SimdVec3<N>) -> SimdVec3<N> {
    SimdVec3 {
        x: v.x.rcp_safe(),
        y: v.y.rcp_safe(),
        z: v.z.rcp_safe(),
    }
}

/// Per-lane slab test of one child box broadcast over the packet
#[inline]
#[allow(clippy::too_many_arguments)]
pub(crate) fn intersect_box<const N: usize>(
    lower: [f32; 3],
    upper: [f32; 3],
    org: SimdVec3<N>,
    rdir: SimdVec3<N>,
    tnear: SimdF32<N>,
    tfar: SimdF32<N>,
) -> (SimdBool<N>, SimdF32<N>) {
    let clip_min_x = (SimdF32::splat(lower[0]) - org.x) * rdir.x;
    let clip_min_y = (SimdF32::splat(lower[1]) - org.y) * rdir.y;
    let clip_min_z = (SimdF32::splat(lower[2]) - org.z) * rdir.z;
    let clip_max_x = (SimdF32::splat(upper[0]) - org.x) * rdir.x;
    let clip_max_y = (SimdF32::splat(upper[1]) - org.y) * rdir.y;
    let clip_max_z = (SimdF32::splat(upper[2]) - org.z) * rdir.z;

    let near = clip_min_x
        .min(clip_max_x)
        .max(clip_min_y.min(clip_max_y))
        .max(clip_min_z.min(clip_max_z));
    let far = clip_min_x
        .max(clip_max_x)
        .min(clip_min_y.max(clip_max_y))
        .min(clip_min_z.max(clip_max_z));
    let hit = near.max(tnear).le(far.min(tfar));
    (hit, near)
}

pub(crate) fn traverse_intersect<P: LeafPrimitive, const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4<P>,
    ray: &mut RayPacket<N>,
    switch_threshold: usize,
) {
    if bvh.root == NodeRef::Empty || valid.none() {
        return;
    }

    let org = ray.origin;
    let rdir = rcp_safe_vec(ray.dir);
    let ray_tnear = SimdF32::select(valid, ray.tnear, SimdF32::INFINITY);
    let mut ray_tfar = SimdF32::select(valid, ray.tfar, SimdF32::NEG_INFINITY);

    // Bottom entry is a sentinel so the pop loop needs no emptiness check
    let mut stack_node = [NodeRef::Invalid; CHUNK_STACK_SIZE];
    let mut stack_near = [SimdF32::<N>::INFINITY; CHUNK_STACK_SIZE];
    stack_node[1] = bvh.root;
    stack_near[1] = ray_tnear;
    let mut sp = 2usize;

    loop {
        sp -= 1;
        let mut cur = stack_node[sp];
        if cur == NodeRef::Invalid {
            break;
        }
        let mut cur_dist = stack_near[sp];

        // Lanes whose closest hit already precedes this subtree are done
        let active = cur_dist.lt(ray_tfar);
        if active.none() {
            continue;
        }

        // Too few coherent lanes left: finish this subtree per ray
        if active.count() <= switch_threshold {
            for i in 0..N {
                if !active[i] {
                    continue;
                }
                let mut lane = ray.lane(i);
                single::intersect_from(bvh, cur, f32::NEG_INFINITY, &mut lane);
                ray.set_lane(i, &lane);
            }
            ray_tfar = SimdF32::select(valid, ray.tfar, SimdF32::NEG_INFINITY);
            continue;
        }

        while let NodeRef::Inner(index) = cur {
            let node = &bvh.nodes[index as usize];

            // Pre-pop the next entry; it is pushed back if the current
            // node yields a closer child
            sp -= 1;
            cur = stack_node[sp];
            cur_dist = stack_near[sp];

            for i in 0..4 {
                let child = node.children[i];
                if child == NodeRef::Empty {
                    break;
                }
                let bounds = node.child_bounds(i);
                let (hit, near) = intersect_box(
                    bounds.min.to_array(),
                    bounds.max.to_array(),
                    org,
                    rdir,
                    ray_tnear,
                    ray_tfar,
                );
                if hit.any() {
                    let child_dist = SimdF32::select(hit, near, SimdF32::INFINITY);
                    debug_assert!(sp < CHUNK_STACK_SIZE);
                    // Keep the closer of the running node and this child,
                    // push the other
                    if cur_dist.lt(child_dist).any() {
                        stack_node[sp] = child;
                        stack_near[sp] = child_dist;
                    } else {
                        stack_node[sp] = cur;
                        stack_near[sp] = cur_dist;
                        cur = child;
                        cur_dist = child_dist;
                    }
                    sp += 1;
                }
            }
        }

        if cur == NodeRef::Invalid {
            break;
        }
        if let NodeRef::Leaf { start, count } = cur {
            let valid_leaf = ray_tfar.gt(cur_dist);
            P::intersect_packet(valid_leaf, bvh.leaf(start, count), ray);
            ray_tfar = SimdF32::select(valid_leaf, ray.tfar, ray_tfar);
        }
    }
}

pub(crate) fn traverse_occluded<P: LeafPrimitive, const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4<P>,
    ray: &mut RayPacket<N>,
    switch_threshold: usize,
) {
    if bvh.root == NodeRef::Empty || valid.none() {
        return;
    }

    let mut terminated = !valid;
    let org = ray.origin;
    let rdir = rcp_safe_vec(ray.dir);
    let ray_tnear = SimdF32::select(valid, ray.tnear, SimdF32::INFINITY);
    let mut ray_tfar = SimdF32::select(valid, ray.tfar, SimdF32::NEG_INFINITY);

    let mut stack_node = [NodeRef::Invalid; CHUNK_STACK_SIZE];
    let mut stack_near = [SimdF32::<N>::INFINITY; CHUNK_STACK_SIZE];
    stack_node[1] = bvh.root;
    stack_near[1] = ray_tnear;
    let mut sp = 2usize;

    loop {
        sp -= 1;
        let mut cur = stack_node[sp];
        if cur == NodeRef::Invalid {
            break;
        }
        let mut cur_dist = stack_near[sp];

        let active = cur_dist.lt(ray_tfar);
        if active.none() {
            continue;
        }

        if active.count() <= switch_threshold {
            for i in 0..N {
                if !active[i] {
                    continue;
                }
                let lane = ray.lane(i);
                if single::occluded_from(bvh, cur, &lane) {
                    terminated.set(i, true);
                }
            }
            if terminated.all() {
                break;
            }
            ray_tfar = SimdF32::select(terminated, SimdF32::NEG_INFINITY, ray_tfar);
            continue;
        }

        while let NodeRef::Inner(index) = cur {
            let node = &bvh.nodes[index as usize];

            sp -= 1;
            cur = stack_node[sp];
            cur_dist = stack_near[sp];

            for i in 0..4 {
                let child = node.children[i];
                if child == NodeRef::Empty {
                    break;
                }
                let bounds = node.child_bounds(i);
                let (hit, near) = intersect_box(
                    bounds.min.to_array(),
                    bounds.max.to_array(),
                    org,
                    rdir,
                    ray_tnear,
                    ray_tfar,
                );
                if hit.any() {
                    let child_dist = SimdF32::select(hit, near, SimdF32::INFINITY);
                    debug_assert!(sp < CHUNK_STACK_SIZE);
                    if cur_dist.lt(child_dist).any() {
                        stack_node[sp] = child;
                        stack_near[sp] = child_dist;
                    } else {
                        stack_node[sp] = cur;
                        stack_near[sp] = cur_dist;
                        cur = child;
                        cur_dist = child_dist;
                    }
                    sp += 1;
                }
            }
        }

        if cur == NodeRef::Invalid {
            break;
        }
        if let NodeRef::Leaf { start, count } = cur {
            terminated =
                terminated | P::occluded_packet(!terminated, bvh.leaf(start, count), ray);
            if terminated.all() {
                break;
            }
            ray_tfar = SimdF32::select(terminated, SimdF32::NEG_INFINITY, ray_tfar);
        }
    }

    let occluded = valid & terminated;
    ray.geom_id = SimdU32::select(occluded, SimdU32::splat(OCCLUDED_ID), ray.geom_id);
}
