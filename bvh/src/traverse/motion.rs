//! Motion blur traversal. The node boxes at both time samples are
//! interpolated to the ray time before the slab test; leaves hold
//! two-sample triangles interpolated the same way.

use geometry::Vec3f;
use simd::{SimdBool, SimdF32, SimdU32, SimdVec3};

use crate::bvh4::Bvh4MB;
use crate::intersect::LeafIntersect;
use crate::node::{sort3, sort4};
use crate::node::{Node4MB, NodeRef, StackItem, CHUNK_STACK_SIZE, SINGLE_STACK_SIZE};
use crate::ray::{Ray, RayPacket, OCCLUDED_ID};
use crate::traverse::chunk::rcp_safe_vec;
use crate::traverse::single::rcp_safe;
use crate::traverse::SWITCH_THRESHOLD;
use crate::triangle::Triangle1vMB;

/// Per-ray state for the interpolated four-wide slab test
struct MotionContext {
    org: Vec3f,
    rdir: Vec3f,
    signs: [bool; 3],
    time: f32,
}

impl MotionContext {
    fn new(ray: &Ray) -> Self {
        Self {
            org: ray.origin,
            rdir: Vec3f::new(
                rcp_safe(ray.dir.x),
                rcp_safe(ray.dir.y),
                rcp_safe(ray.dir.z),
            ),
            signs: [ray.dir.x >= 0.0, ray.dir.y >= 0.0, ray.dir.z >= 0.0],
            time: ray.time,
        }
    }

    /// Slab test against the four child boxes interpolated to the ray time
    #[inline]
    fn intersect_node(&self, node: &Node4MB, tnear: f32, tfar: f32) -> (SimdBool<4>, SimdF32<4>) {
        let lower_x = Node4MB::lerp_lanes(node.lower0_x, node.lower1_x, self.time);
        let lower_y = Node4MB::lerp_lanes(node.lower0_y, node.lower1_y, self.time);
        let lower_z = Node4MB::lerp_lanes(node.lower0_z, node.lower1_z, self.time);
        let upper_x = Node4MB::lerp_lanes(node.upper0_x, node.upper1_x, self.time);
        let upper_y = Node4MB::lerp_lanes(node.upper0_y, node.upper1_y, self.time);
        let upper_z = Node4MB::lerp_lanes(node.upper0_z, node.upper1_z, self.time);

        let (near_x, far_x) = order(self.signs[0], lower_x, upper_x);
        let (near_y, far_y) = order(self.signs[1], lower_y, upper_y);
        let (near_z, far_z) = order(self.signs[2], lower_z, upper_z);

        let t_near_x = (near_x - SimdF32::splat(self.org.x)) * self.rdir.x;
        let t_near_y = (near_y - SimdF32::splat(self.org.y)) * self.rdir.y;
        let t_near_z = (near_z - SimdF32::splat(self.org.z)) * self.rdir.z;
        let t_far_x = (far_x - SimdF32::splat(self.org.x)) * self.rdir.x;
        let t_far_y = (far_y - SimdF32::splat(self.org.y)) * self.rdir.y;
        let t_far_z = (far_z - SimdF32::splat(self.org.z)) * self.rdir.z;

        let t_near = t_near_x
            .max(t_near_y)
            .max(t_near_z)
            .max(SimdF32::splat(tnear));
        let t_far = t_far_x.min(t_far_y).min(t_far_z).min(SimdF32::splat(tfar));
        (t_near.le(t_far), t_near)
    }
}

#[inline]
fn order(positive: bool, lower: SimdF32<4>, upper: SimdF32<4>) -> (SimdF32<4>, SimdF32<4>) {
    if positive {
        (lower, upper)
    } else {
        (upper, lower)
    }
}

/// Find the closest hit for a single ray at its motion blur time
pub fn intersect(bvh: &Bvh4MB, ray: &mut Ray) {
    intersect_from(bvh, bvh.root, f32::NEG_INFINITY, ray);
}

pub(crate) fn intersect_from(bvh: &Bvh4MB, root: NodeRef, root_dist: f32, ray: &mut Ray) {
    if root == NodeRef::Empty {
        return;
    }
    let ctx = MotionContext::new(ray);
    let mut stack = [StackItem::PLACEHOLDER; SINGLE_STACK_SIZE];
    stack[0] = StackItem {
        node: root,
        dist: root_dist,
    };
    let mut sp = 1usize;

    'pop: while sp > 0 {
        sp -= 1;
        if stack[sp].dist > ray.tfar {
            continue;
        }
        let mut cur = stack[sp].node;

        loop {
            let index = match cur {
                NodeRef::Inner(index) => index as usize,
                NodeRef::Leaf { start, count } => {
                    Triangle1vMB::intersect1(bvh.leaf(start, count), ray);
                    continue 'pop;
                }
                _ => continue 'pop,
            };

            let (hits, t_near) = ctx.intersect_node(&bvh.nodes[index], ray.tnear, ray.tfar);
            let mut mask = hits.movemask();
            if mask == 0 {
                continue 'pop;
            }

            let r = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            if mask == 0 {
                cur = bvh.nodes[index].children[r];
                continue;
            }

            let c0 = bvh.nodes[index].children[r];
            let d0 = t_near[r];
            let r = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            let c1 = bvh.nodes[index].children[r];
            let d1 = t_near[r];
            if mask == 0 {
                debug_assert!(sp < SINGLE_STACK_SIZE);
                if d0 < d1 {
                    stack[sp] = StackItem { node: c1, dist: d1 };
                    sp += 1;
                    cur = c0;
                } else {
                    stack[sp] = StackItem { node: c0, dist: d0 };
                    sp += 1;
                    cur = c1;
                }
                continue;
            }

            stack[sp] = StackItem { node: c0, dist: d0 };
            stack[sp + 1] = StackItem { node: c1, dist: d1 };
            sp += 2;
            let r = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            stack[sp] = StackItem {
                node: bvh.nodes[index].children[r],
                dist: t_near[r],
            };
            sp += 1;
            if mask == 0 {
                sort3(&mut stack, sp - 3, sp - 2, sp - 1);
                sp -= 1;
                cur = stack[sp].node;
                continue;
            }

            let r = mask.trailing_zeros() as usize;
            stack[sp] = StackItem {
                node: bvh.nodes[index].children[r],
                dist: t_near[r],
            };
            sp += 1;
            debug_assert!(sp <= SINGLE_STACK_SIZE);
            sort4(&mut stack, sp - 4, sp - 3, sp - 2, sp - 1);
            sp -= 1;
            cur = stack[sp].node;
        }
    }
}

/// Test whether anything blocks the ray segment at its motion blur time
pub fn occluded(bvh: &Bvh4MB, ray: &Ray) -> bool {
    occluded_from(bvh, bvh.root, ray)
}

pub(crate) fn occluded_from(bvh: &Bvh4MB, root: NodeRef, ray: &Ray) -> bool {
    if root == NodeRef::Empty {
        return false;
    }
    let ctx = MotionContext::new(ray);
    let mut stack = [NodeRef::Invalid; SINGLE_STACK_SIZE];
    stack[0] = root;
    let mut sp = 1usize;

    'pop: while sp > 0 {
        sp -= 1;
        let mut cur = stack[sp];

        loop {
            let index = match cur {
                NodeRef::Inner(index) => index as usize,
                NodeRef::Leaf { start, count } => {
                    if Triangle1vMB::occluded1(bvh.leaf(start, count), ray) {
                        return true;
                    }
                    continue 'pop;
                }
                _ => continue 'pop,
            };

            let (hits, _) = ctx.intersect_node(&bvh.nodes[index], ray.tnear, ray.tfar);
            let mut mask = hits.movemask();
            if mask == 0 {
                continue 'pop;
            }

            let r = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            cur = bvh.nodes[index].children[r];
            while mask != 0 {
                let r = mask.trailing_zeros() as usize;
                mask &= mask - 1;
                debug_assert!(sp < SINGLE_STACK_SIZE);
                stack[sp] = bvh.nodes[index].children[r];
                sp += 1;
            }
        }
    }
    false
}

/// One child box lerped to every lane's time and slab tested
#[inline]
fn intersect_box_mb<const N: usize>(
    node: &Node4MB,
    i: usize,
    org: SimdVec3<N>,
    rdir: SimdVec3<N>,
    time: SimdF32<N>,
    tnear: SimdF32<N>,
    tfar: SimdF32<N>,
) -> (SimdBool<N>, SimdF32<N>) {
    let lerp1 = |a: f32, b: f32| SimdF32::splat(a).lerp(SimdF32::splat(b), time);
    let lower_x = lerp1(node.lower0_x[i], node.lower1_x[i]);
    let lower_y = lerp1(node.lower0_y[i], node.lower1_y[i]);
    let lower_z = lerp1(node.lower0_z[i], node.lower1_z[i]);
    let upper_x = lerp1(node.upper0_x[i], node.upper1_x[i]);
    let upper_y = lerp1(node.upper0_y[i], node.upper1_y[i]);
    let upper_z = lerp1(node.upper0_z[i], node.upper1_z[i]);

    let clip_min_x = (lower_x - org.x) * rdir.x;
    let clip_min_y = (lower_y - org.y) * rdir.y;
    let clip_min_z = (lower_z - org.z) * rdir.z;
    let clip_max_x = (upper_x - org.x) * rdir.x;
    let clip_max_y = (upper_y - org.y) * rdir.y;
    let clip_max_z = (upper_z - org.z) * rdir.z;

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

/// Find the closest hit for every active packet lane
pub fn intersect_packet<const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4MB,
    ray: &mut RayPacket<N>,
) {
    traverse_intersect(valid, bvh, ray, 0);
}

/// Occlusion test for every active packet lane
pub fn occluded_packet<const N: usize>(valid: SimdBool<N>, bvh: &Bvh4MB, ray: &mut RayPacket<N>) {
    traverse_occluded(valid, bvh, ray, 0);
}

/// Chunk traversal that drops to single-ray once few lanes stay active
pub fn intersect_packet_hybrid<const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4MB,
    ray: &mut RayPacket<N>,
) {
    traverse_intersect(valid, bvh, ray, SWITCH_THRESHOLD);
}

pub fn occluded_packet_hybrid<const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4MB,
    ray: &mut RayPacket<N>,
) {
    traverse_occluded(valid, bvh, ray, SWITCH_THRESHOLD);
}

fn traverse_intersect<const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4MB,
    ray: &mut RayPacket<N>,
    switch_threshold: usize,
) {
    if bvh.root == NodeRef::Empty || valid.none() {
        return;
    }

    let org = ray.origin;
    let rdir = rcp_safe_vec(ray.dir);
    let time = ray.time;
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
                let mut lane = ray.lane(i);
                intersect_from(bvh, cur, f32::NEG_INFINITY, &mut lane);
                ray.set_lane(i, &lane);
            }
            ray_tfar = SimdF32::select(valid, ray.tfar, SimdF32::NEG_INFINITY);
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
                let (hit, near) =
                    intersect_box_mb(node, i, org, rdir, time, ray_tnear, ray_tfar);
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
            let valid_leaf = ray_tfar.gt(cur_dist);
            Triangle1vMB::intersect_packet(valid_leaf, bvh.leaf(start, count), ray);
            ray_tfar = SimdF32::select(valid_leaf, ray.tfar, ray_tfar);
        }
    }
}

fn traverse_occluded<const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4MB,
    ray: &mut RayPacket<N>,
    switch_threshold: usize,
) {
    if bvh.root == NodeRef::Empty || valid.none() {
        return;
    }

    let mut terminated = !valid;
    let org = ray.origin;
    let rdir = rcp_safe_vec(ray.dir);
    let time = ray.time;
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
                if occluded_from(bvh, cur, &lane) {
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
                let (hit, near) =
                    intersect_box_mb(node, i, org, rdir, time, ray_tnear, ray_tfar);
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
            terminated = terminated
                | Triangle1vMB::occluded_packet(!terminated, bvh.leaf(start, count), ray);
            if terminated.all() {
                break;
            }
            ray_tfar = SimdF32::select(terminated, SimdF32::NEG_INFINITY, ray_tfar);
        }
    }

    let occluded = valid & terminated;
    ray.geom_id = SimdU32::select(occluded, SimdU32::splat(OCCLUDED_ID), ray.geom_id);
}
