use geometry::Vec3f;
use simd::{SimdBool, SimdF32};

use crate::bvh4::Bvh4;
use crate::node::{Node4, NodeRef, StackItem, SINGLE_STACK_SIZE};
use crate::node::{sort3, sort4};
use crate::triangle::LeafPrimitive;
use crate::Ray;

/// Precomputed per-ray state for the four-wide slab test
pub(crate) struct RayContext {
    org: Vec3f,
    rdir: Vec3f,
    /// Per axis: true when the lower plane is the near plane
    signs: [bool; 3],
}

impl RayContext {
    pub(crate) fn new(ray: &Ray) -> Self {
        let rdir = Vec3f::new(
            rcp_safe(ray.dir.x),
            rcp_safe(ray.dir.y),
            rcp_safe(ray.dir.z),
        );
        Self {
            org: ray.origin,
            rdir,
            signs: [ray.dir.x >= 0.0, ray.dir.y >= 0.0, ray.dir.z >= 0.0],
        }
    }

    /// Slab test of one ray against the four child boxes: per-child hit
    /// mask and entry distances
    #[inline]
    pub(crate) fn intersect_node(
        &self,
        node: &Node4,
        tnear: f32,
        tfar: f32,
    ) -> (SimdBool<4>, SimdF32<4>) {
        let (near_x, far_x) = select_planes(self.signs[0], &node.lower_x, &node.upper_x);
        let (near_y, far_y) = select_planes(self.signs[1], &node.lower_y, &node.upper_y);
        let (near_z, far_z) = select_planes(self.signs[2], &node.lower_z, &node.upper_z);
        slab_test(self, near_x, far_x, near_y, far_y, near_z, far_z, tnear, tfar)
    }
}

#[inline]
fn select_planes<'a>(
    positive: bool,
    lower: &'a [f32; 4],
    upper: &'a [f32; 4],
) -> (&'a [f32; 4], &'a [f32; 4]) {
    if positive {
        (lower, upper)
    } else {
        (upper, lower)
    }
}

#[inline]
#[allow(clippy::too_many_arguments)]
pub(crate) fn slab_test(
    ctx: &RayContext,
    near_x: &[f32; 4],
    far_x: &[f32; 4],
    near_y: &[f32; 4],
    far_y: &[f32; 4],
    near_z: &[f32; 4],
    far_z: &[f32; 4],
    tnear: f32,
    tfar: f32,
) -> (SimdBool<4>, SimdF32<4>) {
    let t_near_x = (SimdF32::from(*near_x) - SimdF32::splat(ctx.org.x)) * ctx.rdir.x;
    let t_near_y = (SimdF32::from(*near_y) - SimdF32::splat(ctx.org.y)) * ctx.rdir.y;
    let t_near_z = (SimdF32::from(*near_z) - SimdF32::splat(ctx.org.z)) * ctx.rdir.z;
    let t_far_x = (SimdF32::from(*far_x) - SimdF32::splat(ctx.org.x)) * ctx.rdir.x;
    let t_far_y = (SimdF32::from(*far_y) - SimdF32::splat(ctx.org.y)) * ctx.rdir.y;
    let t_far_z = (SimdF32::from(*far_z) - SimdF32::splat(ctx.org.z)) * ctx.rdir.z;

    let t_near = t_near_x
        .max(t_near_y)
        .max(t_near_z)
        .max(SimdF32::splat(tnear));
    let t_far = t_far_x.min(t_far_y).min(t_far_z).min(SimdF32::splat(tfar));
    (t_near.le(t_far), t_near)
}

#[inline]
pub(crate) fn rcp_safe(v: f32) -> f32 {
    if v.abs() < 1e-18 {
        1.0 / 1e-18f32.copysign(v)
    } else {
        1.0 / v
    }
}

/// Find the closest hit for a single ray
pub fn intersect<P: LeafPrimitive>(bvh: &Bvh4<P>, ray: &mut Ray) {
    intersect_from(bvh, bvh.root, f32::NEG_INFINITY, ray);
}

/// Closest-hit traversal restarted from an arbitrary node, used by the
/// hybrid kernels when a packet degenerates
pub(crate) fn intersect_from<P: LeafPrimitive>(
    bvh: &Bvh4<P>,
    root: NodeRef,
    root_dist: f32,
    ray: &mut Ray,
) {
    if root == NodeRef::Empty {
        return;
    }
    let ctx = RayContext::new(ray);
    let mut stack = [StackItem::PLACEHOLDER; SINGLE_STACK_SIZE];
    stack[0] = StackItem {
        node: root,
        dist: root_dist,
    };
    let mut sp = 1usize;

    'pop: while sp > 0 {
        sp -= 1;
        // A popped entry behind the closest hit cannot improve it
        if stack[sp].dist > ray.tfar {
            continue;
        }
        let mut cur = stack[sp].node;

        loop {
            let index = match cur {
                NodeRef::Inner(index) => index as usize,
                NodeRef::Leaf { start, count } => {
                    P::intersect1(bvh.leaf(start, count), ray);
                    continue 'pop;
                }
                _ => continue 'pop,
            };

            let (hits, t_near) = ctx.intersect_node(&bvh.nodes[index], ray.tnear, ray.tfar);
            let mut mask = hits.movemask();
            if mask == 0 {
                continue 'pop;
            }

            // One hit child: descend directly
            let r = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            if mask == 0 {
                cur = bvh.nodes[index].children[r];
                continue;
            }

            // Two hit children: push the farther, descend the nearer
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

            // Three or four hits: push everything, sort by distance and
            // descend the closest
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

/// Test whether anything blocks the ray segment
pub fn occluded<P: LeafPrimitive>(bvh: &Bvh4<P>, ray: &Ray) -> bool {
    occluded_from(bvh, bvh.root, ray)
}

/// Occlusion traversal restarted from an arbitrary node
pub(crate) fn occluded_from<P: LeafPrimitive>(bvh: &Bvh4<P>, root: NodeRef, ray: &Ray) -> bool {
    if root == NodeRef::Empty {
        return false;
    }
    let ctx = RayContext::new(ray);
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
                    if P::occluded1(bvh.leaf(start, count), ray) {
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

            // No distance ordering for shadow rays; any occluder ends the
            // query, so visit order does not matter
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
