//! Moeller-Trumbore triangle tests, factored so the edge cross product is
//! precomputed per triangle and the division by the denominator is deferred
//! until a hit is committed.

use geometry::Vec3f;
use simd::{SimdBool, SimdF32, SimdU32, SimdVec3};

use crate::intersect::LeafIntersect;
use crate::ray::{Ray, RayPacket};
use crate::triangle::{Triangle1vMB, Triangle4};

#[inline]
fn splat3<const N: usize>(v: Vec3f) -> SimdVec3<N> {
    SimdVec3::splat(v.x, v.y, v.z)
}

impl LeafIntersect for Triangle4 {
    fn intersect1(leaf: &[Self], ray: &mut Ray) {
        for tri in leaf {
            let o = splat3::<4>(ray.origin);
            let d = splat3::<4>(ray.dir);
            let c = tri.v0 - o;
            let r = d.cross(c);
            let den = tri.ng.dot(d);
            let abs_den = den.abs();
            let sgn_den = den.signum();

            // Edge tests with the sign of the denominator folded in
            let u = r.dot(tri.e2) * sgn_den;
            let v = r.dot(tri.e1) * sgn_den;
            let mut valid = den.simd_ne(SimdF32::ZERO)
                & u.ge(SimdF32::ZERO)
                & v.ge(SimdF32::ZERO)
                & (u + v).le(abs_den);
            if valid.none() {
                continue;
            }

            let t = tri.ng.dot(c) * sgn_den;
            valid = valid
                & t.gt(abs_den * ray.tnear)
                & t.lt(abs_den * ray.tfar);
            if valid.none() {
                continue;
            }

            let lane = SimdF32::select_min(valid, t / abs_den);
            let rcp_abs_den = 1.0 / abs_den[lane];
            ray.u = u[lane] * rcp_abs_den;
            ray.v = v[lane] * rcp_abs_den;
            ray.tfar = t[lane] * rcp_abs_den;
            ray.ng = Vec3f::from_array(tri.ng.lane(lane));
            ray.geom_id = tri.geom_id[lane];
            ray.prim_id = tri.prim_id[lane];
        }
    }

    fn occluded1(leaf: &[Self], ray: &Ray) -> bool {
        for tri in leaf {
            let o = splat3::<4>(ray.origin);
            let d = splat3::<4>(ray.dir);
            let c = tri.v0 - o;
            let r = d.cross(c);
            let den = tri.ng.dot(d);
            let abs_den = den.abs();
            let sgn_den = den.signum();

            let u = r.dot(tri.e2) * sgn_den;
            let v = r.dot(tri.e1) * sgn_den;
            let w = abs_den - u - v;
            let mut valid = u.ge(SimdF32::ZERO) & v.ge(SimdF32::ZERO) & w.ge(SimdF32::ZERO);
            if valid.none() {
                continue;
            }

            let t = tri.ng.dot(c) * sgn_den;
            valid = valid
                & den.simd_ne(SimdF32::ZERO)
                & t.ge(abs_den * ray.tnear)
                & (abs_den * ray.tfar).ge(t);
            if valid.any() {
                return true;
            }
        }
        false
    }

    fn intersect_packet<const N: usize>(valid: SimdBool<N>, leaf: &[Self], ray: &mut RayPacket<N>) {
        for tri in leaf {
            for i in 0..tri.size() {
                let p0 = splat3::<N>(Vec3f::from_array(tri.v0.lane(i)));
                let e1 = splat3::<N>(Vec3f::from_array(tri.e1.lane(i)));
                let e2 = splat3::<N>(Vec3f::from_array(tri.e2.lane(i)));
                let ng = splat3::<N>(Vec3f::from_array(tri.ng.lane(i)));
                moeller_packet_intersect(
                    valid,
                    ray,
                    p0,
                    e1,
                    e2,
                    ng,
                    tri.geom_id[i],
                    tri.prim_id[i],
                );
            }
        }
    }

    fn occluded_packet<const N: usize>(
        valid: SimdBool<N>,
        leaf: &[Self],
        ray: &RayPacket<N>,
    ) -> SimdBool<N> {
        let mut occluded = SimdBool::NONE;
        for tri in leaf {
            for i in 0..tri.size() {
                let p0 = splat3::<N>(Vec3f::from_array(tri.v0.lane(i)));
                let e1 = splat3::<N>(Vec3f::from_array(tri.e1.lane(i)));
                let e2 = splat3::<N>(Vec3f::from_array(tri.e2.lane(i)));
                let ng = splat3::<N>(Vec3f::from_array(tri.ng.lane(i)));
                occluded = occluded | moeller_packet_occluded(valid & !occluded, ray, p0, e1, e2, ng);
                if (valid & !occluded).none() {
                    return occluded;
                }
            }
        }
        occluded
    }
}

/// One broadcast triangle against all packet lanes, committing hits
#[allow(clippy::too_many_arguments)]
fn moeller_packet_intersect<const N: usize>(
    valid_in: SimdBool<N>,
    ray: &mut RayPacket<N>,
    p0: SimdVec3<N>,
    e1: SimdVec3<N>,
    e2: SimdVec3<N>,
    ng: SimdVec3<N>,
    geom_id: u32,
    prim_id: u32,
) {
    let c = p0 - ray.origin;
    let r = ray.dir.cross(c);
    let den = ng.dot(ray.dir);
    let abs_den = den.abs();
    let sgn_den = den.signum();

    let u = r.dot(e2) * sgn_den;
    let mut valid = valid_in & u.ge(SimdF32::ZERO);
    if valid.none() {
        return;
    }
    let v = r.dot(e1) * sgn_den;
    valid = valid & v.ge(SimdF32::ZERO);
    if valid.none() {
        return;
    }
    let w = abs_den - u - v;
    valid = valid & w.ge(SimdF32::ZERO);
    if valid.none() {
        return;
    }

    let t = ng.dot(c) * sgn_den;
    valid = valid & t.ge(abs_den * ray.tnear) & (abs_den * ray.tfar).ge(t);
    valid = valid & den.simd_ne(SimdF32::ZERO);
    if valid.none() {
        return;
    }

    let rcp_abs_den = abs_den.rcp();
    ray.u = SimdF32::select(valid, u * rcp_abs_den, ray.u);
    ray.v = SimdF32::select(valid, v * rcp_abs_den, ray.v);
    ray.tfar = SimdF32::select(valid, t * rcp_abs_den, ray.tfar);
    ray.ng.x = SimdF32::select(valid, ng.x, ray.ng.x);
    ray.ng.y = SimdF32::select(valid, ng.y, ray.ng.y);
    ray.ng.z = SimdF32::select(valid, ng.z, ray.ng.z);
    ray.geom_id = SimdU32::select(valid, SimdU32::splat(geom_id), ray.geom_id);
    ray.prim_id = SimdU32::select(valid, SimdU32::splat(prim_id), ray.prim_id);
}

/// One broadcast triangle against all packet lanes, occlusion only
fn moeller_packet_occluded<const N: usize>(
    valid_in: SimdBool<N>,
    ray: &RayPacket<N>,
    p0: SimdVec3<N>,
    e1: SimdVec3<N>,
    e2: SimdVec3<N>,
    ng: SimdVec3<N>,
) -> SimdBool<N> {
    let c = p0 - ray.origin;
    let r = ray.dir.cross(c);
    let den = ng.dot(ray.dir);
    let abs_den = den.abs();
    let sgn_den = den.signum();

    let u = r.dot(e2) * sgn_den;
    let v = r.dot(e1) * sgn_den;
    let w = abs_den - u - v;
    let mut valid =
        valid_in & u.ge(SimdF32::ZERO) & v.ge(SimdF32::ZERO) & w.ge(SimdF32::ZERO);
    if valid.none() {
        return SimdBool::NONE;
    }

    let t = ng.dot(c) * sgn_den;
    valid = valid & t.ge(abs_den * ray.tnear) & (abs_den * ray.tfar).ge(t);
    valid & den.simd_ne(SimdF32::ZERO)
}

impl LeafIntersect for Triangle1vMB {
    fn intersect1(leaf: &[Self], ray: &mut Ray) {
        for tri in leaf {
            if tri.geom_id == crate::ray::INVALID_ID {
                continue;
            }
            let [v0, v1, v2] = tri.vertices_at(ray.time);
            let e1 = v0 - v1;
            let e2 = v2 - v0;
            let ng = e1.cross(e2);

            let c = v0 - ray.origin;
            let r = ray.dir.cross(c);
            let den = ng.dot(ray.dir);
            let abs_den = den.abs();
            let sgn_den = if den.is_sign_negative() { -1.0 } else { 1.0 };

            let u = r.dot(e2) * sgn_den;
            let v = r.dot(e1) * sgn_den;
            if den == 0.0 || u < 0.0 || v < 0.0 || u + v > abs_den {
                continue;
            }
            let t = ng.dot(c) * sgn_den;
            if t <= abs_den * ray.tnear || t >= abs_den * ray.tfar {
                continue;
            }

            let rcp_abs_den = 1.0 / abs_den;
            ray.u = u * rcp_abs_den;
            ray.v = v * rcp_abs_den;
            ray.tfar = t * rcp_abs_den;
            ray.ng = ng;
            ray.geom_id = tri.geom_id;
            ray.prim_id = tri.prim_id;
        }
    }

    fn occluded1(leaf: &[Self], ray: &Ray) -> bool {
        for tri in leaf {
            if tri.geom_id == crate::ray::INVALID_ID {
                continue;
            }
            let [v0, v1, v2] = tri.vertices_at(ray.time);
            let e1 = v0 - v1;
            let e2 = v2 - v0;
            let ng = e1.cross(e2);

            let c = v0 - ray.origin;
            let r = ray.dir.cross(c);
            let den = ng.dot(ray.dir);
            let abs_den = den.abs();
            let sgn_den = if den.is_sign_negative() { -1.0 } else { 1.0 };

            let u = r.dot(e2) * sgn_den;
            let v = r.dot(e1) * sgn_den;
            let w = abs_den - u - v;
            if u < 0.0 || v < 0.0 || w < 0.0 {
                continue;
            }
            let t = ng.dot(c) * sgn_den;
            if den != 0.0 && t >= abs_den * ray.tnear && abs_den * ray.tfar >= t {
                return true;
            }
        }
        false
    }

    fn intersect_packet<const N: usize>(valid: SimdBool<N>, leaf: &[Self], ray: &mut RayPacket<N>) {
        for tri in leaf {
            if tri.geom_id == crate::ray::INVALID_ID {
                continue;
            }
            let (p0, e1, e2, ng) = lerp_triangle(tri, ray.time);
            moeller_packet_intersect(valid, ray, p0, e1, e2, ng, tri.geom_id, tri.prim_id);
        }
    }

    fn occluded_packet<const N: usize>(
        valid: SimdBool<N>,
        leaf: &[Self],
        ray: &RayPacket<N>,
    ) -> SimdBool<N> {
        let mut occluded = SimdBool::NONE;
        for tri in leaf {
            if tri.geom_id == crate::ray::INVALID_ID {
                continue;
            }
            let (p0, e1, e2, ng) = lerp_triangle(tri, ray.time);
            occluded = occluded | moeller_packet_occluded(valid & !occluded, ray, p0, e1, e2, ng);
            if (valid & !occluded).none() {
                break;
            }
        }
        occluded
    }
}

/// Interpolate a two-sample triangle to each lane's time and derive the
/// Moeller-Trumbore inputs
fn lerp_triangle<const N: usize>(
    tri: &Triangle1vMB,
    time: SimdF32<N>,
) -> (SimdVec3<N>, SimdVec3<N>, SimdVec3<N>, SimdVec3<N>) {
    let v0 = splat3::<N>(tri.v0_0).lerp(splat3(tri.v0_1), time);
    let v1 = splat3::<N>(tri.v1_0).lerp(splat3(tri.v1_1), time);
    let v2 = splat3::<N>(tri.v2_0).lerp(splat3(tri.v2_1), time);
    let e1 = v0 - v1;
    let e2 = v2 - v0;
    let ng = e1.cross(e2);
    (v0, e1, e2, ng)
}
