//! Pluecker-coordinate triangle tests. The ray origin is shifted into the
//! coordinate origin first, which simplifies the Pluecker terms and makes
//! the edge equations watertight along shared edges.

use geometry::Vec3f;
use simd::{SimdBool, SimdF32, SimdU32, SimdVec3};

use crate::intersect::LeafIntersect;
use crate::ray::{Ray, RayPacket, INVALID_ID};
use crate::triangle::Triangle1v;

#[inline]
fn splat3<const N: usize>(v: Vec3f) -> SimdVec3<N> {
    SimdVec3::splat(v.x, v.y, v.z)
}

impl LeafIntersect for Triangle1v {
    fn intersect1(leaf: &[Self], ray: &mut Ray) {
        for tri in leaf {
            if tri.geom_id == INVALID_ID {
                continue;
            }

            // Vertices relative to the ray origin
            let v0 = tri.v0 - ray.origin;
            let v1 = tri.v1 - ray.origin;
            let v2 = tri.v2 - ray.origin;

            let e0 = v2 - v0;
            let e1 = v0 - v1;
            let e2 = v1 - v2;

            let ng2 = {
                let ng = e1.cross(e0);
                ng + ng
            };
            let d = ray.dir;
            let den = ng2.dot(d);
            let abs_den = den.abs();
            let sgn_den = if den.is_sign_negative() { -1.0 } else { 1.0 };

            let u = (v2 + v0).cross(e0).dot(d) * sgn_den;
            if u < 0.0 {
                continue;
            }
            let v = (v0 + v1).cross(e1).dot(d) * sgn_den;
            if v < 0.0 {
                continue;
            }
            let w = (v1 + v2).cross(e2).dot(d) * sgn_den;
            if w < 0.0 {
                continue;
            }

            let t = v0.dot(ng2) * sgn_den;
            if abs_den * ray.tfar < t || t < abs_den * ray.tnear {
                continue;
            }
            if den == 0.0 {
                continue;
            }

            let rcp_abs_den = 1.0 / abs_den;
            ray.u = u * rcp_abs_den;
            ray.v = v * rcp_abs_den;
            ray.tfar = t * rcp_abs_den;
            ray.ng = ng2;
            ray.geom_id = tri.geom_id;
            ray.prim_id = tri.prim_id;
        }
    }

    fn occluded1(leaf: &[Self], ray: &Ray) -> bool {
        for tri in leaf {
            if tri.geom_id == INVALID_ID {
                continue;
            }

            let v0 = tri.v0 - ray.origin;
            let v1 = tri.v1 - ray.origin;
            let v2 = tri.v2 - ray.origin;

            let e0 = v2 - v0;
            let e1 = v0 - v1;
            let e2 = v1 - v2;

            let ng2 = {
                let ng = e1.cross(e0);
                ng + ng
            };
            let d = ray.dir;
            let den = ng2.dot(d);
            let abs_den = den.abs();
            let sgn_den = if den.is_sign_negative() { -1.0 } else { 1.0 };

            let u = (v2 + v0).cross(e0).dot(d) * sgn_den;
            let v = (v0 + v1).cross(e1).dot(d) * sgn_den;
            let w = (v1 + v2).cross(e2).dot(d) * sgn_den;
            if u < 0.0 || v < 0.0 || w < 0.0 {
                continue;
            }

            let t = v0.dot(ng2) * sgn_den;
            if abs_den * ray.tfar < t || t < abs_den * ray.tnear {
                continue;
            }
            if den != 0.0 {
                return true;
            }
        }
        false
    }

    fn intersect_packet<const N: usize>(valid: SimdBool<N>, leaf: &[Self], ray: &mut RayPacket<N>) {
        for tri in leaf {
            if tri.geom_id == INVALID_ID {
                continue;
            }
            let (u, v, t, abs_den, ng2, hit) = pluecker_packet(valid, ray, tri);
            if hit.none() {
                continue;
            }

            let rcp_abs_den = abs_den.rcp();
            ray.u = SimdF32::select(hit, u * rcp_abs_den, ray.u);
            ray.v = SimdF32::select(hit, v * rcp_abs_den, ray.v);
            ray.tfar = SimdF32::select(hit, t * rcp_abs_den, ray.tfar);
            ray.ng.x = SimdF32::select(hit, ng2.x, ray.ng.x);
            ray.ng.y = SimdF32::select(hit, ng2.y, ray.ng.y);
            ray.ng.z = SimdF32::select(hit, ng2.z, ray.ng.z);
            ray.geom_id = SimdU32::select(hit, SimdU32::splat(tri.geom_id), ray.geom_id);
            ray.prim_id = SimdU32::select(hit, SimdU32::splat(tri.prim_id), ray.prim_id);
        }
    }

    fn occluded_packet<const N: usize>(
        valid: SimdBool<N>,
        leaf: &[Self],
        ray: &RayPacket<N>,
    ) -> SimdBool<N> {
        let mut occluded = SimdBool::NONE;
        for tri in leaf {
            if tri.geom_id == INVALID_ID {
                continue;
            }
            let (_, _, _, _, _, hit) = pluecker_packet(valid & !occluded, ray, tri);
            occluded = occluded | hit;
            if (valid & !occluded).none() {
                break;
            }
        }
        occluded
    }
}

type PlueckerTerms<const N: usize> = (
    SimdF32<N>,
    SimdF32<N>,
    SimdF32<N>,
    SimdF32<N>,
    SimdVec3<N>,
    SimdBool<N>,
);

/// Evaluate the Pluecker terms of one broadcast triangle for every lane
fn pluecker_packet<const N: usize>(
    valid: SimdBool<N>,
    ray: &RayPacket<N>,
    tri: &Triangle1v,
) -> PlueckerTerms<N> {
    let v0 = splat3::<N>(tri.v0) - ray.origin;
    let v1 = splat3::<N>(tri.v1) - ray.origin;
    let v2 = splat3::<N>(tri.v2) - ray.origin;

    let e0 = v2 - v0;
    let e1 = v0 - v1;
    let e2 = v1 - v2;

    let ng2 = {
        let ng = e1.cross(e0);
        ng + ng
    };
    let d = ray.dir;
    let den = ng2.dot(d);
    let abs_den = den.abs();
    let sgn_den = den.signum();

    let u = (v2 + v0).cross(e0).dot(d) * sgn_den;
    let v = (v0 + v1).cross(e1).dot(d) * sgn_den;
    let w = (v1 + v2).cross(e2).dot(d) * sgn_den;
    let t = v0.dot(ng2) * sgn_den;

    let hit = valid
        & u.ge(SimdF32::ZERO)
        & v.ge(SimdF32::ZERO)
        & w.ge(SimdF32::ZERO)
        & t.ge(abs_den * ray.tnear)
        & (abs_den * ray.tfar).ge(t)
        & den.simd_ne(SimdF32::ZERO);
    (u, v, t, abs_den, ng2, hit)
}
