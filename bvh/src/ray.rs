use geometry::Vec3f;
use simd::{SimdBool, SimdF32, SimdU32, SimdVec3};

/// Geometry and primitive id stored in unhit rays
pub const INVALID_ID: u32 = u32::MAX;

/// Geometry id written by the occlusion kernels for shadowed rays
pub const OCCLUDED_ID: u32 = 0;

/// Largest coordinate magnitude kept by [`Ray::sanitize`]
const FLT_LARGE: f32 = 1.844e18;

/// Single ray with its hit state.
///
/// `tfar` shrinks monotonically as closer hits are committed. A ray has hit
/// something when `geom_id != INVALID_ID`.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3f,
    pub dir: Vec3f,
    pub tnear: f32,
    pub tfar: f32,
    pub time: f32,

    pub u: f32,
    pub v: f32,
    /// Unnormalized geometric normal of the hit primitive
    pub ng: Vec3f,
    pub geom_id: u32,
    pub prim_id: u32,
}

impl Ray {
    /// Ray over the full positive parameter range at time 0
    pub fn new(origin: Vec3f, dir: Vec3f) -> Self {
        Self::segment(origin, dir, 0.0, f32::INFINITY)
    }

    /// Ray restricted to the parameter range `[tnear, tfar]`
    pub fn segment(origin: Vec3f, dir: Vec3f, tnear: f32, tfar: f32) -> Self {
        Self {
            origin,
            dir,
            tnear,
            tfar,
            time: 0.0,
            u: 0.0,
            v: 0.0,
            ng: Vec3f::ZERO,
            geom_id: INVALID_ID,
            prim_id: INVALID_ID,
        }
    }

    /// Same ray sampled at the given motion blur time in `[0, 1]`
    pub fn at_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    /// Has a hit been committed to this ray
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.geom_id != INVALID_ID
    }

    /// Clamp non-finite and extreme components into a range the traversal
    /// kernels handle. Optional; well-formed rays never need it.
    pub fn sanitize(&mut self) {
        self.origin = clamp_vec(self.origin);
        self.dir = clamp_vec(self.dir);
        if !(self.tnear >= 0.0) {
            self.tnear = 0.0;
        }
        if self.tfar.is_nan() || self.tfar > FLT_LARGE {
            self.tfar = FLT_LARGE;
        }
    }
}

fn clamp_vec(v: Vec3f) -> Vec3f {
    Vec3f::new(clamp_component(v.x), clamp_component(v.y), clamp_component(v.z))
}

fn clamp_component(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-FLT_LARGE, FLT_LARGE)
    }
}

/// Packet of N rays in structure-of-arrays layout
#[derive(Debug, Clone, Copy)]
pub struct RayPacket<const N: usize> {
    pub origin: SimdVec3<N>,
    pub dir: SimdVec3<N>,
    pub tnear: SimdF32<N>,
    pub tfar: SimdF32<N>,
    pub time: SimdF32<N>,

    pub u: SimdF32<N>,
    pub v: SimdF32<N>,
    pub ng: SimdVec3<N>,
    pub geom_id: SimdU32<N>,
    pub prim_id: SimdU32<N>,
}

impl<const N: usize> RayPacket<N> {
    /// Gather a packet from individual rays
    pub fn from_rays(rays: &[Ray; N]) -> Self {
        Self {
            origin: SimdVec3 {
                x: SimdF32::from_fn(|i| rays[i].origin.x),
                y: SimdF32::from_fn(|i| rays[i].origin.y),
                z: SimdF32::from_fn(|i| rays[i].origin.z),
            },
            dir: SimdVec3 {
                x: SimdF32::from_fn(|i| rays[i].dir.x),
                y: SimdF32::from_fn(|i| rays[i].dir.y),
                z: SimdF32::from_fn(|i| rays[i].dir.z),
            },
            tnear: SimdF32::from_fn(|i| rays[i].tnear),
            tfar: SimdF32::from_fn(|i| rays[i].tfar),
            time: SimdF32::from_fn(|i| rays[i].time),
            u: SimdF32::ZERO,
            v: SimdF32::ZERO,
            ng: SimdVec3::ZERO,
            geom_id: SimdU32::splat(INVALID_ID),
            prim_id: SimdU32::splat(INVALID_ID),
        }
    }

    /// Extract one lane as a single ray, hit state included
    pub fn lane(&self, i: usize) -> Ray {
        Ray {
            origin: Vec3f::from_array(self.origin.lane(i)),
            dir: Vec3f::from_array(self.dir.lane(i)),
            tnear: self.tnear[i],
            tfar: self.tfar[i],
            time: self.time[i],
            u: self.u[i],
            v: self.v[i],
            ng: Vec3f::from_array(self.ng.lane(i)),
            geom_id: self.geom_id[i],
            prim_id: self.prim_id[i],
        }
    }

    /// Write a single ray's hit state back into one lane
    pub fn set_lane(&mut self, i: usize, ray: &Ray) {
        self.tfar[i] = ray.tfar;
        self.u[i] = ray.u;
        self.v[i] = ray.v;
        self.ng.x[i] = ray.ng.x;
        self.ng.y[i] = ray.ng.y;
        self.ng.z[i] = ray.ng.z;
        self.geom_id[i] = ray.geom_id;
        self.prim_id[i] = ray.prim_id;
    }

    /// Lanes that have a committed hit
    pub fn hit_mask(&self) -> SimdBool<N> {
        self.geom_id.simd_ne(SimdU32::splat(INVALID_ID))
    }
}
