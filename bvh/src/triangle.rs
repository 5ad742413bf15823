use geometry::{Bounds3f, Vec3f};
use simd::{SimdU32, SimdVec3};

use crate::intersect::LeafIntersect;
use crate::ray::INVALID_ID;
use crate::source::TriangleSource;

/// Primitive type that can be packed into leaf blocks and intersected
pub trait LeafPrimitive: LeafIntersect + Clone + Send + Sync {
    /// Triangles stored per block
    const BLOCK_SIZE: usize;

    /// Block with no valid triangles
    fn empty() -> Self;

    /// Blocks needed to hold the given triangle count
    fn blocks_for(count: usize) -> usize {
        count.div_ceil(Self::BLOCK_SIZE)
    }

    /// Pack (group, prim) id pairs into `out`, which must hold exactly
    /// `blocks_for(ids.len())` blocks. Unused lanes are marked invalid.
    fn pack<S: TriangleSource + ?Sized>(ids: &[(u32, u32)], source: &S, out: &mut [Self]);

    /// Bounds of the valid triangles in this block at time 0
    fn bounds(&self) -> Bounds3f;
}

/// Four triangles in structure-of-arrays layout with precomputed edges and
/// geometric normal, intersected with the Moeller-Trumbore test.
///
/// The stored edges are `e1 = v0 - v1` and `e2 = v2 - v0`; the normal is
/// `ng = e1 x e2`. Invalid lanes carry `INVALID_ID` and a degenerate zero
/// triangle which every edge test rejects.
#[derive(Debug, Clone, Copy)]
pub struct Triangle4 {
    pub v0: SimdVec3<4>,
    pub e1: SimdVec3<4>,
    pub e2: SimdVec3<4>,
    pub ng: SimdVec3<4>,
    pub geom_id: SimdU32<4>,
    pub prim_id: SimdU32<4>,
}

impl Triangle4 {
    /// Number of valid lanes; valid lanes are packed first
    #[inline]
    pub fn size(&self) -> usize {
        (0..4).take_while(|&i| self.geom_id[i] != INVALID_ID).count()
    }

    fn set_lane(&mut self, lane: usize, v0: Vec3f, v1: Vec3f, v2: Vec3f, geom: u32, prim: u32) {
        let e1 = v0 - v1;
        let e2 = v2 - v0;
        let ng = e1.cross(e2);
        for (field, value) in [
            (&mut self.v0, v0),
            (&mut self.e1, e1),
            (&mut self.e2, e2),
            (&mut self.ng, ng),
        ] {
            field.x[lane] = value.x;
            field.y[lane] = value.y;
            field.z[lane] = value.z;
        }
        self.geom_id[lane] = geom;
        self.prim_id[lane] = prim;
    }

    /// Vertices of one lane reconstructed from the stored edges
    pub fn vertices(&self, lane: usize) -> [Vec3f; 3] {
        let v0 = Vec3f::from_array(self.v0.lane(lane));
        let e1 = Vec3f::from_array(self.e1.lane(lane));
        let e2 = Vec3f::from_array(self.e2.lane(lane));
        [v0, v0 - e1, v0 + e2]
    }
}

impl LeafPrimitive for Triangle4 {
    const BLOCK_SIZE: usize = 4;

    fn empty() -> Self {
        Self {
            v0: SimdVec3::ZERO,
            e1: SimdVec3::ZERO,
            e2: SimdVec3::ZERO,
            ng: SimdVec3::ZERO,
            geom_id: SimdU32::splat(INVALID_ID),
            prim_id: SimdU32::splat(INVALID_ID),
        }
    }

    fn pack<S: TriangleSource + ?Sized>(ids: &[(u32, u32)], source: &S, out: &mut [Self]) {
        debug_assert_eq!(out.len(), Self::blocks_for(ids.len()));
        for (block, chunk) in out.iter_mut().zip(ids.chunks(4)) {
            *block = Self::empty();
            for (lane, &(geom, prim)) in chunk.iter().enumerate() {
                let [v0, v1, v2] = source.triangle(geom as usize, prim as usize, 0);
                block.set_lane(lane, v0, v1, v2, geom, prim);
            }
        }
    }

    fn bounds(&self) -> Bounds3f {
        let mut bounds = Bounds3f::EMPTY;
        for lane in 0..self.size() {
            for v in self.vertices(lane) {
                bounds = bounds.union_point(v);
            }
        }
        bounds
    }
}

/// One triangle stored by its three vertices, intersected with the
/// watertight Pluecker edge tests
#[derive(Debug, Clone, Copy)]
pub struct Triangle1v {
    pub v0: Vec3f,
    pub v1: Vec3f,
    pub v2: Vec3f,
    pub geom_id: u32,
    pub prim_id: u32,
}

impl LeafPrimitive for Triangle1v {
    const BLOCK_SIZE: usize = 1;

    fn empty() -> Self {
        Self {
            v0: Vec3f::ZERO,
            v1: Vec3f::ZERO,
            v2: Vec3f::ZERO,
            geom_id: INVALID_ID,
            prim_id: INVALID_ID,
        }
    }

    fn pack<S: TriangleSource + ?Sized>(ids: &[(u32, u32)], source: &S, out: &mut [Self]) {
        debug_assert_eq!(out.len(), ids.len());
        for (tri, &(geom, prim)) in out.iter_mut().zip(ids) {
            let [v0, v1, v2] = source.triangle(geom as usize, prim as usize, 0);
            *tri = Self {
                v0,
                v1,
                v2,
                geom_id: geom,
                prim_id: prim,
            };
        }
    }

    fn bounds(&self) -> Bounds3f {
        Bounds3f::EMPTY
            .union_point(self.v0)
            .union_point(self.v1)
            .union_point(self.v2)
    }
}

/// One triangle with vertices at both time samples. Intersection
/// interpolates the vertices to the ray time and runs the same
/// Moeller-Trumbore test as the static triangles.
#[derive(Debug, Clone, Copy)]
pub struct Triangle1vMB {
    pub v0_0: Vec3f,
    pub v1_0: Vec3f,
    pub v2_0: Vec3f,
    pub v0_1: Vec3f,
    pub v1_1: Vec3f,
    pub v2_1: Vec3f,
    pub geom_id: u32,
    pub prim_id: u32,
}

impl Triangle1vMB {
    /// Vertices interpolated to the given time
    #[inline]
    pub fn vertices_at(&self, time: f32) -> [Vec3f; 3] {
        [
            self.v0_0.lerp(self.v0_1, time),
            self.v1_0.lerp(self.v1_1, time),
            self.v2_0.lerp(self.v2_1, time),
        ]
    }

    /// Bounds at time 1
    pub fn bounds1(&self) -> Bounds3f {
        Bounds3f::EMPTY
            .union_point(self.v0_1)
            .union_point(self.v1_1)
            .union_point(self.v2_1)
    }
}

impl LeafPrimitive for Triangle1vMB {
    const BLOCK_SIZE: usize = 1;

    fn empty() -> Self {
        Self {
            v0_0: Vec3f::ZERO,
            v1_0: Vec3f::ZERO,
            v2_0: Vec3f::ZERO,
            v0_1: Vec3f::ZERO,
            v1_1: Vec3f::ZERO,
            v2_1: Vec3f::ZERO,
            geom_id: INVALID_ID,
            prim_id: INVALID_ID,
        }
    }

    fn pack<S: TriangleSource + ?Sized>(ids: &[(u32, u32)], source: &S, out: &mut [Self]) {
        debug_assert_eq!(out.len(), ids.len());
        for (tri, &(geom, prim)) in out.iter_mut().zip(ids) {
            let [v0_0, v1_0, v2_0] = source.triangle(geom as usize, prim as usize, 0);
            let [v0_1, v1_1, v2_1] = source.triangle(geom as usize, prim as usize, 1);
            *tri = Self {
                v0_0,
                v1_0,
                v2_0,
                v0_1,
                v1_1,
                v2_1,
                geom_id: geom,
                prim_id: prim,
            };
        }
    }

    /// Bounds at time 0
    fn bounds(&self) -> Bounds3f {
        Bounds3f::EMPTY
            .union_point(self.v0_0)
            .union_point(self.v1_0)
            .union_point(self.v2_0)
    }
}
