//! Named intersector registry.
//!
//! Every traversal variant is reachable through a dotted name such as
//! `bvh4.triangle4.hybrid.moeller`, bundling the single-ray and packet
//! entry points for one tree and primitive type. Unknown names resolve to
//! `None` so callers can fall back to a default.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use simd::SimdBool;

use crate::bvh4::{Bvh4, Bvh4MB};
use crate::ray::{Ray, RayPacket, OCCLUDED_ID};
use crate::traverse::{chunk, hybrid, motion, single};
use crate::triangle::{LeafPrimitive, Triangle1v, Triangle4};

/// Packet traversal strategy selected by an intersector name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalKind {
    /// Every packet lane traverses on its own
    Single,
    /// All lanes traverse together
    Chunk,
    /// Chunk traversal that degrades to single-ray for incoherent packets
    Hybrid,
}

/// Entry points for one static tree and primitive type
pub struct Intersectors<P> {
    pub intersect1: fn(&Bvh4<P>, &mut Ray),
    pub occluded1: fn(&Bvh4<P>, &Ray) -> bool,
    pub intersect4: fn(SimdBool<4>, &Bvh4<P>, &mut RayPacket<4>),
    pub occluded4: fn(SimdBool<4>, &Bvh4<P>, &mut RayPacket<4>),
    pub intersect8: fn(SimdBool<8>, &Bvh4<P>, &mut RayPacket<8>),
    pub occluded8: fn(SimdBool<8>, &Bvh4<P>, &mut RayPacket<8>),
    pub intersect16: fn(SimdBool<16>, &Bvh4<P>, &mut RayPacket<16>),
    pub occluded16: fn(SimdBool<16>, &Bvh4<P>, &mut RayPacket<16>),
}

fn intersect_lanes<P: LeafPrimitive, const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4<P>,
    ray: &mut RayPacket<N>,
) {
    for i in 0..N {
        if !valid[i] {
            continue;
        }
        let mut lane = ray.lane(i);
        single::intersect(bvh, &mut lane);
        ray.set_lane(i, &lane);
    }
}

fn occluded_lanes<P: LeafPrimitive, const N: usize>(
    valid: SimdBool<N>,
    bvh: &Bvh4<P>,
    ray: &mut RayPacket<N>,
) {
    for i in 0..N {
        if !valid[i] {
            continue;
        }
        if single::occluded(bvh, &ray.lane(i)) {
            ray.geom_id[i] = OCCLUDED_ID;
        }
    }
}

impl<P: LeafPrimitive> Intersectors<P> {
    pub fn new(kind: TraversalKind) -> Self {
        match kind {
            TraversalKind::Single => Self {
                intersect1: single::intersect,
                occluded1: single::occluded,
                intersect4: intersect_lanes,
                occluded4: occluded_lanes,
                intersect8: intersect_lanes,
                occluded8: occluded_lanes,
                intersect16: intersect_lanes,
                occluded16: occluded_lanes,
            },
            TraversalKind::Chunk => Self {
                intersect1: single::intersect,
                occluded1: single::occluded,
                intersect4: chunk::intersect_packet,
                occluded4: chunk::occluded_packet,
                intersect8: chunk::intersect_packet,
                occluded8: chunk::occluded_packet,
                intersect16: chunk::intersect_packet,
                occluded16: chunk::occluded_packet,
            },
            TraversalKind::Hybrid => Self {
                intersect1: single::intersect,
                occluded1: single::occluded,
                intersect4: hybrid::intersect_packet,
                occluded4: hybrid::occluded_packet,
                intersect8: hybrid::intersect_packet,
                occluded8: hybrid::occluded_packet,
                intersect16: hybrid::intersect_packet,
                occluded16: hybrid::occluded_packet,
            },
        }
    }
}

/// Entry points for the motion blur tree
pub struct IntersectorsMB {
    pub intersect1: fn(&Bvh4MB, &mut Ray),
    pub occluded1: fn(&Bvh4MB, &Ray) -> bool,
    pub intersect4: fn(SimdBool<4>, &Bvh4MB, &mut RayPacket<4>),
    pub occluded4: fn(SimdBool<4>, &Bvh4MB, &mut RayPacket<4>),
    pub intersect8: fn(SimdBool<8>, &Bvh4MB, &mut RayPacket<8>),
    pub occluded8: fn(SimdBool<8>, &Bvh4MB, &mut RayPacket<8>),
    pub intersect16: fn(SimdBool<16>, &Bvh4MB, &mut RayPacket<16>),
    pub occluded16: fn(SimdBool<16>, &Bvh4MB, &mut RayPacket<16>),
}

fn intersect_lanes_mb<const N: usize>(valid: SimdBool<N>, bvh: &Bvh4MB, ray: &mut RayPacket<N>) {
    for i in 0..N {
        if !valid[i] {
            continue;
        }
        let mut lane = ray.lane(i);
        motion::intersect(bvh, &mut lane);
        ray.set_lane(i, &lane);
    }
}

fn occluded_lanes_mb<const N: usize>(valid: SimdBool<N>, bvh: &Bvh4MB, ray: &mut RayPacket<N>) {
    for i in 0..N {
        if !valid[i] {
            continue;
        }
        if motion::occluded(bvh, &ray.lane(i)) {
            ray.geom_id[i] = OCCLUDED_ID;
        }
    }
}

impl IntersectorsMB {
    pub fn new(kind: TraversalKind) -> Self {
        match kind {
            TraversalKind::Single => Self {
                intersect1: motion::intersect,
                occluded1: motion::occluded,
                intersect4: intersect_lanes_mb,
                occluded4: occluded_lanes_mb,
                intersect8: intersect_lanes_mb,
                occluded8: occluded_lanes_mb,
                intersect16: intersect_lanes_mb,
                occluded16: occluded_lanes_mb,
            },
            TraversalKind::Chunk => Self {
                intersect1: motion::intersect,
                occluded1: motion::occluded,
                intersect4: motion::intersect_packet,
                occluded4: motion::occluded_packet,
                intersect8: motion::intersect_packet,
                occluded8: motion::occluded_packet,
                intersect16: motion::intersect_packet,
                occluded16: motion::occluded_packet,
            },
            TraversalKind::Hybrid => Self {
                intersect1: motion::intersect,
                occluded1: motion::occluded,
                intersect4: motion::intersect_packet_hybrid,
                occluded4: motion::occluded_packet_hybrid,
                intersect8: motion::intersect_packet_hybrid,
                occluded8: motion::occluded_packet_hybrid,
                intersect16: motion::intersect_packet_hybrid,
                occluded16: motion::occluded_packet_hybrid,
            },
        }
    }
}

static TRIANGLE4_TABLE: Lazy<HashMap<&'static str, Intersectors<Triangle4>>> = Lazy::new(|| {
    HashMap::from([
        (
            "bvh4.triangle4.single.moeller",
            Intersectors::new(TraversalKind::Single),
        ),
        (
            "bvh4.triangle4.chunk.moeller",
            Intersectors::new(TraversalKind::Chunk),
        ),
        (
            "bvh4.triangle4.hybrid.moeller",
            Intersectors::new(TraversalKind::Hybrid),
        ),
    ])
});

static TRIANGLE1V_TABLE: Lazy<HashMap<&'static str, Intersectors<Triangle1v>>> = Lazy::new(|| {
    HashMap::from([
        (
            "bvh4.triangle1v.single.pluecker",
            Intersectors::new(TraversalKind::Single),
        ),
        (
            "bvh4.triangle1v.chunk.pluecker",
            Intersectors::new(TraversalKind::Chunk),
        ),
        (
            "bvh4.triangle1v.hybrid.pluecker",
            Intersectors::new(TraversalKind::Hybrid),
        ),
    ])
});

static MOTION_TABLE: Lazy<HashMap<&'static str, IntersectorsMB>> = Lazy::new(|| {
    HashMap::from([
        (
            "bvh4mb.triangle1vmb.single.moeller",
            IntersectorsMB::new(TraversalKind::Single),
        ),
        (
            "bvh4mb.triangle1vmb.chunk.moeller",
            IntersectorsMB::new(TraversalKind::Chunk),
        ),
        (
            "bvh4mb.triangle1vmb.hybrid.moeller",
            IntersectorsMB::new(TraversalKind::Hybrid),
        ),
    ])
});

/// Look up the Moeller-Trumbore intersectors for [`Triangle4`] trees
pub fn triangle4_intersectors(name: &str) -> Option<&'static Intersectors<Triangle4>> {
    TRIANGLE4_TABLE.get(name)
}

/// Look up the Pluecker intersectors for [`Triangle1v`] trees
pub fn triangle1v_intersectors(name: &str) -> Option<&'static Intersectors<Triangle1v>> {
    TRIANGLE1V_TABLE.get(name)
}

/// Look up the intersectors for motion blur trees
pub fn motion_intersectors(name: &str) -> Option<&'static IntersectorsMB> {
    MOTION_TABLE.get(name)
}
