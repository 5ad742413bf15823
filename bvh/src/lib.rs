//! Four-wide bounding volume hierarchy construction and ray traversal.
//!
//! The crate builds packed BVH4 trees over triangle geometry, either with a
//! parallel binned surface area heuristic builder or a Morton-code based
//! linear builder, and traverses them with single-ray, packet and hybrid
//! kernels for packets of 4, 8 or 16 rays. Motion blur is supported through
//! a two-time-sample tree variant whose boxes are interpolated per ray.

mod alloc;
mod binning;
mod builder;
mod bvh4;
mod error;
mod intersect;
mod node;
mod prim_gen;
mod prim_ref;
mod ray;
mod registry;
mod source;
pub mod traverse;
mod triangle;
mod util;

#[cfg(test)]
mod tests;

pub use alloc::{BlockAllocator, Reset};
pub use binning::{Binner, Mapping, PrimInfo, Split, BIN_COUNT};
pub use builder::{build_morton, build_sah, build_sah_mb, BuildConfig};
pub use bvh4::{Bvh4, Bvh4MB};
pub use error::BuildError;
pub use intersect::LeafIntersect;
pub use node::{Node4, Node4MB, NodeRef, MAX_BUILD_DEPTH, MAX_BUILD_DEPTH_LEAF};
pub use prim_gen::{generate_prim_refs, IdEncoding, PrimRefGen};
pub use prim_ref::{AtomicList, PrimRef, PrimRefBlock, PrimRefList, BLOCK_CAPACITY};
pub use ray::{Ray, RayPacket, INVALID_ID, OCCLUDED_ID};
pub use registry::{
    motion_intersectors, triangle1v_intersectors, triangle4_intersectors, Intersectors,
    IntersectorsMB, TraversalKind,
};
pub use source::{TriangleMesh, TriangleSource};
pub use triangle::{LeafPrimitive, Triangle1v, Triangle1vMB, Triangle4};
