use geometry::{Bounds3f, Vec3f};
use rayon::prelude::*;

use crate::alloc::BlockAllocator;
use crate::prim_ref::{PrimRef, PrimRefBlock, PrimRefList};

/// Bins per axis for the SAH sweep
pub const BIN_COUNT: usize = 16;

/// Primitive count plus geometric and centroid bounds of a primitive set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimInfo {
    pub count: usize,
    pub geom_bounds: Bounds3f,
    pub cent_bounds: Bounds3f,
}

impl PrimInfo {
    pub const EMPTY: Self = Self {
        count: 0,
        geom_bounds: Bounds3f::EMPTY,
        cent_bounds: Bounds3f::EMPTY,
    };

    /// Account for one primitive
    #[inline]
    pub fn add(&mut self, prim: &PrimRef) {
        self.count += 1;
        self.geom_bounds = self.geom_bounds.union_box(prim.bounds);
        self.cent_bounds = self.cent_bounds.union_point(prim.centroid());
    }

    /// Combine the statistics of two disjoint sets
    #[inline]
    pub fn merge(self, other: Self) -> Self {
        Self {
            count: self.count + other.count,
            geom_bounds: self.geom_bounds.union_box(other.geom_bounds),
            cent_bounds: self.cent_bounds.union_box(other.cent_bounds),
        }
    }

    /// Estimated cost of keeping the whole set in one leaf
    #[inline]
    pub fn sah(&self) -> f32 {
        self.geom_bounds.half_area() * self.count as f32
    }
}

/// Quantizer from centroid positions to bin indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mapping {
    offset: Vec3f,
    scale: Vec3f,
}

impl Mapping {
    pub const INVALID: Self = Self {
        offset: Vec3f::ZERO,
        scale: Vec3f::ZERO,
    };

    /// Grid over the given centroid bounds. Flat axes get a zero scale and
    /// map everything to bin 0.
    pub fn new(cent_bounds: &Bounds3f) -> Self {
        let diag = cent_bounds.diagonal();
        let axis_scale = |d: f32| {
            if d > 0.0 {
                0.99 * BIN_COUNT as f32 / d
            } else {
                0.0
            }
        };
        Self {
            offset: cent_bounds.min,
            scale: Vec3f::new(axis_scale(diag.x), axis_scale(diag.y), axis_scale(diag.z)),
        }
    }

    /// Bin index of a centroid on each axis
    #[inline]
    pub fn bin(&self, centroid: Vec3f) -> [usize; 3] {
        let rel = centroid - self.offset;
        let clamp = |v: f32| (v as usize).min(BIN_COUNT - 1);
        [
            clamp(rel.x * self.scale.x),
            clamp(rel.y * self.scale.y),
            clamp(rel.z * self.scale.z),
        ]
    }

    /// Does the split predicate put this centroid on the left side
    #[inline]
    pub fn is_left(&self, centroid: Vec3f, axis: usize, pos: usize) -> bool {
        self.bin(centroid)[axis] < pos
    }
}

/// Per-axis bin statistics for one SAH evaluation
pub struct Binner {
    mapping: Mapping,
    counts: [[u32; BIN_COUNT]; 3],
    bounds: [[Bounds3f; BIN_COUNT]; 3],
}

impl Binner {
    pub fn new(mapping: Mapping) -> Self {
        Self {
            mapping,
            counts: [[0; BIN_COUNT]; 3],
            bounds: [[Bounds3f::EMPTY; BIN_COUNT]; 3],
        }
    }

    /// Accumulate a batch of primitives into the bins
    pub fn bin(&mut self, prims: &[PrimRef]) {
        for prim in prims {
            let bins = self.mapping.bin(prim.centroid());
            for axis in 0..3 {
                let b = bins[axis];
                self.counts[axis][b] += 1;
                self.bounds[axis][b] = self.bounds[axis][b].union_box(prim.bounds);
            }
        }
    }

    /// Combine bins produced by another worker over a disjoint range
    pub fn merge(&mut self, other: &Self) {
        for axis in 0..3 {
            for b in 0..BIN_COUNT {
                self.counts[axis][b] += other.counts[axis][b];
                self.bounds[axis][b] = self.bounds[axis][b].union_box(other.bounds[axis][b]);
            }
        }
    }

    /// Sweep the bins on every axis and return the cheapest split
    pub fn best(&self) -> Split {
        let mut best = Split::INVALID;
        for axis in 0..3 {
            if self.mapping.scale[axis] == 0.0 {
                continue;
            }

            // Right-to-left sweep caches the suffix statistics
            let mut right_bounds = [Bounds3f::EMPTY; BIN_COUNT];
            let mut right_counts = [0u32; BIN_COUNT];
            let mut acc_bounds = Bounds3f::EMPTY;
            let mut acc_count = 0;
            for b in (1..BIN_COUNT).rev() {
                acc_bounds = acc_bounds.union_box(self.bounds[axis][b]);
                acc_count += self.counts[axis][b];
                right_bounds[b] = acc_bounds;
                right_counts[b] = acc_count;
            }

            // Left-to-right sweep evaluates each split position
            let mut left_bounds = Bounds3f::EMPTY;
            let mut left_count = 0;
            for pos in 1..BIN_COUNT {
                left_bounds = left_bounds.union_box(self.bounds[axis][pos - 1]);
                left_count += self.counts[axis][pos - 1];
                if left_count == 0 || right_counts[pos] == 0 {
                    continue;
                }
                let cost = left_bounds.half_area() * left_count as f32
                    + right_bounds[pos].half_area() * right_counts[pos] as f32;
                if cost < best.cost {
                    best = Split {
                        axis,
                        pos,
                        cost,
                        mapping: self.mapping,
                        left_count: left_count as usize,
                        right_count: right_counts[pos] as usize,
                        left_bounds,
                        right_bounds: right_bounds[pos],
                    };
                }
            }
        }
        best
    }
}

/// Chosen split position with its predicted child statistics
#[derive(Debug, Clone, Copy)]
pub struct Split {
    pub axis: usize,
    /// Centroids binned below `pos` go left
    pub pos: usize,
    pub cost: f32,
    pub mapping: Mapping,
    pub left_count: usize,
    pub right_count: usize,
    pub left_bounds: Bounds3f,
    pub right_bounds: Bounds3f,
}

impl Split {
    pub const INVALID: Self = Self {
        axis: 0,
        pos: 0,
        cost: f32::INFINITY,
        mapping: Mapping::INVALID,
        left_count: 0,
        right_count: 0,
        left_bounds: Bounds3f::EMPTY,
        right_bounds: Bounds3f::EMPTY,
    };

    /// An invalid split means the centroids cannot be separated spatially
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.cost.is_finite()
    }

    /// Estimated cost of performing this split
    #[inline]
    pub fn sah(&self) -> f32 {
        self.cost
    }
}

/// One side of a completed split: its primitives, statistics and the
/// next-best split already evaluated
pub struct SplitSide {
    pub prims: PrimRefList,
    pub info: PrimInfo,
    pub split: Split,
}

/// Evaluate the best split for a primitive set by a serial binning pass
pub fn find_split(prims: &mut PrimRefList, info: &PrimInfo) -> Split {
    if info.count == 0 {
        return Split::INVALID;
    }
    let mut binner = Binner::new(Mapping::new(&info.cent_bounds));
    for block in prims.iter() {
        binner.bin(block.prims());
    }
    binner.best()
}

/// Evaluate the best split with one binning task per block
pub fn find_split_parallel(prims: &mut PrimRefList, info: &PrimInfo) -> Split {
    if info.count == 0 {
        return Split::INVALID;
    }
    let mapping = Mapping::new(&info.cent_bounds);
    let blocks: Vec<&PrimRefBlock> = prims.iter().map(|block| &**block).collect();
    let binner = blocks
        .par_iter()
        .fold(
            || Binner::new(mapping),
            |mut binner, block| {
                binner.bin(block.prims());
                binner
            },
        )
        .reduce(
            || Binner::new(mapping),
            |mut a, b| {
                a.merge(&b);
                a
            },
        );
    binner.best()
}

fn route(
    alloc: &BlockAllocator<PrimRefBlock>,
    list: &PrimRefList,
    block: &mut Box<PrimRefBlock>,
    info: &mut PrimInfo,
    prim: PrimRef,
) {
    info.add(&prim);
    if !block.push(prim) {
        let full = std::mem::replace(block, alloc.alloc());
        list.push(full);
        block.push(prim);
    }
}

fn flush(list: &PrimRefList, block: Box<PrimRefBlock>, alloc: &BlockAllocator<PrimRefBlock>) {
    if block.is_empty() {
        alloc.free(block);
    } else {
        list.push(block);
    }
}

/// Partition a primitive set by a chosen split, recomputing both children's
/// statistics and proposing their next splits
pub fn split_serial(
    alloc: &BlockAllocator<PrimRefBlock>,
    mut prims: PrimRefList,
    split: &Split,
) -> (SplitSide, SplitSide) {
    let left = PrimRefList::new();
    let right = PrimRefList::new();
    let mut linfo = PrimInfo::EMPTY;
    let mut rinfo = PrimInfo::EMPTY;
    let mut lblock = alloc.alloc();
    let mut rblock = alloc.alloc();

    while let Some(block) = prims.pop() {
        for &prim in block.prims() {
            if split.mapping.is_left(prim.centroid(), split.axis, split.pos) {
                route(alloc, &left, &mut lblock, &mut linfo, prim);
            } else {
                route(alloc, &right, &mut rblock, &mut rinfo, prim);
            }
        }
        alloc.free(block);
    }
    flush(&left, lblock, alloc);
    flush(&right, rblock, alloc);

    let mut left = left;
    let mut right = right;
    let lsplit = find_split(&mut left, &linfo);
    let rsplit = find_split(&mut right, &rinfo);
    (
        SplitSide {
            prims: left,
            info: linfo,
            split: lsplit,
        },
        SplitSide {
            prims: right,
            info: rinfo,
            split: rsplit,
        },
    )
}

/// Parallel variant of [`split_serial`]: blocks are partitioned by a pool of
/// tasks pushing onto shared child lists, the statistics merged afterwards
pub fn split_parallel(
    alloc: &BlockAllocator<PrimRefBlock>,
    mut prims: PrimRefList,
    split: &Split,
) -> (SplitSide, SplitSide) {
    let blocks = prims.drain();
    let left = PrimRefList::new();
    let right = PrimRefList::new();

    let (linfo, rinfo) = blocks
        .into_par_iter()
        .fold(
            || (PrimInfo::EMPTY, PrimInfo::EMPTY),
            |(mut linfo, mut rinfo), block| {
                let mut lblock = alloc.alloc();
                let mut rblock = alloc.alloc();
                for &prim in block.prims() {
                    if split.mapping.is_left(prim.centroid(), split.axis, split.pos) {
                        route(alloc, &left, &mut lblock, &mut linfo, prim);
                    } else {
                        route(alloc, &right, &mut rblock, &mut rinfo, prim);
                    }
                }
                alloc.free(block);
                flush(&left, lblock, alloc);
                flush(&right, rblock, alloc);
                (linfo, rinfo)
            },
        )
        .reduce(
            || (PrimInfo::EMPTY, PrimInfo::EMPTY),
            |a, b| (a.0.merge(b.0), a.1.merge(b.1)),
        );

    let mut left = left;
    let mut right = right;
    let lsplit = find_split_parallel(&mut left, &linfo);
    let rsplit = find_split_parallel(&mut right, &rinfo);
    (
        SplitSide {
            prims: left,
            info: linfo,
            split: lsplit,
        },
        SplitSide {
            prims: right,
            info: rinfo,
            split: rsplit,
        },
    )
}

/// Forced median split by primitive count, ignoring the SAH. Used when the
/// centroids cannot be separated but the set is still too large for a leaf.
pub fn split_fallback(
    alloc: &BlockAllocator<PrimRefBlock>,
    mut prims: PrimRefList,
    info: &PrimInfo,
) -> (SplitSide, SplitSide) {
    let half = info.count / 2;
    let left = PrimRefList::new();
    let right = PrimRefList::new();
    let mut linfo = PrimInfo::EMPTY;
    let mut rinfo = PrimInfo::EMPTY;
    let mut lblock = alloc.alloc();
    let mut rblock = alloc.alloc();

    let mut routed = 0;
    while let Some(block) = prims.pop() {
        for &prim in block.prims() {
            if routed < half {
                route(alloc, &left, &mut lblock, &mut linfo, prim);
            } else {
                route(alloc, &right, &mut rblock, &mut rinfo, prim);
            }
            routed += 1;
        }
        alloc.free(block);
    }
    flush(&left, lblock, alloc);
    flush(&right, rblock, alloc);

    let mut left = left;
    let mut right = right;
    let lsplit = find_split(&mut left, &linfo);
    let rsplit = find_split(&mut right, &rinfo);
    (
        SplitSide {
            prims: left,
            info: linfo,
            split: lsplit,
        },
        SplitSide {
            prims: right,
            info: rinfo,
            split: rsplit,
        },
    )
}
