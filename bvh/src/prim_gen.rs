use log::trace;
use rayon::prelude::*;

use crate::alloc::BlockAllocator;
use crate::binning::{find_split_parallel, PrimInfo, Split};
use crate::error::BuildError;
use crate::prim_ref::{PrimRef, PrimRefBlock, PrimRefList, BLOCK_CAPACITY};
use crate::source::TriangleSource;

/// Bit packing of (group id, primitive id) pairs into one u32.
///
/// The primitive id occupies the low bits, sized for the largest group;
/// the group id occupies the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdEncoding {
    pub shift: u32,
    pub mask: u32,
}

impl IdEncoding {
    /// Choose an encoding for the source, failing when the ids cannot fit
    pub fn new<S: TriangleSource + ?Sized>(source: &S) -> Result<Self, BuildError> {
        let groups = source.group_count();
        let max_prims = source.max_group_prims();

        let prim_bits = bits_for(max_prims);
        let group_bits = bits_for(groups);
        if prim_bits + group_bits > 32 {
            return Err(BuildError::EncodingOverflow {
                groups,
                prims: max_prims,
            });
        }
        Ok(Self {
            shift: prim_bits,
            mask: if prim_bits == 32 {
                u32::MAX
            } else {
                (1u32 << prim_bits) - 1
            },
        })
    }

    #[inline]
    pub fn encode(&self, group: u32, prim: u32) -> u32 {
        (group << self.shift) | prim
    }

    #[inline]
    pub fn decode(&self, id: u32) -> (u32, u32) {
        (id >> self.shift, id & self.mask)
    }
}

/// Number of bits needed to index `count` values
fn bits_for(count: usize) -> u32 {
    if count <= 1 {
        0
    } else {
        usize::BITS - (count - 1).leading_zeros()
    }
}

/// Output of primitive reference generation: the references themselves,
/// their statistics and the first proposed split
pub struct PrimRefGen {
    pub prims: PrimRefList,
    pub info: PrimInfo,
    pub split: Split,
    pub encoding: IdEncoding,
}

/// Generate primitive references for every enabled group in parallel.
///
/// Each task fills whole blocks and pushes them onto a shared list while
/// accumulating its own statistics; a reduction merges the statistics and a
/// final binning pass proposes the root split. Primitives with NaN bounds
/// are dropped here and never enter the tree.
pub fn generate_prim_refs<S: TriangleSource + ?Sized>(
    source: &S,
    alloc: &BlockAllocator<PrimRefBlock>,
) -> Result<PrimRefGen, BuildError> {
    let encoding = IdEncoding::new(source)?;

    let list = PrimRefList::new();
    let info = (0..source.group_count())
        .into_par_iter()
        .filter(|&group| source.enabled(group))
        .map(|group| {
            (0..source.prim_count(group))
                .into_par_iter()
                .chunks(BLOCK_CAPACITY)
                .map(|chunk| {
                    let mut info = PrimInfo::EMPTY;
                    let mut block = alloc.alloc();
                    for prim in chunk {
                        let bounds = source.prim_bounds(group, prim);
                        if bounds.min.has_nan() || bounds.max.has_nan() {
                            continue;
                        }
                        let prim =
                            PrimRef::new(bounds, encoding.encode(group as u32, prim as u32));
                        info.add(&prim);
                        block.push(prim);
                    }
                    if block.is_empty() {
                        alloc.free(block);
                    } else {
                        list.push(block);
                    }
                    info
                })
                .reduce(|| PrimInfo::EMPTY, PrimInfo::merge)
        })
        .reduce(|| PrimInfo::EMPTY, PrimInfo::merge);

    let mut prims = list;
    let split = find_split_parallel(&mut prims, &info);
    trace!(
        "generated {} prim refs, root sah {}",
        info.count,
        info.sah()
    );

    Ok(PrimRefGen {
        prims,
        info,
        split,
        encoding,
    })
}
