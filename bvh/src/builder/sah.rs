//! Top-down builder driven by binned surface area heuristic splits.
//!
//! Nodes are grown to four children by repeatedly splitting the child whose
//! split is predicted to pay off most. The primitive lists flow through the
//! block allocator; the finished topology is flattened into the packed
//! arrays afterwards and the boxes filled in by a refit pass.

use geometry::Bounds3f;
use log::debug;

use crate::alloc::BlockAllocator;
use crate::binning::{split_fallback, split_parallel, split_serial, PrimInfo, Split, SplitSide};
use crate::builder::BuildConfig;
use crate::bvh4::{Bvh4, Bvh4MB};
use crate::error::BuildError;
use crate::node::{Node4, Node4MB, NodeRef, MAX_BUILD_DEPTH, MAX_BUILD_DEPTH_LEAF};
use crate::prim_gen::{generate_prim_refs, IdEncoding};
use crate::prim_ref::{PrimRef, PrimRefBlock, PrimRefList};
use crate::source::TriangleSource;
use crate::triangle::{LeafPrimitive, Triangle1vMB};

/// Build a static tree with binned SAH splits
pub fn build_sah<P: LeafPrimitive, S: TriangleSource + ?Sized>(
    source: &S,
    config: &BuildConfig,
) -> Result<Bvh4<P>, BuildError> {
    let alloc = BlockAllocator::new();
    let gen = generate_prim_refs(source, &alloc)?;
    if gen.info.count == 0 {
        return Ok(Bvh4::empty());
    }

    let count = gen.info.count;
    let item = SplitSide {
        prims: gen.prims,
        info: gen.info,
        split: gen.split,
    };
    let tree = build_node(&alloc, config, item, 1)?;

    let mut nodes = Vec::new();
    let mut prims = Vec::new();
    let root = flatten(tree, source, &gen.encoding, &mut nodes, &mut prims);
    let mut bvh = Bvh4 {
        nodes,
        prims,
        root,
        bounds: Bounds3f::EMPTY,
    };
    bvh.refit();
    if config.rotation_rounds > 0 {
        bvh.rotate(config.rotation_rounds);
    }
    debug!(
        "sah build: {} prims, {} nodes, depth {}",
        count,
        bvh.nodes.len(),
        bvh.depth()
    );
    Ok(bvh)
}

/// Build a motion blur tree over the union bounds of both time samples
pub fn build_sah_mb<S: TriangleSource + ?Sized>(
    source: &S,
    config: &BuildConfig,
) -> Result<Bvh4MB, BuildError> {
    let alloc = BlockAllocator::new();
    let gen = generate_prim_refs(source, &alloc)?;
    if gen.info.count == 0 {
        return Ok(Bvh4MB::empty());
    }

    let count = gen.info.count;
    let item = SplitSide {
        prims: gen.prims,
        info: gen.info,
        split: gen.split,
    };
    let tree = build_node(&alloc, config, item, 1)?;

    let mut nodes = Vec::new();
    let mut prims = Vec::new();
    let root = flatten_mb(tree, source, &gen.encoding, &mut nodes, &mut prims);
    let mut bvh = Bvh4MB {
        nodes,
        prims,
        root,
        bounds: Bounds3f::EMPTY,
    };
    bvh.refit();
    debug!("sah mb build: {} prims, {} nodes", count, bvh.nodes.len());
    Ok(bvh)
}

/// Intermediate topology produced by the recursion, flattened later
enum BuildNode {
    Inner { children: Vec<BuildNode> },
    Leaf { prims: Vec<PrimRef> },
}

fn build_node(
    alloc: &BlockAllocator<PrimRefBlock>,
    config: &BuildConfig,
    item: SplitSide,
    depth: usize,
) -> Result<BuildNode, BuildError> {
    if item.info.count <= config.min_leaf || depth >= MAX_BUILD_DEPTH {
        return create_large_leaf(alloc, config, item.prims, item.info, depth);
    }

    // Grow to four children, always splitting the child whose split is
    // predicted to reduce the SAH the most
    let mut children: Vec<SplitSide> = vec![item];
    while children.len() < 4 {
        let Some(pick) = select_child(&children, config) else {
            break;
        };

        let child = children.swap_remove(pick);
        let (left, right) = perform_split(alloc, config, child);
        children.push(left);
        children.push(right);
    }

    // No child was worth splitting
    if children.len() == 1 {
        let child = children.remove(0);
        return create_large_leaf(alloc, config, child.prims, child.info, depth);
    }

    let parallel = children.iter().map(|c| c.info.count).sum::<usize>() >= config.serial_threshold;
    let mut results: Vec<Option<Result<BuildNode, BuildError>>> =
        children.iter().map(|_| None).collect();
    if parallel {
        rayon::scope(|s| {
            for (slot, child) in results.iter_mut().zip(children) {
                s.spawn(move |_| {
                    *slot = Some(build_node(alloc, config, child, depth + 1));
                });
            }
        });
    } else {
        for (slot, child) in results.iter_mut().zip(children) {
            *slot = Some(build_node(alloc, config, child, depth + 1));
        }
    }

    let mut built = Vec::with_capacity(results.len());
    for result in results.into_iter().flatten() {
        built.push(result?);
    }
    Ok(BuildNode::Inner { children: built })
}

/// Index of the child whose split gains the most, or None when every child
/// is leaf sized. Children over the leaf capacity have their gain clamped to
/// zero so they split even when the split is predicted not to pay off.
fn select_child(children: &[SplitSide], config: &BuildConfig) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, child) in children.iter().enumerate() {
        if child.info.count <= config.min_leaf {
            continue;
        }
        let mut gain = child.split.sah() - child.info.sah();
        if child.info.count > config.max_leaf {
            gain = gain.min(0.0);
        }
        if gain <= 0.0 && best.map_or(true, |(_, b)| gain <= b) {
            best = Some((i, gain));
        }
    }
    best.map(|(i, _)| i)
}

fn perform_split(
    alloc: &BlockAllocator<PrimRefBlock>,
    config: &BuildConfig,
    child: SplitSide,
) -> (SplitSide, SplitSide) {
    if !child.split.is_valid() {
        // Centroids cannot be separated spatially
        split_fallback(alloc, child.prims, &child.info)
    } else if child.info.count >= config.parallel_split_threshold {
        split_parallel(alloc, child.prims, &child.split)
    } else {
        split_serial(alloc, child.prims, &child.split)
    }
}

/// Turn a set into a leaf, splitting by count first while it exceeds the
/// leaf capacity
fn create_large_leaf(
    alloc: &BlockAllocator<PrimRefBlock>,
    config: &BuildConfig,
    mut prims: PrimRefList,
    info: PrimInfo,
    depth: usize,
) -> Result<BuildNode, BuildError> {
    if depth > MAX_BUILD_DEPTH_LEAF {
        return Err(BuildError::NonConvergence { depth });
    }
    if info.count <= config.max_leaf {
        let mut items = Vec::with_capacity(info.count);
        while let Some(block) = prims.pop() {
            items.extend_from_slice(block.prims());
            alloc.free(block);
        }
        return Ok(BuildNode::Leaf { prims: items });
    }

    let (left, right) = split_fallback(alloc, prims, &info);
    let left = create_large_leaf(alloc, config, left.prims, left.info, depth + 1)?;
    let right = create_large_leaf(alloc, config, right.prims, right.info, depth + 1)?;
    Ok(BuildNode::Inner {
        children: vec![left, right],
    })
}

/// Pack the topology into the flat arrays; boxes are filled by the refit
fn flatten<P: LeafPrimitive, S: TriangleSource + ?Sized>(
    node: BuildNode,
    source: &S,
    encoding: &IdEncoding,
    nodes: &mut Vec<Node4>,
    prims: &mut Vec<P>,
) -> NodeRef {
    match node {
        BuildNode::Leaf { prims: refs } => {
            let ids: Vec<(u32, u32)> = refs.iter().map(|p| encoding.decode(p.id)).collect();
            let start = prims.len();
            let blocks = P::blocks_for(ids.len());
            prims.extend((0..blocks).map(|_| P::empty()));
            P::pack(&ids, source, &mut prims[start..]);
            NodeRef::Leaf {
                start: start as u32,
                count: blocks as u32,
            }
        }
        BuildNode::Inner { children } => {
            let index = nodes.len();
            nodes.push(Node4::EMPTY);
            for (i, child) in children.into_iter().enumerate() {
                let child = flatten(child, source, encoding, nodes, prims);
                nodes[index].set(i, Bounds3f::EMPTY, child);
            }
            NodeRef::Inner(index as u32)
        }
    }
}

fn flatten_mb<S: TriangleSource + ?Sized>(
    node: BuildNode,
    source: &S,
    encoding: &IdEncoding,
    nodes: &mut Vec<Node4MB>,
    prims: &mut Vec<Triangle1vMB>,
) -> NodeRef {
    match node {
        BuildNode::Leaf { prims: refs } => {
            let ids: Vec<(u32, u32)> = refs.iter().map(|p| encoding.decode(p.id)).collect();
            let start = prims.len();
            prims.extend((0..ids.len()).map(|_| Triangle1vMB::empty()));
            Triangle1vMB::pack(&ids, source, &mut prims[start..]);
            NodeRef::Leaf {
                start: start as u32,
                count: ids.len() as u32,
            }
        }
        BuildNode::Inner { children } => {
            let index = nodes.len();
            nodes.push(Node4MB::EMPTY);
            for (i, child) in children.into_iter().enumerate() {
                let child = flatten_mb(child, source, encoding, nodes, prims);
                nodes[index].set(i, Bounds3f::EMPTY, Bounds3f::EMPTY, child);
            }
            NodeRef::Inner(index as u32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::Split;
    use geometry::Vec3f;

    // Unit box, so info.sah() is 3.0 per primitive
    fn side(count: usize, split_cost: f32) -> SplitSide {
        let bounds = geometry::Bounds3f {
            min: Vec3f::ZERO,
            max: Vec3f::splat(1.0),
        };
        let mut split = Split::INVALID;
        split.cost = split_cost;
        SplitSide {
            prims: PrimRefList::new(),
            info: PrimInfo {
                count,
                geom_bounds: bounds,
                cent_bounds: bounds,
            },
            split,
        }
    }

    #[test]
    fn oversized_children_split_even_at_zero_gain() {
        let config = BuildConfig::default();
        // 100 prims over the leaf capacity, split predicted to gain nothing
        assert_eq!(select_child(&[side(100, 300.0)], &config), Some(0));
        // Even at a predicted loss the clamp forces the split
        assert_eq!(select_child(&[side(100, 500.0)], &config), Some(0));
    }

    #[test]
    fn leaf_sized_children_are_left_alone() {
        let config = BuildConfig::default();
        // Fits in a leaf and the split gains nothing
        assert_eq!(select_child(&[side(10, 40.0)], &config), None);
        // At or under min_leaf is never split
        assert_eq!(select_child(&[side(4, 0.0)], &config), None);
    }

    #[test]
    fn most_negative_gain_wins() {
        let config = BuildConfig::default();
        let children = [side(100, 200.0), side(100, 100.0), side(10, 40.0)];
        assert_eq!(select_child(&children, &config), Some(1));
    }
}
