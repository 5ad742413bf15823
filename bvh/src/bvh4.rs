use geometry::Bounds3f;

use crate::node::{Node4, Node4MB, NodeRef, MAX_BUILD_DEPTH};
use crate::triangle::{LeafPrimitive, Triangle1vMB};

/// Packed four-wide bounding volume hierarchy.
///
/// Nodes and primitives live in flat arrays referenced by index; the
/// structure is written once by a builder and read-only afterwards.
pub struct Bvh4<P> {
    pub nodes: Vec<Node4>,
    pub prims: Vec<P>,
    pub root: NodeRef,
    pub bounds: Bounds3f,
}

impl<P: LeafPrimitive> Bvh4<P> {
    /// Tree over no geometry; every query misses
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            prims: Vec::new(),
            root: NodeRef::Empty,
            bounds: Bounds3f::EMPTY,
        }
    }

    /// Primitive blocks referenced by a leaf
    #[inline]
    pub fn leaf(&self, start: u32, count: u32) -> &[P] {
        &self.prims[start as usize..(start + count) as usize]
    }

    /// Recompute every inner node's boxes bottom-up from the leaves
    pub fn refit(&mut self) {
        self.bounds = refit_ref(&mut self.nodes, &self.prims, self.root);
    }

    /// Perform bounded local tree rotations that shrink child boxes by
    /// promoting grandchildren. Purely a quality pass; the tree stays valid
    /// whether or not it runs.
    pub fn rotate(&mut self, rounds: usize) {
        for _ in 0..rounds {
            rotate_ref(&mut self.nodes, self.root, 1);
        }
        self.refit();
    }

    /// Walk the whole tree checking the containment invariant: every
    /// node's stored child box contains everything beneath that child.
    pub fn validate(&self) -> bool {
        validate_ref(&self.nodes, &self.prims, self.root, self.bounds, 0)
    }

    /// Longest root-to-leaf path measured in inner nodes
    pub fn depth(&self) -> usize {
        depth_ref(&self.nodes, self.root)
    }
}

fn refit_ref<P: LeafPrimitive>(nodes: &mut [Node4], prims: &[P], r: NodeRef) -> Bounds3f {
    match r {
        NodeRef::Inner(index) => {
            let mut bounds = Bounds3f::EMPTY;
            for i in 0..4 {
                let child = nodes[index as usize].children[i];
                if child == NodeRef::Empty {
                    continue;
                }
                let child_bounds = refit_ref(nodes, prims, child);
                nodes[index as usize].set(i, child_bounds, child);
                bounds = bounds.union_box(child_bounds);
            }
            bounds
        }
        NodeRef::Leaf { start, count } => leaf_bounds(prims, start, count),
        _ => Bounds3f::EMPTY,
    }
}

fn leaf_bounds<P: LeafPrimitive>(prims: &[P], start: u32, count: u32) -> Bounds3f {
    let mut bounds = Bounds3f::EMPTY;
    for prim in &prims[start as usize..(start + count) as usize] {
        bounds = bounds.union_box(prim.bounds());
    }
    bounds
}

fn rotate_ref(nodes: &mut [Node4], r: NodeRef, depth: usize) {
    let index = match r {
        NodeRef::Inner(index) => index as usize,
        _ => return,
    };

    for i in 0..4 {
        let child = nodes[index].children[i];
        rotate_ref(nodes, child, depth + 1);
    }

    // Find the swap of a child with a grandchild that shrinks the summed
    // child areas the most
    let mut best_gain = 0.0f32;
    let mut best: Option<(usize, usize, usize)> = None;
    for a in 0..4 {
        let child_a = match nodes[index].children[a] {
            NodeRef::Inner(ci) => ci as usize,
            _ => continue,
        };
        let area_a = nodes[index].child_bounds(a).half_area();
        for g in 0..4 {
            if nodes[child_a].children[g] == NodeRef::Empty {
                continue;
            }
            // Box of child a with grandchild g removed
            let mut rest = Bounds3f::EMPTY;
            for o in 0..4 {
                if o != g && nodes[child_a].children[o] != NodeRef::Empty {
                    rest = rest.union_box(nodes[child_a].child_bounds(o));
                }
            }
            for b in 0..4 {
                if b == a || nodes[index].children[b] == NodeRef::Empty {
                    continue;
                }
                // Moving an inner subtree down may exceed the depth bound
                if nodes[index].children[b].is_inner() && depth + 2 > MAX_BUILD_DEPTH {
                    continue;
                }
                let area_b = nodes[index].child_bounds(b).half_area();
                let new_a = rest.union_box(nodes[index].child_bounds(b));
                let area_g = nodes[child_a].child_bounds(g).half_area();
                let gain = (area_a + area_b) - (new_a.half_area() + area_g);
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((a, g, b));
                }
            }
        }
    }

    if let Some((a, g, b)) = best {
        let child_a = match nodes[index].children[a] {
            NodeRef::Inner(ci) => ci as usize,
            _ => unreachable!(),
        };
        let up = nodes[child_a].children[g];
        let up_bounds = nodes[child_a].child_bounds(g);
        let down = nodes[index].children[b];
        let down_bounds = nodes[index].child_bounds(b);

        nodes[child_a].set(g, down_bounds, down);
        nodes[index].set(b, up_bounds, up);
        let new_a = nodes[child_a].bounds();
        nodes[index].set(a, new_a, NodeRef::Inner(child_a as u32));
    }
}

fn validate_ref<P: LeafPrimitive>(
    nodes: &[Node4],
    prims: &[P],
    r: NodeRef,
    bounds: Bounds3f,
    depth: usize,
) -> bool {
    if depth > MAX_BUILD_DEPTH {
        return false;
    }
    match r {
        NodeRef::Empty => true,
        NodeRef::Invalid => false,
        NodeRef::Inner(index) => {
            let node = &nodes[index as usize];
            (0..4).all(|i| {
                let child = node.children[i];
                let child_bounds = node.child_bounds(i);
                (child == NodeRef::Empty || bounds.contains_box(child_bounds))
                    && validate_ref(nodes, prims, child, child_bounds, depth + 1)
            })
        }
        NodeRef::Leaf { start, count } => bounds.contains_box(leaf_bounds(prims, start, count)),
    }
}

fn depth_ref(nodes: &[Node4], r: NodeRef) -> usize {
    match r {
        NodeRef::Inner(index) => {
            1 + (0..4)
                .map(|i| depth_ref(nodes, nodes[index as usize].children[i]))
                .max()
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Four-wide hierarchy for motion blur: every node carries boxes at both
/// time samples and traversal interpolates them per ray.
pub struct Bvh4MB {
    pub nodes: Vec<Node4MB>,
    pub prims: Vec<Triangle1vMB>,
    pub root: NodeRef,
    /// Union of the bounds at both time samples
    pub bounds: Bounds3f,
}

impl Bvh4MB {
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            prims: Vec::new(),
            root: NodeRef::Empty,
            bounds: Bounds3f::EMPTY,
        }
    }

    #[inline]
    pub fn leaf(&self, start: u32, count: u32) -> &[Triangle1vMB] {
        &self.prims[start as usize..(start + count) as usize]
    }

    /// Recompute both time sample boxes bottom-up from the two-sample
    /// triangles. Run once after the tree shape is final.
    pub fn refit(&mut self) {
        let (b0, b1) = refit_mb(&mut self.nodes, &self.prims, self.root);
        self.bounds = b0.union_box(b1);
    }

    /// Containment walk over the boxes at both time samples
    pub fn validate(&self) -> bool {
        validate_mb(&self.nodes, &self.prims, self.root, self.bounds, self.bounds, 0)
    }
}

fn refit_mb(
    nodes: &mut [Node4MB],
    prims: &[Triangle1vMB],
    r: NodeRef,
) -> (Bounds3f, Bounds3f) {
    match r {
        NodeRef::Inner(index) => {
            let mut bounds0 = Bounds3f::EMPTY;
            let mut bounds1 = Bounds3f::EMPTY;
            for i in 0..4 {
                let child = nodes[index as usize].children[i];
                if child == NodeRef::Empty {
                    continue;
                }
                let (c0, c1) = refit_mb(nodes, prims, child);
                nodes[index as usize].set(i, c0, c1, child);
                bounds0 = bounds0.union_box(c0);
                bounds1 = bounds1.union_box(c1);
            }
            (bounds0, bounds1)
        }
        NodeRef::Leaf { start, count } => {
            let mut bounds0 = Bounds3f::EMPTY;
            let mut bounds1 = Bounds3f::EMPTY;
            for tri in &prims[start as usize..(start + count) as usize] {
                bounds0 = bounds0.union_box(tri.bounds());
                bounds1 = bounds1.union_box(tri.bounds1());
            }
            (bounds0, bounds1)
        }
        _ => (Bounds3f::EMPTY, Bounds3f::EMPTY),
    }
}

fn validate_mb(
    nodes: &[Node4MB],
    prims: &[Triangle1vMB],
    r: NodeRef,
    bounds0: Bounds3f,
    bounds1: Bounds3f,
    depth: usize,
) -> bool {
    if depth > MAX_BUILD_DEPTH {
        return false;
    }
    match r {
        NodeRef::Empty => true,
        NodeRef::Invalid => false,
        NodeRef::Inner(index) => {
            let node = &nodes[index as usize];
            (0..4).all(|i| {
                let child = node.children[i];
                let c0 = node.child_bounds0(i);
                let c1 = node.child_bounds1(i);
                (child == NodeRef::Empty
                    || (bounds0.contains_box(c0) && bounds1.contains_box(c1)))
                    && validate_mb(nodes, prims, child, c0, c1, depth + 1)
            })
        }
        NodeRef::Leaf { start, count } => {
            prims[start as usize..(start + count) as usize].iter().all(|tri| {
                bounds0.contains_box(tri.bounds()) && bounds1.contains_box(tri.bounds1())
            })
        }
    }
}
