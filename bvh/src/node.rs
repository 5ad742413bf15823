use geometry::{Bounds3f, Vec3f};
use simd::SimdF32;

/// Maximum inner node depth produced by the builders
pub const MAX_BUILD_DEPTH: usize = 32;

/// Depth limit for the fallback leaf splitter; exceeding it is a build error
pub const MAX_BUILD_DEPTH_LEAF: usize = MAX_BUILD_DEPTH + 16;

/// Traversal stack capacity for the single-ray kernels
pub const SINGLE_STACK_SIZE: usize = 1 + 3 * MAX_BUILD_DEPTH;

/// Traversal stack capacity for the packet kernels
pub const CHUNK_STACK_SIZE: usize = 1 + 3 * MAX_BUILD_DEPTH;

/// Reference from a node to one of its children.
///
/// `Invalid` never occurs inside a tree; the packet kernels use it as a
/// bottom-of-stack sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    /// Unused child slot
    Empty,
    /// Traversal stack sentinel
    Invalid,
    /// Index of an inner node
    Inner(u32),
    /// Range of packed primitive blocks
    Leaf { start: u32, count: u32 },
}

impl NodeRef {
    #[inline]
    pub fn is_leaf(self) -> bool {
        matches!(self, NodeRef::Leaf { .. })
    }

    #[inline]
    pub fn is_inner(self) -> bool {
        matches!(self, NodeRef::Inner(_))
    }
}

/// Inner node with four child boxes in structure-of-arrays layout.
///
/// Unused slots hold inverted boxes (`+inf` lower, `-inf` upper) which fail
/// every slab test without being special-cased.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node4 {
    pub lower_x: [f32; 4],
    pub lower_y: [f32; 4],
    pub lower_z: [f32; 4],
    pub upper_x: [f32; 4],
    pub upper_y: [f32; 4],
    pub upper_z: [f32; 4],
    pub children: [NodeRef; 4],
}

impl Node4 {
    pub const EMPTY: Self = Self {
        lower_x: [f32::INFINITY; 4],
        lower_y: [f32::INFINITY; 4],
        lower_z: [f32::INFINITY; 4],
        upper_x: [f32::NEG_INFINITY; 4],
        upper_y: [f32::NEG_INFINITY; 4],
        upper_z: [f32::NEG_INFINITY; 4],
        children: [NodeRef::Empty; 4],
    };

    /// Fill one child slot
    #[inline]
    pub fn set(&mut self, i: usize, bounds: Bounds3f, child: NodeRef) {
        self.lower_x[i] = bounds.min.x;
        self.lower_y[i] = bounds.min.y;
        self.lower_z[i] = bounds.min.z;
        self.upper_x[i] = bounds.max.x;
        self.upper_y[i] = bounds.max.y;
        self.upper_z[i] = bounds.max.z;
        self.children[i] = child;
    }

    /// Bounds stored for one child slot
    #[inline]
    pub fn child_bounds(&self, i: usize) -> Bounds3f {
        Bounds3f {
            min: Vec3f::new(self.lower_x[i], self.lower_y[i], self.lower_z[i]),
            max: Vec3f::new(self.upper_x[i], self.upper_y[i], self.upper_z[i]),
        }
    }

    /// Union of all child bounds
    pub fn bounds(&self) -> Bounds3f {
        let mut bounds = Bounds3f::EMPTY;
        for i in 0..4 {
            if self.children[i] != NodeRef::Empty {
                bounds = bounds.union_box(self.child_bounds(i));
            }
        }
        bounds
    }
}

/// Inner node for motion blur trees, carrying boxes at both time samples.
/// Traversal interpolates the two boxes by the ray time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node4MB {
    pub lower0_x: [f32; 4],
    pub lower0_y: [f32; 4],
    pub lower0_z: [f32; 4],
    pub upper0_x: [f32; 4],
    pub upper0_y: [f32; 4],
    pub upper0_z: [f32; 4],
    pub lower1_x: [f32; 4],
    pub lower1_y: [f32; 4],
    pub lower1_z: [f32; 4],
    pub upper1_x: [f32; 4],
    pub upper1_y: [f32; 4],
    pub upper1_z: [f32; 4],
    pub children: [NodeRef; 4],
}

impl Node4MB {
    pub const EMPTY: Self = Self {
        lower0_x: [f32::INFINITY; 4],
        lower0_y: [f32::INFINITY; 4],
        lower0_z: [f32::INFINITY; 4],
        upper0_x: [f32::NEG_INFINITY; 4],
        upper0_y: [f32::NEG_INFINITY; 4],
        upper0_z: [f32::NEG_INFINITY; 4],
        lower1_x: [f32::INFINITY; 4],
        lower1_y: [f32::INFINITY; 4],
        lower1_z: [f32::INFINITY; 4],
        upper1_x: [f32::NEG_INFINITY; 4],
        upper1_y: [f32::NEG_INFINITY; 4],
        upper1_z: [f32::NEG_INFINITY; 4],
        children: [NodeRef::Empty; 4],
    };

    /// Fill one child slot with its boxes at both time samples
    #[inline]
    pub fn set(&mut self, i: usize, bounds0: Bounds3f, bounds1: Bounds3f, child: NodeRef) {
        self.lower0_x[i] = bounds0.min.x;
        self.lower0_y[i] = bounds0.min.y;
        self.lower0_z[i] = bounds0.min.z;
        self.upper0_x[i] = bounds0.max.x;
        self.upper0_y[i] = bounds0.max.y;
        self.upper0_z[i] = bounds0.max.z;
        self.lower1_x[i] = bounds1.min.x;
        self.lower1_y[i] = bounds1.min.y;
        self.lower1_z[i] = bounds1.min.z;
        self.upper1_x[i] = bounds1.max.x;
        self.upper1_y[i] = bounds1.max.y;
        self.upper1_z[i] = bounds1.max.z;
        self.children[i] = child;
    }

    #[inline]
    pub fn child_bounds0(&self, i: usize) -> Bounds3f {
        Bounds3f {
            min: Vec3f::new(self.lower0_x[i], self.lower0_y[i], self.lower0_z[i]),
            max: Vec3f::new(self.upper0_x[i], self.upper0_y[i], self.upper0_z[i]),
        }
    }

    #[inline]
    pub fn child_bounds1(&self, i: usize) -> Bounds3f {
        Bounds3f {
            min: Vec3f::new(self.lower1_x[i], self.lower1_y[i], self.lower1_z[i]),
            max: Vec3f::new(self.upper1_x[i], self.upper1_y[i], self.upper1_z[i]),
        }
    }

    /// Child box interpolated to the given time
    #[inline]
    pub fn child_bounds_at(&self, i: usize, time: f32) -> Bounds3f {
        self.child_bounds0(i).lerp(self.child_bounds1(i), time)
    }

    /// Per-slot lower x bounds interpolated to the given time
    #[inline]
    pub fn lerp_lanes(a: [f32; 4], b: [f32; 4], time: f32) -> SimdF32<4> {
        SimdF32::from(a).lerp(SimdF32::from(b), SimdF32::splat(time))
    }
}

/// Stack entry of the single-ray kernels: a node and its entry distance
#[derive(Debug, Clone, Copy)]
pub struct StackItem {
    pub node: NodeRef,
    pub dist: f32,
}

impl StackItem {
    pub const PLACEHOLDER: Self = Self {
        node: NodeRef::Invalid,
        dist: f32::INFINITY,
    };
}

/// Order two stack entries so the closer one ends up on top
#[inline]
pub fn sort2(stack: &mut [StackItem], a: usize, b: usize) {
    if stack[a].dist < stack[b].dist {
        stack.swap(a, b);
    }
}

/// Sorting network for the top three stack entries
#[inline]
pub fn sort3(stack: &mut [StackItem], a: usize, b: usize, c: usize) {
    sort2(stack, a, b);
    sort2(stack, b, c);
    sort2(stack, a, b);
}

/// Sorting network for the top four stack entries
#[inline]
pub fn sort4(stack: &mut [StackItem], a: usize, b: usize, c: usize, d: usize) {
    sort2(stack, a, b);
    sort2(stack, c, d);
    sort2(stack, a, c);
    sort2(stack, b, d);
    sort2(stack, b, c);
}
