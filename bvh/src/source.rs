use geometry::{Bounds3f, Vec3f};

/// Narrow read-only view of triangle geometry used by the builders.
///
/// Geometry is organised as groups of triangles. Each triangle has one or
/// two time samples; sources without motion return the same vertices for
/// both samples.
pub trait TriangleSource: Send + Sync {
    /// Number of geometry groups
    fn group_count(&self) -> usize;

    /// Number of triangles in the given group
    fn prim_count(&self, group: usize) -> usize;

    /// Disabled groups are skipped entirely during construction
    fn enabled(&self, group: usize) -> bool {
        let _ = group;
        true
    }

    /// Vertices of a triangle at time sample 0 or 1
    fn triangle(&self, group: usize, prim: usize, sample: usize) -> [Vec3f; 3];

    /// Bounds covering the triangle over both time samples
    fn prim_bounds(&self, group: usize, prim: usize) -> Bounds3f {
        let mut bounds = Bounds3f::EMPTY;
        for sample in 0..2 {
            for v in self.triangle(group, prim, sample) {
                bounds = bounds.union_point(v);
            }
        }
        bounds
    }

    /// Total triangle count over all enabled groups
    fn total_prims(&self) -> usize {
        (0..self.group_count())
            .filter(|&g| self.enabled(g))
            .map(|g| self.prim_count(g))
            .sum()
    }

    /// Largest per-group triangle count over all enabled groups
    fn max_group_prims(&self) -> usize {
        (0..self.group_count())
            .filter(|&g| self.enabled(g))
            .map(|g| self.prim_count(g))
            .max()
            .unwrap_or(0)
    }
}

/// Indexed triangle mesh with an optional second vertex time sample
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3f>,
    /// Vertex positions at time 1; empty for static meshes
    pub vertices_t1: Vec<Vec3f>,
    pub indices: Vec<[u32; 3]>,
    pub enabled: bool,
}

impl TriangleMesh {
    /// Create a static mesh from vertex and index buffers
    pub fn new(vertices: Vec<Vec3f>, indices: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            vertices_t1: Vec::new(),
            indices,
            enabled: true,
        }
    }

    /// Create a mesh whose vertices move linearly between two time samples
    pub fn with_motion(vertices: Vec<Vec3f>, vertices_t1: Vec<Vec3f>, indices: Vec<[u32; 3]>) -> Self {
        debug_assert_eq!(vertices.len(), vertices_t1.len());
        Self {
            vertices,
            vertices_t1,
            indices,
            enabled: true,
        }
    }

    fn positions(&self, sample: usize) -> &[Vec3f] {
        if sample == 0 || self.vertices_t1.is_empty() {
            &self.vertices
        } else {
            &self.vertices_t1
        }
    }
}

impl TriangleSource for TriangleMesh {
    fn group_count(&self) -> usize {
        1
    }

    fn prim_count(&self, _group: usize) -> usize {
        self.indices.len()
    }

    fn enabled(&self, _group: usize) -> bool {
        self.enabled
    }

    fn triangle(&self, _group: usize, prim: usize, sample: usize) -> [Vec3f; 3] {
        let [a, b, c] = self.indices[prim];
        let positions = self.positions(sample);
        [
            positions[a as usize],
            positions[b as usize],
            positions[c as usize],
        ]
    }
}

impl TriangleSource for Vec<TriangleMesh> {
    fn group_count(&self) -> usize {
        self.len()
    }

    fn prim_count(&self, group: usize) -> usize {
        self[group].indices.len()
    }

    fn enabled(&self, group: usize) -> bool {
        self[group].enabled
    }

    fn triangle(&self, group: usize, prim: usize, sample: usize) -> [Vec3f; 3] {
        self[group].triangle(0, prim, sample)
    }
}
