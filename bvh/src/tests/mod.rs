use geometry::Vec3f;

use crate::{Ray, TriangleMesh};

mod binning;
mod build;
mod traverse;

/// Regular grid of quads in the z = 0 plane, two triangles per cell
pub fn grid_mesh(n: usize) -> TriangleMesh {
    let stride = n + 1;
    let mut vertices = Vec::with_capacity(stride * stride);
    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Vec3f::new(i as f32, j as f32, 0.0));
        }
    }
    let mut indices = Vec::with_capacity(2 * n * n);
    for j in 0..n {
        for i in 0..n {
            let a = (j * stride + i) as u32;
            let b = a + 1;
            let c = a + stride as u32;
            let d = c + 1;
            indices.push([a, b, d]);
            indices.push([a, d, c]);
        }
    }
    TriangleMesh::new(vertices, indices)
}

/// Translate every vertex of a mesh
pub fn translate(mut mesh: TriangleMesh, offset: Vec3f) -> TriangleMesh {
    for v in &mut mesh.vertices {
        *v += offset;
    }
    for v in &mut mesh.vertices_t1 {
        *v += offset;
    }
    mesh
}

/// Ray pointing down the negative z axis from z = 1
pub fn ray_down(x: f32, y: f32) -> Ray {
    Ray::new(Vec3f::new(x, y, 1.0), Vec3f::new(0.0, 0.0, -1.0))
}
