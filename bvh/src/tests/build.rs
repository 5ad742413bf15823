use geometry::Vec3f;

use crate::tests::{grid_mesh, ray_down, translate};
use crate::traverse::single;
use crate::{
    build_morton, build_sah, build_sah_mb, BuildConfig, Bvh4, NodeRef, Triangle1v, Triangle4,
    TriangleMesh, MAX_BUILD_DEPTH,
};

fn packed_triangles(bvh: &Bvh4<Triangle4>) -> usize {
    bvh.prims.iter().map(|block| block.size()).sum()
}

#[test]
fn empty_source_builds_empty_tree() {
    let mesh = TriangleMesh::new(Vec::new(), Vec::new());
    let bvh: Bvh4<Triangle4> = build_sah(&mesh, &BuildConfig::default()).unwrap();
    assert_eq!(bvh.root, NodeRef::Empty);

    let mut ray = ray_down(0.5, 0.5);
    single::intersect(&bvh, &mut ray);
    assert!(!ray.is_hit());
}

#[test]
fn disabled_groups_are_skipped() {
    let mut mesh = grid_mesh(4);
    mesh.enabled = false;
    let bvh: Bvh4<Triangle4> = build_sah(&mesh, &BuildConfig::default()).unwrap();
    assert_eq!(bvh.root, NodeRef::Empty);
}

#[test]
fn sah_build_is_valid_and_complete() {
    let mesh = grid_mesh(16);
    let bvh: Bvh4<Triangle4> = build_sah(&mesh, &BuildConfig::default()).unwrap();

    assert!(bvh.validate());
    assert!(bvh.depth() <= MAX_BUILD_DEPTH);
    assert_eq!(packed_triangles(&bvh), mesh.indices.len());
}

#[test]
fn morton_build_is_valid_and_complete() {
    let mesh = grid_mesh(16);
    let bvh: Bvh4<Triangle4> = build_morton(&mesh, &BuildConfig::default()).unwrap();

    assert!(bvh.validate());
    assert!(bvh.depth() <= MAX_BUILD_DEPTH);
    assert_eq!(packed_triangles(&bvh), mesh.indices.len());
}

#[test]
fn build_handles_multiple_groups() {
    let scene = vec![grid_mesh(4), translate(grid_mesh(4), Vec3f::new(100.0, 0.0, 0.0))];
    let bvh: Bvh4<Triangle4> = build_sah(&scene, &BuildConfig::default()).unwrap();

    assert!(bvh.validate());
    assert_eq!(packed_triangles(&bvh), 64);

    let mut ray = ray_down(102.5, 1.5);
    single::intersect(&bvh, &mut ray);
    assert!(ray.is_hit());
    assert_eq!(ray.geom_id, 1);
}

fn largest_leaf(bvh: &Bvh4<Triangle4>) -> usize {
    let mut refs = vec![bvh.root];
    for node in &bvh.nodes {
        refs.extend(node.children);
    }
    refs.into_iter()
        .filter_map(|r| match r {
            NodeRef::Leaf { start, count } => {
                Some(bvh.leaf(start, count).iter().map(|b| b.size()).sum())
            }
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

#[test]
fn tight_leaf_capacity_forces_splits() {
    let mesh = grid_mesh(6);
    let mut config = BuildConfig::default();
    config.max_leaf = 4;
    let bvh: Bvh4<Triangle4> = build_sah(&mesh, &config).unwrap();

    assert!(bvh.validate());
    assert_eq!(packed_triangles(&bvh), 72);
    assert!(largest_leaf(&bvh) <= 4);

    let mut ray = ray_down(3.3, 2.6);
    single::intersect(&bvh, &mut ray);
    assert!(ray.is_hit());
}

#[test]
fn morton_build_separates_clustered_primitives() {
    // The cluster occupies a single cell of the global code grid, so its
    // range is regraded on local bounds during the build
    let mut near = grid_mesh(4);
    for v in &mut near.vertices {
        *v = Vec3f::new(v.x * 1e-3, v.y * 1e-3, 0.0);
    }
    let far = translate(grid_mesh(4), Vec3f::new(1000.0, 0.0, 0.0));
    let scene = vec![near, far];

    let bvh: Bvh4<Triangle4> = build_morton(&scene, &BuildConfig::default()).unwrap();
    assert!(bvh.validate());
    assert!(bvh.depth() <= MAX_BUILD_DEPTH);
    assert_eq!(packed_triangles(&bvh), 64);

    let mut inside = ray_down(1.3e-3, 2.2e-3);
    single::intersect(&bvh, &mut inside);
    assert!(inside.is_hit());
    assert_eq!(inside.geom_id, 0);

    let mut beyond = ray_down(1001.3, 2.2);
    single::intersect(&bvh, &mut beyond);
    assert_eq!(beyond.geom_id, 1);
}

#[test]
fn rebuild_is_deterministic() {
    let mesh = grid_mesh(12);
    let config = BuildConfig::default();
    let a: Bvh4<Triangle4> = build_sah(&mesh, &config).unwrap();
    let b: Bvh4<Triangle4> = build_sah(&mesh, &config).unwrap();

    assert_eq!(a.root, b.root);
    assert_eq!(a.nodes.len(), b.nodes.len());
    assert_eq!(a.depth(), b.depth());
    assert_eq!(a.bounds, b.bounds);
}

#[test]
fn single_triangle_builds_one_leaf() {
    let mesh = TriangleMesh::new(
        vec![
            Vec3f::new(0.0, 0.0, 0.0),
            Vec3f::new(1.0, 0.0, 0.0),
            Vec3f::new(0.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2]],
    );
    let bvh: Bvh4<Triangle4> = build_sah(&mesh, &BuildConfig::default()).unwrap();

    assert!(matches!(bvh.root, NodeRef::Leaf { .. }));
    assert!(bvh.validate());

    let mut ray = ray_down(0.25, 0.25);
    single::intersect(&bvh, &mut ray);
    assert!(ray.is_hit());
    assert!((ray.tfar - 1.0).abs() < 1e-5);
}

#[test]
fn coincident_triangles_still_build() {
    // Identical centroids force the count median fallback
    let mesh = TriangleMesh::new(
        vec![
            Vec3f::new(0.0, 0.0, 0.0),
            Vec3f::new(1.0, 0.0, 0.0),
            Vec3f::new(0.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2]; 100],
    );
    let bvh: Bvh4<Triangle1v> = build_sah(&mesh, &BuildConfig::default()).unwrap();
    assert!(bvh.validate());
    assert_eq!(bvh.prims.len(), 100);
}

#[test]
fn rotations_preserve_validity_and_hits() {
    let mesh = grid_mesh(16);
    let mut config = BuildConfig::default();
    config.rotation_rounds = 0;
    let mut bvh: Bvh4<Triangle4> = build_sah(&mesh, &config).unwrap();

    let mut before = ray_down(7.3, 9.6);
    single::intersect(&bvh, &mut before);

    bvh.rotate(3);
    assert!(bvh.validate());

    let mut after = ray_down(7.3, 9.6);
    single::intersect(&bvh, &mut after);
    assert_eq!(before.prim_id, after.prim_id);
    assert!((before.tfar - after.tfar).abs() < 1e-6);
}

#[test]
fn motion_build_is_valid() {
    let t0 = grid_mesh(8);
    let t1 = translate(grid_mesh(8), Vec3f::new(2.0, 0.0, 0.0));
    let mesh = TriangleMesh::with_motion(t0.vertices, t1.vertices, t0.indices);

    let bvh = build_sah_mb(&mesh, &BuildConfig::default()).unwrap();
    assert!(bvh.validate());
    assert_eq!(bvh.prims.len(), 128);
}

#[test]
fn nan_triangles_are_dropped() {
    let mesh = TriangleMesh::new(
        vec![
            Vec3f::new(0.0, 0.0, 0.0),
            Vec3f::new(1.0, 0.0, 0.0),
            Vec3f::new(0.0, 1.0, 0.0),
            Vec3f::new(f32::NAN, 0.0, 0.0),
        ],
        vec![[0, 1, 2], [3, 1, 2]],
    );
    let bvh: Bvh4<Triangle4> = build_sah(&mesh, &BuildConfig::default()).unwrap();
    assert!(bvh.validate());
    assert_eq!(packed_triangles(&bvh), 1);
}
