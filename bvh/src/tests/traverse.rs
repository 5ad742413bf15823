use geometry::Vec3f;
use simd::SimdBool;

use crate::tests::{grid_mesh, ray_down, translate};
use crate::traverse::{chunk, hybrid, motion, single};
use crate::{
    build_morton, build_sah, build_sah_mb, motion_intersectors, triangle1v_intersectors,
    triangle4_intersectors, BuildConfig, Bvh4, Ray, RayPacket, Triangle1v, Triangle4,
    TriangleMesh, INVALID_ID, OCCLUDED_ID,
};

fn grid_bvh(n: usize) -> Bvh4<Triangle4> {
    build_sah(&grid_mesh(n), &BuildConfig::default()).unwrap()
}

/// Ray positions spread over the grid, the last quarter missing it
fn test_rays<const N: usize>(n: usize) -> [Ray; N] {
    std::array::from_fn(|i| {
        if i % 4 == 3 {
            ray_down(-10.0 - i as f32, -10.0)
        } else {
            let x = (i as f32 * 2.63) % (n as f32 - 0.5) + 0.3;
            let y = (i as f32 * 1.37) % (n as f32 - 0.5) + 0.2;
            ray_down(x, y)
        }
    })
}

fn assert_packet_matches_single<const N: usize>(
    bvh: &Bvh4<Triangle4>,
    rays: &[Ray; N],
    packet: &RayPacket<N>,
) {
    for i in 0..N {
        let mut reference = rays[i];
        single::intersect(bvh, &mut reference);
        assert_eq!(packet.geom_id[i], reference.geom_id, "lane {i}");
        assert_eq!(packet.prim_id[i], reference.prim_id, "lane {i}");
        if reference.is_hit() {
            assert!((packet.tfar[i] - reference.tfar).abs() < 1e-5, "lane {i}");
        }
    }
}

#[test]
fn single_ray_hit_reports_position_and_normal() {
    let bvh = grid_bvh(4);
    let mut ray = ray_down(1.3, 2.2);
    single::intersect(&bvh, &mut ray);

    assert!(ray.is_hit());
    assert!((ray.tfar - 1.0).abs() < 1e-5);
    assert!(ray.u >= 0.0 && ray.v >= 0.0 && ray.u + ray.v <= 1.0 + 1e-5);
    // Grid lies in the z = 0 plane, the normal must be axial
    assert!(ray.ng.z.abs() > 0.0);
    assert_eq!(ray.ng.x, 0.0);
    assert_eq!(ray.ng.y, 0.0);
}

#[test]
fn single_ray_miss_leaves_hit_state() {
    let bvh = grid_bvh(4);
    let mut ray = ray_down(-5.0, -5.0);
    single::intersect(&bvh, &mut ray);
    assert_eq!(ray.geom_id, INVALID_ID);
    assert_eq!(ray.prim_id, INVALID_ID);
}

#[test]
fn ray_segment_limits_hits() {
    let bvh = grid_bvh(4);
    let mut short = Ray::segment(Vec3f::new(1.3, 1.3, 1.0), Vec3f::new(0.0, 0.0, -1.0), 0.0, 0.5);
    single::intersect(&bvh, &mut short);
    assert!(!short.is_hit());
    assert!(!single::occluded(&bvh, &short));

    let mut past = Ray::segment(Vec3f::new(1.3, 1.3, 1.0), Vec3f::new(0.0, 0.0, -1.0), 1.5, 3.0);
    single::intersect(&bvh, &mut past);
    assert!(!past.is_hit());
}

#[test]
fn spaced_triangles_hit_only_under_the_ray() {
    // Three unit triangles far apart along x
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for x in [0.0f32, 100.0, 200.0] {
        let base = vertices.len() as u32;
        vertices.push(Vec3f::new(x, 0.0, 0.0));
        vertices.push(Vec3f::new(x + 1.0, 0.0, 0.0));
        vertices.push(Vec3f::new(x, 1.0, 0.0));
        indices.push([base, base + 1, base + 2]);
    }
    let mesh = TriangleMesh::new(vertices, indices);

    let sah: Bvh4<Triangle4> = build_sah(&mesh, &BuildConfig::default()).unwrap();
    let morton: Bvh4<Triangle4> = build_morton(&mesh, &BuildConfig::default()).unwrap();
    for bvh in [&sah, &morton] {
        let mut hit = ray_down(100.25, 0.25);
        single::intersect(bvh, &mut hit);
        assert!(hit.is_hit());
        assert_eq!(hit.prim_id, 1);
        assert!((hit.tfar - 1.0).abs() < 1e-5);

        let mut between = ray_down(50.0, 0.5);
        single::intersect(bvh, &mut between);
        assert!(!between.is_hit());
        assert!(!single::occluded(bvh, &between));
    }
}

#[test]
fn moeller_and_pluecker_agree() {
    let mesh = grid_mesh(8);
    let moeller: Bvh4<Triangle4> = build_sah(&mesh, &BuildConfig::default()).unwrap();
    let pluecker: Bvh4<Triangle1v> = build_sah(&mesh, &BuildConfig::default()).unwrap();

    for ray in test_rays::<16>(8) {
        let mut a = ray;
        let mut b = ray;
        single::intersect(&moeller, &mut a);
        single::intersect(&pluecker, &mut b);
        assert_eq!(a.geom_id, b.geom_id);
        assert_eq!(a.prim_id, b.prim_id);
        if a.is_hit() {
            assert!((a.tfar - b.tfar).abs() < 1e-5);
        }
    }
}

#[test]
fn chunk_packets_match_single_rays() {
    let bvh = grid_bvh(16);

    let rays4 = test_rays::<4>(16);
    let mut packet4 = RayPacket::from_rays(&rays4);
    chunk::intersect_packet(SimdBool::ALL, &bvh, &mut packet4);
    assert_packet_matches_single(&bvh, &rays4, &packet4);

    let rays8 = test_rays::<8>(16);
    let mut packet8 = RayPacket::from_rays(&rays8);
    chunk::intersect_packet(SimdBool::ALL, &bvh, &mut packet8);
    assert_packet_matches_single(&bvh, &rays8, &packet8);

    let rays16 = test_rays::<16>(16);
    let mut packet16 = RayPacket::from_rays(&rays16);
    chunk::intersect_packet(SimdBool::ALL, &bvh, &mut packet16);
    assert_packet_matches_single(&bvh, &rays16, &packet16);
}

#[test]
fn hybrid_packets_match_single_rays() {
    let bvh = grid_bvh(16);

    let rays8 = test_rays::<8>(16);
    let mut packet8 = RayPacket::from_rays(&rays8);
    hybrid::intersect_packet(SimdBool::ALL, &bvh, &mut packet8);
    assert_packet_matches_single(&bvh, &rays8, &packet8);

    let rays16 = test_rays::<16>(16);
    let mut packet16 = RayPacket::from_rays(&rays16);
    hybrid::intersect_packet(SimdBool::ALL, &bvh, &mut packet16);
    assert_packet_matches_single(&bvh, &rays16, &packet16);
}

#[test]
fn divergent_packet_hits_both_clusters() {
    // Two groups far apart force the hybrid kernel into its single-ray path
    let scene = vec![grid_mesh(4), translate(grid_mesh(4), Vec3f::new(500.0, 0.0, 0.0))];
    let bvh: Bvh4<Triangle4> = build_sah(&scene, &BuildConfig::default()).unwrap();

    let rays = [
        ray_down(0.3, 0.3),
        ray_down(1.3, 2.3),
        ray_down(3.3, 3.3),
        ray_down(501.3, 1.3),
    ];
    let kernels: [fn(SimdBool<4>, &Bvh4<Triangle4>, &mut RayPacket<4>); 2] =
        [chunk::intersect_packet, hybrid::intersect_packet];
    for kernel in kernels {
        let mut packet = RayPacket::from_rays(&rays);
        kernel(SimdBool::ALL, &bvh, &mut packet);
        assert_packet_matches_single(&bvh, &rays, &packet);
        assert_eq!(packet.geom_id[0], 0);
        assert_eq!(packet.geom_id[3], 1);
    }
}

#[test]
fn invalid_lanes_stay_untouched() {
    let bvh = grid_bvh(8);
    let rays = test_rays::<4>(8);
    let valid = SimdBool([true, false, true, false]);

    let mut packet = RayPacket::from_rays(&rays);
    chunk::intersect_packet(valid, &bvh, &mut packet);
    assert_eq!(packet.geom_id[1], INVALID_ID);
    assert_eq!(packet.tfar[1], rays[1].tfar);
}

#[test]
fn occlusion_matches_intersection() {
    let bvh = grid_bvh(8);
    for ray in test_rays::<16>(8) {
        let mut hit = ray;
        single::intersect(&bvh, &mut hit);
        assert_eq!(single::occluded(&bvh, &ray), hit.is_hit());
    }
}

#[test]
fn occlusion_packets_mark_occluded_lanes() {
    let bvh = grid_bvh(8);
    // Lane 2 misses, lane 3 is excluded from the query but would hit
    let rays = [
        ray_down(0.4, 0.4),
        ray_down(3.4, 3.4),
        ray_down(-5.0, -5.0),
        ray_down(1.4, 1.4),
    ];
    let valid = SimdBool([true, true, true, false]);

    let kernels: [fn(SimdBool<4>, &Bvh4<Triangle4>, &mut RayPacket<4>); 2] =
        [chunk::occluded_packet, hybrid::occluded_packet];
    for kernel in kernels {
        let mut packet = RayPacket::from_rays(&rays);
        kernel(valid, &bvh, &mut packet);
        assert_eq!(packet.geom_id[0], OCCLUDED_ID);
        assert_eq!(packet.geom_id[1], OCCLUDED_ID);
        assert_eq!(packet.geom_id[2], INVALID_ID);
        assert_eq!(packet.geom_id[3], INVALID_ID);
    }
}

fn motion_scene() -> crate::Bvh4MB {
    // One large triangle moving ten units along x between the time samples
    let t0 = vec![
        Vec3f::new(0.0, 0.0, 0.0),
        Vec3f::new(4.0, 0.0, 0.0),
        Vec3f::new(0.0, 4.0, 0.0),
    ];
    let t1 = t0.iter().map(|v| *v + Vec3f::new(10.0, 0.0, 0.0)).collect();
    let mesh = TriangleMesh::with_motion(t0, t1, vec![[0, 1, 2]]);
    build_sah_mb(&mesh, &BuildConfig::default()).unwrap()
}

#[test]
fn motion_single_ray_follows_the_triangle() {
    let bvh = motion_scene();

    let mut at_start = ray_down(1.0, 1.0).at_time(0.0);
    motion::intersect(&bvh, &mut at_start);
    assert!(at_start.is_hit());
    assert!((at_start.tfar - 1.0).abs() < 1e-5);

    let mut stale = ray_down(1.0, 1.0).at_time(1.0);
    motion::intersect(&bvh, &mut stale);
    assert!(!stale.is_hit());

    let mut halfway = ray_down(6.0, 1.0).at_time(0.5);
    motion::intersect(&bvh, &mut halfway);
    assert!(halfway.is_hit());

    assert!(motion::occluded(&bvh, &ray_down(11.0, 1.0).at_time(1.0)));
    assert!(!motion::occluded(&bvh, &ray_down(11.0, 1.0).at_time(0.0)));
}

#[test]
fn motion_packets_interpolate_per_lane() {
    let bvh = motion_scene();
    let rays = [
        ray_down(1.0, 1.0).at_time(0.0),
        ray_down(1.0, 1.0).at_time(1.0),
        ray_down(11.0, 1.0).at_time(1.0),
        ray_down(6.0, 1.0).at_time(0.5),
    ];

    let kernels: [fn(SimdBool<4>, &crate::Bvh4MB, &mut RayPacket<4>); 2] =
        [motion::intersect_packet, motion::intersect_packet_hybrid];
    for kernel in kernels {
        let mut packet = RayPacket::from_rays(&rays);
        kernel(SimdBool::ALL, &bvh, &mut packet);
        assert!(packet.geom_id[0] != INVALID_ID);
        assert_eq!(packet.geom_id[1], INVALID_ID);
        assert!(packet.geom_id[2] != INVALID_ID);
        assert!(packet.geom_id[3] != INVALID_ID);
    }

    let mut packet = RayPacket::from_rays(&rays);
    motion::occluded_packet(SimdBool::ALL, &bvh, &mut packet);
    assert_eq!(packet.geom_id[0], OCCLUDED_ID);
    assert_eq!(packet.geom_id[1], INVALID_ID);
    assert_eq!(packet.geom_id[2], OCCLUDED_ID);
}

#[test]
fn registry_resolves_known_names() {
    assert!(triangle4_intersectors("bvh4.triangle4.single.moeller").is_some());
    assert!(triangle4_intersectors("bvh4.triangle4.chunk.moeller").is_some());
    assert!(triangle4_intersectors("bvh4.triangle4.hybrid.moeller").is_some());
    assert!(triangle1v_intersectors("bvh4.triangle1v.hybrid.pluecker").is_some());
    assert!(motion_intersectors("bvh4mb.triangle1vmb.chunk.moeller").is_some());

    assert!(triangle4_intersectors("bvh4.triangle4.hybrid.pluecker").is_none());
    assert!(triangle4_intersectors("bvh8.triangle4.hybrid.moeller").is_none());
}

#[test]
fn registry_entries_traverse() {
    let bvh = grid_bvh(8);
    let table = triangle4_intersectors("bvh4.triangle4.hybrid.moeller").unwrap();

    let mut ray = ray_down(2.3, 3.4);
    (table.intersect1)(&bvh, &mut ray);
    assert!(ray.is_hit());
    assert!((table.occluded1)(&bvh, &ray_down(2.3, 3.4)));

    let rays = test_rays::<8>(8);
    let mut packet = RayPacket::from_rays(&rays);
    (table.intersect8)(SimdBool::ALL, &bvh, &mut packet);
    assert_packet_matches_single(&bvh, &rays, &packet);
}

#[test]
fn sanitize_repairs_malformed_rays() {
    let mut ray = Ray::segment(
        Vec3f::new(f32::NAN, 0.0, 1.0),
        Vec3f::new(0.0, 0.0, -1.0),
        -2.0,
        f32::INFINITY,
    );
    ray.sanitize();
    assert_eq!(ray.origin.x, 0.0);
    assert_eq!(ray.tnear, 0.0);
    assert!(ray.tfar.is_finite());
}
