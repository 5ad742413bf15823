use crate::{Bounds3f, Vec3f};

#[test]
fn empty_is_union_identity() {
    let b = Bounds3f::new(Vec3f::new(-1.0, -2.0, -3.0), Vec3f::new(1.0, 2.0, 3.0));

    assert!(Bounds3f::EMPTY.is_empty());
    assert_eq!(Bounds3f::EMPTY.union_box(b), b);
    assert_eq!(b.union_box(Bounds3f::EMPTY), b);
    assert_eq!(Bounds3f::EMPTY.half_area(), 0.0);
}

#[test]
fn union_point() {
    let b = Bounds3f::at_point(Vec3f::ZERO);
    let b = b.union_point(Vec3f::new(1.0, 2.0, 3.0));
    let b = b.union_point(Vec3f::new(-1.0, 0.0, 0.0));

    assert_eq!(b.min, Vec3f::new(-1.0, 0.0, 0.0));
    assert_eq!(b.max, Vec3f::new(1.0, 2.0, 3.0));
}

#[test]
fn containment() {
    let outer = Bounds3f::new(Vec3f::ZERO, Vec3f::splat(4.0));
    let inner = Bounds3f::new(Vec3f::splat(1.0), Vec3f::splat(2.0));

    assert!(outer.contains_box(inner));
    assert!(!inner.contains_box(outer));
    assert!(outer.contains_box(Bounds3f::EMPTY));
    assert!(outer.contains_point(Vec3f::splat(4.0)));
    assert!(!outer.contains_point(Vec3f::splat(4.1)));
}

#[test]
fn half_area() {
    // 1 x 2 x 3 box has surface area 22
    let b = Bounds3f::new(Vec3f::ZERO, Vec3f::new(1.0, 2.0, 3.0));
    assert_eq!(b.half_area(), 11.0);
}

#[test]
fn maximum_extent() {
    let b = Bounds3f::new(Vec3f::ZERO, Vec3f::new(1.0, 3.0, 2.0));
    assert_eq!(b.maximum_extent(), 1);
}

#[test]
fn offset_normalizes_into_unit_cube() {
    let b = Bounds3f::new(Vec3f::ZERO, Vec3f::new(2.0, 4.0, 8.0));
    let o = b.offset(Vec3f::new(1.0, 1.0, 2.0));
    assert_eq!(o, Vec3f::new(0.5, 0.25, 0.25));
}

#[test]
fn lerp_between_time_bounds() {
    let b0 = Bounds3f::new(Vec3f::ZERO, Vec3f::splat(1.0));
    let b1 = Bounds3f::new(Vec3f::splat(2.0), Vec3f::splat(3.0));
    let mid = b0.lerp(b1, 0.5);

    assert_eq!(mid.min, Vec3f::splat(1.0));
    assert_eq!(mid.max, Vec3f::splat(2.0));
}
