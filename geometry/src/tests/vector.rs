use crate::Vec3f;

#[test]
fn arithmetic() {
    let a = Vec3f::new(1.0, 2.0, 3.0);
    let b = Vec3f::new(4.0, 5.0, 6.0);

    assert_eq!(a + b, Vec3f::new(5.0, 7.0, 9.0));
    assert_eq!(b - a, Vec3f::new(3.0, 3.0, 3.0));
    assert_eq!(a * 2.0, Vec3f::new(2.0, 4.0, 6.0));
    assert_eq!(2.0 * a, a * 2.0);
    assert_eq!(-a, Vec3f::new(-1.0, -2.0, -3.0));
    assert_eq!(b / 2.0, Vec3f::new(2.0, 2.5, 3.0));
}

#[test]
fn dot_and_cross() {
    let a = Vec3f::new(1.0, 0.0, 0.0);
    let b = Vec3f::new(0.0, 1.0, 0.0);

    assert_eq!(a.dot(b), 0.0);
    assert_eq!(a.cross(b), Vec3f::new(0.0, 0.0, 1.0));
    assert_eq!(b.cross(a), Vec3f::new(0.0, 0.0, -1.0));
}

#[test]
fn length_and_normalize() {
    let v = Vec3f::new(3.0, 4.0, 0.0);
    assert_eq!(v.length_squared(), 25.0);
    assert_eq!(v.length(), 5.0);

    let n = v.normalized();
    assert!((n.length() - 1.0).abs() < 1e-6);
}

#[test]
fn component_min_max() {
    let a = Vec3f::new(1.0, 5.0, -2.0);
    let b = Vec3f::new(2.0, 4.0, -3.0);

    assert_eq!(a.min(b), Vec3f::new(1.0, 4.0, -3.0));
    assert_eq!(a.max(b), Vec3f::new(2.0, 5.0, -2.0));
}

#[test]
fn max_dimension() {
    assert_eq!(Vec3f::new(3.0, 1.0, 2.0).max_dimension(), 0);
    assert_eq!(Vec3f::new(1.0, 3.0, 2.0).max_dimension(), 1);
    assert_eq!(Vec3f::new(1.0, 2.0, 3.0).max_dimension(), 2);
}

#[test]
fn lerp() {
    let a = Vec3f::new(0.0, 2.0, -4.0);
    let b = Vec3f::new(2.0, 4.0, 4.0);
    assert_eq!(a.lerp(b, 0.0), a);
    assert_eq!(a.lerp(b, 1.0), b);
    assert_eq!(a.lerp(b, 0.5), Vec3f::new(1.0, 3.0, 0.0));
}

#[test]
fn indexing() {
    let v = Vec3f::new(1.0, 2.0, 3.0);
    assert_eq!(v[0], 1.0);
    assert_eq!(v[1], 2.0);
    assert_eq!(v[2], 3.0);
}
