use crate::{SimdBool, SimdF32, SimdU32, SimdVec3};

#[test]
fn float_min_max_select() {
    let a = SimdF32::from([1.0, 5.0, -2.0, 0.0]);
    let b = SimdF32::from([2.0, 4.0, -3.0, 0.0]);

    assert_eq!(a.min(b), SimdF32::from([1.0, 4.0, -3.0, 0.0]));
    assert_eq!(a.max(b), SimdF32::from([2.0, 5.0, -2.0, 0.0]));

    let mask = a.lt(b);
    assert_eq!(mask.movemask(), 0b0001);
    assert_eq!(SimdF32::select(mask, a, b), SimdF32::from([1.0, 4.0, -3.0, 0.0]));
}

#[test]
fn float_select_min_respects_valid_lanes() {
    let t = SimdF32::from([3.0, 1.0, 2.0, 0.5]);
    let valid = SimdBool([true, false, true, false]);
    assert_eq!(SimdF32::select_min(valid, t), 2);
    assert_eq!(SimdF32::select_min(SimdBool::ALL, t), 3);
}

#[test]
fn rcp_safe_handles_zero_direction() {
    let d = SimdF32::from([0.0, -0.0, 2.0, -4.0]);
    let r = d.rcp_safe();
    assert!(r[0].is_infinite() && r[0] > 0.0);
    assert!(r[1].is_infinite() && r[1] < 0.0);
    assert_eq!(r[2], 0.5);
    assert_eq!(r[3], -0.25);
}

#[test]
fn mask_movemask_roundtrip() {
    for bits in 0..16u32 {
        let mask: SimdBool<4> = SimdBool::from_bits(bits);
        assert_eq!(mask.movemask(), bits);
        assert_eq!(mask.count(), bits.count_ones() as usize);
    }
}

#[test]
fn mask_any_all_none() {
    let none: SimdBool<8> = SimdBool::NONE;
    let all: SimdBool<8> = SimdBool::ALL;
    assert!(none.none() && !none.any());
    assert!(all.all() && all.any());
    assert!((!all) == none);
}

#[test]
fn uint_select() {
    let a = SimdU32::from_fn(|i| i as u32);
    let b = SimdU32::<4>::splat(9);
    let mask = SimdBool([true, false, true, false]);
    assert_eq!(SimdU32::select(mask, a, b), SimdU32([0, 9, 2, 9]));
}

#[test]
fn vec3_cross_matches_scalar() {
    let a: SimdVec3<4> = SimdVec3::splat(1.0, 0.0, 0.0);
    let b = SimdVec3::splat(0.0, 1.0, 0.0);
    let c = a.cross(b);
    for i in 0..4 {
        assert_eq!(c.lane(i), [0.0, 0.0, 1.0]);
    }
}

#[test]
fn vec3_lerp_midpoint() {
    let a: SimdVec3<4> = SimdVec3::splat(0.0, 2.0, -4.0);
    let b = SimdVec3::splat(2.0, 4.0, 4.0);
    let mid = a.lerp(b, SimdF32::splat(0.5));
    for i in 0..4 {
        assert_eq!(mid.lane(i), [1.0, 3.0, 0.0]);
    }
}
