mod bounds3;
mod vector3;

#[cfg(test)]
mod tests;

pub use bounds3::Bounds3f;
pub use vector3::Vec3f;

/// Linear interpolation between two values
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
