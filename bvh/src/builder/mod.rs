//! Tree construction: the binned SAH builder for best tree quality and the
//! Morton code builder for fast rebuilds.

mod morton;
mod sah;

pub use morton::build_morton;
pub use sah::{build_sah, build_sah_mb};

/// Tunable construction parameters
#[derive(Debug, Clone, Copy)]
pub struct BuildConfig {
    /// Leaf size below which splitting never pays off
    pub min_leaf: usize,
    /// Largest leaf the SAH may choose; bigger sets are always split
    pub max_leaf: usize,
    /// Tree rotation rounds run after construction
    pub rotation_rounds: usize,
    /// Primitive count below which a subtree is built on one thread
    pub serial_threshold: usize,
    /// Primitive count from which a single split runs in parallel
    pub parallel_split_threshold: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            min_leaf: 4,
            max_leaf: 16,
            rotation_rounds: 5,
            serial_threshold: 4096,
            parallel_split_threshold: 256 * 1024,
        }
    }
}
