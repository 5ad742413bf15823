use thiserror::Error;

/// Errors reported by the tree builders. Traversal never fails.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// Leaf creation could not reduce a primitive set below the depth limit,
    /// usually because the input contains a large number of identical
    /// primitives.
    #[error("tree construction did not converge within depth {depth}")]
    NonConvergence { depth: usize },

    /// The geometry has too many groups or too many primitives per group for
    /// both ids to be packed into a single 32 bit reference.
    #[error("{groups} groups with up to {prims} primitives cannot be encoded in 32 bits")]
    EncodingOverflow { groups: usize, prims: usize },
}
