/// The type of error for view construction, subscripting and traversal.
///
/// All errors are detected synchronously, before the offending element is
/// touched. Traversal is not transactional: elements visited before a
/// failure keep whatever was written to them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("index {index} out of bounds for axis {axis} of size {size}")]
    OutOfBounds { axis: usize, index: isize, size: isize },

    #[error("slice (start {start}, size {len}, step {step}) out of bounds for axis {axis} of size {size}")]
    SliceOutOfBounds { axis: usize, start: isize, len: isize, step: isize, size: isize },

    #[error("too many indices: {got} for rank {rank}")]
    TooManyIndices { got: usize, rank: usize },

    #[error("rank mismatch: expected {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    #[error("shape mismatch on axis {axis}: {left} vs {right}")]
    ShapeMismatch { axis: usize, left: isize, right: isize },

    #[error("cell rank {cell_rank} is invalid for rank {rank}")]
    BadCellRank { cell_rank: isize, rank: usize },

    #[error("undefined dimension on axis {axis}")]
    UndefinedDim { axis: usize },

    #[error("bad size {size} on axis {axis}")]
    BadSize { axis: usize, size: isize },

    #[error("shape overflows at axis {axis}")]
    Overflow { axis: usize },

    #[error("view reaches offset {offset} outside storage of length {len}")]
    OutOfStorage { offset: isize, len: usize },

    #[error("storage length {len} does not match shape size {size}")]
    StorageMismatch { len: usize, size: isize },

    #[error("subscript {position} cannot be resolved by dope-vector algebra")]
    NotBeatable { position: usize },

    #[error("cannot write through an inserted axis")]
    InsertOnWrite,
}

/// Shorthand for results of this crate.
pub type Result<T> = std::result::Result<T, Error>;
