//! Dope vectors: [`Dim`] and the storage types that hold a sequence of them.
//!
//! A dope vector is an ordered list of `(size, stride)` pairs describing how
//! to walk an array's memory without copying it. Strides are measured in
//! elements, not bytes, and may be zero or negative.
//!
//! Two storage forms exist, both implementing [`Shape`]:
//!
//! - `[Dim; R]`: the rank is fixed at compile time.
//! - `Vec<Dim>`: the rank is decided at construction.
//!
//! Borrowed dope vectors (`&[Dim]`) also implement `Shape`; they are what
//! cells and prefix-indexed sub-views carry.

use smallvec::{SmallVec};

use super::{Error, Result};

/// Size of an axis whose size is not known until run time.
///
/// This is also the neutral size reported by an operand for axes beyond its
/// own rank, so that shorter operands broadcast against longer ones.
pub const DIM_ANY: isize = -1099999444;

/// Size of an axis that was deliberately left undefined, e.g. by
/// [`Subscript::Insert`]. Traversing such an axis fails.
///
/// [`Subscript::Insert`]: super::Subscript::Insert
pub const DIM_BAD: isize = -1099999888;

/// Dope vectors up to this rank are kept inline, without allocating.
pub const INLINE_RANK: usize = 8;

/// An inline dope vector, as produced by subscript selection.
pub type DimBuf = SmallVec<[Dim; INLINE_RANK]>;

/// One dimension of a dope vector.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dim {
    pub size: isize,
    pub stride: isize,
}

impl Dim {
    pub const fn new(size: isize, stride: isize) -> Self { Self {size, stride} }

    /// The placeholder emitted by an insert subscript.
    pub const fn inserted() -> Self { Self {size: DIM_BAD, stride: 0} }

    /// `true` if this is the placeholder emitted by an insert subscript.
    pub fn is_inserted(&self) -> bool { self.size == DIM_BAD && self.stride == 0 }
}

impl std::fmt::Display for Dim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Dim {} {}]", self.size, self.stride)
    }
}

// ----------------------------------------------------------------------------

/// Read access to a dope vector.
pub trait Shape {
    /// The rank, if it is known at compile time.
    const RANK: Option<usize>;

    /// The dope vector.
    fn dims(&self) -> &[Dim];

    /// The number of axes.
    fn rank(&self) -> usize { self.dims().len() }
}

impl<const R: usize> Shape for [Dim; R] {
    const RANK: Option<usize> = Some(R);
    #[inline(always)]
    fn dims(&self) -> &[Dim] { self }
}

impl Shape for Vec<Dim> {
    const RANK: Option<usize> = None;
    #[inline(always)]
    fn dims(&self) -> &[Dim] { self }
}

impl<'v> Shape for &'v [Dim] {
    const RANK: Option<usize> = None;
    #[inline(always)]
    fn dims(&self) -> &[Dim] { self }
}

/// An owned dope vector.
///
/// `[Dim; R]` gives a view of fixed rank and `Vec<Dim>` a view of run-time
/// rank. Both satisfy the same contract; a `View` is generic over the choice.
pub trait Dims: Shape + Clone {
    fn dims_mut(&mut self) -> &mut [Dim];

    /// Copy `dims` into a new `Self`.
    ///
    /// Fails if `Self` has a fixed rank different from `dims.len()`.
    fn from_dims(dims: &[Dim]) -> Result<Self>;
}

impl<const R: usize> Dims for [Dim; R] {
    fn dims_mut(&mut self) -> &mut [Dim] { self }

    fn from_dims(dims: &[Dim]) -> Result<Self> {
        <[Dim; R]>::try_from(dims).map_err(|_| Error::RankMismatch {expected: R, got: dims.len()})
    }
}

impl Dims for Vec<Dim> {
    fn dims_mut(&mut self) -> &mut [Dim] { self }
    fn from_dims(dims: &[Dim]) -> Result<Self> { Ok(dims.to_vec()) }
}

// ----------------------------------------------------------------------------

/// Assign row-major ("C" order) strides to `dims`, whose sizes must already
/// be set. The last axis gets stride 1.
///
/// Returns the total number of elements.
///
/// ```
/// use ravel::{Dim, filldim};
/// let mut dims = [Dim::new(3, 0), Dim::new(4, 0)];
/// assert_eq!(filldim(&mut dims), Ok(12));
/// assert_eq!(dims, [Dim::new(3, 4), Dim::new(4, 1)]);
/// ```
pub fn filldim(dims: &mut [Dim]) -> Result<isize> {
    let mut next = 1;
    for (axis, dim) in dims.iter_mut().enumerate().rev() {
        if dim.size < 0 { return Err(Error::BadSize {axis, size: dim.size}); }
        dim.stride = next;
        next = next.checked_mul(dim.size).ok_or(Error::Overflow {axis})?;
    }
    Ok(next)
}

/// The product of the sizes in `dims`, saturating instead of overflowing.
///
/// Only views with zero strides can be that large.
pub fn proddim(dims: &[Dim]) -> isize {
    dims.iter().fold(1, |p: isize, dim| p.saturating_mul(dim.size))
}

/// Build a row-major dope vector from a list of sizes.
///
/// ```
/// use ravel::{Dim, row_major};
/// let dims: Vec<Dim> = row_major(&[2, 3, 4]).unwrap();
/// assert_eq!(dims, [Dim::new(2, 12), Dim::new(3, 4), Dim::new(4, 1)]);
/// ```
pub fn row_major<D: Dims>(sizes: &[isize]) -> Result<D> {
    let mut dims: DimBuf = sizes.iter().map(|&size| Dim::new(size, 0)).collect();
    filldim(&mut dims)?;
    D::from_dims(&dims)
}

/// `true` if `dims` describes a dense row-major layout.
///
/// Axes outside an empty axis are not inspected.
pub fn is_c_order(dims: &[Dim]) -> bool {
    let mut s = Some(1);
    for dim in dims.iter().rev() {
        if s != Some(dim.stride) { return false; }
        s = dim.stride.checked_mul(dim.size);
        if s == Some(0) { return true; }
    }
    true
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filldim_rejects_negative_sizes() {
        let mut dims = [Dim::new(2, 0), Dim::new(-1, 0)];
        assert_eq!(filldim(&mut dims), Err(Error::BadSize {axis: 1, size: -1}));
    }

    #[test]
    fn overflow_is_an_error() {
        assert_eq!(row_major::<Vec<Dim>>(&[isize::MAX, 4]), Err(Error::Overflow {axis: 0}));
        assert_eq!(row_major::<[Dim; 3]>(&[2, 1 << 40, 1 << 40]), Err(Error::Overflow {axis: 1}));
        assert!(row_major::<Vec<Dim>>(&[isize::MAX, 1]).is_ok());
        // Empty, so nothing overflows.
        assert!(row_major::<Vec<Dim>>(&[isize::MAX, 4, 0]).is_ok());
        assert_eq!(proddim(&[Dim::new(isize::MAX, 0), Dim::new(4, 0)]), isize::MAX);
        assert!(!is_c_order(&[Dim::new(2, 5), Dim::new(3, isize::MAX), Dim::new(isize::MAX, 1)]));
    }

    #[test]
    fn filldim_empty() {
        let mut dims: [Dim; 0] = [];
        assert_eq!(filldim(&mut dims), Ok(1));
    }

    #[test]
    fn fixed_rank_from_dims() {
        let dims = [Dim::new(2, 1)];
        assert_eq!(<[Dim; 1]>::from_dims(&dims), Ok(dims));
        assert_eq!(<[Dim; 2]>::from_dims(&dims), Err(Error::RankMismatch {expected: 2, got: 1}));
        assert_eq!(<[Dim; 2]>::RANK, Some(2));
        assert_eq!(<Vec<Dim>>::RANK, None);
    }

    #[test]
    fn c_order() {
        let dims: [Dim; 2] = row_major(&[3, 4]).unwrap();
        assert!(is_c_order(&dims));
        assert!(!is_c_order(&[Dim::new(3, 1), Dim::new(4, 3)]));
        // Nothing past an empty axis matters.
        assert!(is_c_order(&[Dim::new(7, 99), Dim::new(0, 1)]));
        assert_eq!(proddim(&dims), 12);
    }

    #[test]
    fn display() {
        assert_eq!(Dim::new(3, -2).to_string(), "[Dim 3 -2]");
        assert!(Dim::inserted().is_inserted());
    }
}
