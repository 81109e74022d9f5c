//! Offsets from multi-indices, and [`Iota`].

use super::{Dim, DIM_ANY, Error, Result, ArrayIter, Flat};

/// Compute the offset of multi-index `index` in the dope vector `dims`.
///
/// `index` may be shorter than `dims`; the missing trailing indices are
/// taken to be zero. Every index is bounds-checked.
///
/// ```
/// use ravel::{Dim, index_p};
/// let dims = [Dim::new(3, 4), Dim::new(4, 1)];
/// assert_eq!(index_p(&dims, &[2, 1]), Ok(9));
/// assert_eq!(index_p(&dims, &[1]), Ok(4));
/// assert!(index_p(&dims, &[3, 0]).is_err());
/// ```
pub fn index_p(dims: &[Dim], index: &[isize]) -> Result<isize> {
    if index.len() > dims.len() {
        return Err(Error::TooManyIndices {got: index.len(), rank: dims.len()});
    }
    let mut c = 0;
    for (axis, (dim, &i)) in dims.iter().zip(index).enumerate() {
        if !inside(i, dim.size) { return Err(Error::OutOfBounds {axis, index: i, size: dim.size}); }
        c += dim.stride * i;
    }
    Ok(c)
}

/// Compute the offset of the first `frame_rank` indices of `index`.
///
/// This is the fast path taken once per cell, so bounds are only checked in
/// debug builds. Inserted axes (`{DIM_BAD, 0}`) accept any index and
/// contribute nothing. If `index` or `dims` is shorter than `frame_rank`,
/// the missing indices are taken to be zero.
///
/// ```
/// use ravel::{Dim, index_short};
/// let dims = [Dim::new(3, 4), Dim::new(4, 1)];
/// assert_eq!(index_short(1, &dims, &[2, 3]), 8);
/// assert_eq!(index_short(2, &dims, &[2]), 8);
/// ```
pub fn index_short(frame_rank: usize, dims: &[Dim], index: &[isize]) -> isize {
    let mut c = 0;
    for (dim, &i) in dims.iter().zip(index).take(frame_rank) {
        debug_assert!(inside(i, dim.size) || dim.is_inserted(), "index {} out of {}", i, dim);
        c += dim.stride * i;
    }
    c
}

/// `true` if `0 <= i < size`.
#[inline(always)]
pub(crate) fn inside(i: isize, size: isize) -> bool { 0 <= i && i < size }

// ----------------------------------------------------------------------------

/// An arithmetic sequence `start, start + step, ...` of `size` integers.
///
/// `Iota` is both a slice subscript (see [`Subscript::Iota`]) and a rank-1
/// [`ArrayIter`] that yields its values.
///
/// [`Subscript::Iota`]: super::Subscript::Iota
///
/// ```
/// use ravel::{Iota, ply};
/// let mut seen = Vec::new();
/// ply(Iota::new(4, 1, 2), |i| seen.push(i)).unwrap();
/// assert_eq!(seen, [1, 3, 5, 7]);
/// ```
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iota {
    pub start: isize,
    pub size: isize,
    pub step: isize,
}

impl Iota {
    pub const fn new(size: isize, start: isize, step: isize) -> Self { Self {start, size, step} }

    /// The last value, or `start` if `size` is zero.
    pub fn last(&self) -> isize { self.start + (self.size - 1).max(0) * self.step }
}

/// `Iota::new(size, start, 1)`.
pub const fn iota(size: isize, start: isize) -> Iota { Iota::new(size, start, 1) }

/// The cursor of an [`Iota`].
#[derive(Debug, Copy, Clone)]
pub struct IotaFlat {
    value: isize,
    step: isize,
}

impl Flat for IotaFlat {
    type Stride = isize;
    type Item = isize;
    #[inline(always)]
    fn step(&mut self, s: isize) { self.value += s * self.step; }
    #[inline(always)]
    unsafe fn get(&mut self) -> isize { self.value }
}

// SAFETY: Reads no memory.
unsafe impl ArrayIter for Iota {
    type Stride = isize;
    type Flat = IotaFlat;
    const RANK_S: Option<usize> = Some(1);

    fn rank(&self) -> usize { 1 }
    fn size(&self, k: usize) -> isize { if k == 0 { self.size } else { DIM_ANY } }
    fn stride(&self, k: usize) -> isize { if k == 0 { 1 } else { 0 } }
    fn keep_stride(&self, step: isize, z: usize, j: usize) -> bool { step * self.stride(z) == self.stride(j) }
    unsafe fn adv(&mut self, k: usize, d: isize) { self.start += self.stride(k) * d * self.step; }
    fn flat(&self) -> IotaFlat { IotaFlat {value: self.start, step: self.step} }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_indices() {
        let dims = [Dim::new(3, 1)];
        assert_eq!(index_p(&dims, &[0, 0]), Err(Error::TooManyIndices {got: 2, rank: 1}));
    }

    #[test]
    fn offset_is_dot_product() {
        let dims = [Dim::new(2, 12), Dim::new(3, -4), Dim::new(4, 1)];
        for i in 0..2 { for j in 0..3 { for k in 0..4 {
            assert_eq!(index_p(&dims, &[i, j, k]), Ok(12 * i - 4 * j + k));
        }}}
    }

    #[test]
    fn out_of_bounds_names_the_axis() {
        let dims = [Dim::new(2, 3), Dim::new(3, 1)];
        assert_eq!(index_p(&dims, &[1, -1]), Err(Error::OutOfBounds {axis: 1, index: -1, size: 3}));
    }

    #[test]
    fn short_skips_inserted() {
        let dims = [Dim::new(2, 5), Dim::inserted(), Dim::new(3, 1)];
        assert_eq!(index_short(2, &dims, &[1, 7, 2]), 5);
    }

    #[test]
    fn short_tolerates_short_index() {
        let dims = [Dim::new(2, 5), Dim::new(3, 1)];
        assert_eq!(index_short(2, &dims, &[1]), 5);
        assert_eq!(index_short(3, &dims, &[1, 2]), 7);
        assert_eq!(index_short(2, &dims, &[]), 0);
    }

    #[test]
    fn iota_last() {
        assert_eq!(Iota::new(4, 1, 2).last(), 7);
        assert_eq!(iota(0, 3).last(), 3);
    }
}
