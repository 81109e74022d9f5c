//! [`CellIter`]: the array iterator over a [`View`].
//!
//! The axes of the view are split into a *frame*, the outer axes, which the
//! traversal engine walks, and a *cell*, the inner axes, which are handed back
//! whole at each frame position. With cell rank 0 ([`Atom`]) the items are
//! element references; otherwise ([`Cells`]) they are sub-views.

use std::marker::{PhantomData};

use super::{Dim, DIM_ANY, Error, Result, Shape, View, ArrayIter, Flat};
use super::index::{inside, index_short};

/// Selects a [`CellIter`] that yields elements.
pub enum Atom {}

/// Selects a [`CellIter`] that yields cells of nonzero rank.
pub enum Cells {}

/// Iterates over the frame of a [`View`], yielding its cells.
///
/// `S` is the dope-vector type of the view, which supplies the static rank.
/// `K` is [`Atom`] or [`Cells`].
///
/// ```
/// use ravel::{View, ply};
/// let data = [1, 2, 3, 4, 5, 6];
/// let v: View<_> = View::row_major(&data, &[2, 3]).unwrap();
/// let mut sums = Vec::new();
/// ply(v.iter_cells(-1).unwrap(), |row| sums.push(row.to_vec().unwrap().iter().sum::<i32>())).unwrap();
/// assert_eq!(sums, [6, 15]);
/// ```
pub struct CellIter<'a, 'v, T, S, K> {
    frame: &'v [Dim],
    origin: *const T,
    cell: View<'a, T, &'v [Dim]>,
    marker: PhantomData<fn() -> (S, K)>,
}

impl<'a, 'v, T, S: Shape, K> CellIter<'a, 'v, T, S, K> {
    /// Split `dims` after `frame_rank` axes.
    ///
    /// # Safety
    ///
    /// `ptr` and `dims` must describe a valid view.
    pub(crate) unsafe fn new(ptr: *const T, dims: &'v [Dim], frame_rank: usize) -> Self {
        let (frame, cell) = dims.split_at(frame_rank);
        Self {frame, origin: ptr, cell: View::from_raw_parts(ptr, cell), marker: PhantomData}
    }

    /// The frame axes.
    pub fn frame(&self) -> &'v [Dim] { self.frame }

    /// The axes of each cell.
    pub fn cell_dims(&self) -> &'v [Dim] { self.cell.dims }

    /// The offset of the cell at frame index `index`, which must have at
    /// least as many entries as there are frame axes. Entries beyond the
    /// frame are ignored.
    fn cell_offset(&self, index: &[isize]) -> Result<isize> {
        if index.len() < self.frame.len() {
            return Err(Error::RankMismatch {expected: self.frame.len(), got: index.len()});
        }
        for (axis, (dim, &i)) in self.frame.iter().zip(index).enumerate() {
            if !(inside(i, dim.size) || dim.is_inserted()) {
                return Err(Error::OutOfBounds {axis, index: i, size: dim.size});
            }
        }
        Ok(index_short(self.frame.len(), self.frame, index))
    }

    #[inline(always)]
    fn frame_size(&self, k: usize) -> isize {
        self.frame.get(k).map_or(DIM_ANY, |dim| dim.size)
    }

    #[inline(always)]
    fn frame_stride(&self, k: usize) -> isize {
        self.frame.get(k).map_or(0, |dim| dim.stride)
    }
}

impl<'a, 'v, T, S: Shape> CellIter<'a, 'v, T, S, Atom> {
    /// The element at frame index `index`, measured from the origin of the
    /// view regardless of how far the iterator has advanced.
    pub fn at(&self, index: &[isize]) -> Result<&'a T> {
        let offset = self.cell_offset(index)?;
        // SAFETY: The index was checked against the frame.
        Ok(unsafe { &*self.origin.wrapping_offset(offset) })
    }
}

impl<'a, 'v, T, S: Shape> CellIter<'a, 'v, T, S, Cells> {
    /// The cell at frame index `index`, measured from the origin of the view
    /// regardless of how far the iterator has advanced.
    pub fn at(&self, index: &[isize]) -> Result<View<'a, T, &'v [Dim]>> {
        let offset = self.cell_offset(index)?;
        // SAFETY: The index was checked against the frame.
        Ok(unsafe { View::from_raw_parts(self.origin.wrapping_offset(offset), self.cell.dims) })
    }
}

// ----------------------------------------------------------------------------

/// The cursor of a [`CellIter`] with cell rank 0.
pub struct Ptr<'a, T> {
    ptr: *const T,
    marker: PhantomData<&'a T>,
}

impl<'a, T> Flat for Ptr<'a, T> {
    type Stride = isize;
    type Item = &'a T;
    #[inline(always)]
    fn step(&mut self, s: isize) { self.ptr = self.ptr.wrapping_offset(s); }
    #[inline(always)]
    unsafe fn get(&mut self) -> &'a T { &*self.ptr }
}

// SAFETY: The view was valid, and every position inside the frame is an
// element of it.
unsafe impl<'a, 'v, T, S: Shape> ArrayIter for CellIter<'a, 'v, T, S, Atom> {
    type Stride = isize;
    type Flat = Ptr<'a, T>;
    const RANK_S: Option<usize> = S::RANK;
    const SIZE_S: isize = if matches!(S::RANK, Some(0)) { 1 } else { DIM_ANY };

    fn rank(&self) -> usize { self.frame.len() }
    fn size(&self, k: usize) -> isize { self.frame_size(k) }
    fn stride(&self, k: usize) -> isize { self.frame_stride(k) }
    fn keep_stride(&self, step: isize, z: usize, j: usize) -> bool {
        step * self.frame_stride(z) == self.frame_stride(j)
    }
    unsafe fn adv(&mut self, k: usize, d: isize) {
        self.cell.ptr = self.cell.ptr.wrapping_offset(self.frame_stride(k) * d);
    }
    fn flat(&self) -> Ptr<'a, T> { Ptr {ptr: self.cell.ptr, marker: PhantomData} }
}

/// The cursor of a [`CellIter`] with nonzero cell rank.
pub struct CellFlat<'a, 'v, T> {
    cell: View<'a, T, &'v [Dim]>,
}

impl<'a, 'v, T> Flat for CellFlat<'a, 'v, T> {
    type Stride = isize;
    type Item = View<'a, T, &'v [Dim]>;
    #[inline(always)]
    fn step(&mut self, s: isize) { self.cell.ptr = self.cell.ptr.wrapping_offset(s); }
    #[inline(always)]
    unsafe fn get(&mut self) -> View<'a, T, &'v [Dim]> { self.cell }
}

// SAFETY: As for `Atom`; each position is the origin of a cell inside the
// view.
unsafe impl<'a, 'v, T, S: Shape> ArrayIter for CellIter<'a, 'v, T, S, Cells> {
    type Stride = isize;
    type Flat = CellFlat<'a, 'v, T>;

    fn rank(&self) -> usize { self.frame.len() }
    fn size(&self, k: usize) -> isize { self.frame_size(k) }
    fn stride(&self, k: usize) -> isize { self.frame_stride(k) }
    fn keep_stride(&self, step: isize, z: usize, j: usize) -> bool {
        step * self.frame_stride(z) == self.frame_stride(j)
    }
    unsafe fn adv(&mut self, k: usize, d: isize) {
        self.cell.ptr = self.cell.ptr.wrapping_offset(self.frame_stride(k) * d);
    }
    fn flat(&self) -> CellFlat<'a, 'v, T> { CellFlat {cell: self.cell} }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::{ply, ply_ravel};

    #[test]
    fn neutral_beyond_frame() {
        let data = [0; 6];
        let v: View<_> = View::row_major(&data, &[2, 3]).unwrap();
        let it = v.iter_cells(1).unwrap();
        assert_eq!(it.rank(), 1);
        assert_eq!(it.size(0), 2);
        assert_eq!(it.stride(0), 3);
        assert_eq!(it.size(1), DIM_ANY);
        assert_eq!(it.stride(1), 0);
        assert_eq!(it.cell_dims(), [Dim::new(3, 1)]);
    }

    #[test]
    fn negative_cell_rank() {
        let data: Vec<i32> = (0..24).collect();
        let v: View<_> = View::row_major(&data, &[2, 3, 4]).unwrap();
        // A cell rank of `-n` means cells of rank `3 - n`.
        assert_eq!(v.iter_cells(-1).unwrap().frame().len(), 1);
        assert_eq!(v.iter_cells(-1).unwrap().cell_dims(), [Dim::new(3, 4), Dim::new(4, 1)]);
        assert_eq!(v.iter_cells(1).unwrap().frame().len(), 2);
        assert_eq!(v.iter_cells(-3).unwrap().frame().len(), 3);
        assert_eq!(v.iter_cells(0).unwrap().frame().len(), 3);
        assert_eq!(v.iter_cells(4).err(), Some(Error::BadCellRank {cell_rank: 4, rank: 3}));
        assert_eq!(v.iter_cells(-4).err(), Some(Error::BadCellRank {cell_rank: -4, rank: 3}));
        assert_eq!(v.iter_cells(isize::MIN).err(), Some(Error::BadCellRank {cell_rank: isize::MIN, rank: 3}));
    }

    #[test]
    fn cells_are_views() {
        let data: Vec<i32> = (0..24).collect();
        let v: View<_> = View::row_major(&data, &[2, 3, 4]).unwrap();
        let mut firsts = Vec::new();
        ply(v.iter_cells(2).unwrap(), |cell| {
            assert_eq!(cell.dims(), [Dim::new(3, 4), Dim::new(4, 1)]);
            firsts.push(*cell.get(&[0, 0]).unwrap());
        }).unwrap();
        assert_eq!(firsts, [0, 12]);
    }

    #[test]
    fn at_from_origin() {
        let data: Vec<i32> = (0..6).collect();
        let v: View<_> = View::row_major(&data, &[2, 3]).unwrap();
        let mut it = v.iter();
        assert_eq!(it.at(&[1, 2]), Ok(&5));
        // SAFETY: Still inside the view, and `it` is not traversed.
        unsafe { it.adv(0, 1) };
        assert_eq!(it.at(&[1, 2]), Ok(&5));
        assert_eq!(it.at(&[1]), Err(Error::RankMismatch {expected: 2, got: 1}));
        assert_eq!(it.at(&[2, 0]), Err(Error::OutOfBounds {axis: 0, index: 2, size: 2}));
        let rows = v.iter_cells(1).unwrap();
        assert_eq!(rows.at(&[1]).unwrap().to_vec(), Ok(vec![3, 4, 5]));
    }

    #[test]
    fn adv_moves_the_cell() {
        let data: Vec<i32> = (0..6).collect();
        let v: View<_> = View::row_major(&data, &[2, 3]).unwrap();
        let mut it = v.iter_cells(1).unwrap();
        let mut seen = Vec::new();
        // SAFETY: The cursor is at row 1.
        let cell = unsafe {
            it.adv(0, 1);
            it.flat().get()
        };
        ply_ravel(cell.iter(), |&x| seen.push(x)).unwrap();
        assert_eq!(seen, [3, 4, 5]);
    }
}
