use std::cell::{Cell};
use std::fmt::{Debug};
use std::marker::{PhantomData};

use super::{
    Dim, Shape, Dims, Error, Result, Subscript, Gather, CellIter, Atom, Cells, Elements,
    index_p, proddim, row_major, select_loop, ply,
};

/// Check that every offset reachable from `offset` through `dims` lies in
/// `0..len`.
fn check_storage(len: usize, offset: isize, dims: &[Dim]) -> Result<()> {
    for (axis, dim) in dims.iter().enumerate() {
        if dim.size < 0 { return Err(Error::BadSize {axis, size: dim.size}); }
    }
    if dims.iter().any(|dim| dim.size == 0) { return Ok(()); }
    let overflow = Error::OutOfStorage {offset: isize::MAX, len};
    let (mut lo, mut hi) = (offset, offset);
    for dim in dims {
        let reach = (dim.size - 1).checked_mul(dim.stride).ok_or(overflow.clone())?;
        if reach < 0 {
            lo = lo.checked_add(reach).ok_or(overflow.clone())?;
        } else {
            hi = hi.checked_add(reach).ok_or(overflow.clone())?;
        }
    }
    if lo < 0 { return Err(Error::OutOfStorage {offset: lo, len}); }
    if hi as usize >= len { return Err(Error::OutOfStorage {offset: hi, len}); }
    Ok(())
}

/// Resolve a possibly negative cell rank against `rank`. A negative cell
/// rank `-n` means cells of rank `rank - n`.
fn cell_rank(cell_rank: isize, rank: usize) -> Result<usize> {
    let r = if cell_rank < 0 { rank as isize + cell_rank } else { cell_rank };
    if 0 <= r && r <= rank as isize { Ok(r as usize) } else { Err(Error::BadCellRank {cell_rank, rank}) }
}

// ----------------------------------------------------------------------------

/// A read-only strided window onto a slice of `T`s.
///
/// A `View` is a dope vector `S` and a pointer. It never owns or copies its
/// data. `S` is `[Dim; R]` for a rank fixed at compile time, `Vec<Dim>` for a
/// rank chosen at run time, or `&[Dim]` for views borrowed from another view.
///
/// ```
/// use ravel::{Dim, View};
/// let data = [1, 2, 3, 4, 5, 6];
/// let v = View::new(&data, [Dim::new(3, 2), Dim::new(2, 1)]).unwrap();
/// assert_eq!(v.size(), 6);
/// assert_eq!(v.get(&[2, 0]), Ok(&5));
/// assert_eq!(v.to_vec(), Ok(vec![1, 2, 3, 4, 5, 6]));
/// ```
pub struct View<'a, T, S: Shape = Vec<Dim>> {
    pub(crate) dims: S,
    pub(crate) ptr: *const T,
    marker: PhantomData<&'a T>,
}

impl<'a, T, S: Shape + Clone> Clone for View<'a, T, S> {
    fn clone(&self) -> Self { Self {dims: self.dims.clone(), ptr: self.ptr, marker: PhantomData} }
}

impl<'a, T, S: Shape + Copy> Copy for View<'a, T, S> {}

// SAFETY: A `View` behaves like a `&'a [T]`.
unsafe impl<'a, T: Sync, S: Shape + Send> Send for View<'a, T, S> {}
unsafe impl<'a, T: Sync, S: Shape + Sync> Sync for View<'a, T, S> {}

impl<'a, T, S: Shape> Debug for View<'a, T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View").field("dims", &self.dims()).field("ptr", &self.ptr).finish()
    }
}

impl<'a, T, S: Shape> View<'a, T, S> {
    /// Wrap `data` with the dope vector `dims`, starting at `data[0]`.
    ///
    /// Fails if any element `dims` can reach lies outside `data`, or if any
    /// size is negative.
    pub fn new(data: &'a [T], dims: S) -> Result<Self> { Self::with_offset(data, 0, dims) }

    /// Wrap `data` with the dope vector `dims`, starting at `data[offset]`.
    ///
    /// Use this for negative strides, which walk backwards from `offset`.
    ///
    /// ```
    /// use ravel::{Dim, View};
    /// let data = [1, 2, 3];
    /// let rev = View::with_offset(&data, 2, [Dim::new(3, -1)]).unwrap();
    /// assert_eq!(rev.to_vec(), Ok(vec![3, 2, 1]));
    /// assert!(View::with_offset(&data, 1, [Dim::new(3, -1)]).is_err());
    /// ```
    pub fn with_offset(data: &'a [T], offset: isize, dims: S) -> Result<Self> {
        check_storage(data.len(), offset, dims.dims())?;
        Ok(Self {dims, ptr: data.as_ptr().wrapping_offset(offset), marker: PhantomData})
    }

    /// Wrap a raw pointer.
    ///
    /// # Safety
    ///
    /// Every element that `dims` can reach from `ptr` must be valid for
    /// reads for `'a`, and must not be written during `'a` except through a
    /// `Cell`.
    pub unsafe fn from_raw_parts(ptr: *const T, dims: S) -> Self {
        Self {dims, ptr, marker: PhantomData}
    }

    /// The dope vector.
    pub fn dims(&self) -> &[Dim] { self.dims.dims() }

    /// The number of axes.
    pub fn rank(&self) -> usize { self.dims().len() }

    /// Axis `k` of the dope vector.
    pub fn dim(&self, k: usize) -> Option<Dim> { self.dims().get(k).copied() }

    /// The total number of elements.
    pub fn size(&self) -> isize { proddim(self.dims()) }

    /// `true` if some axis has size 0.
    pub fn is_empty(&self) -> bool { self.dims().iter().any(|dim| dim.size == 0) }

    /// The position of the element at index `[0, 0, ...]`.
    pub fn as_ptr(&self) -> *const T { self.ptr }

    /// Reborrow `self` with a borrowed dope vector.
    pub fn borrow(&self) -> View<'a, T, &'_ [Dim]> {
        View {dims: self.dims(), ptr: self.ptr, marker: PhantomData}
    }

    /// Convert the dope vector to another type, e.g. between fixed and run-time
    /// rank.
    pub fn into_rank<E: Dims>(self) -> Result<View<'a, T, E>> {
        let dims = E::from_dims(self.dims())?;
        Ok(View {dims, ptr: self.ptr, marker: PhantomData})
    }

    // ------------------------------------------------------------------------

    /// The element at the full multi-index `index`.
    pub fn get(&self, index: &[isize]) -> Result<&'a T> {
        if index.len() != self.rank() {
            return Err(Error::RankMismatch {expected: self.rank(), got: index.len()});
        }
        let offset = index_p(self.dims(), index)?;
        // SAFETY: `index_p()` checked every index, and `self` is valid.
        Ok(unsafe { &*self.ptr.wrapping_offset(offset) })
    }

    /// The only element of a rank-0 view.
    pub fn scalar(&self) -> Result<&'a T> { self.get(&[]) }

    /// The sub-view of the axes that `index` does not cover.
    ///
    /// ```
    /// use ravel::{View};
    /// let data = [1, 2, 3, 4, 5, 6];
    /// let v: View<_> = View::row_major(&data, &[2, 3]).unwrap();
    /// assert_eq!(v.at(&[1]).unwrap().to_vec(), Ok(vec![4, 5, 6]));
    /// ```
    pub fn at(&self, index: &[isize]) -> Result<View<'a, T, &'_ [Dim]>> {
        let offset = index_p(self.dims(), index)?;
        Ok(View {dims: &self.dims()[index.len()..], ptr: self.ptr.wrapping_offset(offset), marker: PhantomData})
    }

    /// Apply a list of beatable subscripts.
    ///
    /// Fails with [`Error::NotBeatable`] if `subs` contains
    /// [`Subscript::Indices`]; use [`gather()`] for that.
    ///
    /// [`gather()`]: Self::gather()
    ///
    /// ```
    /// use ravel::{View, Subscript, iota};
    /// let data: Vec<i32> = (0..12).collect();
    /// let v: View<_> = View::row_major(&data, &[3, 4]).unwrap();
    /// let col: View<_, [ravel::Dim; 1]> = v.subview(&[Subscript::ALL, Subscript::Index(2)]).unwrap();
    /// assert_eq!(col.to_vec(), Ok(vec![2, 6, 10]));
    /// let block: View<_> = v.subview(&[Subscript::Iota(iota(2, 1)), Subscript::Iota(iota(2, 2))]).unwrap();
    /// assert_eq!(block.to_vec(), Ok(vec![6, 7, 10, 11]));
    /// ```
    pub fn subview<E: Dims>(&self, subs: &[Subscript<'_>]) -> Result<View<'a, T, E>> {
        let (offset, dims) = select_loop(self.dims(), subs)?;
        let dims = E::from_dims(&dims)?;
        Ok(View {dims, ptr: self.ptr.wrapping_offset(offset), marker: PhantomData})
    }

    /// Apply a list of subscripts of any kind, producing an array iterator.
    ///
    /// Each list or slice subscript contributes one output axis, so the
    /// result is the outer product of the subscripts.
    ///
    /// ```
    /// use ravel::{View, Subscript, ply};
    /// let data: Vec<i32> = (0..12).collect();
    /// let v: View<_> = View::row_major(&data, &[3, 4]).unwrap();
    /// let rows = [2, 0];
    /// let cols = [3, 3, 1];
    /// let g = v.gather(&[Subscript::Indices(&rows), Subscript::Indices(&cols)]).unwrap();
    /// let mut seen = Vec::new();
    /// ply(g, |&x| seen.push(x)).unwrap();
    /// assert_eq!(seen, [11, 11, 9, 3, 3, 1]);
    /// ```
    pub fn gather<'i>(&self, subs: &[Subscript<'i>]) -> Result<Gather<'a, 'i, T>> {
        // SAFETY: `self` is valid.
        unsafe { Gather::new(self.ptr, self.dims(), subs) }
    }

    /// An array iterator over the elements of `self`.
    pub fn iter(&self) -> CellIter<'a, '_, T, S, Atom> {
        // SAFETY: `self` is valid.
        unsafe { CellIter::new(self.ptr, self.dims(), self.rank()) }
    }

    /// An array iterator over the cells of rank `cell_rank` of `self`.
    ///
    /// A negative `cell_rank` counts down from the rank of `self`, so `-1`
    /// gives cells of all but the first axis, iterated along the first.
    ///
    /// ```
    /// use ravel::{View};
    /// let data: Vec<i32> = (0..24).collect();
    /// let v: View<_> = View::row_major(&data, &[2, 3, 4]).unwrap();
    /// assert_eq!(v.iter_cells(-1).unwrap().frame().len(), 1);
    /// assert_eq!(v.iter_cells(-2).unwrap().frame().len(), 2);
    /// assert_eq!(v.iter_cells(1).unwrap().frame().len(), 2);
    /// ```
    pub fn iter_cells(&self, cell_rank: isize) -> Result<CellIter<'a, '_, T, S, Cells>> {
        let frame_rank = self.rank() - self::cell_rank(cell_rank, self.rank())?;
        // SAFETY: `self` is valid.
        Ok(unsafe { CellIter::new(self.ptr, self.dims(), frame_rank) })
    }

    /// A standard [`Iterator`] over the elements of `self` in row-major
    /// order.
    ///
    /// Fails if `self` has an inserted axis, unless it is empty.
    pub fn elements(&self) -> Result<Elements<'a, '_, T>> {
        // SAFETY: `self` is valid.
        unsafe { Elements::new(self.ptr, self.dims()) }
    }

    /// Copy the elements of `self` in row-major order.
    pub fn to_vec(&self) -> Result<Vec<T>> where T: Clone {
        let mut ret = Vec::with_capacity(self.size().max(0) as usize);
        ply(self.iter(), |t| ret.push(t.clone()))?;
        Ok(ret)
    }
}

impl<'a, T, D: Dims> View<'a, T, D> {
    /// Wrap `data` as a dense row-major array with the given sizes.
    pub fn row_major(data: &'a [T], sizes: &[isize]) -> Result<Self> {
        Self::new(data, row_major(sizes)?)
    }
}

impl<'a, T> From<&'a [T]> for View<'a, T, [Dim; 1]> {
    fn from(data: &'a [T]) -> Self {
        Self {dims: [Dim::new(data.len() as isize, 1)], ptr: data.as_ptr(), marker: PhantomData}
    }
}

// ----------------------------------------------------------------------------

/// A writable strided window onto a slice of `T`s.
///
/// Several positions of a `ViewMut` may share an element, e.g. when a stride
/// is zero. Writes therefore go through `Cell<T>`, and a `ViewMut` is the
/// only handle to its data for as long as it lives.
///
/// ```
/// use ravel::{ViewMut};
/// let mut data = [0; 6];
/// let mut v: ViewMut<_> = ViewMut::row_major(&mut data, &[2, 3]).unwrap();
/// v.set(&[1, 0], 7).unwrap();
/// assert_eq!(v.get(&[1, 0]), Ok(&7));
/// assert_eq!(data, [0, 0, 0, 7, 0, 0]);
/// ```
pub struct ViewMut<'a, T, S: Shape = Vec<Dim>> {
    pub(crate) cells: View<'a, Cell<T>, S>,
}

// SAFETY: A `ViewMut` behaves like a `&'a mut [T]`.
unsafe impl<'a, T: Send, S: Shape + Send> Send for ViewMut<'a, T, S> {}

impl<'a, T, S: Shape> Debug for ViewMut<'a, T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewMut").field("dims", &self.dims()).field("ptr", &self.cells.ptr).finish()
    }
}

impl<'a, T, S: Shape> ViewMut<'a, T, S> {
    /// Wrap `data` with the dope vector `dims`, starting at `data[0]`.
    pub fn new(data: &'a mut [T], dims: S) -> Result<Self> { Self::with_offset(data, 0, dims) }

    /// Wrap `data` with the dope vector `dims`, starting at `data[offset]`.
    pub fn with_offset(data: &'a mut [T], offset: isize, dims: S) -> Result<Self> {
        let data = Cell::from_mut(data).as_slice_of_cells();
        Ok(Self {cells: View::with_offset(data, offset, dims)?})
    }

    /// The dope vector.
    pub fn dims(&self) -> &[Dim] { self.cells.dims() }

    /// The number of axes.
    pub fn rank(&self) -> usize { self.cells.rank() }

    /// Axis `k` of the dope vector.
    pub fn dim(&self, k: usize) -> Option<Dim> { self.cells.dim(k) }

    /// The total number of elements.
    pub fn size(&self) -> isize { self.cells.size() }

    /// `true` if some axis has size 0.
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    /// A read-only view of the same elements.
    pub fn view(&self) -> View<'_, T, &'_ [Dim]> {
        // SAFETY: `Cell<T>` has the same layout as `T`, and nothing can write
        // through `self` while the result lives.
        unsafe { View::from_raw_parts(self.cells.ptr as *const T, self.dims()) }
    }

    /// Give up write access.
    pub fn into_view(self) -> View<'a, T, S> {
        // SAFETY: `self` was the only handle to the data.
        unsafe { View::from_raw_parts(self.cells.ptr as *const T, self.cells.dims) }
    }

    /// A view of the elements as `Cell`s.
    pub fn cells(&mut self) -> View<'_, Cell<T>, &'_ [Dim]> { self.cells.borrow() }

    // ------------------------------------------------------------------------

    /// The element at the full multi-index `index`.
    pub fn get(&self, index: &[isize]) -> Result<&T> {
        let cell = self.cells.get(index)?;
        // SAFETY: Nothing can write through `self` while the result lives.
        Ok(unsafe { &*cell.as_ptr() })
    }

    /// The element at the full multi-index `index`, for writing.
    ///
    /// Positions that share an element through a zero stride give the same
    /// `&mut T`, one at a time.
    pub fn get_mut(&mut self, index: &[isize]) -> Result<&mut T> {
        let cell = self.cells.get(index)?;
        // SAFETY: `self` is borrowed exclusively while the result lives.
        Ok(unsafe { &mut *cell.as_ptr() })
    }

    /// Overwrite the element at the full multi-index `index`.
    pub fn set(&mut self, index: &[isize], value: T) -> Result<()> {
        self.cells.get(index)?.set(value);
        Ok(())
    }

    /// The writable sub-view of the axes that `index` does not cover.
    pub fn at_mut(&mut self, index: &[isize]) -> Result<ViewMut<'_, T, &'_ [Dim]>> {
        Ok(ViewMut {cells: self.cells.at(index)?})
    }

    /// Apply a list of beatable subscripts, as [`View::subview()`].
    ///
    /// Fails with [`Error::InsertOnWrite`] if `subs` inserts an axis.
    pub fn subview_mut<E: Dims>(&mut self, subs: &[Subscript<'_>]) -> Result<ViewMut<'_, T, E>> {
        if subs.iter().any(|sub| matches!(sub, Subscript::Insert(n) if *n > 0)) {
            return Err(Error::InsertOnWrite);
        }
        Ok(ViewMut {cells: self.cells.subview(subs)?})
    }

    /// Apply a list of subscripts of any kind, as [`View::gather()`], to
    /// produce an array iterator over the selected `Cell`s.
    ///
    /// ```
    /// use ravel::{ViewMut, Subscript, ply};
    /// let mut data = [0; 5];
    /// let mut v: ViewMut<_> = ViewMut::row_major(&mut data, &[5]).unwrap();
    /// let picks = [4, 1];
    /// ply(v.gather_mut(&[Subscript::Indices(&picks)]).unwrap(), |c| c.set(1)).unwrap();
    /// assert_eq!(data, [0, 1, 0, 0, 1]);
    /// ```
    pub fn gather_mut<'i>(&mut self, subs: &[Subscript<'i>]) -> Result<Gather<'_, 'i, Cell<T>>> {
        if subs.iter().any(|sub| matches!(sub, Subscript::Insert(n) if *n > 0)) {
            return Err(Error::InsertOnWrite);
        }
        self.cells.gather(subs)
    }

    /// An array iterator over the elements of `self`, as `Cell`s.
    pub fn iter_mut(&mut self) -> CellIter<'_, '_, Cell<T>, S, Atom> {
        // SAFETY: `self.cells` is valid.
        unsafe { CellIter::new(self.cells.ptr, self.cells.dims(), self.rank()) }
    }

    /// An array iterator over the cells of rank `cell_rank` of `self`, as
    /// views of `Cell`s.
    pub fn iter_cells_mut(&mut self, cell_rank: isize) -> Result<CellIter<'_, '_, Cell<T>, S, Cells>> {
        let frame_rank = self.rank() - self::cell_rank(cell_rank, self.rank())?;
        // SAFETY: `self.cells` is valid.
        Ok(unsafe { CellIter::new(self.cells.ptr, self.cells.dims(), frame_rank) })
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: T) -> Result<()> where T: Clone {
        ply(self.iter_mut(), |c| c.set(value.clone()))
    }

    /// Copy the elements of `self` in row-major order.
    pub fn to_vec(&self) -> Result<Vec<T>> where T: Clone { self.view().to_vec() }
}

impl<'a, T, D: Dims> ViewMut<'a, T, D> {
    /// Wrap `data` as a dense row-major array with the given sizes.
    pub fn row_major(data: &'a mut [T], sizes: &[isize]) -> Result<Self> {
        Self::new(data, row_major(sizes)?)
    }
}

impl<'a, T> From<&'a mut [T]> for ViewMut<'a, T, [Dim; 1]> {
    fn from(data: &'a mut [T]) -> Self {
        let data = Cell::from_mut(data).as_slice_of_cells();
        Self {cells: View::from(data)}
    }
}

// ----------------------------------------------------------------------------
