//! [`Elements`]: a standard [`Iterator`] over the elements of a view.

use std::iter::{FusedIterator};
use std::marker::{PhantomData};

use smallvec::{SmallVec, smallvec};

use super::{Dim, INLINE_RANK, Error, Result, proddim};

/// Iterates over the elements of a [`View`] in row-major order, driven by an
/// odometer over the full rank.
///
/// Unlike the traversal functions, this never fuses axes, but it composes
/// with the rest of [`std::iter`].
///
/// [`View`]: super::View
///
/// ```
/// use ravel::{Dim, View};
/// let data = [1, 2, 3, 4, 5, 6];
/// let t = View::new(&data, [Dim::new(2, 1), Dim::new(3, 2)]).unwrap();
/// let seen: Vec<i32> = t.elements().unwrap().copied().collect();
/// assert_eq!(seen, [1, 3, 5, 2, 4, 6]);
/// assert_eq!(t.elements().unwrap().max(), Some(&6));
/// ```
pub struct Elements<'a, 'v, T> {
    ptr: *const T,
    dims: &'v [Dim],
    index: SmallVec<[isize; INLINE_RANK]>,
    offset: isize,
    remaining: usize,
    marker: PhantomData<&'a T>,
}

impl<'a, 'v, T> Elements<'a, 'v, T> {
    /// Start at the origin of the view at `ptr` with dope vector `dims`.
    ///
    /// # Safety
    ///
    /// `ptr` and `dims` must describe a valid view.
    pub(crate) unsafe fn new(ptr: *const T, dims: &'v [Dim]) -> Result<Self> {
        let remaining = if dims.iter().any(|dim| dim.size == 0) {
            0
        } else if let Some(axis) = dims.iter().position(|dim| dim.size < 0) {
            return Err(Error::UndefinedDim {axis});
        } else {
            proddim(dims) as usize
        };
        Ok(Self {ptr, dims, index: smallvec![0; dims.len()], offset: 0, remaining, marker: PhantomData})
    }

    /// The multi-index of the next element.
    pub fn index(&self) -> &[isize] { &self.index }
}

impl<'a, 'v, T> Iterator for Elements<'a, 'v, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 { return None; }
        // SAFETY: `index` is inside the shape while `remaining > 0`.
        let item = unsafe { &*self.ptr.wrapping_offset(self.offset) };
        self.remaining -= 1;
        for (i, dim) in self.index.iter_mut().zip(self.dims).rev() {
            *i += 1;
            self.offset = self.offset.wrapping_add(dim.stride);
            if *i < dim.size { break; }
            *i = 0;
            self.offset = self.offset.wrapping_sub(dim.stride.wrapping_mul(dim.size));
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) { (self.remaining, Some(self.remaining)) }
}

impl<'a, 'v, T> ExactSizeIterator for Elements<'a, 'v, T> {}

impl<'a, 'v, T> FusedIterator for Elements<'a, 'v, T> {}

// ----------------------------------------------------------------------------
