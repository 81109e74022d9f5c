use std::cell::{Cell};
use std::marker::{PhantomData};

use smallvec::{SmallVec};

use super::{
    Dim, DIM_ANY, Shape, Dims, INLINE_RANK, Error, Result, View, ViewMut,
    ArrayIter, Flat, Zip, Scalar, index_p, is_c_order, proddim, row_major, ply,
};

/// Owned memory for an [`Array`].
///
/// # Safety
///
/// `as_slice()` and `as_mut_slice()` must return the same elements, and
/// their length must only change through the methods of [`Growable`].
/// `allocate(n, _)` must return exactly `n` elements. [`Array`] hands out
/// views that trust the length.
///
/// ```compile_fail
/// use ravel::Storage;
/// struct Shrinking(Vec<u8>);
/// impl Storage<u8> for Shrinking {
///     fn allocate(n: usize, fill: u8) -> Self { Shrinking(vec![fill; n]) }
///     fn as_slice(&self) -> &[u8] { &self.0[..1] }
///     fn as_mut_slice(&mut self) -> &mut [u8] { &mut self.0 }
/// }
/// ```
pub unsafe trait Storage<T>: Sized {
    /// `n` clones of `fill`.
    fn allocate(n: usize, fill: T) -> Self where T: Clone;

    fn as_slice(&self) -> &[T];

    fn as_mut_slice(&mut self) -> &mut [T];
}

// SAFETY: A `Vec` only changes length when asked to.
unsafe impl<T> Storage<T> for Vec<T> {
    fn allocate(n: usize, fill: T) -> Self where T: Clone { vec![fill; n] }
    fn as_slice(&self) -> &[T] { self }
    fn as_mut_slice(&mut self) -> &mut [T] { self }
}

// SAFETY: A boxed slice never changes length.
unsafe impl<T> Storage<T> for Box<[T]> {
    fn allocate(n: usize, fill: T) -> Self where T: Clone { vec![fill; n].into_boxed_slice() }
    fn as_slice(&self) -> &[T] { self }
    fn as_mut_slice(&mut self) -> &mut [T] { self }
}

/// [`Storage`] that can change length.
///
/// # Safety
///
/// After `resize(n, _)` there must be exactly `n` elements. `push()` must add
/// one element at the end, and `pop()` must remove the last one and return
/// `Some` if and only if there was one.
pub unsafe trait Growable<T>: Storage<T> {
    fn resize(&mut self, n: usize, fill: T) where T: Clone;

    fn push(&mut self, t: T);

    fn pop(&mut self) -> Option<T>;
}

// SAFETY: Delegates to `Vec`.
unsafe impl<T> Growable<T> for Vec<T> {
    fn resize(&mut self, n: usize, fill: T) where T: Clone { Vec::resize(self, n, fill); }
    fn push(&mut self, t: T) { Vec::push(self, t); }
    fn pop(&mut self) -> Option<T> { Vec::pop(self) }
}

// ----------------------------------------------------------------------------

/// A dense row-major array of `T`s, which owns its elements.
///
/// `D` is the dope-vector type, `[Dim; R]` or `Vec<Dim>`, and `St` is the
/// storage type. The layout is always row-major: the last axis has stride 1
/// and each other axis has the product of the sizes after it.
///
/// ```
/// use ravel::{Array};
/// let mut a: Array<i32> = Array::new(&[2, 3], vec![0, 1, 2, 3, 4, 5]).unwrap();
/// assert_eq!(a.get(&[1, 2]), Ok(&5));
/// a.view_mut().set(&[0, 0], 9).unwrap();
/// assert_eq!(a.as_ref(), [9, 1, 2, 3, 4, 5]);
/// ```
#[derive(Debug, Clone)]
pub struct Array<T, D: Dims = Vec<Dim>, St: Storage<T> = Vec<T>> {
    dims: D,
    store: St,
    marker: PhantomData<T>,
}

impl<T, D: Dims, St: Storage<T>> Array<T, D, St> {
    /// Constructs an `Array` with the given sizes from its elements in
    /// row-major order.
    pub fn new(sizes: &[isize], items: impl Into<St>) -> Result<Self> {
        let dims: D = row_major(sizes)?;
        let store = items.into();
        let (len, size) = (store.as_slice().len(), proddim(dims.dims()));
        if len as isize != size { return Err(Error::StorageMismatch {len, size}); }
        Ok(Self {dims, store, marker: PhantomData})
    }

    /// Constructs an `Array` with the given sizes, filled with `fill`.
    ///
    /// ```
    /// use ravel::{Array, Dim};
    /// let a: Array<_, [Dim; 2], Box<[_]>> = Array::filled(&[2, 2], 'x').unwrap();
    /// assert_eq!(a.as_ref(), ['x'; 4]);
    /// ```
    pub fn filled(sizes: &[isize], fill: T) -> Result<Self> where T: Clone {
        let dims: D = row_major(sizes)?;
        let store = St::allocate(proddim(dims.dims()) as usize, fill);
        Ok(Self {dims, store, marker: PhantomData})
    }

    /// Copy the elements of `v`.
    pub fn from_view<S: Shape>(v: &View<'_, T, S>) -> Result<Self> where T: Clone, Vec<T>: Into<St> {
        let sizes: SmallVec<[isize; INLINE_RANK]> = v.dims().iter().map(|dim| dim.size).collect();
        Self::new(&sizes, v.to_vec()?)
    }

    /// Evaluate the array iterator `a` into a new `Array` with the given
    /// sizes.
    ///
    /// `a` is frame-matched against the sizes as by [`Zip`], so an
    /// expression of lower rank is repeated along the trailing axes, and
    /// inserted axes take the given sizes.
    ///
    /// ```
    /// use ravel::{Array, Iota, Map};
    /// let a: Array<isize> = Array::from_expr(&[2, 3], Map::new(Iota::new(2, 1, 1), |i| i * 10)).unwrap();
    /// assert_eq!(a.as_ref(), [10, 10, 10, 20, 20, 20]);
    /// ```
    pub fn from_expr<A>(sizes: &[isize], a: A) -> Result<Self> where
        A: ArrayIter,
        A::Flat: Flat<Item=T>,
        Vec<T>: Into<St>,
    {
        let dims: D = row_major(sizes)?;
        if a.rank() > dims.dims().len() {
            return Err(Error::RankMismatch {expected: dims.dims().len(), got: a.rank()});
        }
        let mut items = Vec::with_capacity(proddim(dims.dims()) as usize);
        ply(Zip::new(Frame(dims.dims()), a)?, |((), t)| items.push(t))?;
        Ok(Self {dims, store: items.into(), marker: PhantomData})
    }

    pub fn dims(&self) -> &[Dim] { self.dims.dims() }

    pub fn rank(&self) -> usize { self.dims().len() }

    pub fn size(&self) -> isize { proddim(self.dims()) }

    /// Returns the storage.
    pub fn into_storage(self) -> St { self.store }

    pub fn view(&self) -> View<'_, T, D> {
        // SAFETY: The storage holds exactly the elements of `self.dims`.
        unsafe { View::from_raw_parts(self.store.as_slice().as_ptr(), self.dims.clone()) }
    }

    pub fn view_mut(&mut self) -> ViewMut<'_, T, D> {
        let data = Cell::from_mut(self.store.as_mut_slice()).as_slice_of_cells();
        // SAFETY: The storage holds exactly the elements of `self.dims`.
        let cells = unsafe { View::from_raw_parts(data.as_ptr(), self.dims.clone()) };
        ViewMut {cells}
    }

    /// The element at the full multi-index `index`.
    pub fn get(&self, index: &[isize]) -> Result<&T> {
        let offset = self.offset(index)?;
        Ok(&self.store.as_slice()[offset])
    }

    /// Overwrite the element at the full multi-index `index`.
    pub fn set(&mut self, index: &[isize], value: T) -> Result<()> {
        let offset = self.offset(index)?;
        self.store.as_mut_slice()[offset] = value;
        Ok(())
    }

    fn offset(&self, index: &[isize]) -> Result<usize> {
        if index.len() != self.rank() {
            return Err(Error::RankMismatch {expected: self.rank(), got: index.len()});
        }
        Ok(index_p(self.dims(), index)? as usize)
    }
}

impl<T, D: Dims, St: Growable<T>> Array<T, D, St> {
    /// The number of elements per position of the outermost axis.
    fn inner_size(&self) -> Result<isize> {
        match self.dims() {
            [] => Err(Error::RankMismatch {expected: 1, got: 0}),
            [_, inner @ ..] => Ok(proddim(inner)),
        }
    }

    /// Set the size of the outermost axis.
    fn sync(&mut self, size: isize) {
        self.dims.dims_mut()[0].size = size;
        debug_assert!(is_c_order(self.dims()), "not row-major: {:?}", self.dims());
        tracing::debug!(rank = self.rank(), size, len = self.store.as_slice().len(), "array resized");
    }

    /// Change the size of the outermost axis to `n`, filling any new
    /// elements with `fill`.
    ///
    /// ```
    /// use ravel::{Array};
    /// let mut a: Array<i32> = Array::new(&[1, 2], vec![1, 2]).unwrap();
    /// a.resize(3, 0).unwrap();
    /// assert_eq!(a.dims()[0].size, 3);
    /// assert_eq!(a.view().at(&[2]).unwrap().to_vec(), Ok(vec![0, 0]));
    /// ```
    pub fn resize(&mut self, n: isize, fill: T) -> Result<()> where T: Clone {
        if n < 0 { return Err(Error::BadSize {axis: 0, size: n}); }
        let inner = self.inner_size()?;
        let len = n.checked_mul(inner).ok_or(Error::Overflow {axis: 0})?;
        self.store.resize(len as usize, fill);
        self.sync(n);
        Ok(())
    }

    /// Append an element to a rank-1 array.
    pub fn push(&mut self, t: T) -> Result<()> {
        if self.rank() != 1 { return Err(Error::RankMismatch {expected: 1, got: self.rank()}); }
        self.store.push(t);
        let size = self.dims()[0].size + 1;
        self.sync(size);
        Ok(())
    }

    /// Remove the last element of a rank-1 array.
    pub fn pop(&mut self) -> Result<Option<T>> {
        if self.rank() != 1 { return Err(Error::RankMismatch {expected: 1, got: self.rank()}); }
        let t = self.store.pop();
        if t.is_some() {
            let size = self.dims()[0].size - 1;
            self.sync(size);
        }
        Ok(t)
    }
}

impl<T, D: Dims, St: Storage<T>> std::convert::AsRef<[T]> for Array<T, D, St> {
    fn as_ref(&self) -> &[T] { self.store.as_slice() }
}

impl<T, D: Dims, St: Storage<T>> std::convert::AsMut<[T]> for Array<T, D, St> {
    fn as_mut(&mut self) -> &mut [T] { self.store.as_mut_slice() }
}

// ----------------------------------------------------------------------------

/// An array iterator with a shape and no elements, used to give an
/// expression the shape of a new [`Array`].
struct Frame<'d>(&'d [Dim]);

// SAFETY: Reads no memory.
unsafe impl<'d> ArrayIter for Frame<'d> {
    type Stride = ();
    type Flat = Scalar<()>;

    fn rank(&self) -> usize { self.0.len() }
    fn size(&self, k: usize) -> isize { self.0.get(k).map_or(DIM_ANY, |dim| dim.size) }
    fn stride(&self, _: usize) {}
    fn keep_stride(&self, _: isize, _: usize, _: usize) -> bool { true }
    unsafe fn adv(&mut self, _: usize, _: isize) {}
    fn flat(&self) -> Scalar<()> { Scalar(()) }
}

// ----------------------------------------------------------------------------
