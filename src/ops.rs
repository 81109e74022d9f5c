//! Generic programming over in-place updates.
//!
//! Each update is a type that cannot be instantiated and that implements
//! [`Update`]. For example, [`AddAssign`] corresponds to
//! [`std::ops::AddAssign`]. It is passed as a type parameter to
//! [`ViewMut::update()`], which zips the destination with a source array
//! iterator and applies the update to every pair.

use std::borrow::{Borrow};
use std::cell::{Cell};

use super::{Shape, Result, ViewMut, ArrayIter, Item, Zip, ply};

/// A way of combining a destination element with a source value.
///
/// This trait has no methods that take `self`. It makes sense to implement it
/// for types that cannot be instantiated, such as empty enumerations.
pub trait Update<T, U> {
    fn update(dst: &Cell<T>, src: U);
}

// ----------------------------------------------------------------------------

/// Overwrite the destination with a clone of the source.
pub enum Assign {}

impl<T: Clone, U: Borrow<T>> Update<T, U> for Assign {
    #[inline(always)]
    fn update(dst: &Cell<T>, src: U) { dst.set(src.borrow().clone()); }
}

// ----------------------------------------------------------------------------

pub enum AddAssign {}

impl<T, U> Update<T, U> for AddAssign where T: Copy + std::ops::Add<U, Output=T> {
    #[inline(always)]
    fn update(dst: &Cell<T>, src: U) { dst.set(dst.get() + src); }
}

// ----------------------------------------------------------------------------

pub enum SubAssign {}

impl<T, U> Update<T, U> for SubAssign where T: Copy + std::ops::Sub<U, Output=T> {
    #[inline(always)]
    fn update(dst: &Cell<T>, src: U) { dst.set(dst.get() - src); }
}

// ----------------------------------------------------------------------------

pub enum MulAssign {}

impl<T, U> Update<T, U> for MulAssign where T: Copy + std::ops::Mul<U, Output=T> {
    #[inline(always)]
    fn update(dst: &Cell<T>, src: U) { dst.set(dst.get() * src); }
}

// ----------------------------------------------------------------------------

pub enum DivAssign {}

impl<T, U> Update<T, U> for DivAssign where T: Copy + std::ops::Div<U, Output=T> {
    #[inline(always)]
    fn update(dst: &Cell<T>, src: U) { dst.set(dst.get() / src); }
}

// ----------------------------------------------------------------------------

impl<'a, T, S: Shape> ViewMut<'a, T, S> {
    /// Combine every element of `self` with the corresponding item of `src`,
    /// using `Op`.
    ///
    /// `self` and `src` are frame-matched as by [`Zip`]. If `src` has higher
    /// rank than `self`, each element of `self` is updated once for each of
    /// the extra positions, which gives reductions.
    ///
    /// ```
    /// use ravel::{View, ViewMut, AddAssign};
    /// let m = [1, 2, 3, 4, 5, 6];
    /// let m: View<_> = View::row_major(&m, &[2, 3]).unwrap();
    /// let mut sums = [0i32; 2];
    /// let mut v: ViewMut<_> = ViewMut::row_major(&mut sums, &[2]).unwrap();
    /// v.update::<AddAssign, _>(m.iter()).unwrap();
    /// assert_eq!(sums, [6, 15]);
    /// ```
    pub fn update<Op, A>(&mut self, src: A) -> Result<()> where
        A: ArrayIter,
        Op: Update<T, Item<A>>,
    {
        ply(Zip::new(self.iter_mut(), src)?, |(dst, src)| Op::update(dst, src))
    }

    /// Copy `src` into `self`.
    ///
    /// ```
    /// use ravel::{ViewMut, Iota};
    /// let mut data = [0isize; 4];
    /// ViewMut::from(&mut data[..]).assign(Iota::new(4, 10, -1)).unwrap();
    /// assert_eq!(data, [10, 9, 8, 7]);
    /// ```
    pub fn assign<A: ArrayIter>(&mut self, src: A) -> Result<()> where Assign: Update<T, Item<A>> {
        self.update::<Assign, A>(src)
    }

    pub fn add_assign<A: ArrayIter>(&mut self, src: A) -> Result<()> where AddAssign: Update<T, Item<A>> {
        self.update::<AddAssign, A>(src)
    }

    pub fn sub_assign<A: ArrayIter>(&mut self, src: A) -> Result<()> where SubAssign: Update<T, Item<A>> {
        self.update::<SubAssign, A>(src)
    }

    pub fn mul_assign<A: ArrayIter>(&mut self, src: A) -> Result<()> where MulAssign: Update<T, Item<A>> {
        self.update::<MulAssign, A>(src)
    }

    pub fn div_assign<A: ArrayIter>(&mut self, src: A) -> Result<()> where DivAssign: Update<T, Item<A>> {
        self.update::<DivAssign, A>(src)
    }
}

// ----------------------------------------------------------------------------
