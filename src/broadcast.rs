//! Expression nodes: combining [`ArrayIter`]s.
//!
//! [`Zip`] walks two array iterators in lockstep. Their frames are matched
//! axis by axis: each axis must have the same size in both, or be beyond the
//! rank of one of them, in which case that one is repeated along it. Inserted
//! axes ([`DIM_BAD`]) take their size from the other operand.

use super::{DIM_ANY, DIM_BAD, Error, Result, ArrayIter, Flat, Item};

/// The size of axis `k` of `a`, or [`DIM_ANY`] beyond its rank.
#[inline(always)]
fn size_of<A: ArrayIter>(a: &A, k: usize) -> isize {
    if k < a.rank() { a.size(k) } else { DIM_ANY }
}

/// The size of an axis whose sizes in two operands are `a` and `b`.
fn match_size(a: isize, b: isize) -> isize {
    if a >= 0 { return a; }
    if b >= 0 { return b; }
    if a == DIM_BAD || b == DIM_BAD { DIM_BAD } else { DIM_ANY }
}

const fn max_rank(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a > b { a } else { b }),
        _ => None,
    }
}

const fn max_size(a: isize, b: isize) -> isize {
    if a == DIM_ANY || b == DIM_ANY { DIM_ANY } else if a > b { a } else { b }
}

// ----------------------------------------------------------------------------

/// Two [`ArrayIter`]s walked in lockstep, yielding pairs.
///
/// ```
/// use ravel::{View, zip, ply};
/// let m = [1, 2, 3, 4, 5, 6];
/// let m: View<_> = View::row_major(&m, &[2, 3]).unwrap();
/// let r = [10, 20];
/// let r: View<_> = View::row_major(&r, &[2]).unwrap();
/// let mut sums = Vec::new();
/// // `r` has rank 1, so each of its elements is repeated along a row of `m`.
/// ply(zip(m.iter(), r.iter()).unwrap(), |(x, y)| sums.push(x + y)).unwrap();
/// assert_eq!(sums, [11, 12, 13, 24, 25, 26]);
/// ```
#[derive(Debug, Clone)]
pub struct Zip<A, B> {
    a: A,
    b: B,
}

impl<A: ArrayIter, B: ArrayIter> Zip<A, B> {
    /// Fails if `a` and `b` have different sizes on a common axis.
    pub fn new(a: A, b: B) -> Result<Self> {
        let rank = a.rank().max(b.rank());
        for axis in 0..rank {
            let (left, right) = (size_of(&a, axis), size_of(&b, axis));
            if left >= 0 && right >= 0 && left != right {
                return Err(Error::ShapeMismatch {axis, left, right});
            }
        }
        Ok(Self {a, b})
    }

    pub fn into_inner(self) -> (A, B) { (self.a, self.b) }
}

/// Shorthand for [`Zip::new()`].
pub fn zip<A: ArrayIter, B: ArrayIter>(a: A, b: B) -> Result<Zip<A, B>> { Zip::new(a, b) }

/// The cursor of a [`Zip`].
pub struct ZipFlat<P, Q>(P, Q);

impl<P: Flat, Q: Flat> Flat for ZipFlat<P, Q> {
    type Stride = (P::Stride, Q::Stride);
    type Item = (P::Item, Q::Item);
    #[inline(always)]
    fn step(&mut self, s: Self::Stride) { self.0.step(s.0); self.1.step(s.1); }
    #[inline(always)]
    unsafe fn get(&mut self) -> Self::Item { (self.0.get(), self.1.get()) }
}

// SAFETY: Both operands are walked over the same positions, and `new()`
// checked that their shapes agree.
unsafe impl<A: ArrayIter, B: ArrayIter> ArrayIter for Zip<A, B> {
    type Stride = (A::Stride, B::Stride);
    type Flat = ZipFlat<A::Flat, B::Flat>;
    const RANK_S: Option<usize> = max_rank(A::RANK_S, B::RANK_S);
    const SIZE_S: isize = max_size(A::SIZE_S, B::SIZE_S);

    fn rank(&self) -> usize { self.a.rank().max(self.b.rank()) }
    fn size(&self, k: usize) -> isize { match_size(size_of(&self.a, k), size_of(&self.b, k)) }
    fn stride(&self, k: usize) -> Self::Stride { (self.a.stride(k), self.b.stride(k)) }
    fn keep_stride(&self, step: isize, z: usize, j: usize) -> bool {
        self.a.keep_stride(step, z, j) && self.b.keep_stride(step, z, j)
    }
    unsafe fn adv(&mut self, k: usize, d: isize) { self.a.adv(k, d); self.b.adv(k, d); }
    fn flat(&self) -> Self::Flat { ZipFlat(self.a.flat(), self.b.flat()) }
}

// ----------------------------------------------------------------------------

/// A rank-0 array iterator: a single value, repeated along every axis of
/// whatever it is zipped with.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct Scalar<T>(pub T);

impl<T: Clone> Flat for Scalar<T> {
    type Stride = ();
    type Item = T;
    #[inline(always)]
    fn step(&mut self, _: ()) {}
    #[inline(always)]
    unsafe fn get(&mut self) -> T { self.0.clone() }
}

// SAFETY: Reads no memory.
unsafe impl<T: Clone> ArrayIter for Scalar<T> {
    type Stride = ();
    type Flat = Self;
    const RANK_S: Option<usize> = Some(0);
    const SIZE_S: isize = 1;

    fn rank(&self) -> usize { 0 }
    fn size(&self, _: usize) -> isize { DIM_ANY }
    fn stride(&self, _: usize) {}
    fn keep_stride(&self, _: isize, _: usize, _: usize) -> bool { true }
    unsafe fn adv(&mut self, _: usize, _: isize) {}
    fn flat(&self) -> Self { self.clone() }
}

// ----------------------------------------------------------------------------

/// An [`ArrayIter`] that applies `F` to the items of `A`.
///
/// ```
/// use ravel::{Iota, Map, ply};
/// let mut seen = Vec::new();
/// ply(Map::new(Iota::new(3, 0, 1), |i| i * i), |x| seen.push(x)).unwrap();
/// assert_eq!(seen, [0, 1, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct Map<A, F> {
    a: A,
    f: F,
}

impl<A: ArrayIter, U, F: Clone + Fn(Item<A>) -> U> Map<A, F> {
    pub fn new(a: A, f: F) -> Self { Self {a, f} }
}

/// The cursor of a [`Map`].
pub struct MapFlat<P, F>(P, F);

impl<P: Flat, U, F: Fn(P::Item) -> U> Flat for MapFlat<P, F> {
    type Stride = P::Stride;
    type Item = U;
    #[inline(always)]
    fn step(&mut self, s: P::Stride) { self.0.step(s); }
    #[inline(always)]
    unsafe fn get(&mut self) -> U { (self.1)(self.0.get()) }
}

// SAFETY: Delegates to `A`.
unsafe impl<A: ArrayIter, U, F: Clone + Fn(Item<A>) -> U> ArrayIter for Map<A, F> {
    type Stride = A::Stride;
    type Flat = MapFlat<A::Flat, F>;
    const RANK_S: Option<usize> = A::RANK_S;
    const SIZE_S: isize = A::SIZE_S;

    fn rank(&self) -> usize { self.a.rank() }
    fn size(&self, k: usize) -> isize { self.a.size(k) }
    fn stride(&self, k: usize) -> A::Stride { self.a.stride(k) }
    fn keep_stride(&self, step: isize, z: usize, j: usize) -> bool { self.a.keep_stride(step, z, j) }
    unsafe fn adv(&mut self, k: usize, d: isize) { self.a.adv(k, d); }
    fn flat(&self) -> Self::Flat { MapFlat(self.a.flat(), self.f.clone()) }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::{Dim, View, Subscript, CellIter, Atom, Iota, ply, ply_ravel};

    #[test]
    fn shapes_must_agree() {
        let a = [0; 6];
        let a: View<_> = View::row_major(&a, &[2, 3]).unwrap();
        let b = [0; 3];
        let b: View<_> = View::row_major(&b, &[3]).unwrap();
        assert_eq!(zip(a.iter(), b.iter()).err().map(|e| e.to_string()), Some("shape mismatch on axis 0: 2 vs 3".into()));
        assert!(zip(a.iter_cells(1).unwrap(), b.iter()).is_err());
        let z = zip(a.iter(), a.iter()).unwrap();
        assert_eq!((z.rank(), z.size(0), z.size(1), z.size(2)), (2, 2, 3, DIM_ANY));
    }

    #[test]
    fn insert_takes_the_other_size() {
        let col = [1, 2];
        let col: View<_> = View::row_major(&col, &[2]).unwrap();
        let col: View<_> = col.subview(&[Subscript::ALL, Subscript::Insert(1)]).unwrap();
        let row = [10, 20, 30];
        let row: View<_> = View::row_major(&row, &[3]).unwrap();
        let row: View<_> = row.subview(&[Subscript::Insert(1), Subscript::ALL]).unwrap();
        let z = zip(col.iter(), row.iter()).unwrap();
        assert_eq!((z.size(0), z.size(1)), (2, 3));
        let mut outer = Vec::new();
        ply(z, |(x, y)| outer.push(x * y)).unwrap();
        assert_eq!(outer, [10, 20, 30, 20, 40, 60]);
        // Nothing resolves the inserted axis here.
        let z = zip(col.iter(), Scalar(0)).unwrap();
        assert_eq!(z.size(1), DIM_BAD);
        assert!(ply(z, |_| ()).is_err());
    }

    #[test]
    fn zipped_fusion_needs_both() {
        let a: Vec<i32> = (0..6).collect();
        let dense: View<_> = View::row_major(&a, &[2, 3]).unwrap();
        let t = View::new(&a, vec![Dim::new(2, 1), Dim::new(3, 2)]).unwrap();
        let z = zip(dense.iter(), dense.iter()).unwrap();
        assert!(z.keep_stride(3, 1, 0));
        let z = zip(dense.iter(), t.iter()).unwrap();
        assert!(!z.keep_stride(3, 1, 0));
        let mut pairs = Vec::new();
        ply_ravel(z, |(&x, &y)| pairs.push((x, y))).unwrap();
        assert_eq!(pairs, [(0, 0), (1, 2), (2, 4), (3, 1), (4, 3), (5, 5)]);
    }

    #[test]
    fn static_hints() {
        type V = CellIter<'static, 'static, i32, [Dim; 2], Atom>;
        type W = CellIter<'static, 'static, i32, Vec<Dim>, Atom>;
        assert_eq!(<Zip<V, Scalar<i32>>>::RANK_S, Some(2));
        assert_eq!(<Zip<V, Scalar<i32>>>::SIZE_S, DIM_ANY);
        assert_eq!(<Zip<Scalar<u8>, Scalar<i32>>>::SIZE_S, 1);
        assert_eq!(<Zip<Iota, W>>::RANK_S, None);
        assert_eq!(<Zip<Iota, V>>::RANK_S, Some(2));
    }

    #[test]
    fn map_over_view() {
        let a = [1, 2, 3, 4];
        let a: View<_> = View::row_major(&a, &[2, 2]).unwrap();
        let mut seen = Vec::new();
        ply(Map::new(a.iter(), |&x| x * 10), |x| seen.push(x)).unwrap();
        assert_eq!(seen, [10, 20, 30, 40]);
    }
}
