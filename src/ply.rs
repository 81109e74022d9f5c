//! The traversal engine.
//!
//! Anything that implements [`ArrayIter`] can be traversed ("plied"): every
//! element is visited exactly once, and within a run of contiguous axes the
//! elements are visited in memory order. Two strategies exist:
//!
//! - [`ply_ravel()`] decides at run time which trailing axes can be fused into
//!   one loop, and drives the remaining axes with an odometer.
//! - [`plyf()`] needs the rank at compile time, and runs a loop nest
//!   specialized for the rank and for the number of fused axes.
//!
//! [`ply()`] picks one of them, and [`early()`] is a variant of `ply_ravel()`
//! that stops at the first element that asks it to.

use std::convert::{Infallible};
use std::ops::{ControlFlow};

use smallvec::{SmallVec, smallvec};

use super::{DIM_ANY, INLINE_RANK, Error, Result};

/// A cursor over the innermost run of an [`ArrayIter`].
pub trait Flat {
    /// The amount by which the cursor moves per step. See
    /// [`ArrayIter::Stride`].
    type Stride: Copy;

    /// The value produced at each position.
    type Item;

    /// Move the cursor by `s`.
    fn step(&mut self, s: Self::Stride);

    /// Produce the value at the cursor.
    ///
    /// # Safety
    ///
    /// The cursor must be at a position inside the shape of the
    /// [`ArrayIter`] that made it. The traversal functions in this module
    /// guarantee that.
    unsafe fn get(&mut self) -> Self::Item;
}

/// An array iterator: something that can be walked by the traversal engine.
///
/// An `ArrayIter` has a current position, initially the origin. Axes beyond
/// [`rank()`] are allowed in every method: `size()` must return [`DIM_ANY`],
/// `stride()` must return a zero stride, and `adv()` must do nothing. This is
/// how operands of different ranks are frame-matched.
///
/// # Safety
///
/// The traversal functions call [`Flat::get()`] on cursors made by
/// [`flat()`] at every position inside the shape reported by `rank()` and
/// `size()`, starting from the position the `ArrayIter` had when it was
/// passed in. An implementation must make every such call sound. Positions
/// are only ever moved by [`adv()`], which is `unsafe` so that safe code
/// cannot hand the traversal functions an iterator that has left its
/// shape.
///
/// [`rank()`]: ArrayIter::rank()
/// [`flat()`]: ArrayIter::flat()
/// [`adv()`]: ArrayIter::adv()
///
/// ```compile_fail
/// use ravel::{View, ArrayIter, ply_ravel};
/// let data = [1, 2, 3, 90, 91, 92];
/// let v: View<_> = View::row_major(&data[..3], &[3]).unwrap();
/// let mut it = v.iter();
/// it.adv(0, 3);
/// ply_ravel(it, |_| ()).unwrap();
/// ```
pub unsafe trait ArrayIter {
    /// The step along one axis. This is `isize` for leaves and a tuple for
    /// expressions, which must step each of their leaves separately.
    type Stride: Copy;

    /// The cursor type returned by [`flat()`](ArrayIter::flat()).
    type Flat: Flat<Stride=Self::Stride>;

    /// The rank, if it is known at compile time.
    const RANK_S: Option<usize> = None;

    /// The total number of elements if it is known at compile time, or
    /// [`DIM_ANY`].
    const SIZE_S: isize = DIM_ANY;

    /// The number of axes.
    fn rank(&self) -> usize;

    /// The size of axis `k`.
    fn size(&self, k: usize) -> isize;

    /// The step of axis `k`.
    fn stride(&self, k: usize) -> Self::Stride;

    /// `true` if `step` steps along axis `z` move the position exactly as far
    /// as one step along axis `j`, i.e. if axis `j` can be fused with a run
    /// of `step` elements along axis `z`.
    fn keep_stride(&self, step: isize, z: usize, j: usize) -> bool;

    /// Move the position by `d` steps along axis `k`.
    ///
    /// # Safety
    ///
    /// The caller must only read cursors made at positions inside the shape
    /// reported by `size()`, measured from the original position, and must
    /// move the position back there before handing the iterator to anything
    /// else.
    unsafe fn adv(&mut self, k: usize, d: isize);

    /// Returns a cursor at the current position.
    fn flat(&self) -> Self::Flat;
}

/// The type of value produced by traversing an `A`.
pub type Item<A> = <<A as ArrayIter>::Flat as Flat>::Item;

/// Run `f` on `s` elements starting at the current position of `a`, `ss0`
/// apart.
#[inline(always)]
fn run<A: ArrayIter, R>(
    a: &A,
    s: isize,
    ss0: A::Stride,
    f: &mut impl FnMut(Item<A>) -> ControlFlow<R>,
) -> ControlFlow<R> {
    let mut p = a.flat();
    for _ in 0..s {
        // SAFETY: The caller has checked that the run is inside `a`.
        f(unsafe { p.get() })?;
        p.step(ss0);
    }
    ControlFlow::Continue(())
}

/// Check the sizes of all the axes of `a`.
///
/// Returns `false` if `a` is empty, and fails if any size is undefined.
fn check_sizes<A: ArrayIter>(a: &A) -> Result<bool> {
    if (0..a.rank()).any(|axis| a.size(axis) == 0) { return Ok(false); }
    match (0..a.rank()).find(|&axis| a.size(axis) < 0) {
        Some(axis) => Err(Error::UndefinedDim {axis}),
        None => Ok(true),
    }
}

/// The number of trailing axes of `a` that can be fused into one run, and
/// the length of that run. `a` must have nonzero rank.
fn ocd<A: ArrayIter>(a: &A) -> (usize, isize) {
    let rank = a.rank();
    let mut s = a.size(rank - 1);
    let mut j = 1;
    while j < rank && a.keep_stride(s, rank - 1, rank - 1 - j) {
        s *= a.size(rank - 1 - j);
        j += 1;
    }
    (j, s)
}

// ----------------------------------------------------------------------------

/// The common walk of [`ply_ravel()`] and [`early()`].
fn ply_ravel_exit<A: ArrayIter, R>(
    mut a: A,
    mut f: impl FnMut(Item<A>) -> ControlFlow<R>,
) -> Result<ControlFlow<R>> {
    let rank = a.rank();
    if rank == 0 {
        // SAFETY: A rank-0 iterator is at its only element.
        return Ok(f(unsafe { a.flat().get() }));
    }
    if !check_sizes(&a)? { return Ok(ControlFlow::Continue(())); }
    let (fused, ss) = ocd(&a);
    // The remaining axes, fastest-varying first, and their sizes.
    let outer: SmallVec<[(usize, isize); INLINE_RANK]> = (fused..rank).map(|i| {
        let axis = rank - 1 - i;
        (axis, a.size(axis))
    }).collect();
    let mut ind: SmallVec<[isize; INLINE_RANK]> = smallvec![0; outer.len()];
    tracing::trace!(rank, fused, run = ss, "ply_ravel");
    // All leaves advance along the innermost axis, whatever their strides.
    let ss0 = a.stride(rank - 1);
    loop {
        if let ControlFlow::Break(r) = run(&a, ss, ss0, &mut f) {
            return Ok(ControlFlow::Break(r));
        }
        let mut k = 0;
        loop {
            let Some(&(axis, size)) = outer.get(k) else { return Ok(ControlFlow::Continue(())); };
            if ind[k] < size - 1 {
                ind[k] += 1;
                // SAFETY: `ind` stays inside the shape.
                unsafe { a.adv(axis, 1) };
                break;
            }
            ind[k] = 0;
            // SAFETY: Back to index 0 along `axis`.
            unsafe { a.adv(axis, 1 - size) };
            k += 1;
        }
    }
}

/// Traverse `a`, calling `f` on every element.
///
/// The innermost axis varies fastest. Trailing axes whose strides show them
/// to be contiguous are fused into a single loop, so that e.g. a dense 3×4
/// view is walked as one run of 12 elements.
///
/// Returns immediately if any axis has size 0, and fails if any axis has an
/// undefined size, e.g. an axis added by [`Subscript::Insert`] that frame
/// matching did not resolve.
///
/// [`Subscript::Insert`]: super::Subscript::Insert
///
/// ```
/// use ravel::{Dim, View, ply_ravel};
/// let data = [1, 2, 3, 4, 5, 6];
/// let t = View::new(&data, [Dim::new(2, 1), Dim::new(3, 2)]).unwrap();
/// let mut seen = Vec::new();
/// ply_ravel(t.iter(), |x| seen.push(*x)).unwrap();
/// assert_eq!(seen, [1, 3, 5, 2, 4, 6]);
/// ```
pub fn ply_ravel<A: ArrayIter>(a: A, mut f: impl FnMut(Item<A>)) -> Result<()> {
    ply_ravel_exit(a, |x| { f(x); ControlFlow::<Infallible>::Continue(()) })?;
    Ok(())
}

// ----------------------------------------------------------------------------

/// A loop nest of length `LEN`, generated at compile time. `()` is the
/// innermost run; `(N,)` loops over one axis around `N`.
trait Nest {
    const LEN: usize;

    /// Run the nest over the last `LEN` axes of `a`, of which the last `RR`
    /// are fused into runs of `s` elements.
    fn subindex<A: ArrayIter, F: FnMut(Item<A>), const RR: usize>(
        a: &mut A,
        rank: usize,
        s: isize,
        ss0: A::Stride,
        f: &mut F,
    );
}

impl Nest for () {
    const LEN: usize = 1;

    #[inline(always)]
    fn subindex<A: ArrayIter, F: FnMut(Item<A>), const RR: usize>(
        a: &mut A,
        _: usize,
        s: isize,
        ss0: A::Stride,
        f: &mut F,
    ) {
        let _ = run(a, s, ss0, &mut |x| { f(x); ControlFlow::<Infallible>::Continue(()) });
    }
}

impl<N: Nest> Nest for (N,) {
    const LEN: usize = N::LEN + 1;

    #[inline(always)]
    fn subindex<A: ArrayIter, F: FnMut(Item<A>), const RR: usize>(
        a: &mut A,
        rank: usize,
        s: isize,
        ss0: A::Stride,
        f: &mut F,
    ) {
        if Self::LEN == RR {
            let _ = run(a, s, ss0, &mut |x| { f(x); ControlFlow::<Infallible>::Continue(()) });
            return;
        }
        let k = rank - Self::LEN;
        let size = a.size(k);
        for _ in 0..size {
            N::subindex::<A, F, RR>(a, rank, s, ss0, f);
            // SAFETY: Only read while inside the shape, and undone below.
            unsafe { a.adv(k, 1) };
        }
        // SAFETY: Back to the position on entry.
        unsafe { a.adv(k, -size) };
    }
}

type Nest1 = ();
type Nest2 = (Nest1,);
type Nest3 = (Nest2,);
type Nest4 = (Nest3,);
type Nest5 = (Nest4,);
type Nest6 = (Nest5,);

/// Convert the run-time ravel rank `j` into a compile-time one.
#[inline(always)]
fn until<N: Nest, A: ArrayIter, F: FnMut(Item<A>)>(
    j: usize,
    a: &mut A,
    rank: usize,
    s: isize,
    ss0: A::Stride,
    f: &mut F,
) {
    match j {
        1 => N::subindex::<A, F, 1>(a, rank, s, ss0, f),
        2 => N::subindex::<A, F, 2>(a, rank, s, ss0, f),
        3 => N::subindex::<A, F, 3>(a, rank, s, ss0, f),
        4 => N::subindex::<A, F, 4>(a, rank, s, ss0, f),
        5 => N::subindex::<A, F, 5>(a, rank, s, ss0, f),
        6 => N::subindex::<A, F, 6>(a, rank, s, ss0, f),
        _ => unreachable!("ravel rank {} exceeds rank {}", j, rank),
    }
}

/// Implemented by all `ArrayIter`s; evaluating `CHECK` fails to compile if
/// the rank is not static.
trait StaticRank: ArrayIter {
    const CHECK: ();
}

impl<A: ArrayIter> StaticRank for A {
    const CHECK: () = assert!(A::RANK_S.is_some(), "plyf() needs a static rank");
}

fn plyf_inner<A: ArrayIter, F: FnMut(Item<A>)>(mut a: A, mut f: F) -> Result<()> {
    let rank = a.rank();
    debug_assert!(A::RANK_S.map_or(true, |r| r == rank), "static rank {:?} but rank {}", A::RANK_S, rank);
    if rank == 0 {
        // SAFETY: A rank-0 iterator is at its only element.
        f(unsafe { a.flat().get() });
        return Ok(());
    }
    if !check_sizes(&a)? { return Ok(()); }
    let (j, s) = ocd(&a);
    let ss0 = a.stride(rank - 1);
    tracing::trace!(rank, fused = j, run = s, "plyf");
    let f = &mut f;
    match rank {
        1 => until::<Nest1, A, F>(j, &mut a, rank, s, ss0, f),
        2 => until::<Nest2, A, F>(j, &mut a, rank, s, ss0, f),
        3 => until::<Nest3, A, F>(j, &mut a, rank, s, ss0, f),
        4 => until::<Nest4, A, F>(j, &mut a, rank, s, ss0, f),
        5 => until::<Nest5, A, F>(j, &mut a, rank, s, ss0, f),
        6 => until::<Nest6, A, F>(j, &mut a, rank, s, ss0, f),
        _ => return ply_ravel(a, f),
    }
    Ok(())
}

/// Traverse `a`, whose rank must be known at compile time, calling `f` on
/// every element.
///
/// Visits the same elements in the same order as [`ply_ravel()`], but with a
/// loop nest chosen at compile time for each possible number of fused axes,
/// instead of an odometer. Ranks above 6 fall back to `ply_ravel()`.
///
/// ```
/// use ravel::{View, plyf};
/// let data = [1, 2, 3, 4, 5, 6];
/// let v: View<_, [ravel::Dim; 2]> = View::row_major(&data, &[3, 2]).unwrap();
/// let mut sum = 0;
/// plyf(v.iter(), |x| sum += x).unwrap();
/// assert_eq!(sum, 21);
/// ```
pub fn plyf<A: ArrayIter, F: FnMut(Item<A>)>(a: A, f: F) -> Result<()> {
    let () = <A as StaticRank>::CHECK;
    plyf_inner(a, f)
}

/// Traverse `a`, calling `f` on every element.
///
/// Uses [`plyf()`] if the number of elements of `a` is known at compile
/// time, and [`ply_ravel()`] otherwise.
pub fn ply<A: ArrayIter, F: FnMut(Item<A>)>(a: A, f: F) -> Result<()> {
    if A::SIZE_S != DIM_ANY && A::RANK_S.is_some() {
        plyf_inner(a, f)
    } else {
        ply_ravel(a, f)
    }
}

// ----------------------------------------------------------------------------

/// Traverse `a` until `f` returns [`ControlFlow::Break`], and return the
/// value it breaks with. Returns `default` if `f` never breaks.
///
/// ```
/// use std::ops::ControlFlow;
/// use ravel::{View, early};
/// let data = [1, 2, 3, 4, 5, 6];
/// let v: View<_> = View::row_major(&data, &[3, 2]).unwrap();
/// let mut visited = 0;
/// let found = early(v.iter(), None, |&x| {
///     visited += 1;
///     if x == 4 { ControlFlow::Break(Some(x)) } else { ControlFlow::Continue(()) }
/// });
/// assert_eq!(found, Ok(Some(4)));
/// assert_eq!(visited, 4);
/// ```
pub fn early<A: ArrayIter, R>(
    a: A,
    default: R,
    f: impl FnMut(Item<A>) -> ControlFlow<R>,
) -> Result<R> {
    Ok(match ply_ravel_exit(a, f)? {
        ControlFlow::Break(r) => r,
        ControlFlow::Continue(()) => default,
    })
}

/// `true` if `pred` holds for some element of `a`. Stops at the first one.
pub fn any<A: ArrayIter>(a: A, mut pred: impl FnMut(Item<A>) -> bool) -> Result<bool> {
    early(a, false, |x| if pred(x) { ControlFlow::Break(true) } else { ControlFlow::Continue(()) })
}

/// `true` if `pred` holds for every element of `a`. Stops at the first one
/// for which it does not.
pub fn every<A: ArrayIter>(a: A, mut pred: impl FnMut(Item<A>) -> bool) -> Result<bool> {
    early(a, true, |x| if pred(x) { ControlFlow::Continue(()) } else { ControlFlow::Break(false) })
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::{Cell};
    use std::rc::{Rc};

    use proptest::{proptest, prop_assert, prop_assert_eq};
    use proptest::strategy::{Just, Strategy};

    use super::*;
    use super::super::{Dim, DIM_BAD, View, Subscript, Scalar, zip};

    /// Wraps an `ArrayIter` and counts the calls to `flat()`, i.e. the number
    /// of innermost runs.
    struct Runs<A> {
        inner: A,
        runs: Rc<Cell<usize>>,
    }

    unsafe impl<A: ArrayIter> ArrayIter for Runs<A> {
        type Stride = A::Stride;
        type Flat = A::Flat;
        const RANK_S: Option<usize> = A::RANK_S;
        const SIZE_S: isize = A::SIZE_S;
        fn rank(&self) -> usize { self.inner.rank() }
        fn size(&self, k: usize) -> isize { self.inner.size(k) }
        fn stride(&self, k: usize) -> Self::Stride { self.inner.stride(k) }
        fn keep_stride(&self, step: isize, z: usize, j: usize) -> bool { self.inner.keep_stride(step, z, j) }
        unsafe fn adv(&mut self, k: usize, d: isize) { self.inner.adv(k, d) }
        fn flat(&self) -> Self::Flat {
            self.runs.set(self.runs.get() + 1);
            self.inner.flat()
        }
    }

    fn runs<A: ArrayIter>(inner: A) -> (Runs<A>, Rc<Cell<usize>>) {
        let runs = Rc::new(Cell::new(0));
        (Runs {inner, runs: runs.clone()}, runs)
    }

    fn offsets<T>(base: &[T], v: &View<'_, T, impl super::super::Shape>) -> Vec<isize> {
        let mut seen = Vec::new();
        ply_ravel(v.iter(), |x: &T| seen.push(unsafe { (x as *const T).offset_from(base.as_ptr()) })).unwrap();
        seen
    }

    #[test]
    fn dense_fuses_into_one_run() {
        let data: Vec<i32> = (0..12).collect();
        let v: View<_, [Dim; 2]> = View::row_major(&data, &[3, 4]).unwrap();
        assert_eq!(v.dims(), [Dim::new(3, 4), Dim::new(4, 1)]);
        let (it, count) = runs(v.iter());
        let mut seen = Vec::new();
        ply_ravel(it, |&x| seen.push(x)).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(seen, data);
        assert_eq!(offsets(&data, &v), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn transposed_does_not_fuse() {
        let data = [1, 2, 3, 4, 5, 6];
        let t = View::new(&data, vec![Dim::new(2, 1), Dim::new(3, 2)]).unwrap();
        let (it, count) = runs(t.iter());
        let mut seen = Vec::new();
        ply_ravel(it, |&x| seen.push(x)).unwrap();
        assert_eq!(seen, [1, 3, 5, 2, 4, 6]);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn row_major_order() {
        let data = [1, 2, 3, 4, 5, 6];
        let v: View<_> = View::new(&data, vec![Dim::new(3, 2), Dim::new(2, 1)]).unwrap();
        let mut seen = Vec::new();
        ply(v.iter(), |&x| seen.push(x)).unwrap();
        assert_eq!(seen, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn partial_fusion() {
        // Columns 1..3 of a 2×3×4 array. The last axis does not fuse with
        // the middle one, so each row is a separate run.
        let data: Vec<i32> = (0..24).collect();
        let v: View<_> = View::row_major(&data, &[2, 3, 4]).unwrap();
        let s = v.subview::<Vec<Dim>>(&[Subscript::ALL, Subscript::ALL, Subscript::Iota(super::super::iota(2, 1))]).unwrap();
        let (it, count) = runs(s.iter());
        let mut seen = Vec::new();
        ply_ravel(it, |&x| seen.push(x)).unwrap();
        assert_eq!(count.get(), 6);
        assert_eq!(seen, [1, 2, 5, 6, 9, 10, 13, 14, 17, 18, 21, 22]);
        // Whole rows of the same array fuse across the outer two axes.
        let rows = v.subview::<Vec<Dim>>(&[Subscript::Iota(super::super::iota(1, 1))]).unwrap();
        let (it, count) = runs(rows.iter());
        ply_ravel(it, |_| ()).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn empty_visits_nothing() {
        let data: [i32; 0] = [];
        let v: View<_> = View::row_major(&data, &[3, 0, 2]).unwrap();
        let mut visited = 0;
        ply_ravel(v.iter(), |_| visited += 1).unwrap();
        plyf(View::<_, [Dim; 3]>::row_major(&data, &[3, 0, 2]).unwrap().iter(), |_| visited += 1).unwrap();
        assert_eq!(visited, 0);
    }

    #[test]
    fn empty_checks_sizes_before_strides() {
        struct NoStrides;
        impl Flat for NoStrides {
            type Stride = isize;
            type Item = ();
            fn step(&mut self, _: isize) { panic!("step") }
            unsafe fn get(&mut self) { panic!("get") }
        }
        unsafe impl ArrayIter for NoStrides {
            type Stride = isize;
            type Flat = NoStrides;
            fn rank(&self) -> usize { 2 }
            fn size(&self, k: usize) -> isize { [5, 0][k] }
            fn stride(&self, _: usize) -> isize { panic!("stride") }
            fn keep_stride(&self, _: isize, _: usize, _: usize) -> bool { panic!("keep_stride") }
            unsafe fn adv(&mut self, _: usize, _: isize) { panic!("adv") }
            fn flat(&self) -> NoStrides { panic!("flat") }
        }
        assert_eq!(ply_ravel(NoStrides, |()| ()), Ok(()));
    }

    #[test]
    fn rank_zero() {
        let data = [7];
        let v: View<_, [Dim; 0]> = View::new(&data, []).unwrap();
        let mut seen = Vec::new();
        ply(v.iter(), |&x| seen.push(x)).unwrap();
        ply_ravel(v.iter(), |&x| seen.push(x)).unwrap();
        assert_eq!(seen, [7, 7]);
    }

    #[test]
    fn unresolved_insert_fails() {
        let data = [1, 2, 3];
        let v: View<_> = View::row_major(&data, &[3]).unwrap();
        let s = v.subview::<Vec<Dim>>(&[Subscript::Insert(1)]).unwrap();
        assert_eq!(s.dims()[0].size, DIM_BAD);
        assert_eq!(ply_ravel(s.iter(), |_| ()), Err(Error::UndefinedDim {axis: 0}));
    }

    #[test]
    fn early_stops() {
        let data = [1, 2, 3, 4, 5, 6];
        let v: View<_> = View::row_major(&data, &[3, 2]).unwrap();
        let mut visited = 0;
        let r = early(v.iter(), -1, |&x| {
            visited += 1;
            if x == 4 { ControlFlow::Break(x) } else { ControlFlow::Continue(()) }
        });
        assert_eq!((r, visited), (Ok(4), 4));
        let r = early(v.iter(), -1, |&x| if x == 9 { ControlFlow::Break(x) } else { ControlFlow::Continue(()) });
        assert_eq!(r, Ok(-1));
    }

    #[test]
    fn any_every() {
        let data = [2, 4, 6, 7];
        let v: View<_> = View::row_major(&data, &[2, 2]).unwrap();
        assert_eq!(any(v.iter(), |&x| x % 2 == 1), Ok(true));
        assert_eq!(every(v.iter(), |&x| x % 2 == 0), Ok(false));
        assert_eq!(every(v.iter(), |&x| x > 0), Ok(true));
        let empty: View<_> = View::row_major(&data, &[0]).unwrap();
        assert_eq!(any(empty.iter(), |_| true), Ok(false));
        assert_eq!(every(empty.iter(), |_| false), Ok(true));
    }

    #[test]
    fn scalar_uses_plyf() {
        assert_eq!(<Scalar<i32> as ArrayIter>::SIZE_S, 1);
        let mut seen = Vec::new();
        ply(Scalar(3), |x| seen.push(x)).unwrap();
        ply(zip(Scalar(1), Scalar('a')).unwrap(), |x| seen.push(x.0)).unwrap();
        assert_eq!(seen, [3, 1]);
    }

    // ------------------------------------------------------------------------

    /// A view over `0..n` with the given sizes and a permutation of the
    /// row-major strides, possibly reversed along some axes.
    fn arb_view() -> impl Strategy<Value=(Vec<isize>, Vec<usize>, Vec<bool>)> {
        (1usize..5).prop_flat_map(|rank| (
            proptest::collection::vec(0isize..4, rank),
            Just((0..rank).collect::<Vec<usize>>()).prop_shuffle(),
            proptest::collection::vec(proptest::bool::ANY, rank),
        ))
    }

    fn strided(sizes: &[isize], perm: &[usize], flip: &[bool]) -> (Vec<Dim>, isize) {
        // Dense strides in the order given by `perm`.
        let mut dims: Vec<Dim> = sizes.iter().map(|&size| Dim::new(size, 0)).collect();
        let mut next = 1;
        for &k in perm.iter().rev() {
            dims[k].stride = next;
            next *= sizes[k];
        }
        let mut offset = 0;
        for (dim, &f) in dims.iter_mut().zip(flip) {
            if f {
                offset += (dim.size - 1).max(0) * dim.stride;
                dim.stride = -dim.stride;
            }
        }
        (dims, offset)
    }

    proptest! {
        #[test]
        fn visits_each_element_once((sizes, perm, flip) in arb_view()) {
            let n: isize = sizes.iter().product();
            let data: Vec<usize> = (0..n as usize).collect();
            let (dims, offset) = strided(&sizes, &perm, &flip);
            let v = View::with_offset(&data, offset, dims).unwrap();
            let mut counts = vec![0; data.len()];
            ply_ravel(v.iter(), |&x| counts[x] += 1).unwrap();
            prop_assert!(counts.iter().all(|&c| c == 1));
        }

        #[test]
        fn strategies_agree((sizes, perm, flip) in arb_view()) {
            let n: isize = sizes.iter().product();
            let data: Vec<usize> = (0..n as usize).collect();
            let (dims, offset) = strided(&sizes, &perm, &flip);
            let v = View::with_offset(&data, offset, dims).unwrap();
            let mut ravel = Vec::new();
            ply_ravel(v.iter(), |&x| ravel.push(x)).unwrap();
            let mut by_index = Vec::new();
            let mut index = vec![0; sizes.len()];
            if n > 0 {
                'odometer: loop {
                    by_index.push(*v.get(&index).unwrap());
                    for k in (0..index.len()).rev() {
                        index[k] += 1;
                        if index[k] < sizes[k] { continue 'odometer; }
                        index[k] = 0;
                    }
                    break;
                }
            }
            prop_assert_eq!(&ravel, &by_index);
            macro_rules! check_plyf {
                ($r:literal) => {
                    if sizes.len() == $r {
                        let fixed: View<_, [Dim; $r]> = v.clone().into_rank().unwrap();
                        let mut nested = Vec::new();
                        plyf(fixed.iter(), |&x| nested.push(x)).unwrap();
                        prop_assert_eq!(&ravel, &nested);
                    }
                };
            }
            check_plyf!(1);
            check_plyf!(2);
            check_plyf!(3);
            check_plyf!(4);
        }
    }
}
