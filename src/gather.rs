//! [`Gather`]: subscripting with arbitrary index lists.
//!
//! A list subscript ([`Subscript::Indices`]) cannot be expressed as a dope
//! vector, so instead of producing a new view it produces an array iterator
//! that looks each position up as it goes.

use std::marker::{PhantomData};

use smallvec::{SmallVec};

use super::{Dim, DIM_ANY, DIM_BAD, INLINE_RANK, Error, Result, Subscript, ArrayIter, Flat};
use super::index::{inside};
use super::select::{check_iota};

/// How one output axis of a [`Gather`] picks source positions.
#[derive(Debug, Copy, Clone)]
enum Pick<'i> {
    /// `start + i * step`.
    Linear {start: isize, step: isize},

    /// `list[i]`.
    List(&'i [isize]),

    /// An inserted axis, which reads nothing.
    Inserted,
}

/// One output axis of a [`Gather`].
#[derive(Debug, Copy, Clone)]
struct Axis<'i> {
    pick: Pick<'i>,
    size: isize,

    /// The stride of the source axis.
    stride: isize,

    /// The current position.
    pos: isize,
}

impl<'i> Axis<'i> {
    const INSERTED: Self = Self {pick: Pick::Inserted, size: DIM_BAD, stride: 0, pos: 0};

    fn linear(dim: Dim, start: isize, step: isize, size: isize) -> Self {
        if dim.is_inserted() { return Self::INSERTED; }
        Self {pick: Pick::Linear {start, step}, size, stride: dim.stride, pos: 0}
    }

    /// The source offset of position `pos`. Positions outside the axis give
    /// unspecified offsets.
    #[inline(always)]
    fn offset(&self, pos: isize) -> isize {
        match self.pick {
            Pick::Linear {start, step} => self.stride.wrapping_mul(start.wrapping_add(pos.wrapping_mul(step))),
            Pick::List(list) => usize::try_from(pos).ok()
                .and_then(|pos| list.get(pos))
                .map_or(0, |&i| self.stride * i),
            Pick::Inserted => 0,
        }
    }
}

/// An array iterator over elements of a view picked by a list of
/// subscripts of any kind.
///
/// Each [`Subscript::Iota`], [`Subscript::Dots`] axis or
/// [`Subscript::Indices`] contributes one output axis, and the result is
/// their outer product: the element at `[i, j]` of `v.gather(&[Indices(a),
/// Indices(b)])` is the element at `[a[i], b[j]]` of `v`.
///
/// Axes of a `Gather` are never fused.
pub struct Gather<'a, 'i, T> {
    ptr: *const T,
    axes: SmallVec<[Axis<'i>; INLINE_RANK]>,
    marker: PhantomData<&'a T>,
}

impl<'a, 'i, T> Gather<'a, 'i, T> {
    /// Resolve `subs` against the view at `ptr` with dope vector `dims`.
    ///
    /// # Safety
    ///
    /// `ptr` and `dims` must describe a valid view.
    pub(crate) unsafe fn new(ptr: *const T, dims: &[Dim], subs: &[Subscript<'i>]) -> Result<Self> {
        let consumed: usize = subs.iter().map(Subscript::skip_src).sum();
        if consumed > dims.len() {
            return Err(Error::TooManyIndices {got: consumed, rank: dims.len()});
        }
        let mut base = 0;
        let mut axes = SmallVec::new();
        let mut k = 0;
        for &sub in subs {
            match sub {
                Subscript::Index(i) => {
                    let dim = dims[k];
                    if !inside(i, dim.size) { return Err(Error::OutOfBounds {axis: k, index: i, size: dim.size}); }
                    base += dim.stride * i;
                },
                Subscript::Iota(iota) => {
                    check_iota(k, iota, dims[k].size)?;
                    axes.push(Axis::linear(dims[k], iota.start, iota.step, iota.size));
                },
                Subscript::Dots(n) => {
                    axes.extend(dims[k..k + n].iter().map(|&dim| Axis::linear(dim, 0, 1, dim.size)));
                },
                Subscript::Insert(n) => {
                    axes.extend(std::iter::repeat(Axis::INSERTED).take(n));
                },
                Subscript::Indices(list) => {
                    let dim = dims[k];
                    if let Some(&index) = list.iter().find(|&&i| !inside(i, dim.size)) {
                        return Err(Error::OutOfBounds {axis: k, index, size: dim.size});
                    }
                    axes.push(Axis {pick: Pick::List(list), size: list.len() as isize, stride: dim.stride, pos: 0});
                },
            }
            k += sub.skip_src();
        }
        axes.extend(dims[k..].iter().map(|&dim| Axis::linear(dim, 0, 1, dim.size)));
        tracing::trace!(rank = axes.len(), lists = subs.iter().filter(|s| !s.is_beatable()).count(), "gather");
        Ok(Self {ptr: ptr.wrapping_offset(base), axes, marker: PhantomData})
    }

    /// The sizes of the output axes.
    pub fn sizes(&self) -> impl Iterator<Item=isize> + '_ { self.axes.iter().map(|axis| axis.size) }
}

impl<'a, 'i, T> Clone for Gather<'a, 'i, T> {
    fn clone(&self) -> Self { Self {ptr: self.ptr, axes: self.axes.clone(), marker: PhantomData} }
}

/// The cursor of a [`Gather`]. It steps along the last axis.
pub struct GatherFlat<'a, 'i, T> {
    ptr: *const T,
    axis: Axis<'i>,
    marker: PhantomData<&'a T>,
}

impl<'a, 'i, T> Flat for GatherFlat<'a, 'i, T> {
    type Stride = isize;
    type Item = &'a T;
    #[inline(always)]
    fn step(&mut self, s: isize) { self.axis.pos += s; }
    #[inline(always)]
    unsafe fn get(&mut self) -> &'a T { &*self.ptr.wrapping_offset(self.axis.offset(self.axis.pos)) }
}

// SAFETY: `new()` checked every subscript against the view.
unsafe impl<'a, 'i, T> ArrayIter for Gather<'a, 'i, T> {
    type Stride = isize;
    type Flat = GatherFlat<'a, 'i, T>;

    fn rank(&self) -> usize { self.axes.len() }
    fn size(&self, k: usize) -> isize { self.axes.get(k).map_or(DIM_ANY, |axis| axis.size) }
    fn stride(&self, k: usize) -> isize {
        match self.axes.get(k) {
            Some(axis) if !matches!(axis.pick, Pick::Inserted) => 1,
            _ => 0,
        }
    }
    fn keep_stride(&self, _: isize, _: usize, _: usize) -> bool { false }
    unsafe fn adv(&mut self, k: usize, d: isize) {
        let step = self.stride(k) * d;
        if let Some(axis) = self.axes.get_mut(k) { axis.pos += step; }
    }
    fn flat(&self) -> Self::Flat {
        let Some((&last, outer)) = self.axes.split_last() else {
            return GatherFlat {ptr: self.ptr, axis: Axis::INSERTED, marker: PhantomData};
        };
        let base: isize = outer.iter().map(|axis| axis.offset(axis.pos)).sum();
        GatherFlat {ptr: self.ptr.wrapping_offset(base), axis: last, marker: PhantomData}
    }
}

// ----------------------------------------------------------------------------
