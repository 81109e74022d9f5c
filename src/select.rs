//! Subscript selection: from a list of [`Subscript`]s and a dope vector, to
//! a base offset and a new dope vector.
//!
//! Subscripts are matched left to right against the source axes. Every kind
//! except [`Subscript::Indices`] is *beatable*: it can be resolved purely by
//! adjusting the offset and the dope vector, in O(1) and without copying.
//! `Indices` must instead be lowered to a [`Gather`] and evaluated by the
//! traversal engine.
//!
//! [`Gather`]: super::Gather

use super::{Dim, DimBuf, Error, Iota, Result};
use super::index::{inside};

/// One entry of a subscript list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Subscript<'i> {
    /// Select one position; removes the axis.
    Index(isize),

    /// Select `size` positions starting at `start`, `step` apart; keeps the
    /// axis with size `size`.
    Iota(Iota),

    /// Keep this many axes as they are.
    Dots(usize),

    /// Add this many placeholder axes, consuming no source axis.
    ///
    /// A placeholder has size [`DIM_BAD`] and stride 0. It must be given a
    /// size by frame matching against another operand before it is
    /// traversed; otherwise the traversal fails.
    ///
    /// [`DIM_BAD`]: super::DIM_BAD
    Insert(usize),

    /// Select an arbitrary list of positions. Not beatable.
    Indices(&'i [isize]),
}

impl<'i> Subscript<'i> {
    /// Keep one axis as it is.
    pub const ALL: Self = Subscript::Dots(1);

    /// `true` if this subscript can be resolved by [`select()`].
    pub fn is_beatable(&self) -> bool { !matches!(self, Subscript::Indices(_)) }

    /// The number of source axes consumed.
    pub fn skip_src(&self) -> usize {
        match *self {
            Subscript::Index(_) | Subscript::Iota(_) | Subscript::Indices(_) => 1,
            Subscript::Dots(n) => n,
            Subscript::Insert(_) => 0,
        }
    }

    /// The number of output axes produced.
    pub fn skip(&self) -> usize {
        match *self {
            Subscript::Index(_) => 0,
            Subscript::Iota(_) | Subscript::Indices(_) => 1,
            Subscript::Dots(n) | Subscript::Insert(n) => n,
        }
    }
}

impl From<isize> for Subscript<'_> {
    fn from(i: isize) -> Self { Subscript::Index(i) }
}

impl From<Iota> for Subscript<'_> {
    fn from(i: Iota) -> Self { Subscript::Iota(i) }
}

impl<'i> From<&'i [isize]> for Subscript<'i> {
    fn from(i: &'i [isize]) -> Self { Subscript::Indices(i) }
}

// ----------------------------------------------------------------------------

/// Check that `iota` lies within an axis of size `size`.
///
/// Both ends must be inside; an empty slice may also start at `size`.
pub(crate) fn check_iota(axis: usize, iota: Iota, size: isize) -> Result<()> {
    let ok = if iota.size > 0 {
        inside(iota.start, size) && inside(iota.start + (iota.size - 1) * iota.step, size)
    } else {
        iota.size == 0 && 0 <= iota.start && iota.start <= size
    };
    if ok { return Ok(()); }
    if iota.size < 0 { return Err(Error::BadSize {axis, size: iota.size}); }
    Err(Error::SliceOutOfBounds {axis, start: iota.start, len: iota.size, step: iota.step, size})
}

/// Resolve the beatable subscript `sub` against `src`, the source axes from
/// the current position onwards, writing output axes to `out`.
///
/// Returns the offset contribution.
fn select_one(out: &mut DimBuf, axis: usize, src: &[Dim], sub: Subscript<'_>) -> Result<isize> {
    match sub {
        Subscript::Index(i) => {
            let dim = src[0];
            if !inside(i, dim.size) { return Err(Error::OutOfBounds {axis, index: i, size: dim.size}); }
            Ok(dim.stride * i)
        },
        Subscript::Iota(iota) => {
            let dim = src[0];
            check_iota(axis, iota, dim.size)?;
            out.push(Dim::new(iota.size, dim.stride * iota.step));
            Ok(dim.stride * iota.start)
        },
        Subscript::Dots(n) => {
            out.extend_from_slice(&src[..n]);
            Ok(0)
        },
        Subscript::Insert(n) => {
            out.extend(std::iter::repeat(Dim::inserted()).take(n));
            Ok(0)
        },
        Subscript::Indices(_) => unreachable!("select_one() called with an unbeatable subscript"),
    }
}

/// Resolve `subs` against the dope vector `src`.
///
/// Returns the base offset and the dope vector of the result. Source axes not
/// consumed by `subs` are copied through unchanged.
///
/// ```
/// use ravel::{Dim, Subscript, select_loop, iota};
/// let src = [Dim::new(3, 4), Dim::new(4, 1)];
/// let (offset, dims) = select_loop(&src, &[Subscript::Iota(iota(2, 1)), Subscript::Index(3)]).unwrap();
/// assert_eq!(offset, 7);
/// assert_eq!(&dims[..], [Dim::new(2, 4)]);
/// ```
pub fn select_loop(src: &[Dim], subs: &[Subscript<'_>]) -> Result<(isize, DimBuf)> {
    let consumed: usize = subs.iter().map(Subscript::skip_src).sum();
    if consumed > src.len() {
        return Err(Error::TooManyIndices {got: consumed, rank: src.len()});
    }
    if let Some(position) = subs.iter().position(|s| !s.is_beatable()) {
        return Err(Error::NotBeatable {position});
    }
    let mut out = DimBuf::new();
    let mut offset = 0;
    let mut axis = 0;
    for &sub in subs {
        offset += select_one(&mut out, axis, &src[axis..], sub)?;
        axis += sub.skip_src();
    }
    out.extend_from_slice(&src[axis..]);
    Ok((offset, out))
}

/// Resolve a single subscript against `src`; shorthand for
/// `select_loop(src, &[sub])`.
pub fn select(src: &[Dim], sub: Subscript<'_>) -> Result<(isize, DimBuf)> {
    select_loop(src, &[sub])
}

// ----------------------------------------------------------------------------
