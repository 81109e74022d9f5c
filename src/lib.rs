//! A pure-Rust library of rank-polymorphic strided views over memory, and an
//! engine that traverses them with fused loops.
//!
//! A [`View`] is a dope vector (a list of [`Dim`]s, each a size and a stride)
//! and a pointer into a borrowed slice. It never copies its data. Its rank is
//! either fixed at compile time (`View<T, [Dim; R]>`) or chosen at run time
//! (`View<T, Vec<Dim>>`); the two forms have the same API. [`ViewMut`] is the
//! writable counterpart, and [`Array`] owns its storage and hands out views.
//!
//! Views are subscripted with lists of [`Subscript`]s. Integers, slices
//! ([`Iota`]), ellipses and inserted axes are resolved by dope-vector
//! arithmetic alone, giving a new view. Integer lists are not, and instead
//! give a [`Gather`].
//!
//! Everything that can be traversed implements [`ArrayIter`]: the element
//! iterators of views ([`CellIter`]), [`Iota`], [`Gather`], and expression
//! nodes such as [`Zip`], [`Map`] and [`Scalar`]. The traversal functions
//! [`ply()`], [`ply_ravel()`], [`plyf()`] and [`early()`] walk an `ArrayIter`
//! in row-major order, fusing axes that are contiguous in memory into a
//! single loop.
//!
//! ```
//! use ravel::{Dim, View, ViewMut, Subscript, iota, ply};
//! let data = [1, 2, 3, 4, 5, 6];
//! let v: View<_> = View::row_major(&data, &[3, 2]).unwrap();
//! let t = View::new(&data, [Dim::new(2, 1), Dim::new(3, 2)]).unwrap();
//! assert_eq!(t.to_vec(), Ok(vec![1, 3, 5, 2, 4, 6]));
//!
//! let mut out = [0; 6];
//! let mut w: ViewMut<_> = ViewMut::row_major(&mut out, &[3, 2]).unwrap();
//! w.assign(v.iter()).unwrap();
//! w.subview_mut::<Vec<Dim>>(&[Subscript::Iota(iota(2, 1))]).unwrap().mul_assign(v.at(&[0]).unwrap().iter()).unwrap();
//! assert_eq!(out, [1, 2, 3, 4, 10, 12]);
//!
//! let mut total = 0;
//! ply(v.iter(), |x| total += x).unwrap();
//! assert_eq!(total, 21);
//! ```

mod error;
pub use error::{Error, Result};

mod dim;
pub use dim::{Dim, DIM_ANY, DIM_BAD, INLINE_RANK, DimBuf, Shape, Dims, filldim, proddim, row_major, is_c_order};

mod index;
pub use index::{index_p, index_short, Iota, iota, IotaFlat};

mod select;
pub use select::{Subscript, select, select_loop};

mod ply;
pub use ply::{Flat, ArrayIter, Item, ply_ravel, plyf, ply, early, any, every};

mod cell;
pub use cell::{Atom, Cells, CellIter, Ptr, CellFlat};

mod view;
pub use view::{View, ViewMut};

mod elements;
pub use elements::{Elements};

mod gather;
pub use gather::{Gather, GatherFlat};

mod broadcast;
pub use broadcast::{Zip, ZipFlat, zip, Scalar, Map, MapFlat};

pub mod ops;
pub use ops::{Update, Assign, AddAssign, SubAssign, MulAssign, DivAssign};

mod array;
pub use array::{Storage, Growable, Array};
