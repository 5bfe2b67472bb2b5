//! Unsymmetric multifrontal LU factorization with threshold partial pivoting.
//!
//! Given a sparse square matrix `A` in compressed-column form and a user-supplied
//! column preordering, [`symbolic_factor`] computes the column elimination tree,
//! supercolumn structure, and fill estimates; [`numeric_factor`] walks that tree
//! (sequentially or task-parallel) assembling and factoring dense frontal matrices;
//! [`solve`] runs forward/back substitution over the resulting [`BlockedFactor`].
//!
//! ```
//! use faer::sparse::{SparseColMat, Triplet};
//! use frontal_lu::{Config, numeric_factor, solve, symbolic_factor};
//!
//! let n = 3;
//! let triplets = vec![
//!     Triplet::new(0, 0, 4.0),
//!     Triplet::new(1, 0, -1.0),
//!     Triplet::new(0, 1, -1.0),
//!     Triplet::new(1, 1, 4.0),
//!     Triplet::new(2, 1, -1.0),
//!     Triplet::new(1, 2, -1.0),
//!     Triplet::new(2, 2, 4.0),
//! ];
//! let a = SparseColMat::try_new_from_triplets(n, n, &triplets).unwrap();
//!
//! let config = Config::default();
//! let column_order: Vec<usize> = (0..n).collect();
//! let symbolic = symbolic_factor(a.as_ref(), &column_order, &config).unwrap();
//! let factor = numeric_factor(a.as_ref(), &symbolic, 1.0, 0, 1, &config).unwrap();
//!
//! let b = faer::Mat::from_fn(n, 1, |i, _| (i + 1) as f64);
//! let mut x = faer::Mat::zeros(n, 1);
//! solve(&factor, b.as_ref(), x.as_mut()).unwrap();
//! ```

use faer::Index;
use faer::traits::ComplexField;

/// Scalar element bound for this crate's kernels: `faer`'s full complex-field
/// arithmetic (add/sub/mul/div/zero/one/conjugate) plus the absolute-value
/// ordering threshold pivoting needs via `Self::Real: PartialOrd`.
pub trait ElementType: ComplexField {}
impl<T> ElementType for T where T: ComplexField {}

/// Sparse index bound, matching `faer::Index`.
pub trait IndexType: Copy + PartialEq + Eq + Ord + Index {}
impl<T> IndexType for T where T: Copy + PartialEq + Eq + Ord + Index {}

/// This crate's scalar and index types. `faer`'s preprocessor-per-type
/// instantiation (spec.md §9, "Dynamic dispatch / generics") becomes, in Rust,
/// monomorphization over a generic parameter; in practice every module below is
/// written against these two concrete aliases, the same way `copters::linalg::lu`
/// and `copters::linalg::cholesky` write against the crate-root `E`/`I` aliases
/// rather than threading bounds through every function. See `DESIGN.md`.
pub type E = f64;
pub type I = usize;

pub mod config;
pub mod contribution;
pub mod convert;
pub mod dense;
pub mod error;
pub mod factorblock;
pub mod numeric;
pub mod rowset;
pub mod scope;
pub mod solve;
pub mod symbolic;
pub mod unionfind;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use contribution::ContributionBlock;
pub use convert::blocked_to_global;
pub use error::Error;
pub use factorblock::FactorBlock;
pub use numeric::{BlockedFactor, numeric_factor};
pub use solve::solve;
pub use symbolic::{Symbolic, symbolic_factor};
