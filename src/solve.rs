//! Forward/backward substitution against a [`BlockedFactor`] (spec.md §4.5,
//! "Solve").
//!
//! The factor never assembles `L`/`U` as global sparse matrices — every block
//! keeps its own dense panels, and row/column identity is carried by the
//! *original* matrix indices stored in `pivot_rows`/`pivot_cols`/
//! `non_pivot_rows`/`non_pivot_cols`. That means the forward and backward
//! passes can gather and scatter straight into an `n`-row working buffer
//! indexed by those original ids, with no separate permutation vector to
//! build or apply.

use problemo::ProblemResult;

use crate::dense;
use crate::error::Error;
use crate::numeric::BlockedFactor;
use crate::E;

/// Solves `A x = b` against the blocked factor `factor` of `A`, writing the
/// result into `x`. `b` and `x` may each carry multiple right-hand sides
/// (columns). Fails with [`Error::PoisonedFactor`] if any block of `factor`
/// recorded a numeric failure during factorization.
pub fn solve(
    factor: &BlockedFactor,
    b: faer::MatRef<'_, E>,
    mut x: faer::MatMut<'_, E>,
) -> ProblemResult<()> {
    if !factor.is_valid() {
        return Err(Error::PoisonedFactor.into());
    }

    let n = factor.n;
    let nrhs = b.ncols();
    debug_assert_eq!(b.nrows(), n);
    debug_assert_eq!(x.nrows(), n);
    debug_assert_eq!(x.ncols(), nrhs);

    // `y` doubles as both the forward pass's running right-hand side and, for
    // each block's pivot rows, the intermediate `L1^-1 . b_block` the
    // backward pass reads back out (spec.md §4.5: "the forward pass leaves
    // its per-block solution in place for the backward pass to consume").
    let mut y = faer::Mat::<E>::from_fn(n, nrhs, |i, j| b.read(i, j));

    for block in &factor.blocks {
        let mut z = gather(y.as_ref(), &block.pivot_rows, nrhs);
        dense::solve_unit_lower_in_place(block.lu1.as_ref(), z.as_mut());
        scatter(y.as_mut(), &block.pivot_rows, z.as_ref());

        if !block.non_pivot_rows.is_empty() {
            let mut tail = gather(y.as_ref(), &block.non_pivot_rows, nrhs);
            dense::rank_k_update_a_b(tail.as_mut(), block.l2.as_ref(), z.as_ref());
            scatter(y.as_mut(), &block.non_pivot_rows, tail.as_ref());
        }
    }

    let mut xbuf = faer::Mat::<E>::zeros(n, nrhs);
    for block in factor.blocks.iter().rev() {
        let mut rhs = gather(y.as_ref(), &block.pivot_rows, nrhs);
        if !block.non_pivot_cols.is_empty() {
            let tail = gather(xbuf.as_ref(), &block.non_pivot_cols, nrhs);
            dense::rank_k_update_at_b(rhs.as_mut(), block.ut2.as_ref(), tail.as_ref());
        }
        dense::solve_upper_in_place(block.lu1.as_ref(), rhs.as_mut());
        scatter(xbuf.as_mut(), &block.pivot_cols, rhs.as_ref());
    }

    for i in 0..n {
        for j in 0..nrhs {
            x.write(i, j, xbuf.read(i, j));
        }
    }
    Ok(())
}

fn gather(src: faer::MatRef<'_, E>, ids: &[usize], nrhs: usize) -> faer::Mat<E> {
    faer::Mat::from_fn(ids.len(), nrhs, |i, j| src.read(ids[i], j))
}

fn scatter(mut dest: faer::MatMut<'_, E>, ids: &[usize], src: faer::MatRef<'_, E>) {
    for (i, &id) in ids.iter().enumerate() {
        for j in 0..src.ncols() {
            dest.write(id, j, src.read(i, j));
        }
    }
}
