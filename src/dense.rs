//! Dense block kernels used by the numeric multifrontal driver.
//!
//! Spec.md's §6 "dense kernels expected" are modeled here as free functions over
//! `faer::{Mat, MatMut, MatRef}`, monomorphized over this crate's `E` (see
//! `DESIGN.md` for why this crate writes against the concrete alias rather than a
//! generic bound). `faer` does not expose a rank-deficient / non-square
//! partial-pivot-with-threshold LU directly — its own `partial_pivoting` solve
//! module (see `other_examples`) assumes a square, already-factored matrix — so
//! that kernel is genuinely new code here, grounded on the pivoting shape of that
//! module. The triangular solve and rank-k update kernels are written directly
//! against `MatMut`/`MatRef`'s `read`/`write` accessors for the same reason: the
//! free-function surface of `faer::linalg::{matmul, triangular_solve}` is a
//! moving target across `faer` releases, while `read`/`write` are stable across
//! all of them and every teacher module (`copters::linalg::lu`, `cholesky`) relies
//! on them for exactly this kind of scalar-level work.

use faer::{MatMut, MatRef};

use crate::E;

/// Rectangular LU with threshold partial pivoting and a Markowitz-style
/// (minimum row degree) tie-break, per spec.md §4.4's "Dense LU of the
/// L-portion".
///
/// `a` is `l x col_b` with `l >= col_b`; eliminates all `col_b` columns in place.
/// At each step the pivot row is the one of maximum modulus among the remaining
/// candidates; any row within `thresh` of that maximum is an acceptable pivot
/// (threshold pivoting), and among those the one with the smallest `degree` is
/// preferred. `thresh == 1.0` disables the secondary criterion (only the maximum
/// modulus row is ever an acceptable candidate, matching spec.md's "when
/// `thresh == 1` the degree array is unused").
///
/// On success, `a`'s first `col_b` rows hold `LU1` (unit lower triangle in the
/// strict lower part, `U` in the upper triangle including the diagonal) and the
/// remaining `l - col_b` rows hold `L2`'s multipliers. Returns the pivot row
/// permutation (`pivot_rows[k]` is the original row index now at position `k`).
///
/// Returns `Err(k)` if the matrix is structurally or numerically singular: every
/// candidate at step `k` was exactly zero. Per spec.md §9's resolution of the
/// "null columns" open question, this is surfaced as `Error::NumericFailure`
/// rather than silently inserting a unit pivot.
pub fn lu_threshold_partial_pivot(
    mut a: MatMut<'_, E>,
    thresh: f64,
    degree: &mut [usize],
) -> Result<Vec<usize>, usize> {
    let l = a.nrows();
    let col_b = a.ncols();
    debug_assert!(l >= col_b);
    debug_assert_eq!(degree.len(), l);

    let mut perm: Vec<usize> = (0..l).collect();

    for k in 0..col_b {
        let mut best = k;
        let mut best_abs = a.read(k, k).abs();
        for i in (k + 1)..l {
            let v = a.read(i, k).abs();
            if v > best_abs {
                best_abs = v;
                best = i;
            }
        }

        if best_abs == 0.0 {
            return Err(k);
        }

        if thresh < 1.0 {
            let accept = thresh * best_abs;
            let mut chosen = best;
            let mut chosen_degree = degree[best];
            for i in k..l {
                let v = a.read(i, k).abs();
                if v >= accept && degree[i] < chosen_degree {
                    chosen = i;
                    chosen_degree = degree[i];
                }
            }
            best = chosen;
        }

        if best != k {
            swap_rows(&mut a, k, best);
            perm.swap(k, best);
            degree.swap(k, best);
        }

        let pivot = a.read(k, k);
        for i in (k + 1)..l {
            let factor = a.read(i, k) / pivot;
            a.write(i, k, factor);
            for j in (k + 1)..col_b {
                let v = a.read(i, j) - factor * a.read(k, j);
                a.write(i, j, v);
            }
        }
    }

    Ok(perm)
}

/// Swaps rows `i` and `j` of `a` — spec.md §6's `SwapLines` primitive.
pub fn swap_rows(a: &mut MatMut<'_, E>, i: usize, j: usize) {
    if i == j {
        return;
    }
    for col in 0..a.ncols() {
        let tmp = a.read(i, col);
        a.write(i, col, a.read(j, col));
        a.write(j, col, tmp);
    }
}

/// Unit-lower-triangular solve from the left, applied to every row of `rhs` as an
/// independent right-hand side stored transposed: `rhs[i, :] <- rhs[i, :] . L^-T`.
///
/// This is spec.md §4.4's "Triangular solve on U" (`Ut2 <- L1^-1 . Ut2`): `Ut2` is
/// stored as `U^T` (rows = non-pivot columns, columns = pivot rows), so the
/// left-solve on `U`'s un-transposed form becomes, row-by-row, a right-solve
/// against `L^T` here. `l` is `n x n` unit lower triangular (diagonal assumed 1,
/// never read).
pub fn solve_unit_lower_transposed_rhs(l: MatRef<'_, E>, mut rhs: MatMut<'_, E>) {
    let n = l.nrows();
    debug_assert_eq!(l.ncols(), n);
    debug_assert_eq!(rhs.ncols(), n);

    for k in 0..n {
        for i in 0..rhs.nrows() {
            let mut acc = rhs.read(i, k);
            for j in 0..k {
                acc -= rhs.read(i, j) * l.read(k, j);
            }
            rhs.write(i, k, acc);
        }
    }
}

/// Unit-lower-triangular solve from the left for a single right-hand-side block:
/// `x <- L^-1 . b` where `l` is `n x n` unit lower triangular. Used by the solve
/// driver's forward substitution.
pub fn solve_unit_lower_in_place(l: MatRef<'_, E>, mut x: MatMut<'_, E>) {
    let n = l.nrows();
    for k in 0..n {
        for col in 0..x.ncols() {
            let mut acc = x.read(k, col);
            for j in 0..k {
                acc -= l.read(k, j) * x.read(j, col);
            }
            x.write(k, col, acc);
        }
    }
}

/// Upper-triangular solve from the left (diagonal not assumed to be 1):
/// `x <- U^-1 . b` where `u` is `n x n` upper triangular. Used by the solve
/// driver's back substitution.
pub fn solve_upper_in_place(u: MatRef<'_, E>, mut x: MatMut<'_, E>) {
    let n = u.nrows();
    for kk in 0..n {
        let k = n - 1 - kk;
        for col in 0..x.ncols() {
            let mut acc = x.read(k, col);
            for j in (k + 1)..n {
                acc -= u.read(k, j) * x.read(j, col);
            }
            x.write(k, col, acc / u.read(k, k));
        }
    }
}

/// `c <- c - a . b^T`. Used to build a new contribution block's values from the
/// front's `L2` and `Ut2` panels (spec.md §4.4, "Build contribution block").
pub fn rank_k_update_a_bt(mut c: MatMut<'_, E>, a: MatRef<'_, E>, b: MatRef<'_, E>) {
    debug_assert_eq!(c.nrows(), a.nrows());
    debug_assert_eq!(c.ncols(), b.nrows());
    debug_assert_eq!(a.ncols(), b.ncols());
    for i in 0..c.nrows() {
        for j in 0..c.ncols() {
            let mut acc = c.read(i, j);
            for k in 0..a.ncols() {
                acc -= a.read(i, k) * b.read(j, k);
            }
            c.write(i, j, acc);
        }
    }
}

/// `c <- c - a . b`. Used by the solve driver's forward substitution
/// (spec.md §4.5, `T <- T - L2 . X_block`) and listed among spec.md §6's
/// three expected rank-k updates.
pub fn rank_k_update_a_b(mut c: MatMut<'_, E>, a: MatRef<'_, E>, b: MatRef<'_, E>) {
    debug_assert_eq!(c.nrows(), a.nrows());
    debug_assert_eq!(c.ncols(), b.ncols());
    debug_assert_eq!(a.ncols(), b.nrows());
    for i in 0..c.nrows() {
        for j in 0..c.ncols() {
            let mut acc = c.read(i, j);
            for k in 0..a.ncols() {
                acc -= a.read(i, k) * b.read(k, j);
            }
            c.write(i, j, acc);
        }
    }
}

/// `c <- c - a^T . b`. Used by the solve driver's backward substitution
/// (spec.md §4.5, `B_block <- B_block - Ut2^T . T`) and listed among
/// spec.md §6's three expected rank-k updates.
pub fn rank_k_update_at_b(mut c: MatMut<'_, E>, a: MatRef<'_, E>, b: MatRef<'_, E>) {
    debug_assert_eq!(c.nrows(), a.ncols());
    debug_assert_eq!(c.ncols(), b.ncols());
    debug_assert_eq!(a.nrows(), b.nrows());
    for i in 0..c.nrows() {
        for j in 0..c.ncols() {
            let mut acc = c.read(i, j);
            for k in 0..a.nrows() {
                acc -= a.read(k, i) * b.read(k, j);
            }
            c.write(i, j, acc);
        }
    }
}

/// Builds a new matrix with `src`'s rows reordered per `perm`: row `k` of the
/// result is row `perm[k]` of `src`. Used to apply a pivot permutation (from
/// `lu_threshold_partial_pivot`) to front columns the kernel itself never
/// touched (spec.md §4.4, the non-pivot-column panel feeding `Ut2`).
pub fn permute_rows(src: MatRef<'_, E>, perm: &[usize]) -> faer::Mat<E> {
    faer::Mat::from_fn(perm.len(), src.ncols(), |i, j| src.read(perm[i], j))
}
