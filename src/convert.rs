//! Conversion of a [`BlockedFactor`] back into two global CCS matrices and a
//! pair of permutations (spec.md §6, `blocked_to_global`).
//!
//! This is explicitly called out in spec.md §1 as "a lossy adapter, not part
//! of the core": the blocked factor is the engine's real output, and this
//! module exists only to hand a caller who wants plain `L`/`U` a convenient
//! (if memory-hungrier) view of it. Every entry of `L`/`U` still carries its
//! *original* row/column id — the permutations `P`/`Q` describe the
//! elimination order those ids were visited in, exactly as
//! `copters::linalg::lu::SimplicialSparseLu` reports its own `row_perm`/
//! `col_perm` as a separate `Perm<I>` alongside factors indexed by original id.

use faer::perm::Perm;
use faer::sparse::{SparseColMat, Triplet};
use problemo::{Problem, ProblemResult};

use crate::error::Error;
use crate::numeric::BlockedFactor;
use crate::{E, I};

/// Converts `factor` into row/column permutations `(P, Q)` and two CCS
/// matrices `(L, U)` such that, conceptually, `P . A . Q = L . U` — `L` unit
/// lower triangular, `U` upper triangular, both indexed by the *original*
/// row/column ids of the matrix `factor` was computed from.
///
/// `P[k]`/`Q[k]` is the original row/column id chosen as the `k`-th pivot in
/// elimination order. Fails with [`Error::PoisonedFactor`] if any block of
/// `factor` is invalid (spec.md §7: "No partial result is exposed").
pub fn blocked_to_global(
    factor: &BlockedFactor,
) -> ProblemResult<(Perm<I>, Perm<I>, SparseColMat<I, E>, SparseColMat<I, E>)> {
    if !factor.is_valid() {
        return Err(Error::PoisonedFactor.into());
    }

    let n = factor.n;
    let mut row_fwd = vec![0usize; n];
    let mut col_fwd = vec![0usize; n];
    let mut cursor = 0usize;
    for block in &factor.blocks {
        for (&r, &c) in block.pivot_rows.iter().zip(block.pivot_cols.iter()) {
            row_fwd[cursor] = r;
            col_fwd[cursor] = c;
            cursor += 1;
        }
    }
    debug_assert_eq!(cursor, n);

    let mut row_inv = vec![0usize; n];
    let mut col_inv = vec![0usize; n];
    for (k, &r) in row_fwd.iter().enumerate() {
        row_inv[r] = k;
    }
    for (k, &c) in col_fwd.iter().enumerate() {
        col_inv[c] = k;
    }

    let mut l_triplets = Vec::new();
    let mut u_triplets = Vec::new();

    for block in &factor.blocks {
        let pc = block.pivot_cols.len();
        for i in 0..pc {
            l_triplets.push(Triplet::new(block.pivot_rows[i], block.pivot_cols[i], 1.0));
        }
        for i in 0..pc {
            let row_id = block.pivot_rows[i];
            for j in 0..i {
                let v = block.lu1.read(i, j);
                if v != 0.0 {
                    l_triplets.push(Triplet::new(row_id, block.pivot_cols[j], v));
                }
            }
            for j in i..pc {
                let v = block.lu1.read(i, j);
                if v != 0.0 {
                    u_triplets.push(Triplet::new(row_id, block.pivot_cols[j], v));
                }
            }
        }

        for (rr, &row_id) in block.non_pivot_rows.iter().enumerate() {
            for cc in 0..pc {
                let v = block.l2.read(rr, cc);
                if v != 0.0 {
                    l_triplets.push(Triplet::new(row_id, block.pivot_cols[cc], v));
                }
            }
        }

        for (cc, &col_id) in block.non_pivot_cols.iter().enumerate() {
            for i in 0..pc {
                let v = block.ut2.read(cc, i);
                if v != 0.0 {
                    u_triplets.push(Triplet::new(block.pivot_rows[i], col_id, v));
                }
            }
        }
    }

    let l = SparseColMat::try_new_from_triplets(n, n, &l_triplets)
        .via(Error::MemoryReservation)?;
    let u = SparseColMat::try_new_from_triplets(n, n, &u_triplets)
        .via(Error::MemoryReservation)?;

    let p = unsafe {
        Perm::new_unchecked(row_fwd.into_boxed_slice(), row_inv.into_boxed_slice())
    };
    let q = unsafe {
        Perm::new_unchecked(col_fwd.into_boxed_slice(), col_inv.into_boxed_slice())
    };

    Ok((p, q, l, u))
}
