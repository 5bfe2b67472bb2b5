//! Align-add: sparse-indexed dense accumulation of a descendant's still-live
//! contribution block into an ancestor's newly built contribution block
//! (spec.md §4.4, "Assemble from descendants into the new block").
//!
//! The three modes below mirror the source's `align_add` / `align_add_rows`
//! / `align_add_cols` kernels, selected by the descendant's `l_member` /
//! `u_member` flags (spec.md §3): a block that has already handed rows to
//! one ancestor and columns to another is fully contained in the current
//! front and gets absorbed outright; a block that has only ever handed off
//! one of the two dimensions still needs the other copied up, row by row or
//! column by column.

use crate::config::Config;
use crate::contribution::ContributionBlock;
use crate::dense::rank_k_update_a_bt;
use crate::scope::Scope;

/// Full align-add: `dest` already contains every row and column `src` could
/// still offer (both `l_member` and `u_member` are set), so every active
/// cell of `src` that also exists in `dest` is added in, and `src` is then
/// emptied unconditionally — nothing of it can ever be read again.
pub fn align_add_full(dest: &mut ContributionBlock, src: &mut ContributionBlock) {
    let rows: Vec<usize> = src.active_row_ids().collect();
    let cols: Vec<usize> = src.active_col_ids().collect();
    for &r in &rows {
        if !dest.contains_row(r) {
            continue;
        }
        for &c in &cols {
            if dest.contains_col(c) {
                dest.add_at(r, c, src.value_at(r, c));
            }
        }
    }
    src.exhaust();
}

/// Rows-only align-add: `src` has handed columns to an earlier ancestor
/// (`u_member`) but never rows (`!l_member`), so only rows whose id is also
/// live in `dest` are added in; those rows are then retired from `src`
/// (spec.md §4.4: "compact out the consumed rows").
pub fn align_add_rows(dest: &mut ContributionBlock, src: &mut ContributionBlock) {
    let rows: Vec<usize> = src.active_row_ids().collect();
    let cols: Vec<usize> = src.active_col_ids().collect();
    for r in rows {
        if !dest.contains_row(r) {
            continue;
        }
        for &c in &cols {
            if dest.contains_col(c) {
                dest.add_at(r, c, src.value_at(r, c));
            }
        }
        src.remove_row(r);
    }
}

/// Columns-only align-add: symmetric to [`align_add_rows`] for a block that
/// has handed rows to an earlier ancestor (`l_member`) but never columns.
pub fn align_add_cols(dest: &mut ContributionBlock, src: &mut ContributionBlock) {
    let rows: Vec<usize> = src.active_row_ids().collect();
    let cols: Vec<usize> = src.active_col_ids().collect();
    for c in cols {
        if !dest.contains_col(c) {
            continue;
        }
        for &r in &rows {
            if dest.contains_row(r) {
                dest.add_at(r, c, src.value_at(r, c));
            }
        }
        src.remove_col(c);
    }
}

/// Dispatches to the assembly mode `src.l_member`/`src.u_member` select, then
/// applies spec.md §4.4's "Cleanup": if `src` became empty, its contribution
/// is freed by the caller; otherwise both membership flags are cleared so
/// the next ancestor starts from a clean slate.
///
/// Returns `true` if `src` is now exhausted (the caller should drop it).
pub fn align_add(dest: &mut ContributionBlock, src: &mut ContributionBlock) -> bool {
    match (src.l_member, src.u_member) {
        (true, true) => align_add_full(dest, src),
        (true, false) => align_add_rows(dest, src),
        (false, true) => align_add_cols(dest, src),
        (false, false) => {
            // Neither focus step touched this descendant at this front; it
            // has nothing in common with `dest` (disjoint row/col universes),
            // so there is nothing to do — it propagates further up untouched.
        }
    }
    if src.is_exhausted() {
        true
    } else {
        src.reset_members();
        false
    }
}

/// `c <- c - a . b^T`, recursively split along the larger dimension while it
/// exceeds `config.align_add_small`, run as sibling tasks under `scope`
/// (spec.md §5, "Large align_add* kernels recursively split..."). Below
/// `config.min_size_dense_spawn` the split never forks regardless of size,
/// matching that knob's "dense kernels below this size run inline" role.
pub fn parallel_rank_k_update(
    scope: Scope,
    config: &Config,
    mut c: faer::MatMut<'_, f64>,
    a: faer::MatRef<'_, f64>,
    b: faer::MatRef<'_, f64>,
) {
    let rows = c.nrows();
    let cols = c.ncols();
    let largest = rows.max(cols);
    if largest <= config.align_add_small || largest < config.min_size_dense_spawn {
        rank_k_update_a_bt(c.as_mut(), a, b);
        return;
    }

    if rows >= cols {
        let mid = rows / 2;
        let (c_top, c_bot) = c.split_at_row_mut(mid);
        let (a_top, a_bot) = a.split_at_row(mid);
        scope.join(
            |s| parallel_rank_k_update(s, config, c_top, a_top, b),
            |s| parallel_rank_k_update(s, config, c_bot, a_bot, b),
        );
    } else {
        let mid = cols / 2;
        let (c_left, c_right) = c.split_at_col_mut(mid);
        let (b_top, b_bot) = b.split_at_row(mid);
        scope.join(
            |s| parallel_rank_k_update(s, config, c_left, a, b_top),
            |s| parallel_rank_k_update(s, config, c_right, a, b_bot),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::E;
    use faer::Mat;

    fn block(rows: Vec<usize>, cols: Vec<usize>, fill: impl Fn(usize, usize) -> E) -> ContributionBlock {
        let values = Mat::from_fn(rows.len(), cols.len(), |i, j| fill(i, j));
        ContributionBlock::new(rows, cols, values)
    }

    #[test]
    fn full_align_add_consumes_the_source_entirely() {
        let mut dest = block(vec![1, 2], vec![10, 11], |_, _| 0.0);
        let mut src = block(vec![1, 2], vec![10, 11], |i, j| (i * 2 + j + 1) as E);
        src.mark_l_member();
        src.mark_u_member();
        let exhausted = align_add(&mut dest, &mut src);
        assert!(exhausted);
        assert_eq!(dest.value_at(1, 10), 1.0);
        assert_eq!(dest.value_at(2, 11), 4.0);
    }

    #[test]
    fn rows_only_align_add_retires_only_matched_rows() {
        let mut dest = block(vec![1], vec![10, 11], |_, _| 0.0);
        let mut src = block(vec![1, 2], vec![10, 11], |i, j| (i * 2 + j + 1) as E);
        src.mark_u_member();
        let exhausted = align_add(&mut dest, &mut src);
        assert!(!exhausted);
        assert!(!src.contains_row(1));
        assert!(src.contains_row(2));
        assert_eq!(dest.value_at(1, 10), 1.0);
        assert!(!src.l_member && !src.u_member);
    }

    #[test]
    fn cols_only_align_add_retires_only_matched_cols() {
        let mut dest = block(vec![1, 2], vec![10], |_, _| 0.0);
        let mut src = block(vec![1, 2], vec![10, 11], |i, j| (i * 2 + j + 1) as E);
        src.mark_l_member();
        let exhausted = align_add(&mut dest, &mut src);
        assert!(!exhausted);
        assert!(!src.contains_col(10));
        assert!(src.contains_col(11));
    }

    #[test]
    fn unmarked_descendant_is_left_untouched() {
        let mut dest = block(vec![1], vec![10], |_, _| 0.0);
        let mut src = block(vec![1], vec![10], |_, _| 5.0);
        let exhausted = align_add(&mut dest, &mut src);
        assert!(!exhausted);
        assert_eq!(dest.value_at(1, 10), 0.0);
        assert!(src.contains_row(1));
    }

    #[test]
    fn parallel_rank_k_update_matches_sequential_kernel() {
        let a = Mat::<E>::from_fn(6, 3, |i, j| (i + j) as E);
        let b = Mat::<E>::from_fn(5, 3, |i, j| (i * j + 1) as E);
        let mut expected = Mat::<E>::from_fn(6, 5, |i, j| (i + j) as E);
        rank_k_update_a_bt(expected.as_mut(), a.as_ref(), b.as_ref());

        let mut config = Config::default();
        config.align_add_small = 2;
        config.min_size_dense_spawn = 0;
        let scope = Scope::root(4, 0);
        let mut actual = Mat::<E>::from_fn(6, 5, |i, j| (i + j) as E);
        parallel_rank_k_update(scope, &config, actual.as_mut(), a.as_ref(), b.as_ref());

        for i in 0..6 {
            for j in 0..5 {
                assert!((actual.read(i, j) - expected.read(i, j)).abs() < 1e-12);
            }
        }
    }
}
