//! Symbolic analysis: from a sparse pattern and a column preordering, derive
//! the column elimination tree, supercolumn structure, and L/U fill bounds
//! the numeric driver will factor against (spec.md §4.3).

mod elimination;
mod finalize;
mod postorder;
mod supercolumn;

use faer::sparse::SparseColMatRef;
use problemo::ProblemResult;

use crate::config::Config;
use crate::error::Error;
use crate::{E, I};

/// Output of [`symbolic_factor`]: the permuted column order, the supercolumn
/// grouping over it, and the resulting elimination tree, all indexed in the
/// *final* postorder (supercolumn-index) space used by the numeric driver.
pub struct Symbolic {
    /// Original column ids in final elimination order; `columns[i]` is the
    /// original column processed at step `i`.
    pub columns: Vec<usize>,
    pub number_supercolumns: usize,
    /// Inclusive `[start, end]` step range (indices into `columns`) each
    /// supercolumn spans.
    pub start_supercolumn: Vec<usize>,
    pub end_supercolumn: Vec<usize>,
    pub supercolumn_size: Vec<usize>,
    pub supercolumn_covered_columns: Vec<usize>,
    /// Upper bound on `L`'s row count / `U`'s column count for this
    /// supercolumn's front, from its representative (last) column.
    pub l_size: Vec<usize>,
    pub u_size: Vec<usize>,
    pub parent: Vec<Option<usize>>,
    pub first_child: Vec<Option<usize>>,
    pub next_child: Vec<Option<usize>>,
    pub first_root: Option<usize>,
    pub first_desc_index: Vec<usize>,
    pub last_desc_index: Vec<usize>,
}

/// Runs symbolic analysis on `a`, processing columns in `column_order` (a
/// permutation of `0..n`, e.g. from `faer::sparse::linalg::colamd` or `amd`).
///
/// Fails with `MalformedInput` if `a` is not square, `column_order` is not a
/// length-`n` permutation, or any column of `a` is structurally empty.
pub fn symbolic_factor(
    a: SparseColMatRef<'_, I, E>,
    column_order: &[I],
    config: &Config,
) -> ProblemResult<Symbolic> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(Error::MalformedInput {
            reason: format!("matrix is {} x {}, expected square", n, a.ncols()),
        }
        .into());
    }
    if column_order.len() != n {
        return Err(Error::MalformedInput {
            reason: "column_order length does not match matrix dimension".into(),
        }
        .into());
    }

    let symbolic = a.symbolic();
    let colptr = symbolic.col_ptr();
    let rowind = symbolic.row_idx();

    let elim = elimination::analyze(
        n,
        colptr,
        rowind,
        column_order,
        config.union_by_rank,
        config.ean_buffer,
    )?;
    let pr = postorder::postorder(n, &elim.parent);
    let raw = supercolumn::detect_raw_supercolumns(
        &pr.order,
        &elim.parent,
        &pr.one_child,
        &elim.l_size,
        &elim.u_size,
        &pr.pos,
        config.max_supercol_size,
        config.max_overfill_ratio,
    );
    let final_sc = supercolumn::relax(
        &raw,
        &pr.order,
        &pr.desc_count,
        config.relax_rule_size,
        config.union_by_rank,
    );
    let tree = finalize::finalize(&final_sc, &pr.order, &elim.parent, &pr.pos);

    let columns: Vec<usize> = pr.order.iter().map(|&step| column_order[step]).collect();
    let supercolumn_size: Vec<usize> = final_sc
        .start
        .iter()
        .zip(final_sc.end.iter())
        .map(|(&s, &e)| e - s + 1)
        .collect();

    Ok(Symbolic {
        columns,
        number_supercolumns: final_sc.start.len(),
        start_supercolumn: final_sc.start,
        end_supercolumn: final_sc.end,
        supercolumn_size,
        supercolumn_covered_columns: tree.covered_columns,
        l_size: final_sc.l_size,
        u_size: final_sc.u_size,
        parent: tree.parent,
        first_child: tree.first_child,
        next_child: tree.next_child,
        first_root: tree.first_root,
        first_desc_index: tree.first_desc_index,
        last_desc_index: tree.last_desc_index,
    })
}
