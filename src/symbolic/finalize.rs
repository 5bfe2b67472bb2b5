//! Builds the final per-supercolumn fields and the elimination tree over
//! final supercolumn indices from the relaxed supercolumn groups (spec.md
//! §4.3, "Finalization").
//!
//! Final supercolumns are already listed in postorder order (by
//! construction, see `supercolumn::relax`), so the supercolumn-level tree's
//! own postorder descendant-count can be folded in a single ascending pass
//! without a second DFS: a supercolumn's parent always has a strictly larger
//! index than the supercolumn itself.

use crate::symbolic::supercolumn::FinalSupercolumns;

/// The elimination tree over final supercolumn indices, plus the per-
/// supercolumn fields derived from it.
pub struct FinalizedTree {
    /// `parent[s]` is the final supercolumn containing the tree-parent of
    /// `s`'s representative column, or `None` if `s` is a root.
    pub parent: Vec<Option<usize>>,
    pub first_child: Vec<Option<usize>>,
    pub next_child: Vec<Option<usize>>,
    pub first_root: Option<usize>,
    /// Inclusive lower bound of `s`'s descendant supercolumns.
    /// `first_desc_index[s] <= d < s` holds for every descendant `d`.
    pub first_desc_index: Vec<usize>,
    /// Inclusive upper bound of `s`'s descendant supercolumns when `s` has
    /// any (`first_desc_index[s] < s`); equals `s` itself (a degenerate,
    /// empty range) for a leaf, since `s - 1` would underflow at `s == 0`.
    pub last_desc_index: Vec<usize>,
    /// Number of original columns this supercolumn's pivot block spans.
    /// Equal to `end[s] - start[s] + 1` by construction: relaxation only ever
    /// absorbs a raw supercolumn's *whole* subtree, so the final range is
    /// always exactly the columns covered, never a strict subset.
    pub covered_columns: Vec<usize>,
}

/// `order`/`parent`/`pos` are the per-column elimination-tree arrays from
/// `elimination::analyze`/`postorder::postorder`; `final_sc` is the relaxed
/// grouping from `supercolumn::relax`.
pub fn finalize(
    final_sc: &FinalSupercolumns,
    order: &[usize],
    parent: &[Option<usize>],
    pos: &[usize],
) -> FinalizedTree {
    let s_count = final_sc.start.len();
    let n = order.len();

    let mut pos_to_sc = vec![0usize; n];
    for (s, (&st, &en)) in final_sc.start.iter().zip(final_sc.end.iter()).enumerate() {
        for p in st..=en {
            pos_to_sc[p] = s;
        }
    }

    let mut sc_parent = vec![None; s_count];
    for s in 0..s_count {
        let last_col = order[final_sc.end[s]];
        if let Some(p) = parent[last_col] {
            sc_parent[s] = Some(pos_to_sc[pos[p]]);
        }
    }

    let mut first_child: Vec<Option<usize>> = vec![None; s_count];
    let mut next_child: Vec<Option<usize>> = vec![None; s_count];
    let mut first_root = None;
    for s in 0..s_count {
        match sc_parent[s] {
            Some(p) => {
                next_child[s] = first_child[p];
                first_child[p] = Some(s);
            }
            None => {
                next_child[s] = first_root;
                first_root = Some(s);
            }
        }
    }

    let mut desc_count_sc = vec![1usize; s_count];
    for s in 0..s_count {
        if let Some(p) = sc_parent[s] {
            desc_count_sc[p] += desc_count_sc[s];
        }
    }

    let mut first_desc_index = vec![0usize; s_count];
    let mut last_desc_index = vec![0usize; s_count];
    let mut covered_columns = vec![0usize; s_count];
    for s in 0..s_count {
        first_desc_index[s] = s + 1 - desc_count_sc[s];
        last_desc_index[s] = if desc_count_sc[s] > 1 { s - 1 } else { s };
        covered_columns[s] = final_sc.end[s] - final_sc.start[s] + 1;
    }

    FinalizedTree {
        parent: sc_parent,
        first_child,
        next_child,
        first_root,
        first_desc_index,
        last_desc_index,
        covered_columns,
    }
}
