//! Supercolumn detection and relaxation (spec.md §4.3, "Supercolumn detection"
//! and "Supercolumn relaxation").
//!
//! Detection merges maximal one-child chains in the column elimination tree
//! into "raw" supercolumns, subject to a size cap and an overfill-ratio bound
//! (forcing every member of a chain to share the chain's outermost column's
//! front dimensions wastes space when the inner columns are much smaller;
//! the bound caps how much waste is tolerated). Relaxation then absorbs
//! whole small subtrees of raw supercolumns upward into their parent when the
//! parent's total column coverage is still below `relax_rule_size`, trading a
//! larger dense front for fewer, coarser-grained tasks.

use crate::unionfind::UnionFind;

/// Raw (pre-relaxation) supercolumns, one entry per merged one-child chain,
/// in ascending postorder-position order.
pub struct RawSupercolumns {
    /// Inclusive postorder-position range `[start, end]` covered by each raw
    /// supercolumn; `order[end]` is its representative (outermost) column.
    pub start: Vec<usize>,
    pub end: Vec<usize>,
    /// Raw-supercolumn index containing `parent[order[end]]`, or `None` if
    /// `order[end]` is a tree root.
    pub raw_parent: Vec<Option<usize>>,
    pub l_size: Vec<usize>,
    pub u_size: Vec<usize>,
}

/// Detects raw supercolumns over a postordered elimination tree.
///
/// `one_child[c]` must hold for `parent`'s "c has exactly one child" relation
/// (see `postorder::postorder`). A run of columns `order[i]..=order[j]` merges
/// when each step's immediate successor in postorder is its tree parent and
/// that parent itself has only the one child — i.e. the whole finished
/// subtree ending at `order[i..=j]` is its parent's sole child subtree.
pub fn detect_raw_supercolumns(
    order: &[usize],
    parent: &[Option<usize>],
    one_child: &[bool],
    l_size: &[usize],
    u_size: &[usize],
    pos: &[usize],
    max_supercol_size: Option<usize>,
    max_overfill_ratio: f64,
) -> RawSupercolumns {
    let n = order.len();
    let mut start = Vec::new();
    let mut end = Vec::new();
    let mut rep_l = Vec::new();
    let mut rep_u = Vec::new();

    let mut i = 0usize;
    while i < n {
        let c0 = order[i];
        let mut count = 1usize;
        let mut sc_lsize = l_size[c0] as f64;
        let mut sc_usize = u_size[c0] as f64;
        let mut j = i;

        while j + 1 < n {
            let cj = order[j];
            let next_col = order[j + 1];
            if parent[cj] != Some(next_col) || !one_child[next_col] {
                break;
            }
            let new_count = count + 1;
            if let Some(cap) = max_supercol_size {
                if new_count > cap {
                    break;
                }
            }
            let new_sc_lsize = sc_lsize + l_size[next_col] as f64;
            let new_sc_usize = sc_usize + u_size[next_col] as f64;
            let dense_lsize = l_size[next_col] as f64 * new_count as f64;
            let dense_usize = u_size[next_col] as f64 * new_count as f64;
            if dense_lsize > max_overfill_ratio * new_sc_lsize
                || dense_usize > max_overfill_ratio * new_sc_usize
            {
                break;
            }
            sc_lsize = new_sc_lsize;
            sc_usize = new_sc_usize;
            count = new_count;
            j += 1;
        }

        let last_col = order[j];
        start.push(i);
        end.push(j);
        rep_l.push(l_size[last_col]);
        rep_u.push(u_size[last_col]);
        i = j + 1;
    }

    let num_raw = start.len();
    let mut pos_to_raw = vec![0usize; n];
    for (s, (&st, &en)) in start.iter().zip(end.iter()).enumerate() {
        for p in st..=en {
            pos_to_raw[p] = s;
        }
    }

    let mut raw_parent = vec![None; num_raw];
    for s in 0..num_raw {
        let last_col = order[end[s]];
        if let Some(p) = parent[last_col] {
            raw_parent[s] = Some(pos_to_raw[pos[p]]);
        }
    }

    RawSupercolumns {
        start,
        end,
        raw_parent,
        l_size: rep_l,
        u_size: rep_u,
    }
}

/// Final (post-relaxation) supercolumns, in ascending postorder-position
/// (equivalently, ascending final supercolumn number) order.
pub struct FinalSupercolumns {
    pub start: Vec<usize>,
    pub end: Vec<usize>,
    pub l_size: Vec<usize>,
    pub u_size: Vec<usize>,
}

/// Relaxes `raw` by absorbing a raw supercolumn into its raw parent whenever
/// the parent's total descendant-column coverage (`desc_count` of its
/// representative column) is still under `relax_rule_size`. `relax_rule_size
/// <= 1` disables relaxation (every raw supercolumn stays final).
///
/// The per-parent criterion depends only on the parent, so whenever it fires
/// every one of that parent's direct raw children merges in together; applied
/// bottom-up this keeps every final group's postorder-position range
/// contiguous (a whole finished subtree), so `start`/`end` need only track the
/// group's min/max raw position.
pub fn relax(
    raw: &RawSupercolumns,
    order: &[usize],
    desc_count: &[usize],
    relax_rule_size: usize,
    union_by_rank: bool,
) -> FinalSupercolumns {
    let num_raw = raw.start.len();
    let mut uf = UnionFind::make_sets(num_raw, union_by_rank);

    if relax_rule_size > 1 {
        for s in 0..num_raw {
            if let Some(p) = raw.raw_parent[s] {
                let last_col_p = order[raw.end[p]];
                if desc_count[last_col_p] < relax_rule_size {
                    uf.union(p, s);
                }
            }
        }
    }

    let mut group_start = vec![usize::MAX; num_raw];
    let mut group_end = vec![usize::MAX; num_raw];
    let mut group_l = vec![0usize; num_raw];
    let mut group_u = vec![0usize; num_raw];

    for s in 0..num_raw {
        let g = uf.find(s);
        if raw.start[s] < group_start[g] {
            group_start[g] = raw.start[s];
        }
        if group_end[g] == usize::MAX || raw.end[s] > group_end[g] {
            group_end[g] = raw.end[s];
            group_l[g] = raw.l_size[s];
            group_u[g] = raw.u_size[s];
        }
    }

    let mut groups: Vec<usize> = (0..num_raw).filter(|&g| group_end[g] != usize::MAX).collect();
    groups.sort_unstable_by_key(|&g| group_end[g]);

    let mut start = Vec::with_capacity(groups.len());
    let mut end = Vec::with_capacity(groups.len());
    let mut l_size = Vec::with_capacity(groups.len());
    let mut u_size = Vec::with_capacity(groups.len());
    for g in groups {
        start.push(group_start[g]);
        end.push(group_end[g]);
        l_size.push(group_l[g]);
        u_size.push(group_u[g]);
    }

    FinalSupercolumns {
        start,
        end,
        l_size,
        u_size,
    }
}
