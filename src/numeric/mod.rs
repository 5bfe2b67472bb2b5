//! Numeric driver: the task-parallel postorder traversal of the elimination
//! tree that assembles, factors, and propagates the fronts spec.md §4.4
//! describes (the 24%-share "Numeric driver" component of spec.md §2).
//!
//! The entry point is [`numeric_factor`]. Internally the traversal exploits
//! the same fact `symbolic::finalize` leans on — a postordered tree's
//! descendant set is a contiguous index range — to recurse over *disjoint,
//! contiguous slices* of the output block array, which is what lets sibling
//! subtrees be handed to `rayon::join` (via [`crate::scope::Scope`]) without
//! any synchronization: two sibling slices can never alias.

mod align_add;
mod focus;

use std::collections::HashMap;

use faer::Mat;
use faer::sparse::SparseColMatRef;
use problemo::ProblemResult;

use crate::config::Config;
use crate::contribution::ContributionBlock;
use crate::dense;
use crate::factorblock::FactorBlock;
use crate::scope::Scope;
use crate::symbolic::Symbolic;
use crate::{E, I};
use focus::FrontBuilder;

/// The complete, persistent output of a numeric factorization: one
/// [`FactorBlock`] per supercolumn, in ascending supercolumn order (spec.md
/// §3, "Blocked factor"). Ascending order is both the postorder the
/// supercolumns were detected in and the order the solve driver's forward
/// substitution needs.
pub struct BlockedFactor {
    pub m: usize,
    pub n: usize,
    pub num_blocks: usize,
    pub blocks: Vec<FactorBlock>,
}

impl BlockedFactor {
    /// Spec.md §7's "final validity sweep": `true` iff every block factored
    /// cleanly. [`crate::solve::solve`] and [`crate::convert::blocked_to_global`]
    /// both refuse to run unless this holds.
    pub fn is_valid(&self) -> bool {
        self.blocks.iter().all(|b| b.valid)
    }
}

/// A row-major (CSR) shadow of `A`'s values, built once per numeric-factor
/// call for the "Focus the rows" step's `Aᵀ[:, r]` gather (spec.md §3: "The
/// engine also needs `Aᵀ` in CCS... it owns a private copy for row-oriented
/// access").
struct RowMajor {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<E>,
}

impl RowMajor {
    fn build(a: SparseColMatRef<'_, I, E>) -> Self {
        let n = a.nrows();
        let colptr = a.symbolic().col_ptr();
        let rowind = a.symbolic().row_idx();
        let vals = a.val();
        let nnz = rowind.len();

        let mut row_ptr = vec![0usize; n + 1];
        for &r in rowind {
            row_ptr[r + 1] += 1;
        }
        for r in 0..n {
            row_ptr[r + 1] += row_ptr[r];
        }
        let mut col_idx = vec![0usize; nnz];
        let mut values = vec![0.0; nnz];
        let mut cursor = row_ptr.clone();
        for c in 0..n {
            for idx in colptr[c]..colptr[c + 1] {
                let r = rowind[idx];
                col_idx[cursor[r]] = c;
                values[cursor[r]] = vals[idx];
                cursor[r] += 1;
            }
        }
        Self {
            row_ptr,
            col_idx,
            values,
        }
    }

    fn row(&self, r: usize) -> impl Iterator<Item = (usize, E)> + '_ {
        let range = self.row_ptr[r]..self.row_ptr[r + 1];
        range.map(move |i| (self.col_idx[i], self.values[i]))
    }
}

/// Read-only context shared (by reference) across every task of one
/// [`numeric_factor`] call.
struct Ctx<'a> {
    a: SparseColMatRef<'a, I, E>,
    row_major: RowMajor,
    symbolic: &'a Symbolic,
    thresh: f64,
    config: &'a Config,
    /// `col_position[original_column_id]` = that column's step index in
    /// `symbolic.columns` (i.e. its position in the global elimination
    /// order). A column is a pivot of supercolumn `s` or an earlier one iff
    /// its position is `<= symbolic.end_supercolumn[s]`; this turns spec.md
    /// §4.4's mutable `column_cleared` bitmap into a static predicate,
    /// since the elimination order is fixed before the numeric phase starts
    /// (see `DESIGN.md`).
    col_position: Vec<usize>,
}

/// Runs the numeric multifrontal factorization of `a` against the symbolic
/// analysis `symbolic` (from [`crate::symbolic::symbolic_factor`] on the same
/// matrix). `thresh` is the partial-pivoting threshold in `(0, 1]`;
/// `max_depth == 0` means no depth cutoff for the task-parallel traversal,
/// otherwise subtrees at that depth finish out sequentially; `nproc == 1`
/// forces a strictly sequential traversal (spec.md §5).
pub fn numeric_factor(
    a: SparseColMatRef<'_, I, E>,
    symbolic: &Symbolic,
    thresh: f64,
    max_depth: usize,
    nproc: usize,
    config: &Config,
) -> ProblemResult<BlockedFactor> {
    let n = a.nrows();
    let s = symbolic.number_supercolumns;

    let mut col_position = vec![0usize; n];
    for (step, &col) in symbolic.columns.iter().enumerate() {
        col_position[col] = step;
    }

    let ctx = Ctx {
        a,
        row_major: RowMajor::build(a),
        symbolic,
        thresh,
        config,
        col_position,
    };

    let mut slots: Vec<Option<FactorBlock>> = (0..s).map(|_| None).collect();
    if s > 0 {
        let roots = root_list(symbolic);
        let scope = Scope::root(nproc, max_depth);
        factor_forest(scope, &roots, &mut slots, 0, &ctx)?;
    }

    let blocks: Vec<FactorBlock> = slots
        .into_iter()
        .map(|b| b.expect("every supercolumn slot is filled by factor_forest"))
        .collect();

    Ok(BlockedFactor {
        m: n,
        n,
        num_blocks: s,
        blocks,
    })
}

/// Collects the etree's root supercolumns in ascending index order (ascending
/// index is ascending postorder position, so this is also left-to-right
/// order along the top-level descendant range).
fn root_list(symbolic: &Symbolic) -> Vec<usize> {
    let mut roots = Vec::new();
    let mut cur = symbolic.first_root;
    while let Some(r) = cur {
        roots.push(r);
        cur = symbolic.next_child[r];
    }
    roots.sort_unstable();
    roots
}

fn children_of(symbolic: &Symbolic, node: usize) -> Vec<usize> {
    let mut children = Vec::new();
    let mut cur = symbolic.first_child[node];
    while let Some(c) = cur {
        children.push(c);
        cur = symbolic.next_child[c];
    }
    children.sort_unstable();
    children
}

/// Factors every supercolumn in `roots`' subtrees into `slots`, a slice
/// covering exactly the absolute index range `[base, base + slots.len())`
/// (the union of those subtrees' contiguous descendant ranges). Splits the
/// root list in two and recurses via `scope.join` when more than one root
/// remains and the covered range clears `config.min_cover_spawn`; bottoms
/// out by delegating a single root to [`factor_subtree`].
fn factor_forest(
    scope: Scope,
    roots: &[usize],
    slots: &mut [Option<FactorBlock>],
    base: usize,
    ctx: &Ctx<'_>,
) -> ProblemResult<()> {
    if roots.len() == 1 {
        return factor_subtree(scope, roots[0], slots, base, ctx);
    }

    let mid = roots.len() / 2;
    let (left, right) = roots.split_at(mid);
    let split_local = ctx.symbolic.first_desc_index[right[0]] - base;
    let (left_slots, right_slots) = slots.split_at_mut(split_local);

    let covered: usize = roots
        .iter()
        .map(|&r| ctx.symbolic.supercolumn_covered_columns[r])
        .sum();
    let spawn = ctx.config.min_cover_spawn.is_none_or(|min| covered >= min);

    if spawn {
        let (ra, rb) = scope.join(
            |s| factor_forest(s, left, left_slots, base, ctx),
            |s| factor_forest(s, right, right_slots, base + split_local, ctx),
        );
        ra?;
        rb?;
    } else {
        factor_forest(scope, left, left_slots, base, ctx)?;
        factor_forest(scope, right, right_slots, base + split_local, ctx)?;
    }
    Ok(())
}

/// Factors `node`'s whole subtree into `slots` (absolute range `[base, base +
/// slots.len())`, i.e. `[first_desc_index[node], node]`): recurses into the
/// children first (spec.md §5, "the join precedes allocation of the
/// parent's factor block"), then factors `node` itself using the now-complete
/// descendant slots.
fn factor_subtree(
    scope: Scope,
    node: usize,
    slots: &mut [Option<FactorBlock>],
    base: usize,
    ctx: &Ctx<'_>,
) -> ProblemResult<()> {
    let local = node - base;
    if local > 0 {
        let children = children_of(ctx.symbolic, node);
        factor_forest(scope, &children, &mut slots[..local], base, ctx)?;
    }
    let block = factor_node(scope, node, &mut slots[..local], base, ctx)?;
    slots[local] = Some(block);
    Ok(())
}

/// Factors a single supercolumn's front, per spec.md §4.4: focus its pivot
/// columns, factor the L-portion, focus its pivot rows, solve for U, build
/// its contribution block, and absorb whatever its descendants (now fully
/// factored, sitting in `desc_slots`) still have to offer.
fn factor_node(
    scope: Scope,
    node: usize,
    desc_slots: &mut [Option<FactorBlock>],
    base: usize,
    ctx: &Ctx<'_>,
) -> ProblemResult<FactorBlock> {
    let symbolic = ctx.symbolic;
    let start = symbolic.start_supercolumn[node];
    let end = symbolic.end_supercolumn[node];
    let pivot_cols: Vec<usize> = symbolic.columns[start..=end].to_vec();
    let pc = pivot_cols.len();
    let mut pivot_col_pos: HashMap<usize, usize> = HashMap::with_capacity(pc);
    for (i, &c) in pivot_cols.iter().enumerate() {
        pivot_col_pos.insert(c, i);
    }

    // --- Focus the supercolumn (column assembly) ---
    let mut col_builder = FrontBuilder::new(pc);
    for slot in desc_slots.iter_mut() {
        let Some(fb) = slot else { continue };
        let Some(contrib) = fb.contrib_block.as_mut() else {
            continue;
        };
        if contrib.is_exhausted() {
            continue;
        }
        let matching: Vec<usize> = contrib
            .active_col_ids()
            .filter(|c| pivot_col_pos.contains_key(c))
            .collect();
        for col_id in matching {
            let local_col = pivot_col_pos[&col_id];
            let row_ids: Vec<usize> = contrib.active_row_ids().collect();
            for row_id in row_ids {
                let v = contrib.value_at(row_id, col_id);
                col_builder.add(row_id, local_col, v);
            }
            contrib.remove_col(col_id);
            contrib.mark_u_member();
        }
        if contrib.is_exhausted() {
            fb.contrib_block = None;
        }
    }
    for (local_col, &orig_col) in pivot_cols.iter().enumerate() {
        let colptr = ctx.a.symbolic().col_ptr();
        let rowind = ctx.a.symbolic().row_idx();
        let vals = ctx.a.val();
        for idx in colptr[orig_col]..colptr[orig_col + 1] {
            col_builder.add(rowind[idx], local_col, vals[idx]);
        }
    }

    let l = col_builder.len();
    if l < pc {
        return Ok(FactorBlock::poisoned(pivot_cols));
    }
    let (row_ids, mut front) = col_builder.finish();

    // --- Dense LU of the L-portion ---
    let mut degree = nonzero_row_degrees(front.as_ref());
    let perm = match dense::lu_threshold_partial_pivot(front.as_mut(), ctx.thresh, &mut degree) {
        Ok(perm) => perm,
        Err(_) => return Ok(FactorBlock::poisoned(pivot_cols)),
    };
    let new_row_ids: Vec<usize> = perm.iter().map(|&p| row_ids[p]).collect();
    let pivot_rows: Vec<usize> = new_row_ids[..pc].to_vec();
    let non_pivot_rows: Vec<usize> = new_row_ids[pc..].to_vec();
    let lu1 = Mat::from_fn(pc, pc, |i, j| front.read(i, j));
    let l2 = Mat::from_fn(l - pc, pc, |i, j| front.read(pc + i, j));

    // --- Focus the rows (row assembly for U) ---
    let mut row_builder = FrontBuilder::new(pc);
    for (local_row, &r) in pivot_rows.iter().enumerate() {
        for (c, v) in ctx.row_major.row(r) {
            if ctx.col_position[c] > end {
                row_builder.add(c, local_row, v);
            }
        }
        for slot in desc_slots.iter_mut() {
            let Some(fb) = slot else { continue };
            let Some(contrib) = fb.contrib_block.as_mut() else {
                continue;
            };
            if contrib.is_exhausted() || !contrib.contains_row(r) {
                continue;
            }
            let col_ids: Vec<usize> = contrib.active_col_ids().collect();
            for c in col_ids {
                let v = contrib.value_at(r, c);
                row_builder.add(c, local_row, v);
            }
            contrib.remove_row(r);
            contrib.mark_l_member();
            if contrib.is_exhausted() {
                fb.contrib_block = None;
            }
        }
    }
    let (mut non_pivot_cols, mut ut2) = row_builder.finish();
    let ru_size = non_pivot_cols.len();

    // --- Triangular solve on U ---
    dense::solve_unit_lower_transposed_rhs(lu1.as_ref(), ut2.as_mut());

    // --- Only-child rearrangement (spec.md §4.4) ---
    let mut num_cols_in_parent = 0usize;
    if let Some(parent) = symbolic.parent[node] {
        let is_only_child =
            symbolic.first_child[parent] == Some(node) && symbolic.next_child[node].is_none();
        if is_only_child && ru_size > 0 {
            let parent_start = symbolic.start_supercolumn[parent];
            let parent_end = symbolic.end_supercolumn[parent];
            let parent_cols: std::collections::HashSet<usize> = symbolic.columns
                [parent_start..=parent_end]
                .iter()
                .copied()
                .collect();
            let mut order: Vec<usize> = (0..ru_size).collect();
            order.sort_by_key(|&i| !parent_cols.contains(&non_pivot_cols[i]));
            num_cols_in_parent = non_pivot_cols
                .iter()
                .filter(|c| parent_cols.contains(c))
                .count();
            non_pivot_cols = order.iter().map(|&i| non_pivot_cols[i]).collect();
            ut2 = dense::permute_rows(ut2.as_ref(), &order);
        }
    }

    // --- Build contribution block ---
    let mut block = FactorBlock::new(
        pivot_cols.clone(),
        pivot_rows,
        non_pivot_cols.clone(),
        non_pivot_rows.clone(),
        lu1,
        l2,
        ut2,
    );
    if !non_pivot_rows.is_empty() && ru_size > 0 {
        let mut values = Mat::<E>::zeros(non_pivot_rows.len(), ru_size);
        rank_k_update(scope, ctx.config, &block, values.as_mut());
        let mut contrib = ContributionBlock::new(non_pivot_rows, non_pivot_cols, values);
        contrib.num_cols_in_parent = num_cols_in_parent;

        // --- Assemble from descendants into the new block ---
        for slot in desc_slots.iter_mut() {
            let Some(fb) = slot else { continue };
            let Some(src) = fb.contrib_block.as_mut() else {
                continue;
            };
            if src.is_exhausted() {
                continue;
            }
            if align_add::align_add(&mut contrib, src) {
                fb.contrib_block = None;
            }
        }
        if contrib.is_exhausted() {
            block.contrib_block = None;
        } else {
            block.contrib_block = Some(contrib);
        }
    } else {
        // No block to propagate: clear stale membership flags so a future
        // ancestor doesn't mistake a descendant for having already
        // contributed here (spec.md §4.4, "Cleanup").
        for slot in desc_slots.iter_mut() {
            if let Some(fb) = slot {
                if let Some(src) = fb.contrib_block.as_mut() {
                    src.reset_members();
                }
            }
        }
    }

    Ok(block)
}

/// `contrib <- contrib - L2 . Ut2^T` for the freshly factored block, via the
/// size- and config-gated recursive split (spec.md §5, "align_add* kernels
/// recursively split"). Reuses this front's own fork-join `scope` (the same
/// thread budget `factor_subtree` is traversing the etree with) and the
/// caller's `config`, rather than a fresh sequential scope and defaults.
fn rank_k_update(scope: Scope, config: &Config, block: &FactorBlock, dest: faer::MatMut<'_, E>) {
    align_add::parallel_rank_k_update(scope, config, dest, block.l2.as_ref(), block.ut2.as_ref());
}

/// A coarse Markowitz-style row degree proxy: the number of nonzero entries
/// in each row of the just-assembled front, counted once up front rather
/// than maintained incrementally through the elimination (spec.md §9's
/// "Open questions" licenses this kind of profiling-driven simplification;
/// see `DESIGN.md`).
fn nonzero_row_degrees(front: faer::MatRef<'_, E>) -> Vec<usize> {
    (0..front.nrows())
        .map(|i| (0..front.ncols()).filter(|&j| front.read(i, j) != 0.0).count())
        .collect()
}
