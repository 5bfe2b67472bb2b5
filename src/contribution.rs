//! Contribution blocks: the Schur-complement panels a factored supercolumn's
//! front hands up to its parent (spec.md §4.4, "Build contribution block" and
//! §4.3's data model, "Contribution block").
//!
//! A block's dense backing storage (`values`) is allocated once, at the size
//! of the front's non-pivot rows/columns at creation, and is never resized or
//! moved afterward — every `(row, col)` pair keeps the same *physical* slot
//! for the block's whole lifetime. What shrinks is the *logical* view: as the
//! parent's column/row focus steps consume a row or column of the block
//! (spec.md §4.4, "align-add"), it is retired from the logical `rows`/
//! `columns` lists via swap-with-tail, never by touching `values`. This is
//! the hot assembly path's central invariant: retiring one row must not
//! invalidate the physical slot any other still-pending row or column reads
//! from.

use std::collections::HashMap;

use faer::Mat;

use crate::E;

/// A contribution block over a fixed universe of original-matrix row and
/// column ids, established at construction and never grown.
pub struct ContributionBlock {
    values: Mat<E>,
    phys_row_id: Vec<usize>,
    phys_col_id: Vec<usize>,
    row_loc: HashMap<usize, usize>,
    col_loc: HashMap<usize, usize>,
    rows: Vec<usize>,
    columns: Vec<usize>,
    row_list_pos: Vec<usize>,
    col_list_pos: Vec<usize>,
    row_live: Vec<bool>,
    col_live: Vec<bool>,
    /// Number of this block's columns that also appear as pivot columns of
    /// its immediate parent supercolumn, cached at creation so the numeric
    /// driver's only-child rearrangement (spec.md §4.4) doesn't need to
    /// recompute the intersection.
    pub num_cols_in_parent: usize,
    /// Set once an ancestor's row-focus step has consumed at least one of
    /// this block's rows, and `u_member` once a column-focus step has
    /// consumed at least one of its columns (spec.md §3, "L_member,
    /// U_member"). Together they tell the *next* ancestor's align-add step
    /// which of the three assembly modes (full / rows-only / columns-only)
    /// applies.
    pub l_member: bool,
    pub u_member: bool,
}

impl ContributionBlock {
    /// Builds a block over `row_ids x col_ids` (original matrix indices),
    /// taking ownership of `values` (already `row_ids.len() x col_ids.len()`).
    pub fn new(row_ids: Vec<usize>, col_ids: Vec<usize>, values: Mat<E>) -> Self {
        debug_assert_eq!(values.nrows(), row_ids.len());
        debug_assert_eq!(values.ncols(), col_ids.len());

        let mut row_loc = HashMap::with_capacity(row_ids.len());
        let mut row_list_pos = vec![0usize; row_ids.len()];
        for (phys, &id) in row_ids.iter().enumerate() {
            row_loc.insert(id, phys);
            row_list_pos[phys] = phys;
        }
        let mut col_loc = HashMap::with_capacity(col_ids.len());
        let mut col_list_pos = vec![0usize; col_ids.len()];
        for (phys, &id) in col_ids.iter().enumerate() {
            col_loc.insert(id, phys);
            col_list_pos[phys] = phys;
        }

        let rows: Vec<usize> = (0..row_ids.len()).collect();
        let columns: Vec<usize> = (0..col_ids.len()).collect();
        let row_live = vec![true; row_ids.len()];
        let col_live = vec![true; col_ids.len()];

        Self {
            values,
            phys_row_id: row_ids,
            phys_col_id: col_ids,
            row_loc,
            col_loc,
            rows,
            columns,
            row_list_pos,
            col_list_pos,
            row_live,
            col_live,
            num_cols_in_parent: 0,
            l_member: false,
            u_member: false,
        }
    }

    pub fn num_active_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_active_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Active row ids (original matrix indices), in no particular order.
    pub fn active_row_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.iter().map(|&phys| self.phys_row_id[phys])
    }

    pub fn active_col_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.iter().map(|&phys| self.phys_col_id[phys])
    }

    pub fn contains_row(&self, row_id: usize) -> bool {
        self.row_loc
            .get(&row_id)
            .is_some_and(|&phys| self.row_live[phys])
    }

    pub fn contains_col(&self, col_id: usize) -> bool {
        self.col_loc
            .get(&col_id)
            .is_some_and(|&phys| self.col_live[phys])
    }

    /// Reads the value at `(row_id, col_id)`, assuming both are still active.
    pub fn value_at(&self, row_id: usize, col_id: usize) -> E {
        let r = self.row_loc[&row_id];
        let c = self.col_loc[&col_id];
        self.values.read(r, c)
    }

    /// Adds `delta` to the value at `(row_id, col_id)`, assuming both are
    /// still active. Used by align-add (spec.md §4.4) to accumulate a
    /// descendant's contribution into this (ancestor) block.
    pub fn add_at(&mut self, row_id: usize, col_id: usize, delta: E) {
        let r = self.row_loc[&row_id];
        let c = self.col_loc[&col_id];
        let v = self.values.read(r, c) + delta;
        self.values.write(r, c, v);
    }

    /// Sets `l_member`: an ancestor's row-focus step has just consumed one
    /// of this block's rows.
    pub fn mark_l_member(&mut self) {
        self.l_member = true;
    }

    /// Sets `u_member`: an ancestor's column-focus step has just consumed
    /// one of this block's columns.
    pub fn mark_u_member(&mut self) {
        self.u_member = true;
    }

    /// Clears both membership flags once an ancestor's align-add step has
    /// finished with this block for the round (spec.md §4.4, "Cleanup").
    pub fn reset_members(&mut self) {
        self.l_member = false;
        self.u_member = false;
    }

    /// Empties the block's logical row and column lists outright, per
    /// spec.md §4.4's full align-add: once an ancestor has absorbed both the
    /// row and column universe of a descendant, nothing further can ever be
    /// read from it.
    pub fn exhaust(&mut self) {
        self.rows.clear();
        self.columns.clear();
    }

    /// Retires `row_id` from the logical row list via swap-with-tail. The
    /// physical slot's data in `values` is left untouched; only bookkeeping
    /// for the *other* row that used to sit at the tail moves.
    pub fn remove_row(&mut self, row_id: usize) {
        let phys = self.row_loc[&row_id];
        debug_assert!(self.row_live[phys]);
        let logical = self.row_list_pos[phys];
        let last = self.rows.len() - 1;
        self.rows.swap(logical, last);
        let moved_phys = self.rows[logical];
        self.row_list_pos[moved_phys] = logical;
        self.rows.pop();
        self.row_live[phys] = false;
    }

    pub fn remove_col(&mut self, col_id: usize) {
        let phys = self.col_loc[&col_id];
        debug_assert!(self.col_live[phys]);
        let logical = self.col_list_pos[phys];
        let last = self.columns.len() - 1;
        self.columns.swap(logical, last);
        let moved_phys = self.columns[logical];
        self.col_list_pos[moved_phys] = logical;
        self.columns.pop();
        self.col_live[phys] = false;
    }
}
