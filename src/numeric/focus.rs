//! Dense front assembly buffers for the "focus" steps of spec.md §4.4:
//! scatter-accumulating sparse contributions (from `A` or from a
//! descendant's contribution block) into a growing dense panel, keyed by
//! original row or column id rather than physical position.
//!
//! `FrontBuilder` plays the role spec.md's `map_rows`/`map_cols` workspaces
//! play in the source: a map from original index to the index's position in
//! the panel being built. The source reuses one persistent sentinel-filled
//! array per numeric-phase run and a free-list of arrays for the parallel
//! case (spec.md §3, "Ownership rules"); here each front gets its own
//! `FrontBuilder`, built fresh and dropped when the front's focus step ends.
//! That sidesteps the concurrent-reset discipline those shared arrays need
//! entirely — the etree's disjointness proof (spec.md §5, "Shared mutable
//! state") is exactly what guarantees two concurrently-factored fronts never
//! need to touch the same id, so giving each front its own map is just as
//! sound and needs no pooling.

use std::collections::HashMap;

use faer::Mat;

use crate::E;

/// Accumulates a dense panel of `ncols` columns whose row set is discovered
/// incrementally: the first time a row id is touched it is appended to
/// `ids` and gets a fresh zeroed row; every subsequent touch adds into the
/// existing row.
pub struct FrontBuilder {
    ncols: usize,
    ids: Vec<usize>,
    pos: HashMap<usize, usize>,
    rows: Vec<Vec<E>>,
}

impl FrontBuilder {
    pub fn new(ncols: usize) -> Self {
        Self {
            ncols,
            ids: Vec::new(),
            pos: HashMap::new(),
            rows: Vec::new(),
        }
    }

    /// Returns the local row index for `id`, creating a fresh zeroed row the
    /// first time `id` is seen.
    pub fn local_index(&mut self, id: usize) -> usize {
        if let Some(&i) = self.pos.get(&id) {
            return i;
        }
        let i = self.ids.len();
        self.ids.push(id);
        self.pos.insert(id, i);
        self.rows.push(vec![0.0; self.ncols]);
        i
    }

    /// `panel[id][col] += value`.
    pub fn add(&mut self, id: usize, col: usize, value: E) {
        let i = self.local_index(id);
        self.rows[i][col] += value;
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Consumes the builder, returning the touched ids (in first-touch
    /// order) and the dense panel (`ids.len() x ncols`, column-major).
    pub fn finish(self) -> (Vec<usize>, Mat<E>) {
        let m = self.ids.len();
        let ncols = self.ncols;
        let mat = Mat::from_fn(m, ncols, |i, j| self.rows[i][j]);
        (self.ids, mat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_touches_to_the_same_id_accumulate() {
        let mut b = FrontBuilder::new(2);
        b.add(7, 0, 3.0);
        b.add(7, 0, 4.0);
        b.add(7, 1, 1.0);
        let (ids, mat) = b.finish();
        assert_eq!(ids, vec![7]);
        assert_eq!(mat.read(0, 0), 7.0);
        assert_eq!(mat.read(0, 1), 1.0);
    }

    #[test]
    fn distinct_ids_get_distinct_rows_in_first_touch_order() {
        let mut b = FrontBuilder::new(1);
        b.add(5, 0, 1.0);
        b.add(2, 0, 2.0);
        let (ids, mat) = b.finish();
        assert_eq!(ids, vec![5, 2]);
        assert_eq!(mat.read(0, 0), 1.0);
        assert_eq!(mat.read(1, 0), 2.0);
    }
}
