//! A single supercolumn's factored frontal matrix (spec.md §3, "Factor
//! block"): the dense `LU1`/`L2`/`Ut2` panels produced by the numeric
//! driver's focus-column and focus-row steps, plus whatever of the front's
//! Schur complement is left over as a [`ContributionBlock`] for the parent.

use faer::Mat;

use crate::contribution::ContributionBlock;
use crate::E;

/// The factored front of one supercolumn.
///
/// `LU1` is `pivot_cols.len() x pivot_cols.len()`: unit lower triangle (strict
/// lower part, diagonal implicitly 1) and upper triangle (including the
/// diagonal) interleaved in the usual in-place LU layout. `L2` is
/// `non_pivot_rows.len() x pivot_cols.len()`, the multipliers eliminating the
/// front's non-pivot rows. `Ut2` is `non_pivot_cols.len() x pivot_cols.len()`,
/// stored transposed (rows = non-pivot columns, columns = pivot rows) to
/// match `dense::solve_unit_lower_transposed_rhs`'s access pattern.
pub struct FactorBlock {
    pub pivot_cols: Vec<usize>,
    pub pivot_rows: Vec<usize>,
    pub non_pivot_cols: Vec<usize>,
    pub non_pivot_rows: Vec<usize>,
    pub lu1: Mat<E>,
    pub l2: Mat<E>,
    pub ut2: Mat<E>,
    /// `None` once fully consumed by the parent's assembly, or for a root
    /// supercolumn with no contribution to propagate.
    pub contrib_block: Option<ContributionBlock>,
    /// `false` if this front's factorization hit a singular pivot (spec.md
    /// §9's resolution of the "null columns" open question); any attempt to
    /// read `lu1`/`l2`/`ut2` or the solve driver must treat the whole
    /// [`super::numeric::BlockedFactor`] as poisoned once this is `false`.
    pub valid: bool,
}

impl FactorBlock {
    pub fn new(
        pivot_cols: Vec<usize>,
        pivot_rows: Vec<usize>,
        non_pivot_cols: Vec<usize>,
        non_pivot_rows: Vec<usize>,
        lu1: Mat<E>,
        l2: Mat<E>,
        ut2: Mat<E>,
    ) -> Self {
        Self {
            pivot_cols,
            pivot_rows,
            non_pivot_cols,
            non_pivot_rows,
            lu1,
            l2,
            ut2,
            contrib_block: None,
            valid: true,
        }
    }

    /// A placeholder for a front whose factorization failed at `pivot_cols`;
    /// carries the columns so the driver can report which supercolumn failed.
    pub fn poisoned(pivot_cols: Vec<usize>) -> Self {
        Self {
            pivot_cols,
            pivot_rows: Vec::new(),
            non_pivot_cols: Vec::new(),
            non_pivot_rows: Vec::new(),
            lu1: Mat::zeros(0, 0),
            l2: Mat::zeros(0, 0),
            ut2: Mat::zeros(0, 0),
            contrib_block: None,
            valid: false,
        }
    }

    pub fn num_pivots(&self) -> usize {
        self.pivot_cols.len()
    }
}
