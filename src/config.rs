//! Compile-time constants of the source engine, lifted to a runtime-tunable struct.
//!
//! `copters::SolverOptions` backs a similar knob surface with a dynamic option
//! registry (`build_options!`); this crate's knobs are few and fixed in shape, so a
//! plain `Default`-able struct carries them instead.

/// Tuning knobs for symbolic analysis and the numeric multifrontal traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Maximum number of original columns a single supercolumn may absorb.
    /// `None` disables the cap (spec.md's `-1`).
    pub max_supercol_size: Option<usize>,

    /// Overfill bound `R` in the supercolumn-detection break test:
    /// `sc_lsize * (size + 1) > R * max_lsize` (and similarly for `usize`).
    pub max_overfill_ratio: f64,

    /// A leaf supercolumn is absorbed into its parent while the parent's subtree
    /// (counted at the parent's last column) covers fewer than this many columns.
    /// Values `<= 1` skip the relaxation pass entirely.
    pub relax_rule_size: usize,

    /// Extra slack `k` added to the row-set arena workspace: `nnz(A) + k * n`.
    pub ean_buffer: usize,

    /// Supercolumns whose covered-column count falls below this are factored
    /// inline rather than spawned as a task. `None` disables the heuristic.
    pub min_cover_spawn: Option<usize>,

    /// Dense kernels below this size run inline rather than as a spawned task.
    pub min_size_dense_spawn: usize,

    /// `align_add*` kernels recursively split while either dimension exceeds this.
    pub align_add_small: usize,

    /// Use union-by-rank in the union-find structure backing elimination analysis.
    pub union_by_rank: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_supercol_size: None,
            max_overfill_ratio: 2.0,
            relax_rule_size: 20,
            ean_buffer: 2,
            min_cover_spawn: None,
            min_size_dense_spawn: 64,
            align_add_small: 80,
            union_by_rank: true,
        }
    }
}
