//! Error kinds shared by the symbolic, numeric, and solve phases.
//!
//! Every fallible entry point returns [`problemo::ProblemResult`] tagged with one of
//! these variants, following the same `.via(Error::Variant)` convention
//! `copters::linalg` uses around `problemo::Problem`.

use derive_more::{Display, Error};

#[derive(Debug, Display, Error, PartialEq)]
pub enum Error {
    /// A `Vec`/scratch reservation could not be grown to the requested capacity.
    #[display("memory reservation failed")]
    MemoryReservation,

    /// A `MemBuffer`/scratch allocation failed outright.
    #[display("memory allocation failed")]
    MemoryAllocation,

    /// `A` failed the CCS contract: non-square, or a structurally empty column.
    #[display("malformed input: {reason}")]
    MalformedInput { reason: String },

    /// Elimination analysis could not produce a valid elimination tree.
    #[display("symbolic factorization failed")]
    SymbolicFactorization,

    /// A factor block could not be completed: a pivot candidate was smaller than
    /// `thresh` times the column maximum for every row still available, i.e. the
    /// front is numerically (or structurally) singular.
    #[display("numeric factorization failed at supercolumn {supercolumn}")]
    NumericFailure { supercolumn: usize },

    /// A public entry point was invoked on a struct that has not completed the
    /// phase it depends on (e.g. `numeric_factor` before `symbolic_factor`, or
    /// `solve` on a factor that was never finalized).
    #[display("uninitialized: {what}")]
    Uninitialized { what: &'static str },

    /// `solve` (or `blocked_to_global`) was invoked on a factor with at least one
    /// invalid block.
    #[display("factor is poisoned by a prior numeric failure")]
    PoisonedFactor,
}
