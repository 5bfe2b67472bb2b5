//! Packed storage for the per-row index superlists built during symbolic
//! elimination analysis, with a compacting garbage collector.
//!
//! Superrows are packed back-to-back in a single workspace of size
//! `nnz(A) + k * n` (`k` from `Config::ean_buffer`). Each row has a `start`,
//! `size`, and `cleared` flag; live superrows never overlap, `cleared[r]` is true
//! iff `r` is not live, and after a collection the watermark equals the sum of
//! live sizes.

use crate::error::Error;
use problemo::{Problem, ProblemResult};

/// Arena of packed, variable-length row index lists ("superrows").
pub struct RowSetArena {
    workspace: Vec<usize>,
    start: Vec<usize>,
    size: Vec<usize>,
    cleared: Vec<bool>,
    watermark: usize,
}

impl RowSetArena {
    /// Allocates an arena workspace of `nnz + k * n` slots for `n` rows.
    pub fn new(n: usize, nnz: usize, k: usize) -> ProblemResult<Self> {
        let capacity = nnz + k * n;
        let mut workspace = Vec::new();
        workspace
            .try_reserve_exact(capacity)
            .via(Error::MemoryReservation)?;
        workspace.resize(capacity, 0usize);

        Ok(Self {
            workspace,
            start: vec![0; n],
            size: vec![0; n],
            cleared: vec![true; n],
            watermark: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.workspace.len()
    }

    pub fn is_live(&self, r: usize) -> bool {
        !self.cleared[r]
    }

    pub fn row(&self, r: usize) -> &[usize] {
        debug_assert!(self.is_live(r));
        &self.workspace[self.start[r]..self.start[r] + self.size[r]]
    }

    pub fn row_size(&self, r: usize) -> usize {
        self.size[r]
    }

    /// Marks `r`'s superrow as no longer live. Its slot is not reclaimed until the
    /// next collection.
    pub fn clear(&mut self, r: usize) {
        self.cleared[r] = true;
    }

    /// Allocates a fresh superrow of `size` entries for row `r`, compacting the
    /// arena first if the remaining tail cannot fit it. Returns a mutable slice to
    /// fill with the superrow's column indices.
    pub fn allocate(&mut self, r: usize, size: usize) -> ProblemResult<&mut [usize]> {
        if self.watermark + size > self.workspace.len() {
            self.collect();
            if self.watermark + size > self.workspace.len() {
                return Err(Error::MemoryAllocation.into());
            }
        }

        let start = self.watermark;
        self.start[r] = start;
        self.size[r] = size;
        self.cleared[r] = false;
        self.watermark += size;
        Ok(&mut self.workspace[start..start + size])
    }

    /// Compacting collector: slides all live superrows leftward in `start` order,
    /// dropping cleared ones, and resets the watermark to the sum of live sizes.
    pub fn collect(&mut self) {
        let n = self.start.len();
        let mut live: Vec<usize> = (0..n).filter(|&r| !self.cleared[r]).collect();
        live.sort_unstable_by_key(|&r| self.start[r]);

        let mut write = 0usize;
        for &r in &live {
            let (old_start, size) = (self.start[r], self.size[r]);
            if old_start != write {
                // Ranges never overlap (sorted, compacted forward), so a plain
                // shift via split is sound without an intermediate buffer.
                for i in 0..size {
                    self.workspace[write + i] = self.workspace[old_start + i];
                }
                self.start[r] = write;
            }
            write += size;
        }
        self.watermark = write;
    }
}
