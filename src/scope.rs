//! Fork-join scheduling for the numeric driver's traversal of the elimination
//! tree, grounded on `kitegi-faer-rs`'s `utils::thread::join_raw` (itself a thin
//! wrapper over `rayon::join` gated by a remaining-thread budget), adapted to
//! spec.md §5's `nproc`/`max_depth` pair instead of `faer`'s own `Parallelism`
//! enum.
//!
//! `nproc == 1` never forks (strictly sequential postorder traversal, spec.md
//! §5). `nproc > 1` forks via `rayon::join` until either the budget of remaining
//! threads drops to one or `max_depth` (if nonzero) is reached, at which point the
//! subtree is finished out sequentially in the calling task.

/// Tracks the fork budget for one numeric-factorization call.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    /// Threads still available to this subtree. `1` means "finish inline".
    threads: usize,
    /// Current recursion depth from the traversal's entry point.
    depth: usize,
    /// Depth at which to stop forking regardless of remaining threads. `0`
    /// means "no cutoff" (spec.md §6, `max_depth == 0`).
    max_depth: usize,
}

impl Scope {
    /// Root scope for a numeric-factorization call with the given `nproc` and
    /// `max_depth` (`0` = no cutoff).
    pub fn root(nproc: usize, max_depth: usize) -> Self {
        Self {
            threads: nproc.max(1),
            depth: 0,
            max_depth,
        }
    }

    fn should_fork(&self) -> bool {
        self.threads > 1 && (self.max_depth == 0 || self.depth < self.max_depth)
    }

    fn child(&self, threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            depth: self.depth + 1,
            max_depth: self.max_depth,
        }
    }

    /// Runs `op_a` and `op_b`, in parallel via `rayon::join` when the budget and
    /// depth allow it, sequentially otherwise. Each closure receives the `Scope`
    /// it should recurse with.
    pub fn join<A, B, RA, RB>(&self, op_a: A, op_b: B) -> (RA, RB)
    where
        A: FnOnce(Scope) -> RA + Send,
        B: FnOnce(Scope) -> RB + Send,
        RA: Send,
        RB: Send,
    {
        if self.should_fork() {
            let half = self.threads - self.threads / 2;
            let rest = self.threads / 2;
            let scope_a = self.child(half);
            let scope_b = self.child(rest.max(1));
            rayon::join(|| op_a(scope_a), || op_b(scope_b))
        } else {
            let inline = self.child(1);
            (op_a(inline), op_b(inline))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_scope_never_forks() {
        let scope = Scope::root(1, 0);
        assert!(!scope.should_fork());
    }

    #[test]
    fn parallel_scope_forks_until_budget_exhausted() {
        let scope = Scope::root(4, 0);
        assert!(scope.should_fork());
        let (a, b) = scope.join(|s| s.threads, |s| s.threads);
        assert_eq!(a + b, 4);
    }

    #[test]
    fn max_depth_cutoff_stops_forking() {
        let scope = Scope::root(4, 1);
        assert!(scope.should_fork());
        let child = scope.child(2);
        assert!(!child.should_fork());
    }
}
