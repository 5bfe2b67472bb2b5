//! Postorder traversal of the column elimination tree produced by
//! `elimination::analyze` (spec.md §4.3, "Postorder + one-child detection").
//!
//! The tree is rooted at a virtual node `n` whose children are exactly the
//! elimination tree's real roots, so every column (real or virtual) has a
//! single well-defined parent chain. The iterative stack-based traversal below
//! fully finishes one child's subtree before starting the next, which is what
//! gives the result its load-bearing property: every column's descendants
//! occupy a contiguous range of postorder positions immediately before it
//! (`first_desc_index[i] <= d < i`, used throughout the rest of symbolic
//! analysis and by the numeric driver's subtree scheduling).

/// Result of postordering a `parent` array over `0..n` (plus the implicit
/// virtual root `n`).
pub struct PostorderResult {
    /// `order[i]` is the step index visited at postorder position `i`.
    pub order: Vec<usize>,
    /// Inverse of `order`: `pos[c]` is the postorder position of step `c`.
    pub pos: Vec<usize>,
    /// Total descendants of `c` including itself, counted in step-index space.
    pub desc_count: Vec<usize>,
    /// Number of direct children of `c` in the elimination tree.
    pub child_count: Vec<usize>,
    /// `true` iff `c` has exactly one child (spec.md §4.3, supercolumn
    /// detection's "one-child chain" criterion).
    pub one_child: Vec<bool>,
}

/// Postorders `parent` (length `n`, `parent[c] > c` or `None` for a root).
pub fn postorder(n: usize, parent: &[Option<usize>]) -> PostorderResult {
    let mut first_child: Vec<Option<usize>> = vec![None; n + 1];
    let mut next_child: Vec<Option<usize>> = vec![None; n];
    let mut child_count = vec![0usize; n + 1];
    for c in 0..n {
        let p = parent[c].unwrap_or(n);
        next_child[c] = first_child[p];
        first_child[p] = Some(c);
        child_count[p] += 1;
    }

    let mut order = Vec::with_capacity(n);
    let mut stack: Vec<(usize, bool)> = Vec::with_capacity(n + 1);
    stack.push((n, false));
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            if node != n {
                order.push(node);
            }
            continue;
        }
        stack.push((node, true));
        let mut child = first_child[node];
        while let Some(c) = child {
            stack.push((c, false));
            child = next_child[c];
        }
    }

    let mut pos = vec![0usize; n];
    for (i, &c) in order.iter().enumerate() {
        pos[c] = i;
    }

    let mut desc_count = vec![1usize; n];
    for &c in &order {
        if let Some(p) = parent[c] {
            desc_count[p] += desc_count[c];
        }
    }

    child_count.truncate(n);
    let one_child = child_count.iter().map(|&k| k == 1).collect();

    PostorderResult {
        order,
        pos,
        desc_count,
        child_count,
        one_child,
    }
}
