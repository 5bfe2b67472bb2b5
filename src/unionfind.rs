//! Disjoint-set groups over column indices.
//!
//! Used by elimination analysis (`symbolic::elimination`) to track which columns'
//! superrows have been merged together. Path-compressed `find`, optional
//! union-by-rank, amortized near-constant per operation.

/// A group of disjoint sets over `0..n`.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u32>,
    by_rank: bool,
}

impl UnionFind {
    /// Returns a fresh group of `n` singleton sets, each its own representative.
    pub fn make_sets(n: usize, by_rank: bool) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            by_rank,
        }
    }

    /// Path-compressed find of the representative of `x`'s set.
    pub fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    /// Unites the sets containing `x` and `y`, returning the representative of the
    /// merged set. Without union-by-rank this is always `y`'s root, matching the
    /// source's `parent[x] <- y` convention used by elimination analysis (new
    /// superrows absorb old ones, so the new column is always the surviving root).
    pub fn union(&mut self, x: usize, y: usize) -> usize {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return rx;
        }
        if !self.by_rank {
            self.parent[rx] = ry;
            return ry;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => {
                self.parent[rx] = ry;
                ry
            }
            std::cmp::Ordering::Greater => {
                self.parent[ry] = rx;
                rx
            }
            std::cmp::Ordering::Equal => {
                self.parent[rx] = ry;
                self.rank[ry] += 1;
                ry
            }
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_are_their_own_representative() {
        let mut uf = UnionFind::make_sets(5, false);
        for i in 0..5 {
            assert_eq!(uf.find(i), i);
        }
    }

    #[test]
    fn union_makes_find_agree() {
        let mut uf = UnionFind::make_sets(6, false);
        uf.union(0, 1);
        uf.union(1, 2);
        assert_eq!(uf.find(0), uf.find(2));
        assert_ne!(uf.find(0), uf.find(3));
    }

    #[test]
    fn union_without_rank_keeps_second_argument_as_root() {
        let mut uf = UnionFind::make_sets(3, false);
        let root = uf.union(0, 1);
        assert_eq!(root, 1);
        assert_eq!(uf.find(0), 1);
    }

    #[test]
    fn union_by_rank_balances_tree_height() {
        let mut uf = UnionFind::make_sets(8, true);
        for i in 0..7 {
            uf.union(i, i + 1);
        }
        let rep = uf.find(0);
        for i in 1..8 {
            assert_eq!(uf.find(i), rep);
        }
    }

    #[test]
    fn path_compression_keeps_find_consistent_after_long_chains() {
        let mut uf = UnionFind::make_sets(100, false);
        for i in 0..99 {
            uf.union(i, i + 1);
        }
        let rep = uf.find(0);
        for i in 0..100 {
            assert_eq!(uf.find(i), rep);
        }
    }
}
