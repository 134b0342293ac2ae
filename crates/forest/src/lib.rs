//! Link-cut forests: a sequential splay-based implementation and two
//! concurrent, latch-based variants coordinated through a representative
//! index.

mod cell;
mod lock_coupling;
mod path_lock;
mod repr;
mod seq;
mod union_find;

pub mod traits;

pub use lock_coupling::LockCouplingForest;
pub use path_lock::PathLockForest;
pub use seq::SeqForest;
pub use traits::SharedForest;
pub use union_find::UnionFind;

#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Id(pub(crate) u32);

pub(crate) const NIL: Id = Id(u32::MAX);

impl Id {
    #[inline(always)]
    pub(crate) fn is_nil(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline(always)]
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Structural validator shared by the variants' test hooks: splay edges are
/// mutually coherent, no node is a child twice, and every parent chain
/// terminates.
#[cfg(test)]
pub(crate) fn check_links(n: usize, links: impl Fn(u32) -> ([Id; 2], Id)) {
    let mut child_seen = vec![false; n];
    for y in 0..n as u32 {
        let (ch, _) = links(y);
        for c in ch {
            if c.is_nil() {
                continue;
            }
            assert!(c.idx() < n, "node {y} has out-of-range child {}", c.0);
            assert_ne!(c.0, y, "node {y} is its own child");
            let (_, cp) = links(c.0);
            assert_eq!(cp, Id(y), "child {} does not point back to {y}", c.0);
            assert!(!child_seen[c.idx()], "node {} is a child twice", c.0);
            child_seen[c.idx()] = true;
        }
    }
    for x in 0..n as u32 {
        let mut cur = Id(x);
        let mut steps = 0;
        loop {
            let (_, p) = links(cur.0);
            if p.is_nil() {
                break;
            }
            cur = p;
            steps += 1;
            assert!(steps <= n, "parent chain from {x} does not terminate");
        }
    }
}
