use crate::cell::NodeArena;
use crate::repr::ReprIndex;
use crate::{Id, NIL};

/// Concurrent link-cut tree that latches every preferred path it crosses.
///
/// `path_expose` collects the representatives of all visited paths into a
/// trace and holds their latches until the operation completes, so no other
/// thread can touch any auxiliary tree the exposure has merged. Latches are
/// released in reverse acquisition order.
pub struct PathLockForest {
    arena: NodeArena,
    repr: ReprIndex,
}

impl PathLockForest {
    pub fn new(n: u32) -> Self {
        Self {
            arena: NodeArena::new(n),
            repr: ReprIndex::new(n),
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    /// Latch the representative of `y`'s current path.
    ///
    /// The representative may change between the lookup and the latch
    /// acquisition (another thread splitting or merging the path), so the
    /// lookup is repeated under the latch until it is stable.
    fn latch_repr(&self, y: Id) -> u32 {
        let mut r = self.repr.resolve(y.0);
        loop {
            self.arena.lock(Id(r));
            let now = self.repr.resolve(y.0);
            if now == r {
                return r;
            }
            // SAFETY: locked just above.
            unsafe { self.arena.unlock(Id(r)) };
            r = now;
        }
    }

    fn path_expose(&self, x: Id, trace: &mut Vec<u32>) {
        let mut last = NIL;
        let mut y = x;
        while !y.is_nil() {
            let r = self.latch_repr(y);

            // SAFETY: the latch of `y`'s path representative is held, and
            // every previously visited path is still latched via `trace`.
            unsafe {
                self.arena.splay(y);

                let below = self.arena.links(y).ch[1];
                if !below.is_nil() {
                    // The displaced subtree becomes a path of its own; its
                    // representative is its extreme node on the root side.
                    let suffix = self.arena.leftmost(below);
                    // The pointer must be severed before the slot is
                    // published, so a racing reader either sees the old
                    // coherent path or spins until the new representative
                    // lands.
                    self.arena.links_mut(y).ch[1] = NIL;
                    self.repr.unlink(suffix.0);
                }

                self.arena.links_mut(y).ch[1] = last;
                if !last.is_nil() {
                    let prev = trace[trace.len() - 1];
                    self.repr.link(prev, y.0);
                }

                trace.push(r);
                last = y;
                y = self.arena.links(y).p;
            }
        }
        // SAFETY: the merged path is fully covered by the held trace.
        unsafe { self.arena.splay(x) };
    }

    fn release(&self, trace: &[u32]) {
        for &r in trace.iter().rev() {
            // SAFETY: every trace entry was latched by `path_expose` and
            // not yet released.
            unsafe { self.arena.unlock(Id(r)) };
        }
    }

    /// Attach the tree rooted at `x` below `y`.
    ///
    /// `x` must be the root of its tree and must lie in a different tree
    /// than `y`; violations abort. `y`'s path is not exposed: the new
    /// path-parent edge is absorbed by whichever exposure next crosses it.
    pub fn link(&self, x: u32, y: u32) {
        assert!(x != y, "link: self-loop on node {x}");
        let ix = Id(x);
        let mut trace = Vec::new();
        self.path_expose(ix, &mut trace);
        // SAFETY: `x`'s merged path is latched via the trace.
        unsafe {
            assert!(
                self.arena.links(ix).ch[0].is_nil(),
                "link: node {x} is not a forest root"
            );
            self.arena.links_mut(ix).p = Id(y);
        }
        self.release(&trace);
    }

    /// Detach `x` from its parent. `x` must not be a forest root.
    pub fn cut(&self, x: u32) {
        let ix = Id(x);
        let mut trace = Vec::new();
        self.path_expose(ix, &mut trace);
        // SAFETY: `x`'s merged path is latched via the trace.
        unsafe {
            let above = self.arena.links(ix).ch[0];
            assert!(!above.is_nil(), "cut: node {x} is a forest root");
            self.arena.links_mut(above).p = NIL;
            self.arena.links_mut(ix).ch[0] = NIL;
            self.repr.unlink(x);
        }
        self.release(&trace);
    }

    pub fn find_root(&self, x: u32) -> u32 {
        let ix = Id(x);
        let mut trace = Vec::new();
        self.path_expose(ix, &mut trace);
        // SAFETY: `x`'s merged path is latched via the trace.
        let r = unsafe {
            let r = self.arena.leftmost(ix);
            // Amortized cost.
            self.arena.splay(r);
            r
        };
        self.release(&trace);
        r.0
    }

    /// Composed from two root lookups; individually linearizable, but the
    /// pair is not atomic under concurrent mutation.
    pub fn are_connected(&self, x: u32, y: u32) -> bool {
        if x == y {
            return true;
        }
        self.find_root(x) == self.find_root(y)
    }

    #[cfg(test)]
    pub(crate) fn check_structure(&self) {
        self.arena.check_structure();
    }

    #[cfg(test)]
    pub(crate) fn resolve_repr(&self, x: u32) -> u32 {
        self.repr.resolve(x)
    }
}
