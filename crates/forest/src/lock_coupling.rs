use crate::cell::NodeArena;
use crate::repr::ReprIndex;
use crate::{Id, NIL};

/// Concurrent link-cut tree that holds at most two latches at a time.
///
/// Where [`PathLockForest`](crate::PathLockForest) keeps every visited path
/// latched until the operation finishes, this variant releases the previous
/// path's latch as soon as its representative slot has been re-chained to
/// the newly latched path. The narrower critical section admits more
/// parallelism on long paths.
pub struct LockCouplingForest {
    arena: NodeArena,
    repr: ReprIndex,
}

impl LockCouplingForest {
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

    /// As the path-lock exposure, but the trace is a single representative:
    /// the hop before the current one. On return only the final latch is
    /// held.
    fn path_expose(&self, x: Id) -> Option<u32> {
        let mut last = NIL;
        let mut trace = None;
        let mut y = x;
        while !y.is_nil() {
            let r = self.latch_repr(y);

            // SAFETY: the latch of `y`'s path representative is held; the
            // previous path, if any, is still latched via `trace`.
            unsafe {
                self.arena.splay(y);

                let below = self.arena.links(y).ch[1];
                if !below.is_nil() {
                    let suffix = self.arena.leftmost(below);
                    // Sever before publishing, as in the path-lock variant.
                    self.arena.links_mut(y).ch[1] = NIL;
                    self.repr.unlink(suffix.0);
                }

                self.arena.links_mut(y).ch[1] = last;
                if let Some(prev) = trace {
                    debug_assert!(!last.is_nil());
                    self.repr.link(prev, y.0);
                    // The previous hop is chained to the latched current
                    // path; nothing more is read or written through it.
                    self.arena.unlock(Id(prev));
                }

                trace = Some(r);
                last = y;
                y = self.arena.links(y).p;
            }
        }
        // SAFETY: the merged path is covered by the one remaining latch.
        unsafe { self.arena.splay(x) };
        trace
    }

    fn release(&self, trace: Option<u32>) {
        if let Some(r) = trace {
            // SAFETY: the final trace latch is still held.
            unsafe { self.arena.unlock(Id(r)) };
        }
    }

    /// Attach the tree rooted at `x` below `y`.
    ///
    /// `x` must be the root of its tree and must lie in a different tree
    /// than `y`; violations abort.
    pub fn link(&self, x: u32, y: u32) {
        assert!(x != y, "link: self-loop on node {x}");
        let ix = Id(x);
        let trace = self.path_expose(ix);
        // SAFETY: `x`'s merged path is latched via the trace.
        unsafe {
            assert!(
                self.arena.links(ix).ch[0].is_nil(),
                "link: node {x} is not a forest root"
            );
            self.arena.links_mut(ix).p = Id(y);
        }
        self.release(trace);
    }

    /// Detach `x` from its parent. `x` must not be a forest root.
    pub fn cut(&self, x: u32) {
        let ix = Id(x);
        let trace = self.path_expose(ix);
        // SAFETY: `x`'s merged path is latched via the trace.
        unsafe {
            let above = self.arena.links(ix).ch[0];
            assert!(!above.is_nil(), "cut: node {x} is a forest root");
            self.arena.links_mut(above).p = NIL;
            self.arena.links_mut(ix).ch[0] = NIL;
            self.repr.unlink(x);
        }
        self.release(trace);
    }

    pub fn find_root(&self, x: u32) -> u32 {
        let ix = Id(x);
        let trace = self.path_expose(ix);
        // SAFETY: `x`'s merged path is latched via the trace.
        let r = unsafe {
            let r = self.arena.leftmost(ix);
            // Amortized cost.
            self.arena.splay(r);
            r
        };
        self.release(trace);
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
