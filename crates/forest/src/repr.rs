use std::sync::atomic::{AtomicU32, Ordering::Relaxed};

/// Dense map from node label to the representative of its preferred path.
///
/// A slot holding its own index marks a representative. Chains of slots are
/// followed by [`resolve`](Self::resolve); concurrent splits and merges may
/// leave chains stale, which callers tolerate through the lock-then-recheck
/// protocol of the concurrent variants. Slots are plain word-sized atomics
/// with relaxed ordering; the per-path latches provide all synchronization.
pub(crate) struct ReprIndex {
    slots: Box<[AtomicU32]>,
}

impl ReprIndex {
    pub(crate) fn new(n: u32) -> Self {
        Self {
            slots: (0..n).map(AtomicU32::new).collect(),
        }
    }

    /// Make `c` the representative of its own path.
    #[inline(always)]
    pub(crate) fn unlink(&self, c: u32) {
        self.slots[c as usize].store(c, Relaxed);
    }

    /// Chain the retired representative `c` to node `p`.
    #[inline(always)]
    pub(crate) fn link(&self, c: u32, p: u32) {
        self.slots[c as usize].store(p, Relaxed);
    }

    /// Follow the chain from `label` to a representative.
    pub(crate) fn resolve(&self, label: u32) -> u32 {
        let mut x = label;
        while self.slots[x as usize].load(Relaxed) != x {
            let prev = x;
            x = self.slots[x as usize].load(Relaxed);
            // A racing split can rewrite the slot between the two loads;
            // observing a self-loop here means `prev` just became a
            // representative again.
            if x == prev {
                return x;
            }
        }
        x
    }
}
