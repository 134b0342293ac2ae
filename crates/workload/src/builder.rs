//! Batched workload construction over random and k-ary trees.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use forest::{SeqForest, UnionFind};

use crate::trace::{OpKind, Trace, TraceKind, TraceMeta};

/// Fraction of the shuffled edge set that a generated workload keeps.
pub const DEFAULT_RETAIN: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeShape {
    /// `parent[i]` drawn uniformly from `[0, i)`.
    Random,
    /// Complete k-ary tree, `parent[i] = (i - 1) / k`.
    KAry(u32),
}

impl TreeShape {
    pub fn label(self) -> String {
        match self {
            Self::Random => "random".to_string(),
            Self::KAry(k) => format!("{k}-ary"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown tree shape {0:?}, expected \"random\" or \"<k>-ary\" with k >= 2")]
pub struct BadTreeShape(String);

impl FromStr for TreeShape {
    type Err = BadTreeShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "random" {
            return Ok(Self::Random);
        }
        let k = s
            .strip_suffix("-ary")
            .and_then(|k| k.parse::<u32>().ok())
            .filter(|&k| k >= 2)
            .ok_or_else(|| BadTreeShape(s.to_string()))?;
        Ok(Self::KAry(k))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum WorkloadKind {
    Lookup,
    Cut,
}

impl WorkloadKind {
    pub fn trace_kind(self) -> TraceKind {
        match self {
            Self::Lookup => TraceKind::Lookup,
            Self::Cut => TraceKind::Cut,
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.trace_kind().label())
    }
}

/// Root-oriented `(child, parent)` edges of the chosen tree shape.
pub fn tree_edges(shape: TreeShape, n: u32, rng: &mut StdRng) -> Vec<(u32, u32)> {
    match shape {
        TreeShape::Random => (1..n).map(|i| (i, rng.random_range(0..i))).collect(),
        TreeShape::KAry(k) => (1..n).map(|i| (i, (i - 1) / k)).collect(),
    }
}

/// Shadow forest plus the window of nodes touched since the last flush.
struct WindowState {
    parent: Vec<Option<u32>>,
    last_touch: Vec<u64>,
    touched: Vec<u32>,
    clock: u64,
}

impl WindowState {
    fn new(n: u32) -> Self {
        Self {
            parent: vec![None; n as usize],
            last_touch: vec![u64::MAX; n as usize],
            touched: Vec::new(),
            clock: 0,
        }
    }

    fn touch(&mut self, node: u32) {
        if self.last_touch[node as usize] == u64::MAX {
            self.touched.push(node);
        }
        self.last_touch[node as usize] = self.clock;
        self.clock += 1;
    }

    /// Up to `beta` distinct window nodes, earliest touched first, each
    /// paired with its current forest root.
    fn lookup_pairs(&mut self, beta: u32, compress: bool) -> Vec<(u32, u32)> {
        let mut nodes = std::mem::take(&mut self.touched);
        nodes.sort_by_key(|&x| self.last_touch[x as usize]);
        for &x in &nodes {
            self.last_touch[x as usize] = u64::MAX;
        }
        nodes.truncate(beta as usize);
        nodes
            .into_iter()
            .map(|x| {
                let root = if compress {
                    root_compress(&mut self.parent, x)
                } else {
                    root_walk(&self.parent, x)
                };
                (x, root)
            })
            .collect()
    }
}

fn root_walk(parent: &[Option<u32>], mut x: u32) -> u32 {
    while let Some(p) = parent[x as usize] {
        x = p;
    }
    x
}

/// As `root_walk`, but repoints the whole chain at the root. Only valid for
/// workloads that never undo a link.
fn root_compress(parent: &mut [Option<u32>], x: u32) -> u32 {
    let root = root_walk(parent, x);
    let mut cur = x;
    while let Some(p) = parent[cur as usize] {
        parent[cur as usize] = Some(root);
        cur = p;
    }
    root
}

/// LINK batches of `beta` inserts, each followed by a LOOKUP batch over the
/// window of recently touched nodes.
pub fn build_lookup_trace(n: u32, edges: &[(u32, u32)], beta: u32) -> Trace {
    let mut state = WindowState::new(n);
    let mut inserts = Vec::with_capacity(beta as usize);
    let mut trace = Trace::new();

    for &(u, v) in edges {
        state.touch(u);
        state.touch(v);
        inserts.push((u, v));
        state.parent[u as usize] = Some(v);

        if inserts.len() == beta as usize {
            flush_lookup(&mut trace, &mut state, &mut inserts, beta);
        }
    }
    if !inserts.is_empty() {
        flush_lookup(&mut trace, &mut state, &mut inserts, beta);
    }
    trace
}

fn flush_lookup(
    trace: &mut Trace,
    state: &mut WindowState,
    inserts: &mut Vec<(u32, u32)>,
    beta: u32,
) {
    trace.push_batch(OpKind::Link, inserts);
    inserts.clear();
    let lookups = state.lookup_pairs(beta, true);
    trace.push_batch(OpKind::Lookup, &lookups);
}

/// Interleaves LINK batches with CUT batches drawn FIFO from the insert
/// order, each pair bracketed by LOOKUP batches verifying current roots.
pub fn build_cut_trace(n: u32, edges: &[(u32, u32)], beta: u32) -> Trace {
    let mut state = WindowState::new(n);
    let mut inserts = Vec::with_capacity(beta as usize);
    let mut persisted: Vec<(u32, u32)> = Vec::with_capacity(edges.len());
    let mut cursor = 0_usize;
    let mut trace = Trace::new();

    let flush = |trace: &mut Trace,
                 state: &mut WindowState,
                 inserts: &mut Vec<(u32, u32)>,
                 persisted: &[(u32, u32)],
                 cursor: &mut usize| {
        trace.push_batch(OpKind::Link, inserts);
        inserts.clear();
        let lookups = state.lookup_pairs(beta, false);
        trace.push_batch(OpKind::Lookup, &lookups);

        // FIFO over the persisted insert order; every child is cut exactly
        // once, so each target still has its parent edge when reached.
        let mut cuts = Vec::new();
        while *cursor < persisted.len() && cuts.len() < beta as usize {
            let (u, v) = persisted[*cursor];
            *cursor += 1;
            state.parent[u as usize] = None;
            state.touch(u);
            state.touch(v);
            cuts.push((u, v));
        }
        trace.push_batch(OpKind::Cut, &cuts);
        let lookups = state.lookup_pairs(beta, false);
        trace.push_batch(OpKind::Lookup, &lookups);
    };

    for &(u, v) in edges {
        state.touch(u);
        state.touch(v);
        inserts.push((u, v));
        persisted.push((u, v));
        state.parent[u as usize] = Some(v);

        if inserts.len() == beta as usize {
            flush(&mut trace, &mut state, &mut inserts, &persisted, &mut cursor);
        }
    }
    if !inserts.is_empty() {
        flush(&mut trace, &mut state, &mut inserts, &persisted, &mut cursor);
    }
    trace
}

/// Replay a freshly built trace through the sequential forest and the
/// union-find oracle. Any disagreement is a generator defect and aborts.
pub fn replay_check(trace: &Trace, n: u32) {
    let mut lct = SeqForest::new(n);
    let mut uf = UnionFind::new(n);
    let mut saw_cut = false;

    for batch in trace.batches() {
        match batch.kind {
            OpKind::Link => {
                for &(u, v) in batch.ops {
                    lct.link(u, v);
                    uf.union(u, v);
                    if !saw_cut {
                        assert!(
                            lct.are_connected(u, v) == uf.connected(u, v),
                            "self-check failed: link({u},{v}) disagrees with oracle"
                        );
                    }
                }
            }
            OpKind::Cut => {
                saw_cut = true;
                for &(u, v) in batch.ops {
                    lct.cut(u);
                    assert!(
                        !lct.are_connected(u, v),
                        "self-check failed: cut({u}) left {u} connected to {v}"
                    );
                }
            }
            OpKind::Lookup => {
                for &(u, expected) in batch.ops {
                    let root = lct.find_root(u);
                    assert!(
                        root == expected,
                        "self-check failed: lookup({u}) found root {root}, trace expects {expected}"
                    );
                }
            }
        }
    }
}

/// Build, self-check and name a workload trace.
pub fn generate(
    shape: TreeShape,
    kind: WorkloadKind,
    n: u32,
    beta: u32,
    retain: f64,
    seed: u64,
) -> (TraceMeta, Trace) {
    assert!(n >= 2, "workload needs at least two nodes");
    assert!(beta >= 1, "batch size must be positive");

    let mut rng = StdRng::seed_from_u64(seed);
    let mut edges = tree_edges(shape, n, &mut rng);
    edges.shuffle(&mut rng);
    let keep = ((edges.len() as f64) * retain) as usize;
    edges.truncate(keep.max(1));

    let trace = match kind {
        WorkloadKind::Lookup => build_lookup_trace(n, &edges, beta),
        WorkloadKind::Cut => build_cut_trace(n, &edges, beta),
    };
    replay_check(&trace, n);

    let meta = TraceMeta {
        kind: kind.trace_kind(),
        shape: shape.label(),
        beta,
        n,
    };
    (meta, trace)
}
