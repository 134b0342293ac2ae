//! Workload traces for the link-cut forests: binary trace format, batched
//! workload builders and the post-generation self-check.

pub mod builder;
pub mod trace;

pub use builder::{
    build_cut_trace, build_lookup_trace, generate, replay_check, tree_edges, TreeShape,
    WorkloadKind, DEFAULT_RETAIN,
};
pub use trace::{Batch, OpKind, Trace, TraceError, TraceKind, TraceMeta};
