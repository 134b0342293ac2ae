//! Batched trace execution over the forest variants.
//!
//! Every batch is split into `count / (task_factor * num_threads)`-sized
//! tasks pulled by a fixed worker pool through a shared counter; the pool
//! joins between batches, so batches are a global barrier. A batch too
//! small to split runs on the calling thread.

use std::fmt;
use std::hint;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use forest::{LockCouplingForest, PathLockForest, SeqForest, SharedForest};
use workload::{Batch, OpKind, Trace, TraceError, TraceKind, TraceMeta};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    Sequential,
    PathLock,
    LockCoupling,
}

impl Variant {
    pub fn label(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::PathLock => "path-lock",
            Self::LockCoupling => "lock-coupling",
        }
    }

    pub fn is_parallel(self) -> bool {
        !matches!(self, Self::Sequential)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(Self::Sequential),
            "path-lock" => Ok(Self::PathLock),
            "lock-coupling" => Ok(Self::LockCoupling),
            other => Err(format!("unknown variant {other:?}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error(transparent)]
    BadName(#[from] workload::trace::BadTraceName),
    #[error("workload kind {kind} is not executable")]
    Unsupported { kind: TraceKind },
    #[error("num_threads and task_factor must be positive")]
    BadConfig,
    #[error("cannot write log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct RunConfig {
    pub num_threads: usize,
    pub task_factor: usize,
    pub variant: Variant,
    /// Assert every LOOKUP against its expected root instead of timing.
    pub verify: bool,
}

/// Execute a whole trace on a fresh forest of `n` nodes; returns the time
/// spent inside the batch loop.
pub fn execute(trace: &Trace, n: u32, cfg: &RunConfig) -> Result<Duration, DriverError> {
    if cfg.num_threads == 0 || cfg.task_factor == 0 {
        return Err(DriverError::BadConfig);
    }
    let elapsed = match cfg.variant {
        Variant::Sequential => {
            let mut forest = SeqForest::new(n);
            let start = Instant::now();
            for batch in trace.batches() {
                run_batch_sequential(&mut forest, batch, cfg.verify);
            }
            start.elapsed()
        }
        Variant::PathLock => {
            let forest = PathLockForest::new(n);
            run_trace_on(&forest, trace, cfg)
        }
        Variant::LockCoupling => {
            let forest = LockCouplingForest::new(n);
            run_trace_on(&forest, trace, cfg)
        }
    };
    Ok(elapsed)
}

/// Run every batch of `trace` on an existing forest. Exposed so callers can
/// inspect the forest afterwards.
pub fn run_trace_on<F: SharedForest>(forest: &F, trace: &Trace, cfg: &RunConfig) -> Duration {
    let start = Instant::now();
    for batch in trace.batches() {
        deploy(forest, batch, cfg);
    }
    start.elapsed()
}

fn deploy<F: SharedForest>(forest: &F, batch: Batch<'_>, cfg: &RunConfig) {
    let count = batch.ops.len();
    if count == 0 {
        return;
    }
    let task_size = count / (cfg.task_factor * cfg.num_threads);
    if task_size == 0 {
        run_range(forest, batch.kind, batch.ops, cfg.verify);
        return;
    }
    let num_tasks = count / task_size + usize::from(count % task_size != 0);

    let next_task = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..cfg.num_threads {
            s.spawn(|| {
                while next_task.load(Relaxed) < num_tasks {
                    let task = next_task.fetch_add(1, Relaxed);
                    if task >= num_tasks {
                        return;
                    }
                    let lo = task * task_size;
                    let hi = if task == num_tasks - 1 {
                        count
                    } else {
                        lo + task_size
                    };
                    run_range(forest, batch.kind, &batch.ops[lo..hi], cfg.verify);
                }
            });
        }
    });
}

fn run_range<F: SharedForest>(forest: &F, kind: OpKind, ops: &[(u32, u32)], verify: bool) {
    match kind {
        OpKind::Link => {
            for &(u, v) in ops {
                forest.link(u, v);
            }
        }
        OpKind::Cut => {
            for &(u, _) in ops {
                forest.cut(u);
            }
        }
        OpKind::Lookup => {
            for &(u, expected) in ops {
                let root = forest.find_root(u);
                if verify {
                    assert!(
                        root == expected,
                        "lookup mismatch: node {u} resolved to {root}, trace expects {expected}"
                    );
                } else {
                    hint::black_box(root);
                }
            }
        }
    }
}

fn run_batch_sequential(forest: &mut SeqForest, batch: Batch<'_>, verify: bool) {
    match batch.kind {
        OpKind::Link => {
            for &(u, v) in batch.ops {
                forest.link(u, v);
            }
        }
        OpKind::Cut => {
            for &(u, _) in batch.ops {
                forest.cut(u);
            }
        }
        OpKind::Lookup => {
            for &(u, expected) in batch.ops {
                let root = forest.find_root(u);
                if verify {
                    assert!(
                        root == expected,
                        "lookup mismatch: node {u} resolved to {root}, trace expects {expected}"
                    );
                } else {
                    hint::black_box(root);
                }
            }
        }
    }
}

/// Load a trace, replay it once with verification, then once timed, and
/// write the timing log into the current working directory.
pub fn bench_trace(path: &Path, cfg: &RunConfig) -> Result<Duration, DriverError> {
    let meta = TraceMeta::from_path(path)?;
    if !matches!(meta.kind, TraceKind::Lookup | TraceKind::Cut) {
        return Err(DriverError::Unsupported { kind: meta.kind });
    }
    let trace = Trace::read_from(path)?;

    info!(kind = %meta.kind, n = meta.n, "verification pass");
    let check_cfg = RunConfig {
        verify: true,
        ..*cfg
    };
    execute(&trace, meta.n, &check_cfg)?;

    info!("timed pass");
    let timed_cfg = RunConfig {
        verify: false,
        ..*cfg
    };
    let elapsed = execute(&trace, meta.n, &timed_cfg)?;

    let log_path = PathBuf::from(log_file_name(&meta, cfg));
    write_log(&log_path, elapsed)?;
    info!(log = %log_path.display(), ms = elapsed.as_millis() as u64, "done");
    Ok(elapsed)
}

pub fn log_file_name(meta: &TraceMeta, cfg: &RunConfig) -> String {
    let mut name = format!(
        "{}-p_{}-w_{}-b_{}-n_{}",
        meta.kind,
        u8::from(cfg.variant.is_parallel()),
        meta.shape,
        meta.beta,
        meta.n
    );
    if cfg.variant.is_parallel() {
        name.push_str(&format!(
            "-t_{}-f_{}-l_{}",
            cfg.num_threads, cfg.task_factor, cfg.variant
        ));
    }
    name.push_str(".log");
    name
}

fn write_log(path: &Path, elapsed: Duration) -> Result<(), DriverError> {
    std::fs::write(path, format!("{} ms\n", elapsed.as_millis())).map_err(|source| {
        DriverError::Log {
            path: path.to_path_buf(),
            source,
        }
    })
}
