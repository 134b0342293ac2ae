use std::collections::HashSet;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use driver::{execute, log_file_name, run_trace_on, RunConfig, Variant};
use forest::{PathLockForest, SharedForest, UnionFind};
use workload::{generate, OpKind, Trace, TraceMeta, TreeShape, WorkloadKind, DEFAULT_RETAIN};

fn config(variant: Variant, num_threads: usize, task_factor: usize) -> RunConfig {
    RunConfig {
        num_threads,
        task_factor,
        variant,
        verify: true,
    }
}

/// Complete binary tree of 1023 nodes built by one LINK batch, then a
/// LOOKUP batch pairing every leaf with the root.
fn binary_tree_trace() -> Trace {
    let n = 1023_u32;
    let links: Vec<(u32, u32)> = (1..n).map(|i| (i, (i - 1) / 2)).collect();
    let lookups: Vec<(u32, u32)> = (511..n).map(|leaf| (leaf, 0)).collect();
    let mut trace = Trace::new();
    trace.push_batch(OpKind::Link, &links);
    trace.push_batch(OpKind::Lookup, &lookups);
    trace
}

#[test]
fn concurrent_lookup_batch_on_binary_tree() {
    let trace = binary_tree_trace();
    execute(&trace, 1023, &config(Variant::LockCoupling, 8, 4)).expect("lock-coupling run");
    execute(&trace, 1023, &config(Variant::PathLock, 8, 4)).expect("path-lock run");
    execute(&trace, 1023, &config(Variant::Sequential, 1, 1)).expect("sequential run");
}

#[test]
fn concurrent_cut_workload_matches_union_find() {
    let (meta, trace) = generate(
        TreeShape::Random,
        WorkloadKind::Cut,
        10_000,
        1_000,
        DEFAULT_RETAIN,
        0xD_2026,
    );

    // Every LOOKUP carries its expected root; verify mode asserts them all.
    let forest = PathLockForest::new(meta.n);
    run_trace_on(&forest, &trace, &config(Variant::PathLock, 4, 2));

    // The surviving LINK set, replayed through the union-find oracle, must
    // agree with the forest on sampled connectivity queries.
    let mut cut: HashSet<(u32, u32)> = HashSet::new();
    for batch in trace.batches() {
        if batch.kind == OpKind::Cut {
            cut.extend(batch.ops.iter().copied());
        }
    }
    let mut oracle = UnionFind::new(meta.n);
    for batch in trace.batches() {
        if batch.kind == OpKind::Link {
            for &(u, v) in batch.ops {
                if !cut.contains(&(u, v)) {
                    oracle.union(u, v);
                }
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(0xD_2026);
    for _ in 0..100 {
        let u = rng.random_range(0..meta.n);
        let v = rng.random_range(0..meta.n);
        assert_eq!(
            forest.are_connected(u, v),
            oracle.connected(u, v),
            "are_connected({u},{v})"
        );
    }
}

#[test]
fn generated_lookup_workload_runs_on_all_variants() {
    let (meta, trace) = generate(
        TreeShape::KAry(2),
        WorkloadKind::Lookup,
        2_000,
        100,
        DEFAULT_RETAIN,
        0xC_2026,
    );
    execute(&trace, meta.n, &config(Variant::Sequential, 1, 1)).expect("sequential");
    execute(&trace, meta.n, &config(Variant::PathLock, 4, 4)).expect("path-lock");
    execute(&trace, meta.n, &config(Variant::LockCoupling, 4, 4)).expect("lock-coupling");
}

#[test]
fn empty_batch_spawns_no_work() {
    let mut trace = Trace::new();
    trace.push_batch(OpKind::Lookup, &[]);
    let elapsed = execute(&trace, 4, &config(Variant::PathLock, 8, 4)).expect("run");
    // Nothing to do, but the run must complete cleanly.
    assert!(elapsed.as_secs() < 1);
}

#[test]
fn tiny_batch_runs_on_calling_thread() {
    // 3 operations with 8 threads and task factor 4: task_size is zero, so
    // the batch must execute inline and still verify.
    let mut trace = Trace::new();
    trace.push_batch(OpKind::Link, &[(1, 0), (2, 1)]);
    trace.push_batch(OpKind::Lookup, &[(2, 0), (1, 0), (0, 0)]);
    execute(&trace, 3, &config(Variant::LockCoupling, 8, 4)).expect("run");
}

#[test]
fn zero_thread_config_is_rejected() {
    let trace = Trace::new();
    assert!(execute(&trace, 1, &config(Variant::PathLock, 0, 4)).is_err());
    assert!(execute(&trace, 1, &config(Variant::PathLock, 4, 0)).is_err());
}

#[test]
fn log_names_encode_the_run() {
    assert_eq!("lock-coupling".parse::<Variant>(), Ok(Variant::LockCoupling));
    assert_eq!("sequential".parse::<Variant>(), Ok(Variant::Sequential));
    assert!("coarse".parse::<Variant>().is_err());

    let meta = TraceMeta::from_path(Path::new("lookup-random-1000-10000.bin")).expect("meta");
    assert_eq!(
        log_file_name(&meta, &config(Variant::Sequential, 1, 1)),
        "lookup-p_0-w_random-b_1000-n_10000.log"
    );
    assert_eq!(
        log_file_name(&meta, &config(Variant::LockCoupling, 8, 4)),
        "lookup-p_1-w_random-b_1000-n_10000-t_8-f_4-l_lock-coupling.log"
    );
}

#[test]
fn trace_written_by_generator_is_executable_from_disk() {
    let (meta, trace) = generate(
        TreeShape::Random,
        WorkloadKind::Lookup,
        1_000,
        200,
        DEFAULT_RETAIN,
        0xE_2026,
    );
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(meta.file_name());
    trace.write_to(&path).expect("write");

    let back = Trace::read_from(&path).expect("read");
    let parsed = TraceMeta::from_path(&path).expect("name");
    assert_eq!(parsed.n, meta.n);
    execute(&back, parsed.n, &config(Variant::LockCoupling, 4, 2)).expect("run");
}
