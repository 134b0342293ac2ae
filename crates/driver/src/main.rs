use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use driver::{bench_trace, RunConfig, Variant};

/// Replay a workload trace against a concurrent link-cut forest.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// trace file, named <type>-<shape>-<beta>-<n>.bin
    trace: PathBuf,

    /// worker threads per batch
    num_threads: usize,

    /// tasks per thread multiplier
    task_factor: usize,

    /// 1 selects the lock-coupling back-end, 0 the path-lock one
    #[arg(value_parser = clap::value_parser!(u8).range(0..=1), default_value_t = 0)]
    lock_coupling: u8,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let cfg = RunConfig {
        num_threads: args.num_threads,
        task_factor: args.task_factor,
        variant: if args.lock_coupling == 1 {
            Variant::LockCoupling
        } else {
            Variant::PathLock
        },
        verify: false,
    };
    match bench_trace(&args.trace, &cfg) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
