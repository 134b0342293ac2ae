use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use workload::{generate, TraceError, TreeShape, WorkloadKind, DEFAULT_RETAIN};

/// Build a batched link/cut/lookup workload trace.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// number of forest nodes
    n: u32,

    /// tree shape: "random" or "<k>-ary"
    shape: TreeShape,

    /// workload kind
    #[arg(value_enum)]
    kind: WorkloadKind,

    /// batch size
    #[arg(value_parser = clap::value_parser!(u32).range(100..))]
    beta: u32,

    /// fraction of shuffled tree edges to keep
    #[arg(long, default_value_t = DEFAULT_RETAIN)]
    retain: f64,

    /// generator seed
    #[arg(long, default_value_t = 123)]
    seed: u64,

    /// output directory
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn run(args: Args) -> Result<(), TraceError> {
    info!(
        n = args.n,
        shape = %args.shape.label(),
        kind = %args.kind,
        beta = args.beta,
        "building workload"
    );
    let (meta, trace) = generate(
        args.shape,
        args.kind,
        args.n,
        args.beta,
        args.retain,
        args.seed,
    );
    info!(records = trace.record_count(), "self-check passed");

    let path = args.out_dir.join(meta.file_name());
    trace.write_to(&path)?;
    info!(path = %path.display(), "trace written");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
