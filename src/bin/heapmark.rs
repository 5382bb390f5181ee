use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use heapmark::probe::{ByteLedger, LedgerProbe, ProcessProbe, TrackingAllocator, PROCESS_TAG};
use heapmark::report;
use heapmark::retention::{RetentionHarness, RetentionSample};
use heapmark::schema::{Measurement, Report, RetentionRow, RunMeta};
use heapmark::workloads::{alloc, dispatch, loops};
use heapmark::{
    BenchConfig, BenchmarkResult, BenchmarkRunner, Profile, RunAborted, StabilizationPolicy,
    WorkloadSet,
};

// Whole-process retained-bytes accounting for the `process` probe rows.
#[global_allocator]
static ALLOCATOR: TrackingAllocator = TrackingAllocator::system();

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Time the built-in dispatch and loop workload suites.
    Bench {
        /// Which workload suite(s) to benchmark.
        #[arg(long, value_enum, default_value_t = WorkloadSet::All)]
        workloads: WorkloadSet,
    },

    /// Probe retained-bytes deltas for the built-in allocation workloads.
    Retention,

    /// Run benchmarks and retention probes together.
    Suite {
        /// Which workload suite(s) to benchmark.
        #[arg(long, value_enum, default_value_t = WorkloadSet::All)]
        workloads: WorkloadSet,
    },
}

#[derive(Parser, Debug)]
#[command(name = "heapmark")]
#[command(about = "Microbenchmark and heap-retention measurement harness (text + JSON reports)")]
struct Args {
    #[arg(long, value_enum, default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    /// Un-timed stabilization passes per case; defaults from the profile.
    #[arg(long, global = true)]
    rehearsal_passes: Option<u32>,

    /// Timed passes averaged into each result; defaults from the profile.
    #[arg(long, global = true)]
    measured_passes: Option<u32>,

    /// Thunk invocations per pass; defaults from the profile.
    #[arg(long, global = true)]
    iterations: Option<u64>,

    /// Where to write the JSON report in addition to the text tables.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

fn now_utc_timestamp() -> String {
    // Avoid a chrono dependency; this is "good enough" for reports.
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn git_sha_short() -> Option<String> {
    // Best-effort: read from environment set by CI/build scripts.
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("heapmark: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let cfg = BenchConfig {
        profile: args.profile.into(),
        seed: args.seed,
    };
    let preset = cfg.policy();
    let policy = StabilizationPolicy {
        rehearsal_passes: args.rehearsal_passes.unwrap_or(preset.rehearsal_passes),
        measured_passes: args.measured_passes.unwrap_or(preset.measured_passes),
    };
    let iterations = args.iterations.unwrap_or_else(|| cfg.iterations());

    let mut results = Vec::new();
    let mut samples = Vec::new();

    match args.cmd {
        Command::Bench { workloads } => {
            let outcome = run_benchmarks(workloads, iterations, &policy, &mut results);
            if !results.is_empty() {
                print!("{}", report::render_benchmarks(&results));
            }
            outcome?;
        }
        Command::Retention => {
            let outcome = run_retention(&cfg, &mut samples);
            if !samples.is_empty() {
                print!("{}", report::render_retention(&samples));
            }
            outcome?;
        }
        Command::Suite { workloads } => {
            let bench_outcome = run_benchmarks(workloads, iterations, &policy, &mut results);
            if !results.is_empty() {
                print!("{}", report::render_benchmarks(&results));
            }
            bench_outcome?;

            println!();
            let retention_outcome = run_retention(&cfg, &mut samples);
            if !samples.is_empty() {
                print!("{}", report::render_retention(&samples));
            }
            retention_outcome?;
        }
    }

    if let Some(out) = &args.out {
        let report = Report {
            run: RunMeta {
                schema_version: 1,
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                profile: cfg.profile.as_str().to_string(),
                seed: cfg.seed,
                rehearsal_passes: policy.rehearsal_passes,
                measured_passes: policy.measured_passes,
                timestamp_utc: now_utc_timestamp(),
                git_sha: git_sha_short(),
            },
            measurements: results.iter().map(Measurement::from).collect(),
            retention: samples.iter().map(RetentionRow::from).collect(),
        };
        fs::write(out, serde_json::to_string_pretty(&report)?)?;
    }

    Ok(())
}

fn run_benchmarks(
    set: WorkloadSet,
    iterations: u64,
    policy: &StabilizationPolicy,
    results: &mut Vec<BenchmarkResult>,
) -> Result<(), Box<dyn Error>> {
    let mut runner = BenchmarkRunner::new();
    if matches!(set, WorkloadSet::All | WorkloadSet::Dispatch) {
        dispatch::register(&mut runner, iterations);
    }
    if matches!(set, WorkloadSet::All | WorkloadSet::Loops) {
        loops::register(&mut runner, iterations);
    }

    match runner.run(policy) {
        Ok(completed) => {
            *results = completed;
            Ok(())
        }
        Err(RunAborted {
            label,
            completed,
            source,
        }) => {
            // Cases finished before the failure are still reported.
            *results = completed;
            Err(RunAborted {
                label,
                completed: Vec::new(),
                source,
            }
            .into())
        }
    }
}

fn run_retention(
    cfg: &BenchConfig,
    samples: &mut Vec<RetentionSample>,
) -> Result<(), Box<dyn Error>> {
    let ledger = ByteLedger::new();
    let probe = LedgerProbe::new(&ledger);
    let harness = RetentionHarness::new(&probe);

    let churn_tag = ledger.register("alloc/churn");
    samples.push(harness.measure(
        "alloc/churn",
        alloc::churn_unit(churn_tag, cfg.rng(), alloc::RETAINED_BUF_LEN),
    )?);

    let mut registry = alloc::Registry::new();
    let retain_tag = ledger.register("alloc/retain");
    samples.push(harness.measure(
        "alloc/retain",
        alloc::retain_unit(
            retain_tag,
            &mut registry,
            cfg.rng(),
            alloc::RETAINED_BUF_LEN,
        ),
    )?);

    // Whole-process view of the same retaining workload, through the
    // tracking allocator installed at the top of this binary.
    let process_probe = ProcessProbe;
    let process_harness = RetentionHarness::new(&process_probe);
    let process_retain_tag = ledger.register("alloc/retain");
    samples.push(process_harness.measure(
        PROCESS_TAG,
        alloc::retain_unit(
            process_retain_tag,
            &mut registry,
            cfg.rng(),
            alloc::RETAINED_BUF_LEN,
        ),
    )?);

    Ok(())
}
