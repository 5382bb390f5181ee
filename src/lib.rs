use clap::ValueEnum;

pub mod errors;
pub mod harness;
pub mod probe;
pub mod report;
pub mod retention;
pub mod schema;
pub mod stats;
pub mod workloads;

pub use errors::{HarnessError, RunAborted, WorkloadError};
pub use harness::{BenchConfig, BenchmarkResult, BenchmarkRunner, Profile, StabilizationPolicy};
pub use probe::{ByteLedger, HeapProbe, LedgerProbe, ProcessProbe, TrackingAllocator};
pub use retention::{RetentionHarness, RetentionSample};

/// Built-in workload suite to benchmark.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum WorkloadSet {
    /// Run all benchmark suites (dispatch, loops).
    #[default]
    All,
    /// Call-dispatch shapes only.
    Dispatch,
    /// Loop shapes only.
    Loops,
}
