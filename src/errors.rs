use thiserror::Error;

use crate::harness::BenchmarkResult;

/// Error raised by a workload thunk or unit of work. The harness never
/// inspects these; they are carried through unchanged.
pub type WorkloadError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// A workload raised. The originating error stays attached as the source.
    #[error("workload '{label}' failed")]
    Workload {
        label: String,
        #[source]
        source: WorkloadError,
    },
    #[error("heap probe cannot report retained bytes for '{type_tag}'")]
    UnsupportedProbeTarget { type_tag: String },
    #[error("no samples to aggregate")]
    InsufficientSamples,
}

impl HarnessError {
    pub fn workload<T: Into<String>>(label: T, source: WorkloadError) -> Self {
        HarnessError::Workload {
            label: label.into(),
            source,
        }
    }

    pub fn unsupported_probe_target<T: Into<String>>(type_tag: T) -> Self {
        HarnessError::UnsupportedProbeTarget {
            type_tag: type_tag.into(),
        }
    }
}

/// A benchmark run stopped at a failing case. Results for cases that
/// completed before the failure are preserved so callers can still report
/// them.
#[derive(Debug, Error)]
#[error("benchmark run aborted at case '{label}'")]
pub struct RunAborted {
    pub label: String,
    pub completed: Vec<BenchmarkResult>,
    #[source]
    pub source: HarnessError,
}
