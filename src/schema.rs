use serde::{Deserialize, Serialize};

use crate::harness::BenchmarkResult;
use crate::retention::RetentionSample;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub tool_version: String,
    pub profile: String,
    pub seed: u64,
    pub rehearsal_passes: u32,
    pub measured_passes: u32,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub label: String,
    pub iterations: u64,

    /// Mean wall time of the measured passes, in nanoseconds.
    pub real_ns: u128,
    /// Mean process CPU time of the measured passes, in nanoseconds.
    pub cpu_ns: u128,
}

impl From<&BenchmarkResult> for Measurement {
    fn from(r: &BenchmarkResult) -> Self {
        Measurement {
            label: r.label.clone(),
            iterations: r.iterations,
            real_ns: r.real_time.as_nanos(),
            cpu_ns: r.cpu_time.as_nanos(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionRow {
    pub type_tag: String,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub delta: i64,
}

impl From<&RetentionSample> for RetentionRow {
    fn from(s: &RetentionSample) -> Self {
        RetentionRow {
            type_tag: s.type_tag.clone(),
            bytes_before: s.bytes_before,
            bytes_after: s.bytes_after,
            delta: s.delta,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run: RunMeta,
    pub measurements: Vec<Measurement>,
    pub retention: Vec<RetentionRow>,
}
