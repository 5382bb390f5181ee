use std::time::{Duration, Instant};

use cpu_time::ProcessTime;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::errors::{HarnessError, RunAborted, WorkloadError};
use crate::stats;

#[derive(Clone, Copy, Debug)]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub profile: Profile,
    pub seed: u64,
}

impl BenchConfig {
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }

    /// Per-case thunk invocations per pass.
    pub fn iterations(&self) -> u64 {
        match self.profile {
            Profile::Quick => 10_000,
            Profile::Full => 100_000,
        }
    }

    pub fn policy(&self) -> StabilizationPolicy {
        match self.profile {
            Profile::Quick => StabilizationPolicy {
                rehearsal_passes: 1,
                measured_passes: 3,
            },
            Profile::Full => StabilizationPolicy {
                rehearsal_passes: 2,
                measured_passes: 10,
            },
        }
    }
}

/// How many un-timed rehearsal passes to run before the measured passes.
///
/// Rehearsal lets one-time warm-up costs settle (lazy initialization,
/// first-touch page faults, cold caches) so they do not pollute the
/// measured phase. First-use costs of dynamically-constructed operations
/// are amortized in real systems, so they are amortized here too.
#[derive(Clone, Copy, Debug)]
pub struct StabilizationPolicy {
    pub rehearsal_passes: u32,
    pub measured_passes: u32,
}

/// A labeled, opaque unit of work. The runner never inspects how a thunk
/// was constructed, only that it is callable and may raise.
pub struct BenchmarkCase {
    label: String,
    iterations: u64,
    thunk: Box<dyn FnMut() -> Result<(), WorkloadError>>,
}

impl BenchmarkCase {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}

/// Mean wall and CPU duration of the measured passes for one case.
#[derive(Clone, Debug)]
pub struct BenchmarkResult {
    pub label: String,
    pub real_time: Duration,
    pub cpu_time: Duration,
    pub iterations: u64,
}

/// Runs registered cases in registration order: rehearsal passes first,
/// timings discarded, then measured passes reported as the arithmetic
/// mean. Strictly sequential; concurrent execution would break per-case
/// timing isolation.
#[derive(Default)]
pub struct BenchmarkRunner {
    cases: Vec<BenchmarkCase>,
}

impl BenchmarkRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, label: impl Into<String>, iterations: u64, thunk: F)
    where
        F: FnMut() -> Result<(), WorkloadError> + 'static,
    {
        self.cases.push(BenchmarkCase {
            label: label.into(),
            iterations,
            thunk: Box::new(thunk),
        });
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// One result per case, in registration order, each with the case's
    /// exact configured iteration count. A thunk error aborts the run at
    /// that case; results completed before it ride along in the error.
    pub fn run(&mut self, policy: &StabilizationPolicy) -> Result<Vec<BenchmarkResult>, RunAborted> {
        let mut completed = Vec::with_capacity(self.cases.len());
        for case in &mut self.cases {
            match run_case(case, policy) {
                Ok(result) => completed.push(result),
                Err(source) => {
                    return Err(RunAborted {
                        label: case.label.clone(),
                        completed,
                        source,
                    })
                }
            }
        }
        Ok(completed)
    }
}

fn run_case(
    case: &mut BenchmarkCase,
    policy: &StabilizationPolicy,
) -> Result<BenchmarkResult, HarnessError> {
    for _ in 0..policy.rehearsal_passes {
        for _ in 0..case.iterations {
            (case.thunk)().map_err(|e| HarnessError::workload(&case.label, e))?;
        }
    }

    let mut real = Vec::with_capacity(policy.measured_passes as usize);
    let mut cpu = Vec::with_capacity(policy.measured_passes as usize);
    for _ in 0..policy.measured_passes {
        let wall_start = Instant::now();
        let cpu_start = ProcessTime::now();
        for _ in 0..case.iterations {
            (case.thunk)().map_err(|e| HarnessError::workload(&case.label, e))?;
        }
        cpu.push(cpu_start.elapsed());
        real.push(wall_start.elapsed());
    }

    Ok(BenchmarkResult {
        label: case.label.clone(),
        real_time: stats::summarize(&real)?.mean,
        cpu_time: stats::summarize(&cpu)?.mean,
        iterations: case.iterations,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    const POLICY: StabilizationPolicy = StabilizationPolicy {
        rehearsal_passes: 2,
        measured_passes: 3,
    };

    #[test]
    fn results_in_registration_order_with_exact_iterations() {
        let mut runner = BenchmarkRunner::new();
        runner.register("slow", 40, || Ok(()));
        runner.register("fast", 7, || Ok(()));
        runner.register("medium", 19, || Ok(()));

        let results = runner.run(&POLICY).unwrap();
        let labels: Vec<&str> = results.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["slow", "fast", "medium"]);
        let iters: Vec<u64> = results.iter().map(|r| r.iterations).collect();
        assert_eq!(iters, [40, 7, 19]);
    }

    #[test]
    fn thunk_runs_iterations_times_per_pass() {
        let calls = Rc::new(Cell::new(0u64));
        let mut runner = BenchmarkRunner::new();
        runner.register("counting", 11, {
            let calls = Rc::clone(&calls);
            move || {
                calls.set(calls.get() + 1);
                Ok(())
            }
        });

        runner.run(&POLICY).unwrap();
        let passes = (POLICY.rehearsal_passes + POLICY.measured_passes) as u64;
        assert_eq!(calls.get(), 11 * passes);
    }

    #[test]
    fn noop_case_has_nonnegative_stable_mean() {
        let mut runner = BenchmarkRunner::new();
        runner.register("noop", 100, || Ok(()));
        let results = runner
            .run(&StabilizationPolicy {
                rehearsal_passes: 1,
                measured_passes: 5,
            })
            .unwrap();
        // Duration is unsigned; the meaningful bound is an upper one.
        assert!(results[0].real_time < Duration::from_secs(1));
        assert!(results[0].cpu_time < Duration::from_secs(1));
    }

    #[test]
    fn failing_case_aborts_and_keeps_prior_results() {
        let mut runner = BenchmarkRunner::new();
        runner.register("ok", 3, || Ok(()));
        runner.register("broken", 3, || Err("thunk exploded".into()));
        runner.register("never_run", 3, || Ok(()));

        let aborted = runner.run(&POLICY).unwrap_err();
        assert_eq!(aborted.label, "broken");
        assert_eq!(aborted.completed.len(), 1);
        assert_eq!(aborted.completed[0].label, "ok");
        assert!(matches!(
            aborted.source,
            HarnessError::Workload { ref label, .. } if label == "broken"
        ));
    }

    #[test]
    fn rehearsal_failure_produces_no_result_for_that_case() {
        let attempts = Rc::new(Cell::new(0u32));
        let mut runner = BenchmarkRunner::new();
        runner.register("fails_on_first_call", 5, {
            let attempts = Rc::clone(&attempts);
            move || {
                attempts.set(attempts.get() + 1);
                Err("boom".into())
            }
        });

        let aborted = runner.run(&POLICY).unwrap_err();
        assert!(aborted.completed.is_empty());
        // Fail-fast: no retry after the first raise.
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn zero_measured_passes_is_insufficient() {
        let mut runner = BenchmarkRunner::new();
        runner.register("noop", 1, || Ok(()));
        let aborted = runner
            .run(&StabilizationPolicy {
                rehearsal_passes: 1,
                measured_passes: 0,
            })
            .unwrap_err();
        assert!(matches!(aborted.source, HarnessError::InsufficientSamples));
    }

    #[test]
    fn profile_presets() {
        let quick = BenchConfig {
            profile: Profile::Quick,
            seed: 0,
        };
        let full = BenchConfig {
            profile: Profile::Full,
            seed: 0,
        };
        assert!(quick.iterations() < full.iterations());
        assert!(quick.policy().measured_passes < full.policy().measured_passes);
        assert_eq!(quick.profile.as_str(), "quick");
    }
}
