//! Brackets a unit of work with before/after retained-bytes snapshots.

use crate::errors::{HarnessError, WorkloadError};
use crate::probe::HeapProbe;

/// Retained-bytes delta attributable to one unit of work.
///
/// `delta` may be negative when an unrelated release lowered the baseline
/// between snapshots. A positive delta is a *signal*, not proof of a leak
/// in a single invocation; assertions should use a deliberately retained,
/// identifiable allocation with a threshold, plus an allocate-and-drop
/// control expected near zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetentionSample {
    pub type_tag: String,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub delta: i64,
}

pub struct RetentionHarness<'p> {
    probe: &'p dyn HeapProbe,
}

impl<'p> RetentionHarness<'p> {
    pub fn new(probe: &'p dyn HeapProbe) -> Self {
        Self { probe }
    }

    /// Snapshots retained bytes for `type_tag`, invokes `unit_of_work`
    /// exactly once synchronously, snapshots again. Each snapshot is taken
    /// immediately after a completed forced-collection pass.
    ///
    /// Forced collections are expensive on runtimes that actually collect;
    /// expect latency proportional to total live heap, not just the unit
    /// of work's allocations.
    pub fn measure<F>(&self, type_tag: &str, unit_of_work: F) -> Result<RetentionSample, HarnessError>
    where
        F: FnOnce() -> Result<(), WorkloadError>,
    {
        self.probe.force_full_collection();
        let bytes_before = self.probe.aggregate_retained_bytes(type_tag)?;

        unit_of_work().map_err(|e| HarnessError::workload(type_tag, e))?;

        self.probe.force_full_collection();
        let bytes_after = self.probe.aggregate_retained_bytes(type_tag)?;

        Ok(RetentionSample {
            type_tag: type_tag.to_string(),
            bytes_before,
            bytes_after,
            delta: bytes_after as i64 - bytes_before as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Probe that replays scripted byte counts and records the call order.
    struct ScriptedProbe {
        counts: RefCell<Vec<u64>>,
        calls: RefCell<Vec<&'static str>>,
        supported: &'static str,
    }

    impl ScriptedProbe {
        fn new(supported: &'static str, counts: Vec<u64>) -> Self {
            Self {
                counts: RefCell::new(counts),
                calls: RefCell::new(Vec::new()),
                supported,
            }
        }
    }

    impl HeapProbe for ScriptedProbe {
        fn force_full_collection(&self) {
            self.calls.borrow_mut().push("collect");
        }

        fn aggregate_retained_bytes(&self, type_tag: &str) -> Result<u64, HarnessError> {
            self.calls.borrow_mut().push("read");
            if type_tag != self.supported {
                return Err(HarnessError::unsupported_probe_target(type_tag));
            }
            Ok(self.counts.borrow_mut().remove(0))
        }
    }

    #[test]
    fn snapshots_bracket_the_work_in_order() {
        let probe = ScriptedProbe::new("strings", vec![500, 10_500]);
        let harness = RetentionHarness::new(&probe);
        let worked = RefCell::new(false);

        let sample = harness
            .measure("strings", || {
                *worked.borrow_mut() = true;
                Ok(())
            })
            .unwrap();

        assert!(*worked.borrow());
        assert_eq!(sample.type_tag, "strings");
        assert_eq!(sample.bytes_before, 500);
        assert_eq!(sample.bytes_after, 10_500);
        assert_eq!(sample.delta, 10_000);
        assert_eq!(
            *probe.calls.borrow(),
            ["collect", "read", "collect", "read"]
        );
    }

    #[test]
    fn delta_may_be_negative() {
        let probe = ScriptedProbe::new("strings", vec![4_000, 1_000]);
        let harness = RetentionHarness::new(&probe);
        let sample = harness.measure("strings", || Ok(())).unwrap();
        assert_eq!(sample.delta, -3_000);
    }

    #[test]
    fn unsupported_tag_fails_before_work_runs() {
        let probe = ScriptedProbe::new("strings", vec![]);
        let harness = RetentionHarness::new(&probe);
        let worked = RefCell::new(false);

        let err = harness
            .measure("files", || {
                *worked.borrow_mut() = true;
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, HarnessError::UnsupportedProbeTarget { .. }));
        assert!(!*worked.borrow());
        assert_eq!(*probe.calls.borrow(), ["collect", "read"]);
    }

    #[test]
    fn workload_error_propagates_without_a_sample() {
        let probe = ScriptedProbe::new("strings", vec![500]);
        let harness = RetentionHarness::new(&probe);

        let err = harness
            .measure("strings", || Err("work exploded".into()))
            .unwrap_err();

        assert!(matches!(
            err,
            HarnessError::Workload { ref label, .. } if label == "strings"
        ));
        // No after-snapshot once the work has raised.
        assert_eq!(*probe.calls.borrow(), ["collect", "read"]);
    }
}
