use std::hint::black_box;

use rand::RngCore;

use crate::errors::WorkloadError;
use crate::probe::{TagHandle, TrackedBuf};

/// Default buffer size for the retaining workload.
pub const RETAINED_BUF_LEN: usize = 10_000;

/// Holds buffers a workload deliberately refuses to release. Injected
/// rather than ambient so callers can assert on its exact contents and
/// retention measurements stay reproducible per run.
#[derive(Default)]
pub struct Registry {
    bufs: Vec<TrackedBuf>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, buf: TrackedBuf) {
        self.bufs.push(buf);
    }

    pub fn len(&self) -> usize {
        self.bufs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bufs.is_empty()
    }

    pub fn retained_bytes(&self) -> u64 {
        self.bufs.iter().map(|b| b.len() as u64).sum()
    }

    pub fn clear(&mut self) {
        self.bufs.clear();
    }
}

/// Unit of work that allocates a buffer, touches it, and drops every
/// reference before returning. Expected retained delta: zero.
pub fn churn_unit<R: RngCore>(
    tag: TagHandle,
    mut rng: R,
    len: usize,
) -> impl FnOnce() -> Result<(), WorkloadError> {
    move || {
        let buf = TrackedBuf::filled(&tag, &mut rng, len);
        let sum = buf
            .as_slice()
            .iter()
            .fold(0u64, |a, &b| a.wrapping_add(b as u64));
        black_box(sum);
        Ok(())
    }
}

/// Unit of work that appends a buffer of `len` identifiable bytes to the
/// injected registry, so the buffer outlives the call. Expected retained
/// delta: at least `len`.
pub fn retain_unit<'a, R: RngCore + 'a>(
    tag: TagHandle,
    registry: &'a mut Registry,
    mut rng: R,
    len: usize,
) -> impl FnOnce() -> Result<(), WorkloadError> + 'a {
    move || {
        registry.push(TrackedBuf::filled(&tag, &mut rng, len));
        Ok(())
    }
}
