//! Built-in workload suites the CLI runs.
//!
//! Every workload is an opaque, labeled, zero-argument callable; nothing
//! in the harness depends on how it was constructed. Suites cover call
//! dispatch shapes, loop shapes, and allocation behavior.

pub mod alloc;
pub mod dispatch;
pub mod loops;
