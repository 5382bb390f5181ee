use std::hint::black_box;

use crate::harness::BenchmarkRunner;

/// Inner trip count per thunk call, so each case measures loop initiation
/// plus a fixed amount of body work.
const INNER_LEN: u64 = 1_000;

/// Registers loop-shape cases iterating the same body through a range
/// `for`, a manual `while`, and an iterator adapter.
pub fn register(runner: &mut BenchmarkRunner, iterations: u64) {
    runner.register("loop/range_for", iterations, || {
        let mut a = 0u64;
        for i in 0..black_box(INNER_LEN) {
            a = black_box(i);
        }
        black_box(a);
        Ok(())
    });

    runner.register("loop/while", iterations, || {
        let mut a = 0u64;
        let mut i = 0u64;
        while i < black_box(INNER_LEN) {
            a = black_box(i);
            i += 1;
        }
        black_box(a);
        Ok(())
    });

    runner.register("loop/iterator", iterations, || {
        let a = (0..black_box(INNER_LEN)).fold(0u64, |_, i| black_box(i));
        black_box(a);
        Ok(())
    });
}
