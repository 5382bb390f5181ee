use std::collections::HashMap;
use std::hint::black_box;

use crate::harness::BenchmarkRunner;

/// Registers call-dispatch cases: a statically-defined operation, the same
/// operation synthesized at runtime behind a vtable, and a fallback path
/// that resolves the operation by name on every call.
pub fn register(runner: &mut BenchmarkRunner, iterations: u64) {
    runner.register("dispatch/direct", iterations, {
        let mut acc = 0u64;
        move || {
            acc = black_box(succ(acc));
            Ok(())
        }
    });

    let synthesized: Box<dyn Fn(u64) -> u64> = Box::new(|x| x.wrapping_add(1));
    runner.register("dispatch/boxed", iterations, {
        let mut acc = 0u64;
        move || {
            acc = black_box(synthesized(acc));
            Ok(())
        }
    });

    let mut handlers: HashMap<&'static str, fn(u64) -> u64> = HashMap::new();
    handlers.insert("succ", succ);
    runner.register("dispatch/fallback", iterations, {
        let mut acc = 0u64;
        move || {
            // Resolved per call, like a handler invoked only when no
            // direct match exists.
            let handler = handlers
                .get(black_box("succ"))
                .copied()
                .ok_or("no fallback handler registered for 'succ'")?;
            acc = black_box(handler(acc));
            Ok(())
        }
    });
}

fn succ(x: u64) -> u64 {
    x.wrapping_add(1)
}
