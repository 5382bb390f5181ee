use std::time::Duration;

use crate::errors::HarnessError;

/// Aggregate of an ordered sequence of per-pass durations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Summary {
    pub min: Duration,
    pub mean: Duration,
    pub max: Duration,
}

/// Reduces per-pass durations to `{min, mean, max}`. Pure; retains no
/// state between calls.
pub fn summarize(samples: &[Duration]) -> Result<Summary, HarnessError> {
    if samples.is_empty() {
        return Err(HarnessError::InsufficientSamples);
    }

    let mut min = samples[0];
    let mut max = samples[0];
    let mut total = Duration::ZERO;
    for &sample in samples {
        total += sample;
        if sample < min {
            min = sample;
        }
        if sample > max {
            max = sample;
        }
    }

    Ok(Summary {
        min,
        mean: total / samples.len() as u32,
        max,
    })
}
