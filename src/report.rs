//! Text rendering for benchmark and retention results. Purely
//! presentational; writing the rendered text anywhere is the caller's job.

use std::fmt::Write;
use std::time::Duration;

use crate::harness::BenchmarkResult;
use crate::retention::RetentionSample;

const NUM_WIDTH: usize = 14;

pub fn render_benchmarks(results: &[BenchmarkResult]) -> String {
    let label_width = column_width("label", results.iter().map(|r| r.label.as_str()));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<label_width$}  {:>NUM_WIDTH$}  {:>NUM_WIDTH$}",
        "label", "real_time", "cpu_time"
    );
    for result in results {
        let _ = writeln!(
            out,
            "{:<label_width$}  {:>NUM_WIDTH$}  {:>NUM_WIDTH$}",
            result.label,
            format_duration(result.real_time),
            format_duration(result.cpu_time)
        );
    }
    out
}

pub fn render_retention(samples: &[RetentionSample]) -> String {
    let tag_width = column_width("type_tag", samples.iter().map(|s| s.type_tag.as_str()));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<tag_width$}  {:>NUM_WIDTH$}  {:>NUM_WIDTH$}  {:>NUM_WIDTH$}",
        "type_tag", "bytes_before", "bytes_after", "delta"
    );
    for sample in samples {
        let _ = writeln!(
            out,
            "{:<tag_width$}  {:>NUM_WIDTH$}  {:>NUM_WIDTH$}  {:>NUM_WIDTH$}",
            sample.type_tag, sample.bytes_before, sample.bytes_after, sample.delta
        );
    }
    out
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values.map(str::len).chain([header.len()]).max().unwrap_or(0)
}

/// Human-readable duration with a unit chosen by magnitude.
pub fn format_duration(d: Duration) -> String {
    let ns = d.as_nanos();
    if ns < 1_000 {
        format!("{ns} ns")
    } else if ns < 1_000_000 {
        format!("{:.2} us", ns as f64 / 1e3)
    } else if ns < 1_000_000_000 {
        format!("{:.2} ms", ns as f64 / 1e6)
    } else {
        format!("{:.2} s", ns as f64 / 1e9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, real_ns: u64, cpu_ns: u64) -> BenchmarkResult {
        BenchmarkResult {
            label: label.to_string(),
            real_time: Duration::from_nanos(real_ns),
            cpu_time: Duration::from_nanos(cpu_ns),
            iterations: 1_000,
        }
    }

    #[test]
    fn benchmark_table_has_header_and_one_row_per_result() {
        let table = render_benchmarks(&[
            result("dispatch/direct", 1_200, 1_100),
            result("dispatch/boxed", 2_500_000, 2_400_000),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("label"));
        assert!(lines[0].contains("real_time"));
        assert!(lines[0].contains("cpu_time"));
        assert!(lines[1].contains("dispatch/direct"));
        assert!(lines[1].contains("1.20 us"));
        assert!(lines[2].contains("2.50 ms"));
    }

    #[test]
    fn retention_table_shows_signed_delta() {
        let table = render_retention(&[RetentionSample {
            type_tag: "alloc/retain".to_string(),
            bytes_before: 500,
            bytes_after: 10_500,
            delta: 10_000,
        }]);
        assert!(table.contains("type_tag"));
        assert!(table.contains("bytes_before"));
        assert!(table.contains("alloc/retain"));
        assert!(table.contains("10000"));
    }

    #[test]
    fn duration_units_scale_with_magnitude() {
        assert_eq!(format_duration(Duration::from_nanos(999)), "999 ns");
        assert_eq!(format_duration(Duration::from_nanos(1_500)), "1.50 us");
        assert_eq!(format_duration(Duration::from_millis(12)), "12.00 ms");
        assert_eq!(format_duration(Duration::from_secs(2)), "2.00 s");
    }

    #[test]
    fn label_column_grows_to_longest_label() {
        let table = render_benchmarks(&[result("a/very/long/label/indeed", 10, 10)]);
        let header = table.lines().next().unwrap();
        let row = table.lines().nth(1).unwrap();
        let header_col = header.find("real_time").unwrap();
        let row_longest = row.find("  ").unwrap();
        assert!(header_col > "label".len());
        assert_eq!(row_longest, "a/very/long/label/indeed".len());
    }
}
