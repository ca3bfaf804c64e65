//! Resource efficiency scoring
//!
//! Converts an aggregated [`ResourceUsage`] into normalized 0-100 efficiency
//! metrics and a letter grade. All thresholds are exact step cutoffs with no
//! interpolation between bands.

use crate::config::EfficiencyWeights;
use crate::models::{PerformanceGrade, ResourceMetrics, ResourceUsage};
use std::fmt::Write;

pub struct EfficiencyScorer {
    weights: EfficiencyWeights,
}

impl EfficiencyScorer {
    pub fn new(weights: EfficiencyWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, usage: &ResourceUsage) -> ResourceMetrics {
        let cpu = cpu_score(usage.actual_time_ms);
        let io = io_score(usage);
        let memory = memory_score(usage);
        let network = network_score(usage);

        let overall = cpu * self.weights.cpu
            + io * self.weights.io
            + memory * self.weights.memory
            + network * self.weights.network;

        ResourceMetrics {
            cpu_score: cpu,
            io_score: io,
            memory_score: memory,
            network_score: network,
            overall_score: overall,
            grade: PerformanceGrade::from_score(overall),
        }
    }

    /// Human-readable efficiency report for the usage and its metrics
    pub fn render_report(&self, usage: &ResourceUsage, metrics: &ResourceMetrics) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Resource Usage Analysis ===");
        let _ = writeln!(out);
        let _ = writeln!(out, "Execution metrics:");
        let _ = writeln!(out, "  - Execution time: {:.2} ms", usage.actual_time_ms);
        let _ = writeln!(out, "  - Estimated rows: {}", usage.plan_rows);
        let _ = writeln!(out, "  - Average row width: {} bytes", usage.plan_width);
        let _ = writeln!(out);
        let _ = writeln!(out, "Buffer usage:");
        let _ = writeln!(out, "  - Cache hits: {} blocks", usage.shared_hit_blocks);
        let _ = writeln!(out, "  - Disk reads: {} blocks", usage.shared_read_blocks);
        let _ = writeln!(out, "  - Disk writes: {} blocks", usage.shared_written_blocks);
        let _ = writeln!(out);
        let _ = writeln!(out, "Efficiency scores:");
        let _ = writeln!(out, "  - CPU: {:.1}%", metrics.cpu_score);
        let _ = writeln!(out, "  - I/O: {:.1}%", metrics.io_score);
        let _ = writeln!(out, "  - Memory: {:.1}%", metrics.memory_score);
        let _ = writeln!(out, "  - Network: {:.1}%", metrics.network_score);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Overall score: {:.1}% ({})",
            metrics.overall_score, metrics.grade
        );
        out
    }
}

/// Step function of actual execution time; fast queries score high
fn cpu_score(actual_time_ms: f64) -> f64 {
    if actual_time_ms < 10.0 {
        95.0
    } else if actual_time_ms < 100.0 {
        85.0
    } else if actual_time_ms < 1000.0 {
        70.0
    } else if actual_time_ms < 5000.0 {
        50.0
    } else {
        30.0
    }
}

/// Buffer hit ratio scaled to a percentage; no traffic at all scores 100
fn io_score(usage: &ResourceUsage) -> f64 {
    if usage.shared_hit_blocks + usage.shared_read_blocks == 0 {
        100.0
    } else {
        usage.hit_ratio() * 100.0
    }
}

/// Step function of buffer hits per estimated row; zero rows scores 100
fn memory_score(usage: &ResourceUsage) -> f64 {
    if usage.plan_rows == 0 {
        return 100.0;
    }
    let hits_per_row = usage.shared_hit_blocks as f64 / usage.plan_rows as f64;
    if hits_per_row < 1.0 {
        95.0
    } else if hits_per_row < 5.0 {
        80.0
    } else if hits_per_row < 10.0 {
        65.0
    } else if hits_per_row < 20.0 {
        50.0
    } else {
        30.0
    }
}

/// Step function of estimated row width; zero rows scores 100
fn network_score(usage: &ResourceUsage) -> f64 {
    if usage.plan_rows == 0 {
        return 100.0;
    }
    let width = usage.plan_width;
    if width < 100 {
        95.0
    } else if width < 500 {
        80.0
    } else if width < 1000 {
        65.0
    } else if width < 2000 {
        50.0
    } else {
        30.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> EfficiencyScorer {
        EfficiencyScorer::new(EfficiencyWeights::default())
    }

    #[test]
    fn test_cpu_score_bands() {
        assert_eq!(cpu_score(5.0), 95.0);
        assert_eq!(cpu_score(50.0), 85.0);
        assert_eq!(cpu_score(120.0), 70.0);
        assert_eq!(cpu_score(3000.0), 50.0);
        assert_eq!(cpu_score(10_000.0), 30.0);
        // Exact cutoffs fall into the next band
        assert_eq!(cpu_score(10.0), 85.0);
        assert_eq!(cpu_score(1000.0), 50.0);
    }

    #[test]
    fn test_io_score_is_hit_ratio_pct() {
        let usage = ResourceUsage {
            shared_hit_blocks: 50,
            shared_read_blocks: 200,
            ..Default::default()
        };
        assert!((io_score(&usage) - 20.0).abs() < 1e-9);
        assert_eq!(io_score(&ResourceUsage::default()), 100.0);
    }

    #[test]
    fn test_zero_rows_never_divides() {
        let usage = ResourceUsage {
            shared_hit_blocks: 1000,
            plan_width: 5000,
            plan_rows: 0,
            ..Default::default()
        };
        assert_eq!(memory_score(&usage), 100.0);
        assert_eq!(network_score(&usage), 100.0);
    }

    #[test]
    fn test_memory_score_bands() {
        let mk = |hits, rows| ResourceUsage {
            shared_hit_blocks: hits,
            plan_rows: rows,
            ..Default::default()
        };
        assert_eq!(memory_score(&mk(5, 10)), 95.0); // 0.5 per row
        assert_eq!(memory_score(&mk(30, 10)), 80.0); // 3
        assert_eq!(memory_score(&mk(70, 10)), 65.0); // 7
        assert_eq!(memory_score(&mk(150, 10)), 50.0); // 15
        assert_eq!(memory_score(&mk(250, 10)), 30.0); // 25
    }

    #[test]
    fn test_overall_uses_weights() {
        let usage = ResourceUsage {
            actual_time_ms: 120.0, // cpu 70
            shared_hit_blocks: 90,
            shared_read_blocks: 10, // io 90
            plan_rows: 1000,        // 0.09 hits/row -> memory 95
            plan_width: 40,         // network 95
            ..Default::default()
        };
        let metrics = scorer().score(&usage);
        let expected = 70.0 * 0.3 + 90.0 * 0.4 + 95.0 * 0.2 + 95.0 * 0.1;
        assert!((metrics.overall_score - expected).abs() < 1e-9);
        assert_eq!(metrics.grade, PerformanceGrade::A);
    }

    #[test]
    fn test_report_carries_grade() {
        let usage = ResourceUsage { actual_time_ms: 5.0, ..Default::default() };
        let metrics = scorer().score(&usage);
        let report = scorer().render_report(&usage, &metrics);
        assert!(report.contains("Overall score"));
        assert!(report.contains(metrics.grade.as_str()));
    }
}
