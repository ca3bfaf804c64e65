//! Heuristic constants for plan analysis
//!
//! Every rate, weight, and threshold used by the analysis stages lives here
//! as an immutable configuration struct with fixed defaults. The redistribution
//! blend and the fixed per-category severities are empirically chosen values
//! carried over from the reference cost model; they are tunable, not derived.

/// Monetary rates for the cost estimator (currency units per resource unit)
#[derive(Debug, Clone)]
pub struct CostRates {
    /// Cost per CPU-second
    pub cpu_second: f64,
    /// Cost per MB read from disk
    pub disk_read_mb: f64,
    /// Cost per MB written to disk
    pub disk_write_mb: f64,
    /// Cost per sort/hash operation
    pub sort_hash_operation: f64,
    /// Cost per row processed
    pub row_processing: f64,
    /// Storage block size in KB (PostgreSQL default page size)
    pub block_size_kb: f64,
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            cpu_second: 0.005,
            disk_read_mb: 0.0002,
            disk_write_mb: 0.0003,
            sort_hash_operation: 0.002,
            row_processing: 0.00001,
            block_size_kb: 8.0,
        }
    }
}

impl CostRates {
    /// Convert a block count to megabytes
    pub fn blocks_to_mb(&self, blocks: u64) -> f64 {
        (blocks as f64 * self.block_size_kb) / 1024.0
    }
}

/// Weights for combining the four efficiency sub-scores into an overall score
#[derive(Debug, Clone)]
pub struct EfficiencyWeights {
    pub cpu: f64,
    pub io: f64,
    pub memory: f64,
    pub network: f64,
}

impl Default for EfficiencyWeights {
    fn default() -> Self {
        Self { cpu: 0.3, io: 0.4, memory: 0.2, network: 0.1 }
    }
}

/// Tuning knobs for the time-series reconstruction pass
#[derive(Debug, Clone)]
pub struct TimeSeriesTuning {
    /// Weight of the evenly-spaced target offset in the redistribution blend;
    /// the remainder goes to the structurally synthesized timestamp
    pub even_blend: f64,
    /// Minimum gap between redistributed points, as a fraction of total time
    pub min_gap_fraction: f64,
    /// Absolute floor for the minimum gap (ms)
    pub min_gap_floor_ms: f64,
    /// Synthetic I/O wait per block read (ms)
    pub read_wait_ms_per_block: f64,
    /// Synthetic I/O wait per block written (ms)
    pub write_wait_ms_per_block: f64,
    /// I/O wait is capped at this fraction of the node's own execution time
    pub io_wait_cap_fraction: f64,
}

impl Default for TimeSeriesTuning {
    fn default() -> Self {
        Self {
            even_blend: 0.7,
            min_gap_fraction: 0.05,
            min_gap_floor_ms: 0.01,
            read_wait_ms_per_block: 0.1,
            write_wait_ms_per_block: 0.2,
            io_wait_cap_fraction: 0.8,
        }
    }
}

/// Thresholds and severity constants for bottleneck detection
#[derive(Debug, Clone)]
pub struct BottleneckThresholds {
    /// CPU-usage delta (percentage points) that counts as a spike
    pub cpu_delta: f64,
    /// I/O-wait delta (ms) that counts as a spike
    pub io_delta_ms: f64,
    /// Memory delta (bytes) that counts as a spike
    pub memory_delta_bytes: f64,
    /// Absolute CPU usage threshold (%); severity scales up to 100%
    pub high_cpu_pct: f64,
    /// Absolute I/O wait threshold (ms)
    pub high_io_ms: f64,
    /// Severity scaling ceiling for I/O wait (ms)
    pub high_io_max_ms: f64,
    /// Absolute memory threshold (bytes); severity scales to 10x
    pub high_memory_bytes: f64,
    /// Absolute disk block threshold (reads + writes); severity scales to 5x
    pub disk_io_blocks: f64,
    /// CPU usage (%) above which a nested loop counts as an inefficient join
    pub join_cpu_pct: f64,
    /// Fixed severity for nested-loop join inefficiency
    pub join_inefficiency_severity: f64,
    /// I/O wait (ms) above which a sort counts as spilling to disk
    pub disk_sort_wait_ms: f64,
    /// Fixed severity for on-disk sort activity
    pub disk_sort_severity: f64,
    /// Fixed severity for oversized hash memory
    pub hash_memory_severity: f64,
    /// Findings of the same category within this window are deduplicated
    pub dedup_window_ms: f64,
}

impl Default for BottleneckThresholds {
    fn default() -> Self {
        Self {
            cpu_delta: 50.0,
            io_delta_ms: 30.0,
            memory_delta_bytes: 500.0 * 1024.0 * 1024.0,
            high_cpu_pct: 80.0,
            high_io_ms: 50.0,
            high_io_max_ms: 200.0,
            high_memory_bytes: 1024.0 * 1024.0,
            disk_io_blocks: 1000.0,
            join_cpu_pct: 60.0,
            join_inefficiency_severity: 85.0,
            disk_sort_wait_ms: 20.0,
            disk_sort_severity: 80.0,
            hash_memory_severity: 75.0,
            dedup_window_ms: 5.0,
        }
    }
}

/// Aggregate configuration injected into the analysis pipeline
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    pub rates: CostRates,
    pub weights: EfficiencyWeights,
    pub timeseries: TimeSeriesTuning,
    pub bottlenecks: BottleneckThresholds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates_are_positive() {
        let rates = CostRates::default();
        assert!(rates.cpu_second > 0.0);
        assert!(rates.disk_read_mb > 0.0);
        assert!(rates.disk_write_mb > 0.0);
        assert!(rates.sort_hash_operation > 0.0);
        assert!(rates.row_processing > 0.0);
    }

    #[test]
    fn test_blocks_to_mb_uses_8k_pages() {
        let rates = CostRates::default();
        assert_eq!(rates.blocks_to_mb(128), 1.0);
        assert_eq!(rates.blocks_to_mb(200), 200.0 * 8.0 / 1024.0);
    }

    #[test]
    fn test_efficiency_weights_sum_to_one() {
        let w = EfficiencyWeights::default();
        assert!((w.cpu + w.io + w.memory + w.network - 1.0).abs() < 1e-9);
    }
}
