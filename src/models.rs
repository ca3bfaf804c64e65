//! Analysis output data models
//!
//! Plain serializable results produced by the analysis stages, designed for
//! transport to a rendering layer. Field names follow the camelCase wire
//! convention used across the API surface.

use crate::tree::OperatorKind;
use serde::{Deserialize, Serialize};

// ============================================================================
// Aggregated Resource Usage
// ============================================================================

/// Flattened resource summary for a plan subtree.
///
/// Buffer counters are additive sums over every node in the subtree; actual
/// time is the maximum across the subtree, never the sum, since sibling
/// subtrees overlap in wall-clock time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub total_cost: f64,
    pub plan_rows: u64,
    pub plan_width: u64,
    pub actual_time_ms: f64,
    pub shared_hit_blocks: u64,
    pub shared_read_blocks: u64,
    pub shared_dirtied_blocks: u64,
    pub shared_written_blocks: u64,
}

impl ResourceUsage {
    /// Buffer cache hit ratio in [0, 1]; 1.0 when no buffer traffic at all
    pub fn hit_ratio(&self) -> f64 {
        let total = self.shared_hit_blocks + self.shared_read_blocks;
        if total == 0 {
            1.0
        } else {
            self.shared_hit_blocks as f64 / total as f64
        }
    }
}

// ============================================================================
// Monetary Cost Breakdown
// ============================================================================

/// Monetary cost breakdown for one query execution.
///
/// Each sub-cost and the total are rounded independently (half-up, six
/// decimals), so the total may differ from the sum of the reported parts by
/// one unit in the last place. Observed behavior, kept as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCost {
    pub cpu_cost: f64,
    /// Disk read + write cost
    pub io_cost: f64,
    /// Sort/hash operation cost, classified as memory pressure
    pub memory_cost: f64,
    /// Row-processing cost, classified as transfer overhead
    pub network_cost: f64,
    pub total_cost: f64,
    /// Human-readable cost analysis
    pub narrative: String,
}

// ============================================================================
// Efficiency Metrics
// ============================================================================

/// Discrete performance grade derived from the overall efficiency score.
///
/// Variants are declared worst-to-best so the derived ordering matches
/// "higher grade is better".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerformanceGrade {
    F,
    D,
    C,
    #[serde(rename = "C+")]
    CPlus,
    B,
    #[serde(rename = "B+")]
    BPlus,
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl PerformanceGrade {
    /// Grade band for an overall score; bands are contiguous and exact
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::APlus
        } else if score >= 80.0 {
            Self::A
        } else if score >= 70.0 {
            Self::BPlus
        } else if score >= 60.0 {
            Self::B
        } else if score >= 50.0 {
            Self::CPlus
        } else if score >= 40.0 {
            Self::C
        } else if score >= 30.0 {
            Self::D
        } else {
            Self::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl std::fmt::Display for PerformanceGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized 0-100 efficiency metrics with a weighted overall score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    /// Inverse CPU-intensity score (fast execution scores high)
    pub cpu_score: f64,
    /// Buffer hit-ratio derived score
    pub io_score: f64,
    /// Hit-density (hits per row) derived score
    pub memory_score: f64,
    /// Row-width derived score
    pub network_score: f64,
    pub overall_score: f64,
    pub grade: PerformanceGrade,
}

// ============================================================================
// Synthetic Timeline
// ============================================================================

/// One synthetic sample on the reconstructed per-operator timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePoint {
    /// Offset from query start (ms), monotonic after redistribution
    pub timestamp_ms: f64,
    /// Synthesized CPU usage, clamped to [0, 100]
    pub cpu_usage_pct: f64,
    /// Synthesized I/O wait (ms)
    pub io_wait_ms: f64,
    /// Static memory proxy: estimated rows x estimated row width (bytes)
    pub memory_bytes: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
    pub operator: OperatorKind,
    /// Operator plus relation/index, e.g. "Seq Scan on orders"
    pub node_name: String,
}

/// The reconstructed timeline for one query execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub points: Vec<TimePoint>,
    pub total_time_ms: f64,
    /// Unit label for timestamps, always milliseconds
    pub unit: String,
}

// ============================================================================
// Bottleneck Findings
// ============================================================================

/// Bottleneck category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BottleneckKind {
    CpuSpike,
    IoSpike,
    MemorySpike,
    HighCpu,
    HighIo,
    Memory,
    DiskIo,
    JoinInefficiency,
    DiskSort,
    HashMemory,
}

/// One detected bottleneck, ranked by severity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleneckPoint {
    pub timestamp_ms: f64,
    pub kind: BottleneckKind,
    /// Severity in [0, 100]
    pub severity: f64,
    pub description: String,
    /// Operator the finding is attached to
    pub operator: OperatorKind,
    pub recommendation: String,
    /// Estimated duration: gap to the next timeline point (1 ms if last)
    pub duration_ms: f64,
}

// ============================================================================
// Optimization Suggestions
// ============================================================================

/// Suggestion category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuggestionCategory {
    Index,
    Join,
    Where,
    Select,
    General,
}

/// One rule-based optimization suggestion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub category: SuggestionCategory,
    pub description: String,
    /// Fixed expected-improvement estimate for this rule (percent)
    pub expected_improvement_pct: f64,
}

// ============================================================================
// Combined Analysis Result
// ============================================================================

/// Complete analysis result for one query's execution plan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanAnalysis {
    pub query: String,
    pub usage: ResourceUsage,
    pub cost: ResourceCost,
    pub metrics: ResourceMetrics,
    pub time_series: TimeSeries,
    pub bottlenecks: Vec<BottleneckPoint>,
    pub suggestions: Vec<Suggestion>,
}
