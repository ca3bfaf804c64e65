//! PostgreSQL Execution Plan Analyzer
//!
//! Turns one query's `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)` output into a
//! monetary cost breakdown, normalized efficiency metrics, a synthetic
//! per-operator timeline, ranked bottleneck findings, and rule-based
//! optimization suggestions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         analyze()                            │
//! │                             │                                │
//! │                             ▼                                │
//! │                     ┌──────────────┐                         │
//! │                     │   PlanTree   │                         │
//! │                     └──────┬───────┘                         │
//! │            ┌───────────────┼────────────────┐                │
//! │            ▼               ▼                ▼                │
//! │    ┌──────────────┐ ┌──────────────┐ ┌─────────────┐        │
//! │    │  aggregate() │ │ TimeSeries   │ │ Suggestion  │        │
//! │    │      │       │ │Reconstructor │ │   Engine    │        │
//! │    │      ▼       │ │      │       │ └─────────────┘        │
//! │    │ ┌──────────┐ │ │      ▼       │                        │
//! │    │ │   Cost   │ │ │ ┌──────────┐ │                        │
//! │    │ │Estimator │ │ │ │Bottleneck│ │                        │
//! │    │ ├──────────┤ │ │ │ Detector │ │                        │
//! │    │ │Efficiency│ │ │ └──────────┘ │                        │
//! │    │ │  Scorer  │ │ │              │                        │
//! │    │ └──────────┘ │ │              │                        │
//! │    └──────────────┘ └──────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use planscope::analyze;
//!
//! let doc: serde_json::Value = serde_json::from_str(explain_json)?;
//! let analysis = analyze("SELECT * FROM orders", &doc)?;
//!
//! println!("grade: {}", analysis.metrics.grade);
//! for b in &analysis.bottlenecks {
//!     println!("{:?} severity {:.0}: {}", b.kind, b.severity, b.description);
//! }
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod models;
pub mod tree;


pub use analyzer::{
    BottleneckDetector, CostEstimator, EfficiencyScorer, SuggestionEngine,
    TimeSeriesReconstructor, aggregate,
};
pub use config::AnalysisConfig;
pub use error::{AnalyzeResult, InvalidPlanError};
pub use models::PlanAnalysis;
pub use tree::{OperatorKind, PlanNode, PlanTree};

use serde_json::Value;
use tracing::debug;

/// Analyze an executed plan document with default configuration.
///
/// `document` is the parsed JSON emitted by
/// `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)`: either the top-level one-element
/// array, the `{"Plan": ...}` wrapper, or a bare plan node.
pub fn analyze(query: &str, document: &Value) -> AnalyzeResult<PlanAnalysis> {
    analyze_with_config(query, document, &AnalysisConfig::default())
}

/// Analyze an executed plan document with explicit tuning.
///
/// The pipeline is synchronous and pure: the tree is built once, every stage
/// reads it immutably, and the result is plain serializable data.
pub fn analyze_with_config(
    query: &str,
    document: &Value,
    config: &AnalysisConfig,
) -> AnalyzeResult<PlanAnalysis> {
    let tree = PlanTree::from_document(document)?;
    debug!(
        operators = tree.nodes().len(),
        total_time_ms = tree.actual_total_time,
        "plan tree built"
    );

    let usage = aggregate(&tree.root);
    let cost = CostEstimator::new(config.rates.clone()).estimate(&tree);
    let metrics = EfficiencyScorer::new(config.weights.clone()).score(&usage);
    let time_series = TimeSeriesReconstructor::new(config.timeseries.clone()).reconstruct(&tree);
    let bottlenecks =
        BottleneckDetector::new(config.bottlenecks.clone()).detect(&time_series, &usage);
    let suggestions = SuggestionEngine::new().suggest(query, &tree);

    Ok(PlanAnalysis {
        query: query.to_string(),
        usage,
        cost,
        metrics,
        time_series,
        bottlenecks,
        suggestions,
    })
}
