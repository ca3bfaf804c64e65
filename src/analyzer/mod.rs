//! Analysis stages for an executed plan tree
//!
//! Each submodule implements one stage of the pipeline; all of them are pure
//! functions over the read-only [`crate::tree::PlanTree`].

pub mod aggregate;
pub mod bottleneck;
pub mod cost;
pub mod efficiency;
pub mod suggest;
pub mod timeseries;

pub use aggregate::aggregate;
pub use bottleneck::BottleneckDetector;
pub use cost::CostEstimator;
pub use efficiency::EfficiencyScorer;
pub use suggest::SuggestionEngine;
pub use timeseries::TimeSeriesReconstructor;
