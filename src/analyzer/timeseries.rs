//! Synthetic time-series reconstruction
//!
//! The plan document reports only per-subtree durations, not a global
//! schedule, so a timeline has to be synthesized. A depth-first walk assigns
//! each operator a provisional start offset (children of join-like and
//! parallel-aware operators start together; everyone else runs back to back),
//! then a redistribution pass blends those offsets toward an even spread so
//! the sequence stays monotonic and readable for charting. The blend trades
//! timeline fidelity for a non-degenerate spread the bottleneck detector can
//! difference against.

use crate::config::TimeSeriesTuning;
use crate::models::{TimePoint, TimeSeries};
use crate::tree::{PlanNode, PlanTree};

pub struct TimeSeriesReconstructor {
    tuning: TimeSeriesTuning,
}

impl TimeSeriesReconstructor {
    pub fn new(tuning: TimeSeriesTuning) -> Self {
        Self { tuning }
    }

    /// Reconstruct the per-operator timeline for an executed plan.
    /// Deterministic for a given tree.
    pub fn reconstruct(&self, tree: &PlanTree) -> TimeSeries {
        let total = tree.actual_total_time;
        let mut points = self.synthesize(tree);
        self.redistribute(&mut points, total);

        // Should already be monotonic after redistribution; the sort is a
        // safety net, not a correctness dependency.
        points.sort_by(|a, b| {
            a.timestamp_ms
                .partial_cmp(&b.timestamp_ms)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        TimeSeries { points, total_time_ms: total, unit: "ms".to_string() }
    }

    /// Depth-first walk producing one provisional point per operator
    pub(crate) fn synthesize(&self, tree: &PlanTree) -> Vec<TimePoint> {
        let mut points = Vec::new();
        self.walk(&tree.root, 0.0, tree.actual_total_time, &mut points);
        points
    }

    fn walk(&self, node: &PlanNode, offset: f64, total: f64, points: &mut Vec<TimePoint>) {
        points.push(self.sample(node, offset, total));

        if node.children_run_concurrently() {
            for child in &node.children {
                self.walk(child, offset, total, points);
            }
        } else {
            let mut child_offset = offset;
            for child in &node.children {
                self.walk(child, child_offset, total, points);
                child_offset += child.exclusive_time();
            }
        }
    }

    fn sample(&self, node: &PlanNode, offset: f64, total: f64) -> TimePoint {
        let own_time = node.actual_total_time;

        let cpu = if total > 0.0 {
            (own_time / total * 100.0 * node.kind.cpu_weight()).min(100.0)
        } else {
            0.0
        };

        let raw_wait = (node.shared_read_blocks as f64 * self.tuning.read_wait_ms_per_block
            + node.shared_written_blocks as f64 * self.tuning.write_wait_ms_per_block)
            * (1.0 - node.hit_ratio());
        let io_wait = raw_wait.min(own_time * self.tuning.io_wait_cap_fraction);

        TimePoint {
            timestamp_ms: offset,
            cpu_usage_pct: cpu,
            io_wait_ms: io_wait,
            memory_bytes: node.plan_rows.saturating_mul(node.plan_width),
            disk_reads: node.shared_read_blocks,
            disk_writes: node.shared_written_blocks,
            operator: node.kind,
            node_name: node.describe(),
        }
    }

    /// Blend each provisional timestamp with an evenly-spaced target, then
    /// clamp into a strictly increasing sequence within [0, total]
    fn redistribute(&self, points: &mut [TimePoint], total: f64) {
        if points.is_empty() {
            return;
        }

        let even_step = total / points.len() as f64;
        let min_gap = (total * self.tuning.min_gap_fraction).max(self.tuning.min_gap_floor_ms);
        let mut previous: Option<f64> = None;

        for (i, point) in points.iter_mut().enumerate() {
            let even_target = even_step * i as f64;
            let mut ts = even_target * self.tuning.even_blend
                + point.timestamp_ms * (1.0 - self.tuning.even_blend);

            if let Some(prev) = previous {
                ts = ts.max(prev + min_gap);
            }
            ts = ts.min(total);

            point.timestamp_ms = ts;
            previous = Some(ts);
        }
    }
}
