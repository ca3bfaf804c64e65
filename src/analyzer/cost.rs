//! Monetary cost estimation
//!
//! Converts the per-node statistics of an executed plan into a monetary cost
//! breakdown (CPU / disk I/O / sort-hash / row processing) using the fixed
//! per-unit rates in [`CostRates`], plus a human-readable narrative ranking
//! the cost items and flagging common inefficiencies.

use crate::config::CostRates;
use crate::models::ResourceCost;
use crate::tree::{OperatorKind, PlanNode, PlanTree};
use std::fmt::Write;

/// Maximum value of the additive CPU-intensity multiplier
const MAX_CPU_INTENSITY: f64 = 3.0;

/// A node is a "major contributor" above this share of the engine's own cost
const CONTRIBUTOR_SHARE: f64 = 0.1;

/// Hit ratio below which the narrative warns about cache efficiency
const HIT_RATIO_WARN_PCT: f64 = 90.0;

pub struct CostEstimator {
    rates: CostRates,
}

impl CostEstimator {
    pub fn new(rates: CostRates) -> Self {
        Self { rates }
    }

    /// Compute the monetary cost breakdown for an executed plan.
    ///
    /// Each sub-cost and the total are rounded half-up to six decimals
    /// independently, which keeps addition order-independent at the price of
    /// the total occasionally differing from the sum of the reported parts
    /// by one unit in the last place.
    pub fn estimate(&self, tree: &PlanTree) -> ResourceCost {
        let nodes = tree.nodes();

        let cpu = self.cpu_cost(tree, &nodes);
        let (disk_read, disk_write) = self.disk_costs(&nodes);
        let sort_hash = self.sort_hash_cost(&nodes);
        let row_processing = self.row_processing_cost(&nodes);

        let total = cpu + disk_read + disk_write + sort_hash + row_processing;

        ResourceCost {
            cpu_cost: round6(cpu),
            io_cost: round6(disk_read + disk_write),
            memory_cost: round6(sort_hash),
            network_cost: round6(row_processing),
            total_cost: round6(total),
            narrative: self.narrative(tree, &nodes, cpu, disk_read, disk_write, sort_hash,
                row_processing),
        }
    }

    /// CPU cost: wall-clock seconds scaled by a plan-shape intensity factor
    fn cpu_cost(&self, tree: &PlanTree, nodes: &[&PlanNode]) -> f64 {
        let seconds = tree.actual_total_time / 1000.0;
        seconds * cpu_intensity(nodes) * self.rates.cpu_second
    }

    /// Disk costs over every node: reads, and writes including dirtied blocks
    fn disk_costs(&self, nodes: &[&PlanNode]) -> (f64, f64) {
        let read_blocks: u64 = nodes.iter().map(|n| n.shared_read_blocks).sum();
        let write_blocks: u64 = nodes
            .iter()
            .map(|n| n.shared_written_blocks + n.shared_dirtied_blocks)
            .sum();

        (
            self.rates.blocks_to_mb(read_blocks) * self.rates.disk_read_mb,
            self.rates.blocks_to_mb(write_blocks) * self.rates.disk_write_mb,
        )
    }

    /// One operation charge per loop of each sort/hash operator
    fn sort_hash_cost(&self, nodes: &[&PlanNode]) -> f64 {
        nodes
            .iter()
            .filter(|n| n.kind.is_sort_or_hash())
            .map(|n| self.rates.sort_hash_operation * n.actual_loops.max(1) as f64)
            .sum()
    }

    /// Per-row charge over every node, loop-adjusted
    fn row_processing_cost(&self, nodes: &[&PlanNode]) -> f64 {
        let rows: u64 = nodes
            .iter()
            .map(|n| n.actual_rows * n.actual_loops.max(1))
            .sum();
        rows as f64 * self.rates.row_processing
    }

    #[allow(clippy::too_many_arguments)]
    fn narrative(
        &self,
        tree: &PlanTree,
        nodes: &[&PlanNode],
        cpu: f64,
        disk_read: f64,
        disk_write: f64,
        sort_hash: f64,
        row_processing: f64,
    ) -> String {
        let total = cpu + disk_read + disk_write + sort_hash + row_processing;
        let mut out = String::new();

        let _ = writeln!(out, "=== Query Cost Analysis ===");
        let _ = writeln!(out);
        let _ = writeln!(out, "Total estimated cost: {:.6}", total);
        let _ = writeln!(out);

        // Cost items ranked by value, descending
        let mut items = [
            ("CPU cost", cpu),
            ("Disk read cost", disk_read),
            ("Disk write cost", disk_write),
            ("Sort/hash cost", sort_hash),
            ("Row processing cost", row_processing),
        ];
        items.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let _ = writeln!(out, "Cost breakdown:");
        for (name, value) in items {
            let share = if total > 0.0 { value / total * 100.0 } else { 0.0 };
            let _ = writeln!(out, "  - {}: {:.6} ({:.1}%)", name, value, share);
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "Execution plan:");
        let _ = writeln!(out, "  - Total execution time: {:.2} ms", tree.actual_total_time);
        let _ = writeln!(out, "  - Engine estimated cost: {:.2}", tree.engine_total_cost);

        self.write_contributors(&mut out, tree, nodes);
        self.write_io_analysis(&mut out, nodes);
        self.write_hints(&mut out, tree, nodes);

        out
    }

    /// Nodes individually responsible for a significant share of engine cost
    fn write_contributors(&self, out: &mut String, tree: &PlanTree, nodes: &[&PlanNode]) {
        let threshold = tree.engine_total_cost * CONTRIBUTOR_SHARE;
        let mut heavy: Vec<&&PlanNode> =
            nodes.iter().filter(|n| n.total_cost > threshold).collect();
        heavy.sort_by(|a, b| {
            b.total_cost.partial_cmp(&a.total_cost).unwrap_or(std::cmp::Ordering::Equal)
        });

        if heavy.is_empty() {
            return;
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Major cost contributors:");
        for node in heavy {
            let rows = if node.actual_rows > 0 {
                format!(", {} rows", node.actual_rows)
            } else {
                String::new()
            };
            let _ = writeln!(
                out,
                "  - {} (engine cost {:.2}{})",
                node.describe(),
                node.total_cost,
                rows
            );
        }
    }

    fn write_io_analysis(&self, out: &mut String, nodes: &[&PlanNode]) {
        let reads: u64 = nodes.iter().map(|n| n.shared_read_blocks).sum();
        let hits: u64 = nodes.iter().map(|n| n.shared_hit_blocks).sum();
        if reads + hits == 0 {
            return;
        }

        let hit_ratio = hits as f64 / (reads + hits) as f64 * 100.0;
        let _ = writeln!(out);
        let _ = writeln!(out, "I/O performance:");
        let _ = writeln!(out, "  - Buffer cache hit ratio: {:.1}%", hit_ratio);
        let _ = writeln!(
            out,
            "  - Disk reads: {} blocks ({:.2} MB)",
            reads,
            self.rates.blocks_to_mb(reads)
        );
        let _ = writeln!(out, "  - Cache hits: {} blocks", hits);

        if hit_ratio < HIT_RATIO_WARN_PCT {
            let _ = writeln!(
                out,
                "  Warning: low cache hit ratio; consider index tuning or more memory."
            );
        }
    }

    fn write_hints(&self, out: &mut String, tree: &PlanTree, nodes: &[&PlanNode]) {
        let mut hints = Vec::new();

        if nodes
            .iter()
            .any(|n| n.kind == OperatorKind::SeqScan && n.actual_rows > 1000)
        {
            hints.push("Full table scan detected; consider creating an appropriate index.");
        }
        if nodes
            .iter()
            .any(|n| n.kind == OperatorKind::Sort && n.spilled_to_disk())
        {
            hints.push("Sort spilled to disk; consider increasing work_mem.");
        }
        if nodes.iter().any(|n| {
            n.kind == OperatorKind::NestedLoop && n.total_cost > tree.engine_total_cost * 0.3
        }) {
            hints.push("Costly nested loop join detected; review join order and indexes.");
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Optimization hints:");
        if hints.is_empty() {
            let _ = writeln!(out, "  - The query is already well optimized.");
        } else {
            for hint in hints {
                let _ = writeln!(out, "  - {}", hint);
            }
        }
    }
}

/// Intensity multiplier: 1.0 plus additive bonuses for CPU-heavy operators,
/// capped at [`MAX_CPU_INTENSITY`]
fn cpu_intensity(nodes: &[&PlanNode]) -> f64 {
    let intensity: f64 = 1.0 + nodes.iter().map(|n| n.kind.intensity_bonus()).sum::<f64>();
    intensity.min(MAX_CPU_INTENSITY)
}

/// Round half-up to six decimal places
fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
