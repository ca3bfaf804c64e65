//! Recursive resource aggregation over a plan subtree

use crate::models::ResourceUsage;
use crate::tree::PlanNode;

/// Aggregate a subtree into a flat [`ResourceUsage`] summary.
///
/// Cost, row, and width estimates are read from the subtree root; buffer
/// counters are summed over every node below it. Actual time is the maximum
/// of the node's own time and its children's aggregates: children of a join
/// overlap in wall-clock time, so summing would double count.
pub fn aggregate(node: &PlanNode) -> ResourceUsage {
    let mut usage = ResourceUsage {
        total_cost: node.total_cost,
        plan_rows: node.plan_rows,
        plan_width: node.plan_width,
        actual_time_ms: node.actual_total_time,
        shared_hit_blocks: node.shared_hit_blocks,
        shared_read_blocks: node.shared_read_blocks,
        shared_dirtied_blocks: node.shared_dirtied_blocks,
        shared_written_blocks: node.shared_written_blocks,
    };

    for child in &node.children {
        let sub = aggregate(child);
        usage.shared_hit_blocks += sub.shared_hit_blocks;
        usage.shared_read_blocks += sub.shared_read_blocks;
        usage.shared_dirtied_blocks += sub.shared_dirtied_blocks;
        usage.shared_written_blocks += sub.shared_written_blocks;
        usage.actual_time_ms = usage.actual_time_ms.max(sub.actual_time_ms);
    }

    usage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::PlanTree;
    use serde_json::json;

    fn tree() -> PlanTree {
        PlanTree::from_document(&json!({
            "Node Type": "Hash Join",
            "Total Cost": 500.0,
            "Plan Rows": 100,
            "Plan Width": 32,
            "Actual Total Time": 80.0,
            "Shared Hit Blocks": 10,
            "Shared Read Blocks": 5,
            "Plans": [
                {
                    "Node Type": "Seq Scan",
                    "Total Cost": 200.0,
                    "Actual Total Time": 95.0,
                    "Shared Hit Blocks": 20,
                    "Shared Read Blocks": 40,
                    "Shared Written Blocks": 3
                },
                {
                    "Node Type": "Hash",
                    "Total Cost": 250.0,
                    "Actual Total Time": 30.0,
                    "Shared Dirtied Blocks": 7,
                    "Plans": [
                        {
                            "Node Type": "Seq Scan",
                            "Total Cost": 220.0,
                            "Actual Total Time": 25.0,
                            "Shared Hit Blocks": 8,
                            "Shared Read Blocks": 2
                        }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_buffer_counters_sum_over_subtree() {
        let usage = aggregate(&tree().root);
        assert_eq!(usage.shared_hit_blocks, 10 + 20 + 8);
        assert_eq!(usage.shared_read_blocks, 5 + 40 + 2);
        assert_eq!(usage.shared_dirtied_blocks, 7);
        assert_eq!(usage.shared_written_blocks, 3);
    }

    #[test]
    fn test_actual_time_is_max_not_sum() {
        // A child (95ms) outlasts the root's own reading (80ms); the
        // aggregate must carry the maximum, never 80+95+30+25.
        let usage = aggregate(&tree().root);
        assert_eq!(usage.actual_time_ms, 95.0);
    }

    #[test]
    fn test_estimates_come_from_subtree_root() {
        let usage = aggregate(&tree().root);
        assert_eq!(usage.total_cost, 500.0);
        assert_eq!(usage.plan_rows, 100);
        assert_eq!(usage.plan_width, 32);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let root = tree().root;
        assert_eq!(aggregate(&root), aggregate(&root));
    }
}
