//! Execution plan tree model
//!
//! Lifts an already-deserialized `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)`
//! document into an owned, immutable tree of [`PlanNode`]s. Fields absent in
//! the source document default to zero/empty; the only hard failure is a
//! document with no plan tree or a root missing its cost fields.

use crate::error::{AnalyzeResult, InvalidPlanError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Operator Kinds
// ============================================================================

/// Operator kind classification.
///
/// Replaces string dispatch on the raw node tag with a total enum so the
/// weight/intensity tables below stay exhaustive; unknown tags fall through
/// to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OperatorKind {
    #[serde(rename = "Seq Scan")]
    SeqScan,
    #[serde(rename = "Index Scan")]
    IndexScan,
    #[serde(rename = "Index Only Scan")]
    IndexOnlyScan,
    #[serde(rename = "Bitmap Heap Scan")]
    BitmapHeapScan,
    #[serde(rename = "Bitmap Index Scan")]
    BitmapIndexScan,
    #[serde(rename = "Nested Loop")]
    NestedLoop,
    #[serde(rename = "Hash Join")]
    HashJoin,
    #[serde(rename = "Merge Join")]
    MergeJoin,
    Sort,
    #[serde(rename = "Incremental Sort")]
    IncrementalSort,
    Hash,
    Aggregate,
    HashAggregate,
    GroupAggregate,
    Limit,
    Gather,
    #[serde(rename = "Gather Merge")]
    GatherMerge,
    Materialize,
    #[serde(rename = "CTE Scan")]
    CteScan,
    #[serde(rename = "Subquery Scan")]
    SubqueryScan,
    #[serde(rename = "Function Scan")]
    FunctionScan,
    SubPlan,
    InitPlan,
    WindowAgg,
    Unique,
    Append,
    #[serde(rename = "Merge Append")]
    MergeAppend,
    #[default]
    Other,
}

impl OperatorKind {
    /// Classify a raw node tag from the plan document
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Seq Scan" => Self::SeqScan,
            "Index Scan" => Self::IndexScan,
            "Index Only Scan" => Self::IndexOnlyScan,
            "Bitmap Heap Scan" => Self::BitmapHeapScan,
            "Bitmap Index Scan" => Self::BitmapIndexScan,
            "Nested Loop" => Self::NestedLoop,
            "Hash Join" => Self::HashJoin,
            "Merge Join" => Self::MergeJoin,
            "Sort" => Self::Sort,
            "Incremental Sort" => Self::IncrementalSort,
            "Hash" => Self::Hash,
            "Aggregate" => Self::Aggregate,
            "HashAggregate" => Self::HashAggregate,
            "GroupAggregate" => Self::GroupAggregate,
            "Limit" => Self::Limit,
            "Gather" => Self::Gather,
            "Gather Merge" => Self::GatherMerge,
            "Materialize" => Self::Materialize,
            "CTE Scan" => Self::CteScan,
            "Subquery Scan" => Self::SubqueryScan,
            "Function Scan" => Self::FunctionScan,
            "SubPlan" => Self::SubPlan,
            "InitPlan" => Self::InitPlan,
            "WindowAgg" => Self::WindowAgg,
            "Unique" => Self::Unique,
            "Append" => Self::Append,
            "Merge Append" => Self::MergeAppend,
            _ => Self::Other,
        }
    }

    /// Per-operator CPU weight used when synthesizing CPU-usage percentages
    pub fn cpu_weight(&self) -> f64 {
        match self {
            Self::NestedLoop => 2.0,
            Self::Sort | Self::IncrementalSort => 1.8,
            Self::SeqScan => 1.5,
            Self::Hash => 1.4,
            Self::HashJoin => 1.3,
            Self::Aggregate | Self::HashAggregate | Self::GroupAggregate => 1.2,
            Self::MergeJoin => 1.1,
            Self::IndexScan | Self::IndexOnlyScan => 0.8,
            _ => 1.0,
        }
    }

    /// Additive CPU-intensity bonus this operator contributes to the
    /// cost estimator's intensity multiplier
    pub fn intensity_bonus(&self) -> f64 {
        match self {
            Self::NestedLoop => 0.5,
            Self::HashJoin => 0.4,
            Self::MergeJoin => 0.3,
            Self::Aggregate | Self::HashAggregate | Self::GroupAggregate => 0.3,
            Self::SubPlan | Self::InitPlan => 0.2,
            _ => 0.0,
        }
    }

    /// Whether this operator incurs a per-loop sort/hash operation cost
    pub fn is_sort_or_hash(&self) -> bool {
        matches!(self, Self::Sort | Self::Hash | Self::HashJoin | Self::HashAggregate)
    }

    /// Operators whose children execute concurrently rather than one after
    /// another, for timeline synthesis purposes
    pub fn runs_children_concurrently(&self) -> bool {
        matches!(self, Self::HashJoin | Self::MergeJoin | Self::BitmapHeapScan)
    }

    /// Canonical display label (matches the plan document tag where known)
    pub fn label(&self) -> &'static str {
        match self {
            Self::SeqScan => "Seq Scan",
            Self::IndexScan => "Index Scan",
            Self::IndexOnlyScan => "Index Only Scan",
            Self::BitmapHeapScan => "Bitmap Heap Scan",
            Self::BitmapIndexScan => "Bitmap Index Scan",
            Self::NestedLoop => "Nested Loop",
            Self::HashJoin => "Hash Join",
            Self::MergeJoin => "Merge Join",
            Self::Sort => "Sort",
            Self::IncrementalSort => "Incremental Sort",
            Self::Hash => "Hash",
            Self::Aggregate => "Aggregate",
            Self::HashAggregate => "HashAggregate",
            Self::GroupAggregate => "GroupAggregate",
            Self::Limit => "Limit",
            Self::Gather => "Gather",
            Self::GatherMerge => "Gather Merge",
            Self::Materialize => "Materialize",
            Self::CteScan => "CTE Scan",
            Self::SubqueryScan => "Subquery Scan",
            Self::FunctionScan => "Function Scan",
            Self::SubPlan => "SubPlan",
            Self::InitPlan => "InitPlan",
            Self::WindowAgg => "WindowAgg",
            Self::Unique => "Unique",
            Self::Append => "Append",
            Self::MergeAppend => "Merge Append",
            Self::Other => "Other",
        }
    }
}

/// Where a sort operation kept its working set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortSpace {
    Memory,
    Disk,
}

impl SortSpace {
    fn from_tag(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case("memory") {
            Some(Self::Memory)
        } else if tag.eq_ignore_ascii_case("disk") {
            Some(Self::Disk)
        } else {
            None
        }
    }
}

// ============================================================================
// Plan Nodes
// ============================================================================

/// One operator in the executed plan tree.
///
/// Constructed once from the plan document and immutable thereafter. A node
/// with no children is a leaf (scan-like); a child's depth is always the
/// parent's depth plus one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    pub kind: OperatorKind,
    /// Raw node tag from the document, preserved for unknown operators
    pub node_type: String,
    pub depth: usize,

    pub startup_cost: f64,
    pub total_cost: f64,
    pub plan_rows: u64,
    pub plan_width: u64,

    pub actual_startup_time: f64,
    pub actual_total_time: f64,
    pub actual_rows: u64,
    pub actual_loops: u64,

    pub shared_hit_blocks: u64,
    pub shared_read_blocks: u64,
    pub shared_dirtied_blocks: u64,
    pub shared_written_blocks: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_type: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_space: Option<SortSpace>,
    /// Spill size in KB when the sort used disk, working-set size otherwise
    pub sort_space_used_kb: u64,

    pub parallel_aware: bool,

    pub children: Vec<PlanNode>,
}

impl PlanNode {
    fn from_value(value: &Value, depth: usize) -> Self {
        let node_type = str_field(value, "Node Type").unwrap_or_default();

        let children = value
            .get("Plans")
            .and_then(Value::as_array)
            .map(|plans| {
                plans.iter().map(|child| PlanNode::from_value(child, depth + 1)).collect()
            })
            .unwrap_or_default();

        Self {
            kind: OperatorKind::from_tag(&node_type),
            node_type,
            depth,
            startup_cost: f64_field(value, "Startup Cost"),
            total_cost: f64_field(value, "Total Cost"),
            plan_rows: u64_field(value, "Plan Rows"),
            plan_width: u64_field(value, "Plan Width"),
            actual_startup_time: f64_field(value, "Actual Startup Time"),
            actual_total_time: f64_field(value, "Actual Total Time"),
            actual_rows: u64_field(value, "Actual Rows"),
            actual_loops: u64_field(value, "Actual Loops"),
            shared_hit_blocks: u64_field(value, "Shared Hit Blocks"),
            shared_read_blocks: u64_field(value, "Shared Read Blocks"),
            shared_dirtied_blocks: u64_field(value, "Shared Dirtied Blocks"),
            shared_written_blocks: u64_field(value, "Shared Written Blocks"),
            relation_name: str_field(value, "Relation Name"),
            index_name: str_field(value, "Index Name"),
            alias: str_field(value, "Alias"),
            join_type: str_field(value, "Join Type"),
            sort_keys: value
                .get("Sort Key")
                .and_then(Value::as_array)
                .map(|keys| {
                    keys.iter().filter_map(Value::as_str).map(str::to_string).collect()
                })
                .unwrap_or_default(),
            sort_method: str_field(value, "Sort Method"),
            sort_space: str_field(value, "Sort Space Type")
                .as_deref()
                .and_then(SortSpace::from_tag),
            sort_space_used_kb: u64_field(value, "Sort Space Used"),
            parallel_aware: value
                .get("Parallel Aware")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            children,
        }
    }

    /// Whether this node's children should be scheduled at the same start
    /// offset on the synthetic timeline
    pub fn children_run_concurrently(&self) -> bool {
        self.parallel_aware || self.kind.runs_children_concurrently()
    }

    /// The node's own execution span (total minus startup), clamped to zero
    pub fn exclusive_time(&self) -> f64 {
        (self.actual_total_time - self.actual_startup_time).max(0.0)
    }

    /// Buffer hit ratio for this node alone; 1.0 when no buffer traffic
    pub fn hit_ratio(&self) -> f64 {
        let total = self.shared_hit_blocks + self.shared_read_blocks;
        if total == 0 {
            1.0
        } else {
            self.shared_hit_blocks as f64 / total as f64
        }
    }

    /// Whether this sort node spilled to disk
    pub fn spilled_to_disk(&self) -> bool {
        self.sort_space == Some(SortSpace::Disk)
    }

    /// Descriptive label: operator plus relation or index when present
    pub fn describe(&self) -> String {
        if let Some(rel) = &self.relation_name {
            format!("{} on {}", self.node_type, rel)
        } else if let Some(idx) = &self.index_name {
            format!("{} using {}", self.node_type, idx)
        } else {
            self.node_type.clone()
        }
    }
}

// ============================================================================
// Plan Tree
// ============================================================================

/// The executed plan as a rooted operator tree, plus the root-level totals
/// the query engine reported for the whole query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTree {
    pub root: PlanNode,
    /// The engine's own cost-unit estimate for the whole plan
    pub engine_total_cost: f64,
    /// Wall-clock execution time of the whole plan (ms)
    pub actual_total_time: f64,
}

impl PlanTree {
    /// Build a tree from a deserialized EXPLAIN document.
    ///
    /// Accepts the shapes PostgreSQL produces: the top-level one-element
    /// array, the `{"Plan": ...}` wrapper, or a bare plan node object.
    pub fn from_document(document: &Value) -> AnalyzeResult<Self> {
        let plan = unwrap_plan(document).ok_or(InvalidPlanError::MissingRoot)?;

        if !plan.is_object() {
            return Err(InvalidPlanError::MissingRoot);
        }
        if plan.get("Total Cost").and_then(Value::as_f64).is_none() {
            return Err(InvalidPlanError::MissingRootField("Total Cost"));
        }
        if plan.get("Actual Total Time").and_then(Value::as_f64).is_none() {
            return Err(InvalidPlanError::MissingRootField("Actual Total Time"));
        }

        let root = PlanNode::from_value(plan, 0);
        Ok(Self {
            engine_total_cost: root.total_cost,
            actual_total_time: root.actual_total_time,
            root,
        })
    }

    /// Depth-first (pre-order) flat view of every node in the tree
    pub fn nodes(&self) -> Vec<&PlanNode> {
        let mut out = Vec::new();
        collect(&self.root, &mut out);
        out
    }

    /// Whether any node in the tree has the given operator kind
    pub fn contains(&self, kind: OperatorKind) -> bool {
        self.nodes().iter().any(|n| n.kind == kind)
    }
}

fn collect<'a>(node: &'a PlanNode, out: &mut Vec<&'a PlanNode>) {
    out.push(node);
    for child in &node.children {
        collect(child, out);
    }
}

/// Peel the EXPLAIN wrappers down to the root plan node object
fn unwrap_plan(document: &Value) -> Option<&Value> {
    let inner = match document {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match inner.get("Plan") {
        Some(plan) => Some(plan),
        None if inner.is_object() => Some(inner),
        None => None,
    }
}

fn f64_field(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn u64_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_tree_from_wrapped_array() {
        let doc = json!([{
            "Plan": {
                "Node Type": "Seq Scan",
                "Relation Name": "orders",
                "Startup Cost": 0.0,
                "Total Cost": 1500.0,
                "Plan Rows": 5000,
                "Plan Width": 40,
                "Actual Total Time": 120.0,
                "Actual Rows": 5000,
                "Actual Loops": 1,
                "Shared Hit Blocks": 50,
                "Shared Read Blocks": 200
            }
        }]);

        let tree = PlanTree::from_document(&doc).unwrap();
        assert_eq!(tree.root.kind, OperatorKind::SeqScan);
        assert_eq!(tree.engine_total_cost, 1500.0);
        assert_eq!(tree.actual_total_time, 120.0);
        assert_eq!(tree.root.relation_name.as_deref(), Some("orders"));
        assert!(tree.root.children.is_empty());
    }

    #[test]
    fn test_child_depth_increments() {
        let doc = json!({
            "Node Type": "Hash Join",
            "Total Cost": 300.0,
            "Actual Total Time": 20.0,
            "Plans": [
                {"Node Type": "Seq Scan", "Total Cost": 100.0},
                {"Node Type": "Hash", "Total Cost": 150.0, "Plans": [
                    {"Node Type": "Seq Scan", "Total Cost": 120.0}
                ]}
            ]
        });

        let tree = PlanTree::from_document(&doc).unwrap();
        assert_eq!(tree.root.depth, 0);
        assert_eq!(tree.root.children[0].depth, 1);
        assert_eq!(tree.root.children[1].children[0].depth, 2);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let doc = json!({
            "Node Type": "Seq Scan",
            "Total Cost": 10.0,
            "Actual Total Time": 1.0
        });

        let tree = PlanTree::from_document(&doc).unwrap();
        assert_eq!(tree.root.shared_read_blocks, 0);
        assert_eq!(tree.root.actual_rows, 0);
        assert_eq!(tree.root.plan_rows, 0);
        assert!(tree.root.relation_name.is_none());
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        assert!(matches!(
            PlanTree::from_document(&json!([])),
            Err(InvalidPlanError::MissingRoot)
        ));
        assert!(matches!(
            PlanTree::from_document(&json!({"Node Type": "Seq Scan"})),
            Err(InvalidPlanError::MissingRootField("Total Cost"))
        ));
        assert!(matches!(
            PlanTree::from_document(&json!({"Node Type": "Seq Scan", "Total Cost": 1.0})),
            Err(InvalidPlanError::MissingRootField("Actual Total Time"))
        ));
    }

    #[test]
    fn test_unknown_operator_falls_back_to_other() {
        assert_eq!(OperatorKind::from_tag("Tid Scan"), OperatorKind::Other);
        assert_eq!(OperatorKind::from_tag("Tid Scan").cpu_weight(), 1.0);
        assert_eq!(OperatorKind::from_tag("Tid Scan").intensity_bonus(), 0.0);
    }

    #[test]
    fn test_sort_space_parsing_is_case_insensitive() {
        assert_eq!(SortSpace::from_tag("Disk"), Some(SortSpace::Disk));
        assert_eq!(SortSpace::from_tag("disk"), Some(SortSpace::Disk));
        assert_eq!(SortSpace::from_tag("Memory"), Some(SortSpace::Memory));
        assert_eq!(SortSpace::from_tag("tape"), None);
    }

    #[test]
    fn test_describe_prefers_relation_then_index() {
        let doc = json!({
            "Node Type": "Index Scan",
            "Index Name": "orders_pkey",
            "Total Cost": 5.0,
            "Actual Total Time": 0.1
        });
        let tree = PlanTree::from_document(&doc).unwrap();
        assert_eq!(tree.root.describe(), "Index Scan using orders_pkey");
    }

    #[test]
    fn test_exclusive_time_never_negative() {
        let doc = json!({
            "Node Type": "Limit",
            "Total Cost": 1.0,
            "Actual Startup Time": 5.0,
            "Actual Total Time": 2.0
        });
        let tree = PlanTree::from_document(&doc).unwrap();
        assert_eq!(tree.root.exclusive_time(), 0.0);
    }
}
