//! Rule-based optimization suggestions
//!
//! Each rule inspects the raw query text and/or the plan tree and emits at
//! most one suggestion with a fixed expected-improvement estimate. Text rules
//! are deliberately shallow regex matches, not a SQL parser; unrelated rules
//! may co-fire on the same query and false positives on complex SQL are
//! accepted.

use crate::models::{Suggestion, SuggestionCategory};
use crate::tree::{OperatorKind, PlanTree};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static JOIN_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bjoin\b").unwrap());
static ON_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bon\b").unwrap());
static LEADING_WILDCARD_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\blike\s+'%.*%'").unwrap());
static FUNCTION_IN_WHERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bwhere\b.*?[a-z_][a-z0-9_]*\s*\(").unwrap());
static SELECT_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bselect\s+\*").unwrap());
static LIMIT_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\blimit\b").unwrap());
static IN_SUBQUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bin\s*\(\s*select\b").unwrap());

const PAGINATION_ROW_THRESHOLD: u64 = 1000;
const INDEX_TUNE_COST_THRESHOLD: f64 = 1000.0;

/// One suggestion rule; fires at most once per analysis
trait SuggestionRule: Send + Sync {
    fn apply(&self, query: &str, tree: &PlanTree) -> Option<Suggestion>;
}

struct SeqScanRule;

impl SuggestionRule for SeqScanRule {
    fn apply(&self, _query: &str, tree: &PlanTree) -> Option<Suggestion> {
        tree.contains(OperatorKind::SeqScan).then(|| Suggestion {
            category: SuggestionCategory::Index,
            description: "Sequential scan detected; an index on the filter columns could avoid reading the whole table".to_string(),
            expected_improvement_pct: 30.0,
        })
    }
}

struct IndexTuneRule;

impl SuggestionRule for IndexTuneRule {
    fn apply(&self, _query: &str, tree: &PlanTree) -> Option<Suggestion> {
        let uses_index = tree.contains(OperatorKind::IndexScan)
            || tree.contains(OperatorKind::IndexOnlyScan);
        (uses_index && tree.engine_total_cost > INDEX_TUNE_COST_THRESHOLD).then(|| Suggestion {
            category: SuggestionCategory::Index,
            description: "Index scan is still expensive; check index selectivity and column order".to_string(),
            expected_improvement_pct: 20.0,
        })
    }
}

struct NestedLoopRule;

impl SuggestionRule for NestedLoopRule {
    fn apply(&self, _query: &str, tree: &PlanTree) -> Option<Suggestion> {
        tree.contains(OperatorKind::NestedLoop).then(|| Suggestion {
            category: SuggestionCategory::Join,
            description: "Nested loop join in the plan; indexing the join key or raising work_mem may allow a hash join".to_string(),
            expected_improvement_pct: 40.0,
        })
    }
}

struct CartesianProductRule;

impl SuggestionRule for CartesianProductRule {
    fn apply(&self, query: &str, _tree: &PlanTree) -> Option<Suggestion> {
        (JOIN_KEYWORD.is_match(query) && !ON_KEYWORD.is_match(query)).then(|| Suggestion {
            category: SuggestionCategory::Join,
            description: "JOIN without an ON condition produces a cartesian product; add a join condition".to_string(),
            expected_improvement_pct: 80.0,
        })
    }
}

struct LeadingWildcardRule;

impl SuggestionRule for LeadingWildcardRule {
    fn apply(&self, query: &str, _tree: &PlanTree) -> Option<Suggestion> {
        LEADING_WILDCARD_LIKE.is_match(query).then(|| Suggestion {
            category: SuggestionCategory::Where,
            description: "LIKE with a leading wildcard cannot use a btree index; consider full-text search or a trigram index".to_string(),
            expected_improvement_pct: 25.0,
        })
    }
}

struct FunctionOnColumnRule;

impl SuggestionRule for FunctionOnColumnRule {
    fn apply(&self, query: &str, _tree: &PlanTree) -> Option<Suggestion> {
        FUNCTION_IN_WHERE.is_match(query).then(|| Suggestion {
            category: SuggestionCategory::Where,
            description: "Function call inside WHERE defeats plain indexes; rewrite the predicate or add an expression index".to_string(),
            expected_improvement_pct: 35.0,
        })
    }
}

struct SelectStarRule;

impl SuggestionRule for SelectStarRule {
    fn apply(&self, query: &str, _tree: &PlanTree) -> Option<Suggestion> {
        SELECT_STAR.is_match(query).then(|| Suggestion {
            category: SuggestionCategory::Select,
            description: "SELECT * fetches every column; list only the columns you need".to_string(),
            expected_improvement_pct: 15.0,
        })
    }
}

struct PaginationRule;

impl SuggestionRule for PaginationRule {
    fn apply(&self, query: &str, tree: &PlanTree) -> Option<Suggestion> {
        (!LIMIT_KEYWORD.is_match(query) && tree.root.plan_rows > PAGINATION_ROW_THRESHOLD)
            .then(|| Suggestion {
                category: SuggestionCategory::General,
                description: "Large estimated result set with no LIMIT; paginate the query".to_string(),
                expected_improvement_pct: 50.0,
            })
    }
}

struct InSubqueryRule;

impl SuggestionRule for InSubqueryRule {
    fn apply(&self, query: &str, _tree: &PlanTree) -> Option<Suggestion> {
        IN_SUBQUERY.is_match(query).then(|| Suggestion {
            category: SuggestionCategory::Where,
            description: "IN (SELECT ...) often plans poorly; rewrite as a JOIN or EXISTS".to_string(),
            expected_improvement_pct: 30.0,
        })
    }
}

pub struct SuggestionEngine {
    rules: Vec<Box<dyn SuggestionRule>>,
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionEngine {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(SeqScanRule),
                Box::new(IndexTuneRule),
                Box::new(NestedLoopRule),
                Box::new(CartesianProductRule),
                Box::new(LeadingWildcardRule),
                Box::new(FunctionOnColumnRule),
                Box::new(SelectStarRule),
                Box::new(PaginationRule),
                Box::new(InSubqueryRule),
            ],
        }
    }

    /// Run every rule over the query text and plan tree
    pub fn suggest(&self, query: &str, tree: &PlanTree) -> Vec<Suggestion> {
        let suggestions: Vec<Suggestion> = self
            .rules
            .iter()
            .filter_map(|rule| rule.apply(query, tree))
            .collect();
        debug!(count = suggestions.len(), "suggestion rules evaluated");
        suggestions
    }
}
