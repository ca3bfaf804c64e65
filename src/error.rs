//! Error types for plan analysis

use thiserror::Error;

/// Errors raised when an EXPLAIN document is structurally unusable.
///
/// Every other malformed-input situation degrades to defaults instead of
/// failing; only a document with no plan tree at all (or a root missing its
/// cost fields) is rejected.
#[derive(Debug, Error)]
pub enum InvalidPlanError {
    #[error("plan document contains no root plan node")]
    MissingRoot,

    #[error("root plan node is missing required field: {0}")]
    MissingRootField(&'static str),
}

/// Result type alias for plan analysis operations
pub type AnalyzeResult<T> = Result<T, InvalidPlanError>;
