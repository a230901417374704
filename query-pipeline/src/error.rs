//! Unified error types for the crate.

use std::fmt;

use ai_llm_service::AiLlmError;
use graph_store::GraphError;
use thiserror::Error;

/// Failures the pipeline cannot heal by itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Oracle transport, provider or configuration failure.
    #[error(transparent)]
    Llm(#[from] AiLlmError),

    /// Non-syntax engine failure (permission, missing procedure, transport).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The question embedding does not fit the vector index.
    #[error("embedding has {got} dimensions, expected {want}")]
    EmbeddingDimension { got: usize, want: usize },

    /// Invalid pipeline policy.
    #[error("config error: {0}")]
    Config(String),

    /// Result rows could not be serialized for the audit trail.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a candidate produced nothing. Not an error: competing candidates may
/// still answer, and an empty result is a valid response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The oracle answered with the no-match sentinel.
    NoPatternMatch,
    /// The repair budget ran out while the engine still reported a syntax error.
    SyntaxUncorrectable,
    /// Execution succeeded without rows.
    EmptyResultSet,
    /// A chart needs at least two columns.
    InsufficientColumns,
    /// The oracle replied with something other than one read-only statement.
    OracleContractViolation,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::NoPatternMatch => "no_pattern_match",
            DropReason::SyntaxUncorrectable => "syntax_uncorrectable",
            DropReason::EmptyResultSet => "empty_result_set",
            DropReason::InsufficientColumns => "insufficient_columns",
            DropReason::OracleContractViolation => "oracle_contract_violation",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one stage for one candidate: a value, or the reason it is dropped.
pub type Stage<T> = Result<T, DropReason>;
