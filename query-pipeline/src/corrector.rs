//! Dry-run validation with a bounded repair loop.
//!
//! ```text
//! Pending --dry-run ok--> Valid
//! Pending --syntax error, budget left--> Repairing --oracle--> Pending
//! Pending --syntax error, budget spent--> Failed
//! Repairing --unusable reply--> Failed
//! ```
//!
//! The engine is the source of truth for syntax; non-syntax engine failures
//! are returned as errors and never repaired.

use tracing::{debug, info, warn};

use crate::error::{DropReason, PipelineError, Stage};
use crate::ports::{DryRun, QueryEngine, TextOracle};
use crate::prompt::SYNTAX_REPAIR;
use crate::statement::accept_statement;

/// State of one candidate query in the correction loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionState {
    Pending(String),
    Repairing { query: String, error: String },
    Valid(String),
    Failed(DropReason),
}

pub struct SyntaxCorrector<'a> {
    engine: &'a dyn QueryEngine,
    oracle: &'a dyn TextOracle,
    max_retries: usize,
}

impl<'a> SyntaxCorrector<'a> {
    pub fn new(engine: &'a dyn QueryEngine, oracle: &'a dyn TextOracle, max_retries: usize) -> Self {
        Self {
            engine,
            oracle,
            max_retries,
        }
    }

    /// Runs the loop until the query validates or the repair budget runs out.
    ///
    /// Performs at most `max_retries` repair calls; every repair is
    /// validated again before it is returned.
    pub async fn correct(&self, query: &str) -> Result<Stage<String>, PipelineError> {
        let mut repairs = 0usize;
        let mut state = CorrectionState::Pending(query.to_string());

        loop {
            state = match state {
                CorrectionState::Pending(query) => match self.engine.dry_run(&query).await? {
                    DryRun::Valid => CorrectionState::Valid(query),
                    DryRun::SyntaxError(error) if repairs < self.max_retries => {
                        info!(attempt = repairs + 1, %error, "correct: syntax error, asking for a repair");
                        CorrectionState::Repairing { query, error }
                    }
                    DryRun::SyntaxError(error) => {
                        warn!(repairs, %error, "correct: repair budget exhausted");
                        CorrectionState::Failed(DropReason::SyntaxUncorrectable)
                    }
                },
                CorrectionState::Repairing { query, error } => {
                    repairs += 1;
                    let prompt = SYNTAX_REPAIR.render(&[("query", query.as_str()), ("error", error.as_str())]);
                    let reply = self.oracle.complete(&prompt).await?;
                    match accept_statement(&reply) {
                        Some(fixed) => {
                            debug!(attempt = repairs, "correct: repaired query received");
                            CorrectionState::Pending(fixed)
                        }
                        None => {
                            warn!(attempt = repairs, "correct: repair reply is not a read-only statement");
                            CorrectionState::Failed(DropReason::OracleContractViolation)
                        }
                    }
                }
                CorrectionState::Valid(query) => return Ok(Ok(query)),
                CorrectionState::Failed(reason) => return Ok(Err(reason)),
            };
        }
    }
}
