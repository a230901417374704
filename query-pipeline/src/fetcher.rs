//! One candidate output: synthesize → limit → correct → execute → shape.

use tracing::{info, instrument, warn};

use crate::corrector::SyntaxCorrector;
use crate::error::{DropReason, PipelineError, Stage};
use crate::limit::enforce_limit;
use crate::model::{OutputCandidate, ResultItem};
use crate::orchestrator::QueryPipeline;
use crate::shape::{ShapeTarget, shape};
use crate::synthesizer::synthesize;

impl QueryPipeline {
    /// Produces the result item of one candidate, or `None` when the
    /// candidate drops out (no pattern, uncorrectable, no rows, too few
    /// columns, unusable oracle reply).
    ///
    /// # Errors
    /// Oracle transport failures and non-syntax engine failures.
    #[instrument(skip_all, fields(output = %candidate.name, visualization = %candidate.visualization))]
    pub async fn fetch(
        &self,
        candidate: &OutputCandidate,
        question: &str,
        result_limit: u64,
    ) -> Result<Option<ResultItem>, PipelineError> {
        let outcome = match synthesize(self.generator(), question, &candidate.samples, result_limit).await? {
            Ok(query) => {
                let target = ShapeTarget {
                    output: &candidate.name,
                    visualization: candidate.visualization,
                    order: candidate.order,
                };
                self.validate_and_run(question, &query, result_limit, target).await?
            }
            Err(reason) => Err(reason),
        };
        Ok(report(outcome))
    }

    /// Shared tail of the sample and schema paths: limit policy, correction,
    /// execution and shaping.
    pub(crate) async fn validate_and_run(
        &self,
        question: &str,
        query: &str,
        result_limit: u64,
        target: ShapeTarget<'_>,
    ) -> Result<Stage<ResultItem>, PipelineError> {
        let limited = enforce_limit(self.generator(), query, result_limit).await?;

        let corrector = SyntaxCorrector::new(self.engine(), self.generator(), self.config().max_retries);
        let query = match corrector.correct(&limited).await? {
            Ok(q) => q,
            Err(reason) => return Ok(Err(reason)),
        };

        let rows = self.engine().execute(&query).await?;
        if rows.is_empty() {
            return Ok(Err(DropReason::EmptyResultSet));
        }
        info!(rows = rows.len(), "fetch: executed");

        shape(self.summarizer(), question, &query, rows, target).await
    }
}

/// Logs a drop and turns the stage outcome into an optional item.
pub(crate) fn report(outcome: Stage<ResultItem>) -> Option<ResultItem> {
    match outcome {
        Ok(item) => Some(item),
        Err(reason) => {
            match reason {
                DropReason::NoPatternMatch | DropReason::EmptyResultSet => {
                    info!(reason = %reason, "fetch: candidate dropped")
                }
                _ => warn!(reason = %reason, "fetch: candidate dropped"),
            }
            None
        }
    }
}
