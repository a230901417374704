//! Search facade: sample-driven answer, then the optional schema fallback.

use tracing::info;

use crate::error::PipelineError;
use crate::model::SearchResult;
use crate::orchestrator::QueryPipeline;

impl QueryPipeline {
    /// Answers with the configured result limit; falls back to
    /// [`QueryPipeline::default_search`] when nothing matched and the config
    /// allows it.
    pub async fn search(&self, question: &str) -> Result<SearchResult, PipelineError> {
        let limit = self.config().result_limit;
        let answers = self.answer(question, None, limit).await?;
        if answers.is_empty() && self.config().allow_fallback {
            info!("search: no sample answered, using schema fallback");
            return self.default_search(question, limit).await;
        }
        Ok(answers)
    }
}
