//! Schema-driven answer for questions no stored sample covers.

use graph_store::INTERNAL_LABEL_PREFIX;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::fetcher::report;
use crate::model::{SearchResult, VisualizationKind};
use crate::orchestrator::QueryPipeline;
use crate::shape::ShapeTarget;
use crate::synthesizer::synthesize_from_schema;

/// Output name of the fallback item.
pub const FALLBACK_OUTPUT: &str = "fallback";

impl QueryPipeline {
    /// Generates a query from the graph schema alone and answers with at most
    /// one text item.
    ///
    /// Weaker than [`QueryPipeline::answer`]: nothing constrains the oracle to
    /// a proven query shape.
    ///
    /// # Errors
    /// Schema introspection, oracle and non-syntax engine failures.
    pub async fn default_search(
        &self,
        question: &str,
        result_limit: u64,
    ) -> Result<SearchResult, PipelineError> {
        let span = info_span!("default_search", request_id = %Uuid::new_v4());
        async move {
            info!(%question, result_limit, "fallback: start");

            let schema = self
                .engine()
                .describe_schema()
                .await?
                .without_labels(|l| l.starts_with(INTERNAL_LABEL_PREFIX));
            debug!(
                labels = schema.node_properties.len(),
                relationships = schema.relationships.len(),
                "fallback: schema described"
            );

            let outcome = match synthesize_from_schema(self.generator(), question, &schema.render(), result_limit).await? {
                Ok(query) => {
                    let target = ShapeTarget {
                        output: FALLBACK_OUTPUT,
                        visualization: VisualizationKind::TextAnswer,
                        order: 0,
                    };
                    self.validate_and_run(question, &query, result_limit, target).await?
                }
                Err(reason) => Err(reason),
            };

            let data: Vec<_> = report(outcome).into_iter().collect();
            info!(items = data.len(), "fallback: done");
            Ok(SearchResult { data })
        }
        .instrument(span)
        .await
    }
}
