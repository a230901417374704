//! Nearest stored sample questions via the Neo4j vector index.
//!
//! Storage layout written by the expertise loader:
//! `(:_RAGQuestion {question, embedding})<-[:ANSWERS]-(:_RAGQuery {query})-[:HAS_OUTPUT]->(:_RAGOutput {name, visualization, order})`

use serde_json::json;
use tracing::{debug, warn};

use crate::client::Neo4jClient;
use crate::errors::GraphError;
use crate::model::SampleMatch;

/// Labels owned by the pipeline's own storage; hidden from schema prompts.
pub const INTERNAL_LABEL_PREFIX: &str = "_RAG";
const QUESTION_LABEL: &str = "_RAGQuestion";
const QUERY_LABEL: &str = "_RAGQuery";
const OUTPUT_LABEL: &str = "_RAGOutput";
/// Default name of the vector index over `_RAGQuestion.embedding`.
pub const QUESTION_INDEX: &str = "ragquestion_embedding";

fn nearest_samples_statement() -> String {
    format!(
        "CALL db.index.vector.queryNodes($index, $count, $embedding)
YIELD node, score
WITH node, score
WHERE '{QUESTION_LABEL}' IN labels(node) AND score > $min_score
MATCH (query:{QUERY_LABEL})-[:ANSWERS]-(node)
MATCH (query)-[:HAS_OUTPUT]-(output:{OUTPUT_LABEL})
RETURN DISTINCT node.question AS question,
       query.query AS query,
       output.name AS output,
       output.visualization AS visualization,
       coalesce(output.order, 0) AS `order`,
       score
ORDER BY score DESC"
    )
}

impl Neo4jClient {
    /// Returns `(question, query, output)` triples for the `top_k` questions
    /// nearest to `embedding` whose similarity is above `min_score`.
    ///
    /// Rows that do not decode (e.g. a sample without `query`) are skipped.
    pub async fn nearest_samples(
        &self,
        index: &str,
        embedding: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<SampleMatch>, GraphError> {
        let params = json!({
            "index": index,
            "count": top_k,
            "embedding": embedding,
            "min_score": min_score,
        });
        let rows = self.run(&nearest_samples_statement(), params).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<SampleMatch>(row.into()) {
                Ok(m) => out.push(m),
                Err(e) => warn!("samples: skipping malformed sample row: {e}"),
            }
        }
        debug!(index, top_k, min_score, matches = out.len(), "samples: nearest");
        Ok(out)
    }
}
