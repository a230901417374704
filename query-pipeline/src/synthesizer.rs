//! Query synthesis through the generation oracle.
//!
//! Sample-driven synthesis asks the oracle to parameterize the closest worked
//! example; schema-driven synthesis (fallback only) works from the structural
//! description alone.

use tracing::{debug, warn};

use crate::error::{DropReason, PipelineError, Stage};
use crate::model::SampleQuery;
use crate::ports::TextOracle;
use crate::prompt::{NO_MATCH_SENTINEL, SAMPLE_SYNTHESIS, SCHEMA_SYNTHESIS, format_examples};
use crate::statement::{accept_statement, is_no_match};

/// Adapts the most similar sample query to `question`.
///
/// Yields [`DropReason::NoPatternMatch`] for the sentinel and
/// [`DropReason::OracleContractViolation`] for anything that is not a single
/// read-only statement.
pub async fn synthesize(
    oracle: &dyn TextOracle,
    question: &str,
    samples: &[SampleQuery],
    result_limit: u64,
) -> Result<Stage<String>, PipelineError> {
    if samples.is_empty() {
        return Ok(Err(DropReason::NoPatternMatch));
    }
    let examples = format_examples(samples);
    let limit = result_limit.to_string();
    let prompt = SAMPLE_SYNTHESIS.render(&[
        ("examples", examples.as_str()),
        ("question", question),
        ("result_limit", limit.as_str()),
        ("sentinel", NO_MATCH_SENTINEL),
    ]);
    debug!(samples = samples.len(), "synthesize: from samples");
    let reply = oracle.complete(&prompt).await?;
    Ok(classify(&reply))
}

/// Generates a query from a rendered schema, without examples.
pub async fn synthesize_from_schema(
    oracle: &dyn TextOracle,
    question: &str,
    schema: &str,
    result_limit: u64,
) -> Result<Stage<String>, PipelineError> {
    let limit = result_limit.to_string();
    let prompt = SCHEMA_SYNTHESIS.render(&[
        ("schema", schema),
        ("question", question),
        ("result_limit", limit.as_str()),
        ("sentinel", NO_MATCH_SENTINEL),
    ]);
    debug!(schema_len = schema.len(), "synthesize: from schema");
    let reply = oracle.complete(&prompt).await?;
    Ok(classify(&reply))
}

fn classify(reply: &str) -> Stage<String> {
    if is_no_match(reply) {
        return Err(DropReason::NoPatternMatch);
    }
    accept_statement(reply).ok_or_else(|| {
        let snippet: String = reply.trim().chars().take(120).collect();
        warn!(%snippet, "synthesize: reply is not a read-only statement");
        DropReason::OracleContractViolation
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedOracle;

    fn samples() -> Vec<SampleQuery> {
        vec![SampleQuery {
            question: "Which movies did Tom Hanks act in?".into(),
            query: "MATCH (p:Person {name: 'Tom Hanks'})-[:ACTED_IN]->(m:Movie) RETURN m.title".into(),
            score: 0.95,
        }]
    }

    #[tokio::test]
    async fn returns_generated_statement() {
        let oracle = ScriptedOracle::new().otherwise(
            "```cypher\nMATCH (p:Person {name: 'Keanu Reeves'})-[:ACTED_IN]->(m:Movie) RETURN m.title\n```",
        );
        let out = synthesize(&oracle, "Which movies did Keanu Reeves act in?", &samples(), 20)
            .await
            .unwrap();
        assert_eq!(
            out.as_deref(),
            Ok("MATCH (p:Person {name: 'Keanu Reeves'})-[:ACTED_IN]->(m:Movie) RETURN m.title")
        );
        let prompt = &oracle.prompts()[0];
        assert!(prompt.system.contains("{name: 'Tom Hanks'}"));
        assert_eq!(prompt.user, "Which movies did Keanu Reeves act in?");
    }

    #[tokio::test]
    async fn sentinel_means_no_pattern() {
        let oracle = ScriptedOracle::new().otherwise("IDONOTKNOW");
        let out = synthesize(&oracle, "What is the weather?", &samples(), 20).await.unwrap();
        assert_eq!(out, Err(DropReason::NoPatternMatch));
    }

    #[tokio::test]
    async fn prose_and_writes_are_contract_violations() {
        for reply in ["I think you want the movies table.", "MATCH (m:Movie) DELETE m"] {
            let oracle = ScriptedOracle::new().otherwise(reply);
            let out = synthesize(&oracle, "q", &samples(), 20).await.unwrap();
            assert_eq!(out, Err(DropReason::OracleContractViolation));
        }
    }

    #[tokio::test]
    async fn schema_synthesis_uses_schema_prompt() {
        let oracle = ScriptedOracle::new().otherwise("MATCH (p:Person) RETURN count(p) AS people");
        let out = synthesize_from_schema(&oracle, "How many people?", "Node properties:\nPerson {name: STRING}", 20)
            .await
            .unwrap();
        assert!(out.is_ok());
        assert!(oracle.prompts()[0].system.contains("Schema:\nNode properties:"));
    }
}
