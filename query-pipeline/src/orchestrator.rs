//! Request entry point: embedding, retrieval, fan-out and aggregation.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::cfg::PipelineConfig;
use crate::error::PipelineError;
use crate::model::{ResultItem, SearchResult};
use crate::ports::{Embedder, QueryEngine, SampleIndex, TextOracle};
use crate::retriever::find_candidates;

/// External collaborators of the pipeline.
#[derive(Clone)]
pub struct Ports {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn SampleIndex>,
    pub engine: Arc<dyn QueryEngine>,
    /// Synthesis, limit rewrites and repairs.
    pub generator: Arc<dyn TextOracle>,
    /// Text-answer summaries.
    pub summarizer: Arc<dyn TextOracle>,
}

/// The question-answering pipeline. Holds no per-request state, so one
/// instance serves concurrent requests.
#[derive(Clone)]
pub struct QueryPipeline {
    ports: Ports,
    cfg: PipelineConfig,
}

impl QueryPipeline {
    pub fn new(ports: Ports, cfg: PipelineConfig) -> Self {
        Self { ports, cfg }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub(crate) fn engine(&self) -> &dyn QueryEngine {
        self.ports.engine.as_ref()
    }

    pub(crate) fn generator(&self) -> &dyn TextOracle {
        self.ports.generator.as_ref()
    }

    pub(crate) fn summarizer(&self) -> &dyn TextOracle {
        self.ports.summarizer.as_ref()
    }

    /// Answers `question` from stored samples.
    ///
    /// Embeds the question unless `embedding` is given, fetches every
    /// candidate output (concurrently unless the config asks for sequential
    /// mode) and returns the survivors sorted by `order`. An empty result
    /// means no sample applied.
    ///
    /// # Errors
    /// Embedding or retrieval failures. Failed candidates are dropped; the
    /// first failure is returned only when no candidate survived.
    pub async fn answer(
        &self,
        question: &str,
        embedding: Option<Vec<f32>>,
        result_limit: u64,
    ) -> Result<SearchResult, PipelineError> {
        let span = info_span!("answer", request_id = %Uuid::new_v4());
        self.answer_inner(question, embedding, result_limit)
            .instrument(span)
            .await
    }

    async fn answer_inner(
        &self,
        question: &str,
        embedding: Option<Vec<f32>>,
        result_limit: u64,
    ) -> Result<SearchResult, PipelineError> {
        info!(%question, result_limit, "answer: start");

        let embedding = match embedding {
            Some(e) => e,
            None => self.ports.embedder.embed(question).await?,
        };
        if let Some(want) = self.cfg.embedding_dim {
            if embedding.len() != want {
                return Err(PipelineError::EmbeddingDimension {
                    got: embedding.len(),
                    want,
                });
            }
        }

        let candidates = find_candidates(
            self.ports.index.as_ref(),
            &embedding,
            self.cfg.top_k,
            self.cfg.min_score,
        )
        .await?;
        if candidates.is_empty() {
            info!("answer: no sample cleared the similarity threshold");
            return Ok(SearchResult::default());
        }
        debug!(candidates = candidates.len(), sequential = self.cfg.sequential, "answer: fetching");

        let outcomes = if self.cfg.sequential {
            let mut outcomes = Vec::with_capacity(candidates.len());
            for c in &candidates {
                outcomes.push(self.fetch(c, question, result_limit).await);
            }
            outcomes
        } else {
            join_all(
                candidates
                    .iter()
                    .map(|c| self.fetch(c, question, result_limit)),
            )
            .await
        };

        let mut items: Vec<ResultItem> = Vec::new();
        let mut first_err: Option<PipelineError> = None;
        for (candidate, outcome) in candidates.iter().zip(outcomes) {
            match outcome {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(e) => {
                    warn!(output = %candidate.name, error = %e, "answer: candidate failed");
                    first_err.get_or_insert(e);
                }
            }
        }

        if items.is_empty() {
            if let Some(e) = first_err {
                return Err(e);
            }
        }

        items.sort_by_key(|i| i.order);
        info!(items = items.len(), "answer: done");
        Ok(SearchResult { data: items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeEmbedder, FakeEngine, FakeIndex, ScriptedOracle, rows, sample};
    use crate::model::VisualizationKind;
    use graph_store::SampleMatch;
    use serde_json::json;

    struct Harness {
        embedder: Arc<FakeEmbedder>,
        engine: Arc<FakeEngine>,
        generator: Arc<ScriptedOracle>,
        summarizer: Arc<ScriptedOracle>,
        pipeline: QueryPipeline,
    }

    fn harness(
        matches: Vec<SampleMatch>,
        engine: FakeEngine,
        generator: ScriptedOracle,
        summarizer: ScriptedOracle,
        cfg: PipelineConfig,
    ) -> Harness {
        let embedder = Arc::new(FakeEmbedder::new(vec![0.1, 0.2, 0.3]));
        let engine = Arc::new(engine);
        let generator = Arc::new(generator);
        let summarizer = Arc::new(summarizer);
        let pipeline = QueryPipeline::new(
            Ports {
                embedder: embedder.clone(),
                index: Arc::new(FakeIndex::new(matches)),
                engine: engine.clone(),
                generator: generator.clone(),
                summarizer: summarizer.clone(),
            },
            cfg,
        );
        Harness {
            embedder,
            engine,
            generator,
            summarizer,
            pipeline,
        }
    }

    const PEOPLE_SAMPLE: &str = "MATCH (p:Person) RETURN count(p) AS people";
    const YEARS_SAMPLE: &str = "MATCH (m:Movie) RETURN m.released AS year, count(*) AS movies ORDER BY year";

    fn two_outputs() -> Vec<SampleMatch> {
        vec![
            sample("How many movies per year?", YEARS_SAMPLE, "breakdown", Some("bar-chart"), 1, 0.96),
            sample("How many people?", PEOPLE_SAMPLE, "summary", Some("text-answer"), 0, 0.95),
        ]
    }

    #[tokio::test]
    async fn no_matching_sample_yields_empty_result() {
        let h = harness(
            vec![sample("Unrelated", "MATCH (n) RETURN n", "summary", None, 0, 0.42)],
            FakeEngine::new(),
            ScriptedOracle::new(),
            ScriptedOracle::new(),
            PipelineConfig::default(),
        );
        let out = h.pipeline.answer("What is the weather?", None, 20).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(h.generator.calls(), 0);
        assert_eq!(h.embedder.calls(), 1);
    }

    #[tokio::test]
    async fn text_answer_end_to_end() {
        let h = harness(
            vec![sample("How many people are there?", PEOPLE_SAMPLE, "summary", Some("text-answer"), 0, 0.95)],
            FakeEngine::new().rows_on(
                "Person",
                rows(json!([{ "name": "Keanu" }, { "name": "Carrie" }, { "name": "Laurence" }])),
            ),
            ScriptedOracle::new().otherwise("MATCH (p:Person) RETURN p.name AS name LIMIT 3"),
            ScriptedOracle::new().otherwise("Keanu, Carrie and Laurence."),
            PipelineConfig::default(),
        );
        let out = h.pipeline.answer("Who are the people?", None, 20).await.unwrap();
        assert_eq!(out.len(), 1);
        let item = &out.data[0];
        assert_eq!(item.fields, ["answer"]);
        assert_eq!(item.visualization, VisualizationKind::TextAnswer);
        assert!(!item.data[0]["answer"].as_str().unwrap().is_empty());
        assert_eq!(item.queries.len(), 1);
        assert_eq!(h.summarizer.calls(), 1);
    }

    #[tokio::test]
    async fn precomputed_embedding_skips_embedder() {
        let h = harness(
            vec![],
            FakeEngine::new(),
            ScriptedOracle::new(),
            ScriptedOracle::new(),
            PipelineConfig::default(),
        );
        h.pipeline.answer("q", Some(vec![0.5; 3]), 20).await.unwrap();
        assert_eq!(h.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn repaired_query_is_the_one_executed() {
        let broken = "MATCH (p:Person) RETRUN p.name AS name LIMIT 5";
        let fixed = "MATCH (p:Person) RETURN p.name AS name LIMIT 5";
        let h = harness(
            vec![sample("Who are the people?", PEOPLE_SAMPLE, "people", Some("table"), 0, 0.97)],
            FakeEngine::new()
                .syntax_error_on("RETRUN", "Invalid input 'RETRUN': expected 'RETURN'")
                .rows_on("RETURN p.name", rows(json!([{ "name": "Keanu" }]))),
            ScriptedOracle::new().on("Error message", fixed).otherwise(broken),
            ScriptedOracle::new(),
            PipelineConfig::default(),
        );
        let out = h.pipeline.answer("List the people", None, 20).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.data[0].queries[0].query, fixed);
        assert_eq!(h.engine.executed(), [fixed]);
        assert_eq!(h.generator.calls(), 2);
    }

    #[tokio::test]
    async fn order_is_declared_order_not_completion_order() {
        for sequential in [false, true] {
            let h = harness(
                two_outputs(),
                FakeEngine::new()
                    .rows_on("count(p)", rows(json!([{ "people": 3 }])))
                    .rows_on_delayed("m.released", rows(json!([{ "year": 1999, "movies": 4 }])), 80),
                ScriptedOracle::new()
                    .on("m.released", YEARS_SAMPLE)
                    .on("count(p)", PEOPLE_SAMPLE),
                ScriptedOracle::new().otherwise("There are 3 people."),
                PipelineConfig {
                    sequential,
                    ..PipelineConfig::default()
                },
            );
            let out = h.pipeline.answer("Overview of the movie graph", None, 20).await.unwrap();
            let outputs: Vec<&str> = out.data.iter().map(|i| i.output.as_str()).collect();
            assert_eq!(outputs, ["summary", "breakdown"], "sequential={sequential}");
            assert_eq!(out.data[1].axes.as_ref().and_then(|a| a.x.as_deref()), Some("year"));
        }
    }

    #[tokio::test]
    async fn slow_first_candidate_does_not_reorder() {
        let h = harness(
            two_outputs(),
            FakeEngine::new()
                .rows_on("count(p)", rows(json!([{ "people": 3 }])))
                .rows_on("m.released", rows(json!([{ "year": 1999, "movies": 4 }]))),
            ScriptedOracle::new()
                .on("m.released", YEARS_SAMPLE)
                .on_delayed("count(p)", PEOPLE_SAMPLE, 80),
            ScriptedOracle::new().otherwise("There are 3 people."),
            PipelineConfig::default(),
        );
        let out = h.pipeline.answer("Overview", None, 20).await.unwrap();
        let orders: Vec<i64> = out.data.iter().map(|i| i.order).collect();
        assert_eq!(orders, [0, 1]);
    }

    #[tokio::test]
    async fn empty_and_single_column_chart_candidates_are_dropped() {
        let h = harness(
            vec![
                sample("People count", PEOPLE_SAMPLE, "summary", Some("text-answer"), 0, 0.95),
                sample("Movies per year", "MATCH (m:Movie) RETURN count(m) AS movies", "chart", Some("bar-chart"), 1, 0.95),
            ],
            FakeEngine::new().rows_on("count(m)", rows(json!([{ "movies": 38 }]))),
            ScriptedOracle::new()
                .on("count(p)", PEOPLE_SAMPLE)
                .on("count(m)", "MATCH (m:Movie) RETURN count(m) AS movies"),
            ScriptedOracle::new().otherwise("unused"),
            PipelineConfig::default(),
        );
        let out = h.pipeline.answer("Overview", None, 20).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(h.summarizer.calls(), 0);
    }

    #[tokio::test]
    async fn failing_candidate_does_not_hide_survivors() {
        let h = harness(
            two_outputs(),
            FakeEngine::new()
                .fail_on("m.released")
                .rows_on("count(p)", rows(json!([{ "people": 3 }]))),
            ScriptedOracle::new()
                .on("m.released", YEARS_SAMPLE)
                .on("count(p)", PEOPLE_SAMPLE),
            ScriptedOracle::new().otherwise("There are 3 people."),
            PipelineConfig::default(),
        );
        let out = h.pipeline.answer("Overview", None, 20).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.data[0].output, "summary");
    }

    #[tokio::test]
    async fn error_surfaces_when_nothing_survives() {
        let h = harness(
            vec![sample("People count", PEOPLE_SAMPLE, "summary", None, 0, 0.95)],
            FakeEngine::new(),
            ScriptedOracle::new().fail_on("count(p)"),
            ScriptedOracle::new(),
            PipelineConfig::default(),
        );
        let err = h.pipeline.answer("How many people?", None, 20).await.unwrap_err();
        assert!(matches!(err, PipelineError::Llm(_)));
    }

    #[tokio::test]
    async fn rejects_unexpected_embedding_dimension() {
        let h = harness(
            vec![],
            FakeEngine::new(),
            ScriptedOracle::new(),
            ScriptedOracle::new(),
            PipelineConfig {
                embedding_dim: Some(1536),
                ..PipelineConfig::default()
            },
        );
        let err = h.pipeline.answer("q", None, 20).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmbeddingDimension { got: 3, want: 1536 }));
    }

    #[tokio::test]
    async fn oversized_limit_is_bounded_before_execution() {
        let h = harness(
            vec![sample("List people", PEOPLE_SAMPLE, "people", Some("table"), 0, 0.99)],
            FakeEngine::new().rows_on("Person", rows(json!([{ "name": "Keanu" }]))),
            ScriptedOracle::new().otherwise("MATCH (p:Person) RETURN p.name AS name LIMIT 500"),
            ScriptedOracle::new(),
            PipelineConfig::default(),
        );
        let out = h.pipeline.answer("List people", None, 20).await.unwrap();
        assert_eq!(out.data[0].queries[0].query, "MATCH (p:Person) RETURN p.name AS name LIMIT 20");
    }
}
