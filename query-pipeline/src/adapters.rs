//! Port implementations over `ai-llm-service` and `graph-store`.

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use graph_store::{GraphSchema, Neo4jClient, SampleMatch};
use tracing::debug;

use crate::cfg::PipelineConfig;
use crate::model::Row;
use crate::orchestrator::{Ports, QueryPipeline};
use crate::ports::{DryRun, Embedder, PortFuture, QueryEngine, SampleIndex, TextOracle};
use crate::prompt::Prompt;

/// Embeddings from the `embedding` profile.
#[derive(Clone)]
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl Embedder for LlmEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> PortFuture<'a, Vec<f32>> {
        Box::pin(async move { Ok(self.svc.embed(text).await?) })
    }
}

/// Which generation profile an oracle talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleProfile {
    Fast,
    Slow,
}

/// Text oracle over one generation profile.
#[derive(Clone)]
pub struct LlmOracle {
    svc: Arc<LlmServiceProfiles>,
    profile: OracleProfile,
}

impl LlmOracle {
    pub fn new(svc: Arc<LlmServiceProfiles>, profile: OracleProfile) -> Self {
        Self { svc, profile }
    }
}

impl TextOracle for LlmOracle {
    fn complete<'a>(&'a self, prompt: &'a Prompt) -> PortFuture<'a, String> {
        Box::pin(async move {
            let system = Some(prompt.system.as_str()).filter(|s| !s.trim().is_empty());
            let reply = match self.profile {
                OracleProfile::Fast => self.svc.generate_fast(&prompt.user, system).await?,
                OracleProfile::Slow => self.svc.generate_slow(&prompt.user, system).await?,
            };
            debug!(profile = ?self.profile, reply_len = reply.len(), "oracle: completed");
            Ok(reply)
        })
    }
}

impl QueryEngine for Neo4jClient {
    fn dry_run<'a>(&'a self, query: &'a str) -> PortFuture<'a, DryRun> {
        Box::pin(async move {
            match self.explain(query).await {
                Ok(()) => Ok(DryRun::Valid),
                Err(e) if e.is_syntax_error() => Ok(DryRun::SyntaxError(
                    e.neo4j_message().unwrap_or_default().to_string(),
                )),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn execute<'a>(&'a self, query: &'a str) -> PortFuture<'a, Vec<Row>> {
        Box::pin(async move { Ok(Neo4jClient::execute(self, query).await?) })
    }

    fn describe_schema(&self) -> PortFuture<'_, GraphSchema> {
        Box::pin(async move { Ok(Neo4jClient::describe_schema(self).await?) })
    }
}

/// Sample lookup through a named Neo4j vector index.
#[derive(Clone)]
pub struct GraphSampleIndex {
    client: Arc<Neo4jClient>,
    index: String,
}

impl GraphSampleIndex {
    pub fn new(client: Arc<Neo4jClient>, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }
}

impl SampleIndex for GraphSampleIndex {
    fn nearest_samples<'a>(
        &'a self,
        embedding: &'a [f32],
        top_k: usize,
        min_score: f32,
    ) -> PortFuture<'a, Vec<SampleMatch>> {
        Box::pin(async move {
            Ok(self
                .client
                .nearest_samples(&self.index, embedding, top_k, min_score)
                .await?)
        })
    }
}

/// Wires a pipeline to live services.
///
/// Synthesis, limit rewrites and repairs use the `slow` profile; text
/// summaries use the `fast` one.
pub fn live_pipeline(
    svc: Arc<LlmServiceProfiles>,
    client: Arc<Neo4jClient>,
    cfg: PipelineConfig,
) -> QueryPipeline {
    let ports = Ports {
        embedder: Arc::new(LlmEmbedder::new(svc.clone())),
        index: Arc::new(GraphSampleIndex::new(client.clone(), cfg.question_index.clone())),
        engine: client,
        generator: Arc::new(LlmOracle::new(svc.clone(), OracleProfile::Slow)),
        summarizer: Arc::new(LlmOracle::new(svc, OracleProfile::Fast)),
    };
    QueryPipeline::new(ports, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::{LlmModelConfig, LlmProvider};
    use graph_store::GraphConfig;

    fn svc() -> Arc<LlmServiceProfiles> {
        let fast = LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "qwen3:8b".into(),
            endpoint: "http://127.0.0.1:11434".into(),
            api_key: None,
            max_tokens: None,
            temperature: Some(0.0),
            top_p: None,
            timeout_secs: Some(5),
        };
        let embedding = LlmModelConfig {
            model: "bge-m3".into(),
            ..fast.clone()
        };
        Arc::new(LlmServiceProfiles::new(fast, None, embedding))
    }

    #[test]
    fn live_wiring_uses_configured_index() {
        let client = Arc::new(
            Neo4jClient::new(GraphConfig {
                url: "http://127.0.0.1:7474".into(),
                user: "neo4j".into(),
                password: None,
                database: "neo4j".into(),
                timeout_secs: 5,
                read_only: true,
                schema_sample: 100,
            })
            .unwrap(),
        );
        let cfg = PipelineConfig {
            question_index: "custom_index".into(),
            ..PipelineConfig::default()
        };
        let p = live_pipeline(svc(), client, cfg);
        assert_eq!(p.config().question_index, "custom_index");
    }
}
