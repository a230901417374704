//! Deterministic stand-ins for the ports, used by unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ai_llm_service::error_handler::{Provider, ProviderError, ProviderErrorKind};
use graph_store::{GraphError, GraphSchema, LabelProperties, PropertyInfo, RelationshipPattern, SampleMatch};
use serde_json::Value;

use crate::error::PipelineError;
use crate::model::Row;
use crate::ports::{DryRun, Embedder, PortFuture, QueryEngine, SampleIndex, TextOracle};
use crate::prompt::Prompt;

/// Rows from a JSON array of objects.
pub fn rows(v: Value) -> Vec<Row> {
    v.as_array()
        .map(|a| a.iter().filter_map(|r| r.as_object().cloned()).collect())
        .unwrap_or_default()
}

pub fn sample(
    question: &str,
    query: &str,
    output: &str,
    visualization: Option<&str>,
    order: i64,
    score: f32,
) -> SampleMatch {
    SampleMatch {
        question: question.into(),
        query: query.into(),
        output: output.into(),
        visualization: visualization.map(str::to_string),
        order,
        score,
    }
}

async fn pause(delay: Option<Duration>) {
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }
}

/* ---------------- Embedder ---------------- */

pub struct FakeEmbedder {
    vector: Vec<f32>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for FakeEmbedder {
    fn embed<'a>(&'a self, _text: &'a str) -> PortFuture<'a, Vec<f32>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        })
    }
}

/* ---------------- Oracle ---------------- */

enum Reply {
    Text(String),
    Fail,
}

struct Rule {
    needle: String,
    reply: Reply,
    delay: Option<Duration>,
}

/// Replies with the first rule whose needle occurs in the rendered prompt
/// (system and user), else with the default reply (empty unless set).
pub struct ScriptedOracle {
    rules: Vec<Rule>,
    default_reply: String,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_reply: String::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn on(self, needle: &str, reply: &str) -> Self {
        self.rule(needle, Reply::Text(reply.into()), None)
    }

    pub fn on_delayed(self, needle: &str, reply: &str, delay_ms: u64) -> Self {
        self.rule(needle, Reply::Text(reply.into()), Some(Duration::from_millis(delay_ms)))
    }

    /// Fails like an unreachable provider.
    pub fn fail_on(self, needle: &str) -> Self {
        self.rule(needle, Reply::Fail, None)
    }

    pub fn otherwise(mut self, reply: &str) -> Self {
        self.default_reply = reply.into();
        self
    }

    fn rule(mut self, needle: &str, reply: Reply, delay: Option<Duration>) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            reply,
            delay,
        });
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TextOracle for ScriptedOracle {
    fn complete<'a>(&'a self, prompt: &'a Prompt) -> PortFuture<'a, String> {
        Box::pin(async move {
            self.prompts.lock().unwrap().push(prompt.clone());
            let text = format!("{}\n{}", prompt.system, prompt.user);
            let Some(rule) = self.rules.iter().find(|r| text.contains(&r.needle)) else {
                return Ok(self.default_reply.clone());
            };
            pause(rule.delay).await;
            match &rule.reply {
                Reply::Text(t) => Ok(t.clone()),
                Reply::Fail => Err(PipelineError::Llm(
                    ProviderError::new(Provider::Ollama, ProviderErrorKind::Decode("connection reset".into())).into(),
                )),
            }
        })
    }
}

/* ---------------- Engine ---------------- */

struct RowsRule {
    needle: String,
    rows: Vec<Row>,
    delay: Option<Duration>,
}

/// Dry-runs succeed unless a syntax or failure needle occurs in the query;
/// execution returns the rows of the first matching rule, else no rows.
pub struct FakeEngine {
    syntax_errors: Vec<(String, String)>,
    always_syntax: Option<String>,
    failures: Vec<String>,
    rows: Vec<RowsRule>,
    schema: GraphSchema,
    dry_runs: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            syntax_errors: Vec::new(),
            always_syntax: None,
            failures: Vec::new(),
            rows: Vec::new(),
            schema: movies_schema(),
            dry_runs: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn syntax_error_on(mut self, needle: &str, message: &str) -> Self {
        self.syntax_errors.push((needle.into(), message.into()));
        self
    }

    pub fn always_syntax_error(mut self, message: &str) -> Self {
        self.always_syntax = Some(message.into());
        self
    }

    /// Non-syntax failure (missing procedure) for queries containing `needle`.
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.failures.push(needle.into());
        self
    }

    pub fn rows_on(self, needle: &str, rows: Vec<Row>) -> Self {
        self.rows_rule(needle, rows, None)
    }

    pub fn rows_on_delayed(self, needle: &str, rows: Vec<Row>, delay_ms: u64) -> Self {
        self.rows_rule(needle, rows, Some(Duration::from_millis(delay_ms)))
    }

    fn rows_rule(mut self, needle: &str, rows: Vec<Row>, delay: Option<Duration>) -> Self {
        self.rows.push(RowsRule {
            needle: needle.into(),
            rows,
            delay,
        });
        self
    }

    pub fn dry_runs(&self) -> usize {
        self.dry_runs.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn failure(&self, query: &str) -> Option<PipelineError> {
        self.failures.iter().find(|n| query.contains(n.as_str())).map(|n| {
            PipelineError::Graph(GraphError::Neo4j {
                code: "Neo.ClientError.Procedure.ProcedureNotFound".into(),
                message: format!("There is no procedure matching `{n}`"),
            })
        })
    }
}

impl QueryEngine for FakeEngine {
    fn dry_run<'a>(&'a self, query: &'a str) -> PortFuture<'a, DryRun> {
        Box::pin(async move {
            self.dry_runs.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.failure(query) {
                return Err(err);
            }
            if let Some(msg) = &self.always_syntax {
                return Ok(DryRun::SyntaxError(msg.clone()));
            }
            match self.syntax_errors.iter().find(|(n, _)| query.contains(n.as_str())) {
                Some((_, msg)) => Ok(DryRun::SyntaxError(msg.clone())),
                None => Ok(DryRun::Valid),
            }
        })
    }

    fn execute<'a>(&'a self, query: &'a str) -> PortFuture<'a, Vec<Row>> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(query.to_string());
            if let Some(err) = self.failure(query) {
                return Err(err);
            }
            match self.rows.iter().find(|r| query.contains(&r.needle)) {
                Some(rule) => {
                    pause(rule.delay).await;
                    Ok(rule.rows.clone())
                }
                None => Ok(Vec::new()),
            }
        })
    }

    fn describe_schema(&self) -> PortFuture<'_, GraphSchema> {
        Box::pin(async move { Ok(self.schema.clone()) })
    }
}

fn movies_schema() -> GraphSchema {
    GraphSchema {
        node_properties: vec![
            LabelProperties {
                label: "Person".into(),
                properties: vec![PropertyInfo {
                    name: "name".into(),
                    kind: "STRING".into(),
                }],
            },
            LabelProperties {
                label: "_RAGQuestion".into(),
                properties: vec![PropertyInfo {
                    name: "question".into(),
                    kind: "STRING".into(),
                }],
            },
        ],
        relationship_properties: vec![],
        relationships: vec![RelationshipPattern {
            start: "Person".into(),
            rel_type: "ACTED_IN".into(),
            end: "Movie".into(),
        }],
    }
}

/* ---------------- Index ---------------- */

pub struct FakeIndex {
    matches: Vec<SampleMatch>,
}

impl FakeIndex {
    pub fn new(matches: Vec<SampleMatch>) -> Self {
        Self { matches }
    }
}

impl SampleIndex for FakeIndex {
    fn nearest_samples<'a>(
        &'a self,
        _embedding: &'a [f32],
        top_k: usize,
        min_score: f32,
    ) -> PortFuture<'a, Vec<SampleMatch>> {
        Box::pin(async move {
            Ok(self
                .matches
                .iter()
                .take(top_k)
                .filter(|m| m.score > min_score)
                .cloned()
                .collect())
        })
    }
}
