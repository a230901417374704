//! Seams to the external collaborators.
//!
//! Every port is object safe and returns a boxed future so the pipeline can
//! hold `Arc<dyn Port>` values and tests can swap in deterministic fakes.

use std::{future::Future, pin::Pin};

use graph_store::{GraphSchema, SampleMatch};

use crate::error::PipelineError;
use crate::model::Row;
use crate::prompt::Prompt;

/// Boxed future returned by every port.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PipelineError>> + Send + 'a>>;

/// Embedding oracle.
pub trait Embedder: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> PortFuture<'a, Vec<f32>>;
}

/// Text generation oracle, used for synthesis, limit rewrites, repairs and
/// summaries, each with its own prompt.
pub trait TextOracle: Send + Sync {
    fn complete<'a>(&'a self, prompt: &'a Prompt) -> PortFuture<'a, String>;
}

/// Verdict of a non-mutating validity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DryRun {
    Valid,
    /// Engine message describing the syntax problem.
    SyntaxError(String),
}

/// Live graph query engine.
///
/// Only syntax problems come back through [`DryRun::SyntaxError`]; anything
/// else the engine rejects is an `Err`.
pub trait QueryEngine: Send + Sync {
    fn dry_run<'a>(&'a self, query: &'a str) -> PortFuture<'a, DryRun>;

    fn execute<'a>(&'a self, query: &'a str) -> PortFuture<'a, Vec<Row>>;

    fn describe_schema(&self) -> PortFuture<'_, GraphSchema>;
}

/// Vector lookup of stored sample questions.
pub trait SampleIndex: Send + Sync {
    fn nearest_samples<'a>(
        &'a self,
        embedding: &'a [f32],
        top_k: usize,
        min_score: f32,
    ) -> PortFuture<'a, Vec<SampleMatch>>;
}
