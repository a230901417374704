//! Query synthesis and correction pipeline.
//!
//! Turns a natural-language question into zero or more shaped, validated and
//! executed result items:
//!
//! question → embedding → similar stored samples grouped by output →
//! per-output synthesis → limit policy → dry-run/repair loop → execution →
//! shaping → aggregation by `order` → schema-based fallback when empty.
//!
//! Every external collaborator is reached through the traits in [`ports`];
//! [`adapters`] binds them to `ai-llm-service` and `graph-store`.

pub mod adapters;
pub mod cfg;
pub mod corrector;
pub mod error;
mod fallback;
mod fetcher;
pub mod limit;
pub mod model;
pub mod orchestrator;
pub mod ports;
pub mod prompt;
pub mod retriever;
mod search;
pub mod shape;
pub mod statement;
pub mod synthesizer;

#[cfg(test)]
pub(crate) mod fakes;

pub use cfg::PipelineConfig;
pub use error::{DropReason, PipelineError};
pub use fallback::FALLBACK_OUTPUT;
pub use model::{
    Axes, OutputCandidate, QueryAudit, ResultItem, SampleQuery, SearchResult, VisualizationKind,
};
pub use orchestrator::{Ports, QueryPipeline};
