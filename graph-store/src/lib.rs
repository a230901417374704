//! Neo4j access for the question-answering pipeline.
//!
//! Everything goes through the HTTP transactional endpoint
//! (`POST {url}/db/{database}/tx/commit`), so the crate needs nothing beyond
//! `reqwest`. It provides:
//! - statement execution returning column-ordered JSON rows,
//! - `EXPLAIN` dry-runs with syntax-error classification,
//! - a structural schema description (labels, relationship types, properties),
//! - nearest stored sample questions through the vector index.

mod client;
mod config;
mod errors;
mod model;
mod samples;
mod schema;

pub use client::Neo4jClient;
pub use config::GraphConfig;
pub use errors::GraphError;
pub use model::{
    GraphSchema, LabelProperties, PropertyInfo, RelationshipPattern, Row, SampleMatch,
};
pub use samples::{INTERNAL_LABEL_PREFIX, QUESTION_INDEX};
