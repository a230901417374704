//! Unified error types for the crate.

use reqwest::StatusCode;
use thiserror::Error;

/// Status code Neo4j reports for statements that fail to parse or plan.
pub const SYNTAX_ERROR_CODE: &str = "Neo.ClientError.Statement.SyntaxError";

/// Top-level error for graph-store operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Transport/HTTP client error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from the server.
    #[error("HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Response body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Neo4j rejected the statement.
    #[error("neo4j error {code}: {message}")]
    Neo4j { code: String, message: String },
}

impl GraphError {
    /// True for errors a query rewrite could fix (parse/semantic errors).
    ///
    /// Missing procedures, permissions, constraint violations and transport
    /// problems are not syntax errors.
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, GraphError::Neo4j { code, .. } if code == SYNTAX_ERROR_CODE)
    }

    /// Engine message for a Neo4j-side failure.
    pub fn neo4j_message(&self) -> Option<&str> {
        match self {
            GraphError::Neo4j { message, .. } => Some(message),
            _ => None,
        }
    }
}
