//! Thin client over the Neo4j HTTP transactional API.
//!
//! Every call posts one statement to `/db/{database}/tx/commit` and decodes
//! `{ results: [{ columns, data: [{ row }] }], errors: [{ code, message }] }`.
//! Neo4j answers `200 OK` even when the statement failed, so `errors` is
//! checked before `results`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, instrument, trace};

use crate::config::GraphConfig;
use crate::errors::GraphError;
use crate::model::Row;

/// Neo4j client. Cheap to share behind an `Arc`; `reqwest` pools connections.
pub struct Neo4jClient {
    http: reqwest::Client,
    cfg: GraphConfig,
    url_commit: String,
}

impl Neo4jClient {
    /// Creates a client from the given config.
    ///
    /// # Errors
    /// - [`GraphError::Config`] if the config is invalid
    /// - [`GraphError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: GraphConfig) -> Result<Self, GraphError> {
        cfg.validate()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if cfg.read_only {
            headers.insert("access-mode", header::HeaderValue::from_static("READ"));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .default_headers(headers)
            .gzip(true)
            .build()?;

        let url_commit = cfg.commit_url();
        debug!(url = %url_commit, read_only = cfg.read_only, "Neo4jClient initialized");

        Ok(Self {
            http,
            cfg,
            url_commit,
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.cfg
    }

    /// Runs one statement with parameters and returns its rows.
    ///
    /// # Errors
    /// - [`GraphError::Neo4j`] if the server rejected the statement
    /// - [`GraphError::HttpStatus`] / [`GraphError::Transport`] for HTTP failures
    /// - [`GraphError::Decode`] if the body is not a transactional API response
    #[instrument(skip_all, fields(statement_len = statement.len()))]
    pub async fn run(&self, statement: &str, parameters: Value) -> Result<Vec<Row>, GraphError> {
        let started = Instant::now();
        let body = CommitRequest {
            statements: vec![Statement {
                statement,
                parameters,
                result_data_contents: ["row"],
            }],
        };

        let mut req = self.http.post(&self.url_commit).json(&body);
        if let Some(password) = &self.cfg.password {
            req = req.basic_auth(&self.cfg.user, Some(password));
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.trim().chars().take(240).collect::<String>();
            error!(%status, url = %self.url_commit, %snippet, "neo4j returned non-success status");
            return Err(GraphError::HttpStatus {
                status,
                url: self.url_commit.clone(),
                snippet,
            });
        }

        let out: CommitResponse = resp
            .json()
            .await
            .map_err(|e| GraphError::Decode(format!("transactional API response: {e}")))?;
        let rows = decode_rows(out)?;

        trace!(
            rows = rows.len(),
            latency_ms = started.elapsed().as_millis(),
            "statement completed"
        );
        Ok(rows)
    }

    /// Runs a statement without parameters.
    pub async fn execute(&self, statement: &str) -> Result<Vec<Row>, GraphError> {
        self.run(statement, Value::Object(Map::new())).await
    }

    /// Plans the statement with `EXPLAIN` without running it.
    ///
    /// Returns `Ok(())` when it compiles. Syntax problems come back as
    /// [`GraphError::Neo4j`] with [`GraphError::is_syntax_error`] set.
    pub async fn explain(&self, statement: &str) -> Result<(), GraphError> {
        self.execute(&format!("EXPLAIN {statement}")).await.map(|_| ())
    }
}

/// Turns the single statement result into rows, surfacing the first server error.
pub(crate) fn decode_rows(resp: CommitResponse) -> Result<Vec<Row>, GraphError> {
    if let Some(err) = resp.errors.into_iter().next() {
        return Err(GraphError::Neo4j {
            code: err.code,
            message: err.message,
        });
    }

    let Some(result) = resp.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::with_capacity(result.data.len());
    for record in result.data {
        if record.row.len() != result.columns.len() {
            return Err(GraphError::Decode(format!(
                "row has {} values for {} columns",
                record.row.len(),
                result.columns.len()
            )));
        }
        let row: Row = result.columns.iter().cloned().zip(record.row).collect();
        rows.push(row);
    }
    Ok(rows)
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
    result_data_contents: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<ServerError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    code: String,
    message: String,
}
