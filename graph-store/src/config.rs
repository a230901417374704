//! Runtime configuration loaded from environment variables.

use crate::errors::GraphError;

/// Connection settings for the Neo4j HTTP API.
#[derive(Clone, Debug)]
pub struct GraphConfig {
    /// Base HTTP URL, e.g. `http://127.0.0.1:7474`.
    pub url: String,
    pub user: String,
    /// Basic auth is only sent when a password is configured.
    pub password: Option<String>,
    pub database: String,
    pub timeout_secs: u64,
    /// Sends `Access-Mode: READ` so the server refuses writes.
    pub read_only: bool,
    /// How many relationships are sampled when describing the schema.
    pub schema_sample: u64,
}

impl GraphConfig {
    /// Build from environment variables with sensible defaults.
    ///
    /// # Example
    /// ```
    /// # use graph_store::GraphConfig;
    /// let cfg = GraphConfig::from_env();
    /// assert!(!cfg.database.is_empty());
    /// ```
    pub fn from_env() -> Self {
        Self {
            url: env("NEO4J_URL", "http://127.0.0.1:7474"),
            user: env("NEO4J_USER", "neo4j"),
            password: std::env::var("NEO4J_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty()),
            database: env("NEO4J_DATABASE", "neo4j"),
            timeout_secs: parse("NEO4J_TIMEOUT_SECS", 30),
            read_only: env("NEO4J_READ_ONLY", "true") == "true",
            schema_sample: parse("NEO4J_SCHEMA_SAMPLE", 1000),
        }
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), GraphError> {
        let url = self.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(GraphError::Config(format!(
                "NEO4J_URL must start with http:// or https://, got `{url}`"
            )));
        }
        if self.database.trim().is_empty() {
            return Err(GraphError::Config("database is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(GraphError::Config("timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Endpoint that runs statements in a single auto-committed transaction.
    pub fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.url.trim().trim_end_matches('/'),
            self.database.trim()
        )
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k).unwrap_or_else(|_| dflt.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(dflt)
}
