//! Pipeline policy loaded from environment variables.

use crate::error::PipelineError;

/// Number of nearest stored questions considered per request.
pub const DEFAULT_TOP_K: usize = 5;
/// Minimum cosine similarity for a stored question to count as a match.
pub const DEFAULT_MIN_SCORE: f32 = 0.9;
/// Maximum rows a synthesized query may return.
pub const DEFAULT_RESULT_LIMIT: u64 = 20;
/// Repair calls allowed per candidate before it is dropped.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Policy knobs of one pipeline instance.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub top_k: usize,
    pub min_score: f32,
    pub result_limit: u64,
    pub max_retries: usize,
    /// Diagnostic mode: fetch candidates one after another.
    pub sequential: bool,
    /// Allow the schema-based fallback when no sample matches.
    pub allow_fallback: bool,
    /// Vector index over stored question embeddings.
    pub question_index: String,
    /// Expected embedding length; `None` accepts any length.
    pub embedding_dim: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            result_limit: DEFAULT_RESULT_LIMIT,
            max_retries: DEFAULT_MAX_RETRIES,
            sequential: false,
            allow_fallback: false,
            question_index: graph_store::QUESTION_INDEX.to_string(),
            embedding_dim: None,
        }
    }
}

impl PipelineConfig {
    /// Build from environment variables, falling back to the defaults above.
    ///
    /// # Errors
    /// [`PipelineError::Config`] when a variable is set but malformed, or the
    /// resulting policy is invalid.
    pub fn from_env() -> Result<Self, PipelineError> {
        let d = Self::default();
        let cfg = Self {
            top_k: parse("RAG_TOP_K", d.top_k)?,
            min_score: parse("RAG_MIN_SCORE", d.min_score)?,
            result_limit: parse("RESULT_LIMIT", d.result_limit)?,
            max_retries: parse("CORRECTION_RETRIES", d.max_retries)?,
            sequential: flag("PIPELINE_SEQUENTIAL", d.sequential)?,
            allow_fallback: flag("ALLOW_FALLBACK", d.allow_fallback)?,
            question_index: std::env::var("RAG_QUESTION_INDEX")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(d.question_index),
            embedding_dim: match std::env::var("EMBEDDING_DIM") {
                Ok(v) if !v.trim().is_empty() => Some(parse_value("EMBEDDING_DIM", &v)?),
                _ => None,
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.top_k == 0 {
            return Err(PipelineError::Config("top_k must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(PipelineError::Config(format!(
                "min_score must be within [0, 1], got {}",
                self.min_score
            )));
        }
        if self.result_limit == 0 {
            return Err(PipelineError::Config("result_limit must be > 0".into()));
        }
        if self.question_index.trim().is_empty() {
            return Err(PipelineError::Config("question_index is empty".into()));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> Result<T, PipelineError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => parse_value(k, &v),
        _ => Ok(dflt),
    }
}

fn parse_value<T: std::str::FromStr>(k: &str, v: &str) -> Result<T, PipelineError>
where
    T::Err: std::fmt::Display,
{
    v.trim()
        .parse()
        .map_err(|e| PipelineError::Config(format!("{k}=`{v}`: {e}")))
}

fn flag(k: &str, dflt: bool) -> Result<bool, PipelineError> {
    match std::env::var(k) {
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "" => Ok(dflt),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(PipelineError::Config(format!("{k}=`{other}` is not a boolean"))),
        },
        Err(_) => Ok(dflt),
    }
}
