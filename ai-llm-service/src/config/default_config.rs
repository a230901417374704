//! Default LLM configs loaded strictly from environment variables.
//!
//! Convenience constructors for [`LlmModelConfig`], grouped by provider and role:
//!
//! - **Slow**      → higher-quality model (query synthesis, repair)
//! - **Fast**      → cheaper model (answer summaries)
//! - **Embedding** → embedding generator (question similarity)
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`       = provider kind (`ollama` | `openai`, default `ollama`)
//! - `LLM_MAX_TOKENS` = optional max tokens (u32)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`                = slow/quality model (mandatory)
//! - `OLLAMA_MODEL_FAST`           = fast model (optional, falls back to `OLLAMA_MODEL`)
//! - `EMBEDDING_MODEL`             = embedding model (mandatory)
//!
//! OpenAI-specific:
//! - `OPENAI_API_KEY`          = API key (mandatory)
//! - `OPENAI_URL`              = base URL (default `https://api.openai.com`)
//! - `OPENAI_MODEL`            = slow/quality model (mandatory)
//! - `OPENAI_MODEL_FAST`       = fast model (optional, falls back to `OPENAI_MODEL`)
//! - `OPENAI_EMBEDDING_MODEL`  = embedding model (default `text-embedding-3-small`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_u32, must_env, opt_env, validate_http_endpoint,
    },
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The three profiles resolved from environment: `(fast, slow, embedding)`.
pub struct ProfileConfigs {
    pub fast: LlmModelConfig,
    pub slow: LlmModelConfig,
    pub embedding: LlmModelConfig,
}

/// Resolves all three profiles for the provider selected by `LLM_KIND`.
///
/// # Errors
/// Propagates [`ConfigError`]s for missing or malformed variables.
pub fn profiles_from_env() -> Result<ProfileConfigs, AiLlmError> {
    let kind = opt_env("LLM_KIND")
        .map(|k| k.parse::<LlmProvider>())
        .transpose()?
        .unwrap_or(LlmProvider::Ollama);

    match kind {
        LlmProvider::Ollama => Ok(ProfileConfigs {
            fast: config_ollama_fast()?,
            slow: config_ollama_slow()?,
            embedding: config_ollama_embedding()?,
        }),
        LlmProvider::OpenAI => Ok(ProfileConfigs {
            fast: config_openai_fast()?,
            slow: config_openai_slow()?,
            embedding: config_openai_embedding()?,
        }),
    }
}

/* --------------------------- Ollama --------------------------- */

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        port.trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
}

/// Slow/quality Ollama model. Deterministic sampling suits code generation.
pub fn config_ollama_slow() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: must_env("OLLAMA_MODEL")?,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(600),
    })
}

/// Fast Ollama model, used for answer summaries.
pub fn config_ollama_fast() -> Result<LlmModelConfig, AiLlmError> {
    let model = match opt_env("OLLAMA_MODEL_FAST") {
        Some(m) => m,
        None => must_env("OLLAMA_MODEL")?,
    };

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.2),
        top_p: Some(0.9),
        timeout_secs: Some(300),
    })
}

/// Ollama embedding model.
pub fn config_ollama_embedding() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: must_env("EMBEDDING_MODEL")?,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    })
}

/* --------------------------- OpenAI --------------------------- */

fn openai_endpoint() -> Result<String, AiLlmError> {
    let url = opt_env("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
    validate_http_endpoint("OPENAI_URL", &url)?;
    Ok(url)
}

/// Slow/quality OpenAI model.
pub fn config_openai_slow() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: must_env("OPENAI_MODEL")?,
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(120),
    })
}

/// Fast OpenAI model.
pub fn config_openai_fast() -> Result<LlmModelConfig, AiLlmError> {
    let model = match opt_env("OPENAI_MODEL_FAST") {
        Some(m) => m,
        None => must_env("OPENAI_MODEL")?,
    };

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model,
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(60),
    })
}

/// OpenAI embedding model.
pub fn config_openai_embedding() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: opt_env("OPENAI_EMBEDDING_MODEL")
            .unwrap_or_else(|| DEFAULT_OPENAI_EMBEDDING_MODEL.to_string()),
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(30),
    })
}
