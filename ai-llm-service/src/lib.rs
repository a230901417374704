//! Shared LLM access for the question-answering backend.
//!
//! - [`service_profiles::LlmServiceProfiles`] is the entry point: construct once,
//!   wrap in `Arc`, and clone into dependents.
//! - Providers live under [`services`] (Ollama, OpenAI).
//! - Environment-driven configs live under [`config::default_config`].
//! - Errors are unified under [`error_handler::AiLlmError`].

pub mod config;
pub mod error_handler;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::AiLlmError;
pub use service_profiles::LlmServiceProfiles;
