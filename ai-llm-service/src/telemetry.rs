//! Tracing setup shared by the binaries of the workspace.

use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Crate target prefix used to tune library-originated logs.
pub const TARGET_PREFIX: &str = "ai_llm_service";

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        let s = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

/// Helper to build a level directive for a single crate target.
/// Example: `level_directive("query_pipeline", Level::DEBUG)` → `query_pipeline=debug`
pub fn level_directive(target: &str, level: Level) -> Option<Directive> {
    let s = format!("{target}={}", level.as_str().to_lowercase());
    Directive::from_str(&s).ok()
}

/// Creates an EnvFilter from `RUST_LOG` or the fallback `default`,
/// then applies a per-crate level for this library.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    let base = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    match level_directive(TARGET_PREFIX, level) {
        Some(d) => base.add_directive(d),
        None => base,
    }
}

/// Installs the global subscriber:
///
/// - RFC3339 UTC timestamps
/// - Compact single-line format with target and span fields (e.g. `request_id`)
/// - ANSI colors only when stderr is a terminal
///
/// Logs go to stderr so stdout stays free for command output.
/// Calling it twice is harmless: the second attempt is ignored.
pub fn init(default_filter: &str) {
    let use_ansi = io::stderr().is_terminal();

    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(use_ansi)
        .event_format(
            fmt::format()
                .compact()
                .with_timer(ChronoRfc3339Utc)
                .with_level(true)
                .with_target(true),
        );

    let _ = tracing_subscriber::registry()
        .with(env_filter_with_level(default_filter, Level::INFO))
        .with(layer)
        .try_init();
}
