//! Structured logging for inv-core.
//!
//! Two output modes, both on stderr:
//! - Human-readable console output for interactive use
//! - JSON lines for scheduled and automated runs
//!
//! stdout is reserved for command payloads (statistics JSON, tables).
//!
//! ```ignore
//! use inv_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! let ctx = LogContext::new(generate_run_id()).with_manifest("inventory/m.json");
//! log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "processing manifest");
//! ```

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, LogContext, Stage};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Install the global subscriber. Later calls are ignored.
///
/// `RUST_LOG` directives, when present, replace the level from `config`.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "inv_core={level},inv_store={level},inv_config={level}",
            level = config.level
        ))
    });

    let layer = match config.format {
        LogFormat::Human => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
        LogFormat::Jsonl => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    // A subscriber may already be installed (tests, embedding hosts)
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init();
}

/// Unique ID for this invocation: `run-` plus 12 hex chars.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}

/// Emit an event with the run's correlation fields.
///
/// Extra fields use `tracing` field syntax, sigils included:
///
/// ```ignore
/// log_event!(ctx, WARN, event_names::ANALYZE_FAILED, Stage::Analyze, "analysis failed",
///     error = %e, files = 3);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $($field:tt)+)?) => {
        tracing::info!(
            event = $event,
            run_id = %$ctx.run_id,
            manifest = ?$ctx.manifest,
            stage = %$stage,
            $($($field)+,)?
            "{}", $msg
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $($field:tt)+)?) => {
        tracing::debug!(
            event = $event,
            run_id = %$ctx.run_id,
            manifest = ?$ctx.manifest,
            stage = %$stage,
            $($($field)+,)?
            "{}", $msg
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $($field:tt)+)?) => {
        tracing::warn!(
            event = $event,
            run_id = %$ctx.run_id,
            manifest = ?$ctx.manifest,
            stage = %$stage,
            $($($field)+,)?
            "{}", $msg
        )
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $($field:tt)+)?) => {
        tracing::error!(
            event = $event,
            run_id = %$ctx.run_id,
            manifest = ?$ctx.manifest,
            stage = %$stage,
            $($($field)+,)?
            "{}", $msg
        )
    };
}
