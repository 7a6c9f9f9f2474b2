//! Log output setup.

use std::sync::Once;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

static INIT: Once = Once::new();

/// Environment variable holding the log filter.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

impl LogFormat {
    /// `Json` when `LOG_FORMAT` is `json`, otherwise `Pretty`.
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Installs the global subscriber.
///
/// The filter is read from `LOG_LEVEL` (e.g. `info`, `hookwise_std=debug`)
/// and defaults to `info`. Subsequent calls are no-ops. When the host
/// application already installed a subscriber, that one is kept and a
/// warning is logged through it.
pub fn init(format: LogFormat) {
    INIT.call_once(|| {
        if let Err(err) = try_init(format) {
            tracing::warn!(%err, "global subscriber already installed; keeping it");
        }
    });
}

/// Like [`init`], returning an error instead of logging when a global
/// subscriber is already installed.
///
/// # Errors
///
/// Returns [`TryInitError`] if a global subscriber or `log` logger exists.
pub fn try_init(format: LogFormat) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .try_init(),
    }
}
