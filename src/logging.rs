//! File-based logging
//!
//! Tracing output goes to a rotating file because the terminal UI owns stdout.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::Settings;

const LOG_FILE_PREFIX: &str = "tandem-player";

/// Initialize the logging system.
///
/// Logs are written to `<log_dir>/tandem-player.YYYY-MM-DD.log` with daily
/// rotation (`.logs` unless `TANDEM_LOG_DIR` says otherwise). `RUST_LOG` takes
/// precedence over the configured filter.
///
/// Default log levels:
/// - `tandem_player` modules: DEBUG
/// - `librespot`, `rspotify`: INFO
/// - Other crates: WARN
pub fn init_logging(settings: &Settings) -> anyhow::Result<WorkerGuard> {
    let log_dir = settings.log_dir.as_path();
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);

    // Non-blocking so the control task never waits on disk; the guard flushes on drop
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("Logging initialized - logs written to {}/", log_dir.display());

    Ok(guard)
}

/// Log the outcome of a playback API call
#[macro_export]
macro_rules! log_api_result {
    ($operation:expr, $result:expr) => {
        match &$result {
            Ok(_) => tracing::info!(operation = $operation, "API request successful"),
            Err(e) => tracing::error!(operation = $operation, error = %e, "API request failed"),
        }
    };
}

/// Log a playback API call with additional context
#[macro_export]
macro_rules! log_api_request {
    ($operation:expr, $($field:tt)*) => {
        tracing::debug!(operation = $operation, $($field)*, "API request started");
    };
}
