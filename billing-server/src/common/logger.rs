//! Logging Infrastructure
//!
//! Structured logging for development and production:
//! - Console output, pretty or JSON
//! - Daily rotating application logs (kept for `APP_LOG_RETENTION` files)
//! - Ledger logs: every recorded commission and generated invoice, never pruned
//!
//! Ledger events use `target: "ledger"` and are routed to their own file.

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, filter::filter_fn, fmt, prelude::*};

/// Tracing target for money-moving events
pub const LEDGER_TARGET: &str = "ledger";

/// Rotated application log files to keep (one per day)
const APP_LOG_RETENTION: usize = 14;

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Default filter when `RUST_LOG` is unset (e.g. "info", "billing_server=debug")
/// * `json_format` - JSON console output (production) instead of pretty output
/// * `log_dir` - Optional directory for file logging (`app/` and `ledger/` subdirectories)
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_json = json_format.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });
    let console_pretty = (!json_format).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
    });

    let (app_layer, ledger_layer) = match log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            let app_log_dir = log_dir.join("app");
            let ledger_log_dir = log_dir.join("ledger");
            fs::create_dir_all(&app_log_dir)?;
            fs::create_dir_all(&ledger_log_dir)?;

            // app.YYYY-MM-DD.log, pruned by the appender itself
            let app_log = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("app")
                .filename_suffix("log")
                .max_log_files(APP_LOG_RETENTION)
                .build(app_log_dir)?;
            let app_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::sync::Mutex::new(app_log))
                .with_filter(filter_fn(|meta| meta.target() != LEDGER_TARGET));

            // ledger.YYYY-MM-DD.log, never deleted
            let ledger_log = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("ledger")
                .filename_suffix("log")
                .build(ledger_log_dir)?;
            let ledger_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(false)
                .with_writer(std::sync::Mutex::new(ledger_log))
                .with_filter(filter_fn(|meta| meta.target() == LEDGER_TARGET));

            (Some(app_layer), Some(ledger_layer))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_json)
        .with(console_pretty)
        .with(app_layer)
        .with(ledger_layer)
        .try_init()?;

    Ok(())
}
