//! # Structured Logging Module
//!
//! Environment-aware structured logging for harness runs. Console output is
//! always on; a JSON file copy is written when `DHIS2_TEST_LOG_DIR` is set,
//! which is how CI keeps the request/response trail of a failed run.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| get_log_level(&environment));

        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_test_writer()
            .with_filter(EnvFilter::new(&filter));

        let file_layer = log_file_path(&environment).and_then(|(log_dir, file_name)| {
            if let Err(e) = fs::create_dir_all(&log_dir) {
                eprintln!("Failed to create log directory {}: {e}", log_dir.display());
                return None;
            }
            let appender = tracing_appender::rolling::never(&log_dir, &file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            // Flushed on process exit; the guard must outlive every test.
            std::mem::forget(guard);
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(&filter)),
            )
        });

        let result = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init();

        if result.is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized, keeping the existing one"
            );
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            filter = %filter,
            "Structured logging initialized"
        );
    });
}

/// Current harness environment (`DHIS2_TEST_ENV`, then `CI`, defaulting to `test`)
fn get_environment() -> String {
    std::env::var("DHIS2_TEST_ENV").unwrap_or_else(|_| {
        if std::env::var("CI").is_ok() {
            "ci".to_string()
        } else {
            "test".to_string()
        }
    })
}

fn get_log_level(environment: &str) -> String {
    match environment {
        "ci" => "info".to_string(),
        "test" | "development" => "debug".to_string(),
        _ => "info".to_string(),
    }
}

fn log_file_path(environment: &str) -> Option<(PathBuf, String)> {
    let log_dir = std::env::var("DHIS2_TEST_LOG_DIR").ok()?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    Some((
        PathBuf::from(log_dir),
        format!("{}.{}.{}.log", environment, process::id(), timestamp),
    ))
}
