//! # Structured Logging Module
//!
//! Environment-aware structured logging for the dispatch engine. Output goes to
//! stderr, human-readable by default and JSON when `DISPATCH_LOG_FORMAT=json`.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::DispatchError;
use crate::worker::WorkerId;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// `RUST_LOG` takes precedence over the environment default level. Safe to
/// call more than once and safe to call when a global subscriber already exists.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let json = use_json_format();

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

        let layer = if json {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            level = %log_level,
            json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("DISPATCH_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn use_json_format() -> bool {
    std::env::var("DISPATCH_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log structured data for pool lifecycle operations
pub fn log_pool_operation(
    operation: &str,
    worker_id: Option<WorkerId>,
    total_workers: usize,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        worker_id = worker_id.map(|id| id.as_u64()),
        total_workers = total_workers,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🏊 POOL_OPERATION"
    );
}

/// Log structured data for batch boundaries
pub fn log_batch_operation(
    operation: &str,
    batch_index: usize,
    batch_size: usize,
    processed: usize,
    total: usize,
    failed: usize,
) {
    tracing::info!(
        operation = %operation,
        batch_index = batch_index,
        batch_size = batch_size,
        processed = processed,
        total = total,
        failed = failed,
        timestamp = %Utc::now().to_rfc3339(),
        "📦 BATCH_OPERATION"
    );
}

/// Log a pool-level failure with the worker it concerns.
///
/// Used for spawn failures and worker faults; per-chunk failures that the
/// merge absorbs are logged at warn level by the processor instead.
pub fn log_error(operation: &str, error: &DispatchError, worker_id: Option<WorkerId>) {
    tracing::error!(
        operation = %operation,
        error_kind = error_kind(error),
        error = %error,
        worker_id = worker_id.map(|id| id.as_u64()),
        timestamp = %Utc::now().to_rfc3339(),
        "❌ POOL_ERROR"
    );
}

fn error_kind(error: &DispatchError) -> &'static str {
    match error {
        DispatchError::WorkerSpawn { .. } => "worker_spawn",
        DispatchError::WorkerFault { .. } => "worker_fault",
        DispatchError::TaskTimeout { .. } => "task_timeout",
        DispatchError::Analysis { .. } => "analysis",
        DispatchError::InvalidChunk { .. } => "invalid_chunk",
        DispatchError::Configuration(_) => "configuration",
        DispatchError::InvalidState(_) => "invalid_state",
        DispatchError::PoolShutdown => "pool_shutdown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection() {
        std::env::set_var("DISPATCH_ENV", "test_override");
        let env = get_environment();
        assert_eq!(env, "test_override");
        std::env::remove_var("DISPATCH_ENV");
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_pool_operation("pool.test", Some(WorkerId::new(1)), 1, "ok", None);
    }

    #[test]
    fn test_error_kind_names_variant() {
        let fault = DispatchError::WorkerFault {
            worker_id: WorkerId::new(2),
            reason: "hung".to_string(),
        };
        assert_eq!(error_kind(&fault), "worker_fault");
        assert_eq!(error_kind(&DispatchError::PoolShutdown), "pool_shutdown");
        log_error("worker.failure", &fault, Some(WorkerId::new(2)));
    }
}
