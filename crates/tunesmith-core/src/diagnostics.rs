use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::DiagnosticsConfig;

/// Keeps the JSON trace writer alive. Dropping it flushes and closes the session log.
pub struct TelemetryGuard {
    pub session_id: Uuid,
    pub log_file: PathBuf,
    _file_guard: WorkerGuard,
}

pub fn init_tracing(log_dir: impl AsRef<Path>) -> anyhow::Result<TelemetryGuard> {
    init_tracing_from_config(log_dir, &DiagnosticsConfig::default())
}

pub fn init_tracing_from_config(
    log_dir: impl AsRef<Path>,
    diagnostics: &DiagnosticsConfig,
) -> anyhow::Result<TelemetryGuard> {
    init_tracing_with_options(
        log_dir,
        &diagnostics.trace_file_prefix,
        &diagnostics.rust_log_filter,
    )
}

/// Installs a compact stdout layer and a JSON layer writing one log file per session.
/// `RUST_LOG` takes precedence over `default_filter`. A second call keeps the first
/// subscriber and still returns a guard for its own file.
pub fn init_tracing_with_options(
    log_dir: impl AsRef<Path>,
    file_prefix: &str,
    default_filter: &str,
) -> anyhow::Result<TelemetryGuard> {
    let log_dir = log_dir.as_ref();
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let session_id = Uuid::new_v4();
    let file_name = session_log_name(file_prefix, session_id);
    let log_file = log_dir.join(&file_name);
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, &file_name));

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_thread_ids(true)
        .with_target(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(file_writer);

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => info!(
            %session_id,
            version = env!("CARGO_PKG_VERSION"),
            log_file = %log_file.display(),
            "tunesmith tracing ready"
        ),
        Err(error) => warn!(
            ?error,
            %session_id,
            "tracing already installed; this session's log file stays empty"
        ),
    }

    Ok(TelemetryGuard {
        session_id,
        log_file,
        _file_guard: file_guard,
    })
}

fn session_log_name(prefix: &str, session_id: Uuid) -> String {
    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    let short_id = session_id.simple().to_string();
    format!("{prefix}-{timestamp}-{}.log", &short_id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_logs_land_in_the_requested_directory() {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let log_dir = temp.path().join("logs");
        let guard = init_tracing_with_options(&log_dir, "render-test", "warn")
            .expect("tracing init should not fail when already installed");

        assert!(log_dir.is_dir());
        assert_eq!(guard.log_file.parent(), Some(log_dir.as_path()));
        let name = guard
            .log_file
            .file_name()
            .and_then(|name| name.to_str())
            .expect("log file name should be utf-8");
        assert!(name.starts_with("render-test-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn session_log_names_differ_per_session() {
        let first = session_log_name("tunesmith", Uuid::new_v4());
        let second = session_log_name("tunesmith", Uuid::new_v4());
        assert_ne!(first, second);
    }
}
