use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "plexus.log";
const LOG_RETENTION_DAYS: u64 = 7;

/// Output options for [`init`].
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Filter used when neither `PLEXUS_LOG` nor `RUST_LOG` is set.
    pub filter: String,
    /// Emit JSON lines on stderr instead of human-readable text.
    pub json: bool,
    /// Also write a daily-rotated file under [`log_dir`].
    pub file: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
            file: false,
        }
    }
}

/// Return the log directory path.
///
/// Precedence: `PLEXUS_LOG_DIR` env var > platform data dir > `./logs`.
pub fn log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PLEXUS_LOG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::data_dir() {
        Some(data) => data.join("plexus").join("logs"),
        None => PathBuf::from("logs"),
    }
}

/// Delete rotated plexus log files older than `max_age_days`. Other files in
/// the directory are left alone.
fn cleanup_old_logs(log_path: &Path, max_age_days: u64) {
    let cutoff = SystemTime::now() - Duration::from_secs(max_age_days * 86400);
    let Ok(entries) = std::fs::read_dir(log_path) else {
        return;
    };
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            continue;
        }
        let stale = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .is_ok_and(|modified| modified <= cutoff);
        if stale {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_env("PLEXUS_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber.
///
/// Returns the file writer guard when file output is enabled; keep it alive
/// for the life of the process so buffered lines are flushed on exit.
pub fn init(settings: &LogSettings) -> Option<WorkerGuard> {
    let stderr_layer = if settings.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if settings.file {
        let log_path = log_dir();
        if let Err(e) = std::fs::create_dir_all(&log_path) {
            eprintln!("warning: failed to create log directory {:?}: {}", log_path, e);
        }
        cleanup_old_logs(&log_path, LOG_RETENTION_DAYS);

        let (writer, guard) =
            tracing_appender::non_blocking(rolling::daily(&log_path, LOG_FILE_PREFIX));
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter(&settings.filter))
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    if let Err(e) = installed {
        eprintln!("warning: tracing subscriber already installed: {}", e);
    }

    guard
}
