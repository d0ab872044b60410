//! File logging for micwave.
//!
//! Everything goes to `micwave.log.YYYY-MM-DD` under the XDG state directory;
//! the terminal belongs to the recorder UI. Only the newest week of files is
//! kept.

use anyhow::Context;
use chrono::NaiveDate;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const LOG_PREFIX: &str = "micwave.log";
const RETAINED_DAYS: usize = 7;
const DEFAULT_FILTER: &str = "info";

/// Checked before `RUST_LOG`.
const FILTER_ENV: &str = "MICWAVE_LOG";

static APPENDER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Starts the daily rolling file logger.
///
/// # Errors
/// - If the log directory cannot be determined or created
/// - If logging was already initialized
pub fn init_logging() -> Result<(), anyhow::Error> {
    let log_dir = log_dir(std::env::var_os("XDG_STATE_HOME"), dirs::home_dir())?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let removed = prune_rotated_logs(&log_dir, RETAINED_DAYS).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to clean up old logs: {e}");
        Vec::new()
    });

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&log_dir, LOG_PREFIX));
    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging to {}", log_dir.display());
    for path in removed {
        tracing::debug!("Removed old log {}", path.display());
    }
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `$XDG_STATE_HOME/micwave`, else `~/.local/state/micwave`.
fn log_dir(xdg_state: Option<OsString>, home: Option<PathBuf>) -> Result<PathBuf, anyhow::Error> {
    match xdg_state.filter(|dir| !dir.is_empty()) {
        Some(state) => Ok(PathBuf::from(state).join("micwave")),
        None => {
            let home = home.context("Could not determine home directory")?;
            Ok(home.join(".local").join("state").join("micwave"))
        }
    }
}

/// Date of a rotated log file, `None` for anything else.
fn rotated_log_date(file_name: &str) -> Option<NaiveDate> {
    let date = file_name.strip_prefix(LOG_PREFIX)?.strip_prefix('.')?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Deletes rotated logs beyond the newest `keep` days and returns what was
/// removed.
fn prune_rotated_logs(log_dir: &Path, keep: usize) -> Result<Vec<PathBuf>, anyhow::Error> {
    let mut logs: Vec<(NaiveDate, PathBuf)> = fs::read_dir(log_dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let date = rotated_log_date(path.file_name()?.to_str()?)?;
            Some((date, path))
        })
        .collect();
    logs.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = Vec::new();
    for (_, path) in logs.into_iter().skip(keep) {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) => eprintln!("Warning: Failed to delete {}: {e}", path.display()),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotated_log_dates() {
        assert_eq!(
            rotated_log_date("micwave.log.2026-01-31"),
            NaiveDate::from_ymd_opt(2026, 1, 31)
        );
        assert_eq!(rotated_log_date("micwave.log"), None);
        assert_eq!(rotated_log_date("other.log.2026-01-31"), None);
        assert_eq!(rotated_log_date("micwave.log.backup"), None);
        assert_eq!(rotated_log_date("micwave.log.2026-13-01"), None);
    }

    #[test]
    fn test_log_dir_prefers_xdg_state() {
        let dir = log_dir(Some("/state".into()), Some("/home/me".into())).unwrap();
        assert_eq!(dir, PathBuf::from("/state/micwave"));

        let dir = log_dir(Some(OsString::new()), Some("/home/me".into())).unwrap();
        assert_eq!(dir, PathBuf::from("/home/me/.local/state/micwave"));

        assert!(log_dir(None, None).is_err());
    }

    #[test]
    fn test_prune_keeps_newest_days() {
        let dir = tempfile::tempdir().unwrap();
        // Written newest first so file times disagree with the dates.
        for day in (1..=9).rev() {
            fs::write(dir.path().join(format!("micwave.log.2026-01-{day:02}")), "entry").unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let removed = prune_rotated_logs(dir.path(), RETAINED_DAYS).unwrap();
        assert_eq!(removed.len(), 2);

        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        remaining.sort();
        assert_eq!(remaining.len(), 8);
        assert!(remaining.contains(&"notes.txt".to_string()));
        assert!(!remaining.contains(&"micwave.log.2026-01-01".to_string()));
        assert!(!remaining.contains(&"micwave.log.2026-01-02".to_string()));
        assert!(remaining.contains(&"micwave.log.2026-01-09".to_string()));
    }
}
