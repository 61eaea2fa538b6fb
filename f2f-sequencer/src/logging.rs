//! Per-run logging: console plus one append-only file per session.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("logging already initialised: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// `{dir}/exp2_f2f_log_{experiment_id}_{%Y-%m-%dT%H-%M-%S}.log`
pub fn session_log_path(dir: &Path, experiment_id: &str, started: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "exp2_f2f_log_{}_{}.log",
        experiment_id,
        started.format("%Y-%m-%dT%H-%M-%S")
    ))
}

/// Unknown names fall back to `info`.
pub fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Installs the global subscriber. The file, when given, always records at
/// debug level regardless of the console level.
pub fn init(console_level: Level, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let console = fmt::layer()
        .with_target(true)
        .with_filter(LevelFilter::from_level(console_level));

    let file_layer = match log_file {
        Some(path) => {
            let io_err = |source| LoggingError::Io {
                path: path.to_path_buf(),
                source,
            };
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(io_err)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_path_encodes_experiment_and_start_time() {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            session_log_path(Path::new("logs"), "02-01", started),
            PathBuf::from("logs/exp2_f2f_log_02-01_2024-03-09T14-05-07.log")
        );
    }

    #[test]
    fn level_names() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("nonsense"), Level::INFO);
    }
}
