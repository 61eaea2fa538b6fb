use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to read launcher config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid launcher config {path}: {source}")]
    ConfigJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("output directory {0} already exists, refusing to overwrite a previous session")]
    OutputExists(PathBuf),

    #[error("invalid device plan: {0}")]
    InvalidPlan(String),

    #[error("cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("preprocessing `{program}` exited with {status}")]
    Preprocessing { program: String, status: String },
}
