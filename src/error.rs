use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum StageError {
    #[error("unknown dataset key: {0}")]
    UnknownDatasetKey(String),

    #[error("invalid dataset source id: {0}")]
    InvalidSourceId(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("dataset download failed: {0}")]
    DownloadFailed(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
