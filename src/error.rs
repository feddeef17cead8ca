// src/error.rs

use thiserror::Error;

/// Error taxonomy for the detection pipeline.
///
/// Construction-time failures (`ModelLoad`, `SourceOpen`) abort before any
/// frame is processed. `Encoding` aborts a running session through the
/// teardown path. A user quit or end-of-stream is not an error and never
/// appears here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("classifier model could not be loaded: {path}")]
    ModelLoad { path: String },

    #[error("video source could not be opened: {source_id}")]
    SourceOpen { source_id: String },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
