use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Structured error types for the batch pipeline.
///
/// Two kinds end a run before any job is dispatched: an invalid input directory and
/// a failed engine initialization. Everything else is raised inside a single job and
/// is turned into a failed outcome at the job boundary.
#[derive(Error, Debug)]
pub enum SegBatchError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid input directory {path:?}: {reason}")]
    InvalidInputDirectory { path: PathBuf, reason: String },

    #[error("Engine initialization failed for model `{model}`")]
    EngineInitialization {
        model: String,
        #[source]
        source: BoxError,
    },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path:?})")]
    ImageProcessing {
        path: PathBuf,
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Engine error: {operation} failed")]
    Engine {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Output {output:?} is already claimed by {claimed_by:?}")]
    OutputCollision { output: PathBuf, claimed_by: PathBuf },

    #[error("Worker pool error: {operation} failed")]
    WorkerPool {
        operation: String,
        #[source]
        source: BoxError,
    },
}

pub type Result<T> = std::result::Result<T, SegBatchError>;

impl SegBatchError {
    pub(crate) fn engine<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Engine {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Callers that know the path and operation should build `FileSystem` directly; this
/// is the fallback for the few places without that context.
impl From<std::io::Error> for SegBatchError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<ort::Error> for SegBatchError {
    fn from(err: ort::Error) -> Self {
        Self::engine("ort operation", err)
    }
}

/// Render an error and its whole `source()` chain on one line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
