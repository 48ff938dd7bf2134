//! Errors raised by asset tasks.

use std::path::PathBuf;

use sitepipe_graph::TaskError;

/// Errors that can occur while running an asset task.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("{path}: {message}")]
    Transform { path: PathBuf, message: String },

    #[error("Failed to run {program}: {message}")]
    Tool { program: String, message: String },

    #[error("Font manifest not found: {0}")]
    ManifestMissing(PathBuf),

    #[error("Background job failed: {0}")]
    Join(String),
}

impl AssetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transform(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Transform {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl From<AssetError> for TaskError {
    fn from(err: AssetError) -> Self {
        TaskError::failed(err)
    }
}
