use std::path::PathBuf;

use card_stash_core::DocumentError;
use thiserror::Error;

/// Errors reading or writing record documents.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Data directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("No record documents to publish in {0}")]
    NothingToPublish(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid record document {path}: {source}")]
    Document {
        path: PathBuf,
        source: DocumentError,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn document(path: impl Into<PathBuf>, source: DocumentError) -> Self {
        Self::Document {
            path: path.into(),
            source,
        }
    }
}
