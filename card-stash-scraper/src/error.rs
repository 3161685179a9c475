use std::path::PathBuf;

/// Errors that can occur while setting up or running acquisition.
///
/// Per-attempt failures are not errors; they are classified into
/// [`AttemptOutcome`](crate::classify::AttemptOutcome) and retried.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Problem-source registry {path}: {source}")]
    Registry {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Renderer error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
