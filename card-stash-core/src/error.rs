use thiserror::Error;

/// Errors raised while parsing or serializing a record document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document is not valid JSON or a card has the wrong field types
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but is neither `{"data": ...}` nor a card array
    #[error("Unexpected document shape: {0}")]
    Shape(String),
}

impl DocumentError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}

/// Rejected run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    /// A `[min, max]` window has `min > max`, a negative bound or an infinite one
    #[error("invalid {name} window: {min}..{max}")]
    InvalidWindow { name: &'static str, min: f64, max: f64 },

    #[error("backoff_multiplier must be >= 1.0 (got {0})")]
    InvalidMultiplier(f64),
}
