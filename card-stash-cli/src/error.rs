use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be read or written
    #[error("Config error: {0}")]
    Config(String),

    /// Record documents could not be read or written
    #[error("Store error: {0}")]
    Store(String),

    /// The acquisition run could not start
    #[error("Run error: {0}")]
    Run(String),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl CliError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub(crate) fn run(msg: impl Into<String>) -> Self {
        Self::Run(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}

impl From<card_stash_lib::SettingsError> for CliError {
    fn from(e: card_stash_lib::SettingsError) -> Self {
        Self::config(e.to_string())
    }
}

impl From<card_stash_catalog::StoreError> for CliError {
    fn from(e: card_stash_catalog::StoreError) -> Self {
        Self::store(e.to_string())
    }
}

impl From<card_stash_lib::RunError> for CliError {
    fn from(e: card_stash_lib::RunError) -> Self {
        Self::run(e.to_string())
    }
}
