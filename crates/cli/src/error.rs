//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration lacks the section a command needs
    #[error("Configuration has no [{section}] section")]
    StageNotConfigured { section: &'static str },

    /// Notification input could not be read
    #[error("Failed to read event input '{path}': {source}")]
    EventInput {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// `check-file` found validation errors
    #[error("File rejected with {errors} validation error(s)")]
    Rejected { errors: usize },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn event_input(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::EventInput {
            path: path.into(),
            source,
        }
    }
}
