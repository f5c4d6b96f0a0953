// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::OutputFormat;

#[derive(Error, Debug)]
pub enum BuildError {
    /// An explicitly referenced config file is missing or unreadable.
    #[error("Config resolution error: {0}")]
    ConfigResolution(String),

    /// Conflicting or unsatisfiable option combination.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// The compilation engine rejected one (config, format) pass.
    #[error("Build failed for {config} ({format}): {message}")]
    Compile {
        config: String,
        format: OutputFormat,
        message: String,
    },

    /// Lint or copy failed after output was written.
    #[error("Post-build step failed: {0}")]
    PostStep(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildError {
    /// Errors raised before any compile starts; these always abort.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            BuildError::ConfigResolution(_)
                | BuildError::InvalidOption(_)
                | BuildError::Toml(_)
                | BuildError::Json(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
