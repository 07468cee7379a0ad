// src/error.rs

use thiserror::Error;

/// Core error types for HAPM
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O errors with path context
    #[error("I/O error: {0}")]
    IoError(String),

    /// Lock record or API payload could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Manifest could not be (de)serialized
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Unknown kind, duplicate identity, malformed manifest or location
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// No eligible version, missing payload, missing remote file
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// A package lifecycle call failed
    #[error("Failed to {operation} {package}: {source}")]
    HandlerFailure {
        package: String,
        operation: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// The lock record could not be written after a successful apply
    #[error("Failed to persist lock record: {0}")]
    PersistenceFailure(String),

    /// Version identifier does not follow the version grammar
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Remote request failed
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Archive or payload could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl Error {
    /// Wrap an error raised by a package handler
    pub fn handler(package: &str, operation: &'static str, source: Error) -> Self {
        Error::HandlerFailure {
            package: package.to_string(),
            operation,
            source: Box::new(source),
        }
    }

    /// Whether this error means "nothing eligible was found"
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFoundError(_) => true,
            Error::HandlerFailure { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Result type alias using HAPM's Error type
pub type Result<T> = std::result::Result<T, Error>;
