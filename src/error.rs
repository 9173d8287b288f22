/// Error handling module for the deploy manager.
///
/// This module defines the error types used throughout the crate. Every
/// failure the lifecycle engine can hit maps onto one variant here, and none
/// of them is allowed to terminate the hosting process.
///
/// # Example
///
/// ```
/// use deploy_manager::error::{Error, Result};
///
/// fn describe(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::ProjectNotFound(id)) => println!("Project '{}' is not configured", id),
///         Err(Error::Busy(id)) => println!("Project '{}' is busy, try again later", id),
///         Err(Error::Launch(msg)) => println!("Launch failed: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur in the deploy manager.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or parse a configuration source.
    ///
    /// This error occurs when:
    /// - The configuration file is missing or unreadable
    /// - The file is not valid JSON / YAML
    /// - The top-level shape is wrong
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains invalid values.
    ///
    /// This error occurs when:
    /// - A project has an empty name or path
    /// - A project declares port 0
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Requested project id is not part of the loaded configuration.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// Process enumeration or port probing failed.
    ///
    /// Absorbed into a degraded status by the orchestrator, never raised out
    /// of a status read.
    #[error("Probe error: {0}")]
    Probe(String),

    /// A launch strategy failed or timed out.
    ///
    /// This error occurs when:
    /// - The working directory or script does not exist
    /// - The compose tool or script exits with a non-zero status
    /// - The invocation exceeds its timeout
    #[error("Launch error: {0}")]
    Launch(String),

    /// A lifecycle operation is already in flight for the project.
    #[error("Project '{0}' already has an operation in progress")]
    Busy(String),

    /// Filesystem or socket error outside of probing and launching.
    #[error("I/O error: {0}")]
    Io(String),

    /// Error in serializing or deserializing data.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Any other error not covered by the above categories.
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Returns true when the error belongs to the configuration family.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::ConfigParse(_) | Error::ConfigInvalid(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type for deploy manager operations.
pub type Result<T> = std::result::Result<T, Error>;
