//! Operational event log.
//!
//! [`EventLog`] is the seam the lifecycle engine reports through. The
//! production implementation is [`LogManager`], which persists entries as
//! JSON lines and keeps a bounded in-memory history per project.

mod manager;

pub use manager::{LogManager, MAIN_LOG_FILE, PROJECT_LOG_DIR};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// One persisted log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        project_id: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            project_id,
            metadata,
        }
    }
}

/// Sink for lifecycle events.
///
/// Implementations must not fail the caller; write errors are their own
/// concern.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn log(
        &self,
        level: LogLevel,
        message: String,
        project_id: Option<String>,
        metadata: Option<serde_json::Value>,
    );
}
