//! Payloads exchanged with dashboard clients.

use crate::lifecycle::{OperationResult, ProjectOverview, ProjectStatus};
use crate::logs::LogEntry;
use crate::telemetry::SystemInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SSE event names.
pub mod event_names {
    pub const INITIAL_DATA: &str = "initial-data";
    pub const PROJECT_STATUS: &str = "project-status";
    pub const PROJECTS_STATUS_UPDATE: &str = "projects-status-update";
    pub const SYSTEM_UPDATE: &str = "system-update";
}

/// Lifecycle operation requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Restart => "restart",
        };
        write!(f, "{}", s)
    }
}

/// Broadcast after every lifecycle operation, successful or not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatusEvent {
    pub project_id: String,
    pub action: LifecycleAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Cached status right after the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

/// First event on every new SSE connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    pub projects: Vec<ProjectOverview>,
    pub system_info: Option<SystemInfo>,
    pub logs: Vec<LogEntry>,
}

/// Server-Sent Event message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SSEMessage {
    /// Event type
    pub event: String,
    /// Event data as JSON string
    pub data: String,
    /// Optional event ID
    pub id: Option<String>,
}

impl SSEMessage {
    pub fn new(event: &str, data: &str, id: Option<&str>) -> Self {
        Self {
            event: event.to_string(),
            data: data.to_string(),
            id: id.map(String::from),
        }
    }
}
