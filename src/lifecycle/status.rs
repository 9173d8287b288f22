use crate::probe::{PortState, ProcessRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Logical lifecycle state of a project.
///
/// `Unknown` until first observed; `Starting` and `Stopping` only exist while
/// an operation holds the project's token. `Error` is not terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectState {
    Unknown,
    Stopped,
    Running,
    Starting,
    Stopping,
    Error,
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectState::Unknown => "unknown",
            ProjectState::Stopped => "stopped",
            ProjectState::Running => "running",
            ProjectState::Starting => "starting",
            ProjectState::Stopping => "stopping",
            ProjectState::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Port half of a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub number: u16,
    pub status: PortState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Observed status of one project.
///
/// `running` holds iff at least one process matched and the port is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    pub running: bool,
    /// Pid of the first matched process.
    pub pid: Option<u32>,
    pub processes: Vec<ProcessRecord>,
    pub port: PortInfo,
    pub last_check: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub state: ProjectState,
}

impl ProjectStatus {
    /// Builds a status from a reconciliation; derives `running`, `pid` and
    /// the state from the inputs.
    pub fn observed(port: u16, port_state: PortState, processes: Vec<ProcessRecord>, url: Option<String>) -> Self {
        let running = !processes.is_empty() && port_state.is_open();
        Self {
            running,
            pid: processes.first().map(|p| p.pid),
            processes,
            port: PortInfo {
                number: port,
                status: port_state,
                url: if running { url } else { None },
            },
            last_check: Utc::now(),
            error: None,
            state: if running {
                ProjectState::Running
            } else {
                ProjectState::Stopped
            },
        }
    }

    /// Placeholder for a project that has never been observed.
    pub fn unknown(port: u16) -> Self {
        Self {
            running: false,
            pid: None,
            processes: Vec::new(),
            port: PortInfo {
                number: port,
                status: PortState::Closed,
                url: None,
            },
            last_check: Utc::now(),
            error: None,
            state: ProjectState::Unknown,
        }
    }

    /// Status recorded when observation or an operation failed.
    pub fn degraded(port: u16, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            state: ProjectState::Error,
            ..Self::unknown(port)
        }
    }

    /// Copy of `self` in a transitional state, stamped now.
    pub fn transitioning(&self, state: ProjectState) -> Self {
        Self {
            state,
            last_check: Utc::now(),
            error: None,
            ..self.clone()
        }
    }
}

/// Last computed status per project.
///
/// Entries are created lazily, replaced whole and never removed. Reads hand
/// out clones so callers never hold the lock.
#[derive(Debug, Default)]
pub struct StatusCache {
    entries: RwLock<HashMap<String, ProjectStatus>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<ProjectStatus> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn insert(&self, id: &str, status: ProjectStatus) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), status);
    }

    /// Stores `status` unless the cached entry was computed after
    /// `observed_since`, and returns whichever entry is cached afterwards.
    ///
    /// Used by observations that may overlap a lifecycle operation.
    pub fn insert_unless_newer(
        &self,
        id: &str,
        status: ProjectStatus,
        observed_since: DateTime<Utc>,
    ) -> ProjectStatus {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(id) {
            Some(current) if current.last_check > observed_since => current.clone(),
            _ => {
                entries.insert(id.to_string(), status.clone());
                status
            }
        }
    }

    /// Clone of every cached entry.
    pub fn snapshot(&self) -> HashMap<String, ProjectStatus> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
