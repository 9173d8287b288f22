//! Lifecycle reconciliation.
//!
//! [`LifecycleOrchestrator`] combines the probes, the matcher and the launch
//! strategies into status reads and start/stop/restart operations, and owns
//! the [`StatusCache`]. [`StatusPoller`] drives periodic sweeps.
//!
//! Project state machine:
//!
//! ```text
//! Unknown ──► Stopped ◄──► Running
//!               │             │
//!               ▼             ▼
//!           Starting       Stopping
//!               │             │
//!               ▼             ▼
//!        Running / Error  Stopped / Error
//! ```
//!
//! `Error` is left by the next successful observation.

pub mod matcher;
mod monitor;
mod orchestrator;
mod status;

pub use matcher::{MatchReason, match_processes, match_reason};
pub use monitor::StatusPoller;
pub use orchestrator::{LifecycleOrchestrator, OperationResult, ProjectOverview};
pub use status::{PortInfo, ProjectState, ProjectStatus, StatusCache};
