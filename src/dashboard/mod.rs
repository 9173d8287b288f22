//! Dashboard transport: a REST API plus a Server-Sent Events stream.
//!
//! Clients read project and host state over HTTP, trigger lifecycle
//! operations with `POST`s, and receive pushed updates on `/events`:
//! `initial-data` on connect, then `project-status` after every operation,
//! `projects-status-update` after every sweep and `system-update` with
//! every telemetry sample.

pub mod actix_error;
pub mod events;
pub mod handlers;
pub mod server;
pub mod types;

pub use events::EventManager;
pub use server::{DashboardHandle, DashboardServer};
pub use types::{InitialData, LifecycleAction, ProjectStatusEvent, SSEMessage};

use crate::lifecycle::LifecycleOrchestrator;
use crate::logs::LogManager;
use crate::telemetry::SystemMonitor;
use std::sync::Arc;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct DashboardState {
    pub orchestrator: Arc<LifecycleOrchestrator>,
    pub logs: Arc<LogManager>,
    pub monitor: SystemMonitor,
    pub events: Arc<EventManager>,
}
