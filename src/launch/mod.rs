//! Launch strategies: how a project is actually started and stopped.
//!
//! Each [`LaunchMode`] has one [`LaunchStrategy`]:
//!
//! * [`ContainerStrategy`] drives the compose tool (`up -d` / `down`).
//! * [`ScriptStrategy`] runs the project's service script with `start` / `stop`.
//! * [`ManualStrategy`] cannot start anything and stops by signalling the
//!   processes the last reconciliation matched.
//!
//! [`Launchers`] bundles one of each and hands out the right one for a
//! definition.

mod command;
mod container;
mod manual;
mod script;

pub use command::{CommandOutput, run_command};
pub use container::ContainerStrategy;
pub use manual::{ManualStrategy, ProcessTerminator, SignalTerminator};
pub use script::ScriptStrategy;

use crate::config::{LaunchMode, LifecycleSettings, ProjectDefinition};
use crate::error::Result;
use crate::lifecycle::ProjectStatus;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a successful strategy invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchResult {
    /// Human readable outcome.
    pub message: String,
}

impl LaunchResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Starts and stops one kind of project.
///
/// Failures are reported as [`Error::Launch`](crate::error::Error::Launch).
#[async_trait]
pub trait LaunchStrategy: Send + Sync {
    /// Starts the project.
    async fn start(&self, definition: &ProjectDefinition) -> Result<LaunchResult>;

    /// Stops the project. `current` is the status observed right before the
    /// call; strategies that act on matched processes read it.
    async fn stop(
        &self,
        definition: &ProjectDefinition,
        current: &ProjectStatus,
    ) -> Result<LaunchResult>;
}

/// One strategy per launch mode.
#[derive(Clone)]
pub struct Launchers {
    container: Arc<dyn LaunchStrategy>,
    script: Arc<dyn LaunchStrategy>,
    manual: Arc<dyn LaunchStrategy>,
}

impl Launchers {
    pub fn new(
        container: Arc<dyn LaunchStrategy>,
        script: Arc<dyn LaunchStrategy>,
        manual: Arc<dyn LaunchStrategy>,
    ) -> Self {
        Self {
            container,
            script,
            manual,
        }
    }

    /// Builds the default strategies from lifecycle settings.
    pub fn from_settings(settings: &LifecycleSettings) -> Self {
        Self::new(
            Arc::new(ContainerStrategy::from_settings(settings)),
            Arc::new(ScriptStrategy::new(settings.script_timeout())),
            Arc::new(ManualStrategy::default()),
        )
    }

    /// Strategy matching the definition's launch mode.
    pub fn for_mode(&self, mode: &LaunchMode) -> &Arc<dyn LaunchStrategy> {
        match mode {
            LaunchMode::Container { .. } => &self.container,
            LaunchMode::Script { .. } => &self.script,
            LaunchMode::Manual => &self.manual,
        }
    }
}

impl Default for Launchers {
    fn default() -> Self {
        Self::from_settings(&LifecycleSettings::default())
    }
}
