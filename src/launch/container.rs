use crate::config::{LaunchMode, LifecycleSettings, ProjectDefinition};
use crate::error::{Error, Result};
use crate::launch::{LaunchResult, LaunchStrategy, run_command};
use crate::lifecycle::ProjectStatus;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

const LABEL: &str = "Docker Compose";

/// Drives container projects through a compose tool.
///
/// The tool is an argument vector so `docker compose` (two words) and
/// `docker-compose` both work.
#[derive(Debug, Clone)]
pub struct ContainerStrategy {
    compose_command: Vec<String>,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl ContainerStrategy {
    pub fn new(compose_command: Vec<String>, start_timeout: Duration, stop_timeout: Duration) -> Self {
        Self {
            compose_command,
            start_timeout,
            stop_timeout,
        }
    }

    pub fn from_settings(settings: &LifecycleSettings) -> Self {
        Self::new(
            settings.compose_command.clone(),
            settings.compose_start_timeout(),
            settings.compose_stop_timeout(),
        )
    }

    /// Full argument vector for one compose action, program first.
    fn command_line(&self, compose_file: Option<&str>, action: &[&str]) -> Result<Vec<String>> {
        if self.compose_command.is_empty() {
            return Err(Error::Launch("No compose command configured".to_string()));
        }

        let mut argv = self.compose_command.clone();
        if let Some(file) = compose_file {
            argv.push("-f".to_string());
            argv.push(file.to_string());
        }
        argv.extend(action.iter().map(|a| a.to_string()));
        Ok(argv)
    }

    async fn compose(
        &self,
        definition: &ProjectDefinition,
        action: &[&str],
        timeout: Duration,
    ) -> Result<()> {
        let LaunchMode::Container {
            working_dir,
            compose_file,
        } = &definition.launch_mode
        else {
            return Err(Error::Launch(format!(
                "Project '{}' is not a container project",
                definition.id
            )));
        };

        ensure_dir(working_dir).await?;

        let argv = self.command_line(compose_file.as_deref(), action)?;
        let output = run_command(LABEL, &argv[0], &argv[1..], working_dir, timeout).await?;
        if !output.stderr.is_empty() {
            // compose reports progress on stderr even on success
            tracing::debug!(project = %definition.id, output = %output.stderr, "Compose output");
        }
        Ok(())
    }
}

impl Default for ContainerStrategy {
    fn default() -> Self {
        Self::from_settings(&LifecycleSettings::default())
    }
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(Error::Launch(format!("Directory not found: {}", dir.display()))),
    }
}

#[async_trait]
impl LaunchStrategy for ContainerStrategy {
    #[tracing::instrument(skip(self, definition), fields(project = %definition.id))]
    async fn start(&self, definition: &ProjectDefinition) -> Result<LaunchResult> {
        self.compose(definition, &["up", "-d"], self.start_timeout).await?;
        Ok(LaunchResult::new("Docker containers started"))
    }

    #[tracing::instrument(skip(self, definition, _current), fields(project = %definition.id))]
    async fn stop(
        &self,
        definition: &ProjectDefinition,
        _current: &ProjectStatus,
    ) -> Result<LaunchResult> {
        self.compose(definition, &["down"], self.stop_timeout).await?;
        Ok(LaunchResult::new("Docker containers stopped"))
    }
}
