use crate::config::{LaunchMode, ProjectDefinition};
use crate::error::{Error, Result};
use crate::launch::{LaunchResult, LaunchStrategy, run_command};
use crate::lifecycle::ProjectStatus;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

const LABEL: &str = "Script";

/// Runs `<path>/<script> start|stop` with the project path as working dir.
#[derive(Debug, Clone)]
pub struct ScriptStrategy {
    timeout: Duration,
}

impl ScriptStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn invoke(&self, definition: &ProjectDefinition, action: &str) -> Result<()> {
        let LaunchMode::Script { script } = &definition.launch_mode else {
            return Err(Error::Launch(format!(
                "Project '{}' has no service script",
                definition.id
            )));
        };

        let script_path = definition.path.join(script);
        if !tokio::fs::try_exists(&script_path).await.unwrap_or(false) {
            return Err(Error::Launch(format!(
                "Script not found: {}",
                script_path.display()
            )));
        }

        make_executable(&script_path).await?;

        let output = run_command(
            LABEL,
            &script_path,
            &[action],
            &definition.path,
            self.timeout,
        )
        .await?;
        tracing::debug!(project = %definition.id, action, stdout = %output.stdout, "Script finished");
        Ok(())
    }
}

impl Default for ScriptStrategy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let meta = tokio::fs::metadata(path).await?;
    let mut perms = meta.permissions();
    let mode = perms.mode();
    if mode & 0o111 != 0o111 {
        perms.set_mode(mode | 0o111);
        tokio::fs::set_permissions(path, perms).await.map_err(|e| {
            Error::Launch(format!(
                "Failed to make {} executable: {}",
                path.display(),
                e
            ))
        })?;
    }
    Ok(())
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[async_trait]
impl LaunchStrategy for ScriptStrategy {
    #[tracing::instrument(skip(self, definition), fields(project = %definition.id))]
    async fn start(&self, definition: &ProjectDefinition) -> Result<LaunchResult> {
        self.invoke(definition, "start").await?;
        Ok(LaunchResult::new("Service script started"))
    }

    #[tracing::instrument(skip(self, definition, _current), fields(project = %definition.id))]
    async fn stop(
        &self,
        definition: &ProjectDefinition,
        _current: &ProjectStatus,
    ) -> Result<LaunchResult> {
        self.invoke(definition, "stop").await?;
        Ok(LaunchResult::new("Service script stopped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn definition(path: PathBuf, script: &str) -> ProjectDefinition {
        ProjectDefinition {
            id: "tool".to_string(),
            name: "Tool".to_string(),
            path,
            default_port: 9000,
            launch_mode: LaunchMode::Script {
                script: script.to_string(),
            },
            health_check: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let def = definition(dir.path().to_path_buf(), "service.sh");

        match ScriptStrategy::default().start(&def).await.unwrap_err() {
            Error::Launch(msg) => {
                assert!(msg.starts_with("Script not found: "));
                assert!(msg.ends_with("service.sh"));
            }
            other => panic!("expected launch error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_receives_action_and_becomes_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("service.sh");
        std::fs::write(&script, "#!/bin/sh\necho \"$1\" > last-action\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        let def = definition(dir.path().to_path_buf(), "service.sh");
        let strategy = ScriptStrategy::new(Duration::from_secs(5));

        strategy.start(&def).await.unwrap();
        let mode = std::fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("last-action")).unwrap().trim(),
            "start"
        );

        strategy.stop(&def, &ProjectStatus::unknown(9000)).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("last-action")).unwrap().trim(),
            "stop"
        );
    }
}
