use crate::config::ProjectDefinition;
use crate::error::{Error, Result};
use crate::launch::{LaunchResult, LaunchStrategy};
use crate::lifecycle::ProjectStatus;
use async_trait::async_trait;
use std::sync::Arc;

/// Sends a termination request to one process.
pub trait ProcessTerminator: Send + Sync {
    fn terminate(&self, pid: u32) -> Result<()>;
}

/// Sends `SIGTERM` to the pid.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalTerminator;

impl ProcessTerminator for SignalTerminator {
    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> Result<()> {
        let pid = libc::pid_t::try_from(pid)
            .map_err(|_| Error::Other(format!("pid {} out of range", pid)))?;

        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error().into())
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self, pid: u32) -> Result<()> {
        Err(Error::Other(format!(
            "Cannot signal pid {} on this platform",
            pid
        )))
    }
}

/// Strategy for projects with no automated launcher.
///
/// `start` only explains that the project has to be started by hand. `stop`
/// signals every process matched by the last reconciliation; individual
/// failures are logged and the call still succeeds.
#[derive(Clone)]
pub struct ManualStrategy {
    terminator: Arc<dyn ProcessTerminator>,
}

impl ManualStrategy {
    pub fn new(terminator: Arc<dyn ProcessTerminator>) -> Self {
        Self { terminator }
    }
}

impl Default for ManualStrategy {
    fn default() -> Self {
        Self::new(Arc::new(SignalTerminator))
    }
}

#[async_trait]
impl LaunchStrategy for ManualStrategy {
    async fn start(&self, definition: &ProjectDefinition) -> Result<LaunchResult> {
        tracing::info!(project = %definition.id, "Manual project, nothing to launch");
        Ok(LaunchResult::new(
            "Project requires manual start; see its documentation",
        ))
    }

    #[tracing::instrument(skip(self, definition, current), fields(project = %definition.id))]
    async fn stop(
        &self,
        definition: &ProjectDefinition,
        current: &ProjectStatus,
    ) -> Result<LaunchResult> {
        let own_pid = std::process::id();

        for process in &current.processes {
            if process.pid == own_pid {
                tracing::warn!(pid = process.pid, "Refusing to signal the manager itself");
                continue;
            }

            match self.terminator.terminate(process.pid) {
                Ok(()) => tracing::info!(pid = process.pid, name = %process.name, "Sent termination signal"),
                Err(e) => tracing::warn!(pid = process.pid, error = %e, "Failed to stop process"),
            }
        }

        Ok(LaunchResult::new("Processes stopped manually"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LaunchMode;
    use crate::probe::ProcessRecord;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        pids: Mutex<Vec<u32>>,
        fail_on: Option<u32>,
    }

    impl ProcessTerminator for Recording {
        fn terminate(&self, pid: u32) -> Result<()> {
            self.pids.lock().unwrap().push(pid);
            if self.fail_on == Some(pid) {
                return Err(Error::Other("no such process".to_string()));
            }
            Ok(())
        }
    }

    fn record(pid: u32) -> ProcessRecord {
        ProcessRecord {
            pid,
            name: "node".to_string(),
            cmd: "node server.js".to_string(),
            cpu: 0.0,
            memory: 0.0,
            mem_rss: 0,
        }
    }

    fn definition() -> ProjectDefinition {
        ProjectDefinition {
            id: "legacy".to_string(),
            name: "Legacy".to_string(),
            path: PathBuf::from("/srv/legacy"),
            default_port: 5000,
            launch_mode: LaunchMode::Manual,
            health_check: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_stop_signals_every_pid_despite_failures() {
        let terminator = Arc::new(Recording {
            pids: Mutex::new(Vec::new()),
            fail_on: Some(101),
        });
        let strategy = ManualStrategy::new(terminator.clone());

        let mut status = ProjectStatus::unknown(5000);
        status.processes = vec![record(101), record(202)];

        let result = strategy.stop(&definition(), &status).await.unwrap();
        assert_eq!(result.message, "Processes stopped manually");
        assert_eq!(*terminator.pids.lock().unwrap(), vec![101, 202]);
    }

    #[tokio::test]
    async fn test_stop_skips_own_pid() {
        let terminator = Arc::new(Recording::default());
        let strategy = ManualStrategy::new(terminator.clone());

        let mut status = ProjectStatus::unknown(5000);
        status.processes = vec![record(std::process::id())];

        strategy.stop(&definition(), &status).await.unwrap();
        assert!(terminator.pids.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_launches_nothing() {
        let terminator = Arc::new(Recording::default());
        let strategy = ManualStrategy::new(terminator.clone());

        let result = strategy.start(&definition()).await.unwrap();
        assert!(result.message.contains("manual start"));
        assert!(terminator.pids.lock().unwrap().is_empty());
    }
}
