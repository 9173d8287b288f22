use crate::lifecycle::{LifecycleOrchestrator, ProjectStatus};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Periodically reconciles every project and hands the result to a callback.
///
/// The first sweep runs one interval after [`start`](Self::start). A sweep
/// that overruns delays the next tick instead of bunching them up.
pub struct StatusPoller {
    orchestrator: Arc<LifecycleOrchestrator>,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn new(orchestrator: Arc<LifecycleOrchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
            task: None,
        }
    }

    /// Spawns the polling task. Calling it again while running is a no-op.
    pub fn start<F>(&mut self, on_sweep: F)
    where
        F: Fn(BTreeMap<String, ProjectStatus>) + Send + 'static,
    {
        if self.is_running() {
            return;
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let period = self.interval;
        tracing::info!(interval = ?period, projects = orchestrator.count(), "Starting status poller");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let statuses = orchestrator.get_all_statuses().await;
                on_sweep(statuses);
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("Status poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
