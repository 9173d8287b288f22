use crate::config::{ConfigStore, LifecycleSettings, ProjectDefinition};
use crate::error::{Error, Result};
use crate::launch::Launchers;
use crate::lifecycle::matcher::match_processes;
use crate::lifecycle::{ProjectState, ProjectStatus, StatusCache};
use crate::logs::{EventLog, LogLevel};
use crate::probe::{PortProbe, PortState, ProcessObserver, ProcessRecord};
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Host every project port is probed on.
const PROBE_HOST: &str = "localhost";

/// Outcome of a start, stop or restart request.
///
/// `success: false` with no error means the request was a no-op, e.g.
/// starting a project that is already running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A project definition together with its last known status.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectOverview {
    #[serde(flatten)]
    pub definition: ProjectDefinition,
    pub status: ProjectStatus,
}

/// Per-project operation token plus a flag readers can check without
/// contending on it.
#[derive(Default)]
struct ProjectSlot {
    token: Mutex<()>,
    in_flight: AtomicBool,
}

/// Held for the span of one lifecycle operation.
struct OperationGuard<'a> {
    _token: MutexGuard<'a, ()>,
    in_flight: &'a AtomicBool,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Reconciles configured projects with what is actually running.
///
/// Status reads probe the host and never fail for a configured project; a
/// probe failure turns into a degraded status instead. Lifecycle operations
/// hold a per-project token for their whole span, so a second operation on
/// the same project fails fast with [`Error::Busy`] while other projects are
/// unaffected.
pub struct LifecycleOrchestrator {
    store: ConfigStore,
    observer: Arc<dyn ProcessObserver>,
    probe: Arc<dyn PortProbe>,
    launchers: Launchers,
    cache: StatusCache,
    slots: HashMap<String, ProjectSlot>,
    log: Arc<dyn EventLog>,
    settle_delay: Duration,
    restart_delay: Duration,
}

impl LifecycleOrchestrator {
    pub fn new(
        store: ConfigStore,
        observer: Arc<dyn ProcessObserver>,
        probe: Arc<dyn PortProbe>,
        launchers: Launchers,
        log: Arc<dyn EventLog>,
    ) -> Self {
        let defaults = LifecycleSettings::default();
        let slots = store
            .ids()
            .map(|id| (id.to_string(), ProjectSlot::default()))
            .collect();

        Self {
            store,
            observer,
            probe,
            launchers,
            cache: StatusCache::new(),
            slots,
            log,
            settle_delay: defaults.settle_delay(),
            restart_delay: defaults.restart_delay(),
        }
    }

    /// Overrides the wait after a launch action and between restart halves.
    pub fn with_delays(mut self, settle_delay: Duration, restart_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self.restart_delay = restart_delay;
        self
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Number of configured projects.
    pub fn count(&self) -> usize {
        self.store.len()
    }

    /// Every definition with its cached status (or `Unknown`).
    pub fn list_projects(&self) -> Vec<ProjectOverview> {
        self.store
            .definitions()
            .map(|definition| ProjectOverview {
                status: self
                    .cache
                    .get(&definition.id)
                    .unwrap_or_else(|| ProjectStatus::unknown(definition.default_port)),
                definition: definition.clone(),
            })
            .collect()
    }

    /// Last cached status of a project, without probing.
    pub fn cached_status(&self, id: &str) -> Option<ProjectStatus> {
        self.cache.get(id)
    }

    /// All cached statuses.
    pub fn snapshot(&self) -> HashMap<String, ProjectStatus> {
        self.cache.snapshot()
    }

    /// Fresh status of one project. Does not touch the cache.
    #[tracing::instrument(skip(self))]
    pub async fn get_status(&self, id: &str) -> Result<ProjectStatus> {
        let definition = self.definition(id)?;
        Ok(self.observe(definition).await)
    }

    /// Reconciles every project concurrently and caches the results.
    ///
    /// The process table is read once per sweep. A project with an operation
    /// in flight is reported from the cache rather than waited for; if it
    /// has no cached entry yet it is probed, but the result is not cached.
    /// An entry written after the sweep began is never replaced by the
    /// sweep's older observation; the newer entry is returned instead.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_statuses(&self) -> BTreeMap<String, ProjectStatus> {
        let since = Utc::now();
        let listing = self.observer.processes().await;
        if let Err(e) = &listing {
            tracing::warn!(error = %e, "Process enumeration failed, sweep is degraded");
        }

        let sweeps = self.store.definitions().map(|definition| {
            let listing = listing.as_deref();
            async move {
                if self.is_busy(&definition.id) {
                    if let Some(cached) = self.cache.get(&definition.id) {
                        return (definition.id.clone(), cached);
                    }
                    let port_state = self.probe.check(PROBE_HOST, definition.default_port).await;
                    return (
                        definition.id.clone(),
                        reconcile(definition, port_state, listing),
                    );
                }

                let port_state = self.probe.check(PROBE_HOST, definition.default_port).await;
                let status = reconcile(definition, port_state, listing);
                let status = self.cache.insert_unless_newer(&definition.id, status, since);
                (definition.id.clone(), status)
            }
        });

        let statuses: BTreeMap<String, ProjectStatus> = join_all(sweeps).await.into_iter().collect();
        tracing::debug!(
            projects = statuses.len(),
            running = statuses.values().filter(|s| s.running).count(),
            "Status sweep complete"
        );
        statuses
    }

    /// Starts a project unless it is already running.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, id: &str) -> Result<OperationResult> {
        let definition = self.definition(id)?;
        let _token = self.acquire(id)?;
        self.start_locked(definition).await
    }

    /// Stops a project if it is running.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, id: &str) -> Result<OperationResult> {
        let definition = self.definition(id)?;
        let _token = self.acquire(id)?;
        self.stop_locked(definition).await
    }

    /// Stop, wait, start; all under one token. A failed stop aborts the
    /// restart.
    #[tracing::instrument(skip(self))]
    pub async fn restart(&self, id: &str) -> Result<OperationResult> {
        let definition = self.definition(id)?;
        let _token = self.acquire(id)?;

        let stopped = self.stop_locked(definition).await?;
        tracing::debug!(project = %id, stopped = stopped.success, "Restart: stop phase done");

        tokio::time::sleep(self.restart_delay).await;

        let result = self.start_locked(definition).await?;
        self.emit(
            if result.success { LogLevel::Info } else { LogLevel::Warn },
            format!("Project {} restarted: {}", id, result.message),
            id,
            Some(json!({ "success": result.success })),
        )
        .await;
        Ok(result)
    }

    async fn start_locked(&self, definition: &ProjectDefinition) -> Result<OperationResult> {
        let id = definition.id.as_str();
        let current = self.observe(definition).await;
        if current.running {
            let url = current.port.url.clone();
            self.cache.insert(id, current);
            return Ok(OperationResult {
                success: false,
                message: "Project is already running".to_string(),
                url,
            });
        }

        self.cache
            .insert(id, current.transitioning(ProjectState::Starting));
        self.emit(
            LogLevel::Info,
            format!("Starting project {}", id),
            id,
            Some(json!({ "mode": definition.launch_mode.label() })),
        )
        .await;

        let launched = match self.launchers.for_mode(&definition.launch_mode).start(definition).await {
            Ok(launched) => launched,
            Err(e) => return Err(self.fail(definition, "starting", e).await),
        };

        tokio::time::sleep(self.settle_delay).await;

        let status = self.observe(definition).await;
        let result = OperationResult {
            success: status.running,
            message: launched.message,
            url: status.port.url.clone(),
        };
        self.cache.insert(id, status);

        self.emit(
            if result.success { LogLevel::Info } else { LogLevel::Warn },
            format!("Project {} started: {}", id, result.message),
            id,
            Some(json!({ "success": result.success, "url": result.url })),
        )
        .await;
        Ok(result)
    }

    async fn stop_locked(&self, definition: &ProjectDefinition) -> Result<OperationResult> {
        let id = definition.id.as_str();
        let current = self.observe(definition).await;
        if !current.running {
            self.cache.insert(id, current);
            return Ok(OperationResult {
                success: false,
                message: "Project is not running".to_string(),
                url: None,
            });
        }

        self.cache
            .insert(id, current.transitioning(ProjectState::Stopping));
        let pids: Vec<u32> = current.processes.iter().map(|p| p.pid).collect();
        self.emit(
            LogLevel::Info,
            format!("Stopping project {}", id),
            id,
            Some(json!({ "mode": definition.launch_mode.label(), "pids": pids })),
        )
        .await;

        let launched = match self
            .launchers
            .for_mode(&definition.launch_mode)
            .stop(definition, &current)
            .await
        {
            Ok(launched) => launched,
            Err(e) => return Err(self.fail(definition, "stopping", e).await),
        };

        tokio::time::sleep(self.settle_delay).await;

        let status = self.observe(definition).await;
        let result = OperationResult {
            success: !status.running,
            message: launched.message,
            url: None,
        };
        self.cache.insert(id, status);

        self.emit(
            if result.success { LogLevel::Info } else { LogLevel::Warn },
            format!("Project {} stopped: {}", id, result.message),
            id,
            Some(json!({ "success": result.success })),
        )
        .await;
        Ok(result)
    }

    /// Records a failed launch action and hands the error back.
    async fn fail(&self, definition: &ProjectDefinition, action: &str, error: Error) -> Error {
        self.cache.insert(
            &definition.id,
            ProjectStatus::degraded(definition.default_port, error.to_string()),
        );
        self.emit(
            LogLevel::Error,
            format!("Error {} {}: {}", action, definition.id, error),
            &definition.id,
            None,
        )
        .await;
        error
    }

    async fn emit(&self, level: LogLevel, message: String, id: &str, metadata: Option<serde_json::Value>) {
        self.log.log(level, message, Some(id.to_string()), metadata).await;
    }

    async fn observe(&self, definition: &ProjectDefinition) -> ProjectStatus {
        let (port_state, listing) = tokio::join!(
            self.probe.check(PROBE_HOST, definition.default_port),
            self.observer.processes()
        );
        reconcile(definition, port_state, listing.as_deref())
    }

    fn definition(&self, id: &str) -> Result<&ProjectDefinition> {
        self.store
            .get(id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))
    }

    fn acquire(&self, id: &str) -> Result<OperationGuard<'_>> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;
        let token = slot.token.try_lock().map_err(|_| {
            tracing::debug!(project = %id, "Operation rejected, token held");
            Error::Busy(id.to_string())
        })?;
        slot.in_flight.store(true, Ordering::Release);
        Ok(OperationGuard {
            _token: token,
            in_flight: &slot.in_flight,
        })
    }

    /// Whether an operation holds the project's token. Never touches the
    /// token itself.
    fn is_busy(&self, id: &str) -> bool {
        self.slots
            .get(id)
            .is_some_and(|slot| slot.in_flight.load(Ordering::Acquire))
    }
}

/// Combines one port probe and one process listing into a status.
fn reconcile(
    definition: &ProjectDefinition,
    port_state: Result<PortState>,
    listing: std::result::Result<&[ProcessRecord], &Error>,
) -> ProjectStatus {
    let port = definition.default_port;
    match (port_state, listing) {
        (Ok(state), Ok(processes)) => {
            let matched = match_processes(definition, processes.iter().cloned(), state);
            ProjectStatus::observed(port, state, matched, definition.service_url(true))
        }
        (Err(e), _) => {
            tracing::warn!(project = %definition.id, error = %e, "Port probe failed");
            ProjectStatus::degraded(port, e.to_string())
        }
        (_, Err(e)) => {
            tracing::warn!(project = %definition.id, error = %e, "Process enumeration failed");
            ProjectStatus::degraded(port, e.to_string())
        }
    }
}
