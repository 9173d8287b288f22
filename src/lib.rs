/*!
 # Deploy Manager

 A local dashboard that starts, stops and monitors a fixed set of services
 and reports host telemetry.

 ## Overview

 Deploy Manager provides functionality to:
 - Load a catalogue of projects (JSON or YAML), each with a port and a launch mode
 - Reconcile the catalogue with the host by enumerating processes and probing ports
 - Start, stop and restart projects through docker compose, a service script,
   or by signalling matched processes
 - Keep an operational log per project
 - Serve all of it over HTTP with a Server-Sent Events stream for live updates

 ## Basic Usage

 ```no_run
 use deploy_manager::{DeployManager, Result};
 use deploy_manager::config::{ConfigStore, Settings};

 #[tokio::main]
 async fn main() -> Result<()> {
     let settings = Settings::load_or_default("config/config.json");
     let store = ConfigStore::load_or_empty("config/projects.json");

     let mut manager = DeployManager::new(settings, store).await;

     // Status of every project
     let statuses = manager.orchestrator().get_all_statuses().await;
     println!("{} projects, {} running", statuses.len(), statuses.values().filter(|s| s.running).count());

     // Start one
     let result = manager.orchestrator().start("api").await?;
     println!("{}", result.message);

     // Serve the dashboard until Ctrl-C
     manager.start().await?;
     tokio::signal::ctrl_c().await?;
     manager.shutdown().await;
     Ok(())
 }
 ```

 ## Features

 - **Lifecycle**: Container, script and manual launch strategies behind one trait
 - **Reconciliation**: `running` means a matched process *and* an open port
 - **Concurrency**: One operation per project at a time; others fail fast as busy
 - **Logging**: JSON-lines logs with rotation, mirrored to `tracing`
 - **Dashboard**: Actix Web API with CORS and an SSE event stream
*/

pub mod config;
pub mod dashboard;
pub mod error;
pub mod launch;
pub mod lifecycle;
pub mod logs;
pub mod probe;
pub mod telemetry;

pub use config::{ConfigStore, LaunchMode, ProjectDefinition, Settings};
pub use error::{Error, Result};
pub use lifecycle::{LifecycleOrchestrator, OperationResult, ProjectStatus};

use dashboard::{DashboardHandle, DashboardServer, DashboardState, EventManager};
use launch::Launchers;
use lifecycle::StatusPoller;
use logs::LogManager;
use probe::{PsObserver, TcpPortProbe};
use std::sync::Arc;
use telemetry::{SystemMonitor, TelemetryPoller};

/// Wires the configured components together and runs the dashboard.
///
/// All public methods are instrumented with `tracing` spans where they do
/// I/O.
pub struct DeployManager {
    settings: Settings,
    orchestrator: Arc<LifecycleOrchestrator>,
    logs: Arc<LogManager>,
    monitor: SystemMonitor,
    events: Arc<EventManager>,
    status_poller: StatusPoller,
    telemetry_poller: TelemetryPoller,
    dashboard: Option<DashboardHandle>,
}

impl DeployManager {
    /// Builds every component with its default host implementation.
    #[tracing::instrument(skip_all, fields(projects = store.len()))]
    pub async fn new(settings: Settings, store: ConfigStore) -> Self {
        let lifecycle = &settings.lifecycle;

        let logs = Arc::new(LogManager::open(&settings.logs, store.ids()).await);
        let orchestrator = Arc::new(
            LifecycleOrchestrator::new(
                store,
                Arc::new(PsObserver::new(lifecycle.process_list_timeout())),
                Arc::new(TcpPortProbe::new(lifecycle.port_probe_timeout())),
                Launchers::from_settings(lifecycle),
                logs.clone(),
            )
            .with_delays(lifecycle.settle_delay(), lifecycle.restart_delay()),
        );
        let monitor = SystemMonitor::new();
        let events = Arc::new(EventManager::new(settings.monitoring.event_capacity));

        let status_poller = StatusPoller::new(orchestrator.clone(), settings.monitoring.status_interval());
        let telemetry_poller = TelemetryPoller::new(monitor.clone(), settings.monitoring.telemetry_interval());

        Self {
            settings,
            orchestrator,
            logs,
            monitor,
            events,
            status_poller,
            telemetry_poller,
            dashboard: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn orchestrator(&self) -> &Arc<LifecycleOrchestrator> {
        &self.orchestrator
    }

    pub fn logs(&self) -> &Arc<LogManager> {
        &self.logs
    }

    /// State shared with dashboard handlers.
    pub fn state(&self) -> DashboardState {
        DashboardState {
            orchestrator: self.orchestrator.clone(),
            logs: self.logs.clone(),
            monitor: self.monitor.clone(),
            events: self.events.clone(),
        }
    }

    /// Reconciles every project once so the cache is warm.
    #[tracing::instrument(skip(self))]
    pub async fn initial_sweep(&self) {
        let statuses = self.orchestrator.get_all_statuses().await;
        tracing::info!(
            projects = statuses.len(),
            running = statuses.values().filter(|s| s.running).count(),
            "Initial status sweep complete"
        );
    }

    /// Starts the dashboard server and the periodic broadcasters.
    ///
    /// # Errors
    ///
    /// Returns an error if the dashboard cannot bind its address.
    #[tracing::instrument(skip(self))]
    pub async fn start(&mut self) -> Result<()> {
        if self.dashboard.is_some() {
            return Ok(());
        }

        let handle = DashboardServer::start(self.state(), &self.settings.server).await?;
        self.dashboard = Some(handle);

        let events = self.events.clone();
        self.status_poller
            .start(move |statuses| events.send_projects_update(&statuses));

        let events = self.events.clone();
        self.telemetry_poller
            .start(move |info| events.send_system_update(&info));

        tracing::info!(
            address = %self.settings.server.address,
            port = self.settings.server.port,
            projects = self.orchestrator.count(),
            "Deploy manager started"
        );
        Ok(())
    }

    /// Addresses the dashboard is listening on, once started.
    pub fn local_addrs(&self) -> Vec<std::net::SocketAddr> {
        self.dashboard
            .as_ref()
            .map(|d| d.local_addrs().to_vec())
            .unwrap_or_default()
    }

    /// Stops the broadcasters and the dashboard.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&mut self) {
        self.status_poller.stop();
        self.telemetry_poller.stop();
        if let Some(dashboard) = self.dashboard.take() {
            dashboard.shutdown().await;
        }
        tracing::info!("Deploy manager shut down");
    }
}
