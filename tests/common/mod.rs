// Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use deploy_manager::config::{LaunchMode, ProjectDefinition};
use deploy_manager::error::{Error, Result};
use deploy_manager::launch::{LaunchResult, LaunchStrategy};
use deploy_manager::lifecycle::ProjectStatus;
use deploy_manager::logs::{EventLog, LogLevel};
use deploy_manager::probe::{PortProbe, PortState, ProcessObserver, ProcessRecord};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory host: a process table and a set of port states.
#[derive(Default)]
pub struct FakeHost {
    processes: Mutex<Vec<ProcessRecord>>,
    ports: Mutex<HashMap<u16, PortState>>,
    failing_ports: Mutex<Vec<u16>>,
    listing_fails: Mutex<bool>,
    pub listings: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a service as up: one process with `cmd` and its port open.
    pub fn serve(&self, pid: u32, cmd: &str, port: u16) {
        self.processes.lock().unwrap().push(process(pid, cmd));
        self.ports.lock().unwrap().insert(port, PortState::Open);
    }

    pub fn add_process(&self, pid: u32, cmd: &str) {
        self.processes.lock().unwrap().push(process(pid, cmd));
    }

    /// Removes every process whose command mentions `needle` and closes `port`.
    pub fn shut_down(&self, needle: &str, port: u16) {
        self.processes
            .lock()
            .unwrap()
            .retain(|p| !p.cmd.contains(needle));
        self.ports.lock().unwrap().insert(port, PortState::Closed);
    }

    pub fn kill(&self, pid: u32) {
        self.processes.lock().unwrap().retain(|p| p.pid != pid);
    }

    pub fn fail_probe(&self, port: u16) {
        self.failing_ports.lock().unwrap().push(port);
    }

    pub fn fail_listing(&self) {
        *self.listing_fails.lock().unwrap() = true;
    }
}

#[async_trait]
impl ProcessObserver for FakeHost {
    async fn processes(&self) -> Result<Vec<ProcessRecord>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        if *self.listing_fails.lock().unwrap() {
            return Err(Error::Probe("ps timed out".to_string()));
        }
        Ok(self.processes.lock().unwrap().clone())
    }
}

#[async_trait]
impl PortProbe for FakeHost {
    async fn check(&self, _host: &str, port: u16) -> Result<PortState> {
        if self.failing_ports.lock().unwrap().contains(&port) {
            return Err(Error::Probe(format!("probe of port {} failed", port)));
        }
        Ok(self
            .ports
            .lock()
            .unwrap()
            .get(&port)
            .copied()
            .unwrap_or(PortState::Closed))
    }
}

/// Event log that keeps every entry in memory.
#[derive(Default)]
pub struct RecordingLog {
    pub entries: Mutex<Vec<(LogLevel, String, Option<String>)>>,
}

impl RecordingLog {
    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m, _)| m.clone())
            .collect()
    }

    pub fn count_level(&self, level: LogLevel) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _, _)| *l == level)
            .count()
    }
}

#[async_trait]
impl EventLog for RecordingLog {
    async fn log(
        &self,
        level: LogLevel,
        message: String,
        project_id: Option<String>,
        _metadata: Option<serde_json::Value>,
    ) {
        self.entries.lock().unwrap().push((level, message, project_id));
    }
}

/// Strategy that sleeps before succeeding and counts its invocations.
pub struct SlowStrategy {
    pub delay: Duration,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl SlowStrategy {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LaunchStrategy for SlowStrategy {
    async fn start(&self, _definition: &ProjectDefinition) -> Result<LaunchResult> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(LaunchResult::new("slow start done"))
    }

    async fn stop(
        &self,
        _definition: &ProjectDefinition,
        _current: &ProjectStatus,
    ) -> Result<LaunchResult> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(LaunchResult::new("slow stop done"))
    }
}

pub fn process(pid: u32, cmd: &str) -> ProcessRecord {
    ProcessRecord {
        pid,
        name: cmd.split_whitespace().next().unwrap_or_default().to_string(),
        cmd: cmd.to_string(),
        cpu: 0.5,
        memory: 1.0,
        mem_rss: 2048,
    }
}

pub fn container_project(id: &str, name: &str, port: u16) -> ProjectDefinition {
    ProjectDefinition {
        id: id.to_string(),
        name: name.to_string(),
        path: PathBuf::from(format!("/srv/{}", id)),
        default_port: port,
        launch_mode: LaunchMode::Container {
            working_dir: PathBuf::from(format!("/srv/{}", id)),
            compose_file: None,
        },
        health_check: None,
        description: None,
    }
}

pub fn script_project(id: &str, name: &str, path: PathBuf, script: &str, port: u16) -> ProjectDefinition {
    ProjectDefinition {
        id: id.to_string(),
        name: name.to_string(),
        path,
        default_port: port,
        launch_mode: LaunchMode::Script {
            script: script.to_string(),
        },
        health_check: None,
        description: None,
    }
}

pub fn manual_project(id: &str, name: &str, port: u16) -> ProjectDefinition {
    ProjectDefinition {
        id: id.to_string(),
        name: name.to_string(),
        path: PathBuf::from(format!("/srv/{}", id)),
        default_port: port,
        launch_mode: LaunchMode::Manual,
        health_check: None,
        description: None,
    }
}
