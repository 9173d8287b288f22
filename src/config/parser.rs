use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of Actix Web workers when `server.workers` is not set.
pub const DEFAULT_WORKERS: usize = 4;

/// Raw configuration entry for a single project, as written in `projects.json`.
///
/// The launch mode is not stored here; it is inferred from which of
/// `docker_compose` / `service_script` is populated when the entry is turned
/// into a [`ProjectDefinition`](super::ProjectDefinition).
///
/// # Examples
///
/// ```
/// use deploy_manager::config::ProjectConfig;
///
/// let raw = r#"{
///     "name": "Video Text Editor",
///     "path": "/opt/projects/video-text-editor",
///     "defaultPort": 3000,
///     "serviceScript": "service.sh",
///     "healthCheck": { "type": "http" }
/// }"#;
///
/// let config: ProjectConfig = serde_json::from_str(raw).unwrap();
/// assert_eq!(config.default_port, 3000);
/// assert_eq!(config.service_script.as_deref(), Some("service.sh"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Human readable project name.
    pub name: String,

    /// Project root on the local filesystem.
    pub path: String,

    /// Port the service listens on once running.
    pub default_port: u16,

    /// Container-compose descriptor: `true` or the compose file name.
    #[serde(default)]
    pub docker_compose: Option<ComposeDescriptor>,

    /// Directory holding the compose file when it is not the project root.
    #[serde(default)]
    pub docker_path: Option<String>,

    /// Launch script, relative to `path`, accepting `start` / `stop`.
    #[serde(default)]
    pub service_script: Option<String>,

    /// Optional health-check description, used to pick the URL scheme.
    #[serde(default)]
    pub health_check: Option<HealthCheckConfig>,

    /// Free-form description shown by the dashboard.
    #[serde(default)]
    pub description: Option<String>,
}

/// Either a flag enabling compose with the default file, or an explicit file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComposeDescriptor {
    /// `"dockerCompose": true`
    Enabled(bool),
    /// `"dockerCompose": "docker-compose.prod.yml"`
    File(String),
}

/// Health-check section of a project entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Check protocol.
    #[serde(rename = "type")]
    pub kind: HealthCheckKind,
    /// Path probed by external tooling; kept for display.
    #[serde(default)]
    pub path: Option<String>,
}

/// Protocol of a project's health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckKind {
    Http,
    Https,
    /// Anything else; treated as plain http for URL derivation.
    #[serde(other)]
    Other,
}

/// Process-wide settings, loaded from `config.json`.
///
/// Every section is optional and falls back to its defaults, so an empty
/// object (or a missing file) is a valid configuration.
///
/// ```json
/// {
///   "server": { "address": "0.0.0.0", "port": 3001 },
///   "monitoring": { "statusIntervalSecs": 10, "telemetryIntervalSecs": 5 },
///   "lifecycle": { "settleDelayMs": 3000, "composeCommand": ["docker", "compose"] },
///   "logs": { "dir": "logs" }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub server: ServerSettings,
    pub monitoring: MonitoringSettings,
    pub lifecycle: LifecycleSettings,
    pub logs: LogSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    pub address: String,
    pub port: u16,
    /// Number of Actix workers, [`DEFAULT_WORKERS`] when unset.
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 3001,
            workers: None,
        }
    }
}

/// Periodic broadcast settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitoringSettings {
    pub status_interval_secs: u64,
    pub telemetry_interval_secs: u64,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            status_interval_secs: 10,
            telemetry_interval_secs: 5,
            event_capacity: 100,
        }
    }
}

impl MonitoringSettings {
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_interval_secs.max(1))
    }
}

/// Delays and timeouts of the lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifecycleSettings {
    /// Wait after a start/stop before re-probing.
    pub settle_delay_ms: u64,
    /// Extra pause between the stop and start halves of a restart.
    pub restart_delay_ms: u64,
    pub compose_start_timeout_secs: u64,
    pub compose_stop_timeout_secs: u64,
    pub script_timeout_secs: u64,
    pub process_list_timeout_secs: u64,
    pub port_probe_timeout_ms: u64,
    /// Program and leading arguments of the compose tool.
    pub compose_command: Vec<String>,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 3000,
            restart_delay_ms: 2000,
            compose_start_timeout_secs: 60,
            compose_stop_timeout_secs: 30,
            script_timeout_secs: 30,
            process_list_timeout_secs: 5,
            port_probe_timeout_ms: 1000,
            compose_command: vec!["docker-compose".to_string()],
        }
    }
}

impl LifecycleSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn compose_start_timeout(&self) -> Duration {
        Duration::from_secs(self.compose_start_timeout_secs)
    }

    pub fn compose_stop_timeout(&self) -> Duration {
        Duration::from_secs(self.compose_stop_timeout_secs)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }

    pub fn process_list_timeout(&self) -> Duration {
        Duration::from_secs(self.process_list_timeout_secs)
    }

    pub fn port_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.port_probe_timeout_ms)
    }
}

/// Log persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogSettings {
    pub dir: PathBuf,
    /// Size after which a log file is rotated to `*.old.log`.
    pub max_file_bytes: u64,
    /// Entries kept in memory per project.
    pub max_project_entries: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            max_file_bytes: 10 * 1024 * 1024,
            max_project_entries: 500,
        }
    }
}

impl Settings {
    /// Loads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read settings file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses settings from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON settings: {}", e)))
    }

    /// Loads settings if the file exists, falling back to defaults otherwise.
    ///
    /// A present but malformed file is reported and replaced by defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Settings file not found, using defaults");
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable settings file");
                Self::default()
            }
        }
    }
}
