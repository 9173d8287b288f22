//! Configuration module for the deploy manager.
//!
//! This module loads the project catalogue (`projects.json` / `projects.yaml`)
//! into an immutable [`ConfigStore`] and the process-wide [`Settings`].
//! Each raw entry is resolved once into a [`ProjectDefinition`] whose
//! [`LaunchMode`] decides which launch strategy drives it.
//!
//! # Examples
//!
//! Loading the catalogue from a file:
//!
//! ```no_run
//! use deploy_manager::config::ConfigStore;
//!
//! let store = ConfigStore::from_file("config/projects.json").unwrap();
//! println!("Loaded {} projects", store.len());
//! ```
//!
//! Parsing from a string:
//!
//! ```
//! use deploy_manager::config::{ConfigFormat, ConfigStore, LaunchMode};
//!
//! let store = ConfigStore::parse_from_str(r#"{
//!     "api": { "name": "API", "path": "/srv/api", "defaultPort": 8080, "dockerCompose": true }
//! }"#, ConfigFormat::Json).unwrap();
//!
//! let api = store.get("api").unwrap();
//! assert!(matches!(api.launch_mode, LaunchMode::Container { .. }));
//! ```
mod parser;
pub mod validator;

pub use parser::{
    ComposeDescriptor, DEFAULT_WORKERS, HealthCheckConfig, HealthCheckKind, LifecycleSettings,
    LogSettings, MonitoringSettings, ProjectConfig, ServerSettings, Settings,
};
pub use validator::validate_project_config;

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// How a project is started and stopped, resolved once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LaunchMode {
    /// Driven through the compose tool from `working_dir`.
    Container {
        #[serde(rename = "workingDir")]
        working_dir: PathBuf,
        /// Explicit compose file passed with `-f`.
        #[serde(rename = "composeFile", skip_serializing_if = "Option::is_none")]
        compose_file: Option<String>,
    },
    /// Driven through `<path>/<script> start|stop`.
    Script { script: String },
    /// No automated launch; stop signals matched processes.
    Manual,
}

impl LaunchMode {
    /// Short label used in logs and events.
    pub fn label(&self) -> &'static str {
        match self {
            LaunchMode::Container { .. } => "container",
            LaunchMode::Script { .. } => "script",
            LaunchMode::Manual => "manual",
        }
    }
}

/// Immutable definition of one configured project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDefinition {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub default_port: u16,
    pub launch_mode: LaunchMode,
    pub health_check: Option<HealthCheckKind>,
    pub description: Option<String>,
}

impl ProjectDefinition {
    /// Resolves a raw entry into a definition.
    ///
    /// A compose descriptor wins over a service script; with neither the
    /// project is manual-only.
    pub fn from_config(id: &str, config: ProjectConfig) -> Self {
        let path = PathBuf::from(&config.path);

        let compose = match config.docker_compose {
            Some(ComposeDescriptor::Enabled(true)) => Some(None),
            Some(ComposeDescriptor::File(file)) if !file.trim().is_empty() => Some(Some(file)),
            _ => None,
        };
        let script = config.service_script.filter(|s| !s.trim().is_empty());

        let launch_mode = match (compose, script) {
            (Some(compose_file), _) => LaunchMode::Container {
                working_dir: config
                    .docker_path
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| path.clone()),
                compose_file,
            },
            (None, Some(script)) => LaunchMode::Script { script },
            (None, None) => LaunchMode::Manual,
        };

        Self {
            id: id.to_string(),
            name: config.name,
            path,
            default_port: config.default_port,
            launch_mode,
            health_check: config.health_check.map(|h| h.kind),
            description: config.description,
        }
    }

    /// Display name lower-cased with whitespace runs replaced by `-`.
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Script name when the project is script driven.
    pub fn script_name(&self) -> Option<&str> {
        match &self.launch_mode {
            LaunchMode::Script { script } => Some(script),
            _ => None,
        }
    }

    /// `scheme://localhost:port` when running, `None` otherwise.
    pub fn service_url(&self, running: bool) -> Option<String> {
        if !running {
            return None;
        }

        let scheme = match self.health_check {
            Some(HealthCheckKind::Https) => "https",
            _ => "http",
        };
        Some(format!("{}://localhost:{}", scheme, self.default_port))
    }
}

/// Source format of the project catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from the file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Immutable catalogue of project definitions, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    projects: BTreeMap<String, ProjectDefinition>,
}

impl ConfigStore {
    /// Loads the catalogue from a JSON or YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] if the file is missing, unreadable or
    /// not a map of project entries. Malformed entries inside a well-formed
    /// file are skipped, not reported as errors.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigParse(format!(
                "Failed to read projects file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse_from_str(&content, ConfigFormat::from_path(path))
    }

    /// Parses the catalogue from a string.
    pub fn parse_from_str(content: &str, format: ConfigFormat) -> Result<Self> {
        let raw: HashMap<String, serde_json::Value> = match format {
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON projects: {}", e)))?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| Error::ConfigParse(format!("Failed to parse YAML projects: {}", e)))?,
        };

        let mut projects = BTreeMap::new();
        for (id, value) in raw {
            let config: ProjectConfig = match serde_json::from_value(value) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(project = %id, error = %e, "Skipping malformed project entry");
                    continue;
                }
            };

            if let Err(e) = validate_project_config(&id, &config) {
                tracing::warn!(project = %id, error = %e, "Skipping invalid project entry");
                continue;
            }

            let definition = ProjectDefinition::from_config(&id, config);
            tracing::debug!(project = %id, mode = definition.launch_mode.label(), "Loaded project");
            projects.insert(id, definition);
        }

        Ok(Self { projects })
    }

    /// Loads the catalogue, degrading to an empty store on any error.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(store) => {
                tracing::info!(path = %path.display(), projects = store.len(), "Loaded project configuration");
                store
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to load projects, continuing with none");
                Self::default()
            }
        }
    }

    /// Builds a store from already-resolved definitions.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ProjectDefinition>) -> Self {
        Self {
            projects: definitions
                .into_iter()
                .map(|d| (d.id.clone(), d))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ProjectDefinition> {
        self.projects.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.projects.contains_key(id)
    }

    /// Project ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ProjectDefinition> {
        self.projects.values()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
