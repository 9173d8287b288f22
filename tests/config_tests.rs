use deploy_manager::config::{
    ConfigFormat, ConfigStore, HealthCheckKind, LaunchMode, ProjectConfig, Settings,
    validate_project_config,
};
use deploy_manager::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_parse_projects() -> Result<()> {
    let config_str = r#"{
        "penpot": {
            "name": "Penpot",
            "path": "/opt/penpot",
            "defaultPort": 9001,
            "dockerCompose": "docker-compose.yaml",
            "dockerPath": "/opt/penpot/docker",
            "healthCheck": { "type": "https", "path": "/" }
        },
        "video-text-editor": {
            "name": "Video Text Editor",
            "path": "/opt/vte",
            "defaultPort": 3000,
            "serviceScript": "service.sh",
            "description": "Edits video by editing text"
        },
        "notes": {
            "name": "Notes",
            "path": "/opt/notes",
            "defaultPort": 5000
        }
    }"#;

    let store = ConfigStore::parse_from_str(config_str, ConfigFormat::Json)?;
    assert_eq!(store.len(), 3);
    assert_eq!(store.ids().collect::<Vec<_>>(), ["notes", "penpot", "video-text-editor"]);

    let penpot = store.get("penpot").unwrap();
    assert_eq!(
        penpot.launch_mode,
        LaunchMode::Container {
            working_dir: PathBuf::from("/opt/penpot/docker"),
            compose_file: Some("docker-compose.yaml".to_string()),
        }
    );
    assert_eq!(penpot.health_check, Some(HealthCheckKind::Https));
    assert_eq!(penpot.service_url(true).as_deref(), Some("https://localhost:9001"));

    let vte = store.get("video-text-editor").unwrap();
    assert_eq!(vte.script_name(), Some("service.sh"));
    assert_eq!(vte.slug(), "video-text-editor");
    assert_eq!(vte.description.as_deref(), Some("Edits video by editing text"));

    let notes = store.get("notes").unwrap();
    assert_eq!(notes.launch_mode, LaunchMode::Manual);
    assert!(notes.service_url(false).is_none());

    Ok(())
}

#[test]
fn test_parse_yaml_projects() -> Result<()> {
    let config_str = r#"
api:
  name: API
  path: /srv/api
  defaultPort: 8080
  dockerCompose: true
"#;

    let store = ConfigStore::parse_from_str(config_str, ConfigFormat::Yaml)?;
    let api = store.get("api").unwrap();
    assert_eq!(
        api.launch_mode,
        LaunchMode::Container {
            working_dir: PathBuf::from("/srv/api"),
            compose_file: None,
        }
    );

    Ok(())
}

#[test]
fn test_invalid_entries_are_skipped() -> Result<()> {
    let config_str = r#"{
        "good": { "name": "Good", "path": "/srv/good", "defaultPort": 8000 },
        "no-port": { "name": "No Port", "path": "/srv/np" },
        "zero-port": { "name": "Zero", "path": "/srv/zero", "defaultPort": 0 },
        "escape": { "name": "Escape", "path": "/srv/esc", "defaultPort": 8001, "serviceScript": "../../bin/sh" }
    }"#;

    let store = ConfigStore::parse_from_str(config_str, ConfigFormat::Json)?;
    assert_eq!(store.ids().collect::<Vec<_>>(), ["good"]);

    Ok(())
}

#[test]
fn test_malformed_catalogue() {
    let result = ConfigStore::parse_from_str("[1, 2, 3]", ConfigFormat::Json);
    assert!(matches!(result, Err(Error::ConfigParse(_))));

    let result = ConfigStore::from_file("/definitely/not/projects.json");
    assert!(matches!(result, Err(ref e) if e.is_config()));
}

#[test]
fn test_load_or_empty_degrades() -> Result<()> {
    let dir = tempdir().unwrap();

    let missing = ConfigStore::load_or_empty(dir.path().join("projects.json"));
    assert!(missing.is_empty());

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();
    assert!(ConfigStore::load_or_empty(&broken).is_empty());

    let yaml = dir.path().join("projects.yml");
    std::fs::write(&yaml, "web:\n  name: Web\n  path: /srv/web\n  defaultPort: 3000\n").unwrap();
    let store = ConfigStore::load_or_empty(&yaml);
    assert!(store.contains("web"));

    Ok(())
}

#[test]
fn test_validate_project_config() {
    let mut config = ProjectConfig {
        name: "API".to_string(),
        path: "/srv/api".to_string(),
        default_port: 8080,
        docker_compose: None,
        docker_path: None,
        service_script: None,
        health_check: None,
        description: None,
    };
    assert!(validate_project_config("api", &config).is_ok());

    config.name = "  ".to_string();
    assert!(matches!(
        validate_project_config("api", &config),
        Err(Error::ConfigInvalid(_))
    ));
}

#[test]
fn test_blank_service_script_falls_back_to_manual() -> Result<()> {
    let config_str = r#"{
        "notes": { "name": "Notes", "path": "/srv/notes", "defaultPort": 5000, "serviceScript": "" },
        "wiki": { "name": "Wiki", "path": "/srv/wiki", "defaultPort": 5001, "serviceScript": "   " }
    }"#;

    let store = ConfigStore::parse_from_str(config_str, ConfigFormat::Json)?;
    assert_eq!(store.len(), 2);
    assert_eq!(store.get("notes").unwrap().launch_mode, LaunchMode::Manual);
    assert_eq!(store.get("wiki").unwrap().launch_mode, LaunchMode::Manual);

    Ok(())
}

#[test]
fn test_settings_defaults_and_overrides() -> Result<()> {
    let settings = Settings::parse_from_str("{}")?;
    assert_eq!(settings.server.port, 3001);
    assert_eq!(settings.monitoring.status_interval(), Duration::from_secs(10));
    assert_eq!(settings.lifecycle.settle_delay(), Duration::from_secs(3));
    assert_eq!(settings.lifecycle.compose_command, ["docker-compose"]);

    let settings = Settings::parse_from_str(
        r#"{
            "server": { "port": 4000, "workers": 2 },
            "lifecycle": { "settleDelayMs": 500, "composeCommand": ["docker", "compose"] },
            "logs": { "dir": "/var/log/dm", "maxProjectEntries": 50 }
        }"#,
    )?;
    assert_eq!(settings.server.port, 4000);
    assert_eq!(settings.server.address, "0.0.0.0");
    assert_eq!(settings.server.workers, Some(2));
    assert_eq!(settings.lifecycle.settle_delay(), Duration::from_millis(500));
    assert_eq!(settings.lifecycle.compose_command, ["docker", "compose"]);
    assert_eq!(settings.logs.dir, PathBuf::from("/var/log/dm"));
    assert_eq!(settings.logs.max_project_entries, 50);

    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "not json").unwrap();
    assert_eq!(Settings::load_or_default(&path).server.port, 3001);

    Ok(())
}
