use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use std::path::Path;

/// Validates a single project entry.
pub fn validate_project_config(id: &str, config: &ProjectConfig) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::ConfigInvalid("Project with empty id".to_string()));
    }

    if config.name.trim().is_empty() {
        return Err(Error::ConfigInvalid(format!("Project '{}' has empty name", id)));
    }

    if config.path.trim().is_empty() {
        return Err(Error::ConfigInvalid(format!("Project '{}' has empty path", id)));
    }

    if config.default_port == 0 {
        return Err(Error::ConfigInvalid(format!("Project '{}' has port 0", id)));
    }

    // The script is resolved inside the project root, never elsewhere. A
    // blank script means no script.
    if let Some(script) = config
        .service_script
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        let script_path = Path::new(script);
        if script_path.is_absolute()
            || script_path.components().any(|c| c.as_os_str() == "..")
        {
            return Err(Error::ConfigInvalid(format!(
                "Project '{}' has invalid service script '{}'",
                id, script
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, path: &str, port: u16, script: Option<&str>) -> ProjectConfig {
        ProjectConfig {
            name: name.to_string(),
            path: path.to_string(),
            default_port: port,
            docker_compose: None,
            docker_path: None,
            service_script: script.map(String::from),
            health_check: None,
            description: None,
        }
    }

    #[test]
    fn test_accepts_well_formed_entry() {
        assert!(validate_project_config("tool", &entry("Tool", "/srv/tool", 8000, Some("run.sh"))).is_ok());
    }

    #[test]
    fn test_rejects_bad_entries() {
        assert!(validate_project_config("", &entry("Tool", "/srv/tool", 8000, None)).is_err());
        assert!(validate_project_config("tool", &entry(" ", "/srv/tool", 8000, None)).is_err());
        assert!(validate_project_config("tool", &entry("Tool", "", 8000, None)).is_err());
        assert!(validate_project_config("tool", &entry("Tool", "/srv/tool", 0, None)).is_err());
        assert!(validate_project_config("tool", &entry("Tool", "/srv/tool", 80, Some("../x.sh"))).is_err());
        assert!(validate_project_config("tool", &entry("Tool", "/srv/tool", 80, Some("/bin/sh"))).is_err());
    }

    #[test]
    fn test_blank_script_is_not_an_error() {
        assert!(validate_project_config("tool", &entry("Tool", "/srv/tool", 8000, Some(""))).is_ok());
        assert!(validate_project_config("tool", &entry("Tool", "/srv/tool", 8000, Some("  "))).is_ok());
    }
}
