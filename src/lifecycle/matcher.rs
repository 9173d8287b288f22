//! Attribution of host processes to a configured project.
//!
//! The rules are substring heuristics over command lines and are therefore
//! approximate: a process may be attributed to several projects, and the
//! runtime heuristic will happily claim unrelated `node` or `python`
//! processes while the project's port is open. Command-line formatting also
//! differs between platforms' `ps`.

use crate::config::ProjectDefinition;
use crate::probe::{PortState, ProcessRecord};

/// Why a process was attributed to a project, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchReason {
    /// Command line mentions the project id.
    ProjectId,
    /// Command line mentions the slugified display name.
    Slug,
    /// Command line mentions the service script.
    Script,
    /// Port is open and the command looks like a server runtime.
    RuntimeHeuristic,
}

const RUNTIME_MARKERS: [&str; 3] = ["node", "python", "docker"];

/// First rule that attributes `process` to `definition`, if any.
pub fn match_reason(
    definition: &ProjectDefinition,
    process: &ProcessRecord,
    port_state: PortState,
) -> Option<MatchReason> {
    let cmd = process.cmd.as_str();
    if cmd.is_empty() {
        return None;
    }

    if cmd.contains(definition.id.as_str()) {
        return Some(MatchReason::ProjectId);
    }

    let slug = definition.slug();
    if !slug.is_empty() && cmd.contains(slug.as_str()) {
        return Some(MatchReason::Slug);
    }

    if let Some(script) = definition.script_name() {
        if cmd.contains(script) {
            return Some(MatchReason::Script);
        }
    }

    if port_state.is_open() && looks_like_server(cmd, definition.default_port) {
        return Some(MatchReason::RuntimeHeuristic);
    }

    None
}

fn looks_like_server(cmd: &str, port: u16) -> bool {
    cmd.contains(&format!(":{}", port)) || RUNTIME_MARKERS.iter().any(|m| cmd.contains(m))
}

/// Processes attributed to `definition`, in input order.
pub fn match_processes(
    definition: &ProjectDefinition,
    processes: impl IntoIterator<Item = ProcessRecord>,
    port_state: PortState,
) -> Vec<ProcessRecord> {
    processes
        .into_iter()
        .filter(|p| match_reason(definition, p, port_state).is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LaunchMode;
    use std::path::PathBuf;

    fn definition(mode: LaunchMode) -> ProjectDefinition {
        ProjectDefinition {
            id: "vte".to_string(),
            name: "Video Text Editor".to_string(),
            path: PathBuf::from("/srv/vte"),
            default_port: 4100,
            launch_mode: mode,
            health_check: None,
            description: None,
        }
    }

    fn process(cmd: &str) -> ProcessRecord {
        ProcessRecord {
            pid: 1,
            name: "x".to_string(),
            cmd: cmd.to_string(),
            cpu: 0.0,
            memory: 0.0,
            mem_rss: 0,
        }
    }

    #[test]
    fn test_precedence() {
        let def = definition(LaunchMode::Script {
            script: "serve.sh".to_string(),
        });

        assert_eq!(
            match_reason(&def, &process("node /srv/vte/video-text-editor/serve.sh"), PortState::Open),
            Some(MatchReason::ProjectId)
        );
        assert_eq!(
            match_reason(&def, &process("node /opt/video-text-editor/main.js"), PortState::Open),
            Some(MatchReason::Slug)
        );
        assert_eq!(
            match_reason(&def, &process("/bin/sh ./serve.sh start"), PortState::Closed),
            Some(MatchReason::Script)
        );
        assert_eq!(
            match_reason(&def, &process("python3 -m http.server"), PortState::Open),
            Some(MatchReason::RuntimeHeuristic)
        );
    }

    #[test]
    fn test_runtime_heuristic_needs_open_port() {
        let def = definition(LaunchMode::Manual);

        assert_eq!(
            match_reason(&def, &process("python3 -m http.server"), PortState::Closed),
            None
        );
        assert_eq!(
            match_reason(&def, &process("ruby server --bind 0.0.0.0:4100"), PortState::Open),
            Some(MatchReason::RuntimeHeuristic)
        );
        assert_eq!(
            match_reason(&def, &process("ruby server --bind 0.0.0.0:4100"), PortState::Filtered),
            None
        );
    }

    #[test]
    fn test_unrelated_and_empty_commands() {
        let def = definition(LaunchMode::Manual);
        assert_eq!(match_reason(&def, &process("/usr/sbin/sshd -D"), PortState::Open), None);
        assert_eq!(match_reason(&def, &process(""), PortState::Open), None);
    }

    #[test]
    fn test_match_processes_keeps_order() {
        let def = definition(LaunchMode::Manual);
        let matched = match_processes(
            &def,
            vec![
                ProcessRecord { pid: 3, ..process("vte worker") },
                ProcessRecord { pid: 4, ..process("bash") },
                ProcessRecord { pid: 5, ..process("vte api") },
            ],
            PortState::Closed,
        );

        assert_eq!(matched.iter().map(|p| p.pid).collect::<Vec<_>>(), vec![3, 5]);
    }
}
