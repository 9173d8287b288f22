use crate::error::{Error, Result};
use crate::probe::{ProcessObserver, ProcessRecord};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Minimum column count of a `ps aux` row (USER .. COMMAND).
const PS_AUX_COLUMNS: usize = 11;

/// [`ProcessObserver`] backed by `ps aux`.
///
/// The command is spawned without a shell and bounded by `timeout`; the
/// child is killed if the timeout elapses.
#[derive(Debug, Clone)]
pub struct PsObserver {
    program: String,
    timeout: Duration,
}

impl PsObserver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "ps".to_string(),
            timeout,
        }
    }

    /// Uses another `ps`-compatible program, e.g. a fixture script in tests.
    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for PsObserver {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl ProcessObserver for PsObserver {
    #[tracing::instrument(skip(self), fields(program = %self.program))]
    async fn processes(&self) -> Result<Vec<ProcessRecord>> {
        let mut command = Command::new(&self.program);
        command
            .arg("aux")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::Probe(format!("Failed to run {}: {}", self.program, e)));
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "Process listing timed out");
                return Err(Error::Probe(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Probe(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let records: Vec<ProcessRecord> = parse_ps_aux(&stdout).collect();
        tracing::trace!(count = records.len(), "Enumerated processes");
        Ok(records)
    }
}

/// Parses `ps aux` output lazily, skipping the header and malformed rows.
///
/// Rows with fewer than eleven columns or a non-numeric pid are dropped;
/// unparsable numeric metrics fall back to zero.
pub fn parse_ps_aux(output: &str) -> impl Iterator<Item = ProcessRecord> + '_ {
    output.lines().skip(1).filter_map(parse_row)
}

fn parse_row(line: &str) -> Option<ProcessRecord> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < PS_AUX_COLUMNS {
        return None;
    }

    let pid = parts[1].parse::<u32>().ok()?;
    let executable = parts[10];
    let name = executable
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(executable)
        .to_string();

    Some(ProcessRecord {
        pid,
        name,
        cmd: parts[10..].join(" "),
        cpu: parts[2].parse().unwrap_or(0.0),
        memory: parts[3].parse().unwrap_or(0.0),
        mem_rss: parts[5].parse().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
USER         PID %CPU %MEM    VSZ   RSS TTY      STAT START   TIME COMMAND
root           1  0.0  0.1 167744 11520 ?        Ss   09:12   0:02 /sbin/init splash
dev         4242 12.5  3.4 912344 276400 pts/1   Sl+  10:01   1:13 /usr/bin/node /srv/api/server.js --port 8080
garbage line
dev          abc  1.0  1.0  1000  1000 pts/1   S    10:01   0:00 /bin/bash
dev         5151  n/a  0.2  20000  4000 pts/2   S    10:05   0:00 python3 -m http.server 9000
";

    #[test]
    fn test_parse_skips_header_and_malformed_rows() {
        let records: Vec<ProcessRecord> = parse_ps_aux(SAMPLE).collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].pid, 1);
        assert_eq!(records[0].name, "init");
        assert_eq!(records[0].cmd, "/sbin/init splash");

        let node = &records[1];
        assert_eq!(node.pid, 4242);
        assert_eq!(node.name, "node");
        assert_eq!(node.cmd, "/usr/bin/node /srv/api/server.js --port 8080");
        assert_eq!(node.cpu, 12.5);
        assert_eq!(node.memory, 3.4);
        assert_eq!(node.mem_rss, 276400);
    }

    #[test]
    fn test_unparsable_metrics_default_to_zero() {
        let records: Vec<ProcessRecord> = parse_ps_aux(SAMPLE).collect();
        let python = records.iter().find(|r| r.pid == 5151).unwrap();
        assert_eq!(python.cpu, 0.0);
        assert_eq!(python.name, "python3");
    }

    #[test]
    fn test_empty_output_yields_nothing() {
        assert_eq!(parse_ps_aux("").count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_program_is_probe_error() {
        let observer = PsObserver::with_program("/nonexistent/ps", Duration::from_secs(1));
        let err = observer.processes().await.unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
    }
}
