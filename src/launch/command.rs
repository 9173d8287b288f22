use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `program args..` in `cwd`, bounded by `timeout`.
///
/// No shell is involved. A non-zero exit becomes [`Error::Launch`] carrying
/// stderr (or stdout when stderr is empty); so does a timeout, in which case
/// the child is killed.
pub async fn run_command<S: AsRef<OsStr>>(
    label: &str,
    program: impl AsRef<OsStr>,
    args: &[S],
    cwd: &Path,
    timeout: Duration,
) -> Result<CommandOutput> {
    let program = program.as_ref();
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(
        program = %program.to_string_lossy(),
        cwd = %cwd.display(),
        timeout = ?timeout,
        "Running {}",
        label
    );

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(Error::Launch(format!(
                "{} error: failed to run {}: {}",
                label,
                program.to_string_lossy(),
                e
            )));
        }
        Err(_) => {
            tracing::warn!(timeout = ?timeout, "{} timed out", label);
            return Err(Error::Launch(format!(
                "{} error: timed out after {}s",
                label,
                timeout.as_secs_f32()
            )));
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        let diagnostic = if stderr.is_empty() { &stdout } else { &stderr };
        tracing::warn!(status = %output.status, diagnostic = %diagnostic, "{} failed", label);
        return Err(Error::Launch(format!(
            "{} error ({}): {}",
            label, output.status, diagnostic
        )));
    }

    Ok(CommandOutput { stdout, stderr })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let out = run_command("Echo", "echo", &["hello"], Path::new("/"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout, "hello");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let err = run_command(
            "Shell",
            "sh",
            &["-c", "echo boom >&2; exit 3"],
            Path::new("/"),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        match err {
            Error::Launch(msg) => assert!(msg.contains("boom"), "unexpected message: {}", msg),
            other => panic!("expected launch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_launch_error() {
        let err = run_command("Sleep", "sleep", &["5"], Path::new("/"), Duration::from_millis(100))
            .await
            .unwrap_err();

        match err {
            Error::Launch(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected launch error, got {:?}", other),
        }
    }
}
