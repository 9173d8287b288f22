use crate::config::LogSettings;
use crate::error::Result;
use crate::logs::{EventLog, LogEntry, LogLevel};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tokio::io::AsyncWriteExt;

/// Name of the file every entry is appended to.
pub const MAIN_LOG_FILE: &str = "deploy-manager.log";

/// Subdirectory of the log directory holding one file per project.
pub const PROJECT_LOG_DIR: &str = "projects";

/// JSON-lines log store with per-project history.
///
/// Every entry goes to `<dir>/deploy-manager.log`; entries tagged with a
/// project also go to `<dir>/projects/<project>.log` and into a bounded
/// in-memory ring. Project ids are percent-encoded into file names, so no
/// id can name the main log or another file's backup. A file that would grow past `max_file_bytes` is renamed to
/// `<name>.old.log` (replacing any previous backup) and a fresh file is
/// started.
///
/// Failures to write are reported through `tracing` and otherwise ignored.
pub struct LogManager {
    dir: PathBuf,
    main_file: PathBuf,
    max_file_bytes: u64,
    max_project_entries: usize,
    history: RwLock<HashMap<String, VecDeque<LogEntry>>>,
    writer: tokio::sync::Mutex<()>,
}

impl LogManager {
    /// Opens the log directory, creating it if needed, and preloads the
    /// history of the given projects from their files.
    pub async fn open<I, S>(settings: &LogSettings, project_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = project_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();

        let manager = Self {
            dir: settings.dir.clone(),
            main_file: settings.dir.join(MAIN_LOG_FILE),
            max_file_bytes: settings.max_file_bytes,
            max_project_entries: settings.max_project_entries,
            history: RwLock::new(HashMap::new()),
            writer: tokio::sync::Mutex::new(()),
        };

        let project_dir = manager.dir.join(PROJECT_LOG_DIR);
        if let Err(e) = tokio::fs::create_dir_all(&project_dir).await {
            tracing::error!(dir = %project_dir.display(), error = %e, "Failed to create log directory");
        }

        for id in ids {
            let entries = manager.read_entries(&manager.project_file(&id)).await;
            let skip = entries.len().saturating_sub(manager.max_project_entries);
            let ring: VecDeque<LogEntry> = entries.into_iter().skip(skip).collect();
            tracing::debug!(project = %id, entries = ring.len(), "Preloaded project log history");
            manager.write_history().insert(id, ring);
        }

        manager
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Last `count` entries of the main log file, oldest first.
    pub async fn recent_logs(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.read_entries(&self.main_file).await;
        let skip = entries.len().saturating_sub(count);
        entries.into_iter().skip(skip).collect()
    }

    /// Last `count` in-memory entries of a project, oldest first.
    pub fn project_logs(&self, project_id: &str, count: usize) -> Vec<LogEntry> {
        let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
        match history.get(project_id) {
            Some(ring) => {
                let skip = ring.len().saturating_sub(count);
                ring.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Truncates a project's log (or the main log) and records the fact.
    pub async fn clear_logs(&self, project_id: Option<&str>) -> Result<()> {
        match project_id {
            Some(id) => {
                {
                    let _guard = self.writer.lock().await;
                    tokio::fs::write(self.project_file(id), b"").await?;
                }
                self.write_history().insert(id.to_string(), VecDeque::new());
                self.log(LogLevel::Info, format!("Logs for project {} cleared", id), None, None)
                    .await;
            }
            None => {
                {
                    let _guard = self.writer.lock().await;
                    tokio::fs::write(&self.main_file, b"").await?;
                }
                self.log(LogLevel::Info, "Main logs cleared".to_string(), None, None)
                    .await;
            }
        }
        Ok(())
    }

    /// Path of a project's log file.
    pub fn project_file(&self, project_id: &str) -> PathBuf {
        self.dir
            .join(PROJECT_LOG_DIR)
            .join(format!("{}.log", file_safe(project_id)))
    }

    fn write_history(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, VecDeque<LogEntry>>> {
        self.history.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn remember(&self, entry: &LogEntry) {
        let Some(id) = &entry.project_id else {
            return;
        };

        let mut history = self.write_history();
        let ring = history.entry(id.clone()).or_default();
        ring.push_back(entry.clone());
        while ring.len() > self.max_project_entries {
            ring.pop_front();
        }
    }

    async fn persist(&self, entry: &LogEntry) {
        let mut line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize log entry");
                return;
            }
        };
        line.push('\n');

        let _guard = self.writer.lock().await;
        if let Err(e) = self.append_line(&self.main_file, &line).await {
            tracing::warn!(file = %self.main_file.display(), error = %e, "Failed to write log entry");
        }
        if let Some(id) = &entry.project_id {
            let path = self.project_file(id);
            if let Err(e) = self.append_line(&path, &line).await {
                tracing::warn!(file = %path.display(), error = %e, "Failed to write project log entry");
            }
        }
    }

    async fn append_line(&self, path: &Path, line: &str) -> std::io::Result<()> {
        if let Ok(meta) = tokio::fs::metadata(path).await {
            if meta.len() > 0 && meta.len() + line.len() as u64 > self.max_file_bytes {
                let backup = rotated_path(path);
                tokio::fs::rename(path, &backup).await?;
                tracing::info!(file = %path.display(), backup = %backup.display(), "Rotated log file");
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// Parses a JSON-lines file, skipping blank and unparsable lines.
    async fn read_entries(&self, path: &Path) -> Vec<LogEntry> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Failed to read log file");
                return Vec::new();
            }
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

#[async_trait]
impl EventLog for LogManager {
    async fn log(
        &self,
        level: LogLevel,
        message: String,
        project_id: Option<String>,
        metadata: Option<serde_json::Value>,
    ) {
        let entry = LogEntry::new(level, message, project_id, metadata);
        mirror(&entry);
        self.persist(&entry).await;
        self.remember(&entry);
    }
}

fn mirror(entry: &LogEntry) {
    let project = entry.project_id.as_deref().unwrap_or("-");
    match entry.level {
        LogLevel::Debug => tracing::debug!(project, "{}", entry.message),
        LogLevel::Info => tracing::info!(project, "{}", entry.message),
        LogLevel::Warn => tracing::warn!(project, "{}", entry.message),
        LogLevel::Error => tracing::error!(project, "{}", entry.message),
    }
}

/// `logs/api.log` -> `logs/api.old.log`
fn rotated_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.old.log", stem))
}

/// Percent-encodes every byte outside `[A-Za-z0-9_-]`. Distinct ids map to
/// distinct names and the result never contains a dot or a separator.
fn file_safe(id: &str) -> String {
    let mut name = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotated_path() {
        assert_eq!(
            rotated_path(Path::new("logs/deploy-manager.log")),
            PathBuf::from("logs/deploy-manager.old.log")
        );
    }

    #[test]
    fn test_file_safe_strips_separators() {
        assert_eq!(file_safe("api"), "api");
        assert_eq!(file_safe("video_text-editor"), "video_text-editor");
        assert_eq!(file_safe("../etc/passwd"), "%2E%2E%2Fetc%2Fpasswd");
        assert_eq!(file_safe("my app"), "my%20app");
        assert_eq!(file_safe("api.old"), "api%2Eold");
        assert_ne!(file_safe("a.b"), file_safe("a_b"));
    }
}
