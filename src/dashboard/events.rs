//! SSE event broadcasting.

use crate::dashboard::types::{InitialData, ProjectStatusEvent, SSEMessage, event_names};
use crate::lifecycle::ProjectStatus;
use crate::telemetry::SystemInfo;
use actix_web::web::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// Fans dashboard events out to every connected SSE client.
///
/// Slow clients that fall more than `capacity` messages behind lose the
/// oldest ones; senders never block.
#[derive(Clone)]
pub struct EventManager {
    sender: broadcast::Sender<SSEMessage>,
}

impl EventManager {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SSEMessage> {
        self.sender.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Result (or failure) of a lifecycle operation.
    pub fn send_project_status(&self, event: &ProjectStatusEvent) {
        self.broadcast(event_names::PROJECT_STATUS, event);
    }

    /// Outcome of a periodic sweep.
    pub fn send_projects_update(&self, statuses: &BTreeMap<String, ProjectStatus>) {
        self.broadcast(event_names::PROJECTS_STATUS_UPDATE, statuses);
    }

    pub fn send_system_update(&self, info: &SystemInfo) {
        self.broadcast(event_names::SYSTEM_UPDATE, info);
    }

    /// Builds the per-connection `initial-data` message. It is not broadcast.
    pub fn initial_message(data: &InitialData) -> Option<SSEMessage> {
        match serde_json::to_string(data) {
            Ok(json) => Some(SSEMessage::new(event_names::INITIAL_DATA, &json, None)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize initial data");
                None
            }
        }
    }

    fn broadcast<T: Serialize + ?Sized>(&self, event: &str, payload: &T) {
        let json = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, event_type = event, "Failed to serialize SSE event payload");
                return;
            }
        };

        match self.sender.send(SSEMessage::new(event, &json, None)) {
            Ok(receivers) => {
                tracing::debug!(event_type = event, receivers, "SSE event sent to clients");
            }
            Err(_) => {
                tracing::trace!(event_type = event, "SSE event created but no clients connected");
            }
        }
    }

    /// Format an SSEMessage for the wire
    pub fn format_sse_message(message: &SSEMessage) -> Bytes {
        let mut result = String::new();

        if let Some(id) = &message.id {
            result.push_str(&format!("id: {}\n", id));
        }

        result.push_str(&format!("event: {}\n", message.event));
        for line in message.data.lines() {
            result.push_str(&format!("data: {}\n", line));
        }
        result.push('\n');

        Bytes::from(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::types::LifecycleAction;
    use crate::lifecycle::OperationResult;

    #[test]
    fn test_format_sse_message() {
        let msg = SSEMessage::new("system-update", "{\"a\":1}", Some("7"));
        let bytes = EventManager::format_sse_message(&msg);
        assert_eq!(&bytes[..], b"id: 7\nevent: system-update\ndata: {\"a\":1}\n\n");
    }

    #[test]
    fn test_multiline_data_is_split() {
        let msg = SSEMessage::new("x", "one\ntwo", None);
        let bytes = EventManager::format_sse_message(&msg);
        assert_eq!(&bytes[..], b"event: x\ndata: one\ndata: two\n\n");
    }

    #[tokio::test]
    async fn test_project_status_reaches_subscribers() {
        let events = EventManager::new(8);
        let mut rx = events.subscribe();

        events.send_project_status(&ProjectStatusEvent {
            project_id: "api".to_string(),
            action: LifecycleAction::Start,
            result: Some(OperationResult {
                success: true,
                message: "ok".to_string(),
                url: Some("http://localhost:8080".to_string()),
            }),
            error: None,
            status: None,
        });

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event, "project-status");
        let payload: serde_json::Value = serde_json::from_str(&msg.data).unwrap();
        assert_eq!(payload["projectId"], "api");
        assert_eq!(payload["action"], "start");
        assert_eq!(payload["result"]["url"], "http://localhost:8080");
        assert!(payload.get("error").is_none());
    }

    #[test]
    fn test_send_without_clients_is_harmless() {
        let events = EventManager::new(1);
        events.send_projects_update(&BTreeMap::new());
        assert_eq!(events.client_count(), 0);
    }
}
