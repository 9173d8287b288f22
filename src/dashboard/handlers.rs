//! HTTP request handlers for the dashboard.
//!
//! Routes (see [`configure`]):
//! - `GET /api/projects`, `GET /api/projects/{id}/status`
//! - `POST /api/projects/{id}/start|stop|restart`
//! - `GET /api/system/info`
//! - `GET|DELETE /api/logs`, `GET|DELETE /api/logs/{projectId}`
//! - `GET /api/health`
//! - `GET /events` for the SSE stream

use crate::dashboard::DashboardState;
use crate::dashboard::events::EventManager;
use crate::dashboard::types::{InitialData, LifecycleAction, ProjectStatusEvent};
use crate::error::{Error, Result};
use crate::lifecycle::OperationResult;

use actix_web::{
    HttpRequest, HttpResponse, Responder,
    web::{self, Data, Json, Path, Query},
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

/// Entries returned by the log endpoints when no count is given.
pub const DEFAULT_LOG_COUNT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub count: Option<usize>,
}

/// Registers every dashboard route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/projects", web::get().to(list_projects))
            .route("/projects/{id}/status", web::get().to(project_status))
            .route("/projects/{id}/start", web::post().to(start_project))
            .route("/projects/{id}/stop", web::post().to(stop_project))
            .route("/projects/{id}/restart", web::post().to(restart_project))
            .route("/system/info", web::get().to(system_info))
            .route("/logs", web::get().to(recent_logs))
            .route("/logs", web::delete().to(clear_logs))
            .route("/logs/{project_id}", web::get().to(project_logs))
            .route("/logs/{project_id}", web::delete().to(clear_project_logs))
            .route("/health", web::get().to(health)),
    )
    .route("/events", web::get().to(events));
}

pub async fn list_projects(state: Data<DashboardState>) -> impl Responder {
    Json(state.orchestrator.list_projects())
}

pub async fn project_status(state: Data<DashboardState>, id: Path<String>) -> Result<HttpResponse> {
    let status = state.orchestrator.get_status(&id).await?;
    Ok(HttpResponse::Ok().json(status))
}

pub async fn start_project(state: Data<DashboardState>, id: Path<String>) -> Result<HttpResponse> {
    run_operation(&state, &id, LifecycleAction::Start).await
}

pub async fn stop_project(state: Data<DashboardState>, id: Path<String>) -> Result<HttpResponse> {
    run_operation(&state, &id, LifecycleAction::Stop).await
}

pub async fn restart_project(state: Data<DashboardState>, id: Path<String>) -> Result<HttpResponse> {
    run_operation(&state, &id, LifecycleAction::Restart).await
}

/// Runs one lifecycle operation and broadcasts its outcome either way.
async fn run_operation(
    state: &DashboardState,
    id: &str,
    action: LifecycleAction,
) -> Result<HttpResponse> {
    tracing::debug!(project = %id, %action, "Lifecycle request");

    let outcome: Result<OperationResult> = match action {
        LifecycleAction::Start => state.orchestrator.start(id).await,
        LifecycleAction::Stop => state.orchestrator.stop(id).await,
        LifecycleAction::Restart => state.orchestrator.restart(id).await,
    };

    let (result, error) = match &outcome {
        Ok(result) => (Some(result.clone()), None),
        Err(e) => (None, Some(e.to_string())),
    };
    state.events.send_project_status(&ProjectStatusEvent {
        project_id: id.to_string(),
        action,
        result,
        error,
        status: state.orchestrator.cached_status(id),
    });

    Ok(HttpResponse::Ok().json(outcome?))
}

pub async fn system_info(state: Data<DashboardState>) -> Result<HttpResponse> {
    let info = state.monitor.detailed_info().await?;
    Ok(HttpResponse::Ok().json(info))
}

pub async fn recent_logs(state: Data<DashboardState>, query: Query<LogQuery>) -> impl Responder {
    let count = query.count.unwrap_or(DEFAULT_LOG_COUNT);
    Json(state.logs.recent_logs(count).await)
}

pub async fn project_logs(
    state: Data<DashboardState>,
    project_id: Path<String>,
    query: Query<LogQuery>,
) -> impl Responder {
    let count = query.count.unwrap_or(DEFAULT_LOG_COUNT);
    Json(state.logs.project_logs(&project_id, count))
}

pub async fn clear_logs(state: Data<DashboardState>) -> Result<HttpResponse> {
    state.logs.clear_logs(None).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub async fn clear_project_logs(
    state: Data<DashboardState>,
    project_id: Path<String>,
) -> Result<HttpResponse> {
    if !state.orchestrator.store().contains(&project_id) {
        return Err(Error::ProjectNotFound(project_id.into_inner()));
    }
    state.logs.clear_logs(Some(project_id.as_str())).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "projectId": project_id.as_str() })))
}

pub async fn health(state: Data<DashboardState>) -> impl Responder {
    Json(json!({
        "status": "ok",
        "projects": state.orchestrator.count(),
        "clients": state.events.client_count(),
        "timestamp": chrono::Utc::now(),
    }))
}

/// SSE stream: `initial-data` for this client, then every broadcast event.
pub async fn events(state: Data<DashboardState>, req: HttpRequest) -> impl Responder {
    let client_id = uuid::Uuid::new_v4();
    tracing::info!(%client_id, peer = ?req.peer_addr(), "Client connected to event stream");

    let mut receiver = state.events.subscribe();

    let initial = InitialData {
        projects: state.orchestrator.list_projects(),
        system_info: state.monitor.current_info().await.ok(),
        logs: state.logs.recent_logs(DEFAULT_LOG_COUNT).await,
    };
    let initial = EventManager::initial_message(&initial);

    let stream = async_stream::stream! {
        if let Some(message) = initial {
            yield Ok::<_, actix_web::Error>(EventManager::format_sse_message(&message));
        }

        loop {
            match receiver.recv().await {
                Ok(msg) => {
                    tracing::trace!(event_type = %msg.event, "Sending SSE event to client");
                    yield Ok::<_, actix_web::Error>(EventManager::format_sse_message(&msg));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%client_id, skipped, "SSE client lagging, dropped events");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!(%client_id, "Event channel closed, ending SSE stream");
                    break;
                }
            }
        }
    };

    HttpResponse::Ok()
        .append_header(("Content-Type", "text/event-stream"))
        .append_header(("Cache-Control", "no-cache"))
        .append_header(("Connection", "keep-alive"))
        .streaming(stream)
}
