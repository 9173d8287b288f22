//! Actix Web server hosting the dashboard API and event stream.

use crate::config::{DEFAULT_WORKERS, ServerSettings};
use crate::dashboard::{DashboardState, handlers};
use crate::error::{Error, Result};

use actix_cors::Cors;
use actix_web::dev::ServerHandle;
use actix_web::{App, HttpServer, middleware, web::Data};

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Handle for a running dashboard server.
pub struct DashboardHandle {
    server: ServerHandle,
    task: Mutex<Option<JoinHandle<()>>>,
    addrs: Vec<SocketAddr>,
}

impl DashboardHandle {
    /// Addresses the server actually bound to.
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Stops accepting connections and waits (bounded) for the server task.
    pub async fn shutdown(&self) {
        tracing::info!("Stopping dashboard server");
        self.server.stop(true).await;

        if let Some(task) = self.task.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(Err(e)) => tracing::warn!(error = %e, "Error while joining dashboard task"),
                Err(_) => tracing::warn!("Timeout waiting for dashboard task to finish"),
                Ok(Ok(())) => {}
            }
        }
        tracing::info!("Dashboard server shut down");
    }
}

/// Dashboard HTTP server.
pub struct DashboardServer;

impl DashboardServer {
    /// Binds and starts the server in a background task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the address is invalid or cannot be bound.
    pub async fn start(state: DashboardState, settings: &ServerSettings) -> Result<DashboardHandle> {
        let addr_str = format!("{}:{}", settings.address, settings.port);
        let addr = addr_str
            .to_socket_addrs()
            .map_err(|e| Error::Io(format!("Failed to parse socket address {}: {}", addr_str, e)))?
            .next()
            .ok_or_else(|| Error::Io(format!("Could not parse socket address: {}", addr_str)))?;

        let state = Data::new(state);
        let workers = settings.workers.unwrap_or(DEFAULT_WORKERS);
        tracing::info!(address = %addr_str, workers, "Starting dashboard server");

        let server = HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(middleware::Logger::default())
                .wrap(cors)
                .app_data(state.clone())
                .configure(handlers::configure)
        })
        .workers(workers)
        .bind(addr)
        .map_err(|e| Error::Io(format!("Failed to bind {}: {}", addr, e)))?;

        let addrs = server.addrs();
        let server = server.run();
        let handle = server.handle();

        let task = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::error!(error = %e, "Dashboard server error");
            }
        });

        tracing::info!(addrs = ?addrs, "Dashboard server started");
        Ok(DashboardHandle {
            server: handle,
            task: Mutex::new(Some(task)),
            addrs,
        })
    }
}
