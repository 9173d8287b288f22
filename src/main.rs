use anyhow::Context;
use clap::Parser;
use deploy_manager::DeployManager;
use deploy_manager::config::{ConfigStore, Settings};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// Local dashboard for starting, stopping and monitoring services.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CommandArgs {
    /// Settings file (server, monitoring, lifecycle, logs)
    #[arg(short, long, env = "DEPLOY_MANAGER_CONFIG", default_value = "config/config.json")]
    config: PathBuf,

    /// Project catalogue (.json, .yaml or .yml)
    #[arg(long, env = "DEPLOY_MANAGER_PROJECTS", default_value = "config/projects.json")]
    projects: PathBuf,

    /// Dashboard port, overrides the settings file
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Dashboard bind address, overrides the settings file
    #[arg(short = 'a', long, env = "ADDRESS")]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let args = CommandArgs::parse();

    let mut settings = Settings::load_or_default(&args.config);
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(address) = args.address {
        settings.server.address = address;
    }

    let store = ConfigStore::load_or_empty(&args.projects);
    info!(projects = store.len(), "Project catalogue loaded");

    let mut manager = DeployManager::new(settings, store).await;
    manager.initial_sweep().await;
    manager
        .start()
        .await
        .context("Failed to start the dashboard")?;

    for addr in manager.local_addrs() {
        info!("Dashboard listening on http://{}", addr);
    }
    info!(
        "Events stream: GET http://{}:{}/events",
        manager.settings().server.address,
        manager.settings().server.port
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Received Ctrl-C, shutting down");

    manager.shutdown().await;
    Ok(())
}
