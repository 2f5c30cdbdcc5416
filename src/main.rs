// Main entry point - Dependency injection and scheduler lifecycle
mod application;
mod domain;
mod infrastructure;

use std::sync::Arc;

use anyhow::Context;

use crate::application::clock::SystemClock;
use crate::application::device_sync_service::DeviceSyncService;
use crate::application::discovery_service::DiscoveryService;
use crate::application::scheduler::SyncScheduler;
use crate::application::sync_orchestrator::SyncOrchestrator;
use crate::infrastructure::config::{load_app_config, AppConfig};
use crate::infrastructure::credentials::{
    ServiceAccount, ServiceAccountTokenProvider, StaticTokenProvider, TokenProvider,
};
use crate::infrastructure::firestore_repository::FirestoreRepository;
use crate::infrastructure::realtime_repository::RealtimeDatabaseRepository;
use crate::infrastructure::tracing_init::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_app_config().context("Failed to load configuration")?;

    // Initialize tracing
    init_tracing(&config.logging)?;
    tracing::info!(service = "tanklens-sync", "Starting TankLens data sync server");

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    // Credentials are fatal before anything is scheduled
    let (tokens, project_id) = match build_token_provider(&config, http.clone()) {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Failed to initialize Firebase. Exiting.");
            return Err(e);
        }
    };
    tracing::info!(project_id = %project_id, "Firebase initialized successfully");

    // Create repositories (infrastructure layer)
    let realtime = Arc::new(RealtimeDatabaseRepository::new(
        http.clone(),
        config.firebase.database_url.clone(),
        tokens.clone(),
    ));
    let documents = Arc::new(FirestoreRepository::new(
        http,
        config.firebase.firestore_base_url.clone(),
        project_id,
        tokens,
    ));

    // Create services (application layer)
    let discovery = DiscoveryService::new(documents.clone());
    let clock = Arc::new(SystemClock);
    let device_sync = DeviceSyncService::new(realtime, documents, clock.clone());
    let orchestrator = Arc::new(SyncOrchestrator::new(discovery, device_sync, config.sync.concurrency));

    let mut scheduler = SyncScheduler::new(orchestrator, config.sync_interval(), clock);
    scheduler.start()?;

    shutdown_signal().await;
    tracing::info!("Received shutdown signal");

    scheduler.shutdown().await;
    tracing::info!("Scheduler shut down. Exiting application.");
    Ok(())
}

fn build_token_provider(
    config: &AppConfig,
    http: reqwest::Client,
) -> anyhow::Result<(Arc<dyn TokenProvider>, String)> {
    if let Some(token) = &config.firebase.access_token {
        let project_id = config
            .firebase
            .project_id
            .clone()
            .context("project_id must be set when using a static access token")?;
        return Ok((Arc::new(StaticTokenProvider::new(token.clone())), project_id));
    }

    let account = ServiceAccount::from_file(&config.firebase.credentials_path)?;
    let project_id = config
        .firebase
        .project_id
        .clone()
        .unwrap_or_else(|| account.project_id.clone());
    let provider = ServiceAccountTokenProvider::new(account, http)?;
    Ok((Arc::new(provider), project_id))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
