use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triptych_core::{
    load_config, validate_config, ArtifactStorage, CreditLedger, JobStore, LocalArtifactStorage,
    Orchestrator, ProviderRegistry, SqliteCreditLedger, SqliteJobStore, StatusReconciler,
};
use triptych_server::api::create_router;
use triptych_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TRIPTYCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Stores
    // Claims outlive the longest possible ingest
    let claim_lease = Duration::from_secs(config.storage.ingest_timeout_secs as u64 + 60);
    let job_store: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::new(&config.database.path)
            .context("Failed to create job store")?
            .with_claim_lease(claim_lease),
    );
    let ledger: Arc<dyn CreditLedger> = Arc::new(
        SqliteCreditLedger::new(&config.database.path, config.credits.initial_balance)
            .context("Failed to create credit ledger")?,
    );
    info!("Job store and credit ledger initialized");

    // Durable artifact storage
    let local_files = Arc::new(
        LocalArtifactStorage::new(&config.storage).context("Failed to create artifact storage")?,
    );
    let storage: Arc<dyn ArtifactStorage> = local_files.clone();
    info!("Artifact storage at {:?}", local_files.root());

    // Provider adapters
    let registry = Arc::new(
        ProviderRegistry::from_config(&config.providers)
            .context("Failed to initialize video providers")?,
    );
    info!("Registered providers: {}", registry.names().join(", "));

    let orchestrator = Arc::new(Orchestrator::new(
        config.orchestrator.clone(),
        Arc::clone(&registry),
        Arc::clone(&job_store),
    ));
    let reconciler = StatusReconciler::new(
        registry,
        Arc::clone(&job_store),
        storage.clone(),
        Duration::from_secs(config.orchestrator.status_timeout_secs),
    );

    let (shutdown_tx, _) = broadcast::channel(1);

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        job_store,
        ledger,
        storage,
        Some(local_files),
        orchestrator,
        reconciler,
        shutdown_tx.clone(),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then stop background watches.
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    // No receivers just means no watch is running
    let _ = shutdown_tx.send(());
}
