use std::sync::Arc;

use tokio::sync::broadcast;
use triptych_core::{
    ArtifactStorage, Config, CreditLedger, JobStore, LocalArtifactStorage, Orchestrator,
    SanitizedConfig, StatusReconciler,
};

/// Shared application state
pub struct AppState {
    config: Config,
    job_store: Arc<dyn JobStore>,
    ledger: Arc<dyn CreditLedger>,
    storage: Arc<dyn ArtifactStorage>,
    /// Set when artifacts live on local disk and are served by this process.
    local_files: Option<Arc<LocalArtifactStorage>>,
    orchestrator: Arc<Orchestrator>,
    reconciler: StatusReconciler,
    shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        job_store: Arc<dyn JobStore>,
        ledger: Arc<dyn CreditLedger>,
        storage: Arc<dyn ArtifactStorage>,
        local_files: Option<Arc<LocalArtifactStorage>>,
        orchestrator: Arc<Orchestrator>,
        reconciler: StatusReconciler,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            config,
            job_store,
            ledger,
            storage,
            local_files,
            orchestrator,
            reconciler,
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn job_store(&self) -> &dyn JobStore {
        self.job_store.as_ref()
    }

    pub fn ledger(&self) -> &dyn CreditLedger {
        self.ledger.as_ref()
    }

    pub fn storage(&self) -> &dyn ArtifactStorage {
        self.storage.as_ref()
    }

    pub fn local_files(&self) -> Option<&LocalArtifactStorage> {
        self.local_files.as_deref()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn reconciler(&self) -> &StatusReconciler {
        &self.reconciler
    }

    /// Receiver that fires when the server begins shutting down.
    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}
