pub mod config;
pub mod job;
pub mod ledger;
pub mod metrics;
pub mod orchestrator;
pub mod provider;
pub mod reconciler;
pub mod storage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use job::{Job, JobError, JobGroup, JobState, JobStore, SqliteJobStore};
pub use ledger::{CreditLedger, LedgerError, SqliteCreditLedger};
pub use orchestrator::{DispatchParams, Orchestrator, OrchestratorConfig, OrchestratorError};
pub use provider::{ProviderRegistry, VideoProvider};
pub use reconciler::{ReconcileError, RefreshReport, StatusReconciler};
pub use storage::{resolve_download, ArtifactStorage, DownloadLink, LocalArtifactStorage};
