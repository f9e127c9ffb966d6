//! Status reconciliation: pull provider state into stored jobs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::job::{Job, JobError, JobGroup, JobStore, StatusUpdate};
use crate::metrics;
use crate::provider::{ProviderError, ProviderRegistry, ProviderStatus, ReportedState, VideoProvider};
use crate::storage::ArtifactStorage;

use super::{
    JobRefresh, MigrationResult, MigrationStatus, MigrationTrigger, ReconcileError,
    RefreshOutcome, RefreshReport,
};

/// Extra polls a watch spends retrying migrations once every job is terminal.
const MIGRATION_RETRY_ROUNDS: u32 = 3;

/// Queries providers for non-terminal jobs and applies the answers.
///
/// State only moves forward. Unknown provider states and regressions leave
/// the job untouched. Completed jobs are handed to the migration trigger.
#[derive(Clone)]
pub struct StatusReconciler {
    registry: Arc<ProviderRegistry>,
    job_store: Arc<dyn JobStore>,
    migration: MigrationTrigger,
    status_timeout: Duration,
}

impl StatusReconciler {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        job_store: Arc<dyn JobStore>,
        storage: Arc<dyn ArtifactStorage>,
        status_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            migration: MigrationTrigger::new(job_store.clone(), storage),
            job_store,
            status_timeout,
        }
    }

    /// Refresh a set of jobs concurrently.
    ///
    /// Each job runs in its own task, so a caller that stops waiting does not
    /// abort in-flight queries or migrations. Failures are reported per job.
    pub async fn refresh(&self, jobs: Vec<Job>) -> RefreshReport {
        let tasks = jobs.into_iter().map(|job| {
            let reconciler = self.clone();
            let fallback = job.clone();
            let handle = tokio::spawn(async move { reconciler.refresh_job(job).await });
            async move {
                match handle.await {
                    Ok(refresh) => refresh,
                    Err(e) => JobRefresh::new(
                        fallback,
                        RefreshOutcome::Failed(ReconcileError::TaskFailed(e.to_string())),
                    ),
                }
            }
        });

        RefreshReport {
            jobs: join_all(tasks).await,
        }
    }

    /// Refresh every job of a group, looked up by parent id or any job id.
    pub async fn refresh_group(
        &self,
        id: &str,
    ) -> Result<(JobGroup, RefreshReport), ReconcileError> {
        let mut group = self
            .job_store
            .get_group(id)?
            .ok_or_else(|| ReconcileError::NotFound(id.to_string()))?;

        let jobs = std::mem::take(&mut group.jobs);
        let report = self.refresh(jobs).await;
        group.jobs = report.jobs().into_iter().cloned().collect();
        Ok((group, report))
    }

    /// Poll a group until it is settled or shutdown is signalled.
    ///
    /// A group is settled once every job is terminal and every completed job
    /// has been migrated. Failed migrations get a few more polls before the
    /// watch gives up and leaves them to later status requests.
    ///
    /// Returns the jobs as of the last refresh.
    pub async fn watch(
        &self,
        id: &str,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<Vec<Job>, ReconcileError> {
        debug!(id, "Watching job group");
        let mut retry_rounds = 0;
        loop {
            let (group, report) = self.refresh_group(id).await?;
            if group.is_settled() {
                info!(parent_id = %group.parent_id, "Job group finished");
                return Ok(group.jobs);
            }
            if report.all_terminal() {
                retry_rounds += 1;
                if retry_rounds > MIGRATION_RETRY_ROUNDS {
                    warn!(parent_id = %group.parent_id, "Job group finished with unmigrated artifacts");
                    return Ok(group.jobs);
                }
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!(parent_id = %group.parent_id, "Watch received shutdown signal");
                    return Ok(group.jobs);
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    async fn refresh_job(&self, job: Job) -> JobRefresh {
        if job.state.is_terminal() {
            let mut refresh = JobRefresh::new(job, RefreshOutcome::Skipped);
            self.migrate_if_needed(&mut refresh).await;
            return refresh;
        }

        let provider = match self.registry.resolve(&job.provider) {
            Ok(provider) => provider,
            Err(_) => {
                warn!(job_id = %job.id, provider = %job.provider, "Job references unregistered provider");
                let provider = job.provider.clone();
                return JobRefresh::new(
                    job,
                    RefreshOutcome::Failed(ReconcileError::UnknownProvider(provider)),
                );
            }
        };

        let status = match self.query(provider.as_ref(), &job.provider_task_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(job_id = %job.id, provider = %job.provider, error = %e, "Status query failed");
                return JobRefresh::new(job, RefreshOutcome::Failed(ReconcileError::Provider(e)));
            }
        };

        let mut refresh = self.apply(job, status);
        self.migrate_if_needed(&mut refresh).await;
        refresh
    }

    async fn query(
        &self,
        provider: &dyn VideoProvider,
        task_id: &str,
    ) -> Result<ProviderStatus, ProviderError> {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.status_timeout, provider.query_status(task_id)).await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: provider.name().to_string(),
            }),
        };

        metrics::STATUS_QUERIES
            .with_label_values(&[provider.name(), metrics::provider_result_label(&result)])
            .inc();
        metrics::PROVIDER_CALL_DURATION
            .with_label_values(&[provider.name(), "status"])
            .observe(started.elapsed().as_secs_f64());
        result
    }

    /// Apply a provider status to a job according to the lifecycle rules.
    fn apply(&self, job: Job, status: ProviderStatus) -> JobRefresh {
        let next = match &status.state {
            ReportedState::Known(state) => *state,
            ReportedState::Unknown(raw) => {
                warn!(
                    job_id = %job.id,
                    provider = %job.provider,
                    reported = %raw,
                    "Provider reported an unmapped state, leaving job unchanged"
                );
                metrics::UNKNOWN_PROVIDER_STATES
                    .with_label_values(&[job.provider.as_str()])
                    .inc();
                let reported = raw.clone();
                return JobRefresh::new(job, RefreshOutcome::UnknownState { reported });
            }
        };

        let from = job.state;
        if next != from && !from.can_transition_to(next) {
            debug!(job_id = %job.id, from = %from, to = %next, "Ignoring state regression");
            return JobRefresh::new(job, RefreshOutcome::Unchanged);
        }

        if next == from && !has_new_details(&job, &status) {
            return JobRefresh::new(job, RefreshOutcome::Unchanged);
        }

        let update = StatusUpdate {
            state: next,
            progress: status.progress,
            provider_url: status.url,
            thumbnail_url: status.thumbnail_url,
            failure_reason: status.failure_reason,
        };

        match self.job_store.update_status(&job.id, &update) {
            Ok(updated) if next == from => {
                let progress = updated.progress;
                JobRefresh::new(updated, RefreshOutcome::ProgressUpdated { progress })
            }
            Ok(updated) => {
                info!(job_id = %updated.id, from = %from, to = %next, "Job state changed");
                metrics::JOB_TRANSITIONS
                    .with_label_values(&[next.as_str()])
                    .inc();
                JobRefresh::new(updated, RefreshOutcome::Transitioned { from, to: next })
            }
            Err(JobError::InvalidTransition { .. }) => {
                // A concurrent refresh moved the job first
                let current = self.job_store.get_job(&job.id).ok().flatten().unwrap_or(job);
                JobRefresh::new(current, RefreshOutcome::Unchanged)
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Failed to store job status");
                JobRefresh::new(job, RefreshOutcome::Failed(ReconcileError::Store(e)))
            }
        }
    }

    async fn migrate_if_needed(&self, refresh: &mut JobRefresh) {
        if !refresh.job.needs_migration() {
            return;
        }

        refresh.migration = Some(match self.migration.migrate(&refresh.job).await {
            Ok(MigrationResult::Migrated(job)) => {
                refresh.job = job;
                MigrationStatus::Migrated
            }
            Ok(MigrationResult::AlreadyClaimed) => MigrationStatus::AlreadyClaimed,
            Err(e) => MigrationStatus::Failed(e),
        });
    }
}

/// Returns true if the status carries progress or URLs the job doesn't have yet.
fn has_new_details(job: &Job, status: &ProviderStatus) -> bool {
    status.progress != job.progress
        || (status.url.is_some() && status.url != job.provider_url)
        || (status.thumbnail_url.is_some() && status.thumbnail_url != job.thumbnail_url)
}
