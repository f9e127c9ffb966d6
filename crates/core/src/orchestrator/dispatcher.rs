//! Generation dispatch: one prompt fanned out to three providers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::job::{CreateJobGroupRequest, JobGroup, JobStore, NewJob};
use crate::metrics;
use crate::provider::{ProviderError, ProviderRegistry, VideoProvider};

use super::strategy::build_requests;
use super::{
    DispatchParams, OrchestratorConfig, OrchestratorError, SubmissionFailure, SubmissionOutcome,
};

/// Dispatches generation requests.
///
/// Every dispatch submits one request per variation concurrently and records
/// the group only if all of them were accepted.
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: Arc<ProviderRegistry>,
    job_store: Arc<dyn JobStore>,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<ProviderRegistry>,
        job_store: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            config,
            registry,
            job_store,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Submit all variations and record the group.
    ///
    /// Fails without recording anything if any submission fails. Tasks already
    /// accepted by other providers in that case are left to run provider-side.
    pub async fn dispatch(
        &self,
        params: &DispatchParams,
        requester_id: &str,
    ) -> Result<JobGroup, OrchestratorError> {
        let outcomes = match self.submit_variations(params).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                let label = match e {
                    OrchestratorError::UnknownProvider(_) => "unknown_provider",
                    _ => "invalid_request",
                };
                metrics::DISPATCHES_TOTAL.with_label_values(&[label]).inc();
                return Err(e);
            }
        };

        let mut jobs = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();

        for outcome in outcomes {
            let variation_index = outcome.strategy.index();
            match outcome.result {
                Ok(task) => jobs.push(NewJob {
                    variation_index,
                    provider: task.provider,
                    provider_task_id: task.task_id,
                    cost_units: self.config.cost_per_scene,
                    provider_cost: task.estimated_cost,
                }),
                Err(error) => failures.push(SubmissionFailure {
                    variation_index,
                    strategy: outcome.strategy,
                    provider: outcome.provider,
                    error,
                }),
            }
        }

        if !failures.is_empty() {
            for failure in &failures {
                warn!(
                    variation = failure.variation_index,
                    provider = %failure.provider,
                    error = %failure.error,
                    "Variation submission failed"
                );
            }
            for orphan in &jobs {
                warn!(
                    provider = %orphan.provider,
                    task_id = %orphan.provider_task_id,
                    "Discarding accepted submission from failed dispatch"
                );
            }
            metrics::DISPATCHES_TOTAL
                .with_label_values(&["submission_failed"])
                .inc();
            return Err(OrchestratorError::Submission { failures });
        }

        let request = CreateJobGroupRequest {
            requester_id: requester_id.to_string(),
            prompt: params.prompt.clone(),
            jobs,
        };

        let group = self.job_store.create_group(request).map_err(|e| {
            error!(error = %e, "Failed to record job group after successful submission");
            metrics::DISPATCHES_TOTAL
                .with_label_values(&["store_failed"])
                .inc();
            OrchestratorError::Store(e)
        })?;

        metrics::DISPATCHES_TOTAL.with_label_values(&["success"]).inc();
        info!(
            parent_id = %group.parent_id,
            requester_id = %group.requester_id,
            total_cost = group.total_cost,
            "Dispatched generation group"
        );

        Ok(group)
    }

    /// Submit one request per variation concurrently and report each outcome.
    ///
    /// All providers are resolved before anything is submitted. Each call has
    /// its own deadline; a slow provider never holds up its siblings' results.
    pub async fn submit_variations(
        &self,
        params: &DispatchParams,
    ) -> Result<Vec<SubmissionOutcome>, OrchestratorError> {
        if params.prompt.trim().is_empty() {
            return Err(OrchestratorError::EmptyPrompt);
        }

        let mut resolved = Vec::new();
        for (strategy, request) in build_requests(params, &self.config) {
            let provider = self
                .registry
                .resolve(strategy.provider())
                .map_err(|_| OrchestratorError::UnknownProvider(strategy.provider().to_string()))?;
            resolved.push((strategy, provider, request));
        }

        let timeout = Duration::from_secs(self.config.submit_timeout_secs);

        let submissions = resolved.into_iter().map(|(strategy, provider, request)| {
            let name = provider.name().to_string();
            let handle = tokio::spawn(submit_timed(provider, request));

            async move {
                // Dropping the handle on timeout detaches the task; the provider call finishes on its own
                let result = match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join_error)) => Err(ProviderError::Transport {
                        provider: name.clone(),
                        message: format!("submission task failed: {}", join_error),
                    }),
                    Err(_) => Err(ProviderError::Timeout {
                        provider: name.clone(),
                    }),
                };

                metrics::PROVIDER_SUBMISSIONS
                    .with_label_values(&[&name, metrics::provider_result_label(&result)])
                    .inc();

                SubmissionOutcome {
                    strategy,
                    provider: name,
                    result,
                }
            }
        });

        Ok(join_all(submissions).await)
    }
}

async fn submit_timed(
    provider: Arc<dyn VideoProvider>,
    request: crate::provider::GenerationRequest,
) -> Result<crate::provider::SubmittedTask, ProviderError> {
    let started = Instant::now();
    let result = provider.submit(&request).await;
    metrics::PROVIDER_CALL_DURATION
        .with_label_values(&[provider.name(), "submit"])
        .observe(started.elapsed().as_secs_f64());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobState, SqliteJobStore};
    use crate::testing::MockProvider;

    struct Fixture {
        orchestrator: Orchestrator,
        luma: Arc<MockProvider>,
        runway: Arc<MockProvider>,
        store: Arc<SqliteJobStore>,
    }

    fn fixture_with(config: OrchestratorConfig) -> Fixture {
        let luma = Arc::new(MockProvider::new("luma"));
        let runway = Arc::new(MockProvider::new("runway"));
        let registry = ProviderRegistry::new()
            .with_provider(luma.clone())
            .with_provider(runway.clone());
        let store = Arc::new(SqliteJobStore::in_memory().unwrap());

        Fixture {
            orchestrator: Orchestrator::new(config, Arc::new(registry), store.clone()),
            luma,
            runway,
            store,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn test_dispatch_creates_three_jobs() {
        let fx = fixture();
        let group = fx
            .orchestrator
            .dispatch(&DispatchParams::new("A cat on a skateboard"), "user-1")
            .await
            .unwrap();

        assert_eq!(group.jobs.len(), 3);
        assert_eq!(group.total_cost, 30);
        assert_eq!(group.prompt, "A cat on a skateboard");

        let providers: Vec<&str> = group.jobs.iter().map(|j| j.provider.as_str()).collect();
        assert_eq!(providers, vec!["luma", "runway", "luma"]);
        assert!(group.jobs.iter().all(|j| j.state == JobState::Pending));
        assert!(group.jobs.iter().all(|j| j.cost_units == 10));

        assert_eq!(fx.luma.submissions().await.len(), 2);
        assert_eq!(fx.runway.submissions().await.len(), 1);

        let stored = fx.store.get_group(&group.parent_id).unwrap().unwrap();
        assert_eq!(stored.jobs.len(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_sends_augmented_prompts() {
        let fx = fixture();
        fx.orchestrator
            .dispatch(
                &DispatchParams::new("A cat").with_style("Noir, grainy film"),
                "user-1",
            )
            .await
            .unwrap();

        let mut luma_prompts: Vec<String> = fx
            .luma
            .submissions()
            .await
            .into_iter()
            .map(|s| s.request.prompt)
            .collect();
        luma_prompts.sort();
        assert_eq!(
            luma_prompts,
            vec![
                "A cat. Cinematic lighting, professional color grading, 24fps film look.",
                "A cat. Wide angle shot, atmospheric depth, slight camera movement.",
            ]
        );

        let runway = fx.runway.submissions().await;
        assert_eq!(runway[0].request.prompt, "A cat. Noir, grainy film");
    }

    #[tokio::test]
    async fn test_one_failed_submission_records_nothing() {
        let fx = fixture();
        fx.runway.set_submit_failure(Some("quota exceeded")).await;

        let result = fx
            .orchestrator
            .dispatch(&DispatchParams::new("A cat"), "user-1")
            .await;

        match result {
            Err(OrchestratorError::Submission { failures }) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].variation_index, 1);
                assert_eq!(failures[0].provider, "runway");
            }
            other => panic!("Expected Submission error, got {:?}", other),
        }

        assert!(fx.store.list_groups("user-1", 10, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_provider_submits_nothing() {
        let luma = Arc::new(MockProvider::new("luma"));
        let registry = ProviderRegistry::new().with_provider(luma.clone());
        let store = Arc::new(SqliteJobStore::in_memory().unwrap());
        let orchestrator =
            Orchestrator::new(OrchestratorConfig::default(), Arc::new(registry), store);

        let result = orchestrator
            .dispatch(&DispatchParams::new("A cat"), "user-1")
            .await;

        assert!(matches!(result, Err(OrchestratorError::UnknownProvider(ref name)) if name == "runway"));
        assert!(luma.submissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let fx = fixture();
        let result = fx
            .orchestrator
            .dispatch(&DispatchParams::new("   "), "user-1")
            .await;

        assert!(matches!(result, Err(OrchestratorError::EmptyPrompt)));
        assert!(fx.luma.submissions().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out_independently() {
        let config = OrchestratorConfig {
            submit_timeout_secs: 2,
            ..OrchestratorConfig::default()
        };
        let fx = fixture_with(config);
        fx.runway.set_submit_delay(Duration::from_secs(30)).await;

        let outcomes = fx
            .orchestrator
            .submit_variations(&DispatchParams::new("A cat"))
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert!(matches!(
            outcomes[1].result,
            Err(ProviderError::Timeout { ref provider }) if provider == "runway"
        ));
        assert!(outcomes[2].is_success());
    }

    #[tokio::test]
    async fn test_total_cost_follows_config() {
        let config = OrchestratorConfig {
            cost_per_scene: 7,
            ..OrchestratorConfig::default()
        };
        let fx = fixture_with(config);

        let group = fx
            .orchestrator
            .dispatch(&DispatchParams::new("A cat"), "user-1")
            .await
            .unwrap();
        assert_eq!(group.total_cost, 21);
    }
}
