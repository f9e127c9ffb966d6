//! Generation lifecycle integration tests.
//!
//! These tests drive the orchestrator and reconciler against a file-backed
//! SQLite store with mock providers and storage:
//! - All-or-nothing group creation
//! - Forward-only state transitions across repeated refreshes
//! - Exactly-once migration
//! - Per-job failure isolation
//! - Download resolution

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use triptych_core::{
    job::{JobState, JobStore, SqliteJobStore},
    orchestrator::{DispatchParams, Orchestrator, OrchestratorConfig, OrchestratorError},
    provider::{ProviderError, ProviderRegistry, ProviderStatus, ReportedState},
    reconciler::{RefreshOutcome, StatusReconciler},
    storage::{resolve_download, DownloadLink},
    testing::{MockProvider, MockStorage},
    JobGroup,
};

/// Test helper wiring the orchestrator and reconciler to shared mocks.
struct TestHarness {
    orchestrator: Orchestrator,
    reconciler: StatusReconciler,
    luma: Arc<MockProvider>,
    runway: Arc<MockProvider>,
    storage: Arc<MockStorage>,
    job_store: Arc<SqliteJobStore>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let job_store =
            Arc::new(SqliteJobStore::new(&db_path).expect("Failed to create job store"));
        let luma = Arc::new(MockProvider::new("luma"));
        let runway = Arc::new(MockProvider::new("runway"));
        let storage = Arc::new(MockStorage::new());
        let registry = Arc::new(
            ProviderRegistry::new()
                .with_provider(luma.clone())
                .with_provider(runway.clone()),
        );

        let orchestrator = Orchestrator::new(
            OrchestratorConfig::default(),
            registry.clone(),
            job_store.clone(),
        );
        let reconciler = StatusReconciler::new(
            registry,
            job_store.clone(),
            storage.clone(),
            Duration::from_secs(5),
        );

        Self {
            orchestrator,
            reconciler,
            luma,
            runway,
            storage,
            job_store,
            _temp_dir: temp_dir,
        }
    }

    async fn dispatch(&self, prompt: &str) -> JobGroup {
        self.orchestrator
            .dispatch(&DispatchParams::new(prompt), "user-1")
            .await
            .expect("dispatch failed")
    }

    fn provider_for(&self, name: &str) -> &MockProvider {
        match name {
            "luma" => self.luma.as_ref(),
            "runway" => self.runway.as_ref(),
            other => panic!("unexpected provider {}", other),
        }
    }

    async fn set_state(&self, group: &JobGroup, variation: usize, state: JobState, progress: u8) {
        let job = &group.jobs[variation];
        self.provider_for(&job.provider)
            .set_state(&job.provider_task_id, state, progress)
            .await;
    }

    async fn complete(&self, group: &JobGroup, variation: usize, url: &str) {
        let job = &group.jobs[variation];
        self.provider_for(&job.provider)
            .set_status(
                &job.provider_task_id,
                ProviderStatus::new(ReportedState::Known(JobState::Completed)).with_url(url),
            )
            .await;
    }
}

#[tokio::test]
async fn test_dispatch_creates_full_group() {
    let harness = TestHarness::new();

    let group = harness.dispatch("a cat on a skateboard").await;

    assert_eq!(group.jobs.len(), 3);
    let indices: Vec<u8> = group.jobs.iter().map(|j| j.variation_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    let providers: Vec<&str> = group.jobs.iter().map(|j| j.provider.as_str()).collect();
    assert_eq!(providers, vec!["luma", "runway", "luma"]);
    assert!(group.jobs.iter().all(|j| j.state == JobState::Pending));
    assert_eq!(group.total_cost, 30);

    let stored = harness
        .job_store
        .get_group(&group.jobs[1].id)
        .unwrap()
        .expect("group lookup by job id");
    assert_eq!(stored.parent_id, group.parent_id);
}

#[tokio::test]
async fn test_unsupported_request_never_persists_partial_group() {
    let harness = TestHarness::new();
    harness
        .runway
        .set_next_error(ProviderError::UnsupportedRequest(
            "runway requires an input image".to_string(),
        ))
        .await;

    let result = harness
        .orchestrator
        .dispatch(&DispatchParams::new("a cat"), "user-1")
        .await;

    match result {
        Err(e @ OrchestratorError::Submission { .. }) => assert!(e.is_caller_error()),
        other => panic!("Expected Submission error, got {:?}", other),
    }
    assert!(harness
        .job_store
        .list_groups("user-1", 10, 0)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_states_only_move_forward() {
    let harness = TestHarness::new();
    let group = harness.dispatch("a lighthouse").await;

    let script = [
        (JobState::Processing, 20),
        (JobState::Pending, 0),
        (JobState::Processing, 60),
        (JobState::Completed, 100),
        (JobState::Processing, 80),
        (JobState::Failed, 0),
    ];

    let mut observed = vec![JobState::Pending];
    for (state, progress) in script {
        harness.set_state(&group, 0, state, progress).await;
        let (refreshed, _) = harness
            .reconciler
            .refresh_group(&group.parent_id)
            .await
            .unwrap();
        let current = refreshed.jobs[0].state;
        if observed.last() != Some(&current) {
            observed.push(current);
        }
    }

    assert_eq!(
        observed,
        vec![JobState::Pending, JobState::Processing, JobState::Completed]
    );
}

#[tokio::test]
async fn test_completed_job_migrated_exactly_once() {
    let harness = TestHarness::new();
    let group = harness.dispatch("a lighthouse").await;
    harness.complete(&group, 0, "https://cdn.luma.test/a.mp4").await;

    let refreshes = (0..5).map(|_| harness.reconciler.refresh_group(&group.parent_id));
    let results = futures::future::join_all(refreshes).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let (refreshed, report) = harness
        .reconciler
        .refresh_group(&group.parent_id)
        .await
        .unwrap();
    assert_eq!(report.migrations(), 0);
    assert_eq!(harness.storage.ingest_count().await, 1);

    let ingested = harness.storage.ingested().await;
    assert_eq!(ingested[0].url, "https://cdn.luma.test/a.mp4");
    assert_eq!(ingested[0].owner_id, "user-1");
    assert_eq!(ingested[0].job_id, group.jobs[0].id);
    assert!(refreshed.jobs[0].durable_ref.is_some());
}

#[tokio::test]
async fn test_transport_error_isolated_to_one_job() {
    let harness = TestHarness::new();
    let group = harness.dispatch("a lighthouse").await;

    harness.set_state(&group, 0, JobState::Processing, 30).await;
    harness
        .runway
        .set_status_failure(&group.jobs[1].provider_task_id, Some("connection reset"))
        .await;
    harness.complete(&group, 2, "https://cdn.luma.test/c.mp4").await;

    let (refreshed, report) = harness
        .reconciler
        .refresh_group(&group.parent_id)
        .await
        .unwrap();

    assert_eq!(refreshed.jobs[0].state, JobState::Processing);
    assert_eq!(refreshed.jobs[1].state, JobState::Pending);
    assert_eq!(refreshed.jobs[2].state, JobState::Completed);

    assert!(report.jobs[1].outcome.is_failed());
    let errors = report.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, group.jobs[1].id);
    assert!(errors[0].1.contains("connection reset"));
}

#[tokio::test]
async fn test_download_prefers_durable_copy() {
    let harness = TestHarness::new();
    let group = harness.dispatch("a lighthouse").await;
    harness.complete(&group, 0, "https://cdn.luma.test/a.mp4").await;
    harness.complete(&group, 1, "https://cdn.runway.test/b.mp4").await;
    harness.storage.set_fail_ingest(true).await;
    harness
        .reconciler
        .refresh_group(&group.parent_id)
        .await
        .unwrap();

    // Neither was migrated; retry only succeeds for the first
    harness.storage.set_fail_ingest(false).await;
    harness
        .reconciler
        .refresh(vec![harness
            .job_store
            .get_job(&group.jobs[0].id)
            .unwrap()
            .unwrap()])
        .await;

    let signed = resolve_download(
        harness.job_store.as_ref(),
        harness.storage.as_ref(),
        &group.jobs[0].id,
        "user-1",
        900,
    )
    .await
    .unwrap();
    assert!(matches!(signed, DownloadLink::Signed { expires_in: 900, .. }));

    let fallback = resolve_download(
        harness.job_store.as_ref(),
        harness.storage.as_ref(),
        &group.jobs[1].id,
        "user-1",
        900,
    )
    .await
    .unwrap();
    assert_eq!(fallback.url(), "https://cdn.runway.test/b.mp4");
    assert_eq!(fallback.expires_in(), None);
}

#[tokio::test]
async fn test_unknown_state_keeps_job_pending() {
    let harness = TestHarness::new();
    let group = harness.dispatch("a lighthouse").await;
    let job = &group.jobs[1];
    harness
        .runway
        .set_status(
            &job.provider_task_id,
            ProviderStatus::new(ReportedState::Unknown("QUEUED_V2".to_string())),
        )
        .await;

    let (refreshed, report) = harness
        .reconciler
        .refresh_group(&group.parent_id)
        .await
        .unwrap();

    assert_eq!(refreshed.jobs[1].state, JobState::Pending);
    assert!(matches!(
        report.jobs[1].outcome,
        RefreshOutcome::UnknownState { .. }
    ));
    assert!(report.errors().is_empty());
}
