//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with mock providers and storage injected, backed by SQLite in a temp dir.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tower::ServiceExt;

use triptych_core::{
    config::{
        CreditsConfig, DatabaseConfig, ProvidersConfig, ServerConfig, StorageConfig,
    },
    testing::{MockProvider, MockStorage},
    Config, LocalArtifactStorage, Orchestrator, OrchestratorConfig, ProviderRegistry,
    SqliteCreditLedger, SqliteJobStore, StatusReconciler,
};

/// Base URL the local file storage signs links against.
pub const FILES_BASE_URL: &str = "http://localhost/files";

/// Requester id sent by default in test requests.
pub const TEST_REQUESTER: &str = "user-1";

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_generate() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/videos/generate", json!({
///         "prompt": "a cat on a skateboard"
///     })).await;
///
///     assert_eq!(response.status, StatusCode::OK);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub luma: Arc<MockProvider>,
    pub runway: Arc<MockProvider>,
    pub storage: Arc<MockStorage>,
    /// Backs the signed `/files` route
    pub local_files: Arc<LocalArtifactStorage>,
    pub job_store: Arc<SqliteJobStore>,
    pub shutdown_tx: broadcast::Sender<()>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            credits: CreditsConfig {
                initial_balance: test_config.initial_balance,
            },
            orchestrator: OrchestratorConfig {
                watch_interval_ms: test_config.watch_interval_ms,
                ..OrchestratorConfig::default()
            },
            storage: StorageConfig {
                root: temp_dir.path().join("videos"),
                public_base_url: FILES_BASE_URL.to_string(),
                signing_secret: "test-secret".to_string(),
                signed_url_ttl_secs: 3600,
                ingest_timeout_secs: 10,
            },
            providers: ProvidersConfig::default(),
        };

        let local_files = Arc::new(
            LocalArtifactStorage::new(&config.storage).expect("Failed to create local storage"),
        );
        let luma = Arc::new(MockProvider::new("luma"));
        let runway = Arc::new(MockProvider::new("runway"));
        let storage = Arc::new(MockStorage::new());
        let registry = Arc::new(
            ProviderRegistry::new()
                .with_provider(luma.clone())
                .with_provider(runway.clone()),
        );

        let job_store =
            Arc::new(SqliteJobStore::new(&db_path).expect("Failed to create job store"));
        let ledger = Arc::new(
            SqliteCreditLedger::new(&db_path, test_config.initial_balance)
                .expect("Failed to create ledger"),
        );

        let orchestrator = Arc::new(Orchestrator::new(
            config.orchestrator.clone(),
            registry.clone(),
            job_store.clone(),
        ));
        let reconciler = StatusReconciler::new(
            registry,
            job_store.clone(),
            storage.clone(),
            Duration::from_secs(5),
        );
        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(triptych_server::state::AppState::new(
            config,
            job_store.clone(),
            ledger,
            storage.clone(),
            Some(local_files.clone()),
            orchestrator,
            reconciler,
            shutdown_tx.clone(),
        ));

        Self {
            router: triptych_server::api::create_router(state),
            luma,
            runway,
            storage,
            local_files,
            job_store,
            shutdown_tx,
            temp_dir,
        }
    }

    /// Send a GET request as the default requester.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, Some(TEST_REQUESTER)).await
    }

    /// Send a GET request as `requester`.
    pub async fn get_as(&self, path: &str, requester: &str) -> TestResponse {
        self.request("GET", path, None, Some(requester)).await
    }

    /// Send a GET request with extra headers.
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut request_builder = Request::builder().method("GET").uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }
        self.send(request_builder.body(Body::empty()).unwrap()).await
    }

    /// Send a POST request with JSON body as the default requester.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), Some(TEST_REQUESTER))
            .await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .header("X-Requester-Id", TEST_REQUESTER)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request, optionally identifying the requester.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        requester: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        if let Some(requester) = requester {
            request_builder = request_builder.header("X-Requester-Id", requester);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into()))
        };

        TestResponse { status, body }
    }

    /// Script the provider status of one scene from a generate response.
    pub async fn complete_scene(&self, scene: &Value, url: &str) {
        use triptych_core::job::JobState;
        use triptych_core::provider::{ProviderStatus, ReportedState};

        let provider = match scene["provider"].as_str() {
            Some("luma") => &self.luma,
            Some("runway") => &self.runway,
            other => panic!("unexpected provider {:?}", other),
        };
        provider
            .set_status(
                scene["task_id"].as_str().expect("task_id"),
                ProviderStatus::new(ReportedState::Known(JobState::Completed)).with_url(url),
            )
            .await;
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub initial_balance: u64,
    /// Background watch interval; 0 disables it.
    pub watch_interval_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            initial_balance: 100,
            watch_interval_ms: 0,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
