//! Mock artifact storage for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::storage::{ArtifactStorage, DurableRef, LocalArtifactStorage, SignedUrl, StorageError};

/// A recorded ingest call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedIngest {
    pub url: String,
    pub owner_id: String,
    pub job_id: String,
}

/// Mock implementation of the ArtifactStorage trait.
///
/// Keys follow the same layout as the local backend. Nothing is written anywhere.
#[derive(Debug)]
pub struct MockStorage {
    ingested: Arc<RwLock<Vec<RecordedIngest>>>,
    fail_ingest: Arc<RwLock<bool>>,
    fail_signing: Arc<RwLock<bool>>,
    ingest_delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            ingested: Arc::new(RwLock::new(Vec::new())),
            fail_ingest: Arc::new(RwLock::new(false)),
            fail_signing: Arc::new(RwLock::new(false)),
            ingest_delay: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all recorded ingest calls.
    pub async fn ingested(&self) -> Vec<RecordedIngest> {
        self.ingested.read().await.clone()
    }

    pub async fn ingest_count(&self) -> usize {
        self.ingested.read().await.len()
    }

    /// Make ingests fail with a download error.
    pub async fn set_fail_ingest(&self, fail: bool) {
        *self.fail_ingest.write().await = fail;
    }

    pub async fn set_fail_signing(&self, fail: bool) {
        *self.fail_signing.write().await = fail;
    }

    pub async fn set_ingest_delay(&self, delay: Duration) {
        *self.ingest_delay.write().await = Some(delay);
    }
}

#[async_trait]
impl ArtifactStorage for MockStorage {
    async fn ingest_from_url(
        &self,
        url: &str,
        owner_id: &str,
        job_id: &str,
    ) -> Result<DurableRef, StorageError> {
        self.ingested.write().await.push(RecordedIngest {
            url: url.to_string(),
            owner_id: owner_id.to_string(),
            job_id: job_id.to_string(),
        });

        let delay = *self.ingest_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.fail_ingest.read().await {
            return Err(StorageError::Download {
                url: url.to_string(),
                message: "mock ingest failure".to_string(),
            });
        }

        let key = LocalArtifactStorage::key_for(owner_id, job_id);
        Ok(DurableRef {
            url: format!("https://storage.test/{}", key),
            key,
        })
    }

    async fn sign_download_url(
        &self,
        durable_ref: &DurableRef,
        ttl_secs: u64,
    ) -> Result<SignedUrl, StorageError> {
        if *self.fail_signing.read().await {
            return Err(StorageError::Signing("mock signing failure".to_string()));
        }

        Ok(SignedUrl {
            url: format!(
                "https://storage.test/{}?expires_in={}",
                durable_ref.key, ttl_secs
            ),
            expires_in: ttl_secs,
        })
    }
}
