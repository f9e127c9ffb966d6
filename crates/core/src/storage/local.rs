//! Filesystem-backed artifact storage with signed download URLs.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::config::StorageConfig;

use super::{ArtifactStorage, DurableRef, SignedUrl, StorageError};

type HmacSha256 = Hmac<Sha256>;

/// Stores artifacts under a local directory and signs URLs for them.
///
/// Signed URLs have the form `{public_base_url}/{key}?expires=..&signature=..`
/// where the signature is hex HMAC-SHA-256 of `key:expires` keyed by the
/// signing secret.
pub struct LocalArtifactStorage {
    client: Client,
    root: PathBuf,
    public_base_url: String,
    signing_secret: String,
}

impl LocalArtifactStorage {
    /// Create storage from config.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.signing_secret.is_empty() {
            return Err(StorageError::Configuration(
                "signing secret cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.ingest_timeout_secs as u64))
            .build()
            .map_err(|e| StorageError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            root: config.root.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            signing_secret: config.signing_secret.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Storage key for a job's artifact.
    pub fn key_for(owner_id: &str, job_id: &str) -> String {
        format!(
            "videos/{}/{}.mp4",
            sanitize_segment(owner_id),
            sanitize_segment(job_id)
        )
    }

    /// Map a key to its file path. Returns None for keys escaping the root.
    pub fn path_for(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }

    fn public_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.public_base_url, encoded.join("/"))
    }

    fn mac(&self, key: &str, expires: i64) -> Result<HmacSha256, StorageError> {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .map_err(|e| StorageError::Signing(e.to_string()))?;
        mac.update(key.as_bytes());
        mac.update(b":");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    fn signature(&self, key: &str, expires: i64) -> Result<String, StorageError> {
        Ok(hex::encode(self.mac(key, expires)?.finalize().into_bytes()))
    }

    /// Check a signed URL's parameters for `key` at the current time.
    ///
    /// The comparison is constant-time.
    pub fn verify_signature(&self, key: &str, expires: i64, signature: &str) -> bool {
        if expires < Utc::now().timestamp() {
            return false;
        }
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        self.mac(key, expires)
            .map(|mac| mac.verify_slice(&provided).is_ok())
            .unwrap_or(false)
    }

    async fn download_to(&self, url: &str, destination: &Path) -> Result<u64, StorageError> {
        let download_err = |message: String| StorageError::Download {
            url: url.to_string(),
            message,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file so a partial download never sits at the final key
        let partial = destination.with_extension("mp4.part");
        let mut writer = BufWriter::new(File::create(&partial).await?);
        let mut total_bytes = 0u64;

        let copy_result: Result<(), StorageError> = async {
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| download_err(e.to_string()))?
            {
                writer.write_all(&chunk).await?;
                total_bytes += chunk.len() as u64;
            }
            writer.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = copy_result {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }

        fs::rename(&partial, destination).await?;
        Ok(total_bytes)
    }
}

#[async_trait]
impl ArtifactStorage for LocalArtifactStorage {
    async fn ingest_from_url(
        &self,
        url: &str,
        owner_id: &str,
        job_id: &str,
    ) -> Result<DurableRef, StorageError> {
        let key = Self::key_for(owner_id, job_id);
        let destination = self
            .path_for(&key)
            .ok_or_else(|| StorageError::Configuration(format!("invalid storage key: {}", key)))?;

        debug!(url = %url, key = %key, "Ingesting artifact");
        let bytes = self.download_to(url, &destination).await?;
        info!(key = %key, bytes, "Artifact stored");

        Ok(DurableRef {
            url: self.public_url(&key),
            key,
        })
    }

    async fn sign_download_url(
        &self,
        durable_ref: &DurableRef,
        ttl_secs: u64,
    ) -> Result<SignedUrl, StorageError> {
        let ttl = i64::try_from(ttl_secs)
            .map_err(|_| StorageError::Signing(format!("ttl out of range: {}", ttl_secs)))?;
        let expires = Utc::now().timestamp().saturating_add(ttl);
        let signature = self.signature(&durable_ref.key, expires)?;

        Ok(SignedUrl {
            url: format!(
                "{}?expires={}&signature={}",
                self.public_url(&durable_ref.key),
                expires,
                signature
            ),
            expires_in: ttl_secs,
        })
    }
}

/// Restrict an identifier to characters safe in a path segment.
fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
