//! Provider registry: name to adapter lookup.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::ProvidersConfig;

use super::{
    GenerationRequest, LumaProvider, ProviderError, ReplicateProvider, RunwayProvider,
    SubmittedTask, VideoProvider,
};

/// Order tried by [`ProviderRegistry::submit_with_fallback`] when none is given.
pub const DEFAULT_FALLBACK_ORDER: [&str; 3] = ["luma", "runway", "replicate"];

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No adapter registered under this name.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Every provider in a fallback order failed.
    #[error("All providers failed: {}", format_failures(.0))]
    AllProvidersFailed(Vec<(String, ProviderError)>),
}

fn format_failures(failures: &[(String, ProviderError)]) -> String {
    if failures.is_empty() {
        return "no providers available".to_string();
    }
    failures
        .iter()
        .map(|(name, err)| format!("{}: {}", name, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fixed set of provider adapters keyed by name.
///
/// Built once at startup; there is no runtime registration.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn VideoProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every configured provider.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let mut registry = Self::new();

        if let Some(luma) = &config.luma {
            registry = registry.with_provider(Arc::new(LumaProvider::new(luma.clone())?));
        }
        if let Some(runway) = &config.runway {
            registry = registry.with_provider(Arc::new(RunwayProvider::new(runway.clone())?));
        }
        if let Some(replicate) = &config.replicate {
            registry =
                registry.with_provider(Arc::new(ReplicateProvider::new(replicate.clone())?));
        }

        info!(providers = ?registry.names(), "Provider registry initialized");
        Ok(registry)
    }

    /// Register an adapter under its own name.
    pub fn with_provider(mut self, provider: Arc<dyn VideoProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    /// Look up an adapter by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn VideoProvider>, RegistryError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProvider(name.to_string()))
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Submit to each provider in `order` until one accepts.
    ///
    /// Names that aren't registered are skipped. The returned task names the
    /// provider that accepted the request.
    pub async fn submit_with_fallback(
        &self,
        request: &GenerationRequest,
        order: &[&str],
    ) -> Result<SubmittedTask, RegistryError> {
        let mut failures = Vec::new();

        for name in order {
            let Some(provider) = self.providers.get(*name) else {
                continue;
            };

            let mut attempt = request.clone();
            attempt.provider = name.to_string();

            match provider.submit(&attempt).await {
                Ok(task) => {
                    if !failures.is_empty() {
                        info!(
                            provider = %name,
                            failed = failures.len(),
                            "Submission accepted by fallback provider"
                        );
                    }
                    return Ok(task);
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "Provider submission failed, trying next");
                    failures.push((name.to_string(), e));
                }
            }
        }

        Err(RegistryError::AllProvidersFailed(failures))
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LumaConfig, ReplicateConfig};
    use crate::testing::MockProvider;

    #[test]
    fn test_resolve_unknown_provider() {
        let registry = ProviderRegistry::new().with_provider(Arc::new(MockProvider::new("luma")));

        assert!(registry.resolve("luma").is_ok());
        match registry.resolve("sora") {
            Err(RegistryError::UnknownProvider(name)) => assert_eq!(name, "sora"),
            other => panic!("Expected UnknownProvider, got {:?}", other.map(|p| p.name().to_string())),
        }
    }

    #[test]
    fn test_from_config_registers_configured_only() {
        let config = ProvidersConfig {
            luma: Some(LumaConfig {
                api_key: "luma-key".to_string(),
                ..LumaConfig::default()
            }),
            runway: None,
            replicate: Some(ReplicateConfig {
                api_key: "rep-key".to_string(),
                ..ReplicateConfig::default()
            }),
        };

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.names(), vec!["luma", "replicate"]);
        assert!(registry.resolve("runway").is_err());
    }

    #[tokio::test]
    async fn test_fallback_returns_first_working_provider() {
        let luma = Arc::new(MockProvider::new("luma"));
        luma.set_submit_failure(Some("overloaded")).await;
        let runway = Arc::new(MockProvider::new("runway"));

        let registry = ProviderRegistry::new()
            .with_provider(luma.clone())
            .with_provider(runway.clone());

        let request = GenerationRequest::new("a fox", "luma");
        let task = registry
            .submit_with_fallback(&request, &DEFAULT_FALLBACK_ORDER)
            .await
            .unwrap();

        assert_eq!(task.provider, "runway");
        assert_eq!(luma.submissions().await.len(), 1);

        let runway_calls = runway.submissions().await;
        assert_eq!(runway_calls.len(), 1);
        assert_eq!(runway_calls[0].request.provider, "runway");
    }

    #[tokio::test]
    async fn test_fallback_collects_all_failures() {
        let luma = Arc::new(MockProvider::new("luma"));
        luma.set_submit_failure(Some("down")).await;
        let replicate = Arc::new(MockProvider::new("replicate").requiring_image());

        let registry = ProviderRegistry::new()
            .with_provider(luma)
            .with_provider(replicate);

        let request = GenerationRequest::new("a fox", "luma");
        let result = registry
            .submit_with_fallback(&request, &DEFAULT_FALLBACK_ORDER)
            .await;

        match result {
            Err(RegistryError::AllProvidersFailed(failures)) => {
                let names: Vec<&str> = failures.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["luma", "replicate"]);
                assert!(matches!(
                    failures[1].1,
                    ProviderError::UnsupportedRequest(_)
                ));
            }
            other => panic!("Expected AllProvidersFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fallback_with_no_registered_providers() {
        let registry = ProviderRegistry::new();
        let result = registry
            .submit_with_fallback(&GenerationRequest::new("a fox", "luma"), &DEFAULT_FALLBACK_ORDER)
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "All providers failed: no providers available");
    }
}
