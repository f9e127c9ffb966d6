//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::ProviderError;

/// Longest slice of an error body we carry into error messages.
const MAX_ERROR_BODY: usize = 300;

/// Build the reqwest client an adapter uses for all calls.
pub(crate) fn build_client(provider: &str, timeout_secs: u32) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs as u64))
        .build()
        .map_err(|e| ProviderError::Configuration {
            provider: provider.to_string(),
            message: format!("failed to create HTTP client: {}", e),
        })
}

/// Send a request and decode a JSON success body.
///
/// Non-2xx answers become `Rejected` carrying the raw body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| map_send_error(provider, e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| map_send_error(provider, e))?;

    if !status.is_success() {
        return Err(ProviderError::Rejected {
            provider: provider.to_string(),
            message: format!("HTTP {}: {}", status, truncate(&body)),
        });
    }

    serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
        provider: provider.to_string(),
        message: format!("failed to parse response: {}", e),
    })
}

/// Map a reqwest error to the provider error taxonomy.
pub(crate) fn map_send_error(provider: &str, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout {
            provider: provider.to_string(),
        }
    } else {
        ProviderError::Transport {
            provider: provider.to_string(),
            message: e.to_string(),
        }
    }
}

/// Trim a base URL so endpoint paths can be appended with a leading slash.
pub(crate) fn trim_base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_base() {
        assert_eq!(trim_base("https://api.example/v1/"), "https://api.example/v1");
        assert_eq!(trim_base("https://api.example/v1"), "https://api.example/v1");
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(1000);
        assert_eq!(truncate(&body).len(), MAX_ERROR_BODY);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_build_client() {
        assert!(build_client("luma", 30).is_ok());
    }
}
