//! HTTP plumbing shared by every adapter.

use parsec_core::error::ProviderError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// Build the HTTP client adapters send requests with.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {e}")))
}

/// Send a prepared request and decode the JSON body of a 2xx response.
///
/// 401/403 map to `AuthenticationFailed`, 429 to `RateLimited`, any other
/// non-success status to `ApiError` carrying the response body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    vendor: &str,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(format!(
            "Invalid {vendor} API key or insufficient permissions"
        )));
    }

    if !response.status().is_success() {
        let error_body = response.text().await.unwrap_or_default();
        warn!(provider = vendor, status, body = %error_body, "Provider returned error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    response.json().await.map_err(|e| {
        ProviderError::MalformedResponse(format!("Failed to parse {vendor} response: {e}"))
    })
}

/// Trim a trailing slash so paths can be appended with `format!`.
pub(crate) fn normalize_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}
