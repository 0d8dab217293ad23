//! Outbound HTTP plumbing shared by the provider clients.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::errors::AppError;

/// Build the process-wide HTTP client used for one provider.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|e| AppError::Internal(format!("Invalid User-Agent: {}", e)))?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// GET `url` with query parameters, retrying once when the connection fails
/// or times out. HTTP error statuses are returned as-is, never retried.
pub async fn get_with_retry(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
    provider: &str,
) -> Result<reqwest::Response, reqwest::Error> {
    match client.get(url).query(query).send().await {
        Err(e) if e.is_connect() || e.is_timeout() => {
            tracing::warn!("{} request failed ({}), retrying once", provider, e);
            client.get(url).query(query).send().await
        }
        other => other,
    }
}

/// URL of a local port with nothing listening on it.
#[cfg(test)]
pub(crate) fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
