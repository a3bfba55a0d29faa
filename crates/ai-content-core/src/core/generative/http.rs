//! HTTP helpers shared by the vendor adapters

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::core::{CoreError, CoreResult};

/// Upper bound on downloaded media size
pub const MAX_DOWNLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Characters of an error body kept in messages
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Builds a client scoped to a single generation call
pub fn build_client(provider: &str, timeout_secs: u64) -> CoreResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CoreError::provider(provider, format!("Failed to create HTTP client: {}", e)))
}

/// Maps a transport failure to a provider error
pub fn send_error(provider: &str, err: reqwest::Error) -> CoreError {
    if err.is_timeout() {
        CoreError::provider(provider, format!("Request timed out: {}", err))
    } else {
        CoreError::provider(provider, format!("Network error: {}", err))
    }
}

/// Provider error for a non-2xx response: `"<status code> <body>"`
pub fn api_error(provider: &str, status: StatusCode, body: &str) -> CoreError {
    let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    CoreError::provider(provider, format!("{} {}", status.as_u16(), truncated))
}

/// Sends a request and decodes a JSON body from a 2xx response
pub async fn send_json<T: DeserializeOwned>(provider: &str, request: RequestBuilder) -> CoreResult<T> {
    let resp = request.send().await.map_err(|e| send_error(provider, e))?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| {
        CoreError::provider(provider, format!("Failed to read response: {}", e))
    })?;

    if !status.is_success() {
        return Err(api_error(provider, status, &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| CoreError::provider(provider, format!("Failed to parse response: {}", e)))
}

/// Accepts only absolute http(s) URLs for secondary downloads
pub fn validate_download_url(provider: &str, url: &str) -> CoreResult<reqwest::Url> {
    let parsed = reqwest::Url::parse(url).map_err(|e| {
        CoreError::provider(provider, format!("Invalid download URL '{}': {}", url, e))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(CoreError::provider(
            provider,
            format!(
                "Unsupported download URL scheme '{}'. Only http/https are allowed.",
                scheme
            ),
        )),
    }
}

/// True when `url` has the same scheme, host and port as `base`
pub fn same_origin(base: &str, url: &str) -> bool {
    match (reqwest::Url::parse(base), reqwest::Url::parse(url)) {
        (Ok(base), Ok(url)) => base.origin() == url.origin(),
        _ => false,
    }
}

/// Fetches the media bytes behind `url`.
///
/// `headers` are attached as-is, for vendors whose file URLs need the API key.
pub async fn download(
    provider: &str,
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, &str)],
) -> CoreResult<Vec<u8>> {
    let url = validate_download_url(provider, url)?;
    debug!("{}: downloading {}", provider, url);

    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let mut resp = request.send().await.map_err(|e| send_error(provider, e))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(api_error(provider, status, &body));
    }

    if let Some(content_len) = resp.content_length() {
        if content_len > MAX_DOWNLOAD_BYTES {
            return Err(CoreError::provider(
                provider,
                format!(
                    "Download too large: {} bytes (max {})",
                    content_len, MAX_DOWNLOAD_BYTES
                ),
            ));
        }
    }

    let mut data = Vec::new();
    while let Some(chunk) = resp
        .chunk()
        .await
        .map_err(|e| CoreError::provider(provider, format!("Failed to read chunk: {}", e)))?
    {
        if (data.len() + chunk.len()) as u64 > MAX_DOWNLOAD_BYTES {
            return Err(CoreError::provider(
                provider,
                format!("Download exceeded max size ({} bytes)", MAX_DOWNLOAD_BYTES),
            ));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(data)
}
