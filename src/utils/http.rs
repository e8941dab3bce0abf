// src/utils/http.rs

//! HTTP client utilities.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Response;
use reqwest::cookie::Jar;

use crate::error::Result;
use crate::models::ApiConfig;

fn builder(config: &ApiConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
}

/// Create a configured asynchronous HTTP client.
///
/// Every request is bounded by the total and connect timeouts so a stalled
/// peer cannot block a worker forever.
pub fn create_async_client(config: &ApiConfig) -> Result<reqwest::Client> {
    Ok(builder(config).build()?)
}

/// Create a client that keeps session cookies in `jar`.
pub fn create_session_client(config: &ApiConfig, jar: Arc<Jar>) -> Result<reqwest::Client> {
    Ok(builder(config).cookie_provider(jar).build()?)
}

/// Read and discard the rest of a response body.
///
/// Errors are ignored; the body is only consumed so the connection can be
/// returned to the pool.
pub async fn drain(mut response: Response) {
    while let Ok(Some(_)) = response.chunk().await {}
}

/// Turn a non-success status into an error after draining the body.
pub async fn ensure_success(response: Response) -> Result<Response> {
    match response.error_for_status_ref() {
        Ok(_) => Ok(response),
        Err(err) => {
            drain(response).await;
            Err(err.into())
        }
    }
}
