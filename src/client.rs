//! Rate-limited HTTP access to a single metadata provider.

use crate::error::{ResolveError, Result};
use crate::rate_limit::RateLimiter;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// HTTP handle for one provider: shared connection pool, the provider's
/// rate limiter, and its base URL.
///
/// Cheap to clone; clones share both the pool and the limiter.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) rate_limiter: RateLimiter,
}

impl ProviderClient {
    /// Create a provider handle over an existing `reqwest::Client`.
    pub fn new(http: Client, base_url: impl Into<String>, rate_limiter: RateLimiter) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            rate_limiter,
        }
    }

    /// Build the shared `reqwest::Client` used by every provider.
    pub fn build_http(user_agent: &str) -> Result<Client> {
        Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ResolveError::Config(format!("Failed to create HTTP client: {}", e)))
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    ///
    /// A DOI passed as a single segment keeps its `/` encoded as `%2F`.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ResolveError::Config(format!("Invalid base URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ResolveError::Config(format!("Base URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Rate-limited GET returning the response body.
    pub(crate) async fn get(
        &self,
        url: Url,
        params: &[(&str, &str)],
        accept: Option<&str>,
        timeout: Duration,
    ) -> Result<String> {
        self.rate_limiter.acquire().await;

        let mut request = self.http.get(url).query(params).timeout(timeout);
        if let Some(accept) = accept {
            request = request.header(reqwest::header::ACCEPT, accept);
        }
        let response = request.send().await?;

        handle_response(response).await
    }
}

/// Handle the HTTP response, mapping status codes to errors.
async fn handle_response(response: reqwest::Response) -> Result<String> {
    let status = response.status().as_u16();

    match status {
        200..=299 => Ok(response.text().await?),
        404 => Err(ResolveError::NotFound(response.url().path().to_string())),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(ResolveError::RateLimited { retry_after })
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ResolveError::Api {
                status,
                message: body,
            })
        }
    }
}
