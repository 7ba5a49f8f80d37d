//! HTTP fetcher implementation
//!
//! This module handles every outbound request of a harvest, including:
//! - Building the HTTP client with the configured client identity headers
//! - Pre-request pacing that backs off while the remote side is erroring
//! - Global admission through the run's shared semaphore
//! - Retry with exponential backoff for transient failures
//! - Per-URL response caching

use crate::config::{Config, UserAgentConfig};
use crate::crawler::cache::FetchCache;
use crate::crawler::context::RunContext;
use crate::crawler::retry::{RequestPacing, RetryPolicy};
use crate::{FetchError, HarvestError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Outcome of a single attempt, before retry handling
#[derive(Debug)]
enum AttemptError {
    /// 404-class response; never retried
    NotFound(u16),
    /// Timeout, network error or unexpected status; retried
    Transient(String),
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Client identity headers sent with every request
/// * `timeout` - Per-request timeout covering connect, send and body read
/// * `accept_invalid_certs` - Disables TLS certificate validation
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(HarvestError)` - A header value was invalid or the client failed to build
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
    accept_invalid_certs: bool,
) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    if let Some(accept) = &user_agent.accept {
        headers.insert(ACCEPT, header_value("accept", accept)?);
    }
    if let Some(language) = &user_agent.accept_language {
        headers.insert(ACCEPT_LANGUAGE, header_value("accept-language", language)?);
    }

    if accept_invalid_certs {
        tracing::warn!("TLS certificate validation is DISABLED (accept-invalid-certs = true)");
    }

    let client = Client::builder()
        .user_agent(user_agent.browser_string.clone())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Builds the HTTP client described by a full configuration
pub fn build_client_from_config(config: &Config) -> Result<Client, HarvestError> {
    build_http_client(
        &config.user_agent,
        Duration::from_secs(config.harvester.request_timeout_secs),
        config.source.accept_invalid_certs,
    )
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, HarvestError> {
    HeaderValue::from_str(value).map_err(|e| HarvestError::InvalidHeader {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// Rate-limited, retrying GET primitive
///
/// # Request Flow
///
/// 1. Cached URL → return the cached body (no delay, no permit)
/// 2. Sleep the paced pre-request delay
/// 3. Per attempt: acquire a run permit, GET, read the body, release the permit
/// 4. Classify the result per the table below
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Cache and return the body |
/// | HTTP 404 / 410 | Immediate → `FetchError::NotFound` |
/// | Other status | Retry after backoff |
/// | Timeout | Retry after backoff |
/// | Network error | Retry after backoff |
/// | Budget exhausted | `FetchError::Exhausted` |
///
/// The permit is never held while sleeping.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    context: RunContext,
    cache: FetchCache,
    retry: RetryPolicy,
    pacing: RequestPacing,
}

impl Fetcher {
    pub fn new(
        client: Client,
        context: RunContext,
        cache: FetchCache,
        retry: RetryPolicy,
        pacing: RequestPacing,
    ) -> Self {
        Self {
            client,
            context,
            cache,
            retry,
            pacing,
        }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Fetches `url`, returning its body or a per-request failure
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(body) = self.cache.get(url).await {
            tracing::debug!("Cache hit: {}", url);
            return Ok(body);
        }

        Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let delay = self.pacing.delay_for(self.context.error_count());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let max_attempts = self.retry.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(url).await {
                Ok(body) => {
                    self.context.record_success();
                    self.cache.insert(url, body.clone()).await;
                    return Ok(body);
                }
                Err(AttemptError::NotFound(status)) => {
                    tracing::info!("Page not found (HTTP {}): {}", status, url);
                    return Err(FetchError::NotFound {
                        url: url.to_string(),
                    });
                }
                Err(AttemptError::Transient(error)) => {
                    let errors = self.context.record_error();
                    tracing::warn!(
                        "Failed to fetch {} (attempt {}/{}): {}",
                        url,
                        attempt,
                        max_attempts,
                        error
                    );
                    last_error = error;

                    if self.retry.should_retry(attempt) {
                        let backoff = self.retry.delay_for(attempt);
                        tracing::debug!(
                            rolling_errors = errors,
                            "Retrying {} in {}ms",
                            url,
                            backoff.as_millis()
                        );
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }

    /// One admitted GET; the permit is held until the body has been read
    async fn attempt(&self, url: &str) -> Result<String, AttemptError> {
        let _permit = self
            .context
            .acquire()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(AttemptError::NotFound(status.as_u16()));
        }

        if !status.is_success() {
            return Err(AttemptError::Transient(format!("HTTP {}", status.as_u16())));
        }

        response.text().await.map_err(classify)
    }
}

fn classify(error: reqwest::Error) -> AttemptError {
    if error.is_timeout() {
        AttemptError::Transient("Request timeout".to_string())
    } else if error.is_connect() {
        AttemptError::Transient(format!("Connection failed: {}", error))
    } else {
        AttemptError::Transient(error.to_string())
    }
}
