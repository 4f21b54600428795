//! Resilient Fetch Client
//!
//! Every upstream call (DeFiLlama, Blockscout, JSON-RPC) goes through here:
//! 1. Per-attempt timeout (15s default)
//! 2. 429/5xx: capped exponential backoff (1s→2s→4s→8s→10s)
//! 3. Other non-2xx and transport failures: uncapped exponential backoff
//! 4. No sleep after the final attempt; the last error is returned
//! 5. User-Agent header & gzip on every request

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::config::RetryPolicy;
use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::USER_AGENT as USER_AGENT_CONST;

/// HTTP method of a fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Per-call request options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub method: HttpMethod,
    /// JSON body (POST only)
    pub body: Option<Value>,
}

impl FetchOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post_json(body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body),
        }
    }
}

/// Shared HTTP client with the retry policy baked in
#[derive(Clone)]
pub struct FetchClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl FetchClient {
    /// Build the client (gzip, User-Agent)
    pub fn new(policy: RetryPolicy) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| AppError::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET with the configured attempt count
    pub async fn get_json(&self, url: &str) -> AppResult<Value> {
        self.fetch(url, &FetchOptions::get(), self.policy.max_attempts)
            .await
    }

    /// POST a JSON body with the configured attempt count
    pub async fn post_json(&self, url: &str, body: Value) -> AppResult<Value> {
        self.fetch(url, &FetchOptions::post_json(body), self.policy.max_attempts)
            .await
    }

    /// Fetch JSON with retries. `max_attempts` includes the first try.
    pub async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
        max_attempts: u32,
    ) -> AppResult<Value> {
        let attempts = max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match self.execute(url, options).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt + 1 < attempts {
                        let delay = self.backoff_for(&e, attempt);
                        if e.status == Some(429) {
                            warn!(
                                "⏳ Rate limited (HTTP 429) by {}, backing off {}ms (attempt {}/{})",
                                url,
                                delay.as_millis(),
                                attempt + 1,
                                attempts
                            );
                        } else {
                            debug!(
                                "⏳ Retry {}/{} for {} after {}ms: {}",
                                attempt + 2,
                                attempts,
                                url,
                                delay.as_millis(),
                                e
                            );
                        }
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::transport(format!("No attempt made for {}", url))
        }))
    }

    /// 429/5xx use the capped schedule, everything else the uncapped one
    fn backoff_for(&self, err: &AppError, attempt: u32) -> Duration {
        if err.is_status_backoff() {
            self.policy.status_backoff(attempt)
        } else {
            self.policy.transport_backoff(attempt)
        }
    }

    /// Single attempt
    async fn execute(&self, url: &str, options: &FetchOptions) -> AppResult<Value> {
        let request = match options.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => {
                let builder = self.client.post(url);
                match &options.body {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            }
        };

        let response = request.timeout(self.policy.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::http_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                url,
            ));
        }

        Ok(response.json::<Value>().await?)
    }
}
