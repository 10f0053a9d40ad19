//! HTTP GET with retry
//!
//! Two independent retry disciplines apply to every request:
//!
//! - connect failures, timeouts, 5xx and 429 are retried with exponential
//!   backoff up to `max_attempts`
//! - failures after the connection was established (reset, truncated body)
//!   sleep `socket_step` longer each time until the sleep would pass
//!   `socket_ceiling`
//!
//! Exhausting either budget on a transport failure yields
//! [`IngestError::FetchAbandoned`]. Exhausting it on 5xx/429 returns the last
//! response: deciding what a status means is left to the caller.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::{EscoConfig, RetryConfig};
use crate::error::{IngestError, Result};

/// Broad category of an HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    RateLimited,
    ServerError,
    ClientError,
    Other,
}

impl StatusClass {
    pub fn of(status: StatusCode) -> Self {
        if status.is_success() {
            StatusClass::Success
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            StatusClass::RateLimited
        } else if status.is_server_error() {
            StatusClass::ServerError
        } else if status.is_client_error() {
            StatusClass::ClientError
        } else {
            StatusClass::Other
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, StatusClass::RateLimited | StatusClass::ServerError)
    }
}

/// How a transport failure is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connect error or timeout: exponential backoff
    Transient,
    /// Connection dropped mid-exchange: linear escalation to the ceiling
    Socket,
    /// Request could not be built or followed; retrying cannot help
    Permanent,
}

/// Classify a reqwest failure
pub fn classify_error(err: &reqwest::Error) -> FailureKind {
    if err.is_connect() || err.is_timeout() {
        FailureKind::Transient
    } else if err.is_builder() || err.is_redirect() {
        FailureKind::Permanent
    } else {
        FailureKind::Socket
    }
}

/// A completed HTTP exchange with its body read into memory
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub url: String,
    pub status: StatusCode,
    pub body: String,
}

impl FetchedResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn status_class(&self) -> StatusClass {
        StatusClass::of(self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// reqwest client plus the retry policy
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    client: Client,
    retry: RetryConfig,
}

impl RetryingFetcher {
    pub fn new(config: &EscoConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self::with_client(client, config.retry.clone()))
    }

    pub fn with_client(client: Client, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// GET `url`, retrying per the configured policy
    pub async fn get(&self, url: &Url) -> Result<FetchedResponse> {
        let mut attempt: u32 = 1;
        let mut requests: u32 = 0;
        let mut socket_sleep = Duration::ZERO;

        loop {
            requests += 1;

            match self.send(url).await {
                Ok(response) => {
                    let class = response.status_class();

                    if class.is_retryable() && attempt < self.retry.max_attempts {
                        let delay = self.retry.backoff_delay(attempt);
                        warn!(
                            url = %url,
                            status = %response.status,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Retryable status, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    debug!(url = %url, status = %response.status, requests, "Fetched");
                    return Ok(response);
                },
                Err(err) => match classify_error(&err) {
                    FailureKind::Transient => {
                        if attempt >= self.retry.max_attempts {
                            error!(url = %url, attempts = requests, error = %err, "Giving up after transient failures");
                            return Err(abandoned(url, requests, &err));
                        }

                        let delay = self.retry.backoff_delay(attempt);
                        warn!(
                            url = %url,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Transient network failure, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    },
                    FailureKind::Socket => {
                        socket_sleep += self.retry.socket_step();

                        if socket_sleep > self.retry.socket_ceiling() {
                            error!(
                                url = %url,
                                ceiling_ms = self.retry.socket_ceiling_ms,
                                error = %err,
                                "Socket error retry ceiling reached"
                            );
                            return Err(abandoned(url, requests, &err));
                        }

                        warn!(
                            url = %url,
                            sleep_ms = socket_sleep.as_millis() as u64,
                            error = %err,
                            "Socket error, sleeping before retry"
                        );
                        tokio::time::sleep(socket_sleep).await;
                    },
                    FailureKind::Permanent => {
                        error!(url = %url, error = %err, "Request cannot be sent");
                        return Err(abandoned(url, requests, &err));
                    },
                },
            }
        }
    }

    async fn send(&self, url: &Url) -> std::result::Result<FetchedResponse, reqwest::Error> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        Ok(FetchedResponse {
            url: final_url,
            status,
            body,
        })
    }
}

fn abandoned(url: &Url, attempts: u32, err: &reqwest::Error) -> IngestError {
    IngestError::FetchAbandoned {
        url: url.to_string(),
        attempts,
        reason: err.to_string(),
    }
}
