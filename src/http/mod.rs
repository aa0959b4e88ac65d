//! HTTP plumbing shared by the API clients.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use thiserror::Error;
use tracing::warn;

pub const MAX_RETRIES: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{service} request failed with status {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned an unexpected response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn transport(service: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { service, source }
    }

    pub fn decode(service: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            service,
            message: message.into(),
        }
    }

    /// Rate limiting, server errors and connection problems are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            ApiError::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            ApiError::Decode { .. } => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Turn a non-success response into [`ApiError::Status`] with its body.
pub async fn check_status(service: &'static str, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        service,
        status,
        body,
    })
}

/// Run `operation` up to `max_attempts` times, sleeping 1s, 2s, 4s... between
/// attempts while `should_retry` accepts the error.
pub async fn with_backoff<T, F, Fut, R>(
    label: &str,
    max_attempts: u32,
    should_retry: R,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
    R: Fn(&ApiError) -> bool,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < max_attempts && should_retry(&err) => {
                let wait = backoff_delay(attempt);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {}s: {}",
                    label,
                    attempt + 1,
                    max_attempts,
                    wait.as_secs(),
                    err
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

pub fn backoff_delay(attempt: u32) -> Duration {
    BASE_DELAY * 2u32.saturating_pow(attempt)
}
