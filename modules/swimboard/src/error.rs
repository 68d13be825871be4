use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Startup configuration problems. Fatal before any network activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Why a single fetch attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("relay returned status {status}: {message}")]
    Relay { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for AttemptFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AttemptFailure::Timeout
        } else if err.is_connect() {
            AttemptFailure::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            AttemptFailure::Status {
                status: status.as_u16(),
            }
        } else {
            AttemptFailure::Other(err.to_string())
        }
    }
}

impl From<scraperapi_client::ScraperApiError> for AttemptFailure {
    fn from(err: scraperapi_client::ScraperApiError) -> Self {
        use scraperapi_client::ScraperApiError;
        match err {
            ScraperApiError::Timeout(_) => AttemptFailure::Timeout,
            ScraperApiError::Network(msg) => AttemptFailure::Connect(msg),
            ScraperApiError::Api { status, message } => AttemptFailure::Relay { status, message },
        }
    }
}

/// One iteration of the fetch retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    /// 1-based.
    pub attempt: u32,
    /// Delay slept after this attempt. Zero for the final attempt.
    pub backoff: Duration,
    pub failure: AttemptFailure,
}

/// Fetch retries exhausted.
#[derive(Debug, Clone, Error)]
#[error("fetch failed after {} attempt(s): {reason}", .attempts.len())]
pub struct FetchError {
    pub reason: String,
    pub attempts: Vec<FetchAttempt>,
}

/// Snapshot could not be written.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to write state to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single outbound message could not be delivered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// The channel rejected the rich formatting of the message.
    #[error("formatting rejected: {0}")]
    Formatting(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Failures that end a run in the failed state.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraperapi_client::ScraperApiError;

    #[test]
    fn relay_errors_map_to_attempt_failures() {
        assert_eq!(
            AttemptFailure::from(ScraperApiError::Timeout("deadline".into())),
            AttemptFailure::Timeout
        );
        assert_eq!(
            AttemptFailure::from(ScraperApiError::Network("refused".into())),
            AttemptFailure::Connect("refused".into())
        );
        assert_eq!(
            AttemptFailure::from(ScraperApiError::Api {
                status: 201,
                message: "accepted".into(),
            }),
            AttemptFailure::Relay {
                status: 201,
                message: "accepted".into(),
            }
        );
    }

    #[test]
    fn fetch_error_names_attempt_count() {
        let err = FetchError {
            reason: "HTTP status 503".into(),
            attempts: vec![
                FetchAttempt {
                    attempt: 1,
                    backoff: Duration::from_secs(1),
                    failure: AttemptFailure::Status { status: 503 },
                },
                FetchAttempt {
                    attempt: 2,
                    backoff: Duration::ZERO,
                    failure: AttemptFailure::Status { status: 503 },
                },
            ],
        };
        assert_eq!(err.to_string(), "fetch failed after 2 attempt(s): HTTP status 503");
    }
}
