use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScraperApiError>;

#[derive(Debug, Error)]
pub enum ScraperApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Relay timed out: {0}")]
    Timeout(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for ScraperApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScraperApiError::Timeout(err.to_string())
        } else {
            ScraperApiError::Network(err.to_string())
        }
    }
}
