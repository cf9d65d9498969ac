use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("unsupported URL scheme '{0}', only http and https are allowed")]
    UnsupportedScheme(String),

    #[error("HTTP {status} from {url}")]
    Status { url: Url, status: StatusCode },

    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("no fetch attempts were configured")]
    NoAttempts,

    #[error("failed to fetch {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: Url,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether trying another variant of the same request can still succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Request { .. } => true,
            FetchError::Exhausted { last, .. } => last.is_transient(),
            FetchError::InvalidUrl(_) | FetchError::UnsupportedScheme(_) | FetchError::NoAttempts => {
                false
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("snapshot file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("snapshot database lock was poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("invalid container selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}
