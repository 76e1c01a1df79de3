use thiserror::Error;

/// Errors raised while talking to a BIG-IP appliance.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Authentication rejected for user '{0}'")]
    Authentication(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl Error {
    /// Whether the request was cut off by the client's timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Http(e) if e.is_timeout())
    }
}

/// Result type alias using the client's Error.
pub type Result<T> = std::result::Result<T, Error>;
