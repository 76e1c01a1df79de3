//! Errors a scrape can fail with, and their HTTP status mapping.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::collector::CollectError;
use crate::config::ModuleNotFound;
use crate::factory::ConstructionError;
use crate::registry::RegistryError;

/// Request-scoped scrape failure. Never outlives the request that raised it.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Parameter '{0}' is mandatory")]
    MissingParameter(&'static str),

    #[error(transparent)]
    ModuleNotFound(#[from] ModuleNotFound),

    #[error(transparent)]
    CollectorConstruction(#[from] ConstructionError),

    #[error("Collection from '{target}' failed: {source}")]
    Collection {
        target: String,
        #[source]
        source: CollectError,
    },

    #[error("Collection from '{target}' timed out after {}s", .timeout.as_secs_f64())]
    Timeout { target: String, timeout: Duration },

    #[error("Failed to register collector: {0}")]
    Registration(#[from] RegistryError),

    #[error("Failed to encode metrics: {0}")]
    Encoding(#[from] std::fmt::Error),
}

impl ScrapeError {
    /// HTTP status for this failure.
    ///
    /// Client mistakes are 400; device-side failures are gateway errors so
    /// they are distinguishable from bad requests.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScrapeError::MissingParameter(_) | ScrapeError::ModuleNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            ScrapeError::CollectorConstruction(_) | ScrapeError::Collection { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ScrapeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ScrapeError::Registration(_) | ScrapeError::Encoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        (self.status_code(), format!("{}\n", self)).into_response()
    }
}
