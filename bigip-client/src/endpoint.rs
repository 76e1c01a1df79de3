//! Appliance endpoint parsing.

use std::fmt;

use reqwest::Url;

use crate::error::{Error, Result};

/// A validated appliance base URL.
///
/// Targets are usually given as `host[:port]` and default to HTTPS. An explicit
/// `http://` or `https://` scheme is honoured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    /// Parse a scrape target into an endpoint. Performs no I/O.
    pub fn parse(target: &str) -> Result<Self> {
        let trimmed = target.trim();
        if trimmed.is_empty() {
            return Err(invalid(target, "target is empty"));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&candidate).map_err(|e| invalid(target, &e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(
                target,
                &format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid(target, "missing host"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid(target, "credentials must not be part of the target"));
        }
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(invalid(
                target,
                "target must not contain a path, query or fragment",
            ));
        }

        Ok(Self {
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Absolute URL for an API path such as `/mgmt/tm/ltm/pool/stats`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

fn invalid(target: &str, reason: &str) -> Error {
    Error::InvalidEndpoint {
        endpoint: target.to_string(),
        reason: reason.to_string(),
    }
}
