//! HTTP client handle for a single appliance.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::debug;

use crate::auth::{AuthMode, Credentials};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::stats::{StatsEntry, StatsKind, parse_stats};

const LOGIN_PATH: &str = "/mgmt/shared/authn/login";
const TOKEN_HEADER: &str = "X-F5-Auth-Token";
const LOGIN_PROVIDER: &str = "tmos";

/// Transport options for the client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Verify the appliance's TLS certificate.
    pub verify_tls: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            verify_tls: false,
        }
    }
}

/// A client bound to one appliance and one set of credentials.
///
/// Building a client performs no network I/O; authentication happens in
/// [`BigIpClient::connect`].
#[derive(Debug, Clone)]
pub struct BigIpClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    credentials: Credentials,
    auth_mode: AuthMode,
}

impl BigIpClient {
    pub fn new(
        endpoint: Endpoint,
        credentials: Credentials,
        auth_mode: AuthMode,
        options: ClientOptions,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify_tls)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            credentials,
            auth_mode,
        })
    }

    /// Authenticate and return a session for issuing queries.
    pub async fn connect(&self) -> Result<Session<'_>> {
        let token = match self.auth_mode {
            AuthMode::Basic => None,
            AuthMode::Token => Some(self.login().await?),
        };

        Ok(Session {
            client: self,
            token,
        })
    }

    async fn login(&self) -> Result<String> {
        let url = self.endpoint.url(LOGIN_PATH);
        debug!(endpoint = %self.endpoint, user = %self.credentials.username, "Requesting auth token");

        let response = self
            .http
            .post(&url)
            .json(&json!({
                "username": self.credentials.username,
                "password": self.credentials.password,
                "loginProviderName": LOGIN_PROVIDER,
            }))
            .send()
            .await?;

        let body = self.read_json(response, url).await?;
        body.pointer("/token/token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Decode("login response without token".to_string()))
    }

    async fn read_json(&self, response: reqwest::Response, url: String) -> Result<Value> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Authentication(self.credentials.username.clone()));
        }
        if !status.is_success() {
            return Err(Error::Status { status, url });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// An authenticated view of a [`BigIpClient`].
pub struct Session<'a> {
    client: &'a BigIpClient,
    token: Option<String>,
}

impl Session<'_> {
    /// Fetch one statistics collection.
    pub async fn stats(&self, kind: StatsKind) -> Result<Vec<StatsEntry>> {
        let body = self.get_json(kind.path()).await?;
        let entries = parse_stats(&body)?;
        debug!(
            endpoint = %self.client.endpoint,
            kind = %kind,
            entries = entries.len(),
            "Fetched stats"
        );
        Ok(entries)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.client.endpoint.url(path);
        let request = self.client.http.get(&url);
        let request = match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request.basic_auth(
                &self.client.credentials.username,
                Some(&self.client.credentials.password),
            ),
        };

        let response = request.send().await?;
        self.client.read_json(response, url).await
    }
}
