//! Credentials and authentication modes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How requests are authenticated against the appliance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Log in once and send `X-F5-Auth-Token` on every request.
    #[default]
    Token,
    /// HTTP basic authentication on every request.
    Basic,
}

impl AuthMode {
    /// `Basic` iff the basic-auth flag is set, `Token` otherwise.
    pub fn from_basic_auth(basic_auth: bool) -> Self {
        if basic_auth {
            AuthMode::Basic
        } else {
            AuthMode::Token
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Token => "token",
            AuthMode::Basic => "basic",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Username and password for an appliance account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mode_from_flag() {
        assert_eq!(AuthMode::from_basic_auth(true), AuthMode::Basic);
        assert_eq!(AuthMode::from_basic_auth(false), AuthMode::Token);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("admin", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }
}
