//! Minimal iControl REST client for BIG-IP statistics.
//!
//! - [`endpoint`] - Target parsing (`host[:port]` or explicit URL)
//! - [`auth`] - Credentials and token/basic authentication modes
//! - [`client`] - The per-appliance client handle and authenticated sessions
//! - [`stats`] - Decoding of the `*/stats` collections
//! - [`error`] - Error types

pub mod auth;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod stats;

pub use auth::{AuthMode, Credentials};
pub use client::{BigIpClient, ClientOptions, Session};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use stats::{DEFAULT_PARTITION, StatsEntry, StatsKind, parse_stats};
