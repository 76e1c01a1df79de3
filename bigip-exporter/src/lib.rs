//! Multi-target Prometheus exporter for BIG-IP appliances.
//!
//! Each scrape names a `target` appliance and an optional `module` (a
//! credential profile). The exporter builds a collector for that pair, runs it
//! inside a registry that lives only for the request, and returns the result.
//!
//! # Architecture
//!
//! ```text
//! GET /metrics?target=..&module=..
//!        │
//!        ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │   Resolver   │──>│   Factory    │──>│  ScrapeRegistry  │──>│   Response   │
//! │ (module cfg) │   │ (collector)  │   │ (one per request)│   │ (exposition) │
//! └──────────────┘   └──────────────┘   └──────────────────┘   └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! bigip-exporter --config bigip_exporter.yml
//! curl 'http://localhost:9142/metrics?target=10.0.0.5:443&module=test_env'
//! ```
//!
//! # Configuration
//!
//! See [`config::Configuration`] for configuration options.

pub mod collector;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod factory;
pub mod http;
pub mod logging;
pub mod mapping;
pub mod registry;
pub mod resolver;

pub use collector::{BigIpCollector, CollectError, Collector, Sample};
pub use config::{Configuration, ExporterSettings, ModuleConfig, ModuleStore};
pub use dispatch::{ScrapeDispatcher, ScrapeRequest};
pub use error::ScrapeError;
pub use factory::{BigIpCollectorFactory, CollectorFactory, ConstructionError};
pub use http::{HttpServer, create_router};
pub use registry::{Exposition, ScrapeRegistry};
pub use resolver::{ModuleResolver, ResolvedModule};
