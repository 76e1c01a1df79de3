//! Scrape dispatch: resolve the module, build a collector, gather it into a
//! request-scoped registry.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::config::Configuration;
use crate::error::ScrapeError;
use crate::factory::CollectorFactory;
use crate::registry::{Exposition, ScrapeRegistry};

/// Query parameters of a scrape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeRequest {
    pub target: Option<String>,
    pub module: Option<String>,
}

impl ScrapeRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            module: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }
}

/// Runs scrapes against the immutable configuration.
///
/// Holds no per-request state; concurrent scrapes share only the
/// configuration and the factory.
pub struct ScrapeDispatcher {
    config: Arc<Configuration>,
    factory: Arc<dyn CollectorFactory>,
}

impl ScrapeDispatcher {
    pub fn new(config: Arc<Configuration>, factory: Arc<dyn CollectorFactory>) -> Self {
        Self { config, factory }
    }

    /// Execute one scrape.
    pub async fn dispatch(&self, request: &ScrapeRequest) -> Result<Exposition, ScrapeError> {
        let target = request
            .target
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ScrapeError::MissingParameter("target"))?;

        let module = self
            .config
            .resolver()
            .resolve_or_default(request.module.as_deref())?;

        let settings = &self.config.settings;
        let collector = self
            .factory
            .build(module.config, target, &settings.namespace)?;

        let mut registry = ScrapeRegistry::new(&settings.namespace);
        registry.register(collector)?;

        let exposition = registry.gather(settings.scrape_timeout).await?;

        debug!(
            device = %target,
            module = %module.name,
            samples = exposition.samples,
            duration_ms = exposition.duration.as_millis() as u64,
            "Scrape completed"
        );

        Ok(exposition)
    }
}
