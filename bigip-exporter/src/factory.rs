//! Construction of per-request collectors from a module and a target.

use std::time::Duration;

use bigip_client::{BigIpClient, ClientOptions, Endpoint};
use thiserror::Error;

use crate::collector::{BigIpCollector, Collector};
use crate::config::ModuleConfig;

/// A collector could not be built for a target.
#[derive(Debug, Error)]
#[error("Failed to build collector for target '{target}': {source}")]
pub struct ConstructionError {
    pub target: String,
    #[source]
    pub source: bigip_client::Error,
}

/// Builds a fresh collector for every scrape.
///
/// Implementations must not perform network I/O; only the returned collector
/// talks to the device.
pub trait CollectorFactory: Send + Sync {
    fn build(
        &self,
        module: &ModuleConfig,
        target: &str,
        namespace: &str,
    ) -> Result<Box<dyn Collector>, ConstructionError>;
}

/// Effective partition filter of a module. An empty list means no filter.
pub fn partition_filter(module: &ModuleConfig) -> Option<Vec<String>> {
    module
        .partition_filter
        .as_ref()
        .filter(|partitions| !partitions.is_empty())
        .cloned()
}

/// Factory producing [`BigIpCollector`]s.
#[derive(Debug, Clone)]
pub struct BigIpCollectorFactory {
    request_timeout: Duration,
}

impl BigIpCollectorFactory {
    /// `request_timeout` bounds each HTTP request to the appliance.
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl CollectorFactory for BigIpCollectorFactory {
    fn build(
        &self,
        module: &ModuleConfig,
        target: &str,
        namespace: &str,
    ) -> Result<Box<dyn Collector>, ConstructionError> {
        let construction_error = |source| ConstructionError {
            target: target.to_string(),
            source,
        };

        let endpoint = Endpoint::parse(target).map_err(construction_error)?;
        let client = BigIpClient::new(
            endpoint,
            module.credentials(),
            module.auth_mode,
            ClientOptions {
                timeout: self.request_timeout,
                verify_tls: module.verify_tls,
            },
        )
        .map_err(construction_error)?;

        Ok(Box::new(BigIpCollector::new(
            client,
            target,
            namespace,
            partition_filter(module),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigip_client::AuthMode;

    #[test]
    fn test_partition_filter() {
        let module = ModuleConfig::new("u", "p", AuthMode::Token);
        assert_eq!(partition_filter(&module), None);

        let module = module.with_partitions(["Common", "Tenant"]);
        assert_eq!(
            partition_filter(&module),
            Some(vec!["Common".to_string(), "Tenant".to_string()])
        );

        let mut module = ModuleConfig::new("u", "p", AuthMode::Token);
        module.partition_filter = Some(Vec::new());
        assert_eq!(partition_filter(&module), None);
    }

    #[test]
    fn test_build_binds_target() {
        let factory = BigIpCollectorFactory::new(Duration::from_secs(5));
        let module = ModuleConfig::new("admin", "admin", AuthMode::Basic);

        let collector = factory.build(&module, "10.0.0.5:443", "bigip").unwrap();
        assert_eq!(collector.target(), "10.0.0.5:443");
    }

    #[test]
    fn test_build_rejects_malformed_target() {
        let factory = BigIpCollectorFactory::new(Duration::from_secs(5));
        let module = ModuleConfig::new("admin", "admin", AuthMode::Token);

        let err = match factory.build(&module, "bigip.local/some/path", "bigip") {
            Ok(_) => panic!("expected construction error"),
            Err(e) => e,
        };
        assert_eq!(err.target, "bigip.local/some/path");
        assert!(matches!(
            err.source,
            bigip_client::Error::InvalidEndpoint { .. }
        ));
    }
}
