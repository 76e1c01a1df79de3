//! Per-request collectors that pull statistics from one appliance.

use async_trait::async_trait;
use bigip_client::{BigIpClient, StatsEntry, StatsKind};
use thiserror::Error;
use tracing::{debug, warn};

use crate::mapping::{MetricKind, availability_value, build_metric_name, namespaced};

/// Errors raised while a collector runs.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Device error: {0}")]
    Device(#[from] bigip_client::Error),
}

impl CollectError {
    /// Whether the device stopped answering before the request deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            CollectError::Device(e) => e.is_timeout(),
        }
    }
}

/// A single metric sample produced by a collector.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Full metric name, namespace included.
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: MetricKind::Gauge,
            labels: Vec::new(),
            value,
        }
    }

    pub fn counter(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            kind: MetricKind::Counter,
            ..Self::gauge(name, help, value)
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }
}

/// Something that produces a set of samples for its bound target.
///
/// A collector is built for one scrape and dropped with it.
#[async_trait]
pub trait Collector: Send + Sync {
    /// The target this collector is bound to.
    fn target(&self) -> &str;

    /// Query the target and return its samples.
    async fn collect(&self) -> Result<Vec<Sample>, CollectError>;
}

/// Collector for a BIG-IP appliance.
pub struct BigIpCollector {
    client: BigIpClient,
    target: String,
    namespace: String,
    partitions: Option<Vec<String>>,
}

impl BigIpCollector {
    pub fn new(
        client: BigIpClient,
        target: impl Into<String>,
        namespace: impl Into<String>,
        partitions: Option<Vec<String>>,
    ) -> Self {
        Self {
            client,
            target: target.into(),
            namespace: namespace.into(),
            partitions,
        }
    }

    fn in_scope(&self, entry: &StatsEntry) -> bool {
        self.partitions
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|p| p == &entry.partition))
    }

    fn push_entry(&self, kind: StatsKind, entry: &StatsEntry, samples: &mut Vec<Sample>) {
        for (stat, value) in &entry.values {
            samples.push(Sample {
                name: build_metric_name(&self.namespace, kind, stat),
                help: format!("BIG-IP {} statistic {}", kind, stat),
                kind: MetricKind::for_stat(stat),
                labels: entry_labels(entry),
                value: *value,
            });
        }

        if let Some(state) = entry.descriptions.get("status.availabilityState") {
            samples.push(Sample {
                name: build_metric_name(&self.namespace, kind, "available"),
                help: format!("Whether the {} is available", kind),
                kind: MetricKind::Gauge,
                labels: entry_labels(entry),
                value: availability_value(state),
            });
        }
    }
}

fn entry_labels(entry: &StatsEntry) -> Vec<(String, String)> {
    vec![
        ("partition".to_string(), entry.partition.clone()),
        ("name".to_string(), entry.name.clone()),
    ]
}

#[async_trait]
impl Collector for BigIpCollector {
    fn target(&self) -> &str {
        &self.target
    }

    async fn collect(&self) -> Result<Vec<Sample>, CollectError> {
        let session = self.client.connect().await?;

        let (virtuals, pools, nodes) = tokio::join!(
            session.stats(StatsKind::Virtual),
            session.stats(StatsKind::Pool),
            session.stats(StatsKind::Node),
        );

        let mut samples = Vec::new();
        let mut first_error = None;
        let mut succeeded = 0usize;

        for (kind, result) in [
            (StatsKind::Virtual, virtuals),
            (StatsKind::Pool, pools),
            (StatsKind::Node, nodes),
        ] {
            let success = match result {
                Ok(entries) => {
                    succeeded += 1;
                    for entry in entries.iter().filter(|e| self.in_scope(e)) {
                        self.push_entry(kind, entry, &mut samples);
                    }
                    1.0
                }
                Err(e) => {
                    warn!(
                        device = %self.target,
                        collector = %kind,
                        error = %e,
                        "Stats query failed"
                    );
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    0.0
                }
            };

            samples.push(
                Sample::gauge(
                    namespaced(&self.namespace, "scrape_collector_success"),
                    "Whether a stats collection succeeded",
                    success,
                )
                .with_label("collector", kind.as_str()),
            );
        }

        if succeeded == 0 {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }

        debug!(
            device = %self.target,
            samples = samples.len(),
            "Collected appliance statistics"
        );
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use bigip_client::{AuthMode, ClientOptions, Credentials, Endpoint};

    fn collector(partitions: Option<Vec<String>>) -> BigIpCollector {
        let client = BigIpClient::new(
            Endpoint::parse("10.0.0.5:443").unwrap(),
            Credentials::new("admin", "admin"),
            AuthMode::Token,
            ClientOptions::default(),
        )
        .unwrap();
        BigIpCollector::new(client, "10.0.0.5:443", "bigip", partitions)
    }

    fn entry(partition: &str, name: &str) -> StatsEntry {
        let mut values = BTreeMap::new();
        values.insert("clientside.curConns".to_string(), 5.0);
        values.insert("clientside.bitsIn".to_string(), 800.0);
        let mut descriptions = BTreeMap::new();
        descriptions.insert(
            "status.availabilityState".to_string(),
            "available".to_string(),
        );
        StatsEntry {
            name: name.to_string(),
            partition: partition.to_string(),
            values,
            descriptions,
        }
    }

    #[test]
    fn test_push_entry_samples() {
        let collector = collector(None);
        let mut samples = Vec::new();
        collector.push_entry(StatsKind::Virtual, &entry("Common", "vs_web"), &mut samples);

        assert_eq!(samples.len(), 3);

        let bits = samples
            .iter()
            .find(|s| s.name == "bigip_vs_clientside_bits_in")
            .unwrap();
        assert_eq!(bits.kind, MetricKind::Counter);
        assert_eq!(bits.value, 800.0);
        assert!(bits.labels.contains(&("name".to_string(), "vs_web".to_string())));
        assert!(bits.labels.contains(&("partition".to_string(), "Common".to_string())));

        let conns = samples
            .iter()
            .find(|s| s.name == "bigip_vs_clientside_cur_conns")
            .unwrap();
        assert_eq!(conns.kind, MetricKind::Gauge);

        let available = samples
            .iter()
            .find(|s| s.name == "bigip_vs_available")
            .unwrap();
        assert_eq!(available.value, 1.0);
    }

    #[test]
    fn test_partition_filter() {
        let all = collector(None);
        assert!(all.in_scope(&entry("Common", "a")));
        assert!(all.in_scope(&entry("Tenant", "b")));

        let filtered = collector(Some(vec!["Tenant".to_string()]));
        assert!(!filtered.in_scope(&entry("Common", "a")));
        assert!(filtered.in_scope(&entry("Tenant", "b")));
    }

    #[test]
    fn test_sample_builders() {
        let sample = Sample::counter("x_total_bytes", "help", 2.0).with_label("k", "v");
        assert_eq!(sample.kind, MetricKind::Counter);
        assert_eq!(sample.labels, vec![("k".to_string(), "v".to_string())]);
    }
}
