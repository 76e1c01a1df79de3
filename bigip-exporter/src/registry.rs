//! Request-scoped metric registry.
//!
//! Every scrape gets its own [`ScrapeRegistry`] holding exactly one collector.
//! The registry is consumed by [`ScrapeRegistry::gather`], so nothing
//! registered for one request can be seen by another.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::time::{Duration, Instant};

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use thiserror::Error;
use tracing::warn;

use crate::collector::{Collector, Sample};
use crate::error::ScrapeError;
use crate::mapping::{MetricKind, namespaced};

pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const EOF_MARKER: &str = "# EOF\n";

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("A collector is already registered in this scrape registry")]
    AlreadyRegistered,
}

type Labels = Vec<(String, String)>;

enum MetricFamily {
    Counter(Family<Labels, Counter<f64, AtomicU64>>),
    Gauge(Family<Labels, Gauge<f64, AtomicU64>>),
}

impl MetricFamily {
    fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => MetricFamily::Counter(Family::default()),
            MetricKind::Gauge => MetricFamily::Gauge(Family::default()),
        }
    }

    fn observe(&self, sample: &Sample) -> bool {
        match (self, sample.kind) {
            (MetricFamily::Counter(family), MetricKind::Counter) => {
                family.get_or_create(&sample.labels).inc_by(sample.value);
                true
            }
            (MetricFamily::Gauge(family), MetricKind::Gauge) => {
                family.get_or_create(&sample.labels).set(sample.value);
                true
            }
            _ => false,
        }
    }
}

/// Result of gathering a registry.
#[derive(Debug, Clone)]
pub struct Exposition {
    /// OpenMetrics text, `# EOF` trailer included.
    pub body: String,
    /// Samples returned by the collector.
    pub samples: usize,
    /// Time spent in the collector.
    pub duration: Duration,
}

/// A fresh, empty registry owned by a single scrape.
pub struct ScrapeRegistry {
    namespace: String,
    registry: Registry,
    collector: Option<Box<dyn Collector>>,
}

impl ScrapeRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            registry: Registry::default(),
            collector: None,
        }
    }

    /// Register the scrape's collector. Only one collector is accepted.
    pub fn register(&mut self, collector: Box<dyn Collector>) -> Result<(), RegistryError> {
        if self.collector.is_some() {
            return Err(RegistryError::AlreadyRegistered);
        }
        self.collector = Some(collector);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.collector.is_none()
    }

    /// Run the collector, bounded by `timeout`, and encode its samples.
    ///
    /// Consumes the registry; the collector is dropped when this returns.
    pub async fn gather(mut self, timeout: Duration) -> Result<Exposition, ScrapeError> {
        let started = Instant::now();

        let samples = match &self.collector {
            Some(collector) => {
                let target = collector.target().to_string();
                match tokio::time::timeout(timeout, collector.collect()).await {
                    // The device client may hit its own request deadline first.
                    Err(_) => return Err(ScrapeError::Timeout { target, timeout }),
                    Ok(Err(source)) if source.is_timeout() => {
                        return Err(ScrapeError::Timeout { target, timeout });
                    }
                    Ok(Err(source)) => return Err(ScrapeError::Collection { target, source }),
                    Ok(Ok(samples)) => samples,
                }
            }
            None => Vec::new(),
        };

        let duration = started.elapsed();
        let sample_count = samples.len();
        self.register_samples(samples);

        let scrape_duration = Gauge::<f64, AtomicU64>::default();
        scrape_duration.set(duration.as_secs_f64());
        self.registry.register(
            namespaced(&self.namespace, "scrape_duration_seconds"),
            "Time spent collecting metrics from the target",
            scrape_duration,
        );

        let mut body = String::new();
        encode(&mut body, &self.registry)?;

        Ok(Exposition {
            body,
            samples: sample_count,
            duration,
        })
    }

    fn register_samples(&mut self, samples: Vec<Sample>) {
        // Families are keyed by name; the first sample fixes help and type.
        let mut families: BTreeMap<String, (String, MetricFamily)> = BTreeMap::new();

        for sample in samples {
            let (_, family) = families
                .entry(sample.name.clone())
                .or_insert_with(|| (sample.help.clone(), MetricFamily::new(sample.kind)));

            if !family.observe(&sample) {
                warn!(
                    metric = %sample.name,
                    kind = sample.kind.as_str(),
                    "Dropping sample with conflicting metric type"
                );
            }
        }

        for (name, (help, family)) in families {
            match family {
                MetricFamily::Counter(family) => self.registry.register(name, help, family),
                MetricFamily::Gauge(family) => self.registry.register(name, help, family),
            }
        }
    }
}

/// Wire format of a scrape response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpositionFormat {
    /// Prometheus text format 0.0.4.
    #[default]
    Text,
    OpenMetrics,
}

impl ExpositionFormat {
    /// Pick a format from an `Accept` header value.
    ///
    /// OpenMetrics is chosen when it is listed with a non-zero quality; its
    /// weight relative to other media ranges is not compared.
    pub fn negotiate(accept: Option<&str>) -> Self {
        let wants_openmetrics = accept.is_some_and(|accept| {
            accept.split(',').any(|range| {
                let mut parts = range.split(';').map(str::trim);
                let media = parts.next().unwrap_or_default();
                media.eq_ignore_ascii_case("application/openmetrics-text") && quality(parts) > 0.0
            })
        });

        if wants_openmetrics {
            ExpositionFormat::OpenMetrics
        } else {
            ExpositionFormat::Text
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExpositionFormat::Text => TEXT_CONTENT_TYPE,
            ExpositionFormat::OpenMetrics => OPENMETRICS_CONTENT_TYPE,
        }
    }

    /// Convert an OpenMetrics body to this format.
    pub fn render(&self, mut body: String) -> String {
        if *self == ExpositionFormat::Text && body.ends_with(EOF_MARKER) {
            body.truncate(body.len() - EOF_MARKER.len());
        }
        body
    }
}

/// `q` parameter of a media range, 1.0 when absent or unparsable.
fn quality<'a>(mut params: impl Iterator<Item = &'a str>) -> f32 {
    params
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("q")
                .then(|| value.trim().parse::<f32>().ok())
                .flatten()
        })
        .unwrap_or(1.0)
}
