//! BIG-IP multi-target Prometheus exporter.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info, warn};

use bigip_exporter::config::{ExporterSection, FileConfig, LogFormat};
use bigip_exporter::logging::init_tracing;
use bigip_exporter::{BigIpCollectorFactory, Configuration, HttpServer, ScrapeDispatcher};

/// Multi-target Prometheus exporter for BIG-IP appliances.
#[derive(Parser, Debug)]
#[command(name = "bigip-exporter")]
#[command(about = "Export BIG-IP statistics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (YAML format).
    #[arg(short, long, env = "BE_EXPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Exporter bind address.
    #[arg(long, env = "BE_EXPORTER_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Exporter bind port.
    #[arg(long, env = "BE_EXPORTER_BIND_PORT")]
    bind_port: Option<u16>,

    /// Metric namespace prefix.
    #[arg(long, env = "BE_EXPORTER_NAMESPACE")]
    namespace: Option<String>,

    /// Log level (trace, debug, info, warning, error, critical).
    #[arg(long, env = "BE_EXPORTER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, env = "BE_EXPORTER_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Module used when a scrape has no module parameter.
    #[arg(long, env = "BE_EXPORTER_DEFAULT_MODULE")]
    default_module: Option<String>,

    /// Upper bound on device collection per scrape, in seconds.
    #[arg(long, env = "BE_EXPORTER_SCRAPE_TIMEOUT_SECS")]
    scrape_timeout_secs: Option<u64>,
}

impl Args {
    fn overrides(&self) -> ExporterSection {
        ExporterSection {
            bind_address: self.bind_address.clone(),
            bind_port: self.bind_port,
            namespace: self.namespace.clone(),
            log_level: self.log_level.clone(),
            log_format: self.log_format,
            default_module: self.default_module.clone(),
            scrape_timeout_secs: self.scrape_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let file = match &args.config {
        Some(path) => FileConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => FileConfig::default(),
    };
    let config = Configuration::from_sources(file, args.overrides())
        .context("Invalid configuration")?;

    init_tracing(&config.settings)?;

    info!(
        modules = config.modules.len(),
        namespace = %config.settings.namespace,
        default_module = %config.settings.default_module,
        "Starting BIG-IP exporter"
    );
    debug!(config = ?config, "Resolved configuration");

    if !config.modules.contains(&config.settings.default_module) {
        warn!(
            module = %config.settings.default_module,
            "Default module is not configured; scrapes without module= will be rejected"
        );
    }

    let config = Arc::new(config);
    let factory = Arc::new(BigIpCollectorFactory::new(config.settings.scrape_timeout));
    let dispatcher = Arc::new(ScrapeDispatcher::new(config.clone(), factory));

    let server = HttpServer::new(
        dispatcher,
        config.settings.bind_address.clone(),
        config.settings.bind_port,
    );

    if let Err(e) = server.run().await {
        error!(error = %e, "Process failed");
        return Err(e);
    }

    Ok(())
}
