//! Configuration for the BIG-IP exporter.
//!
//! Settings are merged from three sources, highest precedence first:
//! command-line flags / `BE_*` environment variables, the optional YAML file,
//! and built-in defaults. The merged [`Configuration`] is immutable and shared
//! read-only by every request.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use bigip_client::{AuthMode, Credentials};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapping::is_valid_metric_name;

/// Module used when a scrape omits `module=`.
pub const DEFAULT_MODULE: &str = "test_env";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Lookup of a module name that is not configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Module '{name}' is not configured")]
pub struct ModuleNotFound {
    pub name: String,
}

/// Raw configuration file layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Service settings.
    #[serde(default)]
    pub exporter: ExporterSection,

    /// Named connection profiles.
    #[serde(default, alias = "configs")]
    pub modules: HashMap<String, ModuleSection>,
}

/// Service settings as given by one source. Unset fields fall through to the
/// next source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExporterSection {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
    pub namespace: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub default_module: Option<String>,
    pub scrape_timeout_secs: Option<u64>,
}

impl ExporterSection {
    /// Layer `self` over `lower`: fields set here win.
    pub fn over(self, lower: ExporterSection) -> ExporterSection {
        ExporterSection {
            bind_address: self.bind_address.or(lower.bind_address),
            bind_port: self.bind_port.or(lower.bind_port),
            namespace: self.namespace.or(lower.namespace),
            log_level: self.log_level.or(lower.log_level),
            log_format: self.log_format.or(lower.log_format),
            default_module: self.default_module.or(lower.default_module),
            scrape_timeout_secs: self.scrape_timeout_secs.or(lower.scrape_timeout_secs),
        }
    }
}

/// Raw module entry as written in the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleSection {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Use HTTP basic authentication instead of a login token.
    #[serde(default)]
    pub basic_auth: bool,

    /// Partitions to export: a comma-separated string or a list.
    #[serde(default)]
    pub partitions: Option<PartitionList>,

    /// Verify the appliance's TLS certificate.
    #[serde(default)]
    pub verify_tls: bool,
}

/// Either spelling of a partition list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PartitionList {
    Csv(String),
    List(Vec<String>),
}

impl PartitionList {
    /// Normalize to a non-empty list, or `None` for "all partitions".
    pub fn into_filter(self) -> Option<Vec<String>> {
        let items: Vec<String> = match self {
            PartitionList::Csv(csv) => csv.split(',').map(str::to_string).collect(),
            PartitionList::List(list) => list,
        };
        let items: Vec<String> = items
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        if items.is_empty() { None } else { Some(items) }
    }
}

/// One named authentication/connection profile.
#[derive(Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    pub username: String,
    pub password: String,
    pub auth_mode: AuthMode,
    /// Partitions to export, `None` meaning all of them.
    pub partition_filter: Option<Vec<String>>,
    pub verify_tls: bool,
}

impl ModuleConfig {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        auth_mode: AuthMode,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            auth_mode,
            partition_filter: None,
            verify_tls: false,
        }
    }

    pub fn with_partitions<I, S>(mut self, partitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_filter =
            PartitionList::List(partitions.into_iter().map(Into::into).collect()).into_filter();
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

impl From<ModuleSection> for ModuleConfig {
    fn from(section: ModuleSection) -> Self {
        Self {
            username: section.username,
            password: section.password,
            auth_mode: AuthMode::from_basic_auth(section.basic_auth),
            partition_filter: section.partitions.and_then(PartitionList::into_filter),
            verify_tls: section.verify_tls,
        }
    }
}

impl fmt::Debug for ModuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_mode", &self.auth_mode)
            .field("partition_filter", &self.partition_filter)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

/// Immutable table of named modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleStore {
    modules: HashMap<String, ModuleConfig>,
}

impl ModuleStore {
    /// Exact, case-sensitive lookup. Never substitutes a default.
    pub fn resolve(&self, name: &str) -> Result<(&str, &ModuleConfig), ModuleNotFound> {
        self.modules
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ModuleNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<(String, ModuleConfig)> for ModuleStore {
    fn from_iter<T: IntoIterator<Item = (String, ModuleConfig)>>(iter: T) -> Self {
        Self {
            modules: iter.into_iter().collect(),
        }
    }
}

/// Log output format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Service-wide operational parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterSettings {
    pub bind_address: String,
    pub bind_port: u16,
    /// Metric name prefix.
    pub namespace: String,
    /// Requested log level; validated when logging is initialized.
    pub log_level: String,
    pub log_format: LogFormat,
    /// Module used when a scrape omits `module=`.
    pub default_module: String,
    /// Upper bound on device collection per scrape.
    pub scrape_timeout: Duration,
}

fn default_bind_address() -> String {
    "localhost".to_string()
}

fn default_bind_port() -> u16 {
    9142
}

fn default_namespace() -> String {
    "bigip".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scrape_timeout_secs() -> u64 {
    10
}

impl Default for ExporterSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            namespace: default_namespace(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            default_module: DEFAULT_MODULE.to_string(),
            scrape_timeout: Duration::from_secs(default_scrape_timeout_secs()),
        }
    }
}

impl ExporterSettings {
    fn from_section(section: ExporterSection) -> Self {
        Self {
            bind_address: section.bind_address.unwrap_or_else(default_bind_address),
            bind_port: section.bind_port.unwrap_or_else(default_bind_port),
            namespace: section.namespace.unwrap_or_else(default_namespace),
            log_level: section.log_level.unwrap_or_else(default_log_level),
            log_format: section.log_format.unwrap_or_default(),
            default_module: section
                .default_module
                .unwrap_or_else(|| DEFAULT_MODULE.to_string()),
            scrape_timeout: Duration::from_secs(
                section
                    .scrape_timeout_secs
                    .unwrap_or_else(default_scrape_timeout_secs),
            ),
        }
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bind_address must not be empty".to_string(),
            ));
        }

        if self.bind_port == 0 {
            return Err(ConfigError::Validation(
                "bind_port must be > 0".to_string(),
            ));
        }

        if !is_valid_metric_name(&self.namespace) {
            return Err(ConfigError::Validation(format!(
                "Invalid namespace: {}",
                self.namespace
            )));
        }

        if self.default_module.is_empty() {
            return Err(ConfigError::Validation(
                "default_module must not be empty".to_string(),
            ));
        }

        if self.scrape_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "scrape_timeout_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Merged, validated configuration.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub modules: ModuleStore,
    pub settings: ExporterSettings,
}

impl FileConfig {
    /// Load a configuration file in YAML format.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a YAML document. An empty document yields the defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

impl Configuration {
    pub fn new(modules: ModuleStore, settings: ExporterSettings) -> Self {
        Self { modules, settings }
    }

    /// Merge a file with higher-precedence overrides and validate the result.
    pub fn from_sources(file: FileConfig, overrides: ExporterSection) -> Result<Self, ConfigError> {
        let settings = ExporterSettings::from_section(overrides.over(file.exporter));
        settings.validate()?;

        if file.modules.keys().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "Module names must not be empty".to_string(),
            ));
        }

        let modules = file
            .modules
            .into_iter()
            .map(|(name, section)| (name, ModuleConfig::from(section)))
            .collect();

        Ok(Self { modules, settings })
    }

    /// Parse configuration from a YAML string with no overrides.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Self::from_sources(FileConfig::parse(content)?, ExporterSection::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = Configuration::parse("").unwrap();

        assert_eq!(config.settings.bind_address, "localhost");
        assert_eq!(config.settings.bind_port, 9142);
        assert_eq!(config.settings.namespace, "bigip");
        assert_eq!(config.settings.log_level, "info");
        assert_eq!(config.settings.default_module, "test_env");
        assert_eq!(config.settings.scrape_timeout, Duration::from_secs(10));
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
exporter:
  bind_address: 0.0.0.0
  bind_port: 9200
  namespace: f5
  log_level: debug
  log_format: json
  default_module: lab
  scrape_timeout_secs: 30
modules:
  lab:
    username: admin
    password: secret
    partitions: "Common, Tenant1,"
  prod:
    username: monitor
    password: hunter2
    basic_auth: true
    partitions: [Common]
    verify_tls: true
"#;

        let config = Configuration::parse(yaml).unwrap();

        assert_eq!(config.settings.bind_address, "0.0.0.0");
        assert_eq!(config.settings.bind_port, 9200);
        assert_eq!(config.settings.namespace, "f5");
        assert_eq!(config.settings.log_format, LogFormat::Json);
        assert_eq!(config.settings.default_module, "lab");
        assert_eq!(config.settings.scrape_timeout, Duration::from_secs(30));
        assert_eq!(config.modules.names(), vec!["lab", "prod"]);

        let (_, lab) = config.modules.resolve("lab").unwrap();
        assert_eq!(lab.auth_mode, AuthMode::Token);
        assert_eq!(
            lab.partition_filter,
            Some(vec!["Common".to_string(), "Tenant1".to_string()])
        );
        assert!(!lab.verify_tls);

        let (_, prod) = config.modules.resolve("prod").unwrap();
        assert_eq!(prod.auth_mode, AuthMode::Basic);
        assert_eq!(prod.partition_filter, Some(vec!["Common".to_string()]));
        assert!(prod.verify_tls);
    }

    #[test]
    fn test_configs_alias() {
        let yaml = r#"
configs:
  test_env:
    username: admin
    password: admin
"#;
        let config = Configuration::parse(yaml).unwrap();
        assert!(config.modules.contains("test_env"));
    }

    #[test]
    fn test_empty_partitions_mean_all() {
        let yaml = r#"
modules:
  a: { partitions: "" }
  b: { partitions: " , " }
  c: { partitions: [] }
  d: {}
"#;
        let config = Configuration::parse(yaml).unwrap();
        for name in ["a", "b", "c", "d"] {
            let (_, module) = config.modules.resolve(name).unwrap();
            assert_eq!(module.partition_filter, None, "module {}", name);
        }
    }

    #[test]
    fn test_resolve_is_exact_and_case_sensitive() {
        let store: ModuleStore = [(
            "test_env".to_string(),
            ModuleConfig::new("u", "p", AuthMode::Token),
        )]
        .into_iter()
        .collect();

        assert!(store.resolve("test_env").is_ok());
        assert_eq!(
            store.resolve("TEST_ENV").unwrap_err(),
            ModuleNotFound {
                name: "TEST_ENV".to_string()
            }
        );
        assert!(store.resolve("test").is_err());
        assert!(store.resolve("").is_err());
    }

    #[test]
    fn test_overrides_take_precedence_over_file() {
        let file = FileConfig::parse(
            r#"
exporter:
  bind_port: 9200
  namespace: filens
"#,
        )
        .unwrap();
        let overrides = ExporterSection {
            bind_port: Some(9300),
            log_level: Some("warn".to_string()),
            ..Default::default()
        };

        let config = Configuration::from_sources(file, overrides).unwrap();

        assert_eq!(config.settings.bind_port, 9300);
        assert_eq!(config.settings.namespace, "filens");
        assert_eq!(config.settings.log_level, "warn");
    }

    #[test]
    fn test_validate_invalid_namespace() {
        let result = Configuration::parse("exporter: { namespace: \"bad-name\" }");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid namespace")
        );
    }

    #[test]
    fn test_validate_zero_port() {
        assert!(Configuration::parse("exporter: { bind_port: 0 }").is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        assert!(Configuration::parse("exporter: { scrape_timeout_secs: 0 }").is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        let result = Configuration::parse("modules: [not, a, map]");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "modules:\n  test_env:\n    username: admin").unwrap();

        let config = FileConfig::load_from_file(file.path()).unwrap();
        assert!(config.modules.contains_key("test_env"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = FileConfig::load_from_file("/nonexistent/bigip-exporter.yml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_module_debug_redacts_password() {
        let module = ModuleConfig::new("admin", "hunter2", AuthMode::Basic);
        let debug = format!("{:?}", module);
        assert!(!debug.contains("hunter2"));
    }
}
