//! Mapping from appliance statistics to Prometheus metric names and types.

use bigip_client::StatsKind;

/// Sanitize a metric name to be Prometheus-compatible.
///
/// Prometheus metric names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`.
/// This function:
/// - Converts camelCase words to snake_case
/// - Replaces invalid characters with underscores
/// - Ensures the name starts with a letter or underscore
/// - Collapses multiple underscores into one
pub fn sanitize_metric_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 8);
    let mut last_was_underscore = false;
    let mut prev_lower_or_digit = false;
    let mut chars = name.chars().peekable();

    // A leading digit is kept behind an underscore
    if let Some(&first) = chars.peek()
        && first.is_ascii_digit()
    {
        result.push('_');
        last_was_underscore = true;
    }

    for c in chars {
        if c.is_ascii_uppercase() {
            if prev_lower_or_digit && !last_was_underscore {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            last_was_underscore = false;
            prev_lower_or_digit = false;
        } else if c.is_ascii_alphanumeric() || c == ':' {
            result.push(c);
            last_was_underscore = false;
            prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            // Underscore or invalid character, collapsed
            if !last_was_underscore {
                result.push('_');
                last_was_underscore = true;
            }
            prev_lower_or_digit = false;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        result.push_str("unnamed");
    }

    result
}

/// Check whether `name` is already a valid Prometheus metric name.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Build a full metric name for an appliance statistic.
///
/// Format: `{namespace}_{kind}_{stat}`
pub fn build_metric_name(namespace: &str, kind: StatsKind, stat: &str) -> String {
    let sanitized = sanitize_metric_name(stat);

    if namespace.is_empty() {
        format!("{}_{}", kind.as_str(), sanitized)
    } else {
        format!("{}_{}_{}", namespace, kind.as_str(), sanitized)
    }
}

/// Prefix an exporter-level metric with the namespace.
pub fn namespaced(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", namespace, name)
    }
}

/// Prometheus type of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    /// Classify an appliance statistic by its name.
    ///
    /// Running totals (`totConns`, `bitsIn`, `pktsOut`) are counters; current
    /// and peak values (`curConns`, `maxConns`) are gauges.
    pub fn for_stat(stat: &str) -> Self {
        let leaf = stat.rsplit('.').next().unwrap_or(stat);
        if leaf.starts_with("tot") || leaf.ends_with("In") || leaf.ends_with("Out") {
            MetricKind::Counter
        } else {
            MetricKind::Gauge
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// Map an availability description to a gauge value.
pub fn availability_value(state: &str) -> f64 {
    if state.eq_ignore_ascii_case("available") {
        1.0
    } else {
        0.0
    }
}
