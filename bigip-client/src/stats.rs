//! Statistics returned by the iControl REST `*/stats` collections.
//!
//! The appliance wraps every object in an `entries -> nestedStats -> entries`
//! envelope. Leaf fields carry either a numeric `value` or a textual
//! `description`; the object's full path lives in `tmName`.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Partition assumed for objects without a qualified path.
pub const DEFAULT_PARTITION: &str = "Common";

/// The statistics collections the client can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatsKind {
    Virtual,
    Pool,
    Node,
}

impl StatsKind {
    /// REST path of the stats collection.
    pub fn path(&self) -> &'static str {
        match self {
            StatsKind::Virtual => "/mgmt/tm/ltm/virtual/stats",
            StatsKind::Pool => "/mgmt/tm/ltm/pool/stats",
            StatsKind::Node => "/mgmt/tm/ltm/node/stats",
        }
    }

    /// Short name used in metric names.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsKind::Virtual => "vs",
            StatsKind::Pool => "pool",
            StatsKind::Node => "node",
        }
    }
}

impl fmt::Display for StatsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics for a single appliance object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsEntry {
    /// Object name relative to its partition.
    pub name: String,
    /// Administrative partition owning the object.
    pub partition: String,
    /// Numeric fields keyed by stat name (e.g. `clientside.bitsIn`).
    pub values: BTreeMap<String, f64>,
    /// Textual fields keyed by stat name (e.g. `status.availabilityState`).
    pub descriptions: BTreeMap<String, String>,
}

impl StatsEntry {
    fn from_fields(fields: &Map<String, Value>) -> Result<Self> {
        let full_path = fields
            .get("tmName")
            .and_then(|v| v.get("description"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Decode("stats entry without tmName".to_string()))?;

        let (partition, name) = split_full_path(full_path);
        let mut entry = StatsEntry {
            name,
            partition,
            ..Default::default()
        };

        for (key, field) in fields {
            if key == "tmName" {
                continue;
            }
            if let Some(value) = field.get("value").and_then(Value::as_f64) {
                entry.values.insert(key.clone(), value);
            } else if let Some(text) = field.get("description").and_then(Value::as_str) {
                entry.descriptions.insert(key.clone(), text.to_string());
            }
        }

        Ok(entry)
    }
}

/// Decode a stats collection body.
///
/// A body without `entries` is an empty collection.
pub fn parse_stats(body: &Value) -> Result<Vec<StatsEntry>> {
    let root = body
        .as_object()
        .ok_or_else(|| Error::Decode("stats body is not a JSON object".to_string()))?;

    let mut entries = Vec::new();
    if let Some(top) = root.get("entries").and_then(Value::as_object) {
        collect_entries(top, &mut entries)?;
    }
    Ok(entries)
}

fn collect_entries(entries: &Map<String, Value>, out: &mut Vec<StatsEntry>) -> Result<()> {
    for value in entries.values() {
        let Some(nested) = value
            .get("nestedStats")
            .and_then(|n| n.get("entries"))
            .and_then(Value::as_object)
        else {
            continue;
        };

        // Newer firmware adds one more envelope per object.
        if !nested.contains_key("tmName") && nested.values().any(|v| v.get("nestedStats").is_some())
        {
            collect_entries(nested, out)?;
        } else {
            out.push(StatsEntry::from_fields(nested)?);
        }
    }
    Ok(())
}

/// Split `/Partition/name` into `(partition, name)`.
pub fn split_full_path(path: &str) -> (String, String) {
    let trimmed = path.trim_start_matches('/');
    match (path.starts_with('/'), trimmed.split_once('/')) {
        (true, Some((partition, name))) if !partition.is_empty() => {
            (partition.to_string(), name.to_string())
        }
        _ => (DEFAULT_PARTITION.to_string(), trimmed.to_string()),
    }
}
