//! Decoders for the management interface's resource listings.
//!
//! The same logical listing arrives in different shapes depending on the
//! target's version, so each resource kind accepts every shape observed in
//! the field. A payload nothing here recognizes is a warning and an empty
//! list, never an error: a malformed listing must not make an otherwise
//! healthy host look broken.

pub mod dmr;

use serde_json::Value;
use tracing::warn;

use crate::gateway::CliOutput;
use crate::{ResourceState, ResourceStatus};

/// The listing sections datasources appear under.
const DATASOURCE_SECTIONS: [&str; 2] = ["data-source", "xa-data-source"];

/// Decode a datasource listing.
///
/// Shapes handled:
/// 1. section → name → details, where details carries `enabled`
/// 2. section → list of names (older targets; no way to tell state, so the
///    entries are assumed up)
/// 3. DMR bracket-notation text, scanned best-effort
pub fn parse_datasources(payload: &CliOutput) -> Vec<ResourceStatus> {
    match payload {
        CliOutput::Json(value) => datasources_from_json(value),
        CliOutput::Text(raw) => dmr::scan_datasources(raw),
    }
}

fn datasources_from_json(value: &Value) -> Vec<ResourceStatus> {
    let Some(root) = value.as_object() else {
        warn!("datasource payload is not an object, ignoring");
        return Vec::new();
    };

    let mut out = Vec::new();
    for section in DATASOURCE_SECTIONS {
        match root.get(section) {
            Some(Value::Object(entries)) => {
                for (name, details) in entries {
                    let enabled = details
                        .get("enabled")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    out.push(ResourceStatus {
                        name: name.clone(),
                        kind: section.to_string(),
                        status: state_from(enabled),
                    });
                }
            }
            Some(Value::Array(names)) => {
                for name in names {
                    if let Some(name) = name.as_str() {
                        out.push(ResourceStatus {
                            name: name.to_string(),
                            kind: section.to_string(),
                            status: ResourceState::Up,
                        });
                    }
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => {
                warn!("unrecognized `{section}` shape ({})", value_kind(other));
            }
        }
    }
    out
}

/// Decode a deployment listing.
///
/// Shapes handled:
/// 1. name → details, where details carries `enabled`
/// 2. list of entries, each carrying either an `address` path ending in the
///    deployment name plus a nested `result` with `enabled`, or a direct
///    `name`/`enabled` pair
pub fn parse_deployments(payload: &CliOutput) -> Vec<ResourceStatus> {
    let CliOutput::Json(value) = payload else {
        warn!("deployment payload is not JSON, ignoring");
        return Vec::new();
    };

    match value {
        Value::Object(entries) => entries
            .iter()
            .filter_map(|(name, details)| {
                let details = details.as_object()?;
                let enabled = details
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Some(deployment(name, enabled))
            })
            .collect(),
        Value::Array(entries) => entries
            .iter()
            .filter_map(deployment_from_list_entry)
            .collect(),
        other => {
            warn!("unrecognized deployment payload shape ({})", value_kind(other));
            Vec::new()
        }
    }
}

fn deployment_from_list_entry(entry: &Value) -> Option<ResourceStatus> {
    if let Some(address) = entry.get("address").and_then(Value::as_array) {
        let name = address
            .iter()
            .find_map(|part| part.get("deployment").and_then(Value::as_str))?;
        let enabled = entry
            .get("result")
            .and_then(|result| result.get("enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(true);
        return Some(deployment(name, enabled));
    }

    let name = entry.get("name").and_then(Value::as_str)?;
    let enabled = entry.get("enabled").and_then(Value::as_bool).unwrap_or(true);
    Some(deployment(name, enabled))
}

fn deployment(name: &str, enabled: bool) -> ResourceStatus {
    ResourceStatus {
        name: name.to_string(),
        kind: deployment_kind(name),
        status: state_from(enabled),
    }
}

/// Deployment kind from the archive extension; `unknown` for bare names.
fn deployment_kind(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "unknown".to_string(),
    }
}

fn state_from(enabled: bool) -> ResourceState {
    if enabled {
        ResourceState::Up
    } else {
        ResourceState::Down
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
