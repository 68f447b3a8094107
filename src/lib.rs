pub mod config;
pub mod gateway;
pub mod monitor;
pub mod parser;
pub mod poller;
pub mod registry;
pub mod store;
pub mod util;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the two monitored fleets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Production,
    NonProduction,
}

impl Environment {
    pub const ALL: [Environment; 2] = [Environment::Production, Environment::NonProduction];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::NonProduction => "non_production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored application-server instance. Owned by the host registry,
/// read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub label: Option<String>,
}

impl Host {
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.host, self.port))
    }
}

/// Management credentials for one environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

// The password must never reach logs, so Debug masks it.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"******")
            .finish()
    }
}

/// State of a single datasource or deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    Up,
    Down,
}

/// One datasource or deployment as reported by the management interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub name: String,
    /// Resource kind: `data-source` / `xa-data-source` for datasources, the
    /// file extension (`war`, `ear`, ...) for deployments.
    #[serde(rename = "type")]
    pub kind: String,
    pub status: ResourceState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    #[default]
    Unknown,
    Up,
    Down,
    Error,
}

/// The full outcome of polling one host. Produced whole on every poll; a poll
/// either yields a complete record or an error record, never a partial merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub instance_status: InstanceStatus,
    #[serde(default)]
    pub datasources: Vec<ResourceStatus>,
    #[serde(default)]
    pub deployments: Vec<ResourceStatus>,
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusRecord {
    /// Record for a host whose liveness probe failed.
    pub fn down(detail: impl Into<String>, changed: bool) -> Self {
        Self {
            instance_status: InstanceStatus::Down,
            last_check: Some(Utc::now()),
            changed,
            error: Some(detail.into()),
            ..Self::default()
        }
    }

    /// Record for a host whose poll failed after the probe succeeded.
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            instance_status: InstanceStatus::Error,
            last_check: Some(Utc::now()),
            changed: true,
            error: Some(detail.into()),
            ..Self::default()
        }
    }
}

/// A host joined with its most recent status, as handed to the report and
/// dashboard collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct HostStatusView {
    #[serde(flatten)]
    pub host: Host,
    pub status: StatusRecord,
}

/// Combine a host list with a status snapshot. Hosts without a record yet get
/// a default `unknown` entry so consumers always see the full fleet.
pub fn merged_view(hosts: &[Host], status: &store::StatusMap) -> Vec<HostStatusView> {
    hosts
        .iter()
        .map(|host| HostStatusView {
            host: host.clone(),
            status: status.get(&host.id).cloned().unwrap_or_default(),
        })
        .collect()
}
