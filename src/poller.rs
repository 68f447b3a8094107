//! The fixed poll sequence for a single host.
//!
//! `poll_host` takes its collaborators as arguments and returns a value; it
//! touches no shared state, which keeps it testable with literal fixture
//! payloads. Every failure mode is folded into the returned record — a
//! misbehaving host must never disturb the caller's cycle.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::gateway::{CommandGateway, GatewayResult, Target};
use crate::parser;
use crate::{Credential, Host, InstanceStatus, ResourceState, ResourceStatus, StatusRecord};

/// Poll one host and compose its status record.
///
/// The liveness probe short-circuits: against a dead instance no further
/// commands are issued. `previous` is the host's record from the last
/// snapshot and feeds the changed flag.
#[instrument(skip_all, fields(host = %host.display_name()))]
pub async fn poll_host(
    gateway: &CommandGateway,
    host: &Host,
    credential: &Credential,
    previous: Option<&StatusRecord>,
) -> StatusRecord {
    let target = Target::from_host(host);

    if let Err(e) = gateway.probe_server_state(&target, credential).await {
        debug!("probe failed: {e}");
        let changed = previous.is_none_or(|prev| prev.instance_status != InstanceStatus::Down);
        return StatusRecord::down(e.to_string(), changed);
    }

    match fetch_resources(gateway, &target, credential).await {
        Ok((datasources, deployments)) => {
            let changed = previous.is_none_or(|prev| {
                prev.instance_status != InstanceStatus::Up
                    || resources_changed(&prev.datasources, &datasources)
                    || resources_changed(&prev.deployments, &deployments)
            });
            StatusRecord {
                instance_status: InstanceStatus::Up,
                datasources,
                deployments,
                last_check: Some(Utc::now()),
                changed,
                error: None,
            }
        }
        Err(e) => {
            warn!("resource query failed: {e}");
            StatusRecord::error(e.to_string())
        }
    }
}

async fn fetch_resources(
    gateway: &CommandGateway,
    target: &Target,
    credential: &Credential,
) -> GatewayResult<(Vec<ResourceStatus>, Vec<ResourceStatus>)> {
    let ds_payload = gateway.fetch_datasources(target, credential).await?;
    let datasources = parser::parse_datasources(&ds_payload);

    let dep_payload = gateway.fetch_deployments(target, credential).await?;
    let deployments = parser::parse_deployments(&dep_payload);

    Ok((datasources, deployments))
}

/// True when any name's status differs between the snapshots, or a name was
/// added or removed.
pub fn resources_changed(old: &[ResourceStatus], new: &[ResourceStatus]) -> bool {
    if old.len() != new.len() {
        return true;
    }
    let old_by_name: HashMap<&str, ResourceState> =
        old.iter().map(|r| (r.name.as_str(), r.status)).collect();
    new.iter()
        .any(|r| old_by_name.get(r.name.as_str()) != Some(&r.status))
}
