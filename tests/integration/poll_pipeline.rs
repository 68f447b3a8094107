//! End-to-end poll pipeline: gateway → parser → poller
//!
//! These tests run the full per-host sequence against scripted payloads,
//! covering the composed record shapes the dashboard consumers rely on.

use fleet_monitoring::config::Config;
use fleet_monitoring::gateway::{CliOutput, CommandGateway, GatewayError};
use fleet_monitoring::poller::poll_host;
use fleet_monitoring::{Credential, InstanceStatus, ResourceState};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::helpers::*;

fn credential() -> Credential {
    Credential {
        username: "monitor".to_string(),
        password: "test-secret".to_string(),
    }
}

#[tokio::test]
async fn healthy_host_composes_a_complete_record() {
    let gateway = CommandGateway::with_runner(&Config::default(), Box::new(ScriptedRunner::healthy()));
    let host = create_test_host("h1", "10.0.0.1");

    let record = poll_host(&gateway, &host, &credential(), None).await;

    assert_eq!(record.instance_status, InstanceStatus::Up);
    assert!(record.changed, "first poll has nothing to compare against");
    assert!(record.last_check.is_some());
    assert!(record.error.is_none());

    let ds: Vec<(&str, ResourceState)> = record
        .datasources
        .iter()
        .map(|r| (r.name.as_str(), r.status))
        .collect();
    assert_eq!(
        ds,
        vec![("DSbad", ResourceState::Down), ("DSok", ResourceState::Up)]
    );

    assert_eq!(record.deployments.len(), 1);
    assert_eq!(record.deployments[0].name, "App1.war");
    assert_eq!(record.deployments[0].kind, "war");
    assert_eq!(record.deployments[0].status, ResourceState::Up);
}

#[tokio::test]
async fn identical_polls_clear_the_changed_flag() {
    let gateway = CommandGateway::with_runner(&Config::default(), Box::new(ScriptedRunner::healthy()));
    let host = create_test_host("h1", "10.0.0.1");

    let first = poll_host(&gateway, &host, &credential(), None).await;
    let second = poll_host(&gateway, &host, &credential(), Some(&first)).await;

    assert!(first.changed);
    assert!(!second.changed);
}

#[tokio::test]
async fn datasource_status_flip_sets_the_changed_flag() {
    let host = create_test_host("h1", "10.0.0.1");

    let gateway = CommandGateway::with_runner(&Config::default(), Box::new(ScriptedRunner::healthy()));
    let first = poll_host(&gateway, &host, &credential(), None).await;

    // a separate gateway, so the flipped listing is not shadowed by the cache
    let mut flipped = ScriptedRunner::healthy();
    flipped.datasources = Ok(CliOutput::Json(json!({
        "data-source": {
            "DSok": {"enabled": false},
            "DSbad": {"enabled": false},
        },
    })));
    let gateway = CommandGateway::with_runner(&Config::default(), Box::new(flipped));
    let second = poll_host(&gateway, &host, &credential(), Some(&first)).await;

    assert!(second.changed);
    assert_eq!(second.instance_status, InstanceStatus::Up);
}

#[tokio::test]
async fn listing_failure_after_probe_becomes_an_error_record() {
    let mut runner = ScriptedRunner::healthy();
    runner.datasources = Err(GatewayError::Execution {
        code: Some(1),
        stderr: "failed to resolve expression".to_string(),
    });
    let gateway = CommandGateway::with_runner(&Config::default(), Box::new(runner));
    let host = create_test_host("h1", "10.0.0.1");

    let record = poll_host(&gateway, &host, &credential(), None).await;

    assert_eq!(record.instance_status, InstanceStatus::Error);
    assert!(record.changed);
    assert!(record.datasources.is_empty());
    assert!(record.deployments.is_empty());
    assert!(
        record
            .error
            .as_deref()
            .unwrap_or("")
            .contains("failed to resolve expression")
    );
}

#[tokio::test]
async fn malformed_listing_degrades_to_empty_resources_not_an_error() {
    let mut runner = ScriptedRunner::healthy();
    runner.datasources = Ok(CliOutput::Json(json!("console banner text")));
    let gateway = CommandGateway::with_runner(&Config::default(), Box::new(runner));
    let host = create_test_host("h1", "10.0.0.1");

    let record = poll_host(&gateway, &host, &credential(), None).await;

    // a parse failure must not make the host look broken
    assert_eq!(record.instance_status, InstanceStatus::Up);
    assert!(record.datasources.is_empty());
    assert_eq!(record.deployments.len(), 1);
    assert!(record.error.is_none());
}
