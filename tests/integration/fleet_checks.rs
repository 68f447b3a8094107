//! On-demand fleet and single-host checks through the monitor handle
//!
//! Simulation mode stands in for the management CLI, so these tests exercise
//! the actor, the bounded pool, and the store merge discipline end to end.

use std::sync::Arc;
use std::time::Duration;

use fleet_monitoring::gateway::CommandGateway;
use fleet_monitoring::monitor::MonitorHandle;
use fleet_monitoring::store::{CHECK_IN_PROGRESS_KEY, LAST_UPDATED_KEY, StatusStore};
use fleet_monitoring::{Environment, InstanceStatus, merged_view};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn fleet_check_persists_a_record_for_every_host() {
    let dir = tempfile::tempdir().unwrap();
    let hosts: Vec<_> = (1..=7)
        .map(|i| create_test_host(&format!("h{i}"), &format!("10.0.0.{i}")))
        .collect();
    provision_environment(dir.path(), Environment::Production, &hosts);

    let config = simulation_config(dir.path());
    let gateway = Arc::new(CommandGateway::new(&config));
    let handle = MonitorHandle::spawn(config, gateway);

    let checked = handle.check_fleet(Environment::Production).await.unwrap();
    assert_eq!(checked, 7);

    let store = StatusStore::new(dir.path(), Duration::from_secs(5));
    let snapshot = store.load(Environment::Production).await;
    assert_eq!(snapshot.len(), 7);
    for (_, record) in snapshot.records() {
        assert_eq!(record.instance_status, InstanceStatus::Up);
        // the simulation fixtures carry three datasources and two deployments
        assert_eq!(record.datasources.len(), 3);
        assert_eq!(record.deployments.len(), 2);
    }

    // every save is independently observable, and the progress marker is gone
    assert!(snapshot.metadata(LAST_UPDATED_KEY).is_some());
    assert!(snapshot.metadata(CHECK_IN_PROGRESS_KEY).is_none());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn single_host_check_returns_and_persists_the_fresh_record() {
    let dir = tempfile::tempdir().unwrap();
    let hosts = vec![
        create_test_host("h1", "10.0.0.1"),
        create_test_host("h2", "10.0.0.2"),
    ];
    provision_environment(dir.path(), Environment::NonProduction, &hosts);

    let config = simulation_config(dir.path());
    let gateway = Arc::new(CommandGateway::new(&config));
    let handle = MonitorHandle::spawn(config, gateway);

    let record = handle
        .check_host(Environment::NonProduction, "h2")
        .await
        .unwrap();
    assert_eq!(record.instance_status, InstanceStatus::Up);

    let store = StatusStore::new(dir.path(), Duration::from_secs(5));
    let snapshot = store.load(Environment::NonProduction).await;
    // only the requested host was polled
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get("h2").unwrap(), &record);
    assert!(snapshot.get("h1").is_none());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_host_id_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    provision_environment(
        dir.path(),
        Environment::Production,
        &[create_test_host("h1", "10.0.0.1")],
    );

    let config = simulation_config(dir.path());
    let gateway = Arc::new(CommandGateway::new(&config));
    let handle = MonitorHandle::spawn(config, gateway);

    let result = handle.check_host(Environment::Production, "nope").await;
    assert!(result.unwrap_err().to_string().contains("unknown host id"));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn merged_view_joins_hosts_with_their_records() {
    let dir = tempfile::tempdir().unwrap();
    let hosts = vec![
        create_test_host("h1", "10.0.0.1"),
        create_test_host("h2", "10.0.0.2"),
    ];
    provision_environment(dir.path(), Environment::Production, &hosts);

    let config = simulation_config(dir.path());
    let gateway = Arc::new(CommandGateway::new(&config));
    let handle = MonitorHandle::spawn(config, gateway);

    handle
        .check_host(Environment::Production, "h1")
        .await
        .unwrap();

    let store = StatusStore::new(dir.path(), Duration::from_secs(5));
    let snapshot = store.load(Environment::Production).await;
    let view = merged_view(&hosts, &snapshot);

    assert_eq!(view.len(), 2);
    assert_eq!(view[0].status.instance_status, InstanceStatus::Up);
    // h2 has not been polled yet and defaults to unknown
    assert_eq!(view[1].status.instance_status, InstanceStatus::Unknown);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn fleet_check_merges_over_existing_records_without_dropping_them() {
    let dir = tempfile::tempdir().unwrap();
    provision_environment(
        dir.path(),
        Environment::Production,
        &[create_test_host("h1", "10.0.0.1")],
    );

    // a record for a host that is no longer in the registry
    let store = StatusStore::new(dir.path(), Duration::from_secs(5));
    let mut seeded = fleet_monitoring::store::StatusMap::new();
    seeded.insert("retired-host", fleet_monitoring::StatusRecord::error("gone"));
    store
        .save(Environment::Production, &mut seeded)
        .await
        .unwrap();

    let config = simulation_config(dir.path());
    let gateway = Arc::new(CommandGateway::new(&config));
    let handle = MonitorHandle::spawn(config, gateway);

    handle.check_fleet(Environment::Production).await.unwrap();

    let snapshot = store.load(Environment::Production).await;
    // the merge overwrites only the hosts just polled
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.get("retired-host").is_some());
    assert_eq!(
        snapshot.get("h1").unwrap().instance_status,
        InstanceStatus::Up
    );

    handle.shutdown().await.unwrap();
}
