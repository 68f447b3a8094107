//! The periodic polling cycle end to end

use std::sync::Arc;
use std::time::Duration;

use fleet_monitoring::gateway::CommandGateway;
use fleet_monitoring::monitor::MonitorHandle;
use fleet_monitoring::store::{LAST_UPDATED_KEY, StatusStore};
use fleet_monitoring::{Environment, InstanceStatus};

use crate::helpers::*;

/// Wait until the environment's snapshot holds `expected` records.
async fn wait_for_records(
    store: &StatusStore,
    environment: Environment,
    expected: usize,
) -> fleet_monitoring::store::StatusMap {
    for _ in 0..100 {
        let snapshot = store.load(environment).await;
        if snapshot.len() >= expected {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("no snapshot with {expected} records for {environment} within 10s");
}

#[tokio::test]
async fn cycle_polls_every_registered_environment() {
    let dir = tempfile::tempdir().unwrap();
    provision_environment(
        dir.path(),
        Environment::Production,
        &[
            create_test_host("p1", "10.0.0.1"),
            create_test_host("p2", "10.0.0.2"),
        ],
    );
    provision_environment(
        dir.path(),
        Environment::NonProduction,
        &[create_test_host("n1", "10.1.0.1")],
    );

    let mut config = simulation_config(dir.path());
    config.poll_interval_secs = 1;
    let gateway = Arc::new(CommandGateway::new(&config));
    let handle = MonitorHandle::spawn(config, gateway);

    let store = StatusStore::new(dir.path(), Duration::from_secs(5));
    let production = wait_for_records(&store, Environment::Production, 2).await;
    let non_production = wait_for_records(&store, Environment::NonProduction, 1).await;

    for snapshot in [&production, &non_production] {
        for (_, record) in snapshot.records() {
            assert_eq!(record.instance_status, InstanceStatus::Up);
            assert!(record.last_check.is_some());
        }
        assert!(snapshot.metadata(LAST_UPDATED_KEY).is_some());
    }

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn environment_without_credentials_does_not_block_the_other() {
    let dir = tempfile::tempdir().unwrap();
    // production has hosts but no credentials; non_production is complete
    let prod_dir = dir
        .path()
        .join("environments")
        .join(Environment::Production.as_str());
    std::fs::create_dir_all(&prod_dir).unwrap();
    std::fs::write(
        prod_dir.join("hosts.json"),
        serde_json::to_string(&[create_test_host("p1", "10.0.0.1")]).unwrap(),
    )
    .unwrap();
    provision_environment(
        dir.path(),
        Environment::NonProduction,
        &[create_test_host("n1", "10.1.0.1")],
    );

    let mut config = simulation_config(dir.path());
    config.poll_interval_secs = 1;
    let gateway = Arc::new(CommandGateway::new(&config));
    let handle = MonitorHandle::spawn(config, gateway);

    let store = StatusStore::new(dir.path(), Duration::from_secs(5));
    let non_production = wait_for_records(&store, Environment::NonProduction, 1).await;
    assert_eq!(non_production.len(), 1);

    // the credential-less environment was skipped, not failed
    assert!(store.load(Environment::Production).await.is_empty());

    handle.shutdown().await.unwrap();
}
