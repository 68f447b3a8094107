//! Test helpers and fixtures shared by the integration suite

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use fleet_monitoring::config::Config;
use fleet_monitoring::gateway::runner::CommandRunner;
use fleet_monitoring::gateway::{CliOutput, GatewayError, GatewayResult, Invocation};
use fleet_monitoring::{Credential, Environment, Host};
use serde_json::json;

/// Create a test host with sensible defaults
pub fn create_test_host(id: &str, address: &str) -> Host {
    Host {
        id: id.to_string(),
        host: address.to_string(),
        port: 9990,
        label: Some(format!("Test {id}")),
    }
}

/// Config rooted in a temp dir with simulation mode active
pub fn simulation_config(storage: &Path) -> Config {
    Config {
        storage_path: storage.to_path_buf(),
        simulate: true,
        ..Config::default()
    }
}

/// Provision hosts.json and credentials.json for an environment
pub fn provision_environment(storage: &Path, environment: Environment, hosts: &[Host]) {
    let env_dir = storage.join("environments").join(environment.as_str());
    std::fs::create_dir_all(&env_dir).unwrap();
    std::fs::write(
        env_dir.join("hosts.json"),
        serde_json::to_string_pretty(hosts).unwrap(),
    )
    .unwrap();
    std::fs::write(
        env_dir.join("credentials.json"),
        serde_json::to_string_pretty(&Credential {
            username: "monitor".to_string(),
            password: "test-secret".to_string(),
        })
        .unwrap(),
    )
    .unwrap();
}

/// Scripted runner answering each command kind with a fixed payload.
///
/// Stands in for the management CLI so the full pipeline (gateway → parser →
/// poller) runs against literal payloads.
pub struct ScriptedRunner {
    pub probe: GatewayResult<CliOutput>,
    pub datasources: GatewayResult<CliOutput>,
    pub deployments: GatewayResult<CliOutput>,
}

impl ScriptedRunner {
    /// Healthy host: one enabled and one disabled datasource, one enabled
    /// deployment.
    pub fn healthy() -> Self {
        Self {
            probe: Ok(CliOutput::Json(json!({"outcome": "success", "result": "running"}))),
            datasources: Ok(CliOutput::Json(json!({
                "data-source": {
                    "DSok": {"enabled": true},
                    "DSbad": {"enabled": false},
                },
            }))),
            deployments: Ok(CliOutput::Json(json!({
                "App1.war": {"enabled": true},
            }))),
        }
    }
}

fn clone_result(result: &GatewayResult<CliOutput>) -> GatewayResult<CliOutput> {
    match result {
        Ok(output) => Ok(output.clone()),
        Err(GatewayError::Unavailable(binary)) => Err(GatewayError::Unavailable(binary.clone())),
        Err(GatewayError::Timeout(timeout)) => Err(GatewayError::Timeout(*timeout)),
        Err(GatewayError::Execution { code, stderr }) => Err(GatewayError::Execution {
            code: *code,
            stderr: stderr.clone(),
        }),
        Err(GatewayError::Io(e)) => Err(GatewayError::Io(std::io::Error::new(e.kind(), e.to_string()))),
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation, _timeout: Duration) -> GatewayResult<CliOutput> {
        if invocation.command.contains("server-state") {
            clone_result(&self.probe)
        } else if invocation.command.contains("subsystem=datasources") {
            clone_result(&self.datasources)
        } else if invocation.command.contains("deployment") {
            clone_result(&self.deployments)
        } else {
            Err(GatewayError::Execution {
                code: Some(1),
                stderr: format!("unexpected command: {}", invocation.command),
            })
        }
    }
}
