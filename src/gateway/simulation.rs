//! Deterministic fixture payloads for operation without a live target.
//!
//! Fixtures are keyed by command substring and mirror the shapes the real
//! management interface emits, so the parsing pipeline downstream is
//! exercised exactly as in production.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::trace;

use super::error::{GatewayError, GatewayResult};
use super::{CliOutput, Invocation};
use super::runner::CommandRunner;

pub struct FixtureRunner;

impl FixtureRunner {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn fixture_for(&self, command: &str) -> GatewayResult<CliOutput> {
        trace!("serving fixture for command: {command}");

        // test-connection carries the datasources prefix, so match it first
        if command.contains("test-connection-in-pool") {
            return Ok(CliOutput::Json(json!(true)));
        }

        if command.contains("server-state") {
            return Ok(CliOutput::Json(json!({
                "outcome": "success",
                "result": "running",
            })));
        }

        if command.contains("subsystem=datasources") {
            return Ok(CliOutput::Json(json!({
                "data-source": {
                    "ExampleDS": {
                        "enabled": true,
                        "jndi-name": "java:jboss/datasources/ExampleDS",
                        "driver-name": "h2",
                    },
                    "ReportsDS": {
                        "enabled": false,
                        "jndi-name": "java:jboss/datasources/ReportsDS",
                        "driver-name": "oracle",
                    },
                },
                "xa-data-source": {
                    "OrdersXA": {
                        "enabled": true,
                        "jndi-name": "java:jboss/datasources/OrdersXA",
                        "driver-name": "oracle",
                    },
                },
            })));
        }

        if command.contains("deployment") {
            return Ok(CliOutput::Json(json!({
                "sample-app.war": {
                    "enabled": true,
                    "runtime-name": "sample-app.war",
                },
                "legacy-service.ear": {
                    "enabled": false,
                    "runtime-name": "legacy-service.ear",
                },
            })));
        }

        Err(GatewayError::Execution {
            code: None,
            stderr: format!("no simulation fixture for command: {command}"),
        })
    }
}

impl Default for FixtureRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for FixtureRunner {
    async fn run(&self, invocation: &Invocation, _timeout: Duration) -> GatewayResult<CliOutput> {
        self.fixture_for(&invocation.command)
    }
}
