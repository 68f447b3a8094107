//! Subprocess execution of management commands.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use super::error::{GatewayError, GatewayResult};
use super::{CliOutput, Invocation};

/// Seam between the gateway and whatever actually produces command output.
///
/// The production implementation spawns the management CLI; the simulation
/// implementation serves fixtures. Tests inject their own runners to exercise
/// the polling pipeline without an external binary.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation, timeout: Duration) -> GatewayResult<CliOutput>;
}

/// Runs the real CLI binary as a subprocess with a hard timeout.
pub struct CliRunner;

#[async_trait]
impl CommandRunner for CliRunner {
    async fn run(&self, invocation: &Invocation, timeout: Duration) -> GatewayResult<CliOutput> {
        let mut cmd = tokio::process::Command::new(&invocation.binary);
        cmd.args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // dropping the future on timeout must not leave the child behind
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Err(_) => return Err(GatewayError::Timeout(timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GatewayError::Unavailable(
                    invocation.binary.display().to_string(),
                ));
            }
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GatewayError::Execution {
                code: output.status.code(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        trace!("command produced {} bytes of output", stdout.len());
        Ok(CliOutput::decode(&stdout))
    }
}
