//! Command gateway for the external management CLI.
//!
//! One gateway is constructed at process start and shared (by reference) by
//! every poll, so the result cache is process-wide without being a global.
//! The execution path sits behind [`runner::CommandRunner`], which is how
//! simulation mode and the tests swap out the subprocess.

mod cache;
pub mod commands;
mod error;
pub mod runner;
pub mod simulation;

pub use error::{GatewayError, GatewayResult};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::{Credential, Host};
use cache::{CacheKey, CommandCache};
use runner::{CliRunner, CommandRunner};
use simulation::FixtureRunner;

/// Connection identity of one target instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn from_host(host: &Host) -> Self {
        Self {
            host: host.host.clone(),
            port: host.port,
        }
    }

    pub fn controller(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A fully built CLI invocation.
///
/// The rendered form (`Display`, `Debug`) masks the password; only
/// [`Invocation::args`] carries the real secret, and that goes straight to
/// the subprocess.
#[derive(Clone)]
pub struct Invocation {
    pub binary: PathBuf,
    pub controller: String,
    pub username: String,
    pub password: String,
    pub command: String,
}

impl Invocation {
    pub fn new(binary: &Path, target: &Target, credential: &Credential, command: &str) -> Self {
        Self {
            binary: binary.to_path_buf(),
            controller: target.controller(),
            username: credential.username.clone(),
            password: credential.password.clone(),
            command: command.to_string(),
        }
    }

    /// Argument vector for the subprocess, secrets included.
    pub fn args(&self) -> Vec<String> {
        vec![
            format!("--controller={}", self.controller),
            format!("--user={}", self.username),
            format!("--password={}", self.password),
            format!("--command={}", self.command),
        ]
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} --controller={} --user={} --password=****** --command={}",
            self.binary.display(),
            self.controller,
            self.username,
            self.command
        )
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Decoded output of one command.
///
/// The management interface answers in JSON for some commands and in DMR
/// bracket-notation text for others; the gateway only distinguishes the two,
/// interpretation is the parser's job.
#[derive(Debug, Clone, PartialEq)]
pub enum CliOutput {
    Json(Value),
    Text(String),
}

impl CliOutput {
    pub fn decode(stdout: &str) -> Self {
        let trimmed = stdout.trim();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str(trimmed) {
                return CliOutput::Json(value);
            }
        }
        CliOutput::Text(trimmed.to_string())
    }
}

/// Whether a call may be answered from the result cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Use,
    Bypass,
}

pub struct CommandGateway {
    binary: PathBuf,
    timeout: Duration,
    fixture_fallback: bool,
    runner: Box<dyn CommandRunner>,
    fixtures: FixtureRunner,
    cache: Mutex<CommandCache>,
}

impl CommandGateway {
    pub fn new(config: &Config) -> Self {
        let runner: Box<dyn CommandRunner> = if config.simulate {
            debug!("simulation mode active, commands are served from fixtures");
            Box::new(FixtureRunner::new())
        } else {
            Box::new(CliRunner)
        };
        Self::with_runner(config, runner)
    }

    /// Gateway with an explicit runner; the seam the tests use.
    pub fn with_runner(config: &Config, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            binary: config.cli_binary.clone(),
            timeout: Duration::from_secs(config.command_timeout_secs),
            fixture_fallback: config.fixture_fallback,
            runner,
            fixtures: FixtureRunner::new(),
            cache: Mutex::new(CommandCache::new(Duration::from_secs(config.cache_ttl_secs))),
        }
    }

    /// Execute one management command against one target.
    ///
    /// Only recognized read-only commands are ever cached, and only when the
    /// caller opts in; everything else spawns a fresh invocation.
    pub async fn execute(
        &self,
        target: &Target,
        credential: &Credential,
        command: &str,
        cache: CachePolicy,
    ) -> GatewayResult<CliOutput> {
        let cacheable = cache == CachePolicy::Use && commands::is_read_only(command);
        let key = CacheKey {
            host: target.host.clone(),
            port: target.port,
            username: credential.username.clone(),
            command: command.to_string(),
        };

        if cacheable {
            let mut cache = self.cache.lock().expect("command cache mutex poisoned");
            if let Some(hit) = cache.get(&key) {
                trace!("cache hit for {} on {}", command, target.controller());
                return Ok(hit);
            }
        }

        let invocation = Invocation::new(&self.binary, target, credential, command);
        debug!("executing: {invocation}");

        let output = match self.runner.run(&invocation, self.timeout).await {
            Err(GatewayError::Unavailable(binary)) if self.fixture_fallback => {
                warn!("management CLI missing ({binary}), serving simulation fixture");
                self.fixtures.fixture_for(command)?
            }
            other => other?,
        };

        if cacheable {
            self.cache
                .lock()
                .expect("command cache mutex poisoned")
                .insert(key, output.clone());
        }

        Ok(output)
    }

    /// Liveness probe. Always bypasses the cache: a stale "up" here would
    /// mask an outage for a whole TTL.
    pub async fn probe_server_state(
        &self,
        target: &Target,
        credential: &Credential,
    ) -> GatewayResult<CliOutput> {
        self.execute(target, credential, commands::SERVER_STATE, CachePolicy::Bypass)
            .await
    }

    pub async fn fetch_datasources(
        &self,
        target: &Target,
        credential: &Credential,
    ) -> GatewayResult<CliOutput> {
        self.execute(target, credential, commands::DATASOURCES, CachePolicy::Use)
            .await
    }

    pub async fn fetch_deployments(
        &self,
        target: &Target,
        credential: &Credential,
    ) -> GatewayResult<CliOutput> {
        self.execute(target, credential, commands::DEPLOYMENTS, CachePolicy::Use)
            .await
    }

    /// On-demand connection test for one datasource.
    pub async fn test_datasource_connection(
        &self,
        target: &Target,
        credential: &Credential,
        datasource: &str,
    ) -> GatewayResult<CliOutput> {
        self.execute(
            target,
            credential,
            &commands::test_connection(datasource),
            CachePolicy::Bypass,
        )
        .await
    }
}
