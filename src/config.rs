use std::path::PathBuf;

use tracing::trace;

/// Runtime configuration for the monitoring core.
///
/// Every knob has a default so an empty configuration file (or none at all)
/// yields a working setup.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Root of the per-environment storage tree.
    #[serde(default = "crate::util::get_storage_path")]
    pub storage_path: PathBuf,

    /// The external management CLI binary.
    #[serde(default = "default_cli_binary")]
    pub cli_binary: PathBuf,

    /// Upper bound on the worker pool.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Tighter bound on concurrently polled hosts; 0 disables the override.
    #[serde(default)]
    pub max_concurrent_hosts: usize,

    /// Hard timeout for a single management command, in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Target spacing between periodic polling cycles, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Lifetime of cached read-only command results, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// How long a writer waits for the status-file lock, in seconds.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,

    /// Serve deterministic fixture payloads instead of invoking the CLI.
    #[serde(default)]
    pub simulate: bool,

    /// Fall back to fixture payloads when the CLI binary is absent.
    #[serde(default)]
    pub fixture_fallback: bool,
}

impl Config {
    /// Effective worker-pool size: `max_workers`, tightened by the
    /// `max_concurrent_hosts` override when set.
    pub fn worker_count(&self) -> usize {
        let bound = if self.max_concurrent_hosts > 0 {
            self.max_workers.min(self.max_concurrent_hosts)
        } else {
            self.max_workers
        };
        bound.max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: crate::util::get_storage_path(),
            cli_binary: default_cli_binary(),
            max_workers: default_max_workers(),
            max_concurrent_hosts: 0,
            command_timeout_secs: default_command_timeout(),
            poll_interval_secs: default_poll_interval(),
            cache_ttl_secs: default_cache_ttl(),
            lock_timeout_secs: default_lock_timeout(),
            simulate: false,
            fixture_fallback: false,
        }
    }
}

fn default_cli_binary() -> PathBuf {
    PathBuf::from("jboss-cli.sh")
}

fn default_max_workers() -> usize {
    10
}

fn default_command_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    60
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_lock_timeout() -> u64 {
    10
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
