//! FleetMonitorActor - drives periodic and on-demand polling
//!
//! The actor owns the registry, the status store, and a shared reference to
//! the command gateway. Hosts are polled through a bounded pool and merged
//! into the store with reload-merge-save, so a concurrent on-demand check is
//! never clobbered by a cycle that dispatched earlier.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::json;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

use crate::config::Config;
use crate::gateway::CommandGateway;
use crate::poller::poll_host;
use crate::registry::Registry;
use crate::store::{CHECK_IN_PROGRESS_KEY, StatusMap, StatusStore};
use crate::{Credential, Environment, Host, StatusRecord};

use super::messages::MonitorCommand;

/// Floor under the inter-cycle pause so a near-zero interval cannot busy-loop.
const MIN_CYCLE_SLEEP: Duration = Duration::from_secs(1);

/// Fixed pause after a failed cycle before the next attempt.
const CYCLE_RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// On-demand fleet checks persist a merged snapshot after this many hosts.
const FLEET_CHECK_SAVE_EVERY: usize = 5;

/// Actor that schedules all polling for both environments.
pub struct FleetMonitorActor {
    config: Config,
    gateway: Arc<CommandGateway>,
    registry: Registry,
    store: StatusStore,
    command_rx: mpsc::Receiver<MonitorCommand>,
}

impl FleetMonitorActor {
    pub fn new(
        config: Config,
        gateway: Arc<CommandGateway>,
        command_rx: mpsc::Receiver<MonitorCommand>,
    ) -> Self {
        let registry = Registry::new(config.storage_path.clone());
        let store = StatusStore::new(
            config.storage_path.clone(),
            Duration::from_secs(config.lock_timeout_secs),
        );
        Self {
            config,
            gateway,
            registry,
            store,
            command_rx,
        }
    }

    /// Run the actor's main loop.
    ///
    /// Runs until a Shutdown command arrives or the command channel closes.
    /// Cycle failures are logged and retried after a fixed backoff; they
    /// never end the loop.
    #[instrument(skip_all)]
    pub async fn run(mut self) {
        debug!("starting fleet monitor");

        // first periodic cycle after one full interval; on-demand commands
        // are serviceable right away
        let mut next_cycle =
            Instant::now() + Duration::from_secs(self.config.poll_interval_secs);

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next_cycle) => {
                    let started = Instant::now();
                    match self.run_cycle().await {
                        Ok(()) => {
                            let elapsed = started.elapsed();
                            let interval = Duration::from_secs(self.config.poll_interval_secs);
                            // a slow cycle never stacks into the next one
                            let pause = interval.saturating_sub(elapsed).max(MIN_CYCLE_SLEEP);
                            debug!("cycle finished in {elapsed:?}, next in {pause:?}");
                            next_cycle = Instant::now() + pause;
                        }
                        Err(e) => {
                            error!("monitoring cycle failed: {e:#}");
                            next_cycle = Instant::now() + CYCLE_RETRY_BACKOFF;
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MonitorCommand::CheckHost { environment, host_id, respond_to }) => {
                            debug!("received CheckHost command for {host_id}");
                            let result = self.check_host(environment, &host_id).await;
                            let _ = respond_to.send(result);
                        }

                        Some(MonitorCommand::CheckFleet { environment, respond_to }) => {
                            debug!("received CheckFleet command");
                            let result = self.check_fleet(environment).await;
                            let _ = respond_to.send(result);
                        }

                        Some(MonitorCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("fleet monitor stopped");
    }

    async fn run_cycle(&self) -> anyhow::Result<()> {
        for environment in Environment::ALL {
            self.run_environment(environment).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(environment = %environment))]
    async fn run_environment(&self, environment: Environment) -> anyhow::Result<()> {
        let Some(credential) = self.registry.load_credentials(environment) else {
            warn!("no credentials configured, skipping environment this cycle");
            return Ok(());
        };

        let hosts = self.registry.load_hosts(environment).context("loading hosts")?;
        if hosts.is_empty() {
            debug!("no hosts registered");
            return Ok(());
        }

        let previous = self.store.load(environment).await;
        let mut tasks = self.spawn_polls(&hosts, &credential, &previous);

        let mut results = Vec::with_capacity(hosts.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                Err(e) => error!("poll task failed: {e}"),
            }
        }

        debug!("polled {} hosts", results.len());
        self.persist(environment, results).await;
        Ok(())
    }

    /// Fan one poll task per host into the bounded pool.
    ///
    /// Pool size is `min(max_workers, max_concurrent_hosts)`, which bounds
    /// concurrent subprocess spawns; excess hosts queue on the semaphore.
    fn spawn_polls(
        &self,
        hosts: &[Host],
        credential: &Credential,
        previous: &StatusMap,
    ) -> JoinSet<(String, StatusRecord)> {
        let permits = Arc::new(Semaphore::new(self.config.worker_count()));
        let mut tasks = JoinSet::new();

        for host in hosts {
            let gateway = Arc::clone(&self.gateway);
            let permits = Arc::clone(&permits);
            let host = host.clone();
            let credential = credential.clone();
            let prev = previous.get(&host.id).cloned();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.expect("worker pool closed");
                let record = poll_host(&gateway, &host, &credential, prev.as_ref()).await;
                (host.id, record)
            });
        }

        tasks
    }

    /// Reload-merge-save: overwrite only the polled hosts in the *current*
    /// on-disk snapshot.
    async fn persist(
        &self,
        environment: Environment,
        records: impl IntoIterator<Item = (String, StatusRecord)>,
    ) {
        let mut merged = self.store.load(environment).await;
        merged.merge_records(records);
        if let Err(e) = self.store.save(environment, &mut merged).await {
            error!("failed to persist snapshot for {environment}: {e}");
        }
    }

    /// On-demand check of a single named host.
    async fn check_host(
        &self,
        environment: Environment,
        host_id: &str,
    ) -> anyhow::Result<StatusRecord> {
        let credential = self
            .registry
            .load_credentials(environment)
            .context("no credentials configured")?;
        let hosts = self.registry.load_hosts(environment)?;
        let host = hosts
            .iter()
            .find(|h| h.id == host_id)
            .with_context(|| format!("unknown host id: {host_id}"))?;

        let previous = self.store.load(environment).await;
        let record = poll_host(&self.gateway, host, &credential, previous.get(host_id)).await;

        self.persist(environment, [(host.id.clone(), record.clone())])
            .await;
        Ok(record)
    }

    /// On-demand check of every host in the environment.
    ///
    /// Uses the same pool as the periodic cycle but checkpoints a merged
    /// snapshot every [`FLEET_CHECK_SAVE_EVERY`] completions, so observers
    /// polling the store see progress.
    #[instrument(skip(self), fields(environment = %environment))]
    async fn check_fleet(&self, environment: Environment) -> anyhow::Result<usize> {
        let credential = self
            .registry
            .load_credentials(environment)
            .context("no credentials configured")?;
        let hosts = self.registry.load_hosts(environment)?;
        if hosts.is_empty() {
            return Ok(0);
        }

        let previous = self.store.load(environment).await;

        let mut marked = self.store.load(environment).await;
        marked.set_metadata(CHECK_IN_PROGRESS_KEY, json!(true));
        if let Err(e) = self.store.save(environment, &mut marked).await {
            error!("failed to mark check in progress: {e}");
        }

        let mut tasks = self.spawn_polls(&hosts, &credential, &previous);

        let mut pending = Vec::new();
        let mut completed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let entry = match joined {
                Ok(entry) => entry,
                Err(e) => {
                    error!("poll task failed: {e}");
                    continue;
                }
            };
            pending.push(entry);
            completed += 1;

            if completed % FLEET_CHECK_SAVE_EVERY == 0 {
                self.persist(environment, pending.drain(..)).await;
            }
        }

        // final save also clears the in-progress marker
        let mut merged = self.store.load(environment).await;
        merged.merge_records(pending);
        merged.clear_metadata(CHECK_IN_PROGRESS_KEY);
        if let Err(e) = self.store.save(environment, &mut merged).await {
            error!("failed to persist snapshot for {environment}: {e}");
        }

        Ok(completed)
    }
}

/// Handle for controlling a running fleet monitor.
///
/// Cloneable; this is the API the HTTP layer and other collaborators hold.
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
}

impl MonitorHandle {
    /// Spawn the monitor actor and return its handle.
    pub fn spawn(config: Config, gateway: Arc<CommandGateway>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = FleetMonitorActor::new(config, gateway, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Poll one host now; returns its fresh record.
    pub async fn check_host(
        &self,
        environment: Environment,
        host_id: impl Into<String>,
    ) -> anyhow::Result<StatusRecord> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::CheckHost {
                environment,
                host_id: host_id.into(),
                respond_to: tx,
            })
            .await
            .context("failed to send CheckHost command")?;

        rx.await.context("failed to receive response")?
    }

    /// Poll every host in the environment now; returns how many were checked.
    pub async fn check_fleet(&self, environment: Environment) -> anyhow::Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::CheckFleet {
                environment,
                respond_to: tx,
            })
            .await
            .context("failed to send CheckFleet command")?;

        rx.await.context("failed to receive response")?
    }

    /// Gracefully shut down the monitor.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.sender
            .send(MonitorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
