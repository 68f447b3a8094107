//! Read-only access to the host and credential collaborators.
//!
//! Both registries are owned elsewhere (the CRUD surface is out of scope);
//! this module only reads their JSON documents from the per-environment
//! storage tree. Credentials fall back to environment variables when no file
//! is present, which is how headless deployments are provisioned.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, warn};

use crate::{Credential, Environment, Host, util};

pub struct Registry {
    root: PathBuf,
}

impl Registry {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            root: storage_path.into(),
        }
    }

    pub fn environment_path(&self, environment: Environment) -> PathBuf {
        self.root.join("environments").join(environment.as_str())
    }

    /// Ordered host list for the environment; absent file means no hosts.
    pub fn load_hosts(&self, environment: Environment) -> anyhow::Result<Vec<Host>> {
        let path = self.environment_path(environment).join("hosts.json");
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let hosts: Vec<Host> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        debug!("loaded {} hosts for {environment}", hosts.len());
        Ok(hosts)
    }

    /// Management credentials for the environment, file first, environment
    /// variables second. `None` when neither source is configured.
    pub fn load_credentials(&self, environment: Environment) -> Option<Credential> {
        let path = self.environment_path(environment).join("credentials.json");
        if path.exists() {
            match std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|raw| serde_json::from_str(&raw).map_err(anyhow::Error::from))
            {
                Ok(credential) => return Some(credential),
                Err(e) => {
                    warn!("unusable credentials file {}: {e}", path.display());
                }
            }
        }

        util::get_env_credentials(environment)
    }
}
