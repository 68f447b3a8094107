//! Per-environment status snapshot persistence.
//!
//! One flat JSON document per environment: keys are host identifiers, except
//! for a small set of reserved `_`-prefixed metadata keys. Readers must never
//! see a half-written or stitched-together map, so writers reload the current
//! document, merge their records in, and save under a cooperative lock file.
//!
//! ## Consistency caveat
//!
//! When the lock cannot be acquired within the timeout the write proceeds
//! unlocked and the last writer wins. Concurrent writers can lose an update
//! this way; see DESIGN.md for the trade-off.

mod error;

pub use error::{StoreError, StoreResult};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::de::Error as _;
use serde_json::{Map, Value, json};
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::{Environment, StatusRecord};

/// Keys with this prefix are snapshot metadata, never host identifiers.
pub const RESERVED_PREFIX: char = '_';

/// Stamped on every save so any consumer can detect updates ETag-style.
pub const LAST_UPDATED_KEY: &str = "_last_updated";

/// Present while an on-demand whole-fleet check is writing partial progress.
pub const CHECK_IN_PROGRESS_KEY: &str = "_check_in_progress";

/// In-memory form of one environment's snapshot document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusMap {
    records: BTreeMap<String, StatusRecord>,
    metadata: BTreeMap<String, Value>,
}

impl StatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, host_id: &str) -> Option<&StatusRecord> {
        self.records.get(host_id)
    }

    pub fn insert(&mut self, host_id: impl Into<String>, record: StatusRecord) {
        let host_id = host_id.into();
        if host_id.starts_with(RESERVED_PREFIX) {
            warn!("refusing to store host id {host_id:?}: reserved metadata prefix");
            return;
        }
        self.records.insert(host_id, record);
    }

    /// Overwrite exactly the given hosts, leaving every other entry alone.
    pub fn merge_records(&mut self, records: impl IntoIterator<Item = (String, StatusRecord)>) {
        for (host_id, record) in records {
            self.insert(host_id, record);
        }
    }

    pub fn records(&self) -> impl Iterator<Item = (&String, &StatusRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn clear_metadata(&mut self, key: &str) {
        self.metadata.remove(key);
    }

    fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let Value::Object(entries) = value else {
            return Err(serde_json::Error::custom("snapshot is not an object"));
        };

        let mut map = Self::new();
        for (key, value) in entries {
            if key.starts_with(RESERVED_PREFIX) {
                map.metadata.insert(key, value);
            } else {
                map.records.insert(key, serde_json::from_value(value)?);
            }
        }
        Ok(map)
    }

    fn to_json(&self) -> StoreResult<Value> {
        let mut entries = Map::new();
        for (key, value) in &self.metadata {
            entries.insert(key.clone(), value.clone());
        }
        for (host_id, record) in &self.records {
            let value = serde_json::to_value(record)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            entries.insert(host_id.clone(), value);
        }
        Ok(Value::Object(entries))
    }
}

pub struct StatusStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl StatusStore {
    pub fn new(storage_path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: storage_path.into(),
            lock_timeout,
        }
    }

    fn status_file(&self, environment: Environment) -> PathBuf {
        self.root
            .join("environments")
            .join(environment.as_str())
            .join("status.json")
    }

    /// Load the environment's snapshot.
    ///
    /// An absent file is an empty map. An unreadable or unparsable file is
    /// backed up next to the original and replaced with an empty valid
    /// document, so the corruption is preserved for inspection but never
    /// poisons subsequent cycles.
    pub async fn load(&self, environment: Environment) -> StatusMap {
        let path = self.status_file(environment);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StatusMap::new(),
            Err(e) => {
                error!("failed to read {}: {e}", path.display());
                return StatusMap::new();
            }
        };

        let parsed = serde_json::from_str::<Value>(&raw)
            .and_then(StatusMap::from_json);
        match parsed {
            Ok(map) => map,
            Err(e) => {
                error!("corrupt status file {}: {e}", path.display());
                self.quarantine(&path).await;
                StatusMap::new()
            }
        }
    }

    async fn quarantine(&self, path: &Path) {
        let backup = path.with_extension("json.corrupted");
        if let Err(e) = tokio::fs::copy(path, &backup).await {
            error!("failed to back up corrupt status file: {e}");
            return;
        }
        info!("backed up corrupt status file to {}", backup.display());
        if let Err(e) = tokio::fs::write(path, b"{}").await {
            error!("failed to reset corrupt status file: {e}");
        }
    }

    /// Persist the snapshot, stamping [`LAST_UPDATED_KEY`].
    ///
    /// The write happens under a cooperative lock file. A lock timeout does
    /// not fail the caller: the write proceeds unlocked (last writer wins).
    pub async fn save(&self, environment: Environment, map: &mut StatusMap) -> StoreResult<()> {
        map.set_metadata(LAST_UPDATED_KEY, json!(Utc::now().to_rfc3339()));

        let path = self.status_file(environment);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_string_pretty(&map.to_json()?)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let lock_path = path.with_extension("json.lock");
        match LockFile::acquire(&lock_path, self.lock_timeout).await {
            Ok(_guard) => {
                tokio::fs::write(&path, &body).await?;
                debug!("status file updated for {environment}");
            }
            Err(StoreError::LockTimeout { .. }) => {
                warn!(
                    "could not lock {} within {}s, writing unlocked",
                    path.display(),
                    self.lock_timeout.as_secs()
                );
                tokio::fs::write(&path, &body).await?;
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }
}

/// Cooperative lock file, released on drop.
///
/// `create_new` gives atomic acquisition; contenders retry until the
/// deadline. Works across processes as long as everyone plays along, which
/// is all this store promises.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    async fn acquire(path: &Path, timeout: Duration) -> StoreResult<Self> {
        let deadline = Instant::now() + timeout;
        loop {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
            {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(StoreError::LockTimeout {
                            path: path.to_path_buf(),
                            waited: timeout,
                        });
                    }
                    sleep(Duration::from_millis(25)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
