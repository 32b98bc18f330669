//! Engine configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default B+ tree order for table indexes
pub const DEFAULT_BTREE_ORDER: usize = 32;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the catalog and table files
    pub data_dir: PathBuf,
    /// Maximum children per B+ tree node
    pub btree_order: usize,
    /// How long `execute_when_free` waits for a locked table; `None` waits forever
    pub lock_wait_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            btree_order: DEFAULT_BTREE_ORDER,
            lock_wait_timeout_ms: Some(5_000),
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data directory
    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the B+ tree order
    pub fn btree_order(mut self, order: usize) -> Self {
        self.btree_order = order;
        self
    }

    /// Set the lock wait deadline
    pub fn lock_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_wait_timeout_ms = timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn lock_wait_duration(&self) -> Option<Duration> {
        self.lock_wait_timeout_ms.map(Duration::from_millis)
    }

    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.btree_order < 3 {
            return Err(Error::InvalidConfig(format!(
                "btree_order must be at least 3, got {}",
                self.btree_order
            )));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("data_dir is empty".to_string()));
        }
        Ok(())
    }
}
