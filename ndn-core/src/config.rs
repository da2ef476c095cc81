use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ims::{InMemoryStorage, PolicyKind, DEFAULT_INITIAL_CAPACITY};

/// Content store settings, loadable from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Maximum number of entries; unlimited when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    pub initial_capacity: usize,
    pub policy: PolicyKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            limit: None,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            policy: PolicyKind::default(),
        }
    }
}

impl StorageConfig {
    /// Read the configuration at `path`; a missing file yields the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Create an empty store with these settings
    pub fn build(&self) -> InMemoryStorage {
        InMemoryStorage::with_policy(self.policy.build(), self.limit, self.initial_capacity)
    }
}
