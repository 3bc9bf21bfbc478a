use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Default number of slots in the command queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// SQLite journal mode used by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Write-ahead log. Commits append to the log; checkpoints fold it back.
    Wal,
    /// Classic rollback journal.
    Delete,
}

impl JournalMode {
    pub(crate) fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        }
    }
}

/// SQLite `synchronous` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncLevel {
    Off,
    Normal,
    Full,
}

impl SyncLevel {
    pub(crate) fn as_pragma(self) -> &'static str {
        match self {
            SyncLevel::Off => "OFF",
            SyncLevel::Normal => "NORMAL",
            SyncLevel::Full => "FULL",
        }
    }
}

/// Store configuration: queue sizing and SQLite durability knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Slots in the command queue. Producers block once it is full.
    pub queue_capacity: usize,
    pub journal: JournalMode,
    /// With `Wal` + `Normal`, commits are atomic but only checkpoints fsync.
    pub synchronous: SyncLevel,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            journal: JournalMode::Wal,
            synchronous: SyncLevel::Normal,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub(crate) fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
