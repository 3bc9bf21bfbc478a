/// Errors from world store operations.
///
/// Only synchronous calls surface these. Failures of individual queued
/// writes are logged by the worker and never reach the producer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: i64,
        expected_version: i64,
    },
    #[error("failed to spawn persistence worker: {0}")]
    WorkerSpawn(std::io::Error),
    #[error("persistence worker panicked")]
    WorkerPanicked,
    #[error("persistence worker has stopped")]
    WorkerStopped,
    #[error("store lock poisoned")]
    Poisoned,
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
