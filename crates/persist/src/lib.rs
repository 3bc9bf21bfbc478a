//! Persistence: write-behind world storage over SQLite.
//!
//! High-frequency world edits (blocks, lights, generation keys) are queued
//! and applied by one dedicated writer thread inside a long-lived
//! transaction. Low-frequency critical state (signs, metadata, bookmarks)
//! and checkpoints are written synchronously from the calling thread.
//!
//! # Invariants
//! - Queued writes are applied in FIFO order; nothing is dropped or merged.
//! - Producers never touch the database; a full queue blocks them instead.
//! - The queue lock is never held across a database operation.
//! - Synchronous calls and loads are serialized by a second, independent
//!   lock, which the writer also takes per command.
//! - After `force_checkpoint` returns, committed state is on stable storage.

mod command;
mod config;
mod error;
mod handle;
mod queue;
mod records;
mod schema;
mod store;
mod sync_access;
mod writer;

pub use command::Command;
pub use config::{DEFAULT_QUEUE_CAPACITY, JournalMode, StoreConfig, SyncLevel};
pub use error::{Result, StoreError};
pub use handle::WorldStore;
pub use queue::BoundedQueue;
pub use records::{CheckpointReport, PlayerState, SignRecord, TableCounts, VoxelRecord};
pub use schema::SCHEMA_VERSION;
pub use store::Store;
pub use sync_access::SyncAccess;
pub use writer::{AsyncWriter, WorkerState, WriterStats};
pub use worldstore_common::{BlockPos, RegionCoord};
