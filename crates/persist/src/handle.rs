use std::path::Path;
use std::sync::{Arc, Mutex};
use worldstore_common::{BlockPos, RegionCoord};

use crate::command::Command;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::records::{CheckpointReport, PlayerState, SignRecord, TableCounts, VoxelRecord};
use crate::store::Store;
use crate::sync_access::SyncAccess;
use crate::writer::{AsyncWriter, WorkerState, WriterStats};

/// An open world store.
///
/// Composes the two independently locked halves:
/// - [`AsyncWriter`]: block, light and generation-key writes go through the
///   bounded command queue to the single writer thread. They return as soon
///   as the command is queued.
/// - [`SyncAccess`]: loads, signs, metadata, bookmarks and checkpoints run
///   on the calling thread under the synchronous-access lock.
///
/// Loads observe the last commit, not the last enqueue. Call
/// [`WorldStore::flush`] first when a queued write must be visible.
pub struct WorldStore {
    writer: AsyncWriter,
    sync: SyncAccess,
}

impl WorldStore {
    /// Open or create the store at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &StoreConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self> {
        Self::start(Store::open(path, config)?, config)
    }

    /// A private in-memory store, mostly useful in tests.
    pub fn open_in_memory(config: &StoreConfig) -> Result<Self> {
        Self::start(Store::open_in_memory(config)?, config)
    }

    fn start(store: Store, config: &StoreConfig) -> Result<Self> {
        let sync = SyncAccess::new(Arc::new(Mutex::new(store)));
        let writer = AsyncWriter::spawn(sync.shared(), config.queue_capacity)?;
        Ok(Self { writer, sync })
    }

    /// Stop the writer after it drains the queue, commit, and close the file.
    pub fn close(self) -> Result<()> {
        let Self { mut writer, sync } = self;
        writer.shutdown()?;
        drop(writer);

        let shared = sync.shared();
        drop(sync);
        match Arc::try_unwrap(shared) {
            Ok(store) => store.into_inner().map_err(|_| StoreError::Poisoned)?.close()?,
            Err(_) => tracing::warn!("store still referenced, connection closes on last drop"),
        }
        tracing::info!("world store closed");
        Ok(())
    }

    // --- asynchronous writes --------------------------------------------

    pub fn write_block(&self, region: RegionCoord, pos: BlockPos, block: i32) {
        self.writer.enqueue(Command::WriteBlock { region, pos, block });
    }

    pub fn write_light(&self, region: RegionCoord, pos: BlockPos, value: i32) {
        self.writer.enqueue(Command::WriteLight { region, pos, value });
    }

    pub fn write_key(&self, region: RegionCoord, version: u32) {
        self.writer.enqueue(Command::WriteKey { region, version });
    }

    /// Queue a commit. Durability is reached when the writer gets to it.
    pub fn request_commit(&self) {
        self.writer.enqueue(Command::Commit);
    }

    /// Queue a commit and wait until the writer has performed it.
    pub fn flush(&self) -> Result<()> {
        self.writer.flush()
    }

    pub fn writer_stats(&self) -> WriterStats {
        self.writer.stats()
    }

    pub fn writer_state(&self) -> WorkerState {
        self.writer.state()
    }

    /// Commands waiting in the queue.
    pub fn pending_writes(&self) -> usize {
        self.writer.pending()
    }

    // --- synchronous access ---------------------------------------------

    /// Commit and force all logged writes to stable storage.
    pub fn force_checkpoint(&self) -> Result<CheckpointReport> {
        self.sync.force_checkpoint()
    }

    pub fn load_blocks(&self, region: RegionCoord) -> Result<Vec<VoxelRecord>> {
        self.sync.load_blocks(region)
    }

    pub fn load_lights(&self, region: RegionCoord) -> Result<Vec<VoxelRecord>> {
        self.sync.load_lights(region)
    }

    pub fn load_signs(&self, region: RegionCoord) -> Result<Vec<SignRecord>> {
        self.sync.load_signs(region)
    }

    /// Generation key of `region`, if one was ever committed.
    pub fn get_key(&self, region: RegionCoord) -> Result<Option<u32>> {
        self.sync.get_key(region)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.sync.set_metadata(key, value)
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        self.sync.get_metadata(key)
    }

    pub fn insert_bookmark(&self, label: &str, major: i32, minor: i32, pos: BlockPos) -> Result<()> {
        self.sync.insert_bookmark(label, major, minor, pos)
    }

    pub fn get_bookmark(&self, label: &str, major: i32, minor: i32) -> Result<Option<BlockPos>> {
        self.sync.get_bookmark(label, major, minor)
    }

    pub fn insert_sign(
        &self,
        region: RegionCoord,
        pos: BlockPos,
        face: i32,
        text: &str,
    ) -> Result<()> {
        self.sync.insert_sign(region, pos, face, text)
    }

    /// Remove the sign on one face. Returns how many rows were removed.
    pub fn delete_sign(&self, pos: BlockPos, face: i32) -> Result<usize> {
        self.sync.delete_sign(pos, face)
    }

    /// Remove the signs on every face of the block at `pos`.
    pub fn delete_signs_at(&self, pos: BlockPos) -> Result<usize> {
        self.sync.delete_signs_at(pos)
    }

    pub fn delete_all_signs(&self) -> Result<usize> {
        self.sync.delete_all_signs()
    }

    pub fn save_player_state(&self, state: &PlayerState) -> Result<()> {
        self.sync.save_player_state(state)
    }

    pub fn load_player_state(&self) -> Result<Option<PlayerState>> {
        self.sync.load_player_state()
    }

    pub fn insert_tagged_block(&self, pos: BlockPos, tag: &str) -> Result<()> {
        self.sync.insert_tagged_block(pos, tag)
    }

    pub fn tagged_blocks(&self) -> Result<Vec<BlockPos>> {
        self.sync.tagged_blocks()
    }

    pub fn delete_tagged_blocks(&self, tag: &str) -> Result<usize> {
        self.sync.delete_tagged_blocks(tag)
    }

    pub fn delete_all_tagged_blocks(&self) -> Result<usize> {
        self.sync.delete_all_tagged_blocks()
    }

    pub fn table_counts(&self) -> Result<TableCounts> {
        self.sync.table_counts()
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.sync.schema_version()
    }
}
