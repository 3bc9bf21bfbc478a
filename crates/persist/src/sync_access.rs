use std::sync::{Arc, Mutex, MutexGuard};
use worldstore_common::{BlockPos, RegionCoord};

use crate::error::{Result, StoreError};
use crate::records::{CheckpointReport, PlayerState, SignRecord, TableCounts, VoxelRecord};
use crate::store::Store;

/// Direct, caller-thread access to the store, bypassing the command queue.
///
/// Every call holds the synchronous-access lock for its whole duration, so
/// readers never see a half-applied write and writers never interleave.
/// Writes commit before the lock is released: once a call returns, the
/// change (and any queued writes the worker had already applied) is
/// committed. Reads observe at least the last commit; writes still sitting
/// in the command queue may not be visible yet.
#[derive(Clone)]
pub struct SyncAccess {
    store: Arc<Mutex<Store>>,
}

impl SyncAccess {
    pub fn new(store: Arc<Mutex<Store>>) -> Self {
        Self { store }
    }

    pub(crate) fn shared(&self) -> Arc<Mutex<Store>> {
        self.store.clone()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>> {
        self.store.lock().map_err(|_| StoreError::Poisoned)
    }

    fn read<T>(&self, op: impl FnOnce(&Store) -> rusqlite::Result<T>) -> Result<T> {
        let store = self.lock()?;
        Ok(op(&store)?)
    }

    fn write<T>(
        &self,
        name: &'static str,
        op: impl FnOnce(&Store) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let store = self.lock()?;
        let out = op(&store)?;
        store.commit()?;
        tracing::debug!(op = name, "synchronous write committed");
        Ok(out)
    }

    // --- bulk loads -----------------------------------------------------

    pub fn load_blocks(&self, region: RegionCoord) -> Result<Vec<VoxelRecord>> {
        self.read(|s| s.load_blocks(region))
    }

    pub fn load_lights(&self, region: RegionCoord) -> Result<Vec<VoxelRecord>> {
        self.read(|s| s.load_lights(region))
    }

    pub fn load_signs(&self, region: RegionCoord) -> Result<Vec<SignRecord>> {
        self.read(|s| s.load_signs(region))
    }

    pub fn get_key(&self, region: RegionCoord) -> Result<Option<u32>> {
        self.read(|s| s.get_key(region))
    }

    // --- signs ----------------------------------------------------------

    pub fn insert_sign(
        &self,
        region: RegionCoord,
        pos: BlockPos,
        face: i32,
        text: &str,
    ) -> Result<()> {
        self.write("insert_sign", |s| s.insert_sign(region, pos, face, text))
    }

    pub fn delete_sign(&self, pos: BlockPos, face: i32) -> Result<usize> {
        self.write("delete_sign", |s| s.delete_sign(pos, face))
    }

    pub fn delete_signs_at(&self, pos: BlockPos) -> Result<usize> {
        self.write("delete_signs_at", |s| s.delete_signs_at(pos))
    }

    pub fn delete_all_signs(&self) -> Result<usize> {
        self.write("delete_all_signs", Store::delete_all_signs)
    }

    // --- metadata and bookmarks -----------------------------------------

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.write("set_metadata", |s| s.set_metadata(key, value))
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        self.read(|s| s.get_metadata(key))
    }

    pub fn insert_bookmark(&self, label: &str, major: i32, minor: i32, pos: BlockPos) -> Result<()> {
        self.write("insert_bookmark", |s| {
            s.insert_bookmark(label, major, minor, pos)
        })
    }

    pub fn get_bookmark(&self, label: &str, major: i32, minor: i32) -> Result<Option<BlockPos>> {
        self.read(|s| s.get_bookmark(label, major, minor))
    }

    // --- player state and tagged blocks ---------------------------------

    pub fn save_player_state(&self, state: &PlayerState) -> Result<()> {
        self.write("save_player_state", |s| s.save_player_state(state))
    }

    pub fn load_player_state(&self) -> Result<Option<PlayerState>> {
        self.read(Store::load_player_state)
    }

    pub fn insert_tagged_block(&self, pos: BlockPos, tag: &str) -> Result<()> {
        self.write("insert_tagged_block", |s| s.insert_tagged_block(pos, tag))
    }

    pub fn tagged_blocks(&self) -> Result<Vec<BlockPos>> {
        self.read(Store::tagged_blocks)
    }

    pub fn delete_tagged_blocks(&self, tag: &str) -> Result<usize> {
        self.write("delete_tagged_blocks", |s| s.delete_tagged_blocks(tag))
    }

    pub fn delete_all_tagged_blocks(&self) -> Result<usize> {
        self.write("delete_all_tagged_blocks", Store::delete_all_tagged_blocks)
    }

    // --- durability -----------------------------------------------------

    /// Commit the worker's open transaction and force the write-ahead log
    /// to stable storage.
    pub fn force_checkpoint(&self) -> Result<CheckpointReport> {
        let report = self.lock()?.checkpoint()?;
        if report.is_complete() {
            tracing::info!(frames = report.checkpointed_frames, "checkpoint complete");
        } else {
            tracing::warn!(?report, "checkpoint incomplete");
        }
        Ok(report)
    }

    pub fn table_counts(&self) -> Result<TableCounts> {
        self.read(Store::table_counts)
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.lock()?.schema_version()
    }
}
