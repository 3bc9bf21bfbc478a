//! SQLite-backed world tables.
//!
//! `Store` owns the single connection. It always keeps one transaction open:
//! queued writes accumulate inside it until a commit ends it and starts the
//! next. Callers are responsible for exclusive access (the connection sits
//! behind the synchronous-access mutex).

use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use worldstore_common::{BlockPos, RegionCoord};

use crate::command::Command;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::records::{CheckpointReport, PlayerState, SignRecord, TableCounts, VoxelRecord};
use crate::schema::{self, SCHEMA_VERSION};

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the store file, apply the schema and begin the first
    /// transaction.
    pub fn open(path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let store = Self::init(conn, config)?;
        tracing::info!(path = %path.display(), "world store opened");
        Ok(store)
    }

    /// A private in-memory store. WAL and checkpoints degrade to no-ops.
    pub fn open_in_memory(config: &StoreConfig) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, config)
    }

    fn init(conn: Connection, config: &StoreConfig) -> Result<Self> {
        conn.busy_timeout(config.busy_timeout())?;
        let journal: String = conn.pragma_update_and_check(
            None,
            "journal_mode",
            config.journal.as_pragma(),
            |row| row.get(0),
        )?;
        conn.pragma_update(None, "synchronous", config.synchronous.as_pragma())?;

        let file_version: i64 = conn.query_row("pragma user_version", [], |row| row.get(0))?;
        if file_version != 0 && file_version != SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                file_version,
                expected_version: SCHEMA_VERSION,
            });
        }
        conn.execute_batch(schema::CREATE)?;
        if file_version == 0 {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        tracing::debug!(%journal, schema_version = SCHEMA_VERSION, "schema ready");

        let store = Self { conn };
        store.begin()?;
        Ok(store)
    }

    /// Schema version recorded in the file.
    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("pragma user_version", [], |row| row.get(0))?)
    }

    // --- transaction boundary -------------------------------------------

    fn begin(&self) -> rusqlite::Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("begin")?;
        }
        Ok(())
    }

    /// End the open transaction without starting another.
    pub fn end_transaction(&self) -> rusqlite::Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("commit")?;
        }
        Ok(())
    }

    /// Commit the open transaction and immediately begin a new one.
    pub fn commit(&self) -> rusqlite::Result<()> {
        self.end_transaction()?;
        self.begin()
    }

    /// Commit, then fold the write-ahead log into the database file and sync
    /// it, then begin a new transaction.
    pub fn checkpoint(&self) -> rusqlite::Result<CheckpointReport> {
        self.end_transaction()?;
        let report = self
            .conn
            .query_row("pragma wal_checkpoint(FULL)", [], |row| {
                Ok(CheckpointReport {
                    busy: row.get::<_, i64>(0)? != 0,
                    log_frames: row.get(1)?,
                    checkpointed_frames: row.get(2)?,
                })
            });
        // Reopen the transaction even if the checkpoint itself failed.
        self.begin()?;
        report
    }

    /// Apply one queued command. Control commands map to transaction
    /// boundaries: `Commit` rolls over, `Shutdown` only ends.
    pub fn apply(&self, command: &Command) -> rusqlite::Result<()> {
        match command {
            Command::WriteBlock { region, pos, block } => {
                self.upsert_voxel(schema::UPSERT_BLOCK, *region, *pos, *block)
            }
            Command::WriteLight { region, pos, value } => {
                self.upsert_voxel(schema::UPSERT_LIGHT, *region, *pos, *value)
            }
            Command::WriteKey { region, version } => {
                self.conn
                    .prepare_cached(schema::UPSERT_KEY)?
                    .execute(params![region.p, region.q, version])?;
                Ok(())
            }
            Command::Commit => self.commit(),
            Command::Shutdown => self.end_transaction(),
        }
    }

    fn upsert_voxel(
        &self,
        sql: &str,
        region: RegionCoord,
        pos: BlockPos,
        value: i32,
    ) -> rusqlite::Result<()> {
        self.conn.prepare_cached(sql)?.execute(params![
            region.p, region.q, pos.x, pos.y, pos.z, value
        ])?;
        Ok(())
    }

    // --- region loads ---------------------------------------------------

    pub fn load_blocks(&self, region: RegionCoord) -> rusqlite::Result<Vec<VoxelRecord>> {
        self.load_voxels(schema::LOAD_BLOCKS, region)
    }

    pub fn load_lights(&self, region: RegionCoord) -> rusqlite::Result<Vec<VoxelRecord>> {
        self.load_voxels(schema::LOAD_LIGHTS, region)
    }

    fn load_voxels(&self, sql: &str, region: RegionCoord) -> rusqlite::Result<Vec<VoxelRecord>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let records = stmt
            .query_map(params![region.p, region.q], voxel_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn load_signs(&self, region: RegionCoord) -> rusqlite::Result<Vec<SignRecord>> {
        let mut stmt = self.conn.prepare_cached(schema::LOAD_SIGNS)?;
        let records = stmt
            .query_map(params![region.p, region.q], |row| {
                Ok(SignRecord {
                    pos: pos_row(row)?,
                    face: row.get(3)?,
                    text: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn get_key(&self, region: RegionCoord) -> rusqlite::Result<Option<u32>> {
        self.conn
            .prepare_cached(schema::GET_KEY)?
            .query_row(params![region.p, region.q], |row| row.get(0))
            .optional()
    }

    // --- signs ----------------------------------------------------------

    pub fn insert_sign(
        &self,
        region: RegionCoord,
        pos: BlockPos,
        face: i32,
        text: &str,
    ) -> rusqlite::Result<()> {
        self.conn.prepare_cached(schema::UPSERT_SIGN)?.execute(params![
            region.p, region.q, pos.x, pos.y, pos.z, face, text
        ])?;
        Ok(())
    }

    /// Returns the number of rows removed.
    pub fn delete_sign(&self, pos: BlockPos, face: i32) -> rusqlite::Result<usize> {
        self.conn
            .prepare_cached(schema::DELETE_SIGN)?
            .execute(params![pos.x, pos.y, pos.z, face])
    }

    pub fn delete_signs_at(&self, pos: BlockPos) -> rusqlite::Result<usize> {
        self.conn
            .prepare_cached(schema::DELETE_SIGNS_AT)?
            .execute(params![pos.x, pos.y, pos.z])
    }

    pub fn delete_all_signs(&self) -> rusqlite::Result<usize> {
        self.conn.execute(schema::DELETE_ALL_SIGNS, [])
    }

    // --- metadata and bookmarks -----------------------------------------

    pub fn set_metadata(&self, key: &str, value: &str) -> rusqlite::Result<()> {
        self.conn
            .prepare_cached(schema::UPSERT_METADATA)?
            .execute(params![key, value])?;
        Ok(())
    }

    pub fn get_metadata(&self, key: &str) -> rusqlite::Result<Option<String>> {
        self.conn
            .prepare_cached(schema::GET_METADATA)?
            .query_row(params![key], |row| row.get(0))
            .optional()
    }

    pub fn insert_bookmark(
        &self,
        label: &str,
        major: i32,
        minor: i32,
        pos: BlockPos,
    ) -> rusqlite::Result<()> {
        self.conn.prepare_cached(schema::UPSERT_BOOKMARK)?.execute(params![
            label, major, minor, pos.x, pos.y, pos.z
        ])?;
        Ok(())
    }

    pub fn get_bookmark(
        &self,
        label: &str,
        major: i32,
        minor: i32,
    ) -> rusqlite::Result<Option<BlockPos>> {
        self.conn
            .prepare_cached(schema::GET_BOOKMARK)?
            .query_row(params![label, major, minor], pos_row)
            .optional()
    }

    // --- player state ---------------------------------------------------

    /// Replace the single saved player state row.
    pub fn save_player_state(&self, state: &PlayerState) -> rusqlite::Result<()> {
        self.conn.execute(schema::CLEAR_PLAYER_STATE, [])?;
        self.conn.prepare_cached(schema::INSERT_PLAYER_STATE)?.execute(params![
            f64::from(state.x),
            f64::from(state.y),
            f64::from(state.z),
            f64::from(state.rx),
            f64::from(state.ry),
        ])?;
        Ok(())
    }

    pub fn load_player_state(&self) -> rusqlite::Result<Option<PlayerState>> {
        self.conn
            .prepare_cached(schema::LOAD_PLAYER_STATE)?
            .query_row([], |row| {
                Ok(PlayerState {
                    x: row.get::<_, f64>(0)? as f32,
                    y: row.get::<_, f64>(1)? as f32,
                    z: row.get::<_, f64>(2)? as f32,
                    rx: row.get::<_, f64>(3)? as f32,
                    ry: row.get::<_, f64>(4)? as f32,
                })
            })
            .optional()
    }

    // --- tagged blocks --------------------------------------------------

    pub fn insert_tagged_block(&self, pos: BlockPos, tag: &str) -> rusqlite::Result<()> {
        self.conn
            .prepare_cached(schema::INSERT_TAGGED_BLOCK)?
            .execute(params![pos.x, pos.y, pos.z, tag])?;
        Ok(())
    }

    pub fn tagged_blocks(&self) -> rusqlite::Result<Vec<BlockPos>> {
        let mut stmt = self.conn.prepare_cached(schema::LOAD_TAGGED_BLOCKS)?;
        let positions = stmt
            .query_map([], pos_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(positions)
    }

    pub fn delete_tagged_blocks(&self, tag: &str) -> rusqlite::Result<usize> {
        self.conn
            .prepare_cached(schema::DELETE_TAGGED_BLOCKS)?
            .execute(params![tag])
    }

    pub fn delete_all_tagged_blocks(&self) -> rusqlite::Result<usize> {
        self.conn.execute(schema::DELETE_ALL_TAGGED_BLOCKS, [])
    }

    // --- inspection -----------------------------------------------------

    pub fn table_counts(&self) -> rusqlite::Result<TableCounts> {
        let mut counts = [0u64; schema::COUNTED_TABLES.len()];
        for (slot, table) in counts.iter_mut().zip(schema::COUNTED_TABLES) {
            let n: i64 =
                self.conn
                    .query_row(&format!("select count(*) from {table}"), [], |row| row.get(0))?;
            *slot = n.max(0) as u64;
        }
        let [blocks, lights, keys, signs, metadata, bookmarks, tagged_blocks] = counts;
        Ok(TableCounts {
            blocks,
            lights,
            keys,
            signs,
            metadata,
            bookmarks,
            tagged_blocks,
        })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Commit outstanding work and close the connection.
    pub fn close(self) -> Result<()> {
        self.end_transaction()?;
        self.conn.close().map_err(|(_, err)| StoreError::Sqlite(err))
    }
}

fn pos_row(row: &Row<'_>) -> rusqlite::Result<BlockPos> {
    Ok(BlockPos::new(row.get(0)?, row.get(1)?, row.get(2)?))
}

fn voxel_row(row: &Row<'_>) -> rusqlite::Result<VoxelRecord> {
    Ok(VoxelRecord {
        pos: pos_row(row)?,
        value: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> Store {
        Store::open_in_memory(&StoreConfig::default()).unwrap()
    }

    fn write_block(store: &Store, region: RegionCoord, pos: BlockPos, block: i32) {
        store
            .apply(&Command::WriteBlock { region, pos, block })
            .unwrap();
    }

    #[test]
    fn open_stamps_schema_version() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path().join("world.db"), &StoreConfig::default()).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        assert_eq!(store.table_counts().unwrap(), TableCounts::default());
    }

    #[test]
    fn block_upsert_is_idempotent() {
        let store = memory_store();
        let region = RegionCoord::new(0, 0);
        let pos = BlockPos::new(5, 10, 5);
        write_block(&store, region, pos, 3);
        write_block(&store, region, pos, 3);

        let blocks = store.load_blocks(region).unwrap();
        assert_eq!(blocks, vec![VoxelRecord { pos, value: 3 }]);
    }

    #[test]
    fn later_write_wins() {
        let store = memory_store();
        let region = RegionCoord::new(2, -1);
        let pos = BlockPos::new(70, 4, -20);
        write_block(&store, region, pos, 1);
        write_block(&store, region, pos, 2);
        assert_eq!(store.load_blocks(region).unwrap()[0].value, 2);
    }

    #[test]
    fn loads_are_scoped_to_region() {
        let store = memory_store();
        write_block(&store, RegionCoord::new(0, 0), BlockPos::new(1, 1, 1), 7);
        write_block(&store, RegionCoord::new(1, 0), BlockPos::new(33, 1, 1), 8);
        store
            .apply(&Command::WriteLight {
                region: RegionCoord::new(0, 0),
                pos: BlockPos::new(1, 2, 1),
                value: 15,
            })
            .unwrap();

        let blocks = store.load_blocks(RegionCoord::new(0, 0)).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].value, 7);

        let lights = store.load_lights(RegionCoord::new(0, 0)).unwrap();
        assert_eq!(lights, vec![VoxelRecord { pos: BlockPos::new(1, 2, 1), value: 15 }]);
        assert!(store.load_lights(RegionCoord::new(1, 0)).unwrap().is_empty());
    }

    #[test]
    fn generation_key_lookup() {
        let store = memory_store();
        let region = RegionCoord::new(3, 4);
        assert_eq!(store.get_key(region).unwrap(), None);

        store.apply(&Command::WriteKey { region, version: 1 }).unwrap();
        store.apply(&Command::WriteKey { region, version: 2 }).unwrap();
        assert_eq!(store.get_key(region).unwrap(), Some(2));
        assert_eq!(store.table_counts().unwrap().keys, 1);
    }

    #[test]
    fn sign_deletion_scope() {
        let store = memory_store();
        let region = RegionCoord::new(0, 0);
        let pos = BlockPos::new(4, 5, 6);
        store.insert_sign(region, pos, 0, "north").unwrap();
        store.insert_sign(region, pos, 1, "east").unwrap();

        assert_eq!(store.delete_sign(pos, 0).unwrap(), 1);
        let signs = store.load_signs(region).unwrap();
        assert_eq!(signs.len(), 1);
        assert_eq!(signs[0].face, 1);
        assert_eq!(signs[0].text, "east");

        store.insert_sign(region, pos, 2, "south").unwrap();
        assert_eq!(store.delete_signs_at(pos).unwrap(), 2);
        assert!(store.load_signs(region).unwrap().is_empty());
    }

    #[test]
    fn sign_text_is_bound_not_interpolated() {
        let store = memory_store();
        let region = RegionCoord::new(0, 0);
        let text = "'); drop table sign; --";
        store.insert_sign(region, BlockPos::new(0, 0, 0), 0, text).unwrap();
        assert_eq!(store.load_signs(region).unwrap()[0].text, text);
    }

    #[test]
    fn sign_upsert_replaces_text() {
        let store = memory_store();
        let region = RegionCoord::new(0, 0);
        let pos = BlockPos::new(1, 1, 1);
        store.insert_sign(region, pos, 3, "old").unwrap();
        store.insert_sign(region, pos, 3, "new").unwrap();
        let signs = store.load_signs(region).unwrap();
        assert_eq!(signs.len(), 1);
        assert_eq!(signs[0].text, "new");

        store.delete_all_signs().unwrap();
        assert_eq!(store.table_counts().unwrap().signs, 0);
    }

    #[test]
    fn metadata_and_bookmarks() {
        let store = memory_store();
        assert_eq!(store.get_metadata("missing").unwrap(), None);
        store.set_metadata("progress", "12").unwrap();
        store.set_metadata("progress", "13").unwrap();
        assert_eq!(store.get_metadata("progress").unwrap().as_deref(), Some("13"));

        store.insert_bookmark("Genesis", 1, 1, BlockPos::new(1000, 75, 0)).unwrap();
        store.insert_bookmark("Genesis", 1, 1, BlockPos::new(1000, 75, 4)).unwrap();
        store.insert_bookmark("INFO", -1, 0, BlockPos::new(0, 80, 0)).unwrap();
        assert_eq!(
            store.get_bookmark("Genesis", 1, 1).unwrap(),
            Some(BlockPos::new(1000, 75, 4))
        );
        assert_eq!(store.get_bookmark("INFO", -1, 0).unwrap(), Some(BlockPos::new(0, 80, 0)));
        assert_eq!(store.get_bookmark("Genesis", 1, 2).unwrap(), None);
        assert_eq!(store.table_counts().unwrap().bookmarks, 2);
    }

    #[test]
    fn player_state_keeps_single_row() {
        let store = memory_store();
        assert_eq!(store.load_player_state().unwrap(), None);

        let first = PlayerState { x: 1.0, y: 2.0, z: 3.0, rx: 0.5, ry: -0.25 };
        let second = PlayerState { x: -8.5, y: 90.0, z: 12.0, rx: 1.5, ry: 0.0 };
        store.save_player_state(&first).unwrap();
        store.save_player_state(&second).unwrap();
        assert_eq!(store.load_player_state().unwrap(), Some(second));
    }

    #[test]
    fn tagged_blocks_delete_by_tag() {
        let store = memory_store();
        store.insert_tagged_block(BlockPos::new(1, 2, 3), "2026-01-01").unwrap();
        store.insert_tagged_block(BlockPos::new(4, 5, 6), "2026-01-01").unwrap();
        store.insert_tagged_block(BlockPos::new(7, 8, 9), "2026-01-02").unwrap();
        assert_eq!(store.tagged_blocks().unwrap().len(), 3);

        assert_eq!(store.delete_tagged_blocks("2026-01-01").unwrap(), 2);
        assert_eq!(store.tagged_blocks().unwrap(), vec![BlockPos::new(7, 8, 9)]);

        store.delete_all_tagged_blocks().unwrap();
        assert!(store.tagged_blocks().unwrap().is_empty());
    }

    #[test]
    fn commit_makes_writes_visible_to_other_connections() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world.db");
        let store = Store::open(&path, &StoreConfig::default()).unwrap();
        let region = RegionCoord::new(0, 0);
        write_block(&store, region, BlockPos::new(1, 1, 1), 9);

        let count = |conn: &Connection| -> i64 {
            conn.query_row("select count(*) from block", [], |row| row.get(0))
                .unwrap()
        };
        let other = Connection::open(&path).unwrap();
        assert_eq!(count(&other), 0, "uncommitted write leaked");

        store.apply(&Command::Commit).unwrap();
        assert_eq!(count(&other), 1);
    }

    #[test]
    fn checkpoint_folds_wal_into_database() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path().join("world.db"), &StoreConfig::default()).unwrap();
        store.set_metadata("progress", "complete").unwrap();

        let report = store.checkpoint().unwrap();
        assert!(report.is_complete());
        assert!(report.log_frames > 0);

        // A transaction is open again afterwards.
        store.set_metadata("after", "checkpoint").unwrap();
        store.commit().unwrap();
    }

    #[test]
    fn checkpoint_outside_wal_reports_no_log() {
        let store = memory_store();
        let report = store.checkpoint().unwrap();
        assert_eq!(report.log_frames, -1);
    }

    #[test]
    fn reopen_preserves_committed_state() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world.db");
        {
            let store = Store::open(&path, &StoreConfig::default()).unwrap();
            store.set_metadata("seed", "42").unwrap();
            store.close().unwrap();
        }
        let store = Store::open(&path, &StoreConfig::default()).unwrap();
        assert_eq!(store.get_metadata("seed").unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn schema_mismatch_fail_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world.db");
        Store::open(&path, &StoreConfig::default())
            .unwrap()
            .close()
            .unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.pragma_update(None, "user_version", 999).unwrap();
        drop(conn);

        match Store::open(&path, &StoreConfig::default()) {
            Err(StoreError::SchemaMismatch {
                file_version,
                expected_version,
            }) => {
                assert_eq!(file_version, 999);
                assert_eq!(expected_version, SCHEMA_VERSION);
            }
            Err(e) => panic!("expected SchemaMismatch, got: {e}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }
}
