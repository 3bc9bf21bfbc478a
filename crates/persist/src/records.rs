//! Row types returned by bulk loads and lookups.
//!
//! These are transient copies owned by the caller; the store keeps the
//! persisted rows.

use serde::Serialize;
use worldstore_common::BlockPos;

/// A stored block or light value at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoxelRecord {
    pub pos: BlockPos,
    pub value: i32,
}

/// A sign attached to one face of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignRecord {
    pub pos: BlockPos,
    pub face: i32,
    pub text: String,
}

/// Last saved player position and view angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rx: f32,
    pub ry: f32,
}

/// Row counts per table, for inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub blocks: u64,
    pub lights: u64,
    pub keys: u64,
    pub signs: u64,
    pub metadata: u64,
    pub bookmarks: u64,
    pub tagged_blocks: u64,
}

/// Outcome of a forced WAL checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointReport {
    /// A reader or writer prevented the checkpoint from completing.
    pub busy: bool,
    /// Frames in the WAL, or -1 when the store is not in WAL mode.
    pub log_frames: i64,
    /// Frames copied back into the database file, or -1 outside WAL mode.
    pub checkpointed_frames: i64,
}

impl CheckpointReport {
    /// Whether every logged frame reached the database file.
    pub fn is_complete(&self) -> bool {
        !self.busy && self.checkpointed_frames == self.log_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_serialize_with_nested_position() {
        let record = VoxelRecord {
            pos: BlockPos::new(-1, 64, 7),
            value: 12,
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["pos"]["x"], -1);
        assert_eq!(json["pos"]["y"], 64);
        assert_eq!(json["value"], 12);

        let sign = SignRecord {
            pos: BlockPos::new(0, 0, 0),
            face: 2,
            text: "north".into(),
        };
        assert_eq!(serde_json::to_value(&sign).unwrap()["text"], "north");
    }

    #[test]
    fn checkpoint_report_completeness() {
        let done = CheckpointReport { busy: false, log_frames: 4, checkpointed_frames: 4 };
        let partial = CheckpointReport { busy: false, log_frames: 4, checkpointed_frames: 2 };
        let busy = CheckpointReport { busy: true, log_frames: 4, checkpointed_frames: 4 };
        assert!(done.is_complete());
        assert!(!partial.is_complete());
        assert!(!busy.is_complete());
    }
}
