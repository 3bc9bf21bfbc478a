use worldstore_common::{BlockPos, RegionCoord};

/// A mutation travelling through the command queue to the writer thread.
///
/// The set is closed: hot-path world edits plus the two control commands.
/// Duplicate keys are never coalesced; a later write simply lands later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upsert the block type at `pos` (0 = empty).
    WriteBlock {
        region: RegionCoord,
        pos: BlockPos,
        block: i32,
    },
    /// Upsert the light value at `pos`.
    WriteLight {
        region: RegionCoord,
        pos: BlockPos,
        value: i32,
    },
    /// Upsert the generation key of `region`.
    WriteKey { region: RegionCoord, version: u32 },
    /// End the writer's open transaction and start a new one.
    Commit,
    /// Drain, commit and stop the writer.
    Shutdown,
}

impl Command {
    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::WriteBlock { .. } => "write_block",
            Command::WriteLight { .. } => "write_light",
            Command::WriteKey { .. } => "write_key",
            Command::Commit => "commit",
            Command::Shutdown => "shutdown",
        }
    }
}
