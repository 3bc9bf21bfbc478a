use serde::{Deserialize, Serialize};
use std::fmt;

/// Edge length, in blocks, of one region (chunk) along X and Z.
pub const CHUNK_SIZE: i32 = 32;

/// Integer coordinates of a region: a fixed-size column of the world.
///
/// The store never derives regions itself; callers compute them from block
/// coordinates (see [`RegionCoord::containing`]) and pass them alongside
/// every region-scoped write.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct RegionCoord {
    pub p: i32,
    pub q: i32,
}

impl RegionCoord {
    pub fn new(p: i32, q: i32) -> Self {
        Self { p, q }
    }

    /// Region holding the block column at world (x, z), using [`CHUNK_SIZE`].
    pub fn containing(x: i32, z: i32) -> Self {
        Self::containing_with(x, z, CHUNK_SIZE)
    }

    /// Region holding (x, z) for an arbitrary chunk size.
    ///
    /// Uses floor division so that x = -1 lands in region -1, not 0.
    pub fn containing_with(x: i32, z: i32, chunk_size: i32) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        Self {
            p: x.div_euclid(chunk_size),
            q: z.div_euclid(chunk_size),
        }
    }
}

impl fmt::Display for RegionCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.p, self.q)
    }
}

/// Integer block position in world space.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Region this position belongs to.
    pub fn region(&self) -> RegionCoord {
        RegionCoord::containing(self.x, self.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
