//! Shared types for the world store: block positions and region coordinates.

pub mod types;

pub use types::{BlockPos, CHUNK_SIZE, RegionCoord};
