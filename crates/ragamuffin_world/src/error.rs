//! # World Error Types
//!
//! All errors that can occur while editing, streaming or persisting the world.

use thiserror::Error;

use crate::chunk::ChunkCoord;

/// Errors that can occur in the world system.
#[derive(Error, Debug)]
pub enum WorldError {
    /// Block coordinate outside the vertical range of the world.
    #[error("block position ({x}, {y}, {z}) is outside the world")]
    OutOfBounds {
        /// World X.
        x: i32,
        /// World Y.
        y: i32,
        /// World Z.
        z: i32,
    },

    /// Edit targeted a chunk that is not resident.
    #[error("chunk ({}, {}) is not loaded", .0.x, .0.z)]
    ChunkNotLoaded(ChunkCoord),

    /// Placement rejected (occupied cell, overlapping actor, ...).
    #[error("cannot place block: {0}")]
    InvalidPlacement(&'static str),

    /// Tried to break a block that cannot be broken.
    #[error("block at ({x}, {y}, {z}) cannot be broken")]
    Unbreakable {
        /// World X.
        x: i32,
        /// World Y.
        y: i32,
        /// World Z.
        z: i32,
    },

    /// Save file belongs to a different world.
    #[error("save was written for seed {found:#x}, world seed is {expected:#x}")]
    SeedMismatch {
        /// Seed of the running world.
        expected: u64,
        /// Seed stored in the file.
        found: u64,
    },

    /// Save or chunk data failed validation.
    #[error("corrupt save data: {0}")]
    CorruptSave(String),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
