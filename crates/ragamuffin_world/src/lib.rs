//! # RAGAMUFFIN World
//!
//! Deterministic voxel town for a down-and-out life simulation.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same town
//! 2. **Chunked**: The town is generated in 16x16x64 chunks
//! 3. **Streamable**: Chunks are generated and discarded around the player
//! 4. **Persistent edits**: Player changes survive unload and save/load
//!
//! ## Core Components
//!
//! - `TownPlan`: Roads, plots and where each landmark lives
//! - `ChunkGenerator`: Produces chunks from the town plan
//! - `World`: Chunk streaming, block edits, props and saves
//! - `Aabb`: Collision boxes shared with the simulation
//!
//! ## Example
//!
//! ```rust,ignore
//! use ragamuffin_world::{World, WorldSeed};
//!
//! let mut world = World::with_seed(WorldSeed::new(12345));
//!
//! let spawn = world.plan().spawn_point();
//! world.update(spawn[0], spawn[2]);
//! world.flush_generation_queue();
//!
//! assert!(world.has_ground(spawn[0] as i32, spawn[2] as i32));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod aabb;
pub mod block;
pub mod chunk;
pub mod error;
pub mod generator;
pub mod noise;
pub mod persistence;
pub mod props;
pub mod town;
pub mod world;

pub use aabb::Aabb;
pub use block::{Block, BlockType};
pub use chunk::{BlockPos, Chunk, ChunkCoord, CHUNK_HEIGHT, CHUNK_SIZE, SURFACE_Y};
pub use error::{WorldError, WorldResult};
pub use generator::ChunkGenerator;
pub use noise::{SimplexNoise, WorldSeed};
pub use persistence::{BlockModifyPayload, SaveData};
pub use props::{PropId, PropPosition, PropType};
pub use town::{ground_at, CellCoord, Ground, Landmark, LandmarkType, PlotKind, TownPlan};
pub use world::{PropHit, PropState, World, WorldConfig, WorldStats};
