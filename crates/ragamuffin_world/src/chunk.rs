//! # Chunk System
//!
//! World data is organized into fixed-size chunks so only the streets around
//! the player are resident.
//!
//! ## Chunk Format
//!
//! Chunks are 16x16x64 blocks (width x depth x height). Each block is a
//! 4-byte [`Block`] (type id + meta flags).
//!
//! ## Storage
//!
//! Chunk snapshots are saved as LZ4-compressed block arrays. Town chunks
//! compress very well since most of the volume is air or stone.

use std::path::Path;

use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::block::Block;
use crate::error::{WorldError, WorldResult};

/// Chunk width/depth in blocks.
pub const CHUNK_SIZE: usize = 16;

/// Chunk height in blocks.
pub const CHUNK_HEIGHT: usize = 64;

/// Total blocks per chunk.
pub const BLOCKS_PER_CHUNK: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_HEIGHT;

/// Y level of the walkable ground surface (roads, pavement, grass).
pub const SURFACE_Y: i32 = 4;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Z coordinate (in chunks, not blocks).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Converts world block coordinates to chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn from_block_pos(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(CHUNK_SIZE as i32),
            z: block_z.div_euclid(CHUNK_SIZE as i32),
        }
    }

    /// Chunk containing a floating-point world position.
    #[inline]
    #[must_use]
    pub fn from_world_pos(world_x: f32, world_z: f32) -> Self {
        Self::from_block_pos(world_x.floor() as i32, world_z.floor() as i32)
    }

    /// Returns the world X coordinate of the chunk's origin (corner).
    #[inline]
    #[must_use]
    pub const fn world_x(self) -> i32 {
        self.x * CHUNK_SIZE as i32
    }

    /// Returns the world Z coordinate of the chunk's origin.
    #[inline]
    #[must_use]
    pub const fn world_z(self) -> i32 {
        self.z * CHUNK_SIZE as i32
    }

    /// Chebyshev distance in chunks.
    #[inline]
    #[must_use]
    pub const fn chebyshev(self, other: Self) -> i32 {
        let dx = (self.x - other.x).abs();
        let dz = (self.z - other.z).abs();
        if dx > dz { dx } else { dz }
    }

    /// Squared euclidean distance in chunks, used to order generation.
    #[inline]
    #[must_use]
    pub const fn distance_sq(self, other: Self) -> i32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }
}

/// Integer world block position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    /// World X.
    pub x: i32,
    /// World Y.
    pub y: i32,
    /// World Z.
    pub z: i32,
}

impl BlockPos {
    /// Creates a block position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block containing a floating-point world position.
    #[inline]
    #[must_use]
    pub fn containing(position: [f32; 3]) -> Self {
        Self::new(
            position[0].floor() as i32,
            position[1].floor() as i32,
            position[2].floor() as i32,
        )
    }

    /// Position offset by the given deltas.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Chunk that holds this block.
    #[inline]
    #[must_use]
    pub const fn chunk(self) -> ChunkCoord {
        ChunkCoord::from_block_pos(self.x, self.z)
    }

    /// Centre of the block in world space.
    #[inline]
    #[must_use]
    pub fn center(self) -> [f32; 3] {
        [self.x as f32 + 0.5, self.y as f32 + 0.5, self.z as f32 + 0.5]
    }

    /// Local (x, y, z) inside the owning chunk, or `None` if `y` is out of range.
    #[inline]
    #[must_use]
    pub fn local(self) -> Option<(usize, usize, usize)> {
        if self.y < 0 || self.y >= CHUNK_HEIGHT as i32 {
            return None;
        }
        Some((
            self.x.rem_euclid(CHUNK_SIZE as i32) as usize,
            self.y as usize,
            self.z.rem_euclid(CHUNK_SIZE as i32) as usize,
        ))
    }
}

/// A chunk of world data.
///
/// Contains a 16x16x64 grid of blocks plus a height map.
#[derive(Clone)]
pub struct Chunk {
    /// Chunk position in the world.
    pub coord: ChunkCoord,
    /// Block data (indexed as [y][z][x]).
    blocks: Box<[[[Block; CHUNK_SIZE]; CHUNK_SIZE]; CHUNK_HEIGHT]>,
    /// Height map (highest non-air block in each column, -1 for an empty column).
    height_map: [[i8; CHUNK_SIZE]; CHUNK_SIZE],
    /// Whether this chunk has been modified since generation.
    pub modified: bool,
}

impl Chunk {
    /// Creates a new empty chunk at the given coordinates.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: Box::new([[[Block::AIR; CHUNK_SIZE]; CHUNK_SIZE]; CHUNK_HEIGHT]),
            height_map: [[-1; CHUNK_SIZE]; CHUNK_SIZE],
            modified: false,
        }
    }

    /// Gets a block at local coordinates. Out-of-range reads are air.
    #[inline]
    #[must_use]
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> Block {
        if x < CHUNK_SIZE && y < CHUNK_HEIGHT && z < CHUNK_SIZE {
            self.blocks[y][z][x]
        } else {
            Block::AIR
        }
    }

    /// Sets a block at local coordinates. Out-of-range writes are ignored.
    #[inline]
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: Block) {
        if x < CHUNK_SIZE && y < CHUNK_HEIGHT && z < CHUNK_SIZE {
            self.blocks[y][z][x] = block;
            self.modified = true;

            let top = self.height_map[z][x];
            if !block.is_air() && y as i8 > top {
                self.height_map[z][x] = y as i8;
            } else if block.is_air() && y as i8 == top {
                self.recompute_column(x, z);
            }
        }
    }

    /// Highest non-air block in a local column.
    #[inline]
    #[must_use]
    pub fn height(&self, x: usize, z: usize) -> Option<usize> {
        if x < CHUNK_SIZE && z < CHUNK_SIZE {
            usize::try_from(self.height_map[z][x]).ok()
        } else {
            None
        }
    }

    /// Counts non-air blocks.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.blocks
            .as_flattened()
            .as_flattened()
            .iter()
            .filter(|b| !b.is_air())
            .count()
    }

    fn recompute_column(&mut self, x: usize, z: usize) {
        self.height_map[z][x] = (0..CHUNK_HEIGHT)
            .rev()
            .find(|&y| !self.blocks[y][z][x].is_air())
            .map_or(-1, |y| y as i8);
    }

    /// Serializes and LZ4-compresses the block data.
    #[must_use]
    pub fn to_compressed_bytes(&self) -> Vec<u8> {
        let block_bytes =
            bytemuck::cast_slice::<Block, u8>(self.blocks.as_flattened().as_flattened());
        compress_prepend_size(block_bytes)
    }

    /// Rebuilds a chunk from [`Chunk::to_compressed_bytes`] output.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CorruptSave`] if decompression fails or the
    /// payload has the wrong size.
    pub fn from_compressed_bytes(coord: ChunkCoord, compressed: &[u8]) -> WorldResult<Self> {
        let decompressed = decompress_size_prepended(compressed)
            .map_err(|e| WorldError::CorruptSave(e.to_string()))?;

        if decompressed.len() != Self::data_size() {
            return Err(WorldError::CorruptSave(format!(
                "chunk payload is {} bytes, expected {}",
                decompressed.len(),
                Self::data_size()
            )));
        }

        let mut chunk = Self::new(coord);
        let flat = chunk.blocks.as_flattened_mut().as_flattened_mut();
        // The Vec<u8> may not be 2-aligned, so copy through bytes.
        bytemuck::cast_slice_mut::<Block, u8>(flat).copy_from_slice(&decompressed);

        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                chunk.recompute_column(x, z);
            }
        }

        Ok(chunk)
    }

    /// Saves the chunk to a compressed binary file.
    ///
    /// # Errors
    ///
    /// Returns error if file operations fail.
    pub fn save_compressed(&self, path: &Path) -> WorldResult<()> {
        std::fs::write(path, self.to_compressed_bytes())?;
        Ok(())
    }

    /// Loads a chunk from a compressed binary file.
    ///
    /// # Errors
    ///
    /// Returns error if file operations or decompression fail.
    pub fn load_compressed(path: &Path, coord: ChunkCoord) -> WorldResult<Self> {
        let compressed = std::fs::read(path)?;
        Self::from_compressed_bytes(coord, &compressed)
    }

    /// Returns the raw block data size in bytes (uncompressed).
    #[must_use]
    pub const fn data_size() -> usize {
        BLOCKS_PER_CHUNK * std::mem::size_of::<Block>()
    }
}
