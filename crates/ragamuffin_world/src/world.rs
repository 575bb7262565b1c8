//! # World Streaming
//!
//! [`World`] keeps the chunks around the player resident, generates new ones
//! nearest-first within a per-update budget, and drops the ones left behind.
//!
//! Player edits live in a modification log keyed by chunk. The log is
//! re-applied whenever a chunk is regenerated, so walking away from a shelter
//! and coming back finds it exactly as it was left.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info};

use crate::aabb::Aabb;
use crate::block::{Block, BlockType};
use crate::chunk::{BlockPos, Chunk, ChunkCoord, CHUNK_HEIGHT};
use crate::error::{WorldError, WorldResult};
use crate::generator::ChunkGenerator;
use crate::noise::WorldSeed;
use crate::persistence::{self, BlockModifyPayload, SaveData};
use crate::props::{props_for_chunk, PropId, PropPosition, PropType};
use crate::town::TownPlan;

/// Streaming parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldConfig {
    /// Chunks within this Chebyshev radius of the player are loaded.
    pub load_radius: i32,
    /// Chunks beyond this radius are unloaded. Must be >= `load_radius`.
    pub unload_radius: i32,
    /// Chunks generated per [`World::update`] call.
    pub max_generate_per_update: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            load_radius: 4,
            unload_radius: 6,
            max_generate_per_update: 4,
        }
    }
}

/// Session counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Chunks generated since the world was created.
    pub generated_this_session: u64,
    /// Chunks unloaded since the world was created.
    pub unloaded_this_session: u64,
    /// Chunks resident right now.
    pub loaded: usize,
    /// Chunks waiting to be generated.
    pub queued: usize,
    /// Block edits in the modification log.
    pub modifications: usize,
}

/// A resident prop and its remaining hit points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropState {
    /// The prop.
    pub prop: PropPosition,
    /// Hits left before it breaks.
    pub health: u32,
}

/// Result of hitting a prop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropHit {
    /// What was hit.
    pub kind: PropType,
    /// Whether the hit destroyed it.
    pub destroyed: bool,
}

/// The streamed voxel town.
pub struct World {
    seed: WorldSeed,
    generator: ChunkGenerator,
    config: WorldConfig,
    chunks: HashMap<ChunkCoord, Chunk>,
    /// Pending generation, farthest first so `pop` yields the nearest.
    queue: Vec<ChunkCoord>,
    modifications: HashMap<ChunkCoord, BTreeMap<BlockPos, Block>>,
    props: HashMap<ChunkCoord, Vec<PropState>>,
    destroyed_props: HashSet<PropId>,
    newly_loaded: Vec<ChunkCoord>,
    newly_unloaded: Vec<ChunkCoord>,
    stats: WorldStats,
}

impl World {
    /// Creates an empty world. Nothing is loaded until [`World::update`] or
    /// [`World::ensure_loaded_around`] is called.
    #[must_use]
    pub fn new(seed: WorldSeed, config: WorldConfig) -> Self {
        Self {
            seed,
            generator: ChunkGenerator::new(seed),
            config,
            chunks: HashMap::new(),
            queue: Vec::new(),
            modifications: HashMap::new(),
            props: HashMap::new(),
            destroyed_props: HashSet::new(),
            newly_loaded: Vec::new(),
            newly_unloaded: Vec::new(),
            stats: WorldStats::default(),
        }
    }

    /// Creates a world with default streaming parameters.
    #[must_use]
    pub fn with_seed(seed: WorldSeed) -> Self {
        Self::new(seed, WorldConfig::default())
    }

    /// World seed.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Town layout.
    #[must_use]
    pub const fn plan(&self) -> &TownPlan {
        self.generator.plan()
    }

    /// Streaming parameters.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Streaming
    // ------------------------------------------------------------------

    /// Streams chunks around the player.
    ///
    /// Unloads distant chunks, queues missing ones and generates up to
    /// `max_generate_per_update` of them, nearest first. Returns the number
    /// generated.
    pub fn update(&mut self, player_x: f32, player_z: f32) -> usize {
        let center = ChunkCoord::from_world_pos(player_x, player_z);
        self.unload_beyond(center, self.config.unload_radius.max(self.config.load_radius));

        let radius = self.config.load_radius;
        self.queue.retain(|c| c.chebyshev(center) <= radius);
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let coord = ChunkCoord::new(center.x + dx, center.z + dz);
                if !self.chunks.contains_key(&coord) && !self.queue.contains(&coord) {
                    self.queue.push(coord);
                }
            }
        }
        self.queue
            .sort_by_key(|c| std::cmp::Reverse(c.distance_sq(center)));

        let mut generated = 0;
        while generated < self.config.max_generate_per_update {
            let Some(coord) = self.queue.pop() else { break };
            self.load_chunk(coord);
            generated += 1;
        }
        generated
    }

    /// Generates everything still queued. Returns the number generated.
    pub fn flush_generation_queue(&mut self) -> usize {
        let mut generated = 0;
        while let Some(coord) = self.queue.pop() {
            if !self.chunks.contains_key(&coord) {
                self.load_chunk(coord);
                generated += 1;
            }
        }
        generated
    }

    /// Synchronously loads every chunk within `radius` of a world position.
    pub fn ensure_loaded_around(&mut self, x: f32, z: f32, radius: i32) {
        let center = ChunkCoord::from_world_pos(x, z);
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let coord = ChunkCoord::new(center.x + dx, center.z + dz);
                if !self.chunks.contains_key(&coord) {
                    self.queue.retain(|c| *c != coord);
                    self.load_chunk(coord);
                }
            }
        }
    }

    fn build_chunk(&self, coord: ChunkCoord) -> (Chunk, Vec<PropState>) {
        let mut chunk = self.generator.generate(coord);
        if let Some(mods) = self.modifications.get(&coord) {
            for (pos, block) in mods {
                if let Some((x, y, z)) = pos.local() {
                    chunk.set_block(x, y, z, *block);
                }
            }
        }

        let props = props_for_chunk(self.generator.plan(), coord)
            .into_iter()
            .filter(|p| !self.destroyed_props.contains(&p.id))
            .map(|prop| PropState { prop, health: prop.kind.hit_points() })
            .collect();

        (chunk, props)
    }

    fn load_chunk(&mut self, coord: ChunkCoord) {
        let (chunk, props) = self.build_chunk(coord);
        self.chunks.insert(coord, chunk);
        self.props.insert(coord, props);
        self.newly_loaded.push(coord);
        self.stats.generated_this_session += 1;
        debug!("chunk ({}, {}) loaded", coord.x, coord.z);
    }

    fn unload_beyond(&mut self, center: ChunkCoord, radius: i32) {
        let stale: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|c| c.chebyshev(center) > radius)
            .copied()
            .collect();

        for coord in stale {
            self.chunks.remove(&coord);
            self.props.remove(&coord);
            self.newly_unloaded.push(coord);
            self.stats.unloaded_this_session += 1;
            debug!("chunk ({}, {}) unloaded", coord.x, coord.z);
        }
    }

    /// Chunks loaded since the last call.
    pub fn drain_loaded(&mut self) -> Vec<ChunkCoord> {
        std::mem::take(&mut self.newly_loaded)
    }

    /// Chunks unloaded since the last call.
    pub fn drain_unloaded(&mut self) -> Vec<ChunkCoord> {
        std::mem::take(&mut self.newly_unloaded)
    }

    /// Whether a chunk is resident.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn loaded_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// A resident chunk.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Counters for this session.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            loaded: self.chunks.len(),
            queued: self.queue.len(),
            modifications: self.modifications.values().map(BTreeMap::len).sum(),
            ..self.stats
        }
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    /// Block at a position. Unloaded or out-of-range positions read as air.
    #[must_use]
    pub fn get_block(&self, pos: BlockPos) -> Block {
        let Some((x, y, z)) = pos.local() else {
            return Block::AIR;
        };
        self.chunks
            .get(&pos.chunk())
            .map_or(Block::AIR, |c| c.get_block(x, y, z))
    }

    /// Type of the block at a position.
    #[must_use]
    pub fn block_type(&self, pos: BlockPos) -> BlockType {
        self.get_block(pos).kind()
    }

    /// Whether the block at integer coordinates blocks movement.
    #[must_use]
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        self.get_block(BlockPos::new(x, y, z)).is_solid()
    }

    /// Replaces a block and records the edit. Returns the previous block.
    ///
    /// # Errors
    ///
    /// [`WorldError::OutOfBounds`] if `y` is outside the world,
    /// [`WorldError::ChunkNotLoaded`] if the chunk is not resident.
    pub fn set_block(&mut self, pos: BlockPos, block: Block) -> WorldResult<Block> {
        let (x, y, z) = pos.local().ok_or(WorldError::OutOfBounds {
            x: pos.x,
            y: pos.y,
            z: pos.z,
        })?;
        let coord = pos.chunk();
        let chunk = self
            .chunks
            .get_mut(&coord)
            .ok_or(WorldError::ChunkNotLoaded(coord))?;

        let previous = chunk.get_block(x, y, z);
        chunk.set_block(x, y, z, block);
        self.modifications.entry(coord).or_default().insert(pos, block);
        Ok(previous)
    }

    /// Highest solid block in a column, if the column is loaded and has one.
    #[must_use]
    pub fn surface_height(&self, x: i32, z: i32) -> Option<i32> {
        let coord = ChunkCoord::from_block_pos(x, z);
        let chunk = self.chunks.get(&coord)?;
        let lx = (x - coord.world_x()) as usize;
        let lz = (z - coord.world_z()) as usize;
        (0..CHUNK_HEIGHT)
            .rev()
            .find(|&y| chunk.get_block(lx, y, lz).is_solid())
            .map(|y| y as i32)
    }

    /// Whether the column has solid ground under it.
    #[must_use]
    pub fn has_ground(&self, x: i32, z: i32) -> bool {
        self.surface_height(x, z).is_some()
    }

    /// Lowest free standing height at or above `from_y`: solid below, two air above.
    #[must_use]
    pub fn standing_height(&self, x: i32, z: i32, from_y: i32) -> Option<i32> {
        (from_y.max(1)..CHUNK_HEIGHT as i32 - 1).find(|&y| {
            self.is_solid(x, y - 1, z) && !self.is_solid(x, y, z) && !self.is_solid(x, y + 1, z)
        })
    }

    // ------------------------------------------------------------------
    // Props
    // ------------------------------------------------------------------

    /// Every resident prop.
    pub fn props(&self) -> impl Iterator<Item = &PropState> {
        self.props.values().flatten()
    }

    /// Resident props whose box intersects `area`.
    pub fn props_in(&self, area: Aabb) -> impl Iterator<Item = &PropState> {
        self.props().filter(move |p| p.prop.aabb().intersects(&area))
    }

    /// A resident prop by id.
    #[must_use]
    pub fn prop(&self, id: PropId) -> Option<&PropState> {
        self.props().find(|p| p.prop.id == id)
    }

    /// Applies damage to a prop. Destroyed props are removed and never respawn.
    pub fn damage_prop(&mut self, id: PropId, damage: u32) -> Option<PropHit> {
        let (coord, index) = self.props.iter().find_map(|(coord, list)| {
            list.iter().position(|p| p.prop.id == id).map(|i| (*coord, i))
        })?;
        let list = self.props.get_mut(&coord)?;
        let state = &mut list[index];
        state.health = state.health.saturating_sub(damage.max(1));
        let kind = state.prop.kind;

        if state.health == 0 {
            list.swap_remove(index);
            self.destroyed_props.insert(id);
            debug!("prop {id:#x} ({kind:?}) destroyed");
            return Some(PropHit { kind, destroyed: true });
        }
        Some(PropHit { kind, destroyed: false })
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Snapshot of everything the player changed.
    #[must_use]
    pub fn save_data(&self) -> SaveData {
        let mut modifications: Vec<BlockModifyPayload> = self
            .modifications
            .values()
            .flat_map(|m| m.iter().map(|(pos, block)| BlockModifyPayload { pos: *pos, block: *block }))
            .collect();
        modifications.sort_by_key(|m| m.pos);

        let mut destroyed_props: Vec<PropId> = self.destroyed_props.iter().copied().collect();
        destroyed_props.sort_unstable();

        SaveData { modifications, destroyed_props }
    }

    /// Replaces the modification log and re-applies it to resident chunks.
    pub fn apply_save_data(&mut self, data: SaveData) {
        self.modifications.clear();
        for entry in data.modifications {
            self.modifications
                .entry(entry.pos.chunk())
                .or_default()
                .insert(entry.pos, entry.block);
        }
        self.destroyed_props = data.destroyed_props.into_iter().collect();

        let resident: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        for coord in resident {
            let (chunk, props) = self.build_chunk(coord);
            self.chunks.insert(coord, chunk);
            self.props.insert(coord, props);
        }
    }

    /// Writes the modification log to disk.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save_modifications(&self, path: &Path) -> WorldResult<()> {
        let data = self.save_data();
        std::fs::write(path, persistence::encode(self.seed, &data))?;
        info!(
            "saved {} edits and {} destroyed props to {}",
            data.modifications.len(),
            data.destroyed_props.len(),
            path.display()
        );
        Ok(())
    }

    /// Reads a modification log written by [`World::save_modifications`].
    ///
    /// # Errors
    ///
    /// I/O errors, corrupt data, or a save from a different seed.
    pub fn load_modifications(&mut self, path: &Path) -> WorldResult<()> {
        let bytes = std::fs::read(path)?;
        let data = persistence::decode(self.seed, &bytes)?;
        info!("loaded {} edits from {}", data.modifications.len(), path.display());
        self.apply_save_data(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::SURFACE_Y;

    fn world() -> World {
        let mut world = World::with_seed(WorldSeed::new(42));
        world.ensure_loaded_around(0.0, 0.0, 1);
        world
    }

    #[test]
    fn test_update_streams_nearest_first() {
        let mut world = World::new(
            WorldSeed::new(1),
            WorldConfig { load_radius: 2, unload_radius: 3, max_generate_per_update: 1 },
        );
        assert_eq!(world.update(8.0, 8.0), 1);
        assert!(world.is_loaded(ChunkCoord::new(0, 0)));

        world.flush_generation_queue();
        assert_eq!(world.loaded_chunk_count(), 25);
        assert_eq!(world.drain_loaded().len(), 25);
    }

    #[test]
    fn test_far_chunks_unload() {
        let mut world = World::new(
            WorldSeed::new(1),
            WorldConfig { load_radius: 1, unload_radius: 2, max_generate_per_update: 16 },
        );
        world.update(0.0, 0.0);
        assert_eq!(world.loaded_chunk_count(), 9);

        world.update(16.0 * 10.0, 0.0);
        assert!(!world.is_loaded(ChunkCoord::new(0, 0)));
        assert_eq!(world.drain_unloaded().len(), 9);
        assert_eq!(world.stats().unloaded_this_session, 9);
    }

    #[test]
    fn test_set_block_errors() {
        let mut world = world();
        let high = BlockPos::new(0, CHUNK_HEIGHT as i32, 0);
        assert!(matches!(world.set_block(high, Block::AIR), Err(WorldError::OutOfBounds { .. })));

        let far = BlockPos::new(10_000, 5, 0);
        assert!(matches!(world.set_block(far, Block::AIR), Err(WorldError::ChunkNotLoaded(_))));
    }

    #[test]
    fn test_edits_survive_unload() {
        let mut world = World::new(
            WorldSeed::new(42),
            WorldConfig { load_radius: 1, unload_radius: 1, max_generate_per_update: 16 },
        );
        world.update(0.0, 0.0);

        let pos = BlockPos::new(2, SURFACE_Y + 1, 2);
        let previous = world.set_block(pos, Block::placed(BlockType::Cardboard)).unwrap();
        assert!(previous.is_air());

        world.update(1000.0, 1000.0);
        assert!(!world.is_loaded(pos.chunk()));
        assert!(world.get_block(pos).is_air());

        world.update(0.0, 0.0);
        assert_eq!(world.get_block(pos), Block::placed(BlockType::Cardboard));
    }

    #[test]
    fn test_ground_queries() {
        let world = world();
        assert_eq!(world.surface_height(1, 1), Some(SURFACE_Y));
        assert!(world.has_ground(1, 1));
        assert!(!world.has_ground(5000, 5000));
        assert_eq!(world.standing_height(1, 1, 0), Some(SURFACE_Y + 1));
    }

    #[test]
    fn test_props_can_be_destroyed_for_good() {
        let mut world = world();
        let prop = world
            .props()
            .find(|p| p.prop.kind == PropType::Lamppost)
            .map(|p| p.prop)
            .unwrap();

        let mut hit = None;
        for _ in 0..prop.kind.hit_points() {
            hit = world.damage_prop(prop.id, 1);
        }
        assert_eq!(hit, Some(PropHit { kind: PropType::Lamppost, destroyed: true }));
        assert!(world.prop(prop.id).is_none());

        let data = world.save_data();
        let mut fresh = World::with_seed(WorldSeed::new(42));
        fresh.ensure_loaded_around(0.0, 0.0, 1);
        assert!(fresh.prop(prop.id).is_some());
        fresh.apply_save_data(data);
        assert!(fresh.prop(prop.id).is_none());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("town.rgm");

        let mut world = world();
        let pos = BlockPos::new(3, SURFACE_Y + 1, 3);
        world.set_block(pos, Block::placed(BlockType::Planks)).unwrap();
        world.save_modifications(&path).unwrap();

        let mut restored = self::world();
        restored.load_modifications(&path).unwrap();
        assert_eq!(restored.get_block(pos), Block::placed(BlockType::Planks));
        assert_eq!(restored.stats().modifications, 1);

        let mut other = World::with_seed(WorldSeed::new(43));
        assert!(matches!(
            other.load_modifications(&path),
            Err(WorldError::SeedMismatch { .. })
        ));
    }
}
