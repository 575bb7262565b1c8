//! # Interaction
//!
//! Punching blocks until they give, placing blocks against faces, and
//! working out what the player is looking at.

use std::collections::HashMap;

use ragamuffin_world::{Aabb, Block, BlockPos, BlockType, PropId, World, WorldError, CHUNK_HEIGHT};
use tracing::debug;

use crate::error::{GameError, GameResult};
use crate::physics::{raycast, RaycastHit, VoxelQuery};

/// Outcome of one hit on a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakOutcome {
    /// Still standing.
    Damaged {
        /// Hits landed so far.
        hits: u32,
        /// Hits needed.
        needed: u32,
    },
    /// Gone. Holds what was there.
    Broken(Block),
}

#[derive(Clone, Copy, Debug)]
struct HitRecord {
    hits: u32,
    last_hit: f32,
}

/// Counts punches per block.
///
/// A block breaks after `ceil(hits_to_break / tool_power)` hits. Counters on
/// blocks left alone for longer than the timeout are forgotten.
#[derive(Clone, Debug)]
pub struct BlockBreaker {
    hits: HashMap<BlockPos, HitRecord>,
    timeout: f32,
    time: f32,
}

impl BlockBreaker {
    /// Creates a breaker whose counters expire after `timeout` seconds.
    #[must_use]
    pub fn new(timeout: f32) -> Self {
        Self {
            hits: HashMap::new(),
            timeout,
            time: 0.0,
        }
    }

    /// Hits needed to break a block with a tool.
    #[must_use]
    pub fn hits_needed(kind: BlockType, tool_power: u32) -> u32 {
        kind.hits_to_break().div_ceil(tool_power.max(1)).max(1)
    }

    /// Advances time and forgets stale counters.
    pub fn tick(&mut self, dt: f32) {
        self.time += dt;
        let (now, timeout) = (self.time, self.timeout);
        self.hits.retain(|_, r| now - r.last_hit <= timeout);
    }

    /// Hits a block.
    ///
    /// # Errors
    ///
    /// [`WorldError::ChunkNotLoaded`] if the block is not resident,
    /// [`WorldError::Unbreakable`] for air, water and bedrock.
    pub fn hit(&mut self, world: &mut World, pos: BlockPos, tool_power: u32) -> GameResult<BreakOutcome> {
        if !world.is_loaded(pos.chunk()) {
            return Err(WorldError::ChunkNotLoaded(pos.chunk()).into());
        }
        let block = world.get_block(pos);
        let kind = block.kind();
        if !kind.is_breakable() {
            return Err(WorldError::Unbreakable {
                x: pos.x,
                y: pos.y,
                z: pos.z,
            }
            .into());
        }

        let needed = Self::hits_needed(kind, tool_power);
        let now = self.time;
        let record = self.hits.entry(pos).or_insert(HitRecord { hits: 0, last_hit: now });
        record.hits += 1;
        record.last_hit = now;
        let hits = record.hits;

        if hits < needed {
            return Ok(BreakOutcome::Damaged { hits, needed });
        }

        self.hits.remove(&pos);
        world.set_block(pos, Block::AIR)?;
        debug!(x = pos.x, y = pos.y, z = pos.z, block = kind.name(), "block broken");
        Ok(BreakOutcome::Broken(block))
    }

    /// Fraction of the way to breaking, if the block has been hit.
    #[must_use]
    pub fn progress(&self, world: &World, pos: BlockPos, tool_power: u32) -> Option<f32> {
        let record = self.hits.get(&pos)?;
        let needed = Self::hits_needed(world.block_type(pos), tool_power);
        Some(record.hits as f32 / needed as f32)
    }

    /// Forgets every counter.
    pub fn clear(&mut self) {
        self.hits.clear();
    }
}

/// Puts blocks into the world.
pub struct BlockPlacer;

impl BlockPlacer {
    /// Places `kind` against the face the ray hit. Returns where it went.
    ///
    /// `blockers` are the boxes of everyone who must not be walled in.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidPlacement`] for an occupied cell or a cell that
    /// would trap someone, [`WorldError::OutOfBounds`] above the sky or below
    /// bedrock, [`WorldError::ChunkNotLoaded`] for unloaded ground.
    pub fn place(world: &mut World, hit: &RaycastHit, kind: BlockType, blockers: &[Aabb]) -> GameResult<BlockPos> {
        if hit.normal == [0, 0, 0] {
            return Err(GameError::InvalidPlacement("looking from inside a block"));
        }
        let target = hit.adjacent();

        if !(1..CHUNK_HEIGHT as i32).contains(&target.y) {
            return Err(WorldError::OutOfBounds {
                x: target.x,
                y: target.y,
                z: target.z,
            }
            .into());
        }
        if !world.is_loaded(target.chunk()) {
            return Err(WorldError::ChunkNotLoaded(target.chunk()).into());
        }
        if !world.get_block(target).is_air() {
            return Err(GameError::InvalidPlacement("cell is occupied"));
        }

        let cell = Aabb::from_voxel(target.x, target.y, target.z);
        if blockers.iter().any(|b| b.intersects(&cell)) {
            return Err(GameError::InvalidPlacement("someone is standing there"));
        }

        world.set_block(target, Block::placed(kind))?;
        Ok(target)
    }
}

/// Nearest target whose box the ray enters within `reach`.
pub fn nearest_in_reach<T: Copy>(
    origin: [f32; 3],
    direction: [f32; 3],
    reach: f32,
    targets: impl IntoIterator<Item = (T, Aabb)>,
) -> Option<(T, f32)> {
    targets
        .into_iter()
        .filter_map(|(id, aabb)| aabb.ray_intersect(origin, direction).map(|t| (id, t)))
        .filter(|&(_, t)| t <= reach)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Nearest NPC whose box the look ray hits within reach. Solid blocks
/// stop the ray, so nobody is punched through a wall.
pub fn find_npc_in_reach<T: Copy>(
    world: &impl VoxelQuery,
    origin: [f32; 3],
    direction: [f32; 3],
    reach: f32,
    npcs: impl IntoIterator<Item = (T, Aabb)>,
) -> Option<T> {
    let reach = raycast(origin, direction, reach, world).map_or(reach, |hit| hit.distance);
    nearest_in_reach(origin, direction, reach, npcs).map(|(id, _)| id)
}

/// Nearest prop the look ray hits within reach, with its distance.
#[must_use]
pub fn find_prop_in_reach(world: &World, origin: [f32; 3], direction: [f32; 3], reach: f32) -> Option<(PropId, f32)> {
    let area = Aabb::new(
        origin.map(|v| v - reach),
        origin.map(|v| v + reach),
    );
    nearest_in_reach(
        origin,
        direction,
        reach,
        world.props_in(area).map(|p| (p.prop.id, p.prop.aabb())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::look_direction;
    use ragamuffin_world::WorldSeed;

    fn world() -> (World, [f32; 3]) {
        let mut world = World::with_seed(WorldSeed::new(8));
        let spawn = world.plan().spawn_point();
        world.ensure_loaded_around(spawn[0], spawn[2], 1);
        (world, spawn)
    }

    #[test]
    fn test_hits_needed_rounds_up() {
        assert_eq!(BlockBreaker::hits_needed(BlockType::Brick, 1), 8);
        assert_eq!(BlockBreaker::hits_needed(BlockType::Brick, 3), 3);
        assert_eq!(BlockBreaker::hits_needed(BlockType::Leaves, 3), 1);
        assert_eq!(BlockBreaker::hits_needed(BlockType::Grass, 0), 3);
    }

    #[test]
    fn test_break_grass_by_hand() {
        let (mut world, spawn) = world();
        let mut breaker = BlockBreaker::new(5.0);
        let below = BlockPos::containing(spawn).offset(0, -1, 0);

        assert_eq!(
            breaker.hit(&mut world, below, 1).unwrap(),
            BreakOutcome::Damaged { hits: 1, needed: 3 }
        );
        breaker.hit(&mut world, below, 1).unwrap();
        assert!(breaker.progress(&world, below, 1).unwrap() > 0.6);

        let outcome = breaker.hit(&mut world, below, 1).unwrap();
        assert!(matches!(outcome, BreakOutcome::Broken(b) if b.kind() == BlockType::Grass));
        assert!(world.get_block(below).is_air());
        assert!(breaker.progress(&world, below, 1).is_none());
    }

    #[test]
    fn test_hit_counters_expire() {
        let (mut world, spawn) = world();
        let mut breaker = BlockBreaker::new(2.0);
        let below = BlockPos::containing(spawn).offset(0, -1, 0);

        breaker.hit(&mut world, below, 1).unwrap();
        breaker.hit(&mut world, below, 1).unwrap();
        breaker.tick(3.0);
        assert_eq!(
            breaker.hit(&mut world, below, 1).unwrap(),
            BreakOutcome::Damaged { hits: 1, needed: 3 }
        );
    }

    #[test]
    fn test_bedrock_and_air_are_unbreakable() {
        let (mut world, spawn) = world();
        let mut breaker = BlockBreaker::new(5.0);
        let feet = BlockPos::containing(spawn);

        assert!(matches!(
            breaker.hit(&mut world, BlockPos::new(feet.x, 0, feet.z), 3),
            Err(GameError::World(WorldError::Unbreakable { .. }))
        ));
        assert!(matches!(
            breaker.hit(&mut world, feet, 1),
            Err(GameError::World(WorldError::Unbreakable { .. }))
        ));
        assert!(matches!(
            breaker.hit(&mut world, BlockPos::new(5000, 4, 5000), 1),
            Err(GameError::World(WorldError::ChunkNotLoaded(_)))
        ));
    }

    #[test]
    fn test_place_against_ground() {
        let (mut world, spawn) = world();
        let eye = [spawn[0], spawn[1] + 1.6, spawn[2]];
        // Look down and a little ahead
        let hit = raycast(eye, look_direction(0.0, -50.0), 5.0, &world).unwrap();
        assert_eq!(hit.normal, [0, 1, 0]);

        let player = Aabb::from_feet(spawn, 0.6, 1.8);
        let pos = BlockPlacer::place(&mut world, &hit, BlockType::Cardboard, &[player]).unwrap();
        assert_eq!(pos, hit.voxel.offset(0, 1, 0));
        assert!(world.get_block(pos).is_player_placed());

        // Same spot again is occupied
        assert!(matches!(
            BlockPlacer::place(&mut world, &hit, BlockType::Cardboard, &[player]),
            Err(GameError::InvalidPlacement(_))
        ));
    }

    #[test]
    fn test_cannot_place_inside_player() {
        let (mut world, spawn) = world();
        let eye = [spawn[0], spawn[1] + 1.6, spawn[2]];
        let hit = raycast(eye, look_direction(0.0, -90.0), 5.0, &world).unwrap();

        let player = Aabb::from_feet(spawn, 0.6, 1.8);
        assert!(matches!(
            BlockPlacer::place(&mut world, &hit, BlockType::Cardboard, &[player]),
            Err(GameError::InvalidPlacement(_))
        ));
        assert!(world.get_block(hit.adjacent()).is_air());
    }

    #[test]
    fn test_find_npc_picks_nearest_hit() {
        let origin = [0.0, 1.6, 0.0];
        let dir = look_direction(0.0, 0.0);
        let near = Aabb::from_feet([0.0, 0.0, -2.0], 0.6, 1.8);
        let far = Aabb::from_feet([0.0, 0.0, -3.5], 0.6, 1.8);
        let beside = Aabb::from_feet([2.0, 0.0, -1.0], 0.6, 1.8);

        let pick = |reach, targets: &[(u32, Aabb)]| {
            nearest_in_reach(origin, dir, reach, targets.iter().copied()).map(|(id, _)| id)
        };
        assert_eq!(pick(5.0, &[(1, far), (2, near), (3, beside)]), Some(2));
        assert_eq!(pick(1.0, &[(1, far), (2, near)]), None);
        assert_eq!(pick(5.0, &[(3, beside)]), None);
    }

    #[test]
    fn test_wall_blocks_npc_reach() {
        let (mut world, spawn) = world();
        let eye = [spawn[0], spawn[1] + 1.6, spawn[2]];
        let east = look_direction(90.0, 0.0);
        let npc = Aabb::from_feet([spawn[0] + 2.5, spawn[1], spawn[2]], 0.6, 1.8);

        assert_eq!(find_npc_in_reach(&world, eye, east, 5.0, [(1, npc)]), Some(1));

        let wall = BlockPos::containing([spawn[0] + 1.0, eye[1], spawn[2]]);
        world.set_block(wall, Block::placed(BlockType::Brick)).unwrap();
        assert_eq!(find_npc_in_reach(&world, eye, east, 5.0, [(1, npc)]), None);
    }
}
