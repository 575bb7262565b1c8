//! # Shelter Detection
//!
//! A spot counts as sheltered when there is a roof overhead and walls on at
//! least three sides. Cardboard boxes count. So does a bus shelter built out
//! of nicked planks.

use ragamuffin_world::{BlockPos, World};

use crate::physics::VoxelQuery;

/// Decides whether a position is sheltered or warmed by a fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShelterDetector {
    /// How far above the head a roof may be.
    pub roof_range: i32,
    /// How far away a wall may be.
    pub wall_range: i32,
    /// Walled sides needed out of four.
    pub walls_needed: usize,
}

impl Default for ShelterDetector {
    fn default() -> Self {
        Self {
            roof_range: 6,
            wall_range: 4,
            walls_needed: 3,
        }
    }
}

impl ShelterDetector {
    const SIDES: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

    /// Whether someone standing with their feet at `feet` is sheltered.
    #[must_use]
    pub fn is_sheltered(&self, world: &impl VoxelQuery, feet: [f32; 3]) -> bool {
        let base = BlockPos::containing(feet);

        // Head occupies feet + 1; the roof search starts just above it
        let roofed = (2..2 + self.roof_range).any(|dy| world.is_solid(base.x, base.y + dy, base.z));
        if !roofed {
            return false;
        }

        let walls = Self::SIDES
            .iter()
            .filter(|&&(dx, dz)| {
                (1..=self.wall_range).any(|d| {
                    let (x, z) = (base.x + dx * d, base.z + dz * d);
                    world.is_solid(x, base.y, z) || world.is_solid(x, base.y + 1, z)
                })
            })
            .count();
        walls >= self.walls_needed
    }

    /// Whether a campfire is within `radius` blocks (cube) of `feet`.
    #[must_use]
    pub fn near_campfire(&self, world: &World, feet: [f32; 3], radius: i32) -> bool {
        let base = BlockPos::containing(feet);
        (-radius..=radius).any(|dy| {
            (-radius..=radius).any(|dz| {
                (-radius..=radius).any(|dx| world.block_type(base.offset(dx, dy, dz)).emits_heat())
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragamuffin_world::{Block, BlockType, WorldSeed};

    fn world_at_spawn() -> (World, [f32; 3]) {
        let mut world = World::with_seed(WorldSeed::new(3));
        let spawn = world.plan().spawn_point();
        world.ensure_loaded_around(spawn[0], spawn[2], 1);
        (world, spawn)
    }

    fn place(world: &mut World, pos: BlockPos, kind: BlockType) {
        world.set_block(pos, Block::placed(kind)).unwrap();
    }

    #[test]
    fn test_open_park_is_not_sheltered() {
        let (world, spawn) = world_at_spawn();
        assert!(!ShelterDetector::default().is_sheltered(&world, spawn));
    }

    #[test]
    fn test_cardboard_box_is_a_shelter() {
        let (mut world, spawn) = world_at_spawn();
        let detector = ShelterDetector::default();
        let feet = BlockPos::containing(spawn);

        place(&mut world, feet.offset(0, 3, 0), BlockType::Cardboard);
        assert!(!detector.is_sheltered(&world, spawn), "a roof alone is not enough");

        place(&mut world, feet.offset(2, 0, 0), BlockType::Cardboard);
        place(&mut world, feet.offset(-2, 0, 0), BlockType::Cardboard);
        assert!(!detector.is_sheltered(&world, spawn));

        place(&mut world, feet.offset(0, 1, 3), BlockType::Cardboard);
        assert!(detector.is_sheltered(&world, spawn));
    }

    #[test]
    fn test_campfire_warms_nearby() {
        let (mut world, spawn) = world_at_spawn();
        let detector = ShelterDetector::default();
        let feet = BlockPos::containing(spawn);

        assert!(!detector.near_campfire(&world, spawn, 4));
        place(&mut world, feet.offset(3, 0, 0), BlockType::Campfire);
        assert!(detector.near_campfire(&world, spawn, 4));
        assert!(!detector.near_campfire(&world, spawn, 2));
    }
}
