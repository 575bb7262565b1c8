//! # Streaming Walk Integration Test
//!
//! Proves the player can wander the town without ever stepping into an
//! unloaded hole, and that streaming keeps memory bounded.

use ragamuffin_world::{
    Block, BlockPos, BlockType, LandmarkType, World, WorldConfig, WorldSeed, SURFACE_Y,
};

fn config() -> WorldConfig {
    WorldConfig { load_radius: 3, unload_radius: 4, max_generate_per_update: 4 }
}

/// Walk 2,000 blocks east along a road without falling.
#[test]
fn test_long_walk_always_has_ground() {
    let mut world = World::new(WorldSeed::new(42), config());
    world.ensure_loaded_around(0.0, 0.0, 3);

    let z = 2.0f32;
    let mut x = 0.0f32;
    for step in 0..2_000 {
        x += 1.0;
        world.update(x, z);
        if step % 16 == 0 {
            world.flush_generation_queue();
        }
        if step % 100 == 0 {
            assert!(world.has_ground(x as i32, z as i32), "hole at x={x}");
        }
    }
    world.flush_generation_queue();

    // (2 * 4 + 1)^2 is the most that can be resident
    assert!(world.loaded_chunk_count() <= 81);
    let stats = world.stats();
    assert!(stats.generated_this_session > 100);
    assert!(stats.unloaded_this_session > 50);
    assert_eq!(world.surface_height(x as i32, z as i32), Some(SURFACE_Y));
}

/// Teleport around and verify chunks generate at each destination.
#[test]
fn test_teleport_stress() {
    let mut world = World::new(WorldSeed::new(99_999), config());

    for (x, z) in [(0.0, 0.0), (1000.0, 0.0), (-1000.0, 500.0), (500.0, -1000.0), (0.0, 0.0)] {
        world.update(x, z);
        world.flush_generation_queue();
        assert!(world.has_ground(x as i32, z as i32), "no ground at ({x}, {z})");
    }
}

/// Same seed, same town.
#[test]
fn test_deterministic_town() {
    let seed = WorldSeed::new(42);
    let mut a = World::new(seed, config());
    let mut b = World::new(seed, config());
    a.ensure_loaded_around(100.0, 100.0, 2);
    b.ensure_loaded_around(100.0, 100.0, 2);

    for y in 0..20 {
        for x in 80..120 {
            let pos = BlockPos::new(x, y, 100);
            assert_eq!(a.get_block(pos), b.get_block(pos));
        }
    }
}

/// A shelter built in the park is still there after a long trip away.
#[test]
fn test_shelter_survives_round_trip() {
    let mut world = World::new(WorldSeed::new(7), config());
    let spawn = world.plan().spawn_point();
    world.ensure_loaded_around(spawn[0], spawn[2], 1);

    let base = BlockPos::containing(spawn).offset(2, 0, 0);
    for dy in 0..3 {
        world.set_block(base.offset(0, dy, 0), Block::placed(BlockType::Cardboard)).unwrap();
    }

    world.update(spawn[0] + 2000.0, spawn[2]);
    world.flush_generation_queue();
    assert!(!world.is_loaded(base.chunk()));

    world.update(spawn[0], spawn[2]);
    world.flush_generation_queue();
    for dy in 0..3 {
        assert!(world.get_block(base.offset(0, dy, 0)).is_player_placed());
    }
}

/// The police station is a real building with a way in.
#[test]
fn test_police_station_is_enterable() {
    let mut world = World::new(WorldSeed::new(3), config());
    let station = *world.plan().landmark(LandmarkType::PoliceStation).unwrap();
    let entrance = station.entrance();
    world.ensure_loaded_around(entrance[0], entrance[2], 2);

    let door = station.door();
    assert!(!world.is_solid(door.x, door.y, door.z));
    assert!(!world.is_solid(door.x, door.y + 1, door.z));
    assert!(world.is_solid(door.x - 1, door.y, door.z));
    assert!(world.is_solid(station.max.x, station.max.y, station.max.z));
}
