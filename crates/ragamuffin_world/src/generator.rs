//! # Chunk Generator
//!
//! Turns the [`TownPlan`] into blocks. Every column is a pure function of the
//! seed and its world position, so buildings that straddle chunk borders line
//! up without any neighbour lookups.
//!
//! ## Layers
//!
//! ```text
//! y = 0      bedrock
//! y = 1..=2  stone
//! y = 3      dirt
//! y = 4      surface (road, pavement, grass, floor)
//! y = 5..    walls, trees, rubble
//! ```

use crate::block::{Block, BlockType};
use crate::chunk::{Chunk, ChunkCoord, CHUNK_HEIGHT, CHUNK_SIZE, SURFACE_Y};
use crate::noise::{SimplexNoise, WorldSeed};
use crate::town::{ground_at, CellCoord, Ground, PlotKind, TownPlan, PLOT_SIZE};

/// Tree trunk height above the surface.
const TRUNK_HEIGHT: i32 = 4;

/// Generates chunks from the town plan.
pub struct ChunkGenerator {
    plan: TownPlan,
    /// Grass/dirt patches on wasteland.
    ground_noise: SimplexNoise,
}

impl ChunkGenerator {
    /// Creates a new chunk generator.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            plan: TownPlan::new(seed),
            ground_noise: SimplexNoise::new(seed.derive(100)),
        }
    }

    /// The town layout this generator builds.
    #[must_use]
    pub const fn plan(&self) -> &TownPlan {
        &self.plan
    }

    /// Generates a chunk at the given coordinates.
    #[must_use]
    pub fn generate(&self, coord: ChunkCoord) -> Chunk {
        let mut chunk = Chunk::new(coord);

        let world_x = coord.world_x();
        let world_z = coord.world_z();
        let trees = self.trees_near(world_x, world_z);

        for local_z in 0..CHUNK_SIZE {
            for local_x in 0..CHUNK_SIZE {
                let block_x = world_x + local_x as i32;
                let block_z = world_z + local_z as i32;
                self.generate_column(&mut chunk, local_x, local_z, block_x, block_z, &trees);
            }
        }

        chunk.modified = false;
        chunk
    }

    /// Tree trunks in every cell this chunk overlaps.
    fn trees_near(&self, world_x: i32, world_z: i32) -> Vec<(i32, i32)> {
        let last = CHUNK_SIZE as i32 - 1;
        let min = CellCoord::from_block(world_x, world_z);
        let max = CellCoord::from_block(world_x + last, world_z + last);

        let mut trees = Vec::new();
        for cz in min.z..=max.z {
            for cx in min.x..=max.x {
                trees.extend(self.plan.trees(CellCoord::new(cx, cz)));
            }
        }
        trees
    }

    fn generate_column(
        &self,
        chunk: &mut Chunk,
        local_x: usize,
        local_z: usize,
        block_x: i32,
        block_z: i32,
        trees: &[(i32, i32)],
    ) {
        let mut set = |y: i32, kind: BlockType| {
            if (0..CHUNK_HEIGHT as i32).contains(&y) {
                chunk.set_block(local_x, y as usize, local_z, Block::of(kind));
            }
        };

        set(0, BlockType::Bedrock);
        set(1, BlockType::Stone);
        set(2, BlockType::Stone);
        set(3, BlockType::Dirt);

        match ground_at(block_x, block_z) {
            Ground::Road => set(SURFACE_Y, BlockType::Road),
            Ground::Pavement => set(SURFACE_Y, BlockType::Pavement),
            Ground::Plot => {
                let cell = CellCoord::from_block(block_x, block_z);
                let ox = block_x - cell.plot_x();
                let oz = block_z - cell.plot_z();
                let plot = self.plan.plot(cell);

                match plot {
                    PlotKind::Park => {
                        let pond = self.plan.has_pond(cell)
                            && (6..=9).contains(&ox)
                            && (6..=9).contains(&oz);
                        set(SURFACE_Y, if pond { BlockType::Water } else { BlockType::Grass });
                        for (y, kind) in tree_blocks(block_x, block_z, trees) {
                            set(y, kind);
                        }
                    }
                    PlotKind::Wasteland => {
                        let patch = self
                            .ground_noise
                            .sample(f64::from(block_x) * 0.15, f64::from(block_z) * 0.15);
                        set(SURFACE_Y, if patch > 0.2 { BlockType::Grass } else { BlockType::Dirt });

                        let roll = self.plan.seed().derive(0x5255_4242).hash2(block_x, block_z) % 48;
                        match roll {
                            0 => set(SURFACE_Y + 1, BlockType::Brick),
                            1 => set(SURFACE_Y + 1, BlockType::Cardboard),
                            2 => {
                                set(SURFACE_Y + 1, BlockType::Brick);
                                set(SURFACE_Y + 2, BlockType::Brick);
                            }
                            _ => {}
                        }
                    }
                    PlotKind::Landmark(_) | PlotKind::Terrace { .. } | PlotKind::Flats { .. } => {
                        set(SURFACE_Y, BlockType::Concrete);
                        let height = plot.wall_height().unwrap_or(5);
                        set(SURFACE_Y + height + 1, BlockType::Concrete);

                        let perimeter = ox == 0 || oz == 0 || ox == PLOT_SIZE - 1 || oz == PLOT_SIZE - 1;
                        if perimeter {
                            for y in SURFACE_Y + 1..=SURFACE_Y + height {
                                set(y, wall_block(plot, ox, oz, y));
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Block at a perimeter column of a building.
fn wall_block(plot: PlotKind, ox: i32, oz: i32, y: i32) -> BlockType {
    let storey = y - (SURFACE_Y + 1);
    let front = oz == 0;
    let door_column = front && (ox == PLOT_SIZE / 2 - 1 || ox == PLOT_SIZE / 2);

    if door_column && storey < 2 {
        return BlockType::Air;
    }

    let corner = (ox == 0 || ox == PLOT_SIZE - 1) && (oz == 0 || oz == PLOT_SIZE - 1);
    if corner {
        return plot.wall_block();
    }

    // Pillars either side of the door stay solid
    let near_door = front && (PLOT_SIZE / 2 - 2..=PLOT_SIZE / 2 + 1).contains(&ox);

    if let PlotKind::Landmark(kind) = plot {
        if kind.is_shop() && front && storey < 3 && !near_door {
            return BlockType::Glass;
        }
    }

    let along = if oz == 0 || oz == PLOT_SIZE - 1 { ox } else { oz };
    if storey % 3 == 1 && matches!(along % 4, 2 | 3) && !near_door {
        return BlockType::Glass;
    }

    plot.wall_block()
}

/// Wood and leaf blocks of any tree reaching this column.
fn tree_blocks(x: i32, z: i32, trees: &[(i32, i32)]) -> Vec<(i32, BlockType)> {
    let top = SURFACE_Y + TRUNK_HEIGHT;
    let mut out = Vec::new();

    for &(tx, tz) in trees {
        let dx = x - tx;
        let dz = z - tz;
        if dx.abs() > 2 || dz.abs() > 2 {
            continue;
        }
        let dist_sq = dx * dx + dz * dz;

        if dx == 0 && dz == 0 {
            for y in SURFACE_Y + 1..=top {
                out.push((y, BlockType::Wood));
            }
            out.push((top + 1, BlockType::Leaves));
        } else {
            if dist_sq <= 5 {
                out.push((top - 1, BlockType::Leaves));
                out.push((top, BlockType::Leaves));
            }
            if dist_sq <= 2 {
                out.push((top + 1, BlockType::Leaves));
            }
        }
    }

    // Trunks win over neighbouring canopies
    out.sort_by_key(|&(y, kind)| (y, kind == BlockType::Wood));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::BlockPos;
    use crate::town::LandmarkType;

    fn block_at(gen: &ChunkGenerator, pos: BlockPos) -> BlockType {
        let chunk = gen.generate(pos.chunk());
        let (x, y, z) = pos.local().unwrap();
        chunk.get_block(x, y, z).kind()
    }

    #[test]
    fn test_chunk_generation_determinism() {
        let gen1 = ChunkGenerator::new(WorldSeed::new(42));
        let gen2 = ChunkGenerator::new(WorldSeed::new(42));

        let coord = ChunkCoord::new(5, -3);
        let chunk1 = gen1.generate(coord);
        let chunk2 = gen2.generate(coord);

        for y in 0..CHUNK_HEIGHT {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    assert_eq!(
                        chunk1.get_block(x, y, z),
                        chunk2.get_block(x, y, z),
                        "Mismatch at ({x}, {y}, {z})"
                    );
                }
            }
        }
        assert!(!chunk1.modified);
    }

    #[test]
    fn test_ground_layers() {
        let gen = ChunkGenerator::new(WorldSeed::new(42));
        assert_eq!(block_at(&gen, BlockPos::new(1, 0, 1)), BlockType::Bedrock);
        assert_eq!(block_at(&gen, BlockPos::new(1, 2, 1)), BlockType::Stone);
        assert_eq!(block_at(&gen, BlockPos::new(1, 3, 1)), BlockType::Dirt);
        assert_eq!(block_at(&gen, BlockPos::new(1, SURFACE_Y, 10)), BlockType::Road);
        assert_eq!(block_at(&gen, BlockPos::new(5, SURFACE_Y, 10)), BlockType::Pavement);
        assert_eq!(block_at(&gen, BlockPos::new(1, SURFACE_Y + 1, 1)), BlockType::Air);
    }

    #[test]
    fn test_landmark_shell() {
        let gen = ChunkGenerator::new(WorldSeed::new(7));
        let jeweller = *gen.plan().landmark(LandmarkType::Jeweller).unwrap();

        // Door gap is two blocks high
        let door = jeweller.door();
        assert_eq!(block_at(&gen, door), BlockType::Air);
        assert_eq!(block_at(&gen, door.offset(0, 1, 0)), BlockType::Air);
        assert_eq!(block_at(&gen, door.offset(1, 0, 0)), BlockType::Air);

        // Roof over the whole footprint
        assert_eq!(block_at(&gen, jeweller.max), BlockType::Concrete);

        // Glass shop front, solid back wall
        assert_eq!(block_at(&gen, jeweller.min.offset(2, 0, 0)), BlockType::Glass);
        let back = BlockPos::new(jeweller.min.x + 1, jeweller.min.y, jeweller.max.z);
        assert_eq!(block_at(&gen, back), BlockType::Brick);

        // Hollow inside
        let inside = BlockPos::new(jeweller.min.x + 5, jeweller.min.y, jeweller.min.z + 5);
        assert_eq!(block_at(&gen, inside), BlockType::Air);
    }

    #[test]
    fn test_spawn_park_has_trees() {
        let gen = ChunkGenerator::new(WorldSeed::new(1));
        let trunks = gen.plan().trees(TownPlan::SPAWN_CELL);
        let (tx, tz) = trunks[0];

        assert_eq!(block_at(&gen, BlockPos::new(tx, SURFACE_Y, tz)), BlockType::Grass);
        assert_eq!(block_at(&gen, BlockPos::new(tx, SURFACE_Y + 1, tz)), BlockType::Wood);
        assert_eq!(block_at(&gen, BlockPos::new(tx, SURFACE_Y + TRUNK_HEIGHT, tz)), BlockType::Wood);
        assert_eq!(
            block_at(&gen, BlockPos::new(tx + 1, SURFACE_Y + TRUNK_HEIGHT, tz)),
            BlockType::Leaves
        );

        let spawn = BlockPos::containing(gen.plan().spawn_point());
        assert_eq!(block_at(&gen, spawn), BlockType::Air);
        assert_eq!(block_at(&gen, spawn.offset(0, -1, 0)), BlockType::Grass);
    }
}
