//! # Town Plan
//!
//! The town is an infinite grid of 24x24 cells. Each cell is a 16x16 plot
//! wrapped in pavement and bordered by road on its north and west edges:
//!
//! ```text
//! local 0..4    road
//! local 4..6    pavement
//! local 6..22   plot (building, park or wasteland)
//! local 22..24  pavement
//! ```
//!
//! The neighbouring cell's road closes the south and east sides.
//!
//! Cell (0, 0) is always a park and the player spawns in it. Every landmark
//! appears exactly once, scattered over the cells around the park by a
//! seeded shuffle.

use std::collections::HashMap;

use crate::block::BlockType;
use crate::chunk::{BlockPos, SURFACE_Y};
use crate::noise::WorldSeed;

/// Cell edge length in blocks.
pub const CELL_SIZE: i32 = 24;

/// Road width along the north and west edge of every cell.
pub const ROAD_WIDTH: i32 = 4;

/// Pavement width between road and plot.
pub const PAVEMENT_WIDTH: i32 = 2;

/// Plot edge length in blocks.
pub const PLOT_SIZE: i32 = CELL_SIZE - ROAD_WIDTH - 2 * PAVEMENT_WIDTH;

/// Offset of the plot inside its cell.
pub const PLOT_OFFSET: i32 = ROAD_WIDTH + PAVEMENT_WIDTH;

/// Landmarks are shuffled into cells within this Chebyshev radius of the park.
pub const LANDMARK_RADIUS: i32 = 3;

/// Named buildings placed during world generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LandmarkType {
    /// Bakery chain. Sausage rolls.
    Greggs,
    /// Rings, watches, and a very nervous owner.
    Jeweller,
    /// Betting shop.
    Bookies,
    /// Corner off-licence.
    OffLicence,
    /// Second-hand clothes.
    CharityShop,
    /// Big supermarket.
    Supermarket,
    /// Local pub.
    Pub,
    /// Where arrested players end up.
    PoliceStation,
    /// Job centre.
    JobCentre,
    /// Tower block. Gang territory.
    CouncilFlats,
    /// Launderette.
    Launderette,
    /// Late-night kebab shop.
    KebabShop,
}

impl LandmarkType {
    /// Every landmark kind.
    pub const ALL: [Self; 12] = [
        Self::Greggs,
        Self::Jeweller,
        Self::Bookies,
        Self::OffLicence,
        Self::CharityShop,
        Self::Supermarket,
        Self::Pub,
        Self::PoliceStation,
        Self::JobCentre,
        Self::CouncilFlats,
        Self::Launderette,
        Self::KebabShop,
    ];

    /// Sign over the door.
    #[must_use]
    pub const fn sign(self) -> &'static str {
        match self {
            Self::Greggs => "GREGGS",
            Self::Jeweller => "JEWELLER",
            Self::Bookies => "BOOKIES",
            Self::OffLicence => "OFF LICENCE",
            Self::CharityShop => "CHARITY SHOP",
            Self::Supermarket => "TESCO",
            Self::Pub => "THE RED LION",
            Self::PoliceStation => "POLICE",
            Self::JobCentre => "JOB CENTRE PLUS",
            Self::CouncilFlats => "COUNCIL FLATS",
            Self::Launderette => "LAUNDERETTE",
            Self::KebabShop => "KEBAB HOUSE",
        }
    }

    /// Shops get a glass frontage and a shopkeeper.
    #[must_use]
    pub const fn is_shop(self) -> bool {
        !matches!(self, Self::PoliceStation | Self::JobCentre | Self::CouncilFlats)
    }

    /// Wall height in blocks (the roof sits one block above).
    #[must_use]
    pub const fn wall_height(self) -> i32 {
        match self {
            Self::CouncilFlats => 14,
            Self::PoliceStation | Self::Supermarket => 6,
            _ => 5,
        }
    }

    /// Wall material.
    #[must_use]
    pub const fn wall_block(self) -> BlockType {
        match self {
            Self::CouncilFlats | Self::PoliceStation | Self::JobCentre | Self::Supermarket => {
                BlockType::Concrete
            }
            _ => BlockType::Brick,
        }
    }
}

/// What the ground is at a given column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ground {
    /// Tarmac.
    Road,
    /// Paving between road and plot.
    Pavement,
    /// Inside a plot.
    Plot,
}

/// Cell coordinate in the town grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    /// Cell X.
    pub x: i32,
    /// Cell Z.
    pub z: i32,
}

impl CellCoord {
    /// Creates a cell coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Cell containing a block column.
    #[must_use]
    pub const fn from_block(x: i32, z: i32) -> Self {
        Self::new(x.div_euclid(CELL_SIZE), z.div_euclid(CELL_SIZE))
    }

    /// World X of the cell's north-west corner.
    #[must_use]
    pub const fn origin_x(self) -> i32 {
        self.x * CELL_SIZE
    }

    /// World Z of the cell's north-west corner.
    #[must_use]
    pub const fn origin_z(self) -> i32 {
        self.z * CELL_SIZE
    }

    /// World X of the plot's first column.
    #[must_use]
    pub const fn plot_x(self) -> i32 {
        self.origin_x() + PLOT_OFFSET
    }

    /// World Z of the plot's first row (the front wall of a building).
    #[must_use]
    pub const fn plot_z(self) -> i32 {
        self.origin_z() + PLOT_OFFSET
    }
}

/// Classifies a column as road, pavement or plot.
#[must_use]
pub const fn ground_at(x: i32, z: i32) -> Ground {
    let lx = x.rem_euclid(CELL_SIZE);
    let lz = z.rem_euclid(CELL_SIZE);
    if lx < ROAD_WIDTH || lz < ROAD_WIDTH {
        Ground::Road
    } else if lx < PLOT_OFFSET
        || lz < PLOT_OFFSET
        || lx >= PLOT_OFFSET + PLOT_SIZE
        || lz >= PLOT_OFFSET + PLOT_SIZE
    {
        Ground::Pavement
    } else {
        Ground::Plot
    }
}

/// What occupies a plot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotKind {
    /// A named building.
    Landmark(LandmarkType),
    /// Brick terraced houses.
    Terrace {
        /// Wall height in blocks.
        height: i32,
    },
    /// Concrete low-rise flats.
    Flats {
        /// Wall height in blocks.
        height: i32,
    },
    /// Grass, trees, maybe a pond.
    Park,
    /// Rubble, mud and discarded cardboard.
    Wasteland,
}

impl PlotKind {
    /// Wall height for building plots.
    #[must_use]
    pub const fn wall_height(self) -> Option<i32> {
        match self {
            Self::Landmark(kind) => Some(kind.wall_height()),
            Self::Terrace { height } | Self::Flats { height } => Some(height),
            Self::Park | Self::Wasteland => None,
        }
    }

    /// Wall material for building plots.
    #[must_use]
    pub const fn wall_block(self) -> BlockType {
        match self {
            Self::Landmark(kind) => kind.wall_block(),
            Self::Flats { .. } => BlockType::Concrete,
            _ => BlockType::Brick,
        }
    }
}

/// A placed landmark building.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Landmark {
    /// What the building is.
    pub kind: LandmarkType,
    /// Minimum corner (inclusive), first block above the floor.
    pub min: BlockPos,
    /// Maximum corner (inclusive), the roof.
    pub max: BlockPos,
}

impl Landmark {
    fn in_cell(kind: LandmarkType, cell: CellCoord) -> Self {
        let x = cell.plot_x();
        let z = cell.plot_z();
        Self {
            kind,
            min: BlockPos::new(x, SURFACE_Y + 1, z),
            max: BlockPos::new(
                x + PLOT_SIZE - 1,
                SURFACE_Y + kind.wall_height() + 1,
                z + PLOT_SIZE - 1,
            ),
        }
    }

    /// Cell the landmark occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        CellCoord::from_block(self.min.x, self.min.z)
    }

    /// Returns true if the block is part of, or inside, the building.
    #[must_use]
    pub const fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// Returns true if a world-space point is inside the footprint (any height up to the roof).
    #[must_use]
    pub fn contains_point(&self, p: [f32; 3]) -> bool {
        p[0] >= self.min.x as f32
            && p[0] < (self.max.x + 1) as f32
            && p[2] >= self.min.z as f32
            && p[2] < (self.max.z + 1) as f32
            && p[1] < (self.max.y + 1) as f32
    }

    /// Floor-level centre of the building.
    #[must_use]
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min.x + self.max.x + 1) as f32 * 0.5,
            self.min.y as f32,
            (self.min.z + self.max.z + 1) as f32 * 0.5,
        ]
    }

    /// Lower block of the two-wide, two-high front door (west half).
    #[must_use]
    pub const fn door(&self) -> BlockPos {
        BlockPos::new(self.min.x + PLOT_SIZE / 2 - 1, self.min.y, self.min.z)
    }

    /// Standing spot on the pavement just outside the door.
    #[must_use]
    pub fn entrance(&self) -> [f32; 3] {
        [
            (self.min.x + PLOT_SIZE / 2) as f32,
            self.min.y as f32,
            self.min.z as f32 - 0.5,
        ]
    }

    /// Standing spot just inside the door.
    #[must_use]
    pub fn interior(&self) -> [f32; 3] {
        [
            (self.min.x + PLOT_SIZE / 2) as f32,
            self.min.y as f32,
            self.min.z as f32 + 2.5,
        ]
    }
}

/// Deterministic layout of the whole town.
#[derive(Clone, Debug)]
pub struct TownPlan {
    seed: WorldSeed,
    landmarks: Vec<Landmark>,
    by_cell: HashMap<CellCoord, usize>,
}

impl TownPlan {
    /// Cell the player spawns in.
    pub const SPAWN_CELL: CellCoord = CellCoord::new(0, 0);

    /// Lays out the town for a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        let mut candidates: Vec<CellCoord> = Vec::new();
        for z in -LANDMARK_RADIUS..=LANDMARK_RADIUS {
            for x in -LANDMARK_RADIUS..=LANDMARK_RADIUS {
                let cell = CellCoord::new(x, z);
                if cell != Self::SPAWN_CELL {
                    candidates.push(cell);
                }
            }
        }

        // Fisher-Yates driven by the per-index hash keeps the shuffle stable
        // regardless of platform.
        let shuffle_seed = seed.derive(0x4c41_4e44);
        for i in (1..candidates.len()).rev() {
            let j = (shuffle_seed.hash2(i as i32, 0) % (i as u64 + 1)) as usize;
            candidates.swap(i, j);
        }

        let mut landmarks = Vec::with_capacity(LandmarkType::ALL.len());
        let mut by_cell = HashMap::with_capacity(LandmarkType::ALL.len());
        for (kind, cell) in LandmarkType::ALL.into_iter().zip(candidates) {
            by_cell.insert(cell, landmarks.len());
            landmarks.push(Landmark::in_cell(kind, cell));
        }

        Self { seed, landmarks, by_cell }
    }

    /// Seed the plan was built from.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// All landmarks.
    #[must_use]
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// The landmark of a given kind.
    #[must_use]
    pub fn landmark(&self, kind: LandmarkType) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.kind == kind)
    }

    /// Landmark whose building contains the block.
    #[must_use]
    pub fn landmark_at(&self, pos: BlockPos) -> Option<&Landmark> {
        let cell = CellCoord::from_block(pos.x, pos.z);
        self.by_cell
            .get(&cell)
            .map(|&i| &self.landmarks[i])
            .filter(|l| l.contains(pos))
    }

    /// Landmark whose footprint contains a world-space point.
    #[must_use]
    pub fn landmark_at_point(&self, p: [f32; 3]) -> Option<&Landmark> {
        let cell = CellCoord::from_block(p[0].floor() as i32, p[2].floor() as i32);
        self.by_cell
            .get(&cell)
            .map(|&i| &self.landmarks[i])
            .filter(|l| l.contains_point(p))
    }

    /// What occupies a cell's plot.
    #[must_use]
    pub fn plot(&self, cell: CellCoord) -> PlotKind {
        if cell == Self::SPAWN_CELL {
            return PlotKind::Park;
        }
        if let Some(&i) = self.by_cell.get(&cell) {
            return PlotKind::Landmark(self.landmarks[i].kind);
        }

        let h = self.seed.derive(0x504c_4f54).hash2(cell.x, cell.z);
        let variant = (h >> 8) % 4;
        match h % 100 {
            0..=14 => PlotKind::Park,
            15..=54 => PlotKind::Terrace { height: 5 + (variant % 3) as i32 },
            55..=79 => PlotKind::Flats { height: 9 + variant as i32 },
            _ => PlotKind::Wasteland,
        }
    }

    /// Standing position in the middle of the spawn park.
    #[must_use]
    pub fn spawn_point(&self) -> [f32; 3] {
        let cell = Self::SPAWN_CELL;
        [
            (cell.plot_x() + PLOT_SIZE / 2) as f32 + 0.5,
            (SURFACE_Y + 1) as f32,
            (cell.plot_z() + PLOT_SIZE / 2) as f32 + 0.5,
        ]
    }

    /// Trunk columns of the trees in a park cell.
    #[must_use]
    pub fn trees(&self, cell: CellCoord) -> Vec<(i32, i32)> {
        if self.plot(cell) != PlotKind::Park {
            return Vec::new();
        }
        const SPOTS: [(i32, i32); 4] = [(3, 3), (12, 3), (3, 12), (12, 12)];
        let h = self.seed.derive(0x5452_4545).hash2(cell.x, cell.z);
        SPOTS
            .iter()
            .enumerate()
            .filter(|(i, _)| cell == Self::SPAWN_CELL || (h >> *i) & 1 == 1)
            .map(|(_, (ox, oz))| (cell.plot_x() + ox, cell.plot_z() + oz))
            .collect()
    }

    /// Whether a park cell has a pond in the middle. Never the spawn park.
    #[must_use]
    pub fn has_pond(&self, cell: CellCoord) -> bool {
        cell != Self::SPAWN_CELL
            && self.plot(cell) == PlotKind::Park
            && self.seed.derive(0x504f_4e44).hash2(cell.x, cell.z) % 3 == 0
    }
}
